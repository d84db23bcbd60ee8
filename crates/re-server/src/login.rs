//! Handshake, status and login for both sides of the relay.

use re_proto::packets::{id, GAME_VERSION, PROTOCOL_VERSION};
use re_proto::{Packet, PacketWriter};
use re_relay::Identity;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::error::ServerError;
use crate::net::Connection;

/// Values advertised in the server list.
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub motd: String,
    pub max_players: u32,
    pub online_players: u32,
}

#[derive(Serialize)]
struct StatusResponse<'a> {
    version: StatusVersion<'a>,
    players: StatusPlayers,
    description: ChatText<'a>,
}

#[derive(Serialize)]
struct StatusVersion<'a> {
    name: &'a str,
    protocol: i32,
}

#[derive(Serialize)]
struct StatusPlayers {
    max: u32,
    online: u32,
}

#[derive(Serialize)]
struct ChatText<'a> {
    text: &'a str,
}

pub fn status_json(status: &StatusInfo) -> Result<String, ServerError> {
    Ok(serde_json::to_string(&StatusResponse {
        version: StatusVersion {
            name: GAME_VERSION,
            protocol: PROTOCOL_VERSION,
        },
        players: StatusPlayers {
            max: status.max_players,
            online: status.online_players,
        },
        description: ChatText { text: &status.motd },
    })?)
}

async fn next_packet<S>(conn: &mut Connection<S>) -> Result<Packet, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn.read_packet().await?.ok_or(ServerError::ConnectionClosed)
}

/// Log in to the upstream server in offline mode.
pub async fn login_upstream<S>(
    conn: &mut Connection<S>,
    host: &str,
    port: u16,
    username: &str,
) -> Result<Identity, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut w = PacketWriter::new(id::handshake::HANDSHAKE);
    w.write_varint(PROTOCOL_VERSION)
        .write_string(host)
        .write_u16(port)
        .write_varint(id::next_state::LOGIN);
    conn.write_packet(&w.finish()).await?;

    let mut w = PacketWriter::new(id::login::LOGIN_START);
    w.write_string(username);
    conn.write_packet(&w.finish()).await?;

    loop {
        let packet = next_packet(conn).await?;
        let mut r = packet.reader();
        match packet.id {
            id::login::SET_COMPRESSION => {
                let threshold = r.read_varint()?;
                debug!("Upstream compression threshold {threshold}");
                conn.set_compression(Some(threshold));
            }
            id::login::LOGIN_SUCCESS => {
                return Ok(Identity {
                    uuid: r.read_string()?,
                    username: r.read_string()?,
                });
            }
            id::login::DISCONNECT => return Err(ServerError::Disconnected(r.read_string()?)),
            id::login::ENCRYPTION_REQUEST => return Err(ServerError::EncryptionRequested),
            other => {
                return Err(ServerError::UnexpectedPacket {
                    phase: "login",
                    id: other,
                })
            }
        }
    }
}

/// Serve a freshly accepted downstream up to the point where it is ready to
/// be attached.
///
/// Status pings are answered and end the connection with `Ok(None)`. For a
/// login the compression threshold is applied and the username returned;
/// login success is left to the relay.
pub async fn accept_downstream<S>(
    conn: &mut Connection<S>,
    status: &StatusInfo,
    compression: Option<i32>,
) -> Result<Option<String>, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handshake = next_packet(conn).await?;
    if handshake.id != id::handshake::HANDSHAKE {
        return Err(ServerError::UnexpectedPacket {
            phase: "handshake",
            id: handshake.id,
        });
    }
    let mut r = handshake.reader();
    let protocol = r.read_varint()?;
    let _host = r.read_string()?;
    let _port = r.read_u16()?;
    let next_state = r.read_varint()?;

    match next_state {
        id::next_state::STATUS => {
            serve_status(conn, status).await?;
            Ok(None)
        }
        id::next_state::LOGIN => {
            if protocol != PROTOCOL_VERSION {
                let reason = serde_json::to_string(&ChatText {
                    text: &format!("This relay runs Minecraft {GAME_VERSION}"),
                })?;
                let mut w = PacketWriter::new(id::login::DISCONNECT);
                w.write_string(&reason);
                conn.write_packet(&w.finish()).await?;
                return Err(ServerError::UnsupportedProtocol(protocol));
            }

            let start = next_packet(conn).await?;
            if start.id != id::login::LOGIN_START {
                return Err(ServerError::UnexpectedPacket {
                    phase: "login",
                    id: start.id,
                });
            }
            let username = start.reader().read_string()?;

            if let Some(threshold) = compression {
                let mut w = PacketWriter::new(id::login::SET_COMPRESSION);
                w.write_varint(threshold);
                conn.write_packet(&w.finish()).await?;
                conn.set_compression(Some(threshold));
            }
            Ok(Some(username))
        }
        other => Err(ServerError::InvalidNextState(other)),
    }
}

async fn serve_status<S>(conn: &mut Connection<S>, status: &StatusInfo) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(packet) = conn.read_packet().await? {
        match packet.id {
            id::status::REQUEST => {
                let mut w = PacketWriter::new(id::status::RESPONSE);
                w.write_string(&status_json(status)?);
                conn.write_packet(&w.finish()).await?;
            }
            id::status::PING => {
                let mut w = PacketWriter::new(id::status::PONG);
                w.write_i64(packet.reader().read_i64()?);
                conn.write_packet(&w.finish()).await?;
                return Ok(());
            }
            other => {
                return Err(ServerError::UnexpectedPacket {
                    phase: "status",
                    id: other,
                })
            }
        }
    }
    Ok(())
}
