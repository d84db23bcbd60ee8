//! Framed packet connections over byte streams.
//!
//! Login runs directly on a [`Connection`]. Once a connection reaches the play
//! state it is turned into a pair of channels, with one task decoding inbound
//! frames and another encoding outbound ones.

use bytes::BytesMut;
use re_proto::{FrameCodec, Packet};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::ServerError;

/// Minimum free space requested from the read buffer per read.
const READ_CHUNK: usize = 8192;

pub struct Connection<S> {
    stream: S,
    peer: String,
    codec: FrameCodec,
    read_buf: BytesMut,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream,
            peer: peer.into(),
            codec: FrameCodec::new(),
            read_buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Applies to both directions from the next packet on.
    pub fn set_compression(&mut self, threshold: Option<i32>) {
        self.codec.set_compression(threshold);
    }

    /// Read the next packet. `None` on a clean end of stream.
    pub async fn read_packet(&mut self) -> Result<Option<Packet>, ServerError> {
        loop {
            if let Some(packet) = self.codec.decode(&mut self.read_buf)? {
                return Ok(Some(packet));
            }
            self.read_buf.reserve(READ_CHUNK);
            if self.stream.read_buf(&mut self.read_buf).await? == 0 {
                return if self.read_buf.is_empty() {
                    Ok(None)
                } else {
                    Err(ServerError::ConnectionClosed)
                };
            }
        }
    }

    pub async fn write_packet(&mut self, packet: &Packet) -> Result<(), ServerError> {
        let mut buf = BytesMut::with_capacity(packet.encoded_len() + 5);
        self.codec.encode(packet, &mut buf)?;
        self.stream.write_all(&buf).await?;
        Ok(())
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Hand the connection over to a reader task and a writer task.
    ///
    /// Returns the sender for outbound packets and the receiver for inbound
    /// ones. Dropping the sender shuts the connection down.
    pub fn into_channels(self, capacity: usize) -> (mpsc::Sender<Packet>, mpsc::Receiver<Packet>) {
        let Connection {
            stream,
            peer,
            codec,
            mut read_buf,
        } = self;
        let (mut reader, mut writer) = tokio::io::split(stream);
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Packet>(capacity);

        let read_codec = codec.clone();
        let read_peer = peer.clone();
        let reader_task = tokio::spawn(async move {
            loop {
                match read_codec.decode(&mut read_buf) {
                    Ok(Some(packet)) => {
                        if inbound_tx.send(packet).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        debug!("Bad frame from {read_peer}: {e}");
                        break;
                    }
                }
                read_buf.reserve(READ_CHUNK);
                match reader.read_buf(&mut read_buf).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Read from {read_peer} failed: {e}");
                        break;
                    }
                }
            }
            trace!("Reader for {read_peer} finished");
        });

        tokio::spawn(async move {
            let mut buf = BytesMut::new();
            while let Some(packet) = outbound_rx.recv().await {
                buf.clear();
                if let Err(e) = codec.encode(&packet, &mut buf) {
                    debug!("Dropping packet 0x{:02x} to {peer}: {e}", packet.id);
                    continue;
                }
                if let Err(e) = writer.write_all(&buf).await {
                    debug!("Write to {peer} failed: {e}");
                    break;
                }
            }
            let _ = writer.shutdown().await;
            reader_task.abort();
            trace!("Writer for {peer} finished");
        });

        (outbound_tx, inbound_rx)
    }
}
