mod config;
mod error;
mod login;
mod net;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use config::ServerConfig;
use error::ServerError;
use login::StatusInfo;
use net::Connection;
use re_relay::{Downstream, Relay};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Buffered packets per direction between a socket and the relay.
const CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() {
    let config = Arc::new(match ServerConfig::load("relay.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load relay.toml: {e}");
            std::process::exit(1);
        }
    });

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        "re-server v{} relaying {}:{} as {}",
        env!("CARGO_PKG_VERSION"),
        config.upstream.address,
        config.upstream.port,
        config.upstream.username
    );

    if let Err(e) = run(config).await {
        error!("{e}");
        std::process::exit(1);
    }
    info!("Relay shut down.");
}

async fn run(config: Arc<ServerConfig>) -> Result<(), ServerError> {
    let upstream = &config.upstream;
    let stream = TcpStream::connect((upstream.address.as_str(), upstream.port)).await?;
    stream.set_nodelay(true)?;
    let mut conn = Connection::new(stream, format!("{}:{}", upstream.address, upstream.port));
    let identity =
        login::login_upstream(&mut conn, &upstream.address, upstream.port, &upstream.username)
            .await?;
    info!(
        "Logged in upstream as {} ({})",
        identity.username, identity.uuid
    );

    let (upstream_tx, upstream_rx) = conn.into_channels(CHANNEL_CAPACITY);
    let relay = Relay::new(identity, config.relay.relay_config(), upstream_tx);

    let upstream_task = tokio::spawn({
        let relay = relay.clone();
        async move {
            if let Err(e) = relay.run_upstream(upstream_rx).await {
                warn!("Upstream relay stopped: {e}");
            }
        }
    });

    // Handle Ctrl+C
    tokio::spawn({
        let relay = relay.clone();
        async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
            relay.close();
        }
    });

    let listen = &config.listen;
    let listener = TcpListener::bind((listen.address.as_str(), listen.port)).await?;
    info!("Listening for viewers on {}:{}", listen.address, listen.port);

    let online = Arc::new(AtomicU32::new(0));
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Connection from {peer}");
                    let _ = stream.set_nodelay(true);
                    let conn = Connection::new(stream, peer.to_string());
                    tokio::spawn(serve_downstream(conn, relay.clone(), config.clone(), online.clone()));
                }
                Err(e) => warn!("Accept error: {e}"),
            },
            _ = relay.closed() => break,
        }
    }

    let _ = upstream_task.await;
    Ok(())
}

async fn serve_downstream(
    mut conn: Connection<TcpStream>,
    relay: Relay,
    config: Arc<ServerConfig>,
    online: Arc<AtomicU32>,
) {
    let status = StatusInfo {
        motd: config.listen.motd.clone(),
        max_players: config.listen.max_players,
        online_players: online.load(Ordering::Relaxed),
    };
    let username = match login::accept_downstream(&mut conn, &status, config.listen.compression()).await {
        Ok(Some(username)) => username,
        Ok(None) => return,
        Err(e) => {
            debug!("Handshake with {} failed: {e}", conn.peer());
            return;
        }
    };

    let peer = conn.peer().to_string();
    info!("{username} attached from {peer}");
    let (tx, rx) = conn.into_channels(CHANNEL_CAPACITY);
    online.fetch_add(1, Ordering::Relaxed);
    match relay
        .connect(Downstream { tx, rx }, config.relay.client_eid())
        .await
    {
        Ok(()) => info!("{username} detached from {peer}"),
        Err(e) => warn!("{username} ({peer}) dropped: {e}"),
    }
    online.fetch_sub(1, Ordering::Relaxed);
}
