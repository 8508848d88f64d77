use std::io;

use agent::{config::MatchConfig, session::Role};
use common::utility::{init_tracing, random_address};
use tokio::{
    net::TcpListener,
    sync::{broadcast, oneshot},
    task::JoinSet,
};
use tracing::{error, info, warn, Level};

use crate::service::{duel::run_duel, roster::Roster};

/// Accepts challengers until shutdown, playing each one as the authoritative side.
pub async fn serve(
    address: String,
    config: MatchConfig,
    roster: Roster,
    mut shutdown_receiver: broadcast::Receiver<()>,
    ready_signal: Option<oneshot::Sender<()>>,
) -> io::Result<()> {
    let listener = TcpListener::bind(&address).await?;
    info!("Listening on {}", address);

    // Signal that the server is ready
    if let Some(ready_signal) = ready_signal {
        if ready_signal.send(()).is_err() {
            warn!("Nobody waited for the ready signal");
        }
    }

    let mut matches = JoinSet::new();
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Err(e) => {
                        error!("Failed to accept connection on {}: {}", address, e);
                    }
                    Ok((stream, peer)) => {
                        info!("New connection: {}", peer);
                        let host = peer.ip().to_string();
                        let config = config.clone();
                        let roster = roster.clone();
                        matches.spawn(async move {
                            roster.record_attempt(&host).await;
                            let outcome = run_duel(stream, Role::Authoritative, config).await;
                            roster.record_outcome(&host, &outcome).await;
                        });
                    }
                }
            },
            Some(joined) = matches.join_next(), if !matches.is_empty() => {
                if let Err(e) = joined {
                    error!("Match task failed: {}", e);
                }
            },
            _ = shutdown_receiver.recv() => {
                break;
            }
        };
    }
    if !matches.is_empty() {
        info!("Dropping {} matches in progress", matches.len());
    }
    matches.shutdown().await;
    info!("Exited listener");
    Ok(())
}

/// In-process server on a random local port.
pub struct ArenaServer {
    pub address: String,
    pub roster: Roster,
    shutdown_sender: broadcast::Sender<()>,
}

impl ArenaServer {
    pub async fn new(config: MatchConfig) -> io::Result<Self> {
        init_tracing(Level::DEBUG);

        let (shutdown_sender, shutdown_receiver) = broadcast::channel(1);
        let (ready_sender, ready_receiver) = oneshot::channel();

        let address = random_address().await?;
        let roster = Roster::new();
        let handle = tokio::spawn(serve(
            address.clone(),
            config,
            roster.clone(),
            shutdown_receiver,
            Some(ready_sender),
        ));

        // Wait for server to be ready
        if ready_receiver.await.is_err() {
            return match handle.await {
                Ok(Err(e)) => Err(e),
                _ => Err(io::Error::other("server exited before it was ready")),
            };
        }

        Ok(ArenaServer {
            address,
            roster,
            shutdown_sender,
        })
    }

    pub fn shutdown(&self) {
        // Err only if the server already stopped.
        let _ = self.shutdown_sender.send(());
    }
}
