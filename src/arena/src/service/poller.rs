use std::time::Duration;

use agent::config::MatchConfig;
use futures_util::future::join_all;
use tokio::{sync::broadcast, time::sleep};
use tracing::{debug, info, warn};

use super::{
    duel::{address_of, challenge},
    roster::Roster,
};

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub hosts: Vec<String>,
    pub port: u16,
    pub interval: Duration,
    pub connect_timeout: Duration,
}

/// Challenges every host once, all at the same time.
pub async fn poll_once(settings: &PollSettings, config: &MatchConfig, roster: &Roster) {
    let attempts = settings.hosts.iter().map(|host| {
        let config = config.clone();
        let address = address_of(host, settings.port);
        async move {
            roster.record_attempt(host).await;
            match challenge(&address, config, settings.connect_timeout).await {
                Ok(outcome) => roster.record_outcome(host, &outcome).await,
                Err(e) if e.is_refused() => debug!("{} is offline: {}", host, e),
                Err(e) => warn!("{}: {}", host, e),
            }
        }
    });
    join_all(attempts).await;
}

/// Polls until shutdown, logging the roster after every cycle.
pub async fn run(
    settings: PollSettings,
    config: MatchConfig,
    roster: Roster,
    mut shutdown_receiver: broadcast::Receiver<()>,
) {
    info!(
        "Polling {} hosts every {:?}",
        settings.hosts.len(),
        settings.interval
    );
    loop {
        tokio::select! {
            _ = poll_once(&settings, &config, &roster) => {}
            _ = shutdown_receiver.recv() => break,
        }
        for line in roster.table().await {
            info!("{}", line);
        }
        tokio::select! {
            _ = sleep(settings.interval) => {}
            _ = shutdown_receiver.recv() => break,
        }
    }
    info!("Exited poller");
}
