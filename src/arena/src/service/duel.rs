use std::{io, time::Duration};

use agent::{
    config::MatchConfig,
    controller::{MatchController, MatchOutcome},
    session::Role,
};
use tokio::{net::TcpStream, time::timeout};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("timed out connecting to {address}")]
    Timeout { address: String },

    #[error("failed to connect to {address}")]
    Io {
        address: String,
        #[source]
        source: io::Error,
    },
}

impl ConnectError {
    /// The host is up but nobody listens; the usual case for an offline opponent.
    pub fn is_refused(&self) -> bool {
        matches!(self, ConnectError::Io { source, .. } if source.kind() == io::ErrorKind::ConnectionRefused)
    }
}

/// Plays one match over an established connection.
pub async fn run_duel(stream: TcpStream, role: Role, config: MatchConfig) -> MatchOutcome {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle: {}", e);
    }
    let (read, write) = stream.into_split();
    MatchController::new(config).play(read, write, role).await
}

/// Connects to `address` and plays as the follower.
pub async fn challenge(
    address: &str,
    config: MatchConfig,
    connect_timeout: Duration,
) -> Result<MatchOutcome, ConnectError> {
    let stream = match timeout(connect_timeout, TcpStream::connect(address)).await {
        Err(_) => {
            return Err(ConnectError::Timeout {
                address: address.to_owned(),
            })
        }
        Ok(Err(source)) => {
            return Err(ConnectError::Io {
                address: address.to_owned(),
                source,
            })
        }
        Ok(Ok(stream)) => stream,
    };
    info!("Connected to {}", address);
    Ok(run_duel(stream, Role::Follower, config).await)
}

/// `host` may carry its own port; otherwise `default_port` is used.
pub fn address_of(host: &str, default_port: u16) -> String {
    if host.contains(':') {
        host.to_owned()
    } else {
        format!("{}:{}", host, default_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::utility::random_address;

    #[test]
    fn test_address_of() {
        assert_eq!(address_of("10.0.0.7", 8080), "10.0.0.7:8080");
        assert_eq!(address_of("localhost:9000", 8080), "localhost:9000");
    }

    #[tokio::test]
    async fn test_challenge_refused() {
        // Nothing listens on a freshly picked port.
        let address = random_address().await.unwrap();
        let err = challenge(
            &address,
            MatchConfig::default(),
            Duration::from_millis(1000),
        )
        .await
        .unwrap_err();
        assert!(err.is_refused(), "unexpected error: {:?}", err);
    }
}
