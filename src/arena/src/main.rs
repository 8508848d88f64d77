use std::{path::PathBuf, time::Duration};

use agent::{
    config::MatchConfig,
    controller::MatchOutcome,
    session::Role,
};
use anyhow::{bail, Context, Result};
use arena::{
    entrypoint::serve,
    service::{
        duel::{address_of, challenge, run_duel},
        poller::{self, PollSettings},
        roster::Roster,
    },
};
use clap::{Parser, Subcommand};
use common::utility::{create_shutdown_channel, init_tracing};
use tokio::net::TcpListener;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "arena", version, about = "Two-player fleet battles over TCP")]
struct Cli {
    /// JSON match configuration. Defaults apply to every missing field.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Name announced to opponents.
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
    /// Print match outcomes as JSON on stdout.
    #[arg(long)]
    json: bool,
    /// When listening, suffix names with `-as-server` / `-as-client`.
    #[arg(long)]
    tag_roles: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play against ourselves over loopback.
    Local,
    /// Accept challengers until interrupted.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },
    /// Play one match against a listening host.
    Connect { host: String },
    /// Challenge every host in parallel, once per interval.
    Poll {
        #[arg(required = true)]
        hosts: Vec<String>,
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
        #[arg(long, default_value_t = 1000)]
        connect_timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    let mut config = match &cli.config {
        Some(path) => MatchConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => MatchConfig::default(),
    };
    if let Some(name) = cli.name {
        config.name = name;
    }
    config.tag_roles |= cli.tag_roles;
    config.validate().context("validate config")?;

    match cli.command {
        Command::Local => {
            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .context("bind loopback listener")?;
            let address = listener.local_addr()?.to_string();
            let host_config = config.clone();
            let host = async move {
                let (stream, _) = listener.accept().await?;
                anyhow::Ok(run_duel(stream, Role::Authoritative, host_config).await)
            };
            let guest = challenge(&address, config, Duration::from_secs(1));
            let (host, guest) = tokio::join!(host, guest);
            let (host, guest) = (host?, guest?);
            report(&[&host, &guest], cli.json)?;
        }
        Command::Serve { bind } => {
            let (_shutdown_sender, shutdown_receiver) = create_shutdown_channel();
            let roster = Roster::new();
            serve(
                format!("{}:{}", bind, cli.port),
                config,
                roster.clone(),
                shutdown_receiver,
                None,
            )
            .await
            .context("serve")?;
            for line in roster.table().await {
                info!("{}", line);
            }
        }
        Command::Connect { host } => {
            let address = address_of(&host, cli.port);
            let outcome = challenge(&address, config, Duration::from_secs(10)).await?;
            report(&[&outcome], cli.json)?;
            if let MatchOutcome::Aborted(aborted) = &outcome {
                bail!("match against {} aborted: {}", host, aborted.error);
            }
        }
        Command::Poll {
            hosts,
            interval_secs,
            connect_timeout_ms,
        } => {
            let (_shutdown_sender, shutdown_receiver) = create_shutdown_channel();
            let settings = PollSettings {
                hosts,
                port: cli.port,
                interval: Duration::from_secs(interval_secs),
                connect_timeout: Duration::from_millis(connect_timeout_ms),
            };
            let roster = Roster::new();
            poller::run(settings, config, roster.clone(), shutdown_receiver).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&roster.snapshot().await)?);
            }
        }
    }
    Ok(())
}

/// Summaries already went to the log; JSON goes to stdout on request.
fn report(outcomes: &[&MatchOutcome], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcomes)?);
    }
    Ok(())
}
