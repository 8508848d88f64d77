use common::{
    error::ProtocolError,
    model::{game::Outcome, inventory::Inventory, messages::SessionId},
};
use serde::{Serialize, Serializer};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info};

use crate::{
    config::{MatchConfig, Rules, TiePolicy},
    session::{Role, Session},
    strategy::{self, MoveStrategy},
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Success,
    Failure,
    /// Only produced under `TiePolicy::Neutral`.
    Tie,
}

impl Verdict {
    pub fn status_label(self) -> &'static str {
        match self {
            Verdict::Success => "SUCCESS",
            Verdict::Failure => "FAILURE",
            Verdict::Tie => "TIE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    NotStarted,
    InProgress { rounds: u32 },
    Finished(Verdict),
    Aborted,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    RoundLimit,
    Depleted,
    Stalemate,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub draws: u32,
    pub wins: u32,
    pub losses: u32,
}

impl Tally {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Draw => self.draws += 1,
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
        }
    }

    pub fn count(&self, outcome: Outcome) -> u32 {
        match outcome {
            Outcome::Draw => self.draws,
            Outcome::Win => self.wins,
            Outcome::Loss => self.losses,
        }
    }

    pub fn rounds(&self) -> u32 {
        self.draws + self.wins + self.losses
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct MatchResult {
    pub session: SessionId,
    pub opponent: String,
    pub rounds: u32,
    pub tally: Tally,
    pub mine: Inventory,
    pub theirs: Inventory,
    pub depleting: bool,
    pub reason: StopReason,
    pub verdict: Verdict,
    /// More wins than losses, whatever the rules.
    pub net_success: bool,
    pub read_ahead_suspected: bool,
    pub mislabeled_commits: u32,
}

impl MatchResult {
    /// Console summary, one entry per line.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = Outcome::ALL
            .into_iter()
            .map(|outcome| {
                format!(
                    "Battle against {}: {}/{} {}",
                    self.opponent,
                    self.tally.count(outcome),
                    self.rounds,
                    outcome.label()
                )
            })
            .collect();
        if self.depleting {
            lines.push(format!(
                "End battle status against {}: {}, ({} vs {})",
                self.opponent,
                self.verdict.status_label(),
                self.mine,
                self.theirs
            ));
        }
        lines
    }
}

/// The protocol broke; no score is given.
#[derive(Serialize, Debug)]
pub struct AbnormalTermination {
    pub session: Option<SessionId>,
    pub opponent: Option<String>,
    pub rounds_played: u32,
    pub tally: Tally,
    #[serde(serialize_with = "serialize_error")]
    pub error: ProtocolError,
}

fn serialize_error<S>(error: &ProtocolError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{}: {}", error.kind(), error))
}

#[derive(Serialize, Debug)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    Completed(MatchResult),
    Aborted(AbnormalTermination),
}

impl MatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MatchOutcome::Completed(result) if result.verdict == Verdict::Success)
    }
}

/// Runs the round loop for one session and renders the verdict.
pub struct MatchController {
    config: MatchConfig,
    strategy: Box<dyn MoveStrategy>,
    state: MatchState,
}

impl MatchController {
    pub fn new(config: MatchConfig) -> Self {
        let strategy = strategy::from_config(&config.strategy, config.seed);
        Self::with_strategy(config, strategy)
    }

    pub fn with_strategy(config: MatchConfig, strategy: Box<dyn MoveStrategy>) -> Self {
        MatchController {
            config,
            strategy,
            state: MatchState::NotStarted,
        }
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    /// Handshake, then the full match.
    pub async fn play<R, W>(&mut self, reader: R, writer: W, role: Role) -> MatchOutcome
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        match Session::open(reader, writer, role, &self.config).await {
            Ok(session) => self.run(session).await,
            Err(error) => {
                error!("Handshake failed: {}", error);
                self.state = MatchState::Aborted;
                MatchOutcome::Aborted(AbnormalTermination {
                    session: None,
                    opponent: None,
                    rounds_played: 0,
                    tally: Tally::default(),
                    error,
                })
            }
        }
    }

    pub async fn run<R, W>(&mut self, mut session: Session<R, W>) -> MatchOutcome
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        info!(
            session = %session.id(),
            "Start of game against {} with {} strategy",
            session.opponent(),
            self.strategy.name()
        );
        self.state = MatchState::InProgress { rounds: 0 };
        let mut tally = Tally::default();

        let reason = loop {
            if let Some(reason) = self.stop_reason(&session) {
                break reason;
            }
            match session.play_round(self.strategy.as_mut()).await {
                Ok(report) => {
                    tally.record(report.outcome);
                    self.state = MatchState::InProgress {
                        rounds: session.round(),
                    };
                }
                Err(error) => {
                    error!(
                        session = %session.id(),
                        "Bad end of stream with {} in round {}: {}",
                        session.opponent(),
                        session.round() + 1,
                        error
                    );
                    self.state = MatchState::Aborted;
                    let aborted = AbnormalTermination {
                        session: Some(session.id()),
                        opponent: Some(session.opponent().to_owned()),
                        rounds_played: session.round(),
                        tally,
                        error,
                    };
                    // Best effort: the stream is likely gone already.
                    let _ = session.close().await;
                    return MatchOutcome::Aborted(aborted);
                }
            }
        };

        let verdict = self.verdict(&session, &tally);
        self.state = MatchState::Finished(verdict);
        let result = MatchResult {
            session: session.id(),
            opponent: session.opponent().to_owned(),
            rounds: session.round(),
            tally,
            mine: *session.mine(),
            theirs: *session.theirs(),
            depleting: session.is_depleting(),
            reason,
            verdict,
            net_success: tally.wins > tally.losses,
            read_ahead_suspected: self.strategy.read_ahead_suspected(),
            mislabeled_commits: session.mislabeled_commits(),
        };
        for line in result.summary_lines() {
            info!("{}", line);
        }
        if let Err(e) = session.close().await {
            // The match itself completed; a failed close does not change it.
            error!("Failed to close stream with {}: {}", result.opponent, e);
        }
        MatchOutcome::Completed(result)
    }

    fn stop_reason<R, W>(&self, session: &Session<R, W>) -> Option<StopReason> {
        match self.config.rules {
            Rules::FixedCount { rounds } => {
                (session.round() >= rounds).then_some(StopReason::RoundLimit)
            }
            Rules::Depletion { draw_ceiling } => {
                if session.mine().is_depleted() || session.theirs().is_depleted() {
                    Some(StopReason::Depleted)
                } else if session.draw_streak() >= draw_ceiling {
                    Some(StopReason::Stalemate)
                } else {
                    None
                }
            }
        }
    }

    fn verdict<R, W>(&self, session: &Session<R, W>, tally: &Tally) -> Verdict {
        match self.config.rules {
            Rules::FixedCount { .. } => {
                if tally.wins > tally.losses {
                    Verdict::Success
                } else {
                    Verdict::Failure
                }
            }
            Rules::Depletion { .. } => {
                let (mine, theirs) = (session.mine().total(), session.theirs().total());
                if mine > theirs {
                    Verdict::Success
                } else if mine == theirs && self.config.tie_policy == TiePolicy::Neutral {
                    Verdict::Tie
                } else {
                    Verdict::Failure
                }
            }
        }
    }
}
