//! One connection, one match.
//!
//! The session owns both stream halves, the opponent's self-reported name and
//! the per-match counters. It never retries: any protocol error leaves the
//! session unusable and is handed back to the caller.

use common::{
    codec::{FrameReader, FrameWriter},
    error::{ProtocolError, Result, Side},
    model::{
        game::{resolve, Outcome, UnitType, UNIT_TYPE_COUNT},
        inventory::Inventory,
        messages::{RoundCommit, SessionId},
    },
};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::{
    config::{InventoryExchange, MatchConfig},
    strategy::MoveStrategy,
};

/// Connection role. The authoritative side announces starting inventories
/// when they are negotiated; the listener plays this role.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Authoritative,
    Follower,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub round: u32,
    pub mine: RoundCommit,
    pub theirs: RoundCommit,
    pub outcome: Outcome,
    /// True when the peer's commit was read before ours was sent.
    pub read_ahead: bool,
}

/// What a strategy may look at when deciding.
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    /// 1-based number of the round being decided.
    pub round: u32,
    pub depleting: bool,
    pub mine: &'a Inventory,
    pub theirs: &'a Inventory,
    pub history: &'a [RoundReport],
}

pub struct Session<R, W> {
    id: SessionId,
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    opponent: String,
    depleting: bool,
    mine: Inventory,
    theirs: Inventory,
    round: u32,
    draw_streak: u32,
    mislabeled_commits: u32,
    history: Vec<RoundReport>,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Runs the handshake: send our name, then read theirs, then settle the
    /// starting inventories.
    pub async fn open(reader: R, writer: W, role: Role, config: &MatchConfig) -> Result<Self> {
        let id = SessionId::new();
        let mut reader = FrameReader::new(reader);
        let mut writer = FrameWriter::new(writer);

        let tagged = config.tag_roles && role == Role::Authoritative;
        let name = if tagged {
            format!("{}-as-server", config.name)
        } else {
            config.name.clone()
        };

        // Write and flush before reading, on both ends.
        writer.write_token(&name).await?;
        let mut opponent = reader.expect_token("opponent name").await?;
        if tagged {
            opponent.push_str("-as-client");
        }
        debug!(session = %id, "Handshake with {} as {:?}", opponent, role);

        let depleting = config.rules.is_depleting();
        let start = match (depleting, config.inventory_exchange, role) {
            (true, InventoryExchange::Negotiated, Role::Authoritative) => {
                let counts = config.starting_inventory.0.map(|count| count.to_string());
                writer.write_tokens(counts).await?;
                config.starting_inventory
            }
            (true, InventoryExchange::Negotiated, Role::Follower) => {
                let mut counts = [0u32; UNIT_TYPE_COUNT];
                for count in counts.iter_mut() {
                    *count = reader.read_count().await?;
                }
                Inventory::new(counts)
            }
            _ => config.starting_inventory,
        };

        Ok(Session {
            id,
            reader,
            writer,
            opponent,
            depleting,
            mine: start,
            theirs: start,
            round: 0,
            draw_streak: 0,
            mislabeled_commits: 0,
            history: Vec::new(),
        })
    }

    /// Plays one round. Either both commits are exchanged and the outcome
    /// applied, or an error is returned and the session is done.
    pub async fn play_round(&mut self, strategy: &mut dyn MoveStrategy) -> Result<RoundReport> {
        let round = self.round + 1;
        let view = SessionView {
            round,
            depleting: self.depleting,
            mine: &self.mine,
            theirs: &self.theirs,
            history: &self.history,
        };
        let decision = strategy.decide(&view, &mut self.reader).await?;

        let mine = decision.commit;
        if self.depleting && !self.mine.has(mine.unit) {
            return Err(ProtocolError::InventoryGuardViolation {
                side: Side::Mine,
                unit: mine.unit,
                remaining: self.mine.count(mine.unit),
            });
        }
        self.writer.write_tokens(mine.tokens()).await?;

        let their_unit = match decision.peeked {
            Some(unit) => unit,
            None => self.reader.read_unit().await?,
        };
        let label = self.reader.expect_token("unit label").await?;
        let theirs = RoundCommit::with_label(their_unit, label);
        if self.depleting && !self.theirs.has(theirs.unit) {
            return Err(ProtocolError::InventoryGuardViolation {
                side: Side::Theirs,
                unit: theirs.unit,
                remaining: self.theirs.count(theirs.unit),
            });
        }
        if theirs.is_mislabeled() {
            self.mislabeled_commits += 1;
            warn!(
                session = %self.id,
                "{} sent index {} labelled {:?}",
                self.opponent,
                theirs.unit.index(),
                theirs.label
            );
        }

        let outcome = resolve(mine.unit, theirs.unit);
        self.apply(outcome, mine.unit, theirs.unit);
        self.round = round;

        info!(
            "  Round {} against {}: {} vs {}: {}",
            round,
            self.opponent,
            mine.unit.name(),
            theirs.label,
            outcome.label()
        );

        let report = RoundReport {
            round,
            mine,
            theirs,
            outcome,
            read_ahead: decision.peeked.is_some(),
        };
        self.history.push(report.clone());
        Ok(report)
    }

    fn apply(&mut self, outcome: Outcome, mine: UnitType, theirs: UnitType) {
        match outcome {
            Outcome::Draw => self.draw_streak += 1,
            Outcome::Win => {
                self.draw_streak = 0;
                if self.depleting {
                    self.theirs.deplete(theirs);
                }
            }
            Outcome::Loss => {
                self.draw_streak = 0;
                if self.depleting {
                    self.mine.deplete(mine);
                }
            }
        }
    }

    /// Closes our write half. The peer sees end-of-stream.
    pub async fn close(mut self) -> Result<()> {
        self.writer.shutdown().await
    }
}

impl<R, W> Session<R, W> {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn opponent(&self) -> &str {
        &self.opponent
    }

    pub fn is_depleting(&self) -> bool {
        self.depleting
    }

    pub fn mine(&self) -> &Inventory {
        &self.mine
    }

    pub fn theirs(&self) -> &Inventory {
        &self.theirs
    }

    /// Rounds completed so far.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn draw_streak(&self) -> u32 {
        self.draw_streak
    }

    pub fn mislabeled_commits(&self) -> u32 {
        self.mislabeled_commits
    }

    pub fn history(&self) -> &[RoundReport] {
        &self.history
    }
}
