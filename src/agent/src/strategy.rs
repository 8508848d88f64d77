use std::time::Duration;

use async_trait::async_trait;
use common::{
    codec::{Peek, PeerPeek},
    error::Result,
    model::{game::UnitType, messages::RoundCommit},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, warn};

use crate::{
    config::{PeekConfig, StrategyConfig},
    session::SessionView,
};

/// What to send this round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub commit: RoundCommit,
    /// The peer's unit index, if it was already read while deciding.
    pub peeked: Option<UnitType>,
}

impl Decision {
    pub fn plain(commit: RoundCommit) -> Self {
        Decision {
            commit,
            peeked: None,
        }
    }
}

#[async_trait]
pub trait MoveStrategy: Send {
    fn name(&self) -> &'static str;

    /// Chooses this round's commit. Only strategies that peek touch `peer`.
    async fn decide(
        &mut self,
        view: &SessionView<'_>,
        peer: &mut dyn PeerPeek,
    ) -> Result<Decision>;

    /// Whether the peer looked like it waits for our commit before sending its own.
    fn read_ahead_suspected(&self) -> bool {
        false
    }
}

pub fn from_config(config: &StrategyConfig, seed: Option<u64>) -> Box<dyn MoveStrategy> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    match config {
        StrategyConfig::Random => Box::new(RandomPick::new(rng)),
        StrategyConfig::RoundRobin => Box::new(RoundRobin {}),
        StrategyConfig::Fixed { unit } => Box::new(Fixed::new(*unit)),
        StrategyConfig::PeekAndCounter(peek) => Box::new(PeekAndCounter::new(peek.clone(), rng)),
    }
}

// Trivial strategies
pub struct Fixed {
    unit: UnitType,
}
impl Fixed {
    pub fn new(unit: UnitType) -> Self {
        Fixed { unit }
    }
}
#[async_trait]
impl MoveStrategy for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn decide(
        &mut self,
        _view: &SessionView<'_>,
        _peer: &mut dyn PeerPeek,
    ) -> Result<Decision> {
        Ok(Decision::plain(RoundCommit::new(self.unit)))
    }
}

/// Cycles through the unit types by round number, ignoring depletion.
pub struct RoundRobin {}
#[async_trait]
impl MoveStrategy for RoundRobin {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    async fn decide(
        &mut self,
        view: &SessionView<'_>,
        _peer: &mut dyn PeerPeek,
    ) -> Result<Decision> {
        let unit = UnitType::ALL[view.round as usize % UnitType::ALL.len()];
        Ok(Decision::plain(RoundCommit::new(unit)))
    }
}

// Random
pub struct RandomPick {
    rng: StdRng,
}
impl RandomPick {
    pub fn new(rng: StdRng) -> Self {
        RandomPick { rng }
    }
}
#[async_trait]
impl MoveStrategy for RandomPick {
    fn name(&self) -> &'static str {
        "random"
    }

    async fn decide(
        &mut self,
        view: &SessionView<'_>,
        _peer: &mut dyn PeerPeek,
    ) -> Result<Decision> {
        let unit = random_unit(&mut self.rng, view);
        Ok(Decision::plain(RoundCommit::new(unit)))
    }
}

/// Uniform over all units, or over the units still in stock when depleting.
fn random_unit(rng: &mut StdRng, view: &SessionView<'_>) -> UnitType {
    if view.depleting {
        let available = view.mine.available();
        if !available.is_empty() {
            return available[rng.random_range(0..available.len())];
        }
    }
    UnitType::ALL[rng.random_range(0..UnitType::ALL.len())]
}

/// Waits a little for the peer's commit before sending ours. If it shows up,
/// answer with the unit that beats it; otherwise wait longer next time.
///
/// Waiting in vain all the way up to the ceiling means the peer never sends
/// first, which is what a peer reading our commit before its own would do.
pub struct PeekAndCounter {
    config: PeekConfig,
    rng: StdRng,
    probability: f64,
    timeout: Duration,
    suspected: bool,
}

impl PeekAndCounter {
    pub fn new(config: PeekConfig, rng: StdRng) -> Self {
        // `random_bool` panics outside [0, 1]; unvalidated configs get clamped.
        let probability = if config.peek_probability.is_nan() {
            0.0
        } else {
            config.peek_probability.clamp(0.0, 1.0)
        };
        PeekAndCounter {
            timeout: config.initial_timeout(),
            probability,
            config,
            rng,
            suspected: false,
        }
    }

    /// Current wait applied to the next peek.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn escalate(&mut self) {
        let ceiling = self.config.timeout_ceiling();
        self.timeout = (self.timeout + self.config.timeout_increment()).min(ceiling);
        if self.timeout >= ceiling && !self.suspected {
            self.suspected = true;
            warn!(
                "Peer never committed first within {:?}, it may be reading ahead",
                ceiling
            );
        }
    }

    fn counter(&mut self, theirs: UnitType, view: &SessionView<'_>) -> UnitType {
        let counter = theirs.counter();
        if view.depleting && !view.mine.has(counter) {
            return random_unit(&mut self.rng, view);
        }
        counter
    }

    fn commit(&self, unit: UnitType) -> RoundCommit {
        match (&self.config.probe_marker, self.suspected) {
            (Some(marker), true) => RoundCommit::with_label(unit, marker.clone()),
            _ => RoundCommit::new(unit),
        }
    }
}

#[async_trait]
impl MoveStrategy for PeekAndCounter {
    fn name(&self) -> &'static str {
        "peek_and_counter"
    }

    async fn decide(
        &mut self,
        view: &SessionView<'_>,
        peer: &mut dyn PeerPeek,
    ) -> Result<Decision> {
        if !self.rng.random_bool(self.probability) {
            let unit = random_unit(&mut self.rng, view);
            return Ok(Decision::plain(self.commit(unit)));
        }

        match peer.peek_commit(self.timeout).await? {
            Peek::Available(theirs) => {
                let unit = self.counter(theirs, view);
                debug!("Peer committed {} early, answering {}", theirs, unit);
                Ok(Decision {
                    commit: self.commit(unit),
                    peeked: Some(theirs),
                })
            }
            Peek::TimedOut => {
                self.escalate();
                let unit = random_unit(&mut self.rng, view);
                Ok(Decision::plain(self.commit(unit)))
            }
        }
    }

    fn read_ahead_suspected(&self) -> bool {
        self.suspected
    }
}
