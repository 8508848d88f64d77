use std::{collections::HashMap, sync::Arc};

use agent::controller::MatchOutcome;
use itertools::Itertools;
use serde::Serialize;
use tokio::sync::Mutex;

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpponentRecord {
    pub attempts: u32,
    pub completed: u32,
    pub successes: u32,
    pub aborted: u32,
}

/// Per-host match counts, shared between every task the orchestrator spawns.
#[derive(Clone, Default)]
pub struct Roster {
    records: Arc<Mutex<HashMap<String, OpponentRecord>>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection was attempted, whether or not a match followed.
    pub async fn record_attempt(&self, host: &str) {
        self.records
            .lock()
            .await
            .entry(host.to_owned())
            .or_default()
            .attempts += 1;
    }

    pub async fn record_outcome(&self, host: &str, outcome: &MatchOutcome) {
        let mut records = self.records.lock().await;
        let record = records.entry(host.to_owned()).or_default();
        match outcome {
            MatchOutcome::Completed(_) => {
                record.completed += 1;
                if outcome.is_success() {
                    record.successes += 1;
                }
            }
            MatchOutcome::Aborted(_) => record.aborted += 1,
        }
    }

    pub async fn get(&self, host: &str) -> Option<OpponentRecord> {
        self.records.lock().await.get(host).copied()
    }

    /// Sorted by host.
    pub async fn snapshot(&self) -> Vec<(String, OpponentRecord)> {
        self.records
            .lock()
            .await
            .iter()
            .map(|(host, record)| (host.clone(), *record))
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .collect()
    }

    pub async fn table(&self) -> Vec<String> {
        self.snapshot()
            .await
            .into_iter()
            .map(|(host, record)| format!("{} : {}", host, record.completed))
            .collect()
    }
}
