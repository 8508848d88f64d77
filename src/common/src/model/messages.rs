use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::game::UnitType;

/// Local identifier for one session, used to correlate log lines when many
/// matches run at once. Never sent over the wire.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let uuid = Uuid::parse_str(&s).map_err(serde::de::Error::custom)?;
        Ok(SessionId(uuid))
    }
}
impl Serialize for SessionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

/// One side's revealed choice for a round: the index line, then the label line.
/// The index is authoritative; the label is free text from the sender.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoundCommit {
    pub unit: UnitType,
    pub label: String,
}

impl RoundCommit {
    pub fn new(unit: UnitType) -> Self {
        RoundCommit {
            unit,
            label: unit.name().to_owned(),
        }
    }

    pub fn with_label(unit: UnitType, label: impl Into<String>) -> Self {
        RoundCommit {
            unit,
            label: label.into(),
        }
    }

    /// Wire tokens in send order.
    pub fn tokens(&self) -> [String; 2] {
        [self.unit.index().to_string(), self.label.clone()]
    }

    /// A label naming some other known unit than the index does.
    pub fn is_mislabeled(&self) -> bool {
        UnitType::from_name(&self.label).is_some_and(|named| named != self.unit)
    }
}
