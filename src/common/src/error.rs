use serde::Serialize;

use crate::model::game::UnitType;

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Which side of the connection an inventory check failed for.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Mine,
    Theirs,
}

/// Everything that can break a match mid-protocol. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed commit: {token:?} is not a unit index")]
    MalformedCommit { token: String },

    #[error("malformed unit count: {token:?}")]
    MalformedCount { token: String },

    #[error("peer sent a line longer than {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("unexpected end of stream while waiting for {expecting}")]
    UnexpectedEndOfStream { expecting: &'static str },

    #[error("inventory guard violated: {side:?} committed {unit} with {remaining} left")]
    InventoryGuardViolation {
        side: Side,
        unit: UnitType,
        remaining: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Short machine-friendly kind, used in JSON reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::MalformedCommit { .. } => "malformed_commit",
            ProtocolError::MalformedCount { .. } => "malformed_count",
            ProtocolError::LineTooLong { .. } => "line_too_long",
            ProtocolError::UnexpectedEndOfStream { .. } => "unexpected_end_of_stream",
            ProtocolError::InventoryGuardViolation { .. } => "inventory_guard_violation",
            ProtocolError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ProtocolError::MalformedCommit {
            token: "7".to_owned(),
        };
        assert_eq!(err.to_string(), "malformed commit: \"7\" is not a unit index");

        let err = ProtocolError::UnexpectedEndOfStream {
            expecting: "unit index",
        };
        assert_eq!(
            err.to_string(),
            "unexpected end of stream while waiting for unit index"
        );

        let err = ProtocolError::InventoryGuardViolation {
            side: Side::Mine,
            unit: UnitType::Bomber,
            remaining: 0,
        };
        assert_eq!(
            err.to_string(),
            "inventory guard violated: Mine committed BOMBER with 0 left"
        );
        assert_eq!(err.kind(), "inventory_guard_violation");
    }
}
