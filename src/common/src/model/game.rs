use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Number of unit types in play. Dominance is cyclic over this many kinds.
pub const UNIT_TYPE_COUNT: usize = 3;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Tiefighter,
    Bomber,
    Destroyer,
}

impl UnitType {
    pub const ALL: [UnitType; UNIT_TYPE_COUNT] =
        [UnitType::Tiefighter, UnitType::Bomber, UnitType::Destroyer];

    pub fn index(self) -> usize {
        match self {
            UnitType::Tiefighter => 0,
            UnitType::Bomber => 1,
            UnitType::Destroyer => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<UnitType> {
        Self::ALL.get(index).copied()
    }

    /// Strict wire parse: a bare decimal index in `[0, UNIT_TYPE_COUNT)`.
    pub fn parse_token(token: &str) -> Result<UnitType> {
        token
            .parse::<usize>()
            .ok()
            .and_then(Self::from_index)
            .ok_or_else(|| ProtocolError::MalformedCommit {
                token: token.to_owned(),
            })
    }

    /// Display name sent alongside the index. Advisory only.
    pub fn name(self) -> &'static str {
        match self {
            UnitType::Tiefighter => "TIEFIGHTER",
            UnitType::Bomber => "BOMBER",
            UnitType::Destroyer => "DESTROYER",
        }
    }

    /// Looks up a unit by its display name, ignoring case.
    pub fn from_name(name: &str) -> Option<UnitType> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.name().eq_ignore_ascii_case(name.trim()))
    }

    /// The unit that defeats `self`.
    pub fn counter(self) -> UnitType {
        Self::ALL[(self.index() + 2) % UNIT_TYPE_COUNT]
    }

    pub fn beats(self, other: UnitType) -> bool {
        resolve(self, other) == Outcome::Win
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Draw,
    Win,
    Loss,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Draw, Outcome::Win, Outcome::Loss];

    fn from_code(code: usize) -> Outcome {
        match code {
            0 => Outcome::Draw,
            1 => Outcome::Win,
            _ => Outcome::Loss,
        }
    }

    /// Console label, as printed in round and summary lines.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Draw => "Draw",
            Outcome::Win => "Success!",
            Outcome::Loss => "Failure :-(",
        }
    }
}

/// Battle rule: `(3 + theirs - mine) mod 3`, read from `mine`'s point of view.
/// Unit `i` defeats `i + 1` and loses to `i + 2`.
pub fn resolve(mine: UnitType, theirs: UnitType) -> Outcome {
    Outcome::from_code((UNIT_TYPE_COUNT + theirs.index() - mine.index()) % UNIT_TYPE_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit() -> impl Strategy<Value = UnitType> {
        (0..UNIT_TYPE_COUNT).prop_map(|i| UnitType::ALL[i])
    }

    #[test]
    fn test_dominance_table() {
        use UnitType::*;
        assert_eq!(resolve(Tiefighter, Bomber), Outcome::Win);
        assert_eq!(resolve(Bomber, Destroyer), Outcome::Win);
        assert_eq!(resolve(Destroyer, Tiefighter), Outcome::Win);
        assert_eq!(resolve(Bomber, Tiefighter), Outcome::Loss);
        assert_eq!(resolve(Destroyer, Destroyer), Outcome::Draw);
    }

    #[test]
    fn test_parse_token() {
        assert_eq!(UnitType::parse_token("0").unwrap(), UnitType::Tiefighter);
        assert_eq!(UnitType::parse_token("2").unwrap(), UnitType::Destroyer);
        for bad in ["3", "-1", "", " 1", "BOMBER", "1.0"] {
            assert!(
                matches!(
                    UnitType::parse_token(bad),
                    Err(ProtocolError::MalformedCommit { .. })
                ),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(UnitType::from_name("bomber"), Some(UnitType::Bomber));
        assert_eq!(UnitType::from_name("Are you cheating?"), None);
    }

    #[test]
    fn test_counter_beats_original() {
        for unit in UnitType::ALL {
            assert!(unit.counter().beats(unit));
        }
    }

    proptest! {
        #[test]
        fn resolve_matches_formula(mine in unit(), theirs in unit()) {
            let code = (3 + theirs.index() - mine.index()) % 3;
            prop_assert_eq!(resolve(mine, theirs), Outcome::ALL[code]);
        }

        #[test]
        fn resolve_is_reflexive_draw(unit in unit()) {
            prop_assert_eq!(resolve(unit, unit), Outcome::Draw);
        }

        #[test]
        fn dominance_is_cyclic(mine in unit()) {
            let next = UnitType::ALL[(mine.index() + 1) % 3];
            let prev = UnitType::ALL[(mine.index() + 2) % 3];
            prop_assert_eq!(resolve(mine, next), Outcome::Win);
            prop_assert_eq!(resolve(mine, prev), Outcome::Loss);
        }

        #[test]
        fn resolve_is_antisymmetric(a in unit(), b in unit()) {
            let flipped = match resolve(a, b) {
                Outcome::Win => Outcome::Loss,
                Outcome::Loss => Outcome::Win,
                Outcome::Draw => Outcome::Draw,
            };
            prop_assert_eq!(resolve(b, a), flipped);
        }
    }
}
