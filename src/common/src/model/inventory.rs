use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::game::{UnitType, UNIT_TYPE_COUNT};

/// Remaining strength per unit type, in `UnitType` order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inventory(pub [u32; UNIT_TYPE_COUNT]);

impl Inventory {
    pub const fn new(counts: [u32; UNIT_TYPE_COUNT]) -> Self {
        Inventory(counts)
    }

    pub fn count(&self, unit: UnitType) -> u32 {
        self.0[unit.index()]
    }

    /// Widened so that no triple of counts can overflow.
    pub fn total(&self) -> u64 {
        self.0.iter().map(|count| u64::from(*count)).sum()
    }

    pub fn has(&self, unit: UnitType) -> bool {
        self.count(unit) > 0
    }

    pub fn available(&self) -> Vec<UnitType> {
        UnitType::ALL
            .into_iter()
            .filter(|unit| self.has(*unit))
            .collect()
    }

    pub fn exhausted_types(&self) -> usize {
        self.0.iter().filter(|count| **count == 0).count()
    }

    /// True once at most one unit type has anything left.
    pub fn is_depleted(&self) -> bool {
        self.exhausted_types() >= UNIT_TYPE_COUNT - 1
    }

    /// Removes one unit of `unit`. Returns false if there was nothing to remove.
    pub fn deplete(&mut self, unit: UnitType) -> bool {
        let slot = &mut self.0[unit.index()];
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }
}

impl From<[u32; UNIT_TYPE_COUNT]> for Inventory {
    fn from(counts: [u32; UNIT_TYPE_COUNT]) -> Self {
        Inventory(counts)
    }
}

// e.g. "3 TIEFIGHTER, 1 DESTROYER, Remaining: 4 ships"
impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = UnitType::ALL
            .into_iter()
            .filter(|unit| self.has(*unit))
            .map(|unit| format!("{} {}, ", self.count(unit), unit.name()))
            .join("");
        write!(f, "{}Remaining: {} ships", units, self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display_skips_empty_units() {
        let inventory = Inventory::new([3, 0, 1]);
        assert_eq!(
            inventory.to_string(),
            "3 TIEFIGHTER, 1 DESTROYER, Remaining: 4 ships"
        );
        assert_eq!(Inventory::default().to_string(), "Remaining: 0 ships");
    }

    #[test]
    fn test_total_of_maximal_counts() {
        let inventory = Inventory::new([u32::MAX, u32::MAX, 0]);
        assert_eq!(inventory.total(), 2 * u64::from(u32::MAX));
        assert_eq!(
            inventory.to_string(),
            "4294967295 TIEFIGHTER, 4294967295 BOMBER, Remaining: 8589934590 ships"
        );
    }

    #[test]
    fn test_depletion_detection() {
        assert!(!Inventory::new([1, 1, 0]).is_depleted());
        assert!(Inventory::new([1, 0, 0]).is_depleted());
        assert!(Inventory::new([0, 0, 0]).is_depleted());
        assert!(!Inventory::new([10, 10, 10]).is_depleted());
    }

    #[test]
    fn test_deplete_stops_at_zero() {
        let mut inventory = Inventory::new([1, 0, 0]);
        assert!(inventory.deplete(UnitType::Tiefighter));
        assert!(!inventory.deplete(UnitType::Tiefighter));
        assert_eq!(inventory, Inventory::default());
    }

    proptest! {
        #[test]
        fn deplete_lowers_total_by_one(
            counts in prop::array::uniform3(1u32..50),
            index in 0usize..3,
        ) {
            let mut inventory = Inventory::new(counts);
            let before = inventory.total();
            prop_assert!(inventory.deplete(UnitType::ALL[index]));
            prop_assert_eq!(inventory.total(), before - 1);
        }

        #[test]
        fn available_matches_nonzero_counts(counts in prop::array::uniform3(0u32..3)) {
            let inventory = Inventory::new(counts);
            let available = inventory.available();
            prop_assert_eq!(available.len(), 3 - inventory.exhausted_types());
            prop_assert!(available.iter().all(|unit| inventory.has(*unit)));
        }
    }
}
