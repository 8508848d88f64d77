//! Wire-level building blocks shared by the duel engine and the arena:
//! line framing, the battle rule, the data model and protocol errors.

pub mod codec;
pub mod error;
pub mod model;
pub mod utility;
