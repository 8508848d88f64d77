pub mod duel;
pub mod poller;
pub mod roster;
