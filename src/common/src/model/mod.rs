pub mod game;
pub mod inventory;
pub mod messages;
