//! Built-in demo games.

pub mod duel;

pub use duel::{DuelCore, DuelGame, DuelGameBuilder};
