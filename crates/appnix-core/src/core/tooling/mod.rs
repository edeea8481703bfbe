//! Outcome shaping and the typed errors surfaced to the CLI.

pub mod errors;
pub mod outcome;
