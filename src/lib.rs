//! Community flood-report board.
//!
//! Residents report whether their street is flooded through a web form or a
//! LINE chat bot; the board aggregates recent reports into one status.

pub mod analysis;
pub mod categories;
pub mod config;
pub mod line;
pub mod logging;
pub mod model;
pub mod store;
pub mod web;
