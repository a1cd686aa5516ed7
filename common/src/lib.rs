// Common library for the medication dispenser kiosk: reminder engine and
// the collaborators it is wired to

pub mod auth;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod errors;
pub mod models;
pub mod scheduler;
pub mod storage;
pub mod telemetry;
