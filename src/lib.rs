//! Fathom: relationship signal analytics over a local event store.
//!
//! `db` and `store` own persistence, `signals` holds the pure scoring engines
//! and `services` exposes the report accessors the CLI prints.

pub mod db;
pub mod error;
mod migrations;
pub mod services;
pub mod signals;
pub mod state;
pub mod store;
pub mod types;
pub mod util;
