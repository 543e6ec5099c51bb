//! Chronological team-Elo rating engine for a 2v2 card game.
//!
//! Game outcomes from every group's sessions and tournaments are normalized
//! into one totally ordered event sequence, replayed through a striche-driven
//! team Elo model, and persisted as an idempotent per-player rating ledger
//! with derived snapshots. The same pipeline serves full historical backfill
//! and incremental live updates.

pub mod aggregate;
pub mod config;
pub mod elo;
pub mod event;
pub mod extract;
pub mod ledger;
pub mod pipeline;
pub mod sequence;
pub mod store;
pub mod summary;
pub mod tier;
