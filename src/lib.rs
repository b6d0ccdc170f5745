//! matchpoint — a court reservation engine.
//!
//! Allocates scarce, time-boxed resources (courts, equipment units, coach
//! time) to competing requesters without double-booking, computes a
//! deterministic price for each allocation, and keeps a fair per-slot
//! waitlist that is promoted when a booking is released.
//!
//! The engine is a library: request handling, authentication and
//! notification delivery are the embedder's business. State is held in
//! memory behind per-resource locks and made durable through an
//! append-only WAL that is replayed on startup.

pub mod catalog;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod pricing;
pub mod sweeper;
pub mod wal;
