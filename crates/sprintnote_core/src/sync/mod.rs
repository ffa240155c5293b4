//! Sync orchestration against the managed cloud backend.
//!
//! # Responsibility
//! - Define the backend contract and its failure envelope.
//! - Own zone creation, change subscriptions and collaborator onboarding.
//! - Publish background outcomes as events.
//!
//! # Invariants
//! - Remote failures are observable (logs + events) but never panic or
//!   propagate as caller errors.

pub mod backend;
pub mod events;
pub mod memory;
pub mod retry;
pub mod zone_manager;
