//! Local persistence for sync orchestration state.
//!
//! # Responsibility
//! - Define persistence contracts consumed by the zone manager.
//! - Keep file layout and encoding details out of orchestration code.

pub mod collaborator_repo;
