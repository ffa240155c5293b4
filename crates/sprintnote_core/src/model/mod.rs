//! Sync domain model.
//!
//! # Responsibility
//! - Define zone identities, database scopes and the record taxonomy.
//! - Decode inbound change notifications.
//!
//! # Invariants
//! - Model types carry no I/O and no backend handles.

pub mod notification;
pub mod record;
pub mod zone;
