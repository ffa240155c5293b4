//! Flutter-facing bindings for the SprintNote sync core.

pub mod api;
