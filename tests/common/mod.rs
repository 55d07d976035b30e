//! Shared helpers for the integration tests.
//!
//! Every test works on a real temporary repository and, for the binary, an
//! isolated config path and no colours.

pub mod assertions;
pub mod fixtures;
pub mod repository;
