// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// chain management, validation, balance replay and the shared-writer wrapper.

pub mod core;
pub use self::core::*;
