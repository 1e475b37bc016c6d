// Thin re-export module: implementation is in `blockchain/core.rs`, split by
// responsibility (payloads, blocks, challenges, chain management, validation).

pub mod core;
pub use core::*;
