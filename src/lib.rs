//! Checkers link (workspace facade crate).
//!
//! Re-exports `checkers_link::{adapter,core,types}` while the implementation
//! lives in dedicated crates under `crates/`.

pub use checkers_link_adapter as adapter;
pub use checkers_link_core as core;
pub use checkers_link_types as types;
