//! Policy store (C7) and Decision API (C9) implementation, shared by the
//! `reaper-platform` binary and its benches/tests.

pub mod decision;
pub mod store;

pub use decision::DecisionApi;
pub use store::{PolicyPatch, PolicyStore};
