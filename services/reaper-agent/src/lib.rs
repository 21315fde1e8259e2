//! Sidecar evaluation-only runtime (C9 read path), shared by the
//! `reaper-agent` binary and its benches/tests.

pub mod runtime;

pub use runtime::AgentRuntime;
