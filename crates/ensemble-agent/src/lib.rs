//! The agent invoker seam for the Ensemble orchestrator.
//!
//! The orchestrator never calls an LLM, tool, or service directly. It talks
//! to a single capability interface, [`AgentInvoker`], and a mapping from
//! [`AgentCategory`](ensemble_core::AgentCategory) to a configured invoker
//! instance, the [`InvokerRegistry`]. Whether an invoker wraps a hosted
//! model, a local process, or a scripted test double is a construction-time
//! decision.
//!
//! # Main types
//!
//! - [`AgentInvoker`] — `invoke(category, prompt) -> Invocation` seam.
//! - [`Invocation`] — Output plus the invoker-reported cost and token usage.
//! - [`InvokerRegistry`] — Category-to-invoker mapping, built once.
//! - [`InvokerProfile`] — Per-category prompt preamble as plain data.
//! - [`ScriptedInvoker`] — Deterministic invoker for tests and demos.

/// The `AgentInvoker` trait and its response type.
pub mod invoker;
/// Data-driven per-category specialization.
pub mod profiles;
/// Category-to-invoker mapping.
pub mod registry;
/// Deterministic scripted invoker.
pub mod scripted;

pub use invoker::{AgentInvoker, Invocation};
pub use profiles::{default_profiles, InvokerProfile, ProfileSet};
pub use registry::InvokerRegistry;
pub use scripted::{ScriptedInvoker, ScriptedResponse};
