//! Core types for the claim pipeline

pub mod chunk;
pub mod decision;
pub mod query;

pub use chunk::{Chunk, PageRef};
pub use decision::{Amount, Decision, JustificationItem, Verdict, NOT_APPLICABLE, NO_DECISION};
pub use query::QueryRequest;
