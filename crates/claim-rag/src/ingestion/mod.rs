//! Corpus loading and index persistence

pub mod corpus;
pub mod snapshot;

pub use corpus::{load_csv, read_csv};
