//! Retrieval Eval - hybrid retrieval dispatch and human evaluation recorder
//!
//! Resolves model identifiers into retrieval plans, fans a question out to the
//! proposition, summary and question collections, merges the ranked hits, and
//! records human relevance judgments of what was shown.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod formatter;
pub mod identifier;
pub mod retrieval;
pub mod server;

pub use error::{EvalError, Result};
