//! Display-set and protocol matching.
//!
//! Scores candidates with the [`rules`](crate::rules) evaluator and ranks
//! them with a sequential multi-key [`CandidateRanker`]:
//!
//! - **Display sets**: score descending, then study instance uid
//!   descending, then series number ascending
//! - **Protocols**: protocol-level rule score descending, stable
//!
//! # Design
//!
//! Matching is a pure function of the studies, display sets and attribute
//! table handed to [`MatchingEngine`]. Callers decide where the resulting
//! [`DisplaySetMatchDetails`] are stored.

mod engine;
mod ranking;
mod types;

pub use engine::MatchingEngine;
pub use ranking::{CandidateRanker, RankKey};
pub use types::{DisplaySetMatchDetails, MatchCandidate, ProtocolMatch, Ranked};
