//! Rule evaluation.
//!
//! Evaluates [`MatchingRule`](crate::model::MatchingRule)s against studies
//! and display sets:
//!
//! - **Constraint evaluation**: pure, stateless check of one value
//! - **Rule-set scoring**: sum of the weights of satisfied rules, with
//!   required-rule failure tracking
//! - **Attribute resolution**: a pluggable [`AttributeTable`] computes
//!   synthetic attributes on demand
//!
//! # Design
//!
//! Nothing in this module ranks or stores results; ranking is the job of
//! [`matching`](crate::matching).

mod attributes;
mod evaluator;
mod types;

pub use attributes::{AttributeCallback, AttributeTable, CustomAttribute};
pub use evaluator::{evaluate_constraint, find_match, satisfies_required};
pub use types::{MatchContext, MatchTarget, RuleMatch, RuleOutcome};
