//! Match targets, context and rule outcomes.

use crate::model::{AttributeValue, DisplaySet, Study};

/// The object a rule set is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum MatchTarget<'a> {
    Study(&'a Study),
    DisplaySet(&'a DisplaySet),
}

impl<'a> MatchTarget<'a> {
    /// Reads the attribute straight from the target's metadata.
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match self {
            MatchTarget::Study(study) => study.attribute(name),
            MatchTarget::DisplaySet(ds) => ds.attribute(name),
        }
    }

    pub fn study(&self) -> Option<&'a Study> {
        match self {
            MatchTarget::Study(study) => Some(study),
            MatchTarget::DisplaySet(_) => None,
        }
    }

    pub fn display_set(&self) -> Option<&'a DisplaySet> {
        match self {
            MatchTarget::DisplaySet(ds) => Some(ds),
            MatchTarget::Study(_) => None,
        }
    }
}

/// Sibling data visible to attribute callbacks.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    /// Every study in the session, in caller order.
    pub studies: &'a [Study],
    /// Display sets belonging to the study being evaluated.
    pub display_sets: &'a [&'a DisplaySet],
}

impl<'a> MatchContext<'a> {
    pub fn new(studies: &'a [Study], display_sets: &'a [&'a DisplaySet]) -> Self {
        Self {
            studies,
            display_sets,
        }
    }
}

/// Diagnostic record of one evaluated rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub rule_id: String,
    pub attribute: String,
    pub weight: f64,
    pub required: bool,
    /// The resolved attribute value the constraint saw.
    pub value: Option<AttributeValue>,
}

/// Result of evaluating a rule set against one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleMatch {
    /// Sum of the weights of satisfied rules.
    pub score: f64,
    pub passed: Vec<RuleOutcome>,
    pub failed: Vec<RuleOutcome>,
    /// At least one `required` rule failed; the target must be excluded.
    pub required_failed: bool,
}

impl RuleMatch {
    /// Merges the diagnostics of `other` into `self` and adds its score.
    pub fn absorb(&mut self, other: &RuleMatch) {
        self.score += other.score;
        self.passed.extend(other.passed.iter().cloned());
        self.failed.extend(other.failed.iter().cloned());
        self.required_failed |= other.required_failed;
    }
}
