//! Candidate and match-detail types.

use crate::rules::RuleMatch;

/// Something that can be ordered by [`CandidateRanker`](super::CandidateRanker).
///
/// Only [`Ranked::score`] is mandatory; the identity keys default to
/// "unknown", which sorts after every known value.
pub trait Ranked {
    /// Combined rule score. Higher is better.
    fn score(&self) -> f64;

    fn study_instance_uid(&self) -> Option<&str> {
        None
    }

    fn series_number(&self) -> Option<i64> {
        None
    }
}

/// One display set that passed a selector's required rules.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub study_instance_uid: String,
    pub series_instance_uid: String,
    pub display_set_instance_uid: String,
    /// Study-level plus series-level rule score.
    pub score: f64,
    pub series_number: Option<i64>,
    /// Passed and failed rules of both levels.
    pub details: RuleMatch,
}

impl Ranked for MatchCandidate {
    fn score(&self) -> f64 {
        self.score
    }

    fn study_instance_uid(&self) -> Option<&str> {
        Some(&self.study_instance_uid)
    }

    fn series_number(&self) -> Option<i64> {
        self.series_number
    }
}

/// Best match of a selector plus the full ranked candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySetMatchDetails {
    pub study_instance_uid: String,
    pub display_set_instance_uid: String,
    pub score: f64,
    pub details: RuleMatch,
    /// Every passing candidate, best first. Never empty.
    pub matching_scores: Vec<MatchCandidate>,
}

impl DisplaySetMatchDetails {
    /// Builds the details from an already-ranked list, `None` when it is empty.
    pub fn from_ranked(matching_scores: Vec<MatchCandidate>) -> Option<Self> {
        let best = matching_scores.first()?;
        Some(Self {
            study_instance_uid: best.study_instance_uid.clone(),
            display_set_instance_uid: best.display_set_instance_uid.clone(),
            score: best.score,
            details: best.details.clone(),
            matching_scores,
        })
    }

    /// The `n`-th ranked candidate.
    pub fn candidate(&self, n: usize) -> Option<&MatchCandidate> {
        self.matching_scores.get(n)
    }
}

/// A protocol whose protocol-level rules matched the active study.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolMatch {
    pub protocol_id: String,
    pub score: f64,
}

impl Ranked for ProtocolMatch {
    fn score(&self) -> f64 {
        self.score
    }
}
