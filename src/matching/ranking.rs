//! Candidate ranking.

use super::types::Ranked;
use std::cmp::Ordering;

/// One ordering criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKey {
    /// Higher score first. Scores are rounded to multiples of epsilon
    /// before comparing.
    ScoreDescending,

    /// Lexicographically greater study instance uid first. Candidates
    /// without a study uid go last.
    StudyUidDescending,

    /// Lower series number first. Candidates without one go last.
    SeriesNumberAscending,
}

/// Sequential multi-key ordering of match candidates.
///
/// Keys are applied in order. A later key is only consulted when every
/// earlier key ties. Candidates tying on every key keep their input order.
///
/// # Examples
///
/// ```
/// use u_hanging::matching::{CandidateRanker, ProtocolMatch, RankKey};
///
/// let ranker = CandidateRanker::new().with_key(RankKey::ScoreDescending);
/// let items = vec![
///     ProtocolMatch { protocol_id: "a".into(), score: 1.0 },
///     ProtocolMatch { protocol_id: "b".into(), score: 3.0 },
/// ];
/// assert_eq!(ranker.select_best(&items), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRanker {
    keys: Vec<RankKey>,
    epsilon: f64,
}

impl CandidateRanker {
    /// Creates a ranker with no keys.
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            epsilon: 1e-9,
        }
    }

    /// The display-set ordering: score, then study uid, then series number.
    pub fn display_sets() -> Self {
        Self::new()
            .with_key(RankKey::ScoreDescending)
            .with_key(RankKey::StudyUidDescending)
            .with_key(RankKey::SeriesNumberAscending)
    }

    pub fn with_key(mut self, key: RankKey) -> Self {
        self.keys.push(key);
        self
    }

    /// Sets the epsilon for score comparison.
    pub fn with_epsilon(mut self, eps: f64) -> Self {
        self.epsilon = eps;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn bucket(&self, score: f64) -> f64 {
        if self.epsilon > 0.0 {
            (score / self.epsilon).round()
        } else {
            score
        }
    }

    fn compare_key<T: Ranked>(&self, key: RankKey, a: &T, b: &T) -> Ordering {
        match key {
            RankKey::ScoreDescending => {
                let (sa, sb) = (self.bucket(a.score()), self.bucket(b.score()));
                sb.total_cmp(&sa)
            }
            RankKey::StudyUidDescending => {
                match (a.study_instance_uid(), b.study_instance_uid()) {
                    (Some(ua), Some(ub)) => ub.cmp(ua),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }
            RankKey::SeriesNumberAscending => match (a.series_number(), b.series_number()) {
                (Some(na), Some(nb)) => na.cmp(&nb),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }

    /// Compares two candidates; `Less` means `a` ranks first.
    pub fn compare<T: Ranked>(&self, a: &T, b: &T) -> Ordering {
        self.keys
            .iter()
            .map(|&key| self.compare_key(key, a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    /// Returns indices into `items`, best first.
    pub fn sort_indices<T: Ranked>(&self, items: &[T]) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..items.len()).collect();
        if self.keys.is_empty() {
            return indices;
        }

        indices.sort_by(|&a, &b| self.compare(&items[a], &items[b]));

        indices
    }

    /// Sorts `items` in place, best first.
    pub fn sort<T: Ranked>(&self, items: &mut Vec<T>) {
        let order = self.sort_indices(items);
        let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
        items.extend(order.into_iter().filter_map(|i| slots[i].take()));
    }

    /// Index of the best candidate, `None` for an empty slice.
    pub fn select_best<T: Ranked>(&self, items: &[T]) -> Option<usize> {
        self.sort_indices(items).first().copied()
    }
}

impl Default for CandidateRanker {
    fn default() -> Self {
        Self::display_sets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchCandidate;
    use crate::rules::RuleMatch;
    use proptest::prelude::*;

    fn candidate(uid: &str, study: &str, score: f64, series: Option<i64>) -> MatchCandidate {
        MatchCandidate {
            study_instance_uid: study.to_string(),
            series_instance_uid: format!("{uid}.series"),
            display_set_instance_uid: uid.to_string(),
            score,
            series_number: series,
            details: RuleMatch::default(),
        }
    }

    fn uids(items: &[MatchCandidate]) -> Vec<&str> {
        items.iter().map(|c| c.display_set_instance_uid.as_str()).collect()
    }

    #[test]
    fn test_higher_score_first() {
        let mut items = vec![
            candidate("a", "1.1", 1.0, Some(1)),
            candidate("b", "1.1", 3.0, Some(9)),
            candidate("c", "1.1", 2.0, Some(5)),
        ];
        CandidateRanker::display_sets().sort(&mut items);
        assert_eq!(uids(&items), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_equal_score_lower_series_number_first() {
        let mut items = vec![
            candidate("five", "1.1", 1.0, Some(5)),
            candidate("two", "1.1", 1.0, Some(2)),
        ];
        CandidateRanker::display_sets().sort(&mut items);
        assert_eq!(uids(&items), vec!["two", "five"]);
    }

    #[test]
    fn test_study_uid_descending_before_series_number() {
        let mut items = vec![
            candidate("old", "1.2.1", 1.0, Some(1)),
            candidate("new", "1.2.9", 1.0, Some(7)),
        ];
        CandidateRanker::display_sets().sort(&mut items);
        assert_eq!(uids(&items), vec!["new", "old"]);
    }

    #[test]
    fn test_missing_series_number_last() {
        let mut items = vec![
            candidate("none", "1.1", 1.0, None),
            candidate("ten", "1.1", 1.0, Some(10)),
        ];
        CandidateRanker::display_sets().sort(&mut items);
        assert_eq!(uids(&items), vec!["ten", "none"]);
    }

    #[test]
    fn test_epsilon_comparison() {
        let items = vec![
            candidate("a", "1.1", 1.0, Some(4)),
            candidate("b", "1.1", 1.0 + 1e-12, Some(3)),
        ];
        let best = CandidateRanker::display_sets().select_best(&items);
        assert_eq!(best, Some(1));
    }

    #[test]
    fn test_no_keys_preserves_order() {
        let items = vec![
            candidate("a", "1.1", 1.0, None),
            candidate("b", "1.1", 5.0, None),
        ];
        assert_eq!(CandidateRanker::new().sort_indices(&items), vec![0, 1]);
    }

    #[test]
    fn test_select_best_empty() {
        let items: Vec<MatchCandidate> = Vec::new();
        assert!(CandidateRanker::display_sets().select_best(&items).is_none());
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let items = vec![
            candidate("a", "1.1", 1.0, Some(1)),
            candidate("b", "1.1", 1.0, Some(1)),
            candidate("c", "1.1", 1.0, Some(1)),
        ];
        assert_eq!(CandidateRanker::display_sets().sort_indices(&items), vec![0, 1, 2]);
    }

    #[test]
    fn test_near_scores_order_independent_of_input() {
        let base = [
            candidate("low", "1.1", 0.0, Some(1)),
            candidate("mid", "1.1", 6e-10, Some(3)),
            candidate("high", "1.1", 1.2e-9, Some(2)),
        ];
        let permutations = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for permutation in permutations {
            let mut items: Vec<MatchCandidate> =
                permutation.iter().map(|&i| base[i].clone()).collect();
            CandidateRanker::display_sets().sort(&mut items);
            assert_eq!(uids(&items), vec!["high", "mid", "low"]);
        }
    }

    proptest! {
        #[test]
        fn test_sorted_scores_never_increase(
            scores in proptest::collection::vec((0u8..6, 0i64..20), 0..24)
        ) {
            let mut items: Vec<MatchCandidate> = scores
                .iter()
                .enumerate()
                .map(|(i, (s, n))| candidate(&i.to_string(), "1.1", f64::from(*s), Some(*n)))
                .collect();
            CandidateRanker::display_sets().sort(&mut items);
            for pair in items.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert!(pair[0].series_number <= pair[1].series_number);
                }
            }
        }

        #[test]
        fn test_sort_is_a_permutation(len in 0usize..30) {
            let items: Vec<MatchCandidate> = (0..len)
                .map(|i| candidate(&i.to_string(), "1.1", (i % 3) as f64, Some((i % 5) as i64)))
                .collect();
            let mut order = CandidateRanker::display_sets().sort_indices(&items);
            order.sort_unstable();
            prop_assert_eq!(order, (0..len).collect::<Vec<_>>());
        }
    }
}
