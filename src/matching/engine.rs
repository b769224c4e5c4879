//! Selector and protocol matching over one set of studies.

use super::ranking::{CandidateRanker, RankKey};
use super::types::{DisplaySetMatchDetails, MatchCandidate, ProtocolMatch};
use crate::model::{DisplaySet, DisplaySetSelector, Protocol, Study};
use crate::rules::{find_match, satisfies_required, AttributeTable, MatchContext, MatchTarget};
use tracing::debug;

/// Scores display sets and protocols against the session's studies.
///
/// Display sets are grouped under the studies passed in; display sets whose
/// study is not in `studies` are never candidates.
pub struct MatchingEngine<'a> {
    studies: &'a [Study],
    display_sets: &'a [DisplaySet],
    attributes: &'a AttributeTable,
    ranker: CandidateRanker,
}

impl<'a> MatchingEngine<'a> {
    pub fn new(
        studies: &'a [Study],
        display_sets: &'a [DisplaySet],
        attributes: &'a AttributeTable,
    ) -> Self {
        Self {
            studies,
            display_sets,
            attributes,
            ranker: CandidateRanker::display_sets(),
        }
    }

    /// Sets the epsilon used when comparing scores.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.ranker = self.ranker.with_epsilon(epsilon);
        self
    }

    pub fn studies(&self) -> &'a [Study] {
        self.studies
    }

    pub fn display_sets(&self) -> &'a [DisplaySet] {
        self.display_sets
    }

    pub fn display_set(&self, uid: &str) -> Option<&'a DisplaySet> {
        self.display_sets
            .iter()
            .find(|ds| ds.display_set_instance_uid == uid)
    }

    fn display_sets_of(&self, study_instance_uid: &str) -> Vec<&'a DisplaySet> {
        self.display_sets
            .iter()
            .filter(|ds| ds.study_instance_uid == study_instance_uid)
            .collect()
    }

    /// Ranks every display set passing `selector`'s required rules.
    ///
    /// Returns the ranked candidates, best first. Candidates of a study that
    /// fails a required study rule are excluded.
    pub fn rank_candidates(&self, selector: &DisplaySetSelector) -> Vec<MatchCandidate> {
        let mut candidates = Vec::new();

        for study in self.studies {
            let study_sets = self.display_sets_of(&study.study_instance_uid);
            let context = MatchContext::new(self.studies, &study_sets);
            let study_match = find_match(
                MatchTarget::Study(study),
                &selector.study_matching_rules,
                &context,
                self.attributes,
            );
            if study_match.required_failed {
                debug!(study = %study.study_instance_uid, "study failed a required rule");
                continue;
            }

            for &ds in &study_sets {
                let series_match = find_match(
                    MatchTarget::DisplaySet(ds),
                    &selector.series_matching_rules,
                    &context,
                    self.attributes,
                );
                if series_match.required_failed {
                    continue;
                }
                let mut details = series_match;
                details.absorb(&study_match);
                candidates.push(MatchCandidate {
                    study_instance_uid: study.study_instance_uid.clone(),
                    series_instance_uid: ds.series_instance_uid.clone(),
                    display_set_instance_uid: ds.display_set_instance_uid.clone(),
                    score: details.score,
                    series_number: ds.series_number,
                    details,
                });
            }
        }

        self.ranker.sort(&mut candidates);
        candidates
    }

    /// Best match of `selector` plus the ranked list, `None` when nothing passes.
    pub fn match_images(
        &self,
        selector_id: &str,
        selector: &DisplaySetSelector,
    ) -> Option<DisplaySetMatchDetails> {
        let ranked = self.rank_candidates(selector);
        debug!(
            selector = selector_id,
            candidates = ranked.len(),
            best = ranked.first().map(|c| c.display_set_instance_uid.as_str()),
            "matched display sets"
        );
        DisplaySetMatchDetails::from_ranked(ranked)
    }

    /// Whether `display_set` satisfies every required series rule of `selector`.
    pub fn satisfies_selector(
        &self,
        selector: &DisplaySetSelector,
        display_set: &DisplaySet,
    ) -> bool {
        let siblings = self.display_sets_of(&display_set.study_instance_uid);
        let context = MatchContext::new(self.studies, &siblings);
        satisfies_required(
            MatchTarget::DisplaySet(display_set),
            &selector.series_matching_rules,
            &context,
            self.attributes,
        )
    }

    /// Ranks `protocols` by their protocol-level rules against `active_study`.
    ///
    /// Protocols without rules, failing a required rule, or scoring zero are
    /// not candidates. Equal scores keep enumeration order.
    pub fn rank_protocols<'p, I>(&self, protocols: I, active_study: &Study) -> Vec<ProtocolMatch>
    where
        I: IntoIterator<Item = &'p Protocol>,
    {
        let study_sets = self.display_sets_of(&active_study.study_instance_uid);
        let context = MatchContext::new(self.studies, &study_sets);

        let mut matches: Vec<ProtocolMatch> = protocols
            .into_iter()
            .filter(|p| !p.protocol_matching_rules.is_empty())
            .filter_map(|p| {
                let m = find_match(
                    MatchTarget::Study(active_study),
                    &p.protocol_matching_rules,
                    &context,
                    self.attributes,
                );
                (!m.required_failed && m.score > 0.0).then(|| ProtocolMatch {
                    protocol_id: p.id.clone(),
                    score: m.score,
                })
            })
            .collect();

        CandidateRanker::new()
            .with_key(RankKey::ScoreDescending)
            .with_epsilon(self.ranker.epsilon())
            .sort(&mut matches);
        debug!(
            study = %active_study.study_instance_uid,
            candidates = matches.len(),
            "ranked protocols"
        );
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Constraint, MatchingRule};
    use crate::testing::{ct_selector, protocol_with_rules, scenario_data};

    #[test]
    fn test_equal_scores_rank_lower_series_first() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let details = engine.match_images("main", &ct_selector()).unwrap();
        assert_eq!(details.matching_scores.len(), 2);
        assert_eq!(details.matching_scores[0].series_number, Some(2));
        assert_eq!(
            details.display_set_instance_uid,
            details.matching_scores[0].display_set_instance_uid
        );
    }

    #[test]
    fn test_required_series_rule_excludes_candidate() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let selector = DisplaySetSelector::new()
            .with_series_rule(
                MatchingRule::new("mr", "Modality", Constraint::Equals("MR".into())).required(),
            )
            .with_series_rule(
                MatchingRule::new("num", "SeriesNumber", Constraint::GreaterThan(0.0))
                    .with_weight(100.0),
            );
        assert!(engine.match_images("mr", &selector).is_none());
    }

    #[test]
    fn test_required_study_rule_excludes_study() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let selector = ct_selector().with_study_rule(
            MatchingRule::new(
                "first",
                "StudyInstanceUID",
                Constraint::Equals(studies[0].study_instance_uid.as_str().into()),
            )
            .required(),
        );
        let ranked = engine.rank_candidates(&selector);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].study_instance_uid, studies[0].study_instance_uid);
    }

    #[test]
    fn test_study_score_adds_to_series_score() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let selector = ct_selector().with_study_rule(
            MatchingRule::new(
                "first",
                "StudyInstanceUID",
                Constraint::Equals(studies[1].study_instance_uid.as_str().into()),
            )
            .with_weight(5.0),
        );
        let details = engine.match_images("main", &selector).unwrap();
        assert_eq!(details.study_instance_uid, studies[1].study_instance_uid);
        assert!((details.score - 6.0).abs() < 1e-10);
        assert_eq!(details.details.passed.len(), 2);
    }

    #[test]
    fn test_display_sets_outside_studies_ignored() {
        let (studies, mut sets) = scenario_data();
        sets.push(
            DisplaySet::new("orphan", "9.9.9", "9.9.9.1")
                .with_modality("CT")
                .with_series_number(1),
        );
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let ranked = engine.rank_candidates(&ct_selector());
        assert!(ranked.iter().all(|c| c.display_set_instance_uid != "orphan"));
    }

    #[test]
    fn test_satisfies_selector() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let mr = DisplaySet::new("mr", &studies[0].study_instance_uid, "x").with_modality("MR");
        assert!(engine.satisfies_selector(&ct_selector(), &sets[0]));
        assert!(!engine.satisfies_selector(&ct_selector(), &mr));
    }

    #[test]
    fn test_rank_protocols_orders_and_filters() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let ct_rule =
            || MatchingRule::new("ct", "ModalitiesInStudy", Constraint::Contains("CT".into()));
        let protocols = vec![
            protocol_with_rules("weak", vec![ct_rule()]),
            protocol_with_rules("none", vec![]),
            protocol_with_rules("strong", vec![ct_rule().with_weight(4.0)]),
            protocol_with_rules(
                "needs-mr",
                vec![
                    ct_rule().with_weight(10.0),
                    MatchingRule::new("mr", "ModalitiesInStudy", Constraint::Contains("MR".into()))
                        .required(),
                ],
            ),
            protocol_with_rules(
                "zero",
                vec![MatchingRule::new(
                    "us",
                    "ModalitiesInStudy",
                    Constraint::Contains("US".into()),
                )],
            ),
        ];
        let ranked = engine.rank_protocols(&protocols, &studies[0]);
        let ids: Vec<&str> = ranked.iter().map(|m| m.protocol_id.as_str()).collect();
        assert_eq!(ids, vec!["strong", "weak"]);
    }
}
