//! Constraint evaluation and rule-set scoring.

use super::attributes::AttributeTable;
use super::types::{MatchContext, MatchTarget, RuleMatch, RuleOutcome};
use crate::model::{AttributeValue, Constraint, MatchingRule};
use tracing::warn;

/// Evaluates a single constraint against a (possibly absent) attribute value.
///
/// Absent values fail every constraint except the negated ones
/// ([`Constraint::DoesNotEqual`], [`Constraint::DoesNotContain`]) and custom
/// predicates, which decide for themselves.
pub fn evaluate_constraint(constraint: &Constraint, value: Option<&AttributeValue>) -> bool {
    match constraint {
        Constraint::Custom(custom) => (custom.predicate)(value),
        Constraint::DoesNotEqual(expected) => match value {
            Some(v) => !v.loosely_equals(expected),
            None => true,
        },
        Constraint::DoesNotContain(expected) => match value {
            Some(v) => !contains(v, expected),
            None => true,
        },
        _ => match value {
            Some(v) => evaluate_present(constraint, v),
            None => false,
        },
    }
}

fn evaluate_present(constraint: &Constraint, value: &AttributeValue) -> bool {
    match constraint {
        Constraint::Equals(expected) => value.loosely_equals(expected),
        Constraint::Contains(expected) => contains(value, expected),
        Constraint::OneOf(candidates) => match value {
            AttributeValue::List(items) => items
                .iter()
                .any(|item| candidates.iter().any(|c| item.loosely_equals(c))),
            scalar => candidates.iter().any(|c| scalar.loosely_equals(c)),
        },
        Constraint::GreaterThan(bound) => value.as_f64().is_some_and(|v| v > *bound),
        Constraint::LessThan(bound) => value.as_f64().is_some_and(|v| v < *bound),
        Constraint::Range { min, max } => value.as_f64().is_some_and(|v| v >= *min && v <= *max),
        Constraint::StartsWith(prefix) => value
            .as_str()
            .is_some_and(|s| s.starts_with(prefix.as_str())),
        Constraint::EndsWith(suffix) => value
            .as_str()
            .is_some_and(|s| s.ends_with(suffix.as_str())),
        Constraint::Regex(pattern) => match pattern.regex() {
            Ok(re) => value.as_str().is_some_and(|s| re.is_match(s)),
            Err(err) => {
                warn!(
                    pattern = pattern.as_str(),
                    error = %err,
                    "invalid regex constraint; rule fails"
                );
                false
            }
        },
        Constraint::Exists => !value.is_empty(),
        Constraint::DoesNotEqual(_) | Constraint::DoesNotContain(_) | Constraint::Custom(_) => {
            evaluate_constraint(constraint, Some(value))
        }
    }
}

fn contains(value: &AttributeValue, expected: &AttributeValue) -> bool {
    match (value, expected) {
        (AttributeValue::List(items), _) => items.iter().any(|item| item.loosely_equals(expected)),
        (AttributeValue::Text(haystack), AttributeValue::Text(needle)) => {
            haystack.contains(needle.as_str())
        }
        _ => false,
    }
}

/// Scores `target` against `rules`.
///
/// Every rule is evaluated so the diagnostics are complete. A satisfied rule
/// adds its weight; a failed `required` rule sets
/// [`RuleMatch::required_failed`].
pub fn find_match(
    target: MatchTarget<'_>,
    rules: &[MatchingRule],
    context: &MatchContext<'_>,
    attributes: &AttributeTable,
) -> RuleMatch {
    let mut result = RuleMatch::default();
    for rule in rules {
        let value = attributes.resolve(&rule.attribute, target, context);
        let satisfied = evaluate_constraint(&rule.constraint, value.as_ref());
        let outcome = RuleOutcome {
            rule_id: rule.id.clone(),
            attribute: rule.attribute.clone(),
            weight: rule.weight,
            required: rule.required,
            value,
        };
        if satisfied {
            result.score += rule.weight;
            result.passed.push(outcome);
        } else {
            if rule.required {
                result.required_failed = true;
            }
            result.failed.push(outcome);
        }
    }
    result
}

/// Whether `target` satisfies every required rule in `rules`.
pub fn satisfies_required(
    target: MatchTarget<'_>,
    rules: &[MatchingRule],
    context: &MatchContext<'_>,
    attributes: &AttributeTable,
) -> bool {
    rules.iter().filter(|r| r.required).all(|rule| {
        let value = attributes.resolve(&rule.attribute, target, context);
        evaluate_constraint(&rule.constraint, value.as_ref())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomPredicate, DisplaySet, RegexPattern};

    fn ct(series_number: i64) -> DisplaySet {
        DisplaySet::new("ds", "st", "se")
            .with_modality("CT")
            .with_series_number(series_number)
            .with_attribute("SeriesDescription", "AX CHEST 5mm")
    }

    #[test]
    fn test_equals_and_not_equals() {
        let v = AttributeValue::from("CT");
        assert!(evaluate_constraint(&Constraint::Equals("CT".into()), Some(&v)));
        assert!(!evaluate_constraint(&Constraint::Equals("MR".into()), Some(&v)));
        assert!(evaluate_constraint(&Constraint::DoesNotEqual("MR".into()), Some(&v)));
        assert!(evaluate_constraint(&Constraint::DoesNotEqual("MR".into()), None));
        assert!(!evaluate_constraint(&Constraint::Equals("CT".into()), None));
    }

    #[test]
    fn test_membership() {
        let list = AttributeValue::from(vec!["CT", "PT"]);
        assert!(evaluate_constraint(&Constraint::Contains("PT".into()), Some(&list)));
        assert!(!evaluate_constraint(&Constraint::Contains("MR".into()), Some(&list)));
        assert!(evaluate_constraint(&Constraint::DoesNotContain("MR".into()), Some(&list)));
        let one_of = Constraint::OneOf(vec!["MR".into(), "PT".into()]);
        assert!(evaluate_constraint(&one_of, Some(&list)));
        assert!(evaluate_constraint(&one_of, Some(&"MR".into())));
        assert!(!evaluate_constraint(&one_of, Some(&"CT".into())));
    }

    #[test]
    fn test_text_contains() {
        let desc = AttributeValue::from("AX CHEST 5mm");
        assert!(evaluate_constraint(&Constraint::Contains("CHEST".into()), Some(&desc)));
        assert!(evaluate_constraint(&Constraint::StartsWith("AX".into()), Some(&desc)));
        assert!(evaluate_constraint(&Constraint::EndsWith("mm".into()), Some(&desc)));
    }

    #[test]
    fn test_numeric_range() {
        let n = AttributeValue::from(12i64);
        assert!(evaluate_constraint(&Constraint::GreaterThan(10.0), Some(&n)));
        assert!(!evaluate_constraint(&Constraint::LessThan(10.0), Some(&n)));
        assert!(evaluate_constraint(&Constraint::Range { min: 12.0, max: 20.0 }, Some(&n)));
        assert!(!evaluate_constraint(&Constraint::Range { min: 13.0, max: 20.0 }, Some(&n)));
        assert!(evaluate_constraint(&Constraint::GreaterThan(1.0), Some(&"3".into())));
    }

    #[test]
    fn test_regex_and_invalid_regex() {
        let desc = AttributeValue::from("T1 POST GAD");
        assert!(evaluate_constraint(&Constraint::Regex("^T1.*GAD$".into()), Some(&desc)));
        assert!(!evaluate_constraint(&Constraint::Regex("^T2".into()), Some(&desc)));
        assert!(!evaluate_constraint(&Constraint::Regex("(".into()), Some(&desc)));
    }

    #[test]
    fn test_regex_compiled_once_and_shared_by_clones() {
        let constraint = Constraint::Regex("^CT".into());
        let Constraint::Regex(pattern) = &constraint else {
            unreachable!()
        };
        let first: *const regex::Regex = pattern.regex().unwrap();
        assert!(evaluate_constraint(&constraint, Some(&"CT HEAD".into())));
        assert!(std::ptr::eq(first, pattern.regex().unwrap()));

        let copy = pattern.clone();
        assert!(copy.regex().unwrap().is_match("CTA"));
        assert_eq!(copy, RegexPattern::new("^CT"));
        assert!(RegexPattern::new("(").regex().is_err());
    }

    #[test]
    fn test_exists_treats_zero_as_present() {
        assert!(evaluate_constraint(&Constraint::Exists, Some(&0i64.into())));
        assert!(!evaluate_constraint(&Constraint::Exists, Some(&"".into())));
        assert!(!evaluate_constraint(&Constraint::Exists, None));
    }

    #[test]
    fn test_custom_predicate_sees_absent_values() {
        let absent_ok = Constraint::Custom(CustomPredicate::new("absentOk", |v| v.is_none()));
        assert!(evaluate_constraint(&absent_ok, None));
        assert!(!evaluate_constraint(&absent_ok, Some(&"x".into())));
    }

    #[test]
    fn test_find_match_sums_weights() {
        let ds = ct(3);
        let rules = vec![
            MatchingRule::new("mod", "Modality", Constraint::Equals("CT".into())).with_weight(2.0),
            MatchingRule::new("desc", "SeriesDescription", Constraint::Contains("CHEST".into()))
                .with_weight(3.0),
            MatchingRule::new("thin", "SeriesDescription", Constraint::Contains("1mm".into())),
        ];
        let ctx = MatchContext::new(&[], &[]);
        let m = find_match(MatchTarget::DisplaySet(&ds), &rules, &ctx, &AttributeTable::empty());
        assert!((m.score - 5.0).abs() < 1e-10);
        assert_eq!(m.passed.len(), 2);
        assert_eq!(m.failed.len(), 1);
        assert!(!m.required_failed);
    }

    #[test]
    fn test_find_match_required_failure() {
        let ds = ct(3);
        let rules = vec![
            MatchingRule::new("mr", "Modality", Constraint::Equals("MR".into())).required(),
            MatchingRule::new("num", "SeriesNumber", Constraint::Equals(3i64.into()))
                .with_weight(9.0),
        ];
        let ctx = MatchContext::new(&[], &[]);
        let m = find_match(MatchTarget::DisplaySet(&ds), &rules, &ctx, &AttributeTable::empty());
        assert!(m.required_failed);
        assert_eq!(m.failed[0].rule_id, "mr");
        assert!(!satisfies_required(
            MatchTarget::DisplaySet(&ds),
            &rules,
            &ctx,
            &AttributeTable::empty()
        ));
    }

    #[test]
    fn test_zero_weight_required_rule_still_counts_as_satisfied() {
        let ds = ct(3);
        let rules = vec![MatchingRule::new("ct", "Modality", Constraint::Equals("CT".into()))
            .with_weight(0.0)
            .required()];
        let ctx = MatchContext::new(&[], &[]);
        let m = find_match(MatchTarget::DisplaySet(&ds), &rules, &ctx, &AttributeTable::empty());
        assert!(!m.required_failed);
        assert_eq!(m.score, 0.0);
        assert!(satisfies_required(
            MatchTarget::DisplaySet(&ds),
            &rules,
            &ctx,
            &AttributeTable::empty()
        ));
    }
}
