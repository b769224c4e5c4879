//! Stage enablement.

use crate::model::StageEnable;

/// Classifies a stage from the number of viewports a matching pass filled.
///
/// A stage without thresholds is always [`StageEnable::Enabled`]. Otherwise
/// it is `Enabled` when `matched >= preferred`, `Passive` when
/// `matched >= required`, and `Disabled` otherwise. An absent threshold
/// never satisfies its comparison.
pub fn classify(matched: usize, required: Option<usize>, preferred: Option<usize>) -> StageEnable {
    if required.is_none() && preferred.is_none() {
        return StageEnable::Enabled;
    }
    if preferred.is_some_and(|p| matched >= p) {
        StageEnable::Enabled
    } else if required.is_some_and(|r| matched >= r) {
        StageEnable::Passive
    } else {
        StageEnable::Disabled
    }
}

/// Whether classifying the stage needs a scratch matching pass.
pub fn needs_matching(required: Option<usize>, preferred: Option<usize>) -> bool {
    required.is_some() || preferred.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_thresholds_always_enabled() {
        assert_eq!(classify(0, None, None), StageEnable::Enabled);
        assert!(!needs_matching(None, None));
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(classify(3, Some(1), Some(3)), StageEnable::Enabled);
        assert_eq!(classify(2, Some(1), Some(3)), StageEnable::Passive);
        assert_eq!(classify(0, Some(1), Some(3)), StageEnable::Disabled);
    }

    #[test]
    fn test_absent_threshold_never_satisfied() {
        assert_eq!(classify(10, Some(2), None), StageEnable::Passive);
        assert_eq!(classify(10, None, Some(2)), StageEnable::Enabled);
        assert_eq!(classify(1, None, Some(2)), StageEnable::Disabled);
    }

    #[test]
    fn test_zero_required_is_at_least_passive() {
        assert_eq!(classify(0, Some(0), Some(2)), StageEnable::Passive);
    }

    proptest! {
        #[test]
        fn test_monotonic_in_matched_count(
            matched in 0usize..20,
            extra in 0usize..20,
            required in proptest::option::of(0usize..10),
            preferred in proptest::option::of(0usize..10),
        ) {
            let lower = classify(matched, required, preferred);
            let higher = classify(matched + extra, required, preferred);
            prop_assert!(lower <= higher);
        }
    }
}
