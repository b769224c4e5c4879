//! Shared test fixtures.

use crate::model::{
    Constraint, DisplaySet, DisplaySetOptionsDefinition, DisplaySetSelector, MatchingRule, Protocol,
    ProtocolDefinition, StageDefinition, Study, ViewportDefinition, ViewportOptions,
};
use crate::registry::normalize;
use crate::service::{HangingProtocolService, InMemoryDisplaySets};

/// The more recent study; its uid sorts after [`STUDY_OLD`].
pub(crate) const STUDY_NEW: &str = "1.2.840.2";
pub(crate) const STUDY_OLD: &str = "1.2.840.1";

/// Two CT studies with one display set each.
///
/// `ct-2` (series 2, 5 mm) belongs to the newer study and `ct-5`
/// (series 5, 1 mm) to the older one, so every tie-break favors `ct-2`.
pub(crate) fn scenario_data() -> (Vec<Study>, Vec<DisplaySet>) {
    let studies = vec![Study::new(STUDY_NEW), Study::new(STUDY_OLD)];
    let display_sets = vec![
        DisplaySet::new("ct-2", STUDY_NEW, "1.2.840.2.2")
            .with_modality("CT")
            .with_series_number(2)
            .with_frames(120)
            .with_attribute("SliceThickness", 5.0),
        DisplaySet::new("ct-5", STUDY_OLD, "1.2.840.1.5")
            .with_modality("CT")
            .with_series_number(5)
            .with_frames(400)
            .with_attribute("SliceThickness", 1.0),
    ];
    (studies, display_sets)
}

/// Selector requiring `Modality == CT`, weight 1.
pub(crate) fn ct_selector() -> DisplaySetSelector {
    DisplaySetSelector::new().with_series_rule(
        MatchingRule::new("ct", "Modality", Constraint::Equals("CT".into())).required(),
    )
}

fn mr_selector() -> DisplaySetSelector {
    DisplaySetSelector::new().with_series_rule(
        MatchingRule::new("mr", "Modality", Constraint::Equals("MR".into())).required(),
    )
}

fn slot(selector: &str, index: i32) -> ViewportDefinition {
    ViewportDefinition::new()
        .with_display_set(DisplaySetOptionsDefinition::new(selector).with_index(index))
}

/// A single-stage protocol carrying `rules` as protocol matching rules.
pub(crate) fn protocol_with_rules(id: &str, rules: Vec<MatchingRule>) -> Protocol {
    let mut definition = ProtocolDefinition::new(id).with_stage(StageDefinition::new("s"));
    for rule in rules {
        definition = definition.with_protocol_rule(rule);
    }
    match normalize(definition, &ViewportOptions::default()) {
        Ok(protocol) => protocol,
        Err(err) => panic!("fixture protocol {id} rejected: {err}"),
    }
}

/// `default`: one 1x1 stage showing the best CT.
pub(crate) fn default_protocol() -> ProtocolDefinition {
    ProtocolDefinition::new("default")
        .with_selector("main", ct_selector())
        .with_stage(StageDefinition::new("1x1").with_viewport(slot("main", 0)))
}

/// One 1x2 stage, both slots bound to `main`; the first slot carries reuse
/// id `left`, the second asks for candidate `second_index`. Requires one
/// filled viewport and prefers two.
pub(crate) fn two_slot_protocol(id: &str, second_index: i32) -> ProtocolDefinition {
    ProtocolDefinition::new(id).with_selector("main", ct_selector()).with_stage(
        StageDefinition::new("1x2")
            .with_grid(1, 2)
            .with_viewport(ViewportDefinition::new().with_display_set(
                DisplaySetOptionsDefinition::new("main").with_reuse_id("left"),
            ))
            .with_viewport(slot("main", second_index))
            .with_required_viewports(1)
            .with_preferred_viewports(2),
    )
}

/// Four stages over the scenario data:
///
/// | index | id        | outcome  |
/// |-------|-----------|----------|
/// | 0     | `one`     | enabled  |
/// | 1     | `mr-only` | disabled |
/// | 2     | `two`     | enabled  |
/// | 3     | `three`   | disabled |
pub(crate) fn navigation_protocol() -> ProtocolDefinition {
    ProtocolDefinition::new("nav")
        .with_selector("main", ct_selector())
        .with_selector("mr", mr_selector())
        .with_stage(StageDefinition::new("one").with_viewport(slot("main", 0)))
        .with_stage(
            StageDefinition::new("mr-only")
                .with_viewport(slot("mr", 0))
                .with_required_viewports(1),
        )
        .with_stage(
            StageDefinition::new("two")
                .with_grid(1, 2)
                .with_viewport(slot("main", 0))
                .with_viewport(slot("main", 1))
                .with_required_viewports(1)
                .with_preferred_viewports(2),
        )
        .with_stage(
            StageDefinition::new("three")
                .with_grid(1, 3)
                .with_viewport(slot("main", 0))
                .with_viewport(slot("main", 1))
                .with_viewport(slot("main", -1))
                .with_required_viewports(3),
        )
}

/// A service whose provider holds the scenario display sets.
pub(crate) fn scenario_service() -> HangingProtocolService<InMemoryDisplaySets> {
    let (_, display_sets) = scenario_data();
    HangingProtocolService::new(InMemoryDisplaySets::new(display_sets))
}
