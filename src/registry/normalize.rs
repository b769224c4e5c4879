//! Normalization of authored definitions into canonical protocols.

use crate::error::{HangingError, Result};
use crate::model::{
    DisplaySetOptions, DisplaySetOptionsDefinition, Protocol, ProtocolDefinition, Stage,
    StageDefinition, Viewport, ViewportDefinition, ViewportOptions,
};
use std::collections::BTreeMap;

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Turns a [`ProtocolDefinition`] into a [`Protocol`].
///
/// `id` falls back to `name` and vice versa. Stages whose viewport list is
/// absent get `rows x columns` empty viewports carrying
/// `default_viewport_options`; declared viewports get their missing options
/// and display-set lists filled in.
///
/// # Errors
///
/// [`HangingError::NormalizationFailure`] when the definition has neither id
/// nor name, has no stages, or declares a grid whose cell count overflows.
pub fn normalize(
    definition: ProtocolDefinition,
    default_viewport_options: &ViewportOptions,
) -> Result<Protocol> {
    let id = non_empty(definition.id);
    let name = non_empty(definition.name);
    let (id, name) = match (id, name) {
        (Some(id), Some(name)) => (id, name),
        (Some(id), None) => (id.clone(), id),
        (None, Some(name)) => (name.clone(), name),
        (None, None) => {
            return Err(HangingError::NormalizationFailure {
                id: "<unnamed>".to_string(),
                reason: "protocol has neither id nor name".to_string(),
            })
        }
    };

    let stages = match definition.stages {
        Some(stages) if !stages.is_empty() => stages,
        _ => {
            return Err(HangingError::NormalizationFailure {
                id,
                reason: "protocol has no stages".to_string(),
            })
        }
    };

    let stages = stages
        .into_iter()
        .map(|stage| normalize_stage(&id, stage, default_viewport_options))
        .collect::<Result<Vec<_>>>()?;

    Ok(Protocol {
        id,
        name,
        stages,
        display_set_selectors: definition.display_set_selectors,
        default_viewport: definition
            .default_viewport
            .map(|vp| normalize_viewport(vp, default_viewport_options)),
        protocol_matching_rules: definition.protocol_matching_rules,
        image_load_strategy: definition.image_load_strategy,
        locked: definition.locked,
        created_date: definition.created_date,
        modified_date: definition.modified_date,
        tool_group_ids: definition.tool_group_ids,
        number_of_priors_referenced: definition.number_of_priors_referenced,
        sync_data_for_viewports: definition.sync_data_for_viewports,
    })
}

fn normalize_stage(
    protocol_id: &str,
    stage: StageDefinition,
    default_viewport_options: &ViewportOptions,
) -> Result<Stage> {
    let Some(cells) = stage.viewport_structure.cell_count() else {
        let properties = &stage.viewport_structure.properties;
        return Err(HangingError::NormalizationFailure {
            id: protocol_id.to_string(),
            reason: format!(
                "stage {} grid {}x{} overflows",
                stage.id, properties.rows, properties.columns
            ),
        });
    };
    let viewports = match stage.viewports {
        Some(viewports) => viewports
            .into_iter()
            .map(|vp| normalize_viewport(vp, default_viewport_options))
            .collect(),
        None => (0..cells)
            .map(|_| Viewport {
                viewport_options: default_viewport_options.clone(),
                display_sets: Vec::new(),
                display_sets_by_position: None,
            })
            .collect(),
    };

    Ok(Stage {
        name: non_empty(stage.name).unwrap_or_else(|| stage.id.clone()),
        id: stage.id,
        viewport_structure: stage.viewport_structure,
        viewports,
        required_viewports: stage.required_viewports,
        preferred_viewports: stage.preferred_viewports,
        default_viewport: stage
            .default_viewport
            .map(|vp| normalize_viewport(vp, default_viewport_options)),
        enable: None,
        created_date: stage.created_date,
    })
}

fn normalize_viewport(
    viewport: ViewportDefinition,
    default_viewport_options: &ViewportOptions,
) -> Viewport {
    Viewport {
        viewport_options: viewport
            .viewport_options
            .unwrap_or_else(|| default_viewport_options.clone()),
        display_sets: normalize_display_sets(viewport.display_sets.unwrap_or_default()),
        display_sets_by_position: viewport.display_sets_by_position.map(|by_position| {
            by_position
                .into_iter()
                .map(|(position, entries)| (position, normalize_display_sets(entries)))
                .collect::<BTreeMap<_, _>>()
        }),
    }
}

fn normalize_display_sets(entries: Vec<DisplaySetOptionsDefinition>) -> Vec<DisplaySetOptions> {
    entries
        .into_iter()
        .map(|entry| DisplaySetOptions {
            id: entry.id,
            display_set_index: entry.display_set_index.unwrap_or(0),
            reuse_id: entry.reuse_id,
            options: entry.options.unwrap_or_default(),
        })
        .collect()
}
