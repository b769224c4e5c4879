//! Protocol definitions as authored.
//!
//! Every field that normalization can fill in is optional here. A
//! [`ProtocolDefinition`] becomes a [`Protocol`](super::Protocol) only by
//! passing through [`normalize`](crate::registry::normalize).

use super::protocol::{DisplaySetSelector, MatchingRule, ViewportOptions, ViewportStructure};
use super::value::Options;
use std::collections::BTreeMap;

/// Authored form of [`DisplaySetOptions`](super::DisplaySetOptions).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct DisplaySetOptionsDefinition {
    pub id: String,
    pub display_set_index: Option<i32>,
    pub reuse_id: Option<String>,
    pub options: Option<Options>,
}

impl DisplaySetOptionsDefinition {
    pub fn new(selector_id: impl Into<String>) -> Self {
        Self {
            id: selector_id.into(),
            ..Self::default()
        }
    }

    pub fn with_index(mut self, index: i32) -> Self {
        self.display_set_index = Some(index);
        self
    }

    pub fn with_reuse_id(mut self, reuse_id: impl Into<String>) -> Self {
        self.reuse_id = Some(reuse_id.into());
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }
}

/// Authored form of [`Viewport`](super::Viewport).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ViewportDefinition {
    pub viewport_options: Option<ViewportOptions>,
    pub display_sets: Option<Vec<DisplaySetOptionsDefinition>>,
    pub display_sets_by_position: Option<BTreeMap<String, Vec<DisplaySetOptionsDefinition>>>,
}

impl ViewportDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: ViewportOptions) -> Self {
        self.viewport_options = Some(options);
        self
    }

    pub fn with_display_set(mut self, display_set: DisplaySetOptionsDefinition) -> Self {
        self.display_sets.get_or_insert_with(Vec::new).push(display_set);
        self
    }

    pub fn with_position(
        mut self,
        position_id: impl Into<String>,
        display_sets: Vec<DisplaySetOptionsDefinition>,
    ) -> Self {
        self.display_sets_by_position
            .get_or_insert_with(BTreeMap::new)
            .insert(position_id.into(), display_sets);
        self
    }
}

/// Authored form of [`Stage`](super::Stage).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StageDefinition {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    pub viewport_structure: ViewportStructure,
    /// When absent, `rows x columns` empty viewports are generated.
    #[cfg_attr(feature = "serde", serde(default))]
    pub viewports: Option<Vec<ViewportDefinition>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub required_viewports: Option<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub preferred_viewports: Option<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub default_viewport: Option<ViewportDefinition>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub created_date: Option<String>,
}

impl StageDefinition {
    /// A 1x1 grid stage with no declared viewports.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            viewport_structure: ViewportStructure::grid(1, 1),
            viewports: None,
            required_viewports: None,
            preferred_viewports: None,
            default_viewport: None,
            created_date: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_grid(mut self, rows: usize, columns: usize) -> Self {
        self.viewport_structure = ViewportStructure::grid(rows, columns);
        self
    }

    pub fn with_structure(mut self, structure: ViewportStructure) -> Self {
        self.viewport_structure = structure;
        self
    }

    pub fn with_viewport(mut self, viewport: ViewportDefinition) -> Self {
        self.viewports.get_or_insert_with(Vec::new).push(viewport);
        self
    }

    pub fn with_required_viewports(mut self, n: usize) -> Self {
        self.required_viewports = Some(n);
        self
    }

    pub fn with_preferred_viewports(mut self, n: usize) -> Self {
        self.preferred_viewports = Some(n);
        self
    }

    pub fn with_default_viewport(mut self, viewport: ViewportDefinition) -> Self {
        self.default_viewport = Some(viewport);
        self
    }
}

/// Authored form of [`Protocol`](super::Protocol).
///
/// # Examples
///
/// ```
/// use u_hanging::model::{
///     Constraint, DisplaySetOptionsDefinition, DisplaySetSelector, MatchingRule,
///     ProtocolDefinition, StageDefinition, ViewportDefinition,
/// };
///
/// let ct = DisplaySetSelector::new().with_series_rule(
///     MatchingRule::new("ct", "Modality", Constraint::Equals("CT".into())).required(),
/// );
/// let def = ProtocolDefinition::new("ct-1x2")
///     .with_selector("main", ct)
///     .with_stage(
///         StageDefinition::new("1x2")
///             .with_grid(1, 2)
///             .with_viewport(
///                 ViewportDefinition::new()
///                     .with_display_set(DisplaySetOptionsDefinition::new("main")),
///             )
///             .with_viewport(
///                 ViewportDefinition::new()
///                     .with_display_set(DisplaySetOptionsDefinition::new("main").with_index(1)),
///             ),
///     );
/// assert_eq!(def.stages.as_ref().map(Vec::len), Some(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ProtocolDefinition {
    pub id: Option<String>,
    pub name: Option<String>,
    pub stages: Option<Vec<StageDefinition>>,
    pub display_set_selectors: BTreeMap<String, DisplaySetSelector>,
    pub default_viewport: Option<ViewportDefinition>,
    pub protocol_matching_rules: Vec<MatchingRule>,
    pub image_load_strategy: Option<String>,
    pub locked: bool,
    pub created_date: Option<String>,
    pub modified_date: Option<String>,
    pub tool_group_ids: Vec<String>,
    pub number_of_priors_referenced: Option<i64>,
    pub sync_data_for_viewports: bool,
}

impl ProtocolDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// A definition identified only by its name; normalization copies the
    /// name into the id.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_stage(mut self, stage: StageDefinition) -> Self {
        self.stages.get_or_insert_with(Vec::new).push(stage);
        self
    }

    pub fn with_selector(mut self, id: impl Into<String>, selector: DisplaySetSelector) -> Self {
        self.display_set_selectors.insert(id.into(), selector);
        self
    }

    pub fn with_protocol_rule(mut self, rule: MatchingRule) -> Self {
        self.protocol_matching_rules.push(rule);
        self
    }

    pub fn with_default_viewport(mut self, viewport: ViewportDefinition) -> Self {
        self.default_viewport = Some(viewport);
        self
    }

    pub fn with_image_load_strategy(mut self, name: impl Into<String>) -> Self {
        self.image_load_strategy = Some(name.into());
        self
    }

    /// Parses a protocol document in the camelCase JSON layout.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
