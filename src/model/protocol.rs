//! Canonical (normalized) protocol model.
//!
//! Values of these types only come out of normalization, so every stage has
//! at least one entry in [`Protocol::stages`] and every viewport carries
//! concrete [`ViewportOptions`] and a display-set list.

use super::value::{AttributeValue, Options};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Predicate signature for [`Constraint::Custom`].
pub type PredicateFn = dyn Fn(Option<&AttributeValue>) -> bool + Send + Sync;

/// A named predicate over an attribute value.
#[derive(Clone)]
pub struct CustomPredicate {
    pub name: String,
    pub predicate: Arc<PredicateFn>,
}

impl CustomPredicate {
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(Option<&AttributeValue>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CustomPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.predicate, &other.predicate)
    }
}

/// Regular-expression source for [`Constraint::Regex`].
///
/// The pattern is compiled on first use and the result is kept, so clones
/// made after that share the compiled form.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub struct RegexPattern {
    source: String,
    compiled: OnceLock<Result<Regex, regex::Error>>,
}

impl RegexPattern {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: OnceLock::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The compiled expression, or the compile error for a malformed pattern.
    pub fn regex(&self) -> Result<&Regex, &regex::Error> {
        self.compiled.get_or_init(|| Regex::new(&self.source)).as_ref()
    }
}

impl From<&str> for RegexPattern {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for RegexPattern {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl From<RegexPattern> for String {
    fn from(pattern: RegexPattern) -> Self {
        pattern.source
    }
}

impl fmt::Debug for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegexPattern").field(&self.source).finish()
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Constraint a matching rule places on an attribute value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Constraint {
    /// Value equals the operand (numeric text and numbers compare by value).
    Equals(AttributeValue),
    /// Value is absent or differs from the operand.
    DoesNotEqual(AttributeValue),
    /// List value has an element equal to the operand, or text contains it.
    Contains(AttributeValue),
    /// Negation of [`Constraint::Contains`]; passes for absent values.
    DoesNotContain(AttributeValue),
    /// Value (or any element of a list value) equals one of the operands.
    OneOf(Vec<AttributeValue>),
    /// Numeric value strictly greater than the operand.
    GreaterThan(f64),
    /// Numeric value strictly less than the operand.
    LessThan(f64),
    /// Numeric value within `[min, max]`.
    Range { min: f64, max: f64 },
    StartsWith(String),
    EndsWith(String),
    /// Text value matches the regular expression.
    Regex(RegexPattern),
    /// Value is present and non-empty.
    Exists,
    /// Caller-supplied predicate. Not representable in protocol documents.
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(CustomPredicate),
}

/// A weighted, optionally required predicate over a named attribute.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MatchingRule {
    pub id: String,
    pub attribute: String,
    pub constraint: Constraint,
    #[cfg_attr(feature = "serde", serde(default = "default_weight"))]
    pub weight: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub required: bool,
}

#[cfg(feature = "serde")]
fn default_weight() -> f64 {
    1.0
}

impl MatchingRule {
    /// Creates an optional rule with weight 1.0.
    pub fn new(
        id: impl Into<String>,
        attribute: impl Into<String>,
        constraint: Constraint,
    ) -> Self {
        Self {
            id: id.into(),
            attribute: attribute.into(),
            constraint,
            weight: 1.0,
            required: false,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Marks the rule as required: candidates failing it are excluded.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Named group of rules that picks the display sets for one logical slot.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct DisplaySetSelector {
    pub series_matching_rules: Vec<MatchingRule>,
    pub study_matching_rules: Vec<MatchingRule>,
    /// Carried for protocol authors; instance-level matching is not performed.
    pub image_matching_rules: Vec<MatchingRule>,
}

impl DisplaySetSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series_rule(mut self, rule: MatchingRule) -> Self {
        self.series_matching_rules.push(rule);
        self
    }

    pub fn with_study_rule(mut self, rule: MatchingRule) -> Self {
        self.study_matching_rules.push(rule);
        self
    }
}

/// Membership of a viewport in a synchronization group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SyncGroup {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub source: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub target: bool,
}

/// Which image a stack viewport shows first.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct InitialImageOptions {
    pub index: Option<usize>,
    pub preset: Option<String>,
}

/// Rendering options of one viewport slot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ViewportOptions {
    pub tool_group_id: String,
    pub viewport_type: String,
    pub id: Option<String>,
    pub orientation: Option<String>,
    pub viewport_id: Option<String>,
    pub initial_image_options: Option<InitialImageOptions>,
    pub sync_groups: Vec<SyncGroup>,
    /// Drag-and-drop into this viewport is not checked against its selector.
    pub allow_unmatched_view: bool,
    pub custom_viewport_props: Options,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            tool_group_id: "default".to_string(),
            viewport_type: "stack".to_string(),
            id: None,
            orientation: None,
            viewport_id: None,
            initial_image_options: None,
            sync_groups: Vec::new(),
            allow_unmatched_view: false,
            custom_viewport_props: Options::new(),
        }
    }
}

impl ViewportOptions {
    pub fn with_tool_group(mut self, id: impl Into<String>) -> Self {
        self.tool_group_id = id.into();
        self
    }

    pub fn with_viewport_type(mut self, kind: impl Into<String>) -> Self {
        self.viewport_type = kind.into();
        self
    }

    pub fn with_orientation(mut self, orientation: impl Into<String>) -> Self {
        self.orientation = Some(orientation.into());
        self
    }

    pub fn with_allow_unmatched_view(mut self, allow: bool) -> Self {
        self.allow_unmatched_view = allow;
        self
    }
}

/// One display-set reference inside a viewport template.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DisplaySetOptions {
    /// Selector id in [`Protocol::display_set_selectors`].
    pub id: String,
    /// Offset into the selector's ranked candidates: `0` is the best match,
    /// `n` the n-th ranked candidate, `-1` the first candidate not yet shown.
    pub display_set_index: i32,
    /// Key into the caller's reuse map, keeping a display set across re-layout.
    pub reuse_id: Option<String>,
    pub options: Options,
}

/// A viewport slot template.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Viewport {
    pub viewport_options: ViewportOptions,
    pub display_sets: Vec<DisplaySetOptions>,
    pub display_sets_by_position: Option<BTreeMap<String, Vec<DisplaySetOptions>>>,
}

/// Explicit geometry of one layout cell, in fractions of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LayoutProperties {
    pub rows: usize,
    pub columns: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub layout_options: Vec<LayoutRect>,
}

/// Layout type plus grid geometry of a stage.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ViewportStructure {
    pub layout_type: String,
    pub properties: LayoutProperties,
}

impl ViewportStructure {
    /// A plain `rows x columns` grid.
    pub fn grid(rows: usize, columns: usize) -> Self {
        Self {
            layout_type: "grid".to_string(),
            properties: LayoutProperties {
                rows,
                columns,
                layout_options: Vec::new(),
            },
        }
    }

    /// `rows * columns`, or `None` when the product overflows.
    pub fn cell_count(&self) -> Option<usize> {
        self.properties.rows.checked_mul(self.properties.columns)
    }
}

/// Whether a stage can currently be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum StageEnable {
    /// Too few viewports can be filled; never selected.
    Disabled,
    /// Enough for manual selection, not enough to be chosen by default.
    Passive,
    /// Enough viewports filled to be chosen by default.
    Enabled,
}

/// One candidate layout within a protocol.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub viewport_structure: ViewportStructure,
    pub viewports: Vec<Viewport>,
    pub required_viewports: Option<usize>,
    pub preferred_viewports: Option<usize>,
    pub default_viewport: Option<Viewport>,
    /// Derived by stage activation; `None` until the protocol is activated.
    pub enable: Option<StageEnable>,
    pub created_date: Option<String>,
}

impl Stage {
    pub fn is_disabled(&self) -> bool {
        self.enable == Some(StageEnable::Disabled)
    }
}

/// A normalized hanging protocol.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Protocol {
    pub id: String,
    pub name: String,
    pub stages: Vec<Stage>,
    pub display_set_selectors: BTreeMap<String, DisplaySetSelector>,
    pub default_viewport: Option<Viewport>,
    pub protocol_matching_rules: Vec<MatchingRule>,
    pub image_load_strategy: Option<String>,
    pub locked: bool,
    pub created_date: Option<String>,
    pub modified_date: Option<String>,
    pub tool_group_ids: Vec<String>,
    pub number_of_priors_referenced: Option<i64>,
    pub sync_data_for_viewports: bool,
}

impl Protocol {
    /// Deep copy for use as a session's working protocol.
    ///
    /// Stage activation writes into the copy; the registry's instance is
    /// never touched. Derived `enable` flags are cleared.
    pub fn working_copy(&self) -> Protocol {
        let mut copy = self.clone();
        for stage in &mut copy.stages {
            stage.enable = None;
        }
        copy
    }

    pub fn stage(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    pub fn stage_index_by_id(&self, stage_id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id == stage_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport_options() {
        let opts = ViewportOptions::default();
        assert_eq!(opts.tool_group_id, "default");
        assert_eq!(opts.viewport_type, "stack");
        assert!(!opts.allow_unmatched_view);
    }

    #[test]
    fn test_stage_enable_ordering() {
        assert!(StageEnable::Disabled < StageEnable::Passive);
        assert!(StageEnable::Passive < StageEnable::Enabled);
    }

    #[test]
    fn test_custom_predicate_equality_is_by_identity() {
        let p = CustomPredicate::new("nonEmpty", |v| v.is_some());
        let q = p.clone();
        let r = CustomPredicate::new("nonEmpty", |v| v.is_some());
        assert_eq!(p, q);
        assert_ne!(p, r);
        assert!(format!("{p:?}").contains("nonEmpty"));
    }

    #[test]
    fn test_grid_cell_count() {
        assert_eq!(ViewportStructure::grid(2, 3).cell_count(), Some(6));
        assert_eq!(ViewportStructure::grid(usize::MAX, 2).cell_count(), None);
    }
}
