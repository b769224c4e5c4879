//! Attribute accessor table.
//!
//! Rules name attributes; the table decides how each name is resolved. A
//! registered [`CustomAttribute`] computes the value from the target and its
//! context (synthetic attributes such as the number of series in a study).
//! Unregistered names are read straight from the target's metadata.

use super::types::{MatchContext, MatchTarget};
use crate::model::{AttributeValue, Options};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Computes an attribute value for a target.
pub type AttributeCallback =
    Arc<dyn Fn(MatchTarget<'_>, &MatchContext<'_>) -> Option<AttributeValue> + Send + Sync>;

/// A synthetic attribute available to matching rules.
#[derive(Clone)]
pub struct CustomAttribute {
    pub id: String,
    /// Human-readable name shown to protocol authors.
    pub name: String,
    pub callback: AttributeCallback,
    /// Free-form options registered alongside the callback.
    pub options: Options,
}

impl fmt::Debug for CustomAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAttribute")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Table of custom attributes, keyed by attribute id.
#[derive(Debug, Clone)]
pub struct AttributeTable {
    entries: BTreeMap<String, CustomAttribute>,
}

impl AttributeTable {
    /// An empty table: every attribute is read from metadata.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The table with the built-in synthetic attributes registered.
    pub fn with_builtins() -> Self {
        let mut table = Self::empty();
        table.insert(
            "NumberOfStudyRelatedSeries",
            "The number of series in the study",
            Arc::new(number_of_study_related_series),
            Options::new(),
        );
        table.insert(
            "NumberOfSeriesRelatedInstances",
            "The number of instances in the display set",
            Arc::new(number_of_series_related_instances),
            Options::new(),
        );
        table.insert(
            "ModalitiesInStudy",
            "Gets the array of the modalities for the series",
            Arc::new(modalities_in_study),
            Options::new(),
        );
        table.insert(
            "isReconstructable",
            "Checks if the display set is reconstructable",
            Arc::new(is_reconstructable),
            Options::new(),
        );
        table
    }

    /// Adds or replaces a custom attribute.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        callback: AttributeCallback,
        options: Options,
    ) {
        let id = id.into();
        self.entries.insert(
            id.clone(),
            CustomAttribute {
                id,
                name: name.into(),
                callback,
                options,
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<&CustomAttribute> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of every registered attribute, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Resolves `name` for `target`.
    pub fn resolve(
        &self,
        name: &str,
        target: MatchTarget<'_>,
        context: &MatchContext<'_>,
    ) -> Option<AttributeValue> {
        match self.entries.get(name) {
            Some(custom) => (custom.callback)(target, context),
            None => target.attribute(name),
        }
    }
}

impl Default for AttributeTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn number_of_study_related_series(
    target: MatchTarget<'_>,
    context: &MatchContext<'_>,
) -> Option<AttributeValue> {
    if let Some(value) = target.attribute("NumberOfStudyRelatedSeries") {
        return Some(value);
    }
    let study = target.study()?;
    if !study.series.is_empty() {
        return Some(study.series.len().into());
    }
    Some(context.display_sets.len().into())
}

fn number_of_series_related_instances(
    target: MatchTarget<'_>,
    _context: &MatchContext<'_>,
) -> Option<AttributeValue> {
    match target {
        MatchTarget::DisplaySet(ds) => Some(ds.num_image_frames.into()),
        MatchTarget::Study(study) => study.attribute("NumberOfSeriesRelatedInstances"),
    }
}

fn modalities_in_study(
    target: MatchTarget<'_>,
    context: &MatchContext<'_>,
) -> Option<AttributeValue> {
    if let Some(value) = target.attribute("ModalitiesInStudy") {
        return Some(value);
    }
    let study = target.study()?;
    let mut modalities: Vec<String> = Vec::new();
    let from_series = study.series.iter().filter_map(|s| s.modality.as_deref());
    let from_display_sets = context.display_sets.iter().filter_map(|ds| ds.modality.as_deref());
    let source: Box<dyn Iterator<Item = &str>> = if study.series.is_empty() {
        Box::new(from_display_sets)
    } else {
        Box::new(from_series)
    };
    for modality in source {
        if !modalities.iter().any(|m| m == modality) {
            modalities.push(modality.to_string());
        }
    }
    Some(modalities.into())
}

fn is_reconstructable(
    target: MatchTarget<'_>,
    _context: &MatchContext<'_>,
) -> Option<AttributeValue> {
    match target {
        MatchTarget::DisplaySet(ds) => Some(ds.is_reconstructable.into()),
        MatchTarget::Study(_) => Some(false.into()),
    }
}
