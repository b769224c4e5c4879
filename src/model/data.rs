//! Studies and display sets supplied by the caller.

use super::value::AttributeValue;
use std::collections::BTreeMap;

/// Summary of one series inside a study.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SeriesSummary {
    pub series_instance_uid: String,
    pub modality: Option<String>,
}

/// A study as listed by the study source.
///
/// The order of studies passed to the engine is meaningful: it is the
/// caller's recency ordering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Study {
    pub study_instance_uid: String,
    /// Study-level metadata (e.g. `StudyDescription`, `PatientID`).
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub series: Vec<SeriesSummary>,
}

impl Study {
    pub fn new(study_instance_uid: impl Into<String>) -> Self {
        Self {
            study_instance_uid: study_instance_uid.into(),
            attributes: BTreeMap::new(),
            series: Vec::new(),
        }
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_series(
        mut self,
        series_instance_uid: impl Into<String>,
        modality: Option<&str>,
    ) -> Self {
        self.series.push(SeriesSummary {
            series_instance_uid: series_instance_uid.into(),
            modality: modality.map(str::to_string),
        });
        self
    }

    /// Looks up a study-level attribute by its metadata name.
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "StudyInstanceUID" => Some(AttributeValue::Text(self.study_instance_uid.clone())),
            _ => self.attributes.get(name).cloned(),
        }
    }
}

/// A selectable unit of image data, typically one series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DisplaySet {
    pub display_set_instance_uid: String,
    pub study_instance_uid: String,
    pub series_instance_uid: String,
    pub modality: Option<String>,
    pub series_number: Option<i64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub num_image_frames: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_reconstructable: bool,
    /// Series-level metadata (e.g. `SeriesDescription`, `BodyPartExamined`).
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl DisplaySet {
    pub fn new(
        display_set_instance_uid: impl Into<String>,
        study_instance_uid: impl Into<String>,
        series_instance_uid: impl Into<String>,
    ) -> Self {
        Self {
            display_set_instance_uid: display_set_instance_uid.into(),
            study_instance_uid: study_instance_uid.into(),
            series_instance_uid: series_instance_uid.into(),
            modality: None,
            series_number: None,
            num_image_frames: 0,
            is_reconstructable: false,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = Some(modality.into());
        self
    }

    pub fn with_series_number(mut self, n: i64) -> Self {
        self.series_number = Some(n);
        self
    }

    pub fn with_frames(mut self, n: usize) -> Self {
        self.num_image_frames = n;
        self
    }

    pub fn with_reconstructable(mut self, value: bool) -> Self {
        self.is_reconstructable = value;
        self
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Looks up a series-level attribute by its metadata name.
    ///
    /// Identity fields are addressable under their DICOM keywords; anything
    /// else comes from the free-form attribute map.
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "displaySetInstanceUID" => Some(self.display_set_instance_uid.clone().into()),
            "StudyInstanceUID" => Some(self.study_instance_uid.clone().into()),
            "SeriesInstanceUID" => Some(self.series_instance_uid.clone().into()),
            "Modality" => self.modality.clone().map(AttributeValue::Text),
            "SeriesNumber" => self.series_number.map(AttributeValue::from),
            "numImageFrames" => Some(self.num_image_frames.into()),
            _ => self.attributes.get(name).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_set_identity_attributes() {
        let ds = DisplaySet::new("ds1", "st1", "se1")
            .with_modality("CT")
            .with_series_number(4)
            .with_attribute("SeriesDescription", "AXIAL");
        assert_eq!(ds.attribute("Modality"), Some("CT".into()));
        assert_eq!(ds.attribute("SeriesNumber"), Some(4i64.into()));
        assert_eq!(ds.attribute("StudyInstanceUID"), Some("st1".into()));
        assert_eq!(ds.attribute("SeriesDescription"), Some("AXIAL".into()));
        assert_eq!(ds.attribute("BodyPartExamined"), None);
    }

    #[test]
    fn test_missing_series_number_is_absent_not_zero() {
        let ds = DisplaySet::new("ds1", "st1", "se1");
        assert_eq!(ds.attribute("SeriesNumber"), None);
        assert_eq!(ds.attribute("Modality"), None);
    }

    #[test]
    fn test_study_attributes() {
        let study = Study::new("1.2.3").with_attribute("StudyDescription", "CHEST");
        assert_eq!(study.attribute("StudyInstanceUID"), Some("1.2.3".into()));
        assert_eq!(study.attribute("StudyDescription"), Some("CHEST".into()));
    }
}
