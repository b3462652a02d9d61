use serde::{Deserialize, Serialize};

use crate::controlled_vocabulary::{accession, CvParamList, CvTerm};

use super::MetadataError;

/// Analyzer accessions whose native mass accuracy justifies ppm-level calibration
const HIGH_RES_ANALYZERS: [&str; 4] = [
    accession::ORBITRAP,
    accession::TIME_OF_FLIGHT,
    accession::FT_ICR,
    accession::SWIFT,
];

/// Role of an instrument component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// Unknown component type
    #[default]
    Unknown,
    /// Ion source
    Source,
    /// Mass analyzer
    Analyzer,
    /// Detector
    Detector,
}

/// Instrument component (source, analyzer, detector)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentComponent {
    /// Component role
    pub component_type: ComponentType,

    /// Position in the ion path (1 = first)
    pub order: i32,

    /// CV parameters describing the component
    #[serde(default)]
    pub cv_params: CvParamList,
}

impl InstrumentComponent {
    /// Create an analyzer component described by one CV term
    pub fn analyzer(order: i32, term: CvTerm) -> Self {
        Self {
            component_type: ComponentType::Analyzer,
            order,
            cv_params: CvParamList::new().with(term),
        }
    }
}

/// Instrument configuration referenced by scans
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfiguration {
    /// Configuration identifier
    pub id: String,

    /// Components in ion-path order
    #[serde(default)]
    pub components: Vec<InstrumentComponent>,

    /// Additional CV parameters
    #[serde(default)]
    pub cv_params: CvParamList,
}

impl InstrumentConfiguration {
    /// Create an empty configuration
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Append a component (builder pattern)
    pub fn with_component(mut self, component: InstrumentComponent) -> Self {
        self.components.push(component);
        self
    }

    /// The analyzer that records the spectrum: the last one in the ion path
    pub fn final_analyzer(&self) -> Option<&InstrumentComponent> {
        self.components
            .iter()
            .filter(|c| c.component_type == ComponentType::Analyzer)
            .max_by_key(|c| c.order)
    }

    /// Whether the final analyzer is Orbitrap, TOF, FT-ICR or SWIFT
    pub fn is_high_res(&self) -> bool {
        self.final_analyzer()
            .map(|analyzer| {
                HIGH_RES_ANALYZERS
                    .iter()
                    .any(|acc| analyzer.cv_params.contains(acc))
            })
            .unwrap_or(false)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, MetadataError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }
}
