use serde::{Deserialize, Serialize};

use crate::controlled_vocabulary::{CvParamList, CvTerm, UserParam};

use super::MetadataError;

/// Data processing history for audit trail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingHistory {
    /// List of processing steps applied
    #[serde(default)]
    pub steps: Vec<ProcessingStep>,
}

/// A single data processing step in the processing history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStep {
    /// Step order (0-indexed, position in the history)
    pub order: i32,

    /// Software name
    pub software: String,

    /// Software version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Timestamp when processing was performed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// CV parameters describing the processing
    #[serde(default)]
    pub cv_params: CvParamList,

    /// Free-text processing parameters, in insertion order
    #[serde(default)]
    pub user_params: Vec<UserParam>,
}

impl ProcessingStep {
    /// Create a step described by a single CV term
    pub fn new(order: i32, software: impl Into<String>, method: CvTerm) -> Self {
        Self {
            order,
            software: software.into(),
            version: None,
            timestamp: None,
            cv_params: CvParamList::new().with(method),
            user_params: Vec::new(),
        }
    }

    /// Append a free-text parameter (builder pattern)
    pub fn with_param(mut self, name: &str, value: impl ToString) -> Self {
        self.user_params.push(UserParam::new(name, value));
        self
    }

    /// Look up a free-text parameter by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.user_params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

impl ProcessingHistory {
    /// Create a new empty processing history
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a processing step to the history
    pub fn add_step(&mut self, step: ProcessingStep) {
        self.steps.push(step);
    }

    /// Order value for the next appended step
    pub fn next_order(&self) -> i32 {
        self.steps.len() as i32
    }

    /// Software of the first recorded step, reused by appended steps
    pub fn first_software(&self) -> Option<&str> {
        self.steps.first().map(|s| s.software.as_str())
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
