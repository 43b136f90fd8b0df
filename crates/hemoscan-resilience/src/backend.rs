//! The remote analysis service as seen from the resilience layer.
//!
//! These types are carried, never interpreted. The transport decodes them and
//! the UI renders them; the core only moves them between the two.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::OperationFailure;

/// A document selected for analysis
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Original file name, forwarded to the service
    pub file_name: String,
    /// Raw file bytes
    pub content: Bytes,
}

impl Document {
    /// Create a document from a name and its bytes
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the document has no content
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

// Content is elided so logging a document never dumps a PDF
impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("file_name", &self.file_name)
            .field("len", &self.content.len())
            .finish()
    }
}

/// Patient gender as the service expects it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// `masculino`
    #[serde(rename = "masculino")]
    Male,
    /// `feminino`
    #[serde(rename = "feminino")]
    Female,
}

impl Gender {
    /// The wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "masculino",
            Self::Female => "feminino",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Patient attributes sent alongside the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientAttributes {
    /// Patient gender
    pub gender: Gender,
    /// Age in years
    pub age: u16,
}

/// One interpreted lab value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabFinding {
    /// Analyte name
    #[serde(rename = "analito")]
    pub analyte: String,
    /// Measured value
    #[serde(rename = "valor")]
    pub value: f64,
    /// Result label (low, normal, high, ...)
    #[serde(rename = "resultado")]
    pub result: String,
    /// Severity score
    #[serde(rename = "severidade")]
    pub severity: i32,
    /// Suggested medical specialty
    #[serde(rename = "especialidade")]
    pub specialty: String,
    /// Description of the finding
    #[serde(rename = "descricao_achado")]
    pub description: String,
    /// Guideline the finding is based on
    #[serde(rename = "diretriz")]
    pub guideline: String,
}

/// Result of a successful analysis
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Individual findings
    pub lab_findings: Vec<LabFinding>,
    /// Specialties recommended for follow-up
    pub recommended_specialties: Vec<String>,
    /// Free-text summary for the patient
    pub patient_briefing: String,
}

/// Body of a successful health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Service-reported status string
    pub status: String,
    /// Service-reported message
    pub message: String,
}

/// The remote analysis service
///
/// Implementations classify their own failures exactly once into
/// [`OperationFailure`]; nothing downstream inspects transport-specific error
/// shapes.
#[async_trait]
pub trait AnalysisBackend: Send + Sync + fmt::Debug {
    /// Submit a document for analysis
    async fn submit(
        &self,
        document: &Document,
        attributes: &PatientAttributes,
    ) -> Result<AnalysisReport, OperationFailure>;

    /// Cheap, idempotent liveness check
    async fn check_health(&self) -> Result<HealthReport, OperationFailure>;
}
