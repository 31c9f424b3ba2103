//! Report DTOs

use serde::{Deserialize, Serialize};

use crate::domain::report::{ReportParams, ReportTarget};

/// Request body of `POST /report`: render an explicit target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReport {
    pub target: ReportTarget,
    #[serde(default)]
    pub params: ReportParams,
}

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
