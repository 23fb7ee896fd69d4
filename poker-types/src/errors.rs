use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error body the backend returns on non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
}
