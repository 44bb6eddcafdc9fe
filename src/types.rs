use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Raw job posting as returned from the job board API
pub type RawJobRecord = serde_json::Value;

/// Destination-ready job posting. Every key is always serialized;
/// absent optional fields go out as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedJobRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub date_posted: String,
    pub source: String,
    pub department: Option<String>,
    pub employment_type: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub industry: Option<String>,
}

/// Core trait that all job board sources must implement
#[async_trait::async_trait]
pub trait JobBoard: Send + Sync {
    /// Identifier for this job board kind
    fn source_name(&self) -> &'static str;

    /// Fetch every posting currently listed for the given board token
    async fn fetch_jobs(&self, token: &str) -> Result<Vec<RawJobRecord>>;
}
