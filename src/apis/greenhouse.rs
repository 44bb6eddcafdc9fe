use crate::config::GreenhouseConfig;
use crate::constants::GREENHOUSE_SOURCE;
use crate::error::{ImporterError, Result};
use crate::types::{JobBoard, RawJobRecord};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub struct GreenhouseBoard {
    client: reqwest::Client,
    base_url: String,
}

impl GreenhouseBoard {
    pub fn new(config: &GreenhouseConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Job listing endpoint for a board token, with descriptions included
    pub fn jobs_url(&self, token: &str) -> String {
        format!(
            "{}/{}/jobs?content=true",
            self.base_url.trim_end_matches('/'),
            token
        )
    }

    /// Pulls the `jobs` array out of a board response body.
    pub fn extract_jobs(body: Value) -> Result<Vec<RawJobRecord>> {
        match body {
            Value::Object(mut map) => match map.remove("jobs") {
                Some(Value::Array(jobs)) => Ok(jobs),
                _ => Err(ImporterError::Api {
                    message: "jobs array not found in board response".into(),
                }),
            },
            _ => Err(ImporterError::Api {
                message: "board response is not a JSON object".into(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl JobBoard for GreenhouseBoard {
    fn source_name(&self) -> &'static str {
        GREENHOUSE_SOURCE
    }

    #[instrument(skip(self))]
    async fn fetch_jobs(&self, token: &str) -> Result<Vec<RawJobRecord>> {
        let url = self.jobs_url(token);
        debug!("GET {}", url);

        let body: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let jobs = Self::extract_jobs(body)?;
        info!("Fetched {} jobs for board {}", jobs.len(), token);
        Ok(jobs)
    }
}
