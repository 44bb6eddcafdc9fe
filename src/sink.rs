use crate::config::SinkConfig;
use crate::error::{ImporterError, Result};
use crate::types::NormalizedJobRecord;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Destination for normalized records. Upserts are keyed by `id`:
/// a repeated id overwrites the earlier record.
#[async_trait]
pub trait JobSink: Send + Sync {
    async fn upsert(&self, record: &NormalizedJobRecord) -> Result<()>;

    /// Called once after a run; sinks that buffer write out here.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Posts records to a Supabase (PostgREST) table with merge-on-conflict.
pub struct SupabaseSink {
    client: reqwest::Client,
    config: SinkConfig,
    timeout: Duration,
}

impl SupabaseSink {
    pub fn new(config: SinkConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            config,
            timeout,
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            self.config.table
        )
    }

    fn request(&self, record: &NormalizedJobRecord) -> reqwest::RequestBuilder {
        self.client
            .post(self.endpoint())
            .header("apikey", &self.config.key)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.config.key),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("Prefer", "resolution=merge-duplicates")
            .timeout(self.timeout)
            .json(record)
    }
}

#[async_trait]
impl JobSink for SupabaseSink {
    async fn upsert(&self, record: &NormalizedJobRecord) -> Result<()> {
        let resp = self.request(record).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ImporterError::Sink {
                status: status.as_u16(),
                body,
            });
        }
        debug!("Upserted job {}", record.id);
        Ok(())
    }
}

/// Keeps records in memory, keyed by id. Backs dry runs and tests.
#[derive(Default)]
pub struct InMemorySink {
    records: Mutex<BTreeMap<String, NormalizedJobRecord>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, BTreeMap<String, NormalizedJobRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, id: &str) -> Option<NormalizedJobRecord> {
        self.guard().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// All stored records, ordered by id
    pub fn records(&self) -> Vec<NormalizedJobRecord> {
        self.guard().values().cloned().collect()
    }
}

#[async_trait]
impl JobSink for InMemorySink {
    async fn upsert(&self, record: &NormalizedJobRecord) -> Result<()> {
        self.guard().insert(record.id.clone(), record.clone());
        Ok(())
    }
}

/// Buffers records and writes them as one pretty-printed JSON array on flush.
pub struct JsonFileSink {
    output_dir: PathBuf,
    buffer: InMemorySink,
}

impl JsonFileSink {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            buffer: InMemorySink::new(),
        }
    }

    fn persist(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let filepath = self.output_dir.join(format!("jobs_{timestamp}.json"));

        let json_content = serde_json::to_string_pretty(&self.buffer.records())?;
        fs::write(&filepath, json_content)?;
        Ok(filepath)
    }
}

#[async_trait]
impl JobSink for JsonFileSink {
    async fn upsert(&self, record: &NormalizedJobRecord) -> Result<()> {
        self.buffer.upsert(record).await
    }

    async fn flush(&self) -> Result<()> {
        let filepath = self.persist()?;
        info!("💾 Saved {} jobs to {}", self.buffer.len(), filepath.display());
        println!("💾 Saved {} jobs to {}", self.buffer.len(), filepath.display());
        Ok(())
    }
}
