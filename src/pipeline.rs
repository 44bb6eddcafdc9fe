use crate::config::Company;
use crate::normalize::normalize;
use crate::sink::JobSink;
use crate::types::{JobBoard, RawJobRecord};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Where a single record fell out of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureStage {
    Normalize,
    Upsert,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    /// Position of the record in the board response
    pub index: usize,
    pub job_id: Option<String>,
    pub stage: FailureStage,
    pub error: String,
}

/// Result of importing one company's board
#[derive(Debug, Clone, Serialize)]
pub struct CompanyOutcome {
    pub token: String,
    pub display_name: String,
    pub total_jobs: usize,
    pub imported: usize,
    pub failures: Vec<RecordFailure>,
    pub fetch_error: Option<String>,
}

impl CompanyOutcome {
    fn fetch_failed(company: &Company, error: String) -> Self {
        Self {
            token: company.token.clone(),
            display_name: company.display_name.clone(),
            total_jobs: 0,
            imported: 0,
            failures: Vec::new(),
            fetch_error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.fetch_error.is_some()
    }
}

/// Result of a complete import run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per company, in the order the companies were given
    pub companies: Vec<CompanyOutcome>,
    pub flush_error: Option<String>,
}

impl RunSummary {
    pub fn companies_failed(&self) -> usize {
        self.companies.iter().filter(|c| c.is_failed()).count()
    }

    pub fn records_imported(&self) -> usize {
        self.companies.iter().map(|c| c.imported).sum()
    }

    pub fn records_failed(&self) -> usize {
        self.companies.iter().map(|c| c.failures.len()).sum()
    }

    /// True when there was something to import and nothing got through
    pub fn all_companies_failed(&self) -> bool {
        !self.companies.is_empty() && self.companies_failed() == self.companies.len()
    }

    /// At least one company got through and the sink persisted what it was given
    pub fn is_successful(&self) -> bool {
        !self.all_companies_failed() && self.flush_error.is_none()
    }
}

/// Fetch → normalize → upsert, once per company.
pub struct Importer {
    board: Arc<dyn JobBoard>,
    sink: Arc<dyn JobSink>,
    companies: Vec<Company>,
}

impl Importer {
    pub fn new(board: Arc<dyn JobBoard>, sink: Arc<dyn JobSink>, companies: Vec<Company>) -> Self {
        Self {
            board,
            sink,
            companies,
        }
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    /// Imports every company concurrently. A failing company never stops the others.
    #[instrument(skip(self), fields(source = %self.board.source_name()))]
    pub async fn run(&self) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "🚀 Starting import for {} companies", self.companies.len());

        let mut tasks = JoinSet::new();
        for (index, company) in self.companies.iter().cloned().enumerate() {
            let board = Arc::clone(&self.board);
            let sink = Arc::clone(&self.sink);
            tasks.spawn(async move {
                let outcome = import_company(board.as_ref(), sink.as_ref(), &company).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<CompanyOutcome>> = vec![None; self.companies.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!("Company import task aborted: {}", e),
            }
        }

        let companies = slots
            .into_iter()
            .zip(&self.companies)
            .map(|(slot, company)| {
                slot.unwrap_or_else(|| {
                    counter!("job_importer_company_failures_total", "company" => company.token.clone())
                        .increment(1);
                    CompanyOutcome::fetch_failed(company, "import task aborted".into())
                })
            })
            .collect();

        let flush_error = match self.sink.flush().await {
            Ok(()) => None,
            Err(e) => {
                error!("Failed to flush sink: {}", e);
                Some(e.to_string())
            }
        };

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            companies,
            flush_error,
        };
        info!(
            %run_id,
            "✅ Import finished: {} records imported, {} records failed, {} companies failed",
            summary.records_imported(),
            summary.records_failed(),
            summary.companies_failed()
        );
        match serde_json::to_string(&summary) {
            Ok(json) => debug!(summary = %json, "Run summary"),
            Err(e) => warn!("Failed to serialize run summary: {}", e),
        }
        summary
    }

    pub async fn import_company(&self, company: &Company) -> CompanyOutcome {
        import_company(self.board.as_ref(), self.sink.as_ref(), company).await
    }
}

#[instrument(skip(board, sink, company), fields(company = %company.token))]
async fn import_company(board: &dyn JobBoard, sink: &dyn JobSink, company: &Company) -> CompanyOutcome {
    info!("📡 Fetching jobs for {} ({})...", company.display_name, company.token);
    println!("📡 Fetching jobs for {} ({})...", company.display_name, company.token);

    let t_fetch = std::time::Instant::now();
    let fetched = board.fetch_jobs(&company.token).await;
    histogram!("job_importer_fetch_duration_seconds", "company" => company.token.clone())
        .record(t_fetch.elapsed().as_secs_f64());

    let jobs = match fetched {
        Ok(jobs) => jobs,
        Err(e) => {
            error!("Error fetching jobs for {} ({}): {}", company.display_name, company.token, e);
            println!("❌ Error fetching jobs for {} ({}): {}", company.display_name, company.token, e);
            counter!("job_importer_company_failures_total", "company" => company.token.clone())
                .increment(1);
            return CompanyOutcome::fetch_failed(company, e.to_string());
        }
    };

    info!("📦 Found {} jobs at {}", jobs.len(), company.display_name);
    println!("📦 Found {} jobs at {}", jobs.len(), company.display_name);

    let mut imported = 0;
    let mut failures = Vec::new();

    for (index, raw) in jobs.iter().enumerate() {
        match import_record(sink, raw, &company.display_name).await {
            Ok(id) => {
                imported += 1;
                debug!("Inserted job {}", id);
                println!("✅ {}", tagged(&company.token, format_args!("Inserted job {}", id)));
            }
            Err((stage, e)) => {
                let job_id = raw_job_id(raw);
                let label = job_id.as_deref().unwrap_or("<no id>");
                match stage {
                    FailureStage::Normalize => {
                        warn!("Skipping job {} at index {}: {}", label, index, e);
                        println!("⚠️  {}", tagged(&company.token, format_args!("Skipping job {}: {}", label, e)));
                    }
                    FailureStage::Upsert => {
                        error!("Failed to insert job {}: {}", label, e);
                        println!("❌ {}", tagged(&company.token, format_args!("Failed to insert job {}: {}", label, e)));
                    }
                }
                failures.push(RecordFailure {
                    index,
                    job_id,
                    stage,
                    error: e.to_string(),
                });
            }
        }
    }

    counter!("job_importer_records_imported_total", "company" => company.token.clone())
        .increment(imported as u64);
    counter!("job_importer_records_failed_total", "company" => company.token.clone())
        .increment(failures.len() as u64);

    CompanyOutcome {
        token: company.token.clone(),
        display_name: company.display_name.clone(),
        total_jobs: jobs.len(),
        imported,
        failures,
        fetch_error: None,
    }
}

async fn import_record(
    sink: &dyn JobSink,
    raw: &RawJobRecord,
    company_name: &str,
) -> std::result::Result<String, (FailureStage, crate::error::ImporterError)> {
    let record = normalize(raw, company_name).map_err(|e| (FailureStage::Normalize, e))?;
    sink.upsert(&record)
        .await
        .map_err(|e| (FailureStage::Upsert, e))?;
    Ok(record.id)
}

/// Prefixes a per-record status line with its board token; companies run concurrently.
fn tagged(token: &str, message: impl std::fmt::Display) -> String {
    format!("[{}] {}", token, message)
}

fn raw_job_id(raw: &RawJobRecord) -> Option<String> {
    match raw.get("id")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
