//! Stage 3: upsert the merged dataset into the Supabase table.
//!
//! Every merged row is posted individually with `data_upload` and the
//! composite `id` (group + final_date) attached. The conflict key the sink
//! resolves duplicates on is configurable because the historical behavior
//! (`id_slot`) disagrees with the declared composite key (`id`); we keep the
//! historical default rather than guessing which one was intended.

use crate::config::{self, SinkConfig};
use crate::normalize::table::Table;
use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use reqwest::blocking::Client;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

/// One row ready for upsert, keyed by canonical column name.
pub type Record = Map<String, Value>;

/// Turn the merged table into upsert records: drop `Unnamed` spill columns,
/// stamp every record with `uploaded_at`, and derive `id` by concatenating
/// the group value and `final_date` with no separator.
pub fn build_records(table: &Table, uploaded_at: &str) -> Result<Vec<Record>> {
    let mut table = table.clone();
    table.drop_columns(|name| name.starts_with("Unnamed"));

    let group_idx = table
        .column_index("grupo")
        .ok_or_else(|| anyhow!("merged dataset has no 'grupo' column"))?;
    let final_idx = table
        .column_index("final_date")
        .ok_or_else(|| anyhow!("merged dataset has no 'final_date' column"))?;

    let mut records = Vec::with_capacity(table.len());
    for row in table.rows() {
        let mut record = Record::new();
        for (name, cell) in table.columns().iter().zip(row) {
            record.insert(name.clone(), cell.to_json());
        }
        record.insert(
            "data_upload".to_string(),
            Value::String(uploaded_at.to_string()),
        );
        record.insert(
            "id".to_string(),
            Value::String(format!("{}{}", row[group_idx], row[final_idx])),
        );
        records.push(record);
    }
    Ok(records)
}

pub struct SupabaseSink {
    http: Client,
    endpoint: String,
    key: String,
    on_conflict: String,
}

impl SupabaseSink {
    pub fn new(config: &SinkConfig) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!(
                "{}/rest/v1/{}",
                config.url.trim_end_matches('/'),
                config.table
            ),
            key: config.key.clone(),
            on_conflict: config.on_conflict.clone(),
        }
    }

    /// Upsert one record; the configured conflict key decides
    /// update-vs-insert on the server side.
    pub fn upsert(&self, record: &Record) -> Result<()> {
        self.http
            .post(&self.endpoint)
            .query(&[("on_conflict", self.on_conflict.as_str())])
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(record)
            .send()
            .context("posting upsert")?
            .error_for_status()
            .context("upsert rejected")?;
        Ok(())
    }
}

/// Outcome of one upload run: rows attempted and the failures, as
/// (row index, error) pairs.
pub struct UploadReport {
    pub attempted: usize,
    pub failed: Vec<(usize, String)>,
}

/// Upsert every record, collecting per-row failures instead of aborting the
/// batch on the first one.
pub fn upload_records(sink: &SupabaseSink, records: &[Record]) -> UploadReport {
    let mut failed = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        if let Err(err) = sink.upsert(record) {
            warn!(row = idx, error = %err, "upsert failed");
            failed.push((idx, err.to_string()));
        }
    }
    UploadReport {
        attempted: records.len(),
        failed,
    }
}

/// Run the whole upload stage against the configured merged artifact and
/// environment-provided sink settings.
pub fn run() -> Result<()> {
    let sink_config = SinkConfig::from_env()?;
    let merged = config::merged_path(Path::new(config::NORMALIZED_DIR));
    let table = Table::read_csv(&merged)
        .with_context(|| format!("reading merged dataset {}", merged.display()))?;

    let uploaded_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let records = build_records(&table, &uploaded_at)?;

    let sink = SupabaseSink::new(&sink_config);
    let report = upload_records(&sink, &records);
    info!(
        attempted = report.attempted,
        failed = report.failed.len(),
        "upload done"
    );
    if !report.failed.is_empty() {
        bail!(
            "{} of {} rows failed to upsert",
            report.failed.len(),
            report.attempted
        );
    }
    Ok(())
}
