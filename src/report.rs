//! Run output.
//!
//! Writes the recorded rows and the run summary as JSON, a human-readable
//! text summary, and an optional zstd-compressed bincode dump of the rows
//! for later reloading.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::orchestrator::RunSummary;
use crate::telemetry::{Datum, MemoryRecorder, Value, REACTOR_INVENTORIES, STORAGE_INVENTORIES};

const DUMP_COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub scenario: String,
    pub version: String,
}

impl ReportMetadata {
    pub fn new(scenario: &Path) -> Self {
        ReportMetadata {
            generated_at: chrono::Utc::now().to_rfc3339(),
            scenario: scenario.display().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Everything written to the JSON report
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub metadata: ReportMetadata,
    pub summary: &'a RunSummary,
    pub records: &'a [Datum],
}

/// Generate JSON report
pub fn generate_json_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Generate human-readable text report
pub fn generate_text_report(
    metadata: &ReportMetadata,
    summary: &RunSummary,
    records: &MemoryRecorder,
    output_path: &Path,
) -> Result<()> {
    let text = render_text_report(metadata, summary, records);
    fs::write(output_path, text)
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

pub fn render_text_report(
    metadata: &ReportMetadata,
    summary: &RunSummary,
    records: &MemoryRecorder,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("=".repeat(80));
    lines.push("                     TRICYCLE FUEL CYCLE SIMULATION".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());

    lines.push(format!("Report Date: {}", metadata.generated_at));
    lines.push(format!("Scenario: {}", metadata.scenario));
    lines.push(format!(
        "Timesteps: {} x {:.0} s",
        summary.duration, summary.timestep_seconds
    ));
    lines.push(format!(
        "Transactions: {} ({:.6} kg traded)",
        summary.transactions, summary.traded_quantity
    ));
    lines.push(String::new());

    lines.push("=".repeat(80));
    lines.push("                               FACILITIES".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());

    for facility in &summary.facilities {
        lines.push(format!(
            "[{}] {} ({})",
            facility.id, facility.name, facility.archetype
        ));
        lines.push(format!("  Final state: {}", facility.final_state));
        if facility.archetype != "DecayStorage" {
            lines.push(format!(
                "  Online for {} of {} timesteps",
                facility.online_steps, summary.duration
            ));
            lines.push(format!(
                "  Startups: {}  Shutdowns: {}",
                facility.startups, facility.shutdowns
            ));
        }

        if let Some(last) = final_inventory(records, facility.id) {
            lines.push("  Final inventory (kg):".to_string());
            for (column, value) in &last.values {
                if let Some(qty) = value.as_f64() {
                    lines.push(format!("    {:<20} {:>14.6}", column, qty));
                }
            }
        }
        lines.push(String::new());
    }

    if !summary.agents.is_empty() {
        lines.push("Agents:".to_string());
        for agent in &summary.agents {
            lines.push(format!("  {:>3}  {:<24} {}", agent.id, agent.name, agent.kind));
        }
        lines.push(String::new());
    }

    lines.push("Recorded rows:".to_string());
    for (table, count) in &summary.record_counts {
        lines.push(format!("  {:<24} {}", table, count));
    }
    lines.push(String::new());

    lines.join("\n")
}

fn final_inventory(records: &MemoryRecorder, agent_id: usize) -> Option<&Datum> {
    records
        .agent_table(REACTOR_INVENTORIES, agent_id)
        .chain(records.agent_table(STORAGE_INVENTORIES, agent_id))
        .max_by_key(|d| d.time)
}

/// Self-describing value for the binary dump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum DumpValue {
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DumpRow {
    table: String,
    agent_id: u64,
    time: u32,
    values: Vec<(String, DumpValue)>,
}

impl From<&Datum> for DumpRow {
    fn from(datum: &Datum) -> Self {
        DumpRow {
            table: datum.table.clone(),
            agent_id: datum.agent_id as u64,
            time: datum.time,
            values: datum
                .values
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        Value::Int(i) => DumpValue::Int(*i),
                        Value::Float(f) => DumpValue::Float(*f),
                        Value::Text(s) => DumpValue::Text(s.clone()),
                    };
                    (k.clone(), value)
                })
                .collect(),
        }
    }
}

impl From<DumpRow> for Datum {
    fn from(row: DumpRow) -> Self {
        let values: BTreeMap<String, Value> = row
            .values
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    DumpValue::Int(i) => Value::Int(i),
                    DumpValue::Float(f) => Value::Float(f),
                    DumpValue::Text(s) => Value::Text(s),
                };
                (k, value)
            })
            .collect();
        let mut datum = Datum::new(&row.table, row.agent_id as usize, row.time);
        datum.values = values;
        datum
    }
}

/// Write every row as a zstd-compressed bincode stream
pub fn write_record_dump(records: &[Datum], output_path: &Path) -> Result<()> {
    let rows: Vec<DumpRow> = records.iter().map(DumpRow::from).collect();
    let encoded = bincode::serialize(&rows).context("Failed to encode record dump")?;
    let compressed = zstd::stream::encode_all(encoded.as_slice(), DUMP_COMPRESSION_LEVEL)
        .context("Failed to compress record dump")?;

    fs::write(output_path, &compressed)
        .with_context(|| format!("Failed to write record dump to {}", output_path.display()))?;

    log::info!(
        "Record dump written to {} ({} rows, {} -> {} bytes)",
        output_path.display(),
        rows.len(),
        encoded.len(),
        compressed.len()
    );
    Ok(())
}

/// Load rows written by [`write_record_dump`]
pub fn read_record_dump(input_path: &Path) -> Result<Vec<Datum>> {
    let compressed = fs::read(input_path)
        .with_context(|| format!("Failed to read record dump {}", input_path.display()))?;
    let encoded = zstd::stream::decode_all(compressed.as_slice())
        .context("Failed to decompress record dump")?;
    let rows: Vec<DumpRow> =
        bincode::deserialize(&encoded).context("Failed to decode record dump")?;
    Ok(rows.into_iter().map(Datum::from).collect())
}
