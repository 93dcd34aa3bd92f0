// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Serialization of report rows and audit trails.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{audit::ProtocolAudit, merge::CsvRow};

pub const CSV_HEADER: [&str; 7] = [
    "Gauge Name",
    "Gauge Address",
    "Reward Token",
    "Reward Address",
    "Reward Amount",
    "Reward sd Value",
    "Share % per Protocol",
];

/// Write `rows` as a `;`-separated table with a header line.
pub fn write_csv<W: Write>(writer: W, rows: &[CsvRow]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(b';')
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for row in rows {
        csv.write_record([
            row.gauge_name.clone(),
            row.gauge_address.to_string(),
            row.reward_token.clone(),
            row.reward_address.to_string(),
            format!("{:.6}", row.reward_amount),
            format!("{:.6}", row.reward_sd_value),
            format!("{:.2}", row.share_percentage),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_audit<W: Write>(writer: W, audit: &ProtocolAudit) -> Result<()> {
    serde_json::to_writer_pretty(writer, audit)?;
    Ok(())
}

pub fn csv_path(dir: &Path, protocol: &str) -> PathBuf {
    dir.join(format!("{protocol}.csv"))
}

pub fn audit_path(dir: &Path, protocol: &str) -> PathBuf {
    dir.join(format!("{protocol}-audit.json"))
}

/// Write `<dir>/<protocol>.csv` and, when given, `<dir>/<protocol>-audit.json`.
///
/// Returns the paths written.
pub fn write_protocol_report(
    dir: &Path,
    protocol: &str,
    rows: &[CsvRow],
    audit: Option<&ProtocolAudit>,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let path = csv_path(dir, protocol);
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(BufWriter::new(file), rows)
        .with_context(|| format!("failed to write {}", path.display()))?;
    written.push(path);

    if let Some(audit) = audit {
        let path = audit_path(dir, protocol);
        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_audit(&mut writer, audit)
            .with_context(|| format!("failed to write {}", path.display()))?;
        writer.flush()?;
        written.push(path);
    }

    tracing::debug!("Wrote {} report file(s) for {protocol}", written.len());
    Ok(written)
}
