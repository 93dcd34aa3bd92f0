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

//! Merging allocated bounties into one report row per (protocol, gauge, reward token).

use std::collections::BTreeMap;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::bounty::AllocatedBounty;

/// Which rows end up in the report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Rows without sdToken value are dropped.
    #[default]
    Standard,
    /// Every row is kept.
    Audit,
    /// Over-the-counter settlement report. Every row is kept.
    Otc,
}

impl ReportMode {
    pub fn keeps_zero_rows(self) -> bool {
        match self {
            ReportMode::Standard => false,
            ReportMode::Audit | ReportMode::Otc => true,
        }
    }
}

impl std::fmt::Display for ReportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReportMode::Standard => "standard",
            ReportMode::Audit => "audit",
            ReportMode::Otc => "otc",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(ReportMode::Standard),
            "audit" => Ok(ReportMode::Audit),
            "otc" => Ok(ReportMode::Otc),
            other => Err(format!("unknown report mode {other:?}, expected standard, audit or otc")),
        }
    }
}

/// One line of the per-protocol report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub protocol: String,
    pub gauge_name: String,
    pub gauge_address: Address,
    /// Reward token symbol.
    pub reward_token: String,
    pub reward_address: Address,
    pub reward_amount: f64,
    pub reward_sd_value: f64,
    pub share_percentage: f64,
}

/// Rows kept for the report and rows dropped by the mode, both grouped by protocol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedRows {
    pub rows: BTreeMap<String, Vec<CsvRow>>,
    pub dropped: BTreeMap<String, Vec<CsvRow>>,
}

type RowKey = (String, Address, Address);

/// Merge allocated bounties, possibly from several protocols, into report rows.
///
/// Rows are sorted by `(protocol, gauge, reward token)`. Address keys compare case-insensitively
/// since they are parsed addresses.
pub fn merge_rows<'a, I>(entries: I, mode: ReportMode) -> MergedRows
where
    I: IntoIterator<Item = (&'a str, &'a AllocatedBounty)>,
{
    let mut merged: BTreeMap<RowKey, CsvRow> = BTreeMap::new();
    for (protocol, allocated) in entries {
        let bounty = allocated.bounty();
        let key = (protocol.to_string(), bounty.gauge, bounty.reward_token);
        let row = merged.entry(key).or_insert_with(|| CsvRow {
            protocol: protocol.to_string(),
            gauge_name: String::new(),
            gauge_address: bounty.gauge,
            reward_token: allocated.claim().reward_symbol.clone(),
            reward_address: bounty.reward_token,
            reward_amount: 0.0,
            reward_sd_value: 0.0,
            share_percentage: 0.0,
        });
        if row.gauge_name.is_empty() {
            if let Some(name) = &bounty.gauge_name {
                row.gauge_name = name.clone();
            }
        }
        row.reward_amount += allocated.claim().claimed_amount;
        row.reward_sd_value += allocated.sd_token_amount;
        row.share_percentage += allocated.share * 100.0;
    }

    let mut result = MergedRows::default();
    for ((protocol, _, _), row) in merged {
        let target = if row.reward_sd_value == 0.0 && !mode.keeps_zero_rows() {
            &mut result.dropped
        } else {
            &mut result.rows
        };
        target.entry(protocol).or_default().push(row);
    }
    result
}

/// Merge the allocated bounties of a single protocol.
pub fn merge_protocol(
    protocol: &str,
    bounties: &[AllocatedBounty],
    mode: ReportMode,
) -> MergedRows {
    merge_rows(bounties.iter().map(|bounty| (protocol, bounty)), mode)
}
