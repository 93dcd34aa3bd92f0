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

//! Audit trail of a protocol attribution.
//!
//! Built from the same values the report rows come from. Nothing here feeds back into the rows.

use std::collections::BTreeSet;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    allocation::Allocation,
    bounty::AllocatedBounty,
    config::{ProtocolTokenConfig, TokenRole},
    equivalence::ConversionRatio,
    flows::ProtocolFlowTotals,
    matcher::{PairingDiagnostic, TokenValuation, WindowMatches},
    merge::{CsvRow, ReportMode},
};

/// Per-bounty trace of the values behind a report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BountyAudit {
    pub bounty_id: String,
    pub gauge: Address,
    pub reward_token: Address,
    pub reward_symbol: String,
    pub role: TokenRole,
    pub claimed_amount: f64,
    pub native_equivalent: f64,
    pub share: f64,
    pub normalized_share: f64,
    pub sd_token_amount: f64,
}

impl From<&AllocatedBounty> for BountyAudit {
    fn from(allocated: &AllocatedBounty) -> Self {
        let claim = allocated.claim();
        Self {
            bounty_id: claim.bounty.bounty_id.clone(),
            gauge: claim.bounty.gauge,
            reward_token: claim.reward_token(),
            reward_symbol: claim.reward_symbol.clone(),
            role: claim.role,
            claimed_amount: claim.claimed_amount,
            native_equivalent: allocated.valued.native_equivalent,
            share: allocated.share,
            normalized_share: allocated.normalized_share,
            sd_token_amount: allocated.sd_token_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolAudit {
    pub protocol: String,
    pub mode: ReportMode,
    pub tokens: ProtocolTokenConfig,
    pub window_count: usize,
    pub ratio: ConversionRatio,
    pub totals: ProtocolFlowTotals,
    pub matches: Vec<WindowMatches>,
    pub diagnostics: Vec<PairingDiagnostic>,
    /// Reward tokens claimed by bounties but never matched to a settlement inflow.
    pub unattributed_tokens: BTreeSet<Address>,
    pub total_sd_token_in: f64,
    pub direct_sd_token_amount: f64,
    pub remaining_sd_token_amount: f64,
    pub allocated_sd_token_amount: f64,
    pub unattributed_sd_token_amount: f64,
    pub bounties: Vec<BountyAudit>,
    /// Rows removed from the report by the mode.
    pub dropped_rows: Vec<CsvRow>,
}

/// Inputs for [ProtocolAudit::new], grouped to keep the constructor readable.
pub struct AuditParts<'a> {
    pub protocol: &'a str,
    pub mode: ReportMode,
    pub tokens: ProtocolTokenConfig,
    pub window_count: usize,
    pub ratio: &'a ConversionRatio,
    pub totals: &'a ProtocolFlowTotals,
    pub valuation: TokenValuation,
    pub unattributed_tokens: BTreeSet<Address>,
    pub allocation: &'a Allocation,
    pub dropped_rows: Vec<CsvRow>,
}

impl ProtocolAudit {
    pub fn new(parts: AuditParts<'_>) -> Self {
        let allocation = parts.allocation;
        Self {
            protocol: parts.protocol.to_string(),
            mode: parts.mode,
            tokens: parts.tokens,
            window_count: parts.window_count,
            ratio: parts.ratio.clone(),
            totals: parts.totals.clone(),
            matches: parts.valuation.windows,
            diagnostics: parts.valuation.diagnostics,
            unattributed_tokens: parts.unattributed_tokens,
            total_sd_token_in: allocation.total_sd_token_in,
            direct_sd_token_amount: allocation.direct_sd_token_amount,
            remaining_sd_token_amount: allocation.remaining_sd_token_amount,
            allocated_sd_token_amount: allocation.allocated_sd_token_amount(),
            unattributed_sd_token_amount: allocation.unattributed_sd_token_amount,
            bounties: allocation.bounties.iter().map(BountyAudit::from).collect(),
            dropped_rows: parts.dropped_rows,
        }
    }

    /// Whether anything in this run deserves a second look.
    pub fn has_findings(&self) -> bool {
        !self.diagnostics.is_empty()
            || !self.unattributed_tokens.is_empty()
            || self.unattributed_sd_token_amount > 0.0
    }
}
