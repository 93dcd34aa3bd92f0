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

//! Window-level flow totals for a protocol.

use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{classifier::ProtocolWindows, matcher::TokenValuation};

/// Flows summed over every window of a settlement period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolFlowTotals {
    pub total_settlement_in: U256,
    pub total_settlement_out: U256,
    pub total_native_in: U256,
    pub total_native_out: U256,
    pub total_sd_token_in: U256,
    pub total_sd_token_out: U256,
    /// Settlement value per reward token. Not bounded by `total_settlement_in`.
    pub token_values: BTreeMap<Address, U256>,
}

impl ProtocolFlowTotals {
    /// No flow of any kind was observed.
    pub fn is_zero(&self) -> bool {
        self.total_settlement_in.is_zero()
            && self.total_settlement_out.is_zero()
            && self.total_native_in.is_zero()
            && self.total_native_out.is_zero()
            && self.total_sd_token_in.is_zero()
            && self.total_sd_token_out.is_zero()
    }
}

fn sum(values: &[U256]) -> U256 {
    values.iter().fold(U256::ZERO, |acc, v| acc.saturating_add(*v))
}

/// Sum classified flows across all windows and attach the reward token valuation.
pub fn aggregate_flows(windows: &ProtocolWindows, valuation: &TokenValuation) -> ProtocolFlowTotals {
    let mut totals = ProtocolFlowTotals::default();
    for record in windows.values() {
        totals.total_settlement_in += sum(&record.settlement_in);
        totals.total_settlement_out += sum(&record.settlement_out);
        totals.total_native_in += sum(&record.native_in);
        totals.total_native_out += sum(&record.native_out);
        totals.total_sd_token_in += sum(&record.sd_token_in);
        totals.total_sd_token_out += sum(&record.sd_token_out);
    }
    totals.token_values = valuation.token_values.clone();
    totals
}
