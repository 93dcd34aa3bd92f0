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

//! Settlement-token valuation of reward tokens.
//!
//! Reward tokens are sold for the settlement token inside the same window, so each reward outflow
//! is valued by a settlement inflow from that window. How the two lists are paired is a
//! [PairingStrategy]; [PositionalPairing] pairs them by index in event order.

use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::classifier::{BlockFlowRecord, ProtocolWindows, WindowKey};

/// A reward outflow together with the settlement amount it was valued at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedValue {
    pub address: Address,
    pub symbol: String,
    pub amount: U256,
    pub settlement_value: U256,
}

/// Recorded when the settlement inflows and reward outflows of a window do not line up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingDiagnostic {
    pub window: WindowKey,
    pub settlement_in_count: usize,
    pub rewards_out_count: usize,
    pub paired: usize,
}

/// Result of pairing a single window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowPairing {
    pub matches: Vec<MatchedValue>,
    pub diagnostic: Option<PairingDiagnostic>,
}

/// Policy deciding which settlement inflow values which reward outflow.
pub trait PairingStrategy {
    fn pair(&self, window: WindowKey, record: &BlockFlowRecord) -> WindowPairing;
}

impl<T: PairingStrategy + ?Sized> PairingStrategy for &T {
    fn pair(&self, window: WindowKey, record: &BlockFlowRecord) -> WindowPairing {
        (**self).pair(window, record)
    }
}

/// Pairs index `i` of the settlement inflows with index `i` of the reward outflows.
///
/// Only valid when the router emits the settlement inflow in the same relative order as the
/// reward outflow it was bought with.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalPairing;

impl PairingStrategy for PositionalPairing {
    fn pair(&self, window: WindowKey, record: &BlockFlowRecord) -> WindowPairing {
        let settlement_in_count = record.settlement_in.len();
        let rewards_out_count = record.rewards_out.len();

        let matches: Vec<MatchedValue> = record
            .rewards_out
            .iter()
            .zip(&record.settlement_in)
            .map(|(reward, settlement)| MatchedValue {
                address: reward.token,
                symbol: reward.symbol.clone(),
                amount: reward.amount,
                settlement_value: *settlement,
            })
            .collect();

        let diagnostic = (settlement_in_count != rewards_out_count).then(|| {
            tracing::warn!(
                "Pairing mismatch in block {}: {} settlement inflows vs {} reward outflows, pairing {}",
                window.block_number,
                settlement_in_count,
                rewards_out_count,
                matches.len()
            );
            PairingDiagnostic {
                window,
                settlement_in_count,
                rewards_out_count,
                paired: matches.len(),
            }
        });

        WindowPairing { matches, diagnostic }
    }
}

/// Matches of one window, kept for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMatches {
    pub window: WindowKey,
    pub matches: Vec<MatchedValue>,
}

/// Settlement valuation of every reward token seen across a protocol's windows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenValuation {
    /// Cumulative settlement value per reward token.
    pub token_values: BTreeMap<Address, U256>,
    pub windows: Vec<WindowMatches>,
    pub diagnostics: Vec<PairingDiagnostic>,
}

/// Run `strategy` over every window and accumulate settlement values per reward token.
pub fn value_reward_tokens<S: PairingStrategy + ?Sized>(
    windows: &ProtocolWindows,
    strategy: &S,
) -> TokenValuation {
    let mut valuation = TokenValuation::default();
    for (key, record) in windows {
        let pairing = strategy.pair(*key, record);
        for matched in &pairing.matches {
            let entry = valuation.token_values.entry(matched.address).or_insert(U256::ZERO);
            *entry = entry.saturating_add(matched.settlement_value);
        }
        if !pairing.matches.is_empty() {
            valuation.windows.push(WindowMatches { window: *key, matches: pairing.matches });
        }
        valuation.diagnostics.extend(pairing.diagnostic);
    }
    valuation
}
