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

//! Settlement -> native conversion ratio and native-token equivalents of bounties.

use std::collections::{BTreeSet, HashMap};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    bounty::{ClaimedBounty, ValuedBounty},
    config::{ProtocolTokenConfig, TokenRole},
    flows::ProtocolFlowTotals,
    tokens::{to_decimal, TokenMetadataSource},
    AttributionError,
};

/// Where the conversion ratio came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioSource {
    /// Native outflows not covered by native bounties, over observed settlement inflows.
    ObservedSettlement,
    /// No settlement inflow observed; native outflows over settlement-token bounties.
    BountyImplied,
    /// Neither is available. The ratio is zero.
    Underivable,
}

/// Conversion from one unit of settlement token to native token, in decimal units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRatio {
    pub total_native_out: f64,
    pub total_settlement_in: f64,
    pub native_from_bounties: f64,
    pub settlement_from_bounties: f64,
    pub native_from_settlement: f64,
    pub ratio: f64,
    pub source: RatioSource,
}

/// Divide, returning zero instead of NaN or infinity.
pub(crate) fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && numerator.is_finite() {
        numerator / denominator
    } else {
        0.0
    }
}

/// Derive the settlement -> native ratio from the period's flows and the bounties paid directly
/// in native or settlement token.
pub fn derive_ratio<M: TokenMetadataSource>(
    totals: &ProtocolFlowTotals,
    claims: &[ClaimedBounty],
    config: &ProtocolTokenConfig,
    metadata: &M,
) -> Result<ConversionRatio, AttributionError> {
    let native = config.native_token;
    let settlement = config.settlement_token;
    let total_native_out = to_decimal(totals.total_native_out, native, metadata.decimals(native))?;
    let total_settlement_in =
        to_decimal(totals.total_settlement_in, settlement, metadata.decimals(settlement))?;

    let native_from_bounties: f64 = claims
        .iter()
        .filter(|claim| claim.role == TokenRole::Native)
        .map(|claim| claim.claimed_amount)
        .sum();
    let settlement_from_bounties: f64 = claims
        .iter()
        .filter(|claim| claim.role == TokenRole::Settlement)
        .map(|claim| claim.claimed_amount)
        .sum();

    let mut native_from_settlement = total_native_out - native_from_bounties;
    if native_from_settlement < 0.0 {
        tracing::warn!(
            "Native bounties ({native_from_bounties}) exceed native outflows ({total_native_out}); \
             treating settlement-sourced native as zero"
        );
        native_from_settlement = 0.0;
    }

    let (ratio, source) = if total_settlement_in > 0.0 {
        (safe_div(native_from_settlement, total_settlement_in), RatioSource::ObservedSettlement)
    } else if settlement_from_bounties > 0.0 {
        (safe_div(total_native_out, settlement_from_bounties), RatioSource::BountyImplied)
    } else {
        (0.0, RatioSource::Underivable)
    };

    Ok(ConversionRatio {
        total_native_out,
        total_settlement_in,
        native_from_bounties,
        settlement_from_bounties,
        native_from_settlement,
        ratio,
        source,
    })
}

/// Bounties valued in native token, plus the reward tokens no settlement value was found for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Equivalence {
    pub bounties: Vec<ValuedBounty>,
    pub unattributed_tokens: BTreeSet<Address>,
}

/// Compute the native-token equivalent of every bounty.
///
/// Reward-token bounties share their token's matched settlement value in proportion to their
/// part of the total amount claimed in that token. Bounties for the same token are assumed to
/// come from the same trades.
pub fn value_bounties<M: TokenMetadataSource>(
    claims: Vec<ClaimedBounty>,
    totals: &ProtocolFlowTotals,
    ratio: &ConversionRatio,
    config: &ProtocolTokenConfig,
    metadata: &M,
) -> Result<Equivalence, AttributionError> {
    let settlement = config.settlement_token;
    let settlement_decimals = metadata.decimals(settlement);

    let mut claimed_per_token: HashMap<Address, f64> = HashMap::new();
    for claim in claims.iter().filter(|claim| claim.role == TokenRole::Reward) {
        *claimed_per_token.entry(claim.reward_token()).or_insert(0.0) += claim.claimed_amount;
    }

    let mut token_values: HashMap<Address, f64> = HashMap::new();
    for token in claimed_per_token.keys() {
        if let Some(value) = totals.token_values.get(token) {
            token_values.insert(*token, to_decimal(*value, settlement, settlement_decimals)?);
        }
    }

    let mut unattributed_tokens = BTreeSet::new();
    let mut bounties = Vec::with_capacity(claims.len());
    for claim in claims {
        let native_equivalent = match claim.role {
            TokenRole::Native | TokenRole::SdToken => claim.claimed_amount,
            TokenRole::Settlement => claim.claimed_amount * ratio.ratio,
            TokenRole::Reward => match token_values.get(&claim.reward_token()) {
                Some(token_value) => {
                    let total_for_token =
                        claimed_per_token.get(&claim.reward_token()).copied().unwrap_or(0.0);
                    safe_div(claim.claimed_amount, total_for_token) * token_value * ratio.ratio
                }
                None => {
                    if unattributed_tokens.insert(claim.reward_token()) {
                        tracing::warn!(
                            "No settlement value matched for reward token {} ({}); valuing at zero",
                            claim.reward_symbol,
                            claim.reward_token()
                        );
                    }
                    0.0
                }
            },
        };
        bounties.push(ValuedBounty { claim, native_equivalent });
    }

    Ok(Equivalence { bounties, unattributed_tokens })
}
