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

//! Bounty records and the values each stage derives from them.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    config::{ProtocolTokenConfig, TokenRole},
    tokens::{to_decimal, TokenMetadataSource},
    AttributionError,
};

/// A claimed bounty, as produced by the bounty collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounty {
    pub bounty_id: String,
    pub gauge: Address,
    /// Unsigned integer scaled by the reward token's decimals.
    pub amount: String,
    pub reward_token: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gauge_name: Option<String>,
}

/// A bounty with its amount parsed and its reward token resolved for a protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedBounty {
    pub bounty: Bounty,
    pub role: TokenRole,
    pub reward_symbol: String,
    pub raw_amount: U256,
    /// `raw_amount` in decimal units of the reward token.
    pub claimed_amount: f64,
}

impl ClaimedBounty {
    pub fn parse<M: TokenMetadataSource>(
        bounty: &Bounty,
        config: &ProtocolTokenConfig,
        metadata: &M,
    ) -> Result<Self, AttributionError> {
        let invalid = || AttributionError::InvalidAmount {
            bounty_id: bounty.bounty_id.clone(),
            amount: bounty.amount.clone(),
        };
        let digits = bounty.amount.trim();
        if digits.is_empty() {
            return Err(invalid());
        }
        let raw_amount = U256::from_str_radix(digits, 10).map_err(|_| invalid())?;
        let token = metadata.metadata(bounty.reward_token);
        let claimed_amount = to_decimal(raw_amount, bounty.reward_token, token.decimals)?;
        Ok(Self {
            bounty: bounty.clone(),
            role: config.role_of(bounty.reward_token),
            reward_symbol: token.symbol,
            raw_amount,
            claimed_amount,
        })
    }

    pub fn reward_token(&self) -> Address {
        self.bounty.reward_token
    }
}

/// Output of the equivalence stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuedBounty {
    pub claim: ClaimedBounty,
    pub native_equivalent: f64,
}

impl ValuedBounty {
    /// sdToken-denominated bounties are paid 1:1 outside the proportional pool.
    pub fn is_sd_token_pass_through(&self) -> bool {
        self.claim.role == TokenRole::SdToken
    }
}

/// Output of the allocation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedBounty {
    pub valued: ValuedBounty,
    pub share: f64,
    /// Share among the bounties paid from the proportional pool; zero for sdToken pass-through.
    pub normalized_share: f64,
    pub sd_token_amount: f64,
}

impl AllocatedBounty {
    pub fn bounty(&self) -> &Bounty {
        &self.valued.claim.bounty
    }

    pub fn claim(&self) -> &ClaimedBounty {
        &self.valued.claim
    }
}
