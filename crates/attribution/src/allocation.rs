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

//! Allocation of minted sdToken across bounties.

use serde::{Deserialize, Serialize};

use crate::{
    bounty::{AllocatedBounty, ValuedBounty},
    config::ProtocolTokenConfig,
    equivalence::safe_div,
    flows::ProtocolFlowTotals,
    tokens::{to_decimal, TokenMetadataSource},
    AttributionError,
};

/// sdToken allocation for one protocol and period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub bounties: Vec<AllocatedBounty>,
    /// sdToken minted to the processor over the period, in decimal units.
    pub total_sd_token_in: f64,
    pub total_native_equivalent: f64,
    /// sdToken claimed directly by sdToken-denominated bounties.
    pub direct_sd_token_amount: f64,
    /// Minted sdToken left for the proportional pool.
    pub remaining_sd_token_amount: f64,
    /// Part of the pool no bounty received because no bounty had value.
    pub unattributed_sd_token_amount: f64,
}

impl Allocation {
    pub fn allocated_sd_token_amount(&self) -> f64 {
        self.bounties.iter().map(|bounty| bounty.sd_token_amount).sum()
    }
}

/// Split the minted sdToken: sdToken bounties pass through 1:1, every other bounty receives its
/// normalized share of what remains.
pub fn allocate<M: TokenMetadataSource>(
    valued: Vec<ValuedBounty>,
    totals: &ProtocolFlowTotals,
    config: &ProtocolTokenConfig,
    metadata: &M,
) -> Result<Allocation, AttributionError> {
    let sd_token = config.sd_token;
    let total_sd_token_in =
        to_decimal(totals.total_sd_token_in, sd_token, metadata.decimals(sd_token))?;

    let total_native_equivalent: f64 =
        valued.iter().map(|bounty| bounty.native_equivalent).sum();

    let shares: Vec<f64> = valued
        .iter()
        .map(|bounty| safe_div(bounty.native_equivalent, total_native_equivalent))
        .collect();

    let direct_sd_token_amount: f64 = valued
        .iter()
        .filter(|bounty| bounty.is_sd_token_pass_through())
        .map(|bounty| bounty.claim.claimed_amount)
        .sum();
    let mut remaining_sd_token_amount = total_sd_token_in - direct_sd_token_amount;
    if remaining_sd_token_amount < 0.0 {
        tracing::warn!(
            "Direct sdToken bounties ({direct_sd_token_amount}) exceed minted sdToken \
             ({total_sd_token_in}); nothing left to distribute"
        );
        remaining_sd_token_amount = 0.0;
    }

    let pooled_share_sum: f64 = valued
        .iter()
        .zip(&shares)
        .filter(|(bounty, _)| !bounty.is_sd_token_pass_through())
        .map(|(_, share)| *share)
        .sum();

    let bounties: Vec<AllocatedBounty> = valued
        .into_iter()
        .zip(shares)
        .map(|(bounty, share)| {
            if bounty.is_sd_token_pass_through() {
                let sd_token_amount = bounty.claim.claimed_amount;
                AllocatedBounty { valued: bounty, share, normalized_share: 0.0, sd_token_amount }
            } else {
                let normalized_share = safe_div(share, pooled_share_sum);
                AllocatedBounty {
                    valued: bounty,
                    share,
                    normalized_share,
                    sd_token_amount: normalized_share * remaining_sd_token_amount,
                }
            }
        })
        .collect();

    let unattributed_sd_token_amount =
        if pooled_share_sum > 0.0 { 0.0 } else { remaining_sd_token_amount };
    if unattributed_sd_token_amount > 0.0 {
        tracing::warn!(
            "{unattributed_sd_token_amount} sdToken left unattributed: no bounty in the pool has value"
        );
    }

    Ok(Allocation {
        bounties,
        total_sd_token_in,
        total_native_equivalent,
        direct_sd_token_amount,
        remaining_sd_token_amount,
        unattributed_sd_token_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounty::{Bounty, ClaimedBounty};
    use crate::tokens::StaticTokenMetadata;
    use alloy::primitives::{address, Address, U256};

    const NATIVE: Address = address!("0x0000000000000000000000000000000000000a01");
    const SD: Address = address!("0x0000000000000000000000000000000000000a02");
    const SETTLEMENT: Address = address!("0x0000000000000000000000000000000000000a03");
    const R1: Address = address!("0x0000000000000000000000000000000000000b01");
    const CONFIG: ProtocolTokenConfig =
        ProtocolTokenConfig { native_token: NATIVE, sd_token: SD, settlement_token: SETTLEMENT };

    fn valued(token: Address, claimed: f64, native_equivalent: f64) -> ValuedBounty {
        let bounty = Bounty {
            bounty_id: "1".to_string(),
            gauge: Address::ZERO,
            amount: "0".to_string(),
            reward_token: token,
            gauge_name: None,
        };
        let mut claim =
            ClaimedBounty::parse(&bounty, &CONFIG, &StaticTokenMetadata::new()).unwrap();
        claim.claimed_amount = claimed;
        ValuedBounty { claim, native_equivalent }
    }

    fn minted(amount: u64) -> ProtocolFlowTotals {
        ProtocolFlowTotals {
            total_sd_token_in: U256::from(amount) * U256::from(10u64).pow(U256::from(18)),
            ..Default::default()
        }
    }

    #[test]
    fn single_bounty_receives_the_pool() {
        let allocation =
            allocate(vec![valued(R1, 50.0, 100.0)], &minted(10), &CONFIG, &StaticTokenMetadata::new())
                .unwrap();
        let bounty = &allocation.bounties[0];
        assert_eq!(bounty.share, 1.0);
        assert_eq!(bounty.normalized_share, 1.0);
        assert_eq!(bounty.sd_token_amount, 10.0);
    }

    #[test]
    fn sd_token_bounties_pass_through() {
        let bounties = vec![
            valued(SD, 4.0, 4.0),
            valued(R1, 1.0, 12.0),
            valued(NATIVE, 6.0, 6.0),
            valued(SETTLEMENT, 1.0, 2.0),
        ];
        let allocation =
            allocate(bounties, &minted(24), &CONFIG, &StaticTokenMetadata::new()).unwrap();
        assert_eq!(allocation.direct_sd_token_amount, 4.0);
        assert_eq!(allocation.remaining_sd_token_amount, 20.0);

        let amounts: Vec<f64> = allocation.bounties.iter().map(|b| b.sd_token_amount).collect();
        assert_eq!(amounts[0], 4.0);
        assert!((amounts[1] - 12.0).abs() < 1e-9);
        assert!((amounts[2] - 6.0).abs() < 1e-9);
        assert!((amounts[3] - 2.0).abs() < 1e-9);
        assert!((allocation.allocated_sd_token_amount() - 24.0).abs() < 1e-9);
        assert_eq!(allocation.bounties[0].normalized_share, 0.0);
        assert!((allocation.bounties[0].share - 4.0 / 24.0).abs() < 1e-12);
    }

    #[test]
    fn zero_value_leaves_pool_unattributed() {
        let bounties = vec![valued(R1, 5.0, 0.0), valued(NATIVE, 0.0, 0.0)];
        let allocation =
            allocate(bounties, &minted(10), &CONFIG, &StaticTokenMetadata::new()).unwrap();
        for bounty in &allocation.bounties {
            assert_eq!(bounty.share, 0.0);
            assert_eq!(bounty.normalized_share, 0.0);
            assert_eq!(bounty.sd_token_amount, 0.0);
        }
        assert_eq!(allocation.unattributed_sd_token_amount, 10.0);
    }

    #[test]
    fn direct_claims_larger_than_minted_clamp() {
        let bounties = vec![valued(SD, 15.0, 15.0), valued(R1, 1.0, 5.0)];
        let allocation =
            allocate(bounties, &minted(10), &CONFIG, &StaticTokenMetadata::new()).unwrap();
        assert_eq!(allocation.remaining_sd_token_amount, 0.0);
        assert_eq!(allocation.bounties[0].sd_token_amount, 15.0);
        assert_eq!(allocation.bounties[1].sd_token_amount, 0.0);
    }

    #[test]
    fn empty_input() {
        let allocation =
            allocate(Vec::new(), &ProtocolFlowTotals::default(), &CONFIG, &StaticTokenMetadata::new())
                .unwrap();
        assert!(allocation.bounties.is_empty());
        assert_eq!(allocation.total_native_equivalent, 0.0);
        assert_eq!(allocation.unattributed_sd_token_amount, 0.0);
    }
}
