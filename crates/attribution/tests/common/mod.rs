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

#![allow(dead_code)]

use alloy::primitives::{address, Address, B256, U256};
use sdbounty_attribution::{
    AttributionEngine, Bounty, EngineOptions, ProtocolConfigs, ProtocolTokenConfig, ReportMode,
    StaticTokenMetadata, TransferEvent,
};

pub const PROCESSOR: Address = address!("0x00000000000000000000000000000000000000f0");
pub const ROUTER: Address = address!("0x00000000000000000000000000000000000000f1");
pub const NATIVE: Address = address!("0x0000000000000000000000000000000000000a01");
pub const SD: Address = address!("0x0000000000000000000000000000000000000a02");
pub const SETTLEMENT: Address = address!("0x0000000000000000000000000000000000000a03");
pub const REWARD: Address = address!("0x0000000000000000000000000000000000000b01");
pub const REWARD_2: Address = address!("0x0000000000000000000000000000000000000b02");
pub const GAUGE_A: Address = address!("0x0000000000000000000000000000000000000d01");
pub const GAUGE_B: Address = address!("0x0000000000000000000000000000000000000d02");

pub const PROTOCOL: &str = "curve";
pub const CONFIG: ProtocolTokenConfig =
    ProtocolTokenConfig { native_token: NATIVE, sd_token: SD, settlement_token: SETTLEMENT };

/// `amount` whole tokens with 18 decimals.
pub fn units(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18))
}

pub fn metadata() -> StaticTokenMetadata {
    StaticTokenMetadata::new()
        .with(NATIVE, "CRV", 18)
        .with(SD, "sdCRV", 18)
        .with(SETTLEMENT, "WETH", 18)
        .with(REWARD, "RWD", 18)
        .with(REWARD_2, "RWD2", 18)
}

pub fn engine(mode: ReportMode) -> AttributionEngine<StaticTokenMetadata> {
    AttributionEngine::with_positional_pairing(
        ProtocolConfigs::from([(PROTOCOL.to_string(), CONFIG)]),
        EngineOptions::new(PROCESSOR).with_mode(mode),
        metadata(),
    )
}

pub fn bounty(id: &str, gauge: Address, token: Address, amount: u64) -> Bounty {
    Bounty {
        bounty_id: id.to_string(),
        gauge,
        amount: units(amount).to_string(),
        reward_token: token,
        gauge_name: Some(format!("gauge-{id}")),
    }
}

/// Builds an ordered transfer event list relative to [PROCESSOR].
#[derive(Default)]
pub struct EventsBuilder {
    events: Vec<TransferEvent>,
    block: u64,
    log_index: u64,
    transaction_hash: Option<B256>,
}

impl EventsBuilder {
    pub fn new() -> Self {
        Self { block: 1, ..Default::default() }
    }

    /// Following events land in `block`.
    pub fn block(mut self, block: u64) -> Self {
        self.block = block;
        self.log_index = 0;
        self
    }

    pub fn transaction(mut self, hash: B256) -> Self {
        self.transaction_hash = Some(hash);
        self
    }

    fn push(mut self, token: Address, from: Address, to: Address, amount: u64) -> Self {
        self.events.push(TransferEvent {
            block_number: self.block,
            log_index: self.log_index,
            from,
            to,
            token,
            amount: units(amount),
            transaction_hash: self.transaction_hash,
        });
        self.log_index += 1;
        self
    }

    pub fn inflow(self, token: Address, amount: u64) -> Self {
        self.push(token, ROUTER, PROCESSOR, amount)
    }

    pub fn outflow(self, token: Address, amount: u64) -> Self {
        self.push(token, PROCESSOR, ROUTER, amount)
    }

    pub fn build(self) -> Vec<TransferEvent> {
        self.events
    }
}
