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

//! Classification of transfer events into per-window flows.

use std::collections::{BTreeMap, HashSet};

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{
    config::{EngineOptions, Grouping, ProtocolConfigs, ProtocolTokenConfig, TokenRole},
    events::TransferEvent,
    tokens::TokenMetadataSource,
};

/// Semantic category of a transfer relative to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowCategory {
    SettlementIn,
    SettlementOut,
    NativeIn,
    NativeOut,
    SdTokenIn,
    SdTokenOut,
    RewardOut,
}

/// Identifies a settlement window. Ordered by block, then by transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowKey {
    pub block_number: u64,
    /// Set only when grouping by transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
}

impl WindowKey {
    pub const fn block(block_number: u64) -> Self {
        Self { block_number, transaction_hash: None }
    }
}

/// A reward token leaving the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardOut {
    pub token: Address,
    pub symbol: String,
    pub amount: U256,
}

/// Flows observed within one settlement window, in event order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFlowRecord {
    pub settlement_in: Vec<U256>,
    pub settlement_out: Vec<U256>,
    pub native_in: Vec<U256>,
    pub native_out: Vec<U256>,
    pub sd_token_in: Vec<U256>,
    pub sd_token_out: Vec<U256>,
    pub rewards_out: Vec<RewardOut>,
}

impl BlockFlowRecord {
    pub fn is_empty(&self) -> bool {
        self.settlement_in.is_empty()
            && self.settlement_out.is_empty()
            && self.native_in.is_empty()
            && self.native_out.is_empty()
            && self.sd_token_in.is_empty()
            && self.sd_token_out.is_empty()
            && self.rewards_out.is_empty()
    }
}

/// Flows for one protocol, keyed by window.
pub type ProtocolWindows = BTreeMap<WindowKey, BlockFlowRecord>;

/// Classify a single event for `config`, relative to `processor`.
///
/// Returns `None` for events that touch neither side of the processor and for reward tokens
/// flowing into it.
pub fn categorize(
    event: &TransferEvent,
    config: &ProtocolTokenConfig,
    processor: Address,
) -> Option<FlowCategory> {
    let incoming = if event.to == processor {
        true
    } else if event.from == processor {
        false
    } else {
        return None;
    };

    match (config.role_of(event.token), incoming) {
        (TokenRole::Settlement, true) => Some(FlowCategory::SettlementIn),
        (TokenRole::Settlement, false) => Some(FlowCategory::SettlementOut),
        (TokenRole::Native, true) => Some(FlowCategory::NativeIn),
        (TokenRole::Native, false) => Some(FlowCategory::NativeOut),
        (TokenRole::SdToken, true) => Some(FlowCategory::SdTokenIn),
        (TokenRole::SdToken, false) => Some(FlowCategory::SdTokenOut),
        (TokenRole::Reward, true) => None,
        (TokenRole::Reward, false) => Some(FlowCategory::RewardOut),
    }
}

/// Groups ordered transfer events into settlement windows and classifies them per protocol.
pub struct EventClassifier<'a, M> {
    options: &'a EngineOptions,
    metadata: &'a M,
}

impl<'a, M: TokenMetadataSource> EventClassifier<'a, M> {
    pub fn new(options: &'a EngineOptions, metadata: &'a M) -> Self {
        Self { options, metadata }
    }

    /// Whether windows are keyed by transaction for this event set.
    pub fn groups_by_transaction(&self, events: &[TransferEvent]) -> bool {
        match self.options.grouping {
            Grouping::Block => false,
            Grouping::Transaction => true,
            Grouping::Auto => {
                !events.is_empty() && events.iter().all(|event| event.transaction_hash.is_some())
            }
        }
    }

    fn window_key(&self, event: &TransferEvent, by_transaction: bool) -> WindowKey {
        WindowKey {
            block_number: event.block_number,
            transaction_hash: if by_transaction { event.transaction_hash } else { None },
        }
    }

    /// Classify `events` for a single protocol. Events must be ordered by
    /// `(block_number, log_index)`.
    pub fn classify(
        &self,
        events: &[TransferEvent],
        config: &ProtocolTokenConfig,
    ) -> ProtocolWindows {
        let by_transaction = self.groups_by_transaction(events);
        let processor = self.options.processor;

        let mut grouped: BTreeMap<WindowKey, Vec<&TransferEvent>> = BTreeMap::new();
        for event in events {
            if self.options.excluded_blocks.contains(&event.block_number) {
                continue;
            }
            grouped.entry(self.window_key(event, by_transaction)).or_default().push(event);
        }

        if self.options.require_sd_token_activity {
            grouped.retain(|_, window| window.iter().any(|event| event.token == config.sd_token));
        }

        let mut windows = ProtocolWindows::new();
        for (key, window_events) in grouped {
            let mut record = BlockFlowRecord::default();
            let mut seen_rewards: HashSet<(Address, U256)> = HashSet::new();

            for event in window_events {
                let Some(category) = categorize(event, config, processor) else {
                    continue;
                };
                match category {
                    FlowCategory::SettlementIn => record.settlement_in.push(event.amount),
                    FlowCategory::SettlementOut => record.settlement_out.push(event.amount),
                    FlowCategory::NativeIn => record.native_in.push(event.amount),
                    FlowCategory::NativeOut => record.native_out.push(event.amount),
                    FlowCategory::SdTokenIn => record.sd_token_in.push(event.amount),
                    FlowCategory::SdTokenOut => record.sd_token_out.push(event.amount),
                    FlowCategory::RewardOut => {
                        if seen_rewards.insert((event.token, event.amount)) {
                            record.rewards_out.push(RewardOut {
                                token: event.token,
                                symbol: self.metadata.symbol(event.token),
                                amount: event.amount,
                            });
                        }
                    }
                }
            }

            if !self.options.require_sd_token_activity && record.is_empty() {
                continue;
            }
            windows.insert(key, record);
        }

        tracing::debug!(
            "Classified {} events into {} windows (by transaction: {})",
            events.len(),
            windows.len(),
            by_transaction
        );
        windows
    }

    /// Classify `events` for every configured protocol.
    pub fn classify_all(
        &self,
        events: &[TransferEvent],
        configs: &ProtocolConfigs,
    ) -> BTreeMap<String, ProtocolWindows> {
        configs
            .iter()
            .map(|(protocol, config)| (protocol.clone(), self.classify(events, config)))
            .collect()
    }
}
