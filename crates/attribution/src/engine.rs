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

//! Runs the attribution stages for each protocol of a settlement period.

use std::collections::BTreeMap;

use crate::{
    allocation::{allocate, Allocation},
    audit::{AuditParts, ProtocolAudit},
    bounty::{Bounty, ClaimedBounty},
    classifier::EventClassifier,
    config::{EngineOptions, ProtocolConfigs},
    equivalence::{derive_ratio, value_bounties},
    events::{ensure_ordered, TransferEvent},
    flows::aggregate_flows,
    matcher::{value_reward_tokens, PairingStrategy, PositionalPairing},
    merge::{merge_protocol, CsvRow},
    tokens::TokenMetadataSource,
    AttributionError,
};

/// Everything computed for one protocol.
#[derive(Debug, Clone)]
pub struct ProtocolAttribution {
    pub rows: Vec<CsvRow>,
    pub audit: ProtocolAudit,
    pub allocation: Allocation,
}

/// Result of attributing every protocol of a period.
#[derive(Debug, Default)]
pub struct AttributionRun {
    /// Report rows per protocol. Failed protocols map to an empty list.
    pub rows: BTreeMap<String, Vec<CsvRow>>,
    pub audits: BTreeMap<String, ProtocolAudit>,
    pub failures: BTreeMap<String, AttributionError>,
}

impl AttributionRun {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct AttributionEngine<M, S = PositionalPairing> {
    configs: ProtocolConfigs,
    options: EngineOptions,
    metadata: M,
    strategy: S,
}

impl<M: TokenMetadataSource> AttributionEngine<M, PositionalPairing> {
    /// Engine with the default positional pairing strategy.
    pub fn with_positional_pairing(
        configs: ProtocolConfigs,
        options: EngineOptions,
        metadata: M,
    ) -> Self {
        Self::new(configs, options, metadata, PositionalPairing)
    }
}

impl<M: TokenMetadataSource, S: PairingStrategy> AttributionEngine<M, S> {
    pub fn new(configs: ProtocolConfigs, options: EngineOptions, metadata: M, strategy: S) -> Self {
        Self { configs, options, metadata, strategy }
    }

    pub fn configs(&self) -> &ProtocolConfigs {
        &self.configs
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Attribute the sdToken minted for `protocol` across `bounties`.
    ///
    /// `events` must be ordered by `(block_number, log_index)`. A protocol without a configured
    /// token triple is an [AttributionError::InvalidConfig].
    pub fn attribute_protocol(
        &self,
        protocol: &str,
        events: &[TransferEvent],
        bounties: &[Bounty],
    ) -> Result<ProtocolAttribution, AttributionError> {
        let config = self.configs.get(protocol).ok_or_else(|| AttributionError::InvalidConfig {
            protocol: protocol.to_string(),
            reason: "no token config".to_string(),
        })?;
        config.validate(protocol)?;

        let claims = bounties
            .iter()
            .map(|bounty| ClaimedBounty::parse(bounty, config, &self.metadata))
            .collect::<Result<Vec<_>, _>>()?;

        let windows = EventClassifier::new(&self.options, &self.metadata).classify(events, config);
        let valuation = value_reward_tokens(&windows, &self.strategy);
        let totals = aggregate_flows(&windows, &valuation);

        let ratio = derive_ratio(&totals, &claims, config, &self.metadata)?;
        let equivalence = value_bounties(claims, &totals, &ratio, config, &self.metadata)?;
        let allocation = allocate(equivalence.bounties, &totals, config, &self.metadata)?;

        let mut merged = merge_protocol(protocol, &allocation.bounties, self.options.mode);
        let rows = merged.rows.remove(protocol).unwrap_or_default();
        let dropped_rows = merged.dropped.remove(protocol).unwrap_or_default();

        tracing::info!(
            "{protocol}: {} windows, ratio {:.6} ({:?}), {:.6} sdToken minted, {} rows ({} dropped)",
            windows.len(),
            ratio.ratio,
            ratio.source,
            allocation.total_sd_token_in,
            rows.len(),
            dropped_rows.len()
        );

        let audit = ProtocolAudit::new(AuditParts {
            protocol,
            mode: self.options.mode,
            tokens: *config,
            window_count: windows.len(),
            ratio: &ratio,
            totals: &totals,
            valuation,
            unattributed_tokens: equivalence.unattributed_tokens,
            allocation: &allocation,
            dropped_rows,
        });

        Ok(ProtocolAttribution { rows, audit, allocation })
    }

    /// Attribute every protocol that has bounties.
    ///
    /// Unordered events fail the whole run. Protocols without a token config are skipped, and a
    /// failure in one protocol leaves the others untouched.
    pub fn run(
        &self,
        events: &[TransferEvent],
        bounties: &BTreeMap<String, Vec<Bounty>>,
    ) -> Result<AttributionRun, AttributionError> {
        ensure_ordered(events)?;
        if self.options.processor.is_zero() {
            tracing::warn!("Processor address is zero; no transfer will be classified");
        }

        let mut run = AttributionRun::default();
        for (protocol, protocol_bounties) in bounties {
            if !self.configs.contains_key(protocol) {
                tracing::debug!("Skipping {protocol}: no token config");
                continue;
            }
            match self.attribute_protocol(protocol, events, protocol_bounties) {
                Ok(attribution) => {
                    run.rows.insert(protocol.clone(), attribution.rows);
                    run.audits.insert(protocol.clone(), attribution.audit);
                }
                Err(err) => {
                    tracing::error!("Attribution failed for {protocol}: {err}");
                    run.rows.insert(protocol.clone(), Vec::new());
                    run.failures.insert(protocol.clone(), err);
                }
            }
        }
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ProtocolTokenConfig, merge::ReportMode, tokens::StaticTokenMetadata};
    use alloy::primitives::{address, Address, U256};
    use tracing_test::traced_test;

    const PROCESSOR: Address = address!("0x00000000000000000000000000000000000000f0");
    const POOL: Address = address!("0x00000000000000000000000000000000000000f1");
    const NATIVE: Address = address!("0x0000000000000000000000000000000000000a01");
    const SD: Address = address!("0x0000000000000000000000000000000000000a02");
    const SETTLEMENT: Address = address!("0x0000000000000000000000000000000000000a03");
    const GAUGE: Address = address!("0x0000000000000000000000000000000000000d01");
    const CONFIG: ProtocolTokenConfig =
        ProtocolTokenConfig { native_token: NATIVE, sd_token: SD, settlement_token: SETTLEMENT };

    fn engine() -> AttributionEngine<StaticTokenMetadata> {
        AttributionEngine::with_positional_pairing(
            ProtocolConfigs::from([("curve".to_string(), CONFIG)]),
            EngineOptions::new(PROCESSOR).with_mode(ReportMode::Audit),
            StaticTokenMetadata::new(),
        )
    }

    fn event(block: u64, log_index: u64, token: Address, incoming: bool) -> TransferEvent {
        let (from, to) = if incoming { (POOL, PROCESSOR) } else { (PROCESSOR, POOL) };
        TransferEvent {
            block_number: block,
            log_index,
            from,
            to,
            token,
            amount: U256::from(10u64).pow(U256::from(18)),
            transaction_hash: None,
        }
    }

    fn bounty(amount: &str, token: Address) -> Bounty {
        Bounty {
            bounty_id: "1".to_string(),
            gauge: GAUGE,
            amount: amount.to_string(),
            reward_token: token,
            gauge_name: None,
        }
    }

    #[test]
    fn unordered_events_fail_the_run() {
        let events = vec![event(2, 0, SD, true), event(1, 0, SD, true)];
        let err = engine().run(&events, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, AttributionError::UnorderedEvents { block_number: 1, .. }));
    }

    #[test]
    #[traced_test]
    fn missing_config_is_skipped() {
        let bounties = BTreeMap::from([("unknown".to_string(), vec![bounty("1", NATIVE)])]);
        let run = engine().run(&[], &bounties).unwrap();
        assert!(run.rows.is_empty());
        assert!(run.is_success());
        assert!(logs_contain("Skipping unknown"));
        assert!(!logs_contain("Processor address is zero"));
    }

    #[test]
    #[traced_test]
    fn zero_processor_is_reported() {
        let engine = AttributionEngine::with_positional_pairing(
            ProtocolConfigs::from([("curve".to_string(), CONFIG)]),
            EngineOptions::default(),
            StaticTokenMetadata::new(),
        );
        let events = vec![event(1, 0, NATIVE, false), event(1, 1, SD, true)];
        let bounties = BTreeMap::from([("curve".to_string(), vec![bounty("1", NATIVE)])]);

        let run = engine.run(&events, &bounties).unwrap();
        assert!(run.is_success());
        assert!(run.rows["curve"].is_empty());
        assert!(logs_contain("Processor address is zero"));
    }

    #[test]
    fn failures_are_isolated() {
        let engine = AttributionEngine::with_positional_pairing(
            ProtocolConfigs::from([("curve".to_string(), CONFIG), ("balancer".to_string(), CONFIG)]),
            EngineOptions::new(PROCESSOR),
            StaticTokenMetadata::new(),
        );
        let events = vec![event(1, 0, NATIVE, false), event(1, 1, SD, true)];
        let bounties = BTreeMap::from([
            ("balancer".to_string(), vec![bounty("not-a-number", NATIVE)]),
            ("curve".to_string(), vec![bounty("1000000000000000000", NATIVE)]),
        ]);

        let run = engine.run(&events, &bounties).unwrap();
        assert!(matches!(run.failures["balancer"], AttributionError::InvalidAmount { .. }));
        assert!(run.rows["balancer"].is_empty());
        assert_eq!(run.rows["curve"].len(), 1);
        assert!((run.rows["curve"][0].reward_sd_value - 1.0).abs() < 1e-9);
        assert!(!run.audits.contains_key("balancer"));
    }

    #[test]
    fn attribute_protocol_requires_config() {
        let err = engine().attribute_protocol("pendle", &[], &[]).unwrap_err();
        assert!(matches!(err, AttributionError::InvalidConfig { .. }));
    }
}
