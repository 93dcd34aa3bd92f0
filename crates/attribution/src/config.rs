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

//! Protocol token configuration and engine options.

use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::{merge::ReportMode, AttributionError};

/// Token triple for one protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolTokenConfig {
    /// The protocol's governance token, e.g. CRV.
    pub native_token: Address,
    /// Liquid wrapper minted by the locker vault, e.g. sdCRV.
    pub sd_token: Address,
    /// Intermediate token reward tokens are sold into before buying the native token.
    pub settlement_token: Address,
}

/// Role a token plays for a given protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRole {
    Native,
    SdToken,
    Settlement,
    Reward,
}

impl ProtocolTokenConfig {
    /// Lookup a well-known Stake DAO deployment by protocol name.
    pub fn from_protocol(protocol: &str) -> Option<ProtocolTokenConfig> {
        match protocol.to_ascii_lowercase().as_str() {
            "curve" => Some(CURVE),
            "balancer" => Some(BALANCER),
            "fxn" => Some(FXN),
            "pendle" => Some(PENDLE),
            "frax" => Some(FRAX),
            _ => None,
        }
    }

    pub fn role_of(&self, token: Address) -> TokenRole {
        if token == self.native_token {
            TokenRole::Native
        } else if token == self.sd_token {
            TokenRole::SdToken
        } else if token == self.settlement_token {
            TokenRole::Settlement
        } else {
            TokenRole::Reward
        }
    }

    /// Check that the three configured addresses are pairwise distinct.
    pub fn validate(&self, protocol: &str) -> Result<(), AttributionError> {
        let distinct = self.native_token != self.sd_token
            && self.native_token != self.settlement_token
            && self.sd_token != self.settlement_token;
        if !distinct {
            return Err(AttributionError::InvalidConfig {
                protocol: protocol.to_string(),
                reason: "native, sdToken and settlement addresses must be distinct".to_string(),
            });
        }
        Ok(())
    }
}

const WETH: Address = address!("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

/// [ProtocolTokenConfig] for Curve (CRV / sdCRV).
pub const CURVE: ProtocolTokenConfig = ProtocolTokenConfig {
    native_token: address!("0xd533a949740bb3306d119cc777fa900ba034cd52"),
    sd_token: address!("0xd1b5651e55d4ceed36251c61c50c889b36f6abb5"),
    settlement_token: WETH,
};

/// [ProtocolTokenConfig] for Balancer (BAL / sdBAL).
pub const BALANCER: ProtocolTokenConfig = ProtocolTokenConfig {
    native_token: address!("0xba100000625a3754423978a60c9317c58a424e3d"),
    sd_token: address!("0xf24d8651578a55b0c119b9910759a351a3458895"),
    settlement_token: WETH,
};

/// [ProtocolTokenConfig] for f(x) protocol (FXN / sdFXN).
pub const FXN: ProtocolTokenConfig = ProtocolTokenConfig {
    native_token: address!("0x365accfca291e7d3914637abf1f7635db165bb09"),
    sd_token: address!("0xe19d1c837b8a1c83a56cd9165b2c0256d39653ad"),
    settlement_token: WETH,
};

/// [ProtocolTokenConfig] for Pendle (PENDLE / sdPENDLE).
pub const PENDLE: ProtocolTokenConfig = ProtocolTokenConfig {
    native_token: address!("0x808507121b80c02388fad14726482e061b8da827"),
    sd_token: address!("0x5ea630e00d6ee438d3dea1556a110359acdc10a9"),
    settlement_token: WETH,
};

/// [ProtocolTokenConfig] for Frax (FXS / sdFXS).
pub const FRAX: ProtocolTokenConfig = ProtocolTokenConfig {
    native_token: address!("0x3432b6a60d23ca0dfca7761b7ab56459d9c964d0"),
    sd_token: address!("0x402f878bdd1f5c66fdaf0fababcf74741b68ac36"),
    settlement_token: WETH,
};

/// Explicit protocol -> token triple table handed to the engine.
pub type ProtocolConfigs = BTreeMap<String, ProtocolTokenConfig>;

/// How transfers are grouped into settlement windows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// One window per block.
    Block,
    /// One window per transaction.
    Transaction,
    /// Per transaction when every event carries a transaction hash, per block otherwise.
    #[default]
    Auto,
}

/// Options shared by every stage of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineOptions {
    /// Address whose incoming and outgoing transfers define the flows.
    pub processor: Address,
    pub grouping: Grouping,
    /// Only classify windows containing at least one sdToken transfer.
    pub require_sd_token_activity: bool,
    /// Blocks already consumed by another extraction pass (e.g. OTC settlements).
    pub excluded_blocks: BTreeSet<u64>,
    pub mode: ReportMode,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            processor: Address::ZERO,
            grouping: Grouping::default(),
            require_sd_token_activity: true,
            excluded_blocks: BTreeSet::new(),
            mode: ReportMode::default(),
        }
    }
}

impl EngineOptions {
    pub fn new(processor: Address) -> Self {
        Self { processor, ..Default::default() }
    }

    pub fn with_mode(mut self, mode: ReportMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_excluded_blocks(mut self, blocks: impl IntoIterator<Item = u64>) -> Self {
        self.excluded_blocks.extend(blocks);
        self
    }

    pub fn with_sd_token_scoping(mut self, enabled: bool) -> Self {
        self.require_sd_token_activity = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for name in ["curve", "balancer", "fxn", "pendle", "frax"] {
            let config = ProtocolTokenConfig::from_protocol(name).unwrap();
            config.validate(name).unwrap();
        }
        assert_eq!(ProtocolTokenConfig::from_protocol("Curve"), Some(CURVE));
        assert!(ProtocolTokenConfig::from_protocol("unknown").is_none());
    }

    #[test]
    fn duplicate_addresses_rejected() {
        let config = ProtocolTokenConfig {
            native_token: CURVE.native_token,
            sd_token: CURVE.native_token,
            settlement_token: WETH,
        };
        assert!(matches!(
            config.validate("curve"),
            Err(AttributionError::InvalidConfig { ref protocol, .. }) if protocol == "curve"
        ));
    }

    #[test]
    fn roles() {
        assert_eq!(CURVE.role_of(CURVE.native_token), TokenRole::Native);
        assert_eq!(CURVE.role_of(CURVE.sd_token), TokenRole::SdToken);
        assert_eq!(CURVE.role_of(WETH), TokenRole::Settlement);
        assert_eq!(CURVE.role_of(BALANCER.native_token), TokenRole::Reward);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: EngineOptions = serde_json::from_str(
            r#"{"processor":"0x0000000000000000000000000000000000000001","excluded_blocks":[7]}"#,
        )
        .unwrap();
        assert_eq!(options.grouping, Grouping::Auto);
        assert!(options.require_sd_token_activity);
        assert_eq!(options.mode, ReportMode::Standard);
        assert!(options.excluded_blocks.contains(&7));
    }

    #[test]
    fn misspelled_option_rejected() {
        let err = serde_json::from_str::<EngineOptions>(
            r#"{"processor":"0x0000000000000000000000000000000000000001","excluded_block":[7]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("excluded_block"), "{err}");
    }
}
