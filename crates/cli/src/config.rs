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

//! TOML report configuration.

use std::{collections::BTreeMap, path::Path, str::FromStr};

use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use sdbounty_attribution::{
    EngineOptions, ProtocolConfigs, ProtocolTokenConfig, StaticTokenMetadata, TokenMetadata,
};
use serde::Deserialize;

/// A protocol is either a known deployment or an explicit token triple.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProtocolEntry {
    Preset { preset: String },
    Tokens(ProtocolTokenConfig),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default)]
    pub engine: EngineOptions,
    #[serde(default)]
    pub protocols: BTreeMap<String, ProtocolEntry>,
    /// Metadata overrides keyed by token address.
    #[serde(default)]
    pub tokens: BTreeMap<String, TokenMetadata>,
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve presets into the explicit protocol table handed to the engine.
    pub fn protocol_configs(&self) -> Result<ProtocolConfigs> {
        let mut configs = ProtocolConfigs::new();
        for (protocol, entry) in &self.protocols {
            let config = match entry {
                ProtocolEntry::Preset { preset } => {
                    match ProtocolTokenConfig::from_protocol(preset) {
                        Some(config) => config,
                        None => bail!("unknown preset {preset:?} for protocol {protocol}"),
                    }
                }
                ProtocolEntry::Tokens(config) => *config,
            };
            configs.insert(protocol.clone(), config);
        }
        Ok(configs)
    }

    pub fn token_overrides(&self) -> Result<StaticTokenMetadata> {
        self.tokens
            .iter()
            .map(|(token, metadata)| {
                let address = Address::from_str(token)
                    .with_context(|| format!("invalid token address {token:?}"))?;
                Ok((address, metadata.clone()))
            })
            .collect()
    }
}
