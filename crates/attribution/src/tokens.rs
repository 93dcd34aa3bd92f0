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

//! Token metadata lookup and decimal conversion.

use std::collections::HashMap;

use alloy::primitives::{utils::format_units, Address, U256};
use serde::{Deserialize, Serialize};

use crate::AttributionError;

/// Symbol used when a token's metadata could not be resolved.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";
/// Decimals assumed when a token's metadata could not be resolved.
pub const DEFAULT_DECIMALS: u8 = 18;

/// ERC-20 metadata needed for reporting and unit conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self { symbol: UNKNOWN_SYMBOL.to_string(), decimals: DEFAULT_DECIMALS }
    }
}

/// Source of token metadata. Lookups never fail; unknown tokens resolve to
/// [TokenMetadata::default].
pub trait TokenMetadataSource {
    fn metadata(&self, token: Address) -> TokenMetadata;

    fn symbol(&self, token: Address) -> String {
        self.metadata(token).symbol
    }

    fn decimals(&self, token: Address) -> u8 {
        self.metadata(token).decimals
    }
}

impl<T: TokenMetadataSource + ?Sized> TokenMetadataSource for &T {
    fn metadata(&self, token: Address) -> TokenMetadata {
        (**self).metadata(token)
    }
}

/// In-memory metadata table, typically prefetched before the engine runs.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenMetadata(HashMap<Address, TokenMetadata>);

impl StaticTokenMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: Address, metadata: TokenMetadata) -> Option<TokenMetadata> {
        self.0.insert(token, metadata)
    }

    /// Builder-style variant of [Self::insert].
    pub fn with(mut self, token: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        self.0.insert(token, TokenMetadata { symbol: symbol.into(), decimals });
        self
    }

    pub fn contains(&self, token: &Address) -> bool {
        self.0.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Address, TokenMetadata)> for StaticTokenMetadata {
    fn from_iter<T: IntoIterator<Item = (Address, TokenMetadata)>>(iter: T) -> Self {
        Self(HashMap::from_iter(iter))
    }
}

impl Extend<(Address, TokenMetadata)> for StaticTokenMetadata {
    fn extend<T: IntoIterator<Item = (Address, TokenMetadata)>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl IntoIterator for StaticTokenMetadata {
    type Item = (Address, TokenMetadata);
    type IntoIter = std::collections::hash_map::IntoIter<Address, TokenMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl TokenMetadataSource for StaticTokenMetadata {
    fn metadata(&self, token: Address) -> TokenMetadata {
        self.0.get(&token).cloned().unwrap_or_default()
    }
}

/// Convert a raw integer token amount into decimal units.
pub fn to_decimal(amount: U256, token: Address, decimals: u8) -> Result<f64, AttributionError> {
    let formatted = format_units(amount, decimals)
        .map_err(|_| AttributionError::InvalidDecimals { token, decimals })?;
    formatted.parse::<f64>().map_err(|_| AttributionError::InvalidDecimals { token, decimals })
}
