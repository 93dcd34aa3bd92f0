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

//! On-chain ERC-20 metadata lookups.

use alloy::{primitives::Address, providers::Provider, sol};
use futures_util::future::join_all;
use sdbounty_attribution::{StaticTokenMetadata, TokenMetadata};

sol! {
    #[sol(rpc)]
    interface IERC20Metadata {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }
}

async fn fetch_one<P: Provider>(provider: &P, token: Address) -> TokenMetadata {
    let contract = IERC20Metadata::new(token, provider);
    let mut metadata = TokenMetadata::default();
    match contract.symbol().call().await {
        Ok(symbol) => metadata.symbol = symbol,
        Err(err) => tracing::warn!("Failed to fetch symbol of {token}: {err}"),
    }
    match contract.decimals().call().await {
        Ok(decimals) => metadata.decimals = decimals,
        Err(err) => tracing::warn!("Failed to fetch decimals of {token}: {err}"),
    }
    metadata
}

/// Resolve `symbol()` and `decimals()` of every token, falling back to the defaults for tokens
/// that do not answer.
pub async fn fetch_token_metadata<P: Provider>(
    provider: &P,
    tokens: impl IntoIterator<Item = Address>,
    max_concurrency: usize,
) -> StaticTokenMetadata {
    let tokens: Vec<Address> = tokens.into_iter().collect();
    let mut metadata = StaticTokenMetadata::new();
    for chunk in tokens.chunks(max_concurrency.max(1)) {
        let futures: Vec<_> = chunk
            .iter()
            .map(|&token| async move { (token, fetch_one(provider, token).await) })
            .collect();
        metadata.extend(join_all(futures).await);
    }
    tracing::info!("Fetched metadata for {} tokens", metadata.len());
    metadata
}
