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

use alloy::primitives::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttributionError {
    #[error("Invalid amount {amount:?} for bounty {bounty_id}")]
    InvalidAmount { bounty_id: String, amount: String },

    #[error("Unsupported decimals {decimals} for token {token}")]
    InvalidDecimals { token: Address, decimals: u8 },

    #[error("Transfer events out of order at block {block_number}, log index {log_index}")]
    UnorderedEvents { block_number: u64, log_index: u64 },

    #[error("Invalid token config for protocol {protocol}: {reason}")]
    InvalidConfig { protocol: String, reason: String },
}
