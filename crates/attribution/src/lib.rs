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

//! Attribution of minted sdToken across gauge bounties.
//!
//! A settlement processor sells bounty reward tokens for a settlement token, buys the protocol's
//! native token with it and locks it for sdToken. This crate rebuilds that flow from ERC-20
//! transfer events and splits the sdToken minted over a period across the bounties that funded
//! it. The stages run in order: classify, match, aggregate, value, allocate, merge.

pub mod allocation;
pub mod audit;
pub mod bounty;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod equivalence;
mod error;
pub mod events;
pub mod flows;
pub mod matcher;
pub mod merge;
pub mod report;
pub mod tokens;

pub use allocation::{allocate, Allocation};

pub use audit::{BountyAudit, ProtocolAudit};

pub use bounty::{AllocatedBounty, Bounty, ClaimedBounty, ValuedBounty};

pub use classifier::{
    categorize, BlockFlowRecord, EventClassifier, FlowCategory, ProtocolWindows, RewardOut,
    WindowKey,
};

pub use config::{EngineOptions, Grouping, ProtocolConfigs, ProtocolTokenConfig, TokenRole};

pub use engine::{AttributionEngine, AttributionRun, ProtocolAttribution};

pub use equivalence::{derive_ratio, value_bounties, ConversionRatio, Equivalence, RatioSource};

pub use error::AttributionError;

pub use events::{block_ranges, fetch_transfer_events, TransferEvent};

pub use flows::{aggregate_flows, ProtocolFlowTotals};

pub use matcher::{
    value_reward_tokens, MatchedValue, PairingDiagnostic, PairingStrategy, PositionalPairing,
    TokenValuation,
};

pub use merge::{merge_protocol, merge_rows, CsvRow, MergedRows, ReportMode};

pub use report::{write_csv, write_protocol_report};

pub use tokens::{StaticTokenMetadata, TokenMetadata, TokenMetadataSource};

/// Chunk size for log queries to avoid rate limiting
pub const LOG_QUERY_CHUNK_SIZE: u64 = 2500;
