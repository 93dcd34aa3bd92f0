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

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io::BufReader,
    path::Path,
};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use sdbounty_attribution::{Bounty, ProtocolConfigs, TransferEvent};
use serde::de::DeserializeOwned;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Bounties keyed by protocol, as `{ "<protocol>": [Bounty, ...] }`.
pub fn load_bounties(path: &Path) -> Result<BTreeMap<String, Vec<Bounty>>> {
    let bounties: BTreeMap<String, Vec<Bounty>> = read_json(path)?;
    tracing::info!(
        "Loaded {} bounties for {} protocols",
        bounties.values().map(Vec::len).sum::<usize>(),
        bounties.len()
    );
    Ok(bounties)
}

/// Transfer events as a JSON array. The order is kept as-is.
pub fn load_events(path: &Path) -> Result<Vec<TransferEvent>> {
    let events: Vec<TransferEvent> = read_json(path)?;
    tracing::info!("Loaded {} transfer events", events.len());
    Ok(events)
}

/// Every token whose transfers or metadata the run needs.
pub fn tokens_of_interest(
    configs: &ProtocolConfigs,
    bounties: &BTreeMap<String, Vec<Bounty>>,
) -> BTreeSet<Address> {
    let mut tokens = BTreeSet::new();
    for config in configs.values() {
        tokens.extend([config.native_token, config.sd_token, config.settlement_token]);
    }
    for (protocol, protocol_bounties) in bounties {
        if configs.contains_key(protocol) {
            tokens.extend(protocol_bounties.iter().map(|bounty| bounty.reward_token));
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use sdbounty_attribution::config::CURVE;
    use std::io::Write;

    #[test]
    fn load_and_collect_tokens() {
        let reward = address!("0x0000000000000000000000000000000000000b01");
        let other = address!("0x0000000000000000000000000000000000000b02");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "curve": [{{"bountyId":"1","gauge":"0x0000000000000000000000000000000000000d01",
                            "amount":"10","rewardToken":"{reward}"}}],
                "unknown": [{{"bountyId":"2","gauge":"0x0000000000000000000000000000000000000d01",
                              "amount":"10","rewardToken":"{other}"}}]
            }}"#
        )
        .unwrap();

        let bounties = load_bounties(file.path()).unwrap();
        assert_eq!(bounties["curve"][0].reward_token, reward);

        let configs = ProtocolConfigs::from([("curve".to_string(), CURVE)]);
        let tokens = tokens_of_interest(&configs, &bounties);
        assert!(tokens.contains(&reward));
        assert!(tokens.contains(&CURVE.sd_token));
        assert!(!tokens.contains(&other));
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn missing_file_has_context() {
        let err = load_events(Path::new("/nonexistent/events.json")).unwrap_err();
        assert!(err.to_string().contains("failed to open"));
    }
}
