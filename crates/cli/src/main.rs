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

use std::path::PathBuf;

use alloy::{
    providers::{Provider, ProviderBuilder},
    rpc::client::RpcClient,
    transports::layers::RetryBackoffLayer,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use sdbounty_attribution::{
    fetch_transfer_events, write_protocol_report, AttributionEngine, ReportMode,
    StaticTokenMetadata, TransferEvent,
};
use url::Url;

mod config;
mod inputs;
mod metadata;

use config::ReportConfig;

/// Attribute minted sdToken across the bounties of a settlement period.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML report configuration.
    #[clap(short, long, env = "SDBOUNTY_CONFIG")]
    config: PathBuf,

    /// Path to the bounties JSON, keyed by protocol.
    #[clap(short, long)]
    bounties: PathBuf,

    /// Path to a JSON array of ordered transfer events. Replaces fetching over RPC.
    #[clap(long, conflicts_with_all = ["rpc_url", "from_block", "to_block"])]
    events: Option<PathBuf>,

    /// URL of the Ethereum RPC endpoint.
    #[clap(short, long, env, required_unless_present = "events")]
    rpc_url: Option<Url>,

    /// First block of the settlement period.
    #[clap(long, requires = "rpc_url")]
    from_block: Option<u64>,

    /// Last block of the settlement period, inclusive.
    #[clap(long, requires = "rpc_url")]
    to_block: Option<u64>,

    /// Directory the reports are written to.
    #[clap(short, long, default_value = "reports")]
    output_dir: PathBuf,

    /// Report mode. Overrides the mode from the config file.
    #[clap(long)]
    mode: Option<ReportMode>,

    /// Also write a JSON audit trail per protocol.
    #[clap(long, default_value_t = false)]
    audit: bool,

    /// Blocks to ignore, in addition to the ones in the config file.
    #[clap(long, value_delimiter = ',')]
    excluded_blocks: Vec<u64>,

    /// Maximum number of concurrent RPC requests.
    #[clap(long, default_value = "4")]
    max_concurrency: usize,

    /// Whether to log in JSON format.
    #[clap(long, env, default_value_t = false)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    if args.log_json {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let config = ReportConfig::load(&args.config)?;
    let configs = config.protocol_configs()?;
    let overrides = config.token_overrides()?;

    let mut options = config.engine.clone();
    if let Some(mode) = args.mode {
        options.mode = mode;
    }
    options.excluded_blocks.extend(args.excluded_blocks.iter().copied());

    let bounties = inputs::load_bounties(&args.bounties)?;
    let tokens = inputs::tokens_of_interest(&configs, &bounties);

    let (events, mut metadata): (Vec<TransferEvent>, StaticTokenMetadata) = match &args.events {
        Some(path) => (inputs::load_events(path)?, StaticTokenMetadata::new()),
        None => {
            let Some(rpc_url) = args.rpc_url.clone() else {
                bail!("either --events or --rpc-url is required");
            };
            let (Some(from_block), Some(to_block)) = (args.from_block, args.to_block) else {
                bail!("--from-block and --to-block are required with --rpc-url");
            };
            if from_block > to_block {
                bail!("--from-block {from_block} is after --to-block {to_block}");
            }

            let provider = ProviderBuilder::new().connect_client(
                RpcClient::builder().layer(RetryBackoffLayer::new(3, 1000, 200)).http(rpc_url),
            );
            let chain_id = provider.get_chain_id().await.context("failed to reach RPC endpoint")?;
            tracing::info!("Connected to chain {chain_id}");

            let token_list: Vec<_> = tokens.iter().copied().collect();
            let events = fetch_transfer_events(
                &provider,
                &token_list,
                from_block,
                to_block,
                options.processor,
                args.max_concurrency,
            )
            .await?;
            let unresolved = tokens.iter().copied().filter(|token| !overrides.contains(token));
            let metadata =
                metadata::fetch_token_metadata(&provider, unresolved, args.max_concurrency).await;
            (events, metadata)
        }
    };
    metadata.extend(overrides);

    let engine = AttributionEngine::with_positional_pairing(configs, options, metadata);
    let run = engine.run(&events, &bounties)?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;
    for (protocol, rows) in &run.rows {
        let audit = if args.audit { run.audits.get(protocol) } else { None };
        let written = write_protocol_report(&args.output_dir, protocol, rows, audit)?;
        for path in written {
            println!("{protocol}: {} rows -> {}", rows.len(), path.display());
        }
    }

    if !run.is_success() {
        let failed: Vec<String> =
            run.failures.iter().map(|(protocol, err)| format!("{protocol}: {err}")).collect();
        bail!("attribution failed for {} protocol(s): {}", failed.len(), failed.join("; "));
    }
    Ok(())
}
