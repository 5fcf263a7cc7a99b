//! Demo command - fetch the managed text through each transfer strategy

use anyhow::{Context, Result};
use clap::ValueEnum;
use hostbridge_config::Config;
use hostbridge_runtime::{surface, ExportTable, Host, Strategy};

/// Strategy selection accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Copy,
    Heap,
    Pinned,
    Allocator,
    All,
}

impl StrategyArg {
    /// Strategies to run, in surface order
    pub fn strategies(self) -> Vec<Strategy> {
        match self {
            StrategyArg::Copy => vec![Strategy::CopyCallback],
            StrategyArg::Heap => vec![Strategy::SharedHeap],
            StrategyArg::Pinned => vec![Strategy::PinnedHandle],
            StrategyArg::Allocator => vec![Strategy::AllocatorCallback],
            StrategyArg::All => Strategy::ALL.to_vec(),
        }
    }
}

/// Arguments for the demo command
#[derive(Debug, Clone)]
pub struct DemoArgs {
    pub strategy: StrategyArg,
    pub text: Option<String>,
    pub verbose: bool,
}

/// Apply the configuration, then print the text returned by each selected strategy
pub fn run(args: DemoArgs, config: &Config) -> Result<()> {
    surface::configure(config).context("Failed to apply transfer configuration")?;

    let host = Host::in_process().context("Failed to resolve the boundary surface")?;
    if let Some(text) = &args.text {
        host.set_text(text).context("Failed to replace the managed text")?;
    }

    if args.verbose {
        println!(
            "abi {}  size policy {}  string data offset {}",
            host.abi_version(),
            surface::size_policy(),
            host.string_data_offset()
        );
    }

    for strategy in args.strategy.strategies() {
        let text = fetch(&host, strategy)
            .with_context(|| format!("Strategy '{}' failed", strategy))?;
        if args.verbose {
            println!(
                "{:<10} {:<15} {}",
                strategy.as_str(),
                format!("[{}]", strategy.owner_after_call()),
                text
            );
        } else {
            println!("{:<10} {}", strategy.as_str(), text);
        }
    }

    Ok(())
}

/// Fetch the current text through one strategy as an owned string
fn fetch(host: &Host<&'static ExportTable>, strategy: Strategy) -> Result<String> {
    let text = match strategy {
        Strategy::CopyCallback => host.text_via_copy_callback()?,
        Strategy::SharedHeap => host.text_via_shared_heap()?.to_str()?.to_string(),
        Strategy::PinnedHandle => host.text_via_pinned_handle()?.to_string()?,
        Strategy::AllocatorCallback => String::from_utf8(host.text_via_allocator()?)?,
    };
    Ok(text)
}
