use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

/// Managed/native interop boundary, driven end to end.
///
/// Runs the in-process boundary surface the way a native host would: it
/// registers the native callbacks, resolves every entry point by name and
/// fetches the managed text through each string transfer strategy.
///
/// EXAMPLES:
///     hostbridge demo                      Fetch the text through all four strategies
///     hostbridge demo --strategy pinned    Use only the pinned handle
///     hostbridge palindrome racecar        Check a read-only foreign view
///     hostbridge length 3 4                Pass a fixed-layout vector
///     hostbridge exports                   List exported entry points
///     hostbridge runtimes                  Inspect provisioned runtimes
///
/// ENVIRONMENT VARIABLES:
///     HOSTBRIDGE_LOG           Log filter (e.g. 'hostbridge_runtime=debug')
///     HOSTBRIDGE_SIZE_POLICY   Buffer sizing: 'worst-case' or 'exact'
///     HOSTBRIDGE_RUNTIMES_DIR  Root of the provisioned runtime tree
///     HOSTBRIDGE_RID           Runtime identifier override (e.g. 'linux-x64')
#[derive(Parser)]
#[command(name = "hostbridge")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a hostbridge.toml (default: discovered from the working directory)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log filter directive, written to stderr
    #[arg(long, global = true, env = "HOSTBRIDGE_LOG")]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the managed text through the string transfer strategies
    ///
    /// Each strategy hands the text to the native side differently; every
    /// one must return the same text.
    ///
    /// STRATEGIES:
    ///     copy        Native callback copies UTF-16 into a C string it owns
    ///     heap        Managed side allocates on the shared C heap, native frees
    ///     pinned      Native side reads the pinned managed object in place
    ///     allocator   Native allocator callback provides the UTF-8 buffer
    ///
    /// EXAMPLES:
    ///     hostbridge demo                          All strategies
    ///     hostbridge demo -s heap                  One strategy
    ///     hostbridge demo --text "Grüße" -v        Custom text with details
    #[command(visible_alias = "d")]
    Demo {
        /// Strategy to run
        #[arg(long, short = 's', value_enum, default_value = "all")]
        strategy: commands::demo::StrategyArg,
        /// Text to place on the managed side first
        #[arg(long, short = 't')]
        text: Option<String>,
        /// Show ABI details and the owner of each result
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Check whether text reads the same forwards and backwards
    ///
    /// The words are joined with single spaces, passed as UTF-16 and read
    /// in place. Comparison ignores case. Exits with status 1 when the text
    /// is not a palindrome.
    ///
    /// EXAMPLES:
    ///     hostbridge palindrome level
    ///     hostbridge palindrome Step on no pets
    #[command(visible_alias = "p")]
    Palindrome {
        /// Words to check
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Compute the length of a two-dimensional vector
    ///
    /// EXAMPLES:
    ///     hostbridge length 3 4
    ///     hostbridge length -5 12
    Length {
        /// X component
        #[arg(allow_negative_numbers = true)]
        x: f32,
        /// Y component
        #[arg(allow_negative_numbers = true)]
        y: f32,
    },

    /// List the entry points published by the surface
    ///
    /// EXAMPLES:
    ///     hostbridge exports
    ///     hostbridge exports --addresses
    Exports {
        /// Show the resolved address of each entry
        #[arg(long)]
        addresses: bool,
    },

    /// Inspect the provisioned runtime directory
    ///
    /// Lists the platform directories under the runtime root and whether
    /// each holds the native host library.
    ///
    /// EXAMPLES:
    ///     hostbridge runtimes
    ///     hostbridge runtimes --dir ./runtimes
    ///     hostbridge runtimes --load
    Runtimes {
        /// Runtime root to inspect instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Load the host library for the selected platform
        #[arg(long)]
        load: bool,
    },

    /// Generate shell completion scripts
    ///
    /// EXAMPLES:
    ///     hostbridge completions bash > ~/.local/share/bash-completion/completions/hostbridge
    ///     hostbridge completions zsh > ~/.zfunc/_hostbridge
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    // A second init (e.g. in tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let loaded = config::load(cli.config.as_deref());
    init_logging(&config::log_filter(cli.log.as_deref(), loaded.as_ref().ok()));
    let config = loaded?;
    debug!(
        project_root = ?config.project_root,
        size_policy = %config.size_policy(),
        "configuration loaded"
    );

    match cli.command {
        Commands::Demo {
            strategy,
            text,
            verbose,
        } => {
            let args = commands::demo::DemoArgs {
                strategy,
                text,
                verbose,
            };
            commands::demo::run(args, &config)?;
        }
        Commands::Palindrome { words } => {
            if !commands::palindrome::run(&words)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Length { x, y } => {
            commands::length::run(x, y)?;
        }
        Commands::Exports { addresses } => {
            commands::exports::run(addresses)?;
        }
        Commands::Runtimes { dir, load } => {
            let args = commands::runtimes::RuntimesArgs { dir, load };
            commands::runtimes::run(args, &config)?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(ExitCode::SUCCESS)
}
