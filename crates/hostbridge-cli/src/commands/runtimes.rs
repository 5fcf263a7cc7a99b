//! Runtimes command - inspect the provisioned runtime directory layout

use anyhow::{Context, Result};
use hostbridge_config::{Config, RuntimeLayout};
use hostbridge_runtime::ffi::LibraryLoader;
use hostbridge_runtime::SymbolResolver;
use std::path::PathBuf;

/// Entry point the host library must export
pub const HOST_LIBRARY_PROBE: &str = "get_hostfxr_path";

/// Arguments for the runtimes command
#[derive(Debug, Clone)]
pub struct RuntimesArgs {
    /// Root to inspect instead of the configured one
    pub dir: Option<PathBuf>,
    /// Load the host library for the selected platform and probe it
    pub load: bool,
}

pub fn run(args: RuntimesArgs, config: &Config) -> Result<()> {
    let layout = match args.dir {
        Some(dir) => RuntimeLayout::new(dir),
        None => config.runtime_layout(),
    };
    let rid = config
        .runtime_identifier()
        .context("Failed to determine the runtime identifier")?;

    println!("Runtime directory: {}", layout.root().display());
    println!("Selected platform: {}", rid);

    let installed = layout
        .installed()
        .with_context(|| format!("Failed to read {}", layout.root().display()))?;
    if installed.is_empty() {
        println!("No runtimes provisioned");
    }
    for found in &installed {
        let marker = if *found == rid { "*" } else { " " };
        let library = if layout.host_library_path(found).exists() {
            "host library present"
        } else {
            "host library missing"
        };
        println!("{} {:<20} {}", marker, found.as_str(), library);
    }

    if args.load {
        let mut loader = LibraryLoader::new();
        let library = loader
            .load_host_library(&layout, &rid)
            .with_context(|| format!("Failed to load the host library for {}", rid))?;
        library
            .resolve(HOST_LIBRARY_PROBE)
            .with_context(|| format!("{} lacks {}", library.path().display(), HOST_LIBRARY_PROBE))?;
        println!("Loaded {}", library.path().display());
    }

    Ok(())
}
