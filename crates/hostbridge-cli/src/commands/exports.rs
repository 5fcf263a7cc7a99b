//! Exports command - list the entry points the surface publishes by name

use anyhow::{Context, Result};
use hostbridge_runtime::{ExportTable, Host, SymbolResolver};

/// Print the ABI version followed by every exported symbol
///
/// Each name is resolved through the same lookup the host facade uses, so a
/// listed symbol is always callable.
pub fn run(addresses: bool) -> Result<()> {
    let table = ExportTable::surface();
    let host = Host::in_process().context("Failed to resolve the boundary surface")?;

    println!("{} (abi {}, {} entries)", table.label(), host.abi_version(), table.len());
    for name in table.names() {
        let ptr = table
            .resolve(name)
            .with_context(|| format!("Export '{}' does not resolve", name))?;
        if addresses {
            println!("  {:<36} {:p}", name, ptr.as_ptr());
        } else {
            println!("  {}", name);
        }
    }
    Ok(())
}
