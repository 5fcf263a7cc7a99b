//! Length command - pass a fixed-layout vector across the boundary

use anyhow::Result;
use hostbridge_runtime::{Host, Vector2f};

/// Print the Euclidean length of `(x, y)` as computed by the surface
pub fn run(x: f32, y: f32) -> Result<f32> {
    let host = Host::in_process()?;
    let length = host.vector_length(Vector2f::new(x, y));
    println!("{}", length);
    Ok(length)
}
