//! Identity Hald generation command

use crate::HaldArgs;
use anyhow::{bail, Context, Result};
use tracing::info;

pub fn run(args: HaldArgs) -> Result<()> {
    let result = match super::extension(&args.output).as_str() {
        "png" => clut_io::hald::write_identity_png(&args.output, args.level),
        "tif" | "tiff" => clut_io::hald::write_identity_tiff(&args.output, args.level),
        ext => bail!("Unsupported Hald format: .{}", ext),
    };
    result.with_context(|| format!("Failed to write Hald: {}", args.output.display()))?;

    let edge = clut_io::hald::edge(args.level);
    info!(level = args.level, edge, path = %args.output.display(), "wrote identity Hald");
    println!("{} ({}x{}, level {})", args.output.display(), edge, edge, args.level);
    Ok(())
}
