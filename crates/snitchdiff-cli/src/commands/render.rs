//! Render command
//!
//! Usage: snitchdiff render --fixtures <DIR> --type <T> --id <ID> --left <TIME> --right <TIME>

use std::io::Write;

use clap::Args;
use snitchdiff_core::{DiffSession, Scene};

use super::fixture::{load, runtime, LoadArgs};

#[derive(Debug, Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub load: LoadArgs,

    /// Expand every collapsed subtree before printing
    #[arg(long)]
    pub expand_all: bool,
}

/// Execute render command
pub fn execute(args: RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    let rt = runtime()?;
    let session = rt.block_on(load(&args.load))?;

    if args.expand_all && session.state().has_tree() {
        session.expand_all()?;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_scene(&mut out, &session)?;
    Ok(())
}

/// Status line, then one `x y label [side]` line per settled node
fn write_scene(out: &mut impl Write, session: &DiffSession) -> std::io::Result<()> {
    writeln!(out, "status: {}", session.state())?;
    let scene: Scene = session.scene();
    for node in scene.settled() {
        writeln!(
            out,
            "{:.1} {:.1} {} [{}]",
            node.to.x,
            node.to.y,
            node.label,
            node.side.css_class()
        )?;
    }
    Ok(())
}
