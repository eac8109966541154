//! Detail command
//!
//! Usage: snitchdiff detail <LOAD ARGS> --node <TYPE>:<ID>

use clap::Args;
use snitchdiff_core::detail::{DetailPanel, RowChange};
use snitchdiff_core::NodeKey;

use super::fixture::{load, runtime, LoadArgs};

#[derive(Debug, Args)]
pub struct DetailArgs {
    #[command(flatten)]
    pub load: LoadArgs,

    /// Node to inspect, as `type:id`
    #[arg(long, value_parser = parse_key)]
    pub node: NodeKey,
}

fn parse_key(text: &str) -> Result<NodeKey, String> {
    NodeKey::parse(text).ok_or_else(|| format!("expected <type>:<id>, got '{}'", text))
}

/// Execute detail command
pub fn execute(args: DetailArgs) -> Result<(), Box<dyn std::error::Error>> {
    let rt = runtime()?;
    let session = rt.block_on(load(&args.load))?;

    if !session.right_click(&args.node)? {
        return Err(format!("record for {} has not loaded", args.node).into());
    }
    let panel = session
        .selected()
        .ok_or_else(|| format!("no detail for {}", args.node))?;

    print!("{}", format_panel(&panel));
    Ok(())
}

/// Tab separated `property left right change` rows under a header
fn format_panel(panel: &DetailPanel) -> String {
    let mut out = format!("{}\nproperty\tleft\tright\tchange\n", panel.key);
    for row in &panel.rows {
        let change = match row.change {
            RowChange::Unchanged => "",
            RowChange::Removed => "removed",
            RowChange::Added => "added",
            RowChange::Modified => "modified",
        };
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            row.property, row.left.value, row.right.value, change
        ));
    }
    out
}
