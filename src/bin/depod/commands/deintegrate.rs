//! `depod deintegrate` command

use anyhow::Result;

use crate::cli::DeintegrateArgs;
use depod::ops::{self, DeintegrateOpts};
use depod::util::{GlobalContext, Shell};

pub fn execute(shell: &Shell, args: DeintegrateArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;

    let opts = DeintegrateOpts {
        project: args.project,
        keep_sources: args.keep_sources,
        keep_workspace: args.keep_workspace,
        keep_orphaned_targets: args.keep_orphaned_targets,
    };

    let report = ops::deintegrate(&ctx, shell, &opts)?;

    if shell.is_json() {
        let deleted: Vec<String> = report
            .deleted
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        shell.json_event(&serde_json::json!({
            "reason": "deintegrate-report",
            "project": report.project.display().to_string(),
            "summary": report.summary,
            "deleted": deleted,
        }));
    }

    Ok(())
}
