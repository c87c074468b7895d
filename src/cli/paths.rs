use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use visual_snapshot::{Namespace, SnapshotId};

use crate::cli::context::CliContext;
use crate::cli::output::emit;

#[derive(Args, Clone, Debug)]
pub struct PathsArgs {
    /// Snapshot name segments, e.g. `login form empty`
    #[arg(required = true, value_name = "SEGMENT")]
    pub segments: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ResolvedPaths {
    id: String,
    golden: PathBuf,
    candidate: PathBuf,
    diff: PathBuf,
}

pub async fn cmd_paths(args: PathsArgs, ctx: &CliContext) -> Result<bool> {
    let id = SnapshotId::new(args.segments)?;
    let layout = ctx.layout();
    let resolved = ResolvedPaths {
        id: id.to_string(),
        golden: layout.resolve(&id, Namespace::Golden),
        candidate: layout.resolve(&id, Namespace::Candidate),
        diff: layout.resolve(&id, Namespace::Diff),
    };

    emit(ctx.output(), &resolved, |paths| {
        format!(
            "golden:    {}\ncandidate: {}\ndiff:      {}",
            paths.golden.display(),
            paths.candidate.display(),
            paths.diff.display()
        )
    })?;
    Ok(true)
}
