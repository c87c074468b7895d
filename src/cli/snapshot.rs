use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use visual_snapshot::{
    CaptureTarget, FileCapture, Region, SnapshotController, SnapshotId, SnapshotOutcome,
};

use super::compare::parse_region;
use crate::cli::context::CliContext;
use crate::cli::output::emit;

#[derive(Args, Clone, Debug)]
pub struct MatchArgs {
    /// Snapshot name segments, e.g. `login form empty`
    #[arg(required = true, value_name = "SEGMENT")]
    pub segments: Vec<String>,

    /// PNG rendered by the test run
    #[arg(long, value_name = "PNG")]
    pub from: PathBuf,

    /// Region to ignore as `x,y,width,height`; repeatable
    #[arg(long = "exclude", value_name = "X,Y,W,H", value_parser = parse_region)]
    pub excluded: Vec<Region>,
}

pub async fn cmd_match(args: MatchArgs, ctx: &CliContext) -> Result<bool> {
    let id = SnapshotId::new(args.segments)?;
    let backend = Arc::new(FileCapture::new(args.from));
    let controller = SnapshotController::new(ctx.config().clone(), backend);

    let outcome = controller
        .match_snapshot(&id, &CaptureTarget::Page { clip: None }, &args.excluded)
        .await?;

    emit(ctx.output(), &outcome, |outcome| render_outcome(&id, outcome))?;
    Ok(outcome.passed())
}

fn render_outcome(id: &SnapshotId, outcome: &SnapshotOutcome) -> String {
    match outcome {
        SnapshotOutcome::Updated { golden } => {
            format!("{id}: golden updated ({})", golden.display())
        }
        SnapshotOutcome::FirstRun { golden } => {
            format!("{id}: new golden recorded ({})", golden.display())
        }
        SnapshotOutcome::Matched { .. } => format!("{id}: matches golden"),
        SnapshotOutcome::Mismatched {
            diff_pixels, diff, ..
        } => match diff {
            Some(path) => format!(
                "{id}: {diff_pixels} pixels differ from golden (diff: {})",
                path.display()
            ),
            None => format!("{id}: {diff_pixels} pixels differ from golden"),
        },
        SnapshotOutcome::DimensionMismatch { golden, candidate } => format!(
            "{id}: size {}x{} differs from golden {}x{}",
            candidate.0, candidate.1, golden.0, golden.1
        ),
    }
}
