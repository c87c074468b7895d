use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::fs;
use tracing::info;
use visual_snapshot::{
    compare, loader::load_pair, metrics, writer::encode_png, writer::write_atomic, Comparison,
    Region,
};

use crate::cli::context::CliContext;
use crate::cli::output::emit;

#[derive(Args, Clone, Debug)]
pub struct CompareArgs {
    /// Reference image
    #[arg(long, value_name = "PNG")]
    pub golden: PathBuf,

    /// Image under test
    #[arg(long, value_name = "PNG")]
    pub candidate: PathBuf,

    /// Region to ignore as `x,y,width,height`; repeatable
    #[arg(long = "exclude", value_name = "X,Y,W,H", value_parser = parse_region)]
    pub excluded: Vec<Region>,

    /// Where to write the diff image on mismatch
    #[arg(long, value_name = "PNG")]
    pub diff: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
enum CompareReport {
    Match,
    Mismatch {
        diff_pixels: u64,
        diff: Option<PathBuf>,
    },
    DimensionMismatch {
        golden: (u32, u32),
        candidate: (u32, u32),
    },
}

pub async fn cmd_compare(args: CompareArgs, ctx: &CliContext) -> Result<bool> {
    let (golden, candidate) = load_pair(&args.golden, &args.candidate).await?;

    let options = ctx.config().compare.clone();
    let excluded = args.excluded.clone();
    let started = Instant::now();
    let comparison =
        tokio::task::spawn_blocking(move || compare(&golden, &candidate, &excluded, &options))
            .await
            .context("comparison task failed")?;
    metrics::observe_compare(started.elapsed());

    let report = match comparison {
        Comparison::Match => CompareReport::Match,
        Comparison::DimensionMismatch { golden, candidate } => {
            CompareReport::DimensionMismatch { golden, candidate }
        }
        Comparison::Mismatch { diff_pixels, diff } => {
            let written = match &args.diff {
                Some(path) => {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        fs::create_dir_all(parent)
                            .await
                            .with_context(|| format!("creating {}", parent.display()))?;
                    }
                    let bytes = encode_png(&diff).context("encoding diff image")?;
                    write_atomic(path, &bytes).await?;
                    info!(path = %path.display(), "diff written");
                    Some(path.clone())
                }
                None => None,
            };
            CompareReport::Mismatch {
                diff_pixels,
                diff: written,
            }
        }
    };

    let passed = matches!(report, CompareReport::Match);
    emit(ctx.output(), &report, render_report)?;
    Ok(passed)
}

fn render_report(report: &CompareReport) -> String {
    match report {
        CompareReport::Match => "match".to_string(),
        CompareReport::Mismatch { diff_pixels, diff } => match diff {
            Some(path) => format!(
                "mismatch: {diff_pixels} pixels differ (diff: {})",
                path.display()
            ),
            None => format!("mismatch: {diff_pixels} pixels differ"),
        },
        CompareReport::DimensionMismatch { golden, candidate } => format!(
            "dimension mismatch: golden {}x{}, candidate {}x{}",
            golden.0, golden.1, candidate.0, candidate.1
        ),
    }
}

/// Parse `x,y,width,height` into a region.
pub fn parse_region(raw: &str) -> Result<Region, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [x, y, width, height] = parts.as_slice() else {
        return Err(format!("expected x,y,width,height but got {raw:?}"));
    };
    let number = |value: &str| {
        value
            .parse::<u32>()
            .map_err(|err| format!("{value:?} is not a pixel count: {err}"))
    };
    Ok(Region::new(
        number(*x)?,
        number(*y)?,
        number(*width)?,
        number(*height)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_regions() {
        assert_eq!(parse_region("1, 2,30,40"), Ok(Region::new(1, 2, 30, 40)));
        assert!(parse_region("1,2,3").is_err());
        assert!(parse_region("1,2,3,-4").is_err());
    }

    #[test]
    fn human_report_mentions_sizes() {
        let text = render_report(&CompareReport::DimensionMismatch {
            golden: (10, 10),
            candidate: (10, 12),
        });
        assert_eq!(text, "dimension mismatch: golden 10x10, candidate 10x12");
    }
}
