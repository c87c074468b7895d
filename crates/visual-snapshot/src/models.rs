//! Data models for snapshot requests and outcomes
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::SnapshotError;

pub use cdp_adapter::{ClipRect, DeviceMetrics as Viewport};

/// Logical name of a screenshot: ordered path segments such as `suite/case/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SnapshotId(Vec<String>);

impl SnapshotId {
    pub fn new<I, S>(segments: I) -> Result<Self, SnapshotError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(SnapshotError::InvalidIdentifier(
                "identifier has no segments".to_string(),
            ));
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self(segments))
    }

    /// Parse a `/`-separated name, e.g. `login/form/empty`.
    pub fn parse(name: &str) -> Result<Self, SnapshotError> {
        Self::new(name.split('/'))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Directory segments, i.e. everything but the file name.
    pub fn parents(&self) -> &[String] {
        &self.0[..self.0.len() - 1]
    }

    pub fn leaf(&self) -> &str {
        &self.0[self.0.len() - 1]
    }
}

fn validate_segment(segment: &str) -> Result<(), SnapshotError> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(SnapshotError::InvalidIdentifier(format!(
            "segment {segment:?} is not a plain name"
        )));
    }
    if segment.contains(['/', '\\', '\0']) {
        return Err(SnapshotError::InvalidIdentifier(format!(
            "segment {segment:?} contains a path separator"
        )));
    }
    Ok(())
}

impl TryFrom<Vec<String>> for SnapshotId {
    type Error = SnapshotError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SnapshotId> for Vec<String> {
    fn from(value: SnapshotId) -> Self {
        value.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// The three parallel directory trees under the output root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Golden,
    Candidate,
    Diff,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Golden, Namespace::Candidate, Namespace::Diff];

    pub fn dir_name(self) -> &'static str {
        match self {
            Namespace::Golden => "golden",
            Namespace::Candidate => "screenshots",
            Namespace::Diff => "diff",
        }
    }
}

/// Rectangle of pixels ignored by the comparator.
///
/// Accepts fractional CSS-pixel input (e.g. from `getBoundingClientRect()`); it is
/// widened outward to whole pixels and clipped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RegionWire")]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }
}

#[derive(Deserialize)]
struct RegionWire {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl From<RegionWire> for Region {
    fn from(wire: RegionWire) -> Self {
        let (x, width) = pixel_span(wire.x, wire.width);
        let (y, height) = pixel_span(wire.y, wire.height);
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Smallest whole-pixel span covering `[start, start + len)`, clipped at zero.
fn pixel_span(start: f64, len: f64) -> (u32, u32) {
    let first = start.max(0.0).floor();
    // NaN ends collapse to an empty span
    let end = (start + len).ceil().max(first);
    (first as u32, (end - first) as u32)
}

/// What to render into an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureTarget {
    /// Whole scrollable page, or only `clip` when given
    Page {
        #[serde(default)]
        clip: Option<ClipRect>,
    },

    /// First element matching `selector` inside the frame named `frame`
    Element { frame: String, selector: String },
}

/// Result of a single snapshot request, one variant per decision branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SnapshotOutcome {
    /// Update mode rewrote the golden
    Updated { golden: PathBuf },

    /// No golden existed; the capture became the baseline
    FirstRun { golden: PathBuf },

    Matched { golden: PathBuf, candidate: PathBuf },

    Mismatched {
        candidate: PathBuf,
        diff_pixels: u64,
        /// `None` when the diff artifact could not be written
        diff: Option<PathBuf>,
    },

    DimensionMismatch {
        golden: (u32, u32),
        candidate: (u32, u32),
    },
}

impl SnapshotOutcome {
    pub fn passed(&self) -> bool {
        matches!(
            self,
            SnapshotOutcome::Updated { .. }
                | SnapshotOutcome::FirstRun { .. }
                | SnapshotOutcome::Matched { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            SnapshotOutcome::Updated { .. } => "updated",
            SnapshotOutcome::FirstRun { .. } => "first_run",
            SnapshotOutcome::Matched { .. } => "matched",
            SnapshotOutcome::Mismatched { .. } => "mismatched",
            SnapshotOutcome::DimensionMismatch { .. } => "dimension_mismatch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_regions_widen_to_whole_pixels() {
        let region: Region =
            serde_json::from_str(r#"{"x":0.5,"y":2.25,"width":10,"height":3.5}"#).unwrap();
        assert_eq!(region, Region::new(0, 2, 11, 4));

        let region: Region =
            serde_json::from_str(r#"{"x":-2.5,"y":-10,"width":5,"height":4}"#).unwrap();
        assert_eq!(region, Region::new(0, 0, 3, 0));

        let region: Region =
            serde_json::from_str(r#"{"x":3,"y":4,"width":5,"height":6}"#).unwrap();
        assert_eq!(region, Region::new(3, 4, 5, 6));
    }

    #[test]
    fn identifier_rejects_traversal_and_separators() {
        assert!(SnapshotId::new(Vec::<String>::new()).is_err());
        assert!(SnapshotId::new(["suite", ".."]).is_err());
        assert!(SnapshotId::new(["suite", ""]).is_err());
        assert!(SnapshotId::new(["a/b"]).is_err());
        assert!(SnapshotId::new(["suite", "case", "name"]).is_ok());
    }

    #[test]
    fn identifier_splits_parents_and_leaf() {
        let id = SnapshotId::parse("login/form/empty").unwrap();
        assert_eq!(id.parents(), ["login".to_string(), "form".to_string()]);
        assert_eq!(id.leaf(), "empty");
        assert_eq!(id.to_string(), "login/form/empty");
    }

    #[test]
    fn identifier_deserializes_from_segment_list() {
        let id: SnapshotId = serde_json::from_str(r#"["menu","open"]"#).unwrap();
        assert_eq!(id.segments().len(), 2);
        assert!(serde_json::from_str::<SnapshotId>("[]").is_err());
    }

    #[test]
    fn region_bounds_are_half_open() {
        let region = Region::new(2, 3, 4, 5);
        assert!(region.contains(2, 3));
        assert!(region.contains(5, 7));
        assert!(!region.contains(6, 7));
        assert!(!region.contains(5, 8));
        assert!(!region.contains(1, 3));
        assert!(!Region::new(0, 0, 0, 0).contains(0, 0));
    }

    #[test]
    fn only_accepting_outcomes_pass() {
        let golden = PathBuf::from("golden/a.png");
        assert!(SnapshotOutcome::FirstRun {
            golden: golden.clone()
        }
        .passed());
        assert!(SnapshotOutcome::Updated { golden }.passed());
        assert!(!SnapshotOutcome::DimensionMismatch {
            golden: (1, 1),
            candidate: (2, 2)
        }
        .passed());
    }
}
