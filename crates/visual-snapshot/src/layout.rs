//! Filesystem layout of golden, candidate and diff images
use std::path::{Path, PathBuf};

use crate::models::{Namespace, SnapshotId};

pub const IMAGE_EXTENSION: &str = "png";

/// Maps snapshot identifiers onto the three namespace trees under one output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLayout {
    output_root: PathBuf,
}

impl SnapshotLayout {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn namespace_root(&self, namespace: Namespace) -> PathBuf {
        self.output_root.join(namespace.dir_name())
    }

    /// Sub-path shared by all three namespaces.
    pub fn relative(id: &SnapshotId) -> PathBuf {
        let mut path: PathBuf = id.parents().iter().collect();
        path.push(format!("{}.{}", id.leaf(), IMAGE_EXTENSION));
        path
    }

    pub fn resolve(&self, id: &SnapshotId, namespace: Namespace) -> PathBuf {
        self.namespace_root(namespace).join(Self::relative(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_resolve_to_parallel_paths() {
        let layout = SnapshotLayout::new("/work/target");
        let id = SnapshotId::new(["suite", "case", "name"]).unwrap();

        let golden = layout.resolve(&id, Namespace::Golden);
        let candidate = layout.resolve(&id, Namespace::Candidate);
        let diff = layout.resolve(&id, Namespace::Diff);

        assert_eq!(golden, PathBuf::from("/work/target/golden/suite/case/name.png"));
        assert_eq!(
            candidate,
            PathBuf::from("/work/target/screenshots/suite/case/name.png")
        );
        assert_eq!(diff, PathBuf::from("/work/target/diff/suite/case/name.png"));

        for namespace in Namespace::ALL {
            let resolved = layout.resolve(&id, namespace);
            let relative = resolved
                .strip_prefix(layout.namespace_root(namespace))
                .unwrap();
            assert_eq!(relative, SnapshotLayout::relative(&id));
        }
    }

    #[test]
    fn resolution_is_repeatable() {
        let layout = SnapshotLayout::new("out");
        let id = SnapshotId::parse("single").unwrap();
        assert_eq!(
            layout.resolve(&id, Namespace::Golden),
            layout.resolve(&id, Namespace::Golden)
        );
        assert_eq!(
            layout.resolve(&id, Namespace::Golden),
            PathBuf::from("out/golden/single.png")
        );
    }
}
