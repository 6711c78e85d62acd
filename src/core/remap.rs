//! Prefix-based path rewriting between host and container namespaces.

use std::path::{Path, PathBuf};

use crate::core::mount::{MountSpec, normalize};

/// Which side of each mount is the match source during a translation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host paths become container paths (before invocation).
    ToContainer,
    /// Container paths become host paths (after invocation).
    ToHost,
}

/// Rewrite one path according to a direction and an ordered mount set.
///
/// Matching is per path component, never raw substring: `/data/foo` does not
/// cover `/data/foobar`. Among covering mounts the longest source prefix
/// wins; equal lengths resolve to the earliest mount. Returns `None` when no
/// mount covers the path (or the string cannot be normalized), which callers
/// treat as pass-through.
///
/// For any path covered by the mount set,
/// `remap_path(remap_path(p, ToContainer, m), ToHost, m)` yields `p` back.
pub fn remap_path(path: &str, direction: Direction, mounts: &[MountSpec]) -> Option<String> {
    let input = normalize(Path::new(path)).ok()?;
    let mut winner: Option<(usize, PathBuf)> = None;
    for mount in mounts {
        let (source, destination) = match direction {
            Direction::ToContainer => (&mount.host_path, &mount.container_path),
            Direction::ToHost => (&mount.container_path, &mount.host_path),
        };
        let Ok(remainder) = input.strip_prefix(source) else {
            continue;
        };
        let depth = source.components().count();
        let more_specific = match &winner {
            Some((best, _)) => depth > *best,
            None => true,
        };
        if more_specific {
            let rewritten = if remainder.as_os_str().is_empty() {
                destination.clone()
            } else {
                destination.join(remainder)
            };
            winner = Some((depth, rewritten));
        }
    }
    winner.map(|(_, rewritten)| rewritten.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mount;

    #[test]
    fn rewrites_under_a_matching_mount() {
        let mounts = vec![mount("/data/run1", "/mnt/work/run1")];
        assert_eq!(
            remap_path("/data/run1/sample.bam", Direction::ToContainer, &mounts),
            Some("/mnt/work/run1/sample.bam".to_string())
        );
    }

    #[test]
    fn longest_source_prefix_wins() {
        let mounts = vec![mount("/a", "/x"), mount("/a/b", "/y")];
        assert_eq!(
            remap_path("/a/b/c.txt", Direction::ToContainer, &mounts),
            Some("/y/c.txt".to_string())
        );
    }

    #[test]
    fn equal_length_ties_resolve_to_the_earlier_mount() {
        let mounts = vec![mount("/a/b", "/first"), mount("/a/b", "/second")];
        assert_eq!(
            remap_path("/a/b/c.txt", Direction::ToContainer, &mounts),
            Some("/first/c.txt".to_string())
        );
    }

    #[test]
    fn component_boundaries_are_respected() {
        let mounts = vec![mount("/data/foo", "/mnt/foo")];
        assert_eq!(
            remap_path("/data/foobar/x.txt", Direction::ToContainer, &mounts),
            None
        );
    }

    #[test]
    fn uncovered_paths_do_not_match() {
        let mounts = vec![mount("/a", "/x")];
        assert_eq!(remap_path("/unrelated/path", Direction::ToContainer, &mounts), None);
    }

    #[test]
    fn exact_mount_root_maps_to_the_other_side() {
        let mounts = vec![mount("/data/run1", "/mnt/run1")];
        assert_eq!(
            remap_path("/data/run1", Direction::ToContainer, &mounts),
            Some("/mnt/run1".to_string())
        );
    }

    #[test]
    fn to_host_inverts_to_container() {
        let mounts = vec![mount("/data/run1", "/mnt/run1"), mount("/refs", "/mnt/biodata")];
        for original in ["/data/run1/a/b.vcf", "/refs/hg38/seq/hg38.fa"] {
            let container =
                remap_path(original, Direction::ToContainer, &mounts).expect("to container");
            let host = remap_path(&container, Direction::ToHost, &mounts).expect("to host");
            assert_eq!(host, original);
        }
    }

    #[test]
    fn relative_strings_never_match() {
        let mounts = vec![mount("/a", "/x")];
        assert_eq!(remap_path("a/b.txt", Direction::ToContainer, &mounts), None);
    }
}
