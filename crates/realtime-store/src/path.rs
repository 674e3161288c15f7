//! Store paths
//!
//! Paths are `/`-separated keys (`players/abc`, `coins/320x380`). Leading,
//! trailing and repeated separators are ignored.

/// Split a path into its non-empty segments
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Canonical form of a path
pub fn normalize(path: &str) -> String {
    segments(path).join("/")
}

/// True if one path is an ancestor of (or equal to) the other.
///
/// A write at `a` changes the snapshot at `b` exactly when they are related.
pub fn related(a: &str, b: &str) -> bool {
    let a = segments(a);
    let b = segments(b);
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}
