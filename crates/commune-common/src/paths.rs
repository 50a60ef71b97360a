//! Path containment checks for files under the uploads root.
//!
//! Resource rows store a relative file path. Before the backing file is
//! deleted, the resolved path must be proven to live under the uploads
//! directory. The comparison is done on canonicalized paths and whole path
//! components, so `../` escapes and sibling-directory lookalikes
//! (`/uploads2` next to `/uploads`) both fail the check.

use std::path::{Path, PathBuf};

/// Resolve `relative` against `base` and return the canonical path iff it
/// lies strictly under the canonical base directory.
///
/// Returns `None` when the base cannot be canonicalized, the target does not
/// exist, or the resolved path escapes the base (including resolving to the
/// base directory itself).
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use commune_common::paths::resolve_under;
///
/// let ok = resolve_under(Path::new("/var/commune/uploads"), "docs/guide.pdf");
/// let escape = resolve_under(Path::new("/var/commune/uploads"), "../secrets.txt");
/// assert!(escape.is_none());
/// # let _ = ok;
/// ```
#[must_use]
pub fn resolve_under(base: &Path, relative: &str) -> Option<PathBuf> {
    let canonical_base = base.canonicalize().ok()?;
    let candidate = base.join(relative);
    let canonical = candidate.canonicalize().ok()?;

    // starts_with compares whole components, so "/uploads2" is not
    // considered to be under "/uploads".
    if canonical != canonical_base && canonical.starts_with(&canonical_base) {
        Some(canonical)
    } else {
        None
    }
}
