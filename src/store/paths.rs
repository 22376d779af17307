//! Path helpers
//!
//! Base directory cleaning, placed-path validation and the
//! record / temp file naming scheme.

use std::ffi::OsString;
use std::fs::DirBuilder;
use std::path::{Component, Path, PathBuf};

use crate::error::{KvError, Result};

/// Suffix of the in-flight temp file next to each record
pub const TMP_SUFFIX: &str = ".tmp";

/// Permissions for directories created by the store (unix)
#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// Make `dir` absolute and lexically clean (`.` dropped, `..` folded)
pub(crate) fn clean_base_dir(dir: &Path) -> Result<PathBuf> {
    if dir.as_os_str().is_empty() {
        return Err(KvError::Config("base directory is empty".to_string()));
    }

    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };

    Ok(normalize(&absolute))
}

fn normalize(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // ".." at the root stays at the root
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Check a placer's output and rebuild it from its normal components
///
/// Rejects paths that are empty, absolute, or contain `..`, since those
/// would land outside the base directory.
pub(crate) fn validate_relative(key: &str, placed: &Path) -> Result<PathBuf> {
    let invalid = |reason: &str| KvError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let mut relative = PathBuf::new();
    for component in placed.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("placed path contains '..'")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("placed path is absolute"))
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(invalid("placed path is empty"));
    }
    Ok(relative)
}

/// `{base_dir}/{relative}{extension}`
pub(crate) fn record_path(base_dir: &Path, relative: &Path, extension: &str) -> PathBuf {
    let mut path = base_dir.join(relative).into_os_string();
    path.push(extension);
    PathBuf::from(path)
}

/// `{record}.tmp`
pub(crate) fn tmp_path(record: &Path) -> PathBuf {
    let mut path = OsString::from(record.as_os_str());
    path.push(TMP_SUFFIX);
    PathBuf::from(path)
}

/// Create `dir` and any missing parents; succeeds if it already exists
pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }

    builder.create(dir).map_err(|source| KvError::Directory {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/data/./a/../b")), PathBuf::from("/data/b"));
        assert_eq!(normalize(Path::new("/../data")), PathBuf::from("/data"));
    }

    #[test]
    fn test_clean_base_dir_is_absolute() {
        let cleaned = clean_base_dir(Path::new("./data/.")).unwrap();

        assert!(cleaned.is_absolute());
        assert!(cleaned.ends_with("data"));
    }

    #[test]
    fn test_clean_base_dir_rejects_empty() {
        assert!(matches!(clean_base_dir(Path::new("")), Err(KvError::Config(_))));
    }

    #[test]
    fn test_validate_relative_accepts_nested_keys() {
        let relative = validate_relative("users/alice", Path::new("users/./alice/")).unwrap();
        assert_eq!(relative, PathBuf::from("users/alice"));
    }

    #[test]
    fn test_validate_relative_rejects_escapes() {
        for placed in ["../etc/passwd", "/etc/passwd", "a/../../b", ".", ""] {
            let err = validate_relative("k", Path::new(placed)).unwrap_err();
            assert!(matches!(err, KvError::InvalidKey { .. }), "accepted {placed:?}");
        }
    }

    #[test]
    fn test_record_and_tmp_names() {
        let record = record_path(Path::new("/data"), Path::new("users/alice"), ".json");

        assert_eq!(record, PathBuf::from("/data/users/alice.json"));
        assert_eq!(tmp_path(&record), PathBuf::from("/data/users/alice.json.tmp"));
    }
}
