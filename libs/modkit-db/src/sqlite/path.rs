//! SQLite path preparation utilities.

use std::io;
use std::path::PathBuf;

/// True for DSNs that open a private in-memory database.
pub(crate) fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

/// Ensure the parent directory of a file-backed SQLite database exists.
/// Memory databases and `create_dirs == false` leave the filesystem alone.
pub(crate) fn prepare_sqlite_path(dsn: &str, create_dirs: bool) -> io::Result<()> {
    if !create_dirs || is_memory_dsn(dsn) {
        return Ok(());
    }

    let parent = extract_file_path_from_dsn(dsn).and_then(|p| p.parent().map(PathBuf::from));
    if let Some(parent) = parent {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Extract the file path from a SQLite DSN, following sqlx's own parsing:
/// strip the `sqlite://` or `sqlite:` prefix and drop the query string.
///
/// - `sqlite:///abs/db.sqlite` → `/abs/db.sqlite`
/// - `sqlite://database/app.db` → `database/app.db`
/// - `sqlite:app.db?mode=rwc` → `app.db`
fn extract_file_path_from_dsn(dsn: &str) -> Option<PathBuf> {
    if is_memory_dsn(dsn) {
        return None;
    }

    let rest = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .unwrap_or(dsn);
    let path = rest.split('?').next().unwrap_or_default();

    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_file_path_from_dsn() {
        assert_eq!(
            extract_file_path_from_dsn("sqlite:///absolute/path/to/db.sqlite"),
            Some(PathBuf::from("/absolute/path/to/db.sqlite"))
        );
        assert_eq!(
            extract_file_path_from_dsn("sqlite://database/recipes.db"),
            Some(PathBuf::from("database/recipes.db"))
        );
        assert_eq!(
            extract_file_path_from_dsn("sqlite:test.db?mode=rwc"),
            Some(PathBuf::from("test.db"))
        );

        assert_eq!(extract_file_path_from_dsn("sqlite::memory:"), None);
        assert_eq!(extract_file_path_from_dsn("sqlite:///test.db?mode=memory"), None);
        assert_eq!(extract_file_path_from_dsn("sqlite://"), None);
    }

    #[test]
    fn test_prepare_sqlite_path_creates_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("a/b/app.db");
        let dsn = format!("sqlite://{}", db.display());

        prepare_sqlite_path(&dsn, false).unwrap();
        assert!(!tmp.path().join("a").exists());

        prepare_sqlite_path(&dsn, true).unwrap();
        assert!(tmp.path().join("a/b").is_dir());
    }
}
