//! Destination checks for exported files
//!
//! A destination is rejected when its directory is missing, when it or its
//! directory is read-only, or when an office suite holds a lock file for
//! it (`~$name` for Word, `.~lock.name#` for LibreOffice). Directories are
//! never created.

use super::ExportError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Lock files other applications create next to an open document
pub fn lock_files(path: &Path) -> Vec<PathBuf> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    let dir = parent_dir(path);
    vec![
        dir.join(format!("~${}", name)),
        dir.join(format!(".~lock.{}#", name)),
    ]
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Fail with the reason a file could not be written to `path`
pub fn check_destination(path: &Path) -> Result<(), ExportError> {
    let dir = parent_dir(path);
    let dir_meta = fs::metadata(&dir).map_err(|_| ExportError::DestinationMissing {
        path: dir.clone(),
    })?;
    if !dir_meta.is_dir() {
        return Err(ExportError::DestinationMissing { path: dir });
    }
    if let Some(lock) = lock_files(path).into_iter().find(|lock| lock.exists()) {
        return Err(ExportError::Locked {
            path: path.to_path_buf(),
            lock,
        });
    }
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() || meta.permissions().readonly() => {
            return Err(ExportError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(_) if dir_meta.permissions().readonly() => {
            return Err(ExportError::PermissionDenied { path: dir });
        }
        Err(_) => {}
    }
    Ok(())
}

/// Write exported bytes, mapping failures onto destination errors
pub fn write_destination(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    check_destination(path)?;
    fs::write(path, bytes).map_err(|source| match source.kind() {
        ErrorKind::PermissionDenied => ExportError::PermissionDenied {
            path: path.to_path_buf(),
        },
        ErrorKind::NotFound => ExportError::DestinationMissing {
            path: parent_dir(path),
        },
        _ => ExportError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("script.fdx");
        assert!(matches!(
            write_destination(&path, b"x"),
            Err(ExportError::DestinationMissing { .. })
        ));
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn test_lock_file_blocks_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.docx");
        fs::write(dir.path().join("~$script.docx"), b"").unwrap();
        match check_destination(&path) {
            Err(ExportError::Locked { lock, .. }) => {
                assert_eq!(lock, dir.path().join("~$script.docx"))
            }
            other => panic!("expected Locked, got {:?}", other),
        }
    }

    #[test]
    fn test_libreoffice_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.docx");
        fs::write(dir.path().join(".~lock.script.docx#"), b"").unwrap();
        assert!(matches!(
            check_destination(&path),
            Err(ExportError::Locked { .. })
        ));
    }

    #[test]
    fn test_read_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.txt");
        fs::write(&path, b"old").unwrap();
        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions).unwrap();
        assert!(matches!(
            write_destination(&path, b"new"),
            Err(ExportError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.txt");
        write_destination(&path, b"FADE IN:").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"FADE IN:");
    }
}
