//! Crash-safe file helpers.
//!
//! Every document the log persists goes through [`write_atomic`]:
//!
//! 1. Write to a uniquely named temporary file in the same directory
//! 2. Sync the temporary file to disk
//! 3. Rename it over the destination
//! 4. Fsync the parent directory so the rename itself is durable
//!
//! A crash at any point leaves either the old document or the new one,
//! never a truncated mix of both. [`restore_file`] uses the same steps to
//! put user files back during a rollback.

use crate::error::{StorageError, StorageResult};
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;

/// Suffix used for in-flight temporary files.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Atomically replaces `path` with `data`.
///
/// The temporary file gets a unique name in the destination directory, so
/// nothing else living next to `path` is touched. Parent directories are
/// created when missing. When `sync` is false the fsync steps are skipped,
/// trading durability for speed.
pub fn write_atomic(path: &Path, data: &[u8], sync: bool) -> StorageResult<()> {
    replace(path, data, None, sync)
}

/// Restores a user file to `data`.
///
/// Unlike [`write_atomic`], an existing target keeps its identity: a
/// symlink is followed and its destination rewritten, and the permissions
/// of the file being replaced carry over to the new content.
pub fn restore_file(path: &Path, data: &[u8], sync: bool) -> StorageResult<()> {
    let dest = resolve_symlink(path)?;
    let permissions = match fs::metadata(&dest) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(StorageError::read(&dest, e)),
    };
    replace(&dest, data, permissions, sync)
}

fn replace(
    path: &Path,
    data: &[u8],
    permissions: Option<Permissions>,
    sync: bool,
) -> StorageResult<()> {
    let parent = ensure_parent(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut temp = Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)
        .map_err(|e| StorageError::write(parent, e))?;
    temp.write_all(data)
        .map_err(|e| StorageError::write(temp.path(), e))?;
    if let Some(permissions) = permissions {
        fs::set_permissions(temp.path(), permissions)
            .map_err(|e| StorageError::write(temp.path(), e))?;
    }
    if sync {
        temp.as_file()
            .sync_all()
            .map_err(|e| StorageError::write(temp.path(), e))?;
    }

    temp.persist(path)
        .map_err(|e| StorageError::write(path, e.error))?;

    if sync {
        sync_dir(parent)?;
    }
    Ok(())
}

/// Follows a chain of symlinks at `path` to the file they name.
///
/// Dangling links resolve to their (missing) destination.
fn resolve_symlink(path: &Path) -> StorageResult<PathBuf> {
    let mut current = path.to_path_buf();
    // Bounded like the kernel's own loop limit.
    for _ in 0..40 {
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                let link =
                    fs::read_link(&current).map_err(|e| StorageError::read(&current, e))?;
                current = match current.parent() {
                    Some(parent) if link.is_relative() => parent.join(link),
                    _ => link,
                };
            }
            Ok(_) => return Ok(current),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(current),
            Err(e) => return Err(StorageError::read(&current, e)),
        }
    }
    Err(StorageError::read(
        path,
        io::Error::new(io::ErrorKind::Other, "too many levels of symbolic links"),
    ))
}

/// Writes `data` to `path`, failing if the file already exists.
///
/// Used for write-once snapshots. Returns `Ok(false)` when the file
/// was already present and nothing was written.
pub fn write_new(path: &Path, data: &[u8], sync: bool) -> StorageResult<bool> {
    let parent = ensure_parent(path)?;

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(StorageError::write(path, e)),
    };
    file.write_all(data).map_err(|e| StorageError::write(path, e))?;
    if sync {
        file.sync_all().map_err(|e| StorageError::write(path, e))?;
        drop(file);
        sync_dir(parent)?;
    }
    Ok(true)
}

/// Reads the whole file at `path`.
///
/// Returns `None` if the file does not exist.
pub fn read_optional(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::read(path, e)),
    };
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| StorageError::read(path, e))?;
    Ok(Some(data))
}

/// Removes the file at `path`.
///
/// Returns `Ok(false)` if it was already gone.
pub fn remove_optional(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::write(path, e)),
    }
}

/// Creates `path` and all of its parents.
pub fn create_dir_all(path: &Path) -> StorageResult<()> {
    fs::create_dir_all(path).map_err(|e| StorageError::write(path, e))
}

/// Syncs a directory so that entry creation, rename and removal are durable.
///
/// Windows NTFS journals metadata updates and does not support opening a
/// directory for fsync, so this is a no-op there.
#[cfg(unix)]
pub fn sync_dir(path: &Path) -> StorageResult<()> {
    let dir = File::open(path).map_err(|e| StorageError::write(path, e))?;
    dir.sync_all().map_err(|e| StorageError::write(path, e))
}

/// Syncs a directory (no-op on this platform).
#[cfg(not(unix))]
pub fn sync_dir(_path: &Path) -> StorageResult<()> {
    Ok(())
}

fn ensure_parent(path: &Path) -> StorageResult<&Path> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if !parent.exists() {
        create_dir_all(parent)?;
    }
    Ok(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_atomic_replaces_contents() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("doc.json");

        write_atomic(&path, b"first", true).unwrap();
        write_atomic(&path, b"second", true).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn write_atomic_leaves_siblings_alone() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("notes");
        let sibling = temp.path().join("notes.tmp");
        fs::write(&sibling, b"scratch").unwrap();

        write_atomic(&path, b"doc", false).unwrap();
        restore_file(&path, b"restored", false).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"restored");
        assert_eq!(fs::read(&sibling).unwrap(), b"scratch");
    }

    #[cfg(unix)]
    #[test]
    fn restore_keeps_mode_and_symlinks() {
        use std::os::unix::fs::{symlink, PermissionsExt};

        let temp = tempdir().unwrap();
        let real = temp.path().join("real.sh");
        let link = temp.path().join("link.sh");
        fs::write(&real, b"new").unwrap();
        fs::set_permissions(&real, Permissions::from_mode(0o750)).unwrap();
        symlink("real.sh", &link).unwrap();

        restore_file(&link, b"old", false).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&real).unwrap(), b"old");
        assert_eq!(fs::metadata(&real).unwrap().permissions().mode() & 0o777, 0o750);
    }

    #[test]
    fn restore_recreates_missing_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sub").join("gone.txt");

        restore_file(&path, b"back", false).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"back");
    }

    #[test]
    fn write_atomic_creates_parents() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a").join("b").join("doc.json");

        write_atomic(&path, b"nested", false).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"nested");
    }

    #[test]
    fn write_new_never_overwrites() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("once");

        assert!(write_new(&path, b"original", false).unwrap());
        assert!(!write_new(&path, b"replacement", false).unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"original");
    }

    #[test]
    fn read_optional_missing_is_none() {
        let temp = tempdir().unwrap();
        assert!(read_optional(&temp.path().join("missing")).unwrap().is_none());
    }

    #[test]
    fn remove_optional_reports_absence() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("gone");
        fs::write(&path, b"x").unwrap();

        assert!(remove_optional(&path).unwrap());
        assert!(!remove_optional(&path).unwrap());
    }
}
