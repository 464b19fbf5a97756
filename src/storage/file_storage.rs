use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::Storage;
use crate::storage::types::{Artifact, ArtifactName, PurgeReport};

const TEMP_PREFIX: &str = ".capture-";
const TEMP_SUFFIX: &str = ".part";

/// Content directory backed by a flat filesystem directory.
///
/// Writes land in a hidden temporary file next to their destination and are renamed into
/// place once flushed, so listings and reads only ever see complete artifacts.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        fs::create_dir_all(path).map_err(|e| {
            error!("Failed to create content dir {}: {}", path.display(), e);
            StorageError::InitFailed(e)
        })?;
        let root = fs::canonicalize(path).map_err(|e| {
            error!("Failed to resolve content dir {}: {}", path.display(), e);
            StorageError::InitFailed(e)
        })?;
        info!("FileStorage initialized at {}", root.display());
        Ok(Self { root })
    }

    /// Resolves `name` to a regular file that lives inside the root.
    fn resolve(&self, name: &ArtifactName) -> Result<PathBuf, StorageError> {
        let candidate = self.root.join(name.as_str());
        let resolved = match fs::canonicalize(&candidate) {
            Ok(p) => p,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => return Err(StorageError::ReadFailed(e)),
        };
        if !resolved.starts_with(&self.root) {
            warn!(
                "Refusing {}: resolves outside the content dir to {}",
                name,
                resolved.display()
            );
            return Err(StorageError::NotFound(name.to_string()));
        }
        if !resolved.is_file() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        Ok(resolved)
    }
}

fn is_temp_file(file_name: &str) -> bool {
    file_name.starts_with(TEMP_PREFIX) && file_name.ends_with(TEMP_SUFFIX)
}

/// Purge removes exactly what a listing can show, plus abandoned temp files.
fn is_purgeable(file_name: &str) -> bool {
    ArtifactName::parse(file_name).is_ok() || is_temp_file(file_name)
}

impl Storage for FileStorage {
    fn save_artifact(&self, name: &ArtifactName, bytes: &[u8]) -> Result<(), StorageError> {
        let destination = self.root.join(name.as_str());
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&self.root)
            .map_err(|e| {
                error!("Failed to create temp file in {}: {}", self.root.display(), e);
                StorageError::WriteFailed(e)
            })?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| {
                error!("Failed to write {}: {}", tmp.path().display(), e);
                StorageError::WriteFailed(e)
            })?;
        tmp.persist(&destination).map_err(|e| {
            error!("Failed to publish {}: {}", destination.display(), e.error);
            StorageError::WriteFailed(e.error)
        })?;
        debug!("Published {} ({} bytes)", destination.display(), bytes.len());
        Ok(())
    }

    fn list_artifacts(&self) -> Result<Vec<Artifact>, StorageError> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            error!("Failed to read content dir {}: {}", self.root.display(), e);
            StorageError::ReadFailed(e)
        })?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StorageError::ReadFailed)?;
            let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let Ok(name) = ArtifactName::parse(&file_name) else {
                continue;
            };
            // Entries can vanish between read_dir and stat during a purge.
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.is_file() {
                artifacts.push(Artifact {
                    name,
                    size: metadata.len(),
                });
            }
        }
        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Listed {} artifact(s) in {}", artifacts.len(), self.root.display());
        Ok(artifacts)
    }

    fn read_artifact(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let name = ArtifactName::parse(name)?;
        let path = self.resolve(&name)?;
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(name.to_string()),
            _ => {
                error!("Read failed {}: {}", path.display(), e);
                StorageError::ReadFailed(e)
            }
        })?;
        debug!("Read {} byte(s) from {}", bytes.len(), path.display());
        Ok(bytes)
    }

    fn purge_all(&self) -> PurgeReport {
        let mut report = PurgeReport::default();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to read content dir {}: {}", self.root.display(), e);
                report.failed.push((self.root.display().to_string(), e));
                return report;
            }
        };

        for entry in entries.flatten() {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !is_purgeable(&file_name) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!("Removed {}", file_name);
                    report.removed.push(file_name);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    error!("Failed to remove {}: {}", file_name, e);
                    report.failed.push((file_name, e));
                }
            }
        }

        if report.is_clean() {
            info!(
                "Purged {} artifact(s) from {}",
                report.removed.len(),
                self.root.display()
            );
        } else {
            warn!(
                "Purged {} artifact(s) from {}, {} failure(s)",
                report.removed.len(),
                self.root.display(),
                report.failed.len()
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn name(s: &str) -> ArtifactName {
        ArtifactName::parse(s).unwrap()
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("captures");
        let storage = FileStorage::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(storage.list_artifacts().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_read_artifact() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage
            .save_artifact(&name("2024-01-01-10-00-00.png"), &[7u8; 100])
            .unwrap();

        let bytes = storage.read_artifact("2024-01-01-10-00-00.png").unwrap();
        assert_eq!(bytes, vec![7u8; 100]);

        let listed = storage.list_artifacts().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].size, 100);
    }

    #[test]
    fn test_save_replaces_same_name() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let n = name("2024-01-01-10-00-00.png");
        storage.save_artifact(&n, b"first").unwrap();
        storage.save_artifact(&n, b"second").unwrap();

        assert_eq!(storage.read_artifact(n.as_str()).unwrap(), b"second");
        assert_eq!(storage.list_artifacts().unwrap().len(), 1);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save_artifact(&name("a.png"), b"data").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png".to_string()]);
    }

    #[test]
    fn test_list_only_reports_png_files() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        fs::write(dir.path().join("2024-01-01-10-03-00.png"), [0u8; 120]).unwrap();
        fs::write(dir.path().join("2024-01-01-10-00-00.png"), [0u8; 100]).unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join(".capture-abc.part"), b"partial").unwrap();
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let listed = storage.list_artifacts().unwrap();
        let names: Vec<&str> = listed.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["2024-01-01-10-00-00.png", "2024-01-01-10-03-00.png"]);
        assert_eq!(listed[0].size, 100);
        assert_eq!(listed[1].size, 120);
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        match storage.read_artifact("missing.png") {
            Err(StorageError::NotFound(n)) => assert_eq!(n, "missing.png"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_read_rejects_traversal() {
        let root = TempDir::new().unwrap();
        let content = root.path().join("content");
        fs::write(root.path().join("secret.png"), b"secret").unwrap();
        let storage = FileStorage::new(&content).unwrap();

        for bad in ["../secret.png", "..%2Fsecret.png", "/secret.png", "..\\secret.png"] {
            let err = storage.read_artifact(bad).unwrap_err();
            assert!(err.is_not_found(), "{:?} -> {:?}", bad, err);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_read_refuses_symlink_out_of_root() {
        let root = TempDir::new().unwrap();
        let content = root.path().join("content");
        let storage = FileStorage::new(&content).unwrap();
        fs::write(root.path().join("outside.png"), b"outside").unwrap();
        std::os::unix::fs::symlink(root.path().join("outside.png"), content.join("link.png"))
            .unwrap();

        match storage.read_artifact("link.png") {
            Err(StorageError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_purge_all_removes_artifacts_and_temp_files() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save_artifact(&name("a.png"), b"a").unwrap();
        storage.save_artifact(&name("b.png"), b"b").unwrap();
        fs::write(dir.path().join(".capture-xyz.part"), b"partial").unwrap();
        fs::write(dir.path().join("keep.txt"), b"keep").unwrap();

        let report = storage.purge_all();
        assert!(report.is_clean());
        assert_eq!(report.removed.len(), 3);
        assert!(storage.list_artifacts().unwrap().is_empty());
        assert!(dir.path().join("keep.txt").exists());
    }

    #[test]
    fn test_purge_only_touches_listable_names() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save_artifact(&name("a.png"), b"a").unwrap();
        fs::write(dir.path().join("UPPER.PNG"), b"c").unwrap();
        fs::write(dir.path().join("a..b.png"), b"d").unwrap();

        let listed: Vec<String> = storage
            .list_artifacts()
            .unwrap()
            .into_iter()
            .map(|a| a.name.to_string())
            .collect();
        let report = storage.purge_all();

        assert_eq!(report.removed, listed);
        assert!(dir.path().join("UPPER.PNG").exists());
        assert!(dir.path().join("a..b.png").exists());
    }

    #[test]
    fn test_purge_reports_failures_without_stopping() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save_artifact(&name("a.png"), b"a").unwrap();
        // remove_file on a directory fails, the file must still go.
        fs::create_dir(dir.path().join("stuck.png")).unwrap();

        let report = storage.purge_all();
        assert_eq!(report.removed, vec!["a.png".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "stuck.png");
    }

    #[test]
    fn test_concurrent_listing_never_sees_partial_files() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
        let payload = vec![42u8; 256 * 1024];

        let writer = {
            let storage = Arc::clone(&storage);
            let payload = payload.clone();
            std::thread::spawn(move || {
                for i in 0..20 {
                    let n = ArtifactName::parse(&format!("shot-{:02}.png", i)).unwrap();
                    storage.save_artifact(&n, &payload).unwrap();
                }
            })
        };

        while !writer.is_finished() {
            for artifact in storage.list_artifacts().unwrap() {
                assert_eq!(artifact.size, payload.len() as u64);
                if let Ok(bytes) = storage.read_artifact(artifact.name.as_str()) {
                    assert_eq!(bytes.len(), payload.len());
                }
            }
        }
        writer.join().unwrap();
        assert_eq!(storage.list_artifacts().unwrap().len(), 20);
    }
}
