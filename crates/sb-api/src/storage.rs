use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sb_core::{BundleError, ErrorKind};

/// Where the script container lives.
pub trait ContainerStorage {
    fn read(&self, path: &Path) -> Result<Vec<u8>, BundleError>;
    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<(), BundleError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileStorage;

impl ContainerStorage for FileStorage {
    fn read(&self, path: &Path) -> Result<Vec<u8>, BundleError> {
        if !path.exists() {
            return Err(BundleError::new(
                ErrorKind::StorageNotFound,
                format!("Script container does not exist: {}", path.display()),
            ));
        }
        fs::read(path).map_err(|error| {
            BundleError::new(
                ErrorKind::StorageRead,
                format!("Failed to read {}: {}", path.display(), error),
            )
        })
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<(), BundleError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|error| write_failure(path, error))?;
        fs::write(path, bytes).map_err(|error| write_failure(path, error))
    }
}

fn write_failure(path: &Path, error: std::io::Error) -> BundleError {
    BundleError::persist(format!("Failed to write {}: {}", path.display(), error))
}

/// In-memory storage; can be told to refuse the next few writes.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    files: BTreeMap<PathBuf, Vec<u8>>,
    refuse_writes: usize,
    write_attempts: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }

    pub fn get(&self, path: &Path) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn refuse_next_writes(&mut self, count: usize) {
        self.refuse_writes = count;
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts
    }
}

impl ContainerStorage for MemoryStorage {
    fn read(&self, path: &Path) -> Result<Vec<u8>, BundleError> {
        self.files.get(path).cloned().ok_or_else(|| {
            BundleError::new(
                ErrorKind::StorageNotFound,
                format!("Script container does not exist: {}", path.display()),
            )
        })
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<(), BundleError> {
        self.write_attempts += 1;
        if self.refuse_writes > 0 {
            self.refuse_writes -= 1;
            return Err(BundleError::persist(format!(
                "{} is locked by another process",
                path.display()
            )));
        }
        self.files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}
