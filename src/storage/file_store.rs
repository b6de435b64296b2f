use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::KeyValueStore;
use crate::error::{Result, ShelfError};

pub const SHELF_DIR: &str = ".promptshelf";

/// Stores each key as `<key>.json` inside a `.promptshelf/` directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Initialize a new library under `root`
    pub fn init(root: &Path) -> Result<Self> {
        let dir = root.join(SHELF_DIR);

        if dir.exists() {
            return Err(ShelfError::AlreadyInitialized);
        }

        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Open an existing library under `root`
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join(SHELF_DIR);

        if !dir.is_dir() {
            return Err(ShelfError::NotInitialized);
        }

        Ok(Self { dir })
    }

    /// Get the `.promptshelf` directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(ShelfError::Storage(format!("Invalid store key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // Write beside the target and rename so a crash never leaves half a document
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
