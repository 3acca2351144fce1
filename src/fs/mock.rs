// src/fs/mock.rs

//! In-memory filesystem used by the driver tests.
//!
//! Entries live in one flat map keyed by cleaned path, the same canonical
//! form [`BuildFile`](super::BuildFile) identities use, so lookups through
//! differently spelled handles agree. Directories are implied: inserting a
//! file creates every ancestor, and `read_dir` derives children by parent
//! lookup, so the scanner sees the same shape a real tree would have.
//! Tests mutate the map mid-build to model edited sources, deleted sources,
//! and ephemeral outputs.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::{clean_name, FileSystem};

#[derive(Debug, Clone)]
enum Entry {
    File(Vec<u8>),
    Dir,
}

#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, Entry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or overwrite) a file, creating every ancestor directory.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = key(path.as_ref());
        let mut entries = self.entries.lock().unwrap();
        insert_ancestors(&mut entries, &path);
        entries.insert(path, Entry::File(content.into()));
    }

    /// Insert an empty directory and its ancestors. Source roots with no
    /// files yet still have to scan cleanly.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = key(path.as_ref());
        let mut entries = self.entries.lock().unwrap();
        insert_ancestors(&mut entries, &path);
        entries.entry(path).or_insert(Entry::Dir);
    }
}

fn key(path: &Path) -> PathBuf {
    PathBuf::from(clean_name(path))
}

fn insert_ancestors(entries: &mut HashMap<PathBuf, Entry>, path: &Path) {
    let mut ancestor = path.parent();
    while let Some(dir) = ancestor {
        if dir.as_os_str().is_empty() {
            break;
        }
        entries.entry(dir.to_path_buf()).or_insert(Entry::Dir);
        ancestor = dir.parent();
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let entries = self.entries.lock().unwrap();
        match entries.get(&key(path)) {
            Some(Entry::File(content)) => Ok(String::from_utf8(content.clone())?),
            Some(Entry::Dir) => Err(anyhow!("is a directory: {:?}", path)),
            None => Err(anyhow!("no such file: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(&key(path)) {
            Some(Entry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(Entry::Dir) => Err(anyhow!("is a directory: {:?}", path)),
            None => Err(anyhow!("no such file: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries.lock().unwrap().contains_key(&key(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(
            self.entries.lock().unwrap().get(&key(path)),
            Some(Entry::File(_))
        )
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.entries.lock().unwrap().get(&key(path)),
            Some(Entry::Dir)
        )
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let path = key(path);
        let mut entries = self.entries.lock().unwrap();
        let is_file = matches!(entries.get(&path), Some(Entry::File(_)));
        if !is_file {
            if entries.contains_key(&path) {
                return Err(anyhow!("is a directory: {:?}", path));
            }
            return Err(anyhow!("no such file: {:?}", path));
        }
        entries.remove(&path);
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.entries.lock().unwrap();
        let dir = key(path);
        if !matches!(entries.get(&dir), Some(Entry::Dir)) {
            return Err(anyhow!("not a directory: {:?}", path));
        }
        Ok(entries
            .keys()
            .filter(|p| p.parent() == Some(dir.as_path()))
            .cloned()
            .collect())
    }
}
