// src/fs/mod.rs

use std::fmt;
use std::fmt::Debug;
use std::fs;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

pub mod hash;
pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path).with_context(|| format!("opening file {:?}", path))?;
        Ok(Box::new(file))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file = fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents)
            .with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("removing file {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }
}

/// Lexically clean a path into a canonical, '/'-separated name.
///
/// Does not touch the disk; only simplifies things like "foo/./bar" and
/// "foo/../bar". Canonical names are what the provider-preference rule and
/// provision identity compare, so they must be stable.
pub fn clean_name(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut absolute = false;
    for comp in path.components() {
        match comp {
            Component::Prefix(prefix) => {
                parts.clear();
                parts.push(prefix.as_os_str().to_string_lossy().into_owned());
            }
            Component::RootDir => {
                absolute = true;
                parts.clear();
            }
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Cheap cloneable handle to a file within a [`FileSystem`].
///
/// Identity is the canonical name; two handles to the same cleaned path
/// compare equal even if they were constructed from different spellings.
#[derive(Clone)]
pub struct BuildFile {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl BuildFile {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        let path = PathBuf::from(clean_name(&path.into()));
        Self { fs, path }
    }

    pub fn canonical_name(&self) -> String {
        clean_name(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.fs.exists(&self.path)
    }

    pub fn is_directory(&self) -> bool {
        self.fs.is_dir(&self.path)
    }

    /// Children of this directory, sorted by name for a stable scan order.
    pub fn list(&self) -> Result<Vec<BuildFile>> {
        let mut children: Vec<BuildFile> = self
            .fs
            .read_dir(&self.path)?
            .into_iter()
            .map(|p| BuildFile::new(self.fs.clone(), p))
            .collect();
        children.sort_by_key(|f| f.canonical_name());
        Ok(children)
    }

    pub fn parent(&self) -> Option<BuildFile> {
        let parent = self.path.parent()?;
        if parent.as_os_str().is_empty() {
            return None;
        }
        Some(BuildFile::new(self.fs.clone(), parent))
    }

    /// Resolve `sub` under this file's path.
    pub fn relative(&self, sub: &str) -> BuildFile {
        BuildFile::new(self.fs.clone(), self.path.join(sub))
    }

    /// A handle to an arbitrary path on the same filesystem.
    pub fn with_path(&self, path: impl Into<PathBuf>) -> BuildFile {
        BuildFile::new(self.fs.clone(), path)
    }

    pub fn content_hash(&self) -> Result<String> {
        hash::compute_file_hash(self.fs.as_ref(), &self.path)
    }

    pub fn create_directory(&self) -> Result<()> {
        self.fs.create_dir_all(&self.path)
    }

    pub fn read_to_string(&self) -> Result<String> {
        self.fs.read_to_string(&self.path)
    }

    pub fn write(&self, contents: &[u8]) -> Result<()> {
        self.fs.write(&self.path, contents)
    }

    pub fn remove(&self) -> Result<()> {
        self.fs.remove_file(&self.path)
    }
}

impl PartialEq for BuildFile {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_name() == other.canonical_name()
    }
}

impl Eq for BuildFile {}

impl fmt::Debug for BuildFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BuildFile").field(&self.path).finish()
    }
}
