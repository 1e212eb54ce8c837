//! Named-blob storage sources.
//!
//! Writers consume this contract and nothing else; retry, buffering and
//! backpressure belong to the storage or transport layer behind it.

use std::fs;
use std::path::PathBuf;

use hashbrown::HashMap;

use crate::error::Result;

/// Byte-oriented named-blob store.
pub trait Source {
    fn read(&mut self, name: &str) -> Result<Vec<u8>>;
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()>;
    fn close(&mut self) {}
}

/// Blobs as files under a root directory.
#[derive(Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("not a directory: {}", root.display()),
            )
            .into());
        }
        Ok(DirectorySource { root })
    }
}

impl Source for DirectorySource {
    fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.root.join(name))?)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        fs::write(self.root.join(name), data)?;
        Ok(())
    }
}

/// In-memory blob store, inspectable in tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.blobs.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blobs.keys().map(String::as_str)
    }
}

impl Source for MemorySource {
    fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        self.blobs.get(name).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no blob named {name}"))
                .into()
        })
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.blobs.insert(name.to_owned(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_round_trips() {
        let mut source = MemorySource::new();
        source.write("a.json", b"{}").unwrap();
        assert_eq!(source.read("a.json").unwrap(), b"{}");
        assert!(source.read("missing").is_err());
    }

    #[test]
    fn directory_source_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = DirectorySource::new(dir.path()).unwrap();
        source.write("blob.bin", &[1, 2, 3]).unwrap();
        assert_eq!(source.read("blob.bin").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn directory_source_requires_existing_directory() {
        assert!(DirectorySource::new("/definitely/not/here").is_err());
    }
}
