//! Output virtual filesystem abstraction.
//!
//! Grounded on spec.md §5/§6: `create_file`, `open_for_write`, `create_dir`,
//! `write_bytes`, `close`. Files are opened in create-truncate mode; the
//! emitter assumes writes are buffered and flushed at `close` and never
//! re-opens or seeks.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// An open handle into which the emitter streams bytes before `close`.
pub trait FileHandle {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn close(self: Box<Self>) -> io::Result<()>;
}

pub trait VirtualFilesystem {
    fn create_dir(&self, path: &Path) -> io::Result<()>;
    fn create_file(&self, path: &Path) -> io::Result<()>;
    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn FileHandle>>;
}

/// Real filesystem, used by the `ssac` CLI.
#[derive(Debug, Default)]
pub struct DiskFs;

struct DiskHandle(fs::File);

impl FileHandle for DiskHandle {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.0.write_all(bytes)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.0.sync_all()
    }
}

impl VirtualFilesystem for DiskFs {
    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn create_file(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::File::create(path)?;
        Ok(())
    }

    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn FileHandle>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(DiskHandle(file)))
    }
}

/// In-memory filesystem used by tests so emitter output can be asserted on
/// without touching disk.
#[derive(Debug, Default)]
pub struct MemoryFs {
    dirs: RefCell<Vec<PathBuf>>,
    files: Rc<RefCell<HashMap<PathBuf, Vec<u8>>>>,
}

struct MemoryHandle {
    path: PathBuf,
    buf: Vec<u8>,
    files: Rc<RefCell<HashMap<PathBuf, Vec<u8>>>>,
}

impl FileHandle for MemoryHandle {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.files.borrow_mut().insert(self.path, self.buf);
        Ok(())
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    pub fn read_to_string(&self, path: &Path) -> Option<String> {
        self.read(path).map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl VirtualFilesystem for MemoryFs {
    fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.dirs.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn create_file(&self, path: &Path) -> io::Result<()> {
        self.files.borrow_mut().entry(path.to_path_buf()).or_default();
        Ok(())
    }

    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn FileHandle>> {
        Ok(Box::new(MemoryHandle {
            path: path.to_path_buf(),
            buf: Vec::new(),
            files: Rc::clone(&self.files),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_round_trips_a_write() {
        let fs = MemoryFs::new();
        let path = PathBuf::from("module.c");
        let mut handle = fs.open_for_write(&path).unwrap();
        handle.write_bytes(b"int x;").unwrap();
        handle.close().unwrap();
        assert_eq!(fs.read_to_string(&path).unwrap(), "int x;");
    }

    #[test]
    fn disk_fs_round_trips_a_write_through_a_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/module.c");
        let fs = DiskFs;
        let mut handle = fs.open_for_write(&path).unwrap();
        handle.write_bytes(b"int x;").unwrap();
        handle.close().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "int x;");
    }
}
