// File access used by the session. The core never opens dialogs; it is handed
// paths and reads/writes whole documents through a `FileStore`.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub trait FileStore {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    /// Replaces the whole file.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileStore for LocalFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        fs::write(path, data)
    }
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// In-memory files, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RefCell<HashMap<PathBuf, Vec<u8>>>,
    fail_writes: Cell<bool>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(path.into(), data.into());
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    pub fn get_string(&self, path: &Path) -> Option<String> {
        self.get(path).map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = self.files.borrow().keys().cloned().collect();
        out.sort();
        out
    }

    /// Makes every following write fail with a disk error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl FileStore for MemoryFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.get(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{}: no such file", path.display()))
        })
    }
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if self.fail_writes.get() {
            return Err(io::Error::other("simulated disk error"));
        }
        self.insert(path, data);
        Ok(())
    }
    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }
}

impl<F: FileStore + ?Sized> FileStore for &F {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        (**self).write(path, data)
    }
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}
