use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::{Backend, FileHandle};
use crate::{RemoteUri, Result};

/// Serves `file://` URIs from the local filesystem.
#[derive(Clone, Copy, Default, Debug)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Whether `src` and `dest` name the same existing file, through links
/// or `..` components included. A missing destination is never the same.
fn same_file(src: &Path, dest: &Path) -> Result<bool> {
    if !dest.exists() {
        return Ok(false);
    }
    Ok(fs::canonicalize(src)? == fs::canonicalize(dest)?)
}

struct LocalReadHandle {
    path: PathBuf,
    file: File,
    chunk: Vec<u8>,
}

impl FileHandle for LocalReadHandle {
    fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        if self.chunk.len() < max_bytes {
            self.chunk.resize(max_bytes, 0);
        }
        let n = self.file.read(&mut self.chunk[..max_bytes])?;
        Ok(self.chunk[..n].to_vec())
    }

    fn close(&mut self) -> Result<()> {
        log::trace!("local: closing {} after reading", self.path.display());
        Ok(())
    }
}

struct LocalWriteHandle {
    path: PathBuf,
    file: File,
}

impl FileHandle for LocalWriteHandle {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        log::trace!("local: closed {} after writing", self.path.display());
        Ok(())
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn open_read(
        &self,
        uri: &RemoteUri,
        buffer_size: usize,
    ) -> Result<Box<dyn FileHandle>> {
        let path = uri.to_file_path()?;
        let file = File::open(&path)?;
        Ok(Box::new(LocalReadHandle {
            path,
            file,
            chunk: Vec::with_capacity(buffer_size),
        }))
    }

    fn open_write(&self, uri: &RemoteUri) -> Result<Box<dyn FileHandle>> {
        let path = uri.to_file_path()?;
        create_parent_dir(&path)?;
        let file = File::create(&path)?;
        Ok(Box::new(LocalWriteHandle { path, file }))
    }

    fn copy_file(&self, src: &RemoteUri, dest: &RemoteUri) -> Result<()> {
        let src = src.to_file_path()?;
        let dest = dest.to_file_path()?;
        // fs::copy truncates the destination before reading the source.
        if same_file(&src, &dest)? {
            log::debug!(
                "local: {} and {} are the same file, nothing to copy",
                src.display(),
                dest.display()
            );
            return Ok(());
        }
        create_parent_dir(&dest)?;
        let copied = fs::copy(&src, &dest)?;
        log::debug!(
            "local: copied {} bytes from {} to {}",
            copied,
            src.display(),
            dest.display()
        );
        Ok(())
    }
}
