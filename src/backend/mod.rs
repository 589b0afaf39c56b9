mod local;
mod memory;

use crate::{RemoteUri, Result, StreamError};

pub use local::LocalBackend;
pub use memory::MemoryBackend;

/// A single opened file on some storage backend. The backend keeps the
/// position cursor; callers only ever move forward.
///
/// Read-only handles reject writes and write-only handles reject reads.
pub trait FileHandle: Send {
    /// Return up to `max_bytes` bytes. An empty result means end-of-file.
    fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        let _ = max_bytes;
        Err(StreamError::NotReadable)
    }

    /// Accept all of `data` or fail.
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let _ = data;
        Err(StreamError::NotWritable)
    }

    /// Make written bytes visible to other readers of the backend.
    fn flush(&mut self) -> Result<()> {
        Err(StreamError::NotWritable)
    }

    /// Release the handle. Implicitly flushes write handles.
    fn close(&mut self) -> Result<()>;
}

/// A storage provider serving one or more URI schemes.
pub trait Backend: Send + Sync {
    /// Diagnostic name used in logs.
    fn name(&self) -> &str;

    /// Open `uri` for reading. `buffer_size` is a hint the backend may use
    /// for its own chunking.
    fn open_read(
        &self,
        uri: &RemoteUri,
        buffer_size: usize,
    ) -> Result<Box<dyn FileHandle>>;

    /// Open `uri` for writing, creating it or truncating existing content.
    fn open_write(&self, uri: &RemoteUri) -> Result<Box<dyn FileHandle>>;

    /// Copy the whole of `src` to `dest` without routing the bytes through
    /// the caller.
    fn copy_file(&self, src: &RemoteUri, dest: &RemoteUri) -> Result<()>;
}
