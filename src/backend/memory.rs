use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Backend, FileHandle};
use crate::{RemoteUri, Result, StreamError};

#[derive(Default)]
struct Objects {
    files: RwLock<HashMap<String, Arc<Vec<u8>>>>,
    read_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl Objects {
    fn files(
        &self,
    ) -> Result<RwLockReadGuard<'_, HashMap<String, Arc<Vec<u8>>>>> {
        self.files
            .read()
            .map_err(|_| anyhow::anyhow!("memory backend lock poisoned").into())
    }

    fn files_mut(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, Arc<Vec<u8>>>>> {
        self.files
            .write()
            .map_err(|_| anyhow::anyhow!("memory backend lock poisoned").into())
    }

    fn lookup(&self, key: &str) -> Result<Arc<Vec<u8>>> {
        self.files()?.get(key).cloned().ok_or_else(|| {
            Error::new(ErrorKind::NotFound, format!("no such object: {}", key))
                .into()
        })
    }

    fn publish(&self, key: &str, content: Vec<u8>) -> Result<()> {
        self.files_mut()?.insert(key.to_owned(), Arc::new(content));
        Ok(())
    }
}

/// Process-local object store serving URIs such as `mem://bucket/key`.
///
/// Clones share the same objects, so a test can keep one clone for
/// inspection while another is registered in a [`crate::Context`].
#[derive(Clone, Default)]
pub struct MemoryBackend {
    objects: Arc<Objects>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `content` under `key`, replacing any previous object.
    pub fn insert(&self, key: &str, content: impl Into<Vec<u8>>) -> Result<()> {
        self.objects.publish(key, content.into())
    }

    /// Content of the object under `key`, if any.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .objects
            .files()?
            .get(key)
            .map(|content| content.to_vec()))
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.objects.files()?.contains_key(key))
    }

    /// Number of `read` round trips served since creation.
    pub fn read_calls(&self) -> usize {
        self.objects.read_calls.load(Ordering::SeqCst)
    }

    /// Number of `write` round trips served since creation.
    pub fn write_calls(&self) -> usize {
        self.objects.write_calls.load(Ordering::SeqCst)
    }
}

struct MemoryReadHandle {
    content: Arc<Vec<u8>>,
    position: usize,
    objects: Arc<Objects>,
}

impl FileHandle for MemoryReadHandle {
    fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        self.objects.read_calls.fetch_add(1, Ordering::SeqCst);
        let end = self
            .content
            .len()
            .min(self.position.saturating_add(max_bytes));
        let chunk = self.content[self.position..end].to_vec();
        self.position = end;
        Ok(chunk)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct MemoryWriteHandle {
    key: String,
    buffer: Vec<u8>,
    objects: Arc<Objects>,
    closed: bool,
}

impl FileHandle for MemoryWriteHandle {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        self.objects.write_calls.fetch_add(1, Ordering::SeqCst);
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        self.objects.publish(&self.key, self.buffer.clone())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        self.closed = true;
        self.objects.publish(&self.key, std::mem::take(&mut self.buffer))
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn open_read(
        &self,
        uri: &RemoteUri,
        buffer_size: usize,
    ) -> Result<Box<dyn FileHandle>> {
        let content = self.objects.lookup(&uri.key())?;
        log::trace!(
            "memory: opened {} ({} bytes, hint {})",
            uri,
            content.len(),
            buffer_size
        );
        Ok(Box::new(MemoryReadHandle {
            content,
            position: 0,
            objects: self.objects.clone(),
        }))
    }

    fn open_write(&self, uri: &RemoteUri) -> Result<Box<dyn FileHandle>> {
        let key = uri.key();
        self.objects.publish(&key, vec![])?;
        Ok(Box::new(MemoryWriteHandle {
            key,
            buffer: vec![],
            objects: self.objects.clone(),
            closed: false,
        }))
    }

    fn copy_file(&self, src: &RemoteUri, dest: &RemoteUri) -> Result<()> {
        let content = self.objects.lookup(&src.key())?;
        self.objects.files_mut()?.insert(dest.key(), content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(input: &str) -> RemoteUri {
        RemoteUri::parse(input).unwrap()
    }

    #[test]
    fn flush_publishes_pending_bytes() {
        let backend = MemoryBackend::new();
        let mut handle = backend.open_write(&uri("mem://bucket/a")).unwrap();
        assert_eq!(backend.get("bucket/a").unwrap(), Some(vec![]));

        handle.write(b"abc").unwrap();
        assert_eq!(backend.get("bucket/a").unwrap(), Some(vec![]));

        handle.flush().unwrap();
        assert_eq!(backend.get("bucket/a").unwrap(), Some(b"abc".to_vec()));

        handle.write(b"def").unwrap();
        handle.close().unwrap();
        assert_eq!(
            backend.get("bucket/a").unwrap(),
            Some(b"abcdef".to_vec())
        );
        assert!(matches!(handle.close(), Err(StreamError::Closed)));
    }

    #[test]
    fn open_write_truncates() {
        let backend = MemoryBackend::new();
        backend.insert("a", "old content").unwrap();

        let mut handle = backend.open_write(&uri("mem://a")).unwrap();
        assert_eq!(backend.get("a").unwrap(), Some(vec![]));
        handle.close().unwrap();
    }

    #[test]
    fn reads_are_counted() {
        let backend = MemoryBackend::new();
        backend.insert("a", "abcde").unwrap();

        let mut handle = backend.open_read(&uri("mem://a"), 2).unwrap();
        assert_eq!(handle.read(2).unwrap(), b"ab");
        assert_eq!(handle.read(2).unwrap(), b"cd");
        assert_eq!(handle.read(2).unwrap(), b"e");
        assert!(handle.read(2).unwrap().is_empty());
        assert_eq!(backend.read_calls(), 4);
    }

    #[test]
    fn missing_object_is_not_found() {
        let backend = MemoryBackend::new();
        match backend.open_read(&uri("mem://missing"), 8) {
            Err(StreamError::Io(err)) => {
                assert_eq!(err.kind(), ErrorKind::NotFound)
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("missing object was opened"),
        }
    }

    #[test]
    fn copy_shares_content() {
        let backend = MemoryBackend::new();
        backend.insert("a", "payload").unwrap();
        backend.copy_file(&uri("mem://a"), &uri("mem://b")).unwrap();
        assert_eq!(backend.get("b").unwrap(), Some(b"payload".to_vec()));
    }
}
