use std::io::{self, Read, Write};

use crate::backend::FileHandle;
use crate::{Context, RemoteUri, Result, StreamError};

/// Common surface of every layer in a stream stack.
pub trait Stream {
    fn readable(&self) -> bool;

    fn writable(&self) -> bool;

    fn closed(&self) -> bool;

    /// Release the stream together with every layer it owns, innermost
    /// last. Calling it a second time fails with [`StreamError::Closed`].
    fn close(&mut self) -> Result<()>;
}

fn close_on_drop(uri: &RemoteUri, handle: Option<Box<dyn FileHandle>>) {
    if let Some(mut handle) = handle {
        log::trace!("raw/{}: closing on drop", uri);
        if let Err(err) = handle.close() {
            log::error!("raw/{}: failed to close on drop: {}", uri, err);
        }
    }
}

/// Readable adapter translating caller buffers into handle reads 1:1.
pub struct RawReader {
    uri: RemoteUri,
    handle: Option<Box<dyn FileHandle>>,
    buffer_size: usize,
    eof: bool,
}

impl RawReader {
    /// Open `uri` through the backend registered for its scheme.
    pub fn open(
        ctx: &Context,
        uri: &RemoteUri,
        buffer_size: usize,
    ) -> Result<Self> {
        if buffer_size == 0 {
            return Err(StreamError::InvalidBufferSize(buffer_size));
        }
        let backend = ctx.backend(uri)?;
        let handle = backend.open_read(uri, buffer_size)?;
        log::debug!(
            "raw/{}: opened for reading through {} backend, hint {} bytes",
            uri,
            backend.name(),
            buffer_size
        );
        Ok(Self::from_handle(uri.clone(), handle, buffer_size))
    }

    /// Take ownership of an already opened handle.
    pub fn from_handle(
        uri: RemoteUri,
        handle: Box<dyn FileHandle>,
        buffer_size: usize,
    ) -> Self {
        Self {
            uri,
            handle: Some(handle),
            buffer_size,
            eof: false,
        }
    }

    pub fn uri(&self) -> &RemoteUri {
        &self.uri
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Fill the front of `buf` with at most `buf.len()` bytes and return
    /// how many were copied. `0` means end-of-stream, and once the backend
    /// has reported it the handle is not asked again.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let handle = self.handle.as_mut().ok_or(StreamError::Closed)?;
        if self.eof || buf.is_empty() {
            return Ok(0);
        }

        let chunk = handle.read(buf.len())?;
        let n = chunk.len();
        if n > buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "backend returned {} bytes for a request of {}",
                    n,
                    buf.len()
                ),
            )
            .into());
        }
        buf[..n].copy_from_slice(&chunk);

        if n == 0 {
            log::trace!("raw/{}: end of stream", self.uri);
            self.eof = true;
        }
        Ok(n)
    }
}

impl Stream for RawReader {
    fn readable(&self) -> bool {
        true
    }

    fn writable(&self) -> bool {
        false
    }

    fn closed(&self) -> bool {
        self.handle.is_none()
    }

    fn close(&mut self) -> Result<()> {
        let mut handle = self.handle.take().ok_or(StreamError::Closed)?;
        log::debug!("raw/{}: closing reader", self.uri);
        handle.close()
    }
}

impl Read for RawReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}

impl Drop for RawReader {
    fn drop(&mut self) {
        close_on_drop(&self.uri, self.handle.take());
    }
}

/// Writable adapter forwarding every caller buffer to the handle whole.
pub struct RawWriter {
    uri: RemoteUri,
    handle: Option<Box<dyn FileHandle>>,
}

impl RawWriter {
    /// Create or truncate `uri` through the backend registered for its
    /// scheme.
    pub fn open(ctx: &Context, uri: &RemoteUri) -> Result<Self> {
        let backend = ctx.backend(uri)?;
        let handle = backend.open_write(uri)?;
        log::debug!(
            "raw/{}: opened for writing through {} backend",
            uri,
            backend.name()
        );
        Ok(Self::from_handle(uri.clone(), handle))
    }

    /// Take ownership of an already opened handle.
    pub fn from_handle(uri: RemoteUri, handle: Box<dyn FileHandle>) -> Self {
        Self {
            uri,
            handle: Some(handle),
        }
    }

    pub fn uri(&self) -> &RemoteUri {
        &self.uri
    }

    /// Hand all of `buf` to the backend. Either every byte is accepted or
    /// the call fails.
    pub fn write_from(&mut self, buf: &[u8]) -> Result<usize> {
        let handle = self.handle.as_mut().ok_or(StreamError::Closed)?;
        handle.write(buf)?;
        Ok(buf.len())
    }

    /// Make the bytes written so far visible on the backend.
    pub fn flush_backend(&mut self) -> Result<()> {
        let handle = self.handle.as_mut().ok_or(StreamError::Closed)?;
        handle.flush()
    }
}

impl Stream for RawWriter {
    fn readable(&self) -> bool {
        false
    }

    fn writable(&self) -> bool {
        true
    }

    fn closed(&self) -> bool {
        self.handle.is_none()
    }

    fn close(&mut self) -> Result<()> {
        let mut handle = self.handle.take().ok_or(StreamError::Closed)?;
        log::debug!("raw/{}: closing writer", self.uri);
        handle.close()
    }
}

impl Write for RawWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_from(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.flush_backend()?)
    }
}

impl Drop for RawWriter {
    fn drop(&mut self) {
        close_on_drop(&self.uri, self.handle.take());
    }
}
