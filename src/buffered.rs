use std::io::{self, BufRead, Read, Write};

use crate::raw::Stream;
use crate::{Result, StreamError, DEFAULT_BUFFER_SIZE};

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 {
        return Err(StreamError::InvalidBufferSize(block_size));
    }
    Ok(())
}

/// Reading side of the buffering layer.
///
/// Every refill asks the inner stream for exactly one block, whatever the
/// size of the caller's buffer, so the number of round trips depends on
/// the block size alone.
pub struct BufferedReader<R> {
    inner: R,
    block: Box<[u8]>,
    pos: usize,
    filled: usize,
}

impl<R: Read + Stream> BufferedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            block: vec![0; DEFAULT_BUFFER_SIZE].into_boxed_slice(),
            pos: 0,
            filled: 0,
        }
    }

    pub fn with_block_size(block_size: usize, inner: R) -> Result<Self> {
        check_block_size(block_size)?;
        Ok(Self {
            inner,
            block: vec![0; block_size].into_boxed_slice(),
            pos: 0,
            filled: 0,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block.len()
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Bytes fetched from the inner stream but not yet handed out.
    pub fn buffered(&self) -> &[u8] {
        &self.block[self.pos..self.filled]
    }
}

impl<R: Read + Stream> BufRead for BufferedReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.inner.closed() {
            return Err(StreamError::Closed.into());
        }
        if self.pos >= self.filled {
            self.filled = self.inner.read(&mut self.block)?;
            self.pos = 0;
        }
        Ok(&self.block[self.pos..self.filled])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.filled);
    }
}

impl<R: Read + Stream> Read for BufferedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read + Stream> Stream for BufferedReader<R> {
    fn readable(&self) -> bool {
        self.inner.readable()
    }

    fn writable(&self) -> bool {
        false
    }

    fn closed(&self) -> bool {
        self.inner.closed()
    }

    fn close(&mut self) -> Result<()> {
        self.pos = 0;
        self.filled = 0;
        self.inner.close()
    }
}

/// Writing side of the buffering layer. Bytes reach the inner stream in
/// the order they were written, one full block at a time, and whatever is
/// pending on `flush` or `close`.
pub struct BufferedWriter<W: Write + Stream> {
    inner: W,
    block: Vec<u8>,
    block_size: usize,
}

impl<W: Write + Stream> BufferedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            block: Vec::with_capacity(DEFAULT_BUFFER_SIZE),
            block_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_block_size(block_size: usize, inner: W) -> Result<Self> {
        check_block_size(block_size)?;
        Ok(Self {
            inner,
            block: Vec::with_capacity(block_size),
            block_size,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Bytes written by the caller but not handed to the inner stream yet.
    pub fn pending(&self) -> &[u8] {
        &self.block
    }

    fn flush_block(&mut self) -> io::Result<()> {
        if self.block.is_empty() {
            return Ok(());
        }
        self.inner.write_all(&self.block)?;
        self.block.clear();
        Ok(())
    }
}

impl<W: Write + Stream> Write for BufferedWriter<W> {
    /// A full block is pushed before any new byte is accepted. If that
    /// push fails, the bytes accepted so far are reported as written and
    /// the rest of `buf` is not; with nothing accepted the call fails.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.inner.closed() {
            return Err(StreamError::Closed.into());
        }

        let mut accepted = 0;
        loop {
            if self.block.len() == self.block_size {
                if let Err(err) = self.flush_block() {
                    if accepted == 0 {
                        return Err(err);
                    }
                    log::debug!(
                        "buffered: {} bytes accepted before a failed push: {}",
                        accepted,
                        err
                    );
                    return Ok(accepted);
                }
            }
            if accepted == buf.len() {
                return Ok(accepted);
            }
            let room = self.block_size - self.block.len();
            let n = room.min(buf.len() - accepted);
            self.block.extend_from_slice(&buf[accepted..accepted + n]);
            accepted += n;
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.inner.closed() {
            return Err(StreamError::Closed.into());
        }
        self.flush_block()?;
        self.inner.flush()
    }
}

impl<W: Write + Stream> Stream for BufferedWriter<W> {
    fn readable(&self) -> bool {
        false
    }

    fn writable(&self) -> bool {
        self.inner.writable()
    }

    fn closed(&self) -> bool {
        self.inner.closed()
    }

    fn close(&mut self) -> Result<()> {
        if self.inner.closed() {
            return Err(StreamError::Closed);
        }
        let flushed = self.flush_block().map_err(StreamError::from);
        self.block.clear();
        StreamError::combine(flushed, self.inner.close())
    }
}

impl<W: Write + Stream> Drop for BufferedWriter<W> {
    fn drop(&mut self) {
        if !self.inner.closed() {
            if let Err(err) = self.flush_block() {
                log::error!(
                    "buffered: failed to flush pending block on drop: {}",
                    err
                );
            }
        }
    }
}
