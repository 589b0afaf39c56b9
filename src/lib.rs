//! Streaming access to files addressed by scheme-qualified URIs.
//!
//! A [`Context`] maps URI schemes (`file`, `hdfs`, `gs`, `s3`, ...) to
//! [`Backend`]s. Opening a path asks the backend for a [`FileHandle`] and
//! stacks up to three layers on top of it:
//!
//! ```text
//! handle -> Raw* -> Buffered* -> [Text*]   (* = Reader or Writer)
//! ```
//!
//! Every layer owns the one below it, and closing the outermost layer
//! closes the whole stack. Streams are synchronous and blocking.
//!
//! ```no_run
//! use fs_remote_io::{open_read_text, open_write_text, using, Context};
//!
//! # fn main() -> fs_remote_io::Result<()> {
//! let ctx = Context::default();
//! using(open_write_text(&ctx, "/tmp/notes.txt", 8192)?, |f| {
//!     writeln!(f, "result1: {}", 5)?;
//!     writeln!(f, "result2: {}", 7)
//! })?;
//!
//! let mut reader = open_read_text(&ctx, "/tmp/notes.txt", 8192)?;
//! for line in reader.lines() {
//!     print!("{}", line?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod buffered;
mod context;
mod copy;
mod errors;
pub mod raw;
pub mod text;
mod uri;

pub use backend::{Backend, FileHandle, LocalBackend, MemoryBackend};
pub use buffered::{BufferedReader, BufferedWriter};
pub use context::{Config, Context};
pub use copy::copy;
pub use errors::{Result, StreamError};
pub use raw::{RawReader, RawWriter, Stream};
pub use text::{TextReader, TextWriter};
pub use uri::RemoteUri;

pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Buffered binary reader over a remote file.
pub type BinaryFileReader = BufferedReader<RawReader>;
/// Line-iterable Latin-1 reader over a remote file.
pub type TextFileReader = TextReader<BufferedReader<RawReader>>;
/// Buffered binary writer over a remote file.
pub type BinaryFileWriter = BufferedWriter<RawWriter>;
/// Latin-1 text writer over a remote file.
pub type TextFileWriter = TextWriter<BufferedWriter<RawWriter>>;

/// Open `path` for buffered binary reading. `buffer_size` is both the
/// block size and the hint given to the backend.
pub fn open_read_binary(
    ctx: &Context,
    path: &str,
    buffer_size: usize,
) -> Result<BinaryFileReader> {
    let uri = ctx.parse_uri(path)?;
    let raw = RawReader::open(ctx, &uri, buffer_size)?;
    BufferedReader::with_block_size(buffer_size, raw)
}

/// Open `path` for reading as Latin-1 text.
pub fn open_read_text(
    ctx: &Context,
    path: &str,
    buffer_size: usize,
) -> Result<TextFileReader> {
    Ok(TextReader::new(open_read_binary(ctx, path, buffer_size)?))
}

/// Create or truncate `path` for buffered binary writing. `buffer_size` is
/// the block size; the backend gets no hint.
pub fn open_write_binary(
    ctx: &Context,
    path: &str,
    buffer_size: usize,
) -> Result<BinaryFileWriter> {
    if buffer_size == 0 {
        return Err(StreamError::InvalidBufferSize(buffer_size));
    }
    let uri = ctx.parse_uri(path)?;
    let raw = RawWriter::open(ctx, &uri)?;
    BufferedWriter::with_block_size(buffer_size, raw)
}

/// Create or truncate `path` for writing Latin-1 text.
pub fn open_write_text(
    ctx: &Context,
    path: &str,
    buffer_size: usize,
) -> Result<TextFileWriter> {
    Ok(TextWriter::new(open_write_binary(ctx, path, buffer_size)?))
}

/// Run `f` on `stream` and close the stream on every exit path.
///
/// If `f` fails and the close fails too, the result is
/// [`StreamError::Cleanup`] carrying both errors. A stream already closed
/// by `f` is not closed again.
pub fn using<S, T, F>(mut stream: S, f: F) -> Result<T>
where
    S: Stream,
    F: FnOnce(&mut S) -> Result<T>,
{
    let outcome = f(&mut stream);
    let closed = if stream.closed() {
        Ok(())
    } else {
        stream.close()
    };
    StreamError::combine(outcome, closed)
}

#[cfg(test)]
pub(crate) fn initialize() {
    let _ = env_logger::builder().is_test(true).try_init();
}
