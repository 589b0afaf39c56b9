use std::sync::Arc;

use crate::backend::{Backend, FileHandle};
use crate::{Context, RemoteUri, Result, StreamError, DEFAULT_BUFFER_SIZE};

/// Copy the whole of `src` to `dest`.
///
/// When both URIs are served by the same backend the transfer is left to
/// that backend entirely. Otherwise bytes are moved handle to handle,
/// never through the buffering or text layers. There is no atomicity: a
/// failed copy may leave a partial destination behind.
///
/// Copying a file onto itself succeeds without touching it.
pub fn copy(ctx: &Context, src: &str, dest: &str) -> Result<()> {
    let (src, src_backend) = ctx.resolve(src)?;
    let (dest, dest_backend) = ctx.resolve(dest)?;

    if src == dest {
        log::debug!("copy: {} is its own destination, nothing to do", src);
        return Ok(());
    }

    if Arc::ptr_eq(&src_backend, &dest_backend) {
        log::debug!(
            "copy: {} -> {} delegated to {} backend",
            src,
            dest,
            src_backend.name()
        );
        return src_backend.copy_file(&src, &dest);
    }

    log::debug!(
        "copy: {} -> {} across {} and {} backends",
        src,
        dest,
        src_backend.name(),
        dest_backend.name()
    );
    transfer(&src, src_backend.as_ref(), &dest, dest_backend.as_ref())
}

fn transfer(
    src: &RemoteUri,
    src_backend: &dyn Backend,
    dest: &RemoteUri,
    dest_backend: &dyn Backend,
) -> Result<()> {
    let mut reader = src_backend.open_read(src, DEFAULT_BUFFER_SIZE)?;
    let mut writer = match dest_backend.open_write(dest) {
        Ok(writer) => writer,
        Err(err) => return StreamError::combine(Err(err), reader.close()),
    };

    let pumped = pump(reader.as_mut(), writer.as_mut());
    let closed = StreamError::combine(writer.close(), reader.close());
    let copied = StreamError::combine(pumped, closed)?;
    log::debug!("copy: {} bytes transferred to {}", copied, dest);
    Ok(())
}

fn pump(
    reader: &mut dyn FileHandle,
    writer: &mut dyn FileHandle,
) -> Result<u64> {
    let mut copied = 0u64;
    loop {
        let chunk = reader.read(DEFAULT_BUFFER_SIZE)?;
        if chunk.is_empty() {
            return Ok(copied);
        }
        writer.write(&chunk)?;
        copied += chunk.len() as u64;
    }
}
