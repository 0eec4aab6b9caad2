//! Cancellable bounded-buffer byte copy.
//!
//! Used for streaming request bodies into storage and storage bytes back to
//! clients without ever holding a whole file in memory.

use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Default chunk size for streaming copies.
pub const COPY_BUF_LEN: usize = 64 * 1024;

/// Copy `reader` to `writer` in `buf_len`-sized chunks, checking the
/// cancellation token between chunks. Returns the number of bytes copied.
///
/// The writer is flushed but not shut down; the caller decides whether the
/// destination is finalised (e.g. renamed into place).
pub async fn copy_cancellable<R, W>(
  reader: &mut R,
  writer: &mut W,
  buf_len: usize,
  cancel: &CancellationToken,
) -> Result<u64>
where
  R: AsyncRead + Unpin + ?Sized,
  W: AsyncWrite + Unpin + ?Sized,
{
  let mut buf = vec![0u8; buf_len];
  let mut copied: u64 = 0;

  loop {
    if cancel.is_cancelled() {
      return Err(Error::Cancelled("stream copy".into()));
    }
    let n = reader
      .read(&mut buf)
      .await
      .map_err(|e| Error::Io(format!("stream copy read: {e}")))?;
    if n == 0 {
      break;
    }
    writer
      .write_all(&buf[..n])
      .await
      .map_err(|e| Error::Io(format!("stream copy write: {e}")))?;
    copied += n as u64;
  }

  writer
    .flush()
    .await
    .map_err(|e| Error::Io(format!("stream copy flush: {e}")))?;
  Ok(copied)
}
