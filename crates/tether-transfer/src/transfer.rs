//! The chunked copy loop.
//!
//! # Invariants
//!
//! 1. `on_start` fires once, before the first byte is read.
//! 2. Exactly one terminal callback fires per call: `on_complete` when the
//!    reader is exhausted, `on_terminate` when the termination flag is seen,
//!    `on_error` when reading, writing or flushing fails.
//! 3. The termination flag is checked before every chunk, so at most one
//!    chunk is copied after it is raised.
//! 4. A listener is notified of progress whenever at least its interval has
//!    passed since its previous notification.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | `Interrupted` read | Retried, not reported |
//! | Other read/write/flush error | `on_error`, then `Err(TransferError::Io)` |

use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, debug_span, trace, warn};

use crate::context::TransferContext;
use crate::listener::SharedListener;

/// Bytes copied per chunk.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// How a transfer ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The reader was exhausted.
    Completed {
        /// Bytes copied.
        bytes: u64,
    },
    /// The termination flag stopped the copy.
    Terminated {
        /// Bytes copied before stopping.
        bytes: u64,
    },
}

impl TransferOutcome {
    /// Bytes copied.
    #[must_use]
    pub fn bytes(self) -> u64 {
        match self {
            Self::Completed { bytes } | Self::Terminated { bytes } => bytes,
        }
    }

    /// Whether the reader was exhausted rather than stopped.
    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// A failed transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Reading, writing or flushing failed.
    #[error("transfer failed after {transferred} bytes: {source}")]
    Io {
        /// Bytes copied before the failure.
        transferred: u64,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    /// Bytes copied before the failure.
    #[must_use]
    pub fn transferred(&self) -> u64 {
        match self {
            Self::Io { transferred, .. } => *transferred,
        }
    }
}

struct Progress<'a> {
    listener: &'a SharedListener,
    interval: u64,
    last_reported: u64,
}

/// Copy `reader` into `writer` in chunks of [`DEFAULT_BUFFER_SIZE`],
/// notifying `listeners` and honoring `terminate`.
pub fn transfer<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    ctx: &TransferContext,
    listeners: &[SharedListener],
    terminate: &AtomicBool,
) -> Result<TransferOutcome, TransferError> {
    transfer_with_buffer(reader, writer, ctx, listeners, terminate, DEFAULT_BUFFER_SIZE)
}

/// [`transfer`] with an explicit chunk size (at least one byte).
pub fn transfer_with_buffer<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    ctx: &TransferContext,
    listeners: &[SharedListener],
    terminate: &AtomicBool,
    buffer_size: usize,
) -> Result<TransferOutcome, TransferError> {
    let _span = debug_span!(
        "transfer",
        direction = ?ctx.direction(),
        file = ctx.file_name(),
        listeners = listeners.len()
    )
    .entered();

    let mut progress: Vec<Progress<'_>> = listeners
        .iter()
        .map(|listener| Progress {
            listener,
            interval: listener.progress_report_interval(),
            last_reported: 0,
        })
        .collect();
    for listener in listeners {
        listener.on_start(ctx);
    }

    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut transferred: u64 = 0;
    loop {
        if terminate.load(Ordering::Acquire) {
            debug!(transferred, "transfer terminated");
            for listener in listeners {
                listener.on_terminate(ctx, transferred);
            }
            return Ok(TransferOutcome::Terminated { bytes: transferred });
        }

        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(fail(ctx, listeners, transferred, err)),
        };
        if let Err(err) = writer.write_all(&buffer[..read]) {
            return Err(fail(ctx, listeners, transferred, err));
        }
        transferred += read as u64;
        trace!(chunk = read, transferred, "chunk copied");

        for entry in &mut progress {
            if entry.interval > 0 && transferred - entry.last_reported >= entry.interval {
                entry.last_reported = transferred;
                entry.listener.on_progress(ctx, transferred, ctx.content_length());
            }
        }
    }

    if let Err(err) = writer.flush() {
        return Err(fail(ctx, listeners, transferred, err));
    }
    debug!(transferred, "transfer complete");
    for listener in listeners {
        listener.on_complete(ctx, transferred);
    }
    Ok(TransferOutcome::Completed { bytes: transferred })
}

fn fail(
    ctx: &TransferContext,
    listeners: &[SharedListener],
    transferred: u64,
    source: io::Error,
) -> TransferError {
    warn!(transferred, error = %source, "transfer failed");
    for listener in listeners {
        listener.on_error(ctx, &source);
    }
    TransferError::Io { transferred, source }
}
