//! Upload handler collecting the whole payload in memory.

use std::io::Read;
use std::sync::atomic::AtomicBool;

use tracing::debug;

use crate::context::TransferContext;
use crate::listener::TransferProgressHandlers;
use crate::transfer::{DEFAULT_BUFFER_SIZE, TransferError, TransferOutcome, transfer};

/// Largest buffer reserved up front from a declared content length.
pub const MAX_PREALLOCATION: usize = DEFAULT_BUFFER_SIZE * 16;

/// Describes a finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    /// File name announced by the sender.
    pub file_name: Option<String>,
    /// MIME type announced by the sender.
    pub content_type: Option<String>,
    /// Bytes actually received.
    pub content_length: u64,
}

type SuccessFn = Box<dyn Fn(UploadMetadata, Vec<u8>) + Send + Sync>;

/// Buffers an upload and hands the bytes to a callback once it completes.
///
/// Terminated or failed uploads never reach the callback.
///
/// ```
/// use std::sync::atomic::AtomicBool;
/// use std::sync::{Arc, Mutex};
/// use tether_transfer::{InMemoryUploadHandler, TransferContext};
///
/// let received = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&received);
/// let handler = InMemoryUploadHandler::new(move |meta, bytes| {
///     assert_eq!(meta.file_name.as_deref(), Some("notes.txt"));
///     *sink.lock().unwrap() = bytes;
/// });
///
/// let ctx = TransferContext::upload().with_file_name("notes.txt");
/// handler.handle(&mut &b"hello"[..], &ctx, &AtomicBool::new(false)).unwrap();
/// assert_eq!(*received.lock().unwrap(), b"hello");
/// ```
pub struct InMemoryUploadHandler {
    on_success: SuccessFn,
    handlers: TransferProgressHandlers,
}

impl InMemoryUploadHandler {
    /// A handler passing each completed upload to `on_success`.
    pub fn new(on_success: impl Fn(UploadMetadata, Vec<u8>) + Send + Sync + 'static) -> Self {
        Self {
            on_success: Box::new(on_success),
            handlers: TransferProgressHandlers::new(),
        }
    }

    /// Replace the progress listeners notified while receiving.
    #[must_use]
    pub fn with_progress(mut self, handlers: TransferProgressHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Progress listeners, for adding or removing entries.
    pub fn progress_mut(&mut self) -> &mut TransferProgressHandlers {
        &mut self.handlers
    }

    /// Receive `reader` to its end, or until `terminate` is raised.
    ///
    /// The declared content length only sizes the initial buffer, up to
    /// [`MAX_PREALLOCATION`].
    pub fn handle<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        ctx: &TransferContext,
        terminate: &AtomicBool,
    ) -> Result<TransferOutcome, TransferError> {
        let capacity = ctx
            .content_length()
            .map_or(0, |length| usize::try_from(length).unwrap_or(usize::MAX))
            .min(MAX_PREALLOCATION);
        let mut data = Vec::with_capacity(capacity);
        let outcome = transfer(reader, &mut data, ctx, &self.handlers.listeners(), terminate)?;
        if let TransferOutcome::Completed { bytes } = outcome {
            debug!(bytes, file = ctx.file_name(), "upload received in memory");
            let metadata = UploadMetadata {
                file_name: ctx.file_name().map(str::to_owned),
                content_type: ctx.content_type().map(str::to_owned),
                content_length: bytes,
            };
            (self.on_success)(metadata, data);
        }
        Ok(outcome)
    }
}

impl std::fmt::Debug for InMemoryUploadHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryUploadHandler")
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn collecting() -> (InMemoryUploadHandler, Arc<Mutex<Option<(UploadMetadata, Vec<u8>)>>>) {
        let received = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&received);
        let handler = InMemoryUploadHandler::new(move |meta, bytes| {
            *sink.lock().unwrap() = Some((meta, bytes));
        });
        (handler, received)
    }

    #[test]
    fn declared_length_does_not_size_the_buffer_beyond_the_cap() {
        let (handler, received) = collecting();
        let ctx = TransferContext::upload()
            .with_file_name("tiny.bin")
            .with_content_length(u64::MAX);
        let outcome = handler
            .handle(&mut &b"hello"[..], &ctx, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(outcome, TransferOutcome::Completed { bytes: 5 });

        let (meta, bytes) = received.lock().unwrap().take().unwrap();
        assert_eq!(bytes, b"hello");
        assert!(bytes.capacity() <= MAX_PREALLOCATION);
        assert_eq!(meta.content_length, 5);
    }
}
