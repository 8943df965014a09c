#![forbid(unsafe_code)]

//! Byte transfers with progress reporting.
//!
//! [`transfer`] copies a reader into a writer chunk by chunk and drives the
//! [`TransferProgressListener`] protocol: one start, periodic progress, and
//! exactly one of complete, terminate or error. Termination is cooperative
//! through an [`AtomicBool`](std::sync::atomic::AtomicBool) that another
//! thread may raise at any time.
//!
//! [`TransferProgressHandlers`] builds listener lists from closures and
//! [`InMemoryUploadHandler`] buffers an upload for a success callback.

pub mod context;
pub mod listener;
pub mod transfer;
pub mod upload;

pub use context::{Direction, TransferContext};
pub use listener::{
    DEFAULT_PROGRESS_REPORT_INTERVAL, ListenerKey, SharedListener, TransferProgressHandlers,
    TransferProgressListener,
};
pub use transfer::{
    DEFAULT_BUFFER_SIZE, TransferError, TransferOutcome, transfer, transfer_with_buffer,
};
pub use upload::{InMemoryUploadHandler, MAX_PREALLOCATION, UploadMetadata};
