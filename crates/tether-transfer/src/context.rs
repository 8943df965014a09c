//! Metadata describing one transfer.

/// Direction of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client to server.
    Upload,
    /// Server to client.
    Download,
}

/// What listeners know about the transfer they observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferContext {
    direction: Direction,
    file_name: Option<String>,
    content_type: Option<String>,
    content_length: Option<u64>,
}

impl TransferContext {
    /// An upload of unknown name, type and length.
    #[must_use]
    pub fn upload() -> Self {
        Self::new(Direction::Upload)
    }

    /// A download of unknown name, type and length.
    #[must_use]
    pub fn download() -> Self {
        Self::new(Direction::Download)
    }

    fn new(direction: Direction) -> Self {
        Self {
            direction,
            file_name: None,
            content_type: None,
            content_length: None,
        }
    }

    /// Name of the file being transferred.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// MIME type of the payload.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Announced payload size in bytes.
    #[must_use]
    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// Whether bytes flow in or out.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The file name, if set.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// The MIME type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Total bytes expected; `None` when the sender did not announce it.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}
