use serde::Serialize;

/// One page of a batched Ultralight write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWrite {
    /// Page number, 4 or above
    pub page: u8,
    /// Page contents
    pub data: [u8; 4],
}

impl PageWrite {
    /// Write `data` to `page`
    pub const fn new(page: u8, data: [u8; 4]) -> Self {
        Self { page, data }
    }
}

/// Outcome of one page of a batched write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageWriteResult {
    /// Page number
    pub page: u8,
    /// Whether any method wrote the page
    pub success: bool,
    /// Why the page was not written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageWriteResult {
    pub(crate) const fn written(page: u8) -> Self {
        Self {
            page,
            success: true,
            error: None,
        }
    }

    pub(crate) fn failed(page: u8, error: impl std::fmt::Display) -> Self {
        Self {
            page,
            success: false,
            error: Some(error.to_string()),
        }
    }
}
