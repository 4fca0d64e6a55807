use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("PDF inspection error: {0}")]
    Inspect(#[from] lopdf::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Plan has no {0} page")]
    MissingPage(kdp_layout::PageKind),
}

pub type Result<T> = std::result::Result<T, AssembleError>;

/// Resolved content for one plan page. Either part may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub text: Option<String>,
    /// Encoded image (PNG, JPEG, ...)
    pub image: Option<Vec<u8>>,
}

impl PageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.image = Some(bytes);
        self
    }
}

/// Page index -> content
pub type ContentMap = BTreeMap<u32, PageContent>;
