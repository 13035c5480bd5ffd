//! Page request and page envelope for paginated reads.
//!
//! # Invariants
//! - `PageRequest::size` is never zero after normalization.
//! - `Page` metadata describes the primary (non-joined) fetch only.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    /// Builds a request with size normalized against the default bounds.
    pub fn new(page: u32, size: u32) -> Self {
        Self::bounded(page, size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    /// Builds a request with size normalized against explicit bounds.
    ///
    /// `0` maps to `default_size`; values above `max_size` clamp to it.
    pub fn bounded(page: u32, size: u32, default_size: u32, max_size: u32) -> Self {
        let size = match size {
            0 => default_size,
            value if value > max_size => max_size,
            value => value,
        };
        Self { page, size }
    }

    /// Row offset of the first element on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of content plus the metadata of the query that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(u64::from(self.size))
    }

    /// Replaces content while keeping every metadata field verbatim.
    pub fn with_content<U>(self, content: Vec<U>) -> Page<U> {
        Page {
            content,
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}
