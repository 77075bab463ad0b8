//! Offset pagination helpers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PAGE_LIMIT: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("limit must not be negative (got {0})")]
    NegativeLimit(i64),
    #[error("offset must not be negative (got {0})")]
    NegativeOffset(i64),
}

/// Raw pagination input as supplied by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Validate into a window. A zero limit means "use the default".
    pub fn validate(self) -> Result<PageWindow, PaginationError> {
        if self.limit < 0 {
            return Err(PaginationError::NegativeLimit(self.limit));
        }
        if self.offset < 0 {
            return Err(PaginationError::NegativeOffset(self.offset));
        }

        let limit = if self.limit == 0 {
            DEFAULT_PAGE_LIMIT
        } else {
            usize::try_from(self.limit).unwrap_or(usize::MAX)
        };
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);

        Ok(PageWindow { limit, offset })
    }
}

/// A validated, non-negative pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub limit: usize,
    pub offset: usize,
}

impl PageWindow {
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset.min(items.len());
        let end = start.saturating_add(self.limit).min(items.len());
        &items[start..end]
    }
}

/// One window of a listing together with the size of the whole result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OffsetPage<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

impl<T> OffsetPage<T> {
    pub fn new(items: Vec<T>, total: u64, window: PageWindow) -> Self {
        Self {
            items,
            total,
            limit: window.limit,
            offset: window.offset,
        }
    }

    pub fn has_more(&self) -> bool {
        (self.offset as u64).saturating_add(self.items.len() as u64) < self.total
    }
}
