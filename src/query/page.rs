//! Page number / page size to OFFSET / LIMIT.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub page_num: i64,
    #[serde(default)]
    pub page_size: i64,
}

impl Page {
    pub fn new(page_num: i64, page_size: i64) -> Self {
        Page { page_num, page_size }
    }

    /// 1-based page number and positive size. Invalid pages disable pagination.
    pub fn is_valid(&self) -> bool {
        self.page_num > 0 && self.page_size > 0
    }

    pub fn offset(&self) -> i64 {
        if !self.is_valid() {
            return 0;
        }
        (self.page_num - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        if !self.is_valid() {
            return 0;
        }
        self.page_size
    }
}
