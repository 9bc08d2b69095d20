//! Pagination parameters for list endpoints.

use serde::{Deserialize, Serialize};

/// Page selection shared across list endpoints.
///
/// - `per_page`: 1–100, default 25
/// - `page`: ≥ 1, default 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_per_page", rename = "per-page")]
    pub per_page: u32,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_per_page() -> u32 {
    25
}

fn default_page() -> u32 {
    1
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            page: default_page(),
        }
    }
}

impl PageRequest {
    /// Clamp `per_page` to 1–100 and `page` to ≥ 1.
    pub fn clamped(self) -> Self {
        Self {
            per_page: self.per_page.clamp(1, 100),
            page: self.page.max(1),
        }
    }

    /// Row offset of the first item on the (clamped) page.
    pub fn offset(self) -> u64 {
        let PageRequest { per_page, page } = self.clamped();
        u64::from(page - 1) * u64::from(per_page)
    }

    /// Maximum number of rows on the (clamped) page.
    pub fn limit(self) -> u64 {
        u64::from(self.clamped().per_page)
    }
}
