use serde::{Deserialize, Serialize};

use crate::db::query::Window;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;
/// Highest page whose offset still fits a SQL bigint at the largest limit
const MAX_PAGE: u64 = i64::MAX as u64 / MAX_LIMIT + 1;

/// `page`/`limit` query parameters, 1-indexed
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    page: Option<u64>,
    limit: Option<u64>,
}

impl Pagination {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn window(&self) -> Window {
        Window {
            skip: (self.page() - 1) * self.limit(),
            limit: self.limit(),
        }
    }
}

/// One page of a larger result set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new((data, total): (Vec<T>, u64), pagination: &Pagination) -> Self {
        let limit = pagination.limit();
        Self {
            data,
            page: pagination.page(),
            limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}
