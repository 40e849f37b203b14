use serde::{Deserialize, Serialize};

use super::{
    error::{Error, HtmlError},
    form::Form,
};
use crate::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE, MAX_PAGE_LIMIT};

/// `?page=N&limit=M`, with pages counted from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT)
    }
}

impl TryFrom<&Form> for PageRequest {
    type Error = Error;

    fn try_from(form: &Form) -> Result<Self, Self::Error> {
        let page = form.get_optional_number("page")?.unwrap_or(1);
        let limit = form
            .get_optional_number("limit")?
            .unwrap_or(DEFAULT_PAGE_LIMIT);

        Ok(Self::new(page, limit))
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wraps one page of `rows`. An empty page past the first is out of
    /// range and fails with 404, so `count` is never reported as 0 for a
    /// non-empty listing.
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Result<Self, Error> {
        if rows.is_empty() {
            if request.page > 1 {
                return Err(HtmlError::NotFound.new("Invalid page"));
            }
            return Ok(Self::no_rows(total_rows));
        }

        let next = if request.offset() + request.limit < total_rows {
            Some(request.page + 1)
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(request.page - 1)
        } else {
            None
        };

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }

    pub fn no_rows(total_rows: i64) -> Self {
        Self {
            count: total_rows,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}
