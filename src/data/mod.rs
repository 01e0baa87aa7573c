use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    app::{ServiceError, ServiceResult},
    store::Row,
};

pub mod assets;
pub mod news;
pub mod players;
pub mod profiles;

/// One page of a client-side paginated result set.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Slice a fully materialized result set into one page. Pages are 1-based;
/// an out-of-range page yields an empty item list with the true total.
pub(crate) fn paginate<T>(rows: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let total_count = rows.len();
    let total_pages = if page_size > 0 {
        (total_count + page_size - 1) / page_size
    } else {
        1
    };
    let page = page.max(1);
    let from = (page - 1).saturating_mul(page_size).min(total_count);
    let to = from.saturating_add(page_size).min(total_count);
    let items = rows
        .into_iter()
        .skip(from)
        .take(to - from)
        .collect();
    Page {
        items,
        total_count,
        page,
        page_size,
        total_pages,
    }
}

pub(crate) fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> ServiceResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row))
                .map_err(|err| ServiceError::Internal(format!("malformed row: {}", err)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_slices() {
        let rows: Vec<u32> = (1..=25).collect();
        let page1 = paginate(rows.clone(), 1, 10);
        assert_eq!(page1.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(page1.total_count, 25);
        assert_eq!(page1.total_pages, 3);

        let page3 = paginate(rows.clone(), 3, 10);
        assert_eq!(page3.items, (21..=25).collect::<Vec<_>>());

        let page4 = paginate(rows, 4, 10);
        assert!(page4.items.is_empty());
        assert_eq!(page4.total_count, 25);
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::<u32>::new(), 1, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
    }
}
