//! Boundary between the selection store and the grid / bulk-select controls.
//!
//! The grid only ever knows "checked on the visible page". What it shows as
//! checked is derived here from the store on every render rather than kept
//! in the widget.

use std::num::NonZeroUsize;

use tracing::debug;

use crate::error::InvalidInputError;
use crate::fetcher::{PageFetcher, Record};
use crate::selection::{BulkSelectReport, SelectionStore};

/// One visible row with its derived checked state.
#[derive(Debug, Clone)]
pub struct GridRow<R> {
    pub record: R,
    pub checked: bool,
}

/// Everything the grid needs for one render, read under a single lock.
#[derive(Debug, Clone)]
pub struct GridSnapshot<R> {
    pub rows: Vec<GridRow<R>>,
    pub paginator: Paginator,
    pub selected_total: usize,
}

impl<R: Record> GridSnapshot<R> {
    /// The rows to hand the widget as its page-level selection.
    pub fn checked_rows(&self) -> Vec<R> {
        self.rows
            .iter()
            .filter(|row| row.checked)
            .map(|row| row.record.clone())
            .collect()
    }
}

impl<F: PageFetcher> SelectionStore<F> {
    /// Rows of the current page with checked state taken from the selection.
    pub fn grid_snapshot(&self) -> GridSnapshot<F::Record> {
        let rows_per_page = self.page_size();
        let state = self.state();
        let (page_index, rows) = match state.view.as_ref() {
            Some(view) => (
                view.page_index,
                view.records
                    .iter()
                    .map(|record| GridRow {
                        checked: state.selection.contains(&record.id()),
                        record: record.clone(),
                    })
                    .collect(),
            ),
            None => (1, Vec::new()),
        };

        GridSnapshot {
            rows,
            paginator: Paginator::new(rows_per_page, page_index, state.total_records),
            selected_total: state.selection.len(),
        }
    }

    /// Derived checked set for the visible page, in page order.
    pub fn checked_rows(&self) -> Vec<F::Record> {
        self.grid_snapshot().checked_rows()
    }
}

/// Pagination control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub rows: usize,
    /// 1-based.
    pub page_index: usize,
    pub total_records: usize,
}

impl Paginator {
    pub fn new(rows: usize, page_index: usize, total_records: usize) -> Self {
        Self {
            rows: rows.max(1),
            page_index: page_index.max(1),
            total_records,
        }
    }

    /// Offset of the first visible row.
    pub fn first(&self) -> usize {
        (self.page_index - 1).saturating_mul(self.rows)
    }

    pub fn total_pages(&self) -> usize {
        self.total_records.div_ceil(self.rows)
    }

    pub fn has_next(&self) -> bool {
        self.page_index < self.total_pages()
    }

    /// Page after this one, if the dataset has one.
    pub fn next_page(&self) -> Option<usize> {
        if self.has_next() {
            self.page_index.checked_add(1)
        } else {
            None
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page_index > 1
    }

    /// The widget reports pages 0-based; the fetcher wants 1-based.
    pub fn page_from_event(zero_based: usize) -> usize {
        zero_based + 1
    }
}

/// Parse the bulk-select text box.
///
/// Leading whitespace and a sign are allowed, then digits; anything after
/// the digits is ignored (`"12 rows"` is 12).
pub fn parse_select_count(input: &str) -> Result<NonZeroUsize, InvalidInputError> {
    let trimmed = input.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..end];
    if digits.is_empty() {
        return Err(InvalidInputError::NotNumeric(input.to_string()));
    }

    // only overflow can fail here
    let magnitude: i64 = digits.parse().unwrap_or(i64::MAX);
    let value = if negative { -magnitude } else { magnitude };
    if value <= 0 {
        return Err(InvalidInputError::NotPositive(value));
    }

    let count = usize::try_from(value).unwrap_or(usize::MAX);
    NonZeroUsize::new(count).ok_or(InvalidInputError::NotPositive(value))
}

/// Validate the text box and run the bulk select.
///
/// Invalid input never reaches the store and is not reported to the user.
pub async fn submit_select_count<F: PageFetcher>(
    store: &SelectionStore<F>,
    input: &str,
) -> Option<BulkSelectReport> {
    match parse_select_count(input) {
        Ok(count) => Some(store.select_first_n(count.get()).await),
        Err(e) => {
            debug!("Ignoring bulk-select input: {}", e);
            None
        }
    }
}
