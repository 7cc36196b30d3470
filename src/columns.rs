//! Header resolution: maps noisy cashier-export column names onto the
//! semantic fields the pipeline needs.
//!
//! Matching runs in three passes of decreasing strictness, and within each
//! pass the keyword list order is the priority order (first hit wins):
//!
//! 1. exact match after case-folding and trimming,
//! 2. exact match after stripping spaces and underscores,
//! 3. the normalized keyword contained in the normalized header.

use crate::config::KeywordTable;
use crate::error::{Result, SegmentationError};

pub const FIELD_PICKUP_DATE: &str = "pickup-date";
pub const FIELD_CUSTOMER: &str = "customer-name";
pub const FIELD_TOTAL_PRICE: &str = "total-price";

/// Raw header names resolved for each semantic field. Required fields are
/// plain `String`s; optional fields degrade gracefully downstream.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub pickup_date: String,
    pub customer: String,
    pub total_price: String,
    pub invoice: Option<String>,
    pub status: Option<String>,
    pub order_date: Option<String>,
}

impl ColumnMap {
    /// Resolve every semantic field against the raw headers, failing with
    /// [`SegmentationError::MissingColumn`] on the first unresolved
    /// required field.
    pub fn resolve(headers: &[String], keywords: &KeywordTable) -> Result<ColumnMap> {
        let required = |keys: &[String], field: &'static str| {
            find_column(headers, keys).ok_or(SegmentationError::MissingColumn(field))
        };

        Ok(ColumnMap {
            pickup_date: required(&keywords.pickup_date, FIELD_PICKUP_DATE)?,
            customer: required(&keywords.customer, FIELD_CUSTOMER)?,
            total_price: required(&keywords.total_price, FIELD_TOTAL_PRICE)?,
            invoice: find_column(headers, &keywords.invoice),
            status: find_column(headers, &keywords.status),
            order_date: find_column(headers, &keywords.order_date),
        })
    }
}

/// Strip the variation we tolerate in header spellings.
fn normalize(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace([' ', '_'], "")
}

/// Find the best-matching header for one keyword priority list, or `None`.
pub fn find_column(headers: &[String], keywords: &[String]) -> Option<String> {
    // Pass 1: exact match, case-folded and trimmed.
    for keyword in keywords {
        let keyword_folded = keyword.trim().to_lowercase();
        for header in headers {
            if header.trim().to_lowercase() == keyword_folded {
                return Some(header.clone());
            }
        }
    }

    // Pass 2: exact match with spaces and underscores stripped.
    for keyword in keywords {
        let keyword_clean = normalize(keyword);
        for header in headers {
            if normalize(header) == keyword_clean {
                return Some(header.clone());
            }
        }
    }

    // Pass 3: normalized keyword contained in the normalized header.
    for keyword in keywords {
        let keyword_clean = normalize(keyword);
        for header in headers {
            if normalize(header).contains(&keyword_clean) {
                return Some(header.clone());
            }
        }
    }

    None
}
