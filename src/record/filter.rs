//! The pure filter pipeline that derives the income and expense views.
//!
//! Each section of the records page has independent filter state: a free-text
//! search over name and category, an amount comparison, and a date range. The
//! functions here are referentially transparent; the page and the mutation
//! endpoints feed them the full record list and render whatever comes back.

use time::PrimitiveDateTime;

use crate::record::{
    Record, RecordType,
    core::{format_date_time, parse_date_time},
};

/// The amount comparison applied to a section, e.g. `> 500`.
///
/// The operator is kept as the raw string from the filter control. An empty
/// `amount` means "no filter". An operator string outside `>`, `<`, `>=` and
/// `<=` passes every record through unfiltered: unknown operators fail open,
/// and [filter_by_amount] pins that policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountFilter {
    /// One of `>`, `<`, `>=`, `<=`.
    pub operator: String,
    /// The threshold as entered, or an empty string for "no filter".
    pub amount: String,
}

impl Default for AmountFilter {
    fn default() -> Self {
        Self {
            operator: ">".to_owned(),
            amount: String::new(),
        }
    }
}

/// The inclusive date range applied to a section. Unset bounds do not filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateFilter {
    /// Records strictly before this instant are excluded.
    pub start: Option<PrimitiveDateTime>,
    /// Records strictly after this instant are excluded.
    pub end: Option<PrimitiveDateTime>,
}

/// The complete filter state for one section (income or expenses).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionFilter {
    /// Case-insensitive substring matched against record names and categories.
    pub search: String,
    /// The amount comparison for this section.
    pub amount: AmountFilter,
    /// The date range for this section.
    pub date: DateFilter,
}

impl SectionFilter {
    /// Build a section filter from raw query-string values.
    ///
    /// Date strings that fail to parse are treated as unset, which matches a
    /// browser clearing an invalid `datetime-local` input.
    pub fn from_raw(
        search: Option<String>,
        operator: Option<String>,
        amount: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> Self {
        let parse_bound = |raw: Option<String>| {
            raw.as_deref()
                .filter(|value| !value.trim().is_empty())
                .and_then(|value| parse_date_time(value).ok())
        };

        Self {
            search: search.unwrap_or_default(),
            amount: AmountFilter {
                operator: operator.unwrap_or_else(|| ">".to_owned()),
                amount: amount.unwrap_or_default(),
            },
            date: DateFilter {
                start: parse_bound(start),
                end: parse_bound(end),
            },
        }
    }

    /// The start bound formatted for a `datetime-local` input, or empty.
    pub fn start_value(&self) -> String {
        self.date.start.map(format_date_time).unwrap_or_default()
    }

    /// The end bound formatted for a `datetime-local` input, or empty.
    pub fn end_value(&self) -> String {
        self.date.end.map(format_date_time).unwrap_or_default()
    }
}

/// True if `query`, lower-cased, is a substring of the record's name or
/// category, each lower-cased. An empty query matches everything.
pub fn matches_search(record: &Record, query: &str) -> bool {
    let query = query.to_lowercase();

    record.name.to_lowercase().contains(&query)
        || record.category.to_lowercase().contains(&query)
}

/// Keep the records that satisfy the amount comparison.
///
/// An empty threshold is an explicit "no filter" sentinel and returns the
/// records unchanged. A non-empty threshold that does not parse as a number
/// excludes every record, the way a comparison against NaN is always false.
pub fn filter_by_amount<'a>(records: Vec<&'a Record>, filter: &AmountFilter) -> Vec<&'a Record> {
    let threshold_text = filter.amount.trim();
    if threshold_text.is_empty() {
        return records;
    }

    let Ok(threshold) = threshold_text.parse::<f64>() else {
        return Vec::new();
    };

    records
        .into_iter()
        .filter(|record| compare_amount(record.amount, &filter.operator, threshold))
        .collect()
}

fn compare_amount(amount: f64, operator: &str, threshold: f64) -> bool {
    match operator {
        ">" => amount > threshold,
        "<" => amount < threshold,
        ">=" => amount >= threshold,
        "<=" => amount <= threshold,
        // Unknown operators admit every record (fail open).
        _ => true,
    }
}

/// Keep the records whose `date_time` falls within the given bounds.
///
/// Records strictly before `start` or strictly after `end` are excluded when
/// the respective bound is set. With both bounds unset this is the identity.
/// The comparison uses the full timestamp, not just the date, so a range with
/// `start == end` keeps exactly the records on that instant.
pub fn filter_by_date<'a>(
    records: Vec<&'a Record>,
    start: Option<PrimitiveDateTime>,
    end: Option<PrimitiveDateTime>,
) -> Vec<&'a Record> {
    if start.is_none() && end.is_none() {
        return records;
    }

    records
        .into_iter()
        .filter(|record| {
            if let Some(start) = start
                && record.date_time < start
            {
                return false;
            }

            if let Some(end) = end
                && record.date_time > end
            {
                return false;
            }

            true
        })
        .collect()
}

/// Derive the view for one section: the records of `record_type` that pass
/// the search, amount, and date predicates.
///
/// The predicates are independent, so the result is their intersection; the
/// application order is just the cheapest-first arrangement.
pub fn derive_view<'a>(
    records: &'a [Record],
    record_type: RecordType,
    filter: &SectionFilter,
) -> Vec<&'a Record> {
    let matching_type = records
        .iter()
        .filter(|record| record.record_type == record_type)
        .filter(|record| matches_search(record, &filter.search))
        .collect();

    let matching_amount = filter_by_amount(matching_type, &filter.amount);

    filter_by_date(matching_amount, filter.date.start, filter.date.end)
}
