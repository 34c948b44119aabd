//! Renders the income and expense sections of the records page.
//!
//! Each section shows its filter controls and the table of records that pass
//! them. The mutation endpoints re-render both sections as out-of-band swaps
//! after a successful write, so the page always reflects a fresh re-list of
//! the store.

use maud::{Markup, html};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, FORM_TEXT_INPUT_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, format_currency,
    },
    record::{
        Record, RecordType,
        core::format_date_time,
        filter::{SectionFilter, derive_view},
    },
};

/// The filter state of both sections, as parsed from the page query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SectionFilters {
    pub(crate) income: SectionFilter,
    pub(crate) expense: SectionFilter,
}

impl SectionFilters {
    pub(crate) fn get(&self, record_type: RecordType) -> &SectionFilter {
        match record_type {
            RecordType::Income => &self.income,
            RecordType::Expense => &self.expense,
        }
    }
}

/// How many graphemes of a description are shown in the table.
const DESCRIPTION_PREVIEW_LENGTH: usize = 30;

/// Shorten `text` to `max_length` graphemes, appending an ellipsis when
/// something was cut off.
pub(crate) fn truncate_text(text: &str, max_length: usize) -> String {
    let mut graphemes = text.grapheme_indices(true);

    match graphemes.nth(max_length) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_owned(),
    }
}

fn filter_param(record_type: RecordType, suffix: &str) -> String {
    format!("{}_{}", record_type.as_str(), suffix)
}

fn hidden_filter_inputs(record_type: RecordType, filter: &SectionFilter) -> Markup {
    html! {
        input type="hidden" name=(filter_param(record_type, "search")) value=(filter.search);
        input type="hidden" name=(filter_param(record_type, "operator")) value=(filter.amount.operator);
        input type="hidden" name=(filter_param(record_type, "amount")) value=(filter.amount.amount);
        input type="hidden" name=(filter_param(record_type, "start")) value=(filter.start_value());
        input type="hidden" name=(filter_param(record_type, "end")) value=(filter.end_value());
    }
}

fn filter_bar(record_type: RecordType, filters: &SectionFilters) -> Markup {
    let filter = filters.get(record_type);
    let other_type = match record_type {
        RecordType::Income => RecordType::Expense,
        RecordType::Expense => RecordType::Income,
    };
    let add_label = match record_type {
        RecordType::Income => "Add income",
        RecordType::Expense => "Add expense",
    };
    let new_record_url = format!(
        "{}?type={}",
        endpoints::NEW_RECORD_MODAL,
        record_type.as_str()
    );

    html! {
        div class="flex flex-wrap items-end gap-3 mb-4"
        {
            form
                method="get"
                action=(endpoints::RECORDS_VIEW)
                class="flex flex-wrap items-end gap-3"
            {
                // Keep the other section's filters when this form submits.
                (hidden_filter_inputs(other_type, filters.get(other_type)))

                input
                    type="search"
                    name=(filter_param(record_type, "search"))
                    value=(filter.search)
                    placeholder="Search by name or category"
                    class=(FORM_TEXT_INPUT_STYLE)
                    style="max-width: 14rem";

                select
                    name=(filter_param(record_type, "operator"))
                    class=(FORM_TEXT_INPUT_STYLE)
                    style="max-width: 5rem"
                {
                    @for operator in [">", "<", ">=", "<="] {
                        @if operator == filter.amount.operator {
                            option value=(operator) selected { (operator) }
                        } @else {
                            option value=(operator) { (operator) }
                        }
                    }
                }

                input
                    type="number"
                    step="0.01"
                    name=(filter_param(record_type, "amount"))
                    value=(filter.amount.amount)
                    placeholder="Amount"
                    class=(FORM_TEXT_INPUT_STYLE)
                    style="max-width: 8rem";

                input
                    type="datetime-local"
                    name=(filter_param(record_type, "start"))
                    value=(filter.start_value())
                    class=(FORM_TEXT_INPUT_STYLE)
                    style="max-width: 14rem";

                input
                    type="datetime-local"
                    name=(filter_param(record_type, "end"))
                    value=(filter.end_value())
                    class=(FORM_TEXT_INPUT_STYLE)
                    style="max-width: 14rem";

                button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Apply" }
            }

            button
                type="button"
                hx-get=(new_record_url)
                hx-target="#modal-container"
                hx-swap="outerHTML"
                class=(BUTTON_PRIMARY_STYLE)
            {
                (add_label)
            }
        }
    }
}

fn record_row(record: &Record) -> Markup {
    let edit_url =
        endpoints::format_edit_record_endpoint(record.record_type.as_str(), record.id);

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (record.name) }
            td class=(TABLE_CELL_STYLE) { (record.category) }
            td class=(TABLE_CELL_STYLE) { (format_currency(record.amount)) }
            td class=(TABLE_CELL_STYLE) { (format_date_time(record.date_time).replace('T', " ")) }
            td class=(TABLE_CELL_STYLE) title=(record.description)
            {
                (truncate_text(&record.description, DESCRIPTION_PREVIEW_LENGTH))
            }
            td class=(TABLE_CELL_STYLE)
            {
                button
                    type="button"
                    hx-get=(edit_url)
                    hx-target="#modal-container"
                    hx-swap="outerHTML"
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "Edit"
                }
            }
        }
    }
}

fn records_table(view: &[&Record]) -> Markup {
    html! {
        table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th class=(TABLE_CELL_STYLE) { "Name" }
                    th class=(TABLE_CELL_STYLE) { "Category" }
                    th class=(TABLE_CELL_STYLE) { "Amount" }
                    th class=(TABLE_CELL_STYLE) { "Date and time" }
                    th class=(TABLE_CELL_STYLE) { "Description" }
                    th class=(TABLE_CELL_STYLE) {}
                }
            }

            tbody
            {
                @if view.is_empty() {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td class=(TABLE_CELL_STYLE) colspan="6" { "No records found." }
                    }
                } @else {
                    @for record in view {
                        (record_row(record))
                    }
                }
            }
        }
    }
}

/// Render one section: heading, filter bar, and the filtered table.
///
/// With `oob` set the section carries an `hx-swap-oob` attribute so it
/// replaces its counterpart on the page from a mutation response.
pub(crate) fn records_section(
    record_type: RecordType,
    records: &[Record],
    filters: &SectionFilters,
    oob: bool,
) -> Markup {
    let view = derive_view(records, record_type, filters.get(record_type));
    let section_id = format!("{}-section", record_type.as_str());

    html! {
        section id=(section_id) hx-swap-oob=[oob.then_some("true")] class="mb-10"
        {
            h3 class="text-lg font-semibold mb-3 text-gray-900 dark:text-white"
            {
                (record_type.section_title())
            }

            (filter_bar(record_type, filters))
            (records_table(&view))
        }
    }
}

/// Both sections as out-of-band swaps, for mutation responses.
pub(crate) fn records_sections_oob(records: &[Record], filters: &SectionFilters) -> Markup {
    html! {
        @for record_type in RecordType::ALL {
            (records_section(record_type, records, filters, true))
        }
    }
}

#[cfg(test)]
mod truncate_text_tests {
    use super::truncate_text;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(truncate_text("weekly shop", 30), "weekly shop");
    }

    #[test]
    fn long_text_is_cut_with_an_ellipsis() {
        let text = "a very long description that goes on and on";

        let truncated = truncate_text(text, 10);

        assert_eq!(truncated, "a very lon...");
    }

    #[test]
    fn exact_length_text_is_unchanged() {
        assert_eq!(truncate_text("0123456789", 10), "0123456789");
    }

    #[test]
    fn truncation_respects_grapheme_boundaries() {
        let text = "café au lait réservé für später";

        let truncated = truncate_text(text, 8);

        assert_eq!(truncated, "café au ...");
    }
}
