//! The draft state behind the record modal form.
//!
//! A draft is the working copy bound to the modal: created when the modal
//! opens, carried through field edits, and converted to the persistable
//! payload on submit. A draft with an id edits an existing record; without
//! one it creates a new record. The record's type is fixed when the modal
//! opens and the form offers no way to change it.

use maud::{Markup, html};

use crate::{
    Error,
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
    record::{
        Record, RecordType,
        catalog::categories_for,
        core::{RecordId, RecordPayload, format_date_time},
    },
    user::UserID,
};

/// The editable working copy of a record bound to the modal form.
///
/// Free-form fields hold the raw input text so the draft can faithfully carry
/// whatever is currently in the form controls.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    /// The record being edited, or `None` when creating.
    pub id: Option<RecordId>,
    /// Fixed for the lifetime of the draft.
    pub record_type: RecordType,
    /// The display label as typed.
    pub name: String,
    /// The category chosen from the catalog, or empty.
    pub category: String,
    /// The amount as typed into the number input.
    pub amount: String,
    /// The free-form description.
    pub description: String,
    /// The `YYYY-MM-DDTHH:MM` value of the `datetime-local` input.
    pub date_time: String,
}

/// A single field replacement applied to a draft.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftField {
    /// Replace the name.
    Name(String),
    /// Replace the category.
    Category(String),
    /// Replace the amount text.
    Amount(String),
    /// Replace the description.
    Description(String),
    /// Replace the date-time text.
    DateTime(String),
}

impl RecordDraft {
    /// An empty draft for creating a record of `record_type`.
    pub fn for_create(record_type: RecordType) -> Self {
        Self {
            id: None,
            record_type,
            name: String::new(),
            category: String::new(),
            amount: String::new(),
            description: String::new(),
            date_time: String::new(),
        }
    }

    /// A draft populated from an existing record.
    ///
    /// The stored timestamp is rendered with the same wall-clock fields it
    /// was saved with; there is no timezone conversion between storage and
    /// display.
    pub fn for_edit(record: &Record) -> Self {
        Self {
            id: Some(record.id),
            record_type: record.record_type,
            name: record.name.clone(),
            category: record.category.clone(),
            amount: format_amount(record.amount),
            description: record.description.clone(),
            date_time: format_date_time(record.date_time),
        }
    }

    /// Rebuild the draft from a submitted payload, e.g. to re-render the
    /// modal with the user's input after a failed submission.
    pub fn from_payload(payload: &RecordPayload) -> Self {
        Self {
            id: payload.id,
            record_type: payload.record_type,
            name: payload.name.clone(),
            category: payload.category.clone(),
            amount: format_amount(payload.amount),
            description: payload.description.clone(),
            date_time: payload.date_time.clone(),
        }
    }

    /// A copy of the draft with exactly one field replaced.
    pub fn with_field(self, field: DraftField) -> Self {
        match field {
            DraftField::Name(name) => Self { name, ..self },
            DraftField::Category(category) => Self { category, ..self },
            DraftField::Amount(amount) => Self { amount, ..self },
            DraftField::Description(description) => Self {
                description,
                ..self
            },
            DraftField::DateTime(date_time) => Self { date_time, ..self },
        }
    }

    /// Convert the draft into the payload sent to the create and update
    /// endpoints, merging in the owning user.
    ///
    /// This performs no business-rule validation; the store checks names and
    /// categories at write time. Only the amount is parsed, since the payload
    /// carries it as a number.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidAmount] if the amount text is not a number.
    pub fn into_payload(self, user_id: UserID) -> Result<RecordPayload, Error> {
        let amount = self
            .amount
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidAmount(self.amount.clone()))?;

        Ok(RecordPayload {
            id: self.id,
            user_id,
            record_type: self.record_type,
            name: self.name,
            category: self.category,
            amount,
            description: self.description,
            date_time: self.date_time,
        })
    }
}

/// Format an amount for a number input: whole values without a decimal tail.
fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        amount.to_string()
    }
}

/// The form controls of the record modal, pre-filled from `draft`.
///
/// Field names follow the wire contract so the same handler serves the HTMX
/// form and JSON clients. Validation here is the browser's required-field
/// mechanism; the server re-checks on write.
pub fn record_form_fields(draft: &RecordDraft) -> Markup {
    html! {
        div
        {
            label for="record-name" class=(FORM_LABEL_STYLE) { "Name" }

            input
                name="name"
                id="record-name"
                type="text"
                value=(draft.name)
                required
                autofocus
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="record-category" class=(FORM_LABEL_STYLE) { "Category" }

            select
                name="category"
                id="record-category"
                required
                class=(FORM_TEXT_INPUT_STYLE)
            {
                option value="" { "Select a category" }

                @for category in categories_for(draft.record_type) {
                    @if *category == draft.category {
                        option value=(category) selected { (category) }
                    } @else {
                        option value=(category) { (category) }
                    }
                }
            }
        }

        div
        {
            label for="record-amount" class=(FORM_LABEL_STYLE) { "Amount" }

            input
                name="amount"
                id="record-amount"
                type="number"
                step="0.01"
                value=(draft.amount)
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="record-description" class=(FORM_LABEL_STYLE) { "Description" }

            textarea
                name="description"
                id="record-description"
                rows="3"
                class=(FORM_TEXT_INPUT_STYLE)
            {
                (draft.description)
            }
        }

        div
        {
            label for="record-date-time" class=(FORM_LABEL_STYLE) { "Date and time" }

            input
                name="date_time"
                id="record-date-time"
                type="datetime-local"
                value=(draft.date_time)
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}
