//! Defines the core data models and database queries for records.
//!
//! Income and expense records share one model but live in separate tables,
//! which is why deleting a record needs both its id and its type: the type
//! resolves which table to act on, and ids are only unique within a table.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::{
    PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::{Error, record::catalog, user::UserID};

// ============================================================================
// MODELS
// ============================================================================

/// The ID of a record within its type's table.
pub type RecordId = i64;

/// Whether a record tracks money earned or money spent.
///
/// The type is fixed when the record is created; the edit form never offers a
/// type switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl RecordType {
    /// Both record types, in the order the sections appear on the page.
    pub const ALL: [RecordType; 2] = [RecordType::Income, RecordType::Expense];

    /// The lowercase wire name, which doubles as the table name.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Income => "income",
            RecordType::Expense => "expense",
        }
    }

    /// The heading shown above this type's section on the records page.
    pub fn section_title(self) -> &'static str {
        match self {
            RecordType::Income => "Income",
            RecordType::Expense => "Expenses",
        }
    }

    pub(crate) fn table(self) -> &'static str {
        self.as_str()
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(RecordType::Income),
            "expense" => Ok(RecordType::Expense),
            other => Err(Error::UnknownRecordType(other.to_owned())),
        }
    }
}

/// The minute-precision format used by the record forms, the JSON API, and
/// the database, e.g. "2024-01-01T10:00".
///
/// This matches the value format of an HTML `datetime-local` input, so the
/// stored value round-trips into the edit form unchanged. The wall-clock
/// fields are kept as-is with no timezone conversion.
const DATE_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");

/// A fallback for callers that include seconds, e.g. "2024-01-01T10:00:30".
/// The seconds are truncated to keep minute precision.
const DATE_TIME_SECONDS_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Parse a date-time string in the `YYYY-MM-DDTHH:MM` form.
///
/// # Errors
///
/// Returns an [Error::InvalidDateTime] if the string does not match.
pub fn parse_date_time(raw: &str) -> Result<PrimitiveDateTime, Error> {
    let raw = raw.trim();

    PrimitiveDateTime::parse(raw, DATE_TIME_FORMAT)
        .or_else(|_| {
            PrimitiveDateTime::parse(raw, DATE_TIME_SECONDS_FORMAT)
                .map(|date_time| date_time.replace_second(0).unwrap_or(date_time))
        })
        .map_err(|_| Error::InvalidDateTime(raw.to_owned()))
}

/// Format a date-time to the `YYYY-MM-DDTHH:MM` form.
pub fn format_date_time(date_time: PrimitiveDateTime) -> String {
    date_time
        .format(DATE_TIME_FORMAT)
        .unwrap_or_else(|_| date_time.to_string())
}

mod date_time_format {
    //! Serializes record timestamps in the minute-precision form shared by the
    //! JSON API and the forms.

    use serde::{Deserialize, Deserializer, Serializer};
    use time::PrimitiveDateTime;

    use super::{format_date_time, parse_date_time};

    pub fn serialize<S>(date_time: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_date_time(*date_time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_date_time(&raw).map_err(serde::de::Error::custom)
    }
}

/// An income or expense entry owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The ID of the record within its type's table.
    pub id: RecordId,
    /// The owning user.
    #[serde(rename = "userId")]
    pub user_id: UserID,
    /// Whether this is an income or expense record.
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// The display label, e.g. "Salary".
    pub name: String,
    /// One of the catalog categories for the record's type.
    pub category: String,
    /// The monetary amount.
    pub amount: f64,
    /// Free-form text about the record.
    #[serde(default)]
    pub description: String,
    /// When the income or expense happened, to the minute.
    #[serde(with = "date_time_format")]
    pub date_time: PrimitiveDateTime,
}

/// The payload accepted by the create and update endpoints.
///
/// The field names match the wire contract: `userId` and `type` are merged
/// into the record fields, and `date_time` arrives as the raw string from the
/// `datetime-local` form input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayload {
    /// The record to update. Absent when creating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// The owning user.
    #[serde(rename = "userId")]
    pub user_id: UserID,
    /// Whether this is an income or expense record.
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// The display label.
    pub name: String,
    /// The category chosen in the form.
    pub category: String,
    /// The monetary amount.
    pub amount: f64,
    /// Free-form text about the record.
    #[serde(default)]
    pub description: String,
    /// The raw `YYYY-MM-DDTHH:MM` string from the form or API client.
    pub date_time: String,
}

/// A [RecordPayload] that has passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordData {
    pub(crate) user_id: UserID,
    pub(crate) record_type: RecordType,
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) amount: f64,
    pub(crate) description: String,
    pub(crate) date_time: PrimitiveDateTime,
}

impl RecordPayload {
    /// Check the payload against the rules the store enforces at write time
    /// and convert it into typed record data.
    ///
    /// # Errors
    ///
    /// Returns a:
    /// - [Error::EmptyRecordName] if the name is blank,
    /// - [Error::UnknownCategory] if the category is not in the catalog for
    ///   the payload's type,
    /// - [Error::InvalidDateTime] if the date-time string cannot be parsed.
    pub fn validate(self) -> Result<(Option<RecordId>, RecordData), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::EmptyRecordName);
        }

        if !catalog::is_known_category(self.record_type, &self.category) {
            return Err(Error::UnknownCategory {
                record_type: self.record_type,
                category: self.category,
            });
        }

        let date_time = parse_date_time(&self.date_time)?;

        Ok((
            self.id,
            RecordData {
                user_id: self.user_id,
                record_type: self.record_type,
                name: self.name,
                category: self.category,
                amount: self.amount,
                description: self.description,
                date_time,
            },
        ))
    }
}

/// The request body (or query parameters) for deleting a record.
///
/// Both fields are required: the type resolves which table holds the row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeleteRecordRequest {
    /// The id of the record to delete.
    pub id: RecordId,
    /// The type of the record to delete.
    #[serde(rename = "type")]
    pub record_type: RecordType,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the income and expense tables.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn create_record_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    for record_type in RecordType::ALL {
        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    amount REAL NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    date_time TEXT NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
                    )",
                record_type.table()
            ),
            (),
        )?;

        connection.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{0}_user_date ON \"{0}\"(user_id, date_time);",
                record_type.table()
            ),
            (),
        )?;
    }

    Ok(())
}

fn map_record_row(record_type: RecordType) -> impl Fn(&Row) -> Result<Record, rusqlite::Error> {
    move |row| {
        let id = row.get(0)?;
        let raw_user_id: i64 = row.get(1)?;
        let name = row.get(2)?;
        let category = row.get(3)?;
        let amount = row.get(4)?;
        let description = row.get(5)?;
        let raw_date_time: String = row.get(6)?;

        let date_time = parse_date_time(&raw_date_time).map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                Type::Text,
                format!("invalid date_time {raw_date_time:?}").into(),
            )
        })?;

        Ok(Record {
            id,
            user_id: UserID::new(raw_user_id),
            record_type,
            name,
            category,
            amount,
            description,
            date_time,
        })
    }
}

/// Insert a new record into the table for its type.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidUser] if the owning user does not exist,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_record(data: RecordData, connection: &Connection) -> Result<Record, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO \"{}\" (user_id, name, category, amount, description, date_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, user_id, name, category, amount, description, date_time",
            data.record_type.table()
        ))?
        .query_row(
            (
                data.user_id.as_i64(),
                &data.name,
                &data.category,
                data.amount,
                &data.description,
                format_date_time(data.date_time),
            ),
            map_record_row(data.record_type),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidUser(data.user_id),
            error => error.into(),
        })
}

/// Overwrite the record with `id` in the table for `data`'s type.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingRecord] if `id` does not refer to an existing record,
/// - [Error::SqlError] if there is some other SQL error.
pub fn update_record(id: RecordId, data: &RecordData, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        &format!(
            "UPDATE \"{}\"
             SET name = ?1, category = ?2, amount = ?3, description = ?4, date_time = ?5
             WHERE id = ?6",
            data.record_type.table()
        ),
        (
            &data.name,
            &data.category,
            data.amount,
            &data.description,
            format_date_time(data.date_time),
            id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingRecord);
    }

    Ok(())
}

/// Delete the record with `id` from the table for `record_type`.
///
/// Deleting is not idempotent: a second delete of the same id fails because
/// the row is already gone.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingRecord] if `id` does not refer to an existing record,
/// - [Error::SqlError] if there is some other SQL error.
pub fn delete_record(
    id: RecordId,
    record_type: RecordType,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        &format!("DELETE FROM \"{}\" WHERE id = ?1", record_type.table()),
        (id,),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingRecord);
    }

    Ok(())
}

/// Retrieve a single record by its `id` and type.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to an existing record,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_record(
    id: RecordId,
    record_type: RecordType,
    connection: &Connection,
) -> Result<Record, Error> {
    connection
        .prepare(&format!(
            "SELECT id, user_id, name, category, amount, description, date_time
             FROM \"{}\" WHERE id = :id",
            record_type.table()
        ))?
        .query_row(&[(":id", &id)], map_record_row(record_type))
        .map_err(|error| error.into())
}

/// Fetch the full, unfiltered record set for a user, both types included.
///
/// Records are ordered by their date-time, oldest first, with ties broken by
/// id. Callers derive the per-type views from this list; the store itself is
/// never queried with filters.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_records(user_id: UserID, connection: &Connection) -> Result<Vec<Record>, Error> {
    let mut records = Vec::new();

    for record_type in RecordType::ALL {
        let mut statement = connection.prepare(&format!(
            "SELECT id, user_id, name, category, amount, description, date_time
             FROM \"{}\" WHERE user_id = :user_id",
            record_type.table()
        ))?;
        let rows = statement.query_map(
            &[(":user_id", &user_id.as_i64())],
            map_record_row(record_type),
        )?;

        for row in rows {
            records.push(row?);
        }
    }

    records.sort_by(|a, b| {
        a.date_time
            .cmp(&b.date_time)
            .then_with(|| a.id.cmp(&b.id))
    });

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================
