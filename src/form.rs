//! Form state: the five ticket fields and their update/validation rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The fixed set of events offered by the event-name select.
pub const EVENT_OPTIONS: [&str; 6] = [
    "كلاب الهاسكي",
    "الدب",
    "الأكواخ في الريف الروسي",
    "سيارات الدريفت",
    "هليكوبتر",
    "دبابات كبيرة",
];

/// Label shown by the event select before a choice is made.
pub const EVENT_SELECT_PLACEHOLDER: &str = "اختر الفعالية";

/// Identifies one of the ticket fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    PersonName,
    EventName,
    NumberOfAttendees,
    DateTime,
    Address,
}

impl FieldName {
    /// All fields in form order.
    pub const ALL: [FieldName; 5] = [
        FieldName::PersonName,
        FieldName::EventName,
        FieldName::NumberOfAttendees,
        FieldName::DateTime,
        FieldName::Address,
    ];

    /// The name used by the form control (and the JSON field input).
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::PersonName => "personName",
            FieldName::EventName => "eventName",
            FieldName::NumberOfAttendees => "numberOfAttendees",
            FieldName::DateTime => "dateTime",
            FieldName::Address => "address",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FieldName::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::Other(format!("Unknown field name: {}", s)))
    }
}

/// The ticket details as entered by the user.
///
/// Every value is kept as the raw string the control produced; the attendee
/// count and the date/time are interpreted only when the ticket is composed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketFields {
    pub person_name: String,
    pub event_name: String,
    pub number_of_attendees: String,
    pub date_time: String,
    pub address: String,
}

impl TicketFields {
    pub fn get(&self, name: FieldName) -> &str {
        match name {
            FieldName::PersonName => &self.person_name,
            FieldName::EventName => &self.event_name,
            FieldName::NumberOfAttendees => &self.number_of_attendees,
            FieldName::DateTime => &self.date_time,
            FieldName::Address => &self.address,
        }
    }

    /// Return a copy with one field replaced; all other fields are carried over.
    pub fn with_field(&self, name: FieldName, value: impl Into<String>) -> TicketFields {
        let mut next = self.clone();
        let slot = match name {
            FieldName::PersonName => &mut next.person_name,
            FieldName::EventName => &mut next.event_name,
            FieldName::NumberOfAttendees => &mut next.number_of_attendees,
            FieldName::DateTime => &mut next.date_time,
            FieldName::Address => &mut next.address,
        };
        *slot = value.into();
        next
    }
}

/// Holds the current committed field values for a session.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    fields: TicketFields,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: TicketFields) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &TicketFields {
        &self.fields
    }

    /// Replace a single field. A fresh `TicketFields` value is installed so
    /// that snapshots taken earlier (e.g. by an in-flight export) are unaffected.
    pub fn set_field(&mut self, name: FieldName, value: impl Into<String>) {
        self.fields = self.fields.with_field(name, value);
    }
}

/// Whether `value` is something a number input would submit.
fn is_numeric(value: &str) -> bool {
    value
        .trim()
        .parse::<f64>()
        .map(|n| n.is_finite())
        .unwrap_or(false)
}

/// Checks performed by the form controls before a submit is allowed:
/// every field is required, the attendee count must be numeric, and the
/// event must be one of `EVENT_OPTIONS`.
pub fn validate_required(fields: &TicketFields) -> Result<()> {
    for name in FieldName::ALL {
        if fields.get(name).is_empty() {
            return Err(Error::MissingField(name));
        }
    }
    if !is_numeric(&fields.number_of_attendees) {
        return Err(Error::InvalidField {
            field: FieldName::NumberOfAttendees,
            value: fields.number_of_attendees.clone(),
        });
    }
    if !EVENT_OPTIONS.contains(&fields.event_name.as_str()) {
        return Err(Error::InvalidField {
            field: FieldName::EventName,
            value: fields.event_name.clone(),
        });
    }
    Ok(())
}
