//! Ticket composition: a pure mapping from form fields to the text shown on the card.

use chrono::NaiveDateTime;

use crate::form::{FieldName, TicketFields};

pub const DEFAULT_TICKET_NUMBER: &str = "03255";
pub const DEFAULT_FOOTER: &str = "ENJOY IN RUSSIA..";

/// Text displayed for a date/time value that cannot be parsed.
pub const INVALID_DATE: &str = "Invalid Date";

const DATE_TIME_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];
const DATE_TIME_DISPLAY_FORMAT: &str = "%m/%d/%Y, %I:%M %p";

/// Localized label displayed in place of an empty field.
pub fn placeholder(name: FieldName) -> &'static str {
    match name {
        FieldName::PersonName => "اسم الشخص",
        FieldName::EventName => "اسم الفعالية",
        FieldName::NumberOfAttendees => "عدد الاشخاص",
        FieldName::DateTime => "الوقت",
        FieldName::Address => "العنوان",
    }
}

/// One displayed value on the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayValue {
    pub text: String,
    pub placeholder: bool,
}

/// Everything the card shows, resolved from a `TicketFields` snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketView {
    pub ticket_number: String,
    pub person_name: DisplayValue,
    pub number_of_attendees: DisplayValue,
    pub event_name: DisplayValue,
    pub date_time: DisplayValue,
    pub address: DisplayValue,
    pub footer: String,
}

impl TicketView {
    /// The field values in card order: name, attendees, event, time, address.
    pub fn values(&self) -> [&DisplayValue; 5] {
        [
            &self.person_name,
            &self.number_of_attendees,
            &self.event_name,
            &self.date_time,
            &self.address,
        ]
    }
}

/// Format a `datetime-local` value as `MM/DD/YYYY, hh:mm AM`.
///
/// Returns `None` when the value is not a local date-time.
pub fn format_date_time(value: &str) -> Option<String> {
    DATE_TIME_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.format(DATE_TIME_DISPLAY_FORMAT).to_string())
}

fn display(fields: &TicketFields, name: FieldName) -> DisplayValue {
    let raw = fields.get(name);
    if raw.is_empty() {
        return DisplayValue {
            text: placeholder(name).to_string(),
            placeholder: true,
        };
    }
    let text = match name {
        FieldName::DateTime => format_date_time(raw).unwrap_or_else(|| INVALID_DATE.to_string()),
        _ => raw.to_string(),
    };
    DisplayValue {
        text,
        placeholder: false,
    }
}

/// Compose the card content with the default ticket number and footer.
pub fn compose(fields: &TicketFields) -> TicketView {
    compose_with(fields, DEFAULT_TICKET_NUMBER, DEFAULT_FOOTER)
}

pub fn compose_with(fields: &TicketFields, ticket_number: &str, footer: &str) -> TicketView {
    TicketView {
        ticket_number: ticket_number.to_string(),
        person_name: display(fields, FieldName::PersonName),
        number_of_attendees: display(fields, FieldName::NumberOfAttendees),
        event_name: display(fields, FieldName::EventName),
        date_time: display(fields, FieldName::DateTime),
        address: display(fields, FieldName::Address),
        footer: footer.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_show_placeholders() {
        let view = compose(&TicketFields::default());
        assert!(view.values().iter().all(|v| v.placeholder));
        assert_eq!(view.person_name.text, "اسم الشخص");
        assert_eq!(view.number_of_attendees.text, "عدد الاشخاص");
        assert_eq!(view.event_name.text, "اسم الفعالية");
        assert_eq!(view.date_time.text, "الوقت");
        assert_eq!(view.address.text, "العنوان");
        assert_eq!(view.ticket_number, "03255");
    }

    #[test]
    fn filled_fields_show_literal_values() {
        let fields = TicketFields {
            person_name: "Ali".into(),
            event_name: "الدب".into(),
            number_of_attendees: "4".into(),
            date_time: "2024-05-01T19:30".into(),
            address: "Riyadh".into(),
        };
        let view = compose(&fields);
        assert_eq!(view.person_name.text, "Ali");
        assert_eq!(view.number_of_attendees.text, "4");
        assert_eq!(view.event_name.text, "الدب");
        assert!(view.date_time.text.contains("05/01/2024"));
        assert!(view.date_time.text.contains("07:30 PM"));
        assert_eq!(view.address.text, "Riyadh");
        assert!(view.values().iter().all(|v| !v.placeholder));
    }

    #[test]
    fn whitespace_is_not_empty() {
        let fields = TicketFields {
            address: " ".into(),
            ..Default::default()
        };
        let view = compose(&fields);
        assert_eq!(view.address.text, " ");
        assert!(!view.address.placeholder);
    }

    #[test]
    fn date_time_format_is_deterministic() {
        let a = format_date_time("2024-12-31T00:05").unwrap();
        let b = format_date_time("2024-12-31T00:05").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "12/31/2024, 12:05 AM");
        assert_eq!(format_date_time("2024-05-01T19:30:59").unwrap(), "05/01/2024, 07:30 PM");
    }

    #[test]
    fn unparseable_date_time_shows_invalid_date() {
        let fields = TicketFields {
            date_time: "tomorrow".into(),
            ..Default::default()
        };
        assert_eq!(compose(&fields).date_time.text, INVALID_DATE);
        assert!(format_date_time("2024-02-30T10:00").is_none());
    }
}
