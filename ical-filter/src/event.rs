use std::fmt;

/// The event properties filters can match against and rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Summary,
    Description,
    Location,
    Url,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Summary,
        Field::Description,
        Field::Location,
        Field::Url,
    ];

    /// iCalendar property name backing this field.
    #[must_use]
    pub const fn property_name(self) -> &'static str {
        match self {
            Field::Summary => "SUMMARY",
            Field::Description => "DESCRIPTION",
            Field::Location => "LOCATION",
            Field::Url => "URL",
        }
    }

    /// The field backed by the iCalendar property `name`, ignoring case.
    #[must_use]
    pub fn from_property_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| name.eq_ignore_ascii_case(field.property_name()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Summary => "summary",
            Field::Description => "description",
            Field::Location => "location",
            Field::Url => "url",
        })
    }
}

/// Read/write access to the string properties of a single event.
///
/// `field_value` returns `None` when the property is missing from the event
/// entirely, which is distinct from a property that holds an empty value.
pub trait EventProperties {
    fn field_value(&self, field: Field) -> Option<&str>;

    fn set_field(&mut self, field: Field, value: &str);

    /// Blanks the property. The property stays on the event with an empty value.
    fn clear_field(&mut self, field: Field) {
        self.set_field(field, "");
    }

    /// The property value with absence folded into the empty string.
    fn field_or_empty(&self, field: Field) -> &str {
        self.field_value(field).unwrap_or_default()
    }
}
