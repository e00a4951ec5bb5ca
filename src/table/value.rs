use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use std::fmt::Display;

/// Format used when a date is shown or typed in the editor grid.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used when a date-time is shown in the editor grid.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used when a time of day is shown in the editor grid.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// A loosely-typed spreadsheet scalar.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    /// Spreadsheet error literal such as `#N/A`
    Error(String),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Interprets text typed into the editor grid, keeping the kind of the
    /// value it replaces where the input allows it.
    ///
    /// Blank input clears the cell. Anything that does not fit the current
    /// kind is stored verbatim as text, with CRLF line breaks turned into LF.
    pub fn from_input(input: &str, current: &Value) -> Value {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Value::Empty;
        }
        match current {
            Value::Number(_) => trimmed.parse::<f64>().ok().filter(|number| number.is_finite()).map(Value::Number),
            Value::Date(_) => NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok().map(Value::Date),
            Value::DateTime(_) => NaiveDateTime::parse_from_str(trimmed, DATE_TIME_FORMAT).ok().map(Value::DateTime),
            Value::Time(_) => NaiveTime::parse_from_str(trimmed, TIME_FORMAT).ok().map(Value::Time),
            Value::Boolean(_) => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            _ => None,
        }
        .unwrap_or_else(|| Value::Text(input.replace("\r\n", "\n")))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(text) => f.write_str(text),
            Value::Number(number) => write!(f, "{}", number),
            Value::Boolean(boolean) => write!(f, "{}", boolean),
            Value::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            Value::DateTime(datetime) => write!(f, "{}", datetime.format(DATE_TIME_FORMAT)),
            Value::Time(time) => write!(f, "{}", time.format(TIME_FORMAT)),
            Value::Error(error) => f.write_str(error),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}
