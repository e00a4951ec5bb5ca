use crate::spreadsheet::reference::index_to_reference;
use crate::table::Value;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::Timelike;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Types of cell data in SpreadsheetML worksheets.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Looks for date/time tokens outside literals, escapes and brackets.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    fn is_1904(&self) -> bool {
        matches!(self, Self::NumberDateTime1904 | Self::NumberDate1904 | Self::NumberTime1904)
    }
}

/// Represents a single cell in a worksheet with position, type, and raw value.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Cell value as found in the XML
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Converts the raw XML value into a table value.
    pub(crate) fn to_value(&self, shared_strings: &[String]) -> Result<Value, String> {
        let value = match self.kind {
            CellType::Empty => Value::Empty,
            CellType::Boolean => Value::Boolean(self.value == "1" || self.value.eq_ignore_ascii_case("true")),
            CellType::Number => Value::Number(self.to_double()?),
            CellType::InlineString => Value::Text(self.value.to_owned()),
            CellType::SharedString => {
                let index = self.value
                    .parse::<usize>()
                    .map_err(|_| format!("invalid shared string index '{}'", self.value))?;
                let text = shared_strings
                    .get(index)
                    .ok_or_else(|| format!("shared string index {} out of range", index))?;
                Value::Text(text.to_owned())
            }
            CellType::Error => Value::Error(self.value.to_owned()),
            CellType::IsoDateTime => self.parse_iso()?,
            CellType::NumberDate1900 | CellType::NumberDate1904 => {
                Value::Date(self.to_datetime()?.date())
            }
            CellType::NumberDateTime1900 | CellType::NumberDateTime1904 => {
                Value::DateTime(self.to_datetime()?)
            }
            CellType::NumberTime1900 | CellType::NumberTime1904 => {
                Value::Time(self.to_datetime()?.time())
            }
        };
        Ok(value)
    }

    /// Converts cell value to double-precision floating point.
    fn to_double(&self) -> Result<f64, String> {
        self.value.trim().parse::<f64>().map_err(|_| format!("parse '{}' to double failed", self.value))
    }

    fn to_datetime(&self) -> Result<NaiveDateTime, String> {
        serial_to_datetime(self.to_double()?, self.kind.is_1904())
            .ok_or_else(|| format!("serial '{}' is outside the supported date range", self.value))
    }

    /// Parses `t="d"` values: date, date-time or time in ISO 8601.
    fn parse_iso(&self) -> Result<Value, String> {
        let value = self.value.trim();
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(Value::DateTime)
            .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d").map(Value::Date))
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S%.f").map(Value::Time))
            .map_err(|_| format!("parse '{}' to ISO 8601 date failed", self.value))
    }
}

fn epoch(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// First real date after the fictitious 1900-02-29 of the 1900 date system.
fn leap_bug_cutoff() -> NaiveDate {
    epoch(1900, 3, 1)
}

/// Converts a serial number to a date-time, rounded to the millisecond.
///
/// The 1900 system counts 1900-02-29 as a real day (Lotus 1-2-3 leap year
/// bug), so serials below 60 use an epoch one day later than the rest.
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let millis = (serial * MILLIS_PER_DAY as f64).round() as i64;
    let days = millis.div_euclid(MILLIS_PER_DAY);
    let remainder = millis.rem_euclid(MILLIS_PER_DAY);
    let base = if is_1904 {
        epoch(1904, 1, 1)
    } else if days < 60 {
        epoch(1899, 12, 31)
    } else {
        epoch(1899, 12, 30)
    };
    let date = base.checked_add_signed(Duration::try_days(days)?)?;
    date.and_hms_opt(0, 0, 0)?.checked_add_signed(Duration::milliseconds(remainder))
}

/// Converts a date-time to a 1900-system serial number.
pub(crate) fn datetime_to_serial(datetime: NaiveDateTime) -> f64 {
    let date = datetime.date();
    let base = if date < leap_bug_cutoff() {
        epoch(1899, 12, 31)
    } else {
        epoch(1899, 12, 30)
    };
    let days = (date - base).num_days();
    let millis = days * MILLIS_PER_DAY + time_to_millis(datetime.time());
    millis as f64 / MILLIS_PER_DAY as f64
}

/// Converts a date to a 1900-system serial number.
pub(crate) fn date_to_serial(date: NaiveDate) -> f64 {
    datetime_to_serial(date.and_time(NaiveTime::MIN))
}

/// Converts a time of day to a day fraction.
pub(crate) fn time_to_serial(time: NaiveTime) -> f64 {
    time_to_millis(time) as f64 / MILLIS_PER_DAY as f64
}

fn time_to_millis(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * 1_000 + (time.nanosecond() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 0,
            col: 0,
            kind,
            value: value.to_owned(),
        }
    }

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn custom_number_formats() {
        assert_eq!(CellType::parse_custom_number_format("dd/mm/yyyy", false), CellType::NumberDate1900);
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd hh:mm", true), CellType::NumberDateTime1904);
        assert_eq!(CellType::parse_custom_number_format("hh:mm:ss", false), CellType::NumberTime1900);
        assert_eq!(CellType::parse_custom_number_format("\"days\" 0.00", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]#,##0", false), CellType::Number);
    }

    #[test]
    fn builtin_number_formats() {
        assert_eq!(CellType::parse_builtin_number_format_id("14", false), Some(CellType::NumberDate1900));
        assert_eq!(CellType::parse_builtin_number_format_id("22", true), Some(CellType::NumberDateTime1904));
        assert_eq!(CellType::parse_builtin_number_format_id("0", false), None);
    }

    #[test]
    fn serial_dates() {
        assert_eq!(serial_to_datetime(1.0, false).unwrap().date(), ymd(1900, 1, 1));
        assert_eq!(serial_to_datetime(59.0, false).unwrap().date(), ymd(1900, 2, 28));
        assert_eq!(serial_to_datetime(61.0, false).unwrap().date(), ymd(1900, 3, 1));
        assert_eq!(serial_to_datetime(45_413.0, false).unwrap().date(), ymd(2024, 5, 1));
        assert_eq!(serial_to_datetime(0.0, true).unwrap().date(), ymd(1904, 1, 1));
        assert_eq!(date_to_serial(ymd(2024, 5, 1)), 45_413.0);
        assert_eq!(date_to_serial(ymd(1900, 1, 1)), 1.0);
    }

    #[test]
    fn serial_round_trip() {
        let datetime = ymd(2024, 5, 1).and_hms_opt(17, 45, 30).unwrap();
        assert_eq!(serial_to_datetime(datetime_to_serial(datetime), false), Some(datetime));
        let time = NaiveTime::from_hms_opt(8, 15, 0).unwrap();
        assert_eq!(serial_to_datetime(time_to_serial(time), false).unwrap().time(), time);
    }

    #[test]
    fn cell_values() {
        let shared = vec!["Alice".to_owned()];
        assert_eq!(cell(CellType::SharedString, "0").to_value(&shared), Ok(Value::Text("Alice".to_owned())));
        assert!(cell(CellType::SharedString, "3").to_value(&shared).is_err());
        assert_eq!(cell(CellType::Boolean, "1").to_value(&shared), Ok(Value::Boolean(true)));
        assert_eq!(cell(CellType::Number, "2.5").to_value(&shared), Ok(Value::Number(2.5)));
        assert_eq!(cell(CellType::Error, "#N/A").to_value(&shared), Ok(Value::Error("#N/A".to_owned())));
        assert_eq!(cell(CellType::NumberDate1900, "45413").to_value(&shared), Ok(Value::Date(ymd(2024, 5, 1))));
        assert_eq!(cell(CellType::IsoDateTime, "2024-05-01").to_value(&shared), Ok(Value::Date(ymd(2024, 5, 1))));
        assert!(cell(CellType::Number, "abc").to_value(&shared).is_err());
    }
}
