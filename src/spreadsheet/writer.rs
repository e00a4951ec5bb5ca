//! Encodes a table as a single-sheet `.xlsx` package.
//!
//! The header row is written first, followed by one worksheet row per table
//! row. No index column is added. Cell styles only carry the number formats
//! needed to read dates and times back; nothing else of the source workbook's
//! formatting is reproduced.

use crate::error::DstError;
use crate::helpers::xml::XmlWriter;
use crate::helpers::zip::PackageWriter;
use crate::spreadsheet::cell::date_to_serial;
use crate::spreadsheet::cell::datetime_to_serial;
use crate::spreadsheet::cell::time_to_serial;
use crate::spreadsheet::reference::index_to_reference;
use crate::table::Table;
use crate::table::Value;
use std::collections::HashMap;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

// Indexes into `cellXfs` of STYLES
const STYLE_DATE: &str = "1";
const STYLE_DATE_TIME: &str = "2";
const STYLE_TIME: &str = "3";
const STYLE_HEADER: &str = "4";

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#,
    r#"</Types>"#,
);

const ROOT_RELATIONSHIPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#,
);

const WORKBOOK: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    r#"<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>"#,
    r#"</workbook>"#,
);

const WORKBOOK_RELATIONSHIPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
    r#"</Relationships>"#,
);

const STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="2">"#,
    r#"<font><sz val="11"/><name val="Calibri"/><family val="2"/></font>"#,
    r#"<font><b/><sz val="11"/><name val="Calibri"/><family val="2"/></font>"#,
    r#"</fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="5">"#,
    r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
    r#"<xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>"#,
    r#"<xf numFmtId="22" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>"#,
    r#"<xf numFmtId="21" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>"#,
    r#"<xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/>"#,
    r#"</cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
    r#"</styleSheet>"#,
);

/// Deduplicating shared string table, in first-use order
#[derive(Default)]
struct SharedStrings {
    strings: Vec<String>,
    indexes: HashMap<String, usize>,
    references: usize,
}

impl SharedStrings {
    fn index_of(&mut self, text: &str) -> usize {
        self.references += 1;
        if let Some(index) = self.indexes.get(text) {
            return *index;
        }
        let index = self.strings.len();
        self.strings.push(text.to_owned());
        self.indexes.insert(text.to_owned(), index);
        index
    }

    fn to_xml(&self) -> Result<Vec<u8>, DstError> {
        let mut writer = XmlWriter::new()?;
        let count = self.references.to_string();
        let unique_count = self.strings.len().to_string();
        writer.start("sst", &[("xmlns", NS_MAIN), ("count", &count), ("uniqueCount", &unique_count)])?;
        for text in &self.strings {
            writer.start("si", &[])?;
            if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
                writer.text_element("t", &[("xml:space", "preserve")], text)?;
            } else {
                writer.text_element("t", &[], text)?;
            }
            writer.end("si")?;
        }
        writer.end("sst")?;
        Ok(writer.finish())
    }
}

/// Encodes `table` as `.xlsx` bytes.
///
/// The output depends only on the table: zip entries carry a fixed timestamp.
pub fn encode(table: &Table) -> Result<Vec<u8>, DstError> {
    let mut shared_strings = SharedStrings::default();
    let worksheet = write_worksheet(table, &mut shared_strings)?;

    let mut package = PackageWriter::new();
    package.add("[Content_Types].xml", CONTENT_TYPES.as_bytes())?;
    package.add("_rels/.rels", ROOT_RELATIONSHIPS.as_bytes())?;
    package.add("xl/workbook.xml", WORKBOOK.as_bytes())?;
    package.add("xl/_rels/workbook.xml.rels", WORKBOOK_RELATIONSHIPS.as_bytes())?;
    package.add("xl/styles.xml", STYLES.as_bytes())?;
    package.add("xl/sharedStrings.xml", &shared_strings.to_xml()?)?;
    package.add("xl/worksheets/sheet1.xml", &worksheet)?;
    package.finish()
}

fn write_worksheet(table: &Table, shared_strings: &mut SharedStrings) -> Result<Vec<u8>, DstError> {
    let mut writer = XmlWriter::new()?;
    writer.start("worksheet", &[
        ("xmlns", NS_MAIN),
        ("xmlns:r", "http://schemas.openxmlformats.org/officeDocument/2006/relationships"),
    ])?;

    let dimension = if table.is_empty() {
        "A1".to_owned()
    } else {
        format!("A1:{}", index_to_reference(table.row_count(), table.column_count() - 1))
    };
    writer.empty("dimension", &[("ref", &dimension)])?;

    writer.start("sheetData", &[])?;
    if !table.is_empty() {
        writer.start("row", &[("r", "1")])?;
        for (col, name) in table.column_names().enumerate() {
            let index = shared_strings.index_of(name).to_string();
            write_cell(&mut writer, 0, col, &[("t", "s"), ("s", STYLE_HEADER)], &index)?;
        }
        writer.end("row")?;

        for row in 0..table.row_count() {
            let row_number = (row + 2).to_string();
            writer.start("row", &[("r", &row_number)])?;
            for (col, value) in table.row(row).enumerate() {
                write_value(&mut writer, row + 1, col, value, shared_strings)?;
            }
            writer.end("row")?;
        }
    }
    writer.end("sheetData")?;
    writer.end("worksheet")?;
    Ok(writer.finish())
}

fn write_value(
    writer: &mut XmlWriter,
    row: usize,
    col: usize,
    value: &Value,
    shared_strings: &mut SharedStrings,
) -> Result<(), DstError> {
    match value {
        Value::Empty => Ok(()),
        Value::Text(text) => {
            let index = shared_strings.index_of(text).to_string();
            write_cell(writer, row, col, &[("t", "s")], &index)
        }
        Value::Number(number) if number.is_finite() => write_cell(writer, row, col, &[], &number.to_string()),
        Value::Number(_) => write_cell(writer, row, col, &[("t", "e")], "#NUM!"),
        Value::Boolean(boolean) => write_cell(writer, row, col, &[("t", "b")], if *boolean { "1" } else { "0" }),
        Value::Date(date) => write_cell(writer, row, col, &[("s", STYLE_DATE)], &date_to_serial(*date).to_string()),
        Value::DateTime(datetime) => {
            write_cell(writer, row, col, &[("s", STYLE_DATE_TIME)], &datetime_to_serial(*datetime).to_string())
        }
        Value::Time(time) => write_cell(writer, row, col, &[("s", STYLE_TIME)], &time_to_serial(*time).to_string()),
        Value::Error(error) => write_cell(writer, row, col, &[("t", "e")], error),
    }
}

/// Writes `<c r="..." ...><v>raw</v></c>`
fn write_cell(
    writer: &mut XmlWriter,
    row: usize,
    col: usize,
    attributes: &[(&str, &str)],
    raw: &str,
) -> Result<(), DstError> {
    let reference = index_to_reference(row, col);
    let mut cell_attributes = Vec::with_capacity(attributes.len() + 1);
    cell_attributes.push(("r", reference.as_str()));
    cell_attributes.extend_from_slice(attributes);
    writer.start("c", &cell_attributes)?;
    writer.text_element("v", &[], raw)?;
    writer.end("c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::decode;
    use crate::table::Column;
    use chrono::NaiveDate;
    use chrono::NaiveTime;

    fn dst() -> Table {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        Table::new(vec![
            Column::new("DATE", vec![Value::Date(date), Value::Date(date), Value::Date(date)]),
            Column::new("CUSTOMER", vec!["Tan Ah Kow".into(), "  padded  ".into(), "Lim & Sons <VIP>".into()]),
            Column::new("AMOUNT", vec![Value::Number(120.0), Value::Number(99.95), Value::Empty]),
            Column::new("PIC", vec![Value::Empty, "Jane".into(), "Jane".into()]),
            Column::new("PAID", vec![Value::Boolean(true), Value::Boolean(false), Value::Error("#N/A".to_owned())]),
            Column::new("CHECK-IN", vec![
                Value::DateTime(date.and_hms_opt(9, 30, 0).unwrap()),
                Value::Time(NaiveTime::from_hms_opt(14, 5, 0).unwrap()),
                Value::Empty,
            ]),
        ])
        .unwrap()
    }

    #[test]
    fn round_trip_preserves_values_and_order() {
        let table = dst();
        let bytes = encode(&table).unwrap();
        let decoded = decode("amended.xlsx", &bytes).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn encoding_is_deterministic() {
        let table = dst();
        assert_eq!(encode(&table).unwrap(), encode(&table).unwrap());
    }

    #[test]
    fn empty_table_round_trip() {
        let bytes = encode(&Table::default()).unwrap();
        assert_eq!(decode("empty.xlsx", &bytes).unwrap(), Table::default());
    }

    #[test]
    fn header_only_table_round_trip() {
        let table = Table::new(vec![Column::new("PIC", vec![]), Column::new("NOTES", vec![])]).unwrap();
        let bytes = encode(&table).unwrap();
        assert_eq!(decode("header.xlsx", &bytes).unwrap(), table);
    }

    #[test]
    fn shared_strings_are_deduplicated() {
        let mut shared_strings = SharedStrings::default();
        assert_eq!(shared_strings.index_of("Jane"), 0);
        assert_eq!(shared_strings.index_of("PIC"), 1);
        assert_eq!(shared_strings.index_of("Jane"), 0);
        let xml = String::from_utf8(shared_strings.to_xml().unwrap()).unwrap();
        assert!(xml.contains("count=\"3\""));
        assert!(xml.contains("uniqueCount=\"2\""));
    }

    #[test]
    fn non_finite_numbers_become_errors() {
        let table = Table::new(vec![Column::new("X", vec![Value::Number(f64::NAN)])]).unwrap();
        let decoded = decode("nan.xlsx", &encode(&table).unwrap()).unwrap();
        assert_eq!(decoded.cell(0, 0), Some(&Value::Error("#NUM!".to_owned())));
    }
}
