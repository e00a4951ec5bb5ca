use crate::error::DstError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::row_to_index;
use crate::spreadsheet::reference::MAX_COLUMNS;
use crate::spreadsheet::reference::MAX_ROWS;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content

/// An opened `.xlsx` package
pub(crate) struct XlsxWorkbook<RS: Read + Seek> {
    /// Display name of the uploaded file
    pub(crate) name: String,
    /// ZIP archive containing the package parts
    zip: ZipArchive<RS>,
    /// Parsed number formats for cell type detection, indexed by style id
    number_formats: Vec<CellType>,
    /// Worksheets in workbook order as (name, zip_path) pairs
    sheets: Vec<(String, String)>,
}

impl<RS: Read + Seek> XlsxWorkbook<RS> {
    /// Opens a package and parses its workbook structure
    pub(crate) fn open(name: &str, reader: RS) -> Result<XlsxWorkbook<RS>, DstError> {
        let (zip, number_formats, sheets) = excel::open(name, reader, load_workbook, load_number_formats)?;
        Ok(XlsxWorkbook {
            name: name.to_owned(),
            zip,
            number_formats,
            sheets,
        })
    }

    /// Name of the first worksheet in workbook order
    pub(crate) fn first_sheet_name(&self) -> Option<&str> {
        self.sheets.first().map(|(name, _)| name.as_str())
    }

    /// Loads the shared string table; packages without one have no shared strings
    pub(crate) fn load_shared_strings(&mut self) -> Result<Vec<String>, DstError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };

        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                shared_strings.push(string);
            }
        });
        Ok(shared_strings)
    }

    /// Reads all non-empty cells of the first worksheet
    pub(crate) fn read_first_sheet(&mut self) -> Result<Sheet, DstError> {
        let (sheet_name, zip_path) = self.sheets
            .first()
            .cloned()
            .ok_or_else(|| SpreadsheetError::SpreadsheetEmptyError(self.name.to_owned()))?;

        let mut sheet = Sheet::new(&self.name, &sheet_name);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut reader = self.zip
            .xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(reference) = event.get_attribute_value("r")? {
                    row_count = row_to_index(&reference).ok_or_else(|| {
                        SpreadsheetError::CellReferenceError(self.name.to_owned(), reference.to_string())
                    })?;
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
                col_count = 0;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = match event.get_attribute_value("r")? {
                    Some(reference) => reference_to_index(&reference).ok_or_else(|| {
                        SpreadsheetError::CellReferenceError(self.name.to_owned(), reference.to_string())
                    })?,
                    None => (row_count, col_count),
                };
                if row >= MAX_ROWS || col >= MAX_COLUMNS {
                    Err(SpreadsheetError::CellReferenceError(self.name.to_owned(), index_to_reference(row, col)))?
                }
                col_count = col + 1;
                value.clear();
                kind = event.get_attribute_value("t")?.map(|t| {
                    match t.as_ref() {
                        "inlineStr" | "str" => CellType::InlineString,
                        "s" => CellType::SharedString,
                        "d" => CellType::IsoDateTime,
                        "b" => CellType::Boolean,
                        "e" => CellType::Error,
                        _ => CellType::Number,
                    }
                }).unwrap_or(CellType::Number);
                if kind == CellType::Number {
                    if let Some(index) = event.parse_attribute_value::<usize>("s")? {
                        kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                    }
                }
            }
            Event::Start(event) if kind != CellType::Empty && event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if kind != CellType::Empty && event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if kind != CellType::Empty && !value.is_empty() {
                    sheet.push(Cell {
                        row,
                        col,
                        kind,
                        value: std::mem::take(&mut value),
                    });
                }
                kind = CellType::Empty;
            }
        });

        Ok(sheet)
    }
}

/// Loads worksheet names and paths from `xl/workbook.xml`, and whether the
/// package uses the 1904 date system
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), DstError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads number formats and cell style indexes from `xl/styles.xml`
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>, is_1904: bool) -> Result<Vec<CellType>, DstError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();

    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                let style = CellType::parse_custom_number_format(&format, is_1904);
                custom_formats.insert(id.to_string(), style);
            }
        }

        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?.unwrap_or(Cow::Borrowed("0"));
            format_indexes.push(id.to_string());
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

/// Reads string content up to `end_tag`, skipping phonetic annotations
///
/// # Arguments
/// * `reader` - XML reader positioned inside the element
/// * `end_tag` - XML tag that marks the end of the string content
/// * `is_text_content` - Whether text outside `<t>` counts (true for `<v>`)
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, DstError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
