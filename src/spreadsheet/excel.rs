//! Office Open XML package helpers shared by the reader
use crate::error::DstError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Signature of an OLE compound document, used by encrypted workbooks and legacy `.xls`
const COMPOUND_FILE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Opens an Excel package and loads its workbook structure
///
/// # Arguments
/// * `name` - Display name of the uploaded file, used in error messages
/// * `bytes` - The complete file content
/// * `load_workbook` - Function to load worksheet paths and the date system
/// * `load_number_formats` - Function to load number formatting information
///
/// # Returns
/// Tuple containing:
/// - Zip archive handle
/// - Number format mappings indexed by style id
/// - List of sheet names and their paths
pub(super) fn open<RS, W, F>(
    name: &str,
    reader: RS,
    load_workbook: W,
    load_number_formats: F,
) -> Result<(ZipArchive<RS>, Vec<CellType>, Vec<(String, String)>), DstError>
where
    RS: Read + Seek,
    W: Fn(&mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), DstError>,
    F: Fn(&mut ZipArchive<RS>, bool) -> Result<Vec<CellType>, DstError>,
{
    let mut zip = ZipArchive::new(reader)?;
    let (sheets, is_1904) = load_workbook(&mut zip)?;
    if sheets.is_empty() {
        Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?
    }

    let number_formats = load_number_formats(&mut zip, is_1904)?;
    Ok((zip, number_formats, sheets))
}

/// Loads worksheet relationships from a package
///
/// # Returns
/// Mapping of relationship IDs to worksheet paths
pub(super) fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<HashMap<String, String>, DstError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only worksheet relationships matter
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Maps format indexes to cell types using custom and built-in formats
pub(super) fn load_number_formats(format_indexes: Vec<String>, custom_formats: HashMap<String, CellType>, is_1904: bool) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Normalizes a relationship target to a path inside the package
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(stripped) = path.strip_prefix("/xl/") {
        format!("xl/{stripped}")
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Checks whether the bytes are an OLE compound document rather than a zip package
pub(super) fn is_compound_file(bytes: &[u8]) -> bool {
    bytes.starts_with(&COMPOUND_FILE_SIGNATURE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path(Cow::Borrowed("worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("/xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
    }

    #[test]
    fn number_formats() {
        let custom = HashMap::from([("164".to_owned(), CellType::NumberDate1900)]);
        let formats = load_number_formats(
            vec!["0".to_owned(), "164".to_owned(), "22".to_owned()],
            custom,
            false,
        );
        assert_eq!(formats, vec![CellType::Number, CellType::NumberDate1900, CellType::NumberDateTime1900]);
    }

    #[test]
    fn compound_file_signature() {
        assert!(is_compound_file(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00]));
        assert!(!is_compound_file(b"PK\x03\x04"));
    }
}
