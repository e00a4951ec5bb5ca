//! XML utilities for SpreadsheetML parts.
//! Provides a reader wrapper with helper traits for attribute and text processing,
//! and a small writer wrapper used when encoding workbooks.

use crate::error::DstError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesDecl;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// XML reader wrapper configured for spreadsheet parsing
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a new XML reader; empty elements are expanded into start/end pairs
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event from the reader
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, DstError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(DstError::XmlError(error)),
        }
    }
}

/// Helper trait for XML attributes providing value extraction and parsing
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, DstError>;

    /// Parses the attribute value to the specified type
    fn parse_value<T: FromStr>(&self) -> Result<T, DstError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, DstError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, DstError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => DstError::XmlHelperError(XmlError::ParseAttributeValueError(value.to_string())),
                Err(error) => DstError::StringEncodingError(error),
            })
    }
}

/// Helper trait for XML nodes providing attribute access methods
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, DstError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, DstError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, DstError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, DstError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from a BytesText event
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), DstError>;

    /// Appends text content from a BytesRef event (entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), DstError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), DstError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), DstError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

/// XML writer producing a standalone SpreadsheetML part in memory
pub(crate) struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Creates a writer and emits the `<?xml ...?>` declaration
    pub(crate) fn new() -> Result<XmlWriter, DstError> {
        let mut writer = Writer::new(Vec::with_capacity(4096));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(XmlWriter { writer })
    }

    /// Opens an element with the given attributes
    pub(crate) fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), DstError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    /// Closes an element
    pub(crate) fn end(&mut self, name: &str) -> Result<(), DstError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Writes a self-closing element
    pub(crate) fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), DstError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    /// Writes `<name ...>text</name>`; the text is escaped
    pub(crate) fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<(), DstError> {
        self.start(name, attributes)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    /// Consumes the writer and returns the encoded document
    pub(crate) fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn writer_escapes_text_and_attributes() {
        let mut writer = XmlWriter::new().unwrap();
        writer.start("root", &[("name", "a<b\"c")]).unwrap();
        writer.text_element("t", &[], "x & y").unwrap();
        writer.empty("e", &[("v", "1")]).unwrap();
        writer.end("root").unwrap();
        let xml = String::from_utf8(writer.finish()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(xml.contains("<t>x &amp; y</t>"));
        assert!(xml.contains("<e v=\"1\"/>"));
        assert!(!xml.contains("a<b"));
    }

    #[test]
    fn reader_resolves_character_references() -> Result<(), DstError> {
        let source = "<t>caf&#233; &amp; &#x42;ar</t>";
        let mut reader = XmlReader::new(Cursor::new(source.as_bytes()));
        let mut text = String::new();
        match_xml_events!(reader => {
            Event::Text(event) => text.push_bytes_text(&event)?,
            Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
        });
        assert_eq!(text, "café & Bar");
        Ok(())
    }

    #[test]
    fn attribute_value_parsing() -> Result<(), DstError> {
        let source = "<c r=\"B7\" s=\"3\"/>";
        let mut reader = XmlReader::new(Cursor::new(source.as_bytes()));
        let mut style = None::<usize>;
        let mut reference = None::<String>;
        match_xml_events!(reader => {
            Event::Start(event) => {
                style = event.parse_attribute_value("s")?;
                reference = event.get_attribute_value("r")?.map(|value| value.to_string());
            }
        });
        assert_eq!(style, Some(3));
        assert_eq!(reference.as_deref(), Some("B7"));
        Ok(())
    }
}
