// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Reading of the xlsx package parts involved in pivot tables

mod package;
mod pivot_parser;
mod styles;

use std::io::{BufRead, BufReader, Read, Seek};
use std::str::FromStr;

use log::warn;
use quick_xml::{
    events::attributes::Attribute,
    events::Event,
    name::QName,
    Reader as XmlReader,
};
use zip::read::{ZipArchive, ZipFile};
use zip::result::ZipError;

use crate::{CellErrorType, Dimensions};

pub use package::{CachePart, PivotPackage, SheetPivots, TablePart};
pub use pivot_parser::{read_cache_definition, read_cache_records, read_table_definition};
pub use styles::read_dxfs;

pub(crate) type XlReader<'a, RS> = XmlReader<BufReader<ZipFile<'a, RS>>>;

/// Maximum number of rows allowed in an xlsx file
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns allowed in an xlsx file
pub const MAX_COLUMNS: u32 = 16_384;

/// An enum for Xlsx specific errors
#[derive(Debug)]
pub enum XlsxError {
    /// Io error
    Io(std::io::Error),
    /// Zip error
    Zip(zip::result::ZipError),
    /// Xml error
    Xml(quick_xml::Error),
    /// Xml attribute error
    XmlAttr(quick_xml::events::attributes::AttrError),
    /// Float error
    ParseFloat(std::num::ParseFloatError),
    /// `ParseInt` error
    ParseInt(std::num::ParseIntError),
    /// Unexpected end of xml
    XmlEof(&'static str),
    /// File not found
    FileNotFound(String),
    /// Expecting alphanumeric character
    Alphanumeric(u8),
    /// Numeric column
    NumericColumn(u8),
    /// Wrong dimension count
    DimensionCount(usize),
    /// There is no column component in the range string
    RangeWithoutColumnComponent,
    /// There is no row component in the range string
    RangeWithoutRowComponent,
    /// Unrecognized data
    Unrecognized {
        /// data type
        typ: &'static str,
        /// value found
        val: String,
    },
    /// Unexpected error
    Unexpected(&'static str),
    /// Cell error
    CellError(String),
    /// XML Encoding error
    Encoding(quick_xml::encoding::EncodingError),
}

from_err!(std::io::Error, XlsxError, Io);
from_err!(zip::result::ZipError, XlsxError, Zip);
from_err!(quick_xml::Error, XlsxError, Xml);
from_err!(std::num::ParseFloatError, XlsxError, ParseFloat);
from_err!(std::num::ParseIntError, XlsxError, ParseInt);
from_err!(quick_xml::encoding::EncodingError, XlsxError, Encoding);
from_err!(quick_xml::events::attributes::AttrError, XlsxError, XmlAttr);

impl std::fmt::Display for XlsxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XlsxError::Io(e) => write!(f, "I/O error: {e}"),
            XlsxError::Zip(e) => write!(f, "Zip error: {e}"),
            XlsxError::Xml(e) => write!(f, "Xml error: {e}"),
            XlsxError::XmlAttr(e) => write!(f, "Xml attribute error: {e}"),
            XlsxError::ParseInt(e) => write!(f, "Parse integer error: {e}"),
            XlsxError::ParseFloat(e) => write!(f, "Parse float error: {e}"),
            XlsxError::XmlEof(e) => write!(f, "Unexpected end of xml, expecting '</{e}>'"),
            XlsxError::FileNotFound(e) => write!(f, "File not found '{e}'"),
            XlsxError::Alphanumeric(e) => {
                write!(f, "Expecting alphanumeric character, got {e:X}")
            }
            XlsxError::NumericColumn(e) => write!(
                f,
                "Numeric character is not allowed for column name, got {e}",
            ),
            XlsxError::DimensionCount(e) => {
                write!(f, "Range dimension must be lower than 2. Got {e}")
            }
            XlsxError::RangeWithoutColumnComponent => {
                write!(f, "Range is missing the expected column component.")
            }
            XlsxError::RangeWithoutRowComponent => {
                write!(f, "Range is missing the expected row component.")
            }
            XlsxError::Unrecognized { typ, val } => write!(f, "Unrecognized {typ}: {val}"),
            XlsxError::Unexpected(e) => write!(f, "{e}"),
            XlsxError::CellError(e) => write!(f, "Unsupported cell error value '{e}'"),
            XlsxError::Encoding(e) => write!(f, "XML encoding error: {e}"),
        }
    }
}

impl std::error::Error for XlsxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XlsxError::Io(e) => Some(e),
            XlsxError::Zip(e) => Some(e),
            XlsxError::Xml(e) => Some(e),
            XlsxError::XmlAttr(e) => Some(e),
            XlsxError::ParseInt(e) => Some(e),
            XlsxError::ParseFloat(e) => Some(e),
            XlsxError::Encoding(e) => Some(e),
            _ => None,
        }
    }
}

impl FromStr for CellErrorType {
    type Err = XlsxError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "#DIV/0!" => Ok(CellErrorType::Div0),
            "#N/A" => Ok(CellErrorType::NA),
            "#NAME?" => Ok(CellErrorType::Name),
            "#NULL!" => Ok(CellErrorType::Null),
            "#NUM!" => Ok(CellErrorType::Num),
            "#REF!" => Ok(CellErrorType::Ref),
            "#VALUE!" => Ok(CellErrorType::Value),
            "#GETTING_DATA" => Ok(CellErrorType::GettingData),
            _ => Err(XlsxError::CellError(s.into())),
        }
    }
}

/// A relationship of a package part
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Relationship {
    pub id: String,
    pub target: String,
    pub kind: String,
    pub external: bool,
}

impl Relationship {
    /// Checks the last segment of the relationship type, e.g. `pivotTable`
    pub fn is(&self, kind: &str) -> bool {
        self.kind.rsplit('/').next() == Some(kind)
    }
}

fn configure<B: BufRead>(reader: &mut XmlReader<B>) {
    let config = reader.config_mut();
    config.check_end_names = false;
    config.trim_text(false);
    config.check_comments = false;
    config.expand_empty_elements = true;
}

/// Creates a configured xml reader over any buffered reader
pub(crate) fn buf_xml_reader<B: BufRead>(reader: B) -> XmlReader<B> {
    let mut r = XmlReader::from_reader(reader);
    configure(&mut r);
    r
}

pub(crate) fn xml_reader<'a, RS: Read + Seek>(
    zip: &'a mut ZipArchive<RS>,
    path: &str,
) -> Option<Result<XlReader<'a, RS>, XlsxError>> {
    let actual_path = zip
        .file_names()
        .find(|n| n.eq_ignore_ascii_case(path))?
        .to_owned();
    match zip.by_name(&actual_path) {
        Ok(f) => Some(Ok(buf_xml_reader(BufReader::new(f)))),
        Err(ZipError::FileNotFound) => None,
        Err(e) => Some(Err(e.into())),
    }
}

/// Path of the relationships part of `part`, e.g. `xl/_rels/workbook.xml.rels`
pub(crate) fn rels_path(part: &str) -> String {
    match part.rfind('/') {
        Some(i) => format!("{}/_rels{}.rels", &part[..i], &part[i..]),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the part owning the relationship
pub(crate) fn resolve_target(part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match part.rfind('/') {
        Some(i) => part[..i].split('/').collect(),
        None => Vec::new(),
    };
    for s in target.split('/') {
        match s {
            ".." => {
                segments.pop();
            }
            "." | "" => (),
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Reads the relationships of a part, an absent relationship part has none
pub(crate) fn read_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    part: &str,
) -> Result<Vec<Relationship>, XlsxError> {
    let mut xml = match xml_reader(zip, &rels_path(part)) {
        None => return Ok(Vec::new()),
        Some(x) => x?,
    };
    let mut relationships = Vec::new();
    let mut buf = Vec::with_capacity(64);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"Relationship" => {
                let mut rel = Relationship::default();
                let mut target = String::new();
                for a in e.attributes() {
                    match a.map_err(XlsxError::XmlAttr)? {
                        Attribute {
                            key: QName(b"Id"),
                            value: v,
                        } => rel.id = xml.decoder().decode(&v)?.into_owned(),
                        Attribute {
                            key: QName(b"Target"),
                            value: v,
                        } => target = xml.decoder().decode(&v)?.into_owned(),
                        Attribute {
                            key: QName(b"Type"),
                            value: v,
                        } => rel.kind = xml.decoder().decode(&v)?.into_owned(),
                        Attribute {
                            key: QName(b"TargetMode"),
                            value: v,
                        } => rel.external = &*v == b"External",
                        _ => (),
                    }
                }
                rel.target = if rel.external {
                    target
                } else {
                    resolve_target(part, &target)
                };
                relationships.push(rel);
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"Relationships" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("Relationships")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(relationships)
}

/// Splits `Sheet1!A1:B2` or `'My Sheet'!A1` into its sheet and address parts
pub(crate) fn split_sheet_reference(reference: &str) -> (Option<String>, &str) {
    let Some(i) = reference.rfind('!') else {
        return (None, reference);
    };
    let (sheet, address) = (&reference[..i], &reference[i + 1..]);
    let sheet = match sheet
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        Some(quoted) => quoted.replace("''", "'"),
        None => sheet.to_string(),
    };
    (Some(sheet), address)
}

/// converts a text representation (e.g. "A6:G67" or "$A$6:$G$67") of a dimension into integers
/// - top left (row, column),
/// - bottom right (row, column)
pub(crate) fn get_dimension(dimension: &[u8]) -> Result<Dimensions, XlsxError> {
    let parts: Vec<_> = dimension
        .split(|c| *c == b':')
        .map(get_row_column)
        .collect::<Result<Vec<_>, XlsxError>>()?;

    match parts.len() {
        0 => Err(XlsxError::DimensionCount(0)),
        1 => Ok(Dimensions {
            start: parts[0],
            end: parts[0],
        }),
        2 => {
            let (a, b) = (parts[0], parts[1]);
            if b.0 < a.0 || b.1 < a.1 {
                warn!("reversed range corners in '{}'", String::from_utf8_lossy(dimension));
            }
            let start = (a.0.min(b.0), a.1.min(b.1));
            let end = (a.0.max(b.0), a.1.max(b.1));
            let rows = end.0 - start.0;
            let columns = end.1 - start.1;
            if rows > MAX_ROWS {
                warn!("xlsx has more than maximum number of rows ({rows} > {MAX_ROWS})");
            }
            if columns > MAX_COLUMNS {
                warn!("xlsx has more than maximum number of columns ({columns} > {MAX_COLUMNS})");
            }
            Ok(Dimensions { start, end })
        }
        len => Err(XlsxError::DimensionCount(len)),
    }
}

/// Converts a text range name into its position (row, column) (0 based index).
/// If the row or column component in the range is missing, an Error is returned.
pub(crate) fn get_row_column(range: &[u8]) -> Result<(u32, u32), XlsxError> {
    let (mut row, mut col) = (0, 0);
    let mut pow = 1;
    let mut readrow = true;
    for c in range.iter().rev() {
        match *c {
            b'$' => continue,
            c @ b'0'..=b'9' => {
                if readrow {
                    row += ((c - b'0') as u32) * pow;
                    pow *= 10;
                } else {
                    return Err(XlsxError::NumericColumn(c));
                }
            }
            c @ (b'A'..=b'Z' | b'a'..=b'z') => {
                if readrow {
                    if row == 0 {
                        return Err(XlsxError::RangeWithoutRowComponent);
                    }
                    pow = 1;
                    readrow = false;
                }
                col += ((c.to_ascii_uppercase() - b'A') as u32 + 1) * pow;
                pow *= 26;
            }
            _ => return Err(XlsxError::Alphanumeric(*c)),
        }
    }
    let row = row
        .checked_sub(1)
        .ok_or(XlsxError::RangeWithoutRowComponent)?;
    let col = col
        .checked_sub(1)
        .ok_or(XlsxError::RangeWithoutColumnComponent)?;
    Ok((row, col))
}

/// Convert the integer to Excelsheet column title.
/// If the column number not in 1~16384, an Error is returned.
pub(crate) fn column_number_to_name(num: u32) -> Result<Vec<u8>, XlsxError> {
    if num >= MAX_COLUMNS {
        return Err(XlsxError::Unexpected("column number overflow"));
    }
    let mut col: Vec<u8> = Vec::new();
    let mut num = num + 1;
    while num > 0 {
        let integer = ((num - 1) % 26 + 65) as u8;
        col.push(integer);
        num = (num - 1) / 26;
    }
    col.reverse();
    Ok(col)
}

/// Convert a cell coordinate to Excelsheet cell name.
/// If the column number not in 1~16384, an Error is returned.
pub(crate) fn coordinate_to_name(cell: (u32, u32)) -> Result<Vec<u8>, XlsxError> {
    let cell = &[
        column_number_to_name(cell.1)?,
        (cell.0 + 1).to_string().into_bytes(),
    ];
    Ok(cell.concat())
}
