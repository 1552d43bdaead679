// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Discovery of the pivot parts of an xlsx package
//!
//! Parts are found by following relationships, starting from the package
//! root: workbook, then its pivot caches and worksheets, then the pivot
//! tables of each worksheet.

use std::io::{Read, Seek};

use log::{debug, warn};
use quick_xml::events::Event;
use zip::read::ZipArchive;

use crate::pivot::definition::{CacheDefinition, TableDefinition};
use crate::style::DifferentialFormat;
use crate::xlsx::pivot_parser::{parse_cache_definition, parse_cache_records, parse_table_definition};
use crate::xlsx::styles::parse_styles;
use crate::xlsx::{read_relationships, xml_reader, Relationship, XlsxError};

/// A `pivotCacheDefinition` part with its records
#[derive(Debug, Clone)]
pub struct CachePart {
    /// Workbook relationship id of the part, the link tables refer to
    pub token: String,
    /// `cacheId` of the workbook `pivotCache` element
    pub cache_id: Option<u32>,
    /// Path of the part inside the package
    pub path: String,
    /// The parsed definition, records included
    pub definition: CacheDefinition,
}

/// A `pivotTableDefinition` part
#[derive(Debug, Clone)]
pub struct TablePart {
    /// Path of the part inside the package
    pub path: String,
    /// The parsed definition
    pub definition: TableDefinition,
    /// Token of the cache the table is linked to, if the link could be followed
    pub cache_token: Option<String>,
    /// Definition of the linked cache
    pub cache_definition: Option<CacheDefinition>,
}

/// Pivot tables of a worksheet, in relationship order
#[derive(Debug, Clone)]
pub struct SheetPivots {
    /// Worksheet name
    pub name: String,
    /// The pivot table parts
    pub tables: Vec<TablePart>,
}

/// All the pivot parts of a package
#[derive(Debug, Clone, Default)]
pub struct PivotPackage {
    /// Pivot caches, in workbook order
    pub caches: Vec<CachePart>,
    /// Worksheets, in workbook order
    pub sheets: Vec<SheetPivots>,
    /// Differential formats of the styles part
    pub dxfs: Vec<DifferentialFormat>,
}

/// `sheet` or `pivotCache` element of the workbook part
struct WorkbookEntry {
    name: String,
    cache_id: Option<u32>,
    rel_id: String,
}

#[derive(Default)]
struct WorkbookPart {
    sheets: Vec<WorkbookEntry>,
    caches: Vec<WorkbookEntry>,
}

impl PivotPackage {
    /// Reads the pivot parts of an xlsx archive
    pub fn from_zip<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Self, XlsxError> {
        let workbook_path = read_relationships(zip, "")?
            .into_iter()
            .find(|r| r.is("officeDocument"))
            .map_or_else(|| "xl/workbook.xml".to_string(), |r| r.target);
        let relationships = read_relationships(zip, &workbook_path)?;
        let workbook = read_workbook(zip, &workbook_path)?;

        let mut package = PivotPackage::default();
        for entry in &workbook.caches {
            let Some(rel) = find_relationship(&relationships, &entry.rel_id) else {
                warn!("pivot cache {:?} has no relationship '{}'", entry.cache_id, entry.rel_id);
                continue;
            };
            let Some(definition) = read_cache_part(zip, &rel.target)? else {
                warn!("pivot cache part '{}' not found", rel.target);
                continue;
            };
            package.caches.push(CachePart {
                token: rel.id.clone(),
                cache_id: entry.cache_id,
                path: rel.target.clone(),
                definition,
            });
        }

        if let Some(rel) = relationships.iter().find(|r| r.is("styles")) {
            if let Some(xml) = xml_reader(zip, &rel.target) {
                package.dxfs = parse_styles(&mut xml?)?;
            }
        }

        for entry in &workbook.sheets {
            let Some(rel) = find_relationship(&relationships, &entry.rel_id) else {
                warn!("sheet '{}' has no relationship '{}'", entry.name, entry.rel_id);
                continue;
            };
            let mut tables = Vec::new();
            for table_rel in read_relationships(zip, &rel.target)?
                .into_iter()
                .filter(|r| r.is("pivotTable") && !r.external)
            {
                let definition = match xml_reader(zip, &table_rel.target) {
                    None => {
                        warn!("pivot table part '{}' not found", table_rel.target);
                        continue;
                    }
                    Some(xml) => parse_table_definition(&mut xml?)?,
                };
                let part = link_table(zip, &package.caches, table_rel.target, definition)?;
                tables.push(part);
            }
            package.sheets.push(SheetPivots {
                name: entry.name.clone(),
                tables,
            });
        }
        debug!(
            "found {} pivot caches and {} pivot tables",
            package.caches.len(),
            package.sheets.iter().map(|s| s.tables.len()).sum::<usize>()
        );
        Ok(package)
    }
}

fn find_relationship<'a>(relationships: &'a [Relationship], id: &str) -> Option<&'a Relationship> {
    relationships.iter().find(|r| r.id == id)
}

/// Binds a table part to its cache through the table's own relationships,
/// falling back to the `cacheId` of the workbook
fn link_table<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    caches: &[CachePart],
    path: String,
    definition: TableDefinition,
) -> Result<TablePart, XlsxError> {
    let cache_path = read_relationships(zip, &path)?
        .into_iter()
        .find(|r| r.is("pivotCacheDefinition"))
        .map(|r| r.target);
    let linked = match &cache_path {
        Some(p) => caches.iter().find(|c| c.path.eq_ignore_ascii_case(p)),
        None => None,
    }
    .or_else(|| {
        let id = definition.cache_id?;
        caches.iter().find(|c| c.cache_id == Some(id))
    });
    let (cache_token, cache_definition) = match (linked, cache_path) {
        (Some(c), _) => (Some(c.token.clone()), Some(c.definition.clone())),
        // a cache part which the workbook does not list
        (None, Some(p)) => (None, read_cache_part(zip, &p)?),
        (None, None) => (None, None),
    };
    Ok(TablePart {
        path,
        definition,
        cache_token,
        cache_definition,
    })
}

/// Reads a cache definition, its records and its external relationships
fn read_cache_part<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
) -> Result<Option<CacheDefinition>, XlsxError> {
    let mut definition = match xml_reader(zip, path) {
        None => return Ok(None),
        Some(xml) => parse_cache_definition(&mut xml?)?,
    };
    for rel in read_relationships(zip, path)? {
        if rel.external {
            definition.external_relationships.push(rel.id);
        } else if rel.is("pivotCacheRecords") {
            match xml_reader(zip, &rel.target) {
                None => warn!("pivot cache records part '{}' not found", rel.target),
                Some(xml) => definition.records = Some(parse_cache_records(&mut xml?)?),
            }
        }
    }
    Ok(Some(definition))
}

fn read_workbook<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
) -> Result<WorkbookPart, XlsxError> {
    let mut xml = match xml_reader(zip, path) {
        None => return Err(XlsxError::FileNotFound(path.to_string())),
        Some(x) => x?,
    };
    let mut workbook = WorkbookPart::default();
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e))
                if matches!(e.local_name().as_ref(), b"sheet" | b"pivotCache") =>
            {
                let mut entry = WorkbookEntry {
                    name: String::new(),
                    cache_id: None,
                    rel_id: String::new(),
                };
                for a in e.attributes() {
                    let a = a.map_err(XlsxError::XmlAttr)?;
                    match a.key.local_name().as_ref() {
                        b"name" => {
                            entry.name = a.decode_and_unescape_value(xml.decoder())?.into_owned()
                        }
                        b"cacheId" => entry.cache_id = atoi_simd::parse::<u32>(&a.value).ok(),
                        b"id" => entry.rel_id = xml.decoder().decode(&a.value)?.into_owned(),
                        _ => (),
                    }
                }
                if e.local_name().as_ref() == b"sheet" {
                    workbook.sheets.push(entry);
                } else {
                    workbook.caches.push(entry);
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"workbook" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("workbook")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(workbook)
}
