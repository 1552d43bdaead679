// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::io::{Read, Seek};

use log::{debug, warn};
use zip::ZipArchive;

use crate::pivot::builder::attach_table;
use crate::pivot::cache::build_cache_with;
use crate::xlsx::{get_dimension, PivotPackage, TablePart};
use crate::{Error, Workbook};

/// Options of [`load_pivot_tables`]
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    clear_target_ranges: bool,
    skip_records: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            clear_target_ranges: true,
            skip_records: false,
        }
    }
}

impl LoadOptions {
    /// Clears the cells under the persisted location of each table before
    /// attaching it (default `true`)
    pub fn with_clear_target_ranges(mut self, clear: bool) -> Self {
        self.clear_target_ranges = clear;
        self
    }

    /// Ignores the records of the pivot caches (default `false`)
    pub fn with_skip_records(mut self, skip: bool) -> Self {
        self.skip_records = skip;
        self
    }

    /// Are target ranges cleared
    pub fn clear_target_ranges(&self) -> bool {
        self.clear_target_ranges
    }

    /// Are cache records ignored
    pub fn skip_records(&self) -> bool {
        self.skip_records
    }
}

/// Loads the pivot caches and pivot tables of `package` into `workbook`
///
/// Every cache is built before any table is attached, tables can then
/// bind to a cache whatever the sheet it was defined for. A fatal error
/// is reported with the path of the part being loaded.
pub fn load_pivot_tables(
    workbook: &mut Workbook,
    package: &PivotPackage,
    options: &LoadOptions,
) -> Result<(), Error> {
    if !package.dxfs.is_empty() {
        workbook.set_dxf_formats(package.dxfs.clone());
    }

    for part in &package.caches {
        let built = build_cache_with(&part.definition, workbook, !options.skip_records).map_err(
            |error| Error::Part {
                part: part.path.clone(),
                error,
            },
        )?;
        let Some(cache) = built else {
            warn!("pivot cache '{}' skipped, its source is not supported", part.path);
            continue;
        };
        cache.set_link_token(&part.token);
        let cache = workbook.pivot_caches_mut().add(cache);
        debug!(
            "pivot cache {} built from '{}' ({} fields)",
            cache.id(),
            part.path,
            cache.fields().len()
        );
    }
    debug!("{} pivot caches built", workbook.pivot_caches().len());

    for sheet in &package.sheets {
        if sheet.tables.is_empty() {
            continue;
        }
        if workbook.worksheet(&sheet.name).is_none() {
            warn!(
                "worksheet '{}' not found, {} pivot tables skipped",
                sheet.name,
                sheet.tables.len()
            );
            continue;
        }
        for part in &sheet.tables {
            if options.clear_target_ranges {
                clear_location(workbook, &sheet.name, part);
            }
            let table = attach_table(workbook, &sheet.name, part).map_err(|error| Error::Part {
                part: part.path.clone(),
                error,
            })?;
            if let (Some(table), Some(ws)) = (table, workbook.worksheet_mut(&sheet.name)) {
                ws.add_pivot_table(table);
            }
        }
    }
    Ok(())
}

fn clear_location(workbook: &mut Workbook, sheet: &str, part: &TablePart) {
    let Some(location) = &part.definition.location else {
        return;
    };
    // an invalid location is reported when the table is attached
    let (Ok(dimensions), Some(ws)) = (
        get_dimension(location.reference.as_bytes()),
        workbook.worksheet_mut(sheet),
    ) else {
        return;
    };
    ws.clear(&dimensions);
}

/// Reads the pivot parts of an xlsx archive and loads them into `workbook`
///
/// The workbook must already hold the worksheets and the source data.
pub fn open_pivot_tables<RS: Read + Seek>(reader: RS, workbook: &mut Workbook) -> Result<(), Error> {
    open_pivot_tables_with_options(reader, workbook, &LoadOptions::default())
}

/// Same as [`open_pivot_tables`], with explicit options
pub fn open_pivot_tables_with_options<RS: Read + Seek>(
    reader: RS,
    workbook: &mut Workbook,
    options: &LoadOptions,
) -> Result<(), Error> {
    let mut zip = ZipArchive::new(reader).map_err(crate::XlsxError::Zip)?;
    let package = PivotPackage::from_zip(&mut zip)?;
    load_pivot_tables(workbook, &package, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::definition::{
        CacheDefinition, CacheFieldDefinition, CacheItem, CacheSource, Location, RecordItem,
        TableDefinition, WorksheetSource,
    };
    use crate::xlsx::{CachePart, SheetPivots};
    use crate::Data;

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        let data = wb.add_worksheet("Data");
        data.set_value((0, 0), "Region");
        data.set_value((0, 1), "Sales");
        data.set_value((1, 0), "North");
        data.set_value((1, 1), 10.0);
        let report = wb.add_worksheet("Report");
        report.set_value((2, 0), "stale");
        wb
    }

    fn cache_definition(sheet: &str) -> CacheDefinition {
        CacheDefinition {
            source: CacheSource::Worksheet(WorksheetSource {
                sheet: Some(sheet.into()),
                reference: Some("A1:B2".into()),
                ..Default::default()
            }),
            fields: vec![
                CacheFieldDefinition {
                    name: "Region".into(),
                    ..Default::default()
                },
                CacheFieldDefinition {
                    name: "Sales".into(),
                    ..Default::default()
                },
            ],
            records: Some(vec![vec![
                RecordItem::Value(CacheItem::String("North".into())),
                RecordItem::Value(CacheItem::Number(10.0)),
            ]]),
            ..Default::default()
        }
    }

    fn package(sheet: &str) -> PivotPackage {
        let definition = cache_definition("Data");
        PivotPackage {
            caches: vec![CachePart {
                token: "rId5".into(),
                cache_id: Some(1),
                path: "xl/pivotCache/pivotCacheDefinition1.xml".into(),
                definition: definition.clone(),
            }],
            sheets: vec![SheetPivots {
                name: sheet.into(),
                tables: vec![TablePart {
                    path: "xl/pivotTables/pivotTable1.xml".into(),
                    definition: TableDefinition {
                        name: "PivotTable1".into(),
                        location: Some(Location {
                            reference: "A3:B5".into(),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                    cache_token: Some("rId5".into()),
                    cache_definition: Some(definition),
                }],
            }],
            dxfs: Vec::new(),
        }
    }

    #[test]
    fn two_phases() {
        let mut wb = workbook();
        load_pivot_tables(&mut wb, &package("Report"), &LoadOptions::default()).unwrap();

        assert_eq!(wb.pivot_caches().len(), 1);
        let cache = wb.pivot_caches().iter().next().unwrap();
        assert_eq!(cache.link_token(), Some("rId5"));
        assert!(cache.records().is_some());

        let report = wb.worksheet("Report").unwrap();
        let table = report.pivot_table("PivotTable1").unwrap();
        assert_eq!(table.target_cell(), (2, 0));
        assert!(std::sync::Arc::ptr_eq(table.cache(), cache));
        assert_eq!(report.get_value((2, 0)), None);
    }

    #[test]
    fn keep_target_and_skip_records() {
        let mut wb = workbook();
        let options = LoadOptions::default()
            .with_clear_target_ranges(false)
            .with_skip_records(true);
        load_pivot_tables(&mut wb, &package("Report"), &options).unwrap();

        let cache = wb.pivot_caches().iter().next().unwrap();
        assert!(cache.records().is_none());
        let report = wb.worksheet("Report").unwrap();
        assert_eq!(report.get_value((2, 0)), Some(&Data::String("stale".into())));
    }

    #[test]
    fn missing_worksheet() {
        let mut wb = workbook();
        load_pivot_tables(&mut wb, &package("Gone"), &LoadOptions::default()).unwrap();
        assert_eq!(wb.pivot_caches().len(), 1);
        assert!(wb.worksheets().iter().all(|ws| ws.pivot_tables().is_empty()));
    }

    #[test]
    fn fatal_error_names_the_part() {
        let mut wb = workbook();
        let mut package = package("Report");
        package.caches[0].definition.records = Some(vec![vec![RecordItem::Value(
            CacheItem::Error("#N/A".into()),
        )]]);
        let err = load_pivot_tables(&mut wb, &package, &LoadOptions::default()).unwrap_err();
        match err {
            Error::Part { part, .. } => assert_eq!(part, "xl/pivotCache/pivotCacheDefinition1.xml"),
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn unsupported_source_is_skipped() {
        let mut wb = workbook();
        let mut package = package("Report");
        package.caches[0].definition = cache_definition("Deleted");
        load_pivot_tables(&mut wb, &package, &LoadOptions::default()).unwrap();
        assert!(wb.pivot_caches().is_empty());
    }
}
