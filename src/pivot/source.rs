// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::fmt;

use log::{debug, warn};

use crate::pivot::definition::{CacheDefinition, CacheSource};
use crate::pivot::PivotError;
use crate::xlsx::get_dimension;
use crate::{Dimensions, Workbook};

/// The data a pivot cache reads from
///
/// Two references are equal when they point to the same area of the same
/// sheet, or to the same table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PivotSourceReference {
    /// A plain area of a worksheet
    Range {
        /// Worksheet name
        sheet: String,
        /// Area, header row included
        dimensions: Dimensions,
    },
    /// A table (list object)
    Table {
        /// Table name
        name: String,
        /// Worksheet holding the table
        sheet: String,
        /// Area of the table, header row included
        dimensions: Dimensions,
    },
}

impl PivotSourceReference {
    /// Name of the worksheet holding the source data
    pub fn sheet_name(&self) -> &str {
        match self {
            PivotSourceReference::Range { sheet, .. }
            | PivotSourceReference::Table { sheet, .. } => sheet,
        }
    }

    /// Area holding the source data, header row included
    pub fn dimensions(&self) -> Dimensions {
        match self {
            PivotSourceReference::Range { dimensions, .. }
            | PivotSourceReference::Table { dimensions, .. } => *dimensions,
        }
    }
}

impl fmt::Display for PivotSourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PivotSourceReference::Range { sheet, dimensions } => {
                write!(f, "'{}'!{dimensions}", sheet.replace('\'', "''"))
            }
            PivotSourceReference::Table { name, .. } => f.write_str(name),
        }
    }
}

/// Resolves the source of a cache definition against the workbook
///
/// `Ok(None)` means the source is not supported (external workbook, non
/// worksheet source, deleted sheet, unknown name) and the cache should be
/// skipped.
pub fn resolve_source(
    definition: &CacheDefinition,
    workbook: &Workbook,
) -> Result<Option<PivotSourceReference>, PivotError> {
    let source = match &definition.source {
        CacheSource::Worksheet(source) => source,
        CacheSource::Other(kind) => {
            warn!("unsupported '{kind}' pivot cache source");
            return Ok(None);
        }
    };

    if let Some(id) = source.id.as_deref().filter(|id| !id.is_empty()) {
        if definition.external_relationships.iter().any(|r| r == id) {
            debug!("pivot cache source '{id}' is external");
            return Ok(None);
        }
    }

    if let Some(name) = &source.name {
        if let Some(table) = workbook.table(name) {
            return Ok(Some(PivotSourceReference::Table {
                name: table.name().to_string(),
                sheet: table.sheet_name().to_string(),
                dimensions: table.dimensions(),
            }));
        }
        return match workbook.range(name) {
            Some((sheet, dimensions)) => Ok(Some(PivotSourceReference::Range { sheet, dimensions })),
            None => {
                warn!("pivot cache source name '{name}' matches no table nor range");
                Ok(None)
            }
        };
    }

    if let (Some(sheet), Some(reference)) = (&source.sheet, &source.reference) {
        let Some(worksheet) = workbook.worksheet(sheet) else {
            warn!("pivot cache source sheet '{sheet}' does not exist");
            return Ok(None);
        };
        let dimensions = get_dimension(reference.as_bytes())
            .map_err(|_| PivotError::InvalidReference(reference.clone()))?;
        return Ok(Some(PivotSourceReference::Range {
            sheet: worksheet.name().to_string(),
            dimensions,
        }));
    }

    Err(PivotError::UnknownSourceKind)
}
