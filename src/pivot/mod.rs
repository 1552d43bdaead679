// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Pivot caches and pivot tables
//!
//! - [`definition`] holds the descriptors read from the package parts
//! - [`build_cache`] turns a cache definition into a [`PivotCache`]
//! - [`attach_table`] binds a table definition to one of the workbook caches
//! - [`load_pivot_tables`] runs both phases over a whole [`PivotPackage`]
//!
//! [`PivotPackage`]: crate::PivotPackage

mod builder;
mod cache;
pub mod definition;
mod loader;
mod source;
mod style_format;
mod style_resolver;
mod table;

pub use builder::attach_table;
pub use cache::{build_cache, CachedField, PivotCache, PivotCaches, RetainPolicy};
pub use loader::{load_pivot_tables, open_pivot_tables, open_pivot_tables_with_options, LoadOptions};
pub use source::{resolve_source, PivotSourceReference};
pub use style_format::{
    DataValuesFormat, FieldPredicate, FieldStyleFormats, GrandTotalFormats, Narrowing,
    PivotStyleFormat, StyleFormatElement, StyleFormatTree,
};
pub use table::{
    AggregationFunction, CalculationKind, FilterAreaOrder, LayoutOptions, PivotField,
    PivotFieldOptions, PivotFilterField, PivotTable, PivotValue, SubtotalFunction,
    SubtotalPolicy,
};

/// Fatal errors of pivot loading
#[derive(Debug)]
pub enum PivotError {
    /// A shared item carries an error code which is not a known cell error
    UnknownErrorCode(String),
    /// A cache record holds an error item, which is not supported
    ErrorInRecord {
        /// 0-based record index
        record: usize,
        /// 0-based field position in the cache definition
        field: usize,
    },
    /// A worksheet source with neither a name nor a sheet and a reference
    UnknownSourceKind,
    /// A worksheet source reference which is not a cell area
    InvalidReference(String),
    /// A pivot area with both `dataOnly` and `labelOnly` set
    ConflictingAreaFlags {
        /// 0-based index of the format in the table definition
        area: usize,
    },
    /// A format pointing to a differential format which does not exist
    MissingDifferentialFormat(u32),
}

impl std::fmt::Display for PivotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PivotError::UnknownErrorCode(e) => write!(f, "Unknown error code '{e}'"),
            PivotError::ErrorInRecord { record, field } => write!(
                f,
                "Error items are not supported in cache records (record {record}, field {field})"
            ),
            PivotError::UnknownSourceKind => write!(f, "Unknown worksheet source kind"),
            PivotError::InvalidReference(r) => write!(f, "Invalid source reference '{r}'"),
            PivotError::ConflictingAreaFlags { area } => write!(
                f,
                "Cannot have dataOnly and labelOnly both set to true (format {area})"
            ),
            PivotError::MissingDifferentialFormat(id) => {
                write!(f, "Differential format {id} not found")
            }
        }
    }
}

impl std::error::Error for PivotError {}
