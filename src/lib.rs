// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Rust pivot table reader for Excel workbooks
//!
//! # Status
//!
//! **xlpivot** rebuilds the pivot caches and pivot tables stored in an xlsx
//! package on top of an in-memory [`Workbook`].
//!
//! Loading happens in two phases: every pivot cache of the document is
//! built first, then each worksheet's pivot tables are attached to them.
//! Tables whose cache link is missing are matched against a cache reading
//! the same source range.
//!
//! # Examples
//! ```no_run
//! use xlpivot::{open_pivot_tables, Workbook};
//! use std::fs::File;
//!
//! // the workbook model must already hold the source data
//! let mut workbook = Workbook::new();
//! let sheet = workbook.add_worksheet("Data");
//! sheet.set_value((0, 0), "Region");
//! sheet.set_value((0, 1), "Sales");
//! sheet.set_value((1, 0), "North");
//! sheet.set_value((1, 1), 100.0);
//! workbook.add_worksheet("Report");
//!
//! let file = File::open("report.xlsx").expect("Cannot open file");
//! open_pivot_tables(file, &mut workbook).expect("Cannot load pivot tables");
//!
//! for cache in workbook.pivot_caches().iter() {
//!     println!("cache {} has fields {:?}", cache.id(), cache.field_names());
//! }
//! if let Some(report) = workbook.worksheet("Report") {
//!     for table in report.pivot_tables() {
//!         println!("{} anchored at {:?}", table.name(), table.target_cell());
//!     }
//! }
//! ```
#![deny(missing_docs)]

#[macro_use]
mod utils;

mod datatype;
mod errors;
pub mod pivot;
mod style;
mod workbook;
pub mod xlsx;

use std::fmt;

pub use crate::datatype::{Data, DataType};
pub use crate::errors::Error;
pub use crate::pivot::{
    attach_table, build_cache, load_pivot_tables, open_pivot_tables,
    open_pivot_tables_with_options, resolve_source, AggregationFunction, CachedField,
    CalculationKind, DataValuesFormat, FieldPredicate, FieldStyleFormats, FilterAreaOrder,
    GrandTotalFormats, LayoutOptions, LoadOptions, Narrowing, PivotCache, PivotCaches,
    PivotError, PivotField, PivotFieldOptions, PivotFilterField, PivotSourceReference,
    PivotStyleFormat, PivotTable, PivotValue, RetainPolicy, StyleFormatElement,
    StyleFormatTree, SubtotalFunction, SubtotalPolicy,
};
pub use crate::style::{
    Color, DifferentialAlignment, DifferentialBorder, DifferentialBorderSide, DifferentialFill,
    DifferentialFont, DifferentialFormat, DifferentialNumberFormat, DifferentialProtection, Style,
};
pub use crate::workbook::{Table, Workbook, Worksheet};
pub use crate::xlsx::{CachePart, PivotPackage, SheetPivots, TablePart, XlsxError};

/// An enum to represent all different errors that can appear as
/// a value in a worksheet cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellErrorType {
    /// Division by 0 error
    Div0,
    /// Unavailable value error
    NA,
    /// Invalid name error
    Name,
    /// Null value error
    Null,
    /// Number error
    Num,
    /// Invalid cell reference error
    Ref,
    /// Value error
    Value,
    /// Getting data
    GettingData,
}

impl fmt::Display for CellErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match *self {
            CellErrorType::Div0 => write!(f, "#DIV/0!"),
            CellErrorType::NA => write!(f, "#N/A"),
            CellErrorType::Name => write!(f, "#NAME?"),
            CellErrorType::Null => write!(f, "#NULL!"),
            CellErrorType::Num => write!(f, "#NUM!"),
            CellErrorType::Ref => write!(f, "#REF!"),
            CellErrorType::Value => write!(f, "#VALUE!"),
            CellErrorType::GettingData => write!(f, "#GETTING_DATA"),
        }
    }
}

/// A rectangular area of a worksheet
///
/// Both corners are inclusive and 0-based `(row, column)`.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct Dimensions {
    /// start: (row, col)
    pub start: (u32, u32),
    /// end: (row, col)
    pub end: (u32, u32),
}

#[allow(clippy::len_without_is_empty)]
impl Dimensions {
    /// create dimensions info with start position and end position
    pub fn new(start: (u32, u32), end: (u32, u32)) -> Self {
        Self { start, end }
    }

    /// check if a position is in it
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.start.0 && row <= self.end.0 && col >= self.start.1 && col <= self.end.1
    }

    /// len
    pub fn len(&self) -> u64 {
        self.height() * self.width()
    }

    /// number of rows
    pub fn height(&self) -> u64 {
        (self.end.0 as u64 + 1).saturating_sub(self.start.0 as u64)
    }

    /// number of columns
    pub fn width(&self) -> u64 {
        (self.end.1 as u64 + 1).saturating_sub(self.start.1 as u64)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = xlsx::coordinate_to_name(self.start).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&start))?;
        if self.start != self.end {
            let end = xlsx::coordinate_to_name(self.end).map_err(|_| fmt::Error)?;
            write!(f, ":{}", String::from_utf8_lossy(&end))?;
        }
        Ok(())
    }
}
