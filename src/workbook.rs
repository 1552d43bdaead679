// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! In-memory workbook model the pivot tables are rebuilt onto

use std::collections::BTreeMap;

use crate::pivot::{PivotCaches, PivotTable};
use crate::style::DifferentialFormat;
use crate::xlsx::{get_dimension, split_sheet_reference};
use crate::{Data, DataType, Dimensions};

/// A table (list object) of a worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    sheet_name: String,
    dimensions: Dimensions,
    columns: Vec<String>,
}

impl Table {
    /// Creates a new table covering `dimensions`, header row included
    pub fn new(
        name: impl Into<String>,
        sheet_name: impl Into<String>,
        dimensions: Dimensions,
        columns: Vec<String>,
    ) -> Self {
        Table {
            name: name.into(),
            sheet_name: sheet_name.into(),
            dimensions,
            columns,
        }
    }
    /// Get the name of the table
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Get the name of the sheet that holds the table
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }
    /// Get the area of the table
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
    /// Get a vector of column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// A worksheet: sparse cells, tables and pivot tables
#[derive(Debug, Default)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<(u32, u32), Data>,
    tables: Vec<Table>,
    pivot_tables: Vec<PivotTable>,
}

impl Worksheet {
    /// Creates an empty worksheet
    pub fn new(name: impl Into<String>) -> Self {
        Worksheet {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Worksheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the value at 0-based `(row, column)`, an empty value removes the cell
    pub fn set_value<T: Into<Data>>(&mut self, pos: (u32, u32), value: T) {
        match value.into() {
            Data::Empty => {
                self.cells.remove(&pos);
            }
            v => {
                self.cells.insert(pos, v);
            }
        }
    }

    /// Gets the value at 0-based `(row, column)`
    pub fn get_value(&self, pos: (u32, u32)) -> Option<&Data> {
        self.cells.get(&pos)
    }

    /// Removes every cell within `dimensions`
    pub fn clear(&mut self, dimensions: &Dimensions) {
        self.cells
            .retain(|&(row, col), _| !dimensions.contains(row, col));
    }

    /// Iterates over non empty cells in row major order
    pub fn used_cells(&self) -> impl Iterator<Item = ((u32, u32), &Data)> {
        self.cells.iter().map(|(pos, v)| (*pos, v))
    }

    /// Non empty cells of column `col` between rows `rows.0` and `rows.1`, top to bottom
    pub fn column_values(&self, col: u32, rows: (u32, u32)) -> impl Iterator<Item = &Data> {
        let (first, last) = (rows.0.min(rows.1), rows.0.max(rows.1));
        self.cells
            .range((first, col)..=(last, col))
            .filter(move |((_, c), v)| *c == col && !v.is_empty())
            .map(|(_, v)| v)
    }

    /// Adds a table to the worksheet
    pub fn add_table(
        &mut self,
        name: impl Into<String>,
        dimensions: Dimensions,
        columns: Vec<String>,
    ) -> &Table {
        let table = Table::new(name, self.name.clone(), dimensions, columns);
        self.tables.push(table);
        &self.tables[self.tables.len() - 1]
    }

    /// Tables of the worksheet
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Pivot tables of the worksheet
    pub fn pivot_tables(&self) -> &[PivotTable] {
        &self.pivot_tables
    }

    /// Gets a pivot table by name
    pub fn pivot_table(&self, name: &str) -> Option<&PivotTable> {
        self.pivot_tables.iter().find(|t| t.name() == name)
    }

    pub(crate) fn add_pivot_table(&mut self, table: PivotTable) {
        self.pivot_tables.push(table);
    }
}

/// Workbook model: worksheets, defined names, differential formats and pivot caches
#[derive(Debug, Default)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    defined_names: Vec<(String, String)>,
    dxf_formats: Vec<DifferentialFormat>,
    pivot_caches: PivotCaches,
}

impl Workbook {
    /// Creates an empty workbook
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a worksheet, or returns the existing one with the same name
    pub fn add_worksheet(&mut self, name: &str) -> &mut Worksheet {
        let idx = match self.sheet_index(name) {
            Some(i) => i,
            None => {
                self.sheets.push(Worksheet::new(name));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[idx]
    }

    fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name.to_lowercase() == name.to_lowercase())
    }

    /// Gets a worksheet by name, sheet names are case insensitive
    pub fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index(name).map(|i| &self.sheets[i])
    }

    /// Gets a mutable worksheet by name
    pub fn worksheet_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheet_index(name).map(move |i| &mut self.sheets[i])
    }

    /// All worksheets, in workbook order
    pub fn worksheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    /// Get all sheet names of this workbook, in workbook order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }

    /// Adds a workbook scoped defined name, e.g. `("SalesData", "Data!$A$1:$C$10")`
    pub fn add_defined_name(&mut self, name: impl Into<String>, formula: impl Into<String>) {
        self.defined_names.push((name.into(), formula.into()));
    }

    /// Get all defined names (Ranges names etc)
    pub fn defined_names(&self) -> &[(String, String)] {
        &self.defined_names
    }

    /// Finds a table by name across all worksheets
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.sheets
            .iter()
            .flat_map(|s| s.tables.iter())
            .find(|t| t.name == name)
    }

    /// Resolves a sheet qualified address (`Sheet1!A1:B2`, `'My Sheet'!$A$1`)
    /// or a defined name into its sheet and area
    ///
    /// Returns `None` when the sheet does not exist or the name does not point
    /// to a single area.
    pub fn range(&self, reference: &str) -> Option<(String, Dimensions)> {
        let reference = reference.trim().trim_start_matches('=');
        if let (Some(sheet), address) = split_sheet_reference(reference) {
            let sheet = self.worksheet(&sheet)?;
            let dimensions = get_dimension(address.as_bytes()).ok()?;
            return Some((sheet.name.clone(), dimensions));
        }
        let (_, formula) = self
            .defined_names
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(reference))?;
        let formula = formula.trim().trim_start_matches('=');
        match split_sheet_reference(formula) {
            (Some(_), _) => self.range(formula),
            (None, _) => None,
        }
    }

    /// Replaces the differential formats table (`<dxfs>` of the styles part)
    pub fn set_dxf_formats(&mut self, formats: Vec<DifferentialFormat>) {
        self.dxf_formats = formats;
    }

    /// Gets a differential format by its id
    pub fn dxf_format(&self, id: u32) -> Option<&DifferentialFormat> {
        self.dxf_formats.get(id as usize)
    }

    /// All differential formats
    pub fn dxf_formats(&self) -> &[DifferentialFormat] {
        &self.dxf_formats
    }

    /// Pivot caches of the workbook
    pub fn pivot_caches(&self) -> &PivotCaches {
        &self.pivot_caches
    }

    pub(crate) fn pivot_caches_mut(&mut self) -> &mut PivotCaches {
        &mut self.pivot_caches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        let data = wb.add_worksheet("Data");
        data.set_value((0, 0), "Region");
        data.set_value((0, 1), "Sales");
        data.set_value((1, 0), "North");
        data.set_value((1, 1), 10.0);
        data.add_table(
            "SalesTable",
            Dimensions::new((0, 0), (1, 1)),
            vec!["Region".to_string(), "Sales".to_string()],
        );
        wb.add_worksheet("My Sheet");
        wb.add_defined_name("SalesRange", "Data!$A$1:$B$2");
        wb.add_defined_name("Constant", "42");
        wb
    }

    #[test]
    fn sheet_lookup_is_case_insensitive() {
        let wb = workbook();
        assert_eq!(wb.worksheet("data").map(|s| s.name()), Some("Data"));
        assert!(wb.worksheet("Missing").is_none());
        assert_eq!(wb.sheet_names(), vec!["Data", "My Sheet"]);
    }

    #[test]
    fn resolve_ranges() {
        let wb = workbook();
        assert_eq!(
            wb.range("Data!A1:B2"),
            Some(("Data".to_string(), Dimensions::new((0, 0), (1, 1))))
        );
        assert_eq!(
            wb.range("'My Sheet'!$A$1:$C$10"),
            Some(("My Sheet".to_string(), Dimensions::new((0, 0), (9, 2))))
        );
        assert_eq!(
            wb.range("SalesRange"),
            Some(("Data".to_string(), Dimensions::new((0, 0), (1, 1))))
        );
        assert_eq!(wb.range("Constant"), None);
        assert_eq!(wb.range("Deleted!A1:B2"), None);
        assert_eq!(wb.range("Unknown"), None);
    }

    #[test]
    fn cells() {
        let mut wb = workbook();
        let data = wb.worksheet_mut("Data").unwrap();
        data.set_value((2, 0), "South");
        data.set_value((3, 0), "North");
        let values: Vec<_> = data.column_values(0, (1, 10)).cloned().collect();
        assert_eq!(
            values,
            vec![
                Data::from("North"),
                Data::from("South"),
                Data::from("North")
            ]
        );
        data.clear(&Dimensions::new((2, 0), (3, 5)));
        assert!(data.get_value((2, 0)).is_none());
        assert_eq!(data.get_value((1, 1)), Some(&Data::Float(10.0)));
        data.set_value((1, 1), Data::Empty);
        assert!(data.get_value((1, 1)).is_none());
    }

    #[test]
    fn tables() {
        let wb = workbook();
        let t = wb.table("SalesTable").unwrap();
        assert_eq!(t.sheet_name(), "Data");
        assert_eq!(t.columns().len(), 2);
        assert!(wb.table("salestable").is_none());
    }
}
