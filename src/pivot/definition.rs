// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Persisted pivot descriptors
//!
//! Plain data mirroring the `pivotCacheDefinition`, `pivotCacheRecords` and
//! `pivotTableDefinition` parts. Attributes which are optional in the file
//! stay `Option` here so that builders only overwrite model defaults with
//! values the document actually carries.

use crate::pivot::table::{AggregationFunction, CalculationKind};

/// Field index used by row, column and data references for the values axis
pub const VALUES_FIELD_INDEX: i32 = -2;

/// A `pivotCacheDefinition` part
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheDefinition {
    /// Where the cache reads its data from
    pub source: CacheSource,
    /// Ids of the relationships of this part which target external resources
    pub external_relationships: Vec<String>,
    /// `missingItemsLimit`
    pub missing_items_limit: Option<u32>,
    /// `saveData`
    pub save_data: Option<bool>,
    /// `refreshOnLoad`
    pub refresh_on_load: Option<bool>,
    /// `cacheField` elements in document order
    pub fields: Vec<CacheFieldDefinition>,
    /// Rows of the associated `pivotCacheRecords` part, if any
    pub records: Option<Vec<Vec<RecordItem>>>,
}

/// `cacheSource` of a cache definition
#[derive(Debug, Clone, PartialEq)]
pub enum CacheSource {
    /// A `worksheetSource`
    Worksheet(WorksheetSource),
    /// Any other source (`external`, `consolidation`, `scenario`), by type
    Other(String),
}

impl Default for CacheSource {
    fn default() -> Self {
        CacheSource::Other("worksheet".to_string())
    }
}

/// `worksheetSource` element
///
/// Either `name` (a table or a defined name) or `sheet` and `reference`
/// are expected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorksheetSource {
    /// `r:id`, relationship to an external workbook
    pub id: Option<String>,
    /// `name`
    pub name: Option<String>,
    /// `sheet`
    pub sheet: Option<String>,
    /// `ref`
    pub reference: Option<String>,
}

/// `cacheField` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheFieldDefinition {
    /// Field name
    pub name: String,
    /// `numFmtId`
    pub number_format_id: Option<u32>,
    /// Items of `sharedItems`, if the element is present
    pub shared_items: Option<Vec<CacheItem>>,
}

/// A tagged item of a shared item list or of a cache record
#[derive(Debug, Clone, PartialEq)]
pub enum CacheItem {
    /// `<n v="..."/>`
    Number(f64),
    /// `<b v="..."/>`
    Boolean(bool),
    /// `<d v="..."/>`, ISO 8601
    DateTime(String),
    /// `<s v="..."/>`
    String(String),
    /// `<e v="..."/>`, error code as written
    Error(String),
    /// `<m/>`
    Missing,
}

/// A cell of a cache record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordItem {
    /// Inline value
    Value(CacheItem),
    /// `<x v="..."/>`, index into the field's shared items
    Index(u32),
}

/// A `pivotTableDefinition` part
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDefinition {
    /// `name`
    pub name: String,
    /// `cacheId`, workbook level pivot cache id
    pub cache_id: Option<u32>,
    /// `location`
    pub location: Option<Location>,
    /// `dataCaption`
    pub data_caption: Option<String>,
    /// `rowHeaderCaption`
    pub row_header_caption: Option<String>,
    /// `colHeaderCaption`
    pub col_header_caption: Option<String>,
    /// `mergeItem`
    pub merge_item: Option<bool>,
    /// `indent`
    pub indent: Option<u32>,
    /// `pageOverThenDown`
    pub page_over_then_down: Option<bool>,
    /// `pageWrap`
    pub page_wrap: Option<u32>,
    /// `useAutoFormatting`
    pub use_auto_formatting: Option<bool>,
    /// `preserveFormatting`
    pub preserve_formatting: Option<bool>,
    /// `rowGrandTotals`
    pub row_grand_totals: Option<bool>,
    /// `colGrandTotals`
    pub col_grand_totals: Option<bool>,
    /// `subtotalHiddenItems`
    pub subtotal_hidden_items: Option<bool>,
    /// `multipleFieldFilters`
    pub multiple_field_filters: Option<bool>,
    /// `customListSort`
    pub custom_list_sort: Option<bool>,
    /// `showDrill`
    pub show_drill: Option<bool>,
    /// `showDataTips`
    pub show_data_tips: Option<bool>,
    /// `showMemberPropertyTips`
    pub show_member_property_tips: Option<bool>,
    /// `showHeaders`
    pub show_headers: Option<bool>,
    /// `gridDropZones`
    pub grid_drop_zones: Option<bool>,
    /// `showEmptyRow`
    pub show_empty_row: Option<bool>,
    /// `showEmptyCol`
    pub show_empty_col: Option<bool>,
    /// `showItems`
    pub show_items: Option<bool>,
    /// `fieldListSortAscending`
    pub field_list_sort_ascending: Option<bool>,
    /// `printDrill`
    pub print_drill: Option<bool>,
    /// `itemPrintTitles`
    pub item_print_titles: Option<bool>,
    /// `fieldPrintTitles`
    pub field_print_titles: Option<bool>,
    /// `enableDrill`
    pub enable_drill: Option<bool>,
    /// `showMissing`
    pub show_missing: Option<bool>,
    /// `missingCaption`
    pub missing_caption: Option<String>,
    /// `showError`
    pub show_error: Option<bool>,
    /// `errorCaption`
    pub error_caption: Option<String>,
    /// `enableEdit` of the 2010 extension
    pub enable_edit: Option<bool>,
    /// `hideValuesRow` of the 2010 extension
    pub hide_values_row: Option<bool>,
    /// `pivotTableStyleInfo`
    pub style_info: Option<StyleInfo>,
    /// `pivotFields`, one per cache field
    pub pivot_fields: Vec<PivotFieldDefinition>,
    /// `rowFields`
    pub row_fields: Vec<i32>,
    /// `colFields`
    pub column_fields: Vec<i32>,
    /// `pageFields`
    pub page_fields: Vec<PageFieldDefinition>,
    /// `dataFields`
    pub data_fields: Vec<DataFieldDefinition>,
    /// `formats`
    pub formats: Vec<FormatDefinition>,
}

/// `location` of a pivot table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    /// `ref`
    pub reference: String,
    /// `firstHeaderRow`
    pub first_header_row: u32,
    /// `firstDataRow`
    pub first_data_row: u32,
    /// `firstDataCol`
    pub first_data_col: u32,
}

/// `pivotTableStyleInfo`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleInfo {
    /// `name`
    pub name: Option<String>,
    /// `showRowHeaders`
    pub show_row_headers: Option<bool>,
    /// `showColHeaders`
    pub show_col_headers: Option<bool>,
    /// `showRowStripes`
    pub show_row_stripes: Option<bool>,
    /// `showColStripes`
    pub show_col_stripes: Option<bool>,
}

/// `pivotField` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotFieldDefinition {
    /// `name`, the field caption
    pub name: Option<String>,
    /// `axis`
    pub axis: Option<PivotAxis>,
    /// `dataField`
    pub data_field: Option<bool>,
    /// `items`
    pub items: Vec<FieldItem>,
    /// `defaultSubtotal`
    pub default_subtotal: Option<bool>,
    /// `subtotalTop`
    pub subtotal_top: Option<bool>,
    /// `subtotalCaption`
    pub subtotal_caption: Option<String>,
    /// `includeNewItemsInFilter`
    pub include_new_items_in_filter: Option<bool>,
    /// `outline`
    pub outline: Option<bool>,
    /// `compact`
    pub compact: Option<bool>,
    /// `insertBlankRow`
    pub insert_blank_row: Option<bool>,
    /// `showAll`
    pub show_all: Option<bool>,
    /// `insertPageBreak`
    pub insert_page_break: Option<bool>,
    /// `allDrilled`
    pub all_drilled: Option<bool>,
    /// `multipleItemSelectionAllowed`
    pub multiple_item_selection_allowed: Option<bool>,
    /// `sortType`
    pub sort_type: Option<FieldSortType>,
    /// `fillDownLabels` of the 2010 extension
    pub fill_down_labels: Option<bool>,
    /// `avgSubtotal`
    pub avg_subtotal: Option<bool>,
    /// `countASubtotal`
    pub count_a_subtotal: Option<bool>,
    /// `countSubtotal`
    pub count_subtotal: Option<bool>,
    /// `maxSubtotal`
    pub max_subtotal: Option<bool>,
    /// `minSubtotal`
    pub min_subtotal: Option<bool>,
    /// `stdDevPSubtotal`
    pub std_dev_p_subtotal: Option<bool>,
    /// `varPSubtotal`
    pub var_p_subtotal: Option<bool>,
    /// `productSubtotal`
    pub product_subtotal: Option<bool>,
    /// `stdDevSubtotal`
    pub std_dev_subtotal: Option<bool>,
    /// `sumSubtotal`
    pub sum_subtotal: Option<bool>,
    /// `varSubtotal`
    pub var_subtotal: Option<bool>,
}

/// `item` of a pivot field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldItem {
    /// `x`, index into the cache field's shared items
    pub index: Option<u32>,
    /// `h`
    pub hidden: Option<bool>,
    /// `sd`, item details are shown
    pub show_details: Option<bool>,
    /// `t`
    pub kind: ItemType,
}

/// `pageField` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFieldDefinition {
    /// `fld`
    pub field: i32,
    /// `item`, index into the pivot field's items
    pub item: Option<u32>,
    /// `name`
    pub name: Option<String>,
}

/// `dataField` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFieldDefinition {
    /// `name`
    pub name: Option<String>,
    /// `fld`
    pub field: i32,
    /// `subtotal`
    pub subtotal: Option<AggregationFunction>,
    /// `showDataAs`
    pub show_data_as: Option<CalculationKind>,
    /// `baseField`
    pub base_field: Option<i32>,
    /// `baseItem`
    pub base_item: Option<u32>,
    /// `numFmtId`
    pub number_format_id: Option<u32>,
}

/// `format` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatDefinition {
    /// `dxfId`
    pub dxf_id: Option<u32>,
    /// `action`
    pub action: Option<String>,
    /// `pivotArea`
    pub area: Option<PivotAreaDefinition>,
}

/// `pivotArea` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotAreaDefinition {
    /// `type`
    pub kind: Option<PivotAreaType>,
    /// `dataOnly`
    pub data_only: Option<bool>,
    /// `labelOnly`
    pub label_only: Option<bool>,
    /// `grandRow`
    pub grand_row: Option<bool>,
    /// `grandCol`
    pub grand_col: Option<bool>,
    /// `outline`
    pub outline: Option<bool>,
    /// `collapsedLevelsAreSubtotals`
    pub collapsed_levels_are_subtotals: Option<bool>,
    /// `axis`
    pub axis: Option<PivotAxis>,
    /// `field`
    pub field: Option<i32>,
    /// `fieldPosition`
    pub field_position: Option<u32>,
    /// `references`
    pub references: Vec<AreaReference>,
}

/// `reference` of a pivot area
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaReference {
    /// `field`
    pub field: i32,
    /// `defaultSubtotal`
    pub default_subtotal: Option<bool>,
    /// `x` children
    pub items: Vec<u32>,
}

/// `ST_Axis`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotAxis {
    /// `axisRow`
    Row,
    /// `axisCol`
    Column,
    /// `axisPage`
    Page,
    /// `axisValues`
    Values,
}

impl PivotAxis {
    /// Parses the attribute value
    pub fn from_ooxml(s: &str) -> Option<Self> {
        match s {
            "axisRow" => Some(PivotAxis::Row),
            "axisCol" => Some(PivotAxis::Column),
            "axisPage" => Some(PivotAxis::Page),
            "axisValues" => Some(PivotAxis::Values),
            _ => None,
        }
    }
}

/// `ST_PivotAreaType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PivotAreaType {
    /// `none`
    None,
    /// `normal`
    #[default]
    Normal,
    /// `data`
    Data,
    /// `all`
    All,
    /// `origin`
    Origin,
    /// `button`
    Button,
    /// `topEnd`
    TopEnd,
    /// `topRight`
    TopRight,
}

impl PivotAreaType {
    /// Parses the attribute value
    pub fn from_ooxml(s: &str) -> Option<Self> {
        match s {
            "none" => Some(PivotAreaType::None),
            "normal" => Some(PivotAreaType::Normal),
            "data" => Some(PivotAreaType::Data),
            "all" => Some(PivotAreaType::All),
            "origin" => Some(PivotAreaType::Origin),
            "button" => Some(PivotAreaType::Button),
            "topEnd" => Some(PivotAreaType::TopEnd),
            "topRight" => Some(PivotAreaType::TopRight),
            _ => None,
        }
    }
}

/// `ST_FieldSortType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldSortType {
    /// `manual`
    #[default]
    Manual,
    /// `ascending`
    Ascending,
    /// `descending`
    Descending,
}

impl FieldSortType {
    /// Parses the attribute value
    pub fn from_ooxml(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(FieldSortType::Manual),
            "ascending" => Some(FieldSortType::Ascending),
            "descending" => Some(FieldSortType::Descending),
            _ => None,
        }
    }
}

/// `ST_ItemType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemType {
    /// `data`
    #[default]
    Data,
    /// `default`
    Default,
    /// `sum`
    Sum,
    /// `countA`
    CountA,
    /// `avg`
    Avg,
    /// `max`
    Max,
    /// `min`
    Min,
    /// `product`
    Product,
    /// `count`
    Count,
    /// `stdDev`
    StdDev,
    /// `stdDevP`
    StdDevP,
    /// `var`
    Var,
    /// `varP`
    VarP,
    /// `grand`
    Grand,
    /// `blank`
    Blank,
}

impl ItemType {
    /// Parses the attribute value
    pub fn from_ooxml(s: &str) -> Option<Self> {
        match s {
            "data" => Some(ItemType::Data),
            "default" => Some(ItemType::Default),
            "sum" => Some(ItemType::Sum),
            "countA" => Some(ItemType::CountA),
            "avg" => Some(ItemType::Avg),
            "max" => Some(ItemType::Max),
            "min" => Some(ItemType::Min),
            "product" => Some(ItemType::Product),
            "count" => Some(ItemType::Count),
            "stdDev" => Some(ItemType::StdDev),
            "stdDevP" => Some(ItemType::StdDevP),
            "var" => Some(ItemType::Var),
            "varP" => Some(ItemType::VarP),
            "grand" => Some(ItemType::Grand),
            "blank" => Some(ItemType::Blank),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_enums() {
        assert_eq!(PivotAxis::from_ooxml("axisCol"), Some(PivotAxis::Column));
        assert_eq!(PivotAxis::from_ooxml("col"), None);
        assert_eq!(
            PivotAreaType::from_ooxml("button"),
            Some(PivotAreaType::Button)
        );
        assert_eq!(PivotAreaType::default(), PivotAreaType::Normal);
        assert_eq!(
            FieldSortType::from_ooxml("descending"),
            Some(FieldSortType::Descending)
        );
        assert_eq!(ItemType::from_ooxml("default"), Some(ItemType::Default));
        assert_eq!(ItemType::default(), ItemType::Data);
    }
}
