// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::sync::Arc;

use crate::pivot::definition::{FieldSortType, PivotAxis};
use crate::pivot::style_format::{FieldStyleFormats, StyleFormatTree};
use crate::pivot::PivotCache;
use crate::{Data, Dimensions};

/// Default placement of subtotals for the whole table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtotalPolicy {
    /// Subtotals above each group
    #[default]
    AtTop,
    /// Subtotals below each group
    AtBottom,
    /// No subtotals
    DoNotShow,
}

/// Order of the filter fields in the filter area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterAreaOrder {
    /// Down, then over
    #[default]
    DownThenOver,
    /// Over, then down
    OverThenDown,
}

/// Summary function of a value field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationFunction {
    /// Sum of values
    #[default]
    Sum,
    /// Count of values
    Count,
    /// Average of values
    Average,
    /// Maximum value
    Max,
    /// Minimum value
    Min,
    /// Product of values
    Product,
    /// Count of numeric values
    CountNumbers,
    /// Standard deviation (sample)
    StdDev,
    /// Standard deviation (population)
    StdDevP,
    /// Variance (sample)
    Var,
    /// Variance (population)
    VarP,
}

impl AggregationFunction {
    /// Parses the `subtotal` attribute of a data field
    pub fn from_ooxml(s: &str) -> Option<Self> {
        match s {
            "sum" => Some(Self::Sum),
            "count" => Some(Self::Count),
            "average" => Some(Self::Average),
            "max" => Some(Self::Max),
            "min" => Some(Self::Min),
            "product" => Some(Self::Product),
            "countNums" => Some(Self::CountNumbers),
            "stdDev" => Some(Self::StdDev),
            "stdDevp" => Some(Self::StdDevP),
            "var" => Some(Self::Var),
            "varp" => Some(Self::VarP),
            _ => None,
        }
    }
}

/// How a value field is shown (`showDataAs`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalculationKind {
    /// The value itself
    #[default]
    Normal,
    /// Difference from the base item
    Difference,
    /// Percentage of the base item
    Percent,
    /// Percentage difference from the base item
    PercentDifference,
    /// Running total over the base field
    RunningTotal,
    /// Percentage of the row total
    PercentOfRow,
    /// Percentage of the column total
    PercentOfColumn,
    /// Percentage of the grand total
    PercentOfTotal,
    /// Index
    Index,
}

impl CalculationKind {
    /// Parses the `showDataAs` attribute of a data field
    pub fn from_ooxml(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(Self::Normal),
            "difference" => Some(Self::Difference),
            "percent" => Some(Self::Percent),
            "percentDiff" => Some(Self::PercentDifference),
            "runTotal" => Some(Self::RunningTotal),
            "percentOfRow" => Some(Self::PercentOfRow),
            "percentOfCol" => Some(Self::PercentOfColumn),
            "percentOfTotal" => Some(Self::PercentOfTotal),
            "index" => Some(Self::Index),
            _ => None,
        }
    }
}

/// Subtotal functions a row or column field can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtotalFunction {
    /// Average
    Average,
    /// Count
    Count,
    /// Count numbers
    CountNumbers,
    /// Maximum
    Maximum,
    /// Minimum
    Minimum,
    /// Population standard deviation
    PopulationStandardDeviation,
    /// Population variance
    PopulationVariance,
    /// Product
    Product,
    /// Standard deviation
    StandardDeviation,
    /// Sum
    Sum,
    /// Variance
    Variance,
}

/// Options of a row or column field bound to a cache field
#[derive(Debug, Clone, PartialEq)]
pub struct PivotFieldOptions {
    /// Caption of the subtotal rows
    pub subtotal_caption: Option<String>,
    /// New items are included in manual filters
    pub include_new_items_in_filter: bool,
    /// Outline form
    pub outline: bool,
    /// Compact form
    pub compact: bool,
    /// Blank line after each item
    pub insert_blank_lines: bool,
    /// Items without data are shown
    pub show_blank_items: bool,
    /// Page break after each item
    pub insert_page_breaks: bool,
    /// Subtotals at the top of each group
    pub subtotals_at_top: bool,
    /// Items are collapsed
    pub collapsed: bool,
    /// Item labels are repeated on each row
    pub repeat_item_labels: bool,
    /// Sort order
    pub sort: FieldSortType,
    /// Subtotal functions, in file order
    pub subtotals: Vec<SubtotalFunction>,
}

impl Default for PivotFieldOptions {
    fn default() -> Self {
        PivotFieldOptions {
            subtotal_caption: None,
            include_new_items_in_filter: false,
            outline: true,
            compact: true,
            insert_blank_lines: false,
            show_blank_items: true,
            insert_page_breaks: false,
            subtotals_at_top: true,
            collapsed: false,
            repeat_item_labels: false,
            sort: FieldSortType::Manual,
            subtotals: Vec::new(),
        }
    }
}

/// A field on the row or column axis
#[derive(Debug, Clone, PartialEq)]
pub enum PivotField {
    /// A field bound to a cache field
    Bound {
        /// Name of the cache field
        cache_field_name: String,
        /// Custom caption
        caption: Option<String>,
        /// Layout options
        options: PivotFieldOptions,
        /// Formatting rules
        style_formats: FieldStyleFormats,
    },
    /// The synthesized axis listing the value fields
    ValuesSentinel {
        /// Formatting rules
        style_formats: FieldStyleFormats,
    },
}

impl PivotField {
    pub(crate) fn bound(
        cache_field_name: &str,
        caption: Option<String>,
        options: PivotFieldOptions,
    ) -> Self {
        PivotField::Bound {
            cache_field_name: cache_field_name.to_string(),
            caption,
            options,
            style_formats: FieldStyleFormats::default(),
        }
    }

    pub(crate) fn values() -> Self {
        PivotField::ValuesSentinel {
            style_formats: FieldStyleFormats::default(),
        }
    }

    /// Name of the bound cache field, `None` for the values axis
    pub fn cache_field_name(&self) -> Option<&str> {
        match self {
            PivotField::Bound {
                cache_field_name, ..
            } => Some(cache_field_name),
            PivotField::ValuesSentinel { .. } => None,
        }
    }

    /// Custom caption
    pub fn caption(&self) -> Option<&str> {
        match self {
            PivotField::Bound { caption, .. } => caption.as_deref(),
            PivotField::ValuesSentinel { .. } => None,
        }
    }

    /// Layout options, `None` for the values axis
    pub fn options(&self) -> Option<&PivotFieldOptions> {
        match self {
            PivotField::Bound { options, .. } => Some(options),
            PivotField::ValuesSentinel { .. } => None,
        }
    }

    /// Whether this is the synthesized values axis
    pub fn is_values_sentinel(&self) -> bool {
        matches!(self, PivotField::ValuesSentinel { .. })
    }

    /// Formatting rules of the field
    pub fn style_formats(&self) -> &FieldStyleFormats {
        match self {
            PivotField::Bound { style_formats, .. }
            | PivotField::ValuesSentinel { style_formats } => style_formats,
        }
    }

    pub(crate) fn style_formats_mut(&mut self) -> &mut FieldStyleFormats {
        match self {
            PivotField::Bound { style_formats, .. }
            | PivotField::ValuesSentinel { style_formats } => style_formats,
        }
    }
}

/// A report filter
#[derive(Debug, Clone, PartialEq)]
pub struct PivotFilterField {
    cache_field_name: String,
    caption: Option<String>,
    selected_values: Vec<Data>,
    pub(crate) style_formats: FieldStyleFormats,
}

impl PivotFilterField {
    pub(crate) fn new(cache_field_name: &str, caption: Option<String>) -> Self {
        PivotFilterField {
            cache_field_name: cache_field_name.to_string(),
            caption,
            selected_values: Vec::new(),
            style_formats: FieldStyleFormats::default(),
        }
    }

    /// Name of the filtered cache field
    pub fn cache_field_name(&self) -> &str {
        &self.cache_field_name
    }

    /// Custom caption
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    /// Values the filter lets through, no duplicates
    pub fn selected_values(&self) -> &[Data] {
        &self.selected_values
    }

    /// Formatting rules of the filter field
    pub fn style_formats(&self) -> &FieldStyleFormats {
        &self.style_formats
    }

    pub(crate) fn add_selected_value(&mut self, value: Data) {
        if !self.selected_values.contains(&value) {
            self.selected_values.push(value);
        }
    }
}

/// A value (data) field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PivotValue {
    /// Name of the summarized cache field
    pub source_field: String,
    /// Caption, e.g. `Sum of Sales`
    pub caption: String,
    /// Number format id
    pub number_format_id: Option<u32>,
    /// Summary function
    pub aggregation: AggregationFunction,
    /// How values are shown
    pub calculation: CalculationKind,
    /// Header of the base field of relative calculations
    pub base_field_name: Option<String>,
    /// Base item of relative calculations
    pub base_item_value: Option<Data>,
}

/// Table wide layout flags
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// Merge and center cells with labels
    pub merge_and_center_with_labels: bool,
    /// Indentation of row labels in compact form
    pub row_label_indent: u32,
    /// Order of the filter fields
    pub filter_area_order: FilterAreaOrder,
    /// Filter fields per row or column
    pub filter_fields_page_wrap: u32,
    /// Autofit column widths on update
    pub autofit_columns: bool,
    /// Preserve cell formatting on update
    pub preserve_cell_formatting: bool,
    /// Grand totals for rows
    pub show_grand_totals_rows: bool,
    /// Grand totals for columns
    pub show_grand_totals_columns: bool,
    /// Filtered items are included in subtotals
    pub filtered_items_in_subtotals: bool,
    /// Multiple filters per field
    pub allow_multiple_filters: bool,
    /// Custom lists are used when sorting
    pub use_custom_lists_for_sorting: bool,
    /// Expand and collapse buttons
    pub show_expand_collapse_buttons: bool,
    /// Contextual tooltips
    pub show_contextual_tooltips: bool,
    /// Properties in tooltips
    pub show_properties_in_tooltips: bool,
    /// Field captions and filter drop downs
    pub display_captions_and_dropdowns: bool,
    /// Classic layout, fields can be dragged on the grid
    pub classic_pivot_table_layout: bool,
    /// Empty items on rows
    pub show_empty_items_on_rows: bool,
    /// Empty items on columns
    pub show_empty_items_on_columns: bool,
    /// Item labels when there are no fields in the values area
    pub display_item_labels: bool,
    /// Field list sorted from A to Z
    pub sort_fields_a_to_z: bool,
    /// Expand and collapse buttons are printed
    pub print_expand_collapsed_buttons: bool,
    /// Row labels repeated on each printed page
    pub repeat_row_labels: bool,
    /// Print titles
    pub print_titles: bool,
    /// Show details on double click
    pub enable_show_details: bool,
    /// Cells can be edited
    pub enable_cell_editing: bool,
    /// Row of the value captions
    pub show_values_row: bool,
    /// Text shown in empty cells
    pub empty_cell_replacement: String,
    /// Text shown in error cells
    pub error_value_replacement: String,
    /// Table style name, `None` for no style
    pub theme: String,
    /// Row header formatting of the table style
    pub show_row_headers: bool,
    /// Column header formatting of the table style
    pub show_column_headers: bool,
    /// Banded rows
    pub show_row_stripes: bool,
    /// Banded columns
    pub show_column_stripes: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions {
            merge_and_center_with_labels: false,
            row_label_indent: 1,
            filter_area_order: FilterAreaOrder::DownThenOver,
            filter_fields_page_wrap: 0,
            autofit_columns: false,
            preserve_cell_formatting: true,
            show_grand_totals_rows: true,
            show_grand_totals_columns: true,
            filtered_items_in_subtotals: false,
            allow_multiple_filters: true,
            use_custom_lists_for_sorting: true,
            show_expand_collapse_buttons: true,
            show_contextual_tooltips: true,
            show_properties_in_tooltips: true,
            display_captions_and_dropdowns: true,
            classic_pivot_table_layout: false,
            show_empty_items_on_rows: false,
            show_empty_items_on_columns: false,
            display_item_labels: true,
            sort_fields_a_to_z: false,
            print_expand_collapsed_buttons: false,
            repeat_row_labels: false,
            print_titles: false,
            enable_show_details: true,
            enable_cell_editing: false,
            show_values_row: true,
            empty_cell_replacement: String::new(),
            error_value_replacement: String::new(),
            theme: "PivotStyleLight16".to_string(),
            show_row_headers: true,
            show_column_headers: true,
            show_row_stripes: false,
            show_column_stripes: false,
        }
    }
}

/// A pivot table bound to a pivot cache
#[derive(Debug, Clone)]
pub struct PivotTable {
    pub(crate) name: String,
    pub(crate) target_cell: (u32, u32),
    pub(crate) location: Option<Dimensions>,
    pub(crate) cache: Arc<PivotCache>,
    pub(crate) row_header_caption: Option<String>,
    pub(crate) column_header_caption: Option<String>,
    pub(crate) row_fields: Vec<PivotField>,
    pub(crate) column_fields: Vec<PivotField>,
    pub(crate) filter_fields: Vec<PivotFilterField>,
    pub(crate) value_fields: Vec<PivotValue>,
    pub(crate) subtotal_policy: SubtotalPolicy,
    pub(crate) layout: LayoutOptions,
    pub(crate) style_formats: StyleFormatTree,
}

impl PivotTable {
    pub(crate) fn new(name: &str, target_cell: (u32, u32), cache: Arc<PivotCache>) -> Self {
        PivotTable {
            name: name.to_string(),
            target_cell,
            location: None,
            cache,
            row_header_caption: None,
            column_header_caption: None,
            row_fields: Vec::new(),
            column_fields: Vec::new(),
            filter_fields: Vec::new(),
            value_fields: Vec::new(),
            subtotal_policy: SubtotalPolicy::default(),
            layout: LayoutOptions::default(),
            style_formats: StyleFormatTree::default(),
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 0-based `(row, column)` of the anchor cell
    pub fn target_cell(&self) -> (u32, u32) {
        self.target_cell
    }

    /// Area the table occupied in the document
    pub fn location(&self) -> Option<Dimensions> {
        self.location
    }

    /// The cache the table reads
    pub fn cache(&self) -> &Arc<PivotCache> {
        &self.cache
    }

    /// Caption of the row header
    pub fn row_header_caption(&self) -> Option<&str> {
        self.row_header_caption.as_deref()
    }

    /// Caption of the column header
    pub fn column_header_caption(&self) -> Option<&str> {
        self.column_header_caption.as_deref()
    }

    /// Row labels
    pub fn row_fields(&self) -> &[PivotField] {
        &self.row_fields
    }

    /// Column labels
    pub fn column_fields(&self) -> &[PivotField] {
        &self.column_fields
    }

    /// Report filters
    pub fn filter_fields(&self) -> &[PivotFilterField] {
        &self.filter_fields
    }

    /// Value fields
    pub fn value_fields(&self) -> &[PivotValue] {
        &self.value_fields
    }

    /// Table wide subtotal placement
    pub fn subtotal_policy(&self) -> SubtotalPolicy {
        self.subtotal_policy
    }

    /// Layout flags
    pub fn layout(&self) -> &LayoutOptions {
        &self.layout
    }

    /// Grand total formatting rules
    pub fn style_formats(&self) -> &StyleFormatTree {
        &self.style_formats
    }

    /// Finds a row, column or filter field bound to the cache field `name`
    /// and returns its formatting rules
    pub fn field_style_formats(&self, name: &str) -> Option<&FieldStyleFormats> {
        self.row_fields
            .iter()
            .chain(self.column_fields.iter())
            .find(|f| f.cache_field_name() == Some(name))
            .map(|f| f.style_formats())
            .or_else(|| {
                self.filter_fields
                    .iter()
                    .find(|f| f.cache_field_name == name)
                    .map(|f| &f.style_formats)
            })
    }

    pub(crate) fn field_style_formats_mut(&mut self, name: &str) -> Option<&mut FieldStyleFormats> {
        if let Some(f) = self
            .row_fields
            .iter_mut()
            .chain(self.column_fields.iter_mut())
            .find(|f| f.cache_field_name() == Some(name))
        {
            return Some(f.style_formats_mut());
        }
        self.filter_fields
            .iter_mut()
            .find(|f| f.cache_field_name == name)
            .map(|f| &mut f.style_formats)
    }

    /// Formatting rules of the values axis placed on `axis`
    pub fn values_style_formats(&self, axis: PivotAxis) -> Option<&FieldStyleFormats> {
        self.axis_fields(axis)?
            .iter()
            .find(|f| f.is_values_sentinel())
            .map(|f| f.style_formats())
    }

    pub(crate) fn values_style_formats_mut(
        &mut self,
        axis: PivotAxis,
    ) -> Option<&mut FieldStyleFormats> {
        let fields = match axis {
            PivotAxis::Row => &mut self.row_fields,
            PivotAxis::Column => &mut self.column_fields,
            _ => return None,
        };
        fields
            .iter_mut()
            .find(|f| f.is_values_sentinel())
            .map(|f| f.style_formats_mut())
    }

    fn axis_fields(&self, axis: PivotAxis) -> Option<&[PivotField]> {
        match axis {
            PivotAxis::Row => Some(&self.row_fields),
            PivotAxis::Column => Some(&self.column_fields),
            _ => None,
        }
    }

    /// Whether a row, column or filter field is bound to the cache field `name`
    pub fn has_field(&self, name: &str) -> bool {
        self.field_style_formats(name).is_some()
    }
}
