// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::sync::Arc;

use log::{debug, warn};

use crate::pivot::definition::{
    DataFieldDefinition, FieldSortType, PageFieldDefinition, PivotFieldDefinition,
    TableDefinition, VALUES_FIELD_INDEX,
};
use crate::pivot::style_resolver::apply_formats;
use crate::pivot::table::{
    FilterAreaOrder, LayoutOptions, PivotField, PivotFieldOptions, PivotFilterField, PivotTable,
    PivotValue, SubtotalFunction, SubtotalPolicy,
};
use crate::pivot::{resolve_source, PivotCache, PivotError};
use crate::xlsx::{get_dimension, TablePart};
use crate::{Data, DataType, Workbook};

/// Builds the pivot table of `part`, bound to one of the workbook caches
///
/// The cache is looked up by the part's cache token first, then by
/// comparing its re-resolved source with the source of every cache.
/// `Ok(None)` means the table cannot be bound or placed and is skipped.
pub fn attach_table(
    workbook: &Workbook,
    sheet_name: &str,
    part: &TablePart,
) -> Result<Option<PivotTable>, PivotError> {
    let definition = &part.definition;
    let Some(cache) = find_cache(workbook, part) else {
        warn!(
            "no pivot cache for table '{}' of sheet '{sheet_name}'",
            definition.name
        );
        return Ok(None);
    };

    let (target_cell, location) = match &definition.location {
        None => ((0, 0), None),
        Some(location) => match get_dimension(location.reference.as_bytes()) {
            Ok(dimensions) => (dimensions.start, Some(dimensions)),
            Err(e) => {
                warn!(
                    "invalid location '{}' of pivot table '{}': {e}",
                    location.reference, definition.name
                );
                return Ok(None);
            }
        },
    };

    let mut table = PivotTable::new(&definition.name, target_cell, cache.clone());
    table.location = location;
    table.row_header_caption = non_blank(&definition.row_header_caption);
    table.column_header_caption = non_blank(&definition.col_header_caption);
    load_layout(definition, &mut table.layout);
    table.subtotal_policy = subtotal_policy(&definition.pivot_fields);

    table.row_fields = axis_fields(definition, &definition.row_fields, &cache, "row");
    table.column_fields = axis_fields(definition, &definition.column_fields, &cache, "column");
    table.filter_fields = definition
        .page_fields
        .iter()
        .filter_map(|page| filter_field(definition, page, &cache))
        .collect();
    table.value_fields = definition
        .data_fields
        .iter()
        .filter_map(|data| value_field(workbook, data, &cache))
        .collect();

    if !table.filter_fields.is_empty() {
        let shift = table.filter_fields.len() as u32 + 1;
        table.target_cell.0 = table.target_cell.0.saturating_sub(shift);
    }

    apply_formats(&mut table, &definition.formats, workbook.dxf_formats())?;

    debug!(
        "pivot table '{}' bound to cache {} on sheet '{sheet_name}'",
        table.name,
        cache.id()
    );
    Ok(Some(table))
}

fn find_cache(workbook: &Workbook, part: &TablePart) -> Option<Arc<PivotCache>> {
    let caches = workbook.pivot_caches();
    if let Some(cache) = part
        .cache_token
        .as_deref()
        .and_then(|token| caches.find_by_token(token))
    {
        return Some(cache.clone());
    }
    let definition = part.cache_definition.as_ref()?;
    let source = match resolve_source(definition, workbook) {
        Ok(Some(source)) => source,
        Ok(None) => return None,
        Err(e) => {
            debug!("cannot resolve cache source of '{}': {e}", part.path);
            return None;
        }
    };
    let cache = caches.find_by_source(&source)?;
    debug!(
        "pivot table '{}' bound to cache {} by source {source}",
        part.definition.name,
        cache.id()
    );
    Some(cache.clone())
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

fn load_layout(def: &TableDefinition, layout: &mut LayoutOptions) {
    macro_rules! set {
        ($($attr:ident => $flag:ident),* $(,)?) => {
            $(if let Some(v) = def.$attr {
                layout.$flag = v;
            })*
        };
    }
    set! {
        merge_item => merge_and_center_with_labels,
        indent => row_label_indent,
        page_wrap => filter_fields_page_wrap,
        use_auto_formatting => autofit_columns,
        preserve_formatting => preserve_cell_formatting,
        row_grand_totals => show_grand_totals_rows,
        col_grand_totals => show_grand_totals_columns,
        subtotal_hidden_items => filtered_items_in_subtotals,
        multiple_field_filters => allow_multiple_filters,
        custom_list_sort => use_custom_lists_for_sorting,
        show_drill => show_expand_collapse_buttons,
        show_data_tips => show_contextual_tooltips,
        show_member_property_tips => show_properties_in_tooltips,
        show_headers => display_captions_and_dropdowns,
        grid_drop_zones => classic_pivot_table_layout,
        show_empty_row => show_empty_items_on_rows,
        show_empty_col => show_empty_items_on_columns,
        show_items => display_item_labels,
        field_list_sort_ascending => sort_fields_a_to_z,
        print_drill => print_expand_collapsed_buttons,
        item_print_titles => repeat_row_labels,
        field_print_titles => print_titles,
        enable_drill => enable_show_details,
        enable_edit => enable_cell_editing,
    }
    if let Some(v) = def.page_over_then_down {
        layout.filter_area_order = if v {
            FilterAreaOrder::OverThenDown
        } else {
            FilterAreaOrder::DownThenOver
        };
    }
    if let Some(hide) = def.hide_values_row {
        layout.show_values_row = !hide;
    }
    if let (Some(true), Some(caption)) = (def.show_missing, &def.missing_caption) {
        layout.empty_cell_replacement = caption.clone();
    }
    if let (Some(true), Some(caption)) = (def.show_error, &def.error_caption) {
        layout.error_value_replacement = caption.clone();
    }
    if let Some(info) = &def.style_info {
        layout.theme = info.name.clone().unwrap_or_else(|| "None".to_string());
        layout.show_row_headers = info.show_row_headers.unwrap_or(false);
        layout.show_column_headers = info.show_col_headers.unwrap_or(false);
        layout.show_row_stripes = info.show_row_stripes.unwrap_or(false);
        layout.show_column_stripes = info.show_col_stripes.unwrap_or(false);
    }
}

/// Infers the table wide subtotal placement from every pivot field
pub(crate) fn subtotal_policy(fields: &[PivotFieldDefinition]) -> SubtotalPolicy {
    let shown = |f: &PivotFieldDefinition| f.default_subtotal.unwrap_or(true);
    if fields
        .iter()
        .all(|f| shown(f) && f.subtotal_top.unwrap_or(true))
    {
        SubtotalPolicy::AtTop
    } else if fields
        .iter()
        .all(|f| shown(f) && f.subtotal_top == Some(false))
    {
        SubtotalPolicy::AtBottom
    } else {
        SubtotalPolicy::DoNotShow
    }
}

/// Position of a field reference in the pivot field list, `None` for the
/// values axis and out of range indexes
fn field_position(def: &TableDefinition, index: i32) -> Option<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < def.pivot_fields.len())
}

fn axis_fields(
    def: &TableDefinition,
    indexes: &[i32],
    cache: &PivotCache,
    axis: &str,
) -> Vec<PivotField> {
    let mut fields = Vec::with_capacity(indexes.len());
    for &index in indexes {
        if index == VALUES_FIELD_INDEX {
            fields.push(PivotField::values());
            continue;
        }
        let Some((pos, name)) = field_position(def, index)
            .and_then(|pos| cache.fields().get(pos).map(|f| (pos, f.name())))
        else {
            warn!(
                "pivot table '{}': {axis} field {index} is out of range",
                def.name
            );
            continue;
        };
        let pivot_field = &def.pivot_fields[pos];
        fields.push(PivotField::bound(
            name,
            non_blank(&pivot_field.name),
            field_options(pivot_field),
        ));
    }
    fields
}

fn field_options(pf: &PivotFieldDefinition) -> PivotFieldOptions {
    let mut options = PivotFieldOptions {
        subtotal_caption: non_blank(&pf.subtotal_caption),
        ..Default::default()
    };
    macro_rules! set {
        ($($attr:ident => $option:ident),* $(,)?) => {
            $(if let Some(v) = pf.$attr {
                options.$option = v;
            })*
        };
    }
    set! {
        include_new_items_in_filter => include_new_items_in_filter,
        outline => outline,
        compact => compact,
        insert_blank_row => insert_blank_lines,
        show_all => show_blank_items,
        insert_page_break => insert_page_breaks,
        subtotal_top => subtotals_at_top,
        fill_down_labels => repeat_item_labels,
    }
    if let Some(all_drilled) = pf.all_drilled {
        options.collapsed = !all_drilled;
    }
    let mut indexed = pf.items.iter().filter(|i| i.index.is_some()).peekable();
    if indexed.peek().is_some() && indexed.all(|i| i.show_details == Some(false)) {
        options.collapsed = true;
    }
    options.sort = pf.sort_type.unwrap_or(FieldSortType::Manual);

    let switches = [
        (pf.avg_subtotal, SubtotalFunction::Average),
        (pf.count_a_subtotal, SubtotalFunction::Count),
        (pf.count_subtotal, SubtotalFunction::CountNumbers),
        (pf.max_subtotal, SubtotalFunction::Maximum),
        (pf.min_subtotal, SubtotalFunction::Minimum),
        (pf.std_dev_p_subtotal, SubtotalFunction::PopulationStandardDeviation),
        (pf.var_p_subtotal, SubtotalFunction::PopulationVariance),
        (pf.product_subtotal, SubtotalFunction::Product),
        (pf.std_dev_subtotal, SubtotalFunction::StandardDeviation),
        (pf.sum_subtotal, SubtotalFunction::Sum),
        (pf.var_subtotal, SubtotalFunction::Variance),
    ];
    options.subtotals = switches
        .into_iter()
        .filter(|(on, _)| *on == Some(true))
        .map(|(_, f)| f)
        .collect();
    options
}

fn filter_field(
    def: &TableDefinition,
    page: &PageFieldDefinition,
    cache: &PivotCache,
) -> Option<PivotFilterField> {
    let Some((pos, cached)) =
        field_position(def, page.field).and_then(|pos| cache.fields().get(pos).map(|f| (pos, f)))
    else {
        warn!(
            "pivot table '{}': filter field {} is out of range",
            def.name, page.field
        );
        return None;
    };
    let pivot_field = &def.pivot_fields[pos];
    let caption = non_blank(&page.name).or_else(|| non_blank(&pivot_field.name));
    let mut filter = PivotFilterField::new(cached.name(), caption);

    let values = cached.distinct_values();
    if pivot_field.items.is_empty() || values.is_empty() {
        return Some(filter);
    }
    let candidates = if pivot_field.multiple_item_selection_allowed == Some(true) {
        pivot_field.items.iter().collect::<Vec<_>>()
    } else {
        page.item
            .and_then(|i| pivot_field.items.get(i as usize))
            .into_iter()
            .collect()
    };
    for item in candidates {
        if item.hidden == Some(true) {
            continue;
        }
        match item.index.and_then(|x| values.get(x as usize)) {
            Some(value) => filter.add_selected_value(value.clone()),
            None => debug!(
                "pivot table '{}': filter item {:?} has no value",
                def.name, item.index
            ),
        }
    }
    Some(filter)
}

fn value_field(
    workbook: &Workbook,
    data: &DataFieldDefinition,
    cache: &PivotCache,
) -> Option<PivotValue> {
    let Some(source_field) = usize::try_from(data.field)
        .ok()
        .and_then(|pos| cache.fields().get(pos))
        .map(|f| f.name().to_string())
    else {
        warn!("data field {} does not point to a cache field", data.field);
        return None;
    };
    let mut value = PivotValue {
        caption: non_blank(&data.name).unwrap_or_else(|| source_field.clone()),
        source_field,
        number_format_id: data.number_format_id,
        aggregation: data.subtotal.unwrap_or_default(),
        calculation: data.show_data_as.unwrap_or_default(),
        ..Default::default()
    };

    if let Some(base_field) = data.base_field.and_then(|b| u32::try_from(b).ok()) {
        let source = cache.source();
        let dimensions = source.dimensions();
        let column = dimensions.start.1.saturating_add(base_field);
        match workbook.worksheet(source.sheet_name()) {
            Some(sheet) if column <= dimensions.end.1 => {
                value.base_field_name = sheet
                    .get_value((dimensions.start.0, column))
                    .map(|header| header.to_string());
                if let Some(item) = data.base_item {
                    let mut items: Vec<&Data> = Vec::new();
                    if dimensions.end.0 > dimensions.start.0 {
                        let rows = (dimensions.start.0 + 1, dimensions.end.0);
                        for v in sheet.column_values(column, rows) {
                            if !v.is_empty() && !items.contains(&v) {
                                items.push(v);
                            }
                        }
                    }
                    value.base_item_value = items.get(item as usize).map(|v| (*v).clone());
                }
            }
            _ => debug!("base field {base_field} is outside of the cache source {source}"),
        }
    }
    Some(value)
}
