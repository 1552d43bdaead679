// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Maps `format` pivot areas onto the formatting rules of a pivot table
//!
//! Every area is resolved into a leaf first. Nothing is written to the
//! table unless every area of the definition resolved without a fatal error.

use log::{debug, warn};

use crate::pivot::definition::{
    AreaReference, FormatDefinition, PivotAreaDefinition, PivotAreaType, PivotAxis,
    VALUES_FIELD_INDEX,
};
use crate::pivot::style_format::{
    FieldPredicate, FieldStyleFormats, Narrowing, PivotStyleFormat, StyleFormatElement,
};
use crate::pivot::table::PivotTable;
use crate::pivot::PivotError;
use crate::style::{DifferentialFormat, Style};

/// The field whose rules an area targets
#[derive(Debug, Clone, PartialEq)]
enum FieldTarget {
    /// Row, column or filter field, by cache field name
    Named(String),
    /// Values axis on a row or column axis
    Values(PivotAxis),
}

/// Where a resolved area is written
#[derive(Debug, Clone, PartialEq)]
enum Leaf {
    GrandTotal {
        row: bool,
        element: StyleFormatElement,
    },
    Header(FieldTarget),
    Label(FieldTarget),
    Subtotal(FieldTarget),
    DataValues(FieldTarget, Vec<Narrowing>),
}

#[derive(Debug)]
struct ResolvedArea {
    leaf: Leaf,
    format: PivotStyleFormat,
}

/// Resolves `formats` against `table` and attaches them
///
/// Areas which cannot be resolved are skipped. Conflicting flags and
/// unknown differential formats fail the whole table, leaving its rules
/// untouched.
pub(crate) fn apply_formats(
    table: &mut PivotTable,
    formats: &[FormatDefinition],
    dxfs: &[DifferentialFormat],
) -> Result<(), PivotError> {
    let mut resolved = Vec::with_capacity(formats.len());
    for (i, format) in formats.iter().enumerate() {
        if let Some(area) = resolve_format(table, i, format, dxfs)? {
            resolved.push(area);
        }
    }
    for area in resolved {
        if let Some(leaf) = leaf_mut(table, &area.leaf) {
            *leaf = area.format;
        }
    }
    Ok(())
}

fn resolve_format(
    table: &PivotTable,
    index: usize,
    format: &FormatDefinition,
    dxfs: &[DifferentialFormat],
) -> Result<Option<ResolvedArea>, PivotError> {
    let Some(area) = &format.area else {
        debug!("format {index} of '{}' has no pivot area", table.name());
        return Ok(None);
    };
    let data_only = area.data_only.unwrap_or(true);
    let label_only = area.label_only.unwrap_or(false);
    if data_only && label_only {
        return Err(PivotError::ConflictingAreaFlags { area: index });
    }

    let Some(leaf) = resolve_leaf(table, area, data_only, label_only) else {
        warn!(
            "format {index} of pivot table '{}' matches no field, skipping",
            table.name()
        );
        return Ok(None);
    };
    let style = match format.dxf_id {
        Some(id) => dxfs
            .get(id as usize)
            .map(Style::from_differential)
            .ok_or(PivotError::MissingDifferentialFormat(id))?,
        None => Style::default(),
    };
    Ok(Some(ResolvedArea {
        leaf,
        format: PivotStyleFormat {
            area_type: area.kind.unwrap_or_default(),
            outline: area.outline.unwrap_or(true),
            collapsed_levels_are_subtotals: area.collapsed_levels_are_subtotals.unwrap_or(false),
            style,
        },
    }))
}

fn resolve_leaf(
    table: &PivotTable,
    area: &PivotAreaDefinition,
    data_only: bool,
    label_only: bool,
) -> Option<Leaf> {
    if area.field.is_none() && area.references.is_empty() {
        let row = match (area.grand_row == Some(true), area.grand_col == Some(true)) {
            (true, false) => true,
            (false, true) => false,
            _ => return None,
        };
        let element = if data_only {
            StyleFormatElement::Data
        } else if label_only {
            StyleFormatElement::Label
        } else {
            StyleFormatElement::All
        };
        return Some(Leaf::GrandTotal { row, element });
    }

    let (primary, default_subtotal) = match area.field {
        Some(field) => (field, false),
        None => area
            .references
            .iter()
            .find(|r| r.items.is_empty())
            .map(|r| (r.field, r.default_subtotal == Some(true)))?,
    };
    let target = resolve_field(table, primary, area.axis)?;

    if default_subtotal {
        return Some(Leaf::Subtotal(target));
    }
    if area.kind == Some(PivotAreaType::Button) {
        return Some(Leaf::Header(target));
    }
    if label_only {
        return Some(Leaf::Label(target));
    }
    let narrowings = area
        .references
        .iter()
        .filter(|r| r.field != primary)
        .map(|r| narrowing(table, r))
        .collect::<Option<Vec<_>>>()?;
    Some(Leaf::DataValues(target, narrowings))
}

/// Resolves a field index of an area to a field of the table
fn resolve_field(table: &PivotTable, index: i32, axis: Option<PivotAxis>) -> Option<FieldTarget> {
    if index == VALUES_FIELD_INDEX {
        let axis = axis.filter(|a| matches!(a, PivotAxis::Row | PivotAxis::Column))?;
        table.values_style_formats(axis)?;
        return Some(FieldTarget::Values(axis));
    }
    let name = cache_field_name(table, index)?;
    if !table.has_field(name) {
        debug!("field '{name}' is not used by pivot table '{}'", table.name());
        return None;
    }
    Some(FieldTarget::Named(name.to_string()))
}

fn cache_field_name(table: &PivotTable, index: i32) -> Option<&str> {
    let pos = usize::try_from(index).ok()?;
    table.cache().fields().get(pos).map(|f| f.name())
}

/// One narrowing step from a secondary reference
fn narrowing(table: &PivotTable, reference: &AreaReference) -> Option<Narrowing> {
    let item = reference.items.first().map(|&x| x as usize);
    if reference.field == VALUES_FIELD_INDEX {
        let value = table.value_fields().get(item?)?;
        return Some(Narrowing::ValueField(value.caption.clone()));
    }
    let name = cache_field_name(table, reference.field)?;
    if !table.has_field(name) {
        return None;
    }
    let predicate = item.and_then(|x| {
        let values = table.cache().field_values(usize::try_from(reference.field).ok()?)?;
        values.get(x).cloned().map(FieldPredicate::Equals)
    });
    Some(Narrowing::Field {
        field: name.to_string(),
        predicate,
    })
}

fn field_formats_mut<'a>(
    table: &'a mut PivotTable,
    target: &FieldTarget,
) -> Option<&'a mut FieldStyleFormats> {
    match target {
        FieldTarget::Named(name) => table.field_style_formats_mut(name),
        FieldTarget::Values(axis) => table.values_style_formats_mut(*axis),
    }
}

fn leaf_mut<'a>(table: &'a mut PivotTable, leaf: &Leaf) -> Option<&'a mut PivotStyleFormat> {
    match leaf {
        Leaf::GrandTotal { row, element } => {
            let totals = if *row {
                &mut table.style_formats.row_grand_total
            } else {
                &mut table.style_formats.column_grand_total
            };
            Some(totals.for_element(*element))
        }
        Leaf::Header(target) => Some(field_formats_mut(table, target)?.header_mut()),
        Leaf::Label(target) => Some(field_formats_mut(table, target)?.label_mut()),
        Leaf::Subtotal(target) => Some(field_formats_mut(table, target)?.subtotal_mut()),
        Leaf::DataValues(target, narrowings) => {
            let mut node = field_formats_mut(table, target)?.data_values_mut();
            for narrowing in narrowings {
                node = match narrowing {
                    Narrowing::Field { field, predicate } => {
                        node.and_with(field, predicate.clone())
                    }
                    Narrowing::ValueField(caption) => node.for_value_field(caption),
                };
            }
            Some(node.format_mut())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::definition::{
        CacheDefinition, CacheFieldDefinition, CacheItem, CacheSource, WorksheetSource,
    };
    use crate::pivot::table::{PivotField, PivotFilterField, PivotValue};
    use crate::pivot::{build_cache, PivotFieldOptions};
    use crate::style::{DifferentialFill, DifferentialFont};
    use crate::{Color, Data, Workbook};
    use std::sync::Arc;

    fn table() -> PivotTable {
        let mut wb = Workbook::new();
        wb.add_worksheet("Data");
        let strings = |v: &[&str]| -> Option<Vec<CacheItem>> {
            Some(v.iter().map(|s| CacheItem::String(s.to_string())).collect())
        };
        let def = CacheDefinition {
            source: CacheSource::Worksheet(WorksheetSource {
                sheet: Some("Data".into()),
                reference: Some("A1:D3".into()),
                ..Default::default()
            }),
            fields: vec![
                CacheFieldDefinition {
                    name: "Region".into(),
                    shared_items: strings(&["North", "South"]),
                    ..Default::default()
                },
                CacheFieldDefinition {
                    name: "Product".into(),
                    shared_items: strings(&["Pen", "Ink"]),
                    ..Default::default()
                },
                CacheFieldDefinition {
                    name: "Year".into(),
                    ..Default::default()
                },
                CacheFieldDefinition {
                    name: "Amount".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let cache = build_cache(&def, &wb).unwrap().unwrap();
        let mut table = PivotTable::new("PivotTable1", (0, 0), Arc::new(cache));
        table.row_fields = vec![
            PivotField::bound("Region", None, PivotFieldOptions::default()),
            PivotField::bound("Product", None, PivotFieldOptions::default()),
        ];
        table.column_fields = vec![PivotField::values()];
        table.filter_fields = vec![PivotFilterField::new("Year", None)];
        table.value_fields = vec![
            PivotValue {
                source_field: "Amount".into(),
                caption: "Sum of Amount".into(),
                ..Default::default()
            },
            PivotValue {
                source_field: "Amount".into(),
                caption: "Count of Amount".into(),
                ..Default::default()
            },
        ];
        table
    }

    fn dxfs() -> Vec<DifferentialFormat> {
        vec![
            DifferentialFormat {
                font: Some(DifferentialFont {
                    bold: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            },
            DifferentialFormat {
                fill: Some(DifferentialFill {
                    fg_color: Some(Color::Rgb { r: 255, g: 0, b: 0 }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ]
    }

    fn format(dxf_id: u32, area: PivotAreaDefinition) -> FormatDefinition {
        FormatDefinition {
            dxf_id: Some(dxf_id),
            area: Some(area),
            ..Default::default()
        }
    }

    fn reference(field: i32, items: &[u32]) -> AreaReference {
        AreaReference {
            field,
            items: items.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn grand_total() {
        let mut table = table();
        let area = PivotAreaDefinition {
            grand_row: Some(true),
            data_only: Some(true),
            outline: Some(false),
            ..Default::default()
        };
        apply_formats(&mut table, &[format(0, area)], &dxfs()).unwrap();
        let rule = table
            .style_formats()
            .row_grand_total
            .get(StyleFormatElement::Data)
            .unwrap();
        assert!(!rule.outline);
        assert_eq!(rule.style.font.as_ref().unwrap().bold, Some(true));
        assert!(table.style_formats().column_grand_total.is_empty());
    }

    #[test]
    fn grand_total_needs_one_direction() {
        let mut table = table();
        let neither = PivotAreaDefinition::default();
        let both = PivotAreaDefinition {
            grand_row: Some(true),
            grand_col: Some(true),
            ..Default::default()
        };
        apply_formats(&mut table, &[format(0, neither), format(0, both)], &dxfs()).unwrap();
        assert!(table.style_formats().row_grand_total.is_empty());
        assert!(table.style_formats().column_grand_total.is_empty());

        let col = PivotAreaDefinition {
            grand_col: Some(true),
            data_only: Some(false),
            ..Default::default()
        };
        apply_formats(&mut table, &[format(1, col)], &dxfs()).unwrap();
        assert!(table
            .style_formats()
            .column_grand_total
            .get(StyleFormatElement::All)
            .is_some());
    }

    #[test]
    fn label_of_single_reference() {
        let mut table = table();
        let area = PivotAreaDefinition {
            data_only: Some(false),
            label_only: Some(true),
            references: vec![reference(2, &[])],
            ..Default::default()
        };
        apply_formats(&mut table, &[format(1, area)], &dxfs()).unwrap();
        let year = table.field_style_formats("Year").unwrap();
        assert!(year.label().is_some());
        assert!(year.header().is_none());
    }

    #[test]
    fn subtotal_and_header() {
        let mut table = table();
        let subtotal = PivotAreaDefinition {
            references: vec![AreaReference {
                field: 0,
                default_subtotal: Some(true),
                items: vec![],
            }],
            ..Default::default()
        };
        let header = PivotAreaDefinition {
            kind: Some(PivotAreaType::Button),
            field: Some(1),
            ..Default::default()
        };
        apply_formats(&mut table, &[format(0, subtotal), format(1, header)], &dxfs()).unwrap();
        assert!(table.field_style_formats("Region").unwrap().subtotal().is_some());
        let rule = table.field_style_formats("Product").unwrap().header().unwrap();
        assert_eq!(rule.area_type, PivotAreaType::Button);
    }

    #[test]
    fn data_values_narrowing() {
        let mut table = table();
        let area = PivotAreaDefinition {
            references: vec![
                reference(0, &[]),
                reference(1, &[1]),
                reference(VALUES_FIELD_INDEX, &[0]),
            ],
            ..Default::default()
        };
        apply_formats(&mut table, &[format(1, area)], &dxfs()).unwrap();
        let region = table.field_style_formats("Region").unwrap().data_values();
        assert!(region.format().is_none());
        let product = region
            .narrowed(&Narrowing::Field {
                field: "Product".into(),
                predicate: Some(FieldPredicate::Equals(Data::from("Ink"))),
            })
            .unwrap();
        let sum = product
            .narrowed(&Narrowing::ValueField("Sum of Amount".into()))
            .unwrap();
        assert!(sum.format().unwrap().style.fill.is_some());
    }

    #[test]
    fn out_of_domain_item_keeps_field_narrowing() {
        let mut table = table();
        let area = PivotAreaDefinition {
            field: Some(0),
            references: vec![reference(1, &[7])],
            ..Default::default()
        };
        apply_formats(&mut table, &[format(0, area)], &dxfs()).unwrap();
        let region = table.field_style_formats("Region").unwrap().data_values();
        let product = region
            .narrowed(&Narrowing::Field {
                field: "Product".into(),
                predicate: None,
            })
            .unwrap();
        assert!(product.format().is_some());
    }

    #[test]
    fn values_axis() {
        let mut table = table();
        let on_columns = PivotAreaDefinition {
            field: Some(VALUES_FIELD_INDEX),
            axis: Some(PivotAxis::Column),
            label_only: Some(true),
            data_only: Some(false),
            ..Default::default()
        };
        let on_rows = PivotAreaDefinition {
            field: Some(VALUES_FIELD_INDEX),
            axis: Some(PivotAxis::Row),
            ..Default::default()
        };
        apply_formats(&mut table, &[format(0, on_columns), format(0, on_rows)], &dxfs()).unwrap();
        let values = table.values_style_formats(PivotAxis::Column).unwrap();
        assert!(values.label().is_some());
        assert!(table.values_style_formats(PivotAxis::Row).is_none());
    }

    #[test]
    fn unresolvable_areas_are_skipped() {
        let mut table = table();
        let areas = vec![
            // Amount is only a value field
            format(
                0,
                PivotAreaDefinition {
                    field: Some(3),
                    ..Default::default()
                },
            ),
            format(
                0,
                PivotAreaDefinition {
                    field: Some(0),
                    references: vec![reference(VALUES_FIELD_INDEX, &[5])],
                    ..Default::default()
                },
            ),
            format(
                0,
                PivotAreaDefinition {
                    field: Some(12),
                    ..Default::default()
                },
            ),
        ];
        apply_formats(&mut table, &areas, &dxfs()).unwrap();
        assert!(table.field_style_formats("Region").unwrap().is_empty());
    }

    #[test]
    fn fatal_errors_leave_the_table_untouched() {
        let mut table = table();
        let good = format(
            0,
            PivotAreaDefinition {
                grand_row: Some(true),
                ..Default::default()
            },
        );
        let conflicting = format(
            0,
            PivotAreaDefinition {
                data_only: Some(true),
                label_only: Some(true),
                field: Some(0),
                ..Default::default()
            },
        );
        let err = apply_formats(&mut table, &[good.clone(), conflicting], &dxfs()).unwrap_err();
        assert!(matches!(err, PivotError::ConflictingAreaFlags { area: 1 }));
        assert!(table.style_formats().row_grand_total.is_empty());

        let missing = format(
            9,
            PivotAreaDefinition {
                field: Some(0),
                ..Default::default()
            },
        );
        let err = apply_formats(&mut table, &[good, missing], &dxfs()).unwrap_err();
        assert!(matches!(err, PivotError::MissingDifferentialFormat(9)));
        assert!(table.style_formats().row_grand_total.is_empty());
        assert!(table.field_style_formats("Region").unwrap().is_empty());
    }

    #[test]
    fn skipped_areas_ignore_their_format() {
        let mut table = table();
        let areas = vec![
            format(5, PivotAreaDefinition::default()),
            format(
                5,
                PivotAreaDefinition {
                    field: Some(12),
                    ..Default::default()
                },
            ),
            format(
                0,
                PivotAreaDefinition {
                    grand_col: Some(true),
                    ..Default::default()
                },
            ),
        ];
        apply_formats(&mut table, &areas, &[]).unwrap_err();
        apply_formats(&mut table, &areas[..2], &[]).unwrap();
        apply_formats(&mut table, &areas, &dxfs()).unwrap();
        assert!(table
            .style_formats()
            .column_grand_total
            .get(StyleFormatElement::Data)
            .is_some());
    }
}
