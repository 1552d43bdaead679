// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Formatting rules attached to the parts of a pivot table

use std::collections::BTreeMap;

use crate::pivot::definition::PivotAreaType;
use crate::style::Style;
use crate::Data;

/// Part of a grand total a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StyleFormatElement {
    /// Data cells only
    Data,
    /// Labels only
    Label,
    /// Labels and data
    All,
}

/// A formatting rule
#[derive(Debug, Clone, PartialEq)]
pub struct PivotStyleFormat {
    /// Kind of area the rule was defined on
    pub area_type: PivotAreaType,
    /// Outline form
    pub outline: bool,
    /// Collapsed levels are subtotals
    pub collapsed_levels_are_subtotals: bool,
    /// The style
    pub style: Style,
}

impl Default for PivotStyleFormat {
    fn default() -> Self {
        PivotStyleFormat {
            area_type: PivotAreaType::Normal,
            outline: true,
            collapsed_levels_are_subtotals: false,
            style: Style::default(),
        }
    }
}

/// Rules of a row or column grand total
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrandTotalFormats {
    formats: BTreeMap<StyleFormatElement, PivotStyleFormat>,
}

impl GrandTotalFormats {
    /// Gets the rule of `element`
    pub fn get(&self, element: StyleFormatElement) -> Option<&PivotStyleFormat> {
        self.formats.get(&element)
    }

    /// Gets the rule of `element`, creating a default one
    pub fn for_element(&mut self, element: StyleFormatElement) -> &mut PivotStyleFormat {
        self.formats.entry(element).or_default()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// No rule at all
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

/// Table level rules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleFormatTree {
    /// Rules of the row grand total
    pub row_grand_total: GrandTotalFormats,
    /// Rules of the column grand total
    pub column_grand_total: GrandTotalFormats,
}

/// Condition on the items of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPredicate {
    /// Item equal to a value
    Equals(Data),
}

/// One step of a data values narrowing chain
#[derive(Debug, Clone, PartialEq)]
pub enum Narrowing {
    /// Cells of a field, optionally only those of matching items
    Field {
        /// Cache field name
        field: String,
        /// Item condition
        predicate: Option<FieldPredicate>,
    },
    /// Cells of a value field, by caption
    ValueField(String),
}

/// Rules of the data cells of a field, narrowed by other fields
///
/// Every narrowing leads to another `DataValuesFormat`, so a chain like
/// `Region` → `Product = "Pen"` → `Sum of Amount` is a path in this tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataValuesFormat {
    format: Option<PivotStyleFormat>,
    narrowings: Vec<(Narrowing, DataValuesFormat)>,
}

impl DataValuesFormat {
    /// Rule at this node
    pub fn format(&self) -> Option<&PivotStyleFormat> {
        self.format.as_ref()
    }

    /// Rule at this node, created if needed
    pub fn format_mut(&mut self) -> &mut PivotStyleFormat {
        self.format.get_or_insert_with(PivotStyleFormat::default)
    }

    /// Child nodes, in insertion order
    pub fn narrowings(&self) -> &[(Narrowing, DataValuesFormat)] {
        &self.narrowings
    }

    /// Gets the child reached by `narrowing`
    pub fn narrowed(&self, narrowing: &Narrowing) -> Option<&DataValuesFormat> {
        self.narrowings
            .iter()
            .find(|(n, _)| n == narrowing)
            .map(|(_, f)| f)
    }

    fn narrow(&mut self, narrowing: Narrowing) -> &mut DataValuesFormat {
        let idx = match self.narrowings.iter().position(|(n, _)| *n == narrowing) {
            Some(i) => i,
            None => {
                self.narrowings.push((narrowing, DataValuesFormat::default()));
                self.narrowings.len() - 1
            }
        };
        &mut self.narrowings[idx].1
    }

    /// Narrows to the cells of `field`, optionally only those matching `predicate`
    pub fn and_with(
        &mut self,
        field: &str,
        predicate: Option<FieldPredicate>,
    ) -> &mut DataValuesFormat {
        self.narrow(Narrowing::Field {
            field: field.to_string(),
            predicate,
        })
    }

    /// Narrows to the cells of the value field captioned `caption`
    pub fn for_value_field(&mut self, caption: &str) -> &mut DataValuesFormat {
        self.narrow(Narrowing::ValueField(caption.to_string()))
    }

    /// No rule in this node nor below
    pub fn is_empty(&self) -> bool {
        self.format.is_none() && self.narrowings.iter().all(|(_, f)| f.is_empty())
    }
}

/// Rules of a row, column or filter field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldStyleFormats {
    header: Option<PivotStyleFormat>,
    label: Option<PivotStyleFormat>,
    subtotal: Option<PivotStyleFormat>,
    data_values: DataValuesFormat,
}

impl FieldStyleFormats {
    /// Rule of the field header (drop down button)
    pub fn header(&self) -> Option<&PivotStyleFormat> {
        self.header.as_ref()
    }

    /// Rule of the item labels
    pub fn label(&self) -> Option<&PivotStyleFormat> {
        self.label.as_ref()
    }

    /// Rule of the subtotals
    pub fn subtotal(&self) -> Option<&PivotStyleFormat> {
        self.subtotal.as_ref()
    }

    /// Rules of the data cells
    pub fn data_values(&self) -> &DataValuesFormat {
        &self.data_values
    }

    pub(crate) fn header_mut(&mut self) -> &mut PivotStyleFormat {
        self.header.get_or_insert_with(PivotStyleFormat::default)
    }

    pub(crate) fn label_mut(&mut self) -> &mut PivotStyleFormat {
        self.label.get_or_insert_with(PivotStyleFormat::default)
    }

    pub(crate) fn subtotal_mut(&mut self) -> &mut PivotStyleFormat {
        self.subtotal.get_or_insert_with(PivotStyleFormat::default)
    }

    pub(crate) fn data_values_mut(&mut self) -> &mut DataValuesFormat {
        &mut self.data_values
    }

    /// No rule at all
    pub fn is_empty(&self) -> bool {
        self.header.is_none()
            && self.label.is_none()
            && self.subtotal.is_none()
            && self.data_values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_chain() {
        let mut values = DataValuesFormat::default();
        values
            .and_with("Product", Some(FieldPredicate::Equals(Data::from("Pen"))))
            .for_value_field("Sum of Amount")
            .format_mut()
            .outline = false;
        // same path, same node
        values
            .and_with("Product", Some(FieldPredicate::Equals(Data::from("Pen"))))
            .format_mut();

        assert_eq!(values.narrowings().len(), 1);
        let product = values
            .narrowed(&Narrowing::Field {
                field: "Product".into(),
                predicate: Some(FieldPredicate::Equals(Data::from("Pen"))),
            })
            .unwrap();
        assert!(product.format().is_some());
        let sum = product
            .narrowed(&Narrowing::ValueField("Sum of Amount".into()))
            .unwrap();
        assert!(!sum.format().unwrap().outline);
        assert!(!values.is_empty());
    }

    #[test]
    fn grand_totals() {
        let mut tree = StyleFormatTree::default();
        tree.row_grand_total
            .for_element(StyleFormatElement::Label)
            .collapsed_levels_are_subtotals = true;
        assert_eq!(tree.row_grand_total.len(), 1);
        assert!(tree.row_grand_total.get(StyleFormatElement::Data).is_none());
        assert!(tree.column_grand_total.is_empty());
    }
}
