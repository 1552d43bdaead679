// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Parsers of the `pivotCacheDefinition`, `pivotCacheRecords` and
//! `pivotTableDefinition` parts
//!
//! Element and attribute names are matched on their local part so that
//! prefixed documents (`x:pivotField`, `r:id`) read the same.

use std::io::BufRead;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;

use crate::pivot::definition::{
    AreaReference, CacheDefinition, CacheFieldDefinition, CacheItem, CacheSource,
    DataFieldDefinition, FieldItem, FieldSortType, FormatDefinition, ItemType, Location,
    PageFieldDefinition, PivotAreaDefinition, PivotAreaType, PivotAxis, PivotFieldDefinition,
    RecordItem, StyleInfo, TableDefinition, WorksheetSource,
};
use crate::pivot::{AggregationFunction, CalculationKind};
use crate::utils::{parse_bool, parse_f64};
use crate::xlsx::{buf_xml_reader, XlsxError};

/// Reads a `pivotCacheDefinition` part
///
/// Records and external relationships live in other parts and are left
/// empty.
pub fn read_cache_definition<B: BufRead>(reader: B) -> Result<CacheDefinition, XlsxError> {
    parse_cache_definition(&mut buf_xml_reader(reader))
}

/// Reads a `pivotCacheRecords` part
pub fn read_cache_records<B: BufRead>(reader: B) -> Result<Vec<Vec<RecordItem>>, XlsxError> {
    parse_cache_records(&mut buf_xml_reader(reader))
}

/// Reads a `pivotTableDefinition` part
pub fn read_table_definition<B: BufRead>(reader: B) -> Result<TableDefinition, XlsxError> {
    parse_table_definition(&mut buf_xml_reader(reader))
}

fn unrecognized(typ: &'static str, val: &[u8]) -> XlsxError {
    XlsxError::Unrecognized {
        typ,
        val: String::from_utf8_lossy(val).into_owned(),
    }
}

fn attr_string<B: BufRead>(xml: &XmlReader<B>, a: &Attribute) -> Result<String, XlsxError> {
    Ok(a.decode_and_unescape_value(xml.decoder())?.into_owned())
}

fn attr_bool(a: &Attribute) -> Result<bool, XlsxError> {
    parse_bool(&a.value).ok_or_else(|| unrecognized("boolean", &a.value))
}

fn attr_u32(a: &Attribute) -> Result<u32, XlsxError> {
    atoi_simd::parse::<u32>(&a.value).map_err(|_| unrecognized("unsigned integer", &a.value))
}

/// Field indexes are unsigned in the schema, the values axis being written
/// either as `-2` or as `4294967294`
fn attr_field_index(a: &Attribute) -> Result<i32, XlsxError> {
    atoi_simd::parse::<i64>(&a.value)
        .map(|i| i as u32 as i32)
        .map_err(|_| unrecognized("field index", &a.value))
}

fn attr_enum<B: BufRead, T>(
    xml: &XmlReader<B>,
    a: &Attribute,
    typ: &'static str,
    from: fn(&str) -> Option<T>,
) -> Result<T, XlsxError> {
    let s = attr_string(xml, a)?;
    from(&s).ok_or(XlsxError::Unrecognized { typ, val: s })
}

fn skip<B: BufRead>(xml: &mut XmlReader<B>, e: &BytesStart) -> Result<(), XlsxError> {
    let mut temp_buf = Vec::new();
    xml.read_to_end_into(e.name(), &mut temp_buf)?;
    Ok(())
}

/// Walks an `extLst`, calling `f` on every extension element
///
/// The content of the extension elements is skipped: they share local
/// names with the elements they extend.
fn parse_ext_list<B, F>(xml: &mut XmlReader<B>, mut f: F) -> Result<(), XlsxError>
where
    B: BufRead,
    F: FnMut(&XmlReader<B>, &BytesStart) -> Result<(), XlsxError>,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"ext" => (),
            Ok(Event::Start(ref e)) => {
                f(&*xml, e)?;
                skip(xml, e)?;
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"extLst" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("extLst")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(())
}

pub(crate) fn parse_cache_definition<B: BufRead>(
    xml: &mut XmlReader<B>,
) -> Result<CacheDefinition, XlsxError> {
    let mut def = CacheDefinition::default();
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"pivotCacheDefinition" => {
                for a in e.attributes() {
                    let a = a.map_err(XlsxError::XmlAttr)?;
                    match a.key.local_name().as_ref() {
                        b"missingItemsLimit" => def.missing_items_limit = Some(attr_u32(&a)?),
                        b"saveData" => def.save_data = Some(attr_bool(&a)?),
                        b"refreshOnLoad" => def.refresh_on_load = Some(attr_bool(&a)?),
                        _ => (),
                    }
                }
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"cacheSource" => {
                for a in e.attributes() {
                    let a = a.map_err(XlsxError::XmlAttr)?;
                    if a.key.local_name().as_ref() == b"type" {
                        def.source = CacheSource::Other(attr_string(xml, &a)?);
                    }
                }
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"worksheetSource" => {
                let mut source = WorksheetSource::default();
                for a in e.attributes() {
                    let a = a.map_err(XlsxError::XmlAttr)?;
                    match a.key.local_name().as_ref() {
                        b"ref" => source.reference = Some(attr_string(xml, &a)?),
                        b"name" => source.name = Some(attr_string(xml, &a)?),
                        b"sheet" => source.sheet = Some(attr_string(xml, &a)?),
                        b"id" => source.id = Some(attr_string(xml, &a)?),
                        _ => (),
                    }
                }
                def.source = CacheSource::Worksheet(source);
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"cacheFields" => (),
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"cacheField" => {
                let field = parse_cache_field(xml, e)?;
                def.fields.push(field);
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"pivotCacheDefinition" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("pivotCacheDefinition")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(def)
}

fn parse_cache_field<B: BufRead>(
    xml: &mut XmlReader<B>,
    e: &BytesStart,
) -> Result<CacheFieldDefinition, XlsxError> {
    let mut field = CacheFieldDefinition::default();
    for a in e.attributes() {
        let a = a.map_err(XlsxError::XmlAttr)?;
        match a.key.local_name().as_ref() {
            b"name" => field.name = attr_string(xml, &a)?,
            b"numFmtId" => field.number_format_id = Some(attr_u32(&a)?),
            _ => (),
        }
    }
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"sharedItems" => {
                field.shared_items = Some(parse_shared_items(xml)?);
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"cacheField" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("cacheField")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(field)
}

fn parse_shared_items<B: BufRead>(xml: &mut XmlReader<B>) -> Result<Vec<CacheItem>, XlsxError> {
    let mut items = Vec::new();
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => items.push(parse_item(xml, e)?),
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"sharedItems" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("sharedItems")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(items)
}

/// Parses a tagged item (`m`, `n`, `b`, `e`, `s`, `d`) and consumes it
fn parse_item<B: BufRead>(xml: &mut XmlReader<B>, e: &BytesStart) -> Result<CacheItem, XlsxError> {
    let value = match e.try_get_attribute("v")? {
        Some(a) => Some(attr_string(xml, &a)?),
        None => None,
    };
    let item = match e.local_name().as_ref() {
        b"m" => CacheItem::Missing,
        b"n" => {
            let v = value.unwrap_or_default();
            match parse_f64(v.as_bytes()) {
                Some(n) => CacheItem::Number(n),
                None => return Err(unrecognized("number item", v.as_bytes())),
            }
        }
        b"b" => {
            let v = value.unwrap_or_default();
            match parse_bool(v.as_bytes()) {
                Some(b) => CacheItem::Boolean(b),
                None => return Err(unrecognized("boolean item", v.as_bytes())),
            }
        }
        b"d" => CacheItem::DateTime(value.unwrap_or_default()),
        b"s" => CacheItem::String(value.unwrap_or_default()),
        b"e" => CacheItem::Error(value.unwrap_or_default()),
        other => return Err(unrecognized("cache item", other)),
    };
    skip(xml, e)?;
    Ok(item)
}

pub(crate) fn parse_cache_records<B: BufRead>(
    xml: &mut XmlReader<B>,
) -> Result<Vec<Vec<RecordItem>>, XlsxError> {
    let mut records = Vec::new();
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"pivotCacheRecords" => (),
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"r" => {
                records.push(parse_record(xml)?);
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"pivotCacheRecords" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("pivotCacheRecords")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(records)
}

fn parse_record<B: BufRead>(xml: &mut XmlReader<B>) -> Result<Vec<RecordItem>, XlsxError> {
    let mut record = Vec::new();
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"x" => {
                let index = match e.try_get_attribute("v")? {
                    Some(a) => attr_u32(&a)?,
                    None => 0,
                };
                record.push(RecordItem::Index(index));
                skip(xml, e)?;
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"extLst" => skip(xml, e)?,
            Ok(Event::Start(ref e)) => record.push(RecordItem::Value(parse_item(xml, e)?)),
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"r" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("r")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(record)
}

pub(crate) fn parse_table_definition<B: BufRead>(
    xml: &mut XmlReader<B>,
) -> Result<TableDefinition, XlsxError> {
    let mut def = TableDefinition::default();
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"pivotTableDefinition" => parse_table_attributes(xml, e, &mut def)?,
                b"location" => {
                    let mut location = Location::default();
                    for a in e.attributes() {
                        let a = a.map_err(XlsxError::XmlAttr)?;
                        match a.key.local_name().as_ref() {
                            b"ref" => location.reference = attr_string(xml, &a)?,
                            b"firstHeaderRow" => location.first_header_row = attr_u32(&a)?,
                            b"firstDataRow" => location.first_data_row = attr_u32(&a)?,
                            b"firstDataCol" => location.first_data_col = attr_u32(&a)?,
                            _ => (),
                        }
                    }
                    def.location = Some(location);
                    skip(xml, e)?;
                }
                b"pivotFields" => def.pivot_fields = parse_pivot_fields(xml)?,
                b"rowFields" => def.row_fields = parse_field_indexes(xml, b"rowFields")?,
                b"colFields" => def.column_fields = parse_field_indexes(xml, b"colFields")?,
                b"pageFields" => def.page_fields = parse_page_fields(xml)?,
                b"dataFields" => def.data_fields = parse_data_fields(xml)?,
                b"formats" => def.formats = parse_formats(xml)?,
                b"pivotTableStyleInfo" => {
                    let mut info = StyleInfo::default();
                    for a in e.attributes() {
                        let a = a.map_err(XlsxError::XmlAttr)?;
                        match a.key.local_name().as_ref() {
                            b"name" => info.name = Some(attr_string(xml, &a)?),
                            b"showRowHeaders" => info.show_row_headers = Some(attr_bool(&a)?),
                            b"showColHeaders" => info.show_col_headers = Some(attr_bool(&a)?),
                            b"showRowStripes" => info.show_row_stripes = Some(attr_bool(&a)?),
                            b"showColStripes" => info.show_col_stripes = Some(attr_bool(&a)?),
                            _ => (),
                        }
                    }
                    def.style_info = Some(info);
                    skip(xml, e)?;
                }
                b"extLst" => parse_ext_list(xml, |_, e| {
                    if e.local_name().as_ref() != b"pivotTableDefinition" {
                        return Ok(());
                    }
                    for a in e.attributes() {
                        let a = a.map_err(XlsxError::XmlAttr)?;
                        match a.key.local_name().as_ref() {
                            b"enableEdit" => def.enable_edit = Some(attr_bool(&a)?),
                            b"hideValuesRow" => def.hide_values_row = Some(attr_bool(&a)?),
                            _ => (),
                        }
                    }
                    Ok(())
                })?,
                _ => skip(xml, e)?,
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"pivotTableDefinition" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("pivotTableDefinition")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(def)
}

fn parse_table_attributes<B: BufRead>(
    xml: &XmlReader<B>,
    e: &BytesStart,
    def: &mut TableDefinition,
) -> Result<(), XlsxError> {
    for a in e.attributes() {
        let a = a.map_err(XlsxError::XmlAttr)?;
        match a.key.local_name().as_ref() {
            b"name" => def.name = attr_string(xml, &a)?,
            b"cacheId" => def.cache_id = Some(attr_u32(&a)?),
            b"dataCaption" => def.data_caption = Some(attr_string(xml, &a)?),
            b"rowHeaderCaption" => def.row_header_caption = Some(attr_string(xml, &a)?),
            b"colHeaderCaption" => def.col_header_caption = Some(attr_string(xml, &a)?),
            b"missingCaption" => def.missing_caption = Some(attr_string(xml, &a)?),
            b"errorCaption" => def.error_caption = Some(attr_string(xml, &a)?),
            b"indent" => def.indent = Some(attr_u32(&a)?),
            b"pageWrap" => def.page_wrap = Some(attr_u32(&a)?),
            b"mergeItem" => def.merge_item = Some(attr_bool(&a)?),
            b"pageOverThenDown" => def.page_over_then_down = Some(attr_bool(&a)?),
            b"useAutoFormatting" => def.use_auto_formatting = Some(attr_bool(&a)?),
            b"preserveFormatting" => def.preserve_formatting = Some(attr_bool(&a)?),
            b"rowGrandTotals" => def.row_grand_totals = Some(attr_bool(&a)?),
            b"colGrandTotals" => def.col_grand_totals = Some(attr_bool(&a)?),
            b"subtotalHiddenItems" => def.subtotal_hidden_items = Some(attr_bool(&a)?),
            b"multipleFieldFilters" => def.multiple_field_filters = Some(attr_bool(&a)?),
            b"customListSort" => def.custom_list_sort = Some(attr_bool(&a)?),
            b"showDrill" => def.show_drill = Some(attr_bool(&a)?),
            b"showDataTips" => def.show_data_tips = Some(attr_bool(&a)?),
            b"showMemberPropertyTips" => def.show_member_property_tips = Some(attr_bool(&a)?),
            b"showHeaders" => def.show_headers = Some(attr_bool(&a)?),
            b"gridDropZones" => def.grid_drop_zones = Some(attr_bool(&a)?),
            b"showEmptyRow" => def.show_empty_row = Some(attr_bool(&a)?),
            b"showEmptyCol" => def.show_empty_col = Some(attr_bool(&a)?),
            b"showItems" => def.show_items = Some(attr_bool(&a)?),
            b"fieldListSortAscending" => def.field_list_sort_ascending = Some(attr_bool(&a)?),
            b"printDrill" => def.print_drill = Some(attr_bool(&a)?),
            b"itemPrintTitles" => def.item_print_titles = Some(attr_bool(&a)?),
            b"fieldPrintTitles" => def.field_print_titles = Some(attr_bool(&a)?),
            b"enableDrill" => def.enable_drill = Some(attr_bool(&a)?),
            b"showMissing" => def.show_missing = Some(attr_bool(&a)?),
            b"showError" => def.show_error = Some(attr_bool(&a)?),
            _ => (),
        }
    }
    Ok(())
}

fn parse_pivot_fields<B: BufRead>(
    xml: &mut XmlReader<B>,
) -> Result<Vec<PivotFieldDefinition>, XlsxError> {
    let mut fields = Vec::new();
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"pivotField" => {
                fields.push(parse_pivot_field(xml, e)?);
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"pivotFields" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("pivotFields")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(fields)
}

fn parse_pivot_field<B: BufRead>(
    xml: &mut XmlReader<B>,
    e: &BytesStart,
) -> Result<PivotFieldDefinition, XlsxError> {
    let mut field = PivotFieldDefinition::default();
    for a in e.attributes() {
        let a = a.map_err(XlsxError::XmlAttr)?;
        let flag = match a.key.local_name().as_ref() {
            b"name" => {
                field.name = Some(attr_string(xml, &a)?);
                continue;
            }
            b"subtotalCaption" => {
                field.subtotal_caption = Some(attr_string(xml, &a)?);
                continue;
            }
            b"axis" => {
                field.axis = Some(attr_enum(xml, &a, "axis", PivotAxis::from_ooxml)?);
                continue;
            }
            b"sortType" => {
                field.sort_type = Some(attr_enum(xml, &a, "sort type", FieldSortType::from_ooxml)?);
                continue;
            }
            b"dataField" => &mut field.data_field,
            b"defaultSubtotal" => &mut field.default_subtotal,
            b"subtotalTop" => &mut field.subtotal_top,
            b"includeNewItemsInFilter" => &mut field.include_new_items_in_filter,
            b"outline" => &mut field.outline,
            b"compact" => &mut field.compact,
            b"insertBlankRow" => &mut field.insert_blank_row,
            b"showAll" => &mut field.show_all,
            b"insertPageBreak" => &mut field.insert_page_break,
            b"allDrilled" => &mut field.all_drilled,
            b"multipleItemSelectionAllowed" => &mut field.multiple_item_selection_allowed,
            b"avgSubtotal" => &mut field.avg_subtotal,
            b"countASubtotal" => &mut field.count_a_subtotal,
            b"countSubtotal" => &mut field.count_subtotal,
            b"maxSubtotal" => &mut field.max_subtotal,
            b"minSubtotal" => &mut field.min_subtotal,
            b"stdDevPSubtotal" => &mut field.std_dev_p_subtotal,
            b"varPSubtotal" => &mut field.var_p_subtotal,
            b"productSubtotal" => &mut field.product_subtotal,
            b"stdDevSubtotal" => &mut field.std_dev_subtotal,
            b"sumSubtotal" => &mut field.sum_subtotal,
            b"varSubtotal" => &mut field.var_subtotal,
            _ => continue,
        };
        *flag = Some(attr_bool(&a)?);
    }

    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"items" => (),
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"item" => {
                let mut item = FieldItem::default();
                for a in e.attributes() {
                    let a = a.map_err(XlsxError::XmlAttr)?;
                    match a.key.local_name().as_ref() {
                        b"x" => item.index = Some(attr_u32(&a)?),
                        b"h" => item.hidden = Some(attr_bool(&a)?),
                        b"sd" => item.show_details = Some(attr_bool(&a)?),
                        b"t" => item.kind = attr_enum(xml, &a, "item type", ItemType::from_ooxml)?,
                        _ => (),
                    }
                }
                field.items.push(item);
                skip(xml, e)?;
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"extLst" => {
                parse_ext_list(xml, |_, e| {
                    if e.local_name().as_ref() == b"pivotField" {
                        for a in e.attributes() {
                            let a = a.map_err(XlsxError::XmlAttr)?;
                            if a.key.local_name().as_ref() == b"fillDownLabels" {
                                field.fill_down_labels = Some(attr_bool(&a)?);
                            }
                        }
                    }
                    Ok(())
                })?;
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"pivotField" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("pivotField")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(field)
}

/// Reads the `x` attribute of every `field` of `rowFields` or `colFields`
fn parse_field_indexes<B: BufRead>(
    xml: &mut XmlReader<B>,
    end: &[u8],
) -> Result<Vec<i32>, XlsxError> {
    let mut indexes = Vec::new();
    let mut buf = Vec::with_capacity(64);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"field" => {
                if let Some(a) = e.try_get_attribute("x")? {
                    indexes.push(attr_field_index(&a)?);
                }
                skip(xml, e)?;
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == end => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("fields")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(indexes)
}

fn parse_page_fields<B: BufRead>(
    xml: &mut XmlReader<B>,
) -> Result<Vec<PageFieldDefinition>, XlsxError> {
    let mut pages = Vec::new();
    let mut buf = Vec::with_capacity(64);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"pageField" => {
                let mut page = PageFieldDefinition::default();
                for a in e.attributes() {
                    let a = a.map_err(XlsxError::XmlAttr)?;
                    match a.key.local_name().as_ref() {
                        b"fld" => page.field = attr_field_index(&a)?,
                        b"item" => page.item = Some(attr_u32(&a)?),
                        b"name" => page.name = Some(attr_string(xml, &a)?),
                        _ => (),
                    }
                }
                pages.push(page);
                skip(xml, e)?;
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"pageFields" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("pageFields")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(pages)
}

fn parse_data_fields<B: BufRead>(
    xml: &mut XmlReader<B>,
) -> Result<Vec<DataFieldDefinition>, XlsxError> {
    let mut fields = Vec::new();
    let mut buf = Vec::with_capacity(64);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"dataField" => {
                let mut field = DataFieldDefinition::default();
                for a in e.attributes() {
                    let a = a.map_err(XlsxError::XmlAttr)?;
                    match a.key.local_name().as_ref() {
                        b"name" => field.name = Some(attr_string(xml, &a)?),
                        b"fld" => field.field = attr_field_index(&a)?,
                        b"subtotal" => {
                            field.subtotal = Some(attr_enum(
                                xml,
                                &a,
                                "subtotal",
                                AggregationFunction::from_ooxml,
                            )?)
                        }
                        b"showDataAs" => {
                            field.show_data_as = Some(attr_enum(
                                xml,
                                &a,
                                "show data as",
                                CalculationKind::from_ooxml,
                            )?)
                        }
                        b"baseField" => field.base_field = Some(attr_field_index(&a)?),
                        b"baseItem" => field.base_item = Some(attr_u32(&a)?),
                        b"numFmtId" => field.number_format_id = Some(attr_u32(&a)?),
                        _ => (),
                    }
                }
                fields.push(field);
                skip(xml, e)?;
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"dataFields" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("dataFields")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(fields)
}

fn parse_formats<B: BufRead>(xml: &mut XmlReader<B>) -> Result<Vec<FormatDefinition>, XlsxError> {
    let mut formats = Vec::new();
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"format" => {
                let mut format = FormatDefinition::default();
                for a in e.attributes() {
                    let a = a.map_err(XlsxError::XmlAttr)?;
                    match a.key.local_name().as_ref() {
                        b"dxfId" => format.dxf_id = Some(attr_u32(&a)?),
                        b"action" => format.action = Some(attr_string(xml, &a)?),
                        _ => (),
                    }
                }
                format.area = parse_format_area(xml)?;
                formats.push(format);
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"formats" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("formats")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(formats)
}

/// Reads the content of a `format` element up to its end
fn parse_format_area<B: BufRead>(
    xml: &mut XmlReader<B>,
) -> Result<Option<PivotAreaDefinition>, XlsxError> {
    let mut area = None;
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"pivotArea" => {
                area = Some(parse_pivot_area(xml, e)?);
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"format" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("format")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(area)
}

fn parse_pivot_area<B: BufRead>(
    xml: &mut XmlReader<B>,
    e: &BytesStart,
) -> Result<PivotAreaDefinition, XlsxError> {
    let mut area = PivotAreaDefinition::default();
    for a in e.attributes() {
        let a = a.map_err(XlsxError::XmlAttr)?;
        match a.key.local_name().as_ref() {
            b"type" => area.kind = Some(attr_enum(xml, &a, "area type", PivotAreaType::from_ooxml)?),
            b"dataOnly" => area.data_only = Some(attr_bool(&a)?),
            b"labelOnly" => area.label_only = Some(attr_bool(&a)?),
            b"grandRow" => area.grand_row = Some(attr_bool(&a)?),
            b"grandCol" => area.grand_col = Some(attr_bool(&a)?),
            b"outline" => area.outline = Some(attr_bool(&a)?),
            b"collapsedLevelsAreSubtotals" => {
                area.collapsed_levels_are_subtotals = Some(attr_bool(&a)?)
            }
            b"axis" => area.axis = Some(attr_enum(xml, &a, "axis", PivotAxis::from_ooxml)?),
            b"field" => area.field = Some(attr_field_index(&a)?),
            b"fieldPosition" => area.field_position = Some(attr_u32(&a)?),
            _ => (),
        }
    }

    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"references" => (),
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"reference" => {
                let mut reference = AreaReference::default();
                for a in e.attributes() {
                    let a = a.map_err(XlsxError::XmlAttr)?;
                    match a.key.local_name().as_ref() {
                        b"field" => reference.field = attr_field_index(&a)?,
                        b"defaultSubtotal" => reference.default_subtotal = Some(attr_bool(&a)?),
                        _ => (),
                    }
                }
                reference.items = parse_reference_items(xml)?;
                area.references.push(reference);
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"pivotArea" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("pivotArea")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(area)
}

fn parse_reference_items<B: BufRead>(xml: &mut XmlReader<B>) -> Result<Vec<u32>, XlsxError> {
    let mut items = Vec::new();
    let mut buf = Vec::with_capacity(64);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"x" => {
                if let Some(a) = e.try_get_attribute("v")? {
                    items.push(attr_u32(&a)?);
                }
                skip(xml, e)?;
            }
            Ok(Event::Start(ref e)) => skip(xml, e)?,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"reference" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("reference")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::definition::VALUES_FIELD_INDEX;

    const CACHE_DEFINITION: &str = r##"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<pivotCacheDefinition xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" r:id="rId1" refreshOnLoad="1" missingItemsLimit="0" recordCount="3">
  <cacheSource type="worksheet">
    <worksheetSource ref="A1:C4" sheet="Data"/>
  </cacheSource>
  <cacheFields count="3">
    <cacheField name="Region" numFmtId="0">
      <sharedItems count="3">
        <s v="North"/>
        <s v="South &amp; East"/>
        <m/>
      </sharedItems>
    </cacheField>
    <cacheField name="Date" numFmtId="14">
      <sharedItems containsDate="1">
        <d v="2024-01-31T00:00:00"/>
        <e v="#N/A"/>
      </sharedItems>
      <fieldGroup base="1"><groupItems count="1"><s v="&lt;1/1/2024"/></groupItems></fieldGroup>
    </cacheField>
    <cacheField name="Amount" numFmtId="0">
      <sharedItems containsNumber="1" minValue="10" maxValue="30"/>
    </cacheField>
  </cacheFields>
  <extLst><ext uri="{725AE2AE-9491-48be-B2B4-4EB974FC3084}"><x14:pivotCacheDefinition xmlns:x14="http://schemas.microsoft.com/office/spreadsheetml/2009/9/main"/></ext></extLst>
</pivotCacheDefinition>"##;

    #[test]
    fn cache_definition() {
        let def = read_cache_definition(CACHE_DEFINITION.as_bytes()).unwrap();
        assert_eq!(def.missing_items_limit, Some(0));
        assert_eq!(def.refresh_on_load, Some(true));
        assert_eq!(
            def.source,
            CacheSource::Worksheet(WorksheetSource {
                sheet: Some("Data".into()),
                reference: Some("A1:C4".into()),
                ..Default::default()
            })
        );
        assert_eq!(def.fields.len(), 3);
        assert_eq!(
            def.fields[0].shared_items,
            Some(vec![
                CacheItem::String("North".into()),
                CacheItem::String("South & East".into()),
                CacheItem::Missing,
            ])
        );
        assert_eq!(
            def.fields[1].shared_items,
            Some(vec![
                CacheItem::DateTime("2024-01-31T00:00:00".into()),
                CacheItem::Error("#N/A".into()),
            ])
        );
        assert_eq!(def.fields[1].number_format_id, Some(14));
        assert_eq!(def.fields[2].shared_items, Some(vec![]));
    }

    #[test]
    fn other_source() {
        let xml = r#"<pivotCacheDefinition><cacheSource type="consolidation"><consolidation><rangeSets/></consolidation></cacheSource><cacheFields/></pivotCacheDefinition>"#;
        let def = read_cache_definition(xml.as_bytes()).unwrap();
        assert_eq!(def.source, CacheSource::Other("consolidation".into()));
        assert!(def.fields.is_empty());
    }

    #[test]
    fn cache_records() {
        let xml = r##"<pivotCacheRecords count="2">
            <r><x v="0"/><n v="1.5"/><b v="1"/><m/></r>
            <r><x v="1"/><s v="a"/><d v="2024-02-01T00:00:00"/><e v="#REF!"/></r>
        </pivotCacheRecords>"##;
        let records = read_cache_records(xml.as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![
                vec![
                    RecordItem::Index(0),
                    RecordItem::Value(CacheItem::Number(1.5)),
                    RecordItem::Value(CacheItem::Boolean(true)),
                    RecordItem::Value(CacheItem::Missing),
                ],
                vec![
                    RecordItem::Index(1),
                    RecordItem::Value(CacheItem::String("a".into())),
                    RecordItem::Value(CacheItem::DateTime("2024-02-01T00:00:00".into())),
                    RecordItem::Value(CacheItem::Error("#REF!".into())),
                ],
            ]
        );
    }

    #[test]
    fn unknown_item_kind() {
        let xml = r#"<pivotCacheRecords><r><z v="1"/></r></pivotCacheRecords>"#;
        assert!(matches!(
            read_cache_records(xml.as_bytes()),
            Err(XlsxError::Unrecognized { typ: "cache item", .. })
        ));
    }

    const TABLE_DEFINITION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<pivotTableDefinition xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" name="PivotTable1" cacheId="5" dataCaption="Values" rowGrandTotals="0" indent="0" outline="1" rowHeaderCaption="Regions" missingCaption="-" showMissing="1">
  <location ref="A3:C7" firstHeaderRow="1" firstDataRow="2" firstDataCol="1"/>
  <pivotFields count="3">
    <pivotField axis="axisRow" showAll="0" sortType="descending" defaultSubtotal="0">
      <items count="3"><item x="1"/><item x="0" h="1" sd="0"/><item t="default"/></items>
      <autoSortScope><pivotArea dataOnly="0" outline="0" fieldPosition="0"><references count="1"><reference field="4294967294" count="1" selected="0"><x v="0"/></reference></references></pivotArea></autoSortScope>
      <extLst><ext uri="{2946ED86-A175-432a-8AC1-64E0C546D7DE}"><x14:pivotField xmlns:x14="http://schemas.microsoft.com/office/spreadsheetml/2009/9/main" fillDownLabels="1"/></ext></extLst>
    </pivotField>
    <pivotField axis="axisPage" multipleItemSelectionAllowed="1" showAll="0"><items count="1"><item x="0"/></items></pivotField>
    <pivotField dataField="1" showAll="0" sumSubtotal="1"/>
  </pivotFields>
  <rowFields count="2"><field x="0"/><field x="-2"/></rowFields>
  <rowItems count="1"><i><x/></i></rowItems>
  <colFields count="1"><field x="4294967294"/></colFields>
  <pageFields count="1"><pageField fld="1" hier="-1" name="Pick"/></pageFields>
  <dataFields count="2">
    <dataField name="Sum of Amount" fld="2" baseField="0" baseItem="0" numFmtId="3"/>
    <dataField name="Avg" fld="2" subtotal="average" showDataAs="percentOfTotal" baseField="0" baseItem="1048832"/>
  </dataFields>
  <formats count="2">
    <format dxfId="0"><pivotArea type="all" dataOnly="0" outline="0" fieldPosition="0"/></format>
    <format dxfId="1"><pivotArea outline="0" collapsedLevelsAreSubtotals="1" fieldPosition="0"><references count="2"><reference field="0" count="1" selected="0"><x v="1"/></reference><reference field="4294967294" count="1" selected="0"><x v="0"/></reference></references></pivotArea></format>
  </formats>
  <pivotTableStyleInfo name="PivotStyleMedium9" showRowHeaders="1" showColHeaders="1" showRowStripes="0" showColStripes="0" showLastColumn="1"/>
  <extLst><ext uri="{962EF5D1-5CA2-4c93-8EF4-DBF5C05439D2}"><x14:pivotTableDefinition xmlns:x14="http://schemas.microsoft.com/office/spreadsheetml/2009/9/main" hideValuesRow="1" enableEdit="1"><x14:pivotEdits/></x14:pivotTableDefinition></ext></extLst>
</pivotTableDefinition>"#;

    #[test]
    fn table_definition() {
        let def = read_table_definition(TABLE_DEFINITION.as_bytes()).unwrap();
        assert_eq!(def.name, "PivotTable1");
        assert_eq!(def.cache_id, Some(5));
        assert_eq!(def.row_grand_totals, Some(false));
        assert_eq!(def.indent, Some(0));
        assert_eq!(def.row_header_caption.as_deref(), Some("Regions"));
        assert_eq!(def.show_missing, Some(true));
        assert_eq!(def.location.as_ref().unwrap().reference, "A3:C7");
        assert_eq!(def.hide_values_row, Some(true));
        assert_eq!(def.enable_edit, Some(true));

        assert_eq!(def.pivot_fields.len(), 3);
        let region = &def.pivot_fields[0];
        assert_eq!(region.axis, Some(PivotAxis::Row));
        assert_eq!(region.show_all, Some(false));
        assert_eq!(region.default_subtotal, Some(false));
        assert_eq!(region.sort_type, Some(FieldSortType::Descending));
        assert_eq!(region.fill_down_labels, Some(true));
        assert_eq!(region.items.len(), 3);
        assert_eq!(region.items[1].hidden, Some(true));
        assert_eq!(region.items[1].show_details, Some(false));
        assert_eq!(region.items[2].kind, ItemType::Default);
        assert_eq!(def.pivot_fields[1].multiple_item_selection_allowed, Some(true));
        assert_eq!(def.pivot_fields[2].sum_subtotal, Some(true));

        assert_eq!(def.row_fields, vec![0, VALUES_FIELD_INDEX]);
        assert_eq!(def.column_fields, vec![VALUES_FIELD_INDEX]);
        assert_eq!(def.page_fields.len(), 1);
        assert_eq!(def.page_fields[0].field, 1);
        assert_eq!(def.page_fields[0].item, None);
        assert_eq!(def.page_fields[0].name.as_deref(), Some("Pick"));

        assert_eq!(def.data_fields.len(), 2);
        assert_eq!(def.data_fields[0].number_format_id, Some(3));
        assert_eq!(def.data_fields[1].subtotal, Some(AggregationFunction::Average));
        assert_eq!(
            def.data_fields[1].show_data_as,
            Some(CalculationKind::PercentOfTotal)
        );
        assert_eq!(def.data_fields[1].base_item, Some(1048832));

        assert_eq!(def.formats.len(), 2);
        let all = def.formats[0].area.as_ref().unwrap();
        assert_eq!(all.kind, Some(PivotAreaType::All));
        assert_eq!(all.data_only, Some(false));
        let narrowed = def.formats[1].area.as_ref().unwrap();
        assert_eq!(def.formats[1].dxf_id, Some(1));
        assert_eq!(narrowed.collapsed_levels_are_subtotals, Some(true));
        assert_eq!(
            narrowed.references,
            vec![
                AreaReference {
                    field: 0,
                    default_subtotal: None,
                    items: vec![1],
                },
                AreaReference {
                    field: VALUES_FIELD_INDEX,
                    default_subtotal: None,
                    items: vec![0],
                },
            ]
        );

        let info = def.style_info.unwrap();
        assert_eq!(info.name.as_deref(), Some("PivotStyleMedium9"));
        assert_eq!(info.show_col_stripes, Some(false));
    }

    #[test]
    fn invalid_boolean() {
        let xml = r#"<pivotTableDefinition name="P" showDrill="maybe"></pivotTableDefinition>"#;
        assert!(matches!(
            read_table_definition(xml.as_bytes()),
            Err(XlsxError::Unrecognized { typ: "boolean", .. })
        ));
    }
}
