// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use crate::pivot::definition::{CacheDefinition, CacheItem, RecordItem};
use crate::pivot::{resolve_source, PivotError, PivotSourceReference};
use crate::xlsx::MAX_ROWS;
use crate::{CellErrorType, Data, Workbook};

/// How many items no longer present in the source a cache keeps per field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetainPolicy {
    /// Let the application decide
    #[default]
    Automatic,
    /// Keep none
    None,
    /// Keep at most n items
    Limited(u32),
    /// Keep them all
    Max,
}

impl RetainPolicy {
    /// Decodes the `missingItemsLimit` attribute
    pub fn from_missing_items_limit(limit: u32) -> Self {
        match limit {
            0 => RetainPolicy::None,
            MAX_ROWS => RetainPolicy::Max,
            n => RetainPolicy::Limited(n),
        }
    }
}

/// A column of a pivot cache
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CachedField {
    name: String,
    distinct_values: Vec<Data>,
    shared: bool,
}

impl CachedField {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value domain of the field, in the order the cache lists it
    pub fn distinct_values(&self) -> &[Data] {
        &self.distinct_values
    }

    /// Whether the values come from a shared item list, records then refer
    /// to them by index
    pub fn has_shared_items(&self) -> bool {
        self.shared
    }
}

/// A snapshot of the columns of a source range or table
#[derive(Debug)]
pub struct PivotCache {
    id: usize,
    link_token: OnceLock<String>,
    source: PivotSourceReference,
    fields: Vec<CachedField>,
    records: Option<Vec<Vec<Data>>>,
    retain_policy: RetainPolicy,
    save_source_data: bool,
    refresh_on_load: bool,
}

impl PivotCache {
    /// Creates an empty cache reading `source`
    pub fn new(source: PivotSourceReference) -> Self {
        PivotCache {
            id: 0,
            link_token: OnceLock::new(),
            source,
            fields: Vec::new(),
            records: None,
            retain_policy: RetainPolicy::default(),
            save_source_data: true,
            refresh_on_load: false,
        }
    }

    /// Identifier of the cache within its workbook
    pub fn id(&self) -> usize {
        self.id
    }

    /// Token linking the cache to the package part it was read from
    pub fn link_token(&self) -> Option<&str> {
        self.link_token.get().map(|s| s.as_str())
    }

    /// Sets the link token, only the first call has an effect
    pub fn set_link_token(&self, token: &str) -> bool {
        if token.trim().is_empty() {
            return false;
        }
        self.link_token.set(token.to_string()).is_ok()
    }

    /// Source data of the cache
    pub fn source(&self) -> &PivotSourceReference {
        &self.source
    }

    /// Fields of the cache, in source order
    pub fn fields(&self) -> &[CachedField] {
        &self.fields
    }

    /// Names of the fields, in source order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name()).collect()
    }

    /// Whether a field with this name exists
    pub fn contains_field(&self, name: &str) -> bool {
        self.try_field_index(name).is_some()
    }

    /// Value domain of the field at `index`
    pub fn field_values(&self, index: usize) -> Option<&[Data]> {
        self.fields.get(index).map(|f| f.distinct_values())
    }

    /// Position of the field with this name
    pub fn try_field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Raw records, aligned with `fields`, if the cache saved them
    pub fn records(&self) -> Option<&[Vec<Data>]> {
        self.records.as_deref()
    }

    /// Items to retain per field
    pub fn retain_policy(&self) -> RetainPolicy {
        self.retain_policy
    }

    /// Whether the source data is saved with the cache
    pub fn save_source_data(&self) -> bool {
        self.save_source_data
    }

    /// Whether the cache is refreshed when the document opens
    pub fn refresh_on_load(&self) -> bool {
        self.refresh_on_load
    }

    fn add_field(&mut self, name: &str, values: Option<Vec<Data>>) {
        let shared = values.is_some();
        self.fields.push(CachedField {
            name: name.to_string(),
            distinct_values: values.unwrap_or_default(),
            shared,
        });
    }
}

/// The pivot caches of a workbook
#[derive(Debug, Default)]
pub struct PivotCaches {
    caches: Vec<Arc<PivotCache>>,
}

impl PivotCaches {
    /// Number of caches
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// Whether there is no cache
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Iterates over the caches, in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PivotCache>> {
        self.caches.iter()
    }

    /// Gets a cache by id
    pub fn get(&self, id: usize) -> Option<&Arc<PivotCache>> {
        self.caches.iter().find(|c| c.id == id)
    }

    /// Finds the cache whose link token is `token`
    pub fn find_by_token(&self, token: &str) -> Option<&Arc<PivotCache>> {
        self.caches.iter().find(|c| c.link_token() == Some(token))
    }

    /// Finds the first cache reading `source`
    pub fn find_by_source(&self, source: &PivotSourceReference) -> Option<&Arc<PivotCache>> {
        self.caches.iter().find(|c| &c.source == source)
    }

    /// Registers a cache and assigns its id
    pub fn add(&mut self, mut cache: PivotCache) -> Arc<PivotCache> {
        cache.id = self.caches.iter().map(|c| c.id + 1).max().unwrap_or(0);
        let cache = Arc::new(cache);
        self.caches.push(Arc::clone(&cache));
        cache
    }
}

/// Builds a pivot cache out of its definition
///
/// Returns `Ok(None)` when the source is not supported.
pub fn build_cache(
    definition: &CacheDefinition,
    workbook: &Workbook,
) -> Result<Option<PivotCache>, PivotError> {
    build_cache_with(definition, workbook, true)
}

pub(crate) fn build_cache_with(
    definition: &CacheDefinition,
    workbook: &Workbook,
    read_records: bool,
) -> Result<Option<PivotCache>, PivotError> {
    let Some(source) = resolve_source(definition, workbook)? else {
        return Ok(None);
    };
    let mut cache = PivotCache::new(source);

    if let Some(limit) = definition.missing_items_limit {
        cache.retain_policy = RetainPolicy::from_missing_items_limit(limit);
    }
    if let Some(save) = definition.save_data {
        cache.save_source_data = save;
    }
    if let Some(refresh) = definition.refresh_on_load {
        cache.refresh_on_load = refresh;
    }

    // position of each defined field in the cache, duplicates have none
    let mut positions = Vec::with_capacity(definition.fields.len());
    for field in &definition.fields {
        if cache.contains_field(&field.name) {
            warn!("duplicate pivot cache field '{}' skipped", field.name);
            positions.push(None);
            continue;
        }
        let values = match field.shared_items.as_deref() {
            Some(items) if !items.is_empty() => Some(
                items
                    .iter()
                    .map(decode_shared_item)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            _ => None,
        };
        cache.add_field(&field.name, values);
        positions.push(Some(cache.fields.len() - 1));
    }

    if let (true, Some(records)) = (read_records, &definition.records) {
        let mut rows = Vec::with_capacity(records.len());
        for (r, record) in records.iter().enumerate() {
            if record.len() > positions.len() {
                warn!(
                    "pivot cache record {r} has {} items for {} fields",
                    record.len(),
                    positions.len()
                );
            }
            let mut row = vec![Data::Empty; cache.fields.len()];
            for (i, item) in record.iter().enumerate() {
                if let RecordItem::Value(CacheItem::Error(_)) = item {
                    return Err(PivotError::ErrorInRecord {
                        record: r,
                        field: i,
                    });
                }
                let Some(&Some(pos)) = positions.get(i) else {
                    continue;
                };
                let field = &mut cache.fields[pos];
                let value = match item {
                    RecordItem::Value(item) => decode_record_item(item),
                    RecordItem::Index(x) => match field.distinct_values.get(*x as usize) {
                        Some(v) if field.shared => v.clone(),
                        _ => {
                            warn!(
                                "pivot cache record {r} refers to missing item {x} of field '{}'",
                                field.name
                            );
                            Data::Empty
                        }
                    },
                };
                if !field.shared && !matches!(item, RecordItem::Index(_)) {
                    field.distinct_values.push(value.clone());
                }
                row[pos] = value;
            }
            rows.push(row);
        }
        cache.records = Some(rows);
    }

    debug!(
        "pivot cache on {} built with {} fields",
        cache.source,
        cache.fields.len()
    );
    Ok(Some(cache))
}

fn decode_shared_item(item: &CacheItem) -> Result<Data, PivotError> {
    Ok(match item {
        CacheItem::Number(n) => Data::Float(*n),
        CacheItem::Boolean(b) => Data::Bool(*b),
        CacheItem::DateTime(d) => Data::DateTimeIso(d.clone()),
        CacheItem::String(s) => Data::String(s.clone()),
        CacheItem::Error(code) => Data::Error(
            code.parse::<CellErrorType>()
                .map_err(|_| PivotError::UnknownErrorCode(code.clone()))?,
        ),
        CacheItem::Missing => Data::Empty,
    })
}

/// Decodes an inline record item, error items are rejected by the caller
fn decode_record_item(item: &CacheItem) -> Data {
    match item {
        CacheItem::Number(n) => Data::Float(*n),
        CacheItem::Boolean(b) => Data::Bool(*b),
        CacheItem::DateTime(d) => Data::DateTimeIso(d.clone()),
        CacheItem::String(s) => Data::String(s.clone()),
        CacheItem::Error(_) | CacheItem::Missing => Data::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::definition::{CacheFieldDefinition, CacheSource, WorksheetSource};
    use crate::Dimensions;
    use rstest::rstest;

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.add_worksheet("Data");
        wb
    }

    fn definition(fields: Vec<CacheFieldDefinition>) -> CacheDefinition {
        CacheDefinition {
            source: CacheSource::Worksheet(WorksheetSource {
                sheet: Some("Data".into()),
                reference: Some("A1:C4".into()),
                ..Default::default()
            }),
            fields,
            ..Default::default()
        }
    }

    fn field(name: &str, items: Option<Vec<CacheItem>>) -> CacheFieldDefinition {
        CacheFieldDefinition {
            name: name.into(),
            number_format_id: None,
            shared_items: items,
        }
    }

    #[test]
    fn shared_items_keep_their_order() {
        let def = definition(vec![field(
            "Region",
            Some(vec![
                CacheItem::String("South".into()),
                CacheItem::String("North".into()),
                CacheItem::Number(3.5),
                CacheItem::Boolean(true),
                CacheItem::DateTime("2024-01-02T00:00:00".into()),
                CacheItem::Error("#N/A".into()),
                CacheItem::Missing,
            ]),
        )]);
        let cache = build_cache(&def, &workbook()).unwrap().unwrap();
        assert_eq!(
            cache.field_values(0).unwrap(),
            &[
                Data::String("South".into()),
                Data::String("North".into()),
                Data::Float(3.5),
                Data::Bool(true),
                Data::DateTimeIso("2024-01-02T00:00:00".into()),
                Data::Error(CellErrorType::NA),
                Data::Empty,
            ]
        );
        assert!(cache.fields()[0].has_shared_items());
        assert_eq!(
            cache.source().dimensions(),
            Dimensions::new((0, 0), (3, 2))
        );
    }

    #[test]
    fn duplicate_fields_are_skipped() {
        let def = definition(vec![
            field("Region", None),
            field("Amount", None),
            field("Region", Some(vec![CacheItem::String("x".into())])),
            field("Product", None),
        ]);
        let cache = build_cache(&def, &workbook()).unwrap().unwrap();
        assert_eq!(cache.field_names(), vec!["Region", "Amount", "Product"]);
        assert_eq!(cache.try_field_index("Product"), Some(2));
        assert!(cache.contains_field("Amount"));
        assert!(!cache.contains_field("amount"));
        assert!(cache.field_values(0).unwrap().is_empty());
    }

    #[test]
    fn unknown_error_code() {
        let def = definition(vec![field(
            "Region",
            Some(vec![CacheItem::Error("#BOGUS!".into())]),
        )]);
        assert!(matches!(
            build_cache(&def, &workbook()),
            Err(PivotError::UnknownErrorCode(ref c)) if c == "#BOGUS!"
        ));
    }

    #[test]
    fn records() {
        let mut def = definition(vec![
            field(
                "Region",
                Some(vec![
                    CacheItem::String("North".into()),
                    CacheItem::String("South".into()),
                ]),
            ),
            field("Amount", None),
        ]);
        def.records = Some(vec![
            vec![
                RecordItem::Index(1),
                RecordItem::Value(CacheItem::Number(10.0)),
            ],
            vec![
                RecordItem::Index(0),
                RecordItem::Value(CacheItem::Number(20.0)),
            ],
            vec![
                RecordItem::Index(7),
                RecordItem::Value(CacheItem::Missing),
                RecordItem::Value(CacheItem::Number(1.0)),
            ],
        ]);
        let cache = build_cache(&def, &workbook()).unwrap().unwrap();
        let records = cache.records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            vec![Data::String("South".into()), Data::Float(10.0)]
        );
        assert_eq!(records[2], vec![Data::Empty, Data::Empty]);
        // shared domain untouched, raw values appended as seen
        assert_eq!(cache.field_values(0).unwrap().len(), 2);
        assert_eq!(
            cache.field_values(1).unwrap(),
            &[Data::Float(10.0), Data::Float(20.0), Data::Empty]
        );

        let cache = build_cache_with(&def, &workbook(), false).unwrap().unwrap();
        assert!(cache.records().is_none());
        assert!(cache.field_values(1).unwrap().is_empty());
    }

    #[test]
    fn error_in_record() {
        let mut def = definition(vec![field("Region", None), field("Amount", None)]);
        def.records = Some(vec![vec![
            RecordItem::Value(CacheItem::String("North".into())),
            RecordItem::Value(CacheItem::Error("#DIV/0!".into())),
        ]]);
        assert!(matches!(
            build_cache(&def, &workbook()),
            Err(PivotError::ErrorInRecord {
                record: 0,
                field: 1
            })
        ));
    }

    #[test]
    fn duplicate_field_domain_is_not_decoded() {
        let def = definition(vec![
            field("Region", Some(vec![CacheItem::String("North".into())])),
            field("Region", Some(vec![CacheItem::Error("#BOGUS!".into())])),
        ]);
        let cache = build_cache(&def, &workbook()).unwrap().unwrap();
        assert_eq!(cache.field_names(), vec!["Region"]);
        assert_eq!(
            cache.field_values(0).unwrap(),
            &[Data::String("North".into())]
        );
    }

    #[test]
    fn error_outside_kept_fields_is_reported() {
        let mut def = definition(vec![field("Region", None), field("Region", None)]);
        def.records = Some(vec![vec![
            RecordItem::Value(CacheItem::String("North".into())),
            RecordItem::Value(CacheItem::Error("#N/A".into())),
        ]]);
        assert!(matches!(
            build_cache(&def, &workbook()),
            Err(PivotError::ErrorInRecord {
                record: 0,
                field: 1
            })
        ));

        let mut def = definition(vec![field("Region", None)]);
        def.records = Some(vec![
            vec![RecordItem::Value(CacheItem::String("North".into()))],
            vec![
                RecordItem::Value(CacheItem::String("South".into())),
                RecordItem::Value(CacheItem::Error("#REF!".into())),
            ],
        ]);
        assert!(matches!(
            build_cache(&def, &workbook()),
            Err(PivotError::ErrorInRecord {
                record: 1,
                field: 1
            })
        ));
    }

    #[rstest]
    #[case(None, RetainPolicy::Automatic)]
    #[case(Some(0), RetainPolicy::None)]
    #[case(Some(1_048_576), RetainPolicy::Max)]
    #[case(Some(10), RetainPolicy::Limited(10))]
    fn retain_policy(#[case] limit: Option<u32>, #[case] expected: RetainPolicy) {
        let mut def = definition(Vec::new());
        def.missing_items_limit = limit;
        let cache = build_cache(&def, &workbook()).unwrap().unwrap();
        assert_eq!(cache.retain_policy(), expected);
    }

    #[test]
    fn registry() {
        let wb = workbook();
        let mut caches = PivotCaches::default();
        let first = caches.add(build_cache(&definition(Vec::new()), &wb).unwrap().unwrap());
        assert!(first.set_link_token("rId3"));
        assert!(!first.set_link_token("rId4"));
        let second = caches.add(build_cache(&definition(Vec::new()), &wb).unwrap().unwrap());
        assert_eq!((first.id(), second.id()), (0, 1));
        assert_eq!(caches.find_by_token("rId3").map(|c| c.id()), Some(0));
        assert!(caches.find_by_token("rId4").is_none());
        assert_eq!(
            caches.find_by_source(second.source()).map(|c| c.id()),
            Some(0)
        );
        assert_eq!(caches.len(), 2);
    }

    #[test]
    fn deleted_sheet_is_unsupported() {
        let def = definition(Vec::new());
        assert!(build_cache(&def, &Workbook::new()).unwrap().is_none());
    }
}
