#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use xlpivot::xlsx::{read_cache_definition, read_cache_records, read_dxfs, read_table_definition};
use xlpivot::{open_pivot_tables, Workbook};

fuzz_target!(|data: &[u8]| {
    let _ = read_cache_definition(data);
    let _ = read_cache_records(data);
    let _ = read_table_definition(data);
    let _ = read_dxfs(data);

    let mut workbook = Workbook::new();
    for name in ["Sheet1", "Sheet2", "Data"] {
        let sheet = workbook.add_worksheet(name);
        for row in 0..4 {
            for col in 0..4 {
                sheet.set_value((row, col), format!("{row}-{col}"));
            }
        }
    }
    if open_pivot_tables(Cursor::new(data), &mut workbook).is_ok() {
        for sheet in workbook.worksheets() {
            for table in sheet.pivot_tables() {
                let _ = table.cache().field_names();
            }
        }
    }
});
