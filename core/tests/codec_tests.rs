mod common;

use common::{TempDir, table};
use dataset_core::{TableError, TableFormat, load, load_header_only, save, save_as};

#[test]
fn csv_round_trip_preserves_cells() {
    let temp = TempDir::new("csv-roundtrip");
    let original = table(
        &["id", "amount", "when"],
        &[&["007", "1.50", "2024-01-02"], &["8", "", "n/a"]],
    );
    let path = temp.path.join("out.csv");
    save(&original, &path).expect("save csv");
    let loaded = load(&path).expect("load csv");
    assert_eq!(loaded, original);
}

#[test]
fn csv_round_trip_quotes_embedded_delimiters() {
    let temp = TempDir::new("csv-quoting");
    let original = table(&["name", "note"], &[&["Smith, Jane", "said \"hi\""]]);
    let path = temp.path.join("quoted.csv");
    save(&original, &path).expect("save csv");
    assert_eq!(load(&path).expect("load csv"), original);
}

#[test]
fn csv_load_skips_blank_lines_and_pads_ragged_rows() {
    let temp = TempDir::new("csv-ragged");
    let path = temp.write("ragged.csv", "a,b,c\n1,2\n\n4,5,6,7\n");
    let loaded = load(&path).expect("load csv");
    assert_eq!(loaded, table(&["a", "b", "c"], &[&["1", "2", ""], &["4", "5", "6"]]));
}

#[test]
fn csv_header_only_reads_first_record() {
    let temp = TempDir::new("csv-header");
    let path = temp.write("header.csv", "Name,,Name\nx,y,z\n");
    let header = load_header_only(&path).expect("header");
    assert_eq!(header, vec!["Name", "Unnamed: 1", "Name.1"]);
}

#[test]
fn empty_csv_is_a_read_failure() {
    let temp = TempDir::new("csv-empty");
    let path = temp.write("empty.csv", "");
    let err = load(&path).expect_err("empty file has no header");
    assert!(matches!(err, TableError::Read { .. }));
}

#[test]
fn xlsx_round_trip_keeps_text_verbatim() {
    let temp = TempDir::new("xlsx-roundtrip");
    let original = table(
        &["Tags", "Tag Type", "Value"],
        &[&["A", "X", "0012"], &["", "Y", "1e3"], &["B", "", "TRUE"]],
    );
    let path = temp.path.join("out.xlsx");
    save(&original, &path).expect("save xlsx");
    let loaded = load(&path).expect("load xlsx");
    assert_eq!(loaded, original);
    assert_eq!(load_header_only(&path).expect("header"), vec!["Tags", "Tag Type", "Value"]);
}

#[test]
fn save_as_overrides_extension_dispatch() {
    let temp = TempDir::new("save-as");
    let original = table(&["a"], &[&["1"]]);
    let path = temp.path.join("data.csv");
    save_as(&original, &path, TableFormat::Csv).expect("save csv");
    let text = std::fs::read_to_string(&path).expect("read back");
    assert_eq!(text, "a\n1\n");
}

#[test]
fn csv_bytes_with_xlsx_extension_fail_to_read() {
    let temp = TempDir::new("xlsx-bogus");
    let path = temp.write("fake.xlsx", "a,b\n1,2\n");
    let err = load(&path).expect_err("not a zip package");
    assert!(matches!(err, TableError::Read { .. }));
    assert_eq!(err.code(), dataset_core::error_codes::READ_FAILURE);
}

#[test]
fn unsupported_extension_is_rejected_before_reading() {
    let err = load(std::path::Path::new("does/not/exist.json")).expect_err("unsupported");
    assert!(matches!(err, TableError::UnsupportedFormat(_)));
    assert_eq!(err.code(), dataset_core::error_codes::UNSUPPORTED_FORMAT);
}
