use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(0);

struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before epoch")
            .as_nanos();
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("dataset-cli-{prefix}-{stamp}-{seq}"));
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn write(&self, name: &str, contents: &str) -> String {
        let path = self.path.join(name);
        fs::write(&path, contents).expect("failed to write fixture");
        path.to_string_lossy().into_owned()
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn dataset_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_dataset-cli"))
}

#[test]
fn info_prints_columns_and_row_count() {
    let temp = TempDir::new("info");
    let path = temp.write("people.csv", "id,name\n1,Ada\n2,Grace\n");
    let output = dataset_cmd()
        .args(["info", &path])
        .output()
        .expect("failed to run dataset-cli");

    assert!(
        output.status.success(),
        "info should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Columns (2): id, name"));
    assert!(stdout.contains("Rows: 2"));
}

#[test]
fn info_json_emits_preview() {
    let temp = TempDir::new("info-json");
    let path = temp.write("people.csv", "id,name\n1,Ada\n2,Grace\n");
    let output = dataset_cmd()
        .args(["info", "--format", "json", "--rows", "1", &path])
        .output()
        .expect("failed to run dataset-cli");

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(value["total_rows"], 2);
    assert_eq!(value["rows"].as_array().map(Vec::len), Some(1));
}

#[test]
fn clean_writes_v1_next_to_input() {
    let temp = TempDir::new("clean");
    let path = temp.write("sales.csv", "a,b\n1,2\n,\n1,2\n");
    let output = dataset_cmd()
        .args(["clean", "--dedupe", &path])
        .output()
        .expect("failed to run dataset-cli");

    assert!(
        output.status.success(),
        "clean should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let cleaned = fs::read_to_string(temp.path.join("sales_v1.csv")).expect("v1 written");
    assert_eq!(cleaned, "a,b\n1,2\n");
}

#[test]
fn partition_writes_numbered_files() {
    let temp = TempDir::new("partition");
    let path = temp.write("tags.csv", "Tags,Tag Type,Value\nB,Y,1\nA,X,2\n,,3\n");
    let out_dir = temp.path.join("parts");
    let output = dataset_cmd()
        .args(["partition", "--out-dir", &out_dir.to_string_lossy(), &path])
        .output()
        .expect("failed to run dataset-cli");

    assert!(
        output.status.success(),
        "partition should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(out_dir.join("A_X_v2.1.csv").is_file());
    assert!(out_dir.join("B_Y_v2.2.csv").is_file());
    assert!(out_dir.join("Untagged_Unknown_v2.3.csv").is_file());
}

#[test]
fn tags_on_missing_column_exits_2() {
    let temp = TempDir::new("tags-missing");
    let path = temp.write("plain.csv", "Tags,Value\nA,1\n");
    let output = dataset_cmd()
        .args(["tags", &path])
        .output()
        .expect("failed to run dataset-cli");

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Tag Type"));
}

#[test]
fn unsupported_extension_exits_2() {
    let temp = TempDir::new("unsupported");
    let path = temp.write("notes.txt", "hello");
    let output = dataset_cmd()
        .args(["info", &path])
        .output()
        .expect("failed to run dataset-cli");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn partition_names_match_service_and_never_overwrite() {
    let temp = TempDir::new("partition-clash");
    let path = temp.write("A_X_v2.1.csv", "Tags,Tag Type\nA,X\nNorth East,Tag Type\n");
    let output = dataset_cmd()
        .args(["partition", &path])
        .output()
        .expect("failed to run dataset-cli");

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Refusing to overwrite"));
    let input = fs::read_to_string(&path).expect("input still readable");
    assert_eq!(input, "Tags,Tag Type\nA,X\nNorth East,Tag Type\n");
    assert!(!temp.path.join("North_East_Tag_Type_v2.2.csv").exists());

    let out_dir = temp.path.join("parts");
    let output = dataset_cmd()
        .args(["partition", "--out-dir", &out_dir.to_string_lossy(), &path])
        .output()
        .expect("failed to run dataset-cli");
    assert!(
        output.status.success(),
        "partition should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(out_dir.join("A_X_v2.1.csv").is_file());
    assert!(out_dir.join("North_East_Tag_Type_v2.2.csv").is_file());
}
