//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tap_googleplay::report::UTF16_LE_BOM;

pub const PACKAGE: &str = "com.example.app";
pub const HEADER: &str =
    "Date,Package Name,Android OS Version,Daily Device Installs,Daily Device Uninstalls,Total User Installs";

/// Encodes report text the way the Play Console exports it.
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut bytes = UTF16_LE_BOM.to_vec();
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// A two-row report for `month` (`YYYY-MM`) with CRLF line endings.
pub fn month_report(month: &str) -> Vec<u8> {
    let text = format!(
        "{HEADER}\r\n{month}-01,{PACKAGE},Android 9,10,1,500\r\n{month}-02,{PACKAGE},Android 10,12,,510\r\n"
    );
    encode_utf16le(&text)
}

pub fn report_key(yyyymm: &str) -> String {
    format!("stats/installs/installs_{PACKAGE}_{yyyymm}_os_version.csv")
}

pub fn config_json(start_date: &str) -> Value {
    json!({
        "key_file": "/secrets/service-account.json",
        "start_date": start_date,
        "bucket_name": "pubsite_prod_rev_0123456789",
        "package_name": PACKAGE
    })
}

/// Writes `value` as a JSON file and returns its path.
pub fn write_json(dir: &Path, name: &str, value: &Value) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

/// Places a report blob under a local report root.
pub fn write_report(root: &Path, yyyymm: &str, bytes: &[u8]) {
    let path = root.join(report_key(yyyymm));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// Parses JSON-lines sink output.
pub fn parse_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8(output.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
