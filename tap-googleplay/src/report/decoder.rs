//! UTF-16LE CSV decoding for report blobs.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::error::{Result, TapError};

/// Byte-order mark at the start of every Play Console export.
pub const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];

const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// One data line keyed by normalized header name.
///
/// Rows shorter than the header only carry the positions that were present.
pub type DecodedRow = BTreeMap<String, String>;

/// Decoded content of one report blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedReport {
    /// Normalized header names in column order
    pub header: Vec<String>,
    pub rows: Vec<DecodedRow>,
}

impl DecodedReport {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Decodes UTF-16LE bytes, dropping a leading byte-order mark when present.
pub fn decode_utf16le(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(&UTF16_BE_BOM) {
        return Err(TapError::decode(
            "found a UTF-16 big-endian byte-order mark, expected little-endian",
        ));
    }
    let body = bytes.strip_prefix(&UTF16_LE_BOM[..]).unwrap_or(bytes);
    if body.len() % 2 != 0 {
        return Err(TapError::decode(format!(
            "UTF-16 payload has odd length {}",
            body.len()
        )));
    }
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| TapError::decode(format!("invalid UTF-16LE text: {e}")))
}

/// Lowercases header fields and replaces spaces with underscores.
pub fn normalize_header(line: &str) -> Vec<String> {
    line.trim_end_matches('\r')
        .split(',')
        .map(|field| field.to_lowercase().replace(' ', "_"))
        .collect()
}

/// Decodes a report blob into its header and rows.
///
/// The first line is the header. Remaining lines are parsed as quote-aware
/// CSV; empty lines are skipped and values are trimmed.
#[instrument(skip_all, fields(size = bytes.len()))]
pub fn decode_report(bytes: &[u8]) -> Result<DecodedReport> {
    let text = decode_utf16le(bytes)?;
    if text.trim().is_empty() {
        debug!("Report blob is empty");
        return Ok(DecodedReport::default());
    }

    let (header_line, body) = text.split_once('\n').unwrap_or((text.as_str(), ""));
    let header = normalize_header(header_line);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| TapError::decode(format!("malformed CSV row: {e}")))?;
        if record.is_empty() || (record.len() == 1 && record[0].is_empty()) {
            continue;
        }
        let row: DecodedRow = header
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.clone(), value.trim().to_string()))
            .collect();
        rows.push(row);
    }

    debug!(columns = header.len(), rows = rows.len(), "Decoded report");
    Ok(DecodedReport { header, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str, with_bom: bool) -> Vec<u8> {
        let mut bytes = if with_bom { UTF16_LE_BOM.to_vec() } else { Vec::new() };
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_header_normalization() {
        assert_eq!(
            normalize_header("Date,Package Name,Android OS Version,Daily Device Installs\r"),
            vec!["date", "package_name", "android_os_version", "daily_device_installs"]
        );
    }

    #[test]
    fn test_decode_with_and_without_bom() {
        let text = "Date,Package Name,Device,Installs\n2019-06-01,com.example,v10,5\n";
        for with_bom in [true, false] {
            let report = decode_report(&encode(text, with_bom)).unwrap();
            assert_eq!(report.header, vec!["date", "package_name", "device", "installs"]);
            assert_eq!(report.len(), 1);
            assert_eq!(report.rows[0]["device"], "v10");
            assert_eq!(report.rows[0]["installs"], "5");
        }
    }

    #[test]
    fn test_quoted_commas_do_not_split() {
        let text = "Date,Package Name,Device,Installs\n2019-06-01,com.example,\"Pixel, 3a\",7\n";
        let report = decode_report(&encode(text, true)).unwrap();
        assert_eq!(report.rows[0]["device"], "Pixel, 3a");
        assert_eq!(report.rows[0]["installs"], "7");
    }

    #[test]
    fn test_values_trimmed_and_blank_lines_skipped() {
        let text = "Date,Installs\r\n 2019-06-01 ,  12 \r\n\r\n\n2019-06-02,3\n";
        let report = decode_report(&encode(text, true)).unwrap();
        assert_eq!(report.header, vec!["date", "installs"]);
        assert_eq!(report.len(), 2);
        assert_eq!(report.rows[0]["date"], "2019-06-01");
        assert_eq!(report.rows[0]["installs"], "12");
        assert_eq!(report.rows[1]["date"], "2019-06-02");
    }

    #[test]
    fn test_short_row_only_populates_present_positions() {
        let text = "Date,Package Name,Device,Installs\n2019-06-01,com.example\n";
        let report = decode_report(&encode(text, true)).unwrap();
        let row = &report.rows[0];
        assert_eq!(row.len(), 2);
        assert_eq!(row["package_name"], "com.example");
        assert!(!row.contains_key("device"));
        assert!(!row.contains_key("installs"));
    }

    #[test]
    fn test_long_row_ignores_extra_fields() {
        let text = "Date,Installs\n2019-06-01,1,unexpected\n";
        let report = decode_report(&encode(text, true)).unwrap();
        assert_eq!(report.rows[0].len(), 2);
    }

    #[test]
    fn test_empty_blob() {
        let report = decode_report(&UTF16_LE_BOM).unwrap();
        assert!(report.header.is_empty());
        assert!(report.is_empty());
    }

    #[test]
    fn test_header_only() {
        let report = decode_report(&encode("Date,Installs", true)).unwrap();
        assert_eq!(report.header, vec!["date", "installs"]);
        assert!(report.is_empty());
    }

    #[test]
    fn test_big_endian_bom_rejected() {
        let err = decode_report(&[0xFE, 0xFF, 0x00, 0x41]).unwrap_err();
        assert!(matches!(err, TapError::Decode(_)));
    }

    #[test]
    fn test_odd_length_rejected() {
        let mut bytes = encode("Date", true);
        bytes.push(0x41);
        assert!(matches!(decode_report(&bytes).unwrap_err(), TapError::Decode(_)));
    }

    #[test]
    fn test_unpaired_surrogate_rejected() {
        let mut bytes = UTF16_LE_BOM.to_vec();
        bytes.extend_from_slice(&0xD800u16.to_le_bytes());
        bytes.extend_from_slice(&0x0041u16.to_le_bytes());
        assert!(matches!(decode_report(&bytes).unwrap_err(), TapError::Decode(_)));
    }
}
