use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde_json::{Deserializer, Value};

use crate::config::{IngestMode, ServerConfig};
use crate::error::ServiceError;
use crate::trade::{ParsePolicy, Trade};

/// Build the in-memory trade table per the configured ingestion mode.
///
/// Called once at startup; any error here is fatal and the server never
/// starts accepting requests.
pub fn load_table(cfg: &ServerConfig) -> Result<Vec<Trade>, ServiceError> {
    match cfg.ingest_mode {
        IngestMode::Strict => load_file_strict(&cfg.data_path),
        IngestMode::Lenient => {
            if cfg.data_path.is_dir() {
                load_dir(&cfg.data_path)
            } else {
                load_file_lenient(&cfg.data_path)
            }
        }
    }
}

/// Recover every top-level JSON document in `text`.
///
/// Upstream exports sometimes append whole API responses to one file with no
/// separator between documents. The streaming deserializer reads them back
/// one at a time without any string surgery on object boundaries, so nested
/// objects and `{`-containing strings cannot confuse it. A document that
/// fails to parse is logged and skipped; parsing resumes at the next `{`
/// past the corrupt region.
pub fn read_concatenated(text: &str) -> Vec<Value> {
    let mut docs = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let mut stream = Deserializer::from_str(rest).into_iter::<Value>();
        let failed_at = loop {
            match stream.next() {
                Some(Ok(doc)) => docs.push(doc),
                Some(Err(e)) => {
                    let at = stream.byte_offset();
                    tracing::warn!(
                        "Skipping unparsable JSON at byte {}: {e}",
                        text.len() - rest.len() + at,
                    );
                    break Some(at);
                }
                None => break None,
            }
        };
        let Some(at) = failed_at else {
            break;
        };

        // Resync at the next `{` past the failure point. One byte of
        // progress is forced so a corrupt document is not retried forever.
        let tail = &rest[at..];
        let Some(step) = tail.chars().next().map(char::len_utf8) else {
            break;
        };
        match tail[step..].find('{') {
            Some(i) => rest = &tail[step + i..],
            None => break,
        }
    }
    docs
}

/// Load one source file under the strict policy.
///
/// The file may hold several concatenated JSON documents. Documents without
/// a `datatable.data` array are skipped; any row failing strict conversion
/// aborts the whole file.
pub fn load_file_strict(path: &Path) -> Result<Vec<Trade>, ServiceError> {
    let text = read_source(path)?;
    let mut table = Vec::new();
    for doc in read_concatenated(&text) {
        let Some(rows) = datatable_rows(&doc) else {
            continue;
        };
        for row in rows {
            table.push(Trade::from_row(row_array(row)?, ParsePolicy::Strict)?);
        }
    }
    tracing::info!("Parsed {} trades from {}", table.len(), path.display());
    Ok(table)
}

/// Load one source file as a single JSON document under the lenient policy.
pub fn load_file_lenient(path: &Path) -> Result<Vec<Trade>, ServiceError> {
    let text = read_source(path)?;
    let doc: Value = serde_json::from_str(&text)?;
    let rows = datatable_rows(&doc).ok_or_else(|| {
        ServiceError::MalformedJson(format!("{}: missing datatable.data array", path.display()))
    })?;

    let mut table = Vec::with_capacity(rows.len());
    for row in rows {
        table.push(Trade::from_row(row_array(row)?, ParsePolicy::Lenient)?);
    }
    Ok(table)
}

/// Load every `*.json` file in `dir` (non-recursive) under the lenient
/// policy, concatenating the per-file tables.
///
/// File names are sorted so the table layout does not depend on OS
/// enumeration order. A file that fails to load is logged and skipped; it
/// never aborts its siblings.
pub fn load_dir(dir: &Path) -> Result<Vec<Trade>, ServiceError> {
    if !dir.is_dir() {
        return Err(ServiceError::NotFound(format!(
            "source directory {} not found",
            dir.display()
        )));
    }

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut table = Vec::new();
    for path in &paths {
        match load_file_lenient(path) {
            Ok(mut rows) => {
                tracing::info!("Loaded {} trades from {}", rows.len(), path.display());
                table.append(&mut rows);
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {e}", path.display());
            }
        }
    }

    log_table_summary(&table);
    Ok(table)
}

/// Row count, date span, and distinct symbols. Observability only.
fn log_table_summary(table: &[Trade]) {
    let min_date = table.iter().filter_map(|t| t.date).min();
    let max_date = table.iter().filter_map(|t| t.date).max();
    let symbols: BTreeSet<&str> = table.iter().filter_map(|t| t.symbol.as_deref()).collect();
    tracing::info!(
        "Table loaded: {} rows, dates {} .. {}, {} symbols: {symbols:?}",
        table.len(),
        min_date.map_or_else(|| "-".to_string(), |d| d.to_string()),
        max_date.map_or_else(|| "-".to_string(), |d| d.to_string()),
        symbols.len(),
    );
}

fn read_source(path: &Path) -> Result<String, ServiceError> {
    if !path.exists() {
        return Err(ServiceError::NotFound(format!(
            "source file {} not found",
            path.display()
        )));
    }
    Ok(fs::read_to_string(path)?)
}

fn datatable_rows(doc: &Value) -> Option<&Vec<Value>> {
    doc.get("datatable")?.get("data")?.as_array()
}

fn row_array(row: &Value) -> Result<&Vec<Value>, ServiceError> {
    row.as_array().ok_or_else(|| {
        ServiceError::MalformedRecord(format!("row is not a positional array: {row}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_path(tag: &str, ext: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("trades_server_{tag}_{nanos}.{ext}"))
    }

    const ROW: &str =
        r#"["EURUSD","2023-06-01",10,1.10,1.12,1.09,1.11,1.101,1.121,1.091,1.111,500]"#;

    fn datatable_doc(rows: &[&str]) -> String {
        format!(r#"{{"datatable":{{"data":[{}]}}}}"#, rows.join(","))
    }

    #[test]
    fn concatenated_documents_are_recovered_independently() {
        let docs = read_concatenated(r#"{"a":1}{"b":2}{"c":3}"#);
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0], serde_json::json!({"a": 1}));
        assert_eq!(docs[1], serde_json::json!({"b": 2}));
        assert_eq!(docs[2], serde_json::json!({"c": 3}));
    }

    #[test]
    fn concatenated_handles_nested_braces_and_strings() {
        let docs = read_concatenated(r#"{"a":{"x":"}{"}}{"b":[{"y":2}]}"#);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["a"]["x"], "}{");
        assert_eq!(docs[1]["b"][0]["y"], 2);
    }

    #[test]
    fn concatenated_skips_corrupt_document() {
        let docs = read_concatenated(r#"{"a":1}{"broken":}{"c":3}"#);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0], serde_json::json!({"a": 1}));
        assert_eq!(docs[1], serde_json::json!({"c": 3}));
    }

    #[test]
    fn concatenated_resumes_after_garbage() {
        let docs = read_concatenated(r#"{"a":1} this is not json {"c":3}"#);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1], serde_json::json!({"c": 3}));

        let docs = read_concatenated(r#"{"a":1} trailing garbage only"#);
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn strict_load_merges_concatenated_documents() {
        let path = tmp_path("strict_concat", "json");
        let row2 =
            r#"["GBPUSD","2023-06-02",11,1.20,1.22,1.19,1.21,1.201,1.221,1.191,1.211,300]"#;
        let content = format!("{}{}", datatable_doc(&[ROW]), datatable_doc(&[row2]));
        fs::write(&path, content).unwrap();

        let table = load_file_strict(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table[0].symbol.as_deref(), Some("EURUSD"));
        assert_eq!(table[1].symbol.as_deref(), Some("GBPUSD"));
    }

    #[test]
    fn strict_load_skips_documents_without_datatable() {
        let path = tmp_path("strict_skip", "json");
        let content = format!(r#"{{"meta":{{"next_cursor_id":null}}}}{}"#, datatable_doc(&[ROW]));
        fs::write(&path, content).unwrap();

        let table = load_file_strict(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(table.len(), 1);
    }

    #[test]
    fn strict_load_aborts_on_bad_row() {
        let path = tmp_path("strict_bad_row", "json");
        let bad = r#"["EURUSD","2023-06-01","ten",1.10,1.12,1.09,1.11,1.101,1.121,1.091,1.111,500]"#;
        fs::write(&path, datatable_doc(&[ROW, bad])).unwrap();

        let err = load_file_strict(&path).unwrap_err();
        fs::remove_file(&path).unwrap();

        assert!(matches!(err, ServiceError::MalformedRecord(_)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_file_strict(Path::new("/nonexistent/trades.json")).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn lenient_load_requires_datatable() {
        let path = tmp_path("lenient_no_dt", "json");
        fs::write(&path, r#"{"rows":[]}"#).unwrap();

        let err = load_file_lenient(&path).unwrap_err();
        fs::remove_file(&path).unwrap();

        assert!(matches!(err, ServiceError::MalformedJson(_)));
    }

    #[test]
    fn lenient_load_accepts_short_rows() {
        let path = tmp_path("lenient_short", "json");
        fs::write(
            &path,
            datatable_doc(&[r#"["EURUSD","2023-01-02",9,1.1,1.2,1.0,1.15]"#]),
        )
        .unwrap();

        let table = load_file_lenient(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table[0].closebid, Some(1.15));
        assert_eq!(table[0].totalticks, None);
    }

    #[test]
    fn dir_load_skips_bad_files_and_sorts() {
        let dir = tmp_path("dir", "d");
        fs::create_dir(&dir).unwrap();

        let row_b = r#"["GBPUSD","2023-06-02",0,1.2,1.2,1.2,1.2,1.2,1.2,1.2,1.2,1]"#;
        fs::write(dir.join("b.json"), datatable_doc(&[row_b])).unwrap();
        fs::write(dir.join("a.json"), datatable_doc(&[ROW])).unwrap();
        fs::write(dir.join("broken.json"), "not json at all").unwrap();
        fs::write(dir.join("ignored.txt"), "not enumerated").unwrap();

        let table = load_dir(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        // broken.json is skipped, a.json sorts before b.json.
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].symbol.as_deref(), Some("EURUSD"));
        assert_eq!(table[1].symbol.as_deref(), Some("GBPUSD"));
    }

    #[test]
    fn dir_load_missing_directory_is_not_found() {
        let err = load_dir(Path::new("/nonexistent/trades")).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
