//! Delimited file reader with an encoding fallback.
//!
//! Decodes the file with the primary encoding and parses it; if either
//! step fails the whole load is retried once with the fallback encoding.
//! Column headers are trimmed. Cells are kept as text.

use std::path::Path;

use crate::config::TextEncoding;
use crate::error::{SourceError, SourceResult};
use crate::logs::{log_info, log_success, log_warning};
use crate::models::Table;

const STAGE: &str = "source";

/// Result of loading with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub table: Table,
    /// Encoding actually used to decode the file
    pub encoding: String,
    pub delimiter: u8,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> TextEncoding {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => TextEncoding::Latin1,
        "windows-1252" | "cp1252" => TextEncoding::Windows1252,
        _ => TextEncoding::Utf8,
    }
}

/// Decode bytes strictly; malformed input is an error, never replaced.
pub fn decode_content(bytes: &[u8], encoding: TextEncoding) -> Result<(String, TextEncoding), String> {
    match encoding {
        TextEncoding::Utf8 => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            std::str::from_utf8(bytes)
                .map(|s| (s.to_string(), TextEncoding::Utf8))
                .map_err(|e| format!("invalid UTF-8: {}", e))
        }
        TextEncoding::Latin1 => Ok((
            encoding_rs::mem::decode_latin1(bytes).into_owned(),
            TextEncoding::Latin1,
        )),
        TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|s| (s.into_owned(), TextEncoding::Windows1252))
            .ok_or_else(|| "invalid windows-1252 byte sequence".to_string()),
        TextEncoding::Auto => decode_content(bytes, detect_encoding(bytes)),
    }
}

/// Parse decoded text into a [`Table`].
///
/// Short rows are padded with empty cells; a row with more fields than
/// the header is a parse error.
pub fn parse_table(content: &str, delimiter: u8) -> Result<Table, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| format!("cannot read header: {}", e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err("empty file: no header row".to_string());
    }

    let mut rows = Vec::new();
    let mut lines = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| format!("line {}: {}", idx + 2, e))?;
        let line = record
            .position()
            .and_then(|p| usize::try_from(p.line()).ok())
            .unwrap_or(idx + 2);
        if record.len() > headers.len() {
            return Err(format!(
                "line {}: expected {} fields, saw {}",
                line,
                headers.len(),
                record.len()
            ));
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
        lines.push(line);
    }

    Ok(Table::with_lines(headers, rows, lines))
}

/// Decode and parse bytes with a single encoding.
pub fn parse_bytes(bytes: &[u8], encoding: TextEncoding, delimiter: u8) -> Result<ParseResult, String> {
    let (content, used) = decode_content(bytes, encoding)?;
    let table = parse_table(&content, delimiter)?;
    Ok(ParseResult {
        table,
        encoding: used.label().to_string(),
        delimiter,
    })
}

/// Load a delimited file, falling back to `fallback` once if `primary`
/// cannot decode or parse it.
pub fn load(
    path: &Path,
    primary: TextEncoding,
    fallback: TextEncoding,
    delimiter: u8,
) -> SourceResult<ParseResult> {
    if !path.exists() {
        return Err(SourceError::NotFound { path: path.to_path_buf() });
    }

    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SourceError::NotFound { path: path.to_path_buf() }
        } else {
            SourceError::Unreadable {
                path: path.to_path_buf(),
                primary_encoding: primary.to_string(),
                primary_error: e.to_string(),
                fallback_encoding: fallback.to_string(),
                fallback_error: "not attempted".to_string(),
            }
        }
    })?;

    log_info(STAGE, format!("Reading {} ({})", path.display(), primary));
    let primary_error = match parse_bytes(&bytes, primary, delimiter) {
        Ok(result) => {
            log_loaded(path, &result);
            return Ok(result);
        }
        Err(e) => e,
    };

    log_warning(
        STAGE,
        format!("{} failed with {}: {}; retrying with {}", path.display(), primary, primary_error, fallback),
    );
    match parse_bytes(&bytes, fallback, delimiter) {
        Ok(result) => {
            log_loaded(path, &result);
            Ok(result)
        }
        Err(fallback_error) => Err(SourceError::Unreadable {
            path: path.to_path_buf(),
            primary_encoding: primary.to_string(),
            primary_error,
            fallback_encoding: fallback.to_string(),
            fallback_error,
        }),
    }
}

fn log_loaded(path: &Path, result: &ParseResult) {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("input");
    log_success(
        STAGE,
        format!(
            "Loaded {} ({}): {} rows x {} columns",
            name,
            result.encoding,
            result.table.len(),
            result.table.headers.len()
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_headers_trimmed() {
        let table = parse_table(" fmun ; ano ;mes\nRio;2024;1", b';').unwrap();
        assert_eq!(table.headers, vec!["fmun", "ano", "mes"]);
        assert_eq!(table.rows[0], vec!["Rio", "2024", "1"]);
    }

    #[test]
    fn test_short_rows_padded() {
        let table = parse_table("a;b;c\n1;2", b';').unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn test_long_row_is_error() {
        let err = parse_table("a;b\n1;2;3", b';').unwrap_err();
        assert!(err.contains("line 2"));
    }

    #[test]
    fn test_quoted_separator() {
        let table = parse_table("fmun;ano\n\"Rio; capital\";2024", b';').unwrap();
        assert_eq!(table.rows[0][0], "Rio; capital");
    }

    #[test]
    fn test_source_lines_recorded() {
        let table = parse_table("fmun;ano\nRio;2024\n\"Rio\nNorte\";2024\nNiterói;2023", b';').unwrap();
        assert_eq!(table.lines, vec![2, 3, 5]);
    }

    #[test]
    fn test_empty_content_error() {
        assert!(parse_table("", b';').is_err());
    }

    #[test]
    fn test_latin1_decoding() {
        // "Niterói" in ISO-8859-1
        let bytes: &[u8] = &[0x4E, 0x69, 0x74, 0x65, 0x72, 0xF3, 0x69];
        let (decoded, used) = decode_content(bytes, TextEncoding::Latin1).unwrap();
        assert_eq!(decoded, "Niterói");
        assert_eq!(used, TextEncoding::Latin1);
    }

    #[test]
    fn test_strict_utf8_rejects_latin1_bytes() {
        let bytes: &[u8] = &[0x4E, 0xF3];
        assert!(decode_content(bytes, TextEncoding::Utf8).is_err());
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let (decoded, _) = decode_content(b"\xEF\xBB\xBFfmun;ano", TextEncoding::Utf8).unwrap();
        assert_eq!(decoded, "fmun;ano");
    }

    #[test]
    fn test_load_not_found() {
        let dir = tempdir().unwrap();
        let err = load(&dir.path().join("nope.csv"), TextEncoding::Latin1, TextEncoding::Utf8, b';').unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[test]
    fn test_load_primary_encoding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, b"fmun;ano\nNiter\xF3i;2024\n").unwrap();

        let result = load(&path, TextEncoding::Latin1, TextEncoding::Utf8, b';').unwrap();
        assert_eq!(result.encoding, "latin1");
        assert_eq!(result.table.rows[0][0], "Niterói");
    }

    #[test]
    fn test_load_falls_back_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        // Latin-1 bytes are invalid UTF-8, so a UTF-8 primary falls back.
        std::fs::write(&path, b"fmun;ano\nNiter\xF3i;2024\n").unwrap();
        let result = load(&path, TextEncoding::Utf8, TextEncoding::Latin1, b';').unwrap();
        assert_eq!(result.encoding, "latin1");
        assert_eq!(result.table.rows[0][0], "Niterói");
    }

    #[test]
    fn test_load_unreadable_when_both_fail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, "a;b\n1;2;3;4\n").unwrap();

        let err = load(&path, TextEncoding::Latin1, TextEncoding::Utf8, b';').unwrap_err();
        match err {
            SourceError::Unreadable { primary_error, fallback_error, .. } => {
                assert!(primary_error.contains("line 2"));
                assert!(fallback_error.contains("line 2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
