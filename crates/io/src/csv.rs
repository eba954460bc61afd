// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use switchrecon::Table;

use crate::{table_name, IoError};

pub fn import(path: &Path) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(path, &content, delimiter)
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    import_from_string(path, &content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // The header line must split into more than one field
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with the header's field count, weighted by that count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Windows-1252 for Excel-exported CSVs).
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let read_err = |e: std::io::Error| IoError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            log::debug!("{} is not UTF-8; decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn import_from_string(path: &Path, content: &str, delimiter: u8) -> Result<Table, IoError> {
    Table::from_delimited(table_name(path), content, delimiter).map_err(|e| IoError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn export(table: &Table, path: &Path) -> Result<(), IoError> {
    export_with_delimiter(table, path, b',')
}

fn export_with_delimiter(table: &Table, path: &Path, delimiter: u8) -> Result<(), IoError> {
    let write_err = |message: String| IoError::Write {
        path: path.to_path_buf(),
        message,
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| write_err(e.to_string()))?;

    writer
        .write_record(&table.headers)
        .map_err(|e| write_err(e.to_string()))?;
    for row in &table.rows {
        let record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writer
            .write_record(&record)
            .map_err(|e| write_err(e.to_string()))?;
    }

    writer.flush().map_err(|e| write_err(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use switchrecon::Value;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Cons Code;Scheme Code;Trail Rate 1 Year\nBRK1;SF1;0,5\nBRK2;SF2;1,0\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Cons Code,Scheme Code,Trail Rate 1 Year\nBRK1,SF1,0.5\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Folio\tFrom\tScheme :\nF1\t129B/A, Regular\t200C/B\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_pipe_delimiter() {
        let content = "A|B|C\n1|2|3\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "From;Scheme;Broker\n\"129B/Fund A, Regular\";\"200C/Fund B, Direct\";BRK1\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_skips_leading_blank_lines() {
        assert_eq!(sniff_delimiter("\n\nA;B\n1;2\n"), b';');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_semicolon_csv_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("brokerage.csv");
        fs::write(&path, "Cons Code;Scheme Code\nBRK1;SF1\n\n;\nBRK2;SF2\n").unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.name, "brokerage.csv");
        assert_eq!(table.headers, vec!["Cons Code", "Scheme Code"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 0), &Value::text("BRK2"));
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.csv");
        // "Société" with é encoded as 0xE9
        let mut bytes = b"SCHEME_CODE,NAME\n129B,Soci".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"t\xE9\n");
        fs::write(&path, bytes).unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.cell(0, 1), &Value::text("Société"));
    }

    #[test]
    fn test_export_renders_not_found_and_quotes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut table = Table::new("out", vec!["Scheme".into(), "Rate".into(), "Check".into()]);
        table.push_row(vec![Value::text("A, B"), Value::NotFound, Value::Empty]);
        table.push_row(vec![Value::text("C"), Value::Number(0.5), Value::text("Check")]);

        export(&table, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Scheme,Rate,Check\n\"A, B\",Not Found,\nC,0.5,Check\n");

        let back = import(&path).unwrap();
        assert_eq!(back.headers, table.headers);
        assert_eq!(back.cell(0, 1), &Value::text("Not Found"));
    }
}
