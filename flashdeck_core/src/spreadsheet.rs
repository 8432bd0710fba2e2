//! Spreadsheet import (Excel, ODS and CSV) and CSV export of word records

use calamine::{open_workbook_auto, Data, Reader};
use csv::{ReaderBuilder, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::SpreadsheetError;
use crate::word::{ImportRow, WordRecord};

/// Header row written on export
pub const EXPORT_HEADERS: [&str; 3] = ["English", "Turkish", "ExampleSentence"];

/// Read word rows from a spreadsheet, picking the reader by file extension
pub fn read_rows(file_path: impl AsRef<Path>) -> Result<Vec<ImportRow>, SpreadsheetError> {
    let path = file_path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path)?,
        "csv" => read_csv(File::open(path)?)?,
        _ => return Err(SpreadsheetError::UnsupportedFormat(extension)),
    };
    log::info!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Where the word columns sit. Named columns win; otherwise the first two
/// columns are English and Turkish.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub english: Option<usize>,
    pub turkish: Option<usize>,
    pub example_sentence: Option<usize>,
}

impl ColumnMapping {
    pub fn detect(headers: &[String]) -> Self {
        let mut mapping = ColumnMapping::default();
        for (i, header) in headers.iter().enumerate() {
            match header.trim().to_lowercase().as_str() {
                "english" => mapping.english = mapping.english.or(Some(i)),
                "turkish" => mapping.turkish = mapping.turkish.or(Some(i)),
                "examplesentence" | "example sentence" | "example" => {
                    mapping.example_sentence = mapping.example_sentence.or(Some(i))
                }
                _ => {}
            }
        }
        mapping
    }

    /// Map one row of cell strings. Blank rows yield `None`.
    pub fn extract(&self, cells: &[String]) -> Option<ImportRow> {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return None;
        }
        let cell = |i: usize| cells.get(i).map(|c| c.trim()).unwrap_or("");
        let named_or = |named: Option<usize>, fallback: usize| {
            named
                .map(cell)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| cell(fallback))
                .to_string()
        };

        Some(ImportRow {
            english: named_or(self.english, 0),
            turkish: named_or(self.turkish, 1),
            example_sentence: self
                .example_sentence
                .map(cell)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        })
    }
}

/// First sheet of a workbook, first row as header
fn read_workbook(path: &Path) -> Result<Vec<ImportRow>, SpreadsheetError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SpreadsheetError::NoSheets)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(SpreadsheetError::NoHeader)?;
    let headers: Vec<String> = header_row.iter().map(get_cell_string).collect();
    let mapping = ColumnMapping::detect(&headers);

    Ok(rows
        .filter_map(|row| {
            let cells: Vec<String> = row.iter().map(get_cell_string).collect();
            mapping.extract(&cells)
        })
        .collect())
}

/// CSV with a header row; ragged rows are allowed
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ImportRow>, SpreadsheetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
    let mapping = ColumnMapping::detect(&headers);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let cells: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        rows.extend(mapping.extract(&cells));
    }
    Ok(rows)
}

/// Write records in the fixed three-column layout
pub fn write_csv<W: Write>(writer: W, records: &[WordRecord]) -> Result<(), SpreadsheetError> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(EXPORT_HEADERS)?;
    for record in records {
        writer.write_record([
            record.english.as_str(),
            record.turkish.as_str(),
            record.example_sentence.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_csv(
    file_path: impl AsRef<Path>,
    records: &[WordRecord],
) -> Result<(), SpreadsheetError> {
    let file = File::create(file_path.as_ref())?;
    write_csv(file, records)?;
    log::info!("Exported {} words to {}", records.len(), file_path.as_ref().display());
    Ok(())
}

fn get_cell_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
        Data::Empty => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_columns_in_any_order() {
        let data = "Turkish,Notes,English\nelma,fruit,apple\nkitap,,book\n";
        let rows = read_csv(data.as_bytes()).unwrap();
        assert_eq!(rows, vec![ImportRow::new("apple", "elma"), ImportRow::new("book", "kitap")]);
    }

    #[test]
    fn lowercase_headers_are_recognised() {
        let rows = read_csv("english,turkish\n water , su \n".as_bytes()).unwrap();
        assert_eq!(rows, vec![ImportRow::new("water", "su")]);
    }

    #[test]
    fn unnamed_columns_fall_back_to_position() {
        let rows = read_csv("Word,Meaning\nhouse,ev\n,\ntree\n".as_bytes()).unwrap();
        assert_eq!(rows, vec![ImportRow::new("house", "ev"), ImportRow::new("tree", "")]);
    }

    #[test]
    fn empty_named_cell_falls_back_to_first_column() {
        let mapping = ColumnMapping::detect(&["Id".into(), "Turkish".into(), "English".into()]);
        let row = mapping.extract(&["door".into(), "kapı".into(), "".into()]).unwrap();
        assert_eq!(row.english, "door");
        assert_eq!(row.turkish, "kapı");
    }

    #[test]
    fn export_round_trips_through_csv() {
        let mut apple = WordRecord::new("apple", "elma");
        apple.example_sentence = Some("I ate an apple, then a pear.".into());
        let records = vec![apple, WordRecord::new("book", "kitap")];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.csv");
        export_csv(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("English,Turkish,ExampleSentence\n"));

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].example_sentence.as_deref(), Some("I ate an apple, then a pear."));
        assert_eq!(rows[1].example_sentence, None);
    }

    #[test]
    fn workbook_cells_become_trimmed_text() {
        assert_eq!(get_cell_string(&Data::String("  elma ".into())), "elma");
        assert_eq!(get_cell_string(&Data::Int(42)), "42");
        assert_eq!(get_cell_string(&Data::Float(2.5)), "2.5");
        assert_eq!(get_cell_string(&Data::Empty), "");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            read_rows("words.txt"),
            Err(SpreadsheetError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }
}
