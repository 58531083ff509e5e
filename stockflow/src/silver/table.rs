//! CSV tables as polars data frames.
//!
//! Column types are inferred over the whole file, so `10` and `10.0` in
//! the same column both read as the float `10.0`. Empty fields, the null
//! tokens below and the missing trailing fields of a short row read as
//! null.

use crate::errors::PipelineError;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;

/// Field values read as null.
pub const NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn null_values() -> NullValues {
    // Empty fields are already null through the reader's missing-is-null rule.
    NullValues::AllColumns(
        NULL_TOKENS
            .iter()
            .filter(|token| !token.is_empty())
            .map(|token| (*token).into())
            .collect(),
    )
}

/// Reads a landing table.
///
/// # Errors
///
/// Returns `MissingInput` if the file is absent, empty or has no header
/// row, `Io` if it cannot be read, and `SchemaOrParse` for rows with more
/// fields than the header or invalid UTF-8.
pub fn read_table(name: &str, path: &Path) -> Result<DataFrame, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::missing_input(format!("landing table {name}"), path));
    }
    let len = fs::metadata(path)
        .map_err(|e| PipelineError::io(path, e))?
        .len();
    if len == 0 {
        return Err(PipelineError::missing_input(
            format!("data in landing table {name}"),
            path,
        ));
    }

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_null_values(Some(null_values()))
        .finish()
        .and_then(LazyFrame::collect)
        .map_err(|e| PipelineError::from_polars(name, path, e))?;

    if df.width() == 0 {
        return Err(PipelineError::missing_input(
            format!("header row in landing table {name}"),
            path,
        ));
    }
    Ok(df)
}

/// Writes a table as CSV, replacing `path` atomically.
///
/// # Errors
///
/// Returns `Io` if the file cannot be written.
pub fn write_table(name: &str, df: &mut DataFrame, path: &Path) -> Result<(), PipelineError> {
    let tmp = path.with_extension("csv.tmp");
    let result = write_to(name, df, &tmp)
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| PipelineError::io(path, e)));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_to(name: &str, df: &mut DataFrame, path: &Path) -> Result<(), PipelineError> {
    let mut file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| PipelineError::from_polars(name, path, e))
}

/// Fails with `SchemaOrParse` unless every column in `columns` exists.
///
/// # Errors
///
/// Names the first missing column.
pub fn require_columns(name: &str, df: &DataFrame, columns: &[&str]) -> Result<(), PipelineError> {
    match columns
        .iter()
        .find(|column| df.get_column_index(column).is_none())
    {
        Some(missing) => Err(PipelineError::schema(
            name,
            format!("missing required column '{missing}'"),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("t.csv");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_read_normalizes_null_tokens() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a,b\nx,\nNA,y\nz,NULL\nw,v\n");

        let df = read_table("t", &path).unwrap();
        assert_eq!(df.get_column_names_str(), vec!["a", "b"]);
        assert_eq!(df.column("a").unwrap().null_count(), 1);
        assert_eq!(df.column("b").unwrap().null_count(), 2);
    }

    #[test]
    fn test_short_row_reads_missing_fields_as_null() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "investor_id,risk_profile\n1,High\n2\n3,Low\n");

        let df = read_table("investor_master", &path).unwrap();
        assert_eq!(df.height(), 3);
        let profile = df.column("risk_profile").unwrap();
        assert_eq!(profile.null_count(), 1);
        assert!(profile.get(1).unwrap().is_null());
    }

    #[test]
    fn test_long_row_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a,b\n1,2,3\n");
        assert!(matches!(
            read_table("t", &path),
            Err(PipelineError::SchemaOrParse { .. })
        ));
    }

    #[test]
    fn test_numeric_columns_are_typed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "id,amount\n1,10\n2,10.0\n");

        let df = read_table("t", &path).unwrap();
        assert_eq!(df.column("amount").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_read_empty_file_is_missing_input() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "");
        assert!(matches!(
            read_table("t", &path),
            Err(PipelineError::MissingInput { .. })
        ));
        assert!(matches!(
            read_table("t", &dir.path().join("absent.csv")),
            Err(PipelineError::MissingInput { .. })
        ));
    }

    #[test]
    fn test_require_columns_names_the_missing_one() {
        let df = df!("id" => &[1i64]).unwrap();
        assert!(require_columns("investor_master", &df, &["id"]).is_ok());
        let err = require_columns("investor_master", &df, &["id", "risk_profile"]).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaOrParse { .. }));
        assert!(err.to_string().contains("risk_profile"));
    }

    #[test]
    fn test_write_quotes_and_replaces_atomically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut df = df!(
            "name" => &["a"],
            "note" => &["has, comma"],
        )
        .unwrap();
        write_table("t", &mut df, &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "name,note\na,\"has, comma\"\n"
        );
        assert!(!path.with_extension("csv.tmp").exists());
    }
}
