use serde::Deserialize;
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The file was not found. Please check the file path: {path}")]
    FileMissing {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No data found in the file. Please check the file contents: {path}")]
    EmptyDataset { path: String },

    #[error("Malformed data in {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// One transaction row as read from the input file.
///
/// Every column is optional at parse time. A missing column or a blank cell
/// leaves the field empty so the deriver can name it, while a cell that is
/// present but not numeric is rejected by the reader.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
pub struct Record {
    #[serde(default, deserialize_with = "trim_to_option")]
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "trim_and_parse_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "trim_and_parse_i64")]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "trim_and_parse_f64")]
    pub cost: Option<f64>,
}

#[cfg(test)]
impl Record {
    pub fn new(product_name: &str, price: f64, quantity: i64, cost: f64) -> Self {
        Record {
            product_name: Some(product_name.to_owned()),
            price: Some(price),
            quantity: Some(quantity),
            cost: Some(cost),
        }
    }
}

/// Anything able to hand over the full set of raw records in one go.
pub trait DataSource {
    /// Human-readable origin, used in diagnostics.
    fn describe(&self) -> String;

    fn read(&self) -> Result<Vec<Record>, LoadError>;
}

/// A delimited file on disk with a header row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        CsvSource { path: path.into() }
    }
}

impl DataSource for CsvSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<Vec<Record>, LoadError> {
        read_csv(&self.path)
    }
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Record>, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::FileMissing {
        path: path.display().to_string(),
        source,
    })?;
    // The CSV reader is buffered automatically, so it does not needed to
    // wrap rdr in a buffered reader like io::BufReader. Short rows are let
    // through so their trailing fields come out empty.
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let records = rdr
        .deserialize::<Record>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| LoadError::Malformed {
            path: path.display().to_string(),
            source,
        })?;

    debug!(path = %path.display(), rows = records.len(), "parsed csv");

    Ok(records)
}

/// Reads every record from `source`, refusing a dataset without rows.
pub fn load_records<S: DataSource + ?Sized>(source: &S) -> Result<Vec<Record>, LoadError> {
    let records = source.read()?;
    if records.is_empty() {
        return Err(LoadError::EmptyDataset {
            path: source.describe(),
        });
    }

    info!(source = %source.describe(), rows = records.len(), "loaded dataset");

    Ok(records)
}

fn trim_to_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_owned()))
    }
}

fn trim_and_parse_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        trimmed
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

fn trim_and_parse_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        trimmed
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct VecSource(Vec<Record>);

    impl DataSource for VecSource {
        fn describe(&self) -> String {
            "memory".to_owned()
        }

        fn read(&self) -> Result<Vec<Record>, LoadError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_read_csv() {
        let records = read_csv("test-inputs/test_input.csv").unwrap();
        let expected_records = vec![
            Record::new("Widget", 10.0, 2, 5.0),
            Record::new("Gadget", 5.5, 4, 30.0),
            Record::new("Widget", 12.25, 1, 2.0),
            Record::new("Doohickey", 3.0, 0, 1.5),
        ];

        assert_eq!(records, expected_records);
    }

    #[test]
    fn missing_column_leaves_field_empty() {
        let records = read_csv("test-inputs/test_input_missing_cost.csv").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_name.as_deref(), Some("Widget"));
        assert_eq!(records[0].price, Some(10.0));
        assert_eq!(records[0].cost, None);
    }

    #[test]
    fn blank_cell_leaves_field_empty() {
        let records = read_csv("test-inputs/test_input_blank_cell.csv").unwrap();

        assert_eq!(records[0].quantity, Some(2));
        assert_eq!(records[1].quantity, None);
    }

    #[test]
    fn short_row_leaves_trailing_fields_empty() {
        let source = CsvSource::new("test-inputs/test_input_short_row.csv");
        let records = load_records(&source).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::new("Widget", 10.0, 2, 5.0));
        assert_eq!(records[1].quantity, Some(1));
        assert_eq!(records[1].cost, None);
    }

    #[test]
    fn non_numeric_cell_is_malformed() {
        let result = read_csv("test-inputs/test_input_bad_price.csv");

        assert!(matches!(result, Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn nonexistent_file_is_missing() {
        let result = read_csv("test-inputs/does_not_exist.csv");

        assert!(matches!(result, Err(LoadError::FileMissing { .. })));
    }

    #[test]
    fn empty_file_is_empty_dataset() {
        let result = load_records(&CsvSource::new("test-inputs/test_input_empty.csv"));

        assert!(matches!(result, Err(LoadError::EmptyDataset { .. })));
    }

    #[test]
    fn header_only_file_is_empty_dataset() {
        let result = load_records(&CsvSource::new("test-inputs/test_input_header_only.csv"));

        assert!(matches!(result, Err(LoadError::EmptyDataset { .. })));
    }

    #[test]
    fn extra_columns_are_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "order_id,product_name,region,price,quantity,cost").unwrap();
        writeln!(file, "17,Widget,EU,10,2,5").unwrap();

        let records = load_records(&CsvSource::new(file.path())).unwrap();

        assert_eq!(records, vec![Record::new("Widget", 10.0, 2, 5.0)]);
    }

    #[test]
    fn load_records_from_any_source() {
        let source = VecSource(vec![Record::new("Widget", 1.0, 1, 1.0)]);

        assert_eq!(load_records(&source).unwrap().len(), 1);
        assert!(matches!(
            load_records(&VecSource(Vec::new())),
            Err(LoadError::EmptyDataset { path }) if path == "memory"
        ));
    }
}
