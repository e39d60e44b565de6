use std::{error::Error, io::Write};

use crate::metrics::DerivedRecord;

pub const PREVIEW_ROWS: usize = 5;

const STATISTICS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// Descriptive statistics for one numeric column.
#[derive(Debug, PartialEq, Clone)]
pub struct ColumnSummary {
    pub column: &'static str,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, `NaN` below two observations.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    fn from_values(column: &'static str, mut values: Vec<f64>) -> Self {
        let count = values.len();
        if count == 0 {
            return ColumnSummary {
                column,
                count,
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                q25: f64::NAN,
                median: f64::NAN,
                q75: f64::NAN,
                max: f64::NAN,
            };
        }

        values.sort_by(|a, b| a.total_cmp(b));
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count < 2 {
            f64::NAN
        } else {
            let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        };

        ColumnSummary {
            column,
            count,
            mean,
            std,
            min: values[0],
            q25: percentile(&values, 0.25),
            median: percentile(&values, 0.5),
            q75: percentile(&values, 0.75),
            max: values[count - 1],
        }
    }

    fn statistic(&self, idx: usize) -> f64 {
        match idx {
            0 => self.count as f64,
            1 => self.mean,
            2 => self.std,
            3 => self.min,
            4 => self.q25,
            5 => self.median,
            6 => self.q75,
            _ => self.max,
        }
    }
}

// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

pub fn describe(derived: &[DerivedRecord]) -> Vec<ColumnSummary> {
    let column = |name, f: fn(&DerivedRecord) -> f64| {
        ColumnSummary::from_values(name, derived.iter().map(f).collect())
    };

    vec![
        column("price", |r| r.price),
        column("quantity", |r| r.quantity as f64),
        column("cost", |r| r.cost),
        column("Revenue", |r| r.revenue),
        column("Profit", |r| r.profit),
        column("Loss", |r| r.loss),
        column("Sales", |r| r.sales),
    ]
}

/// Writes the first `rows` derived records as CSV, header included.
pub fn write_preview<W: Write>(
    derived: &[DerivedRecord],
    rows: usize,
    writer: W,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    for record in derived.iter().take(rows) {
        wtr.serialize(record)?;
    }

    wtr.flush()?;

    Ok(())
}

/// Writes one line per statistic with a column per numeric field.
pub fn write_summary<W: Write>(
    summaries: &[ColumnSummary],
    writer: W,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header = vec![""];
    header.extend(summaries.iter().map(|s| s.column));
    wtr.write_record(&header)?;

    for (idx, name) in STATISTICS.iter().enumerate() {
        let mut row = vec![name.to_string()];
        row.extend(summaries.iter().map(|s| format_statistic(s.statistic(idx))));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;

    Ok(())
}

fn format_statistic(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else {
        format!("{:.6}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metrics::derive, records::Record};

    fn derived() -> Vec<DerivedRecord> {
        derive(&[
            Record::new("Widget", 10.0, 2, 5.0),
            Record::new("Gadget", 5.0, 0, 3.0),
            Record::new("Widget", 4.0, 5, 8.0),
            Record::new("Gizmo", 1.0, 1, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn describe_revenue_column() {
        let summaries = describe(&derived());
        let revenue = summaries.iter().find(|s| s.column == "Revenue").unwrap();

        // Revenue values: 20, 0, 20, 1 -> sorted 0, 1, 20, 20
        assert_eq!(revenue.count, 4);
        assert_eq!(revenue.mean, 10.25);
        assert_eq!(revenue.min, 0.0);
        assert_eq!(revenue.q25, 0.75);
        assert_eq!(revenue.median, 10.5);
        assert_eq!(revenue.q75, 20.0);
        assert_eq!(revenue.max, 20.0);
    }

    #[test]
    fn describe_covers_base_and_derived_columns() {
        let columns: Vec<_> = describe(&derived()).iter().map(|s| s.column).collect();

        assert_eq!(
            columns,
            vec!["price", "quantity", "cost", "Revenue", "Profit", "Loss", "Sales"]
        );
    }

    #[test]
    fn sample_standard_deviation() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let summary = ColumnSummary::from_values("x", values);

        assert!((summary.std - 2.138089935299395).abs() < 1e-12);
    }

    #[test]
    fn single_row_has_undefined_std() {
        let summary = ColumnSummary::from_values("x", vec![3.0]);

        assert_eq!(summary.count, 1);
        assert!(summary.std.is_nan());
        assert_eq!(summary.median, 3.0);
    }

    #[test]
    fn preview_is_limited_to_requested_rows() {
        let mut out = Vec::new();
        write_preview(&derived(), 2, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(
            lines[0],
            "product_name,price,quantity,cost,Revenue,Profit,Loss,Sales"
        );
        assert_eq!(lines[1], "Widget,10.0,2,5.0,20.0,15.0,-15.0,20.0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn summary_table_layout() {
        let mut out = Vec::new();
        write_summary(&describe(&derived()), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 1 + STATISTICS.len());
        assert_eq!(lines[0], ",price,quantity,cost,Revenue,Profit,Loss,Sales");
        assert!(lines[1].starts_with("count,4.000000,4.000000"));
        assert!(lines[8].starts_with("max,10.000000,5.000000,8.000000,20.000000"));
    }
}
