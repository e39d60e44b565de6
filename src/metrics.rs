use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::debug;

use crate::records::Record;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum MetricsError {
    #[error("row {row} is missing required field '{field}'")]
    MissingField { field: &'static str, row: usize },
}

#[derive(Debug, Error, PartialEq)]
pub enum SelectError {
    #[error("Invalid data type '{0}'. Please enter 'profit', 'revenue', 'loss', or 'sales'.")]
    UnknownMetric(String),
}

/// A transaction row together with the measures computed from it.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct DerivedRecord {
    pub product_name: String,
    pub price: f64,
    pub quantity: i64,
    pub cost: f64,
    #[serde(rename = "Revenue")]
    pub revenue: f64,
    #[serde(rename = "Profit")]
    pub profit: f64,
    #[serde(rename = "Loss")]
    pub loss: f64,
    #[serde(rename = "Sales")]
    pub sales: f64,
}

impl DerivedRecord {
    fn from_base(product_name: String, price: f64, quantity: i64, cost: f64) -> Self {
        let revenue = price * quantity as f64;
        DerivedRecord {
            product_name,
            price,
            quantity,
            cost,
            revenue,
            profit: revenue - cost,
            loss: cost - revenue,
            sales: price * quantity as f64,
        }
    }

    pub fn value(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Profit => self.profit,
            MetricKind::Revenue => self.revenue,
            MetricKind::Loss => self.loss,
            MetricKind::Sales => self.sales,
        }
    }
}

/// Computes revenue, profit, loss and sales for every record, keeping input order.
pub fn derive(records: &[Record]) -> Result<Vec<DerivedRecord>, MetricsError> {
    let derived = records
        .iter()
        .enumerate()
        .map(|(idx, record)| derive_one(idx + 1, record))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(rows = derived.len(), "derived metrics");

    Ok(derived)
}

fn derive_one(row: usize, record: &Record) -> Result<DerivedRecord, MetricsError> {
    let missing = |field| MetricsError::MissingField { field, row };

    let product_name = record.product_name.clone().ok_or(missing("product_name"))?;
    let price = record.price.ok_or(missing("price"))?;
    let quantity = record.quantity.ok_or(missing("quantity"))?;
    let cost = record.cost.ok_or(missing("cost"))?;

    Ok(DerivedRecord::from_base(product_name, price, quantity, cost))
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MetricKind {
    Profit,
    Revenue,
    Loss,
    Sales,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Profit,
        MetricKind::Revenue,
        MetricKind::Loss,
        MetricKind::Sales,
    ];

    /// Column-style name, e.g. `Revenue`.
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Profit => "Profit",
            MetricKind::Revenue => "Revenue",
            MetricKind::Loss => "Loss",
            MetricKind::Sales => "Sales",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_lowercase())
    }
}

impl FromStr for MetricKind {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let wanted = trimmed.to_lowercase();
        MetricKind::ALL
            .into_iter()
            .find(|metric| metric.to_string() == wanted)
            .ok_or_else(|| SelectError::UnknownMetric(trimmed.to_owned()))
    }
}

/// One (product, value) pair per input row, in input order.
#[derive(Debug, PartialEq, Clone)]
pub struct AggregatedSeries {
    pub metric: MetricKind,
    pub points: Vec<(String, f64)>,
}

impl AggregatedSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|&(_, value)| value)
    }
}

pub fn select(derived: &[DerivedRecord], metric: MetricKind) -> AggregatedSeries {
    AggregatedSeries {
        metric,
        points: derived
            .iter()
            .map(|record| (record.product_name.clone(), record.value(metric)))
            .collect(),
    }
}

/// Like [`select`], but takes the metric as free text.
pub fn select_by_name(
    derived: &[DerivedRecord],
    metric: &str,
) -> Result<AggregatedSeries, SelectError> {
    Ok(select(derived, metric.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::read_csv;

    fn sample() -> Vec<Record> {
        vec![
            Record::new("Widget", 10.0, 2, 5.0),
            Record::new("Gadget", 5.0, 0, 3.0),
            Record::new("Widget", 12.5, 3, 40.0),
            Record::new("Gizmo", 0.1, 3, 0.2),
        ]
    }

    #[test]
    fn derive_widget_row() {
        let derived = derive(&[Record::new("Widget", 10.0, 2, 5.0)]).unwrap();

        assert_eq!(derived[0].revenue, 20.0);
        assert_eq!(derived[0].profit, 15.0);
        assert_eq!(derived[0].loss, -15.0);
        assert_eq!(derived[0].sales, 20.0);
    }

    #[test]
    fn derive_zero_quantity() {
        let derived = derive(&[Record::new("Gadget", 5.0, 0, 3.0)]).unwrap();

        assert_eq!(derived[0].revenue, 0.0);
        assert_eq!(derived[0].profit, -3.0);
        assert_eq!(derived[0].loss, 3.0);
        assert_eq!(derived[0].sales, 0.0);
    }

    #[test]
    fn derive_accepts_negative_price_and_cost() {
        let derived = derive(&[Record::new("Refund", -4.0, 2, -1.0)]).unwrap();

        assert_eq!(derived[0].revenue, -8.0);
        assert_eq!(derived[0].profit, -7.0);
        assert_eq!(derived[0].loss, 7.0);
    }

    #[test]
    fn redundant_measures_agree() {
        for record in derive(&sample()).unwrap() {
            assert_eq!(record.sales.to_bits(), record.revenue.to_bits());
            assert_eq!(record.profit, -record.loss);
        }
    }

    #[test]
    fn derive_preserves_order_and_length() {
        let records = sample();
        let derived = derive(&records).unwrap();

        assert_eq!(derived.len(), records.len());
        let names: Vec<_> = derived.iter().map(|r| r.product_name.as_str()).collect();
        assert_eq!(names, vec!["Widget", "Gadget", "Widget", "Gizmo"]);
    }

    #[test]
    fn derive_is_deterministic() {
        let first = derive(&sample()).unwrap();
        let second = derive(&sample()).unwrap();

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.revenue.to_bits(), b.revenue.to_bits());
            assert_eq!(a.profit.to_bits(), b.profit.to_bits());
            assert_eq!(a.loss.to_bits(), b.loss.to_bits());
            assert_eq!(a.sales.to_bits(), b.sales.to_bits());
        }
    }

    #[test]
    fn rederiving_from_base_is_identical() {
        let derived = derive(&sample()).unwrap();
        let bases: Vec<Record> = derived
            .iter()
            .map(|r| Record::new(&r.product_name, r.price, r.quantity, r.cost))
            .collect();

        assert_eq!(derive(&bases).unwrap(), derived);
    }

    #[test]
    fn missing_cost_names_the_field() {
        let records = read_csv("test-inputs/test_input_missing_cost.csv").unwrap();

        assert_eq!(
            derive(&records),
            Err(MetricsError::MissingField {
                field: "cost",
                row: 1
            })
        );
    }

    #[test]
    fn short_row_is_missing_its_cost() {
        let records = read_csv("test-inputs/test_input_short_row.csv").unwrap();

        assert_eq!(
            derive(&records),
            Err(MetricsError::MissingField {
                field: "cost",
                row: 2
            })
        );
    }

    #[test]
    fn blank_quantity_reports_its_row() {
        let records = read_csv("test-inputs/test_input_blank_cell.csv").unwrap();

        assert_eq!(
            derive(&records),
            Err(MetricsError::MissingField {
                field: "quantity",
                row: 2
            })
        );
    }

    #[test]
    fn missing_product_name_is_reported() {
        let record = Record {
            product_name: None,
            ..Record::new("", 1.0, 1, 1.0)
        };

        assert!(matches!(
            derive(&[record]),
            Err(MetricsError::MissingField {
                field: "product_name",
                ..
            })
        ));
    }

    #[test]
    fn select_keeps_duplicate_products_apart() {
        let derived = derive(&sample()).unwrap();
        let series = select(&derived, MetricKind::Sales);

        let widgets: Vec<_> = series
            .points
            .iter()
            .filter(|(label, _)| label == "Widget")
            .collect();
        assert_eq!(widgets.len(), 2);
        assert_eq!(widgets[0].1, 20.0);
        assert_eq!(widgets[1].1, 37.5);
    }

    #[test]
    fn select_revenue_has_one_entry_per_row() {
        let derived = derive(&sample()).unwrap();

        assert_eq!(select(&derived, MetricKind::Revenue).len(), derived.len());
    }

    #[test]
    fn select_picks_the_requested_measure() {
        let derived = derive(&sample()).unwrap();

        for metric in MetricKind::ALL {
            let series = select(&derived, metric);
            assert_eq!(series.metric, metric);
            let expected: Vec<f64> = derived.iter().map(|r| r.value(metric)).collect();
            assert_eq!(series.values().collect::<Vec<_>>(), expected);
        }
        assert_eq!(
            select(&derived, MetricKind::Loss).values().next(),
            Some(-15.0)
        );
    }

    #[test]
    fn select_by_name_is_case_insensitive() {
        let derived = derive(&sample()).unwrap();

        let series = select_by_name(&derived, "  PROFIT ").unwrap();
        assert_eq!(series.metric, MetricKind::Profit);
    }

    #[test]
    fn select_by_name_rejects_unknown_metric() {
        let derived = derive(&sample()).unwrap();

        assert_eq!(
            select_by_name(&derived, "margin"),
            Err(SelectError::UnknownMetric("margin".to_owned()))
        );
        assert!(select_by_name(&derived, "").is_err());
    }

    #[test]
    fn metric_display_round_trips_through_parse() {
        for metric in MetricKind::ALL {
            assert_eq!(metric.to_string().parse::<MetricKind>(), Ok(metric));
        }
    }
}
