//! Filed-fact extraction
//!
//! Turns a company-facts repository into fixed-size, chronologically ordered
//! metric series and the three fundamentals tables shown in a review.

use super::round_to;
use crate::locale::Language;
use crate::schema::{TableColumn, TableData, TableRow};
use chrono::NaiveDate;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Value-unit branches in preference order
const UNIT_PREFERENCE: [&str; 3] = ["USD", "USD/shares", "shares"];

const REVENUE_CONCEPTS: [&str; 2] = [
    "Revenues",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
];
const NET_INCOME: &str = "NetIncomeLoss";
const EPS_DILUTED: &str = "EarningsPerShareDiluted";
const DILUTED_SHARES: &str = "WeightedAverageNumberOfDilutedSharesOutstanding";
const OPERATING_CASH_FLOW: &str = "NetCashProvidedByUsedInOperatingActivities";
const CAPEX: &str = "PaymentsToAcquirePropertyPlantAndEquipment";

const ANNUAL_PERIODS: usize = 3;
const QUARTERLY_FETCHED: usize = 5;
const QUARTERLY_SHOWN: usize = 4;

pub const NOT_AVAILABLE: &str = "N/A";

/// Company facts repository of one filer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyFacts {
    #[serde(rename = "entityName", default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub facts: FactTaxonomies,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FactTaxonomies {
    #[serde(rename = "us-gaap", default)]
    pub us_gaap: HashMap<String, TagFacts>,
}

/// All reported values of one concept, grouped by unit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagFacts {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub units: HashMap<String, Vec<FactRecord>>,
}

/// A single reported value
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FactRecord {
    pub start: Option<String>,
    pub end: Option<String>,
    pub val: Option<f64>,
    pub fy: Option<i32>,
    pub fp: Option<String>,
    pub form: Option<String>,
    pub filed: Option<String>,
}

impl FactRecord {
    fn duration_days(&self) -> Option<i64> {
        let start = parse_date(self.start.as_deref()?)?;
        let end = parse_date(self.end.as_deref()?)?;
        Some((end - start).num_days())
    }
}

impl CompanyFacts {
    /// First of `names` that carries any values
    pub fn concept(&self, names: &[&str]) -> Option<&TagFacts> {
        names
            .iter()
            .filter_map(|name| self.facts.us_gaap.get(*name))
            .find(|tag| tag.units.values().any(|records| !records.is_empty()))
    }
}

/// Reporting granularity, tied to a filing form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Annual,
    Quarterly,
}

impl Granularity {
    pub fn form(self) -> &'static str {
        match self {
            Granularity::Annual => "10-K",
            Granularity::Quarterly => "10-Q",
        }
    }

    fn column_prefix(self) -> char {
        match self {
            Granularity::Annual => 'y',
            Granularity::Quarterly => 'q',
        }
    }

    /// Among records sharing a period end, annual tables want the full-year
    /// duration and quarterly tables the three-month one; newer filings win ties.
    fn prefer(self, a: &FactRecord, b: &FactRecord) -> Ordering {
        let by_duration = match self {
            Granularity::Annual => b.duration_days().cmp(&a.duration_days()),
            Granularity::Quarterly => a
                .duration_days()
                .unwrap_or(i64::MAX)
                .cmp(&b.duration_days().unwrap_or(i64::MAX)),
        };
        by_duration.then_with(|| b.filed.cmp(&a.filed))
    }
}

/// Parallel period labels and scaled values, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSeries {
    pub periods: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl ExtractedSeries {
    /// `count` placeholder entries
    pub fn placeholder(count: usize) -> Self {
        Self {
            periods: vec![NOT_AVAILABLE.to_string(); count],
            values: vec![None; count],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keep the newest `count` entries
    pub fn trailing(mut self, count: usize) -> Self {
        let skip = self.len().saturating_sub(count);
        self.periods.drain(..skip);
        self.values.drain(..skip);
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// Extract `count` periods of one concept
///
/// Never fails: a missing concept or no matching filings yields placeholders,
/// and short histories are padded on the oldest side.
pub fn extract_metric(
    fact: Option<&TagFacts>,
    granularity: Granularity,
    count: usize,
) -> ExtractedSeries {
    let Some(records) = fact.and_then(preferred_unit) else {
        return ExtractedSeries::placeholder(count);
    };

    let mut selected: Vec<&FactRecord> = records
        .iter()
        .filter(|r| r.form.as_deref() == Some(granularity.form()) && r.end.is_some())
        .collect();

    selected.sort_by(|a, b| b.end.cmp(&a.end).then_with(|| granularity.prefer(a, b)));
    selected.dedup_by(|later, kept| later.end == kept.end);
    selected.truncate(count);

    if selected.is_empty() {
        return ExtractedSeries::placeholder(count);
    }

    let mut series = ExtractedSeries::placeholder(count - selected.len());
    for record in selected.into_iter().rev() {
        series.periods.push(period_label(record, granularity));
        series.values.push(record.val.map(scale_value));
    }
    series
}

fn preferred_unit(fact: &TagFacts) -> Option<&Vec<FactRecord>> {
    UNIT_PREFERENCE
        .iter()
        .filter_map(|unit| fact.units.get(*unit))
        .find(|records| !records.is_empty())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn period_label(record: &FactRecord, granularity: Granularity) -> String {
    use chrono::Datelike;

    let Some(year) = record.end.as_deref().and_then(parse_date).map(|d| d.year()) else {
        return NOT_AVAILABLE.to_string();
    };

    match (granularity, record.fp.as_deref().map(str::trim)) {
        (Granularity::Quarterly, Some(fp)) if !fp.is_empty() => format!("{fp} FY{year}"),
        _ => format!("FY{year}"),
    }
}

/// Scale to billions or millions above those magnitudes
pub fn scale_value(value: f64) -> f64 {
    let magnitude = value.abs();
    if magnitude > 1_000_000_000.0 {
        round_to(value / 1_000_000_000.0, 1)
    } else if magnitude > 1_000_000.0 {
        round_to(value / 1_000_000.0, 1)
    } else {
        round_to(value, 2)
    }
}

/// Operating cash flow minus absolute capex, per index
pub fn derive_free_cash_flow(operating: &[Option<f64>], capex: &[Option<f64>]) -> Vec<Option<f64>> {
    operating
        .iter()
        .enumerate()
        .map(|(i, ocf)| match (ocf, capex.get(i).copied().flatten()) {
            (Some(ocf), Some(cx)) => Some(round_to(ocf - cx.abs(), 1)),
            _ => None,
        })
        .collect()
}

/// Rows a fundamentals table may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricRow {
    Revenue,
    NetIncome,
    Eps,
    DilutedShares,
    OperatingCashFlow,
    Capex,
    FreeCashFlow,
}

impl MetricRow {
    fn label(self, lang: Language, granularity: Granularity) -> &'static str {
        match (lang, self) {
            (Language::Hebrew, MetricRow::Revenue) => "הכנסות",
            (Language::Hebrew, MetricRow::NetIncome) => "רווח נקי",
            (_, MetricRow::Eps) if granularity == Granularity::Quarterly => "EPS",
            (Language::Hebrew, MetricRow::Eps) => "רווח למניה (EPS)",
            (Language::Hebrew, MetricRow::DilutedShares) => "מניות (מדולל)",
            (Language::Hebrew, MetricRow::OperatingCashFlow) => "תזרים תפעולי",
            (_, MetricRow::Capex) => "Capex",
            (Language::Hebrew, MetricRow::FreeCashFlow) => "תזרים חופשי (FCF)",
            (Language::English, MetricRow::Revenue) => "Revenue",
            (Language::English, MetricRow::NetIncome) => "Net income",
            (Language::English, MetricRow::Eps) => "EPS (diluted)",
            (Language::English, MetricRow::DilutedShares) => "Diluted shares",
            (Language::English, MetricRow::OperatingCashFlow) => "Operating cash flow",
            (Language::English, MetricRow::FreeCashFlow) => "Free cash flow (FCF)",
        }
    }
}

/// The three fundamentals tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Annual,
    CashFlow,
    Quarterly,
}

impl TableKind {
    pub fn widget_id(self) -> &'static str {
        match self {
            TableKind::Annual => "fundamentals_annual_3y",
            TableKind::CashFlow => "fundamentals_cashflow_3y",
            TableKind::Quarterly => "fundamentals_quarterly",
        }
    }

    fn title(self, lang: Language) -> &'static str {
        match (lang, self) {
            (Language::Hebrew, TableKind::Annual) => "נתונים שנתיים (3 שנים)",
            (Language::Hebrew, TableKind::CashFlow) => "תזרים מזומנים (3 שנים)",
            (Language::Hebrew, TableKind::Quarterly) => "נתונים רבעוניים",
            (Language::English, TableKind::Annual) => "Annual data (3 years)",
            (Language::English, TableKind::CashFlow) => "Cash flow (3 years)",
            (Language::English, TableKind::Quarterly) => "Quarterly data",
        }
    }

    fn granularity(self) -> Granularity {
        match self {
            TableKind::Annual | TableKind::CashFlow => Granularity::Annual,
            TableKind::Quarterly => Granularity::Quarterly,
        }
    }
}

/// One fundamentals table before localisation
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    pub kind: TableKind,
    pub periods: Vec<String>,
    pub rows: Vec<(MetricRow, Vec<Option<f64>>)>,
}

impl MetricTable {
    pub fn values(&self, row: MetricRow) -> Option<&[Option<f64>]> {
        self.rows
            .iter()
            .find(|(r, _)| *r == row)
            .map(|(_, values)| values.as_slice())
    }

    /// Widget data in the fixed table shape
    pub fn to_table_data(&self, lang: Language) -> TableData {
        let granularity = self.kind.granularity();
        let prefix = granularity.column_prefix();

        let metric_label = match lang {
            Language::Hebrew => "מדד",
            Language::English => "Metric",
        };

        let mut columns = vec![TableColumn {
            key: "metric".to_string(),
            label: metric_label.to_string(),
        }];
        columns.extend(self.periods.iter().enumerate().map(|(i, period)| TableColumn {
            key: format!("{prefix}{i}"),
            label: period.clone(),
        }));

        TableData {
            title: self.kind.title(lang).to_string(),
            unit: "USD".to_string(),
            scale: "B".to_string(),
            columns,
            rows: self
                .rows
                .iter()
                .map(|(row, values)| TableRow {
                    label: row.label(lang, granularity).to_string(),
                    values: values.clone(),
                })
                .collect(),
        }
    }
}

/// Annual, cash-flow and quarterly tables of one company
#[derive(Debug, Clone, PartialEq)]
pub struct FundamentalsBundle {
    pub annual: MetricTable,
    pub cash_flow: MetricTable,
    pub quarterly: MetricTable,
}

impl FundamentalsBundle {
    pub fn from_facts(facts: &CompanyFacts) -> Self {
        let revenue = facts.concept(&REVENUE_CONCEPTS);
        let net_income = facts.concept(&[NET_INCOME]);
        let eps = facts.concept(&[EPS_DILUTED]);

        let annual_revenue = extract_metric(revenue, Granularity::Annual, ANNUAL_PERIODS);
        let annual = MetricTable {
            kind: TableKind::Annual,
            periods: annual_revenue.periods,
            rows: vec![
                (MetricRow::Revenue, annual_revenue.values),
                (
                    MetricRow::NetIncome,
                    extract_metric(net_income, Granularity::Annual, ANNUAL_PERIODS).values,
                ),
                (
                    MetricRow::Eps,
                    extract_metric(eps, Granularity::Annual, ANNUAL_PERIODS).values,
                ),
                (
                    MetricRow::DilutedShares,
                    extract_metric(
                        facts.concept(&[DILUTED_SHARES]),
                        Granularity::Annual,
                        ANNUAL_PERIODS,
                    )
                    .values,
                ),
            ],
        };

        let operating = extract_metric(
            facts.concept(&[OPERATING_CASH_FLOW]),
            Granularity::Annual,
            ANNUAL_PERIODS,
        );
        let capex = extract_metric(facts.concept(&[CAPEX]), Granularity::Annual, ANNUAL_PERIODS);
        let free_cash_flow = derive_free_cash_flow(&operating.values, &capex.values);
        let cash_flow = MetricTable {
            kind: TableKind::CashFlow,
            periods: operating.periods,
            rows: vec![
                (MetricRow::OperatingCashFlow, operating.values),
                (
                    MetricRow::Capex,
                    capex.values.iter().map(|v| v.map(|cx| -cx.abs())).collect(),
                ),
                (MetricRow::FreeCashFlow, free_cash_flow),
            ],
        };

        let quarterly_revenue = extract_metric(revenue, Granularity::Quarterly, QUARTERLY_FETCHED)
            .trailing(QUARTERLY_SHOWN);
        let quarterly = MetricTable {
            kind: TableKind::Quarterly,
            periods: quarterly_revenue.periods,
            rows: vec![
                (MetricRow::Revenue, quarterly_revenue.values),
                (
                    MetricRow::NetIncome,
                    extract_metric(net_income, Granularity::Quarterly, QUARTERLY_FETCHED)
                        .trailing(QUARTERLY_SHOWN)
                        .values,
                ),
                (
                    MetricRow::Eps,
                    extract_metric(eps, Granularity::Quarterly, QUARTERLY_FETCHED)
                        .trailing(QUARTERLY_SHOWN)
                        .values,
                ),
            ],
        };

        Self {
            annual,
            cash_flow,
            quarterly,
        }
    }

    /// Tables in widget order
    pub fn tables(&self) -> [&MetricTable; 3] {
        [&self.annual, &self.cash_flow, &self.quarterly]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(end: &str, val: f64, form: &str, fp: &str) -> FactRecord {
        FactRecord {
            end: Some(end.to_string()),
            val: Some(val),
            form: Some(form.to_string()),
            fp: Some(fp.to_string()),
            ..FactRecord::default()
        }
    }

    fn tag(unit: &str, records: Vec<FactRecord>) -> TagFacts {
        TagFacts {
            label: None,
            units: HashMap::from([(unit.to_string(), records)]),
        }
    }

    #[test]
    fn test_scaling() {
        assert_eq!(scale_value(2_500_000_000.0), 2.5);
        assert_eq!(scale_value(45_000_000.0), 45.0);
        assert_eq!(scale_value(950.0), 950.0);
        assert_eq!(scale_value(-3_260_000_000.0), -3.3);
        assert_eq!(scale_value(6.456), 6.46);
    }

    #[test]
    fn test_extract_annual_ascending() {
        let fact = tag(
            "USD",
            vec![
                record("2022-12-31", 2_000_000_000.0, "10-K", "FY"),
                record("2024-12-31", 2_500_000_000.0, "10-K", "FY"),
                record("2024-09-30", 700_000_000.0, "10-Q", "Q3"),
                record("2023-12-31", 2_200_000_000.0, "10-K", "FY"),
                record("2021-12-31", 1_800_000_000.0, "10-K", "FY"),
            ],
        );

        let series = extract_metric(Some(&fact), Granularity::Annual, 3);
        assert_eq!(series.periods, vec!["FY2022", "FY2023", "FY2024"]);
        assert_eq!(series.values, vec![Some(2.0), Some(2.2), Some(2.5)]);
    }

    #[test]
    fn test_extract_quarterly_labels() {
        let fact = tag(
            "USD",
            vec![
                record("2024-03-31", 45_000_000.0, "10-Q", "Q1"),
                record("2024-06-30", 47_000_000.0, "10-Q", "Q2"),
            ],
        );

        let series = extract_metric(Some(&fact), Granularity::Quarterly, 2);
        assert_eq!(series.periods, vec!["Q1 FY2024", "Q2 FY2024"]);
        assert_eq!(series.values, vec![Some(45.0), Some(47.0)]);
    }

    #[test]
    fn test_missing_metric_is_placeholder() {
        let series = extract_metric(None, Granularity::Annual, 3);
        assert_eq!(series.len(), 3);
        assert_eq!(series.periods, vec!["N/A"; 3]);
        assert!(series.is_placeholder());

        let only_quarterly = tag("USD", vec![record("2024-06-30", 1.0, "10-Q", "Q2")]);
        let series = extract_metric(Some(&only_quarterly), Granularity::Annual, 3);
        assert_eq!(series, ExtractedSeries::placeholder(3));
    }

    #[test]
    fn test_short_history_padded_at_oldest_side() {
        let fact = tag("USD", vec![record("2024-12-31", 950.0, "10-K", "FY")]);

        let series = extract_metric(Some(&fact), Granularity::Annual, 3);
        assert_eq!(series.periods, vec!["N/A", "N/A", "FY2024"]);
        assert_eq!(series.values, vec![None, None, Some(950.0)]);
    }

    #[test]
    fn test_unparsable_end_date() {
        let fact = tag("USD", vec![record("end-of-year", 10.0, "10-K", "FY")]);

        let series = extract_metric(Some(&fact), Granularity::Annual, 1);
        assert_eq!(series.periods, vec!["N/A"]);
        assert_eq!(series.values, vec![Some(10.0)]);
    }

    #[test]
    fn test_duplicate_periods_collapse() {
        let mut full_year = record("2024-12-31", 2_000_000_000.0, "10-K", "FY");
        full_year.start = Some("2024-01-01".to_string());
        full_year.filed = Some("2025-02-01".to_string());
        let mut fourth_quarter = record("2024-12-31", 600_000_000.0, "10-K", "FY");
        fourth_quarter.start = Some("2024-10-01".to_string());
        fourth_quarter.filed = Some("2025-02-01".to_string());
        let mut comparative = record("2023-12-31", 1_900_000_000.0, "10-K", "FY");
        comparative.start = Some("2023-01-01".to_string());
        comparative.filed = Some("2025-02-01".to_string());

        let fact = tag("USD", vec![fourth_quarter, full_year, comparative]);
        let series = extract_metric(Some(&fact), Granularity::Annual, 2);

        assert_eq!(series.periods, vec!["FY2023", "FY2024"]);
        assert_eq!(series.values, vec![Some(1.9), Some(2.0)]);
    }

    #[test]
    fn test_unit_preference() {
        let mut fact = tag("shares", vec![record("2024-12-31", 15_000_000_000.0, "10-K", "FY")]);
        fact.units.insert(
            "USD/shares".to_string(),
            vec![record("2024-12-31", 6.08, "10-K", "FY")],
        );

        let series = extract_metric(Some(&fact), Granularity::Annual, 1);
        assert_eq!(series.values, vec![Some(6.08)]);
    }

    #[test]
    fn test_free_cash_flow() {
        assert_eq!(derive_free_cash_flow(&[Some(1000.0)], &[Some(-200.0)]), vec![Some(800.0)]);
        assert_eq!(derive_free_cash_flow(&[Some(1000.0)], &[Some(200.0)]), vec![Some(800.0)]);
        assert_eq!(
            derive_free_cash_flow(&[None, Some(5.5)], &[Some(1.0), None]),
            vec![None::<f64>, None]
        );
    }

    #[test]
    fn test_trailing() {
        let series = ExtractedSeries {
            periods: (0..5).map(|i| format!("p{i}")).collect(),
            values: (0..5).map(|i| Some(f64::from(i))).collect(),
        };
        let tail = series.trailing(4);
        assert_eq!(tail.periods, vec!["p1", "p2", "p3", "p4"]);
        assert_eq!(tail.len(), 4);
    }

    #[test]
    fn test_bundle_shapes() {
        let facts: CompanyFacts = serde_json::from_value(serde_json::json!({
            "cik": 1,
            "entityName": "Acme Corp",
            "facts": {
                "us-gaap": {
                    "RevenueFromContractWithCustomerExcludingAssessedTax": {
                        "label": "Revenue",
                        "units": {
                            "USD": [
                                {"end": "2023-12-31", "val": 2200000000.0, "form": "10-K", "fp": "FY"},
                                {"end": "2024-12-31", "val": 2500000000.0, "form": "10-K", "fp": "FY"},
                                {"end": "2024-03-31", "val": 600000000.0, "form": "10-Q", "fp": "Q1"},
                                {"end": "2024-06-30", "val": 610000000.0, "form": "10-Q", "fp": "Q2"},
                                {"end": "2024-09-30", "val": 620000000.0, "form": "10-Q", "fp": "Q3"},
                                {"end": "2025-03-31", "val": 650000000.0, "form": "10-Q", "fp": "Q1"},
                                {"end": "2025-06-30", "val": 660000000.0, "form": "10-Q", "fp": "Q2"}
                            ]
                        }
                    },
                    "NetCashProvidedByUsedInOperatingActivities": {
                        "units": {"USD": [{"end": "2024-12-31", "val": 1000000000.0, "form": "10-K"}]}
                    },
                    "PaymentsToAcquirePropertyPlantAndEquipment": {
                        "units": {"USD": [{"end": "2024-12-31", "val": 200000000.0, "form": "10-K"}]}
                    }
                }
            }
        }))
        .unwrap();

        let bundle = FundamentalsBundle::from_facts(&facts);

        assert_eq!(bundle.annual.periods, vec!["N/A", "FY2023", "FY2024"]);
        assert_eq!(
            bundle.annual.values(MetricRow::NetIncome).unwrap(),
            &[None::<f64>; 3]
        );
        assert_eq!(
            bundle.cash_flow.values(MetricRow::Capex).unwrap(),
            &[None, None, Some(-200.0)]
        );
        assert_eq!(
            bundle.cash_flow.values(MetricRow::FreeCashFlow).unwrap(),
            &[None, None, Some(800.0)]
        );
        assert_eq!(
            bundle.quarterly.periods,
            vec!["Q2 FY2024", "Q3 FY2024", "Q1 FY2025", "Q2 FY2025"]
        );

        let table = bundle.quarterly.to_table_data(Language::Hebrew);
        assert_eq!(table.columns.len(), 5);
        assert_eq!(table.columns[0].key, "metric");
        assert_eq!(table.columns[4].key, "q3");
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[2].label, "EPS");
        assert_eq!(table.unit, "USD");
        assert_eq!(table.scale, "B");

        let annual = bundle.annual.to_table_data(Language::English);
        assert_eq!(annual.columns[1].key, "y0");
        assert_eq!(annual.rows[0].label, "Revenue");
        assert_eq!(annual.rows.len(), 4);
    }
}
