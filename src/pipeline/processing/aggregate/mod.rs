//! Grouped descriptive statistics with explicit category ordering
//!
//! Aggregation happens in two steps. Use cases fill one or more `Stage`s with
//! unrounded measures per group key, merge stages with `Stage::outer_join`,
//! and hand the result to `build_table`, which filters sparse groups, orders
//! categories, and rounds every measure exactly once.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub mod table;

pub use table::{round_to, Cell, MartTable};

/// count / mean / median / min / max over one group's values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Summary {
    /// Non-finite values are ignored. An empty input gives count 0 and no statistics.
    pub fn of<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        if count == 0 {
            return Self {
                count: 0,
                mean: None,
                median: None,
                min: None,
                max: None,
            };
        }

        let sum: f64 = sorted.iter().sum();
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Self {
            count,
            mean: Some(sum / count as f64),
            median: Some(median),
            min: sorted.first().copied(),
            max: sorted.last().copied(),
        }
    }
}

/// `part / total * 100`, undefined for an empty population
pub fn percentage(part: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(part as f64 / total as f64 * 100.0)
    }
}

/// Group items by a key; items whose key is `None` are left out.
pub fn group_by<T, I, F>(items: I, key: F) -> BTreeMap<String, Vec<T>>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> Option<String>,
{
    let mut groups: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in items {
        if let Some(k) = key(&item) {
            groups.entry(k).or_default().push(item);
        }
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    /// Whole number, rendered without decimals
    Count,
    /// Rounded to the given number of decimals at table construction
    Decimal(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub measure: Measure,
}

impl ColumnSpec {
    pub const fn count(name: &'static str) -> Self {
        Self {
            name,
            measure: Measure::Count,
        }
    }

    pub const fn decimal(name: &'static str, places: u32) -> Self {
        Self {
            name,
            measure: Measure::Decimal(places),
        }
    }
}

/// Unrounded measures per group key for one aggregation stage
#[derive(Debug, Clone, Default)]
pub struct Stage {
    columns: Vec<ColumnSpec>,
    rows: BTreeMap<String, Vec<Option<f64>>>,
}

impl Stage {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.insert(key.into(), values);
    }

    /// Merge two stages on the group key. Every key from either side is kept;
    /// measures a side lacks for a key stay undefined rather than zero.
    pub fn outer_join(self, other: Stage) -> Stage {
        let left_width = self.columns.len();
        let right_width = other.columns.len();

        let mut columns = self.columns;
        columns.extend(other.columns);

        let mut left = self.rows;
        let mut right = other.rows;
        let mut keys: Vec<String> = left.keys().chain(right.keys()).cloned().collect();
        keys.sort();
        keys.dedup();

        let mut rows = BTreeMap::new();
        for key in keys {
            let mut values = left.remove(&key).unwrap_or_else(|| vec![None; left_width]);
            values.extend(right.remove(&key).unwrap_or_else(|| vec![None; right_width]));
            rows.insert(key, values);
        }

        Stage { columns, rows }
    }
}

/// How a grouped table orders its categories
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryOrder {
    /// Fixed sequence (calendar groupings); keys outside it go last, lexically
    Canonical(&'static [&'static str]),
    /// Descending by the named count column, ties by key
    DescendingCount(&'static str),
    /// Ascending by the bucket's numeric lower bound, then descending by the
    /// named count column; unparsable buckets go last
    OwnerBucket(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyKind {
    Text,
    Int,
}

/// Derives a display label column from the group key
pub type KeyLabel = (&'static str, fn(&str) -> Option<String>);

#[derive(Clone)]
pub struct TableSpec {
    pub name: &'static str,
    pub key_column: &'static str,
    pub key_kind: KeyKind,
    pub key_label: Option<KeyLabel>,
    pub order: CategoryOrder,
    /// Drop groups whose count column is below the threshold
    pub min_count: Option<(&'static str, usize)>,
}

static BUCKET_LOWER_BOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d[\d,]*)").expect("valid regex"));

/// Numeric lower bound of an owner-bucket label such as "20,000 - 50,000"
pub fn owner_bucket_lower_bound(label: &str) -> Option<u64> {
    let caps = BUCKET_LOWER_BOUND.captures(label)?;
    caps[1].replace(',', "").parse().ok()
}

type Row = (String, Vec<Option<f64>>);

fn column_position(columns: &[ColumnSpec], name: &str) -> Option<usize> {
    columns.iter().position(|c| c.name == name)
}

fn count_of(row: &Row, idx: Option<usize>) -> f64 {
    idx.and_then(|i| row.1[i]).unwrap_or(f64::NEG_INFINITY)
}

fn sort_rows(rows: &mut [Row], order: &CategoryOrder, columns: &[ColumnSpec]) {
    match order {
        CategoryOrder::Canonical(sequence) => {
            let rank = |key: &str| sequence.iter().position(|s| *s == key).unwrap_or(usize::MAX);
            rows.sort_by(|a, b| rank(&a.0).cmp(&rank(&b.0)).then_with(|| a.0.cmp(&b.0)));
        }
        CategoryOrder::DescendingCount(column) => {
            let idx = column_position(columns, column);
            rows.sort_by(|a, b| {
                count_of(b, idx)
                    .total_cmp(&count_of(a, idx))
                    .then_with(|| a.0.cmp(&b.0))
            });
        }
        CategoryOrder::OwnerBucket(column) => {
            let idx = column_position(columns, column);
            rows.sort_by(|a, b| {
                let bounds = match (owner_bucket_lower_bound(&a.0), owner_bucket_lower_bound(&b.0)) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                bounds
                    .then_with(|| count_of(b, idx).total_cmp(&count_of(a, idx)))
                    .then_with(|| a.0.cmp(&b.0))
            });
        }
    }
}

/// Turn a (possibly merged) stage into an output table: sparse groups are
/// filtered after aggregation, categories are ordered, measures are rounded.
pub fn build_table(stage: Stage, spec: &TableSpec) -> MartTable {
    let Stage { columns, rows } = stage;
    let mut rows: Vec<Row> = rows.into_iter().collect();

    if let Some((count_column, min)) = spec.min_count {
        let idx = column_position(&columns, count_column);
        rows.retain(|row| count_of(row, idx) >= min as f64);
    }

    sort_rows(&mut rows, &spec.order, &columns);

    let mut header = vec![spec.key_column];
    if let Some((label_column, _)) = spec.key_label {
        header.push(label_column);
    }
    header.extend(columns.iter().map(|c| c.name));

    let mut table = MartTable::new(spec.name, header);
    for (key, values) in rows {
        let mut cells = Vec::with_capacity(values.len() + 2);
        cells.push(match spec.key_kind {
            KeyKind::Int => key.parse::<i64>().map(Cell::Int).unwrap_or_else(|_| Cell::text(&key)),
            KeyKind::Text => Cell::text(&key),
        });
        if let Some((_, label)) = spec.key_label {
            cells.push(Cell::opt_text(label(&key).as_deref()));
        }
        for (value, column) in values.into_iter().zip(columns.iter()) {
            cells.push(match column.measure {
                Measure::Count => value.map(|v| Cell::Int(v.round() as i64)).unwrap_or(Cell::Null),
                Measure::Decimal(places) => Cell::decimal(value, places),
            });
        }
        table.push_row(cells);
    }
    table
}

#[cfg(test)]
impl Stage {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn value(&self, key: &str, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c.name == column)?;
        self.rows.get(key).and_then(|v| v[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEASONS: &[&str] = &["Winter", "Spring", "Summer", "Fall"];

    fn spec(order: CategoryOrder, min_count: Option<(&'static str, usize)>) -> TableSpec {
        TableSpec {
            name: "test",
            key_column: "Key",
            key_kind: KeyKind::Text,
            key_label: None,
            order,
            min_count,
        }
    }

    fn counts(entries: &[(&str, f64)]) -> Stage {
        let mut stage = Stage::new(vec![ColumnSpec::count("n")]);
        for (k, n) in entries {
            stage.insert(*k, vec![Some(*n)]);
        }
        stage
    }

    fn keys(table: &MartTable) -> Vec<String> {
        table
            .rows
            .iter()
            .map(|r| match &r[0] {
                Cell::Text(s) => s.clone(),
                Cell::Int(i) => i.to_string(),
                other => format!("{:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_summary_statistics() {
        let s = Summary::of(vec![35.0, 10.0, 20.0, 15.0]);
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, Some(20.0));
        assert_eq!(s.median, Some(17.5));
        assert_eq!(s.min, Some(10.0));
        assert_eq!(s.max, Some(35.0));

        let odd = Summary::of(vec![3.0, 1.0, 2.0]);
        assert_eq!(odd.median, Some(2.0));
    }

    #[test]
    fn test_empty_summary_has_no_statistics() {
        let s = Summary::of(Vec::<f64>::new());
        assert_eq!(s.count, 0);
        assert_eq!(s.mean, None);
        assert_eq!(s.median, None);
    }

    #[test]
    fn test_percentage_of_empty_population_is_undefined() {
        assert_eq!(percentage(1, 4), Some(25.0));
        assert_eq!(percentage(0, 0), None);
    }

    #[test]
    fn test_canonical_order_ignores_lexical_and_first_seen() {
        let stage = counts(&[("Summer", 1.0), ("Spring", 2.0)]);
        let table = build_table(stage, &spec(CategoryOrder::Canonical(SEASONS), None));
        assert_eq!(keys(&table), vec!["Spring", "Summer"]);
    }

    #[test]
    fn test_descending_count_breaks_ties_by_key() {
        let stage = counts(&[("RPG", 2.0), ("Action", 5.0), ("Indie", 2.0)]);
        let table = build_table(stage, &spec(CategoryOrder::DescendingCount("n"), None));
        assert_eq!(keys(&table), vec!["Action", "Indie", "RPG"]);
    }

    #[test]
    fn test_owner_buckets_sort_by_lower_bound_with_unparsable_last() {
        let stage = counts(&[
            ("20,000 - 50,000", 1.0),
            ("N/A", 9.0),
            ("0 - 20000", 3.0),
            ("1,000,000 - 2,000,000", 7.0),
        ]);
        let table = build_table(stage, &spec(CategoryOrder::OwnerBucket("n"), None));
        assert_eq!(
            keys(&table),
            vec!["0 - 20000", "20,000 - 50,000", "1,000,000 - 2,000,000", "N/A"]
        );
    }

    #[test]
    fn test_owner_bucket_lower_bound() {
        assert_eq!(owner_bucket_lower_bound("0 - 20000"), Some(0));
        assert_eq!(owner_bucket_lower_bound(" 50,000 - 100,000"), Some(50_000));
        assert_eq!(owner_bucket_lower_bound("unknown"), None);
    }

    #[test]
    fn test_sparse_groups_filtered_after_aggregation() {
        let mut stage = Stage::new(vec![ColumnSpec::count("n"), ColumnSpec::decimal("pct", 2)]);
        stage.insert("big", vec![Some(3.0), Some(75.0)]);
        stage.insert("small", vec![Some(1.0), Some(25.0)]);
        let table = build_table(stage, &spec(CategoryOrder::DescendingCount("n"), Some(("n", 2))));
        assert_eq!(keys(&table), vec!["big"]);
        // percentages still reflect the full population
        assert_eq!(table.get(0, "pct"), Some(&Cell::Float(75.0)));
    }

    #[test]
    fn test_outer_join_keeps_every_key_with_nulls() {
        let mut all = Stage::new(vec![ColumnSpec::count("games")]);
        all.insert("Action", vec![Some(2.0)]);
        all.insert("Casual", vec![Some(1.0)]);
        let mut paid = Stage::new(vec![ColumnSpec::decimal("avg_price_paid", 2)]);
        paid.insert("Action", vec![Some(22.5)]);
        paid.insert("Strategy", vec![Some(5.0)]);

        let merged = all.outer_join(paid);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.value("Casual", "avg_price_paid"), None);
        assert_eq!(merged.value("Strategy", "games"), None);
        assert_eq!(merged.value("Action", "avg_price_paid"), Some(22.5));

        let table = build_table(merged, &spec(CategoryOrder::DescendingCount("games"), None));
        assert_eq!(table.columns, vec!["Key", "games", "avg_price_paid"]);
        let casual = table.find("Key", "Casual").unwrap();
        assert_eq!(casual[2], Cell::Null);
    }

    #[test]
    fn test_rounding_happens_once_at_build() {
        let mut stage = Stage::new(vec![ColumnSpec::decimal("avg", 2)]);
        stage.insert("x", vec![Some(1.0 / 3.0 * 3.0 + 0.004999)]);
        let table = build_table(stage, &spec(CategoryOrder::DescendingCount("avg"), None));
        assert_eq!(table.get(0, "avg"), Some(&Cell::Float(1.0)));
    }

    fn month_label(key: &str) -> Option<String> {
        key.parse::<u32>().ok().and_then(crate::constants::month_name).map(String::from)
    }

    #[test]
    fn test_int_keys_and_labels() {
        let mut stage = Stage::new(vec![ColumnSpec::count("n")]);
        stage.insert("3", vec![Some(2.0)]);
        let table = build_table(
            stage,
            &TableSpec {
                name: "months",
                key_column: "ReleaseMonth",
                key_kind: KeyKind::Int,
                key_label: Some(("MonthName", month_label as fn(&str) -> Option<String>)),
                order: CategoryOrder::Canonical(&["1", "2", "3"]),
                min_count: None,
            },
        );
        assert_eq!(table.columns, vec!["ReleaseMonth", "MonthName", "n"]);
        assert_eq!(table.rows[0], vec![Cell::Int(3), Cell::text("Mar"), Cell::Int(2)]);
    }
}
