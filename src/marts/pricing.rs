//! Pricing by time: how price relates to release season, month, genre, and install base

use crate::constants::*;
use crate::pipeline::processing::aggregate::{
    build_table, group_by, CategoryOrder, ColumnSpec, KeyKind, MartTable, Stage, Summary, TableSpec,
};
use crate::pipeline::processing::enrich::EnrichedRecord;
use crate::pipeline::processing::expand::{expand, MultiValueField};

const MONTH_KEYS: &[&str] = &["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12"];

const FULL_PRICE_STATS: [ColumnSpec; 5] = [
    ColumnSpec::count("releases_count"),
    ColumnSpec::decimal("avg_price", CURRENCY_PLACES),
    ColumnSpec::decimal("median_price", CURRENCY_PLACES),
    ColumnSpec::decimal("min_price", CURRENCY_PLACES),
    ColumnSpec::decimal("max_price", CURRENCY_PLACES),
];

const SHORT_PRICE_STATS: [ColumnSpec; 3] = [
    ColumnSpec::count("releases_count"),
    ColumnSpec::decimal("avg_price", CURRENCY_PLACES),
    ColumnSpec::decimal("median_price", CURRENCY_PLACES),
];

fn full_stats(summary: Summary) -> Vec<Option<f64>> {
    vec![
        Some(summary.count as f64),
        summary.mean,
        summary.median,
        summary.min,
        summary.max,
    ]
}

fn short_stats(summary: Summary) -> Vec<Option<f64>> {
    vec![Some(summary.count as f64), summary.mean, summary.median]
}

fn month_label(key: &str) -> Option<String> {
    key.parse::<u32>().ok().and_then(month_name).map(String::from)
}

/// Rows eligible for price statistics
pub fn price_scope(records: &[EnrichedRecord], paid_only: bool) -> Vec<&EnrichedRecord> {
    records
        .iter()
        .filter(|r| r.price() >= 0.0)
        .filter(|r| !paid_only || r.is_paid())
        .collect()
}

/// Price scope further limited to rows with a known release month and season
pub fn time_scope(records: &[EnrichedRecord], paid_only: bool) -> Vec<&EnrichedRecord> {
    price_scope(records, paid_only)
        .into_iter()
        .filter(|r| r.derived.release_month.is_some() && r.derived.release_season.is_some())
        .collect()
}

pub fn by_season(scope: &[&EnrichedRecord]) -> MartTable {
    let groups = group_by(scope.iter().copied(), |r| {
        r.derived.release_season.map(|s| s.as_str().to_string())
    });
    let mut stage = Stage::new(FULL_PRICE_STATS.to_vec());
    for (season, rows) in groups {
        stage.insert(season, full_stats(Summary::of(rows.iter().map(|r| r.price()))));
    }
    build_table(
        stage,
        &TableSpec {
            name: Q1_BY_SEASON,
            key_column: COL_RELEASE_SEASON,
            key_kind: KeyKind::Text,
            key_label: None,
            order: CategoryOrder::Canonical(&SEASON_ORDER),
            min_count: None,
        },
    )
}

pub fn by_month(scope: &[&EnrichedRecord]) -> MartTable {
    let groups = group_by(scope.iter().copied(), |r| {
        r.derived.release_month.map(|m| m.to_string())
    });
    let mut stage = Stage::new(FULL_PRICE_STATS.to_vec());
    for (month, rows) in groups {
        stage.insert(month, full_stats(Summary::of(rows.iter().map(|r| r.price()))));
    }
    build_table(
        stage,
        &TableSpec {
            name: Q1_BY_MONTH,
            key_column: COL_RELEASE_MONTH,
            key_kind: KeyKind::Int,
            key_label: Some((COL_MONTH_NAME, month_label as fn(&str) -> Option<String>)),
            order: CategoryOrder::Canonical(MONTH_KEYS),
            min_count: None,
        },
    )
}

pub fn by_genre(scope: &[&EnrichedRecord], delimiter: &str) -> MartTable {
    let expanded = expand(scope.iter().copied(), MultiValueField::Genres, delimiter);
    let groups = group_by(expanded, |row| Some(row.value.to_string()));
    let mut stage = Stage::new(SHORT_PRICE_STATS.to_vec());
    for (genre, rows) in groups {
        stage.insert(genre, short_stats(Summary::of(rows.iter().map(|r| r.record.price()))));
    }
    build_table(
        stage,
        &TableSpec {
            name: Q1_BY_GENRE,
            key_column: COL_GENRE,
            key_kind: KeyKind::Text,
            key_label: None,
            order: CategoryOrder::DescendingCount("releases_count"),
            min_count: None,
        },
    )
}

pub fn by_owners(scope: &[&EnrichedRecord]) -> MartTable {
    let groups = group_by(scope.iter().copied(), |r| r.record.estimated_owners.clone());
    let mut stage = Stage::new(SHORT_PRICE_STATS.to_vec());
    for (bucket, rows) in groups {
        stage.insert(bucket, short_stats(Summary::of(rows.iter().map(|r| r.price()))));
    }
    build_table(
        stage,
        &TableSpec {
            name: Q1_BY_OWNERS,
            key_column: COL_OWNERS_BUCKET,
            key_kind: KeyKind::Text,
            key_label: None,
            order: CategoryOrder::OwnerBucket("releases_count"),
            min_count: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::aggregate::Cell;
    use crate::pipeline::processing::normalize::CleanRecord;
    use chrono::NaiveDate;

    fn game(name: &str, price: f64, month: Option<u32>, genres: &str) -> EnrichedRecord {
        let mut r = CleanRecord::new(name, price);
        r.release_date = month.and_then(|m| NaiveDate::from_ymd_opt(2020, m, 15));
        r.genres = Some(genres.to_string());
        EnrichedRecord::new(r)
    }

    #[test]
    fn test_seasons_follow_canonical_order() {
        let records = vec![
            game("a", 5.0, Some(7), "Action"),
            game("b", 10.0, Some(3), "Action"),
            game("c", 20.0, Some(3), "Action"),
        ];
        let table = by_season(&time_scope(&records, true));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, COL_RELEASE_SEASON), Some(&Cell::text("Spring")));
        assert_eq!(table.get(0, "releases_count"), Some(&Cell::Int(2)));
        assert_eq!(table.get(0, "avg_price"), Some(&Cell::Float(15.0)));
        assert_eq!(table.get(1, COL_RELEASE_SEASON), Some(&Cell::text("Summer")));
        assert_eq!(table.get(1, "releases_count"), Some(&Cell::Int(1)));
    }

    #[test]
    fn test_months_are_numeric_with_names() {
        let records = vec![
            game("a", 5.0, Some(12), "Action"),
            game("b", 7.0, Some(2), "Action"),
            game("c", 0.0, Some(1), "Action"),
            game("d", 9.0, None, "Action"),
        ];
        let table = by_month(&time_scope(&records, true));
        assert_eq!(
            table.columns,
            vec!["ReleaseMonth", "MonthName", "releases_count", "avg_price", "median_price", "min_price", "max_price"]
        );
        assert_eq!(table.rows[0][0], Cell::Int(2));
        assert_eq!(table.rows[0][1], Cell::text("Feb"));
        assert_eq!(table.rows[1][0], Cell::Int(12));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_paid_only_genre_prices() {
        let records = vec![
            game("A", 10.0, None, "Action, Indie"),
            game("B", 0.0, None, "Indie"),
            game("C", 35.0, None, "Action"),
        ];
        let table = by_genre(&price_scope(&records, true), ",");
        let action = table.find(COL_GENRE, "Action").unwrap();
        assert_eq!(action[1], Cell::Int(2));
        assert_eq!(action[2], Cell::Float(22.5));
        let indie = table.find(COL_GENRE, "Indie").unwrap();
        assert_eq!(indie[1], Cell::Int(1));
        assert_eq!(indie[2], Cell::Float(10.0));
    }

    #[test]
    fn test_all_games_mode_includes_free() {
        let records = vec![game("A", 10.0, Some(4), "Indie"), game("B", 0.0, Some(4), "Indie")];
        let table = by_season(&time_scope(&records, false));
        assert_eq!(table.get(0, "releases_count"), Some(&Cell::Int(2)));
        assert_eq!(table.get(0, "min_price"), Some(&Cell::Float(0.0)));
    }

    #[test]
    fn test_owner_buckets_ordered_by_lower_bound() {
        let mut records = Vec::new();
        for (bucket, n) in [("50000 - 100000", 1), ("0 - 20000", 3), ("20000 - 50000", 2)] {
            for i in 0..n {
                let mut r = CleanRecord::new(format!("{}-{}", bucket, i), 4.99);
                r.estimated_owners = Some(bucket.to_string());
                records.push(EnrichedRecord::new(r));
            }
        }
        let table = by_owners(&price_scope(&records, true));
        let buckets: Vec<&str> = table.rows.iter().filter_map(|r| r[0].as_str()).collect();
        assert_eq!(buckets, vec!["0 - 20000", "20000 - 50000", "50000 - 100000"]);
    }
}
