//! Reviews vs price: whether well-reviewed games cost more, by genre and publisher

use crate::constants::*;
use crate::pipeline::processing::aggregate::{
    build_table, group_by, Cell, CategoryOrder, ColumnSpec, KeyKind, MartTable, Stage, Summary,
    TableSpec,
};
use crate::pipeline::processing::enrich::EnrichedRecord;
use crate::pipeline::processing::expand::{expand, ExpandedRow, MultiValueField};

const GENRE_COLUMNS: [ColumnSpec; 6] = [
    ColumnSpec::count("games_count"),
    ColumnSpec::decimal("avg_review_ratio", RATIO_PLACES),
    ColumnSpec::decimal("median_review_ratio", RATIO_PLACES),
    ColumnSpec::decimal("avg_price", CURRENCY_PLACES),
    ColumnSpec::decimal("median_price", CURRENCY_PLACES),
    ColumnSpec::decimal("avg_total_reviews", REVIEW_COUNT_PLACES),
];

const PUBLISHER_COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec::count("games_count"),
    ColumnSpec::decimal("avg_review_ratio", RATIO_PLACES),
    ColumnSpec::decimal("median_review_ratio", RATIO_PLACES),
    ColumnSpec::decimal("avg_price", CURRENCY_PLACES),
];

/// Rows with a defined review ratio and at least `min_total_reviews` reviews
pub fn review_scope(records: &[EnrichedRecord], min_total_reviews: u64) -> Vec<&EnrichedRecord> {
    records
        .iter()
        .filter(|r| r.price() >= 0.0)
        .filter(|r| {
            matches!(r.derived.review_ratio, Some(ratio) if (0.0..=1.0).contains(&ratio))
        })
        .filter(|r| r.derived.total_reviews.unwrap_or(0) >= min_total_reviews)
        .collect()
}

fn ratios<'a>(rows: &'a [ExpandedRow<'a>]) -> impl Iterator<Item = f64> + 'a {
    rows.iter().filter_map(|r| r.record.derived.review_ratio)
}

fn prices<'a>(rows: &'a [ExpandedRow<'a>]) -> impl Iterator<Item = f64> + 'a {
    rows.iter().map(|r| r.record.price())
}

/// Row-level feature table in source order
pub fn features(scope: &[&EnrichedRecord]) -> MartTable {
    let mut table = MartTable::new(
        Q2_FEATURES,
        vec![COL_NAME, COL_PRICE, COL_REVIEW_RATIO, COL_TOTAL_REVIEWS, COL_GENRES],
    );
    for record in scope {
        table.push_row(vec![
            Cell::text(&record.record.name),
            Cell::decimal(Some(record.price()), CURRENCY_PLACES),
            Cell::decimal(record.derived.review_ratio, ROW_RATIO_PLACES),
            record
                .derived
                .total_reviews
                .map(|t| Cell::Int(t as i64))
                .unwrap_or(Cell::Null),
            Cell::opt_text(record.record.genres.as_deref()),
        ]);
    }
    table
}

pub fn genre_review_ratio(scope: &[&EnrichedRecord], delimiter: &str) -> MartTable {
    let expanded = expand(scope.iter().copied(), MultiValueField::Genres, delimiter);
    let groups = group_by(expanded, |row| Some(row.value.to_string()));

    let mut stage = Stage::new(GENRE_COLUMNS.to_vec());
    for (genre, rows) in groups {
        let ratio = Summary::of(ratios(&rows));
        let price = Summary::of(prices(&rows));
        let reviews = Summary::of(
            rows.iter()
                .filter_map(|r| r.record.derived.total_reviews)
                .map(|t| t as f64),
        );
        stage.insert(
            genre,
            vec![
                Some(rows.len() as f64),
                ratio.mean,
                ratio.median,
                price.mean,
                price.median,
                reviews.mean,
            ],
        );
    }

    build_table(
        stage,
        &TableSpec {
            name: Q2_GENRE,
            key_column: COL_GENRE,
            key_kind: KeyKind::Text,
            key_label: None,
            order: CategoryOrder::DescendingCount("games_count"),
            min_count: None,
        },
    )
}

/// Publishers with fewer than `min_games` games in scope are left out after
/// aggregation.
pub fn publisher_review_ratio(
    scope: &[&EnrichedRecord],
    delimiter: &str,
    min_games: usize,
) -> MartTable {
    let expanded = expand(scope.iter().copied(), MultiValueField::Publishers, delimiter);
    let groups = group_by(expanded, |row| Some(row.value.to_string()));

    let mut stage = Stage::new(PUBLISHER_COLUMNS.to_vec());
    for (publisher, rows) in groups {
        let ratio = Summary::of(ratios(&rows));
        let price = Summary::of(prices(&rows));
        stage.insert(
            publisher,
            vec![Some(rows.len() as f64), ratio.mean, ratio.median, price.mean],
        );
    }

    build_table(
        stage,
        &TableSpec {
            name: Q2_PUBLISHER,
            key_column: COL_PUBLISHER,
            key_kind: KeyKind::Text,
            key_label: None,
            order: CategoryOrder::DescendingCount("games_count"),
            min_count: Some(("games_count", min_games)),
        },
    )
}
