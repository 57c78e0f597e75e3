//! Market segments: free vs paid split and price tiers per genre

use crate::constants::*;
use crate::pipeline::processing::aggregate::{
    build_table, group_by, percentage, round_to, Cell, CategoryOrder, ColumnSpec, KeyKind,
    MartTable, Stage, Summary, TableSpec,
};
use crate::pipeline::processing::enrich::EnrichedRecord;
use crate::pipeline::processing::expand::{expand, MultiValueField};

const ALL_ROWS_COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec::count("games_count"),
    ColumnSpec::count("free_games"),
    ColumnSpec::decimal("free_pct", PERCENT_PLACES),
    ColumnSpec::decimal("paid_pct", PERCENT_PLACES),
];

const PAID_PRICE_COLUMNS: [ColumnSpec; 2] = [
    ColumnSpec::decimal("avg_price_paid", CURRENCY_PLACES),
    ColumnSpec::decimal("median_price_paid", CURRENCY_PLACES),
];

const PREMIUM_COLUMNS: [ColumnSpec; 2] = [
    ColumnSpec::count("paid_games"),
    ColumnSpec::decimal("pct_premium_paid", PERCENT_PLACES),
];

/// Free and paid shares rounded once, with the paid share taken as the
/// complement so the pair always sums to 100.
fn split_shares(free: usize, total: usize) -> (Option<f64>, Option<f64>) {
    match percentage(free, total) {
        Some(pct) => {
            let free_pct = round_to(pct, PERCENT_PLACES);
            (Some(free_pct), Some(round_to(100.0 - free_pct, PERCENT_PLACES)))
        }
        None => (None, None),
    }
}

/// Row-level segment table in source order
pub fn segment_rows(records: &[EnrichedRecord]) -> MartTable {
    let mut table = MartTable::new(
        Q3_ROWS,
        vec![COL_NAME, COL_PRICE, COL_IS_FREE, COL_GENRES, COL_PRICE_BAND],
    );
    for record in records {
        table.push_row(vec![
            Cell::text(&record.record.name),
            Cell::decimal(Some(record.price()), CURRENCY_PLACES),
            Cell::Bool(record.derived.is_free),
            Cell::opt_text(record.record.genres.as_deref()),
            Cell::text(record.derived.price_band.as_str()),
        ]);
    }
    table
}

/// Single-row summary of the free/paid split. Percentages are null for an
/// empty record set.
pub fn free_vs_paid(records: &[EnrichedRecord]) -> MartTable {
    let total = records.len();
    let free = records.iter().filter(|r| r.derived.is_free).count();
    let (free_pct, paid_pct) = split_shares(free, total);

    let mut table = MartTable::new(
        Q3_FREE_VS_PAID,
        vec!["total_games", "free_games", "paid_games", "free_pct", "paid_pct"],
    );
    table.push_row(vec![
        Cell::count(total),
        Cell::count(free),
        Cell::count(total - free),
        Cell::decimal(free_pct, PERCENT_PLACES),
        Cell::decimal(paid_pct, PERCENT_PLACES),
    ]);
    table
}

/// Per-genre price segments. Three stages are computed independently (all
/// rows, paid rows, premium share among paid rows) and outer-joined on the
/// genre, so a genre without paid games keeps null paid measures.
pub fn genre_price_segments(
    records: &[EnrichedRecord],
    delimiter: &str,
    min_games: usize,
) -> MartTable {
    let expanded = expand(records, MultiValueField::Genres, delimiter);

    let mut all_rows = Stage::new(ALL_ROWS_COLUMNS.to_vec());
    for (genre, rows) in group_by(expanded.iter().copied(), |row| Some(row.value.to_string())) {
        let free = rows.iter().filter(|r| r.record.derived.is_free).count();
        let (free_pct, paid_pct) = split_shares(free, rows.len());
        all_rows.insert(
            genre,
            vec![Some(rows.len() as f64), Some(free as f64), free_pct, paid_pct],
        );
    }

    let paid_groups = group_by(
        expanded.iter().copied().filter(|r| r.record.is_paid()),
        |row| Some(row.value.to_string()),
    );

    let mut paid_prices = Stage::new(PAID_PRICE_COLUMNS.to_vec());
    let mut premium = Stage::new(PREMIUM_COLUMNS.to_vec());
    for (genre, rows) in paid_groups {
        let price = Summary::of(rows.iter().map(|r| r.record.price()));
        paid_prices.insert(genre.clone(), vec![price.mean, price.median]);

        let premium_count = rows
            .iter()
            .filter(|r| r.record.price() >= PREMIUM_LOWER_BOUND)
            .count();
        premium.insert(
            genre,
            vec![Some(rows.len() as f64), percentage(premium_count, rows.len())],
        );
    }

    build_table(
        all_rows.outer_join(paid_prices).outer_join(premium),
        &TableSpec {
            name: Q3_GENRE,
            key_column: COL_GENRE,
            key_kind: KeyKind::Text,
            key_label: None,
            order: CategoryOrder::DescendingCount("games_count"),
            min_count: Some(("games_count", min_games)),
        },
    )
}
