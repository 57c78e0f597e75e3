// Multi-value expansion: one row per token of a delimited field

use crate::constants::UNKNOWN_TOKEN;
use crate::pipeline::processing::enrich::EnrichedRecord;

/// Delimited fields that can be exploded for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiValueField {
    Genres,
    Publishers,
}

impl MultiValueField {
    fn value<'a>(&self, record: &'a EnrichedRecord) -> Option<&'a str> {
        match self {
            MultiValueField::Genres => record.record.genres.as_deref(),
            MultiValueField::Publishers => record.record.publishers.as_deref(),
        }
    }
}

/// One (record, single value) pair
#[derive(Debug, Clone, Copy)]
pub struct ExpandedRow<'a> {
    pub record: &'a EnrichedRecord,
    pub value: &'a str,
}

/// Split on `delimiter`, trim each token, and drop empty tokens and the
/// "unknown" sentinel. Source order is kept and duplicates are not removed.
pub fn split_values<'a>(field: &'a str, delimiter: &str) -> Vec<&'a str> {
    field
        .split(delimiter)
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case(UNKNOWN_TOKEN))
        .collect()
}

pub fn expand<'a, I>(records: I, field: MultiValueField, delimiter: &str) -> Vec<ExpandedRow<'a>>
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    let mut rows = Vec::new();
    for record in records {
        if let Some(text) = field.value(record) {
            for value in split_values(text, delimiter) {
                rows.push(ExpandedRow { record, value });
            }
        }
    }
    rows
}
