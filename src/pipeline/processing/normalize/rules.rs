use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::config::PartialRemapPolicy;
use crate::constants::*;
use crate::error::{MartError, Result};

/// Logical roles a source column can play after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LogicalColumn {
    Name,
    ReleaseDate,
    Price,
    EstimatedOwners,
    Genres,
    Publishers,
    Positive,
    Negative,
    IsFree,
}

impl LogicalColumn {
    pub const ALL: [LogicalColumn; 9] = [
        LogicalColumn::Name,
        LogicalColumn::ReleaseDate,
        LogicalColumn::Price,
        LogicalColumn::EstimatedOwners,
        LogicalColumn::Genres,
        LogicalColumn::Publishers,
        LogicalColumn::Positive,
        LogicalColumn::Negative,
        LogicalColumn::IsFree,
    ];

    /// Header used for this column in the cleaned record set
    pub fn canonical_name(&self) -> &'static str {
        match self {
            LogicalColumn::Name => COL_NAME,
            LogicalColumn::ReleaseDate => COL_RELEASE_DATE,
            LogicalColumn::Price => COL_PRICE,
            LogicalColumn::EstimatedOwners => COL_ESTIMATED_OWNERS,
            LogicalColumn::Genres => COL_GENRES,
            LogicalColumn::Publishers => COL_PUBLISHERS,
            LogicalColumn::Positive => COL_POSITIVE,
            LogicalColumn::Negative => COL_NEGATIVE,
            LogicalColumn::IsFree => COL_IS_FREE,
        }
    }
}

impl fmt::Display for LogicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// One entry of the physical-to-logical remap table
#[derive(Debug, Clone, Copy)]
pub struct ColumnRemap {
    pub physical: &'static str,
    pub logical: LogicalColumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVersion {
    V1,
}

impl RuleVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleVersion::V1 => "v1",
        }
    }
}

/// Versioned normalization rules. Source-format drift is handled by adding a
/// version here, not by branching in the normalizer.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub version: RuleVersion,
    /// Applied only when every physical column in the table is present
    pub remap: &'static [ColumnRemap],
    /// Column whose presence marks the export as the mis-aligned layout
    pub remap_marker: &'static str,
    /// Alternate physical headers tried when the canonical header is absent
    pub aliases: &'static [(LogicalColumn, &'static [&'static str])],
    /// Price tokens that mean zero
    pub free_price_tokens: &'static [&'static str],
    pub currency_symbols: &'static [char],
}

// The export puts the release date under "Name", the owner bucket under
// "Release date", and the game name under "AppID".
const V1_REMAP: &[ColumnRemap] = &[
    ColumnRemap { physical: COL_APP_ID, logical: LogicalColumn::Name },
    ColumnRemap { physical: COL_NAME, logical: LogicalColumn::ReleaseDate },
    ColumnRemap { physical: COL_RELEASE_DATE, logical: LogicalColumn::EstimatedOwners },
];

const V1_ALIASES: &[(LogicalColumn, &[&str])] = &[
    (LogicalColumn::Positive, &["positive", "Positive reviews", "Positive Reviews"]),
    (LogicalColumn::Negative, &["negative", "Negative reviews", "Negative Reviews"]),
    (LogicalColumn::Publishers, &["Publisher", "publishers"]),
    (LogicalColumn::Genres, &["Genre", "genres"]),
    (LogicalColumn::IsFree, &["is_free", "Is free"]),
    (LogicalColumn::EstimatedOwners, &["Owners", "owners"]),
];

const V1: RuleSet = RuleSet {
    version: RuleVersion::V1,
    remap: V1_REMAP,
    remap_marker: COL_APP_ID,
    aliases: V1_ALIASES,
    free_price_tokens: &["Free to Play", "Free"],
    currency_symbols: &['$', '€', '£'],
};

/// Where each logical column lives in a concrete header row
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    indices: HashMap<LogicalColumn, usize>,
    /// Whether the anomaly remap table was applied
    pub remapped: bool,
}

impl ColumnMap {
    pub fn index(&self, column: LogicalColumn) -> Option<usize> {
        self.indices.get(&column).copied()
    }

    pub fn contains(&self, column: LogicalColumn) -> bool {
        self.indices.contains_key(&column)
    }
}

impl RuleSet {
    pub fn for_version(version: &str) -> Result<Self> {
        match version.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(V1),
            other => Err(MartError::UnknownRuleSet(other.to_string())),
        }
    }

    pub fn v1() -> Self {
        V1
    }

    /// Map logical columns onto header positions and check the required set.
    pub fn resolve(
        &self,
        headers: &[String],
        required: &[LogicalColumn],
        policy: PartialRemapPolicy,
    ) -> Result<ColumnMap> {
        let position = |name: &str| headers.iter().position(|h| h == name);
        let mut map = ColumnMap::default();

        let (present, absent): (Vec<&ColumnRemap>, Vec<&ColumnRemap>) =
            self.remap.iter().partition(|r| position(r.physical).is_some());

        if absent.is_empty() && !present.is_empty() {
            for entry in self.remap {
                if let Some(i) = position(entry.physical) {
                    map.indices.insert(entry.logical, i);
                }
            }
            map.remapped = true;
        } else if policy == PartialRemapPolicy::Reject
            && !present.is_empty()
            && position(self.remap_marker).is_some()
        {
            return Err(MartError::PartialRemap {
                present: present.iter().map(|r| r.physical.to_string()).collect(),
                absent: absent.iter().map(|r| r.physical.to_string()).collect(),
            });
        }

        for column in LogicalColumn::ALL {
            if map.contains(column) {
                continue;
            }
            if let Some(i) = position(column.canonical_name()) {
                map.indices.insert(column, i);
                continue;
            }
            let alias = self
                .aliases
                .iter()
                .filter(|(logical, _)| *logical == column)
                .flat_map(|(_, names)| names.iter())
                .find_map(|name| position(*name));
            if let Some(i) = alias {
                map.indices.insert(column, i);
            }
        }

        let missing: Vec<String> = required
            .iter()
            .filter(|c| !map.contains(**c))
            .map(|c| c.canonical_name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MartError::MissingColumns {
                missing,
                found: headers.iter().take(50).cloned().collect(),
            });
        }

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_full_triplet_is_remapped() {
        let h = headers(&["AppID", "Name", "Release date", "Price"]);
        let map = RuleSet::v1()
            .resolve(&h, &[LogicalColumn::Name, LogicalColumn::Price], PartialRemapPolicy::FaceValue)
            .unwrap();
        assert!(map.remapped);
        assert_eq!(map.index(LogicalColumn::Name), Some(0));
        assert_eq!(map.index(LogicalColumn::ReleaseDate), Some(1));
        assert_eq!(map.index(LogicalColumn::EstimatedOwners), Some(2));
        assert_eq!(map.index(LogicalColumn::Price), Some(3));
    }

    #[test]
    fn test_remap_wins_over_existing_owner_column() {
        let h = headers(&["AppID", "Name", "Release date", "Estimated owners", "Price"]);
        let map = RuleSet::v1()
            .resolve(&h, &[], PartialRemapPolicy::FaceValue)
            .unwrap();
        assert_eq!(map.index(LogicalColumn::EstimatedOwners), Some(2));
    }

    #[test]
    fn test_partial_triplet_uses_face_value() {
        let h = headers(&["AppID", "Name", "Price"]);
        let map = RuleSet::v1()
            .resolve(&h, &[LogicalColumn::Name], PartialRemapPolicy::FaceValue)
            .unwrap();
        assert!(!map.remapped);
        assert_eq!(map.index(LogicalColumn::Name), Some(1));
        assert_eq!(map.index(LogicalColumn::ReleaseDate), None);
    }

    #[test]
    fn test_partial_triplet_rejected_under_strict_policy() {
        let h = headers(&["AppID", "Name", "Price"]);
        let result = RuleSet::v1().resolve(&h, &[], PartialRemapPolicy::Reject);
        match result {
            Err(MartError::PartialRemap { present, absent }) => {
                assert_eq!(present, vec!["AppID", "Name"]);
                assert_eq!(absent, vec!["Release date"]);
            }
            other => panic!("expected PartialRemap, got {:?}", other),
        }
    }

    #[test]
    fn test_clean_layout_is_not_rejected_under_strict_policy() {
        let h = headers(&["Name", "Release date", "Price"]);
        let map = RuleSet::v1()
            .resolve(&h, &[LogicalColumn::Name], PartialRemapPolicy::Reject)
            .unwrap();
        assert!(!map.remapped);
        assert_eq!(map.index(LogicalColumn::Name), Some(0));
    }

    #[test]
    fn test_aliases_fill_review_columns() {
        let h = headers(&["Name", "Price", "Positive reviews", "negative", "Publisher", "Genres"]);
        let map = RuleSet::v1()
            .resolve(
                &h,
                &[LogicalColumn::Positive, LogicalColumn::Negative, LogicalColumn::Publishers],
                PartialRemapPolicy::FaceValue,
            )
            .unwrap();
        assert_eq!(map.index(LogicalColumn::Positive), Some(2));
        assert_eq!(map.index(LogicalColumn::Negative), Some(3));
        assert_eq!(map.index(LogicalColumn::Publishers), Some(4));
    }

    #[test]
    fn test_missing_required_columns_lists_missing_and_found() {
        let h = headers(&["Title", "Cost"]);
        let err = RuleSet::v1()
            .resolve(&h, &[LogicalColumn::Name, LogicalColumn::Price], PartialRemapPolicy::FaceValue)
            .unwrap_err();
        match err {
            MartError::MissingColumns { missing, found } => {
                assert_eq!(missing, vec!["Name", "Price"]);
                assert_eq!(found, vec!["Title", "Cost"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        assert!(matches!(
            RuleSet::for_version("v9"),
            Err(MartError::UnknownRuleSet(_))
        ));
        assert_eq!(RuleSet::for_version("V1").unwrap().version, RuleVersion::V1);
    }
}
