//! Listing parameters, from the raw query string to a validated descriptor

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Deserialize;
use strum_macros::{Display, EnumString};

use crate::catalog::{CatalogError, CatalogResult};
use crate::repository::interface::CatalogCollectionRecord;

/// Query string as sent by the client, e.g. `?sort=-note,collection&limit=10`
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct RawQuery {
    pub sort: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SortColumn {
    Collection,
    Note,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: SortColumn,
    pub descending: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub sort: Vec<SortKey>,
    /// None means no limit
    pub limit: Option<usize>,
    pub offset: usize,
    pub search: Option<String>,
}

fn invalid(reason: String) -> CatalogError {
    CatalogError::InvalidQuery { reason }
}

fn parse_sort(sort: &str) -> CatalogResult<Vec<SortKey>> {
    sort.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| {
            let (descending, name) = match key.strip_prefix('-') {
                Some(name) => (true, name),
                None => (false, key),
            };
            let column = SortColumn::from_str(name)
                .map_err(|_| invalid(format!("can't sort by {name:?}")))?;
            Ok(SortKey { column, descending })
        })
        .collect()
}

pub fn normalize(raw: &RawQuery) -> CatalogResult<NormalizedQuery> {
    let sort = match &raw.sort {
        Some(sort) => parse_sort(sort)?,
        None => vec![],
    };

    let limit = match raw.limit.as_deref().map(str::trim) {
        None | Some("") | Some("-1") => None,
        Some(limit) => Some(limit.parse::<usize>().map_err(|_| {
            invalid(format!(
                "\"limit\" must be a non-negative integer or -1, got {limit:?}"
            ))
        })?),
    };

    let offset = match raw.offset.as_deref().map(str::trim) {
        None | Some("") => 0,
        Some(offset) => offset.parse::<usize>().map_err(|_| {
            invalid(format!(
                "\"offset\" must be a non-negative integer, got {offset:?}"
            ))
        })?,
    };

    let search = raw
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(NormalizedQuery {
        sort,
        limit,
        offset,
        search,
    })
}

fn compare(a: &CatalogCollectionRecord, b: &CatalogCollectionRecord, key: &SortKey) -> Ordering {
    let ordering = match key.column {
        SortColumn::Collection => a.collection.cmp(&b.collection),
        // Collections without a note go first
        SortColumn::Note => a.note.cmp(&b.note),
    };
    if key.descending {
        ordering.reverse()
    } else {
        ordering
    }
}

impl NormalizedQuery {
    /// Filter, order and paginate a set of collections. Ties (and the default
    /// order) are broken by name.
    pub fn apply(&self, mut collections: Vec<CatalogCollectionRecord>) -> Vec<CatalogCollectionRecord> {
        if let Some(search) = &self.search {
            let search = search.to_lowercase();
            collections.retain(|c| c.collection.to_lowercase().contains(&search));
        }

        collections.sort_by(|a, b| {
            self.sort
                .iter()
                .map(|key| compare(a, b, key))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.collection.cmp(&b.collection))
        });

        collections
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}
