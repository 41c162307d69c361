//! Record filter.
//!
//! Selects corpus citations matching an author/title/year query. Author and
//! title match case-insensitively as substrings; an empty field matches
//! everything. Year bounds are inclusive and only applied when present.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrailError};
use crate::{CityMention, CorpusEntry, TravelRecord};

/// Author/title/year query of one filter panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// Substring searched in the author (case-insensitive)
    pub author: String,
    /// Substring searched in the title (case-insensitive)
    pub title: String,
    /// Earliest year, inclusive
    pub year_begin: Option<i32>,
    /// Latest year, inclusive
    pub year_end: Option<i32>,
}

impl FilterPredicate {
    /// Create a predicate on author and title with no year bounds.
    pub fn new(author: &str, title: &str) -> Self {
        Self {
            author: author.to_string(),
            title: title.to_string(),
            year_begin: None,
            year_end: None,
        }
    }

    /// Set the inclusive year range.
    pub fn with_years(mut self, year_begin: Option<i32>, year_end: Option<i32>) -> Self {
        self.year_begin = year_begin;
        self.year_end = year_end;
        self
    }

    /// Build a predicate from the raw values of the filter form.
    ///
    /// Empty year fields mean "no bound". Anything else must be an integer.
    pub fn from_form(author: &str, title: &str, year_begin: &str, year_end: &str) -> Result<Self> {
        Ok(Self::new(author, title).with_years(
            parse_year("yearBegin", year_begin)?,
            parse_year("yearEnd", year_end)?,
        ))
    }

    /// True if this predicate matches every entry.
    pub fn is_empty(&self) -> bool {
        self.author.is_empty()
            && self.title.is_empty()
            && self.year_begin.is_none()
            && self.year_end.is_none()
    }

    /// Check a single citation against the predicate.
    pub fn matches(&self, entry: &CorpusEntry) -> bool {
        contains_ignore_case(&entry.author, &self.author)
            && contains_ignore_case(&entry.title, &self.title)
            && self.year_begin.map_or(true, |begin| entry.year >= begin)
            && self.year_end.map_or(true, |end| entry.year <= end)
    }
}

fn parse_year(field: &str, value: &str) -> Result<Option<i32>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i32>()
        .map(Some)
        .map_err(|_| TrailError::InvalidQuery {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A city mention that passed the filter, with its position in the corpus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedMention<'a> {
    /// Position of the mention in the full corpus
    pub order: usize,
    pub mention: &'a CityMention,
}

/// Filter city mentions, preserving corpus order.
///
/// Each result keeps its index in `mentions` so chronological replay can
/// use the original corpus sequence.
pub fn filter_mentions<'a>(
    mentions: &'a [CityMention],
    predicate: &FilterPredicate,
) -> Vec<IndexedMention<'a>> {
    mentions
        .iter()
        .enumerate()
        .filter(|(_, m)| predicate.matches(&m.entry))
        .map(|(order, mention)| IndexedMention { order, mention })
        .collect()
}

/// Filter travel records.
///
/// A travel is kept when at least one of its citations matches, and only
/// the matching citations are kept on it.
pub fn filter_travels(travels: &[TravelRecord], predicate: &FilterPredicate) -> Vec<TravelRecord> {
    travels
        .iter()
        .filter_map(|travel| {
            let entries: Vec<CorpusEntry> = travel
                .entries
                .iter()
                .filter(|e| predicate.matches(e))
                .cloned()
                .collect();
            if entries.is_empty() {
                None
            } else {
                Some(TravelRecord {
                    entries,
                    ..travel.clone()
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;

    fn mention(author: &str, title: &str, year: i32) -> CityMention {
        CityMention::new(
            Coordinate::new(10.0, 20.0),
            "A",
            CorpusEntry::new(author, title, year, ""),
        )
    }

    #[test]
    fn test_case_insensitive_substring() {
        let p = FilterPredicate::new("smith", "");
        assert!(p.matches(&CorpusEntry::new("John SMITH", "X", 1800, "")));
        assert!(!p.matches(&CorpusEntry::new("Jones", "X", 1800, "")));
    }

    #[test]
    fn test_empty_predicate_matches_all() {
        let p = FilterPredicate::default();
        assert!(p.is_empty());
        assert!(p.matches(&CorpusEntry::new("", "", -50, "")));
    }

    #[test]
    fn test_inclusive_year_range() {
        let p = FilterPredicate::default().with_years(Some(1800), Some(1850));
        assert!(p.matches(&CorpusEntry::new("A", "T", 1800, "")));
        assert!(p.matches(&CorpusEntry::new("A", "T", 1850, "")));
        assert!(!p.matches(&CorpusEntry::new("A", "T", 1799, "")));
        assert!(!p.matches(&CorpusEntry::new("A", "T", 1851, "")));
    }

    #[test]
    fn test_from_form() {
        let p = FilterPredicate::from_form("a", "t", "", " 1900 ").unwrap();
        assert_eq!(p.year_begin, None);
        assert_eq!(p.year_end, Some(1900));
        assert!(matches!(
            FilterPredicate::from_form("", "", "18th century", ""),
            Err(TrailError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn test_filter_keeps_order_and_index() {
        let mentions = vec![
            mention("Smith", "X", 1800),
            mention("Jones", "Y", 1850),
            mention("Smith", "Z", 1900),
        ];
        let result = filter_mentions(&mentions, &FilterPredicate::new("smith", ""));
        let orders: Vec<usize> = result.iter().map(|m| m.order).collect();
        assert_eq!(orders, vec![0, 2]);
    }

    #[test]
    fn test_filter_travels_keeps_matching_entries() {
        let travel = TravelRecord {
            from: Coordinate::new(0.0, 0.0),
            to: Coordinate::new(1.0, 1.0),
            description: "A-B".to_string(),
            entries: vec![
                CorpusEntry::new("Smith", "X", 1800, ""),
                CorpusEntry::new("Jones", "Y", 1800, ""),
            ],
        };
        let other = TravelRecord {
            entries: vec![CorpusEntry::new("Jones", "Y", 1800, "")],
            ..travel.clone()
        };
        let result = filter_travels(&[travel, other], &FilterPredicate::new("Smith", ""));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].entries.len(), 1);
        assert_eq!(result[0].entries[0].author, "Smith");
    }
}
