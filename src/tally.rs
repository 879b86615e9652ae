use std::collections::HashMap;

use crate::antigen::AntigenSet;

/// Occurrence counts of antigen sets over a typing table.
///
/// Every [`add`](Self::add) bumps the denominator, so the counts always sum
/// to the number of typings seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTally {
    counts: HashMap<AntigenSet, u64>,
    denominator: u64,
}

/// One output row of the frequency table.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyRecord {
    pub antigens: AntigenSet,
    pub label: String,
    pub count: u64,
    pub probability: f64,
    pub denominator: u64,
}

impl FrequencyTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one typing. Returns the updated count for its antigen set.
    pub fn add(&mut self, antigens: AntigenSet) -> u64 {
        self.denominator += 1;
        let count = self.counts.entry(antigens).or_insert(0);
        *count += 1;
        *count
    }

    pub fn count(&self, antigens: &AntigenSet) -> u64 {
        self.counts.get(antigens).copied().unwrap_or(0)
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// Number of distinct antigen sets.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.denominator == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AntigenSet, u64)> {
        self.counts.iter().map(|(antigens, count)| (antigens, *count))
    }

    /// Frequency rows ordered by antigen set.
    pub fn records(&self) -> Vec<FrequencyRecord> {
        let denominator = self.denominator;
        let mut records: Vec<FrequencyRecord> = self
            .counts
            .iter()
            .map(|(antigens, &count)| FrequencyRecord {
                antigens: antigens.clone(),
                label: antigens.label(),
                count,
                probability: count as f64 / denominator as f64,
                denominator,
            })
            .collect();
        records.sort_by(|a, b| a.antigens.cmp(&b.antigens));
        records
    }
}

impl Extend<AntigenSet> for FrequencyTally {
    fn extend<I: IntoIterator<Item = AntigenSet>>(&mut self, iter: I) {
        for antigens in iter {
            self.add(antigens);
        }
    }
}

impl FromIterator<AntigenSet> for FrequencyTally {
    fn from_iter<I: IntoIterator<Item = AntigenSet>>(iter: I) -> Self {
        let mut tally = Self::new();
        tally.extend(iter);
        tally
    }
}
