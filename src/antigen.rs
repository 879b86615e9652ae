//! Canonical antigen sets.
//!
//! A typing is reduced to the set of antigens it carries: each allele code
//! is prefixed with its locus letter and blank alleles are dropped. The set
//! is ordered, so equality, hashing and the rendered label only depend on
//! membership and never on the column an allele was read from.

use std::{collections::BTreeSet, fmt};

use crate::typing::Typing;

/// Separator between antigens in a rendered label.
pub const LABEL_DELIMITER: &str = ";";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Locus {
    A,
    B,
}

impl Locus {
    pub fn prefix(self) -> &'static str {
        match self {
            Locus::A => "A",
            Locus::B => "B",
        }
    }

    /// Labels an allele code with this locus, or `None` for a blank allele.
    ///
    /// An empty code and a code equal to the bare locus letter both mean
    /// "no antigen typed" for that allele.
    pub fn antigen(self, allele: &str) -> Option<String> {
        let allele = allele.trim();
        if allele.is_empty() || allele == self.prefix() {
            None
        } else {
            Some(format!("{}{}", self.prefix(), allele))
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AntigenSet(BTreeSet<String>);

impl AntigenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_typing(typing: &Typing) -> Self {
        let mut set = Self::new();
        set.insert_allele(Locus::A, &typing.a1);
        set.insert_allele(Locus::A, &typing.a2);
        set.insert_allele(Locus::B, &typing.b1);
        set.insert_allele(Locus::B, &typing.b2);
        set
    }

    /// Adds the antigen for `allele` at `locus`; blank alleles are skipped.
    pub fn insert_allele(&mut self, locus: Locus, allele: &str) {
        if let Some(antigen) = locus.antigen(allele) {
            self.0.insert(antigen);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of antigens typed at `locus`.
    pub fn locus_count(&self, locus: Locus) -> usize {
        self.iter()
            .filter(|antigen| antigen.starts_with(locus.prefix()))
            .count()
    }

    /// Antigens joined with `;` in sorted order, e.g. `A1;A2;B44;B7`.
    pub fn label(&self) -> String {
        self.0
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(LABEL_DELIMITER)
    }
}

impl fmt::Display for AntigenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl<S> FromIterator<S> for AntigenSet
where
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
