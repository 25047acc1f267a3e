// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

// Mutation codes as seen by the allele caller.  The caller treats a code as an opaque
// token; the only structure it relies on is the position, used to order alleles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// An opaque mutation token relative to a germline reference.
pub trait MutationCode: Copy + Ord + Hash + fmt::Debug + Send + Sync {
    /// Zero-based position on the germline reference.
    fn position(&self) -> u32;
}

/// Anything that can list the mutation codes of one clonotype.
///
/// Implementations must be repeatable: every call to `codes` yields the same multiset.
/// Duplicates are allowed and are ignored by the caller.
pub trait MutationSource {
    /// Code type.
    type Code: MutationCode;

    /// Materialize the codes.
    fn codes(&self) -> impl Iterator<Item = Self::Code> + '_;
}

impl<M: MutationCode> MutationSource for Vec<M> {
    type Code = M;

    fn codes(&self) -> impl Iterator<Item = M> + '_ {
        self.iter().copied()
    }
}

/// Check that two materializations of a source agree, as multisets.
pub fn is_repeatable<S: MutationSource + ?Sized>(source: &S) -> bool {
    let mut first: Vec<_> = source.codes().collect();
    let mut second: Vec<_> = source.codes().collect();
    first.sort_unstable();
    second.sort_unstable();
    first == second
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Nucleotide {
    A,
    C,
    G,
    T,
    N,
}

impl Nucleotide {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Nucleotide::A),
            'C' => Some(Nucleotide::C),
            'G' => Some(Nucleotide::G),
            'T' => Some(Nucleotide::T),
            'N' => Some(Nucleotide::N),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Nucleotide::A => 'A',
            Nucleotide::C => 'C',
            Nucleotide::G => 'G',
            Nucleotide::T => 'T',
            Nucleotide::N => 'N',
        }
    }
}

/// A single-base substitution.  Orders by position first.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Substitution {
    position: u32,
    from: Nucleotide,
    to: Nucleotide,
}

impl Substitution {
    pub fn new(position: u32, from: Nucleotide, to: Nucleotide) -> Self {
        Substitution { position, from, to }
    }

    pub fn from(&self) -> Nucleotide {
        self.from
    }

    pub fn to(&self) -> Nucleotide {
        self.to
    }
}

impl MutationCode for Substitution {
    fn position(&self) -> u32 {
        self.position
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S{}:{}->{}",
            self.position,
            self.from.as_char(),
            self.to.as_char()
        )
    }
}

impl fmt::Debug for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Parses the compact form `SA12G` (from, position, to) as well as the display
/// form `S12:A->G`.
impl FromStr for Substitution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("'{s}' is not a substitution, expected e.g. SA12G or S12:A->G");
        let body = s.strip_prefix('S').ok_or_else(bad)?;
        let nuc = |c: Option<char>| c.and_then(Nucleotide::from_char).ok_or_else(bad);
        if let Some((pos, change)) = body.split_once(':') {
            let (from, to) = change.split_once("->").ok_or_else(bad)?;
            if from.len() != 1 || to.len() != 1 {
                return Err(bad());
            }
            Ok(Substitution {
                position: pos.parse().map_err(|_| bad())?,
                from: nuc(from.chars().next())?,
                to: nuc(to.chars().next())?,
            })
        } else {
            let mut chars = body.chars();
            let from = nuc(chars.next())?;
            let to = nuc(chars.next_back())?;
            Ok(Substitution {
                position: chars.as_str().parse().map_err(|_| bad())?,
                from,
                to,
            })
        }
    }
}

/// Parse a comma-separated list of substitutions, e.g. `SA0G,ST1G`.
pub fn parse_substitutions(s: &str) -> Result<Vec<Substitution>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_substitution() {
        let m: Substitution = "SA12G".parse().unwrap();
        assert_eq!(m.position(), 12);
        assert_eq!(m.from(), Nucleotide::A);
        assert_eq!(m.to(), Nucleotide::G);
        assert_eq!(m.to_string(), "S12:A->G");
        assert_eq!("S12:A->G".parse::<Substitution>().unwrap(), m);
        assert_eq!(format!("{m:?}"), "S12:A->G");

        for bad in ["", "S", "SAG", "XA1G", "SA1", "SZ1G", "S1:A->", "S1:AC->G", "Sx:A->G"] {
            assert!(bad.parse::<Substitution>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_parse_list() {
        let ms = parse_substitutions("ST1G, SC2G,").unwrap();
        assert_eq!(ms.len(), 2);
        assert_eq!(ms[1].to_string(), "S2:C->G");
        assert!(parse_substitutions("").unwrap().is_empty());
        assert!(parse_substitutions("ST1G,oops").is_err());
    }

    #[test]
    fn test_order_is_by_position_first() {
        let mut ms = parse_substitutions("ST5A,SC2G,SA2G").unwrap();
        ms.sort();
        assert_eq!(
            ms.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["S2:A->G", "S2:C->G", "S5:T->A"]
        );
    }

    #[test]
    fn test_vec_source_is_repeatable() {
        let ms = parse_substitutions("SA0G,SA0G,ST1G").unwrap();
        assert!(is_repeatable(&ms));
        assert_eq!(ms.codes().count(), 3);
    }
}
