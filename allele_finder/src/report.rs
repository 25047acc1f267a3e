// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

//! Counters describing one allele search.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vdj_types::GeneType;

/// Counters for one grouping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneTypeReport {
    /// Clonotypes read from all sources.
    pub clonotypes_seen: u64,
    /// Dropped for a stop codon or a frameshift in the CDR3.
    pub non_productive: u64,
    /// Dropped for a count below the threshold.
    pub below_count_threshold: u64,
    /// Dropped for lacking a hit on this gene type.
    pub missing_hit: u64,
    /// Clonotypes that reached the allele caller.
    pub clonotypes_used: u64,
    pub clusters: u64,
    pub alleles: u64,
    /// Clusters that yielded two alleles.
    pub clusters_with_two_alleles: u64,
    /// Chunks the sorter spilled to disk.
    pub spilled_chunks: u64,
}

impl GeneTypeReport {
    /// Add the counts of `other`.
    pub fn merge(&mut self, other: Self) {
        self.clonotypes_seen += other.clonotypes_seen;
        self.non_productive += other.non_productive;
        self.below_count_threshold += other.below_count_threshold;
        self.missing_hit += other.missing_hit;
        self.clonotypes_used += other.clonotypes_used;
        self.clusters += other.clusters;
        self.alleles += other.alleles;
        self.clusters_with_two_alleles += other.clusters_with_two_alleles;
        self.spilled_chunks += other.spilled_chunks;
    }

    /// Clonotypes dropped before sorting, for any reason.
    pub fn filtered(&self) -> u64 {
        self.non_productive + self.below_count_threshold + self.missing_hit
    }
}

impl ::std::ops::AddAssign for GeneTypeReport {
    fn add_assign(&mut self, other: GeneTypeReport) {
        self.merge(other);
    }
}

/// Counters of a whole search, keyed by gene type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindAllelesReport {
    by_gene_type: BTreeMap<GeneType, GeneTypeReport>,
}

impl FindAllelesReport {
    /// Counters of one gene type, if it was searched.
    pub fn get(&self, gene_type: GeneType) -> Option<&GeneTypeReport> {
        self.by_gene_type.get(&gene_type)
    }

    /// Add `report` to the counters already held for `gene_type`.
    pub fn insert(&mut self, gene_type: GeneType, report: GeneTypeReport) {
        *self.by_gene_type.entry(gene_type).or_default() += report;
    }

    /// Add every counter of `other`, gene type by gene type.
    pub fn merge(&mut self, other: Self) {
        for (gene_type, report) in other.by_gene_type {
            self.insert(gene_type, report);
        }
    }

    /// Pretty-printed JSON object keyed by gene type name.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl ::std::iter::FromIterator<(GeneType, GeneTypeReport)> for FindAllelesReport {
    fn from_iter<I: IntoIterator<Item = (GeneType, GeneTypeReport)>>(iter: I) -> Self {
        let mut report = FindAllelesReport::default();
        for (gene_type, r) in iter {
            report.insert(gene_type, r);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let v = GeneTypeReport {
            clonotypes_seen: 10,
            non_productive: 2,
            missing_hit: 1,
            clusters: 3,
            ..Default::default()
        };
        let j = GeneTypeReport {
            clonotypes_seen: 10,
            clusters: 1,
            ..Default::default()
        };
        let mut report: FindAllelesReport = [(GeneType::V, v), (GeneType::J, j)].into_iter().collect();
        report.merge([(GeneType::V, v)].into_iter().collect());
        let merged = report.get(GeneType::V).unwrap();
        assert_eq!(merged.clonotypes_seen, 20);
        assert_eq!(merged.filtered(), 6);
        assert_eq!(report.get(GeneType::J), Some(&j));
        assert!(report.get(GeneType::D).is_none());
    }

    #[test]
    fn test_json() {
        let mut report = FindAllelesReport::default();
        report.insert(
            GeneType::J,
            GeneTypeReport {
                alleles: 4,
                ..Default::default()
            },
        );
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Joining"]["alleles"], 4);
        assert_eq!(serde_json::from_str::<FindAllelesReport>(&json).unwrap(), report);
    }
}
