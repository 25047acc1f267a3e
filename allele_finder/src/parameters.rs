// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

use crate::errors::AlleleError;
use anyhow::{Context, Result};
use ext_sort::MemoryBudget;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds for the allele search, usually read from a `find_alleles.toml`.
///
/// Fields that are absent from the file take their default.  Only
/// `min_part_of_clones_to_determinate_allele`, `productive_only`,
/// `filter_clones_with_count_less_than` and `max_memory_bytes` change the result
/// today; the others are accepted and validated so that existing configuration
/// files keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FindAllelesParameters {
    /// Clusters with fewer distinct clonotypes are not searched.  Not consumed.
    pub min_diversity_to_search_alleles: usize,
    /// Clusters with fewer distinct clonotypes do not get a second allele.  Not consumed.
    pub min_diversity_to_find_second_allele: usize,
    /// Share of a cluster that must carry a mutation for it to be part of an allele.
    pub min_part_of_clones_to_determinate_allele: f64,
    /// Score penalty for each allele mutation when realigning.  Not consumed.
    pub max_penalty_by_allele_mutation: f64,
    /// Drop clonotypes with a stop codon in the CDR3 or an out-of-frame CDR3.
    pub productive_only: bool,
    /// Share of clonotypes that must cover a germline range for it to be used.  Not consumed.
    pub min_portion_of_clones_for_common_alignment_ranges: f64,
    /// Drop clonotypes with a smaller count.
    pub filter_clones_with_count_less_than: u64,
    /// Maximum memory the process may address, which sets the sort budget.
    pub max_memory_bytes: Option<u64>,
}

const DEFAULT_PARAMETERS: FindAllelesParameters = FindAllelesParameters {
    min_diversity_to_search_alleles: 2,
    min_diversity_to_find_second_allele: 3,
    min_part_of_clones_to_determinate_allele: 0.8,
    max_penalty_by_allele_mutation: 2.0,
    productive_only: true,
    min_portion_of_clones_for_common_alignment_ranges: 0.9,
    filter_clones_with_count_less_than: 0,
    max_memory_bytes: None,
};

impl Default for FindAllelesParameters {
    fn default() -> Self {
        DEFAULT_PARAMETERS
    }
}

macro_rules! warn_non_default {
    ($params:ident, $($field:ident),+ $(,)?) => {
        $(
            if DEFAULT_PARAMETERS.$field != $params.$field {
                warn!("using non-default {} = {:?}", stringify!($field), $params.$field);
            }
        )+
    };
}

impl FindAllelesParameters {
    /// Check ranges and return the parameters unchanged.
    pub fn validated(self) -> Result<Self, AlleleError> {
        let p = self.min_part_of_clones_to_determinate_allele;
        if !(p > 0.0 && p <= 1.0) {
            return Err(AlleleError::InvalidParameter {
                name: "min_part_of_clones_to_determinate_allele",
                value: p,
                reason: "must be greater than 0 and at most 1",
            });
        }
        let portion = self.min_portion_of_clones_for_common_alignment_ranges;
        if !(0.0..=1.0).contains(&portion) {
            return Err(AlleleError::InvalidParameter {
                name: "min_portion_of_clones_for_common_alignment_ranges",
                value: portion,
                reason: "must lie between 0 and 1",
            });
        }
        let penalty = self.max_penalty_by_allele_mutation;
        if !(penalty.is_finite() && penalty >= 0.0) {
            return Err(AlleleError::InvalidParameter {
                name: "max_penalty_by_allele_mutation",
                value: penalty,
                reason: "must be a finite, non-negative number",
            });
        }
        let params = &self;
        warn_non_default!(
            params,
            min_diversity_to_search_alleles,
            min_diversity_to_find_second_allele,
            min_part_of_clones_to_determinate_allele,
            max_penalty_by_allele_mutation,
            productive_only,
            min_portion_of_clones_for_common_alignment_ranges,
            filter_clones_with_count_less_than,
        );
        Ok(self)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let params: Self = toml::from_str(s)?;
        Ok(params.validated()?)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| path.display().to_string())?;
        Self::from_toml_str(&s).with_context(|| path.display().to_string())
    }

    /// Sort budget for one grouping pass running alone.
    pub fn memory_budget(&self) -> MemoryBudget {
        self.max_memory_bytes
            .map_or_else(MemoryBudget::default, MemoryBudget::for_max_memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let params = FindAllelesParameters::from_toml_str("").unwrap();
        assert_eq!(params, FindAllelesParameters::default());
        assert_eq!(params.min_part_of_clones_to_determinate_allele, 0.8);
        assert!(params.productive_only);
        assert_eq!(params.memory_budget(), MemoryBudget::default());
    }

    #[test]
    fn test_partial_toml() {
        let params = FindAllelesParameters::from_toml_str(
            "min_part_of_clones_to_determinate_allele = 0.4\n\
             productive_only = false\n\
             max_memory_bytes = 16000000000\n",
        )
        .unwrap();
        assert_eq!(params.min_part_of_clones_to_determinate_allele, 0.4);
        assert!(!params.productive_only);
        assert_eq!(params.min_diversity_to_find_second_allele, 3);
        assert_eq!(params.memory_budget().bytes(), 4_000_000_000);
    }

    #[test]
    fn test_invalid_values() {
        for p in [0.0, -0.1, 1.5, f64::NAN] {
            let params = FindAllelesParameters {
                min_part_of_clones_to_determinate_allele: p,
                ..Default::default()
            };
            assert!(matches!(
                params.validated(),
                Err(AlleleError::InvalidParameter {
                    name: "min_part_of_clones_to_determinate_allele",
                    ..
                })
            ));
        }
        let params = FindAllelesParameters {
            min_part_of_clones_to_determinate_allele: 1.0,
            ..Default::default()
        };
        assert!(params.validated().is_ok());

        let err = FindAllelesParameters::from_toml_str(
            "min_portion_of_clones_for_common_alignment_ranges = 1.2",
        )
        .unwrap_err();
        assert!(err.to_string().contains("min_portion_of_clones"));
        assert!(FindAllelesParameters::from_toml_str("max_penalty_by_allele_mutation = -1.0").is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(FindAllelesParameters::from_toml_str("min_part_of_clones = 0.5").is_err());
    }

    #[test]
    fn test_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("find_alleles.toml");
        let mut f = std::fs::File::create(&path)?;
        writeln!(f, "filter_clones_with_count_less_than = 2")?;
        drop(f);
        let params = FindAllelesParameters::load(&path)?;
        assert_eq!(params.filter_clones_with_count_less_than, 2);

        let missing = dir.path().join("missing.toml");
        let err = FindAllelesParameters::load(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("missing.toml"));
        Ok(())
    }
}
