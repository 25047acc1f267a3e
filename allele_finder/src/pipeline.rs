// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

// Sort the clonotypes of every sample by germline gene, cut the sorted stream into
// one cluster per gene, and call alleles cluster by cluster.

use crate::allele::Allele;
use crate::caller::AlleleCaller;
use crate::clonotype::{CloneDescription, Clonotype, ClonotypeSource};
use crate::cluster::ClusterBuilder;
use crate::errors::AlleleError;
use crate::parameters::FindAllelesParameters;
use crate::report::{FindAllelesReport, GeneTypeReport};
use anyhow::{Context, Result};
use ext_sort::{ExtSorter, MemoryBudget, SortKey, SortedIter};
use log::{debug, info, warn};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;
use vdj_types::{GeneId, GeneType};

/// Orders clonotypes by the name of their gene of one type.
pub struct GeneName(pub GeneType);

impl<C: Clonotype> SortKey<C> for GeneName {
    type Key = str;

    fn sort_key<'a>(&self, clonotype: &'a C) -> Cow<'a, str> {
        Cow::Borrowed(clonotype.gene(self.0).map_or("", GeneId::name))
    }
}

type Code<S> = <<S as ClonotypeSource>::Item as Clonotype>::Code;

/// Alleles of every searched gene type, with the counters of the search.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundAlleles<M> {
    /// Alleles by gene type, each list sorted by gene then allele name.
    pub alleles: BTreeMap<GeneType, Vec<Allele<M>>>,
    /// Counters of every pass.
    pub report: FindAllelesReport,
}

/// Searches germline alleles in the clonotypes of one or more samples.
pub struct AllelesSearcher<'a, S> {
    params: FindAllelesParameters,
    sources: &'a [S],
    budget: MemoryBudget,
    temp_dir: Option<PathBuf>,
}

impl<'a, S: ClonotypeSource> AllelesSearcher<'a, S> {
    /// Searcher over `sources`, failing if `params` are out of range.
    pub fn new(params: FindAllelesParameters, sources: &'a [S]) -> Result<Self, AlleleError> {
        let params = params.validated()?;
        let budget = params.memory_budget();
        Ok(AllelesSearcher {
            params,
            sources,
            budget,
            temp_dir: None,
        })
    }

    /// Override the sort budget derived from the parameters.
    pub fn with_budget(mut self, budget: MemoryBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Spill sorted chunks under `dir` rather than the system temporary directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Validated parameters of the search.
    pub fn params(&self) -> &FindAllelesParameters {
        &self.params
    }

    fn accept(&self, clonotype: &S::Item, gene_type: GeneType, report: &mut GeneTypeReport) -> bool {
        if self.params.productive_only && !clonotype.is_productive() {
            report.non_productive += 1;
            false
        } else if clonotype.count() < self.params.filter_clones_with_count_less_than {
            report.below_count_threshold += 1;
            false
        } else if clonotype.gene(gene_type).is_none() {
            warn!("skipping a clonotype without a {gene_type} gene");
            report.missing_hit += 1;
            false
        } else {
            true
        }
    }

    /// All accepted clonotypes of all sources, sorted by their `gene_type` gene.
    pub fn sort_clonotypes(
        &self,
        gene_type: GeneType,
        budget: MemoryBudget,
        report: &mut GeneTypeReport,
    ) -> Result<SortedIter<S::Item>> {
        let mut sorter = ExtSorter::new(GeneName(gene_type), budget);
        if let Some(dir) = &self.temp_dir {
            sorter = sorter.with_temp_dir(dir);
        }
        for (i, source) in self.sources.iter().enumerate() {
            let clonotypes = source
                .open()
                .with_context(|| format!("opening clonotype source {i}"))?;
            for clonotype in clonotypes {
                let clonotype = clonotype.with_context(|| format!("reading clonotype source {i}"))?;
                report.clonotypes_seen += 1;
                if self.accept(&clonotype, gene_type, report) {
                    sorter.push(clonotype)?;
                }
            }
        }
        sorter.finish()
    }

    /// Alleles of all `gene_type` genes, using the whole sort budget.
    pub fn find_alleles(&self, gene_type: GeneType) -> Result<(Vec<Allele<Code<S>>>, GeneTypeReport)> {
        self.search(gene_type, self.budget)
    }

    fn search(
        &self,
        gene_type: GeneType,
        budget: MemoryBudget,
    ) -> Result<(Vec<Allele<Code<S>>>, GeneTypeReport)> {
        let complementary = gene_type
            .complementary()
            .ok_or(AlleleError::NoComplementaryGene { gene_type })?;
        let mut report = GeneTypeReport::default();
        let mut sorted = self.sort_clonotypes(gene_type, budget, &mut report)?;
        report.spilled_chunks = sorted.spilled_chunks() as u64;

        let caller = AlleleCaller::new(&self.params);
        let mut alleles = Vec::new();
        let clusters = ClusterBuilder::new(sorted.by_ref(), |a: &S::Item, b: &S::Item| {
            a.gene(gene_type) == b.gene(gene_type)
        });
        for cluster in clusters {
            let cluster = cluster?;
            let Some(gene) = cluster[0].gene(gene_type).cloned() else {
                continue;
            };
            let descriptions: Vec<_> = cluster
                .iter()
                .map(|c| CloneDescription::new(c, gene_type, complementary))
                .collect();
            let found = caller
                .call(&descriptions)
                .with_context(|| format!("searching alleles of {gene}"))?;
            debug!("{gene}: {} clonotypes, {} alleles", cluster.len(), found.len());

            report.clusters += 1;
            report.clonotypes_used += cluster.len() as u64;
            if found.len() == 2 {
                report.clusters_with_two_alleles += 1;
            }
            let mut gene_alleles: Vec<_> = found
                .into_iter()
                .map(|mutations| Allele::new(gene.clone(), mutations))
                .collect();
            gene_alleles.sort_by_cached_key(Allele::name);
            alleles.extend(gene_alleles);
        }
        sorted.close()?;

        report.alleles = alleles.len() as u64;
        info!(
            "{gene_type}: sorted {} clonotypes into {} clusters ({} spilled chunks), found {} alleles",
            report.clonotypes_used, report.clusters, report.spilled_chunks, report.alleles
        );
        Ok((alleles, report))
    }

    /// Search V and J alleles at the same time, each pass with half the budget.
    pub fn find_all(&self) -> Result<FoundAlleles<Code<S>>> {
        let budget = self.budget.split(GeneType::SEARCHABLE.len() as u64);
        let (v, j) = rayon::join(
            || self.search(GeneType::V, budget),
            || self.search(GeneType::J, budget),
        );
        let mut found = FoundAlleles {
            alleles: BTreeMap::new(),
            report: FindAllelesReport::default(),
        };
        for (gene_type, result) in GeneType::SEARCHABLE.into_iter().zip([v, j]) {
            let (alleles, report) = result?;
            found.alleles.insert(gene_type, alleles);
            found.report.insert(gene_type, report);
        }
        Ok(found)
    }
}
