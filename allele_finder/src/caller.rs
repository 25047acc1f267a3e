// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

// Call up to two alleles of one germline gene from the clonotypes aligned to it.
//
// A mutation carried by at least twice the threshold share of the cluster is "fixed"
// and belongs to every allele.  The remaining mutations become vertices of a graph in
// which two of them (or one with itself) are joined when enough clonotypes carry both.
// The largest clique of that graph, and the largest clique disjoint from it, give the
// polymorphic part of at most two alleles.

use crate::cooccurrence::CooccurrenceMatrix;
use crate::errors::AlleleError;
use crate::mutation::{MutationCode, MutationSource};
use crate::parameters::FindAllelesParameters;
use graph_simple::{AdjacencyMatrix, BitSet};
use itertools::Itertools;
use log::{debug, warn};

/// Per-cluster allele caller.
pub struct AlleleCaller<'a> {
    params: &'a FindAllelesParameters,
}

impl<'a> AlleleCaller<'a> {
    /// Caller using the clone share threshold of `params`.
    pub fn new(params: &'a FindAllelesParameters) -> Self {
        AlleleCaller { params }
    }

    /// Mutation sets of the alleles found in `cluster`, see [`find_alleles`].
    pub fn call<S: MutationSource>(&self, cluster: &[S]) -> Result<Vec<Vec<S::Code>>, AlleleError> {
        find_alleles(self.params.min_part_of_clones_to_determinate_allele, cluster)
    }
}

/// Mutation sets of the one or two alleles supported by `cluster`.
///
/// Each set is sorted by position and holds at most one code per position.  The
/// result does not depend on the order of the clonotypes.
pub fn find_alleles<S: MutationSource>(
    min_part_of_clones: f64,
    cluster: &[S],
) -> Result<Vec<Vec<S::Code>>, AlleleError> {
    if cluster.is_empty() {
        return Err(AlleleError::EmptyCluster);
    }
    let n = cluster.len() as f64;

    let per_clone: Vec<Vec<S::Code>> = cluster
        .iter()
        .map(|clone| {
            debug_assert!(crate::mutation::is_repeatable(clone));
            clone.codes().sorted_unstable().dedup().collect()
        })
        .collect();
    let universe: Vec<S::Code> = per_clone
        .iter()
        .kmerge()
        .dedup()
        .copied()
        .collect();

    let indices: Vec<Vec<usize>> = per_clone
        .iter()
        .map(|codes| {
            codes
                .iter()
                .filter_map(|code| universe.binary_search(code).ok())
                .collect()
        })
        .collect();
    let matrix = CooccurrenceMatrix::build(universe.len(), indices.iter().map(Vec::as_slice));
    matrix.check_symmetric()?;

    let fixed_threshold = min_part_of_clones * n * 2.0;
    let pair_threshold = min_part_of_clones * n;
    let (fixed, candidates): (Vec<usize>, Vec<usize>) = (0..universe.len())
        .partition(|&i| f64::from(matrix.occurrences(i)) >= fixed_threshold);

    let mut graph = AdjacencyMatrix::new(candidates.len());
    for (a, &i) in candidates.iter().enumerate() {
        for (b, &j) in candidates.iter().enumerate().skip(a) {
            if f64::from(matrix.count(i, j)) >= pair_threshold {
                graph.set_connected(a, b);
            }
        }
    }
    let cliques = graph.maximal_cliques();

    let primary = largest(cliques.iter());
    let secondary =
        primary.and_then(|p| largest(cliques.iter().filter(|c| c.is_disjoint(p))));
    debug!(
        "{} clonotypes: {} fixed, {} candidate mutations, {} cliques",
        cluster.len(),
        fixed.len(),
        candidates.len(),
        cliques.len()
    );

    let fixed_codes = || fixed.iter().map(|&i| universe[i]);
    let mut alleles: Vec<Vec<S::Code>> = [primary, secondary]
        .into_iter()
        .flatten()
        .map(|clique| {
            assemble(
                clique
                    .iter()
                    .map(|v| universe[candidates[v]])
                    .chain(fixed_codes()),
            )
        })
        .collect();
    if alleles.len() < 2 {
        alleles.push(assemble(fixed_codes()));
    }
    Ok(alleles)
}

/// First clique with the most vertices.
fn largest<'a>(cliques: impl Iterator<Item = &'a BitSet>) -> Option<&'a BitSet> {
    let mut best: Option<&BitSet> = None;
    for clique in cliques {
        if best.map_or(true, |b| clique.iter().count() > b.iter().count()) {
            best = Some(clique);
        }
    }
    best
}

/// Sort by position, keeping the smallest code where two share a position.
fn assemble<M: MutationCode>(codes: impl Iterator<Item = M>) -> Vec<M> {
    let mut codes: Vec<M> = codes.collect();
    codes.sort_unstable_by_key(|m| (m.position(), *m));
    codes.dedup();
    let before = codes.len();
    codes.dedup_by_key(|m| m.position());
    if codes.len() < before {
        warn!(
            "{} mutations dropped from an allele because another mutation has the same position",
            before - codes.len()
        );
    }
    codes
}
