// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

use crate::mutation::{MutationCode, MutationSource, Substitution};
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use vdj_types::{GeneId, GeneType};

/// What the allele search reads from one clonotype.
///
/// Clonotypes are spilled to disk while sorting, hence the serde bounds.
pub trait Clonotype: Serialize + DeserializeOwned + Send + 'static {
    /// Mutation code reported against the germline gene.
    type Code: MutationCode;

    /// Best matching germline gene for `gene_type`, if there is a hit.
    fn gene(&self, gene_type: GeneType) -> Option<&GeneId>;

    /// Mutations against the germline gene for `gene_type`, over all alignments.
    /// May repeat a code; must yield the same codes on every call.
    fn mutations(&self, gene_type: GeneType) -> impl Iterator<Item = Self::Code> + '_;

    /// Number of reads, cells or molecules supporting the clonotype.
    fn count(&self) -> u64;

    /// CDR3 length in nucleotides.
    fn cdr3_len(&self) -> usize;

    /// True if the CDR3 has no stop codon and is in frame.
    fn is_productive(&self) -> bool;
}

/// A per-sample collection of clonotypes that can be read more than once.
pub trait ClonotypeSource: Sync {
    type Item: Clonotype;
    type Iter: Iterator<Item = Result<Self::Item>>;

    /// Start a new pass over the clonotypes.
    fn open(&self) -> Result<Self::Iter>;
}

impl<C: Clonotype + Clone + Sync> ClonotypeSource for Vec<C> {
    type Item = C;
    type Iter = std::iter::Map<std::vec::IntoIter<C>, fn(C) -> Result<C>>;

    fn open(&self) -> Result<Self::Iter> {
        Ok(self.clone().into_iter().map(Ok as fn(C) -> Result<C>))
    }
}

/// Hit of a clonotype on one germline gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneHit {
    pub gene_type: GeneType,
    pub gene: GeneId,
    /// Substitutions of each alignment against the gene.
    pub alignments: Vec<Vec<Substitution>>,
}

/// A clonotype as exported by the assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneRecord {
    pub id: u64,
    pub count: u64,
    pub hits: Vec<GeneHit>,
    pub cdr3_len: usize,
    pub cdr3_has_stop: bool,
    pub cdr3_in_frame: bool,
}

impl CloneRecord {
    /// A productive clonotype with no hits.
    pub fn new(id: u64, count: u64, cdr3_len: usize) -> Self {
        CloneRecord {
            id,
            count,
            hits: Vec::new(),
            cdr3_len,
            cdr3_has_stop: false,
            cdr3_in_frame: true,
        }
    }

    /// Add a hit with a single alignment.
    pub fn with_hit(
        mut self,
        gene_type: GeneType,
        gene: impl Into<GeneId>,
        mutations: Vec<Substitution>,
    ) -> Self {
        self.hits.push(GeneHit {
            gene_type,
            gene: gene.into(),
            alignments: vec![mutations],
        });
        self
    }

    fn hit(&self, gene_type: GeneType) -> Option<&GeneHit> {
        self.hits.iter().find(|h| h.gene_type == gene_type)
    }
}

impl Clonotype for CloneRecord {
    type Code = Substitution;

    fn gene(&self, gene_type: GeneType) -> Option<&GeneId> {
        self.hit(gene_type).map(|h| &h.gene)
    }

    fn mutations(&self, gene_type: GeneType) -> impl Iterator<Item = Substitution> + '_ {
        self.hit(gene_type)
            .into_iter()
            .flat_map(|h| h.alignments.iter().flatten().copied())
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn cdr3_len(&self) -> usize {
        self.cdr3_len
    }

    fn is_productive(&self) -> bool {
        !self.cdr3_has_stop && self.cdr3_in_frame
    }
}

/// One clonotype as handed to the allele caller: its mutations on the gene being
/// searched, plus context that does not change the result today.
pub struct CloneDescription<'a, C> {
    clonotype: &'a C,
    gene_type: GeneType,
    pub cdr3_len: usize,
    pub complementary_gene: Option<&'a GeneId>,
}

impl<'a, C: Clonotype> CloneDescription<'a, C> {
    pub fn new(clonotype: &'a C, gene_type: GeneType, complementary: GeneType) -> Self {
        CloneDescription {
            clonotype,
            gene_type,
            cdr3_len: clonotype.cdr3_len(),
            complementary_gene: clonotype.gene(complementary),
        }
    }
}

impl<C: Clonotype> MutationSource for CloneDescription<'_, C> {
    type Code = C::Code;

    fn codes(&self) -> impl Iterator<Item = C::Code> + '_ {
        self.clonotype.mutations(self.gene_type)
    }
}
