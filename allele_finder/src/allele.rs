// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

use crate::mutation::MutationCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use vdj_types::GeneId;

/// A germline allele: a gene and its mutations relative to the reference sequence of
/// that gene.  Mutations are strictly increasing by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Allele<M> {
    gene: GeneId,
    mutations: Vec<M>,
}

impl<M: MutationCode> Allele<M> {
    /// `mutations` must be sorted by position with no repeated position, as the caller
    /// returns them.
    pub fn new(gene: GeneId, mutations: Vec<M>) -> Self {
        debug_assert!(mutations
            .windows(2)
            .all(|w| w[0].position() < w[1].position()));
        Allele { gene, mutations }
    }

    pub fn gene(&self) -> &GeneId {
        &self.gene
    }

    pub fn mutations(&self) -> &[M] {
        &self.mutations
    }

    /// True if this is the reference sequence itself.
    pub fn is_reference(&self) -> bool {
        self.mutations.is_empty()
    }

    /// `IGHV3-23-M2-1f0c...` for an allele with two mutations, or the gene name for
    /// the reference allele.
    pub fn name(&self) -> String {
        if self.is_reference() {
            self.gene.to_string()
        } else {
            format!(
                "{}-M{}-{:x}",
                self.gene,
                self.mutations.len(),
                fxhash::hash64(&self.mutations)
            )
        }
    }
}

impl<M: MutationCode + fmt::Display> fmt::Display for Allele<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if !self.is_reference() {
            write!(f, " [")?;
            for (i, m) in self.mutations.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{m}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}
