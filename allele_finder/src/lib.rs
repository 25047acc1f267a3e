//! allele_finder
// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

//! Infer the germline alleles carried by a donor from the somatic mutations of its
//! clonotypes.
//!
//! Clonotypes from every sample are sorted by their V gene (and, separately, by their J
//! gene) with a memory-bounded external sort.  Each run of clonotypes sharing a gene is
//! one cluster.  Mutations that nearly every clonotype of a cluster carries are part of
//! every allele of the gene; mutations that travel together in a large share of the
//! cluster form the maximal cliques from which at most two alleles are assembled.
//!
//! ```no_run
//! use allele_finder::{AllelesSearcher, CloneRecord, FindAllelesParameters};
//! # fn main() -> anyhow::Result<()> {
//! let params = FindAllelesParameters::load("find_alleles.toml".as_ref())?;
//! let samples: Vec<Vec<CloneRecord>> = vec![vec![], vec![]];
//! let found = AllelesSearcher::new(params, &samples)?.find_all()?;
//! for (gene_type, alleles) in &found.alleles {
//!     for allele in alleles {
//!         println!("{gene_type}\t{allele}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod allele;
pub mod caller;
mod clonotype;
pub mod cluster;
pub mod cooccurrence;
pub mod errors;
pub mod mutation;
mod parameters;
mod pipeline;
pub mod report;

pub use allele::Allele;
pub use clonotype::{CloneDescription, CloneRecord, Clonotype, ClonotypeSource, GeneHit};
pub use errors::AlleleError;
pub use ext_sort::MemoryBudget;
pub use mutation::{MutationCode, MutationSource, Nucleotide, Substitution};
pub use parameters::FindAllelesParameters;
pub use pipeline::{AllelesSearcher, FoundAlleles, GeneName};
pub use report::{FindAllelesReport, GeneTypeReport};
pub use vdj_types::{GeneId, GeneType};
