// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

use vdj_types::GeneType;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum AlleleError {
    #[error("Cannot search for alleles in an empty cluster of clonotypes.")]
    EmptyCluster,

    #[error(
        "{gene_type} genes have no complementary gene. Alleles can only be searched for \
         Variable and Joining genes."
    )]
    NoComplementaryGene { gene_type: GeneType },

    #[error(
        "Co-occurrence matrix is not symmetric: cell ({i}, {j}) holds {upper} but \
         cell ({j}, {i}) holds {lower}."
    )]
    AsymmetricMatrix {
        i: usize,
        j: usize,
        upper: u32,
        lower: u32,
    },

    #[error("Invalid value {value} for parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}
