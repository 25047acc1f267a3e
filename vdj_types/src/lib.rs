//! vdj_types
// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! make_enum {
    (
        name: $name:ident,
        variants:[$( ($field:ident, $lit: literal) ,)*],
        const_var_name: $const_var_name:ident,
    ) => {
        pub const $const_var_name: &[&str] = &[
            $($lit,)*
        ];

        #[derive(
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            Hash,
        )]
        pub enum $name {
            $(
                #[serde(rename = $lit)]
                $field,
            )*
        }

        impl $name {
            pub fn all() -> Vec<Self> {
                vec![$($name::$field,)*]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
                let s: &'static str = (*self).into();
                f.write_str(s)
            }
        }

        impl From<$name> for &'static str {
            fn from(src: $name) -> &'static str {
                match src {
                    $(
                        $name::$field => $lit,
                    )*
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(
                        $lit => Ok($name::$field),
                    )*
                    unknown => Err(format!(
                        "Unknown variant '{}' for {}. Supported variants are: [{}]",
                        unknown,
                        stringify!($name),
                        $const_var_name.join(", ")
                    )),
                }
            }
        }
    };
}

make_enum! {
    name: GeneType,
    variants: [
        (V, "Variable"),
        (D, "Diversity"),
        (J, "Joining"),
        (C, "Constant"),
    ],
    const_var_name: GENE_TYPES,
}

impl GeneType {
    /// The gene types whose germline alleles are inferred from clonotype mutations.
    pub const SEARCHABLE: [GeneType; 2] = [GeneType::V, GeneType::J];

    /// The gene on the other side of the CDR3: V for J and J for V.
    /// D and C segments have no complementary gene.
    pub fn complementary(self) -> Option<GeneType> {
        match self {
            GeneType::V => Some(GeneType::J),
            GeneType::J => Some(GeneType::V),
            GeneType::D | GeneType::C => None,
        }
    }
}

/// Stable identity of a germline reference gene, e.g. `IGHV3-23*01`.
///
/// Ordering is plain string ordering of the name, which is the order clonotypes
/// are grouped by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneId(String);

impl GeneId {
    pub fn new(name: impl Into<String>) -> Self {
        GeneId(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GeneId {
    fn from(name: &str) -> Self {
        GeneId(name.to_string())
    }
}

impl From<String> for GeneId {
    fn from(name: String) -> Self {
        GeneId(name)
    }
}

impl Borrow<str> for GeneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
