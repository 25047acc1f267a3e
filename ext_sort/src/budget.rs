// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

/// Cap on the serialized size of the items an `ExtSorter` holds in memory.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryBudget {
    bytes: u64,
}

impl MemoryBudget {
    /// Budget used unless the process may address a lot of memory: 256 MB.
    pub const FLOOR: u64 = 1 << 28;

    /// Above this much addressable memory (10 GB) the budget is a quarter of it.
    pub const LARGE_MEMORY: u64 = 10_000_000_000;

    /// Budget for a process that may address at most `max_memory` bytes.
    pub fn for_max_memory(max_memory: u64) -> Self {
        let bytes = if max_memory > Self::LARGE_MEMORY {
            max_memory / 4
        } else {
            Self::FLOOR
        };
        MemoryBudget { bytes }
    }

    /// An explicit budget.
    pub fn from_bytes(bytes: u64) -> Self {
        MemoryBudget { bytes }
    }

    /// The budget in bytes.
    pub fn bytes(self) -> u64 {
        self.bytes
    }

    /// Share of this budget for each of `ways` sorters running at the same time.
    pub fn split(self, ways: u64) -> Self {
        MemoryBudget {
            bytes: self.bytes / ways.max(1),
        }
    }
}

impl Default for MemoryBudget {
    fn default() -> Self {
        MemoryBudget { bytes: Self::FLOOR }
    }
}
