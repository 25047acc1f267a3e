//! ext_sort
// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.
#![deny(missing_docs)]

// Sort a stream of serializable items that may not fit in memory.
//
// Items are buffered until the memory budget is reached, then the buffer is sorted and
// spilled to an lz4 file in a private temporary directory.  Once the input is exhausted
// the spilled runs and the final in-memory run are merged lazily.  The temporary
// directory is removed when the sorted stream is closed, exhausted or dropped.
//
// The sort is not stable: items with equal keys come out in no particular order.

use anyhow::{Context, Result};
use io_utils::{ObjReader, ObjWriter};
use itertools::{Itertools, KMergeBy};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::mem::size_of;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

mod budget;

pub use budget::MemoryBudget;

/// Default number of runs merged at once.
pub const MAX_FAN_IN: usize = 64;

/// Defines the order used by an `ExtSorter`.
pub trait SortKey<T> {
    /// Key type; items are ordered by comparing keys.
    type Key: ?Sized + Ord + ToOwned;

    /// Extract the key of one item.
    fn sort_key<'a>(&self, item: &'a T) -> Cow<'a, Self::Key>;
}

// Read errors sort first, so a failing run stops the merge at once.
fn run_order<T, O: SortKey<T>>(order: &O, a: &Result<T>, b: &Result<T>) -> bool {
    match (a, b) {
        (Ok(a), Ok(b)) => order.sort_key(a) < order.sort_key(b),
        (Err(_), _) => true,
        (Ok(_), Err(_)) => false,
    }
}

/// Memory-bounded external sorter.  Feed it with `push` or `sort_iter`.
pub struct ExtSorter<T, O> {
    order: O,
    budget: MemoryBudget,
    temp_root: Option<PathBuf>,
    max_fan_in: usize,
    buffer: Vec<T>,
    buffered_bytes: u64,
    spill_dir: Option<TempDir>,
    chunks: Vec<(PathBuf, usize)>,
    next_chunk: usize,
    spilled: usize,
    total: usize,
}

impl<T, O> ExtSorter<T, O>
where
    T: Serialize + DeserializeOwned + 'static,
    O: SortKey<T> + 'static,
{
    /// Create a sorter that spills to the system temporary directory.
    pub fn new(order: O, budget: MemoryBudget) -> Self {
        ExtSorter {
            order,
            budget,
            temp_root: None,
            max_fan_in: MAX_FAN_IN,
            buffer: Vec::new(),
            buffered_bytes: 0,
            spill_dir: None,
            chunks: Vec::new(),
            next_chunk: 0,
            spilled: 0,
            total: 0,
        }
    }

    /// Spill into a fresh directory created under `dir` instead.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    /// Merge at most `n` runs at once (at least 2).
    ///
    /// Every open run holds a decoder buffer outside the memory budget, and a file
    /// handle.  Spilled chunks beyond the limit are merged into larger chunks first.
    pub fn with_max_fan_in(mut self, n: usize) -> Self {
        self.max_fan_in = n.max(2);
        self
    }

    /// Number of items pushed so far.
    pub fn len(&self) -> usize {
        self.total
    }

    /// True if nothing has been pushed.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Add one item, spilling the buffer first if the item would exceed the budget.
    pub fn push(&mut self, item: T) -> Result<()> {
        let bytes = bincode::serialized_size(&item)? + size_of::<T>() as u64;
        if !self.buffer.is_empty() && self.buffered_bytes + bytes > self.budget.bytes() {
            self.spill()?;
        }
        self.buffered_bytes += bytes;
        self.buffer.push(item);
        self.total += 1;
        Ok(())
    }

    /// Push every item of `items`, then `finish`.
    pub fn sort_iter<I>(mut self, items: I) -> Result<SortedIter<T>>
    where
        I: IntoIterator<Item = Result<T>>,
    {
        for item in items {
            self.push(item?)?;
        }
        self.finish()
    }

    fn sort_buffer(&mut self) {
        let order = &self.order;
        self.buffer
            .sort_unstable_by(|a, b| order.sort_key(a).cmp(&order.sort_key(b)));
    }

    fn chunk_path(&mut self) -> Result<PathBuf> {
        let dir = match self.spill_dir.take() {
            Some(dir) => dir,
            None => create_spill_dir(self.temp_root.as_deref())?,
        };
        let path = dir.path().join(format!("chunk{}.bin.lz4", self.next_chunk));
        self.next_chunk += 1;
        self.spill_dir = Some(dir);
        Ok(path)
    }

    fn spill(&mut self) -> Result<()> {
        self.sort_buffer();
        let path = self.chunk_path()?;
        let mut writer = ObjWriter::create(&path)?;
        for item in &self.buffer {
            writer.write(item)?;
        }
        let n = writer.finish()?;
        debug!(
            "spilled {} items (~{} bytes) to {}",
            n,
            self.buffered_bytes,
            path.display()
        );
        self.buffer.clear();
        self.buffered_bytes = 0;
        self.chunks.push((path, n));
        self.spilled += 1;
        Ok(())
    }

    // Merge spilled chunks until they and the in-memory run fit in one final merge.
    fn compact(&mut self) -> Result<()> {
        while self.chunks.len() >= self.max_fan_in {
            let group: Vec<_> = self.chunks.drain(..self.max_fan_in).collect();
            let path = self.chunk_path()?;
            let mut writer = ObjWriter::create(&path)?;
            let mut readers = Vec::with_capacity(group.len());
            for (chunk, n) in &group {
                readers.push(ObjReader::<T>::open(chunk, *n)?);
            }
            let order = &self.order;
            for item in readers.into_iter().kmerge_by(|a, b| run_order(order, a, b)) {
                writer.write(&item?)?;
            }
            let n = writer.finish()?;
            for (chunk, _) in &group {
                std::fs::remove_file(chunk)
                    .with_context(|| format!("removing {}", chunk.display()))?;
            }
            debug!("merged {} chunks into {}", group.len(), path.display());
            self.chunks.push((path, n));
        }
        Ok(())
    }

    /// Stop accepting input and return the items in sorted order.
    pub fn finish(mut self) -> Result<SortedIter<T>> {
        self.sort_buffer();
        self.compact()?;
        let mut runs = Vec::with_capacity(self.chunks.len() + 1);
        for (path, n) in &self.chunks {
            runs.push(Run::Disk(ObjReader::open(path, *n)?));
        }
        runs.push(Run::Memory(std::mem::take(&mut self.buffer).into_iter()));
        let order = self.order;
        let less: Less<T> = Box::new(move |a: &Result<T>, b: &Result<T>| run_order(&order, a, b));
        Ok(SortedIter {
            merged: Some(runs.into_iter().kmerge_by(less)),
            spill_dir: self.spill_dir,
            n_chunks: self.spilled,
            remaining: self.total,
        })
    }
}

fn create_spill_dir(root: Option<&Path>) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("ext_sort.");
    match root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .context("unable to create directory for sort spill files")
}

enum Run<T> {
    Disk(ObjReader<T>),
    Memory(std::vec::IntoIter<T>),
}

impl<T: DeserializeOwned> Iterator for Run<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        match self {
            Run::Disk(reader) => reader.next(),
            Run::Memory(items) => items.next().map(Ok),
        }
    }
}

type Less<T> = Box<dyn FnMut(&Result<T>, &Result<T>) -> bool>;

/// Sorted output of an `ExtSorter`.  Owns the spill files.
pub struct SortedIter<T: DeserializeOwned> {
    // None once the stream has ended.
    merged: Option<KMergeBy<Run<T>, Less<T>>>,
    spill_dir: Option<TempDir>,
    n_chunks: usize,
    remaining: usize,
}

impl<T: DeserializeOwned> SortedIter<T> {
    /// Number of runs that were spilled to disk.
    pub fn spilled_chunks(&self) -> usize {
        self.n_chunks
    }

    /// Directory holding the spill files, if any exists right now.
    pub fn spill_dir(&self) -> Option<&Path> {
        self.spill_dir.as_ref().map(TempDir::path)
    }

    /// Release the spill files.  Safe to call more than once, and after exhaustion.
    pub fn close(&mut self) -> Result<()> {
        self.merged = None;
        if let Some(dir) = self.spill_dir.take() {
            let path = dir.path().to_path_buf();
            dir.close()
                .with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}

impl<T: DeserializeOwned> Iterator for SortedIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let merged = self.merged.as_mut()?;
        match merged.next() {
            None => self.close().err().map(Err),
            Some(Err(e)) => {
                self.merged = None;
                Some(Err(e))
            }
            Some(Ok(item)) => {
                self.remaining -= 1;
                Some(Ok(item))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.merged {
            Some(_) => (self.remaining, Some(self.remaining)),
            None => (0, Some(0)),
        }
    }
}
