//! io_utils
// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.
#![deny(missing_docs)]

// Streams of serde objects in lz4-compressed bincode files.  Each object is written
// back to back with no framing, so a reader must be told how many objects to expect.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

// ▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓
// WRITE STUFF
// ▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓

/// Writes objects of type T to a new lz4 file.
pub struct ObjWriter<T> {
    path: PathBuf,
    encoder: lz4::Encoder<BufWriter<File>>,
    written: usize,
    phantom: PhantomData<T>,
}

impl<T: Serialize> ObjWriter<T> {
    /// Create (or truncate) the file at path.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).with_context(|| path.display().to_string())?;
        let encoder = lz4::EncoderBuilder::new()
            .build(BufWriter::new(file))
            .with_context(|| path.display().to_string())?;
        Ok(ObjWriter {
            path: path.to_path_buf(),
            encoder,
            written: 0,
            phantom: PhantomData,
        })
    }

    /// Append one object.
    pub fn write(&mut self, item: &T) -> Result<()> {
        bincode::serialize_into(&mut self.encoder, item)
            .with_context(|| format!("writing object to {}", self.path.display()))?;
        self.written += 1;
        Ok(())
    }

    /// Flush the lz4 frame and return the number of objects written.
    pub fn finish(self) -> Result<usize> {
        let (mut writer, result) = self.encoder.finish();
        result.with_context(|| self.path.display().to_string())?;
        writer
            .flush()
            .with_context(|| self.path.display().to_string())?;
        Ok(self.written)
    }
}

// ▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓
// READ STUFF
// ▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓

/// Reads back the objects stored by an `ObjWriter`, one at a time.
pub struct ObjReader<T> {
    path: PathBuf,
    decoder: lz4::Decoder<BufReader<File>>,
    remaining: usize,
    phantom: PhantomData<T>,
}

impl<T: DeserializeOwned> ObjReader<T> {
    /// Open a file known to hold `count` objects.
    pub fn open(path: &Path, count: usize) -> Result<Self> {
        let file = File::open(path).with_context(|| path.display().to_string())?;
        let decoder =
            lz4::Decoder::new(BufReader::new(file)).with_context(|| path.display().to_string())?;
        Ok(ObjReader {
            path: path.to_path_buf(),
            decoder,
            remaining: count,
            phantom: PhantomData,
        })
    }

    /// Number of objects not yet read.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl<T: DeserializeOwned> Iterator for ObjReader<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(
            bincode::deserialize_from(&mut self.decoder)
                .with_context(|| format!("reading object from {}", self.path.display())),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        codes: Vec<u32>,
    }

    #[test]
    fn test_obj_stream() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("chunk.bin.lz4");
        let records: Vec<Record> = (0..1000)
            .map(|i| Record {
                name: format!("IGHV{}", i % 7),
                codes: (0..i % 5).collect(),
            })
            .collect();
        let mut writer = ObjWriter::create(&path)?;
        for r in &records {
            writer.write(r)?;
        }
        assert_eq!(writer.finish()?, records.len());

        let reader = ObjReader::<Record>::open(&path, records.len())?;
        assert_eq!(reader.size_hint(), (1000, Some(1000)));
        let back = reader.collect::<Result<Vec<_>>>()?;
        assert_eq!(back, records);
        Ok(())
    }

    #[test]
    fn test_truncated_stream_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("short.bin.lz4");
        let mut writer = ObjWriter::create(&path)?;
        writer.write(&7u64)?;
        writer.finish()?;

        let mut reader = ObjReader::<u64>::open(&path, 2)?;
        assert_eq!(reader.next().transpose()?, Some(7));
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
        Ok(())
    }
}
