//! Fixed size cooccurrence records, the exchange format between the cooccurrence
//! counter, the shuffler and the trainer.
//!
//! A record stream is a flat concatenation of records, no header and no footer.
//! Every record is encoded with bincode's fixed width little endian layout:
//! `word1: i32`, `word2: i32`, `val: f64`, 16 bytes in total.

use crate::error::{PreprocessError, Result};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};

pub const RECORD_SIZE: usize = 16;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Record {
    pub word1: i32,
    pub word2: i32,
    pub val: f64,
}

impl Record {

    pub fn new(word1: i32, word2: i32, val: f64) -> Record {
        Self { word1, word2, val }
    }

    /// Bit exact identity of a record, usable as a hash key.
    pub fn key(&self) -> (i32, i32, u64) {
        (self.word1, self.word2, self.val.to_bits())
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        bincode::serialize_into(writer, self).map_err(|e| match *e {
            bincode::ErrorKind::Io(err) => PreprocessError::Stream(err),
            other => PreprocessError::Codec(Box::new(other))
        })
    }

    pub fn write_all<W: Write>(writer: &mut W, records: &[Record]) -> Result<()> {
        for record in records {
            record.write_to(writer)?;
        }
        Ok(())
    }

    /// Reads the next record, `None` on a clean end of stream.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Record>> {

        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;
        while filled < RECORD_SIZE {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into())
            }
        }

        match filled {
            0 => Ok(None),
            RECORD_SIZE => Ok(Some(bincode::deserialize(&buf)?)),
            trailing => Err(PreprocessError::TruncatedRecord { trailing })
        }
    }

}

/// Iterator over the records of a byte stream, stops after the first error.
pub struct RecordReader<R: Read> {
    reader: R,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, done: false }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {

        if self.done {
            return None
        }

        match Record::read_from(&mut self.reader) {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            },
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
