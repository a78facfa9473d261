//! External shuffle of a record stream under a memory ceiling.
//!
//! Records are read into chunks of `array_size`, each chunk is shuffled and
//! spilled to `<temp_file>_NNNN.bin`. The temp files are then merged by sweeping
//! over them, taking about `array_size / N` records from each, shuffling what a
//! sweep collected and emitting it. The merge only approximates a uniform shuffle
//! of the whole stream, in exchange memory stays bounded by `array_size`.
//!
//! A failed shuffle leaves its temp files on disk.

// imports
use crate::error::{PreprocessError, Result};
use crate::random::RandomSource;
use crate::record::{Record, RecordReader, RECORD_SIZE};

use log::{debug, error, info};
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};


pub const DEFAULT_TEMP_FILE: &str = "temp_shuffle";
pub const DEFAULT_MEMORY: f64 = 4.0;

/// Number of records that fit in 95% of `memory` gigabytes.
pub fn array_size_for_memory(memory: f64) -> usize {
    const ONE_GB: f64 = 1_073_741_824.0;
    ((0.95 * memory * ONE_GB / RECORD_SIZE as f64) as usize).max(1)
}

pub fn temp_file_name(temp_file: &str, index: usize) -> PathBuf {
    PathBuf::from(format!("{}_{:04}.bin", temp_file, index))
}

// name the file behind an anonymous stream error
fn at_path(err: PreprocessError, path: &Path) -> PreprocessError {
    match err {
        PreprocessError::Stream(e) => PreprocessError::io(path, e),
        other => other
    }
}


#[derive(Clone, Debug)]
pub struct ShuffleConfig {
    pub verbose: u8,
    pub array_size: usize,
    pub temp_file: String,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            array_size: array_size_for_memory(DEFAULT_MEMORY),
            temp_file: DEFAULT_TEMP_FILE.to_string()
        }
    }
}

impl Display for ShuffleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "shuffle parameters:
        array_size: {},
        temp_file: {}",
        self.array_size, self.temp_file
        )
    }
}


pub struct ChunkShuffler<'a> {
    config: ShuffleConfig,
    rng: &'a mut RandomSource,
}

impl<'a> ChunkShuffler<'a> {

    pub fn new(config: ShuffleConfig, rng: &'a mut RandomSource) -> ChunkShuffler<'a> {
        Self { config, rng }
    }

    /// Spills `records` to shuffled temp files and returns the merge over them.
    ///
    /// The returned iterator yields every input record exactly once and deletes
    /// each temp file once it has been drained.
    pub fn shuffle<I>(mut self, records: I) -> Result<MergedRecords<'a>>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let num_files = self.write_chunks(records)?;
        MergedRecords::open(&self.config, self.rng, num_files)
    }

    /// Shuffles a raw record stream into `writer`, returns the number of records written.
    pub fn shuffle_stream<R: Read, W: Write>(self, reader: R, writer: &mut W) -> Result<u64> {

        let mut written = 0;
        for record in self.shuffle(RecordReader::new(reader))? {
            record?.write_to(writer)?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }

    fn write_chunks<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let array_size = self.config.array_size.max(1);
        let verbose = self.config.verbose;

        if verbose > 0 {
            info!("SHUFFLING COOCCURRENCES");
            info!("array size: {}", array_size);
        }

        let mut array: Vec<Record> = Vec::with_capacity(array_size);
        let mut num_files = 0;
        let mut total: u64 = 0;

        for record in records {
            array.push(record?);
            if array.len() >= array_size {
                total += array.len() as u64;
                self.save_chunk(&mut array, num_files)?;
                num_files += 1;
                if verbose > 1 {
                    debug!("Shuffling by chunks: processed {} lines.", total);
                }
            }
        }

        // last chunk may be smaller than array_size
        if !array.is_empty() {
            total += array.len() as u64;
            self.save_chunk(&mut array, num_files)?;
            num_files += 1;
        }

        if verbose > 1 {
            debug!("Shuffling by chunks: processed {} lines.", total);
            debug!("Wrote {} temporary file(s).", num_files);
        }
        Ok(num_files)
    }

    fn save_chunk(&mut self, array: &mut Vec<Record>, index: usize) -> Result<()> {

        self.rng.shuffle(array);

        let path = temp_file_name(&self.config.temp_file, index);
        let file = match File::create(&path) {
            Ok(file) => file,
            Err(e) => {
                error!("Unable to open file {}.", path.display());
                return Err(PreprocessError::io(path, e))
            }
        };

        let mut writer = BufWriter::new(file);
        Record::write_all(&mut writer, array).map_err(|e| at_path(e, &path))?;
        writer.flush().map_err(|e| PreprocessError::io(&path, e))?;

        array.clear();
        Ok(())
    }

}


/// Lazy merge over the shuffled temp files.
pub struct MergedRecords<'a> {
    rng: &'a mut RandomSource,
    verbose: u8,
    readers: Vec<Option<(PathBuf, BufReader<File>)>>,
    per_file: usize,
    // a single temp file is already a full permutation of its records
    shuffle_sweeps: bool,
    buffer: Vec<Record>,
    pos: usize,
    total: u64,
    done: bool,
}

impl<'a> MergedRecords<'a> {

    fn open(config: &ShuffleConfig, rng: &'a mut RandomSource, num_files: usize) -> Result<MergedRecords<'a>> {

        let mut readers = Vec::with_capacity(num_files);
        for i in 0..num_files {
            let path = temp_file_name(&config.temp_file, i);
            match File::open(&path) {
                Ok(f) => readers.push(Some((path, BufReader::new(f)))),
                Err(e) => {
                    error!("Unable to open file {}.", path.display());
                    return Err(PreprocessError::io(path, e))
                }
            }
        }

        // more files than buffer slots would give a zero quota, every file gives at least one record
        let array_size = config.array_size.max(1);
        let per_file = if num_files > 0 { (array_size / num_files).max(1) } else { array_size };

        if config.verbose > 0 && num_files > 0 {
            info!("Merging {} temp file(s), {} records per file per sweep.", num_files, per_file);
        }

        Ok(Self {
            rng: rng,
            verbose: config.verbose,
            readers: readers,
            per_file: per_file,
            shuffle_sweeps: num_files > 1,
            buffer: Vec::with_capacity(array_size.min(per_file * num_files.max(1))),
            pos: 0,
            total: 0,
            done: num_files == 0
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    // one round over every open file, returns the number of records collected
    fn sweep(&mut self) -> Result<usize> {

        self.buffer.clear();
        self.pos = 0;
        let per_file = self.per_file;

        for slot in self.readers.iter_mut() {

            let exhausted = match slot {
                None => continue,
                Some((path, reader)) => {
                    let path: &Path = path.as_path();
                    let mut exhausted = false;
                    for _ in 0..per_file {
                        match Record::read_from(reader).map_err(|e| at_path(e, path))? {
                            Some(record) => self.buffer.push(record),
                            None => {
                                exhausted = true;
                                break;
                            }
                        }
                    }
                    exhausted
                }
            };

            if exhausted {
                if let Some((path, reader)) = slot.take() {
                    drop(reader);
                    fs::remove_file(&path).map_err(|e| PreprocessError::io(&path, e))?;
                }
            }
        }

        if self.shuffle_sweeps {
            self.rng.shuffle(&mut self.buffer);
        }
        self.total += self.buffer.len() as u64;
        if self.verbose > 1 && !self.buffer.is_empty() {
            debug!("Merging temp files: processed {} lines.", self.total);
        }
        Ok(self.buffer.len())
    }

}

impl<'a> Iterator for MergedRecords<'a> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {

        if self.pos == self.buffer.len() {
            if self.done {
                return None
            }
            match self.sweep() {
                Ok(0) => {
                    self.done = true;
                    if self.verbose > 0 {
                        info!("Merging temp files: processed {} lines.", self.total);
                    }
                    return None
                },
                Ok(_) => {},
                Err(e) => {
                    self.done = true;
                    self.buffer.clear();
                    self.pos = 0;
                    return Some(Err(e))
                }
            }
        }

        let record = self.buffer[self.pos];
        self.pos += 1;
        Some(Ok(record))
    }
}
