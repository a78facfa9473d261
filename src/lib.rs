
mod config;
mod error;
mod pipeline;
mod random;
mod record;
mod shuffle;
mod vocab;

pub use config::{files_handling, Config, JsonTypes};
pub use error::{PreprocessError, Result};
pub use pipeline::Pipeline;
pub use random::RandomSource;
pub use record::{Record, RecordReader, RECORD_SIZE};
pub use shuffle::{array_size_for_memory, temp_file_name, ChunkShuffler, MergedRecords, ShuffleConfig};
pub use vocab::{build_vocabulary, count_corpus, write_vocab, VocabConfig, VocabCounter, VocabEntry, WhitespaceTokens};
