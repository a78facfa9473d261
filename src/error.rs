//! Error types shared by the vocabulary and shuffle stages.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    /// The reserved `<unk>` token appeared in the corpus
    #[error("<unk> token found in corpus at token {position}, please remove <unk>s from your corpus (e.g. sed -e 's/<unk>/<raw_unk>/g')")]
    ReservedToken { position: u64 },

    /// I/O error with file context
    #[error("I/O error for {path}: {err}")]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// I/O error on an unnamed stream (stdin, stdout, caller supplied readers)
    #[error("stream error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("record codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Record stream ended in the middle of a record
    #[error("record stream ends with {trailing} trailing bytes")]
    TruncatedRecord { trailing: usize },

    #[error("malformed vocabulary line {line}: {content:?}")]
    MalformedVocab { line: usize, content: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PreprocessError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        PreprocessError::Io { path: path.into(), err }
    }
}

pub type Result<T> = std::result::Result<T, PreprocessError>;
