use thiserror::Error;

use crate::model::{Mood, Tense};

/// The page could not be segmented into labeled blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no conjugation root found in page for '{verb}'")]
    MissingRoot { verb: String },
    #[error("unrecognized heading '{heading}' in page for '{verb}'")]
    UnknownHeading { verb: String, heading: String },
}

/// A tense block whose rows cannot be mapped onto the person slots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelInconsistencyError {
    #[error("'{verb}' {mood}/{tense}: unrecognized person label '{label}'")]
    UnknownPerson {
        verb: String,
        mood: Mood,
        tense: Tense,
        label: String,
    },
    #[error("'{verb}' {mood}/{tense}: {rows} unlabeled rows cannot be read positionally")]
    RowCount {
        verb: String,
        mood: Mood,
        tense: Tense,
        rows: usize,
    },
    #[error("'{verb}' {mood}/{tense}: persons {missing} missing and no impersonal exception applies")]
    IncompletePersons {
        verb: String,
        mood: Mood,
        tense: Tense,
        missing: String,
    },
}

/// Conflicting reform signals. Never fatal: the verb degrades to a single
/// non-variant record and this is logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{verb}': header declares variant '{declared}' but spelling rule derives '{derived}'")]
pub struct VariantAmbiguity {
    pub verb: String,
    pub declared: String,
    pub derived: String,
}

/// Invariant violations found while writing outputs. Fatal for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializeError {
    #[error("duplicate key '{0}'")]
    DuplicateKey(String),
    #[error("form '{form}' of '{verb}' contains reserved delimiter '{delimiter}'")]
    DelimiterCollision {
        verb: String,
        form: String,
        delimiter: char,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no dictionary entry for '{0}'")]
    NotFound(String),
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unreadable search response for '{verb}': {message}")]
    Decode { verb: String, message: String },
    #[error("gave up on '{verb}' after {attempts} attempts")]
    Exhausted {
        verb: String,
        attempts: u32,
        /// Error of the final attempt.
        last: Option<Box<FetchError>>,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-verb failure, reported in the batch summary without aborting the batch.
#[derive(Debug, Error)]
#[error("{verb}: {kind}")]
pub struct VerbError {
    pub verb: String,
    pub kind: VerbErrorKind,
}

#[derive(Debug, Error)]
pub enum VerbErrorKind {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Model(#[from] ModelInconsistencyError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl VerbErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            VerbErrorKind::Extraction(_) => "ExtractionError",
            VerbErrorKind::Model(_) => "ModelInconsistencyError",
            VerbErrorKind::Fetch(_) => "FetchError",
        }
    }
}

impl VerbError {
    pub fn new(verb: &str, kind: impl Into<VerbErrorKind>) -> Self {
        Self {
            verb: verb.to_string(),
            kind: kind.into(),
        }
    }
}
