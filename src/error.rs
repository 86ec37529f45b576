//! Error taxonomy for the mapping pipeline.
//!
//! Every error here is terminal for the message or request being mapped.
//! Member-level problems (missing or unusable `fileref`) are not errors and
//! never surface through these types.
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed native envelope: {0}")]
    MalformedEnvelope(String),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("article body is not well-formed XML: {0}")]
    XmlSyntax(String),
    #[error("native attributes are not well-formed: {0}")]
    AttributesSyntax(String),
}

#[derive(Debug, Error)]
#[error("couldn't parse required field {field} as a publication date: {value:?}")]
pub struct InvalidPublicationDate {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    InvalidPublicationDate(#[from] InvalidPublicationDate),
}

/// Pipeline stage that produced a [`TransformError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    ParseBody,
    ParseAttributes,
    Assemble,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::ParseBody => "parse-body",
            Stage::ParseAttributes => "parse-attributes",
            Stage::Assemble => "assemble",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

#[derive(Debug, Error)]
#[error("mapping failed at stage {stage}: {cause}")]
pub struct TransformError {
    pub stage: Stage,
    #[source]
    pub cause: StageError,
}

impl TransformError {
    pub fn new(stage: Stage, cause: impl Into<StageError>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}
