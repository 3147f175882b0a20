//! Error taxonomy.
//!
//! - [`ParseError`]: malformed JSON. Fatal, no partial tree.
//! - [`Error::SchemaConflict`]: two observations of one slot have kinds with
//!   no canonical join (only raised under [`ConflictPolicy::Strict`]).
//! - [`Error::InvariantViolation`]: same-named schemas that disagree on kind.
//!
//! [`ConflictPolicy::Strict`]: crate::config::ConflictPolicy::Strict
use thiserror::Error;

use crate::ident::Identifier;
use crate::schema::{Kind, SchemaPath};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("schema conflict at `{path}`: cannot unify {left} with {right}")]
    SchemaConflict { path: SchemaPath, left: Kind, right: Kind },

    #[error("invariant violated at `{path}`: {message}")]
    InvariantViolation { path: SchemaPath, message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Prefix the schema path of a unification error with an enclosing
    /// segment. Errors without a path pass through unchanged.
    pub(crate) fn within(mut self, segment: &Identifier) -> Self {
        match &mut self {
            Error::SchemaConflict { path, .. } | Error::InvariantViolation { path, .. } => {
                path.push_front(segment.clone());
            }
            _ => {}
        }
        self
    }

    /// Prefix with a whole path (outermost segment first).
    pub(crate) fn within_path(self, prefix: &SchemaPath) -> Self {
        prefix.iter().rev().fold(self, |err, seg| err.within(seg))
    }

    pub fn path(&self) -> Option<&SchemaPath> {
        match self {
            Error::SchemaConflict { path, .. } | Error::InvariantViolation { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Malformed input. `offset` is a byte offset into the parsed text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at byte {offset}")]
pub struct ParseError {
    pub offset: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(offset: usize, kind: ParseErrorKind) -> Self {
        Self { offset, kind }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),
    #[error("expected {0:?}")]
    Expected(&'static str),
    #[error("expected digits")]
    ExpectedDigits,
    #[error("unclosed string")]
    UnclosedString,
    #[error("expected ',' or '{0}'")]
    MissingSeparator(char),
    #[error("expected ':' after member name")]
    MissingColon,
    #[error("trailing characters after top-level value")]
    TrailingCharacters,
    #[error("nesting deeper than {0} levels")]
    DepthLimitExceeded(usize),
}
