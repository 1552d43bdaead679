// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Crate level error type
//!
//! Wraps the package reading errors and the fatal pivot loading errors.

use crate::pivot::PivotError;
use crate::xlsx::XlsxError;

/// A struct to handle any error and a message
#[derive(Debug)]
pub enum Error {
    /// IO error
    Io(std::io::Error),

    /// xlsx specific error
    Xlsx(XlsxError),
    /// pivot specific error
    Pivot(PivotError),
    /// A pivot error raised while loading a given package part
    Part {
        /// Path of the part inside the package
        part: String,
        /// The underlying error
        error: PivotError,
    },

    /// General error message
    Msg(&'static str),
}

from_err!(std::io::Error, Error, Io);
from_err!(XlsxError, Error, Xlsx);
from_err!(PivotError, Error, Pivot);
from_err!(&'static str, Error, Msg);

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Xlsx(e) => write!(f, "Xlsx error: {e}"),
            Error::Pivot(e) => write!(f, "Pivot error: {e}"),
            Error::Part { part, error } => write!(f, "Pivot error in '{part}': {error}"),
            Error::Msg(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Xlsx(e) => Some(e),
            Error::Pivot(e) => Some(e),
            Error::Part { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl Error {
    /// The pivot error behind this error, if any
    pub fn pivot_error(&self) -> Option<&PivotError> {
        match self {
            Error::Pivot(e) | Error::Part { error: e, .. } => Some(e),
            _ => None,
        }
    }
}
