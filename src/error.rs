/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The error type shared by all streams and codes of this crate.

use thiserror::Error;

/// Errors raised by bit streams, codes and record streams.
///
/// All errors are raised at the point of detection; nothing in this crate
/// retries.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input to a function (e.g., a negative integer passed to a
    /// code for natural numbers, or a zero block length).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A method was called in a state that forbids it.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// On-disk data is inconsistent (bad check code, broken block chain,
    /// malformed header or code word).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A seek target outside the valid range of the stream.
    #[error("position {position} out of range [{min}, {max}]")]
    OutOfRange { position: i128, min: u64, max: u64 },

    /// Reading past the logical end of a stream.
    #[error("end of stream")]
    EndOfStream,

    /// Propagated I/O error of the underlying byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand for results carrying an [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        match err {
            Error::Io(e) => e,
            Error::InvalidArgument(_) | Error::OutOfRange { .. } => {
                std::io::Error::new(ErrorKind::InvalidInput, err)
            }
            Error::InvalidOperation(_) => std::io::Error::new(ErrorKind::Unsupported, err),
            Error::InvalidData(_) => std::io::Error::new(ErrorKind::InvalidData, err),
            Error::EndOfStream => std::io::Error::new(ErrorKind::UnexpectedEof, err),
        }
    }
}
