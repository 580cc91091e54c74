// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! The `error` module defines the error and result types used throughout
//! the decoder.

use std::fmt;
use std::io;
use std::result;

/// An error that prevents successful decoding of the FLAC stream.
#[derive(Debug)]
pub enum Error {
    /// A problem with the underlying byte source, not a decoding error.
    IoError(io::Error),

    /// A violation of the FLAC bitstream grammar: a bad sync code, a
    /// reserved bit pattern, an out-of-range field, a mismatch between a
    /// frame header and the stream-wide parameters, or an arithmetic
    /// result that does not fit where it is required to.
    FormatError(&'static str),

    /// A header CRC-8 or frame footer CRC-16 did not match the bytes it
    /// is supposed to protect.
    CrcMismatch(&'static str),

    /// The stream ended in the middle of a structure that required more
    /// bytes to complete.
    UnexpectedEof(&'static str),

    /// The caller misused the API: reentrant access to a decoder, an
    /// undersized output buffer, or an out-of-range constructor argument.
    IllegalArgument(&'static str),

    /// The decoder is in a state that does not permit the requested
    /// operation, such as a non-byte-aligned `read_byte`.
    IllegalState(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::IoError(ref err) => write!(f, "I/O error: {}", err),
            Error::FormatError(msg) => write!(f, "invalid FLAC stream: {}", msg),
            Error::CrcMismatch(msg) => write!(f, "CRC mismatch: {}", msg),
            Error::UnexpectedEof(msg) => write!(f, "unexpected end of stream: {}", msg),
            Error::IllegalArgument(msg) => write!(f, "illegal argument: {}", msg),
            Error::IllegalState(msg) => write!(f, "illegal state: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof("underlying byte source ended early")
        } else {
            Error::IoError(err)
        }
    }
}

/// Either `T` on success, or an `Error` on failure.
pub type Result<T> = result::Result<T, Error>;

/// Builds an `Err(Error::FormatError(msg))`, for use with `return`.
pub fn fmt_err<T>(msg: &'static str) -> Result<T> {
    Err(Error::FormatError(msg))
}

/// Builds an `Err(Error::CrcMismatch(msg))`, for use with `return`.
pub fn crc_err<T>(msg: &'static str) -> Result<T> {
    Err(Error::CrcMismatch(msg))
}

/// Builds an `Err(Error::UnexpectedEof(msg))`, for use with `return`.
pub fn eof_err<T>(msg: &'static str) -> Result<T> {
    Err(Error::UnexpectedEof(msg))
}

/// Builds an `Err(Error::IllegalArgument(msg))`, for use with `return`.
pub fn arg_err<T>(msg: &'static str) -> Result<T> {
    Err(Error::IllegalArgument(msg))
}

/// Builds an `Err(Error::IllegalState(msg))`, for use with `return`.
pub fn state_err<T>(msg: &'static str) -> Result<T> {
    Err(Error::IllegalState(msg))
}
