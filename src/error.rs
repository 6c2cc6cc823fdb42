// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/error.rs - Error types for Altium library files.
 *  Copyright (C) 2026  Forest Crossman <cyrozap@gmail.com>
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use thiserror::Error;

/// Errors produced while reading or writing Altium library files.
#[derive(Error, Debug)]
pub enum Error {
    /// A required stream or storage is absent from the container.
    #[error("Missing stream: {0}")]
    MissingStream(String),

    /// A length header promises more bytes than are available.
    #[error("Truncated stream: needed {needed} bytes, {available} available")]
    TruncatedStream { needed: usize, available: usize },

    /// A zlib payload could not be inflated.
    #[error("Decompression failed: {0}")]
    DecompressionFailure(String),

    /// A parameter value failed a coercion that had no fallback.
    #[error("Malformed parameter {key}={value:?}")]
    MalformedParameter { key: String, value: String },

    /// Two cross-reference entries share the same library reference.
    #[error("Duplicate library reference: {0}")]
    DuplicateKey(String),

    /// A record block could not be turned into a typed record.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fatal error annotated with the phases that were active when it
    /// occurred.
    #[error("{trail}: {source}")]
    Context {
        trail: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Strips any context annotation and returns the underlying error.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// The breadcrumb trail attached to this error, if any.
    pub fn trail(&self) -> Option<&str> {
        match self {
            Error::Context { trail, .. } => Some(trail.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_display_includes_trail() {
        let err = Error::Context {
            trail: "Reading integrated library > Reading parts".to_string(),
            source: Box::new(Error::MissingStream("Version.txt".to_string())),
        };
        let text = err.to_string();
        assert!(text.starts_with("Reading integrated library > Reading parts"));
        assert!(text.contains("Version.txt"));
        assert!(matches!(err.root(), Error::MissingStream(_)));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.trail().is_none());
    }
}
