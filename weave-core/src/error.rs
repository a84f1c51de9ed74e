// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Error type shared by every layer of the engine.
//!
//! Most failures met while reading data never surface as an [`Error`]: they
//! are logged through the session's diagnostic sink and a default value is
//! substituted. An `Error` travelling up the call stack is either
//!
//! - [`Error::Abort`], the abort signal, which crosses every containment
//!   boundary and ends the whole (de)serialize call, or
//! - any other variant raised by a codec or callback, which the nearest
//!   codec lifecycle catches, logs, and contains.

use std::borrow::Cow;

use thiserror::Error;

/// Set WEAVE_PANIC_ON_ERROR at compile time to panic where an error is built.
pub const PANIC_ON_ERROR: bool = option_env!("WEAVE_PANIC_ON_ERROR").is_some();

/// Error type for weave serialization and deserialization.
///
/// Always build errors through the static constructor functions
/// (`Error::invalid_data`, `Error::abort`, ...) rather than the variants.
/// With `WEAVE_PANIC_ON_ERROR=1` set at compile time every constructor
/// panics on the spot, which gives a full backtrace to the failure site:
///
/// ```bash
/// RUST_BACKTRACE=1 WEAVE_PANIC_ON_ERROR=1 cargo test
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The session's error policy demands a hard stop.
    ///
    /// Do not construct this variant directly; use [`Error::abort`] instead.
    #[error("serialization aborted: {0}")]
    Abort(Cow<'static, str>),

    /// Expected one type, found another.
    ///
    /// Do not construct this variant directly; use [`Error::type_mismatch`] instead.
    #[error("Type mismatch: expected {0}, found {1}")]
    TypeMismatch(Cow<'static, str>, Cow<'static, str>),

    /// Invalid or corrupted data encountered.
    ///
    /// Do not construct this variant directly; use [`Error::invalid_data`] instead.
    #[error("{0}")]
    InvalidData(Cow<'static, str>),

    /// General type-related error.
    ///
    /// Do not construct this variant directly; use [`Error::type_error`] instead.
    #[error("{0}")]
    TypeError(Cow<'static, str>),

    /// Error in an encoding format or conversion.
    ///
    /// Do not construct this variant directly; use [`Error::encoding_error`] instead.
    #[error("{0}")]
    EncodingError(Cow<'static, str>),

    /// Unsupported operation or feature.
    ///
    /// Do not construct this variant directly; use [`Error::unsupported`] instead.
    #[error("{0}")]
    Unsupported(Cow<'static, str>),

    /// Operation not allowed in the current context.
    ///
    /// Do not construct this variant directly; use [`Error::not_allowed`] instead.
    #[error("{0}")]
    NotAllowed(Cow<'static, str>),

    /// Generic unknown error, also the landing spot for `anyhow` errors.
    ///
    /// Do not construct this variant directly; use [`Error::unknown`] instead.
    #[error("{0}")]
    Unknown(Cow<'static, str>),
}

impl Error {
    /// Creates the abort signal.
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn abort<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::Abort(s.into());
        if PANIC_ON_ERROR {
            panic!("WEAVE_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn type_mismatch<A, B>(expected: A, found: B) -> Self
    where
        A: Into<Cow<'static, str>>,
        B: Into<Cow<'static, str>>,
    {
        let err = Error::TypeMismatch(expected.into(), found.into());
        if PANIC_ON_ERROR {
            panic!("WEAVE_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn invalid_data<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::InvalidData(s.into());
        if PANIC_ON_ERROR {
            panic!("WEAVE_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn type_error<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::TypeError(s.into());
        if PANIC_ON_ERROR {
            panic!("WEAVE_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn encoding_error<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::EncodingError(s.into());
        if PANIC_ON_ERROR {
            panic!("WEAVE_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn unsupported<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::Unsupported(s.into());
        if PANIC_ON_ERROR {
            panic!("WEAVE_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn not_allowed<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::NotAllowed(s.into());
        if PANIC_ON_ERROR {
            panic!("WEAVE_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn unknown<S: Into<Cow<'static, str>>>(s: S) -> Self {
        let err = Error::Unknown(s.into());
        if PANIC_ON_ERROR {
            panic!("WEAVE_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Whether this is the abort signal, which no containment boundary may swallow.
    #[inline(always)]
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Abort(_))
    }
}

impl From<anyhow::Error> for Error {
    #[inline(always)]
    #[cold]
    fn from(err: anyhow::Error) -> Self {
        Error::unknown(err.to_string())
    }
}

/// Returns `Err` built from the given constructor unless the condition holds.
///
/// ```
/// use weave_core::{ensure, error::Error};
///
/// fn check(len: usize) -> Result<(), Error> {
///     ensure!(len < 8, Error::invalid_data(format!("length {len} too large")));
///     Ok(())
/// }
/// assert!(check(9).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

/// Returns early with [`Error::Unknown`].
///
/// ```
/// use weave_core::{bail, error::Error};
///
/// fn parse_flag(text: &str) -> Result<bool, Error> {
///     match text {
///         "on" => Ok(true),
///         "off" => Ok(false),
///         other => bail!("unknown flag `{}`", other),
///     }
/// }
/// assert!(parse_flag("maybe").is_err());
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::error::Error::unknown($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::unknown(format!($fmt, $($arg)*)))
    };
}

/// Returns early with [`Error::NotAllowed`].
#[macro_export]
macro_rules! not_allowed {
    ($err:expr) => {
        return Err($crate::error::Error::not_allowed($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::not_allowed(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_is_recognised() {
        assert!(Error::abort("stop").is_abort());
        assert!(!Error::invalid_data("bad").is_abort());
    }

    #[test]
    fn anyhow_converts_to_unknown() {
        let err: Error = anyhow::anyhow!("boom").into();
        assert!(matches!(err, Error::Unknown(ref s) if s == "boom"));
    }
}
