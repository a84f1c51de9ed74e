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

//! Diagnostics raised while reading and writing.
//!
//! Recoverable problems (a missing entry, an unresolved type name or
//! reference, a failing member) are reported through [`DebugContext`]. It
//! forwards them to a [`DiagnosticSink`] according to the [`LoggingPolicy`],
//! records them for the caller's [`Report`], and turns them into
//! [`Error::Abort`] when the [`ErrorHandlingPolicy`] asks for a hard stop.

use std::fmt;
use std::sync::Arc;

use crate::error::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ErrorHandlingPolicy {
    /// Log and continue with a default value.
    #[default]
    Resilient,
    ThrowOnErrors,
    ThrowOnWarningsAndErrors,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoggingPolicy {
    #[default]
    LogErrors,
    LogWarningsAndErrors,
    Silent,
}

/// Host hook for diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn log_warning(&self, message: &str);

    fn log_error(&self, message: &str);

    fn log_exception(&self, error: &Error);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn log_warning(&self, message: &str) {
        log::warn!("{message}");
    }

    fn log_error(&self, message: &str) {
        log::error!("{message}");
    }

    fn log_exception(&self, error: &Error) {
        log::error!("{error}");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    Warning,
    Error,
    Exception,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.level, self.message)
    }
}

/// A deserialized value together with everything reported while reading it.
#[derive(Debug)]
pub struct Report<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Report<T> {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

pub struct DebugContext {
    sink: Arc<dyn DiagnosticSink>,
    logging: LoggingPolicy,
    error_handling: ErrorHandlingPolicy,
    diagnostics: Vec<Diagnostic>,
}

impl DebugContext {
    pub fn new(
        sink: Arc<dyn DiagnosticSink>,
        logging: LoggingPolicy,
        error_handling: ErrorHandlingPolicy,
    ) -> Self {
        DebugContext {
            sink,
            logging,
            error_handling,
            diagnostics: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn error_handling(&self) -> ErrorHandlingPolicy {
        self.error_handling
    }

    #[inline(always)]
    pub fn logging(&self) -> LoggingPolicy {
        self.logging
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Reports a recoverable problem. Returns [`Error::Abort`] under
    /// [`ErrorHandlingPolicy::ThrowOnWarningsAndErrors`].
    pub fn log_warning(&mut self, message: impl Into<String>) -> Result<(), Error> {
        let message = message.into();
        if self.logging == LoggingPolicy::LogWarningsAndErrors {
            self.sink.log_warning(&message);
        }
        let escalate = self.error_handling == ErrorHandlingPolicy::ThrowOnWarningsAndErrors;
        self.record(DiagnosticLevel::Warning, message, escalate)
    }

    /// Reports an error. Returns [`Error::Abort`] unless the policy is
    /// [`ErrorHandlingPolicy::Resilient`].
    pub fn log_error(&mut self, message: impl Into<String>) -> Result<(), Error> {
        let message = message.into();
        if self.logging != LoggingPolicy::Silent {
            self.sink.log_error(&message);
        }
        let escalate = self.error_handling != ErrorHandlingPolicy::Resilient;
        self.record(DiagnosticLevel::Error, message, escalate)
    }

    /// Reports an error caught at a containment boundary. An abort is handed
    /// straight back.
    pub fn log_exception(&mut self, error: Error) -> Result<(), Error> {
        if error.is_abort() {
            return Err(error);
        }
        if self.logging != LoggingPolicy::Silent {
            self.sink.log_exception(&error);
        }
        let escalate = self.error_handling != ErrorHandlingPolicy::Resilient;
        self.record(DiagnosticLevel::Exception, error.to_string(), escalate)
    }

    fn record(
        &mut self,
        level: DiagnosticLevel,
        message: String,
        escalate: bool,
    ) -> Result<(), Error> {
        if escalate {
            let abort = Error::abort(message.clone());
            self.diagnostics.push(Diagnostic { level, message });
            return Err(abort);
        }
        self.diagnostics.push(Diagnostic { level, message });
        Ok(())
    }

    pub fn reset(&mut self) {
        self.diagnostics.clear();
    }
}

impl fmt::Debug for DebugContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugContext")
            .field("logging", &self.logging)
            .field("error_handling", &self.error_handling)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<String>>);

    impl DiagnosticSink for Capture {
        fn log_warning(&self, message: &str) {
            self.0.lock().unwrap().push(format!("warn: {message}"));
        }

        fn log_error(&self, message: &str) {
            self.0.lock().unwrap().push(format!("error: {message}"));
        }

        fn log_exception(&self, error: &Error) {
            self.0.lock().unwrap().push(format!("exception: {error}"));
        }
    }

    #[test]
    fn logging_policy_gates_the_sink() {
        let sink = Arc::new(Capture::default());
        let mut cx = DebugContext::new(
            sink.clone(),
            LoggingPolicy::LogErrors,
            ErrorHandlingPolicy::Resilient,
        );
        cx.log_warning("missing member").unwrap();
        cx.log_error("bad entry").unwrap();
        assert_eq!(*sink.0.lock().unwrap(), vec!["error: bad entry".to_string()]);
        assert_eq!(cx.diagnostics().len(), 2);
    }

    #[test]
    fn error_policy_escalates() {
        let mut cx = DebugContext::new(
            Arc::new(LogSink),
            LoggingPolicy::Silent,
            ErrorHandlingPolicy::ThrowOnErrors,
        );
        assert!(cx.log_warning("drift").is_ok());
        assert!(cx.log_error("broken").unwrap_err().is_abort());

        let mut strict = DebugContext::new(
            Arc::new(LogSink),
            LoggingPolicy::Silent,
            ErrorHandlingPolicy::ThrowOnWarningsAndErrors,
        );
        assert!(strict.log_warning("drift").unwrap_err().is_abort());
    }

    #[test]
    fn abort_passes_through_exception_logging() {
        let mut cx = DebugContext::new(
            Arc::new(LogSink),
            LoggingPolicy::Silent,
            ErrorHandlingPolicy::Resilient,
        );
        assert!(cx.log_exception(Error::abort("stop")).unwrap_err().is_abort());
        assert!(cx.log_exception(Error::invalid_data("bad")).is_ok());
        assert_eq!(cx.diagnostics()[0].level, DiagnosticLevel::Exception);
    }
}
