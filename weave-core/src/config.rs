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

use std::fmt;
use std::sync::Arc;

use crate::debug::{DiagnosticSink, ErrorHandlingPolicy, LogSink, LoggingPolicy};
use crate::policy::{Policies, PolicyRef};

/// Configuration for weave sessions.
///
/// Shared between the [`Weave`](crate::weave::Weave) instance and the
/// contexts it hands out, so every session of one instance behaves the same.
#[derive(Clone)]
pub struct Config {
    /// Decides which members of a type are written.
    pub policy: PolicyRef,
    /// Whether recoverable problems escalate into an abort.
    pub error_handling: ErrorHandlingPolicy,
    /// Which diagnostics reach the sink.
    pub logging: LoggingPolicy,
    /// Where diagnostics go.
    pub sink: Arc<dyn DiagnosticSink>,
    /// Whether the locator may build precompiled member codecs. When off,
    /// member-based types always use the reflection codec.
    pub emit_codecs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            policy: Policies::everything(),
            error_handling: ErrorHandlingPolicy::Resilient,
            logging: LoggingPolicy::LogErrors,
            sink: Arc::new(LogSink),
            emit_codecs: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn policy(&self) -> &PolicyRef {
        &self.policy
    }

    #[inline(always)]
    pub fn error_handling(&self) -> ErrorHandlingPolicy {
        self.error_handling
    }

    #[inline(always)]
    pub fn logging(&self) -> LoggingPolicy {
        self.logging
    }

    #[inline(always)]
    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    #[inline(always)]
    pub fn is_emit_codecs(&self) -> bool {
        self.emit_codecs
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("policy", &self.policy.id())
            .field("error_handling", &self.error_handling)
            .field("logging", &self.logging)
            .field("emit_codecs", &self.emit_codecs)
            .finish_non_exhaustive()
    }
}
