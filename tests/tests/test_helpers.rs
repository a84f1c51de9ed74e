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
#![allow(dead_code)]

use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use weave_core::{DataFormat, DiagnosticSink, Error, Report, Serializable, Weave};

/// Writes `value` in every format and checks each read gives it back cleanly.
pub fn test_roundtrip<T>(weave: &Weave, value: T)
where
    T: Serializable + PartialEq + Debug,
{
    for format in [DataFormat::Binary, DataFormat::Json] {
        let bytes = weave.serialize(&value, format).unwrap();
        let report: Report<T> = weave.deserialize_with_report(&bytes, format).unwrap();
        assert!(report.is_clean(), "{format:?}: {:?}", report.diagnostics);
        assert_eq!(report.value, value, "{format:?}");
    }
    let nodes = weave.serialize_nodes(&value).unwrap();
    let report: Report<T> = weave.deserialize_nodes(&nodes).unwrap();
    assert!(report.is_clean(), "nodes: {:?}", report.diagnostics);
    assert_eq!(report.value, value, "nodes");
}

/// Binary round trip returning the value read.
pub fn binary_roundtrip<T: Serializable>(weave: &Weave, value: &T) -> T {
    let bytes = weave.serialize(value, DataFormat::Binary).unwrap();
    weave.deserialize(&bytes, DataFormat::Binary).unwrap()
}

/// A sink remembering every message it receives.
#[derive(Default)]
pub struct CaptureSink {
    pub messages: Mutex<Vec<String>>,
}

impl CaptureSink {
    pub fn new() -> Arc<CaptureSink> {
        Arc::new(CaptureSink::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl DiagnosticSink for CaptureSink {
    fn log_warning(&self, message: &str) {
        self.messages.lock().unwrap().push(format!("warning: {message}"));
    }

    fn log_error(&self, message: &str) {
        self.messages.lock().unwrap().push(format!("error: {message}"));
    }

    fn log_exception(&self, error: &Error) {
        self.messages.lock().unwrap().push(format!("exception: {error}"));
    }
}
