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
use std::rc::Rc;
use weave_core::{
    DataFormat, DeserializationContext, DiagnosticLevel, Error, ErrorHandlingPolicy,
    LoggingPolicy, MultiArray, Policies, Weave,
};
use weave_derive::Serializable;

mod test_helpers;
use test_helpers::CaptureSink;

#[derive(Serializable, Debug, Default, PartialEq)]
#[weave(on_deserialized = "verify")]
struct Sample {
    value: i32,
    checksum: i32,
}

impl Sample {
    fn verify(&mut self, context: &mut DeserializationContext) -> Result<(), Error> {
        if self.checksum != self.value * 2 {
            context.log_error(format!("checksum mismatch for {}", self.value))?;
        }
        Ok(())
    }
}

#[derive(Serializable, Debug, Default)]
#[weave(on_deserialized = "reject")]
struct Fragile {
    value: i32,
}

impl Fragile {
    fn reject(&mut self, _: &mut DeserializationContext) -> Result<(), Error> {
        Err(Error::invalid_data("fragile value broke"))
    }
}

#[derive(Serializable, Debug, Default)]
struct Loose {
    a: i32,
}

#[derive(Serializable, Debug, Default)]
#[weave(serializable)]
struct Outer {
    #[weave(serialize)]
    inner: Loose,
}

#[derive(Serializable, Debug, Default, PartialEq)]
struct Leaf {
    value: i32,
}

const CLEAN: &str = r#"{"$type":"Sample, test_errors","value":2,"checksum":4}"#;
const WARNING: &str = r#"{"$type":"Sample, test_errors","value":"two","checksum":0}"#;
const ERROR: &str = r#"{"$type":"Sample, test_errors","value":3,"checksum":5}"#;
const BOTH: &str = r#"{"$type":"Sample, test_errors","value":"x","checksum":1}"#;

fn read(weave: &Weave, json: &str) -> Result<weave_core::Report<Sample>, Error> {
    weave.deserialize_with_report(json.as_bytes(), DataFormat::Json)
}

#[test]
fn resilient_reads_record_everything() {
    let weave = Weave::default();
    let report = read(&weave, CLEAN).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.value, Sample { value: 2, checksum: 4 });

    let report = read(&weave, BOTH).unwrap();
    let levels: Vec<_> = report.diagnostics.iter().map(|d| d.level).collect();
    assert_eq!(levels, [DiagnosticLevel::Warning, DiagnosticLevel::Error]);
    assert_eq!(report.value, Sample { value: 0, checksum: 1 });
}

#[test]
fn throw_on_errors_lets_warnings_through() {
    let weave = Weave::default().error_handling(ErrorHandlingPolicy::ThrowOnErrors);
    let report = read(&weave, WARNING).unwrap();
    assert_eq!(report.warnings().count(), 1);

    let err = read(&weave, ERROR).err().unwrap();
    assert!(err.is_abort(), "{err}");
    assert!(err.to_string().contains("checksum mismatch for 3"), "{err}");
}

#[test]
fn throw_on_warnings_aborts_on_the_first_warning() {
    let weave = Weave::default().error_handling(ErrorHandlingPolicy::ThrowOnWarningsAndErrors);
    assert!(read(&weave, CLEAN).is_ok());
    let err = read(&weave, WARNING).err().unwrap();
    assert!(err.is_abort(), "{err}");
}

#[test]
fn contained_failures_escalate_under_throwing_policies() {
    let bytes = Weave::default()
        .serialize(&Fragile { value: 1 }, DataFormat::Binary)
        .unwrap();

    let report = Weave::default()
        .deserialize_with_report::<Fragile>(&bytes, DataFormat::Binary)
        .unwrap();
    assert_eq!(report.value.value, 1);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].level, DiagnosticLevel::Exception);

    let err = Weave::default()
        .error_handling(ErrorHandlingPolicy::ThrowOnErrors)
        .deserialize::<Fragile>(&bytes, DataFormat::Binary)
        .err()
        .unwrap();
    assert!(err.is_abort(), "{err}");
}

#[test]
fn aborts_stop_serialization_too() {
    let value = Outer {
        inner: Loose { a: 1 },
    };
    let strict = Weave::default().policy(Policies::strict());
    assert!(strict.serialize(&value, DataFormat::Binary).is_ok());

    let err = strict
        .error_handling(ErrorHandlingPolicy::ThrowOnErrors)
        .serialize(&value, DataFormat::Binary)
        .err()
        .unwrap();
    assert!(err.is_abort(), "{err}");
}

#[test]
fn logging_policy_gates_the_sink() {
    let cases = [
        (LoggingPolicy::LogErrors, vec!["error: checksum mismatch for 0"]),
        (
            LoggingPolicy::LogWarningsAndErrors,
            vec!["warning:", "error: checksum mismatch for 0"],
        ),
        (LoggingPolicy::Silent, vec![]),
    ];
    for (logging, expected) in cases {
        let sink = CaptureSink::new();
        let weave = Weave::default().logging(logging).sink(sink.clone());
        let report = read(&weave, BOTH).unwrap();
        // The report is complete whatever reaches the sink.
        assert_eq!(report.diagnostics.len(), 2);

        let messages = sink.messages();
        assert_eq!(messages.len(), expected.len(), "{logging:?}: {messages:?}");
        for (message, prefix) in messages.iter().zip(expected) {
            assert!(message.starts_with(prefix), "{logging:?}: {message}");
        }
    }
}

#[test]
fn malformed_input_fails_the_call() {
    let weave = Weave::default();
    assert!(weave.deserialize_json::<Sample>("{\"$type\": ").is_err());
    assert!(weave
        .deserialize_with_report::<Sample>(&[0xff, 0xfe], DataFormat::Json)
        .is_err());
}

#[test]
fn shared_node_without_id_aborts() {
    let json = r#"{"$type":"Leaf, test_errors","value":1}"#;
    let err = Weave::default()
        .deserialize_with_report::<Rc<Leaf>>(json.as_bytes(), DataFormat::Json)
        .err()
        .unwrap();
    assert!(err.is_abort(), "{err}");
}

#[test]
fn reference_ids_may_be_sparse() {
    let json = r#"{"$id":2000000000,"$type":"Leaf, test_errors","value":1}"#;
    let report = Weave::default()
        .deserialize_with_report::<Rc<Leaf>>(json.as_bytes(), DataFormat::Json)
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    assert_eq!(report.value.value, 1);

    // Ids beyond i32 are not truncated into a valid one.
    let json = r#"{"$id":4294967296,"$type":"Leaf, test_errors","value":1}"#;
    let err = Weave::default()
        .deserialize_with_report::<Rc<Leaf>>(json.as_bytes(), DataFormat::Json)
        .err()
        .unwrap();
    assert!(err.is_abort(), "{err}");
}

#[test]
fn array_lengths_must_match_the_elements() {
    let weave = Weave::default();
    let grid = MultiArray::<i32, 2>::new([2, 3], (0..6).collect()).unwrap();
    let json = weave.serialize_json(&grid).unwrap();
    assert!(json.contains("\"2|3\""), "{json}");

    let huge = json.replace("\"2|3\"", "\"4294967296|4294967296\"");
    let report = weave
        .deserialize_with_report::<MultiArray<i32, 2>>(huge.as_bytes(), DataFormat::Json)
        .unwrap();
    assert_eq!(report.warnings().count(), 1, "{:?}", report.diagnostics);
    assert_eq!(report.value.lengths(), &[0, 0]);
    assert!(report.value.data().is_empty());

    let short = json.replace("\"2|3\"", "\"1|2\"");
    let report = weave
        .deserialize_with_report::<MultiArray<i32, 2>>(short.as_bytes(), DataFormat::Json)
        .unwrap();
    assert_eq!(report.warnings().count(), 1, "{:?}", report.diagnostics);
    assert_eq!(report.value.lengths(), &[1, 2]);
    assert_eq!(report.value.data(), &[0, 1]);
}

#[test]
fn deep_nesting_degrades_to_a_warning() {
    // Unnamed, untyped nodes without ids, nested without end.
    let bytes = [7u8, 0, 0].repeat(100_000);
    let report = Weave::default()
        .deserialize_with_report::<Leaf>(&bytes, DataFormat::Binary)
        .unwrap();
    assert_eq!(report.value, Leaf::default());
    assert!(
        report.warnings().any(|d| d.message.contains("nests deeper")),
        "{:?}",
        report.diagnostics
    );

    let err = Weave::default()
        .error_handling(ErrorHandlingPolicy::ThrowOnWarningsAndErrors)
        .deserialize_with_report::<Leaf>(&bytes, DataFormat::Binary)
        .err()
        .unwrap();
    assert!(err.is_abort(), "{err}");
}
