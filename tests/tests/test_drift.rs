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
use weave_core::{DataFormat, DiagnosticLevel, Report, Weave};
use weave_derive::Serializable;

mod v1 {
    use super::*;

    #[derive(Serializable, Debug)]
    pub struct Item {
        pub id: i32,
        pub title: String,
        pub legacy: String,
    }

    #[derive(Serializable, Debug)]
    pub struct Counter {
        pub label: String,
        pub count: String,
        pub big: i64,
    }

    #[derive(Serializable, Debug)]
    pub enum Event {
        Started { at: i64 },
        Gone,
    }
}

mod v2 {
    use super::*;

    #[derive(Serializable, Debug, PartialEq)]
    #[weave(previously = "v1::Item")]
    pub struct Item {
        pub id: i32,
        #[weave(previously = "title")]
        pub name: String,
        pub added: Option<u8>,
    }

    #[derive(Serializable, Debug, PartialEq)]
    #[weave(previously = "v1::Counter")]
    pub struct Counter {
        pub label: String,
        pub count: i32,
        pub big: i8,
    }

    #[derive(Serializable, Debug, PartialEq)]
    #[weave(previously = "v1::Event")]
    pub enum Event {
        #[weave(previously = "Started")]
        Begun { at: i64 },
        Stopped,
    }
}

#[derive(Serializable, Debug, PartialEq)]
struct Leaf {
    value: i32,
}

#[derive(Serializable, Debug, PartialEq)]
struct Other {
    value: i32,
}

fn convert<A: weave_core::Serializable, B: weave_core::Serializable>(value: &A) -> Report<B> {
    let weave = Weave::default();
    let bytes = weave.serialize(value, DataFormat::Binary).unwrap();
    weave.deserialize_with_report(&bytes, DataFormat::Binary).unwrap()
}

#[test]
fn renamed_types_and_members_are_found() {
    let old = v1::Item {
        id: 4,
        title: "lamp".to_string(),
        legacy: "dropped".to_string(),
    };
    let report: Report<v2::Item> = convert(&old);
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    assert_eq!(
        report.value,
        v2::Item {
            id: 4,
            name: "lamp".to_string(),
            added: None,
        }
    );
}

#[test]
fn one_bad_member_costs_one_diagnostic() {
    let old = v1::Counter {
        label: "visits".to_string(),
        count: "many".to_string(),
        big: 7,
    };
    let report: Report<v2::Counter> = convert(&old);
    assert_eq!(report.diagnostics.len(), 1, "{:?}", report.diagnostics);
    assert_eq!(report.diagnostics[0].level, DiagnosticLevel::Warning);
    assert_eq!(
        report.value,
        v2::Counter {
            label: "visits".to_string(),
            count: 0,
            big: 7,
        }
    );
}

#[test]
fn out_of_range_integers_fall_back_to_default() {
    let old = v1::Counter {
        label: "x".to_string(),
        count: "1".to_string(),
        big: 1_000,
    };
    let report: Report<v2::Counter> = convert(&old);
    // `count` holds a string and `big` does not fit an i8.
    assert_eq!(report.warnings().count(), 2, "{:?}", report.diagnostics);
    assert_eq!(report.value.big, 0);
    assert_eq!(report.value.label, "x");
}

#[test]
fn renamed_and_unknown_variants() {
    let report: Report<v2::Event> = convert(&v1::Event::Started { at: 99 });
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    assert_eq!(report.value, v2::Event::Begun { at: 99 });

    let report: Report<v2::Event> = convert(&v1::Event::Gone);
    assert_eq!(report.warnings().count(), 1, "{:?}", report.diagnostics);
    assert_eq!(report.value, v2::Event::Begun { at: 0 });
}

#[test]
fn node_of_another_type_reads_as_default() {
    let report: Report<Other> = convert(&Leaf { value: 5 });
    assert_eq!(report.warnings().count(), 1, "{:?}", report.diagnostics);
    assert_eq!(report.value, Other { value: 0 });
}

#[test]
fn unknown_type_names_are_read_as_the_expected_type() {
    let weave = Weave::default();
    let mut nodes = weave.serialize_nodes(&Leaf { value: 12 }).unwrap();
    nodes[0].data = nodes[0].data.replace("Leaf, test_drift", "Ghost, nowhere");
    let report = weave.deserialize_nodes::<Leaf>(&nodes).unwrap();
    assert_eq!(report.value, Leaf { value: 12 });
    assert_eq!(report.warnings().count(), 1, "{:?}", report.diagnostics);
}

#[test]
fn missing_entries_read_as_defaults() {
    let weave = Weave::default();
    let report = weave
        .deserialize_with_report::<Vec<Leaf>>(&[], DataFormat::Binary)
        .unwrap();
    assert!(report.value.is_empty());
    assert_eq!(report.warnings().count(), 1, "{:?}", report.diagnostics);

    let json = r#"{"$type":"Leaf, test_drift"}"#;
    let leaf: Leaf = weave.deserialize_json(json).unwrap();
    assert_eq!(leaf, Leaf { value: 0 });
}

#[test]
fn reordered_and_duplicated_members() {
    let weave = Weave::default();
    let json = r#"{"$type":"v2::Item, test_drift","added":3,"name":"fan","id":8,"extra":[1,2]}"#;
    let report = weave
        .deserialize_with_report::<v2::Item>(json.as_bytes(), DataFormat::Json)
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    assert_eq!(
        report.value,
        v2::Item {
            id: 8,
            name: "fan".to_string(),
            added: Some(3),
        }
    );
}
