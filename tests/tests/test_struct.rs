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
mod test_helpers;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};

use chrono::{NaiveDate, TimeDelta, TimeZone, Utc};
use test_helpers::{binary_roundtrip, test_roundtrip};
use uuid::Uuid;
use weave_core::{DataFormat, Version, Weave};
use weave_derive::Serializable;

#[derive(Serializable, Debug, PartialEq, Clone)]
struct Address {
    street: String,
    city: String,
    zip: Option<u32>,
}

#[derive(Serializable, Debug, PartialEq)]
struct Person {
    name: String,
    age: i32,
    height: f64,
    active: bool,
    address: Address,
    tags: Vec<String>,
    scores: BTreeMap<String, i64>,
    nick: Option<String>,
    id: Uuid,
    born: NaiveDate,
}

fn person() -> Person {
    Person {
        name: "Ada".to_string(),
        age: 36,
        height: 1.68,
        active: true,
        address: Address {
            street: "12 St James's Square".to_string(),
            city: "London".to_string(),
            zip: None,
        },
        tags: vec!["math".to_string(), "engines".to_string()],
        scores: BTreeMap::from([("analysis".to_string(), 10), ("poetry".to_string(), -2)]),
        nick: Some("Enchantress".to_string()),
        id: Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0),
        born: NaiveDate::from_ymd_opt(1815, 12, 10).unwrap(),
    }
}

#[derive(Serializable, Debug, PartialEq)]
struct Meters(f64, i8);

#[derive(Serializable, Debug, PartialEq)]
struct Marker;

#[derive(Serializable, Debug, PartialEq, Clone, Copy)]
enum Color {
    Red,
    Green = 5,
    Blue,
}

#[derive(Serializable, Debug, PartialEq)]
enum Figure {
    Circle { radius: f64 },
    Rect(f64, f64),
    Empty,
}

#[derive(Serializable, Debug, PartialEq)]
struct Pair<A, B> {
    first: A,
    second: B,
}

#[test]
fn derived_struct_roundtrip() {
    test_roundtrip(&Weave::default(), person());
}

#[test]
fn tuple_and_unit_structs() {
    let weave = Weave::default();
    test_roundtrip(&weave, Meters(3.5, -4));
    test_roundtrip(&weave, Marker);
}

#[test]
fn fieldless_enums_are_inline_discriminants() {
    let weave = Weave::default();
    test_roundtrip(&weave, Color::Blue);
    test_roundtrip(&weave, vec![Color::Red, Color::Green, Color::Blue]);
    let json = weave.serialize_json(&vec![Color::Green]).unwrap();
    assert!(json.contains('5'), "{json}");
}

#[test]
fn enums_with_data() {
    let weave = Weave::default();
    test_roundtrip(&weave, Figure::Circle { radius: 2.0 });
    test_roundtrip(&weave, Figure::Rect(3.0, 4.5));
    test_roundtrip(&weave, Figure::Empty);
    test_roundtrip(
        &weave,
        vec![Figure::Empty, Figure::Rect(1.0, 1.0), Figure::Circle { radius: 0.5 }],
    );
}

#[test]
fn generic_structs() {
    let weave = Weave::default();
    test_roundtrip(
        &weave,
        Pair {
            first: 7i32,
            second: Address {
                street: "Main".to_string(),
                city: "Springfield".to_string(),
                zip: Some(12345),
            },
        },
    );
    let name = weave.get_binder().name_of::<Pair<i32, Address>>();
    assert_eq!(&*name, "Pair[i32,Address], test_struct");
}

#[test]
fn std_collections() {
    let weave = Weave::default();
    test_roundtrip(&weave, vec![1i32, -2, 3]);
    test_roundtrip(&weave, VecDeque::from([1u8, 2, 3]));
    test_roundtrip(&weave, LinkedList::from(["a".to_string(), "b".to_string()]));
    test_roundtrip(&weave, HashSet::from([10u64, 20, 30]));
    test_roundtrip(&weave, BTreeSet::from(['x', 'y']));
    test_roundtrip(
        &weave,
        HashMap::from([(1i32, vec!["one".to_string()]), (2, vec![])]),
    );
    test_roundtrip(&weave, (1i16, "two".to_string(), 3.0f32));
    test_roundtrip(&weave, vec![Some(1i64), None, Some(3)]);
    test_roundtrip(&weave, Vec::<String>::new());
}

#[test]
fn primitive_arrays() {
    let weave = Weave::default();
    let values: Box<[i32]> = vec![1, 2, 3, i32::MAX, i32::MIN].into_boxed_slice();
    test_roundtrip(&weave, values);
    let floats: Box<[f64]> = vec![0.5, -1.25, 1e10].into_boxed_slice();
    test_roundtrip(&weave, floats);
    let words: Box<[String]> = vec!["a".to_string(), "b".to_string()].into_boxed_slice();
    test_roundtrip(&weave, words);
}

#[test]
fn temporal_and_version_values() {
    let weave = Weave::default();
    test_roundtrip(&weave, Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 7).unwrap());
    test_roundtrip(
        &weave,
        NaiveDate::from_ymd_opt(2001, 9, 9)
            .unwrap()
            .and_hms_micro_opt(1, 46, 40, 123_456)
            .unwrap(),
    );
    test_roundtrip(&weave, TimeDelta::seconds(90));
    test_roundtrip(&weave, Version::new(1, 2));
    test_roundtrip(&weave, Version::new(4, 0).with_build(7).with_revision(9));
}

#[test]
fn output_is_deterministic() {
    let weave = Weave::default();
    let value = person();
    let first = weave.serialize(&value, DataFormat::Binary).unwrap();
    let second = weave.serialize(&value, DataFormat::Binary).unwrap();
    assert_eq!(first, second);

    let back: Person = binary_roundtrip(&weave, &value);
    let third = weave.serialize(&back, DataFormat::Binary).unwrap();
    assert_eq!(first, third);
}

#[test]
fn json_document_names_members() {
    let weave = Weave::default();
    let json = weave.serialize_json(&person()).unwrap();
    assert!(json.contains("\"$type\":\"Person, test_struct\""), "{json}");
    assert!(json.contains("\"name\":\"Ada\""), "{json}");
    assert!(json.contains("\"city\":\"London\""), "{json}");
}
