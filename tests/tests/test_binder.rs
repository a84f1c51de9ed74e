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
use std::collections::HashMap;

use weave_core::{DataFormat, MultiArray, Serializable, Weave};
use weave_derive::Serializable;

#[derive(Serializable, Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Serializable, Debug, PartialEq)]
struct Labeled<T> {
    label: String,
    value: T,
}

mod shapes {
    use super::*;

    #[derive(Serializable, Debug, PartialEq)]
    pub struct Circle {
        pub center: Point,
        pub radius: f64,
    }
}

fn assert_name<T: Serializable>(weave: &Weave, expected: &str) {
    let binder = weave.get_binder();
    let name = binder.name_of::<T>();
    assert_eq!(&*name, expected);
    assert_eq!(binder.bind_to_type(&name), Some(T::type_of()), "{name}");
}

#[test]
fn derived_types_are_named_after_their_module() {
    let weave = Weave::default();
    assert_name::<Point>(&weave, "Point, test_binder");
    assert_name::<shapes::Circle>(&weave, "shapes::Circle, test_binder");
    assert_name::<Labeled<Point>>(&weave, "Labeled[Point], test_binder");
    assert_name::<Labeled<i32>>(&weave, "Labeled[i32], test_binder");
    assert_name::<Vec<Point>>(&weave, "Vec[Point], test_binder");
    assert_name::<HashMap<String, Option<Point>>>(
        &weave,
        "HashMap[String,Option[Point]], test_binder",
    );
    assert_name::<Vec<i64>>(&weave, "Vec[i64]");
}

#[test]
fn array_ranks() {
    let weave = Weave::default();
    assert_name::<Box<[Point]>>(&weave, "Point[], test_binder");
    assert_name::<MultiArray<Point, 2>>(&weave, "Point[,], test_binder");
    assert_name::<Box<[Box<[Point]>]>>(&weave, "Point[][], test_binder");
    assert_name::<MultiArray<Vec<u8>, 3>>(&weave, "Vec[u8][,,]");
}

#[test]
fn renamed_types_are_read_under_their_new_name() {
    let weave = Weave::default();
    weave.add_type_rename("Legacy, test_binder", Point::type_of());
    let json = r#"{"$type":"Legacy, test_binder","x":3,"y":4}"#;
    let report = weave
        .deserialize_with_report::<Point>(json.as_bytes(), DataFormat::Json)
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    assert_eq!(report.value, Point { x: 3, y: 4 });
}

#[test]
fn moved_types_fall_back_to_their_simple_name() {
    let weave = Weave::default();
    let json = r#"{"$type":"Point, renamed_crate","x":1,"y":-1}"#;
    let report = weave
        .deserialize_with_report::<Point>(json.as_bytes(), DataFormat::Json)
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    assert_eq!(report.value, Point { x: 1, y: -1 });
}

#[test]
fn unknown_and_malformed_names() {
    let binder = Weave::default().get_binder().clone();
    assert_eq!(binder.bind_to_type("Nothing, nowhere"), None);
    assert_eq!(binder.bind_to_type("Labeled[Point"), None);
    assert_eq!(binder.bind_to_type("Labeled[Point,Point], test_binder"), None);
    assert_eq!(binder.bind_to_type("Point]"), None);
}

#[test]
fn nested_generic_values_round_trip() {
    let weave = Weave::default();
    let value = Labeled {
        label: "origin".to_string(),
        value: shapes::Circle {
            center: Point { x: 0, y: 0 },
            radius: 1.5,
        },
    };
    let json = weave.serialize_json(&value).unwrap();
    assert!(json.contains("\"$type\":\"Labeled[shapes::Circle], test_binder\""), "{json}");
    let back: Labeled<shapes::Circle> = weave.deserialize_json(&json).unwrap();
    assert_eq!(back, value);
}
