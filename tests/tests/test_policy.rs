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
use weave_core::{DataFormat, Error, Policies, PolicyRef, Weave};
use weave_derive::Serializable;

#[derive(Serializable, Debug, PartialEq, Clone)]
#[weave(serializable)]
pub struct Account {
    #[weave(serialize)]
    owner: String,
    balance: i64,
    pub note: String,
    #[weave(skip)]
    pub cache: Vec<u8>,
}

#[derive(Serializable, Debug, PartialEq)]
struct Loose {
    a: i32,
}

#[derive(Serializable, Debug, PartialEq)]
#[weave(serializable)]
struct Wrapper {
    #[weave(serialize)]
    inner: Loose,
    #[weave(serialize)]
    label: String,
}

fn account() -> Account {
    Account {
        owner: "ada".to_string(),
        balance: 120,
        note: "vip".to_string(),
        cache: vec![1, 2, 3],
    }
}

fn members_written(policy: PolicyRef, emit_codecs: bool) -> Vec<&'static str> {
    let weave = Weave::default().policy(policy).emit_codecs(emit_codecs);
    let json = weave.serialize_json(&account()).unwrap();
    ["owner", "balance", "note", "cache"]
        .into_iter()
        .filter(|name| json.contains(&format!("\"{name}\":")))
        .collect()
}

#[test]
fn policies_select_members() {
    for emit_codecs in [true, false] {
        assert_eq!(
            members_written(Policies::everything(), emit_codecs),
            ["owner", "balance", "note"]
        );
        assert_eq!(members_written(Policies::strict(), emit_codecs), ["owner"]);
        assert_eq!(
            members_written(Policies::public_or_marked(), emit_codecs),
            ["owner", "note"]
        );
    }
}

#[test]
fn members_left_out_read_as_defaults() {
    let weave = Weave::default().policy(Policies::public_or_marked());
    let bytes = weave.serialize(&account(), DataFormat::Binary).unwrap();
    let report = weave
        .deserialize_with_report::<Account>(&bytes, DataFormat::Binary)
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    assert_eq!(
        report.value,
        Account {
            owner: "ada".to_string(),
            balance: 0,
            note: "vip".to_string(),
            cache: Vec::new(),
        }
    );
}

#[test]
fn skipped_members_are_never_written() {
    let weave = Weave::default();
    let back: Account = weave
        .deserialize(
            &weave.serialize(&account(), DataFormat::Binary).unwrap(),
            DataFormat::Binary,
        )
        .unwrap();
    assert_eq!(back.balance, 120);
    assert!(back.cache.is_empty());
}

#[test]
fn strict_policy_refuses_unmarked_roots() {
    let weave = Weave::default().policy(Policies::strict());
    let err = weave
        .serialize(&Loose { a: 1 }, DataFormat::Binary)
        .err()
        .unwrap();
    assert!(matches!(err, Error::NotAllowed(_)), "{err}");

    // Built-in codecs are not member based and stay available.
    let bytes = weave.serialize(&vec![1i32, 2], DataFormat::Binary).unwrap();
    let back: Vec<i32> = weave.deserialize(&bytes, DataFormat::Binary).unwrap();
    assert_eq!(back, [1, 2]);
}

#[test]
fn strict_policy_contains_unmarked_members() {
    let weave = Weave::default().policy(Policies::strict());
    let value = Wrapper {
        inner: Loose { a: 9 },
        label: "kept".to_string(),
    };
    let bytes = weave.serialize(&value, DataFormat::Binary).unwrap();
    let back: Wrapper = Weave::default()
        .deserialize(&bytes, DataFormat::Binary)
        .unwrap();
    assert_eq!(back.label, "kept");
    assert_eq!(back.inner, Loose { a: 0 });
}

#[test]
fn policies_are_found_by_id() {
    for policy in [Policies::everything(), Policies::strict(), Policies::public_or_marked()] {
        let found = Policies::by_id(policy.id()).unwrap();
        assert_eq!(found.id(), policy.id());
    }
}
