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
use std::cell::RefCell;

use weave_core::{
    DataFormat, DeserializationContext, DiagnosticLevel, Error, SerializationContext, Weave,
};
use weave_derive::Serializable;

thread_local! {
    static WRITES: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

fn record(event: &'static str) {
    WRITES.with(|w| w.borrow_mut().push(event));
}

#[derive(Serializable, Debug, Default)]
#[weave(
    on_serializing = "before_write",
    on_serialized = "after_write",
    on_deserializing = "before_read",
    on_deserialized = "after_read",
    on_deserialization = "finished",
    substitute = "swap"
)]
struct Traced {
    value: i32,
    #[weave(skip)]
    events: Vec<&'static str>,
}

impl Traced {
    fn before_write(&self, _: &mut SerializationContext) -> Result<(), Error> {
        record("serializing");
        Ok(())
    }

    fn after_write(&self, _: &mut SerializationContext) -> Result<(), Error> {
        record("serialized");
        Ok(())
    }

    fn before_read(&mut self, _: &mut DeserializationContext) -> Result<(), Error> {
        self.events.push("deserializing");
        Ok(())
    }

    fn after_read(&mut self, _: &mut DeserializationContext) -> Result<(), Error> {
        self.events.push("deserialized");
        Ok(())
    }

    fn finished(&mut self) -> Result<(), Error> {
        self.events.push("deserialization");
        Ok(())
    }

    fn swap(mut self) -> Self {
        self.events.push("substitute");
        self
    }
}

#[test]
fn callbacks_run_in_lifecycle_order() {
    let weave = Weave::default();
    WRITES.with(|w| w.borrow_mut().clear());
    let bytes = weave
        .serialize(
            &Traced {
                value: 3,
                events: Vec::new(),
            },
            DataFormat::Binary,
        )
        .unwrap();
    WRITES.with(|w| assert_eq!(*w.borrow(), ["serializing", "serialized"]));

    let back: Traced = weave.deserialize(&bytes, DataFormat::Binary).unwrap();
    assert_eq!(back.value, 3);
    assert_eq!(
        back.events,
        ["deserializing", "substitute", "deserialized", "deserialization"]
    );
}

/// Reads every stored handle back as one shared canonical value.
#[derive(Serializable, Debug, Default, PartialEq)]
#[weave(substitute = "canonical")]
struct Handle {
    key: String,
}

impl Handle {
    fn canonical(self) -> Self {
        Handle {
            key: self.key.to_ascii_lowercase(),
        }
    }
}

#[test]
fn substitution_replaces_the_read_value() {
    let weave = Weave::default();
    let handles = vec![
        Handle {
            key: "ALPHA".to_string(),
        },
        Handle {
            key: "Beta".to_string(),
        },
    ];
    let json = weave.serialize_json(&handles).unwrap();
    let back: Vec<Handle> = weave.deserialize_json(&json).unwrap();
    assert_eq!(back[0].key, "alpha");
    assert_eq!(back[1].key, "beta");
}

#[derive(Serializable, Debug, Default)]
#[weave(on_deserialized = "check")]
struct Checked {
    value: i32,
}

impl Checked {
    fn check(&mut self, _: &mut DeserializationContext) -> Result<(), Error> {
        if self.value < 0 {
            return Err(Error::invalid_data("negative value"));
        }
        if self.value == 0 {
            return Err(Error::abort("zero is not accepted"));
        }
        Ok(())
    }
}

#[test]
fn failing_callbacks_are_contained() {
    let weave = Weave::default();
    let bytes = weave
        .serialize(&Checked { value: -4 }, DataFormat::Binary)
        .unwrap();
    let report = weave
        .deserialize_with_report::<Checked>(&bytes, DataFormat::Binary)
        .unwrap();
    assert_eq!(report.value.value, -4);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].level, DiagnosticLevel::Exception);
    assert!(report.diagnostics[0].message.contains("negative value"));
}

#[test]
fn aborts_pass_every_boundary() {
    let weave = Weave::default();
    let bytes = weave
        .serialize(&vec![Checked { value: 1 }, Checked { value: 0 }], DataFormat::Binary)
        .unwrap();
    let err = weave
        .deserialize::<Vec<Checked>>(&bytes, DataFormat::Binary)
        .err()
        .unwrap();
    assert!(err.is_abort(), "{err}");
}
