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
use std::any::{Any, TypeId};
use std::sync::Arc;

use weave_core::{
    Codec, CodecHandle, CodecResolver, DataFormat, DataReader, DataWriter,
    DeserializationContext, ErasedCodec, Error, GenericCodecFactory, Locator, PolicyRef,
    SerializationContext, Serializable, Type, TypeRegistry, Weave,
};
use weave_derive::Serializable;

#[derive(Serializable, Debug, PartialEq, Clone)]
struct Temperature {
    degrees: f64,
}

#[derive(Serializable, Debug, PartialEq, Clone)]
struct Pair<A, B> {
    first: A,
    second: B,
}

/// Writes a temperature as one string entry named after the codec.
struct Labelled(&'static str);

impl Codec<Temperature> for Labelled {
    fn write_impl(
        &self,
        value: &Temperature,
        writer: &mut dyn DataWriter,
        _context: &mut SerializationContext,
    ) -> Result<(), Error> {
        writer.write_string(Some(self.0), &format!("{}C", value.degrees));
        Ok(())
    }

    fn read_impl(
        &self,
        value: &mut Temperature,
        reader: &mut dyn DataReader,
        _context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        let text = reader
            .read_string()
            .ok_or_else(|| Error::invalid_data("expected a temperature string"))?;
        value.degrees = text
            .trim_end_matches('C')
            .parse()
            .map_err(|e| Error::invalid_data(format!("bad temperature: {e}")))?;
        Ok(())
    }
}

fn private_weave() -> Weave {
    Weave::default().locator(Arc::new(Locator::new()))
}

#[test]
fn registered_codec_replaces_the_member_codec() {
    let weave = private_weave();
    let value = Temperature { degrees: 21.5 };
    assert!(weave.serialize_json(&value).unwrap().contains("\"degrees\":"));

    weave
        .register_codec::<Temperature>(Arc::new(Labelled("celsius")), 0)
        .unwrap();
    let json = weave.serialize_json(&value).unwrap();
    assert!(json.contains("\"celsius\":\"21.5C\""), "{json}");
    let back: Temperature = weave.deserialize_json(&json).unwrap();
    assert_eq!(back, value);

    // Registrations stay with their locator.
    assert!(Weave::default()
        .serialize_json(&value)
        .unwrap()
        .contains("\"degrees\":"));
}

#[test]
fn highest_priority_wins_and_ties_are_rejected() {
    let weave = private_weave();
    weave
        .register_codec::<Temperature>(Arc::new(Labelled("low")), 1)
        .unwrap();
    weave
        .register_codec::<Temperature>(Arc::new(Labelled("high")), 7)
        .unwrap();
    let err = weave
        .register_codec::<Temperature>(Arc::new(Labelled("again")), 7)
        .err()
        .unwrap();
    assert!(matches!(err, Error::NotAllowed(_)), "{err}");

    let json = weave.serialize_json(&Temperature { degrees: 3.0 }).unwrap();
    assert!(json.contains("\"high\":"), "{json}");
}

struct TemperatureHook;

impl CodecResolver for TemperatureHook {
    fn resolve(&self, _ty: &Type, type_id: TypeId, _policy: &PolicyRef) -> Option<CodecHandle> {
        (type_id == TypeId::of::<Temperature>())
            .then(|| CodecHandle::typed::<Temperature>(Arc::new(Labelled("hooked"))))
    }
}

#[test]
fn resolver_hooks_come_first() {
    let locator = Arc::new(Locator::new());
    let weave = Weave::default().locator(locator.clone());
    assert!(Arc::ptr_eq(weave.get_locator(), &locator));
    weave
        .register_codec::<Temperature>(Arc::new(Labelled("registered")), 100)
        .unwrap();
    locator.add_resolver(Arc::new(TemperatureHook));

    let json = weave.serialize_json(&Temperature { degrees: -2.0 }).unwrap();
    assert!(json.contains("\"hooked\":"), "{json}");
    // Other types pass through the hook untouched.
    let pair = Pair {
        first: 1u8,
        second: "x".to_string(),
    };
    assert!(weave.serialize_json(&pair).unwrap().contains("\"first\":"));
}

/// Writes `Pair<i32, i32>` under short member names.
struct IntPair;

impl ErasedCodec for IntPair {
    fn serialize_any(
        &self,
        value: &dyn Any,
        writer: &mut dyn DataWriter,
        _context: &mut SerializationContext,
    ) -> Result<(), Error> {
        let pair = value
            .downcast_ref::<Pair<i32, i32>>()
            .ok_or_else(|| Error::type_error("expected Pair<i32, i32>"))?;
        writer.write_i64(Some("l"), pair.first.into());
        writer.write_i64(Some("r"), pair.second.into());
        Ok(())
    }

    fn deserialize_any(
        &self,
        reader: &mut dyn DataReader,
        _context: &mut DeserializationContext,
    ) -> Result<Box<dyn Any>, Error> {
        let first = reader.read_i64().unwrap_or_default() as i32;
        let second = reader.read_i64().unwrap_or_default() as i32;
        Ok(Box::new(Pair { first, second }))
    }
}

struct IntPairFactory;

impl GenericCodecFactory for IntPairFactory {
    fn create(&self, ty: &Type, _registry: &TypeRegistry) -> Option<Arc<dyn ErasedCodec>> {
        let ints = [i32::type_of(), i32::type_of()];
        (ty.args() == &ints[..]).then(|| Arc::new(IntPair) as Arc<dyn ErasedCodec>)
    }
}

#[test]
fn generic_factories_serve_closed_forms() {
    let weave = private_weave();
    let definition = Pair::<i32, i32>::type_of().definition().cloned().unwrap();
    weave
        .register_generic_codec(definition.clone(), Arc::new(IntPairFactory), 0)
        .unwrap();
    assert!(matches!(
        weave.register_generic_codec(definition, Arc::new(IntPairFactory), 0),
        Err(Error::NotAllowed(_))
    ));

    let ints = Pair { first: 4, second: -9 };
    let json = weave.serialize_json(&ints).unwrap();
    assert!(json.contains("\"l\":4"), "{json}");
    let back: Pair<i32, i32> = weave.deserialize_json(&json).unwrap();
    assert_eq!(back, ints);

    // The factory declines other closed forms.
    let mixed = Pair {
        first: 4,
        second: "four".to_string(),
    };
    let json = weave.serialize_json(&mixed).unwrap();
    assert!(json.contains("\"first\":4"), "{json}");
}

#[test]
fn concurrent_sessions_share_codecs() {
    let locator = Arc::new(Locator::new());
    let weave = Weave::default().locator(locator.clone());
    let value = vec![
        Pair {
            first: Temperature { degrees: 1.0 },
            second: "a".to_string(),
        };
        4
    ];
    let expected = weave.serialize(&value, DataFormat::Binary).unwrap();
    let _: Vec<Pair<Temperature, String>> =
        weave.deserialize(&expected, DataFormat::Binary).unwrap();
    let cached = locator.cached_count();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..50 {
                    let bytes = weave.serialize(&value, DataFormat::Binary).unwrap();
                    assert_eq!(bytes, expected);
                    let back: Vec<Pair<Temperature, String>> =
                        weave.deserialize(&bytes, DataFormat::Binary).unwrap();
                    assert_eq!(back, value);
                }
            });
        }
    });
    assert_eq!(locator.cached_count(), cached);
}
