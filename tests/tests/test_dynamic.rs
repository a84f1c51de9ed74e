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
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;
use weave_core::{
    DataFormat, DataReader, DataWriter, Delegate, DeserializationContext, DynValue, Error,
    ExternalReferenceResolver, MultiArray, ObjectData, PropertyBag, SelfFormatter,
    SerializationContext, SerializationInfo, Serializable, Type, Weave,
};
use weave_derive::Serializable;

mod test_helpers;
use test_helpers::test_roundtrip;

#[derive(Serializable, Debug, PartialEq, Clone)]
struct Point {
    x: i32,
    y: i32,
}

#[test]
fn dynamic_values_keep_their_runtime_type() {
    let weave = Weave::default();
    let values = vec![
        DynValue::new(5i32),
        DynValue::new("five".to_string()),
        DynValue::none(),
        DynValue::new(Point { x: 1, y: 2 }),
        DynValue::new(vec![7u8, 8]),
        DynValue::new(Some(2.5f64)),
    ];
    for format in [DataFormat::Binary, DataFormat::Json] {
        let bytes = weave.serialize(&values, format).unwrap();
        let report = weave
            .deserialize_with_report::<Vec<DynValue>>(&bytes, format)
            .unwrap();
        assert!(report.is_clean(), "{format:?}: {:?}", report.diagnostics);
        let back = report.value;
        assert_eq!(back.len(), values.len());
        assert_eq!(back[0].get::<i32>(), Some(&5));
        assert_eq!(back[1].get::<String>().map(String::as_str), Some("five"));
        assert!(back[2].is_none());
        assert!(back[2].as_any().is_none());
        assert!(back[3].as_any().is_some_and(|value| value.is::<Point>()));
        assert_eq!(back[3].get::<Point>(), Some(&Point { x: 1, y: 2 }));
        assert_eq!(back[4].get::<Vec<u8>>(), Some(&vec![7, 8]));
        assert_eq!(back[5].get::<Option<f64>>(), Some(&Some(2.5)));
        // A value is only reachable as its own type.
        assert!(back[0].get::<i64>().is_none());
    }
}

#[test]
fn property_bags_hold_named_dynamic_values() {
    let weave = Weave::default();
    let mut bag = PropertyBag::new();
    bag.set("count", 3i32)
        .set("label", "crate".to_string())
        .set("origin", Point { x: -1, y: 0 });
    let json = weave.serialize_json(&bag).unwrap();
    let back: PropertyBag = weave.deserialize_json(&json).unwrap();
    assert_eq!(back.get::<i32>("count"), Some(&3));
    assert_eq!(back.get::<String>("label").map(String::as_str), Some("crate"));
    assert_eq!(back.get::<Point>("origin"), Some(&Point { x: -1, y: 0 }));
    assert!(back.get::<i32>("missing").is_none());
}

#[derive(Serializable, Debug, PartialEq)]
#[weave(object_data)]
struct Envelope {
    kind: String,
    size: u32,
}

impl ObjectData for Envelope {
    fn get_object_data(&self, info: &mut SerializationInfo) {
        info.add("kind", self.kind.clone());
        info.add("bytes", self.size);
    }

    fn from_object_data(
        mut info: SerializationInfo,
        _context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        Ok(Envelope {
            kind: info.take("kind").unwrap_or_default(),
            size: info.take("bytes").unwrap_or_default(),
        })
    }
}

#[test]
fn object_data_types_choose_their_entries() {
    let weave = Weave::default();
    let value = Envelope {
        kind: "parcel".to_string(),
        size: 512,
    };
    let json = weave.serialize_json(&value).unwrap();
    assert!(json.contains("\"bytes\""), "{json}");
    assert!(!json.contains("\"size\""), "{json}");
    test_roundtrip(&weave, value);
}

#[derive(Serializable, Debug, PartialEq)]
#[weave(derived_map = "stock")]
struct Inventory {
    owner: String,
    stock: BTreeMap<String, u32>,
}

#[test]
fn derived_maps_write_members_and_entries() {
    let weave = Weave::default();
    let inventory = Inventory {
        owner: "depot".to_string(),
        stock: BTreeMap::from([("bolts".to_string(), 40), ("nuts".to_string(), 12)]),
    };
    let json = weave.serialize_json(&inventory).unwrap();
    assert!(!json.contains("\"stock\""), "{json}");
    test_roundtrip(&weave, inventory);
}

#[derive(Serializable, Debug, PartialEq)]
#[weave(self_format)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

impl SelfFormatter for Rgb {
    fn write_self(
        &self,
        writer: &mut dyn DataWriter,
        _context: &mut SerializationContext,
    ) -> Result<(), Error> {
        writer.write_string(None, &format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b));
        Ok(())
    }

    fn read_self(
        &mut self,
        reader: &mut dyn DataReader,
        _context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        let text = reader
            .read_string()
            .filter(|t| t.len() == 7 && t.starts_with('#'))
            .ok_or_else(|| Error::invalid_data("expected a #rrggbb color"))?;
        let channel = |i: usize| {
            u8::from_str_radix(&text[i..i + 2], 16)
                .map_err(|e| Error::invalid_data(format!("bad color channel: {e}")))
        };
        self.r = channel(1)?;
        self.g = channel(3)?;
        self.b = channel(5)?;
        Ok(())
    }
}

#[test]
fn self_formatted_types_write_their_own_content() {
    let weave = Weave::default();
    let color = Rgb {
        r: 255,
        g: 128,
        b: 0,
    };
    assert!(weave.serialize_json(&color).unwrap().contains("#ff8000"));
    test_roundtrip(&weave, color);
}

#[derive(Serializable, Debug)]
struct MathOps;

fn double(x: i32) -> i32 {
    x * 2
}

#[test]
fn delegates_are_written_by_address() {
    let weave = Weave::default();
    weave
        .registry()
        .register_method::<i32, i32>(MathOps::type_of(), "double", double);
    let delegate = Delegate::<i32, i32>::bind(MathOps::type_of(), "double").unwrap();
    assert_eq!(delegate.invoke(4), Some(8));

    let json = weave.serialize_json(&delegate).unwrap();
    let back: Delegate<i32, i32> = weave.deserialize_json(&json).unwrap();
    assert!(back.is_bound());
    assert_eq!(back.invoke(21), Some(42));
    assert_eq!(back.target(), delegate.target());

    let renamed = json.replace("\"double\"", "\"triple\"");
    let report = weave
        .deserialize_with_report::<Delegate<i32, i32>>(renamed.as_bytes(), DataFormat::Json)
        .unwrap();
    assert!(!report.value.is_bound());
    assert_eq!(report.value.invoke(1), None);
    assert_eq!(report.warnings().count(), 1, "{:?}", report.diagnostics);

    let unbound = Delegate::<i32, i32>::unbound();
    let back: Delegate<i32, i32> = weave
        .deserialize_json(&weave.serialize_json(&unbound).unwrap())
        .unwrap();
    assert!(!back.is_bound());
}

#[test]
fn multi_dimensional_arrays() {
    let weave = Weave::default();
    let grid = MultiArray::<i32, 2>::new([2, 3], (0..6).collect()).unwrap();
    assert_eq!(grid.get([1, 2]), Some(&5));
    assert_eq!(grid.get([2, 0]), None);
    test_roundtrip(&weave, grid);

    let cube = MultiArray::<String, 3>::new([1, 2, 1], vec!["a".into(), "b".into()]).unwrap();
    test_roundtrip(&weave, cube);

    assert!(MultiArray::<u8, 2>::new([2, 2], vec![1, 2, 3]).is_err());
}

#[test]
fn types_as_values() {
    let weave = Weave::default();
    let types: Vec<Type> = vec![
        i32::type_of(),
        Point::type_of(),
        BTreeMap::<String, Vec<Point>>::type_of(),
        <Box<[f64]>>::type_of(),
    ];
    test_roundtrip(&weave, types);
}

#[derive(Serializable, Debug, PartialEq)]
struct Settings {
    theme: String,
}

#[derive(Serializable, Debug)]
struct Document {
    title: String,
    shared: Option<Arc<Settings>>,
    local: Option<Arc<Settings>>,
}

/// Settings objects the host keeps outside every stream.
struct Catalog {
    entries: Vec<(String, Arc<Settings>)>,
}

impl ExternalReferenceResolver<String> for Catalog {
    fn can_reference(&self, value: &dyn Any) -> Option<String> {
        let shell = value.downcast_ref::<Arc<Settings>>()?;
        self.entries
            .iter()
            .find(|(_, known)| Arc::ptr_eq(known, shell))
            .map(|(key, _)| key.clone())
    }

    fn try_resolve(&self, key: &String) -> Option<Box<dyn Any>> {
        self.entries
            .iter()
            .find(|(known, _)| known == key)
            .map(|(_, settings)| Box::new(settings.clone()) as Box<dyn Any>)
    }
}

#[test]
fn external_references_resolve_through_the_host() {
    let defaults = Arc::new(Settings {
        theme: "dark".to_string(),
    });
    let catalog = Arc::new(Catalog {
        entries: vec![("defaults".to_string(), defaults.clone())],
    });
    let weave = Weave::default().string_resolver(catalog);
    let document = Document {
        title: "notes".to_string(),
        shared: Some(defaults.clone()),
        local: Some(Arc::new(Settings {
            theme: "light".to_string(),
        })),
    };

    let json = weave.serialize_json(&document).unwrap();
    assert!(json.contains("$strref:defaults"), "{json}");
    assert!(!json.contains("\"dark\""), "{json}");

    let report = weave
        .deserialize_with_report::<Document>(json.as_bytes(), DataFormat::Json)
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    let back = report.value;
    assert!(Arc::ptr_eq(back.shared.as_ref().unwrap(), &defaults));
    assert_eq!(back.local.unwrap().theme, "light");

    // Without the host's resolver the reference reads as nothing.
    let report = Weave::default()
        .deserialize_with_report::<Document>(json.as_bytes(), DataFormat::Json)
        .unwrap();
    assert!(report.value.shared.is_none());
    assert_eq!(report.value.title, "notes");
    assert_eq!(report.warnings().count(), 1, "{:?}", report.diagnostics);
}

/// Addresses settings by their position on a shelf.
struct Shelf(Vec<Arc<Settings>>);

impl ExternalReferenceResolver<i32> for Shelf {
    fn can_reference(&self, value: &dyn Any) -> Option<i32> {
        let shell = value.downcast_ref::<Arc<Settings>>()?;
        let index = self.0.iter().position(|known| Arc::ptr_eq(known, shell))?;
        i32::try_from(index).ok()
    }

    fn try_resolve(&self, key: &i32) -> Option<Box<dyn Any>> {
        let settings = self.0.get(usize::try_from(*key).ok()?)?;
        Some(Box::new(settings.clone()))
    }
}

/// Addresses one settings object by a GUID.
struct Vault(Uuid, Arc<Settings>);

impl ExternalReferenceResolver<Uuid> for Vault {
    fn can_reference(&self, value: &dyn Any) -> Option<Uuid> {
        let shell = value.downcast_ref::<Arc<Settings>>()?;
        Arc::ptr_eq(&self.1, shell).then_some(self.0)
    }

    fn try_resolve(&self, key: &Uuid) -> Option<Box<dyn Any>> {
        (*key == self.0).then(|| Box::new(self.1.clone()) as Box<dyn Any>)
    }
}

#[test]
fn index_and_guid_references() {
    let shelved = Arc::new(Settings {
        theme: "solarized".to_string(),
    });
    let vaulted = Arc::new(Settings {
        theme: "mono".to_string(),
    });
    let guid = Uuid::from_u128(0x5eed);
    let weave = Weave::default()
        .index_resolver(Arc::new(Shelf(vec![shelved.clone()])))
        .guid_resolver(Arc::new(Vault(guid, vaulted.clone())));
    let document = Document {
        title: "both".to_string(),
        shared: Some(shelved.clone()),
        local: Some(vaulted.clone()),
    };

    let json = weave.serialize_json(&document).unwrap();
    assert!(json.contains("$eref:0"), "{json}");
    assert!(json.contains(&format!("$guidref:{guid}")), "{json}");

    for format in [DataFormat::Binary, DataFormat::Json] {
        let bytes = weave.serialize(&document, format).unwrap();
        let report = weave
            .deserialize_with_report::<Document>(&bytes, format)
            .unwrap();
        assert!(report.is_clean(), "{format:?}: {:?}", report.diagnostics);
        let back = report.value;
        assert!(Arc::ptr_eq(back.shared.as_ref().unwrap(), &shelved));
        assert!(Arc::ptr_eq(back.local.as_ref().unwrap(), &vaulted));
    }
}
