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
//! Dictionaries.
//!
//! A dictionary is an unnamed array of entry nodes, each holding a `$k` and
//! a `$v` member. Types that wrap a dictionary next to their own members
//! implement [`DerivedMap`] (usually through `#[weave(derived_map = "..")]`)
//! and write their members first, then the array.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::marker::PhantomData;

use crate::error::Error;
use crate::policy::PolicyRef;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::{downcast, downcast_box, downcast_mut, MapOps, TypeRegistry};
use crate::serializer::complex::for_each_named;
use crate::serializer::member::{eligible, read_members_with, write_members};
use crate::serializer::{Capabilities, Codec, FromPolicy, Member, Serializable};
use crate::stream::{DataReader, DataWriter, EntryType};
use crate::types::{Type, TypeDefinition};

pub const HASH_MAP: TypeDefinition = TypeDefinition::core_generic("HashMap", 2);
pub const BTREE_MAP: TypeDefinition = TypeDefinition::core_generic("BTreeMap", 2);

const KEY: &str = "$k";
const VALUE: &str = "$v";

pub trait MapLike: Default + 'static {
    type Key: Serializable;
    type Value: Serializable;

    fn entry_count(&self) -> usize;

    fn entries(&self) -> Box<dyn Iterator<Item = (&Self::Key, &Self::Value)> + '_>;

    fn insert_entry(&mut self, key: Self::Key, value: Self::Value);
}

pub fn write_entries<M: MapLike>(
    map: &M,
    writer: &mut dyn DataWriter,
    context: &mut SerializationContext,
) -> Result<(), Error> {
    writer.begin_array_node(map.entry_count());
    let mut result = Ok(());
    for (key, value) in map.entries() {
        writer.begin_struct_node(None, None);
        result = key
            .write_value(Some(KEY), writer, context)
            .and_then(|()| value.write_value(Some(VALUE), writer, context));
        writer.end_node(None);
        if result.is_err() {
            break;
        }
    }
    writer.end_array_node();
    result
}

fn read_entry<M: MapLike>(
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<Option<(M::Key, M::Value)>, Error> {
    let mut key = None;
    let mut value = None;
    for_each_named(reader, context, |name, reader, context| match name {
        KEY if key.is_none() => {
            key = Some(<M::Key>::read_value(reader, context)?);
            Ok(true)
        }
        VALUE if value.is_none() => {
            value = Some(<M::Value>::read_value(reader, context)?);
            Ok(true)
        }
        _ => Ok(false),
    })?;
    let Some(key) = key else {
        context.log_warning(format!(
            "dictionary entry without a key of {} skipped",
            <M::Key>::type_of()
        ))?;
        return Ok(None);
    };
    let value = match value {
        Some(value) => value,
        None => {
            context.log_warning(format!(
                "dictionary entry without a value of {}",
                <M::Value>::type_of()
            ))?;
            <M::Value>::create_default()
        }
    };
    Ok(Some((key, value)))
}

fn read_entry_nodes<M: MapLike>(
    map: &mut M,
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<i64, Error> {
    let mut count = 0;
    let mut ignored = None;
    while !reader.peek_entry().is_boundary() {
        if !reader.enter_node(&mut ignored) {
            let entry = reader.peek_entry();
            context.log_warning(format!("expected a dictionary entry but found {entry:?}"))?;
            reader.skip_entry();
            continue;
        }
        let entry = read_entry::<M>(reader, context);
        reader.exit_node();
        if let Some((key, value)) = entry? {
            map.insert_entry(key, value);
        }
        count += 1;
    }
    Ok(count)
}

/// Reads the entry array written by [`write_entries`] into `map`.
pub fn read_entries<M: MapLike>(
    map: &mut M,
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<(), Error> {
    let mut length = 0i64;
    if !reader.enter_array(&mut length) {
        let entry = reader.peek_entry();
        context.log_warning(format!("expected a dictionary array but found {entry:?}"))?;
        reader.skip_entry();
        return Ok(());
    }
    let count = read_entry_nodes(map, reader, context);
    reader.exit_array();
    let count = count?;
    if count != length {
        context.log_warning(format!(
            "dictionary announced {length} entries but held {count}"
        ))?;
    }
    Ok(())
}

/// Erased entry access for any [`MapLike`].
pub fn map_ops<M: MapLike + Serializable>() -> MapOps {
    MapOps {
        key: <M::Key as Serializable>::type_of,
        value: <M::Value as Serializable>::type_of,
        len: |map| downcast::<M>(map).map(M::entry_count).unwrap_or(0),
        for_each: |map, visit| {
            for (key, value) in downcast::<M>(map)?.entries() {
                visit(key, value)?;
            }
            Ok(())
        },
        insert: |map, key, value| {
            let key = downcast_box::<M::Key>(key)?;
            let value = downcast_box::<M::Value>(value)?;
            downcast_mut::<M>(map)?.insert_entry(key, value);
            Ok(())
        },
    }
}

pub struct MapCodec<M> {
    _marker: PhantomData<fn() -> M>,
}

impl<M> Default for MapCodec<M> {
    fn default() -> Self {
        MapCodec {
            _marker: PhantomData,
        }
    }
}

impl<M: MapLike + Serializable> Codec<M> for MapCodec<M> {
    fn write_impl(
        &self,
        value: &M,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        write_entries(value, writer, context)
    }

    fn read_impl(
        &self,
        value: &mut M,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        read_entries(value, reader, context)
    }
}

macro_rules! impl_map {
    ($map:ident, $definition:ident, $($bound:path),+) => {
        impl<K: Serializable $(+ $bound)+, V: Serializable> MapLike for $map<K, V> {
            type Key = K;
            type Value = V;

            fn entry_count(&self) -> usize {
                self.len()
            }

            fn entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
                Box::new(self.iter())
            }

            fn insert_entry(&mut self, key: K, value: V) {
                self.insert(key, value);
            }
        }

        impl<K: Serializable $(+ $bound)+, V: Serializable> Serializable for $map<K, V> {
            fn type_of() -> Type {
                Type::generic($definition, vec![K::type_of(), V::type_of()])
            }

            fn create_default() -> Self {
                $map::new()
            }

            fn capabilities() -> Capabilities<Self> {
                Capabilities::new().builtin::<MapCodec<Self>>()
            }

            fn register_dependencies(registry: &TypeRegistry) {
                registry.ensure::<K>();
                registry.ensure::<V>();
            }

            fn map_ops() -> Option<MapOps> {
                Some(map_ops::<Self>())
            }
        }
    };
}

impl_map!(HashMap, HASH_MAP, Eq, Hash);
impl_map!(BTreeMap, BTREE_MAP, Ord);

/// A type carrying a dictionary alongside its own members.
pub trait DerivedMap: Serializable {
    type Map: MapLike;

    fn map(&self) -> &Self::Map;

    fn map_mut(&mut self) -> &mut Self::Map;
}

/// Writes the members of a [`DerivedMap`] type, then its entries as an
/// unnamed array. Streams holding only the array are read as well.
pub struct DerivedMapCodec<T> {
    members: Vec<Member<T>>,
}

impl<T: DerivedMap> FromPolicy for DerivedMapCodec<T> {
    fn from_policy(policy: &PolicyRef) -> Self {
        DerivedMapCodec {
            members: eligible(policy),
        }
    }
}

impl<T: DerivedMap> Codec<T> for DerivedMapCodec<T> {
    fn write_impl(
        &self,
        value: &T,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        write_members(&self.members, value, writer, context)?;
        write_entries(value.map(), writer, context)
    }

    fn read_impl(
        &self,
        value: &mut T,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        read_members_with(&self.members, value, reader, context, |value, entry, reader, context| {
            if entry != EntryType::StartOfArray {
                return Ok(false);
            }
            read_entries(value.map_mut(), reader, context)?;
            Ok(true)
        })
    }
}
