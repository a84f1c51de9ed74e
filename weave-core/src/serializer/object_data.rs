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
//! Types that describe themselves as a bag of named dynamic values.
//!
//! An [`ObjectData`] type fills a [`SerializationInfo`] when written and is
//! rebuilt from one when read, so it has no instance until its data is
//! back. Each entry is written as a [`DynValue`] and carries its own type.

use std::marker::PhantomData;

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::TypeRegistry;
use crate::serializer::base::contain;
use crate::serializer::dynamic::DynValue;
use crate::serializer::{Capabilities, Codec, Serializable, Shape};
use crate::stream::{DataReader, DataWriter};
use crate::types::{Type, TypeDefinition};

/// Named values in insertion order.
#[derive(Debug, Default)]
pub struct SerializationInfo {
    entries: Vec<(String, DynValue)>,
}

impl SerializationInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the value named `name`.
    pub fn add<T: Serializable>(&mut self, name: &str, value: T) {
        self.insert(name, DynValue::new(value));
    }

    pub fn insert(&mut self, name: &str, value: DynValue) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_owned(), value)),
        }
    }

    pub fn get<T: Serializable>(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, value)| value.get::<T>())
    }

    /// Removes the value named `name` if it is a `T`.
    pub fn take<T: Serializable>(&mut self, name: &str) -> Option<T> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        let value = self.entries[index].1.take::<T>()?;
        self.entries.remove(index);
        Some(value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes every entry as a named dynamic value, each in its own
    /// containment boundary.
    pub fn write_entries(
        &self,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        for (name, entry) in &self.entries {
            let result = entry.write_value(Some(name), writer, context);
            contain(result, context.debug_mut())?;
        }
        Ok(())
    }
}

pub trait ObjectData: Serializable {
    /// Adds the values to write to `info`.
    fn get_object_data(&self, _info: &mut SerializationInfo) {}

    /// Writes the object's entries. The default writes what
    /// [`get_object_data`](Self::get_object_data) collects.
    fn write_object_data(
        &self,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        let mut info = SerializationInfo::new();
        self.get_object_data(&mut info);
        info.write_entries(writer, context)
    }

    fn from_object_data(
        info: SerializationInfo,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error>;
}

pub struct ObjectDataCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for ObjectDataCodec<T> {
    fn default() -> Self {
        ObjectDataCodec {
            _marker: PhantomData,
        }
    }
}

impl<T: ObjectData> Codec<T> for ObjectDataCodec<T> {
    fn instantiate(&self, _context: &mut DeserializationContext) -> Option<T> {
        None
    }

    fn write_impl(
        &self,
        value: &T,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        value.write_object_data(writer, context)
    }

    fn read_impl(
        &self,
        value: &mut T,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        *value = self.read_uninstantiated(reader, context)?;
        Ok(())
    }

    fn read_uninstantiated(
        &self,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<T, Error> {
        let mut info = SerializationInfo::new();
        loop {
            let (entry, name) = reader.peek_named();
            if entry.is_boundary() {
                break;
            }
            let Some(name) = name else {
                reader.skip_entry();
                continue;
            };
            let value = DynValue::read_value(reader, context)?;
            info.insert(&name, value);
        }
        let callbacks = T::callbacks();
        let mut value = T::from_object_data(info, context)?;
        if let Some(on_deserializing) = callbacks.on_deserializing {
            let result = on_deserializing(&mut value, context);
            contain(result, context.debug_mut())?;
        }
        Ok(value)
    }
}

/// A free-form [`ObjectData`] container.
#[derive(Debug, Default)]
pub struct PropertyBag {
    pub info: SerializationInfo,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serializable>(&mut self, name: &str, value: T) -> &mut Self {
        self.info.add(name, value);
        self
    }

    pub fn get<T: Serializable>(&self, name: &str) -> Option<&T> {
        self.info.get(name)
    }
}

impl ObjectData for PropertyBag {
    fn write_object_data(
        &self,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        self.info.write_entries(writer, context)
    }

    fn from_object_data(
        info: SerializationInfo,
        _context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        Ok(PropertyBag { info })
    }
}

impl Serializable for PropertyBag {
    fn type_of() -> Type {
        Type::named(TypeDefinition::core("PropertyBag"))
    }

    fn create_default() -> Self {
        PropertyBag::default()
    }

    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().shape::<ObjectDataCodec<Self>>(Shape::ObjectData)
    }
}

pub(crate) fn register(registry: &TypeRegistry) {
    registry.register::<PropertyBag>();
}
