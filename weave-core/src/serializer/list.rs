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
//! `Vec<T>`, and the element array shared by every list-like codec.

use std::marker::PhantomData;

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::{CollectionOps, TypeRegistry};
use crate::serializer::collection::{collection_ops, GenericCollection};
use crate::serializer::{Capabilities, Codec, Serializable};
use crate::stream::{DataReader, DataWriter};
use crate::types::{Type, TypeDefinition};

pub const VEC: TypeDefinition = TypeDefinition::core_generic("Vec", 1);

/// Writes `items` as an unnamed array. The array is closed even when an
/// element fails.
pub fn write_array<'a, T: Serializable>(
    items: impl IntoIterator<Item = &'a T>,
    len: usize,
    writer: &mut dyn DataWriter,
    context: &mut SerializationContext,
) -> Result<(), Error> {
    writer.begin_array_node(len);
    let mut result = Ok(());
    for item in items {
        result = item.write_value(None, writer, context);
        if result.is_err() {
            break;
        }
    }
    writer.end_array_node();
    result
}

/// Reads an array written by [`write_array`], handing each element to
/// `push`. A missing array, or one whose element count differs from the
/// announced length, is reported.
pub fn read_array<T: Serializable>(
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
    mut push: impl FnMut(T),
) -> Result<(), Error> {
    let mut length = 0i64;
    if !reader.enter_array(&mut length) {
        let entry = reader.peek_entry();
        context.log_warning(format!(
            "expected an array of {} but found {entry:?}",
            T::type_of()
        ))?;
        reader.skip_entry();
        return Ok(());
    }
    let mut count = 0i64;
    let result = loop {
        if reader.peek_entry().is_boundary() {
            break Ok(());
        }
        match T::read_value(reader, context) {
            Ok(item) => {
                push(item);
                count += 1;
            }
            Err(err) => break Err(err),
        }
    };
    reader.exit_array();
    result?;
    if count != length {
        context.log_warning(format!(
            "array of {} announced {length} elements but held {count}",
            T::type_of()
        ))?;
    }
    Ok(())
}

pub struct ListCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for ListCodec<T> {
    fn default() -> Self {
        ListCodec {
            _marker: PhantomData,
        }
    }
}

impl<T: Serializable> Codec<Vec<T>> for ListCodec<T> {
    fn write_impl(
        &self,
        value: &Vec<T>,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        write_array(value, value.len(), writer, context)
    }

    fn read_impl(
        &self,
        value: &mut Vec<T>,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        read_array(reader, context, |item| value.push(item))
    }
}

impl<T: Serializable> Serializable for Vec<T> {
    fn type_of() -> Type {
        Type::generic(VEC, vec![T::type_of()])
    }

    fn create_default() -> Self {
        Vec::new()
    }

    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().builtin::<ListCodec<T>>()
    }

    fn register_dependencies(registry: &TypeRegistry) {
        registry.ensure::<T>();
    }

    fn collection_ops() -> Option<CollectionOps> {
        Some(collection_ops::<Self>())
    }
}

impl<T: Serializable> GenericCollection for Vec<T> {
    type Item = T;

    fn item_count(&self) -> usize {
        self.len()
    }

    fn items(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn add(&mut self, item: T) {
        self.push(item);
    }
}
