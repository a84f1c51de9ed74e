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
//! Arrays: `Box<[T]>` and the rectangular [`MultiArray`].
//!
//! Arrays have no instance until their data has been read, so their codecs
//! build the value themselves.

use std::marker::PhantomData;

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::TypeRegistry;
use crate::serializer::list::{read_array, write_array};
use crate::serializer::{Capabilities, Codec, Serializable, Shape};
use crate::stream::{DataReader, DataWriter, EntryType, PrimitiveArrayHeader};
use crate::types::Type;
use crate::util::BufferPool;

fn read_items<T: Serializable>(
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<Vec<T>, Error> {
    let mut items = Vec::new();
    read_array(reader, context, |item| items.push(item))?;
    Ok(items)
}

/// Element-wise array.
pub struct ArrayCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for ArrayCodec<T> {
    fn default() -> Self {
        ArrayCodec {
            _marker: PhantomData,
        }
    }
}

impl<T: Serializable> Codec<Box<[T]>> for ArrayCodec<T> {
    fn instantiate(&self, _context: &mut DeserializationContext) -> Option<Box<[T]>> {
        None
    }

    fn write_impl(
        &self,
        value: &Box<[T]>,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        write_array(value.iter(), value.len(), writer, context)
    }

    fn read_impl(
        &self,
        value: &mut Box<[T]>,
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
    ) -> Result<Box<[T]>, Error> {
        Ok(read_items(reader, context)?.into_boxed_slice())
    }
}

/// Arrays of fixed-size numbers, moved as one block of little-endian bytes
/// through a pooled buffer.
pub struct PrimitiveArrayCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for PrimitiveArrayCodec<T> {
    fn default() -> Self {
        PrimitiveArrayCodec {
            _marker: PhantomData,
        }
    }
}

impl<T: Serializable> Codec<Box<[T]>> for PrimitiveArrayCodec<T> {
    fn instantiate(&self, _context: &mut DeserializationContext) -> Option<Box<[T]>> {
        None
    }

    fn write_impl(
        &self,
        value: &Box<[T]>,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        let Some(ops) = T::bulk_ops() else {
            return write_array(value.iter(), value.len(), writer, context);
        };
        let mut bytes = BufferPool::global().claim(value.len() * ops.element_size);
        (ops.encode)(value, &mut bytes);
        let header = PrimitiveArrayHeader {
            element_size: ops.element_size,
            count: value.len(),
        };
        writer.write_primitive_array(header, &bytes);
        Ok(())
    }

    fn read_impl(
        &self,
        value: &mut Box<[T]>,
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
    ) -> Result<Box<[T]>, Error> {
        let ops = match T::bulk_ops() {
            // element-wise data is accepted as well
            Some(ops) if reader.peek_entry() != EntryType::StartOfArray => ops,
            _ => return Ok(read_items(reader, context)?.into_boxed_slice()),
        };
        let mut bytes = BufferPool::global().claim(0);
        match reader.read_primitive_array(&mut bytes) {
            Some(header) if header.element_size == ops.element_size => {
                let mut items = Vec::with_capacity(header.count);
                (ops.decode)(&bytes, &mut items);
                Ok(items.into_boxed_slice())
            }
            Some(header) => {
                context.log_warning(format!(
                    "primitive array of {} has {}-byte elements, expected {}",
                    T::type_of(),
                    header.element_size,
                    ops.element_size
                ))?;
                Ok(Box::default())
            }
            None => {
                context.log_warning(format!("expected a primitive array of {}", T::type_of()))?;
                Ok(Box::default())
            }
        }
    }
}

impl<T: Serializable> Serializable for Box<[T]> {
    fn type_of() -> Type {
        Type::array(T::type_of(), 1)
    }

    fn create_default() -> Self {
        Box::default()
    }

    fn capabilities() -> Capabilities<Self> {
        let capabilities = Capabilities::new().shape::<ArrayCodec<T>>(Shape::Array);
        if T::bulk_ops().is_some() {
            capabilities.shape::<PrimitiveArrayCodec<T>>(Shape::PrimitiveArray)
        } else {
            capabilities
        }
    }

    fn register_dependencies(registry: &TypeRegistry) {
        registry.ensure::<T>();
    }
}

/// A rectangular array of `RANK` dimensions stored in row-major order.
///
/// Written as its dimension lengths (`"2|3"`) followed by the flat element
/// array. Rank one arrays are better written as `Box<[T]>`, which shares
/// the same type name.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiArray<T, const RANK: usize> {
    lengths: [usize; RANK],
    data: Vec<T>,
}

impl<T, const RANK: usize> MultiArray<T, RANK> {
    /// Fails when `data` does not hold exactly the product of `lengths`.
    pub fn new(lengths: [usize; RANK], data: Vec<T>) -> Result<Self, Error> {
        let expected = element_count(&lengths).ok_or_else(|| {
            Error::invalid_data(format!("array of lengths {lengths:?} is too large"))
        })?;
        crate::ensure!(
            expected == data.len(),
            Error::invalid_data(format!(
                "{RANK}-dimensional array of lengths {lengths:?} needs {expected} elements, got {}",
                data.len()
            ))
        );
        Ok(MultiArray { lengths, data })
    }

    pub fn lengths(&self) -> &[usize; RANK] {
        &self.lengths
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    fn offset(&self, index: [usize; RANK]) -> Option<usize> {
        let mut offset = 0;
        for (i, len) in index.iter().zip(self.lengths.iter()) {
            if i >= len {
                return None;
            }
            offset = offset * len + i;
        }
        Some(offset)
    }

    pub fn get(&self, index: [usize; RANK]) -> Option<&T> {
        self.offset(index).and_then(|offset| self.data.get(offset))
    }

    pub fn get_mut(&mut self, index: [usize; RANK]) -> Option<&mut T> {
        self.offset(index).and_then(|offset| self.data.get_mut(offset))
    }
}

pub struct MultiArrayCodec<T, const RANK: usize> {
    _marker: PhantomData<fn() -> T>,
}

impl<T, const RANK: usize> Default for MultiArrayCodec<T, RANK> {
    fn default() -> Self {
        MultiArrayCodec {
            _marker: PhantomData,
        }
    }
}

const RANKS_KEY: &str = "ranks";

/// Product of `lengths`, or `None` when it overflows.
fn element_count(lengths: &[usize]) -> Option<usize> {
    lengths.iter().try_fold(1usize, |count, &len| count.checked_mul(len))
}

fn parse_lengths<const RANK: usize>(text: &str) -> Option<[usize; RANK]> {
    let mut lengths = [0usize; RANK];
    let mut parts = text.split('|');
    for length in lengths.iter_mut() {
        *length = parts.next()?.trim().parse().ok()?;
    }
    parts.next().is_none().then_some(lengths)
}

impl<T: Serializable, const RANK: usize> Codec<MultiArray<T, RANK>> for MultiArrayCodec<T, RANK> {
    fn instantiate(&self, _context: &mut DeserializationContext) -> Option<MultiArray<T, RANK>> {
        None
    }

    fn write_impl(
        &self,
        value: &MultiArray<T, RANK>,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        let ranks = value
            .lengths
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join("|");
        writer.write_string(Some(RANKS_KEY), &ranks);
        write_array(value.data.iter(), value.data.len(), writer, context)
    }

    fn read_impl(
        &self,
        value: &mut MultiArray<T, RANK>,
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
    ) -> Result<MultiArray<T, RANK>, Error> {
        let mut lengths = None;
        let mut data = Vec::new();
        loop {
            let (entry, name) = reader.peek_named();
            if entry.is_boundary() {
                break;
            }
            match (entry, name.as_deref()) {
                (_, Some(RANKS_KEY)) => {
                    lengths = reader.read_string().as_deref().and_then(parse_lengths::<RANK>);
                }
                (EntryType::StartOfArray, None) => {
                    read_array(reader, context, |item| data.push(item))?;
                }
                _ => reader.skip_entry(),
            }
        }
        let Some(lengths) = lengths else {
            context.log_warning(format!(
                "{RANK}-dimensional array of {} has no usable lengths",
                T::type_of()
            ))?;
            return Ok(MultiArray::create_default());
        };
        // Lengths asking for more elements than were read cannot be trusted
        // to size an allocation; surplus elements are dropped.
        match element_count(&lengths) {
            Some(expected) if expected <= data.len() => {
                if expected < data.len() {
                    context.log_warning(format!(
                        "array of lengths {lengths:?} holds {} elements instead of {expected}",
                        data.len()
                    ))?;
                    data.truncate(expected);
                }
                Ok(MultiArray { lengths, data })
            }
            _ => {
                context.log_warning(format!(
                    "array of lengths {lengths:?} does not fit the {} elements read",
                    data.len()
                ))?;
                Ok(MultiArray::create_default())
            }
        }
    }
}

impl<T: Serializable, const RANK: usize> Serializable for MultiArray<T, RANK> {
    fn type_of() -> Type {
        Type::array(T::type_of(), RANK)
    }

    fn create_default() -> Self {
        MultiArray {
            lengths: [0; RANK],
            data: Vec::new(),
        }
    }

    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().shape::<MultiArrayCodec<T, RANK>>(Shape::MultiArray)
    }

    fn register_dependencies(registry: &TypeRegistry) {
        registry.ensure::<T>();
    }
}
