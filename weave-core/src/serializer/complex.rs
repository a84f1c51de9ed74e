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

//! Node framing for non-primitive values.

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::serializer::Serializable;
use crate::stream::{DataReader, DataWriter, EntryType};

/// Writes `value` as a node tagged with its type name.
pub fn write_node<T: Serializable>(
    value: &T,
    name: Option<&str>,
    writer: &mut dyn DataWriter,
    context: &mut SerializationContext,
) -> Result<(), Error> {
    let type_name = context.type_name::<T>();
    writer.begin_struct_node(name, Some(&*type_name));
    let result = value.write_content(writer, context);
    writer.end_node(name);
    result
}

pub fn write_with_codec<T: Serializable>(
    value: &T,
    writer: &mut dyn DataWriter,
    context: &mut SerializationContext,
) -> Result<(), Error> {
    let codec = context.codec_for::<T>()?;
    codec.serialize(value, writer, context)
}

/// Reads a node written by [`write_node`].
///
/// A missing node, or a node holding another type, is reported and read as
/// the default value; the reader is always left after the entry.
pub fn read_node<T: Serializable>(
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<T, Error> {
    match reader.peek_entry() {
        EntryType::StartOfNode => {}
        EntryType::Null => {
            reader.read_null();
            return Ok(T::create_default());
        }
        entry => {
            context.log_warning(format!(
                "expected a node holding {} but found {entry:?}",
                T::type_of()
            ))?;
            reader.skip_entry();
            return Ok(T::create_default());
        }
    }
    let mut type_name = None;
    if !reader.enter_node(&mut type_name) {
        context.log_warning(format!("the node holding {} nests too deeply", T::type_of()))?;
        return Ok(T::create_default());
    }
    if let Some(type_name) = type_name.as_deref() {
        if !context.accepts::<T>(type_name)? {
            reader.exit_node();
            return Ok(T::create_default());
        }
    }
    let result = T::read_content(reader, context);
    reader.exit_node();
    result
}

pub fn read_with_codec<T: Serializable>(
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<T, Error> {
    let codec = context.codec_for::<T>()?;
    codec.deserialize(reader, context)
}

/// Reads the entries of the current level, handing every named one to
/// `visit` until it reaches a boundary. Unnamed entries are skipped.
///
/// `visit` returns whether it consumed the entry; entries it leaves are
/// skipped.
pub fn for_each_named<C>(
    reader: &mut dyn DataReader,
    context: &mut C,
    mut visit: impl FnMut(&str, &mut dyn DataReader, &mut C) -> Result<bool, Error>,
) -> Result<(), Error> {
    loop {
        let (entry, name) = reader.peek_named();
        if entry.is_boundary() {
            return Ok(());
        }
        let consumed = match name {
            Some(name) => visit(&name, reader, context)?,
            None => false,
        };
        if !consumed {
            reader.skip_entry();
        }
    }
}
