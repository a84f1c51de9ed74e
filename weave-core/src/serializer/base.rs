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

//! The lifecycle every codec runs through.
//!
//! Writing: pre-callback, type-specific write, post-callback. Reading:
//! instantiate, pre-callback, type-specific read, substitution,
//! post-callback, legacy callback. Each callback and the type-specific step
//! run inside a containment boundary: a failure is logged and the value
//! keeps whatever state it reached. [`Error::Abort`] passes every boundary.
//!
//! Reference identity is not handled here: plain values have none, and the
//! `Rc`/`Arc` shells in [`shared`](super::shared) register themselves before
//! asking the codec for their content.

use crate::debug::DebugContext;
use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::serializer::{Codec, Serializable};
use crate::stream::{DataReader, DataWriter};

/// Logs a failure from inside a containment boundary. Only an abort, or a
/// failure the error policy escalates, comes back out.
#[inline]
pub fn contain(result: Result<(), Error>, debug: &mut DebugContext) -> Result<(), Error> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => debug.log_exception(err),
    }
}

/// The template behind [`Codec::serialize`] and [`Codec::deserialize`].
pub struct BaseCodec;

impl BaseCodec {
    pub fn serialize<T, C>(
        codec: &C,
        value: &T,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error>
    where
        T: Serializable,
        C: Codec<T> + ?Sized,
    {
        let callbacks = T::callbacks();
        if let Some(on_serializing) = callbacks.on_serializing {
            let result = on_serializing(value, context);
            contain(result, context.debug_mut())?;
        }
        let result = codec.write_impl(value, writer, context);
        contain(result, context.debug_mut())?;
        if let Some(on_serialized) = callbacks.on_serialized {
            let result = on_serialized(value, context);
            contain(result, context.debug_mut())?;
        }
        Ok(())
    }

    pub fn deserialize<T, C>(
        codec: &C,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<T, Error>
    where
        T: Serializable,
        C: Codec<T> + ?Sized,
    {
        let callbacks = T::callbacks();
        let mut value = match codec.instantiate(context) {
            Some(mut value) => {
                if let Some(on_deserializing) = callbacks.on_deserializing {
                    let result = on_deserializing(&mut value, context);
                    contain(result, context.debug_mut())?;
                }
                let result = codec.read_impl(&mut value, reader, context);
                contain(result, context.debug_mut())?;
                value
            }
            // The codec builds the instance itself and owns the pre-callback.
            None => match codec.read_uninstantiated(reader, context) {
                Ok(value) => value,
                Err(err) => {
                    context.debug_mut().log_exception(err)?;
                    T::create_default()
                }
            },
        };
        if let Some(substitute) = callbacks.substitute {
            value = substitute(value);
        }
        if let Some(on_deserialized) = callbacks.on_deserialized {
            let result = on_deserialized(&mut value, context);
            contain(result, context.debug_mut())?;
        }
        if let Some(on_deserialization) = callbacks.on_deserialization {
            let result = on_deserialization(&mut value);
            contain(result, context.debug_mut())?;
        }
        Ok(value)
    }
}
