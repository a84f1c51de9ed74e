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
use std::marker::PhantomData;

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::serializer::{Codec, Serializable};
use crate::stream::{DataReader, DataWriter};

/// A type that writes and reads its own node content.
pub trait SelfFormatter: Serializable {
    fn write_self(
        &self,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error>;

    /// Reads into `self`, which starts out as the type's default.
    fn read_self(
        &mut self,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error>;
}

pub struct SelfFormatCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for SelfFormatCodec<T> {
    fn default() -> Self {
        SelfFormatCodec {
            _marker: PhantomData,
        }
    }
}

impl<T: SelfFormatter> Codec<T> for SelfFormatCodec<T> {
    fn write_impl(
        &self,
        value: &T,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        value.write_self(writer, context)
    }

    fn read_impl(
        &self,
        value: &mut T,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        value.read_self(reader, context)
    }
}
