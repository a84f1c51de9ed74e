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
//! Runtime types as values, written through the binder as their name.

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::TypeRegistry;
use crate::serializer::{Capabilities, Codec, Serializable, Shape};
use crate::stream::{DataReader, DataWriter};
use crate::types::{Type, TypeDefinition};

#[derive(Default)]
pub struct TypeValueCodec;

impl Codec<Type> for TypeValueCodec {
    fn write_impl(
        &self,
        value: &Type,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        let name = context.binder().bind_to_name(value);
        writer.write_string(None, &name);
        Ok(())
    }

    fn read_impl(
        &self,
        value: &mut Type,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        let Some(name) = reader.read_string() else {
            return context.log_warning("expected a type name");
        };
        if let Some(ty) = context.bind_to_type(&name)? {
            *value = ty;
        }
        Ok(())
    }
}

impl Serializable for Type {
    fn type_of() -> Type {
        Type::named(TypeDefinition::core("Type"))
    }

    fn create_default() -> Self {
        <()>::type_of()
    }

    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().shape::<TypeValueCodec>(Shape::TypeValue)
    }
}

pub(crate) fn register(registry: &TypeRegistry) {
    registry.register::<Type>();
}
