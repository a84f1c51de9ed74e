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
use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::TypeRegistry;
use crate::serializer::Serializable;
use crate::stream::{DataReader, DataWriter};
use crate::types::{Type, TypeDefinition};

pub const OPTION: TypeDefinition = TypeDefinition::core_generic("Option", 1);

/// `None` is a null entry; `Some` is the inner value in its usual form.
impl<T: Serializable> Serializable for Option<T> {
    const PRIMITIVE: bool = true;

    fn type_of() -> Type {
        Type::generic(OPTION, vec![T::type_of()])
    }

    fn create_default() -> Self {
        None
    }

    fn register_dependencies(registry: &TypeRegistry) {
        registry.ensure::<T>();
    }

    fn write_value(
        &self,
        name: Option<&str>,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        match self {
            Some(value) => value.write_value(name, writer, context),
            None => {
                writer.write_null(name);
                Ok(())
            }
        }
    }

    fn read_value(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        T::read_nullable(reader, context)
    }

    fn write_content(
        &self,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        self.write_value(None, writer, context)
    }

    fn read_content(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        Self::read_value(reader, context)
    }
}
