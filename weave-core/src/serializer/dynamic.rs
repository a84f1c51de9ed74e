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
//! Values whose type is only known at runtime.
//!
//! A [`DynValue`] is always written as a node tagged with the name of the
//! value's actual type, so the reader can find the right entry points in
//! the [`TypeRegistry`]. Inline types (numbers, strings, `Option`, shells)
//! get a node wrapped around their single entry.

use std::any::Any;
use std::fmt;

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::TypeRegistry;
use crate::serializer::Serializable;
use crate::stream::{DataReader, DataWriter, EntryType};
use crate::types::{Type, TypeDefinition};

/// A value of any registered type, or nothing.
#[derive(Default)]
pub struct DynValue(Option<Box<dyn Any>>);

impl DynValue {
    /// Wraps `value`, registering its type globally so it can be written.
    pub fn new<T: Serializable>(value: T) -> Self {
        TypeRegistry::global().ensure::<T>();
        DynValue(Some(Box::new(value)))
    }

    pub fn none() -> Self {
        DynValue(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|value| value.downcast_ref())
    }

    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.as_deref_mut().and_then(|value| value.downcast_mut())
    }

    /// Takes the value out if it is a `T`, leaving the wrapper untouched
    /// otherwise.
    pub fn take<T: Any>(&mut self) -> Option<T> {
        match self.0.take()?.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(other) => {
                self.0 = Some(other);
                None
            }
        }
    }

    pub fn as_any(&self) -> Option<&dyn Any> {
        self.0.as_deref()
    }
}

impl fmt::Debug for DynValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => {
                let name = TypeRegistry::global()
                    .get((**value).type_id())
                    .map(|registration| registration.rust_name())
                    .unwrap_or("<unregistered>");
                write!(f, "DynValue({name})")
            }
            None => f.write_str("DynValue(None)"),
        }
    }
}

impl Serializable for DynValue {
    const PRIMITIVE: bool = true;

    fn type_of() -> Type {
        Type::named(TypeDefinition::core("Dynamic"))
    }

    fn create_default() -> Self {
        DynValue(None)
    }

    fn write_value(
        &self,
        name: Option<&str>,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        let Some(value) = self.0.as_deref() else {
            writer.write_null(name);
            return Ok(());
        };
        let Some(registration) = context.registry().get(value.type_id()) else {
            writer.write_null(name);
            return context.log_error("dynamic value of an unregistered type written as null");
        };
        if !registration.is_primitive() {
            return (registration.harness().write_value)(value, name, writer, context);
        }
        let type_name = context.binder().bind_to_name(registration.ty());
        writer.begin_struct_node(name, Some(&*type_name));
        let result = (registration.harness().write_content)(value, writer, context);
        writer.end_node(name);
        result
    }

    fn read_value(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        match reader.peek_entry() {
            EntryType::StartOfNode => {}
            EntryType::Null => {
                reader.read_null();
                return Ok(DynValue(None));
            }
            entry => {
                context.log_warning(format!("expected a dynamic value but found {entry:?}"))?;
                reader.skip_entry();
                return Ok(DynValue(None));
            }
        }
        let mut type_name = None;
        if !reader.enter_node(&mut type_name) {
            context.log_warning("a dynamic value nests too deeply")?;
            return Ok(DynValue(None));
        }
        let result = read_tagged(type_name.as_deref(), reader, context);
        reader.exit_node();
        result
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

fn read_tagged(
    type_name: Option<&str>,
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<DynValue, Error> {
    let Some(type_name) = type_name else {
        context.log_warning("dynamic value without a type name")?;
        return Ok(DynValue(None));
    };
    let Some(ty) = context.bind_to_type(type_name)? else {
        return Ok(DynValue(None));
    };
    let Some(registration) = context.registry().get_by_type(&ty) else {
        context.log_warning(format!("{ty} is not registered; dynamic value dropped"))?;
        return Ok(DynValue(None));
    };
    let value = (registration.harness().read_content)(reader, context)?;
    Ok(DynValue(Some(value)))
}

pub(crate) fn register(registry: &TypeRegistry) {
    registry.register::<DynValue>();
}
