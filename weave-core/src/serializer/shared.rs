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
//! Shared and wrapping pointers.
//!
//! `Rc` and `Arc` carry reference identity: the first time an allocation is
//! written it becomes a reference node tagged with a session id, and every
//! later occurrence is an internal reference to that id. When reading, the
//! shell is registered under its id before its content is read, so cycles
//! through `Rc<RefCell<_>>` (or `Arc<Mutex<_>>`, `Arc<RwLock<_>>`) come back
//! as cycles. Shells of other content types are registered once complete;
//! a reference back into such a shell while it is being read does not
//! resolve.
//!
//! `Box`, `RefCell`, `Mutex` and `RwLock` are transparent.

use std::any::Any;
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::{Arc, Mutex, RwLock};

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::TypeRegistry;
use crate::serializer::Serializable;
use crate::stream::{DataReader, DataWriter, EntryType};
use crate::types::{Type, TypeDefinition};
use crate::util::address_of;

pub const BOX: TypeDefinition = TypeDefinition::core_generic("Box", 1);
pub const RC: TypeDefinition = TypeDefinition::core_generic("Rc", 1);
pub const ARC: TypeDefinition = TypeDefinition::core_generic("Arc", 1);
pub const REF_CELL: TypeDefinition = TypeDefinition::core_generic("RefCell", 1);
pub const MUTEX: TypeDefinition = TypeDefinition::core_generic("Mutex", 1);
pub const RW_LOCK: TypeDefinition = TypeDefinition::core_generic("RwLock", 1);

/// Writes a shell: as an external reference when a resolver claims it, as
/// an internal reference when it was written before, else as a reference
/// node holding `inner`.
pub fn write_shared<S: Serializable, T: Serializable>(
    shell: &S,
    address: usize,
    inner: &T,
    name: Option<&str>,
    writer: &mut dyn DataWriter,
    context: &mut SerializationContext,
) -> Result<(), Error> {
    if context.try_write_external(shell, name, writer) {
        return Ok(());
    }
    let (is_new, id) = context.try_register_internal_reference(address);
    if !is_new {
        writer.write_internal_reference(name, id);
        return Ok(());
    }
    let type_name = context.type_name::<T>();
    writer.begin_reference_node(name, Some(&*type_name), id);
    let result = inner.write_content(writer, context);
    writer.end_node(name);
    result
}

fn external<S: Serializable>(
    found: Option<Box<dyn Any>>,
    key: String,
    context: &mut DeserializationContext,
) -> Result<Option<S>, Error> {
    match found.map(|value| value.downcast::<S>()) {
        Some(Ok(shell)) => Ok(Some(*shell)),
        Some(Err(_)) => {
            context.log_warning(format!(
                "external reference {key} resolved to something other than {}",
                S::type_of()
            ))?;
            Ok(None)
        }
        None => {
            context.log_warning(format!(
                "cannot resolve external reference {key} for {}",
                S::type_of()
            ))?;
            Ok(None)
        }
    }
}

/// Reads a shell written by [`write_shared`]. Null, and references that do
/// not resolve, read as `None`.
pub fn read_shared<S, T>(
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
    wrap: fn(T) -> S,
) -> Result<Option<S>, Error>
where
    S: Serializable + Clone + Deref<Target = T>,
    T: Serializable,
{
    match reader.peek_entry() {
        EntryType::Null => {
            reader.read_null();
            Ok(None)
        }
        EntryType::InternalReference => match reader.read_internal_reference() {
            Some(id) => context.shared_reference::<S>(id),
            None => Ok(None),
        },
        EntryType::ExternalReferenceByIndex => match reader.read_external_reference_by_index() {
            Some(index) => {
                let found = context.resolve_external_index(index);
                external(found, format!("by index {index}"), context)
            }
            None => Ok(None),
        },
        EntryType::ExternalReferenceByGuid => match reader.read_external_reference_by_guid() {
            Some(guid) => {
                let found = context.resolve_external_guid(guid);
                external(found, format!("by GUID {guid}"), context)
            }
            None => Ok(None),
        },
        EntryType::ExternalReferenceByString => match reader.read_external_reference_by_string()
        {
            Some(key) => {
                let found = context.resolve_external_string(&key);
                external(found, format!("by key `{key}`"), context)
            }
            None => Ok(None),
        },
        EntryType::StartOfNode => {
            let mut type_name = None;
            if !reader.enter_node(&mut type_name) {
                context.log_warning(format!("the node for {} nests too deeply", S::type_of()))?;
                return Ok(None);
            }
            let id = reader.current_node_id();
            if id < 0 {
                reader.exit_node();
                return Err(Error::abort(format!(
                    "node for {} carries no reference id",
                    S::type_of()
                )));
            }
            if let Some(type_name) = type_name.as_deref() {
                if !context.accepts::<T>(type_name)? {
                    reader.exit_node();
                    return Ok(None);
                }
            }
            let result = read_shell_content(id, reader, context, wrap);
            reader.exit_node();
            result.map(Some)
        }
        entry => {
            context.log_warning(format!(
                "expected {} but found {entry:?}",
                S::type_of()
            ))?;
            reader.skip_entry();
            Ok(None)
        }
    }
}

fn read_shell_content<S, T>(
    id: i32,
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
    wrap: fn(T) -> S,
) -> Result<S, Error>
where
    S: Serializable + Clone + Deref<Target = T>,
    T: Serializable,
{
    if let Some(placeholder) = T::placeholder() {
        let shell = wrap(placeholder);
        context.register_internal_reference(id, Box::new(shell.clone()));
        T::fill_from(&shell, reader, context)?;
        return Ok(shell);
    }
    let shell = wrap(T::read_content(reader, context)?);
    context.register_internal_reference(id, Box::new(shell.clone()));
    Ok(shell)
}

macro_rules! impl_shared_shell {
    ($shell:ident, $definition:ident) => {
        impl<T: Serializable> Serializable for $shell<T> {
            const PRIMITIVE: bool = true;

            fn type_of() -> Type {
                Type::generic($definition, vec![T::type_of()])
            }

            fn create_default() -> Self {
                $shell::new(T::create_default())
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
                let address = address_of($shell::as_ptr(self));
                write_shared(self, address, &**self, name, writer, context)
            }

            fn read_value(
                reader: &mut dyn DataReader,
                context: &mut DeserializationContext,
            ) -> Result<Self, Error> {
                Ok(Self::read_nullable(reader, context)?.unwrap_or_else(Self::create_default))
            }

            fn read_nullable(
                reader: &mut dyn DataReader,
                context: &mut DeserializationContext,
            ) -> Result<Option<Self>, Error> {
                read_shared(reader, context, $shell::new)
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
    };
}

impl_shared_shell!(Rc, RC);
impl_shared_shell!(Arc, ARC);

impl<T: Serializable> Serializable for Box<T> {
    const PRIMITIVE: bool = true;

    fn type_of() -> Type {
        Type::generic(BOX, vec![T::type_of()])
    }

    fn create_default() -> Self {
        Box::new(T::create_default())
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
        (**self).write_value(name, writer, context)
    }

    fn read_value(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        T::read_value(reader, context).map(Box::new)
    }

    fn read_nullable(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Option<Self>, Error> {
        Ok(T::read_nullable(reader, context)?.map(Box::new))
    }

    fn write_content(
        &self,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        (**self).write_content(writer, context)
    }

    fn read_content(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        T::read_content(reader, context).map(Box::new)
    }
}

fn busy<T: Serializable>() -> Error {
    Error::invalid_data(format!("{} is locked or mutably borrowed", T::type_of()))
}

/// Interior-mutable wrappers: transparent, plus in-place filling so a shell
/// around them can be shared before its content is read.
macro_rules! impl_cell {
    ($cell:ident, $definition:ident, $get:ident, $get_mut:ident) => {
        impl<T: Serializable> Serializable for $cell<T> {
            const PRIMITIVE: bool = true;

            fn type_of() -> Type {
                Type::generic($definition, vec![T::type_of()])
            }

            fn create_default() -> Self {
                $cell::new(T::create_default())
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
                let inner = self.$get().map_err(|_| busy::<T>())?;
                inner.write_value(name, writer, context)
            }

            fn read_value(
                reader: &mut dyn DataReader,
                context: &mut DeserializationContext,
            ) -> Result<Self, Error> {
                T::read_value(reader, context).map($cell::new)
            }

            fn read_nullable(
                reader: &mut dyn DataReader,
                context: &mut DeserializationContext,
            ) -> Result<Option<Self>, Error> {
                Ok(T::read_nullable(reader, context)?.map($cell::new))
            }

            fn write_content(
                &self,
                writer: &mut dyn DataWriter,
                context: &mut SerializationContext,
            ) -> Result<(), Error> {
                let inner = self.$get().map_err(|_| busy::<T>())?;
                inner.write_content(writer, context)
            }

            fn read_content(
                reader: &mut dyn DataReader,
                context: &mut DeserializationContext,
            ) -> Result<Self, Error> {
                T::read_content(reader, context).map($cell::new)
            }

            fn placeholder() -> Option<Self> {
                Some(Self::create_default())
            }

            fn fill_from(
                &self,
                reader: &mut dyn DataReader,
                context: &mut DeserializationContext,
            ) -> Result<(), Error> {
                let value = T::read_content(reader, context)?;
                *self.$get_mut().map_err(|_| busy::<T>())? = value;
                Ok(())
            }
        }
    };
}

impl_cell!(RefCell, REF_CELL, try_borrow, try_borrow_mut);
impl_cell!(Mutex, MUTEX, lock, lock);
impl_cell!(RwLock, RW_LOCK, read, write);
