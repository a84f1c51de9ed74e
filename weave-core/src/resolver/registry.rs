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

//! Process-wide table of serializable types.
//!
//! Holds, per closed type, the erased entry points that let the engine read
//! and write values whose type is only known at runtime (dynamic values,
//! open-generic codecs), plus the type definitions the binder resolves names
//! against and the method table behind delegate values.
//!
//! Derived non-generic types register themselves through `inventory`; closed
//! generic types are registered the first time their name is bound or their
//! codec is located, or explicitly through [`TypeRegistry::register`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::serializer::{self, Serializable};
use crate::stream::{DataReader, DataWriter};
use crate::types::{Type, TypeDefinition, CORE_MODULE};

type WriteValueFn =
    fn(&dyn Any, Option<&str>, &mut dyn DataWriter, &mut SerializationContext) -> Result<(), Error>;
type WriteContentFn =
    fn(&dyn Any, &mut dyn DataWriter, &mut SerializationContext) -> Result<(), Error>;
type ReadFn = fn(&mut dyn DataReader, &mut DeserializationContext) -> Result<Box<dyn Any>, Error>;

/// Erased element access of a collection type.
#[derive(Clone, Copy)]
pub struct CollectionOps {
    pub element: fn() -> Type,
    pub len: fn(&dyn Any) -> usize,
    pub for_each: fn(&dyn Any, &mut dyn FnMut(&dyn Any) -> Result<(), Error>) -> Result<(), Error>,
    pub push: fn(&mut dyn Any, Box<dyn Any>) -> Result<(), Error>,
}

/// Erased entry access of a dictionary type.
#[derive(Clone, Copy)]
pub struct MapOps {
    pub key: fn() -> Type,
    pub value: fn() -> Type,
    pub len: fn(&dyn Any) -> usize,
    pub for_each:
        fn(&dyn Any, &mut dyn FnMut(&dyn Any, &dyn Any) -> Result<(), Error>) -> Result<(), Error>,
    pub insert: fn(&mut dyn Any, Box<dyn Any>, Box<dyn Any>) -> Result<(), Error>,
}

/// Downcasts an erased collection or element, naming the expected type on failure.
pub fn downcast<T: Serializable>(value: &dyn Any) -> Result<&T, Error> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| Error::type_mismatch(T::type_of().to_string(), "another type"))
}

pub fn downcast_mut<T: Serializable>(value: &mut dyn Any) -> Result<&mut T, Error> {
    value
        .downcast_mut::<T>()
        .ok_or_else(|| Error::type_mismatch(T::type_of().to_string(), "another type"))
}

pub fn downcast_box<T: Serializable>(value: Box<dyn Any>) -> Result<T, Error> {
    value
        .downcast::<T>()
        .map(|v| *v)
        .map_err(|_| Error::type_mismatch(T::type_of().to_string(), "another type"))
}

fn write_value_erased<T: Serializable>(
    value: &dyn Any,
    name: Option<&str>,
    writer: &mut dyn DataWriter,
    context: &mut SerializationContext,
) -> Result<(), Error> {
    downcast::<T>(value)?.write_value(name, writer, context)
}

fn write_content_erased<T: Serializable>(
    value: &dyn Any,
    writer: &mut dyn DataWriter,
    context: &mut SerializationContext,
) -> Result<(), Error> {
    downcast::<T>(value)?.write_content(writer, context)
}

fn read_value_erased<T: Serializable>(
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<Box<dyn Any>, Error> {
    Ok(Box::new(T::read_value(reader, context)?))
}

fn read_content_erased<T: Serializable>(
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<Box<dyn Any>, Error> {
    Ok(Box::new(T::read_content(reader, context)?))
}

fn create_default_erased<T: Serializable>() -> Box<dyn Any> {
    Box::new(T::create_default())
}

/// Erased entry points of one closed type.
#[derive(Clone)]
pub struct Harness {
    pub write_value: WriteValueFn,
    pub write_content: WriteContentFn,
    pub read_value: ReadFn,
    pub read_content: ReadFn,
    pub create_default: fn() -> Box<dyn Any>,
}

pub struct TypeRegistration {
    ty: Type,
    type_id: TypeId,
    rust_name: &'static str,
    primitive: bool,
    harness: Harness,
    collection_ops: Option<CollectionOps>,
    map_ops: Option<MapOps>,
}

impl TypeRegistration {
    pub fn of<T: Serializable>() -> TypeRegistration {
        TypeRegistration {
            ty: T::type_of(),
            type_id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            primitive: T::PRIMITIVE,
            harness: Harness {
                write_value: write_value_erased::<T>,
                write_content: write_content_erased::<T>,
                read_value: read_value_erased::<T>,
                read_content: read_content_erased::<T>,
                create_default: create_default_erased::<T>,
            },
            collection_ops: T::collection_ops(),
            map_ops: T::map_ops(),
        }
    }

    #[inline(always)]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline(always)]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    #[inline(always)]
    pub fn is_primitive(&self) -> bool {
        self.primitive
    }

    #[inline(always)]
    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    pub fn collection_ops(&self) -> Option<&CollectionOps> {
        self.collection_ops.as_ref()
    }

    pub fn map_ops(&self) -> Option<&MapOps> {
        self.map_ops.as_ref()
    }
}

/// Collected by `inventory`; each entry registers one derived type.
pub struct TypeEntry {
    register: fn(&TypeRegistry),
}

impl TypeEntry {
    pub const fn new(register: fn(&TypeRegistry)) -> Self {
        TypeEntry { register }
    }
}

inventory::collect!(TypeEntry);

#[derive(Default)]
struct Definitions {
    by_key: HashMap<(String, String), TypeDefinition>,
    by_simple_name: HashMap<String, Vec<TypeDefinition>>,
    renames: HashMap<(String, String), TypeDefinition>,
}

type MethodKey = (Type, String);

#[derive(Default)]
pub struct TypeRegistry {
    by_type_id: RwLock<HashMap<TypeId, Arc<TypeRegistration>>>,
    by_type: RwLock<HashMap<Type, Arc<TypeRegistration>>>,
    definitions: RwLock<Definitions>,
    methods: RwLock<HashMap<MethodKey, Arc<dyn Any + Send + Sync>>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl TypeRegistry {
    /// A registry holding only the std types.
    pub fn new() -> TypeRegistry {
        let registry = TypeRegistry::default();
        serializer::register_builtins(&registry);
        registry
    }

    /// The process-wide registry, with every derived type of the program.
    pub fn global() -> &'static TypeRegistry {
        static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let registry = TypeRegistry::new();
            for entry in inventory::iter::<TypeEntry> {
                (entry.register)(&registry);
            }
            log::debug!(
                "type registry initialised with {} types",
                read(&registry.by_type_id).len()
            );
            registry
        })
    }

    /// Registers `T`, replacing an earlier registration of the same type.
    pub fn register<T: Serializable>(&self) {
        let registration = Arc::new(TypeRegistration::of::<T>());
        let ty = registration.ty.clone();
        write(&self.by_type_id).insert(TypeId::of::<T>(), registration.clone());
        write(&self.by_type).insert(ty.clone(), registration);
        if let Some(definition) = ty.definition() {
            self.add_definition(definition.clone());
            for former in T::former_type_names() {
                self.add_type_rename(definition.module(), former, definition.clone());
            }
        }
        T::register_dependencies(self);
    }

    /// Registers `T` unless it already is.
    #[inline]
    pub fn ensure<T: Serializable>(&self) {
        if !read(&self.by_type_id).contains_key(&TypeId::of::<T>()) {
            self.register::<T>();
        }
    }

    pub fn get(&self, type_id: TypeId) -> Option<Arc<TypeRegistration>> {
        read(&self.by_type_id).get(&type_id).cloned()
    }

    pub fn get_by_type(&self, ty: &Type) -> Option<Arc<TypeRegistration>> {
        read(&self.by_type).get(ty).cloned()
    }

    pub fn add_definition(&self, definition: TypeDefinition) {
        let mut definitions = write(&self.definitions);
        let key = (definition.module().to_owned(), definition.path().to_owned());
        if definitions.by_key.contains_key(&key) {
            return;
        }
        definitions
            .by_simple_name
            .entry(definition.simple_name().to_owned())
            .or_default()
            .push(definition.clone());
        definitions.by_key.insert(key, definition);
    }

    /// Maps a former path inside `module` to the current definition.
    pub fn add_type_rename(&self, module: &str, former_path: &str, current: TypeDefinition) {
        write(&self.definitions)
            .renames
            .insert((module.to_owned(), former_path.to_owned()), current);
    }

    /// Finds the definition named `path` with `arity` parameters.
    ///
    /// Tries, in order: renames and definitions in `module`, the same in the
    /// core module, then any module holding exactly that simple name.
    pub fn find_definition(&self, module: &str, path: &str, arity: usize) -> Option<TypeDefinition> {
        let definitions = read(&self.definitions);
        let lookup = |module: &str| {
            let key = (module.to_owned(), path.to_owned());
            definitions
                .renames
                .get(&key)
                .or_else(|| definitions.by_key.get(&key))
                .filter(|d| d.arity() == arity)
                .cloned()
        };
        if let Some(found) = lookup(module) {
            return Some(found);
        }
        if module != CORE_MODULE {
            if let Some(found) = lookup(CORE_MODULE) {
                return Some(found);
            }
        }
        let simple = path.rsplit("::").next().unwrap_or(path);
        let candidates: Vec<&TypeDefinition> = definitions
            .by_simple_name
            .get(simple)
            .map(|defs| defs.iter().filter(|d| d.arity() == arity).collect())
            .unwrap_or_default();
        match candidates.as_slice() {
            [only] => {
                log::debug!(
                    "resolved `{path}` in `{module}` by simple name to `{}` in `{}`",
                    only.path(),
                    only.module()
                );
                Some((*only).clone())
            }
            _ => None,
        }
    }

    /// Registers `function` as method `name` of `declaring`, the target of
    /// [`Delegate`](crate::serializer::delegate::Delegate) values.
    pub fn register_method<A: 'static, R: 'static>(
        &self,
        declaring: Type,
        name: &str,
        function: fn(A) -> R,
    ) {
        write(&self.methods).insert((declaring, name.to_owned()), Arc::new(function));
    }

    pub fn method<A: 'static, R: 'static>(&self, declaring: &Type, name: &str) -> Option<fn(A) -> R> {
        read(&self.methods)
            .get(&(declaring.clone(), name.to_owned()))
            .and_then(|f| f.downcast_ref::<fn(A) -> R>().copied())
    }

    pub fn len(&self) -> usize {
        read(&self.by_type_id).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
