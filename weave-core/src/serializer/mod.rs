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

//! The [`Serializable`] trait and the codec family.
//!
//! Primitive values (numbers, strings, fieldless enums...) are written as a
//! single named entry. Everything else is written as a node whose content is
//! produced by a [`Codec`] that the [`Locator`](crate::resolver::locator::Locator)
//! resolves per policy and type.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::Error;
use crate::policy::PolicyRef;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::{CollectionOps, MapOps, TypeRegistry};
use crate::stream::{DataReader, DataWriter};
use crate::types::Type;

pub mod array;
pub mod base;
pub mod collection;
pub mod complex;
pub mod datetime;
pub mod delegate;
pub mod dynamic;
pub mod enum_;
pub mod list;
pub mod map;
pub mod member;
pub mod object_data;
pub mod option;
pub mod primitive;
pub mod self_format;
pub mod shared;
pub mod tuple;
pub mod type_value;
pub mod version;

pub use base::BaseCodec;

/// A type the engine can write and read back.
///
/// Implemented for std types here and for user types by
/// `#[derive(Serializable)]`. Only [`type_of`](Self::type_of) and
/// [`create_default`](Self::create_default) are required; the defaults of
/// everything else describe a node whose content comes from the located codec.
pub trait Serializable: Any + Sized {
    /// Written inline instead of as a node of its own: primitives, and the
    /// wrappers (`Option`, `Box`, `Rc`...) whose entries come from the
    /// wrapped value. Such types never get a codec.
    const PRIMITIVE: bool = false;

    fn type_of() -> Type;

    /// The value used before data is read and whenever data is unusable.
    fn create_default() -> Self;

    /// Carries the `#[weave(serializable)]` marker.
    fn is_marked() -> bool {
        false
    }

    /// Earlier paths of this type inside its module.
    fn former_type_names() -> &'static [&'static str] {
        &[]
    }

    fn members() -> Vec<Member<Self>> {
        Vec::new()
    }

    fn callbacks() -> Callbacks<Self> {
        Callbacks::default()
    }

    fn capabilities() -> Capabilities<Self> {
        Capabilities::new()
    }

    /// Registers the types reachable from this one.
    fn register_dependencies(_registry: &TypeRegistry) {}

    fn collection_ops() -> Option<CollectionOps> {
        None
    }

    fn map_ops() -> Option<MapOps> {
        None
    }

    /// Fixed-size little-endian encoding used by bulk primitive arrays.
    fn bulk_ops() -> Option<BulkOps<Self>> {
        None
    }

    fn write_value(
        &self,
        name: Option<&str>,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        complex::write_node(self, name, writer, context)
    }

    fn read_value(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        complex::read_node(reader, context)
    }

    /// Like [`read_value`](Self::read_value), but a null entry or a
    /// reference that cannot be resolved reads as `None`.
    fn read_nullable(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Option<Self>, Error> {
        if reader.peek_entry() == crate::stream::EntryType::Null {
            reader.read_null();
            return Ok(None);
        }
        Self::read_value(reader, context).map(Some)
    }

    /// The content of this value's node, or its single unnamed entry for
    /// primitives.
    fn write_content(
        &self,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        complex::write_with_codec(self, writer, context)
    }

    /// Reads what [`write_content`](Self::write_content) wrote, with the
    /// reader already inside the node.
    fn read_content(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        complex::read_with_codec(reader, context)
    }

    /// An empty value whose content can be filled in after it has been
    /// shared, for interior-mutable wrappers.
    fn placeholder() -> Option<Self> {
        None
    }

    /// Reads content into a value built by [`placeholder`](Self::placeholder).
    fn fill_from(
        &self,
        _reader: &mut dyn DataReader,
        _context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        Err(Error::unsupported(format!(
            "{} cannot be filled in place",
            Self::type_of()
        )))
    }
}

/// Per-type codec.
///
/// Implementors provide the type-specific [`write_impl`](Self::write_impl)
/// and [`read_impl`](Self::read_impl); the provided
/// [`serialize`](Self::serialize) and [`deserialize`](Self::deserialize) wrap
/// them in the [`BaseCodec`] lifecycle.
pub trait Codec<T: Serializable>: Send + Sync + 'static {
    /// The instance `read_impl` fills, or `None` when the instance can only
    /// be built once its data has been read; [`read_uninstantiated`]
    /// (Self::read_uninstantiated) is used then.
    fn instantiate(&self, _context: &mut DeserializationContext) -> Option<T> {
        Some(T::create_default())
    }

    fn write_impl(
        &self,
        value: &T,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error>;

    fn read_impl(
        &self,
        value: &mut T,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error>;

    fn read_uninstantiated(
        &self,
        _reader: &mut dyn DataReader,
        _context: &mut DeserializationContext,
    ) -> Result<T, Error> {
        Err(Error::unsupported(format!(
            "codec for {} has no instance to read into",
            T::type_of()
        )))
    }

    fn serialize(
        &self,
        value: &T,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        BaseCodec::serialize(self, value, writer, context)
    }

    fn deserialize(
        &self,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<T, Error> {
        BaseCodec::deserialize(self, reader, context)
    }
}

/// A codec working on values of a type only known at runtime. Produced by
/// open-generic factories and resolver hooks.
pub trait ErasedCodec: Send + Sync + 'static {
    fn serialize_any(
        &self,
        value: &dyn Any,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error>;

    fn deserialize_any(
        &self,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Box<dyn Any>, Error>;
}

/// Runs an [`ErasedCodec`] as the type-specific step of a typed codec.
pub struct TypedCodec<T> {
    inner: Arc<dyn ErasedCodec>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedCodec<T> {
    pub fn new(inner: Arc<dyn ErasedCodec>) -> Self {
        TypedCodec {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T: Serializable> Codec<T> for TypedCodec<T> {
    fn write_impl(
        &self,
        value: &T,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        self.inner.serialize_any(value, writer, context)
    }

    fn read_impl(
        &self,
        value: &mut T,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        let read = self.inner.deserialize_any(reader, context)?;
        match read.downcast::<T>() {
            Ok(read) => {
                *value = *read;
                Ok(())
            }
            Err(_) => Err(Error::type_mismatch(
                T::type_of().to_string(),
                "a value of another type from an erased codec",
            )),
        }
    }
}

/// Exposes a typed codec through the erased interface.
pub struct ErasedAdapter<T: Serializable> {
    inner: Arc<dyn Codec<T>>,
}

impl<T: Serializable> ErasedAdapter<T> {
    pub fn new(inner: Arc<dyn Codec<T>>) -> Self {
        ErasedAdapter { inner }
    }
}

impl<T: Serializable> ErasedCodec for ErasedAdapter<T> {
    fn serialize_any(
        &self,
        value: &dyn Any,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        let value = value.downcast_ref::<T>().ok_or_else(|| {
            Error::type_mismatch(T::type_of().to_string(), "a value of another type")
        })?;
        self.inner.serialize(value, writer, context)
    }

    fn deserialize_any(
        &self,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Box<dyn Any>, Error> {
        Ok(Box::new(self.inner.deserialize(reader, context)?))
    }
}

/// What a policy sees of a member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: &'static str,
    /// Names this member was written under by earlier versions.
    pub former_names: &'static [&'static str],
    pub is_public: bool,
    /// Carries `#[weave(serialize)]`.
    pub marked: bool,
    pub skipped: bool,
    pub value_type: Type,
}

pub type MemberWriter<T> =
    fn(&T, &mut dyn DataWriter, &mut SerializationContext) -> Result<(), Error>;
pub type MemberReader<T> =
    fn(&mut T, &mut dyn DataReader, &mut DeserializationContext) -> Result<(), Error>;

/// One entry of a type's static member list: its description plus accessors
/// that write it under its name and read it back into place.
pub struct Member<T> {
    pub info: MemberInfo,
    pub write: MemberWriter<T>,
    pub read: MemberReader<T>,
}

impl<T> Member<T> {
    pub fn matches(&self, name: &str) -> bool {
        self.info.name == name || self.info.former_names.contains(&name)
    }
}

impl<T> Clone for Member<T> {
    fn clone(&self) -> Self {
        Member {
            info: self.info.clone(),
            write: self.write,
            read: self.read,
        }
    }
}

pub type SerializeCallback<T> = fn(&T, &mut SerializationContext) -> Result<(), Error>;
pub type DeserializeCallback<T> = fn(&mut T, &mut DeserializationContext) -> Result<(), Error>;

/// Lifecycle hooks of a type.
pub struct Callbacks<T> {
    pub on_serializing: Option<SerializeCallback<T>>,
    pub on_serialized: Option<SerializeCallback<T>>,
    pub on_deserializing: Option<DeserializeCallback<T>>,
    pub on_deserialized: Option<DeserializeCallback<T>>,
    /// Runs last, after every other callback of the value.
    pub on_deserialization: Option<fn(&mut T) -> Result<(), Error>>,
    /// Replaces a freshly read value by another one.
    pub substitute: Option<fn(T) -> T>,
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Callbacks {
            on_serializing: None,
            on_serialized: None,
            on_deserializing: None,
            on_deserialized: None,
            on_deserialization: None,
            substitute: None,
        }
    }
}

/// Structural shapes the locator recognises, in the order it tries them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Shape {
    DerivedMap,
    SelfFormat,
    Delegate,
    TypeValue,
    PrimitiveArray,
    Array,
    MultiArray,
    ObjectData,
    Collection,
}

pub type CodecFactory<T> = fn(&PolicyRef) -> Arc<dyn Codec<T>>;

/// Codecs that need the active policy when built.
pub trait FromPolicy {
    fn from_policy(policy: &PolicyRef) -> Self;
}

fn default_factory<T: Serializable, C: Codec<T> + Default>(_: &PolicyRef) -> Arc<dyn Codec<T>> {
    Arc::new(C::default())
}

fn policy_factory<T: Serializable, C: Codec<T> + FromPolicy>(
    policy: &PolicyRef,
) -> Arc<dyn Codec<T>> {
    Arc::new(C::from_policy(policy))
}

/// How the locator may build a codec for a type, short of walking its members.
pub struct Capabilities<T> {
    pub always_self_format: bool,
    /// The std codec of the type; any user registration overrides it.
    pub builtin: Option<CodecFactory<T>>,
    pub shapes: Vec<(Shape, CodecFactory<T>)>,
}

impl<T: Serializable> Capabilities<T> {
    pub fn new() -> Self {
        Capabilities {
            always_self_format: false,
            builtin: None,
            shapes: Vec::new(),
        }
    }

    pub fn builtin<C: Codec<T> + Default>(mut self) -> Self {
        let factory: CodecFactory<T> = default_factory::<T, C>;
        self.builtin = Some(factory);
        self
    }

    pub fn shape<C: Codec<T> + Default>(mut self, shape: Shape) -> Self {
        let factory: CodecFactory<T> = default_factory::<T, C>;
        self.shapes.push((shape, factory));
        self
    }

    pub fn shape_with_policy<C: Codec<T> + FromPolicy>(mut self, shape: Shape) -> Self {
        let factory: CodecFactory<T> = policy_factory::<T, C>;
        self.shapes.push((shape, factory));
        self
    }

    /// Self-formatting wins over user registrations.
    pub fn always_self_format(mut self) -> Self {
        self.always_self_format = true;
        self
    }

    pub fn find(&self, shape: Shape) -> Option<CodecFactory<T>> {
        self.shapes
            .iter()
            .find(|(s, _)| *s == shape)
            .map(|(_, factory)| *factory)
    }

    /// Structural factories in the locator's fixed order.
    pub fn structural(&self) -> Vec<(Shape, CodecFactory<T>)> {
        let mut shapes = self.shapes.clone();
        shapes.sort_by_key(|(shape, _)| *shape);
        shapes
    }
}

impl<T: Serializable> Default for Capabilities<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bulk byte encoding of a fixed-size primitive.
pub struct BulkOps<T> {
    pub element_size: usize,
    pub encode: fn(&[T], &mut Vec<u8>),
    pub decode: fn(&[u8], &mut Vec<T>),
}

/// Registers the std types and the definitions of the std generics.
pub(crate) fn register_builtins(registry: &TypeRegistry) {
    primitive::register(registry);
    datetime::register(registry);
    version::register(registry);
    type_value::register(registry);
    dynamic::register(registry);
    object_data::register(registry);
    for definition in [
        option::OPTION,
        list::VEC,
        map::HASH_MAP,
        map::BTREE_MAP,
        collection::HASH_SET,
        collection::BTREE_SET,
        collection::VEC_DEQUE,
        collection::LINKED_LIST,
        shared::BOX,
        shared::RC,
        shared::ARC,
        shared::REF_CELL,
        shared::MUTEX,
        shared::RW_LOCK,
        delegate::DELEGATE,
    ] {
        registry.add_definition(definition);
    }
    for definition in tuple::TUPLES {
        registry.add_definition(definition);
    }
}
