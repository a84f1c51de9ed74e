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
//! Sets, deques and linked lists, plus erased element access for any
//! [`GenericCollection`].

use std::collections::{BTreeSet, HashSet, LinkedList, VecDeque};
use std::hash::Hash;
use std::marker::PhantomData;

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::{downcast, downcast_box, downcast_mut, CollectionOps, TypeRegistry};
use crate::serializer::list::{read_array, write_array};
use crate::serializer::{Capabilities, Codec, Serializable, Shape};
use crate::stream::{DataReader, DataWriter};
use crate::types::{Type, TypeDefinition};

pub const HASH_SET: TypeDefinition = TypeDefinition::core_generic("HashSet", 1);
pub const BTREE_SET: TypeDefinition = TypeDefinition::core_generic("BTreeSet", 1);
pub const VEC_DEQUE: TypeDefinition = TypeDefinition::core_generic("VecDeque", 1);
pub const LINKED_LIST: TypeDefinition = TypeDefinition::core_generic("LinkedList", 1);

/// A container that can be rebuilt by adding its items one at a time.
pub trait GenericCollection: Default + 'static {
    type Item: Serializable;

    fn item_count(&self) -> usize;

    fn items(&self) -> Box<dyn Iterator<Item = &Self::Item> + '_>;

    fn add(&mut self, item: Self::Item);
}

/// Erased element access, for open-generic codecs and dynamic values.
pub fn collection_ops<C: GenericCollection + Serializable>() -> CollectionOps {
    CollectionOps {
        element: <C::Item as Serializable>::type_of,
        len: |collection| downcast::<C>(collection).map(C::item_count).unwrap_or(0),
        for_each: |collection, visit| {
            for item in downcast::<C>(collection)?.items() {
                visit(item)?;
            }
            Ok(())
        },
        push: |collection, item| {
            let item = downcast_box::<C::Item>(item)?;
            downcast_mut::<C>(collection)?.add(item);
            Ok(())
        },
    }
}

/// Any [`GenericCollection`] as an unnamed array of its items.
pub struct CollectionCodec<C> {
    _marker: PhantomData<fn() -> C>,
}

impl<C> Default for CollectionCodec<C> {
    fn default() -> Self {
        CollectionCodec {
            _marker: PhantomData,
        }
    }
}

impl<C: GenericCollection + Serializable> Codec<C> for CollectionCodec<C> {
    fn write_impl(
        &self,
        value: &C,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        write_array(value.items(), value.item_count(), writer, context)
    }

    fn read_impl(
        &self,
        value: &mut C,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        read_array(reader, context, |item| value.add(item))
    }
}

macro_rules! impl_collection {
    ($collection:ident, $definition:ident, $add:ident $(, $bound:path)*) => {
        impl<T: Serializable $(+ $bound)*> GenericCollection for $collection<T> {
            type Item = T;

            fn item_count(&self) -> usize {
                self.len()
            }

            fn items(&self) -> Box<dyn Iterator<Item = &T> + '_> {
                Box::new(self.iter())
            }

            fn add(&mut self, item: T) {
                self.$add(item);
            }
        }

        impl<T: Serializable $(+ $bound)*> Serializable for $collection<T> {
            fn type_of() -> Type {
                Type::generic($definition, vec![T::type_of()])
            }

            fn create_default() -> Self {
                $collection::new()
            }

            fn capabilities() -> Capabilities<Self> {
                Capabilities::new().shape::<CollectionCodec<Self>>(Shape::Collection)
            }

            fn register_dependencies(registry: &TypeRegistry) {
                registry.ensure::<T>();
            }

            fn collection_ops() -> Option<CollectionOps> {
                Some(collection_ops::<Self>())
            }
        }
    };
}

impl_collection!(HashSet, HASH_SET, insert, Eq, Hash);
impl_collection!(BTreeSet, BTREE_SET, insert, Ord);
impl_collection!(VecDeque, VEC_DEQUE, push_back);
impl_collection!(LinkedList, LINKED_LIST, push_back);
