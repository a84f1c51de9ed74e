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
//! Tuples of two to five items, written as the members `item1`, `item2`...

use std::marker::PhantomData;

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::TypeRegistry;
use crate::serializer::complex::for_each_named;
use crate::serializer::{Capabilities, Codec, Serializable};
use crate::stream::{DataReader, DataWriter};
use crate::types::{Type, TypeDefinition};

pub const TUPLE2: TypeDefinition = TypeDefinition::core_generic("Tuple2", 2);
pub const TUPLE3: TypeDefinition = TypeDefinition::core_generic("Tuple3", 3);
pub const TUPLE4: TypeDefinition = TypeDefinition::core_generic("Tuple4", 4);
pub const TUPLE5: TypeDefinition = TypeDefinition::core_generic("Tuple5", 5);

pub const TUPLES: [TypeDefinition; 4] = [TUPLE2, TUPLE3, TUPLE4, TUPLE5];

pub struct TupleCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for TupleCodec<T> {
    fn default() -> Self {
        TupleCodec {
            _marker: PhantomData,
        }
    }
}

macro_rules! impl_tuple {
    ($definition:ident; $($T:ident $idx:tt $key:literal),+) => {
        impl<$($T: Serializable),+> Serializable for ($($T,)+) {
            fn type_of() -> Type {
                Type::generic($definition, vec![$($T::type_of()),+])
            }

            fn create_default() -> Self {
                ($($T::create_default(),)+)
            }

            fn capabilities() -> Capabilities<Self> {
                Capabilities::new().builtin::<TupleCodec<Self>>()
            }

            fn register_dependencies(registry: &TypeRegistry) {
                $(registry.ensure::<$T>();)+
            }
        }

        impl<$($T: Serializable),+> Codec<($($T,)+)> for TupleCodec<($($T,)+)> {
            fn write_impl(
                &self,
                value: &($($T,)+),
                writer: &mut dyn DataWriter,
                context: &mut SerializationContext,
            ) -> Result<(), Error> {
                $(value.$idx.write_value(Some($key), writer, context)?;)+
                Ok(())
            }

            fn read_impl(
                &self,
                value: &mut ($($T,)+),
                reader: &mut dyn DataReader,
                context: &mut DeserializationContext,
            ) -> Result<(), Error> {
                for_each_named(reader, context, |name, reader, context| match name {
                    $($key => {
                        value.$idx = $T::read_value(reader, context)?;
                        Ok(true)
                    })+
                    _ => Ok(false),
                })
            }
        }
    };
}

impl_tuple!(TUPLE2; A 0 "item1", B 1 "item2");
impl_tuple!(TUPLE3; A 0 "item1", B 1 "item2", C 2 "item3");
impl_tuple!(TUPLE4; A 0 "item1", B 1 "item2", C 2 "item3", D 3 "item4");
impl_tuple!(TUPLE5; A 0 "item1", B 1 "item2", C 2 "item3", D 3 "item4", E 4 "item5");
