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
//! Primitive values: numbers, `bool`, `char`, strings, GUIDs and `()`.
//!
//! Each is written inline as a single entry. Reading an entry of the wrong
//! kind, or an integer that does not fit, is reported and yields the
//! type's default.

use std::mem::size_of;

use uuid::Uuid;

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::TypeRegistry;
use crate::serializer::{BulkOps, Serializable};
use crate::stream::{DataReader, DataWriter};
use crate::types::{Type, TypeDefinition};

fn mismatch<T: Serializable>(context: &mut DeserializationContext, what: &str) -> Result<T, Error> {
    context.log_warning(format!("{what} while reading {}", T::type_of()))?;
    Ok(T::create_default())
}

macro_rules! impl_primitive_body {
    ($name:literal) => {
        const PRIMITIVE: bool = true;

        fn type_of() -> Type {
            Type::named(TypeDefinition::core($name))
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
    };
}

macro_rules! impl_bulk {
    ($ty:ty) => {
        fn bulk_ops() -> Option<BulkOps<Self>> {
            Some(BulkOps {
                element_size: size_of::<$ty>(),
                encode: |items, out| {
                    for item in items {
                        out.extend_from_slice(&item.to_le_bytes());
                    }
                },
                decode: |bytes, out| {
                    out.extend(bytes.chunks_exact(size_of::<$ty>()).map(|chunk| {
                        let mut raw = [0u8; size_of::<$ty>()];
                        raw.copy_from_slice(chunk);
                        <$ty>::from_le_bytes(raw)
                    }));
                },
            })
        }
    };
}

macro_rules! impl_integer {
    ($($ty:ty => $name:literal, $write:ident, $read:ident;)*) => {
        $(
            impl Serializable for $ty {
                impl_primitive_body!($name);
                impl_bulk!($ty);

                fn create_default() -> Self {
                    0
                }

                #[inline]
                fn write_value(
                    &self,
                    name: Option<&str>,
                    writer: &mut dyn DataWriter,
                    _context: &mut SerializationContext,
                ) -> Result<(), Error> {
                    writer.$write(name, *self as _);
                    Ok(())
                }

                #[inline]
                fn read_value(
                    reader: &mut dyn DataReader,
                    context: &mut DeserializationContext,
                ) -> Result<Self, Error> {
                    match reader.$read().map(<$ty>::try_from) {
                        Some(Ok(value)) => Ok(value),
                        Some(Err(_)) => mismatch(context, "integer out of range"),
                        None => mismatch(context, "expected an integer"),
                    }
                }
            }
        )*
    };
}

impl_integer! {
    i8 => "i8", write_i64, read_i64;
    i16 => "i16", write_i64, read_i64;
    i32 => "i32", write_i64, read_i64;
    i64 => "i64", write_i64, read_i64;
    isize => "isize", write_i64, read_i64;
    u8 => "u8", write_u64, read_u64;
    u16 => "u16", write_u64, read_u64;
    u32 => "u32", write_u64, read_u64;
    u64 => "u64", write_u64, read_u64;
    usize => "usize", write_u64, read_u64;
}

impl Serializable for f32 {
    impl_primitive_body!("f32");
    impl_bulk!(f32);

    fn create_default() -> Self {
        0.0
    }

    fn write_value(
        &self,
        name: Option<&str>,
        writer: &mut dyn DataWriter,
        _context: &mut SerializationContext,
    ) -> Result<(), Error> {
        writer.write_f32(name, *self);
        Ok(())
    }

    fn read_value(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        match reader.read_f32() {
            Some(value) => Ok(value),
            None => mismatch(context, "expected a floating point number"),
        }
    }
}

impl Serializable for f64 {
    impl_primitive_body!("f64");
    impl_bulk!(f64);

    fn create_default() -> Self {
        0.0
    }

    fn write_value(
        &self,
        name: Option<&str>,
        writer: &mut dyn DataWriter,
        _context: &mut SerializationContext,
    ) -> Result<(), Error> {
        writer.write_f64(name, *self);
        Ok(())
    }

    fn read_value(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        match reader.read_f64() {
            Some(value) => Ok(value),
            None => mismatch(context, "expected a floating point number"),
        }
    }
}

impl Serializable for bool {
    impl_primitive_body!("bool");

    fn create_default() -> Self {
        false
    }

    fn write_value(
        &self,
        name: Option<&str>,
        writer: &mut dyn DataWriter,
        _context: &mut SerializationContext,
    ) -> Result<(), Error> {
        writer.write_bool(name, *self);
        Ok(())
    }

    fn read_value(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        match reader.read_bool() {
            Some(value) => Ok(value),
            None => mismatch(context, "expected a boolean"),
        }
    }
}

impl Serializable for char {
    impl_primitive_body!("char");

    fn create_default() -> Self {
        '\0'
    }

    fn write_value(
        &self,
        name: Option<&str>,
        writer: &mut dyn DataWriter,
        _context: &mut SerializationContext,
    ) -> Result<(), Error> {
        let mut buf = [0u8; 4];
        writer.write_string(name, self.encode_utf8(&mut buf));
        Ok(())
    }

    fn read_value(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        let value = reader.read_string();
        let mut chars = value.as_deref().unwrap_or_default().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => mismatch(context, "expected a single character"),
        }
    }
}

impl Serializable for String {
    impl_primitive_body!("String");

    fn create_default() -> Self {
        String::new()
    }

    fn write_value(
        &self,
        name: Option<&str>,
        writer: &mut dyn DataWriter,
        _context: &mut SerializationContext,
    ) -> Result<(), Error> {
        writer.write_string(name, self);
        Ok(())
    }

    fn read_value(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        match reader.read_string() {
            Some(value) => Ok(value),
            None => mismatch(context, "expected a string"),
        }
    }
}

impl Serializable for Uuid {
    impl_primitive_body!("Guid");

    fn create_default() -> Self {
        Uuid::nil()
    }

    fn write_value(
        &self,
        name: Option<&str>,
        writer: &mut dyn DataWriter,
        _context: &mut SerializationContext,
    ) -> Result<(), Error> {
        writer.write_guid(name, *self);
        Ok(())
    }

    fn read_value(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        match reader.read_guid() {
            Some(value) => Ok(value),
            None => mismatch(context, "expected a GUID"),
        }
    }
}

impl Serializable for () {
    impl_primitive_body!("Unit");

    fn create_default() -> Self {}

    fn write_value(
        &self,
        name: Option<&str>,
        writer: &mut dyn DataWriter,
        _context: &mut SerializationContext,
    ) -> Result<(), Error> {
        writer.write_null(name);
        Ok(())
    }

    fn read_value(
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<Self, Error> {
        if !reader.read_null() {
            context.log_warning("expected null while reading Unit")?;
        }
        Ok(())
    }
}

pub(crate) fn register(registry: &TypeRegistry) {
    registry.register::<i8>();
    registry.register::<i16>();
    registry.register::<i32>();
    registry.register::<i64>();
    registry.register::<isize>();
    registry.register::<u8>();
    registry.register::<u16>();
    registry.register::<u32>();
    registry.register::<u64>();
    registry.register::<usize>();
    registry.register::<f32>();
    registry.register::<f64>();
    registry.register::<bool>();
    registry.register::<char>();
    registry.register::<String>();
    registry.register::<Uuid>();
    registry.register::<()>();
}
