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
//! Support for derived enums.
//!
//! Enums without data are inline integers holding the discriminant. Enums
//! with data are nodes whose first entry, `$variant`, names the variant;
//! the variant's fields follow as members (`item1`, `item2`... for tuple
//! variants).

use std::fmt::Display;

use crate::error::Error;
use crate::resolver::context::DeserializationContext;
use crate::serializer::Serializable;
use crate::stream::{DataReader, DataWriter, EntryType};

pub const VARIANT_KEY: &str = "$variant";

/// Reads the discriminant of a fieldless enum. A non-integer entry is
/// reported and gives `None`.
pub fn read_discriminant<T: Serializable>(
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<Option<i64>, Error> {
    match reader.read_i64() {
        Some(value) => Ok(Some(value)),
        None => {
            context.log_warning(format!("expected the discriminant of {}", T::type_of()))?;
            Ok(None)
        }
    }
}

/// Reports a discriminant or variant name the enum does not have and gives
/// the default.
pub fn unknown_variant<T: Serializable>(
    context: &mut DeserializationContext,
    variant: impl Display,
) -> Result<T, Error> {
    context.log_warning(format!("{} has no variant `{variant}`", T::type_of()))?;
    Ok(T::create_default())
}

pub fn write_variant(writer: &mut dyn DataWriter, variant: &str) {
    writer.write_string(Some(VARIANT_KEY), variant);
}

/// Reads the `$variant` entry that opens a data enum's node.
pub fn read_variant<T: Serializable>(
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<Option<String>, Error> {
    let (entry, name) = reader.peek_named();
    if entry == EntryType::String && name.as_deref() == Some(VARIANT_KEY) {
        if let Some(variant) = reader.read_string() {
            return Ok(Some(variant));
        }
    }
    context.log_warning(format!("{} node does not start with its variant", T::type_of()))?;
    Ok(None)
}
