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
//! # Weave Derive
//!
//! `#[derive(Serializable)]` implements `weave_core::Serializable` for
//! structs and enums.
//!
//! - Structs (named, tuple and unit) become member-based types: one member
//!   per field, named after the field, or `item1`, `item2`... for tuple
//!   structs.
//! - Enums whose variants carry no data are written inline as their
//!   discriminant.
//! - Enums with data format themselves: the node starts with a `$variant`
//!   entry naming the variant, followed by the variant's fields.
//!
//! Non-generic types are registered with the global type registry at
//! startup, so they can be read back from dynamic values by name.
//!
//! ## Container attributes
//!
//! ```rust, ignore
//! #[derive(Serializable)]
//! #[weave(
//!     serializable,                  // marked for strict policies
//!     previously = "old::Name",      // earlier path of the type, repeatable
//!     default,                       // use `Default` for the default value
//!     self_format,                   // implements `SelfFormatter`
//!     always_self_format,            // ...and beats user registrations
//!     object_data,                   // implements `ObjectData`
//!     derived_map = "entries",       // field holding the type's dictionary
//!     on_serializing = "before_write",
//!     on_serialized = "after_write",
//!     on_deserializing = "before_read",
//!     on_deserialized = "after_read",
//!     on_deserialization = "finish",
//!     substitute = "canonical",
//! )]
//! struct Inventory { /* ... */ }
//! ```
//!
//! Callback names are methods of the type unless given as a full path.
//!
//! ## Field attributes
//!
//! - `#[weave(skip)]`: never written; read back as `Default::default()`
//! - `#[weave(serialize)]`: marked for strict policies
//! - `#[weave(previously = "old_name")]`: earlier member name, repeatable
//!
//! Enum variants accept `previously` as well.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod attrs;
mod object;
mod util;

/// Derive macro implementing `Serializable`.
///
/// # Example
///
/// ```rust, ignore
/// use weave::Serializable;
///
/// #[derive(Serializable, Debug, PartialEq)]
/// #[weave(serializable)]
/// struct Person {
///     #[weave(serialize)]
///     name: String,
///     #[weave(serialize, previously = "years")]
///     age: i32,
///     #[weave(skip)]
///     cache: Option<String>,
/// }
/// ```
#[proc_macro_derive(Serializable, attributes(weave))]
pub fn proc_macro_derive_serializable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    object::derive_serializable(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
