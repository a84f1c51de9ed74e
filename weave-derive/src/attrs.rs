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
//! Parsing of `#[weave(...)]` attributes.

use proc_macro2::TokenStream;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, ExprPath, LitStr};

/// A callback named in a container attribute.
#[derive(Clone)]
pub struct Callback(ExprPath);

impl Callback {
    /// A bare name refers to a method of the type.
    pub fn to_tokens(&self) -> TokenStream {
        let path = &self.0;
        if path.qself.is_none() && path.path.segments.len() == 1 && path.path.leading_colon.is_none() {
            quote! { Self::#path }
        } else {
            quote! { #path }
        }
    }
}

/// Container-level `#[weave(...)]` attributes.
#[derive(Default)]
pub struct ContainerAttrs {
    pub serializable: bool,
    pub previously: Vec<String>,
    pub use_default: bool,
    pub self_format: bool,
    pub always_self_format: bool,
    pub object_data: bool,
    pub derived_map: Option<LitStr>,
    pub on_serializing: Option<Callback>,
    pub on_serialized: Option<Callback>,
    pub on_deserializing: Option<Callback>,
    pub on_deserialized: Option<Callback>,
    pub on_deserialization: Option<Callback>,
    pub substitute: Option<Callback>,
}

impl ContainerAttrs {
    pub fn has_callbacks(&self) -> bool {
        self.on_serializing.is_some()
            || self.on_serialized.is_some()
            || self.on_deserializing.is_some()
            || self.on_deserialized.is_some()
            || self.on_deserialization.is_some()
            || self.substitute.is_some()
    }
}

/// Field-level `#[weave(...)]` attributes.
#[derive(Debug, Clone, Default)]
pub struct FieldAttrs {
    pub skip: bool,
    pub serialize: bool,
    pub previously: Vec<String>,
}

/// Variant-level `#[weave(...)]` attributes.
#[derive(Debug, Clone, Default)]
pub struct VariantAttrs {
    pub previously: Vec<String>,
}

fn string_value(meta: &ParseNestedMeta) -> syn::Result<LitStr> {
    meta.value()?.parse()
}

fn callback_value(meta: &ParseNestedMeta) -> syn::Result<Callback> {
    let lit = string_value(meta)?;
    lit.parse::<ExprPath>().map(Callback)
}

fn weave_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("weave"))
}

pub fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut parsed = ContainerAttrs::default();
    for attr in weave_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("serializable") {
                parsed.serializable = true;
            } else if path.is_ident("previously") {
                parsed.previously.push(string_value(&meta)?.value());
            } else if path.is_ident("default") {
                parsed.use_default = true;
            } else if path.is_ident("self_format") {
                parsed.self_format = true;
            } else if path.is_ident("always_self_format") {
                parsed.self_format = true;
                parsed.always_self_format = true;
            } else if path.is_ident("object_data") {
                parsed.object_data = true;
            } else if path.is_ident("derived_map") {
                parsed.derived_map = Some(string_value(&meta)?);
            } else if path.is_ident("on_serializing") {
                parsed.on_serializing = Some(callback_value(&meta)?);
            } else if path.is_ident("on_serialized") {
                parsed.on_serialized = Some(callback_value(&meta)?);
            } else if path.is_ident("on_deserializing") {
                parsed.on_deserializing = Some(callback_value(&meta)?);
            } else if path.is_ident("on_deserialized") {
                parsed.on_deserialized = Some(callback_value(&meta)?);
            } else if path.is_ident("on_deserialization") {
                parsed.on_deserialization = Some(callback_value(&meta)?);
            } else if path.is_ident("substitute") {
                parsed.substitute = Some(callback_value(&meta)?);
            } else {
                return Err(meta.error("unknown weave container attribute"));
            }
            Ok(())
        })?;
    }
    let shapes = [parsed.self_format, parsed.object_data, parsed.derived_map.is_some()];
    if shapes.iter().filter(|set| **set).count() > 1 {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "self_format, object_data and derived_map are mutually exclusive",
        ));
    }
    Ok(parsed)
}

pub fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in weave_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                parsed.skip = true;
            } else if meta.path.is_ident("serialize") {
                parsed.serialize = true;
            } else if meta.path.is_ident("previously") {
                parsed.previously.push(string_value(&meta)?.value());
            } else {
                return Err(meta.error("unknown weave field attribute"));
            }
            Ok(())
        })?;
    }
    if parsed.skip && parsed.serialize {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "a field cannot be both skipped and serialized",
        ));
    }
    Ok(parsed)
}

pub fn parse_variant_attrs(attrs: &[Attribute]) -> syn::Result<VariantAttrs> {
    let mut parsed = VariantAttrs::default();
    for attr in weave_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("previously") {
                parsed.previously.push(string_value(&meta)?.value());
                Ok(())
            } else {
                Err(meta.error("unknown weave variant attribute"))
            }
        })?;
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn parses_container_attributes() {
        let input: syn::DeriveInput = parse_quote! {
            #[weave(serializable, previously = "Old", previously = "Older")]
            #[weave(derived_map = "entries", on_deserialized = "after_read")]
            struct Bag { entries: std::collections::BTreeMap<String, i32> }
        };
        let attrs = parse_container_attrs(&input.attrs).unwrap();
        assert!(attrs.serializable);
        assert_eq!(attrs.previously, vec!["Old", "Older"]);
        assert_eq!(attrs.derived_map.as_ref().unwrap().value(), "entries");
        assert!(attrs.has_callbacks());
        let callback = attrs.on_deserialized.unwrap().to_tokens().to_string();
        assert_eq!(callback, "Self :: after_read");
    }

    #[test]
    fn full_paths_are_kept() {
        let input: syn::DeriveInput = parse_quote! {
            #[weave(substitute = "crate::intern")]
            struct Name(String);
        };
        let attrs = parse_container_attrs(&input.attrs).unwrap();
        let tokens = attrs.substitute.unwrap().to_tokens().to_string();
        assert_eq!(tokens, "crate :: intern");
    }

    #[test]
    fn rejects_conflicting_shapes() {
        let input: syn::DeriveInput = parse_quote! {
            #[weave(self_format, object_data)]
            struct Both;
        };
        assert!(parse_container_attrs(&input.attrs).is_err());
    }

    #[test]
    fn parses_field_attributes() {
        let field: syn::Field = parse_quote! {
            #[weave(serialize, previously = "years")]
            age: i32
        };
        let attrs = parse_field_attrs(&field.attrs).unwrap();
        assert!(attrs.serialize);
        assert!(!attrs.skip);
        assert_eq!(attrs.previously, vec!["years"]);

        let bad: syn::Field = parse_quote! {
            #[weave(skip, serialize)]
            age: i32
        };
        assert!(parse_field_attrs(&bad.attrs).is_err());
    }
}
