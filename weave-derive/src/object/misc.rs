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
//! Pieces shared by struct and enum expansions.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Generics};

use crate::attrs::ContainerAttrs;
use crate::util::type_params;

/// `type_of` body. Non-generic types build their `Type` once.
pub fn gen_type_of(ast: &DeriveInput) -> TokenStream {
    let name = ast.ident.to_string();
    let params = type_params(&ast.generics);
    let arity = params.len();
    let definition = quote! {
        ::weave_core::TypeDefinition::from_module_path(::std::module_path!(), #name, #arity)
    };
    if params.is_empty() {
        quote! {
            static TYPE: ::std::sync::OnceLock<::weave_core::Type> = ::std::sync::OnceLock::new();
            TYPE.get_or_init(|| ::weave_core::Type::named(#definition)).clone()
        }
    } else {
        quote! {
            ::weave_core::Type::generic(
                #definition,
                ::std::vec![#(<#params as ::weave_core::Serializable>::type_of()),*],
            )
        }
    }
}

pub fn gen_marker(attrs: &ContainerAttrs) -> TokenStream {
    let marked = attrs.serializable;
    let previously = &attrs.previously;
    let former = if previously.is_empty() {
        quote! {}
    } else {
        quote! {
            fn former_type_names() -> &'static [&'static str] {
                &[#(#previously),*]
            }
        }
    };
    quote! {
        #[inline(always)]
        fn is_marked() -> bool {
            #marked
        }

        #former
    }
}

pub fn gen_callbacks(attrs: &ContainerAttrs) -> TokenStream {
    if !attrs.has_callbacks() {
        return quote! {};
    }
    let slot = |callback: &Option<crate::attrs::Callback>| match callback {
        Some(callback) => {
            let path = callback.to_tokens();
            quote! { ::std::option::Option::Some(#path) }
        }
        None => quote! { ::std::option::Option::None },
    };
    let on_serializing = slot(&attrs.on_serializing);
    let on_serialized = slot(&attrs.on_serialized);
    let on_deserializing = slot(&attrs.on_deserializing);
    let on_deserialized = slot(&attrs.on_deserialized);
    let on_deserialization = slot(&attrs.on_deserialization);
    let substitute = slot(&attrs.substitute);
    quote! {
        fn callbacks() -> ::weave_core::Callbacks<Self> {
            ::weave_core::Callbacks {
                on_serializing: #on_serializing,
                on_serialized: #on_serialized,
                on_deserializing: #on_deserializing,
                on_deserialized: #on_deserialized,
                on_deserialization: #on_deserialization,
                substitute: #substitute,
            }
        }
    }
}

/// Startup registration with the global registry. Generic types are
/// registered when first located, with their arguments closed.
pub fn gen_registration(ast: &DeriveInput) -> TokenStream {
    if !ast.generics.params.is_empty() {
        return quote! {};
    }
    let name = &ast.ident;
    quote! {
        fn __weave_register(registry: &::weave_core::TypeRegistry) {
            registry.register::<#name>();
        }

        ::weave_core::inventory::submit! {
            ::weave_core::TypeEntry::new(__weave_register)
        }
    }
}

/// `impl<..> Trait for Name<..> where ..` header pieces.
pub fn impl_header(
    ast: &DeriveInput,
    generics: &Generics,
    trait_path: TokenStream,
) -> TokenStream {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    quote! { impl #impl_generics #trait_path for #name #ty_generics #where_clause }
}
