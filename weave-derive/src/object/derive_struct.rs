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
//! Expansion for structs.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DataStruct, DeriveInput, Generics};

use crate::attrs::ContainerAttrs;
use crate::object::{members, misc};
use crate::util::{construct, field_default, source_fields, SourceField};

fn gen_create_default(
    data: &DataStruct,
    fields: &[SourceField],
    attrs: &ContainerAttrs,
) -> TokenStream {
    if attrs.use_default {
        return quote! { <Self as ::std::default::Default>::default() };
    }
    let values: Vec<_> = fields.iter().map(field_default).collect();
    construct(quote! { Self }, &data.fields, &values)
}

fn gen_capabilities(attrs: &ContainerAttrs) -> TokenStream {
    let codecs = quote! { ::weave_core::serializer };
    let capabilities = if attrs.self_format {
        let always = if attrs.always_self_format {
            quote! { .always_self_format() }
        } else {
            quote! {}
        };
        quote! {
            ::weave_core::Capabilities::new()
                .shape::<#codecs::self_format::SelfFormatCodec<Self>>(::weave_core::Shape::SelfFormat)
                #always
        }
    } else if attrs.object_data {
        quote! {
            ::weave_core::Capabilities::new()
                .shape::<#codecs::object_data::ObjectDataCodec<Self>>(::weave_core::Shape::ObjectData)
        }
    } else if attrs.derived_map.is_some() {
        quote! {
            ::weave_core::Capabilities::new()
                .shape_with_policy::<#codecs::map::DerivedMapCodec<Self>>(::weave_core::Shape::DerivedMap)
        }
    } else {
        return quote! {};
    };
    quote! {
        fn capabilities() -> ::weave_core::Capabilities<Self> {
            #capabilities
        }
    }
}

fn gen_derived_map(
    ast: &DeriveInput,
    generics: &Generics,
    fields: &[SourceField],
    attrs: &ContainerAttrs,
) -> syn::Result<TokenStream> {
    let Some(map_field) = &attrs.derived_map else {
        return Ok(quote! {});
    };
    let field = fields
        .iter()
        .find(|f| f.member_name == map_field.value())
        .ok_or_else(|| syn::Error::new_spanned(map_field, "no field of this name"))?;
    let ty = &field.field.ty;
    let access = field.accessor();
    let header = misc::impl_header(ast, generics, quote! { ::weave_core::DerivedMap });
    Ok(quote! {
        #header {
            type Map = #ty;

            #[inline(always)]
            fn map(&self) -> &#ty {
                &self.#access
            }

            #[inline(always)]
            fn map_mut(&mut self) -> &mut #ty {
                &mut self.#access
            }
        }
    })
}

pub fn derive_struct(
    ast: &DeriveInput,
    data: &DataStruct,
    generics: &Generics,
    attrs: &ContainerAttrs,
) -> syn::Result<TokenStream> {
    let fields = source_fields(&data.fields)?;
    let map_field = attrs.derived_map.as_ref().map(|lit| lit.value());

    let header = misc::impl_header(ast, generics, quote! { ::weave_core::Serializable });
    let type_of = misc::gen_type_of(ast);
    let create_default = gen_create_default(data, &fields, attrs);
    let marker = misc::gen_marker(attrs);
    let members = members::gen_members(&fields, map_field.as_deref());
    let callbacks = misc::gen_callbacks(attrs);
    let capabilities = gen_capabilities(attrs);
    let dependencies = members::gen_register_dependencies(&fields);
    let derived_map = gen_derived_map(ast, generics, &fields, attrs)?;
    let registration = misc::gen_registration(ast);

    Ok(quote! {
        const _: () = {
            #header {
                fn type_of() -> ::weave_core::Type {
                    #type_of
                }

                fn create_default() -> Self {
                    #create_default
                }

                #marker
                #members
                #callbacks
                #capabilities
                #dependencies
            }

            #derived_map

            #registration
        };
    })
}
