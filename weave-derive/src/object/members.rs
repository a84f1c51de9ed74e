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
//! Member lists of structs.

use proc_macro2::TokenStream;
use quote::quote;

use crate::util::SourceField;

fn gen_member(field: &SourceField) -> TokenStream {
    let ty = &field.field.ty;
    let name = &field.member_name;
    let former = &field.attrs.previously;
    let is_public = field.is_public();
    let marked = field.attrs.serialize;
    let access = field.accessor();
    quote! {
        ::weave_core::Member {
            info: ::weave_core::MemberInfo {
                name: #name,
                former_names: &[#(#former),*],
                is_public: #is_public,
                marked: #marked,
                skipped: false,
                value_type: <#ty as ::weave_core::Serializable>::type_of(),
            },
            write: |value, writer, context| {
                <#ty as ::weave_core::Serializable>::write_value(
                    &value.#access,
                    ::std::option::Option::Some(#name),
                    writer,
                    context,
                )
            },
            read: |value, reader, context| {
                value.#access = <#ty as ::weave_core::Serializable>::read_value(reader, context)?;
                ::std::result::Result::Ok(())
            },
        }
    }
}

/// `members` body for the fields that are neither skipped nor excluded.
pub fn gen_members(fields: &[SourceField], excluded: Option<&str>) -> TokenStream {
    let members: Vec<_> = fields
        .iter()
        .filter(|f| !f.attrs.skip && Some(f.member_name.as_str()) != excluded)
        .map(gen_member)
        .collect();
    if members.is_empty() {
        return quote! {};
    }
    quote! {
        fn members() -> ::std::vec::Vec<::weave_core::Member<Self>> {
            ::std::vec![#(#members),*]
        }
    }
}

/// Registers the field types, so names found in a stream can be bound to
/// them.
pub fn gen_register_dependencies(fields: &[SourceField]) -> TokenStream {
    let types: Vec<_> = fields
        .iter()
        .filter(|f| !f.attrs.skip)
        .map(|f| &f.field.ty)
        .collect();
    if types.is_empty() {
        return quote! {};
    }
    quote! {
        fn register_dependencies(registry: &::weave_core::TypeRegistry) {
            #(registry.ensure::<#types>();)*
        }
    }
}
