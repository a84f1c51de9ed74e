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
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_quote, Field, Fields, GenericParam, Generics, Ident, Index, Visibility};

use crate::attrs::{parse_field_attrs, FieldAttrs};

/// A source field with the name it is written under.
///
/// Named fields keep their identifier; positional fields are written as
/// `item1`, `item2`... in declaration order.
pub struct SourceField<'a> {
    pub field: &'a Field,
    pub index: usize,
    pub member_name: String,
    pub attrs: FieldAttrs,
}

impl SourceField<'_> {
    /// `self.<field>` style accessor: the identifier or the tuple index.
    pub fn accessor(&self) -> TokenStream {
        match &self.field.ident {
            Some(ident) => quote! { #ident },
            None => {
                let index = Index::from(self.index);
                quote! { #index }
            }
        }
    }

    /// Name of a local binding holding this field in a pattern.
    pub fn binding(&self) -> Ident {
        match &self.field.ident {
            Some(ident) => format_ident!("__{}", ident),
            None => format_ident!("__field{}", self.index),
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self.field.vis, Visibility::Public(_))
    }
}

pub fn source_fields(fields: &Fields) -> syn::Result<Vec<SourceField<'_>>> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let member_name = match &field.ident {
                Some(ident) => ident.to_string().trim_start_matches("r#").to_owned(),
                None => format!("item{}", index + 1),
            };
            Ok(SourceField {
                field,
                index,
                member_name,
                attrs: parse_field_attrs(&field.attrs)?,
            })
        })
        .collect()
}

/// `Self { a: .., b: .. }`, `Self(.., ..)` or `Self` for the given field
/// shape; `path` replaces `Self` for enum variants.
pub fn construct(path: TokenStream, fields: &Fields, values: &[TokenStream]) -> TokenStream {
    match fields {
        Fields::Named(named) => {
            let idents = named.named.iter().map(|f| &f.ident);
            quote! { #path { #(#idents: #values),* } }
        }
        Fields::Unnamed(_) => quote! { #path( #(#values),* ) },
        Fields::Unit => path,
    }
}

/// The default value of one field: `Default` for skipped fields, the
/// type's own default otherwise.
pub fn field_default(field: &SourceField) -> TokenStream {
    let ty = &field.field.ty;
    if field.attrs.skip {
        quote! { <#ty as ::std::default::Default>::default() }
    } else {
        quote! { <#ty as ::weave_core::Serializable>::create_default() }
    }
}

/// Generics with a `Serializable` bound on every type parameter. Lifetime
/// and const parameters are rejected since serializable types are
/// `'static` and named by their type arguments only.
pub fn bounded_generics(generics: &Generics) -> syn::Result<Generics> {
    let mut generics = generics.clone();
    let mut bounded = Vec::new();
    for param in &generics.params {
        match param {
            GenericParam::Type(tp) => bounded.push(tp.ident.clone()),
            GenericParam::Lifetime(lt) => {
                return Err(syn::Error::new_spanned(
                    lt,
                    "serializable types cannot borrow; remove the lifetime parameter",
                ))
            }
            GenericParam::Const(cp) => {
                return Err(syn::Error::new_spanned(
                    cp,
                    "const parameters are not supported by #[derive(Serializable)]",
                ))
            }
        }
    }
    let where_clause = generics.make_where_clause();
    for ident in bounded {
        where_clause
            .predicates
            .push(parse_quote! { #ident: ::weave_core::Serializable });
    }
    Ok(generics)
}

pub fn type_params(generics: &Generics) -> Vec<&Ident> {
    generics.type_params().map(|tp| &tp.ident).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_fields_are_numbered_from_one() {
        let input: syn::ItemStruct = parse_quote! { struct Pair(i32, #[weave(skip)] String); };
        let fields = source_fields(&input.fields).unwrap();
        assert_eq!(fields[0].member_name, "item1");
        assert_eq!(fields[1].member_name, "item2");
        assert!(fields[1].attrs.skip);
        assert_eq!(fields[1].accessor().to_string(), "1");
    }

    #[test]
    fn raw_identifiers_lose_their_prefix() {
        let input: syn::ItemStruct = parse_quote! { struct Item { r#type: String } };
        let fields = source_fields(&input.fields).unwrap();
        assert_eq!(fields[0].member_name, "type");
    }

    #[test]
    fn rejects_lifetimes() {
        let input: syn::ItemStruct = parse_quote! { struct View<'a> { name: &'a str } };
        assert!(bounded_generics(&input.generics).is_err());
    }
}
