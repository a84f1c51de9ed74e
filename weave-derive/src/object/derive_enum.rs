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
//! Expansion for enums.
//!
//! Fieldless enums are primitives holding their discriminant. Enums with
//! data format themselves through `SelfFormatter`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DataEnum, DeriveInput, Expr, Fields, Generics, Variant};

use crate::attrs::{parse_variant_attrs, ContainerAttrs};
use crate::object::misc;
use crate::util::{construct, field_default, source_fields, SourceField};

fn default_variant(data: &DataEnum) -> syn::Result<&Variant> {
    data.variants
        .iter()
        .find(|v| v.attrs.iter().any(|attr| attr.path().is_ident("default")))
        .or_else(|| data.variants.first())
        .ok_or_else(|| {
            syn::Error::new(
                proc_macro2::Span::call_site(),
                "#[derive(Serializable)] needs at least one variant",
            )
        })
}

fn gen_create_default(data: &DataEnum, attrs: &ContainerAttrs) -> syn::Result<TokenStream> {
    if attrs.use_default {
        return Ok(quote! { <Self as ::std::default::Default>::default() });
    }
    let variant = default_variant(data)?;
    let ident = &variant.ident;
    let fields = source_fields(&variant.fields)?;
    let values: Vec<_> = fields.iter().map(field_default).collect();
    Ok(construct(quote! { Self::#ident }, &variant.fields, &values))
}

/// Discriminant of every variant, following the language's numbering:
/// explicit values restart the count.
fn discriminants(data: &DataEnum) -> Vec<TokenStream> {
    let mut base: Option<&Expr> = None;
    let mut offset = 0i64;
    data.variants
        .iter()
        .map(|variant| {
            if let Some((_, expr)) = &variant.discriminant {
                base = Some(expr);
                offset = 0;
            }
            let value = match base {
                Some(expr) => quote! { ((#expr) as i64 + #offset) },
                None => quote! { #offset },
            };
            offset += 1;
            value
        })
        .collect()
}

fn derive_fieldless(
    ast: &DeriveInput,
    data: &DataEnum,
    generics: &Generics,
    attrs: &ContainerAttrs,
) -> syn::Result<TokenStream> {
    let header = misc::impl_header(ast, generics, quote! { ::weave_core::Serializable });
    let type_of = misc::gen_type_of(ast);
    let create_default = gen_create_default(data, attrs)?;
    let marker = misc::gen_marker(attrs);
    let registration = misc::gen_registration(ast);
    let idents: Vec<_> = data.variants.iter().map(|v| &v.ident).collect();
    let values = discriminants(data);
    let enum_ = quote! { ::weave_core::serializer::enum_ };

    Ok(quote! {
        const _: () = {
            #header {
                const PRIMITIVE: bool = true;

                fn type_of() -> ::weave_core::Type {
                    #type_of
                }

                fn create_default() -> Self {
                    #create_default
                }

                #marker

                fn write_value(
                    &self,
                    name: ::std::option::Option<&str>,
                    writer: &mut dyn ::weave_core::DataWriter,
                    _context: &mut ::weave_core::SerializationContext,
                ) -> ::std::result::Result<(), ::weave_core::Error> {
                    let discriminant: i64 = match self {
                        #(Self::#idents => #values,)*
                    };
                    writer.write_i64(name, discriminant);
                    ::std::result::Result::Ok(())
                }

                fn read_value(
                    reader: &mut dyn ::weave_core::DataReader,
                    context: &mut ::weave_core::DeserializationContext,
                ) -> ::std::result::Result<Self, ::weave_core::Error> {
                    match #enum_::read_discriminant::<Self>(reader, context)? {
                        #(::std::option::Option::Some(d) if d == #values => ::std::result::Result::Ok(Self::#idents),)*
                        ::std::option::Option::Some(d) => #enum_::unknown_variant::<Self>(context, d),
                        ::std::option::Option::None => ::std::result::Result::Ok(Self::create_default()),
                    }
                }

                fn write_content(
                    &self,
                    writer: &mut dyn ::weave_core::DataWriter,
                    context: &mut ::weave_core::SerializationContext,
                ) -> ::std::result::Result<(), ::weave_core::Error> {
                    self.write_value(::std::option::Option::None, writer, context)
                }

                fn read_content(
                    reader: &mut dyn ::weave_core::DataReader,
                    context: &mut ::weave_core::DeserializationContext,
                ) -> ::std::result::Result<Self, ::weave_core::Error> {
                    Self::read_value(reader, context)
                }
            }

            #registration
        };
    })
}

struct VariantInfo<'a> {
    variant: &'a Variant,
    names: Vec<String>,
    fields: Vec<SourceField<'a>>,
}

fn gen_write_arm(info: &VariantInfo) -> TokenStream {
    let ident = &info.variant.ident;
    let variant_name = &info.names[0];
    let bindings: Vec<_> = info
        .fields
        .iter()
        .map(|f| {
            if f.attrs.skip {
                quote! { _ }
            } else {
                let binding = f.binding();
                quote! { #binding }
            }
        })
        .collect();
    let pattern = construct(quote! { Self::#ident }, &info.variant.fields, &bindings);
    let writes = info.fields.iter().filter(|f| !f.attrs.skip).map(|f| {
        let ty = &f.field.ty;
        let binding = f.binding();
        let name = &f.member_name;
        quote! {
            let result = <#ty as ::weave_core::Serializable>::write_value(
                #binding,
                ::std::option::Option::Some(#name),
                writer,
                context,
            );
            ::weave_core::serializer::base::contain(result, context.debug_mut())?;
        }
    });
    quote! {
        #pattern => {
            ::weave_core::serializer::enum_::write_variant(writer, #variant_name);
            #(#writes)*
        }
    }
}

fn gen_read_arm(info: &VariantInfo) -> TokenStream {
    let ident = &info.variant.ident;
    let names = &info.names;
    let bindings: Vec<_> = info.fields.iter().map(|f| f.binding()).collect();
    let values: Vec<_> = bindings.iter().map(|b| quote! { #b }).collect();
    let value = construct(quote! { Self::#ident }, &info.variant.fields, &values);
    let read_fields: Vec<_> = info.fields.iter().filter(|f| !f.attrs.skip).collect();
    if read_fields.is_empty() {
        let defaults = info.fields.iter().map(|f| {
            let binding = f.binding();
            let default = field_default(f);
            quote! { let #binding = #default; }
        });
        return quote! {
            #(#names)|* => {
                #(#defaults)*
                #value
            }
        };
    }
    let declarations = info.fields.iter().map(|f| {
        let binding = f.binding();
        let default = field_default(f);
        if f.attrs.skip {
            quote! { let #binding = #default; }
        } else {
            quote! { let mut #binding = #default; }
        }
    });
    let visits = read_fields.iter().map(|f| {
        let ty = &f.field.ty;
        let binding = f.binding();
        let name = &f.member_name;
        let former = &f.attrs.previously;
        quote! {
            #name #(| #former)* => {
                let result = <#ty as ::weave_core::Serializable>::read_value(reader, context)
                    .map(|value| #binding = value);
                ::weave_core::serializer::base::contain(result, context.debug_mut())?;
                ::std::result::Result::Ok(true)
            }
        }
    });
    quote! {
        #(#names)|* => {
            #(#declarations)*
            ::weave_core::serializer::complex::for_each_named(reader, context, |name, reader, context| {
                match name {
                    #(#visits)*
                    _ => ::std::result::Result::Ok(false),
                }
            })?;
            #value
        }
    }
}

fn derive_with_data(
    ast: &DeriveInput,
    data: &DataEnum,
    generics: &Generics,
    attrs: &ContainerAttrs,
) -> syn::Result<TokenStream> {
    let mut variants = Vec::with_capacity(data.variants.len());
    let mut field_types = Vec::new();
    for variant in &data.variants {
        let variant_attrs = parse_variant_attrs(&variant.attrs)?;
        let mut names = vec![variant.ident.to_string()];
        names.extend(variant_attrs.previously);
        let fields = source_fields(&variant.fields)?;
        field_types.extend(fields.iter().filter(|f| !f.attrs.skip).map(|f| f.field.ty.clone()));
        variants.push(VariantInfo {
            variant,
            names,
            fields,
        });
    }

    let header = misc::impl_header(ast, generics, quote! { ::weave_core::Serializable });
    let formatter = misc::impl_header(ast, generics, quote! { ::weave_core::SelfFormatter });
    let type_of = misc::gen_type_of(ast);
    let create_default = gen_create_default(data, attrs)?;
    let marker = misc::gen_marker(attrs);
    let callbacks = misc::gen_callbacks(attrs);
    let registration = misc::gen_registration(ast);
    let always = if attrs.always_self_format {
        quote! { .always_self_format() }
    } else {
        quote! {}
    };
    let dependencies = if field_types.is_empty() {
        quote! {}
    } else {
        quote! {
            fn register_dependencies(registry: &::weave_core::TypeRegistry) {
                #(registry.ensure::<#field_types>();)*
            }
        }
    };
    let write_arms = variants.iter().map(gen_write_arm);
    let read_arms = variants.iter().map(gen_read_arm);
    // With `self_format` the type brings its own formatter.
    let formatter = if attrs.self_format {
        quote! {}
    } else {
        quote! {
            #formatter {
                fn write_self(
                    &self,
                    writer: &mut dyn ::weave_core::DataWriter,
                    context: &mut ::weave_core::SerializationContext,
                ) -> ::std::result::Result<(), ::weave_core::Error> {
                    match self {
                        #(#write_arms)*
                    }
                    ::std::result::Result::Ok(())
                }

                fn read_self(
                    &mut self,
                    reader: &mut dyn ::weave_core::DataReader,
                    context: &mut ::weave_core::DeserializationContext,
                ) -> ::std::result::Result<(), ::weave_core::Error> {
                    let ::std::option::Option::Some(variant) =
                        ::weave_core::serializer::enum_::read_variant::<Self>(reader, context)?
                    else {
                        return ::std::result::Result::Ok(());
                    };
                    *self = match variant.as_str() {
                        #(#read_arms)*
                        other => ::weave_core::serializer::enum_::unknown_variant::<Self>(context, other)?,
                    };
                    ::std::result::Result::Ok(())
                }
            }
        }
    };

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
                #callbacks

                fn capabilities() -> ::weave_core::Capabilities<Self> {
                    ::weave_core::Capabilities::new()
                        .shape::<::weave_core::serializer::self_format::SelfFormatCodec<Self>>(
                            ::weave_core::Shape::SelfFormat,
                        )
                        #always
                }

                #dependencies
            }

            #formatter

            #registration
        };
    })
}

pub fn derive_enum(
    ast: &DeriveInput,
    data: &DataEnum,
    generics: &Generics,
    attrs: &ContainerAttrs,
) -> syn::Result<TokenStream> {
    if attrs.object_data || attrs.derived_map.is_some() {
        return Err(syn::Error::new_spanned(
            &ast.ident,
            "object_data and derived_map apply to structs only",
        ));
    }
    let fieldless = data.variants.iter().all(|v| matches!(v.fields, Fields::Unit));
    if fieldless && !attrs.self_format {
        derive_fieldless(ast, data, generics, attrs)
    } else {
        derive_with_data(ast, data, generics, attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn implicit_discriminants_follow_explicit_ones() {
        let input: syn::ItemEnum = parse_quote! {
            enum Level { Low, Mid = 10, High }
        };
        let data = DataEnum {
            enum_token: input.enum_token,
            brace_token: input.brace_token,
            variants: input.variants,
        };
        let values: Vec<_> = discriminants(&data).iter().map(|v| v.to_string()).collect();
        assert_eq!(values[0], "0i64");
        assert_eq!(values[1], "((10) as i64 + 0i64)");
        assert_eq!(values[2], "((10) as i64 + 1i64)");
    }
}
