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
use syn::{Data, DeriveInput};

use crate::attrs::parse_container_attrs;
use crate::util::bounded_generics;

mod derive_enum;
mod derive_struct;
mod members;
mod misc;

pub fn derive_serializable(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let attrs = parse_container_attrs(&ast.attrs)?;
    let generics = bounded_generics(&ast.generics)?;
    match &ast.data {
        Data::Struct(data) => derive_struct::derive_struct(ast, data, &generics, &attrs),
        Data::Enum(data) => derive_enum::derive_enum(ast, data, &generics, &attrs),
        Data::Union(union) => Err(syn::Error::new_spanned(
            union.union_token,
            "unions cannot derive Serializable",
        )),
    }
}
