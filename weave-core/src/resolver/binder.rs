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

//! Two-way mapping between runtime types and stable names.
//!
//! Name grammar:
//!
//! ```text
//! full      := type [ "," module ]
//! type      := ( path [ "[" arg { "," arg } "]" ] | "[" full "]" ) { rank }
//! arg       := type
//! rank      := "[" { "," } "]"
//! ```
//!
//! The trailing module is the context module: the module of the first
//! non-core type in the name. Paths inside the name resolve against it first
//! and against the core module second. An argument from a third module is
//! written bracketed with its own module, `[path, module]`. A `[` directly
//! followed by `,` or `]` is always a rank marker, so `i32[,]` is a rank-2
//! array while `i32[][]` is an array of arrays; markers apply left to right.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::resolver::registry::TypeRegistry;
use crate::serializer::Serializable;
use crate::types::{Type, TypeKind};

pub struct TypeBinder {
    registry: &'static TypeRegistry,
    renames: RwLock<HashMap<String, Type>>,
    names: RwLock<HashMap<Type, Arc<str>>>,
    types: RwLock<HashMap<String, Type>>,
    by_type_id: RwLock<HashMap<TypeId, Arc<str>>>,
}

impl Default for TypeBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeBinder {
    pub fn new() -> Self {
        TypeBinder {
            registry: TypeRegistry::global(),
            renames: RwLock::default(),
            names: RwLock::default(),
            types: RwLock::default(),
            by_type_id: RwLock::default(),
        }
    }

    pub fn global() -> Arc<TypeBinder> {
        static GLOBAL: OnceLock<Arc<TypeBinder>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(TypeBinder::new())).clone()
    }

    #[inline(always)]
    pub fn registry(&self) -> &'static TypeRegistry {
        self.registry
    }

    /// Makes `former_name` bind to `ty`. Rules are consulted before any other
    /// resolution.
    pub fn add_rename(&self, former_name: impl Into<String>, ty: Type) {
        self.renames
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(former_name.into(), ty);
        self.types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Name of `T`, registering the type on first use.
    pub fn name_of<T: Serializable>(&self) -> Arc<str> {
        let type_id = TypeId::of::<T>();
        if let Some(name) = self
            .by_type_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return name.clone();
        }
        self.registry.ensure::<T>();
        let name = self.bind_to_name(&T::type_of());
        self.by_type_id
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(type_id)
            .or_insert(name)
            .clone()
    }

    pub fn bind_to_name(&self, ty: &Type) -> Arc<str> {
        if let Some(name) = self
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(ty)
        {
            return name.clone();
        }
        let context = first_module(ty).unwrap_or_default();
        let mut name = String::new();
        compose(ty, context, &mut name);
        if !context.is_empty() {
            name.push_str(", ");
            name.push_str(context);
        }
        // A concurrent first lookup may have won the race; keep its name.
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(ty.clone())
            .or_insert_with(|| name.into())
            .clone()
    }

    /// Resolves a name written by [`bind_to_name`](Self::bind_to_name), or
    /// by an earlier version of the program. `None` when nothing matches.
    pub fn bind_to_type(&self, name: &str) -> Option<Type> {
        if let Some(ty) = self
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Some(ty.clone());
        }
        let renamed = self
            .renames
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        let ty = renamed.or_else(|| self.parse(name))?;
        let cached = self
            .types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_owned())
            .or_insert(ty)
            .clone();
        Some(cached)
    }

    fn parse(&self, name: &str) -> Option<Type> {
        let (body, module) = split_module(name);
        let mut parser = Parser::new(body);
        let ty = self.parse_type(&mut parser, module)?;
        parser.skip_ws();
        if !parser.at_end() {
            log::debug!("trailing characters in type name `{name}`");
            return None;
        }
        Some(ty)
    }

    fn parse_type(&self, p: &mut Parser<'_>, module: &str) -> Option<Type> {
        p.skip_ws();
        let mut ty = if p.peek() == Some(b'[') {
            let inner = p.take_bracketed()?;
            self.parse(inner)?
        } else {
            let path = p.take_path();
            if path.is_empty() {
                return None;
            }
            if p.peek() == Some(b'[') && !p.at_rank_marker() {
                p.bump();
                let mut args = Vec::new();
                loop {
                    args.push(self.parse_type(p, module)?);
                    p.skip_ws();
                    match p.next()? {
                        b',' => continue,
                        b']' => break,
                        _ => return None,
                    }
                }
                let definition = self.registry.find_definition(module, path, args.len())?;
                Type::generic(definition, args)
            } else {
                Type::named(self.registry.find_definition(module, path, 0)?)
            }
        };
        while p.at_rank_marker() {
            p.bump();
            let mut rank = 1;
            loop {
                match p.next()? {
                    b',' => rank += 1,
                    b']' => break,
                    _ => return None,
                }
            }
            ty = Type::array(ty, rank);
        }
        Some(ty)
    }
}

/// Module of the first non-core named type, outermost first.
fn first_module(ty: &Type) -> Option<&str> {
    match ty.kind() {
        TypeKind::Named(def) => (!def.is_core()).then(|| def.module()),
        TypeKind::Generic(def, args) => {
            if !def.is_core() {
                return Some(def.module());
            }
            args.iter().find_map(first_module)
        }
        TypeKind::Array(element, _) => first_module(element),
    }
}

fn compose(ty: &Type, context: &str, out: &mut String) {
    match ty.kind() {
        TypeKind::Named(def) => out.push_str(def.path()),
        TypeKind::Generic(def, args) => {
            out.push_str(def.path());
            out.push('[');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                compose_arg(arg, context, out);
            }
            out.push(']');
        }
        TypeKind::Array(element, rank) => {
            compose(element, context, out);
            out.push('[');
            for _ in 1..*rank {
                out.push(',');
            }
            out.push(']');
        }
    }
}

fn compose_arg(arg: &Type, context: &str, out: &mut String) {
    match first_module(arg) {
        Some(module) if module != context => {
            out.push('[');
            compose(arg, module, out);
            out.push_str(", ");
            out.push_str(module);
            out.push(']');
        }
        _ => compose(arg, context, out),
    }
}

/// Splits `body, module` at the last top-level comma.
fn split_module(name: &str) -> (&str, &str) {
    let mut depth = 0usize;
    let mut split = None;
    for (i, b) in name.bytes().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => split = Some(i),
            _ => {}
        }
    }
    match split {
        Some(i) => (name[..i].trim(), name[i + 1..].trim()),
        None => (name.trim(), ""),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn next(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn at_rank_marker(&self) -> bool {
        self.peek() == Some(b'[') && matches!(self.peek_at(1), Some(b',') | Some(b']'))
    }

    fn take_path(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|b| !matches!(b, b'[' | b']' | b',')) {
            self.pos += 1;
        }
        self.src[start..self.pos].trim()
    }

    /// Consumes `[ ... ]` with nesting and returns what is inside.
    fn take_bracketed(&mut self) -> Option<&'a str> {
        let start = self.pos + 1;
        let mut depth = 0usize;
        while let Some(b) = self.next() {
            match b {
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&self.src[start..self.pos - 1]);
                    }
                }
                _ => {}
            }
        }
        None
    }
}
