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

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Kind of one tagged unit in an entry stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum EntryType {
    Invalid = 0,
    String = 1,
    Guid = 2,
    Integer = 3,
    FloatingPoint = 4,
    Boolean = 5,
    Null = 6,
    StartOfNode = 7,
    EndOfNode = 8,
    StartOfArray = 9,
    EndOfArray = 10,
    InternalReference = 11,
    ExternalReferenceByIndex = 12,
    ExternalReferenceByGuid = 13,
    ExternalReferenceByString = 14,
    PrimitiveArray = 15,
    EndOfStream = 16,
}

impl EntryType {
    /// Entries that close a level: callers iterating children stop here.
    #[inline(always)]
    pub fn is_boundary(self) -> bool {
        matches!(
            self,
            EntryType::EndOfNode | EntryType::EndOfArray | EntryType::EndOfStream
        )
    }
}

/// Module of the built-in types. Never written into type names.
pub const CORE_MODULE: &str = "";

/// The generic-free part of a type: a path inside a module plus the number of
/// type parameters it takes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeDefinition {
    path: Cow<'static, str>,
    module: Cow<'static, str>,
    arity: usize,
}

impl TypeDefinition {
    pub const fn core(path: &'static str) -> Self {
        TypeDefinition {
            path: Cow::Borrowed(path),
            module: Cow::Borrowed(CORE_MODULE),
            arity: 0,
        }
    }

    pub const fn core_generic(path: &'static str, arity: usize) -> Self {
        TypeDefinition {
            path: Cow::Borrowed(path),
            module: Cow::Borrowed(CORE_MODULE),
            arity,
        }
    }

    pub fn new(
        path: impl Into<Cow<'static, str>>,
        module: impl Into<Cow<'static, str>>,
        arity: usize,
    ) -> Self {
        TypeDefinition {
            path: path.into(),
            module: module.into(),
            arity,
        }
    }

    /// Builds the definition of a type declared at `module_path!()`.
    ///
    /// The first segment of the module path is the crate and becomes the
    /// module; the remaining segments prefix the type name.
    pub fn from_module_path(module_path: &'static str, ident: &'static str, arity: usize) -> Self {
        match module_path.split_once("::") {
            Some((krate, rest)) => {
                TypeDefinition::new(format!("{rest}::{ident}"), krate, arity)
            }
            None => TypeDefinition {
                path: Cow::Borrowed(ident),
                module: Cow::Borrowed(module_path),
                arity,
            },
        }
    }

    #[inline(always)]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline(always)]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[inline(always)]
    pub fn arity(&self) -> usize {
        self.arity
    }

    #[inline(always)]
    pub fn is_core(&self) -> bool {
        self.module == CORE_MODULE
    }

    /// Last segment of the path.
    pub fn simple_name(&self) -> &str {
        self.path.rsplit("::").next().unwrap_or(&self.path)
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Named(TypeDefinition),
    Generic(TypeDefinition, Vec<Type>),
    Array(Type, usize),
}

/// Structural runtime type descriptor.
///
/// Two descriptors are equal when they describe the same closed type, no
/// matter where they were built, so a `Type` parsed back from a stream
/// compares equal to `T::type_of()`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Type(Arc<TypeKind>);

impl Type {
    pub fn named(definition: TypeDefinition) -> Type {
        Type(Arc::new(TypeKind::Named(definition)))
    }

    pub fn generic(definition: TypeDefinition, args: Vec<Type>) -> Type {
        debug_assert_eq!(definition.arity(), args.len());
        Type(Arc::new(TypeKind::Generic(definition, args)))
    }

    /// Array of `element` with `rank` dimensions; rank 0 is treated as 1.
    pub fn array(element: Type, rank: usize) -> Type {
        Type(Arc::new(TypeKind::Array(element, rank.max(1))))
    }

    #[inline(always)]
    pub fn kind(&self) -> &TypeKind {
        &self.0
    }

    /// The definition of a named or generic type; `None` for arrays.
    pub fn definition(&self) -> Option<&TypeDefinition> {
        match &*self.0 {
            TypeKind::Named(def) | TypeKind::Generic(def, _) => Some(def),
            TypeKind::Array(..) => None,
        }
    }

    /// Generic arguments, empty for anything but a generic type.
    pub fn args(&self) -> &[Type] {
        match &*self.0 {
            TypeKind::Generic(_, args) => args,
            _ => &[],
        }
    }

    pub fn is_generic(&self) -> bool {
        matches!(&*self.0, TypeKind::Generic(..))
    }

    pub fn is_array(&self) -> bool {
        matches!(&*self.0, TypeKind::Array(..))
    }

    pub fn element(&self) -> Option<&Type> {
        match &*self.0 {
            TypeKind::Array(element, _) => Some(element),
            _ => None,
        }
    }

    pub fn rank(&self) -> usize {
        match &*self.0 {
            TypeKind::Array(_, rank) => *rank,
            _ => 0,
        }
    }

    /// Module of the outermost named part, looking through arrays.
    pub fn module(&self) -> &str {
        match &*self.0 {
            TypeKind::Named(def) | TypeKind::Generic(def, _) => def.module(),
            TypeKind::Array(element, _) => element.module(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            TypeKind::Named(def) => f.write_str(def.path()),
            TypeKind::Generic(def, args) => {
                write!(f, "{}<", def.path())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            TypeKind::Array(element, rank) => {
                write!(f, "{element}[")?;
                for _ in 1..*rank {
                    f.write_str(",")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({self})")
    }
}
