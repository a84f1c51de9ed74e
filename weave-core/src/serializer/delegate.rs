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
//! Function values.
//!
//! A [`Delegate`] points at a function registered in the method table of
//! the [`TypeRegistry`] under a declaring type and a method name. Only that
//! address is written; reading looks the function back up, so a stream can
//! only refer to functions the reading program registered.

use std::fmt;
use std::marker::PhantomData;

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::TypeRegistry;
use crate::serializer::complex::for_each_named;
use crate::serializer::{Capabilities, Codec, Serializable, Shape};
use crate::stream::{DataReader, DataWriter};
use crate::types::{Type, TypeDefinition};

pub const DELEGATE: TypeDefinition = TypeDefinition::core_generic("Delegate", 2);

const DECLARING_TYPE: &str = "declaringType";
const METHOD_NAME: &str = "methodName";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegateTarget {
    pub declaring_type: Type,
    pub method_name: String,
}

pub struct Delegate<A, R> {
    target: Option<DelegateTarget>,
    function: Option<fn(A) -> R>,
}

impl<A: 'static, R: 'static> Delegate<A, R> {
    pub fn unbound() -> Self {
        Delegate {
            target: None,
            function: None,
        }
    }

    /// Binds to a method of the process-wide registry.
    pub fn bind(declaring_type: Type, method_name: &str) -> Option<Self> {
        Self::bind_in(TypeRegistry::global(), declaring_type, method_name)
    }

    pub fn bind_in(
        registry: &TypeRegistry,
        declaring_type: Type,
        method_name: &str,
    ) -> Option<Self> {
        let function = registry.method::<A, R>(&declaring_type, method_name)?;
        Some(Delegate {
            target: Some(DelegateTarget {
                declaring_type,
                method_name: method_name.to_owned(),
            }),
            function: Some(function),
        })
    }

    pub fn target(&self) -> Option<&DelegateTarget> {
        self.target.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.function.is_some()
    }

    /// Calls the bound function; `None` when unbound.
    pub fn invoke(&self, arg: A) -> Option<R> {
        self.function.map(|f| f(arg))
    }
}

impl<A, R> Clone for Delegate<A, R> {
    fn clone(&self) -> Self {
        Delegate {
            target: self.target.clone(),
            function: self.function,
        }
    }
}

impl<A, R> fmt::Debug for Delegate<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("target", &self.target)
            .field("bound", &self.function.is_some())
            .finish()
    }
}

pub struct DelegateCodec<A, R> {
    _marker: PhantomData<fn() -> (A, R)>,
}

impl<A, R> Default for DelegateCodec<A, R> {
    fn default() -> Self {
        DelegateCodec {
            _marker: PhantomData,
        }
    }
}

impl<A: Serializable, R: Serializable> Codec<Delegate<A, R>> for DelegateCodec<A, R> {
    fn write_impl(
        &self,
        value: &Delegate<A, R>,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        if let Some(target) = &value.target {
            let declaring = context.binder().bind_to_name(&target.declaring_type);
            writer.write_string(Some(DECLARING_TYPE), &declaring);
            writer.write_string(Some(METHOD_NAME), &target.method_name);
        }
        Ok(())
    }

    fn read_impl(
        &self,
        value: &mut Delegate<A, R>,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        let mut declaring = None;
        let mut method = None;
        for_each_named(reader, context, |name, reader, _| {
            match name {
                DECLARING_TYPE => declaring = reader.read_string(),
                METHOD_NAME => method = reader.read_string(),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        let (declaring, method) = match (declaring, method) {
            (None, None) => return Ok(()),
            (Some(declaring), Some(method)) => (declaring, method),
            _ => return context.log_warning("delegate is missing its declaring type or method name"),
        };
        let Some(declaring_type) = context.bind_to_type(&declaring)? else {
            return Ok(());
        };
        match Delegate::bind_in(context.registry(), declaring_type, &method) {
            Some(bound) => *value = bound,
            None => context.log_warning(format!(
                "no method `{method}` of `{declaring}` with this signature is registered"
            ))?,
        }
        Ok(())
    }
}

impl<A: Serializable, R: Serializable> Serializable for Delegate<A, R> {
    fn type_of() -> Type {
        Type::generic(DELEGATE, vec![A::type_of(), R::type_of()])
    }

    fn create_default() -> Self {
        Delegate::unbound()
    }

    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().shape::<DelegateCodec<A, R>>(Shape::Delegate)
    }

    fn register_dependencies(registry: &TypeRegistry) {
        registry.ensure::<A>();
        registry.ensure::<R>();
    }
}
