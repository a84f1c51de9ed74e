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
//! Per-session state of one serialization or deserialization.
//!
//! A context carries the session's configuration, the diagnostics collected
//! so far, the internal reference table and the external resolver chains.
//! Contexts are reused through [`ContextPool`](super::pool::ContextPool);
//! [`reset`](SerializationContext::reset) returns one to its fresh state.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::debug::DebugContext;
use crate::error::Error;
use crate::policy::PolicyRef;
use crate::resolver::binder::TypeBinder;
use crate::resolver::external::ExternalResolvers;
use crate::resolver::locator::Locator;
use crate::resolver::registry::TypeRegistry;
use crate::serializer::{Codec, Serializable};
use crate::stream::{DataReader, DataWriter};
use crate::types::Type;

/// Assigns session ids to reference-tracked objects on the write side.
///
/// Objects are keyed by the address of their allocation. The graph being
/// written is borrowed for the whole session, so no address can be reused
/// while it is in the table.
#[derive(Default)]
pub struct RefWriter {
    refs: HashMap<usize, i32>,
    next_id: i32,
}

impl RefWriter {
    /// Returns `(true, new_id)` the first time `address` is seen and
    /// `(false, id)` afterwards.
    #[inline(always)]
    pub fn try_register(&mut self, address: usize) -> (bool, i32) {
        if let Some(&id) = self.refs.get(&address) {
            return (false, id);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.refs.insert(address, id);
        (true, id)
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    #[inline(always)]
    pub fn reset(&mut self) {
        self.refs.clear();
        self.next_id = 0;
    }
}

/// Maps session ids back to the shells read so far.
///
/// Ids come from the stream, so they key a map rather than index a table.
#[derive(Default)]
pub struct RefReader {
    refs: HashMap<i32, Box<dyn Any>>,
}

impl RefReader {
    /// Negative ids never name a reference and are ignored.
    pub fn register(&mut self, id: i32, shell: Box<dyn Any>) {
        if id >= 0 {
            self.refs.insert(id, shell);
        }
    }

    pub fn get(&self, id: i32) -> Option<&dyn Any> {
        self.refs.get(&id).map(|shell| shell.as_ref())
    }

    #[inline(always)]
    pub fn reset(&mut self) {
        self.refs.clear();
    }
}

macro_rules! shared_session_api {
    () => {
        #[inline(always)]
        pub fn config(&self) -> &Config {
            &self.config
        }

        #[inline(always)]
        pub fn policy(&self) -> &PolicyRef {
            &self.config.policy
        }

        #[inline(always)]
        pub fn locator(&self) -> &Arc<Locator> {
            &self.locator
        }

        #[inline(always)]
        pub fn binder(&self) -> &Arc<TypeBinder> {
            &self.binder
        }

        #[inline(always)]
        pub fn registry(&self) -> &'static TypeRegistry {
            self.binder.registry()
        }

        #[inline(always)]
        pub fn debug(&self) -> &DebugContext {
            &self.debug
        }

        #[inline(always)]
        pub fn debug_mut(&mut self) -> &mut DebugContext {
            &mut self.debug
        }

        pub fn log_warning(&mut self, message: impl Into<String>) -> Result<(), Error> {
            self.debug.log_warning(message)
        }

        pub fn log_error(&mut self, message: impl Into<String>) -> Result<(), Error> {
            self.debug.log_error(message)
        }

        pub fn log_exception(&mut self, error: Error) -> Result<(), Error> {
            self.debug.log_exception(error)
        }

        /// The codec for `T` under this session's policy.
        pub fn codec_for<T: Serializable>(&self) -> Result<Arc<dyn Codec<T>>, Error> {
            self.locator
                .get::<T>(&self.config.policy, self.config.is_emit_codecs())
        }

        /// The name `T` is written under.
        #[inline(always)]
        pub fn type_name<T: Serializable>(&self) -> Arc<str> {
            self.binder.name_of::<T>()
        }

        pub fn external_resolvers_mut(&mut self) -> &mut ExternalResolvers {
            &mut self.external
        }
    };
}

pub struct SerializationContext {
    config: Config,
    locator: Arc<Locator>,
    binder: Arc<TypeBinder>,
    debug: DebugContext,
    refs: RefWriter,
    external: ExternalResolvers,
}

impl SerializationContext {
    pub fn new(config: Config, locator: Arc<Locator>, binder: Arc<TypeBinder>) -> Self {
        let debug = DebugContext::new(
            config.sink.clone(),
            config.logging,
            config.error_handling,
        );
        SerializationContext {
            config,
            locator,
            binder,
            debug,
            refs: RefWriter::default(),
            external: ExternalResolvers::default(),
        }
    }

    shared_session_api!();

    /// Tracks the object at `address`; see [`RefWriter::try_register`].
    #[inline(always)]
    pub fn try_register_internal_reference(&mut self, address: usize) -> (bool, i32) {
        self.refs.try_register(address)
    }

    /// Writes `shell` as an external reference when one of the chains can
    /// address it. Chains are tried index first, then GUID, then string.
    pub fn try_write_external(
        &self,
        shell: &dyn Any,
        name: Option<&str>,
        writer: &mut dyn DataWriter,
    ) -> bool {
        if self.external.is_empty() {
            return false;
        }
        if let Some(index) = self.external.index.can_reference(shell) {
            writer.write_external_reference_by_index(name, index);
            return true;
        }
        if let Some(guid) = self.external.guid.can_reference(shell) {
            writer.write_external_reference_by_guid(name, guid);
            return true;
        }
        if let Some(key) = self.external.string.can_reference(shell) {
            writer.write_external_reference_by_string(name, &key);
            return true;
        }
        false
    }

    /// Clears all session state, including the external resolvers.
    pub fn reset(&mut self) {
        self.debug.reset();
        self.refs.reset();
        self.external.clear();
    }
}

pub struct DeserializationContext {
    config: Config,
    locator: Arc<Locator>,
    binder: Arc<TypeBinder>,
    debug: DebugContext,
    refs: RefReader,
    external: ExternalResolvers,
}

impl DeserializationContext {
    pub fn new(config: Config, locator: Arc<Locator>, binder: Arc<TypeBinder>) -> Self {
        let debug = DebugContext::new(
            config.sink.clone(),
            config.logging,
            config.error_handling,
        );
        DeserializationContext {
            config,
            locator,
            binder,
            debug,
            refs: RefReader::default(),
            external: ExternalResolvers::default(),
        }
    }

    shared_session_api!();

    pub fn register_internal_reference(&mut self, id: i32, shell: Box<dyn Any>) {
        self.refs.register(id, shell);
    }

    pub fn get_internal_reference(&self, id: i32) -> Option<&dyn Any> {
        self.refs.get(id)
    }

    /// A clone of the shell registered under `id`. A missing id, or a shell
    /// of another type, is reported and reads as `None`.
    pub fn shared_reference<S: Serializable + Clone>(&mut self, id: i32) -> Result<Option<S>, Error> {
        let registered = self.get_internal_reference(id);
        if let Some(shell) = registered.and_then(|s| s.downcast_ref::<S>()) {
            return Ok(Some(shell.clone()));
        }
        let problem = if registered.is_some() {
            "holds another type"
        } else {
            "was never read"
        };
        self.log_warning(format!(
            "internal reference {id} for {} {problem}",
            S::type_of()
        ))?;
        Ok(None)
    }

    /// Binds a type name read from the stream, reporting names that do not
    /// resolve.
    pub fn bind_to_type(&mut self, name: &str) -> Result<Option<Type>, Error> {
        match self.binder.bind_to_type(name) {
            Some(ty) => Ok(Some(ty)),
            None => {
                self.log_warning(format!("cannot resolve type name `{name}`"))?;
                Ok(None)
            }
        }
    }

    /// Whether a node tagged `type_name` may be read as `T`.
    ///
    /// A name binding to another type is reported and rejected. A name that
    /// does not bind is reported, and the node is still read as `T`.
    pub fn accepts<T: Serializable>(&mut self, type_name: &str) -> Result<bool, Error> {
        if *self.binder.name_of::<T>() == *type_name {
            return Ok(true);
        }
        match self.bind_to_type(type_name)? {
            Some(ty) if ty == T::type_of() => Ok(true),
            Some(ty) => {
                self.log_warning(format!(
                    "found a node of {ty} where {} was expected; it is skipped",
                    T::type_of()
                ))?;
                Ok(false)
            }
            None => Ok(true),
        }
    }

    pub fn resolve_external_index(&self, index: i32) -> Option<Box<dyn Any>> {
        self.external.index.try_resolve(&index)
    }

    pub fn resolve_external_guid(&self, guid: Uuid) -> Option<Box<dyn Any>> {
        self.external.guid.try_resolve(&guid)
    }

    pub fn resolve_external_string(&self, key: &str) -> Option<Box<dyn Any>> {
        self.external.string.try_resolve(&key.to_owned())
    }

    /// Clears all session state, including the external resolvers.
    pub fn reset(&mut self) {
        self.debug.reset();
        self.refs.reset();
        self.external.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_ids_follow_first_sight() {
        let mut refs = RefWriter::default();
        assert_eq!(refs.try_register(0x10), (true, 0));
        assert_eq!(refs.try_register(0x20), (true, 1));
        assert_eq!(refs.try_register(0x10), (false, 0));
        refs.reset();
        assert!(refs.is_empty());
        assert_eq!(refs.try_register(0x20), (true, 0));
    }

    #[test]
    fn reader_keys_by_id() {
        let mut refs = RefReader::default();
        refs.register(3, Box::new(7u8));
        assert!(refs.get(0).is_none());
        assert_eq!(refs.get(3).and_then(|v| v.downcast_ref::<u8>()), Some(&7));
        refs.register(-1, Box::new(1u8));
        assert!(refs.get(-1).is_none());
        // A far id costs one entry.
        refs.register(i32::MAX, Box::new(2u8));
        assert_eq!(refs.get(i32::MAX).and_then(|v| v.downcast_ref::<u8>()), Some(&2));
        refs.reset();
        assert!(refs.get(3).is_none());
    }

    #[test]
    fn foreign_names_are_rejected() {
        let mut cx = DeserializationContext::new(
            Config::default(),
            Locator::global(),
            TypeBinder::global(),
        );
        assert!(cx.accepts::<i32>("i32").unwrap());
        assert!(!cx.accepts::<i32>("String").unwrap());
        assert!(cx.accepts::<i32>("NoSuchType, nowhere").unwrap());
        assert_eq!(cx.debug().diagnostics().len(), 2);
    }
}
