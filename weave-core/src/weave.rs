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
use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::debug::{DiagnosticSink, ErrorHandlingPolicy, LoggingPolicy, Report};
use crate::error::Error;
use crate::policy::PolicyRef;
use crate::resolver::binder::TypeBinder;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::external::{ExternalReferenceResolver, ExternalResolvers};
use crate::resolver::locator::{GenericCodecFactory, Locator};
use crate::resolver::pool::ContextPool;
use crate::resolver::registry::TypeRegistry;
use crate::serializer::{Codec, Serializable};
use crate::stream::{
    BinaryDataReader, BinaryDataWriter, DataFormat, DataReader, DataWriter, JsonDataReader,
    JsonDataWriter, NodesDataReader, NodesDataWriter, SerializationNode, MAX_DEPTH,
};
use crate::types::{Type, TypeDefinition};

/// The weave serializer.
///
/// A `Weave` holds a [`Config`], the [`Locator`] and [`TypeBinder`] it
/// resolves codecs and names with, the external reference resolvers handed
/// to every session, and pools of session contexts. It is cheap to share
/// between threads; every call runs its own session.
///
/// # Examples
///
/// ```rust, ignore
/// use weave::{Weave, Serializable, DataFormat};
///
/// #[derive(Serializable)]
/// struct Point { x: i32, y: i32 }
///
/// let weave = Weave::default();
/// let bytes = weave.serialize(&Point { x: 1, y: 2 }, DataFormat::Binary)?;
/// let point: Point = weave.deserialize(&bytes, DataFormat::Binary)?;
/// ```
///
/// Custom configuration:
///
/// ```rust
/// use weave_core::{ErrorHandlingPolicy, Policies, Weave};
///
/// let weave = Weave::default()
///     .policy(Policies::strict())
///     .error_handling(ErrorHandlingPolicy::ThrowOnErrors)
///     .emit_codecs(false);
/// ```
pub struct Weave {
    config: Config,
    locator: Arc<Locator>,
    binder: Arc<TypeBinder>,
    resolvers: ExternalResolvers,
    write_context_pool: ContextPool<SerializationContext>,
    read_context_pool: ContextPool<DeserializationContext>,
}

impl Default for Weave {
    fn default() -> Self {
        Weave::with_parts(Config::default(), Locator::global(), TypeBinder::global())
    }
}

impl Weave {
    /// A weave over explicit parts instead of the process-wide locator and
    /// binder.
    pub fn with_parts(config: Config, locator: Arc<Locator>, binder: Arc<TypeBinder>) -> Self {
        let (write_context_pool, read_context_pool) = Self::pools(&config, &locator, &binder);
        Weave {
            config,
            locator,
            binder,
            resolvers: ExternalResolvers::default(),
            write_context_pool,
            read_context_pool,
        }
    }

    fn pools(
        config: &Config,
        locator: &Arc<Locator>,
        binder: &Arc<TypeBinder>,
    ) -> (
        ContextPool<SerializationContext>,
        ContextPool<DeserializationContext>,
    ) {
        let (c, l, b) = (config.clone(), locator.clone(), binder.clone());
        let write = ContextPool::new(move || {
            SerializationContext::new(c.clone(), l.clone(), b.clone())
        });
        let (c, l, b) = (config.clone(), locator.clone(), binder.clone());
        let read = ContextPool::new(move || {
            DeserializationContext::new(c.clone(), l.clone(), b.clone())
        });
        (write, read)
    }

    /// Contexts built for the old configuration are dropped with their pools.
    fn reconfigured(mut self) -> Self {
        let (write, read) = Self::pools(&self.config, &self.locator, &self.binder);
        self.write_context_pool = write;
        self.read_context_pool = read;
        self
    }

    /// Sets the member selection policy.
    pub fn policy(mut self, policy: PolicyRef) -> Self {
        self.config.policy = policy;
        self.reconfigured()
    }

    pub fn error_handling(mut self, error_handling: ErrorHandlingPolicy) -> Self {
        self.config.error_handling = error_handling;
        self.reconfigured()
    }

    pub fn logging(mut self, logging: LoggingPolicy) -> Self {
        self.config.logging = logging;
        self.reconfigured()
    }

    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.config.sink = sink;
        self.reconfigured()
    }

    /// Uses a private locator, so codec registrations stay local to this
    /// instance.
    pub fn locator(mut self, locator: Arc<Locator>) -> Self {
        self.locator = locator;
        self.reconfigured()
    }

    pub fn binder(mut self, binder: Arc<TypeBinder>) -> Self {
        self.binder = binder;
        self.reconfigured()
    }

    /// Whether member-based types get precompiled codecs (the default) or
    /// the reflection codec.
    pub fn emit_codecs(mut self, emit_codecs: bool) -> Self {
        self.config.emit_codecs = emit_codecs;
        self.reconfigured()
    }

    pub fn index_resolver(mut self, resolver: Arc<dyn ExternalReferenceResolver<i32>>) -> Self {
        self.resolvers.index.push(resolver);
        self
    }

    pub fn guid_resolver(mut self, resolver: Arc<dyn ExternalReferenceResolver<Uuid>>) -> Self {
        self.resolvers.guid.push(resolver);
        self
    }

    pub fn string_resolver(
        mut self,
        resolver: Arc<dyn ExternalReferenceResolver<String>>,
    ) -> Self {
        self.resolvers.string.push(resolver);
        self
    }

    #[inline(always)]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline(always)]
    pub fn get_locator(&self) -> &Arc<Locator> {
        &self.locator
    }

    #[inline(always)]
    pub fn get_binder(&self) -> &Arc<TypeBinder> {
        &self.binder
    }

    pub fn registry(&self) -> &'static TypeRegistry {
        self.binder.registry()
    }

    /// Registers `T` (and the types it reaches) for dynamic values and name
    /// binding. Derived non-generic types are registered automatically.
    pub fn register<T: Serializable>(&self) {
        self.registry().register::<T>();
    }

    /// Registers a codec for `T`; see [`Locator::register_codec`].
    pub fn register_codec<T: Serializable>(
        &self,
        codec: Arc<dyn Codec<T>>,
        priority: i32,
    ) -> Result<(), Error> {
        self.locator.register_codec(codec, priority)
    }

    pub fn register_generic_codec(
        &self,
        definition: TypeDefinition,
        factory: Arc<dyn GenericCodecFactory>,
        priority: i32,
    ) -> Result<(), Error> {
        self.locator
            .register_generic_codec(definition, factory, priority)
    }

    /// Reads the type name `former_name` as `ty`.
    pub fn add_type_rename(&self, former_name: impl Into<String>, ty: Type) {
        self.binder.add_rename(former_name, ty);
    }

    /// Serializes `value` into bytes of the given format.
    pub fn serialize<T: Serializable>(&self, value: &T, format: DataFormat) -> Result<Vec<u8>, Error> {
        match format {
            DataFormat::Binary => {
                let mut writer = BinaryDataWriter::new();
                self.serialize_with(value, &mut writer)?;
                Ok(writer.into_bytes())
            }
            DataFormat::Json => Ok(self.serialize_json(value)?.into_bytes()),
        }
    }

    pub fn serialize_json<T: Serializable>(&self, value: &T) -> Result<String, Error> {
        let mut writer = JsonDataWriter::new();
        self.serialize_with(value, &mut writer)?;
        Ok(writer.to_json_string())
    }

    pub fn serialize_nodes<T: Serializable>(
        &self,
        value: &T,
    ) -> Result<Vec<SerializationNode>, Error> {
        let mut writer = NodesDataWriter::new();
        self.serialize_with(value, &mut writer)?;
        Ok(writer.into_nodes())
    }

    /// Serializes `value` as the single root entry of `writer` in a pooled
    /// session.
    pub fn serialize_with<T: Serializable>(
        &self,
        value: &T,
        writer: &mut dyn DataWriter,
    ) -> Result<(), Error> {
        let mut context = self.write_context_pool.claim();
        *context.external_resolvers_mut() = self.resolvers.clone();
        self.serialize_with_context(value, writer, &mut context)
    }

    pub fn serialize_with_context<T: Serializable>(
        &self,
        value: &T,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        let depth = writer.depth();
        let result = value.write_value(None, writer, context);
        debug_assert_eq!(writer.depth(), depth, "codec left the stream unbalanced");
        result
    }

    /// Deserializes a `T` from bytes of the given format. Recoverable
    /// problems are reported to the sink and replaced by defaults.
    pub fn deserialize<T: Serializable>(&self, bytes: &[u8], format: DataFormat) -> Result<T, Error> {
        self.deserialize_with_report(bytes, format)
            .map(Report::into_value)
    }

    /// Like [`deserialize`](Self::deserialize), also returning every
    /// diagnostic of the session.
    pub fn deserialize_with_report<T: Serializable>(
        &self,
        bytes: &[u8],
        format: DataFormat,
    ) -> Result<Report<T>, Error> {
        match format {
            DataFormat::Binary => self.deserialize_with(&mut BinaryDataReader::new(bytes)),
            DataFormat::Json => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| Error::encoding_error(format!("json input is not UTF-8: {e}")))?;
                self.deserialize_with(&mut JsonDataReader::new(text)?)
            }
        }
    }

    pub fn deserialize_json<T: Serializable>(&self, text: &str) -> Result<T, Error> {
        self.deserialize_with(&mut JsonDataReader::new(text)?)
            .map(Report::into_value)
    }

    pub fn deserialize_nodes<T: Serializable>(
        &self,
        nodes: &[SerializationNode],
    ) -> Result<Report<T>, Error> {
        self.deserialize_with(&mut NodesDataReader::new(nodes))
    }

    /// Reads the root entry of `reader` as a `T` in a pooled session.
    pub fn deserialize_with<T: Serializable>(
        &self,
        reader: &mut dyn DataReader,
    ) -> Result<Report<T>, Error> {
        let mut context = self.read_context_pool.claim();
        *context.external_resolvers_mut() = self.resolvers.clone();
        let value = self.deserialize_with_context(reader, &mut context)?;
        Ok(Report {
            value,
            diagnostics: context.debug_mut().take_diagnostics(),
        })
    }

    pub fn deserialize_with_context<T: Serializable>(
        &self,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<T, Error> {
        let value = T::read_value(reader, context)?;
        if reader.depth_exceeded() {
            context.log_warning(format!(
                "input nests deeper than {MAX_DEPTH} levels, the rest of it was dropped"
            ))?;
        }
        Ok(value)
    }
}
