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

//! # Weave Core
//!
//! The engine behind the weave object-graph serializer. It turns typed
//! values, shared and cyclic references included, into a self-describing
//! stream of tagged entries and rebuilds equivalent graphs from such
//! streams, even after the types involved have drifted.
//!
//! ## Architecture
//!
//! - **`stream`**: the tagged-entry protocol and its binary, JSON and
//!   in-memory node formats
//! - **`policy`**: which members of a type get serialized
//! - **`resolver`**: the type registry, the type binder, the codec locator,
//!   reference-graph contexts and the context pool
//! - **`serializer`**: the `Serializable` trait, the base codec lifecycle and
//!   the codec family for std and user types
//! - **`debug`**: diagnostics and error-handling policies
//! - **`weave`**: the top-level API
//! - **`buffer`**, **`util`**: byte buffers, the buffer pool and locks
//!
//! ## Key Concepts
//!
//! ### Codecs
//!
//! Every non-primitive type is written as a node whose content comes from a
//! codec. The [`Locator`](resolver::locator::Locator) picks that codec with a
//! fixed precedence chain (resolver hooks, user registrations, open-generic
//! registrations, built-in and structural codecs, member codecs) and caches
//! it per policy and type.
//!
//! ### Reference graphs
//!
//! `Rc`/`Arc` shells are identity-tracked: the first encounter writes a node
//! with a session id, later ones an internal reference. Shells over
//! `RefCell`, `Mutex` or `RwLock` register before their content is read, so
//! cycles come back as cycles.
//!
//! ### Diagnostics
//!
//! Bad data never corrupts the stream position. It is reported through the
//! session's diagnostic sink and replaced by a default value, unless the
//! error-handling policy turns the report into an abort.
//!
//! ## Usage
//!
//! ```rust
//! use weave_core::{weave::Weave, stream::DataFormat};
//!
//! let weave = Weave::default();
//! let bytes = weave.serialize(&vec![1i32, 2, 3], DataFormat::Binary).unwrap();
//! let back: Vec<i32> = weave.deserialize(&bytes, DataFormat::Binary).unwrap();
//! assert_eq!(back, vec![1, 2, 3]);
//! ```

pub mod buffer;
pub mod config;
pub mod debug;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod serializer;
pub mod stream;
pub mod types;
pub mod util;
pub mod weave;

pub use inventory;

pub use crate::config::Config;
pub use crate::debug::{
    DebugContext, Diagnostic, DiagnosticLevel, DiagnosticSink, ErrorHandlingPolicy, LogSink,
    LoggingPolicy, Report,
};
pub use crate::error::Error;
pub use crate::policy::{Policies, PolicyRef, SerializationPolicy};
pub use crate::resolver::binder::TypeBinder;
pub use crate::resolver::context::{DeserializationContext, SerializationContext};
pub use crate::resolver::external::{
    ExternalReferenceResolver, GuidReferenceResolver, IndexReferenceResolver,
    StringReferenceResolver,
};
pub use crate::resolver::pool::ContextPool;
pub use crate::resolver::locator::{CodecHandle, CodecResolver, GenericCodecFactory, Locator};
pub use crate::resolver::registry::{TypeEntry, TypeRegistry};
pub use crate::serializer::{
    BaseCodec, Callbacks, Capabilities, Codec, ErasedCodec, Member, MemberInfo, Serializable,
    Shape,
};
pub use crate::serializer::array::MultiArray;
pub use crate::serializer::delegate::Delegate;
pub use crate::serializer::dynamic::DynValue;
pub use crate::serializer::object_data::{ObjectData, PropertyBag, SerializationInfo};
pub use crate::serializer::self_format::SelfFormatter;
pub use crate::serializer::map::{DerivedMap, MapLike};
pub use crate::serializer::collection::GenericCollection;
pub use crate::stream::{DataFormat, DataReader, DataWriter, EntryType};
pub use crate::serializer::version::Version;
pub use crate::types::{Type, TypeDefinition};
pub use crate::weave::Weave;
