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
//! # Weave
//!
//! Weave serializes object graphs: values with shared and cyclic references,
//! collections, dictionaries, dynamically typed values and user types. The
//! output is a self-describing stream of tagged entries, written as compact
//! binary, as JSON, or as an in-memory node list.
//!
//! ## Key Features
//!
//! - **Reference graphs**: `Rc`/`Arc` identity survives a round trip, cycles
//!   through `RefCell`, `Mutex` or `RwLock` included
//! - **Drift tolerance**: unknown members are skipped, renamed members and
//!   types are found under their former names, and bad data degrades to
//!   default values with a diagnostic instead of failing the whole read
//! - **Policies**: choose which members get written
//! - **Extensibility**: user codecs, open-generic codec factories and
//!   resolver hooks, chosen by a fixed precedence and cached
//!
//! ## Usage
//!
//! Derived code refers to `weave_core`, so depend on both crates:
//!
//! ```toml
//! [dependencies]
//! weave = "0.3"
//! weave-core = "0.3"
//! ```
//!
//! ```rust, ignore
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use weave::{DataFormat, Serializable, Weave};
//!
//! #[derive(Serializable)]
//! struct Node {
//!     name: String,
//!     next: Option<Rc<RefCell<Node>>>,
//! }
//!
//! let a = Rc::new(RefCell::new(Node { name: "a".into(), next: None }));
//! a.borrow_mut().next = Some(a.clone());
//!
//! let weave = Weave::default();
//! let bytes = weave.serialize(&a, DataFormat::Binary)?;
//! let back: Rc<RefCell<Node>> = weave.deserialize(&bytes, DataFormat::Binary)?;
//! let next = back.borrow().next.clone().unwrap();
//! assert!(Rc::ptr_eq(&back, &next));
//! ```
//!
//! ## Diagnostics
//!
//! Reads report recoverable problems through the configured
//! [`DiagnosticSink`] and the returned [`Report`]. The
//! [`ErrorHandlingPolicy`] decides whether they abort the session instead.

pub use weave_core::{
    config::Config,
    debug::{
        DebugContext, Diagnostic, DiagnosticLevel, DiagnosticSink, ErrorHandlingPolicy, LogSink,
        LoggingPolicy, Report,
    },
    error::Error,
    policy::{Policies, PolicyRef, SerializationPolicy},
    resolver::{
        binder::TypeBinder,
        context::{DeserializationContext, SerializationContext},
        external::ExternalReferenceResolver,
        locator::{CodecHandle, CodecResolver, GenericCodecFactory, Locator},
        registry::TypeRegistry,
    },
    serializer::{
        array::MultiArray,
        delegate::Delegate,
        dynamic::DynValue,
        object_data::{ObjectData, PropertyBag, SerializationInfo},
        self_format::SelfFormatter,
        version::Version,
        Codec, ErasedCodec, Serializable,
    },
    stream::{
        BinaryDataReader, BinaryDataWriter, DataFormat, DataReader, DataWriter, EntryType,
        JsonDataReader, JsonDataWriter, NodesDataReader, NodesDataWriter, SerializationNode,
    },
    types::{Type, TypeDefinition},
    weave::Weave,
};
// The derive macro shares the trait's name in the macro namespace.
pub use weave_derive::Serializable;
