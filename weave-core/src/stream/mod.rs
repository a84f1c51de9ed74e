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

//! The tagged-entry stream protocol.
//!
//! Every concrete format exposes its content as a sequence of [`EntryType`]
//! tagged entries through [`DataWriter`] and [`DataReader`]. Codecs only ever
//! talk to these two traits, so any format that implements them carries the
//! whole engine.
//!
//! Readers are forgiving: a typed read on an entry of another kind skips that
//! entry and returns `None`, and running off the end of the input reads as
//! [`EntryType::EndOfStream`]. Unbalanced `exit_node`/`exit_array` calls are
//! bugs in the calling codec and panic.

pub mod binary;
pub mod json;
pub mod nodes;

pub use binary::{BinaryDataReader, BinaryDataWriter};
pub use json::{JsonDataReader, JsonDataWriter};
pub use nodes::{NodesDataReader, NodesDataWriter, SerializationNode};

use uuid::Uuid;

pub use crate::types::EntryType;

/// Byte-level formats accepted by [`Weave::serialize`](crate::weave::Weave::serialize).
/// The node list has its own entry points since it is not a byte stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataFormat {
    #[default]
    Binary,
    Json,
}

/// Shape of a bulk primitive array: `count` elements of `element_size` bytes,
/// little-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrimitiveArrayHeader {
    pub element_size: usize,
    pub count: usize,
}

pub trait DataWriter {
    /// Opens a value-type node; it never carries an id.
    fn begin_struct_node(&mut self, name: Option<&str>, type_name: Option<&str>);

    /// Opens a node for a reference-tracked object with its session id.
    fn begin_reference_node(&mut self, name: Option<&str>, type_name: Option<&str>, id: i32);

    fn begin_array_node(&mut self, length: usize);

    fn end_node(&mut self, name: Option<&str>);

    fn end_array_node(&mut self);

    fn write_string(&mut self, name: Option<&str>, value: &str);

    fn write_guid(&mut self, name: Option<&str>, value: Uuid);

    fn write_i64(&mut self, name: Option<&str>, value: i64);

    fn write_u64(&mut self, name: Option<&str>, value: u64);

    fn write_f32(&mut self, name: Option<&str>, value: f32);

    fn write_f64(&mut self, name: Option<&str>, value: f64);

    fn write_bool(&mut self, name: Option<&str>, value: bool);

    fn write_null(&mut self, name: Option<&str>);

    fn write_internal_reference(&mut self, name: Option<&str>, id: i32);

    fn write_external_reference_by_index(&mut self, name: Option<&str>, index: i32);

    fn write_external_reference_by_guid(&mut self, name: Option<&str>, guid: Uuid);

    fn write_external_reference_by_string(&mut self, name: Option<&str>, key: &str);

    /// Bulk path for arrays of primitive numbers.
    fn write_primitive_array(&mut self, header: PrimitiveArrayHeader, bytes: &[u8]);

    /// Depth of currently open nodes and arrays.
    fn depth(&self) -> usize;
}

pub trait DataReader {
    /// Looks at the next entry without consuming it.
    fn peek_entry(&mut self) -> EntryType;

    /// Name of the entry last returned by [`peek_entry`](Self::peek_entry).
    fn peeked_name(&self) -> Option<&str>;

    /// Enters the node at the cursor. Returns `false`, consuming nothing,
    /// when the next entry is not a node start.
    fn enter_node(&mut self, type_name: &mut Option<String>) -> bool;

    /// Skips what is left of the current node and consumes its end.
    fn exit_node(&mut self);

    fn enter_array(&mut self, length: &mut i64) -> bool;

    fn exit_array(&mut self);

    /// Consumes the next entry, including any nested content. Boundary
    /// entries (end of node/array/stream) are left in place.
    fn skip_entry(&mut self);

    fn read_string(&mut self) -> Option<String>;

    fn read_guid(&mut self) -> Option<Uuid>;

    fn read_i64(&mut self) -> Option<i64>;

    fn read_u64(&mut self) -> Option<u64>;

    fn read_f64(&mut self) -> Option<f64>;

    fn read_f32(&mut self) -> Option<f32> {
        self.read_f64().map(|v| v as f32)
    }

    fn read_bool(&mut self) -> Option<bool>;

    fn read_null(&mut self) -> bool;

    fn read_internal_reference(&mut self) -> Option<i32>;

    fn read_external_reference_by_index(&mut self) -> Option<i32>;

    fn read_external_reference_by_guid(&mut self) -> Option<Uuid>;

    fn read_external_reference_by_string(&mut self) -> Option<String>;

    /// Reads a bulk primitive array, appending its raw bytes to `out`.
    fn read_primitive_array(&mut self, out: &mut Vec<u8>) -> Option<PrimitiveArrayHeader>;

    /// Id of the innermost open node, or -1.
    fn current_node_id(&self) -> i32;

    fn current_node_name(&self) -> Option<&str>;

    fn is_in_array_node(&self) -> bool;

    fn depth(&self) -> usize;

    /// True once the reader gave up on input nested deeper than
    /// [`MAX_DEPTH`].
    fn depth_exceeded(&self) -> bool {
        false
    }

    /// [`peek_entry`](Self::peek_entry) returning an owned copy of the name.
    fn peek_named(&mut self) -> (EntryType, Option<String>) {
        let entry = self.peek_entry();
        (entry, self.peeked_name().map(str::to_owned))
    }
}

/// Deepest nesting of nodes and arrays a reader enters. Input nested any
/// deeper is treated as garbled: the reader gives up on the rest of it.
pub const MAX_DEPTH: usize = 512;

/// Descriptor of one open node or array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: Option<String>,
    pub id: i32,
    pub type_name: Option<String>,
    pub is_array: bool,
}

impl NodeInfo {
    pub fn node(name: Option<String>, id: i32, type_name: Option<String>) -> Self {
        NodeInfo {
            name,
            id,
            type_name,
            is_array: false,
        }
    }

    pub fn array() -> Self {
        NodeInfo {
            name: None,
            id: -1,
            type_name: None,
            is_array: true,
        }
    }
}

/// Strictly nested stack of open nodes shared by readers and writers.
#[derive(Default, Debug)]
pub struct NodeStack {
    nodes: Vec<NodeInfo>,
}

impl NodeStack {
    pub fn push(&mut self, info: NodeInfo) {
        self.nodes.push(info);
    }

    /// Pops the innermost entry, panicking when it is not of the expected shape.
    #[track_caller]
    pub fn pop(&mut self, expect_array: bool) -> NodeInfo {
        match self.nodes.pop() {
            Some(info) if info.is_array == expect_array => info,
            Some(info) => panic!(
                "unbalanced stream nesting: closing {} but innermost open entry is {}",
                if expect_array { "an array" } else { "a node" },
                if info.is_array { "an array" } else { "a node" },
            ),
            None => panic!(
                "unbalanced stream nesting: closing {} with nothing open",
                if expect_array { "an array" } else { "a node" }
            ),
        }
    }

    pub fn current(&self) -> Option<&NodeInfo> {
        self.nodes.last()
    }

    pub fn current_id(&self) -> i32 {
        self.current().map(|n| n.id).unwrap_or(-1)
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current().and_then(|n| n.name.as_deref())
    }

    pub fn is_in_array(&self) -> bool {
        self.current().map(|n| n.is_array).unwrap_or(false)
    }

    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    /// True once [`MAX_DEPTH`] levels are open.
    pub fn is_full(&self) -> bool {
        self.nodes.len() >= MAX_DEPTH
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
