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

//! JSON entry format.
//!
//! Entries are first collected as a node list and then folded into a
//! `serde_json` document (and back):
//!
//! - nodes become objects, with `$id` and `$type` keys first,
//! - arrays become JSON arrays,
//! - unnamed children of a node are stored under `$rcontent` (arrays) or
//!   `$unnamed` keys,
//! - references and guids become strings prefixed with `$iref:`, `$eref:`,
//!   `$guidref:`, `$strref:` and `$guid:`; plain strings that start with `$`
//!   get one more `$` in front,
//! - bulk primitive arrays become `{"$primitivearray": "size|hex"}`.

use serde_json::{Map, Number, Value};
use uuid::Uuid;

use super::nodes::{decode_node_start, encode_node_start};
use super::{
    DataReader, DataWriter, EntryType, NodesDataReader, NodesDataWriter, PrimitiveArrayHeader,
    SerializationNode,
};
use crate::error::Error;

const ID_KEY: &str = "$id";
const TYPE_KEY: &str = "$type";
const CONTENT_KEY: &str = "$rcontent";
const UNNAMED_KEY: &str = "$unnamed";
const PRIMITIVE_ARRAY_KEY: &str = "$primitivearray";

const GUID_PREFIX: &str = "$guid:";
const IREF_PREFIX: &str = "$iref:";
const EREF_PREFIX: &str = "$eref:";
const GUIDREF_PREFIX: &str = "$guidref:";
const STRREF_PREFIX: &str = "$strref:";
const FLOAT_PREFIX: &str = "$float:";

#[derive(Default)]
pub struct JsonDataWriter {
    inner: NodesDataWriter,
}

impl JsonDataWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The document built so far. Only the first root entry is kept.
    pub fn to_value(&self) -> Value {
        let nodes = self.inner.nodes();
        let mut index = 0;
        let root = if nodes.is_empty() {
            Value::Null
        } else {
            entry_to_json(nodes, &mut index)
        };
        if index < nodes.len() {
            log::warn!(
                "json document holds a single root value, dropping {} trailing entries",
                nodes.len() - index
            );
        }
        root
    }

    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }

    pub fn to_json_string_pretty(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(&self.to_value())
            .map_err(|e| Error::encoding_error(e.to_string()))
    }
}

fn unnamed_key(child: &SerializationNode, ordinal: usize) -> String {
    let base = if child.entry == EntryType::StartOfArray {
        CONTENT_KEY
    } else {
        UNNAMED_KEY
    };
    if ordinal == 0 {
        base.to_owned()
    } else {
        format!("{base}:{ordinal}")
    }
}

fn entry_to_json(nodes: &[SerializationNode], index: &mut usize) -> Value {
    let node = &nodes[*index];
    *index += 1;
    match node.entry {
        EntryType::StartOfNode => {
            let (id, type_name) = decode_node_start(&node.data);
            let mut map = Map::new();
            if id >= 0 {
                map.insert(ID_KEY.to_owned(), Value::from(id));
            }
            if let Some(type_name) = type_name {
                map.insert(TYPE_KEY.to_owned(), Value::String(type_name));
            }
            let mut unnamed = 0;
            while *index < nodes.len() && nodes[*index].entry != EntryType::EndOfNode {
                let child = &nodes[*index];
                let key = match &child.name {
                    Some(name) => name.clone(),
                    None => {
                        unnamed += 1;
                        unnamed_key(child, unnamed - 1)
                    }
                };
                let value = entry_to_json(nodes, index);
                map.insert(key, value);
            }
            *index += 1;
            Value::Object(map)
        }
        EntryType::StartOfArray => {
            let mut items = Vec::new();
            while *index < nodes.len() && nodes[*index].entry != EntryType::EndOfArray {
                items.push(entry_to_json(nodes, index));
            }
            *index += 1;
            Value::Array(items)
        }
        EntryType::String => {
            if node.data.starts_with('$') {
                Value::String(format!("${}", node.data))
            } else {
                Value::String(node.data.clone())
            }
        }
        EntryType::Guid => Value::String(format!("{GUID_PREFIX}{}", node.data)),
        EntryType::Integer => {
            if let Ok(v) = node.data.parse::<i64>() {
                Value::from(v)
            } else if let Ok(v) = node.data.parse::<u64>() {
                Value::from(v)
            } else {
                Value::Null
            }
        }
        EntryType::FloatingPoint => node
            .data
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(format!("{FLOAT_PREFIX}{}", node.data))),
        EntryType::Boolean => Value::Bool(node.data == "true"),
        EntryType::InternalReference => Value::String(format!("{IREF_PREFIX}{}", node.data)),
        EntryType::ExternalReferenceByIndex => {
            Value::String(format!("{EREF_PREFIX}{}", node.data))
        }
        EntryType::ExternalReferenceByGuid => {
            Value::String(format!("{GUIDREF_PREFIX}{}", node.data))
        }
        EntryType::ExternalReferenceByString => {
            Value::String(format!("{STRREF_PREFIX}{}", node.data))
        }
        EntryType::PrimitiveArray => {
            let mut map = Map::new();
            map.insert(
                PRIMITIVE_ARRAY_KEY.to_owned(),
                Value::String(node.data.clone()),
            );
            Value::Object(map)
        }
        EntryType::Null
        | EntryType::EndOfNode
        | EntryType::EndOfArray
        | EntryType::EndOfStream
        | EntryType::Invalid => Value::Null,
    }
}

fn string_to_node(name: Option<&str>, s: &str) -> SerializationNode {
    let prefixed = [
        (GUIDREF_PREFIX, EntryType::ExternalReferenceByGuid),
        (GUID_PREFIX, EntryType::Guid),
        (IREF_PREFIX, EntryType::InternalReference),
        (EREF_PREFIX, EntryType::ExternalReferenceByIndex),
        (STRREF_PREFIX, EntryType::ExternalReferenceByString),
        (FLOAT_PREFIX, EntryType::FloatingPoint),
    ];
    if let Some(rest) = s.strip_prefix("$$") {
        return SerializationNode::new(name, EntryType::String, format!("${rest}"));
    }
    for (prefix, entry) in prefixed {
        if let Some(rest) = s.strip_prefix(prefix) {
            return SerializationNode::new(name, entry, rest);
        }
    }
    SerializationNode::new(name, EntryType::String, s)
}

fn json_to_nodes(value: &Value, name: Option<&str>, out: &mut Vec<SerializationNode>) {
    match value {
        Value::Object(map) => {
            if let (1, Some(Value::String(data))) = (map.len(), map.get(PRIMITIVE_ARRAY_KEY)) {
                out.push(SerializationNode::new(
                    name,
                    EntryType::PrimitiveArray,
                    data.as_str(),
                ));
                return;
            }
            let id = map
                .get(ID_KEY)
                .and_then(Value::as_i64)
                .and_then(|id| i32::try_from(id).ok())
                .unwrap_or(-1);
            let type_name = map.get(TYPE_KEY).and_then(Value::as_str);
            out.push(SerializationNode::new(
                name,
                EntryType::StartOfNode,
                encode_node_start(id, type_name),
            ));
            for (key, child) in map {
                if key == ID_KEY || key == TYPE_KEY {
                    continue;
                }
                let child_name = if key.starts_with(CONTENT_KEY) || key.starts_with(UNNAMED_KEY) {
                    None
                } else {
                    Some(key.as_str())
                };
                json_to_nodes(child, child_name, out);
            }
            out.push(SerializationNode::new(None, EntryType::EndOfNode, ""));
        }
        Value::Array(items) => {
            out.push(SerializationNode::new(
                name,
                EntryType::StartOfArray,
                items.len().to_string(),
            ));
            for item in items {
                json_to_nodes(item, None, out);
            }
            out.push(SerializationNode::new(None, EntryType::EndOfArray, ""));
        }
        Value::String(s) => out.push(string_to_node(name, s)),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                out.push(SerializationNode::new(name, EntryType::Integer, n.to_string()));
            } else {
                let v = n.as_f64().unwrap_or_default();
                out.push(SerializationNode::new(
                    name,
                    EntryType::FloatingPoint,
                    v.to_string(),
                ));
            }
        }
        Value::Bool(b) => out.push(SerializationNode::new(name, EntryType::Boolean, b.to_string())),
        Value::Null => out.push(SerializationNode::new(name, EntryType::Null, "")),
    }
}

/// Converts a parsed document into the node list it encodes.
pub fn value_to_nodes(value: &Value) -> Vec<SerializationNode> {
    let mut nodes = Vec::new();
    json_to_nodes(value, None, &mut nodes);
    nodes
}

impl DataWriter for JsonDataWriter {
    fn begin_struct_node(&mut self, name: Option<&str>, type_name: Option<&str>) {
        self.inner.begin_struct_node(name, type_name)
    }

    fn begin_reference_node(&mut self, name: Option<&str>, type_name: Option<&str>, id: i32) {
        self.inner.begin_reference_node(name, type_name, id)
    }

    fn begin_array_node(&mut self, length: usize) {
        self.inner.begin_array_node(length)
    }

    fn end_node(&mut self, name: Option<&str>) {
        self.inner.end_node(name)
    }

    fn end_array_node(&mut self) {
        self.inner.end_array_node()
    }

    fn write_string(&mut self, name: Option<&str>, value: &str) {
        self.inner.write_string(name, value)
    }

    fn write_guid(&mut self, name: Option<&str>, value: Uuid) {
        self.inner.write_guid(name, value)
    }

    fn write_i64(&mut self, name: Option<&str>, value: i64) {
        self.inner.write_i64(name, value)
    }

    fn write_u64(&mut self, name: Option<&str>, value: u64) {
        self.inner.write_u64(name, value)
    }

    fn write_f32(&mut self, name: Option<&str>, value: f32) {
        self.inner.write_f32(name, value)
    }

    fn write_f64(&mut self, name: Option<&str>, value: f64) {
        self.inner.write_f64(name, value)
    }

    fn write_bool(&mut self, name: Option<&str>, value: bool) {
        self.inner.write_bool(name, value)
    }

    fn write_null(&mut self, name: Option<&str>) {
        self.inner.write_null(name)
    }

    fn write_internal_reference(&mut self, name: Option<&str>, id: i32) {
        self.inner.write_internal_reference(name, id)
    }

    fn write_external_reference_by_index(&mut self, name: Option<&str>, index: i32) {
        self.inner.write_external_reference_by_index(name, index)
    }

    fn write_external_reference_by_guid(&mut self, name: Option<&str>, guid: Uuid) {
        self.inner.write_external_reference_by_guid(name, guid)
    }

    fn write_external_reference_by_string(&mut self, name: Option<&str>, key: &str) {
        self.inner.write_external_reference_by_string(name, key)
    }

    fn write_primitive_array(&mut self, header: PrimitiveArrayHeader, bytes: &[u8]) {
        self.inner.write_primitive_array(header, bytes)
    }

    fn depth(&self) -> usize {
        DataWriter::depth(&self.inner)
    }
}

pub struct JsonDataReader {
    inner: NodesDataReader<'static>,
}

impl JsonDataReader {
    pub fn new(text: &str) -> Result<Self, Error> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::encoding_error(e.to_string()))?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &Value) -> Self {
        JsonDataReader {
            inner: NodesDataReader::from_vec(value_to_nodes(value)),
        }
    }
}

impl DataReader for JsonDataReader {
    fn peek_entry(&mut self) -> EntryType {
        self.inner.peek_entry()
    }

    fn peeked_name(&self) -> Option<&str> {
        self.inner.peeked_name()
    }

    fn enter_node(&mut self, type_name: &mut Option<String>) -> bool {
        self.inner.enter_node(type_name)
    }

    fn exit_node(&mut self) {
        self.inner.exit_node()
    }

    fn enter_array(&mut self, length: &mut i64) -> bool {
        self.inner.enter_array(length)
    }

    fn exit_array(&mut self) {
        self.inner.exit_array()
    }

    fn skip_entry(&mut self) {
        self.inner.skip_entry()
    }

    fn read_string(&mut self) -> Option<String> {
        self.inner.read_string()
    }

    fn read_guid(&mut self) -> Option<Uuid> {
        self.inner.read_guid()
    }

    fn read_i64(&mut self) -> Option<i64> {
        self.inner.read_i64()
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.inner.read_u64()
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.inner.read_f64()
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.inner.read_bool()
    }

    fn read_null(&mut self) -> bool {
        self.inner.read_null()
    }

    fn read_internal_reference(&mut self) -> Option<i32> {
        self.inner.read_internal_reference()
    }

    fn read_external_reference_by_index(&mut self) -> Option<i32> {
        self.inner.read_external_reference_by_index()
    }

    fn read_external_reference_by_guid(&mut self) -> Option<Uuid> {
        self.inner.read_external_reference_by_guid()
    }

    fn read_external_reference_by_string(&mut self) -> Option<String> {
        self.inner.read_external_reference_by_string()
    }

    fn read_primitive_array(&mut self, out: &mut Vec<u8>) -> Option<PrimitiveArrayHeader> {
        self.inner.read_primitive_array(out)
    }

    fn current_node_id(&self) -> i32 {
        self.inner.current_node_id()
    }

    fn current_node_name(&self) -> Option<&str> {
        self.inner.current_node_name()
    }

    fn is_in_array_node(&self) -> bool {
        self.inner.is_in_array_node()
    }

    fn depth(&self) -> usize {
        DataReader::depth(&self.inner)
    }

    fn depth_exceeded(&self) -> bool {
        self.inner.depth_exceeded()
    }
}
