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

//! In-memory entry format: a flat list of named, typed, string-encoded nodes.
//!
//! Useful for inspecting or patching a stream by hand, and the backbone of
//! the JSON format.

use uuid::Uuid;

use super::{
    DataReader, DataWriter, EntryType, NodeInfo, NodeStack, PrimitiveArrayHeader, MAX_DEPTH,
};

/// One entry of the node list.
///
/// `data` holds the payload as text: numbers in decimal, guids hyphenated,
/// `"{id}|{type}"` for node starts, `"{size}|{hex}"` for primitive arrays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializationNode {
    pub name: Option<String>,
    pub entry: EntryType,
    pub data: String,
}

impl SerializationNode {
    pub fn new(name: Option<&str>, entry: EntryType, data: impl Into<String>) -> Self {
        SerializationNode {
            name: name.map(str::to_owned),
            entry,
            data: data.into(),
        }
    }
}

pub(crate) fn encode_node_start(id: i32, type_name: Option<&str>) -> String {
    format!("{}|{}", id, type_name.unwrap_or(""))
}

pub(crate) fn decode_node_start(data: &str) -> (i32, Option<String>) {
    let (id, type_name) = data.split_once('|').unwrap_or((data, ""));
    let type_name = (!type_name.is_empty()).then(|| type_name.to_owned());
    (id.parse().unwrap_or(-1), type_name)
}

pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0xF) as usize] as char);
    }
    out
}

pub(crate) fn decode_hex(text: &str, out: &mut Vec<u8>) -> Option<()> {
    if text.len() % 2 != 0 {
        return None;
    }
    let digits = text.as_bytes();
    let value = |c: u8| (c as char).to_digit(16).map(|d| d as u8);
    for pair in digits.chunks(2) {
        out.push((value(pair[0])? << 4) | value(pair[1])?);
    }
    Some(())
}

#[derive(Default)]
pub struct NodesDataWriter {
    nodes: Vec<SerializationNode>,
    stack: NodeStack,
}

impl NodesDataWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[SerializationNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<SerializationNode> {
        self.nodes
    }

    #[inline(always)]
    fn push(&mut self, name: Option<&str>, entry: EntryType, data: impl Into<String>) {
        self.nodes.push(SerializationNode::new(name, entry, data));
    }

    fn begin_node(&mut self, name: Option<&str>, type_name: Option<&str>, id: i32) {
        self.push(name, EntryType::StartOfNode, encode_node_start(id, type_name));
        self.stack.push(NodeInfo::node(
            name.map(str::to_owned),
            id,
            type_name.map(str::to_owned),
        ));
    }
}

impl DataWriter for NodesDataWriter {
    fn begin_struct_node(&mut self, name: Option<&str>, type_name: Option<&str>) {
        self.begin_node(name, type_name, -1);
    }

    fn begin_reference_node(&mut self, name: Option<&str>, type_name: Option<&str>, id: i32) {
        self.begin_node(name, type_name, id);
    }

    fn begin_array_node(&mut self, length: usize) {
        self.push(None, EntryType::StartOfArray, length.to_string());
        self.stack.push(NodeInfo::array());
    }

    fn end_node(&mut self, _name: Option<&str>) {
        self.stack.pop(false);
        self.push(None, EntryType::EndOfNode, "");
    }

    fn end_array_node(&mut self) {
        self.stack.pop(true);
        self.push(None, EntryType::EndOfArray, "");
    }

    fn write_string(&mut self, name: Option<&str>, value: &str) {
        self.push(name, EntryType::String, value);
    }

    fn write_guid(&mut self, name: Option<&str>, value: Uuid) {
        self.push(name, EntryType::Guid, value.to_string());
    }

    fn write_i64(&mut self, name: Option<&str>, value: i64) {
        self.push(name, EntryType::Integer, value.to_string());
    }

    fn write_u64(&mut self, name: Option<&str>, value: u64) {
        self.push(name, EntryType::Integer, value.to_string());
    }

    fn write_f32(&mut self, name: Option<&str>, value: f32) {
        self.push(name, EntryType::FloatingPoint, (value as f64).to_string());
    }

    fn write_f64(&mut self, name: Option<&str>, value: f64) {
        self.push(name, EntryType::FloatingPoint, value.to_string());
    }

    fn write_bool(&mut self, name: Option<&str>, value: bool) {
        self.push(name, EntryType::Boolean, value.to_string());
    }

    fn write_null(&mut self, name: Option<&str>) {
        self.push(name, EntryType::Null, "");
    }

    fn write_internal_reference(&mut self, name: Option<&str>, id: i32) {
        self.push(name, EntryType::InternalReference, id.to_string());
    }

    fn write_external_reference_by_index(&mut self, name: Option<&str>, index: i32) {
        self.push(name, EntryType::ExternalReferenceByIndex, index.to_string());
    }

    fn write_external_reference_by_guid(&mut self, name: Option<&str>, guid: Uuid) {
        self.push(name, EntryType::ExternalReferenceByGuid, guid.to_string());
    }

    fn write_external_reference_by_string(&mut self, name: Option<&str>, key: &str) {
        self.push(name, EntryType::ExternalReferenceByString, key);
    }

    fn write_primitive_array(&mut self, header: PrimitiveArrayHeader, bytes: &[u8]) {
        let data = format!("{}|{}", header.element_size, encode_hex(bytes));
        self.push(None, EntryType::PrimitiveArray, data);
    }

    fn depth(&self) -> usize {
        self.stack.depth()
    }
}

/// Reads a node list, owned or borrowed.
pub struct NodesDataReader<'a> {
    nodes: std::borrow::Cow<'a, [SerializationNode]>,
    index: usize,
    stack: NodeStack,
    depth_exceeded: bool,
}

impl<'a> NodesDataReader<'a> {
    pub fn new(nodes: &'a [SerializationNode]) -> Self {
        NodesDataReader {
            nodes: std::borrow::Cow::Borrowed(nodes),
            index: 0,
            stack: NodeStack::default(),
            depth_exceeded: false,
        }
    }

    pub fn from_vec(nodes: Vec<SerializationNode>) -> NodesDataReader<'static> {
        NodesDataReader {
            nodes: std::borrow::Cow::Owned(nodes),
            index: 0,
            stack: NodeStack::default(),
            depth_exceeded: false,
        }
    }

    fn current(&self) -> Option<&SerializationNode> {
        self.nodes.get(self.index)
    }

    /// Gives up on input nested deeper than [`MAX_DEPTH`]; the rest of the
    /// list reads as [`EntryType::EndOfStream`].
    fn too_deep(&mut self) -> bool {
        if !self.stack.is_full() {
            return false;
        }
        log::warn!("input nests deeper than {MAX_DEPTH} levels, dropping the rest");
        self.index = self.nodes.len();
        self.depth_exceeded = true;
        true
    }

    /// Returns the payload of the next entry when it has the expected kind,
    /// otherwise skips it.
    fn take(&mut self, expected: EntryType) -> Option<&str> {
        if self.peek_entry() != expected {
            self.skip_entry();
            return None;
        }
        self.index += 1;
        self.nodes.get(self.index - 1).map(|n| n.data.as_str())
    }
}

impl DataReader for NodesDataReader<'_> {
    fn peek_entry(&mut self) -> EntryType {
        self.current()
            .map(|n| n.entry)
            .unwrap_or(EntryType::EndOfStream)
    }

    fn peeked_name(&self) -> Option<&str> {
        self.current().and_then(|n| n.name.as_deref())
    }

    fn enter_node(&mut self, type_name: &mut Option<String>) -> bool {
        let Some(node) = self.current() else {
            return false;
        };
        if node.entry != EntryType::StartOfNode {
            return false;
        }
        let (id, ty) = decode_node_start(&node.data);
        let name = node.name.clone();
        if self.too_deep() {
            return false;
        }
        *type_name = ty.clone();
        self.index += 1;
        self.stack.push(NodeInfo::node(name, id, ty));
        true
    }

    fn exit_node(&mut self) {
        loop {
            match self.peek_entry() {
                EntryType::EndOfNode => {
                    self.index += 1;
                    break;
                }
                EntryType::EndOfStream => break,
                EntryType::EndOfArray => self.index += 1,
                _ => self.skip_entry(),
            }
        }
        self.stack.pop(false);
    }

    fn enter_array(&mut self, length: &mut i64) -> bool {
        let Some(node) = self.current() else {
            return false;
        };
        if node.entry != EntryType::StartOfArray {
            return false;
        }
        let announced = node.data.parse().unwrap_or(0);
        if self.too_deep() {
            return false;
        }
        *length = announced;
        self.index += 1;
        self.stack.push(NodeInfo::array());
        true
    }

    fn exit_array(&mut self) {
        loop {
            match self.peek_entry() {
                EntryType::EndOfArray => {
                    self.index += 1;
                    break;
                }
                EntryType::EndOfStream => break,
                EntryType::EndOfNode => self.index += 1,
                _ => self.skip_entry(),
            }
        }
        self.stack.pop(true);
    }

    fn skip_entry(&mut self) {
        match self.peek_entry() {
            EntryType::EndOfNode | EntryType::EndOfArray | EntryType::EndOfStream => {}
            EntryType::StartOfNode => {
                let mut type_name = None;
                if self.enter_node(&mut type_name) {
                    self.exit_node();
                }
            }
            EntryType::StartOfArray => {
                let mut length = 0;
                if self.enter_array(&mut length) {
                    self.exit_array();
                }
            }
            _ => self.index += 1,
        }
    }

    fn read_string(&mut self) -> Option<String> {
        self.take(EntryType::String).map(str::to_owned)
    }

    fn read_guid(&mut self) -> Option<Uuid> {
        self.take(EntryType::Guid).and_then(|d| Uuid::parse_str(d).ok())
    }

    fn read_i64(&mut self) -> Option<i64> {
        self.take(EntryType::Integer).and_then(|d| d.parse().ok())
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take(EntryType::Integer).and_then(|d| d.parse().ok())
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.take(EntryType::FloatingPoint)
            .and_then(|d| d.parse().ok())
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.take(EntryType::Boolean).and_then(|d| d.parse().ok())
    }

    fn read_null(&mut self) -> bool {
        self.take(EntryType::Null).is_some()
    }

    fn read_internal_reference(&mut self) -> Option<i32> {
        self.take(EntryType::InternalReference)
            .and_then(|d| d.parse().ok())
    }

    fn read_external_reference_by_index(&mut self) -> Option<i32> {
        self.take(EntryType::ExternalReferenceByIndex)
            .and_then(|d| d.parse().ok())
    }

    fn read_external_reference_by_guid(&mut self) -> Option<Uuid> {
        self.take(EntryType::ExternalReferenceByGuid)
            .and_then(|d| Uuid::parse_str(d).ok())
    }

    fn read_external_reference_by_string(&mut self) -> Option<String> {
        self.take(EntryType::ExternalReferenceByString)
            .map(str::to_owned)
    }

    fn read_primitive_array(&mut self, out: &mut Vec<u8>) -> Option<PrimitiveArrayHeader> {
        let data = self.take(EntryType::PrimitiveArray)?.to_owned();
        let (size, hex) = data.split_once('|')?;
        let element_size: usize = size.parse().ok()?;
        let start = out.len();
        if decode_hex(hex, out).is_none() || element_size == 0 {
            out.truncate(start);
            return None;
        }
        let len = out.len() - start;
        if len % element_size != 0 {
            out.truncate(start);
            return None;
        }
        Some(PrimitiveArrayHeader {
            element_size,
            count: len / element_size,
        })
    }

    fn current_node_id(&self) -> i32 {
        self.stack.current_id()
    }

    fn current_node_name(&self) -> Option<&str> {
        self.stack.current_name()
    }

    fn is_in_array_node(&self) -> bool {
        self.stack.is_in_array()
    }

    fn depth(&self) -> usize {
        self.stack.depth()
    }

    fn depth_exceeded(&self) -> bool {
        self.depth_exceeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_start_encoding() {
        assert_eq!(encode_node_start(3, Some("Vec[i32]")), "3|Vec[i32]");
        assert_eq!(decode_node_start("3|Vec[i32]"), (3, Some("Vec[i32]".to_owned())));
        assert_eq!(decode_node_start("-1|"), (-1, None));
    }

    #[test]
    fn hex_round_trip() {
        let mut out = Vec::new();
        decode_hex(&encode_hex(&[0, 15, 16, 255]), &mut out).unwrap();
        assert_eq!(out, vec![0, 15, 16, 255]);
        assert!(decode_hex("zz", &mut out).is_none());
    }

    #[test]
    fn patched_entry_kind_is_skipped() {
        let mut w = NodesDataWriter::new();
        w.begin_struct_node(None, Some("Pair"));
        w.write_i64(Some("a"), 1);
        w.write_i64(Some("b"), 2);
        w.end_node(None);
        let mut nodes = w.into_nodes();
        nodes[1].entry = EntryType::Boolean;

        let mut r = NodesDataReader::new(&nodes);
        let mut ty = None;
        assert!(r.enter_node(&mut ty));
        assert_eq!(r.read_i64(), None);
        assert_eq!(r.peeked_name(), Some("b"));
        assert_eq!(r.read_i64(), Some(2));
        r.exit_node();
        assert_eq!(r.peek_entry(), EntryType::EndOfStream);
    }

    #[test]
    fn nesting_past_the_limit_ends_the_list() {
        let start =
            SerializationNode::new(None, EntryType::StartOfNode, encode_node_start(-1, None));
        let nodes = vec![start; MAX_DEPTH + 1];
        let mut r = NodesDataReader::new(&nodes);
        let mut ty = None;
        for _ in 0..MAX_DEPTH {
            assert!(r.enter_node(&mut ty));
        }
        assert!(!r.enter_node(&mut ty));
        assert!(r.depth_exceeded());
        assert_eq!(r.peek_entry(), EntryType::EndOfStream);
    }
}
