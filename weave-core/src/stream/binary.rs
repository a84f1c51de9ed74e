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

//! Compact binary entry format.
//!
//! Every entry starts with a tag byte: the [`EntryType`] code, with the high
//! bit set when a length-prefixed utf8 name follows. Node starts carry their
//! type name once per stream; later nodes of the same type refer to it by a
//! small id.

use std::collections::HashMap;

use uuid::Uuid;

use super::{
    DataReader, DataWriter, EntryType, NodeInfo, NodeStack, PrimitiveArrayHeader, MAX_DEPTH,
};
use crate::buffer::{Reader, Writer};

const NAMED: u8 = 0x80;

const TYPE_NONE: u8 = 0;
const TYPE_NEW: u8 = 1;
const TYPE_CACHED: u8 = 2;

const INT_SIGNED: u8 = 0;
const INT_UNSIGNED: u8 = 1;

#[derive(Default)]
pub struct BinaryDataWriter {
    writer: Writer,
    type_ids: HashMap<String, u32>,
    nodes: NodeStack,
}

impl BinaryDataWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.writer.as_slice()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_bytes()
    }

    pub fn reset(&mut self) {
        self.writer.reset();
        self.type_ids.clear();
        self.nodes.clear();
    }

    #[inline(always)]
    fn tag(&mut self, entry: EntryType, name: Option<&str>) {
        let code: u8 = entry.into();
        match name {
            Some(name) => {
                self.writer.write_u8(code | NAMED);
                self.writer.write_utf8_string(name);
            }
            None => self.writer.write_u8(code),
        }
    }

    fn write_type(&mut self, type_name: Option<&str>) {
        let Some(type_name) = type_name else {
            self.writer.write_u8(TYPE_NONE);
            return;
        };
        if let Some(&id) = self.type_ids.get(type_name) {
            self.writer.write_u8(TYPE_CACHED);
            self.writer.write_varuint32(id);
        } else {
            let id = self.type_ids.len() as u32;
            self.type_ids.insert(type_name.to_owned(), id);
            self.writer.write_u8(TYPE_NEW);
            self.writer.write_varuint32(id);
            self.writer.write_utf8_string(type_name);
        }
    }

    fn begin_node(&mut self, name: Option<&str>, type_name: Option<&str>, id: i32) {
        self.tag(EntryType::StartOfNode, name);
        self.write_type(type_name);
        self.writer.write_varint32(id);
        self.nodes.push(NodeInfo::node(
            name.map(str::to_owned),
            id,
            type_name.map(str::to_owned),
        ));
    }
}

impl DataWriter for BinaryDataWriter {
    fn begin_struct_node(&mut self, name: Option<&str>, type_name: Option<&str>) {
        self.begin_node(name, type_name, -1);
    }

    fn begin_reference_node(&mut self, name: Option<&str>, type_name: Option<&str>, id: i32) {
        self.begin_node(name, type_name, id);
    }

    fn begin_array_node(&mut self, length: usize) {
        self.tag(EntryType::StartOfArray, None);
        self.writer.write_varuint64(length as u64);
        self.nodes.push(NodeInfo::array());
    }

    fn end_node(&mut self, _name: Option<&str>) {
        self.nodes.pop(false);
        self.tag(EntryType::EndOfNode, None);
    }

    fn end_array_node(&mut self) {
        self.nodes.pop(true);
        self.tag(EntryType::EndOfArray, None);
    }

    fn write_string(&mut self, name: Option<&str>, value: &str) {
        self.tag(EntryType::String, name);
        self.writer.write_utf8_string(value);
    }

    fn write_guid(&mut self, name: Option<&str>, value: Uuid) {
        self.tag(EntryType::Guid, name);
        self.writer.write_bytes(value.as_bytes());
    }

    fn write_i64(&mut self, name: Option<&str>, value: i64) {
        self.tag(EntryType::Integer, name);
        self.writer.write_u8(INT_SIGNED);
        self.writer.write_varint64(value);
    }

    fn write_u64(&mut self, name: Option<&str>, value: u64) {
        self.tag(EntryType::Integer, name);
        self.writer.write_u8(INT_UNSIGNED);
        self.writer.write_varuint64(value);
    }

    fn write_f32(&mut self, name: Option<&str>, value: f32) {
        self.tag(EntryType::FloatingPoint, name);
        self.writer.write_u8(4);
        self.writer.write_f32(value);
    }

    fn write_f64(&mut self, name: Option<&str>, value: f64) {
        self.tag(EntryType::FloatingPoint, name);
        self.writer.write_u8(8);
        self.writer.write_f64(value);
    }

    fn write_bool(&mut self, name: Option<&str>, value: bool) {
        self.tag(EntryType::Boolean, name);
        self.writer.write_bool(value);
    }

    fn write_null(&mut self, name: Option<&str>) {
        self.tag(EntryType::Null, name);
    }

    fn write_internal_reference(&mut self, name: Option<&str>, id: i32) {
        self.tag(EntryType::InternalReference, name);
        self.writer.write_varint32(id);
    }

    fn write_external_reference_by_index(&mut self, name: Option<&str>, index: i32) {
        self.tag(EntryType::ExternalReferenceByIndex, name);
        self.writer.write_varint32(index);
    }

    fn write_external_reference_by_guid(&mut self, name: Option<&str>, guid: Uuid) {
        self.tag(EntryType::ExternalReferenceByGuid, name);
        self.writer.write_bytes(guid.as_bytes());
    }

    fn write_external_reference_by_string(&mut self, name: Option<&str>, key: &str) {
        self.tag(EntryType::ExternalReferenceByString, name);
        self.writer.write_utf8_string(key);
    }

    fn write_primitive_array(&mut self, header: PrimitiveArrayHeader, bytes: &[u8]) {
        debug_assert_eq!(header.count * header.element_size, bytes.len());
        self.tag(EntryType::PrimitiveArray, None);
        self.writer.write_varuint64(header.count as u64);
        self.writer.write_u8(header.element_size as u8);
        self.writer.write_bytes(bytes);
    }

    fn depth(&self) -> usize {
        self.nodes.depth()
    }
}

pub struct BinaryDataReader<'a> {
    reader: Reader<'a>,
    types: Vec<String>,
    nodes: NodeStack,
    peeked: Option<EntryType>,
    peeked_name: Option<String>,
    depth_exceeded: bool,
}

impl<'a> BinaryDataReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        BinaryDataReader {
            reader: Reader::new(bytes),
            types: Vec::new(),
            nodes: NodeStack::default(),
            peeked: None,
            peeked_name: None,
            depth_exceeded: false,
        }
    }

    #[inline(always)]
    fn consume(&mut self) {
        self.peeked = None;
        self.peeked_name = None;
    }

    /// Positions on the next entry of kind `expected`, or skips whatever is
    /// there and reports `false`.
    fn expect(&mut self, expected: EntryType) -> bool {
        if self.peek_entry() == expected {
            self.consume();
            true
        } else {
            self.skip_entry();
            false
        }
    }

    fn read_guid_payload(&mut self) -> Option<Uuid> {
        let bytes = self.reader.read_bytes(16)?;
        Uuid::from_slice(bytes).ok()
    }

    fn read_type(&mut self) -> Option<String> {
        match self.reader.read_u8()? {
            TYPE_NONE => None,
            TYPE_NEW => {
                let id = self.reader.read_varuint32()? as usize;
                let name = self.reader.read_utf8_string()?;
                // Writers number new names in sequence.
                if id > self.types.len() {
                    log::warn!("type id {id} skips ahead of the {} names seen", self.types.len());
                    self.reader.exhaust();
                    return None;
                }
                if id == self.types.len() {
                    self.types.push(name.clone());
                } else {
                    self.types[id] = name.clone();
                }
                Some(name)
            }
            TYPE_CACHED => {
                let id = self.reader.read_varuint32()? as usize;
                self.types.get(id).cloned()
            }
            _ => {
                self.reader.exhaust();
                None
            }
        }
    }

    /// Gives up on input nested deeper than [`MAX_DEPTH`]; the rest of the
    /// stream reads as [`EntryType::EndOfStream`].
    fn too_deep(&mut self) -> bool {
        if !self.nodes.is_full() {
            return false;
        }
        log::warn!("input nests deeper than {MAX_DEPTH} levels, dropping the rest");
        self.consume();
        self.reader.exhaust();
        self.depth_exceeded = true;
        true
    }

    fn skip_payload(&mut self, entry: EntryType) {
        let skipped = match entry {
            EntryType::String | EntryType::ExternalReferenceByString => {
                self.reader.read_utf8_string().map(|_| ())
            }
            EntryType::Guid | EntryType::ExternalReferenceByGuid => self.reader.skip(16),
            EntryType::Integer => self
                .reader
                .read_u8()
                .and_then(|_| self.reader.read_varuint64())
                .map(|_| ()),
            EntryType::FloatingPoint => match self.reader.read_u8() {
                Some(width @ (4 | 8)) => self.reader.skip(width as usize),
                _ => None,
            },
            EntryType::Boolean => self.reader.read_u8().map(|_| ()),
            EntryType::InternalReference | EntryType::ExternalReferenceByIndex => {
                self.reader.read_varint32().map(|_| ())
            }
            EntryType::PrimitiveArray => {
                let count = self.reader.read_varuint64();
                let size = self.reader.read_u8();
                match (count, size) {
                    (Some(count), Some(size)) => (count as usize)
                        .checked_mul(size as usize)
                        .and_then(|len| self.reader.skip(len)),
                    _ => None,
                }
            }
            EntryType::Null => Some(()),
            _ => None,
        };
        if skipped.is_none() {
            self.reader.exhaust();
        }
    }
}

impl DataReader for BinaryDataReader<'_> {
    fn peek_entry(&mut self) -> EntryType {
        if let Some(entry) = self.peeked {
            return entry;
        }
        let entry = match self.reader.read_u8() {
            None => EntryType::EndOfStream,
            Some(tag) => {
                let entry = EntryType::try_from(tag & !NAMED).unwrap_or(EntryType::Invalid);
                if tag & NAMED != 0 {
                    match self.reader.read_utf8_string() {
                        Some(name) => {
                            self.peeked_name = Some(name);
                            entry
                        }
                        None => EntryType::Invalid,
                    }
                } else {
                    entry
                }
            }
        };
        self.peeked = Some(entry);
        entry
    }

    fn peeked_name(&self) -> Option<&str> {
        self.peeked_name.as_deref()
    }

    fn enter_node(&mut self, type_name: &mut Option<String>) -> bool {
        if self.peek_entry() != EntryType::StartOfNode || self.too_deep() {
            return false;
        }
        let name = self.peeked_name.take();
        self.consume();
        *type_name = self.read_type();
        let id = self.reader.read_varint32().unwrap_or(-1);
        self.nodes
            .push(NodeInfo::node(name, id, type_name.clone()));
        true
    }

    fn exit_node(&mut self) {
        loop {
            match self.peek_entry() {
                EntryType::EndOfNode => {
                    self.consume();
                    break;
                }
                EntryType::EndOfStream => break,
                EntryType::EndOfArray => self.consume(),
                _ => self.skip_entry(),
            }
        }
        self.nodes.pop(false);
    }

    fn enter_array(&mut self, length: &mut i64) -> bool {
        if self.peek_entry() != EntryType::StartOfArray || self.too_deep() {
            return false;
        }
        self.consume();
        *length = self
            .reader
            .read_varuint64()
            .map(|len| len.min(i64::MAX as u64) as i64)
            .unwrap_or(0);
        self.nodes.push(NodeInfo::array());
        true
    }

    fn exit_array(&mut self) {
        loop {
            match self.peek_entry() {
                EntryType::EndOfArray => {
                    self.consume();
                    break;
                }
                EntryType::EndOfStream => break,
                EntryType::EndOfNode => self.consume(),
                _ => self.skip_entry(),
            }
        }
        self.nodes.pop(true);
    }

    fn skip_entry(&mut self) {
        let entry = self.peek_entry();
        match entry {
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
            EntryType::Invalid => {
                self.consume();
                self.reader.exhaust();
            }
            other => {
                self.consume();
                self.skip_payload(other);
            }
        }
    }

    fn read_string(&mut self) -> Option<String> {
        if !self.expect(EntryType::String) {
            return None;
        }
        self.reader.read_utf8_string()
    }

    fn read_guid(&mut self) -> Option<Uuid> {
        if !self.expect(EntryType::Guid) {
            return None;
        }
        self.read_guid_payload()
    }

    fn read_i64(&mut self) -> Option<i64> {
        if !self.expect(EntryType::Integer) {
            return None;
        }
        match self.reader.read_u8()? {
            INT_SIGNED => self.reader.read_varint64(),
            INT_UNSIGNED => i64::try_from(self.reader.read_varuint64()?).ok(),
            _ => {
                self.reader.exhaust();
                None
            }
        }
    }

    fn read_u64(&mut self) -> Option<u64> {
        if !self.expect(EntryType::Integer) {
            return None;
        }
        match self.reader.read_u8()? {
            INT_SIGNED => u64::try_from(self.reader.read_varint64()?).ok(),
            INT_UNSIGNED => self.reader.read_varuint64(),
            _ => {
                self.reader.exhaust();
                None
            }
        }
    }

    fn read_f64(&mut self) -> Option<f64> {
        if !self.expect(EntryType::FloatingPoint) {
            return None;
        }
        match self.reader.read_u8()? {
            4 => self.reader.read_f32().map(f64::from),
            8 => self.reader.read_f64(),
            _ => {
                self.reader.exhaust();
                None
            }
        }
    }

    fn read_bool(&mut self) -> Option<bool> {
        if !self.expect(EntryType::Boolean) {
            return None;
        }
        self.reader.read_bool()
    }

    fn read_null(&mut self) -> bool {
        self.expect(EntryType::Null)
    }

    fn read_internal_reference(&mut self) -> Option<i32> {
        if !self.expect(EntryType::InternalReference) {
            return None;
        }
        self.reader.read_varint32()
    }

    fn read_external_reference_by_index(&mut self) -> Option<i32> {
        if !self.expect(EntryType::ExternalReferenceByIndex) {
            return None;
        }
        self.reader.read_varint32()
    }

    fn read_external_reference_by_guid(&mut self) -> Option<Uuid> {
        if !self.expect(EntryType::ExternalReferenceByGuid) {
            return None;
        }
        self.read_guid_payload()
    }

    fn read_external_reference_by_string(&mut self) -> Option<String> {
        if !self.expect(EntryType::ExternalReferenceByString) {
            return None;
        }
        self.reader.read_utf8_string()
    }

    fn read_primitive_array(&mut self, out: &mut Vec<u8>) -> Option<PrimitiveArrayHeader> {
        if !self.expect(EntryType::PrimitiveArray) {
            return None;
        }
        let count = self.reader.read_varuint64()? as usize;
        let element_size = self.reader.read_u8()? as usize;
        let len = match count.checked_mul(element_size) {
            Some(len) => len,
            None => {
                self.reader.exhaust();
                return None;
            }
        };
        out.extend_from_slice(self.reader.read_bytes(len)?);
        Some(PrimitiveArrayHeader {
            element_size,
            count,
        })
    }

    fn current_node_id(&self) -> i32 {
        self.nodes.current_id()
    }

    fn current_node_name(&self) -> Option<&str> {
        self.nodes.current_name()
    }

    fn is_in_array_node(&self) -> bool {
        self.nodes.is_in_array()
    }

    fn depth(&self) -> usize {
        self.nodes.depth()
    }

    fn depth_exceeded(&self) -> bool {
        self.depth_exceeded
    }
}
