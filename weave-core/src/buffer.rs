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

//! Little-endian byte buffers backing the binary stream format.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

#[derive(Default)]
pub struct Writer {
    pub(crate) bf: Vec<u8>,
}

impl Writer {
    pub fn with_capacity(capacity: usize) -> Writer {
        Writer {
            bf: Vec::with_capacity(capacity),
        }
    }

    pub fn reset(&mut self) {
        // keep capacity and reset len to 0
        self.bf.clear();
    }

    pub fn dump(&self) -> Vec<u8> {
        self.bf.clone()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bf
    }

    pub fn len(&self) -> usize {
        self.bf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bf.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.bf.reserve(additional);
    }

    pub fn write_bytes(&mut self, v: &[u8]) -> usize {
        self.bf.extend_from_slice(v);
        v.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.bf.push(value as u8);
    }

    pub fn write_u32(&mut self, value: u32) {
        // writes into a Vec never fail
        let _ = self.bf.write_u32::<LittleEndian>(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        let _ = self.bf.write_f32::<LittleEndian>(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        let _ = self.bf.write_f64::<LittleEndian>(value);
    }

    pub fn write_varint32(&mut self, value: i32) {
        let zigzag = ((value as i64) << 1) ^ ((value as i64) >> 31);
        self.write_varuint32(zigzag as u32)
    }

    pub fn write_varuint32(&mut self, value: u32) {
        self.write_varuint64(value as u64)
    }

    pub fn write_varint64(&mut self, value: i64) {
        let zigzag = ((value << 1) ^ (value >> 63)) as u64;
        self.write_varuint64(zigzag)
    }

    pub fn write_varuint64(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.bf.push(((value as u8) & 0x7F) | 0x80);
            value >>= 7;
        }
        self.bf.push(value as u8);
    }

    /// Length-prefixed utf8.
    pub fn write_utf8_string(&mut self, s: &str) {
        self.write_varuint32(s.len() as u32);
        self.bf.extend_from_slice(s.as_bytes());
    }
}

/// Cursor over an input slice.
///
/// Every read returns `None` once the input is exhausted or malformed and
/// leaves the cursor at the end, so a truncated stream reads as
/// end-of-stream instead of panicking.
pub struct Reader<'a> {
    bf: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bf: &'a [u8]) -> Reader<'a> {
        Reader { bf, cursor: 0 }
    }

    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.bf.len() - self.cursor
    }

    #[inline(always)]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.bf.len()
    }

    /// Moves the cursor to the end; used when the input is found corrupt.
    pub fn exhaust(&mut self) {
        self.cursor = self.bf.len();
    }

    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            self.exhaust();
            return None;
        }
        let bytes = &self.bf[self.cursor..self.cursor + len];
        self.cursor += len;
        Some(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Option<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.bf.get(self.cursor).copied()
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let value = self.peek_u8();
        match value {
            Some(_) => self.cursor += 1,
            None => self.exhaust(),
        }
        value
    }

    pub fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|b| b != 0)
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        self.read_bytes(4).map(LittleEndian::read_u32)
    }

    pub fn read_f32(&mut self) -> Option<f32> {
        self.read_bytes(4).map(LittleEndian::read_f32)
    }

    pub fn read_f64(&mut self) -> Option<f64> {
        self.read_bytes(8).map(LittleEndian::read_f64)
    }

    pub fn read_varuint64(&mut self) -> Option<u64> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let b = self.read_u8()?;
            if shift == 63 && b > 1 {
                self.exhaust();
                return None;
            }
            result |= ((b & 0x7F) as u64) << shift;
            if b & 0x80 == 0 {
                return Some(result);
            }
            shift += 7;
            if shift > 63 {
                self.exhaust();
                return None;
            }
        }
    }

    pub fn read_varint64(&mut self) -> Option<i64> {
        let encoded = self.read_varuint64()?;
        Some(((encoded >> 1) as i64) ^ -((encoded & 1) as i64))
    }

    pub fn read_varuint32(&mut self) -> Option<u32> {
        let value = self.read_varuint64()?;
        if value > u32::MAX as u64 {
            self.exhaust();
            return None;
        }
        Some(value as u32)
    }

    pub fn read_varint32(&mut self) -> Option<i32> {
        let encoded = self.read_varuint32()?;
        Some(((encoded >> 1) as i32) ^ -((encoded & 1) as i32))
    }

    pub fn read_utf8_string(&mut self) -> Option<String> {
        let len = self.read_varuint32()? as usize;
        let bytes = self.read_bytes(len)?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Some(s.to_owned()),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varints_round_trip() {
        let mut writer = Writer::default();
        let signed = [0i64, 1, -1, 63, -64, 300, i64::MAX, i64::MIN];
        let unsigned = [0u64, 127, 128, 16_383, 16_384, u64::MAX];
        for v in signed {
            writer.write_varint64(v);
        }
        for v in unsigned {
            writer.write_varuint64(v);
        }
        writer.write_varint32(i32::MIN);

        let bytes = writer.dump();
        let mut reader = Reader::new(&bytes);
        for v in signed {
            assert_eq!(reader.read_varint64(), Some(v));
        }
        for v in unsigned {
            assert_eq!(reader.read_varuint64(), Some(v));
        }
        assert_eq!(reader.read_varint32(), Some(i32::MIN));
        assert!(reader.is_exhausted());
    }

    #[test]
    fn truncated_input_reads_as_none() {
        let mut writer = Writer::default();
        writer.write_utf8_string("hello");
        let bytes = writer.dump();
        let mut reader = Reader::new(&bytes[..3]);
        assert_eq!(reader.read_utf8_string(), None);
        assert!(reader.is_exhausted());
        assert_eq!(reader.read_u8(), None);
    }

    #[test]
    fn fixed_width_values() {
        let mut writer = Writer::default();
        writer.write_f64(1.5);
        writer.write_f32(-2.25);
        writer.write_u32(0xDEAD_BEEF);
        writer.write_bool(true);
        let bytes = writer.dump();
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_f64(), Some(1.5));
        assert_eq!(reader.read_f32(), Some(-2.25));
        assert_eq!(reader.read_u32(), Some(0xDEAD_BEEF));
        assert_eq!(reader.read_bool(), Some(true));
    }
}
