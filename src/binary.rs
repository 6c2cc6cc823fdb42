// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/binary.rs - Block framing and compressed payloads for Altium streams.
 *  Copyright (C) 2026  Forest Crossman <cyrozap@gmail.com>
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

/*!
 * # `binary` Module
 *
 * Low-level framing shared by every Altium stream:
 *
 * - blocks: a little-endian `u32` header (24-bit size, 8-bit flags) followed
 *   by exactly `size` bytes of body,
 * - string blocks: a block whose body is a one-byte-length string,
 * - compressed payloads: one marker byte followed by a zlib stream.
 *
 * Text is single-byte Latin-1.
 */

use std::io::prelude::*;

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{Error, Result};
use crate::parameters::ParameterCollection;

const BLOCK_SIZE_MASK: u32 = 0x00FF_FFFF;
const BLOCK_FLAGS_SHIFT: u32 = 24;

/// Marker byte written ahead of framed and compressed payloads. Readers skip
/// it without looking at it.
pub const PAYLOAD_MARKER: u8 = 0x02;

/// Decodes single-byte text.
pub fn decode_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encodes text as single bytes. Characters outside Latin-1 become `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Size and flag byte of a block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub size: usize,
    pub flags: u8,
}

/// A cursor over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(Error::TruncatedStream {
                needed: count,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Everything from the cursor to the end of the buffer.
    pub fn read_to_end(&mut self) -> &'a [u8] {
        let rest = &self.data[self.position..];
        self.position = self.data.len();
        rest
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a 32-bit boolean, where any nonzero value is true.
    pub fn read_bool32(&mut self) -> Result<bool> {
        Ok(self.read_i32()? != 0)
    }

    /// Reads one block and hands its body to `decode_inner`.
    ///
    /// The inner decoder only sees the declared body. Whatever it leaves
    /// unread is skipped: the cursor always ends up just past the block.
    pub fn read_block<T>(
        &mut self,
        decode_inner: impl FnOnce(&mut BinaryReader<'a>, BlockHeader) -> Result<T>,
    ) -> Result<T> {
        let raw = self.read_u32()?;
        let header = BlockHeader {
            size: (raw & BLOCK_SIZE_MASK) as usize,
            flags: (raw >> BLOCK_FLAGS_SHIFT) as u8,
        };
        let body = self.read_bytes(header.size)?;
        decode_inner(&mut BinaryReader::new(body), header)
    }

    /// Reads a string with a one-byte length prefix.
    pub fn read_pascal_string(&mut self) -> Result<String> {
        let length = self.read_u8()? as usize;
        Ok(decode_text(self.read_bytes(length)?))
    }

    /// Reads a block holding a one-byte-length string. An empty block yields
    /// an empty string.
    pub fn read_string_block(&mut self) -> Result<String> {
        self.read_block(|inner, header| {
            if header.size == 0 {
                return Ok(String::new());
            }
            inner.read_pascal_string()
        })
    }

    /// Reads a block holding a `|KEY=VALUE|...` parameter list.
    pub fn read_parameters_block(&mut self) -> Result<ParameterCollection> {
        self.read_block(|inner, _| ParameterCollection::from_bytes(inner.read_to_end()))
    }
}

/// Skips the marker byte of a stored payload, inflates the rest and hands the
/// result to `sink`.
pub fn unwrap_compressed_payload<T>(
    stored: &[u8],
    sink: impl FnOnce(&[u8]) -> Result<T>,
) -> Result<T> {
    let mut reader = BinaryReader::new(stored);
    reader.skip(1)?;

    let mut decoder = ZlibDecoder::new(reader.read_to_end());
    let mut buffer = Vec::new();
    decoder
        .read_to_end(&mut buffer)
        .map_err(|e| Error::DecompressionFailure(e.to_string()))?;

    sink(&buffer)
}

/// The inverse of [unwrap_compressed_payload].
pub fn wrap_compressed_payload(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(vec![PAYLOAD_MARKER], Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Builds byte streams in the same framing [BinaryReader] understands.
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bool32(&mut self, value: bool) {
        self.write_i32(i32::from(value));
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_block(&mut self, flags: u8, body: &[u8]) -> Result<()> {
        let size = u32::try_from(body.len())
            .ok()
            .filter(|size| *size <= BLOCK_SIZE_MASK)
            .ok_or_else(|| Error::InvalidRecord(format!("block of {} bytes", body.len())))?;
        self.write_u32(size | (u32::from(flags) << BLOCK_FLAGS_SHIFT));
        self.write_bytes(body);
        Ok(())
    }

    pub fn write_pascal_string(&mut self, text: &str) -> Result<()> {
        let bytes = encode_text(text);
        let length = u8::try_from(bytes.len())
            .map_err(|_| Error::InvalidRecord(format!("string of {} bytes", bytes.len())))?;
        self.write_u8(length);
        self.write_bytes(&bytes);
        Ok(())
    }

    pub fn write_string_block(&mut self, text: &str) -> Result<()> {
        let mut inner = BinaryWriter::new();
        inner.write_pascal_string(text)?;
        self.write_block(0, &inner.into_inner())
    }

    pub fn write_parameters_block(&mut self, parameters: &ParameterCollection) -> Result<()> {
        self.write_block(0, &parameters.to_bytes())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_cursor_lands_after_declared_length() {
        let mut writer = BinaryWriter::new();
        writer.write_block(0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        writer.write_u8(0xAA);
        let bytes = writer.into_inner();

        let mut reader = BinaryReader::new(&bytes);
        let first = reader
            .read_block(|inner, header| {
                assert_eq!(header.size, 8);
                // Stop early on purpose.
                inner.read_u8()
            })
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(reader.position(), 4 + 8);
        assert_eq!(reader.read_u8().unwrap(), 0xAA);
    }

    #[test]
    fn inner_decoder_cannot_read_past_block() {
        let mut writer = BinaryWriter::new();
        writer.write_block(0, &[1, 2]).unwrap();
        writer.write_u32(0xDEAD_BEEF);
        let bytes = writer.into_inner();

        let mut reader = BinaryReader::new(&bytes);
        let result = reader.read_block(|inner, _| inner.read_u32());
        assert!(matches!(
            result,
            Err(Error::TruncatedStream {
                needed: 4,
                available: 2
            })
        ));
    }

    #[test]
    fn short_block_is_truncated() {
        let mut bytes = 10u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0; 3]);

        let mut reader = BinaryReader::new(&bytes);
        let result = reader.read_block(|_, _| Ok(()));
        assert!(matches!(
            result,
            Err(Error::TruncatedStream {
                needed: 10,
                available: 3
            })
        ));
    }

    #[test]
    fn block_flags_are_split_from_size() {
        let mut bytes = (0x0100_0002u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&[9, 9]);

        let mut reader = BinaryReader::new(&bytes);
        let header = reader.read_block(|_, header| Ok(header)).unwrap();
        assert_eq!(header, BlockHeader { size: 2, flags: 1 });
    }

    #[test]
    fn string_blocks() {
        let mut writer = BinaryWriter::new();
        writer.write_string_block("RES_0603").unwrap();
        writer.write_string_block("").unwrap();
        writer.write_block(0, &[]).unwrap();
        let bytes = writer.into_inner();

        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.read_string_block().unwrap(), "RES_0603");
        assert_eq!(reader.read_string_block().unwrap(), "");
        assert_eq!(reader.read_string_block().unwrap(), "");
        assert!(reader.is_empty());
    }

    #[test]
    fn latin1_text() {
        assert_eq!(decode_text(&[0x31, 0xB5, 0x46]), "1\u{b5}F");
        assert_eq!(encode_text("1\u{b5}F\u{2126}"), vec![0x31, 0xB5, 0x46, b'?']);
    }

    #[test]
    fn compressed_payload_reaches_sink() {
        let stored = wrap_compressed_payload(b"schematic library bytes").unwrap();
        assert_eq!(stored[0], PAYLOAD_MARKER);

        let length = unwrap_compressed_payload(&stored, |bytes| {
            assert_eq!(bytes, b"schematic library bytes");
            Ok(bytes.len())
        })
        .unwrap();
        assert_eq!(length, 23);
    }

    #[test]
    fn corrupt_payload_fails_to_decompress() {
        let result = unwrap_compressed_payload(&[PAYLOAD_MARKER, 0x12, 0x34, 0x56], |_| Ok(()));
        assert!(matches!(result, Err(Error::DecompressionFailure(_))));
    }

    #[test]
    fn empty_payload_is_truncated() {
        let result = unwrap_compressed_payload(&[], |_| Ok(()));
        assert!(matches!(result, Err(Error::TruncatedStream { .. })));
    }
}
