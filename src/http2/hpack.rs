//! HPACK header compression (RFC 7541)
//!
//! Static + dynamic table, integer and string primitives, and Huffman
//! coding. The two tables on a connection (one per direction) are owned
//! exclusively by the connection task; nothing here is shared.
//!
//! Decode failures are surfaced as [`DecodeError`] so the connection
//! state machine can map them to a GOAWAY with COMPRESSION_ERROR (0x9).

use std::collections::VecDeque;
use std::fmt;

use bytes::{BufMut, BytesMut};

/// Default dynamic table capacity (RFC 7541 §6.3, HTTP/2 default)
pub const DEFAULT_TABLE_CAPACITY: usize = 4096;

/// Per-entry size overhead for table accounting (RFC 7541 §4.1)
const ENTRY_OVERHEAD: usize = 32;

/// Hard ceiling on any requested table capacity
const TABLE_CAPACITY_CEILING: usize = 1024 * 1024;

/// A decoded header name/value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    /// Header name, lowercase on the wire
    pub name: String,
    /// Header value
    pub value: String,
}

impl HeaderField {
    /// Create a new header field
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Size of this entry for table accounting (RFC 7541 §4.1)
    fn table_size(&self) -> usize {
        self.name.len() + self.value.len() + ENTRY_OVERHEAD
    }
}

/// Failure to decode a header block
///
/// Always a connection-level condition for the caller; HPACK state may
/// be corrupt once a block fails mid-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError(pub &'static str);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hpack decode error: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}

/// Static table entries (RFC 7541 Appendix A), 1-based indices
static STATIC_TABLE: &[(&str, &str)] = &[
    (":authority", ""),
    (":method", "GET"),
    (":method", "POST"),
    (":path", "/"),
    (":path", "/index.html"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "200"),
    (":status", "204"),
    (":status", "206"),
    (":status", "304"),
    (":status", "400"),
    (":status", "404"),
    (":status", "500"),
    ("accept-charset", ""),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", ""),
    ("accept-ranges", ""),
    ("accept", ""),
    ("access-control-allow-origin", ""),
    ("age", ""),
    ("allow", ""),
    ("authorization", ""),
    ("cache-control", ""),
    ("content-disposition", ""),
    ("content-encoding", ""),
    ("content-language", ""),
    ("content-length", ""),
    ("content-location", ""),
    ("content-range", ""),
    ("content-type", ""),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("expect", ""),
    ("expires", ""),
    ("from", ""),
    ("host", ""),
    ("if-match", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("if-range", ""),
    ("if-unmodified-since", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("max-forwards", ""),
    ("proxy-authenticate", ""),
    ("proxy-authorization", ""),
    ("range", ""),
    ("referer", ""),
    ("refresh", ""),
    ("retry-after", ""),
    ("server", ""),
    ("set-cookie", ""),
    ("strict-transport-security", ""),
    ("transfer-encoding", ""),
    ("user-agent", ""),
    ("vary", ""),
    ("via", ""),
    ("www-authenticate", ""),
];

fn static_lookup(name: &str, value: &str) -> Option<usize> {
    STATIC_TABLE
        .iter()
        .position(|&(n, v)| n == name && v == value)
        .map(|i| i + 1)
}

fn static_lookup_name(name: &str) -> Option<usize> {
    STATIC_TABLE
        .iter()
        .position(|&(n, _)| n == name)
        .map(|i| i + 1)
}

/// The insertion-ordered dynamic table
///
/// Newest entry at the front; eviction pops from the back until the
/// accounted size fits the capacity. A `VecDeque` keeps both ends O(1).
#[derive(Debug)]
struct DynamicTable {
    entries: VecDeque<HeaderField>,
    size: usize,
    capacity: usize,
}

impl DynamicTable {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            size: 0,
            capacity,
        }
    }

    fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.evict();
    }

    fn insert(&mut self, field: HeaderField) {
        let entry_size = field.table_size();
        while self.size + entry_size > self.capacity {
            match self.entries.pop_back() {
                Some(evicted) => self.size -= evicted.table_size(),
                None => break,
            }
        }
        // An entry larger than the whole table empties it (RFC 7541 §4.4)
        if entry_size <= self.capacity {
            self.size += entry_size;
            self.entries.push_front(field);
        }
    }

    /// 1-based index into the dynamic section (index 1 = newest)
    fn get(&self, index: usize) -> Option<&HeaderField> {
        if index == 0 {
            return None;
        }
        self.entries.get(index - 1)
    }

    fn find(&self, name: &str, value: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|f| f.name == name && f.value == value)
            .map(|i| STATIC_TABLE.len() + i + 1)
    }

    fn find_name(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|f| f.name == name)
            .map(|i| STATIC_TABLE.len() + i + 1)
    }

    fn evict(&mut self) {
        while self.size > self.capacity {
            match self.entries.pop_back() {
                Some(evicted) => self.size -= evicted.table_size(),
                None => break,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Integer and string primitives (RFC 7541 §5)
// ---------------------------------------------------------------------------

fn encode_integer(dst: &mut BytesMut, value: usize, prefix_bits: u8, pattern: u8) {
    let max_prefix = (1usize << prefix_bits) - 1;
    if value < max_prefix {
        dst.put_u8(pattern | value as u8);
        return;
    }
    dst.put_u8(pattern | max_prefix as u8);
    let mut remaining = value - max_prefix;
    while remaining >= 128 {
        dst.put_u8((remaining & 0x7F) as u8 | 0x80);
        remaining >>= 7;
    }
    dst.put_u8(remaining as u8);
}

fn decode_integer(src: &mut &[u8], prefix_bits: u8) -> Result<usize, DecodeError> {
    let (&first, rest) = src
        .split_first()
        .ok_or(DecodeError("truncated integer"))?;
    *src = rest;

    let max_prefix = (1usize << prefix_bits) - 1;
    let prefix = (first as usize) & max_prefix;
    if prefix < max_prefix {
        return Ok(prefix);
    }

    let mut value = max_prefix;
    let mut shift = 0u32;
    loop {
        let (&byte, rest) = src
            .split_first()
            .ok_or(DecodeError("truncated integer continuation"))?;
        *src = rest;

        if shift > 28 {
            return Err(DecodeError("integer exceeds implementation limit"));
        }
        value = value
            .checked_add(((byte & 0x7F) as usize) << shift)
            .ok_or(DecodeError("integer overflow"))?;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
}

fn encode_string(dst: &mut BytesMut, value: &str, huffman: bool) {
    if huffman {
        let encoded = huffman_encode(value.as_bytes());
        encode_integer(dst, encoded.len(), 7, 0x80);
        dst.put_slice(&encoded);
    } else {
        encode_integer(dst, value.len(), 7, 0x00);
        dst.put_slice(value.as_bytes());
    }
}

fn decode_string(src: &mut &[u8]) -> Result<String, DecodeError> {
    let huffman = match src.first() {
        Some(&first) => first & 0x80 != 0,
        None => return Err(DecodeError("truncated string")),
    };
    let length = decode_integer(src, 7)?;
    if src.len() < length {
        return Err(DecodeError("string length exceeds block"));
    }
    let (data, rest) = src.split_at(length);
    *src = rest;

    let octets = if huffman {
        huffman_decode(data)?
    } else {
        data.to_vec()
    };
    String::from_utf8(octets).map_err(|_| DecodeError("string is not valid UTF-8"))
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// HPACK encoder with its own dynamic table
#[derive(Debug)]
pub struct Encoder {
    table: DynamicTable,
    use_huffman: bool,
    /// Capacity change to announce at the start of the next block
    pending_capacity: Option<usize>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Create an encoder with the default table capacity
    pub fn new() -> Self {
        Self {
            table: DynamicTable::new(DEFAULT_TABLE_CAPACITY),
            use_huffman: true,
            pending_capacity: None,
        }
    }

    /// Disable or enable Huffman coding of string literals
    pub fn set_use_huffman(&mut self, use_huffman: bool) {
        self.use_huffman = use_huffman;
    }

    /// Apply the peer's SETTINGS_HEADER_TABLE_SIZE
    ///
    /// Shrinking is announced with a dynamic table size update at the
    /// start of the next header block (RFC 7541 §6.3).
    pub fn set_table_capacity(&mut self, capacity: usize) {
        let capacity = capacity.min(TABLE_CAPACITY_CEILING);
        if capacity < self.table.capacity {
            self.pending_capacity = Some(capacity);
        }
        self.table.set_capacity(capacity);
    }

    /// Encode a header list into `dst`
    pub fn encode(&mut self, fields: &[HeaderField], dst: &mut BytesMut) {
        if let Some(capacity) = self.pending_capacity.take() {
            encode_integer(dst, capacity, 5, 0x20);
        }
        for field in fields {
            self.encode_field(field, dst);
        }
    }

    fn encode_field(&mut self, field: &HeaderField, dst: &mut BytesMut) {
        if let Some(index) = static_lookup(&field.name, &field.value)
            .or_else(|| self.table.find(&field.name, &field.value))
        {
            // Indexed representation (§6.1)
            encode_integer(dst, index, 7, 0x80);
            return;
        }

        // Literal with incremental indexing (§6.2.1)
        match static_lookup_name(&field.name).or_else(|| self.table.find_name(&field.name)) {
            Some(index) => encode_integer(dst, index, 6, 0x40),
            None => {
                dst.put_u8(0x40);
                encode_string(dst, &field.name, self.use_huffman);
            }
        }
        encode_string(dst, &field.value, self.use_huffman);
        self.table.insert(field.clone());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// HPACK decoder with its own dynamic table
#[derive(Debug)]
pub struct Decoder {
    table: DynamicTable,
    /// Largest capacity the peer may select via a size update; this is
    /// what we advertised in SETTINGS_HEADER_TABLE_SIZE
    capacity_limit: usize,
    /// Cap on the total decoded header list size
    max_header_list_size: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create a decoder with the default table capacity
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TABLE_CAPACITY, 16 * 1024)
    }

    /// Create a decoder with explicit table and header-list limits
    pub fn with_limits(capacity: usize, max_header_list_size: usize) -> Self {
        let capacity = capacity.min(TABLE_CAPACITY_CEILING);
        Self {
            table: DynamicTable::new(capacity),
            capacity_limit: capacity,
            max_header_list_size,
        }
    }

    /// Raise or lower the capacity the peer may select
    pub fn set_capacity_limit(&mut self, capacity: usize) {
        self.capacity_limit = capacity.min(TABLE_CAPACITY_CEILING);
        if self.table.capacity > self.capacity_limit {
            self.table.set_capacity(self.capacity_limit);
        }
    }

    /// Decode a complete header block
    pub fn decode(&mut self, mut src: &[u8]) -> Result<Vec<HeaderField>, DecodeError> {
        let mut fields = Vec::new();
        let mut list_size = 0;

        while !src.is_empty() {
            let first = src[0];

            if first & 0x80 != 0 {
                // Indexed field (§6.1)
                let index = decode_integer(&mut src, 7)?;
                let field = self.lookup(index)?;
                list_size += field.table_size();
                fields.push(field);
            } else if first & 0xC0 == 0x40 {
                // Literal with incremental indexing (§6.2.1)
                let field = self.decode_literal(&mut src, 6)?;
                self.table.insert(field.clone());
                list_size += field.table_size();
                fields.push(field);
            } else if first & 0xE0 == 0x20 {
                // Dynamic table size update (§6.3)
                let capacity = decode_integer(&mut src, 5)?;
                if capacity > self.capacity_limit {
                    return Err(DecodeError("table size update exceeds advertised limit"));
                }
                self.table.set_capacity(capacity);
            } else {
                // Literal without indexing (§6.2.2) or never indexed (§6.2.3);
                // both use a 4-bit prefix and skip the table insert.
                let field = self.decode_literal(&mut src, 4)?;
                list_size += field.table_size();
                fields.push(field);
            }

            if list_size > self.max_header_list_size {
                return Err(DecodeError("header list too large"));
            }
        }

        Ok(fields)
    }

    fn decode_literal(
        &mut self,
        src: &mut &[u8],
        prefix_bits: u8,
    ) -> Result<HeaderField, DecodeError> {
        let name_index = decode_integer(src, prefix_bits)?;
        let name = if name_index == 0 {
            decode_string(src)?
        } else {
            self.lookup(name_index)?.name
        };
        let value = decode_string(src)?;
        Ok(HeaderField { name, value })
    }

    fn lookup(&self, index: usize) -> Result<HeaderField, DecodeError> {
        if index == 0 {
            return Err(DecodeError("index zero"));
        }
        if index <= STATIC_TABLE.len() {
            let (name, value) = STATIC_TABLE[index - 1];
            return Ok(HeaderField::new(name, value));
        }
        self.table
            .get(index - STATIC_TABLE.len())
            .cloned()
            .ok_or(DecodeError("index beyond table bounds"))
    }
}

// ---------------------------------------------------------------------------
// Huffman coding (RFC 7541 Appendix B)
// ---------------------------------------------------------------------------

/// `(code, bit_length)` per symbol; entry 256 is EOS
#[rustfmt::skip]
static HUFFMAN_TABLE: [(u32, u8); 257] = [
    (0x1ff8, 13), (0x7fffd8, 23), (0xfffffe2, 28), (0xfffffe3, 28),
    (0xfffffe4, 28), (0xfffffe5, 28), (0xfffffe6, 28), (0xfffffe7, 28),
    (0xfffffe8, 28), (0xffffea, 24), (0x3ffffffc, 30), (0xfffffe9, 28),
    (0xfffffea, 28), (0x3ffffffd, 30), (0xfffffeb, 28), (0xfffffec, 28),
    (0xfffffed, 28), (0xfffffee, 28), (0xfffffef, 28), (0xffffff0, 28),
    (0xffffff1, 28), (0xffffff2, 28), (0x3ffffffe, 30), (0xffffff3, 28),
    (0xffffff4, 28), (0xffffff5, 28), (0xffffff6, 28), (0xffffff7, 28),
    (0xffffff8, 28), (0xffffff9, 28), (0xffffffa, 28), (0xffffffb, 28),
    (0x14, 6), (0x3f8, 10), (0x3f9, 10), (0xffa, 12),
    (0x1ff9, 13), (0x15, 6), (0xf8, 8), (0x7fa, 11),
    (0x3fa, 10), (0x3fb, 10), (0xf9, 8), (0x7fb, 11),
    (0xfa, 8), (0x16, 6), (0x17, 6), (0x18, 6),
    (0x0, 5), (0x1, 5), (0x2, 5), (0x19, 6),
    (0x1a, 6), (0x1b, 6), (0x1c, 6), (0x1d, 6),
    (0x1e, 6), (0x1f, 6), (0x5c, 7), (0xfb, 8),
    (0x7ffc, 15), (0x20, 6), (0xffb, 12), (0x3fc, 10),
    (0x1ffa, 13), (0x21, 6), (0x5d, 7), (0x5e, 7),
    (0x5f, 7), (0x60, 7), (0x61, 7), (0x62, 7),
    (0x63, 7), (0x64, 7), (0x65, 7), (0x66, 7),
    (0x67, 7), (0x68, 7), (0x69, 7), (0x6a, 7),
    (0x6b, 7), (0x6c, 7), (0x6d, 7), (0x6e, 7),
    (0x6f, 7), (0x70, 7), (0x71, 7), (0x72, 7),
    (0xfc, 8), (0x73, 7), (0xfd, 8), (0x1ffb, 13),
    (0x7fff0, 19), (0x1ffc, 13), (0x3ffc, 14), (0x22, 6),
    (0x7ffd, 15), (0x3, 5), (0x23, 6), (0x4, 5),
    (0x24, 6), (0x5, 5), (0x25, 6), (0x26, 6),
    (0x27, 6), (0x6, 5), (0x74, 7), (0x75, 7),
    (0x28, 6), (0x29, 6), (0x2a, 6), (0x7, 5),
    (0x2b, 6), (0x76, 7), (0x2c, 6), (0x8, 5),
    (0x9, 5), (0x2d, 6), (0x77, 7), (0x78, 7),
    (0x79, 7), (0x7a, 7), (0x7b, 7), (0x7ffe, 15),
    (0x7fc, 11), (0x3ffd, 14), (0x1ffd, 13), (0xffffffc, 28),
    (0xfffe6, 20), (0x3fffd2, 22), (0xfffe7, 20), (0xfffe8, 20),
    (0x3fffd3, 22), (0x3fffd4, 22), (0x3fffd5, 22), (0x7fffd9, 23),
    (0x3fffd6, 22), (0x7fffda, 23), (0x7fffdb, 23), (0x7fffdc, 23),
    (0x7fffdd, 23), (0x7fffde, 23), (0xffffeb, 24), (0x7fffdf, 23),
    (0xffffec, 24), (0xffffed, 24), (0x3fffd7, 22), (0x7fffe0, 23),
    (0xffffee, 24), (0x7fffe1, 23), (0x7fffe2, 23), (0x7fffe3, 23),
    (0x7fffe4, 23), (0x1fffdc, 21), (0x3fffd8, 22), (0x7fffe5, 23),
    (0x3fffd9, 22), (0x7fffe6, 23), (0x7fffe7, 23), (0xffffef, 24),
    (0x3fffda, 22), (0x1fffdd, 21), (0xfffe9, 20), (0x3fffdb, 22),
    (0x3fffdc, 22), (0x7fffe8, 23), (0x7fffe9, 23), (0x1fffde, 21),
    (0x7fffea, 23), (0x3fffdd, 22), (0x3fffde, 22), (0xfffff0, 24),
    (0x1fffdf, 21), (0x3fffdf, 22), (0x7fffeb, 23), (0x7fffec, 23),
    (0x1fffe0, 21), (0x1fffe1, 21), (0x3fffe0, 22), (0x1fffe2, 21),
    (0x7fffed, 23), (0x3fffe1, 22), (0x7fffee, 23), (0x7fffef, 23),
    (0xfffea, 20), (0x3fffe2, 22), (0x3fffe3, 22), (0x3fffe4, 22),
    (0x7ffff0, 23), (0x3fffe5, 22), (0x3fffe6, 22), (0x7ffff1, 23),
    (0x3ffffe0, 26), (0x3ffffe1, 26), (0xfffeb, 20), (0x7fff1, 19),
    (0x3fffe7, 22), (0x7ffff2, 23), (0x3fffe8, 22), (0x1ffffec, 25),
    (0x3ffffe2, 26), (0x3ffffe3, 26), (0x3ffffe4, 26), (0x7ffffde, 27),
    (0x7ffffdf, 27), (0x3ffffe5, 26), (0xfffff1, 24), (0x1ffffed, 25),
    (0x7fff2, 19), (0x1fffe3, 21), (0x3ffffe6, 26), (0x7ffffe0, 27),
    (0x7ffffe1, 27), (0x3ffffe7, 26), (0x7ffffe2, 27), (0xfffff2, 24),
    (0x1fffe4, 21), (0x1fffe5, 21), (0x3ffffe8, 26), (0x3ffffe9, 26),
    (0xffffffd, 28), (0x7ffffe3, 27), (0x7ffffe4, 27), (0x7ffffe5, 27),
    (0xfffec, 20), (0xfffff3, 24), (0xfffed, 20), (0x1fffe6, 21),
    (0x3fffe9, 22), (0x1fffe7, 21), (0x1fffe8, 21), (0x7ffff3, 23),
    (0x3fffea, 22), (0x3fffeb, 22), (0x1ffffee, 25), (0x1ffffef, 25),
    (0xfffff4, 24), (0xfffff5, 24), (0x3ffffea, 26), (0x7ffff4, 23),
    (0x3ffffeb, 26), (0x7ffffe6, 27), (0x3ffffec, 26), (0x3ffffed, 26),
    (0x7ffffe7, 27), (0x7ffffe8, 27), (0x7ffffe9, 27), (0x7ffffea, 27),
    (0x7ffffeb, 27), (0xffffffe, 28), (0x7ffffec, 27), (0x7ffffed, 27),
    (0x7ffffee, 27), (0x7ffffef, 27), (0x7fffff0, 27), (0x3ffffee, 26),
    (0x3fffffff, 30),
];

fn huffman_encode(src: &[u8]) -> Vec<u8> {
    let mut dst = Vec::with_capacity(src.len());
    let mut accumulator: u64 = 0;
    let mut bits: u32 = 0;

    for &byte in src {
        let (code, code_bits) = HUFFMAN_TABLE[byte as usize];
        accumulator = (accumulator << code_bits) | u64::from(code);
        bits += u32::from(code_bits);
        while bits >= 8 {
            bits -= 8;
            dst.push((accumulator >> bits) as u8);
            accumulator &= (1u64 << bits) - 1;
        }
    }

    // EOS-prefix padding, all ones (§5.2)
    if bits > 0 {
        let padding = 8 - bits;
        accumulator = (accumulator << padding) | ((1u64 << padding) - 1);
        dst.push(accumulator as u8);
    }

    dst
}

fn huffman_decode(src: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut dst = Vec::with_capacity(src.len() * 2);
    let mut accumulator: u64 = 0;
    let mut bits: u32 = 0;

    for &byte in src {
        accumulator = (accumulator << 8) | u64::from(byte);
        bits += 8;

        'symbols: while bits >= 5 {
            for (symbol, &(code, code_bits)) in HUFFMAN_TABLE.iter().enumerate() {
                let code_bits = u32::from(code_bits);
                if bits < code_bits {
                    continue;
                }
                let shift = bits - code_bits;
                if (accumulator >> shift) as u32 == code {
                    if symbol == 256 {
                        return Err(DecodeError("EOS symbol in Huffman data"));
                    }
                    dst.push(symbol as u8);
                    accumulator &= (1u64 << shift) - 1;
                    bits = shift;
                    continue 'symbols;
                }
            }
            break;
        }
    }

    // Trailing bits must be a strict EOS prefix: fewer than 8 bits, all ones
    if bits >= 8 {
        return Err(DecodeError("undecodable Huffman sequence"));
    }
    if bits > 0 && accumulator != (1u64 << bits) - 1 {
        return Err(DecodeError("invalid Huffman padding"));
    }

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, value: &str) -> HeaderField {
        HeaderField::new(name, value)
    }

    #[test]
    fn integer_fits_in_prefix() {
        // RFC 7541 C.1.1
        let mut buf = BytesMut::new();
        encode_integer(&mut buf, 10, 5, 0x00);
        assert_eq!(&buf[..], &[0x0A]);

        let mut src: &[u8] = &buf;
        assert_eq!(decode_integer(&mut src, 5).unwrap(), 10);
    }

    #[test]
    fn integer_spills_into_continuations() {
        // RFC 7541 C.1.2
        let mut buf = BytesMut::new();
        encode_integer(&mut buf, 1337, 5, 0x00);
        assert_eq!(&buf[..], &[0x1F, 0x9A, 0x0A]);

        let mut src: &[u8] = &buf;
        assert_eq!(decode_integer(&mut src, 5).unwrap(), 1337);
    }

    #[test]
    fn integer_overflow_is_rejected() {
        let mut src: &[u8] = &[0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert!(decode_integer(&mut src, 7).is_err());
    }

    #[test]
    fn huffman_round_trips() {
        for input in ["www.example.com", "no-cache", "custom-key", "", "a"] {
            let encoded = huffman_encode(input.as_bytes());
            assert_eq!(huffman_decode(&encoded).unwrap(), input.as_bytes());
        }
    }

    #[test]
    fn huffman_known_wire_form() {
        // RFC 7541 C.4.1: "www.example.com"
        let wire = [
            0xF1, 0xE3, 0xC2, 0xE5, 0xF2, 0x3A, 0x6B, 0xA0, 0xAB, 0x90, 0xF4, 0xFF,
        ];
        assert_eq!(huffman_encode(b"www.example.com"), wire);
        assert_eq!(huffman_decode(&wire).unwrap(), b"www.example.com");
    }

    #[test]
    fn huffman_bad_padding_is_rejected() {
        // '0' is the 5-bit code 0b00000; three bytes of zeros leave
        // non-ones padding behind.
        assert!(huffman_decode(&[0x00]).is_err());
    }

    #[test]
    fn decode_rfc_request_without_huffman() {
        // RFC 7541 C.3.1
        let wire: &[u8] = &[
            0x82, 0x86, 0x84, 0x41, 0x0F, b'w', b'w', b'w', b'.', b'e', b'x', b'a', b'm', b'p',
            b'l', b'e', b'.', b'c', b'o', b'm',
        ];
        let mut decoder = Decoder::new();
        let fields = decoder.decode(wire).unwrap();
        assert_eq!(
            fields,
            vec![
                field(":method", "GET"),
                field(":scheme", "http"),
                field(":path", "/"),
                field(":authority", "www.example.com"),
            ]
        );
    }

    #[test]
    fn decode_literal_with_indexing_rfc_c2_1() {
        let wire: &[u8] = &[
            0x40, 0x0A, b'c', b'u', b's', b't', b'o', b'm', b'-', b'k', b'e', b'y', 0x0D, b'c',
            b'u', b's', b't', b'o', b'm', b'-', b'h', b'e', b'a', b'd', b'e', b'r',
        ];
        let mut decoder = Decoder::new();
        let fields = decoder.decode(wire).unwrap();
        assert_eq!(fields, vec![field("custom-key", "custom-header")]);

        // The entry is now in the dynamic table at index 62.
        let again = decoder.decode(&[0xBE]).unwrap();
        assert_eq!(again, vec![field("custom-key", "custom-header")]);
    }

    #[test]
    fn decode_never_indexed_rfc_c2_3() {
        let wire: &[u8] = &[
            0x10, 0x08, b'p', b'a', b's', b's', b'w', b'o', b'r', b'd', 0x06, b's', b'e', b'c',
            b'r', b'e', b't',
        ];
        let mut decoder = Decoder::new();
        assert_eq!(
            decoder.decode(wire).unwrap(),
            vec![field("password", "secret")]
        );
    }

    #[test]
    fn decode_index_zero_is_error() {
        let mut decoder = Decoder::new();
        assert!(decoder.decode(&[0x80]).is_err());
    }

    #[test]
    fn decode_out_of_range_index_is_error() {
        let mut decoder = Decoder::new();
        assert!(decoder.decode(&[0xBE]).is_err());
    }

    #[test]
    fn decode_truncated_string_is_error() {
        let mut decoder = Decoder::new();
        assert!(decoder.decode(&[0x40, 0x0A, b'a', b'b']).is_err());
    }

    #[test]
    fn size_update_beyond_limit_is_error() {
        let mut decoder = Decoder::with_limits(4096, 16 * 1024);
        let mut wire = BytesMut::new();
        encode_integer(&mut wire, 8192, 5, 0x20);
        assert!(decoder.decode(&wire).is_err());
    }

    #[test]
    fn size_update_within_limit_shrinks_table() {
        let mut decoder = Decoder::new();
        decoder
            .decode(&[
                0x40, 0x03, b'a', b'b', b'c', 0x03, b'x', b'y', b'z',
            ])
            .unwrap();
        assert_eq!(decoder.table.entries.len(), 1);

        let mut wire = BytesMut::new();
        encode_integer(&mut wire, 0, 5, 0x20);
        decoder.decode(&wire).unwrap();
        assert!(decoder.table.entries.is_empty());
    }

    #[test]
    fn dynamic_table_evicts_from_the_tail() {
        let mut table = DynamicTable::new(100);
        table.insert(field("first", "1")); // 5 + 1 + 32 = 38
        table.insert(field("second", "2")); // 6 + 1 + 32 = 39
        table.insert(field("third", "3")); // 5 + 1 + 32 = 38
        assert!(table.size <= 100);
        // Oldest entry went first; newest sits at index 1.
        assert_eq!(table.get(1).unwrap().name, "third");
        assert_eq!(table.get(2).unwrap().name, "second");
        assert!(table.get(3).is_none());
    }

    #[test]
    fn oversized_entry_empties_table() {
        let mut table = DynamicTable::new(40);
        table.insert(field("small", "v"));
        assert_eq!(table.entries.len(), 1);
        table.insert(field("name-too-long-to-fit", "and-a-long-value-too"));
        assert!(table.entries.is_empty());
        assert_eq!(table.size, 0);
    }

    #[test]
    fn encoder_decoder_round_trip_with_dynamic_entries() {
        let mut encoder = Encoder::new();
        let mut decoder = Decoder::new();

        let fields = vec![
            field(":method", "GET"),
            field(":path", "/api/users"),
            field(":scheme", "https"),
            field(":authority", "example.com"),
            field("x-request-id", "abc-123"),
        ];

        let mut block = BytesMut::new();
        encoder.encode(&fields, &mut block);
        assert_eq!(decoder.decode(&block).unwrap(), fields);

        // Second block reuses both dynamic tables.
        let again = vec![field(":method", "GET"), field("x-request-id", "abc-123")];
        let mut block2 = BytesMut::new();
        encoder.encode(&again, &mut block2);
        assert!(block2.len() < block.len());
        assert_eq!(decoder.decode(&block2).unwrap(), again);
    }

    #[test]
    fn indexed_static_entries_encode_to_one_byte() {
        let mut encoder = Encoder::new();
        let mut block = BytesMut::new();
        encoder.encode(&[field(":method", "GET")], &mut block);
        assert_eq!(&block[..], &[0x82]);

        block.clear();
        encoder.encode(&[field(":status", "200")], &mut block);
        assert_eq!(&block[..], &[0x88]);
    }

    #[test]
    fn header_list_size_limit_is_enforced() {
        let mut decoder = Decoder::with_limits(4096, 64);
        let mut block = BytesMut::new();
        let mut encoder = Encoder::new();
        encoder.set_use_huffman(false);
        encoder.encode(
            &[
                field("x-first-header", "some-value"),
                field("x-second-header", "other-value"),
            ],
            &mut block,
        );
        assert!(decoder.decode(&block).is_err());
    }

    #[test]
    fn encoder_announces_capacity_shrink() {
        let mut encoder = Encoder::new();
        encoder.set_table_capacity(256);

        let mut block = BytesMut::new();
        encoder.encode(&[field(":method", "GET")], &mut block);
        // 0x20-prefixed size update, then the indexed field.
        assert_eq!(block[0] & 0xE0, 0x20);
        assert_eq!(*block.last().unwrap(), 0x82);

        let mut decoder = Decoder::new();
        assert_eq!(
            decoder.decode(&block).unwrap(),
            vec![field(":method", "GET")]
        );
    }
}
