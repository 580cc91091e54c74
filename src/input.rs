// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Byte-oriented sources, and the bit-level reader built on top of them.
//!
//! [`BitInput`] is the single point through which every byte of a FLAC
//! stream passes: metadata headers, frame headers and subframe payloads
//! alike. It keeps three moving parts in step: a byte buffer refilled in
//! bulk from the underlying [`ByteSource`], a 64-bit register that holds
//! bits pulled from that buffer but not yet consumed by a caller, and a
//! pair of CRC accumulators that must see each stream byte exactly once,
//! lagging behind the register by however many bytes are still in flight.

use std::io;
use std::sync::OnceLock;

use crate::crc::{update_crc16_slice, update_crc8_slice};
use crate::error::{eof_err, fmt_err, state_err, Result};

/// An abstract byte-oriented source of FLAC stream data.
///
/// The decoder core does not care whether the bytes come from a file, a
/// byte slice held in memory, or a forward-only pipe; it only needs the
/// operations below. `seek_to` and `len` are optional: sources that do
/// not support them keep the default implementations, which report
/// "unsupported" and "unknown" respectively.
pub trait ByteSource {
    /// Reads into `buf`, returning the number of bytes read. Like
    /// `io::Read::read`, a return value of `0` with a non-empty `buf`
    /// signals end of stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// The total length of the source in bytes, if known in advance.
    fn len(&mut self) -> Option<u64> {
        None
    }

    /// Seeks to an absolute byte position. Callers must follow a
    /// successful seek by notifying the [`BitInput`] via
    /// [`BitInput::seek_to`], which this trait's default consumer does
    /// for you.
    fn seek_to(&mut self, _pos: u64) -> io::Result<()> {
        Err(unsupported_seek())
    }

    /// Whether `seek_to` is expected to succeed.
    fn can_seek(&self) -> bool {
        false
    }
}

fn unsupported_seek() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "this byte source does not support seeking",
    )
}

/// A fixed, in-memory byte source, such as a FLAC file already loaded
/// into a `Vec<u8>` or `&[u8]`.
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> SliceSource<'a> {
        SliceSource { data, pos: 0 }
    }
}

impl<'a> ByteSource for SliceSource<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.data.len() - self.pos;
        let n = buf.len().min(available);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn len(&mut self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.data.len() as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek position past end of data",
            ));
        }
        self.pos = pos as usize;
        Ok(())
    }

    fn can_seek(&self) -> bool {
        true
    }
}

/// Wraps any forward-only `io::Read` as a byte source. Seeking is not
/// supported.
pub struct ReadSource<R> {
    inner: R,
}

impl<R: io::Read> ReadSource<R> {
    pub fn new(inner: R) -> ReadSource<R> {
        ReadSource { inner }
    }
}

impl<R: io::Read> ByteSource for ReadSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Wraps any `io::Read + io::Seek` (such as `std::fs::File`) as a
/// seekable byte source.
pub struct SeekableSource<R> {
    inner: R,
}

impl<R: io::Read + io::Seek> SeekableSource<R> {
    pub fn new(inner: R) -> SeekableSource<R> {
        SeekableSource { inner }
    }
}

impl<R: io::Read + io::Seek> ByteSource for SeekableSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn len(&mut self) -> Option<u64> {
        let current = self.inner.stream_position().ok()?;
        let end = self.inner.seek(io::SeekFrom::End(0)).ok()?;
        self.inner.seek(io::SeekFrom::Start(current)).ok()?;
        Some(end)
    }

    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.inner.seek(io::SeekFrom::Start(pos))?;
        Ok(())
    }

    fn can_seek(&self) -> bool {
        true
    }
}

/// Sign-extends the two's-complement integer in the `bits` least
/// significant bits of `val` to a full-width `i32`.
pub(crate) fn extend_sign_i32(val: u32, bits: u32) -> i32 {
    if bits >= 32 {
        val as i32
    } else if val < (1 << (bits - 1)) {
        val as i32
    } else {
        (val as i32).wrapping_sub(1i32 << bits)
    }
}

/// Maps an unsigned zigzag code back to its signed value:
/// `0, 1, 2, 3, 4, ... -> 0, -1, 1, -2, 2, ...`
fn zigzag_to_signed(u: u64) -> i64 {
    if u & 1 == 1 {
        -((u >> 1) as i64) - 1
    } else {
        (u >> 1) as i64
    }
}

const RICE_WINDOW_BITS: u32 = 13;
const RICE_WINDOW_SIZE: usize = 1 << RICE_WINDOW_BITS;
const RICE_GUARD_LIMIT: u64 = 1u64 << 53;

/// One entry of a Rice fast-path table: the number of bits a code
/// consumed from the window, or `0` if the window did not contain a
/// complete code for this parameter.
#[derive(Clone, Copy)]
struct RiceEntry {
    bits: u8,
    value: i64,
}

fn decode_rice_from_window(window: u32, param: u32) -> RiceEntry {
    let mut q = 0u32;
    while q < RICE_WINDOW_BITS {
        let bit = (window >> (RICE_WINDOW_BITS - 1 - q)) & 1;
        if bit == 1 {
            break;
        }
        q += 1;
    }
    if q >= RICE_WINDOW_BITS {
        return RiceEntry { bits: 0, value: 0 };
    }
    let bits_needed = q + 1 + param;
    if bits_needed > RICE_WINDOW_BITS {
        return RiceEntry { bits: 0, value: 0 };
    }
    let mut remainder = 0u32;
    for i in 0..param {
        let pos = q + 1 + i;
        let bit = (window >> (RICE_WINDOW_BITS - 1 - pos)) & 1;
        remainder = (remainder << 1) | bit;
    }
    let u = ((q as u64) << param) | remainder as u64;
    RiceEntry {
        bits: bits_needed as u8,
        value: zigzag_to_signed(u),
    }
}

fn build_rice_table(param: u32) -> Vec<RiceEntry> {
    (0..RICE_WINDOW_SIZE)
        .map(|window| decode_rice_from_window(window as u32, param))
        .collect()
}

static RICE_TABLES: OnceLock<Vec<Vec<RiceEntry>>> = OnceLock::new();

fn rice_table(param: u32) -> &'static [RiceEntry] {
    let tables = RICE_TABLES.get_or_init(|| (0..=31).map(build_rice_table).collect());
    &tables[param as usize]
}

const DEFAULT_BYTE_BUFFER_CAPACITY: usize = 4096;

/// Buffered, CRC-tracking, bit-at-a-time reader over a [`ByteSource`].
pub struct BitInput {
    source: Box<dyn ByteSource>,

    byte_buffer: Vec<u8>,
    byte_buffer_start_pos: u64,
    byte_buffer_index: usize,
    byte_buffer_len: usize,

    bit_buffer: u64,
    bit_buffer_len: u32,

    crc8: u8,
    crc16: u16,
    crc_start_index: usize,
}

impl BitInput {
    pub fn new(source: Box<dyn ByteSource>) -> BitInput {
        BitInput::with_capacity(source, DEFAULT_BYTE_BUFFER_CAPACITY)
    }

    pub fn with_capacity(source: Box<dyn ByteSource>, capacity: usize) -> BitInput {
        BitInput {
            source,
            byte_buffer: vec![0u8; capacity.max(8)],
            byte_buffer_start_pos: 0,
            byte_buffer_index: 0,
            byte_buffer_len: 0,
            bit_buffer: 0,
            bit_buffer_len: 0,
            crc8: 0,
            crc16: 0,
            crc_start_index: 0,
        }
    }

    fn fold_crc_upto(&mut self, upto_index: usize) {
        if upto_index > self.crc_start_index {
            let bytes = &self.byte_buffer[self.crc_start_index..upto_index];
            self.crc8 = update_crc8_slice(self.crc8, bytes);
            self.crc16 = update_crc16_slice(self.crc16, bytes);
            self.crc_start_index = upto_index;
        }
    }

    /// Folds everything the caller has genuinely consumed so far into the
    /// running CRCs: all of the byte buffer except the bytes still
    /// sitting unconsumed in the bit register.
    fn sync_crcs(&mut self) {
        let lag = ((self.bit_buffer_len + 7) / 8) as usize;
        let consumed_index = self.byte_buffer_index.saturating_sub(lag);
        self.fold_crc_upto(consumed_index);
    }

    fn refill_byte_buffer(&mut self) -> Result<()> {
        // Whatever is left in the old buffer is about to be discarded, so
        // it must be folded into the CRCs unconditionally, even the bytes
        // still sitting as look-ahead in the bit register; they already
        // belong to the stream the caller is working through.
        self.fold_crc_upto(self.byte_buffer_len);

        self.byte_buffer_start_pos += self.byte_buffer_len as u64;

        let capacity = self.byte_buffer.len();
        let mut filled = 0usize;
        while filled < capacity {
            let n = self.source.read(&mut self.byte_buffer[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        self.byte_buffer_len = filled;
        self.byte_buffer_index = 0;
        self.crc_start_index = 0;
        Ok(())
    }

    /// Pulls one more byte from the byte buffer into the bit register.
    /// Returns `Ok(false)` at a clean end of stream.
    fn pull_byte(&mut self) -> Result<bool> {
        if self.byte_buffer_index >= self.byte_buffer_len {
            self.refill_byte_buffer()?;
            if self.byte_buffer_len == 0 {
                return Ok(false);
            }
        }
        let byte = self.byte_buffer[self.byte_buffer_index];
        self.byte_buffer_index += 1;
        self.bit_buffer |= (byte as u64) << (56 - self.bit_buffer_len);
        self.bit_buffer_len += 8;
        Ok(true)
    }

    fn require_bits(&mut self, n: u32) -> Result<()> {
        while self.bit_buffer_len < n {
            if !self.pull_byte()? {
                return eof_err("ran out of input while reading bits");
            }
        }
        Ok(())
    }

    /// Tries to top up the register to at least `target` bits, but does
    /// not treat running out of input as an error; callers that need the
    /// bits to actually be there fall back to a path that does check.
    fn fill_best_effort(&mut self, target: u32) -> Result<()> {
        while self.bit_buffer_len < target && self.bit_buffer_len <= 56 {
            if !self.pull_byte()? {
                break;
            }
        }
        Ok(())
    }

    /// Reads the next `n` bits (1 <= n <= 32) MSB-first as an unsigned
    /// integer.
    pub fn read_uint(&mut self, n: u32) -> Result<u32> {
        debug_assert!(n >= 1 && n <= 32);
        self.require_bits(n)?;
        let value = (self.bit_buffer >> (64 - n)) as u32;
        self.bit_buffer <<= n;
        self.bit_buffer_len -= n;
        Ok(value)
    }

    /// Reads the next `n` bits and sign-extends them to a signed 32-bit
    /// integer.
    pub fn read_signed_int(&mut self, n: u32) -> Result<i32> {
        let value = self.read_uint(n)?;
        Ok(extend_sign_i32(value, n))
    }

    fn read_one_rice_slow(&mut self, param: u32) -> Result<i64> {
        let mut q: u64 = 0;
        loop {
            self.require_bits(1)?;
            let bit = self.bit_buffer >> 63;
            self.bit_buffer <<= 1;
            self.bit_buffer_len -= 1;
            if bit == 1 {
                break;
            }
            q += 1;
            if (q << param) >= RICE_GUARD_LIMIT {
                return fmt_err("rice code quotient exceeds the safety guard");
            }
        }
        let r = if param > 0 {
            self.read_uint(param)? as u64
        } else {
            0
        };
        let u = (q << param) | r;
        Ok(zigzag_to_signed(u))
    }

    /// Decodes one Rice-coded signed integer with parameter `param`
    /// (0 <= param <= 31), trying the precomputed window table first.
    fn read_one_rice(&mut self, param: u32, table: &'static [RiceEntry]) -> Result<i64> {
        if self.bit_buffer_len < RICE_WINDOW_BITS {
            self.fill_best_effort(56)?;
        }
        if self.bit_buffer_len >= RICE_WINDOW_BITS {
            let window = (self.bit_buffer >> (64 - RICE_WINDOW_BITS)) as usize;
            let entry = table[window];
            if entry.bits != 0 {
                self.bit_buffer <<= entry.bits;
                self.bit_buffer_len -= entry.bits as u32;
                return Ok(entry.value);
            }
        }
        self.read_one_rice_slow(param)
    }

    /// Decodes `out.len()` Rice-coded signed integers with the given
    /// parameter into `out`, using the window lookup table where
    /// possible and falling back to bit-by-bit decoding otherwise.
    pub fn read_rice_signed_ints(&mut self, param: u32, out: &mut [i64]) -> Result<()> {
        debug_assert!(param <= 31);
        let table = rice_table(param);
        for slot in out.iter_mut() {
            *slot = self.read_one_rice(param, table)?;
        }
        Ok(())
    }

    /// Reads a single byte. The reader must be byte-aligned. Returns
    /// `Ok(None)` at a clean end of stream rather than an error.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.bit_buffer_len % 8 != 0 {
            return state_err("read_byte called while not byte-aligned");
        }
        if self.bit_buffer_len == 0 {
            if self.byte_buffer_index >= self.byte_buffer_len {
                self.refill_byte_buffer()?;
                if self.byte_buffer_len == 0 {
                    return Ok(None);
                }
            }
            let byte = self.byte_buffer[self.byte_buffer_index];
            self.byte_buffer_index += 1;
            return Ok(Some(byte));
        }
        Ok(Some(self.read_uint(8)? as u8))
    }

    /// Fills `buf` completely. The reader must be byte-aligned.
    pub fn read_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.bit_buffer_len % 8 != 0 {
            return state_err("read_fully called while not byte-aligned");
        }
        for slot in buf.iter_mut() {
            *slot = match self.read_byte()? {
                Some(b) => b,
                None => return eof_err("unexpected end of stream while reading bytes"),
            };
        }
        Ok(())
    }

    /// Convenience read of a single byte as an 8-bit unsigned integer
    /// (not required to be byte-aligned beforehand).
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_uint(8)? as u8)
    }

    /// Convenience read of a big-endian 16-bit unsigned integer.
    pub fn read_be_u16(&mut self) -> Result<u16> {
        Ok(self.read_uint(16)? as u16)
    }

    /// Convenience read of a big-endian 24-bit unsigned integer.
    pub fn read_be_u24(&mut self) -> Result<u32> {
        self.read_uint(24)
    }

    /// Convenience read of a big-endian 32-bit unsigned integer.
    pub fn read_be_u32(&mut self) -> Result<u32> {
        self.read_uint(32)
    }

    fn absolute_bit_position(&self) -> u64 {
        (self.byte_buffer_start_pos + self.byte_buffer_index as u64) * 8
            - self.bit_buffer_len as u64
    }

    /// The absolute byte position of the next bit that will be read.
    pub fn get_position(&self) -> u64 {
        self.absolute_bit_position() / 8
    }

    /// The sub-byte bit offset of the next bit that will be read; `0`
    /// when byte-aligned.
    pub fn get_bit_position(&self) -> u32 {
        (self.absolute_bit_position() % 8) as u32
    }

    /// Starts a fresh CRC computation from the current position.
    pub fn reset_crcs(&mut self) {
        self.sync_crcs();
        self.crc8 = 0;
        self.crc16 = 0;
    }

    /// Returns the CRC-8 accumulated since the last `reset_crcs`. Must
    /// be called at a byte boundary.
    pub fn get_crc8(&mut self) -> u8 {
        debug_assert_eq!(self.bit_buffer_len % 8, 0);
        self.sync_crcs();
        self.crc8
    }

    /// Returns the CRC-16 accumulated since the last `reset_crcs`. Must
    /// be called at a byte boundary.
    pub fn get_crc16(&mut self) -> u16 {
        debug_assert_eq!(self.bit_buffer_len % 8, 0);
        self.sync_crcs();
        self.crc16
    }

    /// Whether the underlying source supports seeking.
    pub fn can_seek(&self) -> bool {
        self.source.can_seek()
    }

    /// Seeks the underlying source to an absolute byte position and
    /// flushes all buffered state, as `positionChanged` does for a
    /// subclassed reader in other FLAC implementations.
    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.source.seek_to(pos)?;
        self.byte_buffer_start_pos = pos;
        self.byte_buffer_index = 0;
        self.byte_buffer_len = 0;
        self.crc_start_index = 0;
        self.bit_buffer = 0;
        self.bit_buffer_len = 0;
        self.crc8 = 0;
        self.crc16 = 0;
        Ok(())
    }

    /// The length of the underlying source in bytes, if known.
    pub fn source_len(&mut self) -> Option<u64> {
        self.source.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_over(bytes: &'static [u8]) -> BitInput {
        BitInput::new(Box::new(SliceSource::new(bytes)))
    }

    #[test]
    fn read_uint_reads_msb_first() {
        let mut input = input_over(&[0b1010_0101, 0b1110_0001]);
        assert_eq!(input.read_uint(1).unwrap(), 1);
        assert_eq!(input.read_uint(1).unwrap(), 0);
        assert_eq!(input.read_uint(2).unwrap(), 0b10);
        assert_eq!(input.read_uint(4).unwrap(), 0b0101);
        assert_eq!(input.read_uint(8).unwrap(), 0b1110_0001);
    }

    #[test]
    fn read_uint_spans_byte_boundaries() {
        let mut input = input_over(&[0b1010_0101, 0b1110_0001, 0b1101_0010]);
        assert_eq!(input.read_uint(5).unwrap(), 0b10100);
        assert_eq!(input.read_uint(13).unwrap(), 0b101_1110_0001_11);
    }

    #[test]
    fn read_uint_fails_on_starvation() {
        let mut input = input_over(&[0xff]);
        assert!(input.read_uint(16).is_err());
    }

    #[test]
    fn read_signed_int_sign_extends() {
        let mut input = input_over(&[0b1000_0000]);
        assert_eq!(input.read_signed_int(4).unwrap(), -8);
        let mut input = input_over(&[0b0111_0000]);
        assert_eq!(input.read_signed_int(4).unwrap(), 7);
    }

    #[test]
    fn read_byte_requires_alignment() {
        let mut input = input_over(&[0xff, 0x00]);
        input.read_uint(3).unwrap();
        assert!(input.read_byte().is_err());
    }

    #[test]
    fn read_byte_returns_none_at_eof() {
        let mut input = input_over(&[0x42]);
        assert_eq!(input.read_byte().unwrap(), Some(0x42));
        assert_eq!(input.read_byte().unwrap(), None);
    }

    #[test]
    fn read_fully_fills_buffer_or_fails() {
        let mut input = input_over(&[1, 2, 3]);
        let mut buf = [0u8; 3];
        input.read_fully(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);

        let mut input = input_over(&[1, 2]);
        let mut buf = [0u8; 3];
        assert!(input.read_fully(&mut buf).is_err());
    }

    #[test]
    fn crc_covers_exactly_the_consumed_bytes() {
        let mut input = input_over(&[0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39]);
        input.reset_crcs();
        for _ in 0..9 {
            input.read_u8().unwrap();
        }
        assert_eq!(input.get_crc8(), 0xf4);
        assert_eq!(input.get_crc16(), 0xfee8);
    }

    #[test]
    fn crc_survives_reset_mid_stream() {
        let mut input = input_over(&[0xaa, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39]);
        input.read_u8().unwrap();
        input.reset_crcs();
        for _ in 0..9 {
            input.read_u8().unwrap();
        }
        assert_eq!(input.get_crc8(), 0xf4);
        assert_eq!(input.get_crc16(), 0xfee8);
    }

    #[test]
    fn crc_tracks_sub_byte_consumption_lag() {
        // Consuming bits one at a time (rather than whole bytes) must not
        // pull bytes into the CRC before they are genuinely consumed.
        let mut input = input_over(&[0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39]);
        input.reset_crcs();
        for _ in 0..9 {
            input.read_uint(4).unwrap();
            input.read_uint(4).unwrap();
        }
        assert_eq!(input.get_crc8(), 0xf4);
        assert_eq!(input.get_crc16(), 0xfee8);
    }

    #[test]
    fn position_tracks_bytes_and_bits() {
        let mut input = input_over(&[0xff, 0xff, 0xff]);
        assert_eq!(input.get_position(), 0);
        assert_eq!(input.get_bit_position(), 0);
        input.read_uint(5).unwrap();
        assert_eq!(input.get_position(), 0);
        assert_eq!(input.get_bit_position(), 5);
        input.read_uint(3).unwrap();
        assert_eq!(input.get_position(), 1);
        assert_eq!(input.get_bit_position(), 0);
    }

    #[test]
    fn seek_resets_position_crcs_and_buffers() {
        let mut input = input_over(&[0x00, 0x00, 0x31, 0x32, 0x33]);
        input.read_uint(3).unwrap();
        input.seek_to(2).unwrap();
        assert_eq!(input.get_position(), 2);
        assert_eq!(input.get_bit_position(), 0);
        input.reset_crcs();
        input.read_u8().unwrap();
        input.read_u8().unwrap();
        assert_eq!(input.get_crc8(), update_crc8_slice(0, b"12"));
    }

    #[test]
    fn rice_fast_path_matches_slow_path() {
        // Encode the values [0, -1, 1, -2, 5] with param = 2 by hand, then
        // decode through the public API; they are short enough that the
        // fast path should handle all of them from a single window.
        //
        // zigzag(0) = 0b00, zigzag(-1) = 0b01, zigzag(1) = 0b10,
        // zigzag(-2) = 0b11, zigzag(5) = 0b1010
        // Each Rice code is (quotient unary)(1)(2-bit remainder).
        // 0 -> q=0,r=0  -> 1 00
        // 1 -> q=0,r=1  -> 1 01
        // 2 -> q=0,r=2  -> 1 10
        // 3 -> q=0,r=3  -> 1 11
        // 10 -> q=2,r=2 -> 0 0 1 10
        let mut bits: Vec<u8> = Vec::new();
        let push_bits = |bits: &mut Vec<u8>, value: u32, n: u32| {
            for i in (0..n).rev() {
                bits.push(((value >> i) & 1) as u8);
            }
        };
        push_bits(&mut bits, 0b1_00, 3);
        push_bits(&mut bits, 0b1_01, 3);
        push_bits(&mut bits, 0b1_10, 3);
        push_bits(&mut bits, 0b1_11, 3);
        push_bits(&mut bits, 0b0_0_1_10, 5);

        while bits.len() % 8 != 0 {
            bits.push(0);
        }
        let mut bytes = Vec::new();
        for chunk in bits.chunks(8) {
            let mut byte = 0u8;
            for &b in chunk {
                byte = (byte << 1) | b;
            }
            bytes.push(byte);
        }

        let data: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        let mut input = input_over(data);
        let mut out = [0i64; 5];
        input.read_rice_signed_ints(2, &mut out).unwrap();
        assert_eq!(out, [0, -1, 1, -2, 5]);
    }

    #[test]
    fn rice_quotient_guard_rejects_runaway_unary() {
        // All-zero input with param 0 never terminates the unary prefix,
        // so the guard must trip before the source even runs dry.
        let zeros: &'static [u8] = Box::leak(vec![0u8; 2048].into_boxed_slice());
        let mut input = input_over(zeros);
        let mut out = [0i64; 1];
        assert!(input.read_rice_signed_ints(0, &mut out).is_err());
    }
}
