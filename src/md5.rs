// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! MD5 over the decoded PCM stream, for comparison against the checksum
//! STREAMINFO carries. Verification is left to the caller; this module
//! only computes the digest.

use crate::error::{arg_err, Result};

const S: [u32; 64] = [
    7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, 5, 9, 14, 20, 5, 9, 14, 20, 5, 9,
    14, 20, 5, 9, 14, 20, 4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, 6, 10, 15,
    21, 6, 10, 15, 21, 6, 10, 15, 21, 6, 10, 15, 21,
];

const K: [u32; 64] = [
    0xd76aa478, 0xe8c7b756, 0x242070db, 0xc1bdceee, 0xf57c0faf, 0x4787c62a, 0xa8304613, 0xfd469501,
    0x698098d8, 0x8b44f7af, 0xffff5bb1, 0x895cd7be, 0x6b901122, 0xfd987193, 0xa679438e, 0x49b40821,
    0xf61e2562, 0xc040b340, 0x265e5a51, 0xe9b6c7aa, 0xd62f105d, 0x02441453, 0xd8a1e681, 0xe7d3fbc8,
    0x21e1cde6, 0xc33707d6, 0xf4d50d87, 0x455a14ed, 0xa9e3e905, 0xfcefa3f8, 0x676f02d9, 0x8d2a4c8a,
    0xfffa3942, 0x8771f681, 0x6d9d6122, 0xfde5380c, 0xa4beea44, 0x4bdecfa9, 0xf6bb4b60, 0xbebfbc70,
    0x289b7ec6, 0xeaa127fa, 0xd4ef3085, 0x04881d05, 0xd9d4d039, 0xe6db99e5, 0x1fa27cf8, 0xc4ac5665,
    0xf4292244, 0x432aff97, 0xab9423a7, 0xfc93a039, 0x655b59c3, 0x8f0ccc92, 0xffeff47d, 0x85845dd1,
    0x6fa87e4f, 0xfe2ce6e0, 0xa3014314, 0x4e0811a1, 0xf7537e82, 0xbd3af235, 0x2ad7d2bb, 0xeb86d391,
];

struct Md5 {
    a0: u32,
    b0: u32,
    c0: u32,
    d0: u32,
    buffer: Vec<u8>,
    total_len: u64,
}

impl Md5 {
    fn new() -> Md5 {
        Md5 {
            a0: 0x67452301,
            b0: 0xefcdab89,
            c0: 0x98badcfe,
            d0: 0x10325476,
            buffer: Vec::with_capacity(64),
            total_len: 0,
        }
    }

    fn update(&mut self, data: &[u8]) {
        self.total_len += data.len() as u64;
        self.buffer.extend_from_slice(data);
        let mut offset = 0;
        while self.buffer.len() - offset >= 64 {
            let mut block = [0u8; 64];
            block.copy_from_slice(&self.buffer[offset..offset + 64]);
            self.process_block(&block);
            offset += 64;
        }
        self.buffer.drain(..offset);
    }

    fn process_block(&mut self, block: &[u8; 64]) {
        let mut m = [0u32; 16];
        for (i, chunk) in block.chunks_exact(4).enumerate() {
            m[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        let (mut a, mut b, mut c, mut d) = (self.a0, self.b0, self.c0, self.d0);

        for i in 0..64 {
            let (f, g) = match i {
                0..=15 => ((b & c) | (!b & d), i),
                16..=31 => ((d & b) | (!d & c), (5 * i + 1) % 16),
                32..=47 => (b ^ c ^ d, (3 * i + 5) % 16),
                _ => (c ^ (b | !d), (7 * i) % 16),
            };
            let f = f
                .wrapping_add(a)
                .wrapping_add(K[i])
                .wrapping_add(m[g]);
            a = d;
            d = c;
            c = b;
            b = b.wrapping_add(f.rotate_left(S[i]));
        }

        self.a0 = self.a0.wrapping_add(a);
        self.b0 = self.b0.wrapping_add(b);
        self.c0 = self.c0.wrapping_add(c);
        self.d0 = self.d0.wrapping_add(d);
    }

    fn finish(mut self) -> [u8; 16] {
        let bit_len = self.total_len.wrapping_mul(8);
        self.buffer.push(0x80);
        while self.buffer.len() % 64 != 56 {
            self.buffer.push(0);
        }
        self.buffer.extend_from_slice(&bit_len.to_le_bytes());

        let mut offset = 0;
        while offset < self.buffer.len() {
            let mut block = [0u8; 64];
            block.copy_from_slice(&self.buffer[offset..offset + 64]);
            self.process_block(&block);
            offset += 64;
        }

        let mut digest = [0u8; 16];
        digest[0..4].copy_from_slice(&self.a0.to_le_bytes());
        digest[4..8].copy_from_slice(&self.b0.to_le_bytes());
        digest[8..12].copy_from_slice(&self.c0.to_le_bytes());
        digest[12..16].copy_from_slice(&self.d0.to_le_bytes());
        digest
    }
}

/// Computes the MD5 digest of channel-planar `i32` samples, interleaved
/// per sample across channels as little-endian two's-complement integers
/// of `bytes_per_sample` bytes (1, 2, 3, or 4), matching what the
/// STREAMINFO checksum is computed over.
///
/// `channels[ch]` holds one channel's samples; all channels must have
/// the same length.
pub fn digest(channels: &[&[i32]], bytes_per_sample: u32) -> Result<[u8; 16]> {
    if !(1..=4).contains(&bytes_per_sample) {
        return arg_err("unsupported sample byte width for MD5 digest");
    }
    let n_channels = channels.len();
    if n_channels == 0 {
        return Ok(Md5::new().finish());
    }
    let n_samples = channels[0].len();
    for ch in channels {
        if ch.len() != n_samples {
            return arg_err("all channels must have the same number of samples");
        }
    }

    let mut md5 = Md5::new();
    let mut scratch = [0u8; 4];
    for i in 0..n_samples {
        for ch in channels {
            let bytes = ch[i].to_le_bytes();
            scratch[..bytes_per_sample as usize].copy_from_slice(&bytes[..bytes_per_sample as usize]);
            md5.update(&scratch[..bytes_per_sample as usize]);
        }
    }
    Ok(md5.finish())
}
