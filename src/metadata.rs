// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Metadata that precedes the first frame of a FLAC stream.
//!
//! Only STREAMINFO is parsed in full; every other block type is
//! identified just well enough to be skipped by its declared length.

use std::io;

use crate::error::{fmt_err, Result};
use crate::input::BitInput;

/// The type of a metadata block, as carried in its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    CueSheet,
    Picture,
}

impl BlockType {
    fn from_code(code: u8) -> Result<BlockType> {
        match code {
            0 => Ok(BlockType::StreamInfo),
            1 => Ok(BlockType::Padding),
            2 => Ok(BlockType::Application),
            3 => Ok(BlockType::SeekTable),
            4 => Ok(BlockType::VorbisComment),
            5 => Ok(BlockType::CueSheet),
            6 => Ok(BlockType::Picture),
            // 127 is reserved specifically to avoid ever being mistaken for
            // a frame sync code; the rest of 7..=126 are reserved for
            // future block types.
            _ => fmt_err("reserved or invalid metadata block type"),
        }
    }
}

/// The header that precedes every metadata block's payload.
#[derive(Debug, Clone, Copy)]
pub struct BlockHeader {
    pub is_last: bool,
    pub block_type: BlockType,
    pub length: u32,
}

/// Reads a four-byte metadata block header.
pub fn read_block_header(input: &mut BitInput) -> Result<BlockHeader> {
    let byte = input.read_u8()?;
    let is_last = (byte >> 7) == 1;
    let block_type = BlockType::from_code(byte & 0b0111_1111)?;
    let length = input.read_be_u24()?;

    if block_type == BlockType::StreamInfo && length != 34 {
        return fmt_err("STREAMINFO block must be exactly 34 bytes long");
    }

    Ok(BlockHeader {
        is_last,
        block_type,
        length,
    })
}

/// Skips `length` bytes of a metadata block payload the core does not
/// otherwise interpret.
pub fn skip_block(input: &mut BitInput, length: u32) -> Result<()> {
    let mut remaining = length as usize;
    let mut scratch = [0u8; 4096];
    while remaining > 0 {
        let n = remaining.min(scratch.len());
        input.read_fully(&mut scratch[..n])?;
        remaining -= n;
    }
    Ok(())
}

/// The STREAMINFO metadata block: stream-wide parameters every frame
/// must be consistent with.
#[derive(Debug, Clone, Copy)]
pub struct StreamInfo {
    pub min_block_size: u16,
    pub max_block_size: u16,
    pub min_frame_size: Option<u32>,
    pub max_frame_size: Option<u32>,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    pub samples: Option<u64>,
    pub md5sum: [u8; 16],
}

impl StreamInfo {
    /// Reads and validates the 34-byte STREAMINFO payload. The caller is
    /// responsible for having already consumed the block header.
    pub fn read(input: &mut BitInput) -> Result<StreamInfo> {
        let min_block_size = input.read_uint(16)? as u16;
        let max_block_size = input.read_uint(16)? as u16;
        let min_frame_size = input.read_uint(24)?;
        let max_frame_size = input.read_uint(24)?;
        let sample_rate = input.read_uint(20)?;
        let channels = input.read_uint(3)? as u8 + 1;
        let bits_per_sample = input.read_uint(5)? as u8 + 1;
        let samples_hi = input.read_uint(18)? as u64;
        let samples_lo = input.read_uint(18)? as u64;
        let samples = (samples_hi << 18) | samples_lo;

        let mut md5sum = [0u8; 16];
        input.read_fully(&mut md5sum)?;

        if min_block_size > max_block_size {
            return fmt_err("STREAMINFO minimum block size exceeds maximum");
        }
        if min_block_size < 16 {
            return fmt_err("STREAMINFO minimum block size is below 16");
        }
        if max_frame_size != 0 && min_frame_size > max_frame_size {
            return fmt_err("STREAMINFO minimum frame size exceeds maximum");
        }
        if sample_rate == 0 || sample_rate > 655_350 {
            return fmt_err("STREAMINFO sample rate is out of range");
        }
        if bits_per_sample < 4 {
            return fmt_err("STREAMINFO bits per sample is below 4");
        }

        Ok(StreamInfo {
            min_block_size,
            max_block_size,
            min_frame_size: if min_frame_size == 0 {
                None
            } else {
                Some(min_frame_size)
            },
            max_frame_size: if max_frame_size == 0 {
                None
            } else {
                Some(max_frame_size)
            },
            sample_rate,
            channels,
            bits_per_sample,
            samples: if samples == 0 { None } else { Some(samples) },
            md5sum,
        })
    }

    /// Writes the 4-byte metadata block header and 34-byte payload for
    /// this STREAMINFO block.
    pub fn write_block<W: io::Write>(&self, writer: &mut W, is_last: bool) -> Result<()> {
        let header_byte = if is_last { 0b1000_0000 } else { 0 };
        writer.write_all(&[header_byte])?;
        writer.write_all(&34u32.to_be_bytes()[1..])?;

        writer.write_all(&self.min_block_size.to_be_bytes())?;
        writer.write_all(&self.max_block_size.to_be_bytes())?;
        writer.write_all(&self.min_frame_size.unwrap_or(0).to_be_bytes()[1..])?;
        writer.write_all(&self.max_frame_size.unwrap_or(0).to_be_bytes()[1..])?;

        let channels_minus1 = (self.channels - 1) as u64;
        let depth_minus1 = (self.bits_per_sample - 1) as u64;
        let samples = self.samples.unwrap_or(0);

        // sample_rate(20) | channels-1(3) | depth-1(5) | samples(36) packs
        // exactly into 64 bits.
        let packed = ((self.sample_rate as u64) << 44)
            | (channels_minus1 << 41)
            | (depth_minus1 << 36)
            | (samples & 0xF_FFFF_FFFF);
        writer.write_all(&packed.to_be_bytes())?;

        writer.write_all(&self.md5sum)?;
        Ok(())
    }
}

/// The fields of a decoded frame header that must agree with STREAMINFO.
pub struct FrameConstraints {
    pub channels: u8,
    pub sample_rate: Option<u32>,
    pub bits_per_sample: Option<u8>,
    pub block_size: u32,
    pub frame_size: Option<u32>,
    pub is_last_frame: bool,
}

impl StreamInfo {
    /// Checks a decoded frame's parameters against this stream's
    /// STREAMINFO, as required after every frame is decoded.
    pub fn check_frame(&self, frame: &FrameConstraints) -> Result<()> {
        if frame.channels != self.channels {
            return fmt_err("frame channel count does not match STREAMINFO");
        }
        if let Some(sr) = frame.sample_rate {
            if sr != self.sample_rate {
                return fmt_err("frame sample rate does not match STREAMINFO");
            }
        }
        if let Some(bps) = frame.bits_per_sample {
            if bps != self.bits_per_sample {
                return fmt_err("frame bits per sample does not match STREAMINFO");
            }
        }
        if frame.block_size > self.max_block_size as u32 {
            return fmt_err("frame block size exceeds STREAMINFO maximum");
        }
        if frame.block_size < self.min_block_size as u32 {
            let allowed_short_final =
                frame.is_last_frame && self.min_block_size == self.max_block_size;
            if !allowed_short_final {
                return fmt_err("frame block size is below STREAMINFO minimum");
            }
        }
        if let Some(total) = self.samples {
            if frame.block_size as u64 > total {
                return fmt_err("frame block size exceeds the stream's total sample count");
            }
        }
        if let (Some(min_fs), Some(fs)) = (self.min_frame_size, frame.frame_size) {
            if fs < min_fs {
                return fmt_err("frame size is below STREAMINFO minimum");
            }
        }
        if let (Some(max_fs), Some(fs)) = (self.max_frame_size, frame.frame_size) {
            if fs > max_fs {
                return fmt_err("frame size exceeds STREAMINFO maximum");
            }
        }
        Ok(())
    }
}

/// Yields the header of every metadata block following STREAMINFO,
/// skipping each payload as it goes, stopping after the block whose
/// header marks it as last.
///
/// The caller must have already consumed the mandatory STREAMINFO block
/// (always first) before constructing this reader.
pub struct MetadataBlockReader<'a> {
    input: &'a mut BitInput,
    done: bool,
}

impl<'a> MetadataBlockReader<'a> {
    pub fn new(input: &'a mut BitInput) -> MetadataBlockReader<'a> {
        MetadataBlockReader { input, done: false }
    }
}

impl<'a> Iterator for MetadataBlockReader<'a> {
    type Item = Result<BlockHeader>;

    fn next(&mut self) -> Option<Result<BlockHeader>> {
        if self.done {
            return None;
        }
        match read_block_header(self.input) {
            Ok(header) => {
                self.done = header.is_last;
                if let Err(err) = skip_block(self.input, header.length) {
                    self.done = true;
                    return Some(Err(err));
                }
                Some(Ok(header))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ReadSource, SliceSource};

    fn sample_streaminfo() -> StreamInfo {
        StreamInfo {
            min_block_size: 4096,
            max_block_size: 4096,
            min_frame_size: Some(1000),
            max_frame_size: Some(2000),
            sample_rate: 44_100,
            channels: 2,
            bits_per_sample: 16,
            samples: Some(123_456),
            md5sum: [0xab; 16],
        }
    }

    #[test]
    fn streaminfo_round_trips_through_write_and_read() {
        let info = sample_streaminfo();
        let mut bytes = Vec::new();
        info.write_block(&mut bytes, true).unwrap();
        assert_eq!(bytes.len(), 4 + 34);

        let mut input = BitInput::new(Box::new(ReadSource::new(std::io::Cursor::new(bytes))));
        let header = read_block_header(&mut input).unwrap();
        assert!(header.is_last);
        assert_eq!(header.block_type, BlockType::StreamInfo);
        assert_eq!(header.length, 34);

        let parsed = StreamInfo::read(&mut input).unwrap();
        assert_eq!(parsed.min_block_size, info.min_block_size);
        assert_eq!(parsed.max_block_size, info.max_block_size);
        assert_eq!(parsed.min_frame_size, info.min_frame_size);
        assert_eq!(parsed.max_frame_size, info.max_frame_size);
        assert_eq!(parsed.sample_rate, info.sample_rate);
        assert_eq!(parsed.channels, info.channels);
        assert_eq!(parsed.bits_per_sample, info.bits_per_sample);
        assert_eq!(parsed.samples, info.samples);
        assert_eq!(parsed.md5sum, info.md5sum);
    }

    #[test]
    fn streaminfo_rejects_inverted_block_size_bounds() {
        // min_block_size (5000) > max_block_size (4096); the rest of the
        // payload is irrelevant since that check fails first.
        let mut input = BitInput::new(Box::new(SliceSource::new(&[
            0x13, 0x88, 0x10, 0x00, 0, 0, 0, 0, 0, 0, 0xac, 0x44, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ])));
        assert!(StreamInfo::read(&mut input).is_err());
    }

    #[test]
    fn streaminfo_rejects_excessive_sample_rate() {
        let mut info = sample_streaminfo();
        info.sample_rate = 700_000;
        let mut bytes = Vec::new();
        info.write_block(&mut bytes, true).unwrap();
        let mut input = BitInput::new(Box::new(ReadSource::new(std::io::Cursor::new(bytes))));
        read_block_header(&mut input).unwrap();
        assert!(StreamInfo::read(&mut input).is_err());
    }

    #[test]
    fn block_type_rejects_reserved_codes() {
        assert!(BlockType::from_code(127).is_err());
        assert!(BlockType::from_code(42).is_err());
        assert!(BlockType::from_code(6).is_ok());
    }

    #[test]
    fn metadata_block_reader_skips_to_last() {
        // Two padding blocks, the second marked last.
        let mut bytes = Vec::new();
        bytes.push(0x01); // type 1 (padding), not last
        bytes.extend_from_slice(&2u32.to_be_bytes()[1..]);
        bytes.extend_from_slice(&[0, 0]);
        bytes.push(0x81); // type 1 (padding), last
        bytes.extend_from_slice(&1u32.to_be_bytes()[1..]);
        bytes.push(0);

        let mut input = BitInput::new(Box::new(ReadSource::new(std::io::Cursor::new(bytes))));
        let headers: Vec<_> = MetadataBlockReader::new(&mut input)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(headers.len(), 2);
        assert!(!headers[0].is_last);
        assert!(headers[1].is_last);
    }

    #[test]
    fn check_frame_accepts_matching_frame() {
        let info = sample_streaminfo();
        let constraints = FrameConstraints {
            channels: 2,
            sample_rate: Some(44_100),
            bits_per_sample: Some(16),
            block_size: 4096,
            frame_size: Some(1500),
            is_last_frame: false,
        };
        assert!(info.check_frame(&constraints).is_ok());
    }

    #[test]
    fn check_frame_allows_short_final_block_for_fixed_blocksize_stream() {
        let info = sample_streaminfo();
        let constraints = FrameConstraints {
            channels: 2,
            sample_rate: None,
            bits_per_sample: None,
            block_size: 10,
            frame_size: None,
            is_last_frame: true,
        };
        assert!(info.check_frame(&constraints).is_ok());
    }

    #[test]
    fn check_frame_rejects_channel_mismatch() {
        let info = sample_streaminfo();
        let constraints = FrameConstraints {
            channels: 1,
            sample_rate: None,
            bits_per_sample: None,
            block_size: 4096,
            frame_size: None,
            is_last_frame: false,
        };
        assert!(info.check_frame(&constraints).is_err());
    }
}
