// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! A bit-exact FLAC frame and subframe decoder core.
//!
//! This crate decodes the compressed audio frames of a FLAC stream into
//! integer PCM, channel-planar, bit-exact with the original source. It
//! does not interpret tags, seek tables, pictures, or any other
//! metadata beyond STREAMINFO, and it does not encode, resample, or
//! play audio; callers needing those are expected to layer them on top.
//!
//! [`FlacReader`] is the entry point: open it over a [`ByteSource`],
//! then call [`FlacReader::read_frame`] once per frame until it returns
//! `None` at a clean end of stream.

#![allow(clippy::too_many_arguments)]

pub mod crc;
pub mod error;
pub mod frame;
pub mod input;
pub mod md5;
pub mod metadata;
pub mod sample;
pub mod subframe;

use std::io;

use error::{arg_err, fmt_err, Result};
use frame::DecodedFrame;
use input::{BitInput, ByteSource, ReadSource, SeekableSource};
use metadata::{BlockType, MetadataBlockReader, StreamInfo};

const FLAC_MAGIC: u32 = 0x664c_6143; // "fLaC"

/// A decoded frame's metadata, returned alongside the samples
/// [`FlacReader::read_frame`] wrote into the caller's buffers.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub block_size: u32,
    pub channels: u8,
    pub bits_per_sample: u32,
    pub sample_rate: u32,
    pub first_sample: u64,
}

impl FrameInfo {
    fn from_decoded(decoded: &DecodedFrame, stream_info: &StreamInfo) -> FrameInfo {
        FrameInfo {
            block_size: decoded.block_size,
            channels: decoded.header.channels(),
            bits_per_sample: decoded
                .header
                .bits_per_sample
                .map(|b| b as u32)
                .unwrap_or(stream_info.bits_per_sample as u32),
            sample_rate: decoded.header.sample_rate.unwrap_or(stream_info.sample_rate),
            first_sample: decoded.first_sample,
        }
    }
}

/// A FLAC stream opened for frame-by-frame decoding.
///
/// One reader owns one [`BitInput`] and the scratch buffers its frame
/// assembler reuses across calls; there is no way to call
/// [`read_frame`](FlacReader::read_frame) reentrantly on the same
/// instance; Rust's exclusive-borrow rules enforce that statically
/// rather than through a runtime guard.
pub struct FlacReader {
    input: BitInput,
    stream_info: StreamInfo,
    samples_decoded: u64,
    temp0: Vec<i64>,
    temp1: Vec<i64>,
    scratch: Vec<i32>,
}

impl FlacReader {
    /// Opens a FLAC stream: checks the `fLaC` marker, reads the
    /// mandatory leading STREAMINFO block, and skips any metadata that
    /// follows it, leaving the reader positioned at the first frame.
    pub fn open(source: Box<dyn ByteSource>) -> Result<FlacReader> {
        let mut input = BitInput::new(source);

        let magic = input.read_be_u32()?;
        if magic != FLAC_MAGIC {
            return fmt_err("missing fLaC stream marker");
        }

        let header = metadata::read_block_header(&mut input)?;
        if header.block_type != BlockType::StreamInfo {
            return fmt_err("STREAMINFO must be the first metadata block");
        }
        let stream_info = StreamInfo::read(&mut input)?;

        if !header.is_last {
            for block in MetadataBlockReader::new(&mut input) {
                block?;
            }
        }

        Ok(FlacReader {
            input,
            stream_info,
            samples_decoded: 0,
            temp0: Vec::new(),
            temp1: Vec::new(),
            scratch: Vec::new(),
        })
    }

    /// Convenience constructor over an in-memory byte slice. Copies
    /// `data` so the reader does not borrow from the caller; construct
    /// `FlacReader::open` with a `SliceSource` directly to avoid that.
    pub fn open_slice(data: &[u8]) -> Result<FlacReader> {
        FlacReader::open(Box::new(OwnedSliceSource { data: data.to_vec(), pos: 0 }))
    }

    /// Convenience constructor over any forward-only reader.
    pub fn open_read<R: io::Read + 'static>(reader: R) -> Result<FlacReader> {
        FlacReader::open(Box::new(ReadSource::new(reader)))
    }

    /// Convenience constructor over any seekable reader, such as a file.
    pub fn open_seekable<R: io::Read + io::Seek + 'static>(reader: R) -> Result<FlacReader> {
        FlacReader::open(Box::new(SeekableSource::new(reader)))
    }

    /// The stream-wide parameters every frame must agree with.
    pub fn stream_info(&self) -> &StreamInfo {
        &self.stream_info
    }

    /// Decodes the next frame into `out_samples[channel][out_offset..]`.
    ///
    /// Returns `Ok(None)` at a clean end of stream (before any frame
    /// header byte was read), matching the behavior
    /// [`frame::read_frame`] reports for the same condition.
    pub fn read_frame(
        &mut self,
        out_samples: &mut [&mut [i32]],
        out_offset: usize,
    ) -> Result<Option<FrameInfo>> {
        if out_samples.len() != self.stream_info.channels as usize {
            return arg_err("out_samples channel count does not match the stream");
        }

        let decoded = match frame::read_frame(
            &mut self.input,
            &self.stream_info,
            self.samples_decoded,
            &mut self.temp0,
            &mut self.temp1,
            &mut self.scratch,
        )? {
            Some(d) => d,
            None => return Ok(None),
        };

        let bs = decoded.block_size as usize;
        let channels = decoded.header.channels() as usize;
        for (ch, dst) in out_samples.iter_mut().enumerate().take(channels) {
            if dst.len() < out_offset + bs {
                return arg_err("output buffer is too small for the decoded block size");
            }
            dst[out_offset..out_offset + bs].copy_from_slice(&self.scratch[ch * bs..(ch + 1) * bs]);
        }

        self.samples_decoded += bs as u64;

        Ok(Some(FrameInfo::from_decoded(&decoded, &self.stream_info)))
    }
}

/// An owned counterpart to [`input::SliceSource`] for callers that
/// cannot keep a borrow alive for the reader's lifetime.
struct OwnedSliceSource {
    data: Vec<u8>,
    pos: usize,
}

impl ByteSource for OwnedSliceSource {
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
