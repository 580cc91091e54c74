// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Subframe decoding: CONSTANT, VERBATIM, FIXED and LPC predictors, and
//! the partitioned-Rice residual that backs the latter two.
//!
//! Every subframe is decoded into a caller-provided `i64` buffer, wide
//! enough to hold the warm-up samples, the residual, and the widened
//! intermediate sums a predictor produces before the frame assembler
//! narrows everything back down to the stream's bit depth.

use crate::error::{fmt_err, Result};
use crate::input::{extend_sign_i32, BitInput};
use crate::sample::fits_signed;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SubframeType {
    Constant,
    Verbatim,
    Fixed(u32),
    Lpc(u32),
}

struct SubframeHeader {
    sf_type: SubframeType,
    wasted_bits: u32,
}

fn read_subframe_header(input: &mut BitInput) -> Result<SubframeHeader> {
    // The first bit is a zero padding bit.
    if input.read_uint(1)? != 0 {
        return fmt_err("subframe header padding bit must be zero");
    }

    let type_code = input.read_uint(6)?;
    let sf_type = match type_code {
        0 => SubframeType::Constant,
        1 => SubframeType::Verbatim,

        // Bit patterns 00001x, 0001xx and 01xxxx are reserved.
        n if (n & 0b111_110 == 0b000_010)
            || (n & 0b111_100 == 0b000_100)
            || (n & 0b110_000 == 0b010_000) =>
        {
            return fmt_err("reserved subframe type");
        }

        n if n & 0b111_000 == 0b001_000 => {
            let order = n & 0b000_111;
            if order > 4 {
                return fmt_err("reserved fixed predictor order");
            }
            SubframeType::Fixed(order)
        }

        // Anything left matches 1xxxxx: an LPC subframe, order - 1 in the
        // low five bits.
        n => SubframeType::Lpc((n & 0b011_111) + 1),
    };

    let has_wasted_bits = input.read_uint(1)? == 1;
    let wasted_bits = if !has_wasted_bits {
        0
    } else {
        let mut count = 1u32;
        while input.read_uint(1)? == 0 {
            count += 1;
        }
        count
    };

    Ok(SubframeHeader { sf_type, wasted_bits })
}

/// Decodes one subframe into `buffer`, whose length is the block size.
pub fn decode(input: &mut BitInput, bps: u32, buffer: &mut [i64]) -> Result<()> {
    let header = read_subframe_header(input)?;

    // Wasted bits are stripped from every sample before encoding, so the
    // constant/verbatim/predictor payload that follows is coded at a
    // narrower width than the subframe's nominal bits per sample.
    if header.wasted_bits >= bps {
        return fmt_err("wasted bits per sample leave no bits for the subframe");
    }
    let effective_bps = bps - header.wasted_bits;

    match header.sf_type {
        SubframeType::Constant => decode_constant(input, effective_bps, buffer)?,
        SubframeType::Verbatim => decode_verbatim(input, effective_bps, buffer)?,
        SubframeType::Fixed(order) => decode_fixed(input, effective_bps, order, buffer)?,
        SubframeType::Lpc(order) => decode_lpc(input, effective_bps, order, buffer)?,
    }

    if header.wasted_bits > 0 {
        for s in buffer.iter_mut() {
            *s <<= header.wasted_bits;
        }
    }

    Ok(())
}

fn decode_constant(input: &mut BitInput, bps: u32, buffer: &mut [i64]) -> Result<()> {
    let value = input.read_signed_int(bps)? as i64;
    for s in buffer.iter_mut() {
        *s = value;
    }
    Ok(())
}

fn decode_verbatim(input: &mut BitInput, bps: u32, buffer: &mut [i64]) -> Result<()> {
    for s in buffer.iter_mut() {
        *s = input.read_signed_int(bps)? as i64;
    }
    Ok(())
}

/// Reads the residual (everything past the warm-up samples) for a FIXED
/// or LPC subframe into `buffer[warm_up..]`. `buffer.len()` is the full
/// block size, needed to compute partition sizes.
fn decode_residual(
    input: &mut BitInput,
    block_size: usize,
    warm_up: usize,
    buffer: &mut [i64],
) -> Result<()> {
    let method = input.read_uint(2)?;
    let param_bits = match method {
        0b00 => 4,
        0b01 => 5,
        _ => return fmt_err("reserved residual coding method"),
    };
    decode_partitioned_rice(input, param_bits, block_size, warm_up, &mut buffer[warm_up..])
}

fn decode_partitioned_rice(
    input: &mut BitInput,
    param_bits: u32,
    block_size: usize,
    warm_up: usize,
    residual: &mut [i64],
) -> Result<()> {
    let partition_order = input.read_uint(4)?;
    let n_partitions = 1usize << partition_order;

    if block_size % n_partitions != 0 {
        return fmt_err("block size is not divisible by the residual partition count");
    }
    let n_samples = block_size >> partition_order;
    if warm_up > n_samples {
        return fmt_err("residual partition order leaves no room for warm-up samples");
    }

    let escape = (1u32 << param_bits) - 1;
    let mut start = 0usize;
    for i in 0..n_partitions {
        let partition_len = n_samples - if i == 0 { warm_up } else { 0 };
        let slice = &mut residual[start..start + partition_len];
        let param = input.read_uint(param_bits)?;
        if param == escape {
            let num_bits = input.read_uint(5)?;
            if num_bits == 0 {
                for s in slice.iter_mut() {
                    *s = 0;
                }
            } else {
                for s in slice.iter_mut() {
                    *s = input.read_signed_int(num_bits)? as i64;
                }
            }
        } else {
            input.read_rice_signed_ints(param, slice)?;
        }
        start += partition_len;
    }

    Ok(())
}

/// Fixed predictor coefficients, newest sample first, shift always zero.
/// Fixed predictors are LPC predictors with a hardcoded coefficient set,
/// so they share [`apply_prediction`] with the general LPC path below.
const FIXED_COEFFICIENTS: [&[i64]; 5] = [
    &[],
    &[1],
    &[2, -1],
    &[3, -3, 1],
    &[4, -6, 4, -1],
];

fn decode_fixed(input: &mut BitInput, bps: u32, order: u32, buffer: &mut [i64]) -> Result<()> {
    let order = order as usize;
    if order > buffer.len() {
        return fmt_err("fixed predictor order exceeds the block size");
    }

    decode_verbatim(input, bps, &mut buffer[..order])?;
    decode_residual(input, buffer.len(), order, buffer)?;

    let mut coefficients = FIXED_COEFFICIENTS[order].to_vec();
    coefficients.reverse();
    apply_prediction(&coefficients, 0, buffer)
}

fn decode_lpc(input: &mut BitInput, bps: u32, order: u32, buffer: &mut [i64]) -> Result<()> {
    let order = order as usize;
    if order > buffer.len() {
        return fmt_err("lpc order exceeds the block size");
    }

    decode_verbatim(input, bps, &mut buffer[..order])?;

    let qlp_precision = input.read_uint(4)? + 1;
    if qlp_precision - 1 == 0b1111 {
        return fmt_err("reserved linear predictor coefficient precision");
    }

    let qlp_shift_raw = input.read_uint(5)?;
    let qlp_shift = extend_sign_i32(qlp_shift_raw, 5);
    if qlp_shift < 0 {
        return fmt_err("negative linear predictor shift is not supported");
    }

    let mut coefficients = Vec::with_capacity(order);
    for _ in 0..order {
        let coef_raw = input.read_uint(qlp_precision)?;
        coefficients.push(extend_sign_i32(coef_raw, qlp_precision) as i64);
    }
    // Coefficients are transmitted newest-sample-first; apply_prediction
    // wants them oldest-first to line up with a left-to-right buffer scan.
    coefficients.reverse();

    decode_residual(input, buffer.len(), order, buffer)?;

    apply_prediction(&coefficients, qlp_shift as u32, buffer)
}

/// Restores predicted samples in place: `buffer[..coefficients.len()]`
/// must already hold real (warm-up) samples, and `buffer[coefficients.len()..]`
/// must hold the residual. `coefficients[k]` is the weight of the sample
/// `coefficients.len() - k` positions before the one being predicted.
fn apply_prediction(coefficients: &[i64], shift: u32, buffer: &mut [i64]) -> Result<()> {
    let order = coefficients.len();
    for i in order..buffer.len() {
        let mut sum: i64 = 0;
        for (k, &c) in coefficients.iter().enumerate() {
            sum += c * buffer[i - order + k];
        }
        if !fits_signed(sum, 54) {
            return fmt_err("linear predictor sum exceeds the 54-bit intermediate bound");
        }
        let prediction = sum >> shift;
        buffer[i] = buffer[i].wrapping_add(prediction);
    }
    Ok(())
}
