//! Run-length coding of bitplanes.
//!
//! The stream starts with the value of the first bit stored as a whole
//! byte. Every byte after it is one run:
//!
//! ```text
//!     MSB       LSB
//!      │         │
//!      ▼         ▼
//!      CCCC 000V
//!      ▲       ▲
//! count┘       └value
//! ```
//!
//! Counts are 1 to 15; longer runs are split into several records of the
//! same value. The stream does not record how many bits it holds, so the
//! decoder must be told the total.

use std::collections::TryReserveError;

/// Longest run a single record can hold.
pub const MAX_RUN: u8 = 0x0F;

/// Encode a sequence of bits into a run stream.
///
/// Any nonzero input value is treated as a set bit. An empty input encodes
/// to a lone zero byte.
pub fn encode(bits: &[u8]) -> Vec<u8> {
    let Some(&first) = bits.first() else {
        return vec![0];
    };

    let mut current = (first != 0) as u8;
    let mut output = Vec::with_capacity(bits.len() / 4 + 2);
    output.push(current);

    let mut count = 1u8;
    for &bit in &bits[1..] {
        let bit = (bit != 0) as u8;
        if bit == current && count < MAX_RUN {
            count += 1;
        } else {
            output.push((count << 4) | current);
            current = bit;
            count = 1;
        }
    }
    output.push((count << 4) | current);

    trace!("run-length encoded {} bits into {} bytes", bits.len(), output.len());
    output
}

/// Number of values the runs of a stream describe, start byte excluded.
fn described_len(stream: &[u8]) -> usize {
    stream.iter().skip(1).map(|&packed| (packed >> 4) as usize).sum()
}

/// Decode a run stream into exactly `total_bits` values.
///
/// Content beyond `total_bits` is dropped. If the stream runs short, the
/// last decoded value is repeated until the output is full; with no runs at
/// all the start byte provides the fill value.
///
/// `total_bits` usually comes from a header. Use [try_decode] when it has
/// not been checked, since padding a short stream out to an absurd length
/// aborts on allocation failure.
pub fn decode(stream: &[u8], total_bits: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(described_len(stream).min(total_bits));
    decode_into(stream, total_bits, &mut output);
    output
}

/// Decode a run stream like [decode], reserving the whole output up front
/// and reporting a failed reservation instead of aborting.
pub fn try_decode(stream: &[u8], total_bits: usize) -> Result<Vec<u8>, TryReserveError> {
    let mut output = Vec::new();
    output.try_reserve_exact(total_bits)?;
    decode_into(stream, total_bits, &mut output);
    Ok(output)
}

fn decode_into(stream: &[u8], total_bits: usize, output: &mut Vec<u8>) {
    let mut current = stream.first().map_or(0, |&b| (b != 0) as u8);

    for &packed in stream.iter().skip(1) {
        if output.len() == total_bits {
            break;
        }

        let count = (packed >> 4) as usize;
        current = (packed & 0x0F != 0) as u8;

        let take = count.min(total_bits - output.len());
        output.extend(std::iter::repeat_n(current, take));
    }

    if output.len() < total_bits {
        trace!("padding {} bits with {current}", total_bits - output.len());
        output.resize(total_bits, current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(encode(&[]), vec![0]);
        assert!(decode(&[0], 0).is_empty());
        assert_eq!(decode(&[], 3), vec![0, 0, 0]);
    }

    #[test]
    fn run_of_fifteen_is_one_record() {
        let bits = [1u8; 15];
        assert_eq!(encode(&bits), vec![1, 0xF1]);
    }

    #[test]
    fn run_of_sixteen_splits() {
        let bits = [0u8; 16];
        assert_eq!(encode(&bits), vec![0, 0xF0, 0x10]);
    }

    #[test]
    fn alternating_runs() {
        let bits = [0, 0, 1, 1, 1, 0];
        assert_eq!(encode(&bits), vec![0, 0x20, 0x31, 0x10]);
        assert_eq!(decode(&encode(&bits), bits.len()), bits);
    }

    #[test]
    fn nonzero_values_are_set_bits() {
        assert_eq!(encode(&[255, 7, 0]), vec![1, 0x21, 0x10]);
    }

    #[test]
    fn decode_truncates() {
        let stream = encode(&[1, 1, 1, 0, 0, 0]);
        assert_eq!(decode(&stream, 4), vec![1, 1, 1, 0]);
    }

    #[test]
    fn decode_pads_with_last_value() {
        let stream = encode(&[0, 0, 1]);
        assert_eq!(decode(&stream, 6), vec![0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn start_byte_fills_empty_stream() {
        assert_eq!(decode(&[1], 3), vec![1, 1, 1]);
    }

    #[test]
    fn unreservable_length_is_reported() {
        assert!(try_decode(&[0, 0x31], usize::MAX).is_err());
        assert_eq!(try_decode(&[0, 0x31], 5).unwrap(), vec![1, 1, 1, 1, 1]);
    }

    #[test]
    fn zero_total_is_empty() {
        let decoded = decode(&[1, 0x20], 0);
        assert!(decoded.is_empty());
        assert_eq!(decode(&[1, 0x20, 0x31], 4), vec![0, 0, 1, 1]);
    }

    #[test]
    fn round_trip_long_runs() {
        let mut bits = vec![0u8; 1000];
        bits.extend(vec![1u8; 37]);
        bits.push(0);
        bits.extend(vec![1u8; 300]);

        assert_eq!(decode(&encode(&bits), bits.len()), bits);
    }
}
