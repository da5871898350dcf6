//! LZ77-style compressor with a bounded back-reference window.
//!
//! The window is the run of input bytes already consumed. A match source
//! must lie entirely inside it, so the encoder never produces a
//! back-reference whose length exceeds its offset. The decoder still copies
//! byte by byte and handles such overlapping references.

use crate::binio::{FlagReader, FlagWriter, Token, MAX_LENGTH, MAX_OFFSET};

/// Tunables for [`compress`]. Decoding needs none of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOptions {
    /// How far back a match may start
    pub window_size: usize,

    /// Shortest match worth a back-reference
    pub min_match: usize,

    /// Longest match a single back-reference covers
    pub max_match: usize,

    /// Maximum number of window positions examined per token. `None`
    /// searches the whole window.
    pub max_search_depth: Option<usize>,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            window_size: 8192,
            min_match: 4,
            max_match: MAX_LENGTH,
            max_search_depth: None,
        }
    }
}

impl WindowOptions {
    /// Clamp every field into the range the token format can express.
    pub fn sanitized(self) -> Self {
        let min_match = self.min_match.clamp(1, MAX_LENGTH);
        Self {
            window_size: self.window_size.min(MAX_OFFSET),
            min_match,
            max_match: self.max_match.clamp(min_match, MAX_LENGTH),
            max_search_depth: self.max_search_depth.map(|d| d.max(1)),
        }
    }
}

/// Search the window behind `pos` for the longest match, nearest first.
///
/// Returns `(offset, length)`; a length of zero means nothing matched.
fn find_match(data: &[u8], pos: usize, options: &WindowOptions) -> (usize, usize) {
    let window_start = pos.saturating_sub(options.window_size);
    let ceiling = options.max_match.min(data.len() - pos);
    let depth = options.max_search_depth.unwrap_or(usize::MAX);

    let mut best_length = 0;
    let mut best_offset = 0;

    for i in (window_start..pos).rev().take(depth) {
        let limit = ceiling.min(pos - i);

        // A candidate that cannot reach past the current best is skipped
        if limit <= best_length || data[i + best_length] != data[pos + best_length] {
            continue;
        }

        let length = data[i..i + limit]
            .iter()
            .zip(&data[pos..pos + limit])
            .take_while(|(a, b)| a == b)
            .count();

        if length > best_length {
            best_length = length;
            best_offset = pos - i;

            if best_length == ceiling {
                break;
            }
        }
    }

    (best_offset, best_length)
}

/// Compress `data` into a flag-grouped token stream.
///
/// Empty input produces empty output.
pub fn compress(data: &[u8], options: &WindowOptions) -> Vec<u8> {
    let options = options.sanitized();

    let mut output = Vec::with_capacity(data.len() / 2 + 1);
    let mut writer = FlagWriter::new(&mut output);
    let mut references = 0usize;

    let mut pos = 0;
    while pos < data.len() {
        let (offset, length) = find_match(data, pos, &options);

        if length >= options.min_match {
            writer.write_token(Token::Reference {
                offset: offset as u16,
                length: length as u16,
            });
            references += 1;
            pos += length;
        } else {
            writer.write_token(Token::Literal(data[pos]));
            pos += 1;
        }
    }

    trace!(
        "window compressed {} bytes into {} tokens ({} references)",
        data.len(),
        writer.token_count(),
        references
    );

    output
}

/// Decompress a token stream produced by [`compress`].
///
/// This never fails. A back-reference reaching outside the decoded output
/// stops copying at the first out of range byte, and a token cut short by
/// the end of the block ends decoding.
pub fn decompress(block: &[u8]) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::with_capacity(block.len() * 4);
    let mut reader = FlagReader::new(block);

    while let Some(token) = reader.read_token() {
        match token {
            Token::Literal(byte) => output.push(byte),
            Token::Reference { offset, length } => {
                let Some(start) = output.len().checked_sub(offset as usize) else {
                    warn!(
                        "back-reference offset {offset} exceeds output of {} bytes at block byte {}",
                        output.len(),
                        reader.byte_offset()
                    );
                    continue;
                };

                for i in start..start + length as usize {
                    // `i < len` always holds once offset >= 1
                    let Some(&byte) = output.get(i) else {
                        break;
                    };
                    output.push(byte);
                }
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(data: &[u8]) -> Vec<u8> {
        decompress(&compress(data, &WindowOptions::default()))
    }

    #[test]
    fn empty() {
        assert!(compress(&[], &WindowOptions::default()).is_empty());
        assert!(decompress(&[]).is_empty());
    }

    #[test]
    fn short_input_is_literals() {
        let compressed = compress(b"abc", &WindowOptions::default());
        assert_eq!(compressed, vec![0, b'a', b'b', b'c']);
    }

    #[test]
    fn periodic_pattern() {
        let data = b"ababababababababababababababab";
        assert_eq!(data.len(), 30);

        let compressed = compress(data, &WindowOptions::default());
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed), data);
    }

    #[test]
    fn overlapping_reference_replicates_pattern() {
        // "ab" then a reference of offset 2, length 10
        let block = [0b100, b'a', b'b', 2, 10];
        assert_eq!(decompress(&block), b"abababababab");
    }

    #[test]
    fn nearest_match_wins_ties() {
        // "wxyz" occurs at 0 and 5; the copy at 5 is nearer to position 10
        let data = b"wxyz.wxyz.wxyz";
        let compressed = compress(data, &WindowOptions::default());

        let tokens: Vec<Token> = FlagReader::new(&compressed).collect();
        assert_eq!(tokens.len(), 7);
        assert_eq!(tokens[5], Token::Reference { offset: 5, length: 5 });
        assert_eq!(tokens[6], Token::Reference { offset: 5, length: 4 });
        assert_eq!(decompress(&compressed), data);
    }

    #[test]
    fn long_run_uses_capped_lengths() {
        let data = vec![0xF0u8; 2000];
        let compressed = compress(&data, &WindowOptions::default());

        for token in FlagReader::new(&compressed) {
            if let Token::Reference { length, .. } = token {
                assert!(length as usize <= MAX_LENGTH);
            }
        }
        assert!(compressed.len() < 100);
        assert_eq!(decompress(&compressed), data);
    }

    #[test]
    fn far_offsets_use_two_bytes() {
        let mut data: Vec<u8> = (0..=255u8).collect();
        data.extend(0..=255u8);
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn out_of_range_reference_is_ignored() {
        // Reference of offset 9 with only one byte decoded
        let block = [0b10, b'q', 9, 4];
        assert_eq!(decompress(&block), b"q");
    }

    #[test]
    fn zero_offset_copies_nothing() {
        let block = [0b10, b'q', 0, 4];
        assert_eq!(decompress(&block), b"q");
    }

    #[test]
    fn search_depth_limits_matches() {
        let mut data = b"0123456789".to_vec();
        data.extend(vec![b'-'; 20]);
        data.extend(b"0123456789");

        let exhaustive = compress(&data, &WindowOptions::default());
        let shallow = compress(
            &data,
            &WindowOptions {
                max_search_depth: Some(4),
                ..Default::default()
            },
        );

        assert!(shallow.len() > exhaustive.len());
        assert_eq!(decompress(&shallow), data);
        assert_eq!(decompress(&exhaustive), data);
    }

    #[test]
    fn small_window_round_trips() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 97) as u8 ^ (i / 300) as u8).collect();
        let options = WindowOptions {
            window_size: 64,
            ..Default::default()
        };
        assert_eq!(decompress(&compress(&data, &options)), data);
    }

    #[test]
    fn sanitized_clamps() {
        let options = WindowOptions {
            window_size: 1 << 20,
            min_match: 0,
            max_match: 4000,
            max_search_depth: Some(0),
        }
        .sanitized();

        assert_eq!(options.window_size, MAX_OFFSET);
        assert_eq!(options.min_match, 1);
        assert_eq!(options.max_match, MAX_LENGTH);
        assert_eq!(options.max_search_depth, Some(1));
    }
}
