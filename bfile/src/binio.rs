//! Flag-grouped token I/O for the window compressor.
//!
//! Tokens are written in groups of eight. Each group is preceded by a flag
//! byte whose bit `i` is set when token `i` of the group is a
//! back-reference.

/// Offsets below this fit in a single byte.
const SHORT_OFFSET_LIMIT: u16 = 0x40;

/// Lengths below this fit in a single byte.
const SHORT_LENGTH_LIMIT: u16 = 0x10;

/// Largest offset the two byte offset field can carry.
pub const MAX_OFFSET: usize = 0x3FFF;

/// Largest length the two byte length field can carry.
pub const MAX_LENGTH: usize = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Literal(u8),
    Reference { offset: u16, length: u16 },
}

pub struct FlagWriter<'a> {
    output: &'a mut Vec<u8>,

    flag_offset: usize,
    flag_bit: u8,

    token_count: usize,
}

impl<'a> FlagWriter<'a> {
    pub fn new(output: &'a mut Vec<u8>) -> Self {
        Self {
            output,

            flag_offset: 0,
            flag_bit: 0,

            token_count: 0,
        }
    }

    /// Number of tokens written so far
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Write one token, opening a new flag group when needed
    pub fn write_token(&mut self, token: Token) {
        if self.flag_bit == 0 {
            self.flag_offset = self.output.len();
            self.output.push(0);
        }

        match token {
            Token::Literal(byte) => self.output.push(byte),
            Token::Reference { offset, length } => {
                debug_assert!(offset >= 1 && offset as usize <= MAX_OFFSET);
                debug_assert!(length >= 1 && length as usize <= MAX_LENGTH);

                self.output[self.flag_offset] |= 1 << self.flag_bit;

                if offset < SHORT_OFFSET_LIMIT {
                    self.output.push(offset as u8);
                } else {
                    self.output.push(0x40 | ((offset >> 8) as u8 & 0x3F));
                    self.output.push(offset as u8);
                }

                if length < SHORT_LENGTH_LIMIT {
                    self.output.push(length as u8);
                } else {
                    self.output.push(0x10 | (length >> 4) as u8);
                    self.output.push(length as u8);
                }
            }
        }

        self.flag_bit = (self.flag_bit + 1) % 8;
        self.token_count += 1;
    }
}

pub struct FlagReader<'a> {
    input: &'a [u8],

    byte_offset: usize,

    flag_byte: u8,
    flag_bit: u8,
}

impl<'a> FlagReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,

            byte_offset: 0,

            flag_byte: 0,
            flag_bit: 0,
        }
    }

    /// Get the current byte offset of the reader
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.input.get(self.byte_offset)?;
        self.byte_offset += 1;
        Some(byte)
    }

    /// Read the next token, or `None` once the input is exhausted.
    ///
    /// A token cut short by the end of the input also yields `None`.
    pub fn read_token(&mut self) -> Option<Token> {
        if self.byte_offset >= self.input.len() {
            return None;
        }

        if self.flag_bit == 0 {
            self.flag_byte = self.read_u8()?;
        }

        let is_reference = self.flag_byte & (1 << self.flag_bit) != 0;
        self.flag_bit = (self.flag_bit + 1) % 8;

        if !is_reference {
            return self.read_u8().map(Token::Literal);
        }

        let first = self.read_u8()? as u16;
        let offset = if first < SHORT_OFFSET_LIMIT {
            first
        } else {
            ((first & 0x3F) << 8) | self.read_u8()? as u16
        };

        let first = self.read_u8()? as u16;
        let length = if first < SHORT_LENGTH_LIMIT {
            first
        } else {
            ((first & 0x0F) << 4) | self.read_u8()? as u16
        };

        Some(Token::Reference { offset, length })
    }
}

impl Iterator for FlagReader<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.read_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_all(tokens: &[Token]) -> Vec<u8> {
        let mut output = Vec::new();
        let mut writer = FlagWriter::new(&mut output);
        for token in tokens {
            writer.write_token(*token);
        }
        output
    }

    #[test]
    fn short_fields() {
        let output = write_all(&[
            Token::Literal(b'a'),
            Token::Reference { offset: 3, length: 4 },
        ]);
        assert_eq!(output, vec![0b10, b'a', 3, 4]);
    }

    #[test]
    fn long_fields() {
        let output = write_all(&[Token::Reference { offset: 0x1234, length: 200 }]);
        assert_eq!(output, vec![0b1, 0x52, 0x34, 0x1C, 200]);

        let tokens: Vec<Token> = FlagReader::new(&output).collect();
        assert_eq!(tokens, vec![Token::Reference { offset: 0x1234, length: 200 }]);
    }

    #[test]
    fn ninth_token_opens_new_group() {
        let mut tokens = vec![Token::Literal(0); 8];
        tokens.push(Token::Reference { offset: 64, length: 16 });
        let output = write_all(&tokens);

        assert_eq!(output.len(), 1 + 8 + 1 + 4);
        assert_eq!(output[0], 0);
        assert_eq!(output[9], 0b1);
        assert_eq!(FlagReader::new(&output).collect::<Vec<_>>(), tokens);
    }

    #[test]
    fn cut_token_stops_reader() {
        let mut reader = FlagReader::new(&[0b1, 0x45]);
        assert_eq!(reader.read_token(), None);

        let mut reader = FlagReader::new(&[0b0]);
        assert_eq!(reader.read_token(), None);
    }
}
