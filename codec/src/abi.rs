//! Head/tail encoding in 32-byte words.
//!
//! Static values (address, uint, bool, fixed bytes) occupy one word in the
//! head. Dynamic values (bytes, string, arrays) put an offset in the head and
//! a length-prefixed, right-padded body in the tail. The layout is identical
//! for call arguments and for the operation-id preimage.

use std::fmt;

use govlock_types::Address;
use serde::{Deserialize, Serialize};

use crate::CodecError;

const WORD: usize = 32;

/// Declared type of one argument.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    Address,
    /// Unsigned integer of the given bit width (8..=256, multiple of 8).
    Uint(usize),
    Bool,
    /// Fixed-size byte string, 1..=32 bytes.
    FixedBytes(usize),
    Bytes,
    String,
    Array(Box<ParamType>),
}

impl ParamType {
    /// Parse a canonical type name (`address`, `uint8`, `bytes4`, `bytes[]`…).
    ///
    /// `uint` is accepted as an alias of `uint256`.
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        let s = s.trim();
        if let Some(inner) = s.strip_suffix("[]") {
            return Ok(Self::Array(Box::new(Self::parse(inner)?)));
        }
        match s {
            "address" => return Ok(Self::Address),
            "bool" => return Ok(Self::Bool),
            "bytes" => return Ok(Self::Bytes),
            "string" => return Ok(Self::String),
            "uint" => return Ok(Self::Uint(256)),
            _ => {}
        }
        if let Some(bits) = s.strip_prefix("uint") {
            return match bits.parse::<usize>() {
                Ok(b) if b % 8 == 0 && (8..=256).contains(&b) => Ok(Self::Uint(b)),
                _ => Err(CodecError::UnknownType(s.to_string())),
            };
        }
        if let Some(n) = s.strip_prefix("bytes") {
            return match n.parse::<usize>() {
                Ok(n) if (1..=32).contains(&n) => Ok(Self::FixedBytes(n)),
                _ => Err(CodecError::UnknownType(s.to_string())),
            };
        }
        Err(CodecError::UnknownType(s.to_string()))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bytes | Self::String | Self::Array(_))
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => write!(f, "address"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Bool => write!(f, "bool"),
            Self::FixedBytes(n) => write!(f, "bytes{n}"),
            Self::Bytes => write!(f, "bytes"),
            Self::String => write!(f, "string"),
            Self::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

/// A typed argument value.
///
/// Integers are carried as `u128`; every governed quantity fits, and the
/// encoder still writes full 256-bit words.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    Address(Address),
    Uint(u128),
    Bool(bool),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Token>),
}

impl Token {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bytes(_) | Self::String(_) | Self::Array(_))
    }

    /// Whether this value is acceptable for a parameter of type `ty`.
    pub fn matches(&self, ty: &ParamType) -> bool {
        match (self, ty) {
            (Self::Address(_), ParamType::Address) => true,
            (Self::Uint(v), ParamType::Uint(bits)) => fits(*v, *bits),
            (Self::Bool(_), ParamType::Bool) => true,
            (Self::FixedBytes(b), ParamType::FixedBytes(n)) => b.len() == *n,
            (Self::Bytes(_), ParamType::Bytes) => true,
            (Self::String(_), ParamType::String) => true,
            (Self::Array(items), ParamType::Array(inner)) => {
                items.iter().all(|item| item.matches(inner))
            }
            _ => false,
        }
    }

    /// Parse operator input text as a value of type `ty`.
    ///
    /// Integers accept decimal or `0x` hex, byte strings accept hex, arrays
    /// accept a comma-separated list in brackets (`[1,2,3]`).
    pub fn parse(ty: &ParamType, text: &str) -> Result<Self, CodecError> {
        let text = text.trim();
        let invalid = || CodecError::InvalidValue(format!("{text:?} as {ty}"));
        let token = match ty {
            ParamType::Address => Self::Address(text.parse().map_err(|_| invalid())?),
            ParamType::Uint(_) => {
                let v = match text.strip_prefix("0x") {
                    Some(hex) => u128::from_str_radix(hex, 16),
                    None => text.replace('_', "").parse::<u128>(),
                }
                .map_err(|_| invalid())?;
                Self::Uint(v)
            }
            ParamType::Bool => Self::Bool(text.parse().map_err(|_| invalid())?),
            ParamType::FixedBytes(_) => {
                Self::FixedBytes(hex::decode(text.trim_start_matches("0x")).map_err(|_| invalid())?)
            }
            ParamType::Bytes => {
                Self::Bytes(hex::decode(text.trim_start_matches("0x")).map_err(|_| invalid())?)
            }
            ParamType::String => Self::String(text.to_string()),
            ParamType::Array(inner) => {
                let body = text
                    .strip_prefix('[')
                    .and_then(|t| t.strip_suffix(']'))
                    .ok_or_else(invalid)?;
                let items = if body.trim().is_empty() {
                    Vec::new()
                } else {
                    body.split(',')
                        .map(|item| Self::parse(inner, item))
                        .collect::<Result<Vec<_>, _>>()?
                };
                Self::Array(items)
            }
        };
        if token.matches(ty) {
            Ok(token)
        } else {
            Err(CodecError::ValueOutOfRange {
                value: text.to_string(),
                bits: match ty {
                    ParamType::Uint(bits) => *bits,
                    _ => 0,
                },
            })
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_fixed_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::FixedBytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Token]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(a) => write!(f, "{a}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::FixedBytes(b) | Self::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

fn fits(value: u128, bits: usize) -> bool {
    bits >= 128 || value >> bits == 0
}

/// Encode a sequence of tokens.
///
/// Callers are expected to have type-checked the tokens; fixed byte strings
/// longer than a word are truncated to 32 bytes.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
            encode_tail(token, &mut tail);
        } else {
            head.extend_from_slice(&static_word(token));
        }
    }
    head.extend_from_slice(&tail);
    head
}

fn static_word(token: &Token) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    match token {
        Token::Address(a) => word[12..].copy_from_slice(a.as_bytes()),
        Token::Uint(v) => word = uint_word(*v),
        Token::Bool(b) => word[31] = u8::from(*b),
        Token::FixedBytes(b) => {
            let n = b.len().min(WORD);
            word[..n].copy_from_slice(&b[..n]);
        }
        Token::Bytes(_) | Token::String(_) | Token::Array(_) => {}
    }
    word
}

fn encode_tail(token: &Token, out: &mut Vec<u8>) {
    match token {
        Token::Bytes(b) => push_padded(b, out),
        Token::String(s) => push_padded(s.as_bytes(), out),
        Token::Array(items) => {
            out.extend_from_slice(&uint_word(items.len() as u128));
            out.extend_from_slice(&encode(items));
        }
        _ => {}
    }
}

fn push_padded(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&uint_word(data.len() as u128));
    out.extend_from_slice(data);
    let rem = data.len() % WORD;
    if rem != 0 {
        out.resize(out.len() + WORD - rem, 0);
    }
}

fn uint_word(v: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&v.to_be_bytes());
    word
}

/// Decode `data` as a sequence of values of the given types.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, CodecError> {
    let mut tokens = Vec::with_capacity(types.len());
    for (i, ty) in types.iter().enumerate() {
        let head = read_word(data, i * WORD)?;
        let token = if ty.is_dynamic() {
            decode_tail(ty, data, word_to_usize(head)?)?
        } else {
            decode_static(ty, head)?
        };
        tokens.push(token);
    }
    Ok(tokens)
}

fn decode_static(ty: &ParamType, word: &[u8; WORD]) -> Result<Token, CodecError> {
    match ty {
        ParamType::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(CodecError::InvalidValue("dirty address padding".into()));
            }
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(&word[12..]);
            Ok(Token::Address(Address::new(bytes)))
        }
        ParamType::Uint(bits) => {
            let v = word_to_u128(word)?;
            if !fits(v, *bits) {
                return Err(CodecError::ValueOutOfRange {
                    value: v.to_string(),
                    bits: *bits,
                });
            }
            Ok(Token::Uint(v))
        }
        ParamType::Bool => match word_to_u128(word)? {
            0 => Ok(Token::Bool(false)),
            1 => Ok(Token::Bool(true)),
            other => Err(CodecError::InvalidValue(format!("bool word {other}"))),
        },
        ParamType::FixedBytes(n) => {
            if word[*n..].iter().any(|b| *b != 0) {
                return Err(CodecError::InvalidValue(format!("dirty bytes{n} padding")));
            }
            Ok(Token::FixedBytes(word[..*n].to_vec()))
        }
        ParamType::Bytes | ParamType::String | ParamType::Array(_) => {
            Err(CodecError::InvalidValue(format!("{ty} is not a static type")))
        }
    }
}

fn decode_tail(ty: &ParamType, data: &[u8], offset: usize) -> Result<Token, CodecError> {
    let len = word_to_usize(read_word(data, offset)?)?;
    let body_start = offset + WORD;
    match ty {
        ParamType::Bytes => Ok(Token::Bytes(read_slice(data, body_start, len)?.to_vec())),
        ParamType::String => {
            let raw = read_slice(data, body_start, len)?;
            String::from_utf8(raw.to_vec())
                .map(Token::String)
                .map_err(|e| CodecError::InvalidValue(e.to_string()))
        }
        ParamType::Array(inner) => {
            let frame = data.get(body_start..).ok_or(CodecError::OutOfBounds {
                offset: body_start,
                len: 0,
            })?;
            // every element owns at least one head word
            if len.saturating_mul(WORD) > frame.len() {
                return Err(CodecError::OutOfBounds {
                    offset: body_start,
                    len: len.saturating_mul(WORD),
                });
            }
            let types = vec![(**inner).clone(); len];
            decode(&types, frame).map(Token::Array)
        }
        _ => decode_static(ty, read_word(data, offset)?),
    }
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8; WORD], CodecError> {
    read_slice(data, offset, WORD)?
        .try_into()
        .map_err(|_| CodecError::OutOfBounds { offset, len: WORD })
}

fn read_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], CodecError> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(CodecError::OutOfBounds { offset, len })
}

fn word_to_u128(word: &[u8; WORD]) -> Result<u128, CodecError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(CodecError::InvalidValue("integer exceeds 128 bits".into()));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

fn word_to_usize(word: &[u8; WORD]) -> Result<usize, CodecError> {
    let v = word_to_u128(word)?;
    usize::try_from(v).map_err(|_| CodecError::InvalidValue(format!("offset {v} too large")))
}
