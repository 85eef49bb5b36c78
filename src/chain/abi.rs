//! Minimal Solidity ABI codec
//!
//! Covers the parameter types used by the course and assignment contracts:
//! `uint256` (held as `u128`), `uint8`, `address`, `bool` and `string`.
//! Call data is `selector ‖ head ‖ tail` where every static value fills one
//! 32-byte head word and each string stores its offset in the head and its
//! length-prefixed, zero-padded bytes in the tail.

use sha3::{Digest, Keccak256};

use super::address::Address;
use crate::error::{ClientError, Result};

const WORD: usize = 32;

/// Selector of the standard `Error(string)` revert payload
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// A decoded or to-be-encoded ABI value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address(Address),
    Bool(bool),
    String(String),
}

/// Expected type of a return value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Uint,
    Address,
    Bool,
    String,
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_))
    }
}

impl From<u128> for Token {
    fn from(v: u128) -> Self {
        Token::Uint(v)
    }
}

impl From<u64> for Token {
    fn from(v: u64) -> Self {
        Token::Uint(v as u128)
    }
}

impl From<u8> for Token {
    fn from(v: u8) -> Self {
        Token::Uint(v as u128)
    }
}

impl From<bool> for Token {
    fn from(v: bool) -> Self {
        Token::Bool(v)
    }
}

impl From<Address> for Token {
    fn from(v: Address) -> Self {
        Token::Address(v)
    }
}

impl From<&str> for Token {
    fn from(v: &str) -> Self {
        Token::String(v.to_string())
    }
}

impl From<String> for Token {
    fn from(v: String) -> Self {
        Token::String(v)
    }
}

/// Keccak-256 hash
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// First four bytes of the Keccak-256 of a canonical signature such as
/// `getCourseInfo(uint256)`
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode a full call: selector followed by the encoded arguments
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode(args));
    out
}

/// Encode a sequence of tokens as a tuple
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
            if let Token::String(s) = token {
                tail.extend_from_slice(&uint_word(s.len() as u128));
                tail.extend_from_slice(&pad_right(s.as_bytes()));
            }
        } else {
            head.extend_from_slice(&static_word(token));
        }
    }

    head.extend(tail);
    head
}

/// Decode a tuple of the given types
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
    if data.len() < types.len() * WORD {
        return Err(ClientError::Decode(format!(
            "return data too short: {} bytes for {} values",
            data.len(),
            types.len()
        )));
    }

    types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let word = word_at(data, i * WORD)?;
            match ty {
                ParamType::Uint => read_uint(word).map(Token::Uint),
                ParamType::Address => {
                    if word[..12].iter().any(|b| *b != 0) {
                        return Err(ClientError::Decode("address word has dirty high bytes".into()));
                    }
                    let mut bytes = [0u8; 20];
                    bytes.copy_from_slice(&word[12..]);
                    Ok(Token::Address(Address::from_bytes(bytes)))
                }
                ParamType::Bool => Ok(Token::Bool(word[WORD - 1] != 0)),
                ParamType::String => {
                    let offset = read_usize(word)?;
                    let len = read_usize(word_at(data, offset)?)?;
                    let start = offset + WORD;
                    let end = start
                        .checked_add(len)
                        .filter(|end| *end <= data.len())
                        .ok_or_else(|| {
                            ClientError::Decode(format!("string out of bounds at offset {offset}"))
                        })?;
                    let s = String::from_utf8(data[start..end].to_vec())
                        .map_err(|e| ClientError::Decode(format!("invalid UTF-8 string: {e}")))?;
                    Ok(Token::String(s))
                }
            }
        })
        .collect()
}

/// Extract the message from an `Error(string)` revert payload
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    if data.len() < 4 || data[..4] != ERROR_STRING_SELECTOR {
        return None;
    }
    match decode(&[ParamType::String], &data[4..]).ok()?.pop()? {
        Token::String(reason) => Some(reason),
        _ => None,
    }
}

/// Build an `Error(string)` revert payload
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    let mut out = ERROR_STRING_SELECTOR.to_vec();
    out.extend(encode(&[Token::String(reason.to_string())]));
    out
}

/// Sequential typed access to decoded return values
#[derive(Debug)]
pub struct Outputs {
    tokens: std::vec::IntoIter<Token>,
}

impl Outputs {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
        }
    }

    fn next(&mut self) -> Result<Token> {
        self.tokens
            .next()
            .ok_or_else(|| ClientError::Decode("missing return value".into()))
    }

    pub fn uint(&mut self) -> Result<u128> {
        match self.next()? {
            Token::Uint(v) => Ok(v),
            other => Err(ClientError::Decode(format!("expected uint, got {other:?}"))),
        }
    }

    pub fn u64(&mut self) -> Result<u64> {
        let v = self.uint()?;
        u64::try_from(v).map_err(|_| ClientError::Decode(format!("{v} does not fit in u64")))
    }

    pub fn address(&mut self) -> Result<Address> {
        match self.next()? {
            Token::Address(v) => Ok(v),
            other => Err(ClientError::Decode(format!("expected address, got {other:?}"))),
        }
    }

    pub fn bool(&mut self) -> Result<bool> {
        match self.next()? {
            Token::Bool(v) => Ok(v),
            other => Err(ClientError::Decode(format!("expected bool, got {other:?}"))),
        }
    }

    pub fn string(&mut self) -> Result<String> {
        match self.next()? {
            Token::String(v) => Ok(v),
            other => Err(ClientError::Decode(format!("expected string, got {other:?}"))),
        }
    }
}

fn uint_word(v: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&v.to_be_bytes());
    word
}

fn static_word(token: &Token) -> [u8; WORD] {
    match token {
        Token::Uint(v) => uint_word(*v),
        Token::Bool(b) => uint_word(*b as u128),
        Token::Address(a) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(a.as_bytes());
            word
        }
        Token::String(_) => unreachable!("strings are encoded in the tail"),
    }
}

fn pad_right(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let rem = out.len() % WORD;
    if rem != 0 {
        out.resize(out.len() + WORD - rem, 0);
    }
    out
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8]> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| ClientError::Decode(format!("no 32-byte word at offset {offset}")))
}

fn read_uint(word: &[u8]) -> Result<u128> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(ClientError::Decode("uint256 value exceeds u128".into()));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(bytes))
}

fn read_usize(word: &[u8]) -> Result<usize> {
    let v = read_uint(word)?;
    usize::try_from(v).map_err(|_| ClientError::Decode(format!("offset {v} too large")))
}
