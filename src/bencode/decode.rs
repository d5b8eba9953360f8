use super::error::BencodeError;
use super::value::Value;
use bytes::Bytes;
use std::collections::BTreeMap;

const MAX_DEPTH: usize = 64;

/// Decodes exactly one value spanning the whole buffer.
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let mut decoder = Decoder::new(data);
    let value = decoder.decode_value()?;

    if !decoder.remaining().is_empty() {
        return Err(BencodeError::TrailingData(decoder.remaining().len()));
    }

    Ok(value)
}

/// Decodes one value from the front of `data`.
///
/// Returns the value and the number of bytes it occupied. Anything after that
/// is left for the caller.
pub fn decode_prefix(data: &[u8]) -> Result<(Value, usize), BencodeError> {
    let mut decoder = Decoder::new(data);
    let value = decoder.decode_value()?;
    Ok((value, decoder.position()))
}

/// A cursor over a bencoded buffer that tracks how far decoding has advanced.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        let data = self.data;
        &data[self.pos..]
    }

    pub fn decode_value(&mut self) -> Result<Value, BencodeError> {
        self.value(0)
    }

    fn peek(&self) -> Result<u8, BencodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(BencodeError::UnexpectedEof(self.pos))
    }

    fn value(&mut self, depth: usize) -> Result<Value, BencodeError> {
        if depth > MAX_DEPTH {
            return Err(BencodeError::NestingTooDeep);
        }

        match self.peek()? {
            b'i' => self.integer(),
            b'l' => self.list(depth),
            b'd' => self.dict(depth),
            b'0'..=b'9' => self.bytes().map(Value::Bytes),
            c => Err(BencodeError::UnexpectedChar {
                found: c as char,
                pos: self.pos,
            }),
        }
    }

    /// Advances to the next `delim` and returns the text before it.
    fn take_until(&mut self, delim: u8) -> Result<&'a [u8], BencodeError> {
        let data = self.data;
        let start = self.pos;
        let len = data[start..]
            .iter()
            .position(|&b| b == delim)
            .ok_or(BencodeError::UnexpectedEof(data.len()))?;
        self.pos = start + len + 1;
        Ok(&data[start..start + len])
    }

    fn integer(&mut self) -> Result<Value, BencodeError> {
        self.pos += 1;
        let digits = self.take_until(b'e')?;

        let text = std::str::from_utf8(digits)
            .map_err(|_| BencodeError::InvalidInteger("invalid utf8".into()))?;

        if text.is_empty() {
            return Err(BencodeError::InvalidInteger("empty".into()));
        }

        if text.starts_with("-0") || (text.starts_with('0') && text.len() > 1) {
            return Err(BencodeError::InvalidInteger("leading zeros".into()));
        }

        if text.starts_with('+') {
            return Err(BencodeError::InvalidInteger("explicit sign".into()));
        }

        text.parse()
            .map(Value::Integer)
            .map_err(|_| BencodeError::InvalidInteger(text.into()))
    }

    fn bytes(&mut self) -> Result<Bytes, BencodeError> {
        let at = self.pos;
        let digits = self.take_until(b':')?;
        let canonical = match digits {
            [] => false,
            [b'0'] => true,
            [b'0', ..] => false,
            _ => digits.iter().all(u8::is_ascii_digit),
        };
        let len: usize = std::str::from_utf8(digits)
            .ok()
            .filter(|_| canonical)
            .and_then(|s| s.parse().ok())
            .ok_or(BencodeError::InvalidStringLength(at))?;

        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(BencodeError::UnexpectedEof(self.data.len()))?;

        let bytes = Bytes::copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(bytes)
    }

    fn list(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.pos += 1;
        let mut list = Vec::new();

        while self.peek()? != b'e' {
            list.push(self.value(depth + 1)?);
        }

        self.pos += 1;
        Ok(Value::List(list))
    }

    fn dict(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.pos += 1;
        let mut dict = BTreeMap::new();

        while self.peek()? != b'e' {
            if !self.peek()?.is_ascii_digit() {
                return Err(BencodeError::NonStringKey(self.pos));
            }
            let key = self.bytes()?;
            let value = self.value(depth + 1)?;
            dict.insert(key, value);
        }

        self.pos += 1;
        Ok(Value::Dict(dict))
    }
}
