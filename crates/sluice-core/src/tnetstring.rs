//! Tagged netstrings, the serialization Mongrel2 speaks on its control port.
//!
//! Every value is `<len>:<payload><tag>` where tag is one of
//! `,` (bytes) `#` (integer) `^` (float) `!` (bool) `~` (null) `]` (list) `}` (dict).

use thiserror::Error;

/// Longest length prefix accepted.
const MAX_LEN_DIGITS: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Vec<u8>),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<Value>),
    /// Dict entries in wire order.
    Dict(Vec<(Vec<u8>, Value)>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TnetError {
    #[error("truncated tnetstring")]
    Truncated,
    #[error("invalid length prefix")]
    BadLength,
    #[error("invalid {tag} payload: {reason}")]
    BadPayload { tag: char, reason: String },
    #[error("unknown type tag {0:?}")]
    UnknownTag(char),
    #[error("dict key is not a string")]
    NonStringKey,
    #[error("{0} trailing bytes after value")]
    TrailingData(usize),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::String(s.as_bytes().to_vec())
    }

    /// Looks up a dict entry by key; `None` for missing keys and non-dicts.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.as_slice() == key.as_bytes())
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Serialize a value.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    let (payload, tag) = match value {
        Value::String(b) => (b.clone(), b','),
        Value::Integer(n) => (n.to_string().into_bytes(), b'#'),
        Value::Float(f) => (f.to_string().into_bytes(), b'^'),
        Value::Bool(b) => (b.to_string().into_bytes(), b'!'),
        Value::Null => (Vec::new(), b'~'),
        Value::List(items) => {
            let mut body = Vec::new();
            for item in items {
                encode_into(item, &mut body);
            }
            (body, b']')
        }
        Value::Dict(entries) => {
            let mut body = Vec::new();
            for (k, v) in entries {
                encode_into(&Value::String(k.clone()), &mut body);
                encode_into(v, &mut body);
            }
            (body, b'}')
        }
    };
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(&payload);
    out.push(tag);
}

/// Parse exactly one value; trailing bytes are an error.
pub fn decode(input: &[u8]) -> Result<Value, TnetError> {
    let (value, rest) = decode_prefix(input)?;
    if !rest.is_empty() {
        return Err(TnetError::TrailingData(rest.len()));
    }
    Ok(value)
}

/// Parse one value from the front of `input`, returning it and the remainder.
pub fn decode_prefix(input: &[u8]) -> Result<(Value, &[u8]), TnetError> {
    let colon = input
        .iter()
        .take(MAX_LEN_DIGITS + 1)
        .position(|&b| b == b':')
        .ok_or(if input.len() <= MAX_LEN_DIGITS {
            TnetError::Truncated
        } else {
            TnetError::BadLength
        })?;
    let digits = &input[..colon];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(TnetError::BadLength);
    }
    let len: usize = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(TnetError::BadLength)?;

    let start = colon + 1;
    let end = start.checked_add(len).ok_or(TnetError::BadLength)?;
    if input.len() <= end {
        return Err(TnetError::Truncated);
    }
    let payload = &input[start..end];
    let tag = input[end];
    let rest = &input[end + 1..];

    let value = match tag {
        b',' => Value::String(payload.to_vec()),
        b'#' => Value::Integer(parse_text(payload, '#')?),
        b'^' => Value::Float(parse_text(payload, '^')?),
        b'!' => match payload {
            b"true" => Value::Bool(true),
            b"false" => Value::Bool(false),
            _ => return Err(bad('!', "expected true or false")),
        },
        b'~' => {
            if !payload.is_empty() {
                return Err(bad('~', "null must be empty"));
            }
            Value::Null
        }
        b']' => {
            let mut items = Vec::new();
            let mut body = payload;
            while !body.is_empty() {
                let (item, more) = decode_prefix(body)?;
                items.push(item);
                body = more;
            }
            Value::List(items)
        }
        b'}' => {
            let mut entries = Vec::new();
            let mut body = payload;
            while !body.is_empty() {
                let (key, more) = decode_prefix(body)?;
                let Value::String(key) = key else {
                    return Err(TnetError::NonStringKey);
                };
                if more.is_empty() {
                    return Err(bad('}', "key without value"));
                }
                let (val, more) = decode_prefix(more)?;
                entries.push((key, val));
                body = more;
            }
            Value::Dict(entries)
        }
        other => return Err(TnetError::UnknownTag(other as char)),
    };
    Ok((value, rest))
}

fn parse_text<T: std::str::FromStr>(payload: &[u8], tag: char) -> Result<T, TnetError> {
    std::str::from_utf8(payload)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| bad(tag, "not a number"))
}

fn bad(tag: char, reason: &str) -> TnetError {
    TnetError::BadPayload {
        tag,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_scalars() {
        assert_eq!(decode(b"5:hello,").unwrap(), Value::str("hello"));
        assert_eq!(decode(b"2:-1#").unwrap(), Value::Integer(-1));
        assert_eq!(decode(b"4:true!").unwrap(), Value::Bool(true));
        assert_eq!(decode(b"0:~").unwrap(), Value::Null);
        assert_eq!(decode(b"3:1.5^").unwrap(), Value::Float(1.5));
        assert_eq!(decode(b"0:,").unwrap(), Value::String(Vec::new()));
    }

    #[test]
    fn decodes_nested_status_reply() {
        let raw = b"52:4:rows,41:37:1:7#1:9#2:-1#1:0#1:0#1:0#2:10#4:5100#]]}";
        let value = decode(raw).unwrap();
        let rows = value.get("rows").and_then(Value::as_list).unwrap();
        assert_eq!(rows.len(), 1);
        let row = rows[0].as_list().unwrap();
        assert_eq!(row[0].as_i64(), Some(7));
        assert_eq!(row[7].as_i64(), Some(5100));
    }

    #[test]
    fn encodes_status_query_literal() {
        let query = Value::List(vec![
            Value::str("status"),
            Value::Dict(vec![(b"what".to_vec(), Value::str("net"))]),
        ]);
        assert_eq!(encode(&query), b"26:6:status,13:4:what,3:net,}]".to_vec());
        assert_eq!(decode(&encode(&query)).unwrap(), query);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(decode(b"5:abc,"), Err(TnetError::Truncated));
        assert_eq!(decode(b"x:abc,"), Err(TnetError::BadLength));
        assert_eq!(decode(b"3:abc?"), Err(TnetError::UnknownTag('?')));
        assert_eq!(decode(b"3:abc,zz"), Err(TnetError::TrailingData(2)));
        assert_eq!(decode(b"4:1:1#}"), Err(TnetError::NonStringKey));
        assert!(matches!(
            decode(b"2:ab#"),
            Err(TnetError::BadPayload { tag: '#', .. })
        ));
        assert_eq!(decode(b""), Err(TnetError::Truncated));
        assert_eq!(decode(b"12345678901:x,"), Err(TnetError::BadLength));
    }
}
