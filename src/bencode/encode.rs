use super::value::Value;
use bytes::BufMut;

/// Encodes a value in canonical form.
///
/// Dictionary keys come out in lexicographic order because [`Value::Dict`] is
/// a `BTreeMap`, so equal values always encode to equal bytes.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value(value, &mut buf);
    buf
}

fn put_bytes<B: BufMut>(bytes: &[u8], buf: &mut B) {
    buf.put_slice(bytes.len().to_string().as_bytes());
    buf.put_u8(b':');
    buf.put_slice(bytes);
}

fn encode_value<B: BufMut>(value: &Value, buf: &mut B) {
    match value {
        Value::Integer(i) => {
            buf.put_u8(b'i');
            buf.put_slice(i.to_string().as_bytes());
            buf.put_u8(b'e');
        }
        Value::Bytes(b) => put_bytes(b, buf),
        Value::List(l) => {
            buf.put_u8(b'l');
            for item in l {
                encode_value(item, buf);
            }
            buf.put_u8(b'e');
        }
        Value::Dict(d) => {
            buf.put_u8(b'd');
            for (key, val) in d {
                put_bytes(key, buf);
                encode_value(val, buf);
            }
            buf.put_u8(b'e');
        }
    }
}
