//! Minimal RLP encoder.
//!
//! Covers exactly what transaction serialization needs: byte strings,
//! big-endian unsigned integers, and lists. Nothing here decodes.

/// Append the RLP encoding of a byte string to `out`.
pub fn encode_bytes(payload: &[u8], out: &mut Vec<u8>) {
    if payload.len() == 1 && payload[0] < 0x80 {
        out.push(payload[0]);
    } else if payload.len() <= 55 {
        out.push(0x80 + payload.len() as u8);
        out.extend_from_slice(payload);
    } else {
        let len_bytes = to_minimal_be(payload.len() as u128);
        out.push(0xb7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(payload);
    }
}

/// Append the RLP encoding of an unsigned integer to `out`.
///
/// Integers are encoded as their minimal big-endian byte representation;
/// zero encodes as the empty string (0x80).
pub fn encode_uint(value: u128, out: &mut Vec<u8>) {
    encode_bytes(&to_minimal_be(value), out);
}

/// Append the RLP encoding of an arbitrary-width big-endian integer,
/// stripping leading zero bytes first.
pub fn encode_uint_be(bytes: &[u8], out: &mut Vec<u8>) {
    let stripped = strip_leading_zeros(bytes);
    encode_bytes(stripped, out);
}

/// Wrap already-encoded items in an RLP list header.
pub fn encode_list(encoded_items: &[u8], out: &mut Vec<u8>) {
    if encoded_items.len() <= 55 {
        out.push(0xc0 + encoded_items.len() as u8);
    } else {
        let len_bytes = to_minimal_be(encoded_items.len() as u128);
        out.push(0xf7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
    out.extend_from_slice(encoded_items);
}

fn to_minimal_be(value: u128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_bytes(payload, &mut out);
        out
    }

    fn uint(value: u128) -> Vec<u8> {
        let mut out = Vec::new();
        encode_uint(value, &mut out);
        out
    }

    #[test]
    fn test_encode_short_string() {
        // Canonical vector: "dog" -> [0x83, 'd', 'o', 'g']
        assert_eq!(bytes(b"dog"), vec![0x83, b'd', b'o', b'g']);
    }

    #[test]
    fn test_encode_empty_string() {
        assert_eq!(bytes(b""), vec![0x80]);
    }

    #[test]
    fn test_encode_single_low_byte() {
        assert_eq!(bytes(&[0x0f]), vec![0x0f]);
        assert_eq!(bytes(&[0x7f]), vec![0x7f]);
        assert_eq!(bytes(&[0x80]), vec![0x81, 0x80]);
    }

    #[test]
    fn test_encode_long_string() {
        // 56-byte string switches to length-of-length form
        let payload = [b'a'; 56];
        let encoded = bytes(&payload);
        assert_eq!(encoded[0], 0xb8);
        assert_eq!(encoded[1], 56);
        assert_eq!(&encoded[2..], &payload[..]);
    }

    #[test]
    fn test_encode_integers() {
        assert_eq!(uint(0), vec![0x80]);
        assert_eq!(uint(15), vec![0x0f]);
        assert_eq!(uint(1024), vec![0x82, 0x04, 0x00]);
    }

    #[test]
    fn test_encode_uint_be_strips_zeros() {
        let mut out = Vec::new();
        encode_uint_be(&[0x00, 0x00, 0x04, 0x00], &mut out);
        assert_eq!(out, vec![0x82, 0x04, 0x00]);

        let mut out = Vec::new();
        encode_uint_be(&[0x00; 32], &mut out);
        assert_eq!(out, vec![0x80]);
    }

    #[test]
    fn test_encode_list() {
        // Canonical vector: ["cat", "dog"]
        let mut items = Vec::new();
        encode_bytes(b"cat", &mut items);
        encode_bytes(b"dog", &mut items);
        let mut out = Vec::new();
        encode_list(&items, &mut out);
        assert_eq!(
            out,
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
    }

    #[test]
    fn test_encode_empty_list() {
        let mut out = Vec::new();
        encode_list(&[], &mut out);
        assert_eq!(out, vec![0xc0]);
    }
}
