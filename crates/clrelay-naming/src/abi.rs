//! Minimal ABI helpers for the two ENS calls the relay makes.

use sha3::{Digest, Keccak256};

use crate::error::{NamingError, Result};

/// ABI word size in bytes.
pub const WORD: usize = 32;

/// `resolver(bytes32)`
pub const RESOLVER_SELECTOR: [u8; 4] = [0x01, 0x78, 0xb8, 0xbf];

/// `text(bytes32,string)`
pub const TEXT_SELECTOR: [u8; 4] = [0x59, 0xd1, 0xd4, 0x3c];

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// ENS namehash. Labels are lower-cased; full UTS-46 normalization is not
/// applied.
pub fn namehash(name: &str) -> Result<[u8; 32]> {
    let mut node = [0u8; 32];
    if name.is_empty() {
        return Ok(node);
    }

    for label in name.rsplit('.') {
        if label.is_empty() {
            return Err(NamingError::InvalidName {
                name: name.to_string(),
                reason: "empty label".to_string(),
            });
        }
        let label_hash = keccak256(label.to_lowercase().as_bytes());
        let mut joined = [0u8; 64];
        joined[..32].copy_from_slice(&node);
        joined[32..].copy_from_slice(&label_hash);
        node = keccak256(&joined);
    }

    Ok(node)
}

pub fn encode_resolver_call(node: &[u8; 32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + WORD);
    data.extend_from_slice(&RESOLVER_SELECTOR);
    data.extend_from_slice(node);
    data
}

pub fn encode_text_call(node: &[u8; 32], key: &str) -> Vec<u8> {
    let key = key.as_bytes();
    let padded_len = key.len().div_ceil(WORD) * WORD;

    let mut data = Vec::with_capacity(4 + 3 * WORD + padded_len);
    data.extend_from_slice(&TEXT_SELECTOR);
    data.extend_from_slice(node);
    data.extend_from_slice(&usize_word(2 * WORD));
    data.extend_from_slice(&usize_word(key.len()));
    data.extend_from_slice(key);
    data.resize(4 + 3 * WORD + padded_len, 0);
    data
}

/// Decode an `address` return value; the zero address maps to `None`.
pub fn decode_address(data: &[u8]) -> Result<Option<String>> {
    let word = data
        .get(..WORD)
        .ok_or_else(|| invalid("address result shorter than one word"))?;
    let address = &word[WORD - 20..];
    if address.iter().all(|b| *b == 0) {
        return Ok(None);
    }
    Ok(Some(format!("0x{}", hex::encode(address))))
}

/// Decode a dynamic `string` return value.
pub fn decode_string(data: &[u8]) -> Result<String> {
    let offset = read_usize(data, 0)?;
    let len = read_usize(data, offset)?;
    let start = offset
        .checked_add(WORD)
        .ok_or_else(|| invalid("string offset overflows"))?;
    let end = start
        .checked_add(len)
        .ok_or_else(|| invalid("string length overflows"))?;
    let bytes = data
        .get(start..end)
        .ok_or_else(|| invalid("string data truncated"))?;

    String::from_utf8(bytes.to_vec()).map_err(|err| invalid(&format!("string is not utf-8: {err}")))
}

fn read_usize(data: &[u8], at: usize) -> Result<usize> {
    let end = at
        .checked_add(WORD)
        .ok_or_else(|| invalid("word offset overflows"))?;
    let word = data.get(at..end).ok_or_else(|| invalid("word truncated"))?;
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(invalid("word exceeds usize"));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(low)).map_err(|_| invalid("word exceeds usize"))
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

fn invalid(reason: &str) -> NamingError {
    NamingError::InvalidResponse(reason.to_string())
}

/// ABI-encode a single `string` return value.
#[cfg(test)]
pub(crate) fn encode_string_result(value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let mut data = Vec::new();
    data.extend_from_slice(&usize_word(WORD));
    data.extend_from_slice(&usize_word(bytes.len()));
    data.extend_from_slice(bytes);
    data.resize(2 * WORD + bytes.len().div_ceil(WORD) * WORD, 0);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namehash_matches_reference_vectors() {
        assert_eq!(namehash("").unwrap(), [0u8; 32]);
        assert_eq!(
            hex::encode(namehash("eth").unwrap()),
            "93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
        );
        assert_eq!(
            hex::encode(namehash("foo.eth").unwrap()),
            "de9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f"
        );
    }

    #[test]
    fn namehash_lowercases_labels() {
        assert_eq!(namehash("Foo.ETH").unwrap(), namehash("foo.eth").unwrap());
    }

    #[test]
    fn namehash_rejects_empty_labels() {
        assert!(matches!(
            namehash("foo..eth"),
            Err(NamingError::InvalidName { .. })
        ));
        assert!(namehash("foo.eth.").is_err());
    }

    #[test]
    fn text_call_layout() {
        let node = [7u8; 32];
        let data = encode_text_call(&node, "cl.schema.request");

        assert_eq!(&data[..4], &TEXT_SELECTOR);
        assert_eq!(&data[4..36], &node);
        assert_eq!(data[36 + 31], 0x40);
        assert_eq!(data[68 + 31], 17);
        assert_eq!(&data[100..117], b"cl.schema.request");
        assert_eq!(data.len(), 4 + 4 * WORD);
    }

    #[test]
    fn resolver_call_layout() {
        let node = [9u8; 32];
        let data = encode_resolver_call(&node);
        assert_eq!(&data[..4], &RESOLVER_SELECTOR);
        assert_eq!(&data[4..], &node);
    }

    #[test]
    fn decodes_string_results() {
        let url = "https://schemas.example/receipt.schema.json";
        assert_eq!(decode_string(&encode_string_result(url)).unwrap(), url);
        assert_eq!(decode_string(&encode_string_result("")).unwrap(), "");
    }

    #[test]
    fn rejects_truncated_string_results() {
        let mut data = encode_string_result("https://schemas.example/a.json");
        data.truncate(WORD + 8);
        assert!(matches!(
            decode_string(&data),
            Err(NamingError::InvalidResponse(_))
        ));
    }

    #[test]
    fn decodes_addresses() {
        assert_eq!(decode_address(&[0u8; 32]).unwrap(), None);

        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[0xab; 20]);
        assert_eq!(
            decode_address(&word).unwrap(),
            Some(format!("0x{}", "ab".repeat(20)))
        );

        assert!(decode_address(&[1u8; 4]).is_err());
    }
}
