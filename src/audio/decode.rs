//! Base64 payload decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// The payload was not valid standard base64.
#[derive(Debug, thiserror::Error)]
#[error("invalid base64 audio payload: {0}")]
pub struct DecodeError(#[from] base64::DecodeError);

/// Decode a standard-alphabet, padded base64 string into raw bytes.
///
/// Surrounding whitespace is ignored. Anything else outside the alphabet,
/// including a `data:` URL prefix, is rejected.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(STANDARD.decode(payload.trim())?)
}

/// Strip a `data:<mime>;base64,` prefix if present.
pub fn strip_data_url(payload: &str) -> &str {
    if !payload.starts_with("data:") {
        return payload;
    }
    match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_simple() {
        assert_eq!(decode_base64("AEA=").unwrap(), vec![0x00, 0x40]);
    }

    #[test]
    fn test_decode_trims_whitespace() {
        assert_eq!(decode_base64("  AEA=\n").unwrap(), vec![0x00, 0x40]);
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_base64("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_invalid_character() {
        assert!(decode_base64("AE!=").is_err());
    }

    #[test]
    fn test_decode_bad_padding() {
        assert!(decode_base64("AEA").is_err());
        assert!(decode_base64("A===").is_err());
    }

    #[test]
    fn test_decode_rejects_data_url() {
        assert!(decode_base64("data:audio/pcm;base64,AEA=").is_err());
    }

    #[test]
    fn test_strip_data_url() {
        assert_eq!(strip_data_url("data:audio/pcm;base64,AEA="), "AEA=");
        assert_eq!(strip_data_url("AEA="), "AEA=");
        assert_eq!(strip_data_url("data:broken"), "data:broken");
    }
}
