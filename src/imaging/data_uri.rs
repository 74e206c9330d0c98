//! `data:` URIs, the preview handle format.
//!
//! Only the base64 form is produced; decoding also accepts it only, which is
//! all the surfaces in this crate ever hand out.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DataUriError {
    #[error("not a data URI")]
    NotDataUri,
    #[error("data URI is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Payload(String),
}

/// Encode bytes as `data:<mime>;base64,<payload>`.
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Decode a base64 `data:` URI into its MIME type and bytes.
pub fn decode(uri: &str) -> Result<(String, Vec<u8>), DataUriError> {
    let rest = uri.strip_prefix("data:").ok_or(DataUriError::NotDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUriError::NotDataUri)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(DataUriError::NotBase64)?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| DataUriError::Payload(e.to_string()))?;
    Ok((mime.to_string(), bytes))
}

pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_preserves_mime_and_bytes() {
        let uri = encode("image/png", &[0, 1, 2, 250]);
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(
            decode(&uri).unwrap(),
            ("image/png".to_string(), vec![0, 1, 2, 250])
        );
    }

    #[test]
    fn decode_rejects_plain_paths() {
        assert_eq!(decode("/tmp/a.png"), Err(DataUriError::NotDataUri));
    }

    #[test]
    fn decode_rejects_percent_encoded_payloads() {
        assert_eq!(
            decode("data:text/plain,hello"),
            Err(DataUriError::NotBase64)
        );
    }

    #[test]
    fn decode_reports_bad_payload() {
        assert!(matches!(
            decode("data:image/png;base64,@@@"),
            Err(DataUriError::Payload(_))
        ));
    }
}
