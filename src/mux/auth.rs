//! Device authentication
//!
//! The AUTH exchange: the device sends a 20-byte token, the client answers
//! with an RSA signature of it. If the device does not recognize the key
//! it issues another token, and the client responds with its public key so
//! the device can prompt the user to trust it.
//!
//! Key storage and trust UX are out of scope; callers supply an
//! [`AdbSigner`] and keep the key material wherever they like.

use super::MuxError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;

/// AUTH arg0: packet carries a token to sign
pub const AUTH_TOKEN: u32 = 1;

/// AUTH arg0: packet carries a signature over the last token
pub const AUTH_SIGNATURE: u32 = 2;

/// AUTH arg0: packet carries an RSA public key for the device to trust
pub const AUTH_RSAPUBLICKEY: u32 = 3;

/// Signs device authentication tokens
pub trait AdbSigner: Send + Sync {
    /// Sign the device's token with the private key
    fn sign(&self, token: &[u8]) -> Result<Vec<u8>, MuxError>;

    /// The public key in ADB's binary format, pre-base64
    fn public_key(&self) -> Vec<u8>;

    /// Name attached to the public key when offered to the device
    fn identity(&self) -> String {
        "adb-mux@localhost".to_string()
    }
}

/// Build the AUTH(RSAPUBLICKEY) payload: base64 key, a space, the key
/// name, NUL-terminated
pub(crate) fn public_key_payload(signer: &dyn AdbSigner) -> Bytes {
    let encoded = BASE64.encode(signer.public_key());
    Bytes::from(format!("{} {}\0", encoded, signer.identity()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedKey;

    impl AdbSigner for FixedKey {
        fn sign(&self, token: &[u8]) -> Result<Vec<u8>, MuxError> {
            Ok(token.iter().rev().copied().collect())
        }

        fn public_key(&self) -> Vec<u8> {
            b"public-key-bytes".to_vec()
        }
    }

    #[test]
    fn test_public_key_payload_format() {
        let payload = public_key_payload(&FixedKey);
        let text = std::str::from_utf8(&payload).unwrap();

        assert!(text.ends_with('\0'));
        let (encoded, name) = text.trim_end_matches('\0').split_once(' ').unwrap();
        assert_eq!(BASE64.decode(encoded).unwrap(), b"public-key-bytes");
        assert_eq!(name, "adb-mux@localhost");
    }
}
