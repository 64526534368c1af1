use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use sha1::Sha1;

use crate::auth::plugin::AuthPlugin;

/// `sha256_password`: the password is never hashed client-side. Instead it
/// is XORed with the server's nonce and RSA-encrypted (OAEP/SHA1 padding,
/// matching the MySQL C client) using either the server's own public key
/// (fetched over TLS, or in plaintext if `allowPublicKeyRetrieval` is set)
/// or the connection's TLS channel directly.
///
/// <https://dev.mysql.com/doc/refman/8.0/en/sha256-pluggable-authentication.html>
#[derive(Debug, Default)]
pub struct Sha256Password;

/// Byte requesting the server send its RSA public key, used when the
/// optimistic auth response in the handshake can't yet encrypt anything.
pub const REQUEST_PUBLIC_KEY: u8 = 0x01;

impl AuthPlugin for Sha256Password {
    fn name(&self) -> &'static str {
        "sha256_password"
    }

    fn requires_confidentiality(&self) -> bool {
        false
    }

    fn hash_password(&self, password: &str, _nonce: &[u8]) -> crate::Result<Vec<u8>> {
        if password.is_empty() {
            return Ok(Vec::new());
        }

        // The real response has to wait for a TLS upgrade or the server's
        // RSA key; `connection::establish` drives that exchange and calls
        // `encrypt_password_rsa` directly once a key is in hand.
        Ok(vec![REQUEST_PUBLIC_KEY])
    }
}

/// XORs `password` (including its NUL terminator, per the wire protocol)
/// with the repeating `nonce`, then RSA/OAEP-encrypts the result with the
/// server's public key. Shared by `sha256_password` and
/// `caching_sha2_password`'s full-authentication fallback.
pub fn encrypt_password_rsa(
    password: &str,
    nonce: &[u8],
    public_key_pem: &str,
) -> crate::Result<Vec<u8>> {
    let mut bytes: Vec<u8> = password.bytes().chain(std::iter::once(0)).collect();
    for (i, b) in bytes.iter_mut().enumerate() {
        *b ^= nonce[i % nonce.len()];
    }

    let public_key = RsaPublicKey::from_public_key_pem(public_key_pem.trim())
        .map_err(|e| crate::Error::protocol(format!("invalid RSA public key from server: {e}")))?;

    let mut rng = rand::thread_rng();
    public_key
        .encrypt(&mut rng, Oaep::new::<Sha1>(), &bytes)
        .map_err(|e| crate::Error::protocol(format!("RSA encryption failed: {e}")))
}
