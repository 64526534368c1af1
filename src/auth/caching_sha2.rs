use sha2::{Digest, Sha256};

use crate::auth::plugin::AuthPlugin;

pub use crate::auth::sha256::encrypt_password_rsa;

/// `caching_sha2_password`: the server's default plugin since MySQL 8.0.
/// The fast path sends `SHA256(password) XOR SHA256(nonce + SHA256(SHA256(password)))`
/// and succeeds if the server has this user's SCRAMBLE cached; otherwise it
/// sends `AuthMoreData(FULL_AUTHENTICATION_REQUIRED)` and the exchange falls
/// back to the same RSA exchange `sha256_password` uses.
///
/// <https://mariadb.com/kb/en/caching_sha2_password-authentication-plugin/>
#[derive(Debug, Default)]
pub struct CachingSha2Password;

impl AuthPlugin for CachingSha2Password {
    fn name(&self) -> &'static str {
        "caching_sha2_password"
    }

    fn requires_confidentiality(&self) -> bool {
        false
    }

    fn hash_password(&self, password: &str, nonce: &[u8]) -> crate::Result<Vec<u8>> {
        if password.is_empty() {
            return Ok(Vec::new());
        }

        let pw_hash = Sha256::digest(password.as_bytes());
        let pw_hash_hash = Sha256::digest(pw_hash);

        let mut seed_hash = Sha256::new();
        seed_hash.update(nonce);
        seed_hash.update(pw_hash_hash);
        let pw_seed_hash_hash = seed_hash.finalize();

        let mut out = pw_hash;
        for (o, s) in out.iter_mut().zip(pw_seed_hash_hash.iter()) {
            *o ^= s;
        }

        Ok(out.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scramble_is_thirty_two_bytes() {
        let plugin = CachingSha2Password;
        let scramble = plugin
            .hash_password("hunter2", b"01234567890123456789")
            .unwrap();
        assert_eq!(scramble.len(), 32);
    }
}
