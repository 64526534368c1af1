use sha1::{Digest, Sha1};

use crate::auth::plugin::AuthPlugin;

/// `mysql_native_password`: `SHA1(password) XOR SHA1(nonce + SHA1(SHA1(password)))`.
///
/// <https://mariadb.com/kb/en/connection/#mysql_native_password-plugin>
#[derive(Debug, Default)]
pub struct MySqlNativePassword;

impl AuthPlugin for MySqlNativePassword {
    fn name(&self) -> &'static str {
        "mysql_native_password"
    }

    fn requires_confidentiality(&self) -> bool {
        false
    }

    fn hash_password(&self, password: &str, nonce: &[u8]) -> crate::Result<Vec<u8>> {
        if password.is_empty() {
            return Ok(Vec::new());
        }

        // the server's nonce is sometimes NUL-padded to a round length.
        let end = nonce.iter().position(|&b| b == 0).unwrap_or(nonce.len());
        let nonce = &nonce[..end];

        let pw_hash = Sha1::digest(password.as_bytes());
        let pw_hash_hash = Sha1::digest(pw_hash);

        let mut seed_hash = Sha1::new();
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
    fn empty_password_scrambles_to_empty_response() {
        let plugin = MySqlNativePassword;
        assert!(plugin.hash_password("", b"some-20-byte-nonce!!").unwrap().is_empty());
    }

    #[test]
    fn scramble_is_twenty_bytes() {
        let plugin = MySqlNativePassword;
        let scramble = plugin
            .hash_password("hunter2", b"01234567890123456789")
            .unwrap();
        assert_eq!(scramble.len(), 20);
    }
}
