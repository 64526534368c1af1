/// An authentication plugin negotiated during the handshake.
///
/// Plugins that need more than one round trip (`caching_sha2_password`'s
/// full-auth fallback, `sha256_password`'s RSA exchange) don't fit this
/// trait alone; those extra rounds are driven directly by
/// `connection::establish` using the free functions in
/// [`super::caching_sha2`] and [`super::sha256`]. This trait covers the part
/// every plugin has in common: naming itself, whether it requires an
/// encrypted channel, and producing the scramble sent optimistically in
/// `HandshakeResponse41`.
pub trait AuthPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// `true` if this plugin must never run its full exchange over a
    /// plaintext connection (`mysql_clear_password`, and `sha256_password`
    /// whenever it falls back to sending the raw password for RSA
    /// encryption without a usable public key).
    fn requires_confidentiality(&self) -> bool;

    /// The scramble/response sent as `auth_response` in the handshake
    /// response or `AuthSwitchResponse`, given the plaintext password and
    /// the server's nonce (`auth_plugin_data`).
    fn hash_password(&self, password: &str, nonce: &[u8]) -> crate::Result<Vec<u8>>;
}
