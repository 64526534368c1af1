use crate::auth::plugin::AuthPlugin;

/// `mysql_clear_password`: sends the password as-is. Only ever safe over a
/// TLS-upgraded connection, which is why [`AuthPlugin::requires_confidentiality`]
/// returns `true` here and `connection::establish` refuses to use it
/// otherwise.
#[derive(Debug, Default)]
pub struct MySqlClearPassword;

impl AuthPlugin for MySqlClearPassword {
    fn name(&self) -> &'static str {
        "mysql_clear_password"
    }

    fn requires_confidentiality(&self) -> bool {
        true
    }

    fn hash_password(&self, password: &str, _nonce: &[u8]) -> crate::Result<Vec<u8>> {
        let mut out = password.as_bytes().to_vec();
        out.push(0);
        Ok(out)
    }
}
