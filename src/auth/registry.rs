use std::sync::Arc;

use crate::auth::plugin::AuthPlugin;
use crate::auth::{CachingSha2Password, MySqlClearPassword, MySqlNativePassword, Sha256Password};

/// Resolves a plugin name (as sent by the server in the handshake or an
/// `AuthSwitchRequest`) to an implementation.
///
/// `custom` is searched first — it's the `plugins` list registered on
/// [`crate::DataSourceOptions`] — so a caller-registered plug-in can shadow
/// one of the four built-ins by reusing its name. An unrecognized name is
/// reported rather than guessed at, since silently picking a fallback could
/// authenticate with the wrong scramble algorithm.
pub fn by_name(name: &str, custom: &[Arc<dyn AuthPlugin>]) -> crate::Result<Arc<dyn AuthPlugin>> {
    if let Some(plugin) = custom.iter().find(|p| p.name() == name) {
        return Ok(Arc::clone(plugin));
    }

    Ok(match name {
        "mysql_native_password" => Arc::new(MySqlNativePassword),
        "caching_sha2_password" => Arc::new(CachingSha2Password),
        "sha256_password" => Arc::new(Sha256Password),
        "mysql_clear_password" => Arc::new(MySqlClearPassword),
        other => {
            return Err(crate::Error::feature_not_supported(format!(
                "unsupported authentication plugin: {other}"
            )))
        }
    })
}
