//! Pluggable client-side authentication: `mysql_native_password`,
//! `sha256_password`, `caching_sha2_password`, and `mysql_clear_password`.

mod caching_sha2;
mod clear_password;
mod native;
mod plugin;
mod registry;
mod sha256;

pub use caching_sha2::CachingSha2Password;
pub use clear_password::MySqlClearPassword;
pub use native::MySqlNativePassword;
pub use plugin::AuthPlugin;
pub use registry::by_name;
pub use sha256::{Sha256Password, REQUEST_PUBLIC_KEY};

pub use caching_sha2::encrypt_password_rsa;

/// Status bytes `caching_sha2_password` sends inside `AuthMoreData`.
pub mod caching_sha2_status {
    pub use crate::protocol::caching_sha2_status::{FAST_AUTH_SUCCESS, FULL_AUTHENTICATION_REQUIRED};
}
