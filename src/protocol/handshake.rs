use crate::io::Buf;
use crate::protocol::{Capabilities, ServerStatus};

/// `Handshake V10`, the first packet the server sends on connect.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_packets_protocol_handshake_v10.html>
#[derive(Debug, Clone)]
pub struct Handshake {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub server_capabilities: Capabilities,
    pub server_default_collation: u8,
    pub status: ServerStatus,
    pub auth_plugin_name: Option<String>,
    pub auth_plugin_data: Vec<u8>,
}

impl<'a> super::Decode<'a> for Handshake {
    fn decode(buf: &mut &'a [u8]) -> crate::Result<Self> {
        let protocol_version = buf.get_u8()?;
        let server_version = buf.get_str_nul()?.to_owned();
        let connection_id = buf.get_u32()?;

        let mut scramble = Vec::with_capacity(20);
        scramble.extend_from_slice(buf.get_bytes(8)?);
        buf.advance(1); // filler

        let capabilities_lo = buf.get_u16()?;
        let mut capabilities = Capabilities::from_bits_truncate(capabilities_lo as u64);

        let char_set = buf.get_u8()?;
        let status = ServerStatus::from_bits_truncate(buf.get_u16()?);

        let capabilities_hi = buf.get_u16()?;
        capabilities |= Capabilities::from_bits_truncate((capabilities_hi as u64) << 16);

        let auth_plugin_data_len = if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            buf.get_u8()?
        } else {
            buf.advance(1);
            0
        };

        buf.advance(10); // reserved, always zero

        if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            let len = (auth_plugin_data_len as i32 - 8).max(13) as usize;
            scramble.extend_from_slice(buf.get_bytes(len)?);
            // the second part is always NUL-terminated regardless of its
            // declared length; drop the trailing zero.
            if scramble.last() == Some(&0) {
                scramble.pop();
            }
        }

        let auth_plugin_name = if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            Some(buf.get_str_nul()?.to_owned())
        } else {
            None
        };

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            server_capabilities: capabilities,
            server_default_collation: char_set,
            status,
            auth_plugin_name,
            auth_plugin_data: scramble,
        })
    }
}

/// `AuthSwitchRequest`: the server asks the client to restart authentication
/// using a different plugin, usually after the initial optimistic plugin
/// guess in the handshake response turned out wrong.
#[derive(Debug, Clone)]
pub struct AuthSwitchRequest {
    pub plugin_name: String,
    pub plugin_data: Vec<u8>,
}

impl<'a> super::Decode<'a> for AuthSwitchRequest {
    fn decode(buf: &mut &'a [u8]) -> crate::Result<Self> {
        let header = buf.get_u8()?;
        if header != crate::protocol::marker::AUTH_SWITCH {
            return Err(protocol_err!("expected 0xFE; received 0x{:X}", header));
        }

        let plugin_name = buf.get_str_nul()?.to_owned();
        let mut plugin_data = buf.get_bytes(buf.len())?.to_vec();
        if plugin_data.last() == Some(&0) {
            plugin_data.pop();
        }

        Ok(Self {
            plugin_name,
            plugin_data,
        })
    }
}

/// `AuthMoreData`: extra round-trip data for plugins like
/// `caching_sha2_password` (a single status byte for fast/full auth) and
/// `sha256_password`/public-key retrieval (an RSA public key in PEM form).
#[derive(Debug, Clone)]
pub struct AuthMoreData {
    pub data: Vec<u8>,
}

impl<'a> super::Decode<'a> for AuthMoreData {
    fn decode(buf: &mut &'a [u8]) -> crate::Result<Self> {
        let header = buf.get_u8()?;
        if header != crate::protocol::marker::AUTH_MORE_DATA {
            return Err(protocol_err!("expected 0x01; received 0x{:X}", header));
        }

        Ok(Self {
            data: buf.get_bytes(buf.len())?.to_vec(),
        })
    }
}

/// The single status byte `caching_sha2_password` sends inside
/// `AuthMoreData` to say whether the fast-path scramble matched the cache.
pub mod caching_sha2_status {
    pub const FAST_AUTH_SUCCESS: u8 = 0x03;
    pub const FULL_AUTHENTICATION_REQUIRED: u8 = 0x04;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Decode;

    const HANDSHAKE_MYSQL_8_0_18: &[u8] = b"\n8.0.18\x00\x19\x00\x00\x00\x114aB0c\x06g\x00\xff\xff\xff\x02\x00\xff\xc7\x15\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00tL\x03s\x0f[4\rl4. \x00caching_sha2_password\x00";

    #[test]
    fn decodes_mysql_8_handshake() {
        let mut buf = HANDSHAKE_MYSQL_8_0_18;
        let p = Handshake::decode(&mut buf).unwrap();

        assert_eq!(p.protocol_version, 10);
        assert_eq!(&*p.server_version, "8.0.18");
        assert_eq!(p.server_default_collation, 255);
        assert!(p.status.contains(ServerStatus::SERVER_STATUS_AUTOCOMMIT));
        assert_eq!(p.auth_plugin_name.as_deref(), Some("caching_sha2_password"));
        assert_eq!(p.auth_plugin_data.len(), 20);
    }
}
