use crate::io::BufMut;
use crate::protocol::Capabilities;

/// `SSLRequest`: sent instead of `HandshakeResponse41` when upgrading to TLS
/// mid-handshake, so the server knows to wait for a TLS ClientHello before
/// expecting the real response.
#[derive(Debug, Clone)]
pub struct SslRequest {
    pub capabilities: Capabilities,
    pub max_packet_size: u32,
    pub collation: u8,
}

impl super::Encode for SslRequest {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u32(self.capabilities.bits() as u32);
        buf.put_u32(self.max_packet_size);
        buf.put_u8(self.collation);
        buf.put_bytes(&[0u8; 23]);
    }
}

/// `HandshakeResponse41`, the client's reply to the server's handshake,
/// carrying the negotiated capabilities, the chosen auth plugin's scramble,
/// and the optional default schema / connection attributes.
#[derive(Debug, Clone)]
pub struct HandshakeResponse<'a> {
    pub capabilities: Capabilities,
    pub max_packet_size: u32,
    pub collation: u8,
    pub username: &'a str,
    pub auth_response: &'a [u8],
    pub database: Option<&'a str>,
    pub auth_plugin_name: &'a str,
    pub connect_attrs: &'a [(String, String)],
}

impl super::Encode for HandshakeResponse<'_> {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u32(self.capabilities.bits() as u32);
        buf.put_u32(self.max_packet_size);
        buf.put_u8(self.collation);
        buf.put_bytes(&[0u8; 23]);

        buf.put_str_nul(self.username);

        if self.capabilities.contains(Capabilities::PLUGIN_AUTH_LENENC_DATA) {
            buf.put_bytes_lenenc(self.auth_response);
        } else if self.capabilities.contains(Capabilities::SECURE_CONNECTION) {
            buf.put_u8(self.auth_response.len() as u8);
            buf.put_bytes(self.auth_response);
        } else {
            buf.put_bytes(self.auth_response);
            buf.put_u8(0);
        }

        if self.capabilities.contains(Capabilities::CONNECT_WITH_DB) {
            if let Some(database) = self.database {
                buf.put_str_nul(database);
            }
        }

        if self.capabilities.contains(Capabilities::PLUGIN_AUTH) {
            buf.put_str_nul(self.auth_plugin_name);
        }

        if self.capabilities.contains(Capabilities::CONNECT_ATTRS) {
            let mut attrs = Vec::new();
            for (key, value) in self.connect_attrs {
                attrs.put_str_lenenc(key);
                attrs.put_str_lenenc(value);
            }
            buf.put_bytes_lenenc(&attrs);
        }
    }
}
