//! SIP transport selection

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Transport used to register the account
///
/// Crosses the application boundary as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum TransportType {
    #[default]
    Udp = 0,
    Tcp = 1,
    Tls = 2,
    Dtls = 3,
}

impl TransportType {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether signalling is encrypted on this transport
    pub fn is_secure(self) -> bool {
        matches!(self, TransportType::Tls | TransportType::Dtls)
    }
}

impl TryFrom<u8> for TransportType {
    type Error = BridgeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TransportType::Udp),
            1 => Ok(TransportType::Tcp),
            2 => Ok(TransportType::Tls),
            3 => Ok(TransportType::Dtls),
            other => Err(BridgeError::invalid_argument(
                "transport",
                format!("unknown transport code {}", other),
            )),
        }
    }
}

impl From<TransportType> for u8 {
    fn from(transport: TransportType) -> Self {
        transport.code()
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportType::Udp => "udp",
            TransportType::Tcp => "tcp",
            TransportType::Tls => "tls",
            TransportType::Dtls => "dtls",
        };
        f.write_str(name)
    }
}
