//! JVC D-ILA protocol types and constants.

use serde::Serialize;
use std::fmt;

/// Default TCP control port.
pub const DEFAULT_PORT: u16 = 20554;

// Handshake literals
pub(crate) const PJ_OK: &[u8; 5] = b"PJ_OK";
pub(crate) const PJREQ: &[u8; 5] = b"PJREQ";
pub(crate) const PJACK: &[u8; 5] = b"PJACK";

// Frame markers
pub(crate) const OPERATION_MARKER: u8 = b'!';
pub(crate) const REFERENCE_MARKER: u8 = b'?';
pub(crate) const ACK_MARKER: u8 = 0x06;
pub(crate) const RESPONSE_MARKER: u8 = b'@';

/// Unit ID shared by every known D-ILA family.
pub(crate) const UNIT_ID: [u8; 2] = [0x89, 0x01];
pub(crate) const TERMINATOR: u8 = b'\n';

/// Marker + unit id + two code bytes.
pub(crate) const PREFIX_LEN: usize = 1 + UNIT_ID.len() + 2;
/// Ack frame is a prefix followed by the terminator.
pub(crate) const ACK_LEN: usize = PREFIX_LEN + 1;

/// Command direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Write-only action, answered with an ack.
    Operation,
    /// Read request, answered with an ack and a response frame.
    Reference,
}

impl Direction {
    pub(crate) fn marker(self) -> u8 {
        match self {
            Self::Operation => OPERATION_MARKER,
            Self::Reference => REFERENCE_MARKER,
        }
    }
}

/// Lamp/power state reported by the projector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Power {
    Off,
    On,
    Cooling,
    Warming,
    Emergency,
}

impl Power {
    /// Map the single wire digit to a state.
    pub(crate) fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            b'0' => Some(Self::Off),
            b'1' => Some(Self::On),
            b'2' => Some(Self::Cooling),
            b'3' => Some(Self::Warming),
            b'4' => Some(Self::Emergency),
            _ => None,
        }
    }

    pub fn is_off(self) -> bool {
        self == Self::Off
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }

    pub fn is_cooling(self) -> bool {
        self == Self::Cooling
    }

    pub fn is_warming(self) -> bool {
        self == Self::Warming
    }

    pub fn is_emergency(self) -> bool {
        self == Self::Emergency
    }

    /// Warming or cooling; the lamp will settle on its own.
    pub fn is_transitioning(self) -> bool {
        matches!(self, Self::Warming | Self::Cooling)
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Cooling => "cooling",
            Self::Warming => "warming",
            Self::Emergency => "emergency",
        };
        f.write_str(name)
    }
}

/// Lifecycle of the client's single socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Handshaking,
    Ready,
    /// Last connection attempt or exchange failed; `connect()` may be retried.
    Failed,
}

/// Decoded value of a reference command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Power(Power),
    /// One-based lens memory slot.
    LensMemory(u8),
    /// Fixed-width text payload, verbatim.
    Text(String),
}
