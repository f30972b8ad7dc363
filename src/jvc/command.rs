//! Command table and payload decode rules.

use super::types::{Direction, Power, Value};
use crate::error::{ProjectorError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// How a reference payload is turned into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    Power,
    LensMemory,
    Text,
}

/// Expected reply of a reference command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// Payload bytes between the response prefix and the terminator.
    pub len: usize,
    pub decoder: Decoder,
}

/// One exchangeable operation or reference.
///
/// Operations carry no [`Reply`]; references always do.
#[derive(Debug, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub code: &'static [u8],
    pub reply: Option<Reply>,
}

impl Command {
    const fn operation(name: &'static str, code: &'static [u8]) -> Self {
        Self { name, code, reply: None }
    }

    const fn reference(name: &'static str, code: &'static [u8], len: usize, decoder: Decoder) -> Self {
        Self {
            name,
            code,
            reply: Some(Reply { len, decoder }),
        }
    }

    pub fn direction(&self) -> Direction {
        if self.reply.is_some() {
            Direction::Reference
        } else {
            Direction::Operation
        }
    }

    /// Decode a reference payload. Operations have nothing to decode.
    pub fn decode(&self, payload: &str) -> Result<Value> {
        let reply = self
            .reply
            .ok_or_else(|| ProjectorError::decode(format!("{} is an operation and has no payload", self.name)))?;

        match reply.decoder {
            Decoder::Power => decode_power(payload).map(Value::Power),
            Decoder::LensMemory => decode_lens_memory(payload).map(Value::LensMemory),
            Decoder::Text => Ok(Value::Text(payload.to_string())),
        }
    }
}

// Operations
pub const NULL: Command = Command::operation("null", b"\0\0");
pub const POWER_ON: Command = Command::operation("power on", b"PW1");
pub const POWER_OFF: Command = Command::operation("power off", b"PW0");

// References
pub const POWER: Command = Command::reference("power", b"PW", 1, Decoder::Power);
pub const LENS_MEMORY: Command = Command::reference("lens memory", b"INML", 1, Decoder::LensMemory);
pub const MODEL: Command = Command::reference("model", b"MD", 14, Decoder::Text);
pub const MAC_ADDRESS: Command = Command::reference("mac address", b"LSMA", 12, Decoder::Text);
pub const SOFTWARE_VERSION: Command = Command::reference("software version", b"IFSV", 6, Decoder::Text);

/// Lens memory recall operations, indexed by zero-based wire slot.
pub static LENS_MEMORY_SLOTS: [Command; 10] = [
    Command::operation("lens memory 1", b"INML0"),
    Command::operation("lens memory 2", b"INML1"),
    Command::operation("lens memory 3", b"INML2"),
    Command::operation("lens memory 4", b"INML3"),
    Command::operation("lens memory 5", b"INML4"),
    Command::operation("lens memory 6", b"INML5"),
    Command::operation("lens memory 7", b"INML6"),
    Command::operation("lens memory 8", b"INML7"),
    Command::operation("lens memory 9", b"INML8"),
    Command::operation("lens memory 10", b"INML9"),
];

static FIXED: [&Command; 8] = [
    &NULL,
    &POWER_ON,
    &POWER_OFF,
    &POWER,
    &LENS_MEMORY,
    &MODEL,
    &MAC_ADDRESS,
    &SOFTWARE_VERSION,
];

/// Every command the client can send.
pub fn all() -> impl Iterator<Item = &'static Command> {
    FIXED.iter().copied().chain(LENS_MEMORY_SLOTS.iter())
}

/// Find a command by direction and exact code.
pub fn find(direction: Direction, code: &[u8]) -> Option<&'static Command> {
    all().find(|c| c.direction() == direction && c.code == code)
}

/// Convert a one-based lens memory slot (1-10) to its zero-based wire index.
pub fn lens_memory_index(slot: u8) -> Result<u8> {
    if (1..=10).contains(&slot) {
        Ok(slot - 1)
    } else {
        Err(ProjectorError::invalid_argument(format!(
            "lens memory slot must be 1-10, got {slot}"
        )))
    }
}

/// Recall command for a one-based lens memory slot.
pub fn lens_memory_slot(slot: u8) -> Result<&'static Command> {
    let index = lens_memory_index(slot)?;
    Ok(&LENS_MEMORY_SLOTS[usize::from(index)])
}

/// Decode the single power digit.
pub fn decode_power(payload: &str) -> Result<Power> {
    match payload.as_bytes() {
        [digit] => Power::from_digit(*digit)
            .ok_or_else(|| ProjectorError::decode(format!("unknown power state {payload:?}"))),
        _ => Err(ProjectorError::decode(format!("power payload must be one digit, got {payload:?}"))),
    }
}

/// Decode the zero-based lens memory digit into a one-based slot.
pub fn decode_lens_memory(payload: &str) -> Result<u8> {
    match payload.as_bytes() {
        [digit @ b'0'..=b'9'] => Ok(digit - b'0' + 1),
        _ => Err(ProjectorError::decode(format!("lens memory payload must be one digit, got {payload:?}"))),
    }
}

static MODEL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ILAFPJ -- -?(\S{1,4})\s*$").expect("model pattern is valid"));

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})(\d{2})PJ$").expect("version pattern is valid"));

/// Extract the short model code from the raw model string.
///
/// `"ILAFPJ -- XH4 "` gives `XH4`, `"ILAFPJ -- -RS10"` gives `RS10`. Anything
/// else is reported as absent.
pub fn model_code(raw: &str) -> Option<String> {
    MODEL_PATTERN.captures(raw).map(|caps| caps[1].to_string())
}

/// Format the raw version string as `MAJOR.MINOR`, or return it verbatim.
pub fn software_version(raw: &str) -> String {
    match VERSION_PATTERN.captures(raw) {
        Some(caps) => format!("{}.{}", &caps[1], &caps[2]),
        None => raw.to_string(),
    }
}

/// Insert colons into the 12-digit MAC string.
pub fn format_mac(raw: &str) -> String {
    if raw.len() != 12 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return raw.to_string();
    }
    raw.as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_commands_have_reply() {
        for command in all() {
            match command.direction() {
                Direction::Reference => assert!(command.reply.is_some_and(|r| r.len > 0), "{}", command.name),
                Direction::Operation => assert!(command.reply.is_none(), "{}", command.name),
            }
        }
    }

    #[test]
    fn test_codes_unique_per_direction() {
        let commands: Vec<_> = all().collect();
        for (i, a) in commands.iter().enumerate() {
            for b in &commands[i + 1..] {
                assert!(
                    a.direction() != b.direction() || a.code != b.code,
                    "{} and {} share a code",
                    a.name,
                    b.name
                );
            }
        }
    }

    #[test]
    fn test_find() {
        assert_eq!(find(Direction::Reference, b"PW"), Some(&POWER));
        assert_eq!(find(Direction::Operation, b"PW1"), Some(&POWER_ON));
        assert_eq!(find(Direction::Operation, b"PW"), None);
    }

    #[test]
    fn test_decode_power_all_states() {
        assert_eq!(decode_power("0").unwrap(), Power::Off);
        assert_eq!(decode_power("1").unwrap(), Power::On);
        assert_eq!(decode_power("2").unwrap(), Power::Cooling);
        assert_eq!(decode_power("3").unwrap(), Power::Warming);
        assert_eq!(decode_power("4").unwrap(), Power::Emergency);
    }

    #[test]
    fn test_decode_power_rejects_unknown() {
        for payload in ["5", "9", "A", "", "11"] {
            assert!(matches!(decode_power(payload), Err(ProjectorError::Decode(_))), "{payload:?}");
        }
    }

    #[test]
    fn test_lens_memory_decode_is_one_based() {
        for digit in 0..=9u8 {
            let payload = digit.to_string();
            assert_eq!(decode_lens_memory(&payload).unwrap(), digit + 1);
        }
        assert!(decode_lens_memory("X").is_err());
    }

    #[test]
    fn test_lens_memory_index_inverse() {
        for slot in 1..=10u8 {
            let index = lens_memory_index(slot).unwrap();
            let payload = index.to_string();
            assert_eq!(decode_lens_memory(&payload).unwrap(), slot);
        }
    }

    #[test]
    fn test_lens_memory_slot_bounds() {
        assert!(matches!(lens_memory_slot(0), Err(ProjectorError::InvalidArgument(_))));
        assert!(matches!(lens_memory_slot(11), Err(ProjectorError::InvalidArgument(_))));
        assert_eq!(lens_memory_slot(3).unwrap().code, b"INML2");
        assert_eq!(lens_memory_slot(10).unwrap().code, b"INML9");
    }

    #[test]
    fn test_model_code() {
        assert_eq!(model_code("ILAFPJ -- XH4 ").as_deref(), Some("XH4"));
        assert_eq!(model_code("ILAFPJ -- -RS10").as_deref(), Some("RS10"));
        assert_eq!(model_code("ILAFPJ -- -XH4").as_deref(), Some("XH4"));
        assert_eq!(model_code("SOMETHING ELSE"), None);
    }

    #[test]
    fn test_software_version() {
        assert_eq!(software_version("0352PJ"), "03.52");
        assert_eq!(software_version("UNKNOWN"), "UNKNOWN");
        assert_eq!(software_version("0352XX"), "0352XX");
    }

    #[test]
    fn test_format_mac() {
        assert_eq!(format_mac("E0DADC0A1B2C"), "E0:DA:DC:0A:1B:2C");
        assert_eq!(format_mac("short"), "short");
    }

    #[test]
    fn test_operation_has_nothing_to_decode() {
        assert!(POWER_ON.decode("1").is_err());
        assert_eq!(POWER.decode("1").unwrap(), Value::Power(Power::On));
        assert_eq!(MAC_ADDRESS.decode("E0DADC0A1B2C").unwrap(), Value::Text("E0DADC0A1B2C".into()));
    }
}
