//! Frame building and validation.
//!
//! Request:  `marker unit-id code \n`
//! Ack:      `0x06 unit-id code[0..2] \n`
//! Response: `@ unit-id code[0..2] payload \n`

use super::command::Command;
use super::types::{ACK_LEN, ACK_MARKER, PREFIX_LEN, RESPONSE_MARKER, TERMINATOR, UNIT_ID};
use crate::error::{ProjectorError, Result};

/// First two bytes of the code, NUL-padded for codes shorter than two bytes.
fn short_code(command: &Command) -> [u8; 2] {
    let mut short = [0u8; 2];
    for (slot, byte) in short.iter_mut().zip(command.code) {
        *slot = *byte;
    }
    short
}

fn prefix(marker: u8, command: &Command) -> Vec<u8> {
    let mut frame = Vec::with_capacity(PREFIX_LEN + 1);
    frame.push(marker);
    frame.extend_from_slice(&UNIT_ID);
    frame.extend_from_slice(&short_code(command));
    frame
}

/// Build the request frame for a command.
pub(crate) fn build_request(command: &Command) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + UNIT_ID.len() + command.code.len() + 1);
    frame.push(command.direction().marker());
    frame.extend_from_slice(&UNIT_ID);
    frame.extend_from_slice(command.code);
    frame.push(TERMINATOR);
    frame
}

/// The exact acknowledgement the device must send back.
pub(crate) fn expected_ack(command: &Command) -> Vec<u8> {
    let mut frame = prefix(ACK_MARKER, command);
    frame.push(TERMINATOR);
    debug_assert_eq!(frame.len(), ACK_LEN);
    frame
}

/// Prefix of the response frame for a reference command.
pub(crate) fn response_prefix(command: &Command) -> Vec<u8> {
    prefix(RESPONSE_MARKER, command)
}

/// Total response frame length, or `None` for operations.
pub(crate) fn response_len(command: &Command) -> Option<usize> {
    command.reply.map(|reply| PREFIX_LEN + reply.len + 1)
}

/// Compare a received ack against the expected frame.
pub(crate) fn verify_ack(command: &Command, received: &[u8]) -> Result<()> {
    let expected = expected_ack(command);
    if received == expected.as_slice() {
        Ok(())
    } else {
        Err(ProjectorError::AckMismatch {
            expected: escape(&expected),
            received: escape(received),
        })
    }
}

/// Validate a full response frame and return its payload as Latin-1 text.
pub(crate) fn extract_payload(command: &Command, frame: &[u8]) -> Result<String> {
    let total = response_len(command)
        .ok_or_else(|| ProjectorError::framing(format!("{} does not produce a response", command.name)))?;

    if frame.len() != total {
        return Err(ProjectorError::framing(format!(
            "expected {total} bytes, got {}: {}",
            frame.len(),
            escape(frame)
        )));
    }

    let expected_prefix = response_prefix(command);
    if frame[..PREFIX_LEN] != expected_prefix[..] {
        return Err(ProjectorError::framing(format!(
            "bad prefix {} (expected {})",
            escape(&frame[..PREFIX_LEN]),
            escape(&expected_prefix)
        )));
    }

    if frame[total - 1] != TERMINATOR {
        return Err(ProjectorError::framing(format!(
            "bad terminator {}",
            escape(&frame[total - 1..])
        )));
    }

    Ok(latin1(&frame[PREFIX_LEN..total - 1]))
}

/// Single-byte decode: every byte maps to the code point of the same value.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Printable rendering of raw bytes for logs and errors.
pub(crate) fn escape(bytes: &[u8]) -> String {
    bytes.iter().flat_map(|&b| std::ascii::escape_default(b)).map(char::from).collect()
}
