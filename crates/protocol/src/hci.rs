//! HCI constants and command construction
//!
//! # Command packet
//!
//! ```text
//! [tag: u8 = 0x01][opcode: u16 LE][paramLength: u8][params...]
//! ```
//!
//! The opcode packs the Opcode Group Field into the upper 6 bits and the
//! Opcode Command Field into the lower 10 bits.

/// Command packet tag
pub const HCI_COMMAND_PKT: u8 = 0x01;
/// ACL data packet tag
pub const HCI_ACLDATA_PKT: u8 = 0x02;
/// SCO data packet tag
pub const HCI_SCODATA_PKT: u8 = 0x03;
/// Event packet tag
pub const HCI_EVENT_PKT: u8 = 0x04;

/// Host Controller & Baseband command group
pub const OGF_HOST_CTL: u16 = 0x03;
/// HCI_Reset command
pub const OCF_RESET: u16 = 0x0003;

/// Command Complete event code
pub const EVT_CMD_COMPLETE: u8 = 0x0e;

/// Command Complete for HCI_Reset, as sent by controllers allowing one or two
/// outstanding commands.
const RESET_COMPLETE_FRAMES: [[u8; 6]; 2] = [
    [EVT_CMD_COMPLETE, 0x04, 0x01, 0x03, 0x0c, 0x00],
    [EVT_CMD_COMPLETE, 0x04, 0x02, 0x03, 0x0c, 0x00],
];

/// Compose an HCI opcode from its group and command fields
pub const fn opcode(ogf: u16, ocf: u16) -> u16 {
    ocf | (ogf << 10)
}

/// Build the tagged HCI_Reset command packet
///
/// # Example
/// ```
/// use protocol::reset_command;
///
/// assert_eq!(reset_command(), [0x01, 0x03, 0x0c, 0x00]);
/// ```
pub fn reset_command() -> [u8; 4] {
    let [lo, hi] = opcode(OGF_HOST_CTL, OCF_RESET).to_le_bytes();
    [HCI_COMMAND_PKT, lo, hi, 0x00]
}

/// Check whether an untagged event frame is the Command Complete for HCI_Reset
pub fn is_reset_complete(frame: &[u8]) -> bool {
    RESET_COMPLETE_FRAMES.iter().any(|expected| frame == expected)
}
