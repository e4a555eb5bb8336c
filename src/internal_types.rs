// Control byte layout: || 0 OE M M 0 AI C C ||
// OE = Analog output enable
// M = Analog input programming mode
// AI = Auto-increment
// C = A/D channel number
pub const OUTPUT_ENABLE_FLAG: u8 = 0b0100_0000;
pub const AUTO_INCREMENT_FLAG: u8 = 0b0000_0100;
pub const MODE_MASK: u8 = 0b0011_0000;
pub const CHANNEL_MASK: u8 = 0b0000_0011;
pub const RESERVED_MASK: u8 = 0b1000_1000;

// Base address with A2..A0 tied low.
pub const ADDRESS_BASE: u8 = 0b100_1000;

// One sample per input, plus the stale leading byte of the conversion pipeline.
pub const MAX_CHANNELS: usize = 4;
pub const READ_ALL_BUFFER_LEN: usize = MAX_CHANNELS + 1;
