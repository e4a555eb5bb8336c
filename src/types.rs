use core::ops::Deref;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::internal_types::*;

// Error type.

/// Error type for the crate, which can represent either an error from this driver or an inner error
/// that comes from the I2C type.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<InnerError> {
    /// The channel does not exist under the current [`AnalogInputMode`].
    InvalidChannel {
        /// The requested channel.
        channel: u8,
        /// The highest channel available in the current mode.
        max: u8,
    },
    /// A value was larger than the DAC supports.
    ///
    /// The PCF8591 is an 8-bit DAC, so values that it writes must be smaller than 2^8.
    InvalidValue(u16),
    /// The `offset`/`size` pair of a raw read does not fit in the destination buffer.
    InvalidBufferRange {
        offset: usize,
        size: usize,
        len: usize,
    },
    /// Error representing an error that came from the inner I2C driver.
    I2CError(InnerError),
}

impl<InnerError> From<InnerError> for Error<InnerError> {
    fn from(inner: InnerError) -> Self {
        Error::I2CError(inner)
    }
}

// Enums for configuration.

/// Analog input programming mode.
///
/// The four analog inputs AIN0..AIN3 can be combined into single ended or differential inputs.
/// The mode determines how many A/D channels exist and which inputs feed each of them.
#[derive(IntoPrimitive, TryFromPrimitive, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AnalogInputMode {
    /// Four single ended inputs: AIN0..AIN3 map to channels 0..3.
    FourSingleEnded = 0x00,
    /// Three differential inputs: AIN0, AIN1 and AIN2 against the common AIN3, on channels 0..2.
    ThreeDifferential = 0x10,
    /// AIN0 and AIN1 single ended on channels 0 and 1, AIN2 against AIN3 on channel 2.
    SingleEndedAndDifferentialMixed = 0x20,
    /// AIN0 against AIN1 on channel 0, AIN2 against AIN3 on channel 1.
    TwoDifferential = 0x30,
}

impl AnalogInputMode {
    /// The mode bits as they appear in the control byte (bits 4 and 5).
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The highest A/D channel available in this mode.
    pub const fn max_channel(self) -> u8 {
        match self {
            Self::FourSingleEnded => 3,
            Self::ThreeDifferential => 2,
            Self::SingleEndedAndDifferentialMixed => 2,
            Self::TwoDifferential => 1,
        }
    }

    /// Number of A/D channels available in this mode.
    pub const fn channel_count(self) -> usize {
        self.max_channel() as usize + 1
    }

    /// Whether `channel` exists in this mode.
    pub const fn contains(self, channel: u8) -> bool {
        channel <= self.max_channel()
    }
}

impl Default for AnalogInputMode {
    fn default() -> Self {
        Self::FourSingleEnded
    }
}

// Container structs.

/// The control byte sent before every transaction.
///
/// ```text
/// || 0 OE M M 0 AI C C ||
/// ```
///
/// Every field sits on its own bits, so the byte is fully determined by the output enable flag,
/// the auto-increment flag, the [`AnalogInputMode`] and the channel, and decodes back to them.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlByte {
    output_enabled: bool,
    auto_increment: bool,
    mode: AnalogInputMode,
    channel: u8,
}

impl ControlByte {
    /// Creates a control byte selecting `channel` under `mode`, with the output disabled and
    /// auto-increment off.
    ///
    /// Returns `None` if the channel does not exist in `mode`.
    pub const fn new(mode: AnalogInputMode, channel: u8) -> Option<ControlByte> {
        if !mode.contains(channel) {
            return None;
        }
        Some(ControlByte {
            output_enabled: false,
            auto_increment: false,
            mode,
            channel,
        })
    }

    /// The byte used for DAC-only transactions: just the output enable flag.
    pub const fn output_only(output_enabled: bool) -> ControlByte {
        ControlByte {
            output_enabled,
            auto_increment: false,
            mode: AnalogInputMode::FourSingleEnded,
            channel: 0,
        }
    }

    /// Convenience builder method to set the analog output enable flag.
    pub const fn with_output_enabled(mut self, new_val: bool) -> ControlByte {
        self.output_enabled = new_val;
        self
    }

    /// Convenience builder method to set the auto-increment flag.
    pub const fn with_auto_increment(mut self, new_val: bool) -> ControlByte {
        self.auto_increment = new_val;
        self
    }

    pub const fn output_enabled(self) -> bool {
        self.output_enabled
    }

    pub const fn auto_increment(self) -> bool {
        self.auto_increment
    }

    pub const fn mode(self) -> AnalogInputMode {
        self.mode
    }

    pub const fn channel(self) -> u8 {
        self.channel
    }

    /// Encodes the control byte.
    pub const fn bits(self) -> u8 {
        let mut byte = self.mode.code() | self.channel;
        if self.output_enabled {
            byte |= OUTPUT_ENABLE_FLAG;
        }
        if self.auto_increment {
            byte |= AUTO_INCREMENT_FLAG;
        }
        byte
    }

    /// Decodes a control byte.
    ///
    /// Returns `None` if a reserved bit is set or the channel does not exist in the encoded mode.
    pub fn decode(bits: u8) -> Option<ControlByte> {
        if bits & RESERVED_MASK != 0 {
            return None;
        }
        let mode = AnalogInputMode::try_from(bits & MODE_MASK).ok()?;
        Some(
            ControlByte::new(mode, bits & CHANNEL_MASK)?
                .with_output_enabled(bits & OUTPUT_ENABLE_FLAG != 0)
                .with_auto_increment(bits & AUTO_INCREMENT_FLAG != 0),
        )
    }
}

impl From<ControlByte> for u8 {
    fn from(control: ControlByte) -> Self {
        control.bits()
    }
}

/// 7-bit I2C address of the device.
///
/// The upper four bits are fixed to `1001`; the lower three follow the A2, A1 and A0 pins.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(u8);

impl Address {
    /// Address with all address pins tied low (`0x48`).
    pub const DEFAULT: Address = Address(ADDRESS_BASE);

    /// Builds the address from the levels of the address pins (`true` = tied high).
    pub const fn from_pins(a2: bool, a1: bool, a0: bool) -> Address {
        Address(ADDRESS_BASE | (a2 as u8) << 2 | (a1 as u8) << 1 | a0 as u8)
    }

    pub const fn as_byte(self) -> u8 {
        self.0
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<Address> for u8 {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// One fresh sample per available channel, in channel order.
///
/// Returned by `read_all`; dereferences to a slice whose length is the channel count of the mode
/// the samples were taken in.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Samples {
    values: [u8; MAX_CHANNELS],
    len: usize,
}

impl Samples {
    pub(crate) fn from_slice(samples: &[u8]) -> Samples {
        let len = samples.len().min(MAX_CHANNELS);
        let mut values = [0; MAX_CHANNELS];
        values[..len].copy_from_slice(&samples[..len]);
        Samples { values, len }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.values[..self.len]
    }

    /// The sample of `channel`, if that channel was sampled.
    pub fn channel(&self, channel: u8) -> Option<u8> {
        self.as_slice().get(channel as usize).copied()
    }
}

impl Deref for Samples {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}
