//! # Rust driver for PCF8591 8-bit I2C ADC/DAC
//!
//! This is a platform agnostic rust driver for the PCF8591 four channel ADC with a single DAC
//! output, using the [embedded-hal](https://github.com/rust-embedded/embedded-hal) traits.
//!
//! Every transaction starts with a control byte that selects the analog input programming mode,
//! the A/D channel, auto-increment and the analog output enable flag. See [`ControlByte`].
//!
//! # Conversion lag
//!
//! The device starts an A/D conversion when a byte is read, and sends the result of the
//! *previous* conversion. The first byte of every read therefore belongs to the channel that was
//! selected before the current control byte; `read_sample` and `read_all` discard it.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(target_os = "linux")] {
//! use linux_embedded_hal::I2cdev;
//! use pcf8591::{AnalogInputMode, Pcf8591, DEFAULT_ADDRESS};
//!
//! let i2c = I2cdev::new("/dev/i2c-1").unwrap();
//! let mut converter = Pcf8591::new(i2c, DEFAULT_ADDRESS);
//! converter.set_input_mode(AnalogInputMode::TwoDifferential);
//! let samples = converter.read_all().unwrap();
//! converter.try_output(true, u16::from(samples[0])).unwrap();
//! # }
//! ```
#![cfg_attr(not(any(test, feature = "linux")), no_std)]

#[macro_use]
mod fmt;

mod internal_types;
mod types;

#[cfg(feature = "linux")]
pub mod linux;

pub use crate::types::*;

use crate::internal_types::*;

#[cfg(feature = "sync")]
use embedded_hal::i2c::I2c;
#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c as AsyncI2c;

/// Default I2C address, with A2..A0 tied low.
pub const DEFAULT_ADDRESS: u8 = Address::DEFAULT.as_byte();

/// Returned by the convenience `read` when the sample could not be taken.
pub const READ_FAILED: i16 = -1;

#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
struct State {
    output_enabled: bool,
    mode: AnalogInputMode,
}

/// PCF8591 8-bit ADC/DAC.
///
/// The driver keeps the analog input programming mode and the analog output enable flag, which
/// are sent with every control byte. Methods take `&mut self`; share one instance by wrapping it,
/// not by cloning the bus.
#[maybe_async_cfg::maybe(
    sync(feature = "sync", self = "Pcf8591"),
    async(feature = "async", keep_self)
)]
pub struct AsyncPcf8591<I2C> {
    i2c: I2C,
    address: u8,
    state: State,
}

/// Implementation of all commands given a generic I2CInterface.
///
/// # Errors
///
/// Any errors encountered within the I2C device will be wrapped in [`Error::I2CError`].
///
/// Two families of methods exist. The strict ones (`read_sample`, `read_into`, `read_raw`,
/// `read_all`, `try_output`, `set_output_state`) return every error. The convenience ones
/// (`read`, `output`, `output_with_state`) report failure as [`READ_FAILED`] or `false` instead.
#[maybe_async_cfg::maybe(
    sync(feature = "sync", self = "Pcf8591", idents(AsyncI2c(sync = "I2c"))),
    async(feature = "async", keep_self)
)]
impl<I2C, E> AsyncPcf8591<I2C>
where
    I2C: AsyncI2c<Error = E>,
{
    /// Creates a new driver for the device at `address`, in
    /// [`AnalogInputMode::FourSingleEnded`] with the analog output disabled.
    ///
    /// No bus traffic happens until the first command.
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            state: State::default(),
        }
    }

    /// Destroy this instance and return the inner I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// The 7-bit I2C address the driver talks to.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Sets the analog input programming mode used by subsequent reads.
    ///
    /// The device only learns about the new mode with the next control byte.
    pub fn set_input_mode(&mut self, mode: AnalogInputMode) {
        self.state.mode = mode;
    }

    /// The analog input programming mode sent with the next read.
    pub fn input_mode(&self) -> AnalogInputMode {
        self.state.mode
    }

    /// Whether the analog output is enabled, as last written to the device.
    pub fn output_state(&self) -> bool {
        self.state.output_enabled
    }

    /// Enables or disables the analog output.
    ///
    /// Writes a single control byte, and only if the state changes. The stored state is updated
    /// after the write succeeds.
    pub async fn set_output_state(&mut self, enabled: bool) -> Result<(), Error<E>> {
        if self.state.output_enabled == enabled {
            return Ok(());
        }
        self.write_bytes(&[ControlByte::output_only(enabled).bits()])
            .await?;
        self.state.output_enabled = enabled;
        debug!("analog output enabled: {}", enabled);
        Ok(())
    }

    /// Takes one sample of `channel`, returning it as `0..=255`.
    ///
    /// This is the convenience form of [`read_sample`](Self::read_sample): any error, including an
    /// invalid channel, is logged and reported as [`READ_FAILED`].
    pub async fn read(&mut self, channel: u8) -> i16 {
        match self.read_sample(channel).await {
            Ok(sample) => i16::from(sample),
            Err(_) => {
                warn!("sampling channel {} failed", channel);
                READ_FAILED
            }
        }
    }

    /// Takes one sample of `channel`.
    ///
    /// Reads two bytes without auto-increment: the first one is the stale result of the previous
    /// conversion and is dropped.
    pub async fn read_sample(&mut self, channel: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0; 2];
        self.read_into(channel, &mut buffer).await?;
        Ok(buffer[1])
    }

    /// Selects `channel` and fills `buffer` with conversion results, without auto-increment.
    ///
    /// The first byte is the result of the previous conversion.
    pub async fn read_into(&mut self, channel: u8, buffer: &mut [u8]) -> Result<usize, Error<E>> {
        let size = buffer.len();
        self.read_raw(channel, buffer, 0, size, false).await
    }

    /// Writes the control byte for `channel` and reads `size` bytes into `buffer` at `offset`.
    ///
    /// With `auto_increment` set the device moves to the next channel after each conversion. In
    /// both cases the first byte is the result of the previous conversion, the second belongs to
    /// `channel`.
    ///
    /// Returns the number of bytes read. With `size == 0` only the control byte is written, which
    /// selects the channel and mode without reading anything.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChannel`] if `channel` does not exist in the current mode and
    /// [`Error::InvalidBufferRange`] if `offset + size` exceeds the buffer, both before any bus
    /// traffic.
    pub async fn read_raw(
        &mut self,
        channel: u8,
        buffer: &mut [u8],
        offset: usize,
        size: usize,
        auto_increment: bool,
    ) -> Result<usize, Error<E>> {
        let control = self.control_byte(channel, auto_increment)?;
        let len = buffer.len();
        let end = offset
            .checked_add(size)
            .filter(|&end| end <= len)
            .ok_or(Error::InvalidBufferRange { offset, size, len })?;

        self.write_bytes(&[control.bits()]).await?;
        if size == 0 {
            return Ok(0);
        }
        self.i2c
            .read(self.address, &mut buffer[offset..end])
            .await
            .map_err(Error::I2CError)?;
        trace!("R @{:#x} ctrl={:#x} {} bytes", self.address, control.bits(), size);
        Ok(size)
    }

    /// Takes one sample of every channel of the current mode, in channel order.
    ///
    /// Reads `max_channel + 2` bytes from channel 0 with auto-increment and drops the stale first
    /// byte.
    pub async fn read_all(&mut self) -> Result<Samples, Error<E>> {
        let mut buffer = [0; READ_ALL_BUFFER_LEN];
        let len = self.state.mode.channel_count() + 1;
        self.read_raw(0, &mut buffer, 0, len, true).await?;
        Ok(Samples::from_slice(&buffer[1..len]))
    }

    /// Sets the DAC to `value` and enables the analog output.
    ///
    /// Convenience form of [`try_output`](Self::try_output): returns `false` if `value` is out of
    /// range (nothing is written) or the write fails.
    pub async fn output(&mut self, value: u16) -> bool {
        self.output_with_state(true, value).await
    }

    /// Sets the DAC to `value` and the analog output enable flag to `enabled`.
    ///
    /// Convenience form of [`try_output`](Self::try_output): returns `false` if `value` is out of
    /// range (nothing is written) or the write fails.
    pub async fn output_with_state(&mut self, enabled: bool, value: u16) -> bool {
        match self.try_output(enabled, value).await {
            Ok(()) => true,
            Err(_) => {
                warn!("setting output to {} failed", value);
                false
            }
        }
    }

    /// Sets the DAC to `value` and the analog output enable flag to `enabled`.
    ///
    /// The stored output state is only updated once the write succeeds.
    ///
    /// # Errors
    ///
    /// In addition to the internal I2C errors, this can return [`Error::InvalidValue`] if the
    /// value is out of range (greater than 255).
    pub async fn try_output(&mut self, enabled: bool, value: u16) -> Result<(), Error<E>> {
        let value = u8::try_from(value).map_err(|_| Error::InvalidValue(value))?;
        self.write_bytes(&[ControlByte::output_only(enabled).bits(), value])
            .await?;
        self.state.output_enabled = enabled;
        Ok(())
    }

    fn control_byte(&self, channel: u8, auto_increment: bool) -> Result<ControlByte, Error<E>> {
        let mode = self.state.mode;
        match ControlByte::new(mode, channel) {
            Some(control) => Ok(control
                .with_output_enabled(self.state.output_enabled)
                .with_auto_increment(auto_increment)),
            None => Err(Error::InvalidChannel {
                channel,
                max: mode.max_channel(),
            }),
        }
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        trace!("W @{:#x} {} bytes", self.address, bytes.len());
        self.i2c
            .write(self.address, bytes)
            .await
            .map_err(Error::I2CError)
    }
}


#[cfg(all(test, feature = "async"))]
mod async_tests {
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock, Transaction};

    use crate::*;

    #[tokio::test]
    async fn read_sample_drops_stale_byte() {
        let expectations = [
            Transaction::write(0x48, vec![0x01]),
            Transaction::read(0x48, vec![0xaa, 0x7f]),
        ];
        let mut pcf8591 = AsyncPcf8591::new(Mock::new(&expectations), 0x48);
        assert_eq!(pcf8591.read_sample(1).await, Ok(0x7f));
        pcf8591.release().done();
    }

    #[tokio::test]
    async fn read_all_mixed_mode() {
        let expectations = [
            Transaction::write(0x48, vec![0b0010_0100]),
            Transaction::read(0x48, vec![0x00, 1, 2, 3]),
        ];
        let mut pcf8591 = AsyncPcf8591::new(Mock::new(&expectations), 0x48);
        pcf8591.set_input_mode(AnalogInputMode::SingleEndedAndDifferentialMixed);
        let samples = pcf8591.read_all().await.unwrap();
        assert_eq!(samples.as_slice(), &[1, 2, 3]);
        pcf8591.release().done();
    }

    #[tokio::test]
    async fn read_i2c_error_returns_sentinel() {
        let expectations = [Transaction::write(0x48, vec![0x00]).with_error(ErrorKind::Other)];
        let mut pcf8591 = AsyncPcf8591::new(Mock::new(&expectations), 0x48);
        assert_eq!(pcf8591.read(0).await, READ_FAILED);
        pcf8591.release().done();
    }

    #[tokio::test]
    async fn set_output_state_then_output() {
        let expectations = [
            Transaction::write(0x48, vec![0x40]),
            Transaction::write(0x48, vec![0x00, 0x80]),
        ];
        let mut pcf8591 = AsyncPcf8591::new(Mock::new(&expectations), 0x48);
        assert_eq!(pcf8591.set_output_state(true).await, Ok(()));
        assert_eq!(pcf8591.set_output_state(true).await, Ok(()));
        assert!(pcf8591.output_with_state(false, 0x80).await);
        assert!(!pcf8591.output_state());
        assert!(!pcf8591.output(300).await);
        pcf8591.release().done();
    }
}
