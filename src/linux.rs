//! Opening the converter by Linux I2C bus number.
//!
//! Drivers opened for the same bus share one `/dev/i2c-N` handle. Every transaction takes the
//! bus lock first and gives up after the configured timeout.

use core::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError, Weak};
use std::time::{Duration, Instant};

use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, Operation};
use linux_embedded_hal::i2cdev::linux::LinuxI2CError;
use linux_embedded_hal::I2cdev;
use thiserror::Error;

use crate::{Pcf8591, DEFAULT_ADDRESS};

/// Default time to wait for the bus lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(60);

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(1);

type Registry<D> = Mutex<Vec<(u8, Weak<Mutex<D>>)>>;

static OPEN_BUSES: Registry<I2cdev> = Mutex::new(Vec::new());

/// Returns the live handle registered for `bus`, or opens and registers a new one.
fn join_or_open<D, F>(registry: &Registry<D>, bus: u8, open: F) -> Result<Arc<Mutex<D>>, OpenError>
where
    F: FnOnce() -> Result<D, OpenError>,
{
    let mut open_buses = registry.lock().unwrap_or_else(|e| e.into_inner());
    open_buses.retain(|(_, device)| device.strong_count() > 0);

    let shared = open_buses
        .iter()
        .find(|(number, _)| *number == bus)
        .and_then(|(_, device)| device.upgrade());
    if let Some(device) = shared {
        return Ok(device);
    }
    let device = Arc::new(Mutex::new(open()?));
    open_buses.push((bus, Arc::downgrade(&device)));
    debug!("opened I2C bus {}", bus);
    Ok(device)
}

/// Polls `mutex` until it is free or `timeout` has passed. A poisoned lock is taken over.
fn lock_within<T>(mutex: &Mutex<T>, timeout: Duration) -> Option<MutexGuard<'_, T>> {
    let deadline = Instant::now().checked_add(timeout);
    loop {
        match mutex.try_lock() {
            Ok(guard) => return Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock)
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) =>
            {
                return None
            }
            Err(TryLockError::WouldBlock) => std::thread::sleep(LOCK_POLL_INTERVAL),
        }
    }
}

/// Where to find the device.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct BusConfig {
    /// Bus number, as in `/dev/i2c-<bus>`.
    pub bus: u8,
    /// 7-bit device address.
    pub address: u8,
    /// How long a transaction waits for the bus lock.
    pub lock_timeout: Duration,
}

impl BusConfig {
    /// Creates a config for `bus` with the default address and lock timeout.
    pub fn new(bus: u8) -> BusConfig {
        BusConfig {
            bus,
            address: DEFAULT_ADDRESS,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Convenience builder method to set the device address.
    pub fn address(mut self, new_val: u8) -> BusConfig {
        self.address = new_val;
        self
    }

    /// Convenience builder method to set the lock timeout.
    pub fn lock_timeout(mut self, new_val: Duration) -> BusConfig {
        self.lock_timeout = new_val;
        self
    }

    fn device_path(&self) -> PathBuf {
        PathBuf::from(format!("/dev/i2c-{}", self.bus))
    }
}

/// Error opening a bus.
#[derive(Debug, Error)]
pub enum OpenError {
    /// There is no `/dev/i2c-<bus>` node for this bus number.
    #[error("unsupported I2C bus number {0}")]
    UnsupportedBus(u8),
    /// The device node exists but could not be opened.
    #[error("failed to open I2C bus: {0}")]
    Open(#[from] LinuxI2CError),
}

/// Error of a [`LockedBus`] transaction.
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus lock was not acquired within the configured timeout.
    #[error("timed out after {0:?} waiting for the I2C bus")]
    LockTimeout(Duration),
    /// The transaction itself failed.
    #[error("I2C transaction failed: {0:?}")]
    Io(<I2cdev as ErrorType>::Error),
}

impl i2c::Error for BusError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::LockTimeout(_) => ErrorKind::Other,
            Self::Io(err) => i2c::Error::kind(err),
        }
    }
}

/// A Linux I2C bus handle guarded by a lock shared between all handles of the same bus.
#[derive(Clone)]
pub struct LockedBus {
    bus: u8,
    device: Arc<Mutex<I2cdev>>,
    lock_timeout: Duration,
}

impl LockedBus {
    /// Opens `/dev/i2c-<bus>`, or joins the handle already opened for it.
    pub fn open(bus: u8, lock_timeout: Duration) -> Result<LockedBus, OpenError> {
        let device = join_or_open(&OPEN_BUSES, bus, || {
            let path = BusConfig::new(bus).device_path();
            if !path.exists() {
                return Err(OpenError::UnsupportedBus(bus));
            }
            Ok(I2cdev::new(&path)?)
        })?;

        Ok(LockedBus {
            bus,
            device,
            lock_timeout,
        })
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    fn lock(&self) -> Result<MutexGuard<'_, I2cdev>, BusError> {
        lock_within(&self.device, self.lock_timeout).ok_or_else(|| {
            warn!("I2C bus {} still locked after timeout", self.bus);
            BusError::LockTimeout(self.lock_timeout)
        })
    }
}

impl fmt::Debug for LockedBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedBus")
            .field("bus", &self.bus)
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

impl ErrorType for LockedBus {
    type Error = BusError;
}

impl I2c for LockedBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), BusError> {
        let mut device = self.lock()?;
        device.transaction(address, operations).map_err(BusError::Io)
    }
}

impl Pcf8591<LockedBus> {
    /// Opens the converter described by `config`.
    ///
    /// # Errors
    ///
    /// [`OpenError::UnsupportedBus`] if the bus number has no device node.
    pub fn open(config: &BusConfig) -> Result<Self, OpenError> {
        let bus = LockedBus::open(config.bus, config.lock_timeout)?;
        Ok(Pcf8591::new(bus, config.address))
    }
}
