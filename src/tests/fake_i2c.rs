use embedded_hal::i2c::{self, ErrorKind, ErrorType, Operation};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, PartialEq)]
pub struct FakeI2CMessage {
    pub address: u8,
    pub bytes: Vec<u8>,
}

#[derive(Debug, PartialEq)]
pub enum FakeI2CError {
    ReadError,
    WriteError,
}

impl i2c::Error for FakeI2CError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Records every write and answers reads from a queue of canned responses.
pub struct FakeI2C {
    pub messages: Rc<RefCell<Vec<FakeI2CMessage>>>,
    pub reads_to_serve: Rc<RefCell<VecDeque<FakeI2CMessage>>>,
    /// Length of every read request, in order.
    pub read_lengths: Rc<RefCell<Vec<usize>>>,
    pub fail_writes: Rc<RefCell<bool>>,
    pub fail_reads: Rc<RefCell<bool>>,
}

impl FakeI2C {
    pub fn new() -> FakeI2C {
        FakeI2C {
            messages: Rc::new(RefCell::new(vec![])),
            reads_to_serve: Rc::new(RefCell::new(VecDeque::new())),
            read_lengths: Rc::new(RefCell::new(vec![])),
            fail_writes: Rc::new(RefCell::new(false)),
            fail_reads: Rc::new(RefCell::new(false)),
        }
    }

    pub fn serve(&self, address: u8, bytes: Vec<u8>) {
        self.reads_to_serve
            .borrow_mut()
            .push_back(FakeI2CMessage { address, bytes });
    }

    fn answer_read(&mut self, address: u8, bytes: &mut [u8]) -> Result<(), FakeI2CError> {
        self.read_lengths.borrow_mut().push(bytes.len());
        if *self.fail_reads.borrow() {
            return Err(FakeI2CError::ReadError);
        }
        match self.reads_to_serve.borrow_mut().pop_front() {
            Some(message) if message.address == address => {
                bytes.copy_from_slice(&message.bytes);
                Ok(())
            }
            _ => Err(FakeI2CError::ReadError),
        }
    }

    fn record_write(&mut self, address: u8, bytes: &[u8]) -> Result<(), FakeI2CError> {
        if *self.fail_writes.borrow() {
            return Err(FakeI2CError::WriteError);
        }
        self.messages.borrow_mut().push(FakeI2CMessage {
            address,
            bytes: Vec::from(bytes),
        });
        Ok(())
    }
}

impl ErrorType for FakeI2C {
    type Error = FakeI2CError;
}

impl i2c::I2c for FakeI2C {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), FakeI2CError> {
        for operation in operations {
            match operation {
                Operation::Read(bytes) => self.answer_read(address, &mut **bytes)?,
                Operation::Write(bytes) => self.record_write(address, *bytes)?,
            }
        }
        Ok(())
    }
}
