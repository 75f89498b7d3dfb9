//! Mock UART implementation for testing

use crate::platform::{
    traits::{UartConfig, UartInterface},
    Result,
};
use core::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

#[derive(Debug)]
struct MockUartState {
    config: UartConfig,
    tx_buffer: Vec<u8>,
    rx_buffer: VecDeque<u8>,
    baud_history: Vec<u32>,
    tx_sent: Vec<u8>,
}

/// Mock UART implementation
///
/// Provides in-memory buffers for transmit and receive data. Clones share the
/// same buffers, so a test can keep a handle while the code under test owns
/// the port.
///
/// The transmit buffer is bounded by `UartConfig::tx_buffer`; bytes stay in it
/// until the test calls [`MockUart::drain_tx`], which simulates the hardware
/// shifting them out.
///
/// # Example
///
/// ```ignore
/// use trail_gps::platform::mock::MockUart;
/// use trail_gps::platform::traits::UartInterface;
///
/// let mut uart = MockUart::new(Default::default());
/// let handle = uart.clone();
///
/// uart.write(b"Hello").unwrap();
/// assert_eq!(handle.tx_buffer(), b"Hello");
///
/// handle.inject_rx_data(b"World");
/// let mut buf = [0u8; 5];
/// uart.read(&mut buf).unwrap();
/// assert_eq!(&buf, b"World");
/// ```
#[derive(Debug, Clone)]
pub struct MockUart {
    inner: Rc<RefCell<MockUartState>>,
}

impl MockUart {
    /// Create a new mock UART
    pub fn new(config: UartConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MockUartState {
                config,
                tx_buffer: Vec::new(),
                rx_buffer: VecDeque::new(),
                baud_history: Vec::new(),
                tx_sent: Vec::new(),
            })),
        }
    }

    /// Bytes currently queued in the transmit buffer
    pub fn tx_buffer(&self) -> Vec<u8> {
        self.inner.borrow().tx_buffer.clone()
    }

    /// Empty the transmit buffer, returning what was in it
    pub fn drain_tx(&self) -> Vec<u8> {
        let mut state = self.inner.borrow_mut();
        let drained: Vec<u8> = state.tx_buffer.drain(..).collect();
        state.tx_sent.extend_from_slice(&drained);
        drained
    }

    /// Everything written so far, drained or not
    pub fn tx_total(&self) -> Vec<u8> {
        let state = self.inner.borrow();
        let mut all = state.tx_sent.clone();
        all.extend_from_slice(&state.tx_buffer);
        all
    }

    /// Change the transmit buffer size
    pub fn set_tx_capacity(&self, capacity: usize) {
        self.inner.borrow_mut().config.tx_buffer = capacity;
    }

    /// Inject receive data (for test setup)
    pub fn inject_rx_data(&self, data: &[u8]) {
        self.inner.borrow_mut().rx_buffer.extend(data.iter().copied());
    }

    /// Number of injected bytes not yet read
    pub fn rx_pending(&self) -> usize {
        self.inner.borrow().rx_buffer.len()
    }

    /// Get current baud rate
    pub fn baud_rate(&self) -> u32 {
        self.inner.borrow().config.baud_rate
    }

    /// Every baud rate set since creation, in order
    pub fn baud_history(&self) -> Vec<u32> {
        self.inner.borrow().baud_history.clone()
    }
}

impl UartInterface for MockUart {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut state = self.inner.borrow_mut();
        let space = state.config.tx_buffer.saturating_sub(state.tx_buffer.len());
        let count = core::cmp::min(space, data.len());
        state.tx_buffer.extend_from_slice(&data[..count]);
        Ok(count)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut state = self.inner.borrow_mut();
        let to_read = core::cmp::min(buffer.len(), state.rx_buffer.len());

        for (slot, byte) in buffer.iter_mut().zip(state.rx_buffer.drain(..to_read)) {
            *slot = byte;
        }

        Ok(to_read)
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        state.config.baud_rate = baud;
        state.baud_history.push(baud);
        Ok(())
    }

    fn available(&self) -> usize {
        self.inner.borrow().rx_buffer.len()
    }

    fn tx_space(&self) -> usize {
        let state = self.inner.borrow();
        state.config.tx_buffer.saturating_sub(state.tx_buffer.len())
    }
}
