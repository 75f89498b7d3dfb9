//! Initialisation blob transmission
//!
//! GPS receivers boot in whatever mode they were last configured for. While
//! detection runs, a fixed blob of configuration commands is streamed to the
//! link to coax the common receiver families into their binary protocols.
//! The UART transmit buffer is small (16 bytes), so the blob goes out a few
//! bytes per tick, picking up where the previous tick stopped.

use crate::platform::traits::UartInterface;

/// u-blox: switch UART1 to UBX+NMEA in / UBX out at 38400, then enable NAV-SOL
pub const UBLOX_SET_BINARY: &[u8] =
    b"$PUBX,41,1,0003,0001,38400,0*26\n\xb5\x62\x06\x01\x03\x00\x01\x06\x01\x12\x4f";

/// MediaTek: switch to binary output
pub const MTK_SET_BINARY: &[u8] = b"$PGCMD,16,0,0,0,0,0*6A\r\n";

/// SiRF: switch to SiRF binary at 38400
pub const SIRF_SET_BINARY: &[u8] = b"$PSRF100,0,38400,8,1,0*3C\r\n";

/// Blob sent on every baud change during detection
pub const INIT_BLOB: &[u8] = b"$PUBX,41,1,0003,0001,38400,0*26\n\xb5\x62\x06\x01\x03\x00\x01\x06\x01\x12\x4f\
$PGCMD,16,0,0,0,0,0*6A\r\n\
$PSRF100,0,38400,8,1,0*3C\r\n";

/// Progress through a blob being streamed to one port
///
/// `pending` is the unsent tail of the blob: its start is the read cursor and
/// its length the remaining byte count.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobStream {
    pending: &'static [u8],
}

impl BlobStream {
    /// A stream with nothing to send
    pub const fn idle() -> Self {
        Self { pending: &[] }
    }

    /// Restart from the beginning of `blob`, dropping any unsent bytes
    pub fn start(&mut self, blob: &'static [u8]) {
        self.pending = blob;
    }

    /// Bytes still to be written
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// True once the whole blob has been written
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Write as much of the blob as the transmit buffer has room for
    ///
    /// Never blocks and never offers the port more than it reported free.
    /// Returns the number of bytes written this call.
    pub fn advance<U: UartInterface>(&mut self, port: &mut U) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        let space = port.tx_space().min(self.pending.len());
        if space == 0 {
            return 0;
        }

        match port.write(&self.pending[..space]) {
            Ok(written) => {
                let written = written.min(space);
                self.pending = &self.pending[written..];
                written
            }
            Err(e) => {
                crate::log_warn!("GPS: init blob write failed: {}", e);
                0
            }
        }
    }
}
