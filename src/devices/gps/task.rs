//! Periodic GPS update loop
//!
//! The manager is tick-driven; something has to call
//! [`GpsManager::update`] at a steady rate. On embassy targets [`run`] does
//! that with a `Ticker`. Detection timing assumes at least 10 Hz.

#[cfg(feature = "embassy")]
use super::manager::GpsManager;
#[cfg(feature = "embassy")]
use crate::core::traits::TimeSource;
#[cfg(feature = "embassy")]
use crate::platform::traits::UartInterface;

/// GPS update rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateRate {
    /// Update every 100 ms
    #[default]
    Rate10Hz,
    /// Update every 50 ms
    Rate20Hz,
    /// Update every 20 ms
    Rate50Hz,
}

impl UpdateRate {
    /// Tick interval in milliseconds
    pub const fn interval_ms(self) -> u64 {
        match self {
            UpdateRate::Rate10Hz => 100,
            UpdateRate::Rate20Hz => 50,
            UpdateRate::Rate50Hz => 20,
        }
    }
}

/// Open the ports and update `manager` forever at `rate`
///
/// # Example
///
/// ```rust,ignore
/// #[embassy_executor::task]
/// async fn gps_task(mut gps: GpsManager<BufferedUart, EmbassyTime>) {
///     trail_gps::devices::gps::task::run(&mut gps, UpdateRate::Rate10Hz).await
/// }
/// ```
#[cfg(feature = "embassy")]
pub async fn run<U: UartInterface, T: TimeSource>(manager: &mut GpsManager<U, T>, rate: UpdateRate) -> ! {
    use embassy_time::{Duration, Ticker};

    manager.init();
    crate::log_info!("GPS task started ({} ms interval)", rate.interval_ms());

    let mut ticker = Ticker::every(Duration::from_millis(rate.interval_ms()));
    loop {
        manager.update();
        ticker.next().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rate_intervals() {
        assert_eq!(UpdateRate::Rate10Hz.interval_ms(), 100);
        assert_eq!(UpdateRate::Rate20Hz.interval_ms(), 50);
        assert_eq!(UpdateRate::Rate50Hz.interval_ms(), 20);
        assert_eq!(UpdateRate::default(), UpdateRate::Rate10Hz);
    }

    #[test]
    fn test_rates_fit_detection_windows() {
        // Every baud rate must see several ticks before it is abandoned
        for rate in [UpdateRate::Rate10Hz, UpdateRate::Rate20Hz, UpdateRate::Rate50Hz] {
            assert!(super::super::detect::BAUD_CHANGE_MS / rate.interval_ms() >= 10);
        }
    }
}
