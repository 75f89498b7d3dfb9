//! Logging abstraction
//!
//! `log_*!` macros with one call syntax for every target:
//! - Embedded (`defmt` feature): forwarded to defmt
//! - Host tests: printed with a level tag
//! - Host non-test: compiled out, arguments still type-checked
//!
//! Format strings must stay within the subset defmt and `core::fmt` share
//! (`{}` and `{:?}`).

#[doc(hidden)]
#[inline(always)]
pub fn discard(_args: ::core::fmt::Arguments<'_>) {}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_discard {
    ($($arg:tt)*) => {{
        #[cfg(all(not(feature = "defmt"), not(test)))]
        $crate::core::logging::discard(::core::format_args!($($arg)*));
    }};
}

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::info!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!("[INFO] {}", format!($($arg)*));

        $crate::__log_discard!($($arg)*);
    }};
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!("[WARN] {}", format!($($arg)*));

        $crate::__log_discard!($($arg)*);
    }};
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::error!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        eprintln!("[ERROR] {}", format!($($arg)*));

        $crate::__log_discard!($($arg)*);
    }};
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!("[DEBUG] {}", format!($($arg)*));

        $crate::__log_discard!($($arg)*);
    }};
}

#[cfg(test)]
mod tests {
    use crate::devices::gps::GpsProtocol;
    use crate::platform::{PlatformError, UartError};

    #[test]
    fn test_macros_accept_shared_format_subset() {
        let err = PlatformError::Uart(UartError::Overrun);
        crate::log_info!("GPS {}: detected {:?}", 0, GpsProtocol::Ublox);
        crate::log_warn!("GPS: write failed: {}", err);
        crate::log_error!("plain message");
        crate::log_debug!("trying {} baud", 38_400u32);
    }
}
