//! GPS instance lifecycle
//!
//! [`GpsManager`] owns up to [`GPS_MAX_INSTANCES`] GPS links. Each
//! [`GpsManager::update`] ticks every instance once:
//!
//! ```text
//! selector None ──────────────────────────────> NoGps, no driver
//! no driver / NoGps ──> detection step ──match──> driver owned, NoFix
//! driver owned ──> blob, configure, read ──ok──> stamp message (and fix) time
//!                                        └─stale > 1200 ms──> NoGps, driver released
//! ```
//!
//! Instance 0's status is published to [`NotifyFlags`] after every update.

use super::backend::{GpsBackend, GpsDriver, GpsProtocol};
use super::blob::BlobStream;
use super::detect::DetectState;
use super::state::{GpsState, GpsStatus, GpsTiming, Location};
use super::GPS_MAX_INSTANCES;
use crate::core::notify::{NotifyFlags, NOTIFY};
use crate::core::parameters::{GpsParams, GpsType};
use crate::core::traits::TimeSource;
use crate::platform::traits::UartInterface;
use nalgebra::Vector3;

/// Time without a parsed message after which a link is declared lost
pub const STALE_MS: u64 = 1200;

/// Baud rate ports are opened at before detection starts
pub const INITIAL_BAUD: u32 = 38400;

/// One GPS link and everything tracked for it
#[derive(Debug)]
pub struct GpsInstance<U> {
    pub(super) port: Option<U>,
    pub(super) state: GpsState,
    pub(super) timing: GpsTiming,
    pub(super) detect: DetectState,
    pub(super) blob: BlobStream,
    pub(super) driver: Option<GpsDriver>,
}

impl<U: UartInterface> GpsInstance<U> {
    fn new(index: u8, port: Option<U>) -> Self {
        Self {
            port,
            state: GpsState::new(index),
            timing: GpsTiming::default(),
            detect: DetectState::new(),
            blob: BlobStream::idle(),
            driver: None,
        }
    }

    /// Fix state record
    pub fn state(&self) -> &GpsState {
        &self.state
    }

    /// Message timing record
    pub fn timing(&self) -> &GpsTiming {
        &self.timing
    }

    /// Protocol of the owned driver, if any
    pub fn protocol(&self) -> Option<GpsProtocol> {
        self.driver.as_ref().map(GpsDriver::protocol)
    }

    fn tick(&mut self, selector: GpsType, params: &GpsParams, now_ms: u64) {
        if selector == GpsType::None {
            self.state.status = GpsStatus::NoGps;
            self.release();
            return;
        }

        if self.driver.is_none() || self.state.status == GpsStatus::NoGps {
            self.detect_step(selector, params, now_ms);
        } else {
            self.poll(now_ms);
        }
    }

    /// Drop the driver and any detection progress
    ///
    /// The next enabled tick starts a new detection episode from scratch.
    pub(super) fn release(&mut self) {
        if let Some(driver) = self.driver.take() {
            crate::log_info!(
                "GPS {}: disabled, released {:?} driver",
                self.state.instance,
                driver.protocol()
            );
        }
        self.detect = DetectState::new();
        self.blob = BlobStream::idle();
    }

    fn detect_step(&mut self, selector: GpsType, params: &GpsParams, now_ms: u64) {
        let Some(port) = self.port.as_mut() else {
            return;
        };

        self.state.status = GpsStatus::NoGps;

        let Some(protocol) = self.detect.step(port, &mut self.blob, selector, now_ms) else {
            return;
        };

        // Release before constructing so at most one driver exists
        self.driver = None;

        match GpsDriver::for_protocol(protocol, params) {
            Some(driver) => {
                crate::log_info!(
                    "GPS {}: detected {:?} at {} baud",
                    self.state.instance,
                    protocol,
                    self.detect.baud_rate()
                );
                self.driver = Some(driver);
                self.state.status = GpsStatus::NoFix;
                self.timing.last_message_time_ms = now_ms;
                self.detect = DetectState::new();
            }
            None => {
                crate::log_warn!("GPS {}: {:?} not supported in this build", self.state.instance, protocol);
            }
        }
    }

    fn poll(&mut self, now_ms: u64) {
        let (Some(port), Some(driver)) = (self.port.as_mut(), self.driver.as_mut()) else {
            return;
        };

        self.blob.advance(port);
        if self.blob.is_idle() {
            driver.configure(port);
        }

        if driver.read(port, &mut self.state, now_ms) {
            self.timing.last_message_time_ms = now_ms;
            if self.state.status >= GpsStatus::Fix2D {
                self.timing.last_fix_time_ms = now_ms;
            }
        } else if now_ms.saturating_sub(self.timing.last_message_time_ms) > STALE_MS {
            crate::log_warn!(
                "GPS {}: no data for {} ms, restarting detection",
                self.state.instance,
                now_ms.saturating_sub(self.timing.last_message_time_ms)
            );
            self.state.status = GpsStatus::NoGps;
            self.timing.last_message_time_ms = now_ms;
            self.driver = None;
        }
    }
}

/// GPS front end: detection, driver lifecycle, status publication
///
/// # Example
///
/// ```ignore
/// use trail_gps::core::parameters::GpsParams;
/// use trail_gps::devices::gps::GpsManager;
///
/// let mut gps = GpsManager::new(GpsParams::default(), [Some(uart0), None], time);
/// gps.init();
/// loop {
///     gps.update();
///     // wait 100 ms
/// }
/// ```
pub struct GpsManager<U: UartInterface, T: TimeSource> {
    pub(super) instances: [GpsInstance<U>; GPS_MAX_INSTANCES],
    pub(super) params: GpsParams,
    pub(super) time: T,
    notify: &'static NotifyFlags,
}

impl<U: UartInterface, T: TimeSource> GpsManager<U, T> {
    /// Create a manager for the given ports, publishing to the global [`NOTIFY`]
    pub fn new(params: GpsParams, ports: [Option<U>; GPS_MAX_INSTANCES], time: T) -> Self {
        let mut index = 0u8;
        let instances = ports.map(|port| {
            let instance = GpsInstance::new(index, port);
            index += 1;
            instance
        });

        Self {
            instances,
            params,
            time,
            notify: &NOTIFY,
        }
    }

    /// Publish status to `notify` instead of the global flags
    pub fn with_notify(mut self, notify: &'static NotifyFlags) -> Self {
        self.notify = notify;
        self
    }

    /// Open every present port at the initial baud rate
    pub fn init(&mut self) {
        for (index, instance) in self.instances.iter_mut().enumerate() {
            if let Some(port) = instance.port.as_mut() {
                if let Err(e) = port.set_baud_rate(INITIAL_BAUD) {
                    crate::log_warn!("GPS {}: failed to open port: {}", index, e);
                }
            }
        }
        crate::log_info!("GPS: initialized, {} instance(s) enabled", self.enabled_count());
    }

    /// Tick every instance in index order, then publish instance 0's status
    pub fn update(&mut self) {
        for index in 0..GPS_MAX_INSTANCES {
            self.update_instance(index);
        }
        self.notify.set_gps_status(self.instances[0].state.status);
    }

    /// Tick one instance; out-of-range indices are ignored
    pub fn update_instance(&mut self, instance: usize) {
        let now_ms = self.time.now_ms();
        let Some(selector) = self.params.gps_type.get(instance).copied() else {
            return;
        };
        let params = self.params;
        if let Some(inst) = self.instances.get_mut(instance) {
            inst.tick(selector, &params, now_ms);
        }
    }

    /// Live parameter block
    pub fn params(&self) -> &GpsParams {
        &self.params
    }

    /// Replace the live parameter block
    ///
    /// Takes effect on the next tick. Setting an instance's selector to
    /// `None` releases its driver on that tick.
    pub fn set_params(&mut self, params: GpsParams) {
        self.params = params;
    }

    /// Time source used for all timestamps
    pub fn time(&self) -> &T {
        &self.time
    }

    /// Port of `instance`, if one is attached
    pub fn port_mut(&mut self, instance: usize) -> Option<&mut U> {
        self.instances.get_mut(instance)?.port.as_mut()
    }

    /// Instance record
    pub fn instance(&self, instance: usize) -> Option<&GpsInstance<U>> {
        self.instances.get(instance)
    }

    /// Fix state of `instance`
    pub fn state(&self, instance: usize) -> Option<&GpsState> {
        self.instance(instance).map(GpsInstance::state)
    }

    /// Fix status of `instance`, `NoGps` for unknown instances
    pub fn status(&self, instance: usize) -> GpsStatus {
        self.state(instance).map(|s| s.status).unwrap_or_default()
    }

    pub fn location(&self, instance: usize) -> Option<Location> {
        self.state(instance).map(|s| s.location)
    }

    /// NED velocity in m/s
    pub fn velocity(&self, instance: usize) -> Option<Vector3<f32>> {
        self.state(instance).map(|s| s.velocity)
    }

    /// Ground speed in m/s
    pub fn ground_speed(&self, instance: usize) -> Option<f32> {
        self.state(instance).map(|s| s.ground_speed)
    }

    /// Course over ground in centidegrees
    pub fn ground_course_cd(&self, instance: usize) -> Option<i32> {
        self.state(instance).map(|s| s.ground_course_cd)
    }

    pub fn num_sats(&self, instance: usize) -> Option<u8> {
        self.state(instance).map(|s| s.num_sats)
    }

    pub fn hdop(&self, instance: usize) -> Option<u16> {
        self.state(instance).map(|s| s.hdop)
    }

    pub fn time_week(&self, instance: usize) -> Option<u16> {
        self.state(instance).map(|s| s.time_week)
    }

    pub fn time_week_ms(&self, instance: usize) -> Option<u32> {
        self.state(instance).map(|s| s.time_week_ms)
    }

    pub fn have_vertical_velocity(&self, instance: usize) -> bool {
        self.state(instance).map(|s| s.have_vertical_velocity).unwrap_or(false)
    }

    /// System time of the last parsed message
    pub fn last_message_time_ms(&self, instance: usize) -> Option<u64> {
        self.instance(instance).map(|i| i.timing.last_message_time_ms)
    }

    /// System time of the last message carrying a 2D or better fix
    pub fn last_fix_time_ms(&self, instance: usize) -> Option<u64> {
        self.instance(instance).map(|i| i.timing.last_fix_time_ms)
    }

    /// Protocol of the driver owned by `instance`
    pub fn protocol(&self, instance: usize) -> Option<GpsProtocol> {
        self.instance(instance).and_then(GpsInstance::protocol)
    }

    /// Baud rate being tried while `instance` is detecting
    pub fn detect_baud(&self, instance: usize) -> Option<u32> {
        self.instance(instance)
            .filter(|i| i.driver.is_none())
            .map(|i| i.detect.baud_rate())
    }

    /// Number of instances with a receiver talking
    pub fn num_sensors(&self) -> usize {
        self.instances
            .iter()
            .filter(|i| i.state.status > GpsStatus::NoGps)
            .count()
    }

    fn enabled_count(&self) -> usize {
        self.params
            .gps_type
            .iter()
            .zip(self.instances.iter())
            .filter(|(t, i)| **t != GpsType::None && i.port.is_some())
            .count()
    }
}
