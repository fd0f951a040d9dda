//! One open device and its scan loop.
//!
//! ```text
//! Closed --open--> Open --start--> Scanning --stop--> Open --close--> Closed
//! ```
//!
//! A `Session` is `Send` but not `Sync`: it can be moved to an acquisition
//! thread, and every call on it is serialized by the borrow checker.

use crate::backend::SensorLibrary;
use crate::config::ScanConfig;
use crate::decoder::FrameDecoder;
use crate::device::{DeviceSelector, FirmwareInfo, ScanDetail, SensorGeometry};
use crate::error::{check, Error, Result};
use crate::ffi::{
    SenselFirmwareInfo, SenselFrameData, SenselHandle, SenselSensorInfo, SenselStatus,
    SENSEL_ERROR, SENSEL_OK,
};
use crate::frame::{ContactMask, Frame, FrameContent};
use std::ffi::CString;
use std::ptr::{self, NonNull};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    Scanning,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Closed => write!(f, "closed"),
            SessionState::Open => write!(f, "open"),
            SessionState::Scanning => write!(f, "scanning"),
        }
    }
}

const OPEN: &[SessionState] = &[SessionState::Open];
const SCANNING: &[SessionState] = &[SessionState::Scanning];
const HANDLE_HELD: &[SessionState] = &[SessionState::Open, SessionState::Scanning];

/// The frame buffer the native library allocated for this handle. Only the
/// session touches it; decoded data always leaves as an owned [`Frame`].
struct NativeFrameBuffer(NonNull<SenselFrameData>);

struct OpenDevice {
    selector: DeviceSelector,
    handle: SenselHandle,
    buffer: NativeFrameBuffer,
    decoder: FrameDecoder,
    /// Frame content was set since open or the last soft reset.
    configured: bool,
}

pub struct Session<L: SensorLibrary> {
    lib: Arc<L>,
    state: SessionState,
    device: Option<OpenDevice>,
}

// The handle and frame buffer belong to this session alone and LibSensel does
// not tie handles to the thread that opened them.
unsafe impl<L: SensorLibrary> Send for Session<L> {}

impl<L: SensorLibrary> Session<L> {
    pub fn new(lib: Arc<L>) -> Self {
        Self {
            lib,
            state: SessionState::Closed,
            device: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// How the open device was picked, if the session is open.
    pub fn device(&self) -> Option<&DeviceSelector> {
        self.device.as_ref().map(|d| &d.selector)
    }

    /// Index the session was opened with, if it was opened by index.
    pub fn device_index(&self) -> Option<u8> {
        match self.device()? {
            DeviceSelector::Index(index) => Some(*index),
            _ => None,
        }
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> Result<&OpenDevice> {
        if !allowed.contains(&self.state) {
            return Err(Error::InvalidState {
                operation,
                state: self.state,
            });
        }
        self.device.as_ref().ok_or(Error::InvalidState {
            operation,
            state: self.state,
        })
    }

    /// Run one native call against the open handle. `native` names the SDK
    /// entry point for the error.
    fn call<F>(
        &self,
        operation: &'static str,
        allowed: &[SessionState],
        native: &'static str,
        f: F,
    ) -> Result<()>
    where
        F: FnOnce(&L, SenselHandle) -> SenselStatus,
    {
        let device = self.require(operation, allowed)?;
        check(f(&self.lib, device.handle), |status| {
            Error::hardware(native, status)
        })
    }

    /// Open the device at `index` of the last enumeration.
    pub fn open(&mut self, index: u8) -> Result<()> {
        self.open_with(DeviceSelector::Index(index))
    }

    pub fn open_by_serial(&mut self, serial: &str) -> Result<()> {
        self.open_with(DeviceSelector::Serial(serial.to_string()))
    }

    pub fn open_by_com_port(&mut self, com_port: &str) -> Result<()> {
        self.open_with(DeviceSelector::ComPort(com_port.to_string()))
    }

    pub fn open_with(&mut self, selector: DeviceSelector) -> Result<()> {
        if self.state != SessionState::Closed {
            return Err(Error::InvalidState {
                operation: "open",
                state: self.state,
            });
        }

        let mut handle: SenselHandle = ptr::null_mut();
        let status = match &selector {
            DeviceSelector::Index(index) => self.lib.open_device_by_id(&mut handle, *index),
            DeviceSelector::Serial(serial) => match CString::new(serial.as_str()) {
                Ok(name) => self.lib.open_device_by_serial_num(&mut handle, &name),
                Err(_) => SENSEL_ERROR,
            },
            DeviceSelector::ComPort(port) => match CString::new(port.as_str()) {
                Ok(name) => self.lib.open_device_by_com_port(&mut handle, &name),
                Err(_) => SENSEL_ERROR,
            },
        };
        if status != SENSEL_OK || handle.is_null() {
            return Err(Error::DeviceOpenFailed {
                device: selector,
                status: if status == SENSEL_OK { SENSEL_ERROR } else { status },
            });
        }

        match self.prepare(handle, &selector) {
            Ok(device) => {
                tracing::debug!(
                    device = %selector,
                    rows = device.decoder.geometry().rows,
                    cols = device.decoder.geometry().cols,
                    "session open"
                );
                self.device = Some(device);
                self.state = SessionState::Open;
                Ok(())
            }
            Err(e) => {
                // `handle` was just opened and is not stored anywhere else.
                let status = unsafe { self.lib.close(handle) };
                if status != SENSEL_OK {
                    tracing::warn!(device = %selector, status, "close after failed open");
                }
                Err(e)
            }
        }
    }

    fn prepare(&self, handle: SenselHandle, selector: &DeviceSelector) -> Result<OpenDevice> {
        let open_failed = |status| Error::DeviceOpenFailed {
            device: selector.clone(),
            status,
        };

        let mut info = SenselSensorInfo::default();
        check(
            unsafe { self.lib.get_sensor_info(handle, &mut info) },
            open_failed,
        )?;

        let mut data: *mut SenselFrameData = ptr::null_mut();
        check(
            unsafe { self.lib.allocate_frame_data(handle, &mut data) },
            open_failed,
        )?;
        let buffer = NonNull::new(data).ok_or_else(|| open_failed(SENSEL_ERROR))?;

        Ok(OpenDevice {
            selector: selector.clone(),
            handle,
            buffer: NativeFrameBuffer(buffer),
            decoder: FrameDecoder::new(SensorGeometry::from(info)),
            configured: false,
        })
    }

    pub fn geometry(&self) -> Result<SensorGeometry> {
        let device = self.require("geometry", HANDLE_HELD)?;
        Ok(*device.decoder.geometry())
    }

    /// Select what each frame carries. Must be set before `start`.
    pub fn set_frame_content(&mut self, content: FrameContent) -> Result<()> {
        self.call("set_frame_content", OPEN, "senselSetFrameContent", |lib, h| unsafe {
            lib.set_frame_content(h, content.bits())
        })?;
        if let Some(device) = self.device.as_mut() {
            device.configured = true;
        }
        tracing::debug!(content = content.bits(), "frame content set");
        Ok(())
    }

    /// The content the device currently delivers, as it reports it.
    pub fn frame_content(&self) -> Result<FrameContent> {
        let mut content = 0u8;
        self.call("frame_content", HANDLE_HELD, "senselGetFrameContent", |lib, h| unsafe {
            lib.get_frame_content(h, &mut content)
        })?;
        Ok(FrameContent::from_bits_truncate(content))
    }

    pub fn supported_frame_content(&self) -> Result<FrameContent> {
        let mut content = 0u8;
        self.call(
            "supported_frame_content",
            HANDLE_HELD,
            "senselGetSupportedFrameContent",
            |lib, h| unsafe { lib.get_supported_frame_content(h, &mut content) },
        )?;
        Ok(FrameContent::from_bits_truncate(content))
    }

    /// Apply a whole [`ScanConfig`] in one go.
    ///
    /// Not atomic: settings are applied in field order, and a failure partway
    /// leaves the earlier ones in effect on the device.
    pub fn configure(&mut self, config: &ScanConfig) -> Result<()> {
        self.require("configure", OPEN)?;
        self.set_frame_content(config.content)?;
        if let Some(detail) = config.scan_detail {
            self.set_scan_detail(detail)?;
        }
        if let Some(mask) = config.contacts_mask {
            self.set_contacts_mask(mask)?;
        }
        if let Some(force) = config.contacts_min_force {
            self.set_contacts_min_force(force)?;
        }
        if let Some(rate) = config.max_frame_rate {
            self.set_max_frame_rate(rate)?;
        }
        Ok(())
    }

    /// Begin scanning. Frame content must have been set first, with
    /// [`Session::set_frame_content`] or [`Session::configure`].
    pub fn start(&mut self) -> Result<()> {
        if !self.require("start", OPEN)?.configured {
            return Err(Error::InvalidState {
                operation: "start",
                state: self.state,
            });
        }
        self.call("start", OPEN, "senselStartScanning", |lib, h| unsafe {
            lib.start_scanning(h)
        })?;
        self.state = SessionState::Scanning;
        tracing::debug!("scanning started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.call("stop", SCANNING, "senselStopScanning", |lib, h| unsafe {
            lib.stop_scanning(h)
        })?;
        self.state = SessionState::Open;
        tracing::debug!("scanning stopped");
        Ok(())
    }

    /// Pull whatever the hardware has sent into the native frame queue.
    pub fn read_sensor(&mut self) -> Result<()> {
        self.call("read_sensor", SCANNING, "senselReadSensor", |lib, h| unsafe {
            lib.read_sensor(h)
        })
    }

    pub fn available_frame_count(&self) -> Result<u32> {
        let mut count = 0u32;
        self.call(
            "available_frame_count",
            SCANNING,
            "senselGetNumAvailableFrames",
            |lib, h| unsafe { lib.get_num_available_frames(h, &mut count) },
        )?;
        Ok(count)
    }

    /// Pop and decode one buffered frame.
    pub fn get_frame(&mut self) -> Result<Frame> {
        let mut frame = Frame::default();
        self.get_frame_into(&mut frame)?;
        Ok(frame)
    }

    /// Like [`Session::get_frame`] but reuses `frame`'s allocations. On error
    /// `frame` is unchanged.
    pub fn get_frame_into(&mut self, frame: &mut Frame) -> Result<()> {
        self.require("get_frame", SCANNING)?;
        if self.available_frame_count()? == 0 {
            return Err(Error::NoFrameAvailable);
        }
        let device = self.require("get_frame", SCANNING)?;
        let data = device.buffer.0.as_ptr();
        check(
            unsafe { self.lib.get_frame(device.handle, data) },
            |status| Error::hardware("senselGetFrame", status),
        )?;
        // The buffer was allocated for this handle and just refilled;
        // `SensorLibrary` guarantees its arrays match the sensor info.
        unsafe { device.decoder.decode_into(device.buffer.0.as_ref(), frame) }
    }

    /// Read the sensor once and decode every frame that became available.
    /// Corrupt frames are logged and skipped.
    pub fn frames(&mut self) -> Result<Vec<Frame>> {
        self.read_sensor()?;
        let count = self.available_frame_count()?;
        let mut frames = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match self.get_frame() {
                Ok(frame) => frames.push(frame),
                Err(Error::CorruptFrame(reason)) => {
                    tracing::warn!("skipping corrupt frame: {}", reason);
                }
                Err(Error::NoFrameAvailable) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(frames)
    }

    pub fn led_count(&self) -> Result<u8> {
        let mut count = 0u8;
        self.call("led_count", HANDLE_HELD, "senselGetNumAvailableLEDs", |lib, h| unsafe {
            lib.get_num_available_leds(h, &mut count)
        })?;
        Ok(count)
    }

    pub fn max_led_brightness(&self) -> Result<u16> {
        let mut max = 0u16;
        self.call(
            "max_led_brightness",
            HANDLE_HELD,
            "senselGetMaxLEDBrightness",
            |lib, h| unsafe { lib.get_max_led_brightness(h, &mut max) },
        )?;
        Ok(max)
    }

    pub fn set_led_brightness(&mut self, led: u8, brightness: u16) -> Result<()> {
        self.call(
            "set_led_brightness",
            HANDLE_HELD,
            "senselSetLEDBrightness",
            |lib, h| unsafe { lib.set_led_brightness(h, led, brightness) },
        )
    }

    pub fn led_brightness(&self, led: u8) -> Result<u16> {
        let mut brightness = 0u16;
        self.call(
            "led_brightness",
            HANDLE_HELD,
            "senselGetLEDBrightness",
            |lib, h| unsafe { lib.get_led_brightness(h, led, &mut brightness) },
        )?;
        Ok(brightness)
    }

    pub fn firmware_info(&self) -> Result<FirmwareInfo> {
        let mut info = SenselFirmwareInfo::default();
        self.call("firmware_info", HANDLE_HELD, "senselGetFirmwareInfo", |lib, h| unsafe {
            lib.get_firmware_info(h, &mut info)
        })?;
        Ok(info.into())
    }

    pub fn scan_detail(&self) -> Result<ScanDetail> {
        let mut detail = 0i32;
        self.call("scan_detail", HANDLE_HELD, "senselGetScanDetail", |lib, h| unsafe {
            lib.get_scan_detail(h, &mut detail)
        })?;
        Ok(ScanDetail::from_raw(detail))
    }

    /// `ScanDetail::Unknown` is refused without reaching the device.
    pub fn set_scan_detail(&mut self, detail: ScanDetail) -> Result<()> {
        if detail == ScanDetail::Unknown {
            self.require("set_scan_detail", OPEN)?;
            return Err(Error::hardware("senselSetScanDetail", SENSEL_ERROR));
        }
        self.call("set_scan_detail", OPEN, "senselSetScanDetail", |lib, h| unsafe {
            lib.set_scan_detail(h, detail.as_raw())
        })
    }

    pub fn set_contacts_mask(&mut self, mask: ContactMask) -> Result<()> {
        self.call("set_contacts_mask", OPEN, "senselSetContactsMask", |lib, h| unsafe {
            lib.set_contacts_mask(h, mask.bits())
        })
    }

    pub fn contacts_mask(&self) -> Result<ContactMask> {
        let mut mask = 0u8;
        self.call("contacts_mask", HANDLE_HELD, "senselGetContactsMask", |lib, h| unsafe {
            lib.get_contacts_mask(h, &mut mask)
        })?;
        Ok(ContactMask::from_bits_truncate(mask))
    }

    /// Force a touch must reach before it is reported as a contact.
    pub fn set_contacts_min_force(&mut self, force: u16) -> Result<()> {
        self.call(
            "set_contacts_min_force",
            HANDLE_HELD,
            "senselSetContactsMinForce",
            |lib, h| unsafe { lib.set_contacts_min_force(h, force) },
        )
    }

    pub fn contacts_min_force(&self) -> Result<u16> {
        let mut force = 0u16;
        self.call(
            "contacts_min_force",
            HANDLE_HELD,
            "senselGetContactsMinForce",
            |lib, h| unsafe { lib.get_contacts_min_force(h, &mut force) },
        )?;
        Ok(force)
    }

    pub fn max_frame_rate(&self) -> Result<u16> {
        let mut rate = 0u16;
        self.call("max_frame_rate", HANDLE_HELD, "senselGetMaxFrameRate", |lib, h| unsafe {
            lib.get_max_frame_rate(h, &mut rate)
        })?;
        Ok(rate)
    }

    pub fn set_max_frame_rate(&mut self, rate: u16) -> Result<()> {
        self.call(
            "set_max_frame_rate",
            HANDLE_HELD,
            "senselSetMaxFrameRate",
            |lib, h| unsafe { lib.set_max_frame_rate(h, rate) },
        )
    }

    pub fn set_dynamic_baseline(&mut self, enabled: bool) -> Result<()> {
        self.call(
            "set_dynamic_baseline",
            HANDLE_HELD,
            "senselSetDynamicBaselineEnabled",
            |lib, h| unsafe { lib.set_dynamic_baseline_enabled(h, u8::from(enabled)) },
        )
    }

    pub fn dynamic_baseline(&self) -> Result<bool> {
        let mut enabled = 0u8;
        self.call(
            "dynamic_baseline",
            HANDLE_HELD,
            "senselGetDynamicBaselineEnabled",
            |lib, h| unsafe { lib.get_dynamic_baseline_enabled(h, &mut enabled) },
        )?;
        Ok(enabled != 0)
    }

    pub fn power_button_pressed(&self) -> Result<bool> {
        let mut pressed = 0u8;
        self.call(
            "power_button_pressed",
            HANDLE_HELD,
            "senselGetPowerButtonPressed",
            |lib, h| unsafe { lib.get_power_button_pressed(h, &mut pressed) },
        )?;
        Ok(pressed != 0)
    }

    /// Reset the device to its power-on settings. Frame content has to be set
    /// again before the next `start`.
    pub fn soft_reset(&mut self) -> Result<()> {
        self.call("soft_reset", OPEN, "senselSoftReset", |lib, h| unsafe {
            lib.soft_reset(h)
        })?;
        if let Some(device) = self.device.as_mut() {
            device.configured = false;
        }
        Ok(())
    }

    /// Stop scanning if needed, free the frame buffer and close the handle.
    /// The session is closed afterwards even if a native call failed; the
    /// first failure is returned.
    pub fn close(&mut self) -> Result<()> {
        self.require("close", HANDLE_HELD)?;
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        let Some(device) = self.device.take() else {
            return Ok(());
        };
        let was_scanning = self.state == SessionState::Scanning;
        self.state = SessionState::Closed;

        let mut first_error = None;
        let mut record = |call: &'static str, status: SenselStatus| {
            if status != SENSEL_OK {
                tracing::warn!(device = %device.selector, status, "{} failed during close", call);
                if first_error.is_none() {
                    first_error = Some(Error::hardware(call, status));
                }
            }
        };

        // `device` was taken out of the session, so nothing can use the
        // handle or buffer after these calls.
        unsafe {
            if was_scanning {
                record("senselStopScanning", self.lib.stop_scanning(device.handle));
            }
            record(
                "senselFreeFrameData",
                self.lib
                    .free_frame_data(device.handle, device.buffer.0.as_ptr()),
            );
            record("senselClose", self.lib.close(device.handle));
        }
        tracing::debug!(device = %device.selector, "session closed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<L: SensorLibrary> Drop for Session<L> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!("dropping session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sim::{SimDevice, SimFrame, SimulatedLibrary, MORPH_GEOMETRY};

    fn session() -> (Arc<SimulatedLibrary>, Session<SimulatedLibrary>) {
        let lib = Arc::new(SimulatedLibrary::new(vec![SimDevice::new(
            "SM01",
            "/dev/ttyACM0",
            MORPH_GEOMETRY,
        )]));
        (lib.clone(), Session::new(lib))
    }

    #[test]
    fn new_session_is_closed() {
        let (_, session) = session();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.device_index().is_none());
        assert!(matches!(
            session.geometry(),
            Err(Error::InvalidState {
                operation: "geometry",
                state: SessionState::Closed
            })
        ));
    }

    #[test]
    fn open_fetches_geometry() {
        let (_, mut session) = session();
        session.open(0).unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(session.geometry().unwrap(), MORPH_GEOMETRY);
        assert_eq!(session.device_index(), Some(0));
    }

    #[test]
    fn open_twice_is_invalid_state() {
        let (_, mut session) = session();
        session.open(0).unwrap();
        assert!(matches!(
            session.open(0),
            Err(Error::InvalidState {
                operation: "open",
                ..
            })
        ));
    }

    #[test]
    fn open_bad_index_fails() {
        let (_, mut session) = session();
        assert!(matches!(
            session.open(3),
            Err(Error::DeviceOpenFailed {
                device: DeviceSelector::Index(3),
                ..
            })
        ));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn failed_sensor_info_releases_handle() {
        let (lib, mut session) = session();
        lib.fail_next("senselGetSensorInfo", -1);
        assert!(matches!(
            session.open(0),
            Err(Error::DeviceOpenFailed {
                device: DeviceSelector::Index(0),
                status: -1
            })
        ));
        assert_eq!(lib.open_handles(), 0);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn open_by_serial_and_port() {
        let (lib, mut session) = session();
        session.open_by_serial("SM01").unwrap();
        assert_eq!(session.device(), Some(&DeviceSelector::Serial("SM01".into())));
        assert_eq!(session.device_index(), None);
        assert_eq!(session.geometry().unwrap(), MORPH_GEOMETRY);
        session.close().unwrap();

        session.open_by_com_port("/dev/ttyACM0").unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(lib.open_handles(), 1);
        assert_eq!(
            lib.calls()[..2],
            ["senselOpenDeviceBySerialNum", "senselGetSensorInfo"]
        );
    }

    #[test]
    fn open_by_unknown_serial_fails() {
        let (_, mut session) = session();
        assert!(matches!(
            session.open_by_serial("SM99"),
            Err(Error::DeviceOpenFailed {
                device: DeviceSelector::Serial(_),
                status: SENSEL_ERROR
            })
        ));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn serial_with_interior_nul_never_reaches_library() {
        let (lib, mut session) = session();
        assert!(matches!(
            session.open_by_serial("SM\001"),
            Err(Error::DeviceOpenFailed { .. })
        ));
        assert!(lib.calls().is_empty());
    }

    #[test]
    fn start_before_configure_is_invalid_state() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        assert!(matches!(
            session.start(),
            Err(Error::InvalidState {
                operation: "start",
                state: SessionState::Open
            })
        ));
        assert!(!lib.calls().contains(&"senselStartScanning"));
        session.configure(&ScanConfig::contacts()).unwrap();
        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Scanning);
    }

    #[test]
    fn frame_content_only_settable_before_start() {
        let (_, mut session) = session();
        session.open(0).unwrap();
        session.set_frame_content(FrameContent::CONTACTS).unwrap();
        assert_eq!(session.frame_content().unwrap(), FrameContent::CONTACTS);
        session.start().unwrap();
        assert!(matches!(
            session.set_frame_content(FrameContent::PRESSURE),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn start_and_stop_transitions() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        assert!(session.stop().is_err());
        session.set_frame_content(FrameContent::CONTACTS).unwrap();
        session.start().unwrap();
        assert!(lib.is_scanning(0));
        assert!(matches!(
            session.start(),
            Err(Error::InvalidState {
                state: SessionState::Scanning,
                ..
            })
        ));
        session.stop().unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert!(!lib.is_scanning(0));
    }

    #[test]
    fn failed_start_stays_open() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        session.set_frame_content(FrameContent::CONTACTS).unwrap();
        lib.fail_next("senselStartScanning", -2);
        assert!(matches!(
            session.start(),
            Err(Error::HardwareUnavailable {
                call: "senselStartScanning",
                status: -2
            })
        ));
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn get_frame_without_frames_is_no_frame_available() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        session.set_frame_content(FrameContent::CONTACTS).unwrap();
        session.start().unwrap();
        session.read_sensor().unwrap();
        assert_eq!(session.available_frame_count().unwrap(), 0);
        assert!(matches!(session.get_frame(), Err(Error::NoFrameAvailable)));
        assert!(!lib.calls().contains(&"senselGetFrame"));
    }

    #[test]
    fn frames_drains_queue() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        session.set_frame_content(FrameContent::PRESSURE).unwrap();
        session.start().unwrap();
        for i in 0..3 {
            lib.push_frame(
                0,
                SimFrame {
                    lost_frame_count: i,
                    force: vec![1.0; MORPH_GEOMETRY.cell_count()],
                    ..Default::default()
                },
            );
        }
        let frames = session.frames().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].lost_frame_count, 2);
        assert_eq!(frames[0].total_force(), MORPH_GEOMETRY.cell_count() as f32);
        assert_eq!(session.available_frame_count().unwrap(), 0);
    }

    #[test]
    fn configure_applies_every_field() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        session
            .configure(&ScanConfig::everything().scan_detail(ScanDetail::Low).max_frame_rate(60))
            .unwrap();
        assert_eq!(session.scan_detail().unwrap(), ScanDetail::Low);
        assert_eq!(session.max_frame_rate().unwrap(), 60);
        let calls = lib.calls();
        assert!(calls.contains(&"senselSetFrameContent"));
        assert!(calls.contains(&"senselSetContactsMask"));
    }

    #[test]
    fn settings_read_back_from_device() {
        let (_, mut session) = session();
        session.open(0).unwrap();
        assert_eq!(session.contacts_mask().unwrap(), ContactMask::all());
        assert!(session.dynamic_baseline().unwrap());
        assert_eq!(session.contacts_min_force().unwrap(), 0);

        session
            .configure(&ScanConfig::contacts().contacts_min_force(25))
            .unwrap();
        session.set_contacts_mask(ContactMask::ELLIPSE).unwrap();
        session.set_dynamic_baseline(false).unwrap();
        assert_eq!(session.frame_content().unwrap(), FrameContent::CONTACTS);
        assert_eq!(session.contacts_mask().unwrap(), ContactMask::ELLIPSE);
        assert!(!session.dynamic_baseline().unwrap());
        assert_eq!(session.contacts_min_force().unwrap(), 25);
    }

    #[test]
    fn unknown_scan_detail_is_refused() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        assert!(matches!(
            session.set_scan_detail(ScanDetail::Unknown),
            Err(Error::HardwareUnavailable {
                call: "senselSetScanDetail",
                status: SENSEL_ERROR
            })
        ));
        assert!(!lib.calls().contains(&"senselSetScanDetail"));
        assert_eq!(session.scan_detail().unwrap(), ScanDetail::High);
    }

    #[test]
    fn configure_failure_keeps_earlier_settings() {
        let (_, mut session) = session();
        session.open(0).unwrap();
        let config = ScanConfig::pressure()
            .scan_detail(ScanDetail::Unknown)
            .max_frame_rate(30);
        assert!(session.configure(&config).is_err());
        assert_eq!(session.frame_content().unwrap(), FrameContent::PRESSURE);
        assert_eq!(session.max_frame_rate().unwrap(), 125);
    }

    #[test]
    fn frames_skips_corrupt_frame() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        session.configure(&ScanConfig::contacts()).unwrap();
        session.start().unwrap();
        let mut bad = SimFrame::default();
        bad.n_contacts_override = Some(MORPH_GEOMETRY.max_contacts + 1);
        lib.push_frame(0, SimFrame::default());
        lib.push_frame(0, bad);
        lib.push_frame(0, SimFrame::default());
        assert_eq!(session.frames().unwrap().len(), 2);
        assert_eq!(session.state(), SessionState::Scanning);
    }

    #[test]
    fn led_pass_through() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        assert_eq!(session.led_count().unwrap(), 16);
        assert_eq!(session.max_led_brightness().unwrap(), 100);
        session.set_led_brightness(3, 80).unwrap();
        assert_eq!(session.led_brightness(3).unwrap(), 80);
        assert_eq!(lib.led_brightness(0, 3), Some(80));
        assert!(matches!(
            session.set_led_brightness(40, 1),
            Err(Error::HardwareUnavailable {
                call: "senselSetLEDBrightness",
                ..
            })
        ));
    }

    #[test]
    fn close_while_scanning_releases_everything() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        session.set_frame_content(FrameContent::CONTACTS).unwrap();
        session.start().unwrap();
        session.close().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(lib.open_handles(), 0);
        assert_eq!(lib.allocated_buffers(), 0);
        let calls = lib.calls();
        let tail = &calls[calls.len() - 3..];
        assert_eq!(
            tail,
            &["senselStopScanning", "senselFreeFrameData", "senselClose"]
        );
    }

    #[test]
    fn every_call_after_close_is_invalid_state() {
        let (_, mut session) = session();
        session.open(0).unwrap();
        session.close().unwrap();
        assert!(matches!(session.close(), Err(Error::InvalidState { .. })));
        assert!(matches!(session.start(), Err(Error::InvalidState { .. })));
        assert!(matches!(session.led_count(), Err(Error::InvalidState { .. })));
        assert!(matches!(
            session.set_led_brightness(0, 0),
            Err(Error::InvalidState { .. })
        ));
        assert!(matches!(session.get_frame(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn close_reports_native_failure_but_still_closes() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        lib.fail_next("senselFreeFrameData", -4);
        assert!(matches!(
            session.close(),
            Err(Error::HardwareUnavailable {
                call: "senselFreeFrameData",
                status: -4
            })
        ));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(lib.open_handles(), 0);
    }

    #[test]
    fn drop_releases_handle() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        session.set_frame_content(FrameContent::CONTACTS).unwrap();
        session.start().unwrap();
        drop(session);
        assert_eq!(lib.open_handles(), 0);
        assert_eq!(lib.allocated_buffers(), 0);
    }

    #[test]
    fn soft_reset_only_when_not_scanning() {
        let (_, mut session) = session();
        session.open(0).unwrap();
        session.soft_reset().unwrap();
        session.set_frame_content(FrameContent::CONTACTS).unwrap();
        session.start().unwrap();
        assert!(session.soft_reset().is_err());
    }

    #[test]
    fn soft_reset_requires_content_again() {
        let (_, mut session) = session();
        session.open(0).unwrap();
        session.set_frame_content(FrameContent::PRESSURE).unwrap();
        session.soft_reset().unwrap();
        assert_eq!(session.frame_content().unwrap(), FrameContent::empty());
        assert!(matches!(
            session.start(),
            Err(Error::InvalidState {
                operation: "start",
                state: SessionState::Open
            })
        ));
        session.set_frame_content(FrameContent::PRESSURE).unwrap();
        session.start().unwrap();
    }

    #[test]
    fn tuning_calls_allowed_while_scanning() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        session.set_frame_content(FrameContent::CONTACTS).unwrap();
        session.start().unwrap();
        session.set_dynamic_baseline(false).unwrap();
        session.set_max_frame_rate(30).unwrap();
        assert_eq!(session.max_frame_rate().unwrap(), 30);
        assert!(lib.calls().contains(&"senselSetDynamicBaselineEnabled"));
        assert_eq!(session.firmware_info().unwrap().to_string(), "0.19.212");
    }

    #[test]
    fn power_button_state() {
        let (lib, mut session) = session();
        session.open(0).unwrap();
        assert!(!session.power_button_pressed().unwrap());
        lib.set_power_button(0, true);
        assert!(session.power_button_pressed().unwrap());
    }

    #[test]
    fn session_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Session<SimulatedLibrary>>();
    }
}
