//! In-process stand-in for LibSensel.
//!
//! Honors the same contract as the native library: frame buffers are sized
//! from the sensor info at allocation, `read_sensor` moves pending hardware
//! frames into the available queue, `get_frame` pops one into the caller's
//! buffer. Any call can be made to fail once with [`SimulatedLibrary::fail_next`].

use super::SensorLibrary;
use crate::device::{FirmwareInfo, SensorGeometry};
use crate::ffi::{
    self, SenselAccelData, SenselContact, SenselDeviceList, SenselFirmwareInfo, SenselFrameData,
    SenselHandle, SenselSensorInfo, SenselStatus, SENSEL_ERROR, SENSEL_OK,
};
use crate::frame::{Contact, ContactMask, ContactState, FrameContent};
use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;
use std::sync::{Mutex, MutexGuard};

/// Entries kept by the call log; older ones are dropped first.
pub const CALL_LOG_CAP: usize = 4096;

/// Geometry of a Sensel Morph.
pub const MORPH_GEOMETRY: SensorGeometry = SensorGeometry {
    max_contacts: 16,
    rows: 105,
    cols: 185,
    width_mm: 240.0,
    height_mm: 139.0,
};

/// One frame as the hardware would deliver it, before the content mask is
/// applied.
#[derive(Clone, Debug, Default)]
pub struct SimFrame {
    pub lost_frame_count: i32,
    pub contacts: Vec<SenselContact>,
    pub force: Vec<f32>,
    pub labels: Vec<u8>,
    pub accel: SenselAccelData,
    /// Header contact count to report instead of `contacts.len()`.
    pub n_contacts_override: Option<u8>,
}

impl SimFrame {
    pub fn with_contacts<I: IntoIterator<Item = Contact>>(contacts: I) -> Self {
        Self {
            contacts: contacts.into_iter().map(|c| c.to_raw()).collect(),
            ..Default::default()
        }
    }
}

type FrameGenerator = Box<dyn FnMut(u64, &SensorGeometry) -> SimFrame + Send>;

pub struct SimDevice {
    pub serial: String,
    pub com_port: String,
    pub geometry: SensorGeometry,
    pub firmware: FirmwareInfo,
    pub supported_content: FrameContent,
    pub max_led_brightness: u16,
    pub power_button_pressed: bool,
    leds: Vec<u16>,
    content: u8,
    contacts_mask: u8,
    contacts_min_force: u16,
    scan_detail: i32,
    max_frame_rate: u16,
    dynamic_baseline: bool,
    scanning: bool,
    pending: VecDeque<SimFrame>,
    available: VecDeque<SimFrame>,
    generator: Option<FrameGenerator>,
    tick: u64,
}

impl SimDevice {
    pub fn new(serial: &str, com_port: &str, geometry: SensorGeometry) -> Self {
        Self {
            serial: serial.to_string(),
            com_port: com_port.to_string(),
            geometry,
            firmware: FirmwareInfo {
                protocol_version: 1,
                version_major: 0,
                version_minor: 19,
                version_build: 212,
                version_release: 0,
                device_id: 1,
                device_revision: 0,
            },
            supported_content: FrameContent::all(),
            max_led_brightness: 100,
            power_button_pressed: false,
            leds: vec![0; geometry.max_contacts as usize],
            content: 0,
            contacts_mask: ContactMask::all().bits(),
            contacts_min_force: 0,
            scan_detail: ffi::SCAN_DETAIL_HIGH,
            max_frame_rate: 125,
            dynamic_baseline: true,
            scanning: false,
            pending: VecDeque::new(),
            available: VecDeque::new(),
            generator: None,
            tick: 0,
        }
    }

    pub fn with_led_count(mut self, count: usize) -> Self {
        self.leds = vec![0; count];
        self
    }

    /// Produce one frame on every `read_sensor` while scanning.
    pub fn with_generator<F>(mut self, generator: F) -> Self
    where
        F: FnMut(u64, &SensorGeometry) -> SimFrame + Send + 'static,
    {
        self.generator = Some(Box::new(generator));
        self
    }
}

/// A frame buffer with the native layout whose arrays live in Rust vectors.
///
/// Allocated on the heap so that the header address stays put while the
/// session holds a pointer to it.
pub struct SimFrameBuffer {
    header: SenselFrameData,
    contacts: Vec<SenselContact>,
    force: Vec<f32>,
    labels: Vec<u8>,
    accel: Box<SenselAccelData>,
}

// The raw pointers in `header` only ever point into the buffer's own vectors.
unsafe impl Send for SimFrameBuffer {}

impl SimFrameBuffer {
    pub fn new(geometry: &SensorGeometry) -> Box<Self> {
        let cells = geometry.cell_count();
        let mut buffer = Box::new(Self {
            header: SenselFrameData::default(),
            contacts: vec![SenselContact::default(); geometry.max_contacts as usize],
            force: vec![0.0; cells],
            labels: vec![0; cells],
            accel: Box::default(),
        });
        buffer.relink();
        buffer
    }

    fn relink(&mut self) {
        self.header.contacts = self.contacts.as_mut_ptr();
        self.header.force_array = self.force.as_mut_ptr();
        self.header.labels_array = self.labels.as_mut_ptr();
        self.header.accel_data = &mut *self.accel as *mut SenselAccelData;
    }

    /// Copy `frame` in, keeping only the categories in `content`.
    pub fn fill(&mut self, content: FrameContent, frame: &SimFrame) {
        self.header.content_bit_mask = content.bits();
        self.header.lost_frame_count = frame.lost_frame_count;
        self.header.n_contacts = 0;

        if content.contains(FrameContent::CONTACTS) {
            let n = frame.contacts.len().min(self.contacts.len());
            self.contacts[..n].copy_from_slice(&frame.contacts[..n]);
            self.header.n_contacts = frame
                .n_contacts_override
                .unwrap_or(frame.contacts.len().min(u8::MAX as usize) as u8);
        }
        if content.contains(FrameContent::PRESSURE) {
            copy_padded(&mut self.force, &frame.force, 0.0);
        }
        if content.contains(FrameContent::LABELS) {
            copy_padded(&mut self.labels, &frame.labels, 0);
        }
        if content.contains(FrameContent::ACCEL) {
            *self.accel = frame.accel;
        }
        self.relink();
    }

    pub fn header(&self) -> &SenselFrameData {
        &self.header
    }

    /// Direct header access, for producing malformed buffers.
    pub fn header_mut(&mut self) -> &mut SenselFrameData {
        &mut self.header
    }
}

fn copy_padded<T: Copy>(dst: &mut [T], src: &[T], pad: T) {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    dst[n..].fill(pad);
}

struct BufferPtr(*mut SimFrameBuffer);

// Owned exclusively by the simulator state, which is behind a mutex.
unsafe impl Send for BufferPtr {}

#[derive(Default)]
struct SimState {
    devices: Vec<SimDevice>,
    handles: HashMap<usize, usize>,
    buffers: HashMap<usize, BufferPtr>,
    next_handle: usize,
    failures: HashMap<&'static str, SenselStatus>,
    calls: VecDeque<&'static str>,
    reported_count: Option<u8>,
}

impl SimState {
    fn enter(&mut self, call: &'static str) -> Option<SenselStatus> {
        if self.calls.len() == CALL_LOG_CAP {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
        self.failures.remove(call)
    }

    /// Hand out a handle for the first device `matches` accepts, unless it
    /// is already open.
    fn open_matching<F>(
        &mut self,
        call: &'static str,
        handle: &mut SenselHandle,
        matches: F,
    ) -> SenselStatus
    where
        F: Fn(usize, &SimDevice) -> bool,
    {
        if let Some(status) = self.enter(call) {
            return status;
        }
        let Some(index) = self
            .devices
            .iter()
            .enumerate()
            .position(|(i, device)| matches(i, device))
        else {
            return SENSEL_ERROR;
        };
        if self.handles.values().any(|&d| d == index) {
            return SENSEL_ERROR;
        }
        self.next_handle += 1;
        let id = self.next_handle;
        self.handles.insert(id, index);
        *handle = id as SenselHandle;
        SENSEL_OK
    }

    fn device_mut(&mut self, handle: SenselHandle) -> Option<&mut SimDevice> {
        let index = *self.handles.get(&(handle as usize))?;
        self.devices.get_mut(index)
    }
}

impl Drop for SimState {
    fn drop(&mut self) {
        for (_, BufferPtr(ptr)) in self.buffers.drain() {
            // Allocated by `Box::into_raw` in `allocate_frame_data`.
            drop(unsafe { Box::from_raw(ptr) });
        }
    }
}

#[derive(Default)]
pub struct SimulatedLibrary {
    state: Mutex<SimState>,
}

impl SimulatedLibrary {
    pub fn new(devices: Vec<SimDevice>) -> Self {
        let mut state = SimState::default();
        state.devices = devices;
        Self {
            state: Mutex::new(state),
        }
    }

    /// Devices that animate a pair of touches over a Morph-sized surface.
    pub fn demo(count: u8) -> Self {
        let devices = (0..count)
            .map(|i| {
                SimDevice::new(
                    &format!("SMSIM{:03}", i),
                    &format!("/dev/ttySIM{}", i),
                    MORPH_GEOMETRY,
                )
                .with_generator(move |tick, geometry| {
                    demo_frame(tick + u64::from(i) * 97, geometry)
                })
            })
            .collect();
        Self::new(devices)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A test that panicked mid-call leaves consistent state behind.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next call to `call` (the SDK symbol name) return `status`.
    pub fn fail_next(&self, call: &'static str, status: SenselStatus) {
        self.lock().failures.insert(call, status);
    }

    /// Queue a frame on the device; it becomes available on the next
    /// `read_sensor`.
    pub fn push_frame(&self, device: usize, frame: SimFrame) {
        if let Some(dev) = self.lock().devices.get_mut(device) {
            dev.pending.push_back(frame);
        }
    }

    /// Report `count` devices from enumeration regardless of how many exist,
    /// like a library that overruns its own device list.
    pub fn report_device_count(&self, count: u8) {
        self.lock().reported_count = Some(count);
    }

    pub fn set_power_button(&self, device: usize, pressed: bool) {
        if let Some(dev) = self.lock().devices.get_mut(device) {
            dev.power_button_pressed = pressed;
        }
    }

    /// SDK symbol names in call order, the most recent [`CALL_LOG_CAP`] of
    /// them.
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.iter().copied().collect()
    }

    pub fn open_handles(&self) -> usize {
        self.lock().handles.len()
    }

    pub fn allocated_buffers(&self) -> usize {
        self.lock().buffers.len()
    }

    pub fn is_scanning(&self, device: usize) -> bool {
        self.lock()
            .devices
            .get(device)
            .map(|d| d.scanning)
            .unwrap_or(false)
    }

    pub fn led_brightness(&self, device: usize, led: usize) -> Option<u16> {
        self.lock().devices.get(device)?.leds.get(led).copied()
    }

    fn with_device<F>(&self, call: &'static str, handle: SenselHandle, f: F) -> SenselStatus
    where
        F: FnOnce(&mut SimDevice) -> SenselStatus,
    {
        let mut state = self.lock();
        if let Some(status) = state.enter(call) {
            return status;
        }
        match state.device_mut(handle) {
            Some(device) => f(device),
            None => SENSEL_ERROR,
        }
    }
}

fn copy_id(dst: &mut [u8; ffi::SENSEL_ID_LEN], src: &str) {
    let bytes = src.as_bytes();
    // Leave room for the terminator.
    let n = bytes.len().min(ffi::SENSEL_ID_LEN - 1);
    dst[..n].copy_from_slice(&bytes[..n]);
    dst[n..].fill(0);
}

unsafe impl SensorLibrary for SimulatedLibrary {
    fn get_device_list(&self, list: &mut SenselDeviceList) -> SenselStatus {
        let mut state = self.lock();
        if let Some(status) = state.enter("senselGetDeviceList") {
            return status;
        }
        let count = state.devices.len().min(ffi::SENSEL_MAX_DEVICES);
        list.num_devices = state.reported_count.unwrap_or(count as u8);
        for (i, device) in state.devices.iter().take(count).enumerate() {
            let entry = &mut list.devices[i];
            entry.idx = i as u8;
            copy_id(&mut entry.serial_num, &device.serial);
            copy_id(&mut entry.com_port, &device.com_port);
        }
        SENSEL_OK
    }

    fn open_device_by_id(&self, handle: &mut SenselHandle, idx: u8) -> SenselStatus {
        self.lock()
            .open_matching("senselOpenDeviceByID", handle, |i, _| i == idx as usize)
    }

    fn open_device_by_serial_num(
        &self,
        handle: &mut SenselHandle,
        serial: &CStr,
    ) -> SenselStatus {
        let serial = serial.to_bytes();
        self.lock()
            .open_matching("senselOpenDeviceBySerialNum", handle, |_, device| {
                device.serial.as_bytes() == serial
            })
    }

    fn open_device_by_com_port(
        &self,
        handle: &mut SenselHandle,
        com_port: &CStr,
    ) -> SenselStatus {
        let com_port = com_port.to_bytes();
        self.lock()
            .open_matching("senselOpenDeviceByComPort", handle, |_, device| {
                device.com_port.as_bytes() == com_port
            })
    }

    unsafe fn close(&self, handle: SenselHandle) -> SenselStatus {
        let mut state = self.lock();
        if let Some(status) = state.enter("senselClose") {
            return status;
        }
        match state.handles.remove(&(handle as usize)) {
            Some(index) => {
                if let Some(device) = state.devices.get_mut(index) {
                    device.scanning = false;
                }
                SENSEL_OK
            }
            None => SENSEL_ERROR,
        }
    }

    unsafe fn soft_reset(&self, handle: SenselHandle) -> SenselStatus {
        self.with_device("senselSoftReset", handle, |device| {
            device.pending.clear();
            device.available.clear();
            device.leds.fill(0);
            device.content = 0;
            device.contacts_mask = ContactMask::all().bits();
            device.contacts_min_force = 0;
            device.dynamic_baseline = true;
            SENSEL_OK
        })
    }

    unsafe fn get_sensor_info(
        &self,
        handle: SenselHandle,
        info: &mut SenselSensorInfo,
    ) -> SenselStatus {
        self.with_device("senselGetSensorInfo", handle, |device| {
            *info = device.geometry.into();
            SENSEL_OK
        })
    }

    unsafe fn get_firmware_info(
        &self,
        handle: SenselHandle,
        info: &mut SenselFirmwareInfo,
    ) -> SenselStatus {
        self.with_device("senselGetFirmwareInfo", handle, |device| {
            let fw = device.firmware;
            *info = SenselFirmwareInfo {
                fw_protocol_version: fw.protocol_version,
                fw_version_major: fw.version_major,
                fw_version_minor: fw.version_minor,
                fw_version_build: fw.version_build,
                fw_version_release: fw.version_release,
                device_id: fw.device_id,
                device_revision: fw.device_revision,
            };
            SENSEL_OK
        })
    }

    unsafe fn allocate_frame_data(
        &self,
        handle: SenselHandle,
        data: &mut *mut SenselFrameData,
    ) -> SenselStatus {
        let mut state = self.lock();
        *data = std::ptr::null_mut();
        if let Some(status) = state.enter("senselAllocateFrameData") {
            return status;
        }
        let Some(geometry) = state.device_mut(handle).map(|d| d.geometry) else {
            return SENSEL_ERROR;
        };
        let buffer = Box::into_raw(SimFrameBuffer::new(&geometry));
        // `header` is the first field the session sees; keyed by its address.
        let header = unsafe { std::ptr::addr_of_mut!((*buffer).header) };
        state.buffers.insert(header as usize, BufferPtr(buffer));
        *data = header;
        SENSEL_OK
    }

    unsafe fn free_frame_data(
        &self,
        _handle: SenselHandle,
        data: *mut SenselFrameData,
    ) -> SenselStatus {
        let mut state = self.lock();
        if let Some(status) = state.enter("senselFreeFrameData") {
            return status;
        }
        match state.buffers.remove(&(data as usize)) {
            Some(BufferPtr(ptr)) => {
                drop(Box::from_raw(ptr));
                SENSEL_OK
            }
            None => SENSEL_ERROR,
        }
    }

    unsafe fn set_scan_detail(&self, handle: SenselHandle, detail: i32) -> SenselStatus {
        self.with_device("senselSetScanDetail", handle, |device| {
            if !(ffi::SCAN_DETAIL_HIGH..=ffi::SCAN_DETAIL_LOW).contains(&detail) {
                return SENSEL_ERROR;
            }
            device.scan_detail = detail;
            SENSEL_OK
        })
    }

    unsafe fn get_scan_detail(&self, handle: SenselHandle, detail: &mut i32) -> SenselStatus {
        self.with_device("senselGetScanDetail", handle, |device| {
            *detail = device.scan_detail;
            SENSEL_OK
        })
    }

    unsafe fn get_supported_frame_content(
        &self,
        handle: SenselHandle,
        content: &mut u8,
    ) -> SenselStatus {
        self.with_device("senselGetSupportedFrameContent", handle, |device| {
            *content = device.supported_content.bits();
            SENSEL_OK
        })
    }

    unsafe fn set_frame_content(&self, handle: SenselHandle, content: u8) -> SenselStatus {
        self.with_device("senselSetFrameContent", handle, |device| {
            if content & !device.supported_content.bits() != 0 {
                return SENSEL_ERROR;
            }
            device.content = content;
            SENSEL_OK
        })
    }

    unsafe fn get_frame_content(&self, handle: SenselHandle, content: &mut u8) -> SenselStatus {
        self.with_device("senselGetFrameContent", handle, |device| {
            *content = device.content;
            SENSEL_OK
        })
    }

    unsafe fn set_contacts_mask(&self, handle: SenselHandle, mask: u8) -> SenselStatus {
        self.with_device("senselSetContactsMask", handle, |device| {
            device.contacts_mask = mask;
            SENSEL_OK
        })
    }

    unsafe fn get_contacts_mask(&self, handle: SenselHandle, mask: &mut u8) -> SenselStatus {
        self.with_device("senselGetContactsMask", handle, |device| {
            *mask = device.contacts_mask;
            SENSEL_OK
        })
    }

    unsafe fn set_contacts_min_force(&self, handle: SenselHandle, force: u16) -> SenselStatus {
        self.with_device("senselSetContactsMinForce", handle, |device| {
            device.contacts_min_force = force;
            SENSEL_OK
        })
    }

    unsafe fn get_contacts_min_force(
        &self,
        handle: SenselHandle,
        force: &mut u16,
    ) -> SenselStatus {
        self.with_device("senselGetContactsMinForce", handle, |device| {
            *force = device.contacts_min_force;
            SENSEL_OK
        })
    }

    unsafe fn set_max_frame_rate(&self, handle: SenselHandle, rate: u16) -> SenselStatus {
        self.with_device("senselSetMaxFrameRate", handle, |device| {
            device.max_frame_rate = rate;
            SENSEL_OK
        })
    }

    unsafe fn get_max_frame_rate(&self, handle: SenselHandle, rate: &mut u16) -> SenselStatus {
        self.with_device("senselGetMaxFrameRate", handle, |device| {
            *rate = device.max_frame_rate;
            SENSEL_OK
        })
    }

    unsafe fn set_dynamic_baseline_enabled(
        &self,
        handle: SenselHandle,
        val: u8,
    ) -> SenselStatus {
        self.with_device("senselSetDynamicBaselineEnabled", handle, |device| {
            device.dynamic_baseline = val != 0;
            SENSEL_OK
        })
    }

    unsafe fn get_dynamic_baseline_enabled(
        &self,
        handle: SenselHandle,
        val: &mut u8,
    ) -> SenselStatus {
        self.with_device("senselGetDynamicBaselineEnabled", handle, |device| {
            *val = u8::from(device.dynamic_baseline);
            SENSEL_OK
        })
    }

    unsafe fn start_scanning(&self, handle: SenselHandle) -> SenselStatus {
        self.with_device("senselStartScanning", handle, |device| {
            device.scanning = true;
            SENSEL_OK
        })
    }

    unsafe fn stop_scanning(&self, handle: SenselHandle) -> SenselStatus {
        self.with_device("senselStopScanning", handle, |device| {
            device.scanning = false;
            device.available.clear();
            SENSEL_OK
        })
    }

    unsafe fn read_sensor(&self, handle: SenselHandle) -> SenselStatus {
        self.with_device("senselReadSensor", handle, |device| {
            if !device.scanning {
                return SENSEL_ERROR;
            }
            let geometry = device.geometry;
            if let Some(generator) = device.generator.as_mut() {
                let frame = generator(device.tick, &geometry);
                device.tick += 1;
                device.pending.push_back(frame);
            }
            let pending: Vec<SimFrame> = device.pending.drain(..).collect();
            device.available.extend(pending);
            SENSEL_OK
        })
    }

    unsafe fn get_num_available_frames(
        &self,
        handle: SenselHandle,
        num_frames: &mut u32,
    ) -> SenselStatus {
        self.with_device("senselGetNumAvailableFrames", handle, |device| {
            *num_frames = device.available.len() as u32;
            SENSEL_OK
        })
    }

    unsafe fn get_frame(&self, handle: SenselHandle, data: *mut SenselFrameData) -> SenselStatus {
        let mut state = self.lock();
        if let Some(status) = state.enter("senselGetFrame") {
            return status;
        }
        let Some(buffer) = state.buffers.get(&(data as usize)).map(|b| b.0) else {
            return SENSEL_ERROR;
        };
        let Some(device) = state.device_mut(handle) else {
            return SENSEL_ERROR;
        };
        let Some(frame) = device.available.pop_front() else {
            return SENSEL_ERROR;
        };
        let content = FrameContent::from_bits_truncate(device.content);
        // Live until `free_frame_data`; the state lock serializes access.
        let buffer = &mut *buffer;
        buffer.fill(content, &frame);
        SENSEL_OK
    }

    unsafe fn get_num_available_leds(&self, handle: SenselHandle, num: &mut u8) -> SenselStatus {
        self.with_device("senselGetNumAvailableLEDs", handle, |device| {
            *num = device.leds.len().min(u8::MAX as usize) as u8;
            SENSEL_OK
        })
    }

    unsafe fn get_max_led_brightness(&self, handle: SenselHandle, max: &mut u16) -> SenselStatus {
        self.with_device("senselGetMaxLEDBrightness", handle, |device| {
            *max = device.max_led_brightness;
            SENSEL_OK
        })
    }

    unsafe fn set_led_brightness(
        &self,
        handle: SenselHandle,
        led_id: u8,
        brightness: u16,
    ) -> SenselStatus {
        self.with_device("senselSetLEDBrightness", handle, |device| {
            let max = device.max_led_brightness;
            match device.leds.get_mut(led_id as usize) {
                Some(led) if brightness <= max => {
                    *led = brightness;
                    SENSEL_OK
                }
                _ => SENSEL_ERROR,
            }
        })
    }

    unsafe fn get_led_brightness(
        &self,
        handle: SenselHandle,
        led_id: u8,
        brightness: &mut u16,
    ) -> SenselStatus {
        self.with_device("senselGetLEDBrightness", handle, |device| {
            match device.leds.get(led_id as usize) {
                Some(&value) => {
                    *brightness = value;
                    SENSEL_OK
                }
                None => SENSEL_ERROR,
            }
        })
    }

    unsafe fn get_power_button_pressed(
        &self,
        handle: SenselHandle,
        pressed: &mut u8,
    ) -> SenselStatus {
        self.with_device("senselGetPowerButtonPressed", handle, |device| {
            *pressed = u8::from(device.power_button_pressed);
            SENSEL_OK
        })
    }
}

const DEMO_TOUCH_TICKS: u64 = 240;
const DEMO_IDLE_TICKS: u64 = 40;

/// Two touches orbiting the center of the surface, lifting off and landing
/// again every few seconds, with a matching force and label image.
fn demo_frame(tick: u64, geometry: &SensorGeometry) -> SimFrame {
    let period = DEMO_TOUCH_TICKS + DEMO_IDLE_TICKS;
    let phase = tick % period;
    let mut frame = SimFrame {
        force: vec![0.0; geometry.cell_count()],
        labels: vec![0; geometry.cell_count()],
        accel: SenselAccelData {
            x: 0,
            y: 0,
            z: 1024,
        },
        ..Default::default()
    };

    if phase >= DEMO_TOUCH_TICKS {
        return frame;
    }

    let state = match phase {
        0 => ContactState::Start,
        p if p == DEMO_TOUCH_TICKS - 1 => ContactState::End,
        _ => ContactState::Move,
    };
    let t = phase as f32 / DEMO_TOUCH_TICKS as f32 * std::f32::consts::TAU;
    let cx = geometry.width_mm / 2.0;
    let cy = geometry.height_mm / 2.0;
    let cell_w = geometry.width_mm / geometry.cols.max(1) as f32;
    let cell_h = geometry.height_mm / geometry.rows.max(1) as f32;

    for (id, offset) in [(0u8, 0.0f32), (1u8, std::f32::consts::PI)] {
        let angle = t + offset;
        let x = cx + angle.cos() * geometry.width_mm * 0.3;
        let y = cy + angle.sin() * geometry.height_mm * 0.3;
        let force = 150.0 + 100.0 * (t * 2.0).sin().abs();
        let radius = 8.0f32;

        let col0 = ((x - radius) / cell_w).max(0.0) as usize;
        let col1 = (((x + radius) / cell_w) as usize).min(geometry.cols as usize);
        let row0 = ((y - radius) / cell_h).max(0.0) as usize;
        let row1 = (((y + radius) / cell_h) as usize).min(geometry.rows as usize);
        let mut area = 0.0;
        for row in row0..row1 {
            for col in col0..col1 {
                let dx = (col as f32 + 0.5) * cell_w - x;
                let dy = (row as f32 + 0.5) * cell_h - y;
                let d2 = (dx * dx + dy * dy) / (radius * radius);
                if d2 < 1.0 {
                    let cell = row * geometry.cols as usize + col;
                    frame.force[cell] += force * (1.0 - d2) / 40.0;
                    frame.labels[cell] = id + 1;
                    area += 1.0;
                }
            }
        }

        frame.contacts.push(
            Contact {
                id,
                state,
                content: ContactMask::ELLIPSE | ContactMask::PEAK,
                x,
                y,
                total_force: force,
                area,
                orientation: angle.to_degrees() % 180.0,
                major_axis: radius * 1.4,
                minor_axis: radius,
                peak_x: x,
                peak_y: y,
                peak_force: force / 40.0,
                ..Default::default()
            }
            .to_raw(),
        );
    }
    frame
}
