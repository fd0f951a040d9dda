//! The native call surface as a trait, one method per SDK entry point.
//!
//! Methods keep the C shape (status return, out-parameters) so that the
//! session layer is the only place that maps statuses to errors.

pub mod native;
pub mod sim;

use crate::ffi::{
    SenselDeviceList, SenselFirmwareInfo, SenselFrameData, SenselHandle, SenselSensorInfo,
    SenselStatus,
};
use std::ffi::CStr;

/// A provider of the Sensel SDK calls.
///
/// # Safety
///
/// Implementors must uphold the SDK's memory contract: a frame buffer handed
/// out by `allocate_frame_data` stays valid until `free_frame_data`, and after
/// every successful `get_frame` each non-null array pointer in it points to at
/// least `max_contacts` contacts, `rows * cols` forces and labels, and one
/// accel record, as reported by `get_sensor_info` for that handle.
///
/// Callers of the `unsafe` methods must pass a handle obtained from
/// one of the `open_device_by_*` calls on the same library that has not been closed yet, and
/// only frame buffers allocated for that handle.
pub unsafe trait SensorLibrary: Send + Sync + 'static {
    fn get_device_list(&self, list: &mut SenselDeviceList) -> SenselStatus;
    fn open_device_by_id(&self, handle: &mut SenselHandle, idx: u8) -> SenselStatus;
    fn open_device_by_serial_num(&self, handle: &mut SenselHandle, serial: &CStr)
        -> SenselStatus;
    fn open_device_by_com_port(&self, handle: &mut SenselHandle, com_port: &CStr)
        -> SenselStatus;

    unsafe fn close(&self, handle: SenselHandle) -> SenselStatus;
    unsafe fn soft_reset(&self, handle: SenselHandle) -> SenselStatus;
    unsafe fn get_sensor_info(
        &self,
        handle: SenselHandle,
        info: &mut SenselSensorInfo,
    ) -> SenselStatus;
    unsafe fn get_firmware_info(
        &self,
        handle: SenselHandle,
        info: &mut SenselFirmwareInfo,
    ) -> SenselStatus;

    unsafe fn allocate_frame_data(
        &self,
        handle: SenselHandle,
        data: &mut *mut SenselFrameData,
    ) -> SenselStatus;
    unsafe fn free_frame_data(
        &self,
        handle: SenselHandle,
        data: *mut SenselFrameData,
    ) -> SenselStatus;

    unsafe fn set_scan_detail(&self, handle: SenselHandle, detail: i32) -> SenselStatus;
    unsafe fn get_scan_detail(&self, handle: SenselHandle, detail: &mut i32) -> SenselStatus;
    unsafe fn get_supported_frame_content(
        &self,
        handle: SenselHandle,
        content: &mut u8,
    ) -> SenselStatus;
    unsafe fn set_frame_content(&self, handle: SenselHandle, content: u8) -> SenselStatus;
    unsafe fn get_frame_content(&self, handle: SenselHandle, content: &mut u8) -> SenselStatus;
    unsafe fn set_contacts_mask(&self, handle: SenselHandle, mask: u8) -> SenselStatus;
    unsafe fn get_contacts_mask(&self, handle: SenselHandle, mask: &mut u8) -> SenselStatus;
    unsafe fn set_contacts_min_force(&self, handle: SenselHandle, force: u16) -> SenselStatus;
    unsafe fn get_contacts_min_force(&self, handle: SenselHandle, force: &mut u16)
        -> SenselStatus;
    unsafe fn set_max_frame_rate(&self, handle: SenselHandle, rate: u16) -> SenselStatus;
    unsafe fn get_max_frame_rate(&self, handle: SenselHandle, rate: &mut u16) -> SenselStatus;
    unsafe fn set_dynamic_baseline_enabled(&self, handle: SenselHandle, val: u8)
        -> SenselStatus;
    unsafe fn get_dynamic_baseline_enabled(&self, handle: SenselHandle, val: &mut u8)
        -> SenselStatus;

    unsafe fn start_scanning(&self, handle: SenselHandle) -> SenselStatus;
    unsafe fn stop_scanning(&self, handle: SenselHandle) -> SenselStatus;
    unsafe fn read_sensor(&self, handle: SenselHandle) -> SenselStatus;
    unsafe fn get_num_available_frames(
        &self,
        handle: SenselHandle,
        num_frames: &mut u32,
    ) -> SenselStatus;
    unsafe fn get_frame(&self, handle: SenselHandle, data: *mut SenselFrameData)
        -> SenselStatus;

    unsafe fn get_num_available_leds(&self, handle: SenselHandle, num: &mut u8)
        -> SenselStatus;
    unsafe fn get_max_led_brightness(
        &self,
        handle: SenselHandle,
        max: &mut u16,
    ) -> SenselStatus;
    unsafe fn set_led_brightness(
        &self,
        handle: SenselHandle,
        led_id: u8,
        brightness: u16,
    ) -> SenselStatus;
    unsafe fn get_led_brightness(
        &self,
        handle: SenselHandle,
        led_id: u8,
        brightness: &mut u16,
    ) -> SenselStatus;
    unsafe fn get_power_button_pressed(
        &self,
        handle: SenselHandle,
        pressed: &mut u8,
    ) -> SenselStatus;
}
