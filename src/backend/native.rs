use super::SensorLibrary;
use crate::error::{Error, Result};
use crate::ffi::{
    SenselDeviceList, SenselFirmwareInfo, SenselFrameData, SenselHandle, SenselSensorInfo,
    SenselStatus, SENSEL_ERROR,
};
use libloading::Library;
use std::ffi::CStr;
use std::path::{Path, PathBuf};

// WINAPI in sensel.h: stdcall on 32-bit Windows, the C convention elsewhere.
type FnGetDeviceList = unsafe extern "system" fn(*mut SenselDeviceList) -> SenselStatus;
type FnOpenDeviceById = unsafe extern "system" fn(*mut SenselHandle, u8) -> SenselStatus;
type FnOpenDeviceByName = unsafe extern "system" fn(*mut SenselHandle, *mut u8) -> SenselStatus;
type FnHandle = unsafe extern "system" fn(SenselHandle) -> SenselStatus;
type FnSensorInfo = unsafe extern "system" fn(SenselHandle, *mut SenselSensorInfo) -> SenselStatus;
type FnFirmwareInfo =
    unsafe extern "system" fn(SenselHandle, *mut SenselFirmwareInfo) -> SenselStatus;
type FnAllocateFrame =
    unsafe extern "system" fn(SenselHandle, *mut *mut SenselFrameData) -> SenselStatus;
type FnFrame = unsafe extern "system" fn(SenselHandle, *mut SenselFrameData) -> SenselStatus;
type FnSetU8 = unsafe extern "system" fn(SenselHandle, u8) -> SenselStatus;
type FnGetU8 = unsafe extern "system" fn(SenselHandle, *mut u8) -> SenselStatus;
type FnSetU16 = unsafe extern "system" fn(SenselHandle, u16) -> SenselStatus;
type FnGetU16 = unsafe extern "system" fn(SenselHandle, *mut u16) -> SenselStatus;
type FnSetI32 = unsafe extern "system" fn(SenselHandle, i32) -> SenselStatus;
type FnGetI32 = unsafe extern "system" fn(SenselHandle, *mut i32) -> SenselStatus;
type FnGetU32 = unsafe extern "system" fn(SenselHandle, *mut u32) -> SenselStatus;
type FnSetLed = unsafe extern "system" fn(SenselHandle, u8, u16) -> SenselStatus;
type FnGetLed = unsafe extern "system" fn(SenselHandle, u8, *mut u16) -> SenselStatus;

/// Where the SDK installers put the shared library.
pub fn default_library_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if cfg!(target_os = "windows") {
        let arch = if cfg!(target_pointer_width = "64") {
            "x64"
        } else {
            "x86"
        };
        paths.push(PathBuf::from(format!(
            "C:\\Program Files\\Sensel\\SenselLib\\{}\\LibSensel.dll",
            arch
        )));
        paths.push(PathBuf::from("LibSensel.dll"));
    } else if cfg!(target_os = "macos") {
        paths.push(PathBuf::from("/usr/local/lib/libSensel.dylib"));
        paths.push(PathBuf::from("libSensel.dylib"));
    } else {
        paths.push(PathBuf::from("/usr/lib/libsensel.so"));
        paths.push(PathBuf::from("libsensel.so"));
    }
    paths
}

struct Api {
    get_device_list: FnGetDeviceList,
    open_device_by_id: FnOpenDeviceById,
    open_device_by_serial_num: FnOpenDeviceByName,
    open_device_by_com_port: FnOpenDeviceByName,
    close: FnHandle,
    soft_reset: FnHandle,
    get_sensor_info: FnSensorInfo,
    get_firmware_info: FnFirmwareInfo,
    allocate_frame_data: FnAllocateFrame,
    free_frame_data: FnFrame,
    set_scan_detail: FnSetI32,
    get_scan_detail: FnGetI32,
    get_supported_frame_content: FnGetU8,
    set_frame_content: FnSetU8,
    get_frame_content: FnGetU8,
    set_contacts_mask: FnSetU8,
    get_contacts_mask: FnGetU8,
    set_contacts_min_force: FnSetU16,
    get_contacts_min_force: FnGetU16,
    set_max_frame_rate: FnSetU16,
    get_max_frame_rate: FnGetU16,
    set_dynamic_baseline_enabled: FnSetU8,
    get_dynamic_baseline_enabled: FnGetU8,
    start_scanning: FnHandle,
    stop_scanning: FnHandle,
    read_sensor: FnHandle,
    get_num_available_frames: FnGetU32,
    get_frame: FnFrame,
    get_num_available_leds: FnGetU8,
    get_max_led_brightness: FnGetU16,
    set_led_brightness: FnSetLed,
    get_led_brightness: FnGetLed,
    get_power_button_pressed: FnGetU8,
}

/// `LibSensel` loaded at runtime.
pub struct NativeLibrary {
    api: Api,
    // Keeps the function pointers in `api` mapped.
    _library: Library,
    path: PathBuf,
}

impl NativeLibrary {
    /// Try each of [`default_library_paths`] in turn.
    pub fn load() -> Result<Self> {
        for path in default_library_paths() {
            match Self::load_from(&path) {
                Ok(lib) => return Ok(lib),
                Err(e) => tracing::debug!("{}: {}", path.display(), e),
            }
        }
        Err(Error::hardware("LoadLibrary", SENSEL_ERROR))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        // Loading runs the library's initializers; LibSensel has none beyond
        // the C runtime's.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            tracing::warn!("failed to load {}: {}", path.display(), e);
            Error::hardware("LoadLibrary", SENSEL_ERROR)
        })?;

        let api = Api {
            get_device_list: symbol(&library, "senselGetDeviceList")?,
            open_device_by_id: symbol(&library, "senselOpenDeviceByID")?,
            open_device_by_serial_num: symbol(&library, "senselOpenDeviceBySerialNum")?,
            open_device_by_com_port: symbol(&library, "senselOpenDeviceByComPort")?,
            close: symbol(&library, "senselClose")?,
            soft_reset: symbol(&library, "senselSoftReset")?,
            get_sensor_info: symbol(&library, "senselGetSensorInfo")?,
            get_firmware_info: symbol(&library, "senselGetFirmwareInfo")?,
            allocate_frame_data: symbol(&library, "senselAllocateFrameData")?,
            free_frame_data: symbol(&library, "senselFreeFrameData")?,
            set_scan_detail: symbol(&library, "senselSetScanDetail")?,
            get_scan_detail: symbol(&library, "senselGetScanDetail")?,
            get_supported_frame_content: symbol(&library, "senselGetSupportedFrameContent")?,
            set_frame_content: symbol(&library, "senselSetFrameContent")?,
            get_frame_content: symbol(&library, "senselGetFrameContent")?,
            set_contacts_mask: symbol(&library, "senselSetContactsMask")?,
            get_contacts_mask: symbol(&library, "senselGetContactsMask")?,
            set_contacts_min_force: symbol(&library, "senselSetContactsMinForce")?,
            get_contacts_min_force: symbol(&library, "senselGetContactsMinForce")?,
            set_max_frame_rate: symbol(&library, "senselSetMaxFrameRate")?,
            get_max_frame_rate: symbol(&library, "senselGetMaxFrameRate")?,
            set_dynamic_baseline_enabled: symbol(&library, "senselSetDynamicBaselineEnabled")?,
            get_dynamic_baseline_enabled: symbol(&library, "senselGetDynamicBaselineEnabled")?,
            start_scanning: symbol(&library, "senselStartScanning")?,
            stop_scanning: symbol(&library, "senselStopScanning")?,
            read_sensor: symbol(&library, "senselReadSensor")?,
            get_num_available_frames: symbol(&library, "senselGetNumAvailableFrames")?,
            get_frame: symbol(&library, "senselGetFrame")?,
            get_num_available_leds: symbol(&library, "senselGetNumAvailableLEDs")?,
            get_max_led_brightness: symbol(&library, "senselGetMaxLEDBrightness")?,
            set_led_brightness: symbol(&library, "senselSetLEDBrightness")?,
            get_led_brightness: symbol(&library, "senselGetLEDBrightness")?,
            get_power_button_pressed: symbol(&library, "senselGetPowerButtonPressed")?,
        };

        tracing::debug!("loaded {}", path.display());
        Ok(Self {
            api,
            _library: library,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    let mut c_name = Vec::with_capacity(name.len() + 1);
    c_name.extend_from_slice(name.as_bytes());
    c_name.push(0);
    // The caller picks `T` to match the prototype in sensel.h.
    let sym = unsafe { library.get::<T>(&c_name) }.map_err(|e| {
        tracing::warn!("missing symbol {}: {}", name, e);
        Error::hardware(name, SENSEL_ERROR)
    })?;
    Ok(*sym)
}

// Every entry point only touches memory handed to it by the caller or owned
// by the handle, and LibSensel keeps no state shared between handles.
unsafe impl SensorLibrary for NativeLibrary {
    fn get_device_list(&self, list: &mut SenselDeviceList) -> SenselStatus {
        unsafe { (self.api.get_device_list)(list) }
    }

    fn open_device_by_id(&self, handle: &mut SenselHandle, idx: u8) -> SenselStatus {
        unsafe { (self.api.open_device_by_id)(handle, idx) }
    }

    fn open_device_by_serial_num(
        &self,
        handle: &mut SenselHandle,
        serial: &CStr,
    ) -> SenselStatus {
        // Declared `unsigned char*` in sensel.h, so hand over a copy.
        let mut name = serial.to_bytes_with_nul().to_vec();
        unsafe { (self.api.open_device_by_serial_num)(handle, name.as_mut_ptr()) }
    }

    fn open_device_by_com_port(
        &self,
        handle: &mut SenselHandle,
        com_port: &CStr,
    ) -> SenselStatus {
        let mut name = com_port.to_bytes_with_nul().to_vec();
        unsafe { (self.api.open_device_by_com_port)(handle, name.as_mut_ptr()) }
    }

    unsafe fn close(&self, handle: SenselHandle) -> SenselStatus {
        (self.api.close)(handle)
    }

    unsafe fn soft_reset(&self, handle: SenselHandle) -> SenselStatus {
        (self.api.soft_reset)(handle)
    }

    unsafe fn get_sensor_info(
        &self,
        handle: SenselHandle,
        info: &mut SenselSensorInfo,
    ) -> SenselStatus {
        (self.api.get_sensor_info)(handle, info)
    }

    unsafe fn get_firmware_info(
        &self,
        handle: SenselHandle,
        info: &mut SenselFirmwareInfo,
    ) -> SenselStatus {
        (self.api.get_firmware_info)(handle, info)
    }

    unsafe fn allocate_frame_data(
        &self,
        handle: SenselHandle,
        data: &mut *mut SenselFrameData,
    ) -> SenselStatus {
        (self.api.allocate_frame_data)(handle, data)
    }

    unsafe fn free_frame_data(
        &self,
        handle: SenselHandle,
        data: *mut SenselFrameData,
    ) -> SenselStatus {
        (self.api.free_frame_data)(handle, data)
    }

    unsafe fn set_scan_detail(&self, handle: SenselHandle, detail: i32) -> SenselStatus {
        (self.api.set_scan_detail)(handle, detail)
    }

    unsafe fn get_scan_detail(&self, handle: SenselHandle, detail: &mut i32) -> SenselStatus {
        (self.api.get_scan_detail)(handle, detail)
    }

    unsafe fn get_supported_frame_content(
        &self,
        handle: SenselHandle,
        content: &mut u8,
    ) -> SenselStatus {
        (self.api.get_supported_frame_content)(handle, content)
    }

    unsafe fn set_frame_content(&self, handle: SenselHandle, content: u8) -> SenselStatus {
        (self.api.set_frame_content)(handle, content)
    }

    unsafe fn get_frame_content(&self, handle: SenselHandle, content: &mut u8) -> SenselStatus {
        (self.api.get_frame_content)(handle, content)
    }

    unsafe fn set_contacts_mask(&self, handle: SenselHandle, mask: u8) -> SenselStatus {
        (self.api.set_contacts_mask)(handle, mask)
    }

    unsafe fn get_contacts_mask(&self, handle: SenselHandle, mask: &mut u8) -> SenselStatus {
        (self.api.get_contacts_mask)(handle, mask)
    }

    unsafe fn set_contacts_min_force(&self, handle: SenselHandle, force: u16) -> SenselStatus {
        (self.api.set_contacts_min_force)(handle, force)
    }

    unsafe fn get_contacts_min_force(
        &self,
        handle: SenselHandle,
        force: &mut u16,
    ) -> SenselStatus {
        (self.api.get_contacts_min_force)(handle, force)
    }

    unsafe fn set_max_frame_rate(&self, handle: SenselHandle, rate: u16) -> SenselStatus {
        (self.api.set_max_frame_rate)(handle, rate)
    }

    unsafe fn get_max_frame_rate(&self, handle: SenselHandle, rate: &mut u16) -> SenselStatus {
        (self.api.get_max_frame_rate)(handle, rate)
    }

    unsafe fn set_dynamic_baseline_enabled(
        &self,
        handle: SenselHandle,
        val: u8,
    ) -> SenselStatus {
        (self.api.set_dynamic_baseline_enabled)(handle, val)
    }

    unsafe fn get_dynamic_baseline_enabled(
        &self,
        handle: SenselHandle,
        val: &mut u8,
    ) -> SenselStatus {
        (self.api.get_dynamic_baseline_enabled)(handle, val)
    }

    unsafe fn start_scanning(&self, handle: SenselHandle) -> SenselStatus {
        (self.api.start_scanning)(handle)
    }

    unsafe fn stop_scanning(&self, handle: SenselHandle) -> SenselStatus {
        (self.api.stop_scanning)(handle)
    }

    unsafe fn read_sensor(&self, handle: SenselHandle) -> SenselStatus {
        (self.api.read_sensor)(handle)
    }

    unsafe fn get_num_available_frames(
        &self,
        handle: SenselHandle,
        num_frames: &mut u32,
    ) -> SenselStatus {
        (self.api.get_num_available_frames)(handle, num_frames)
    }

    unsafe fn get_frame(&self, handle: SenselHandle, data: *mut SenselFrameData) -> SenselStatus {
        (self.api.get_frame)(handle, data)
    }

    unsafe fn get_num_available_leds(&self, handle: SenselHandle, num: &mut u8) -> SenselStatus {
        (self.api.get_num_available_leds)(handle, num)
    }

    unsafe fn get_max_led_brightness(&self, handle: SenselHandle, max: &mut u16) -> SenselStatus {
        (self.api.get_max_led_brightness)(handle, max)
    }

    unsafe fn set_led_brightness(
        &self,
        handle: SenselHandle,
        led_id: u8,
        brightness: u16,
    ) -> SenselStatus {
        (self.api.set_led_brightness)(handle, led_id, brightness)
    }

    unsafe fn get_led_brightness(
        &self,
        handle: SenselHandle,
        led_id: u8,
        brightness: &mut u16,
    ) -> SenselStatus {
        (self.api.get_led_brightness)(handle, led_id, brightness)
    }

    unsafe fn get_power_button_pressed(
        &self,
        handle: SenselHandle,
        pressed: &mut u8,
    ) -> SenselStatus {
        (self.api.get_power_button_pressed)(handle, pressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_are_platform_specific() {
        let paths = default_library_paths();
        assert_eq!(paths.len(), 2);
        #[cfg(target_os = "linux")]
        assert_eq!(paths[0], PathBuf::from("/usr/lib/libsensel.so"));
    }

    #[test]
    fn missing_library_is_hardware_unavailable() {
        let err = match NativeLibrary::load_from(Path::new("/nonexistent/libsensel.so")) {
            Ok(_) => panic!("loaded a library that does not exist"),
            Err(e) => e,
        };
        assert!(matches!(
            err,
            Error::HardwareUnavailable {
                call: "LoadLibrary",
                ..
            }
        ));
    }
}
