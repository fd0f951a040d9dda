//! `#[repr(C)]` mirrors of the structs in `sensel.h`.
//!
//! Field order and widths must match the native header exactly; the layout
//! tests at the bottom of this file pin the sizes the SDK was built with.

use libc::{c_float, c_int, c_uchar, c_uint, c_ushort, c_void};

pub type SenselHandle = *mut c_void;
pub type SenselStatus = c_int;

pub const SENSEL_OK: SenselStatus = 0;
pub const SENSEL_ERROR: SenselStatus = -1;

pub const SENSEL_MAX_DEVICES: usize = 16;
pub const SENSEL_ID_LEN: usize = 64;

pub const FRAME_CONTENT_PRESSURE_MASK: c_uchar = 0x01;
pub const FRAME_CONTENT_LABELS_MASK: c_uchar = 0x02;
pub const FRAME_CONTENT_CONTACTS_MASK: c_uchar = 0x04;
pub const FRAME_CONTENT_ACCEL_MASK: c_uchar = 0x08;

pub const CONTACT_MASK_ELLIPSE: c_uchar = 0x01;
pub const CONTACT_MASK_DELTAS: c_uchar = 0x02;
pub const CONTACT_MASK_BOUNDING_BOX: c_uchar = 0x04;
pub const CONTACT_MASK_PEAK: c_uchar = 0x08;

pub const CONTACT_INVALID: c_uint = 0;
pub const CONTACT_START: c_uint = 1;
pub const CONTACT_MOVE: c_uint = 2;
pub const CONTACT_END: c_uint = 3;

pub const SCAN_DETAIL_HIGH: c_int = 0;
pub const SCAN_DETAIL_MEDIUM: c_int = 1;
pub const SCAN_DETAIL_LOW: c_int = 2;
pub const SCAN_DETAIL_UNKNOWN: c_int = 3;

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct SenselDeviceID {
    pub idx: c_uchar,
    pub serial_num: [c_uchar; SENSEL_ID_LEN],
    pub com_port: [c_uchar; SENSEL_ID_LEN],
}

impl Default for SenselDeviceID {
    fn default() -> Self {
        Self {
            idx: 0,
            serial_num: [0; SENSEL_ID_LEN],
            com_port: [0; SENSEL_ID_LEN],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct SenselDeviceList {
    pub num_devices: c_uchar,
    pub devices: [SenselDeviceID; SENSEL_MAX_DEVICES],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SenselSensorInfo {
    pub max_contacts: c_uchar,
    pub num_rows: c_ushort,
    pub num_cols: c_ushort,
    /// Millimeters.
    pub width: c_float,
    /// Millimeters.
    pub height: c_float,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SenselFirmwareInfo {
    pub fw_protocol_version: c_uchar,
    pub fw_version_major: c_uchar,
    pub fw_version_minor: c_uchar,
    pub fw_version_build: c_ushort,
    pub fw_version_release: c_uchar,
    pub device_id: c_ushort,
    pub device_revision: c_uchar,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SenselContact {
    pub content_bit_mask: c_uchar,
    pub id: c_uchar,
    pub state: c_uint,
    pub x_pos: c_float,
    pub y_pos: c_float,
    pub total_force: c_float,
    pub area: c_float,
    // CONTACT_MASK_ELLIPSE
    pub orientation: c_float,
    pub major_axis: c_float,
    pub minor_axis: c_float,
    // CONTACT_MASK_DELTAS
    pub delta_x: c_float,
    pub delta_y: c_float,
    pub delta_force: c_float,
    pub delta_area: c_float,
    // CONTACT_MASK_BOUNDING_BOX
    pub min_x: c_float,
    pub min_y: c_float,
    pub max_x: c_float,
    pub max_y: c_float,
    // CONTACT_MASK_PEAK
    pub peak_x: c_float,
    pub peak_y: c_float,
    pub peak_force: c_float,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SenselAccelData {
    pub x: c_int,
    pub y: c_int,
    pub z: c_int,
}

/// Frame buffer allocated by `senselAllocateFrameData` and refilled in place
/// by every `senselGetFrame`. The arrays are sized from the sensor info at
/// allocation time: `max_contacts` contacts, `rows * cols` forces and labels.
#[repr(C)]
#[derive(Debug)]
pub struct SenselFrameData {
    pub content_bit_mask: c_uchar,
    pub lost_frame_count: c_int,
    pub n_contacts: c_uchar,
    pub contacts: *mut SenselContact,
    pub force_array: *mut c_float,
    pub labels_array: *mut c_uchar,
    pub accel_data: *mut SenselAccelData,
}

impl Default for SenselFrameData {
    fn default() -> Self {
        Self {
            content_bit_mask: 0,
            lost_frame_count: 0,
            n_contacts: 0,
            contacts: std::ptr::null_mut(),
            force_array: std::ptr::null_mut(),
            labels_array: std::ptr::null_mut(),
            accel_data: std::ptr::null_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of, size_of};

    #[test]
    fn contact_layout_matches_header() {
        assert_eq!(size_of::<SenselContact>(), 80);
        assert_eq!(offset_of!(SenselContact, state), 4);
        assert_eq!(offset_of!(SenselContact, x_pos), 8);
        assert_eq!(offset_of!(SenselContact, peak_force), 76);
    }

    #[test]
    fn device_list_is_byte_packed() {
        assert_eq!(size_of::<SenselDeviceID>(), 129);
        assert_eq!(align_of::<SenselDeviceID>(), 1);
        assert_eq!(size_of::<SenselDeviceList>(), 1 + 16 * 129);
    }

    #[test]
    fn sensor_info_layout() {
        assert_eq!(size_of::<SenselSensorInfo>(), 16);
        assert_eq!(offset_of!(SenselSensorInfo, num_rows), 2);
        assert_eq!(offset_of!(SenselSensorInfo, width), 8);
    }

    #[test]
    fn small_struct_sizes() {
        assert_eq!(size_of::<SenselAccelData>(), 12);
        assert_eq!(size_of::<SenselFirmwareInfo>(), 12);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn frame_data_layout_64() {
        assert_eq!(offset_of!(SenselFrameData, lost_frame_count), 4);
        assert_eq!(offset_of!(SenselFrameData, n_contacts), 8);
        assert_eq!(offset_of!(SenselFrameData, contacts), 16);
        assert_eq!(size_of::<SenselFrameData>(), 48);
    }
}
