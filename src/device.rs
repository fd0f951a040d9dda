use crate::ffi;

/// One entry of the native device list, copied into owned memory.
///
/// The index is only meaningful until the next enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub index: u8,
    pub serial: [u8; ffi::SENSEL_ID_LEN],
    pub com_port: [u8; ffi::SENSEL_ID_LEN],
}

impl DeviceIdentity {
    pub fn serial_str(&self) -> String {
        c_bytes_to_string(&self.serial)
    }

    pub fn com_port_str(&self) -> String {
        c_bytes_to_string(&self.com_port)
    }
}

impl From<&ffi::SenselDeviceID> for DeviceIdentity {
    fn from(raw: &ffi::SenselDeviceID) -> Self {
        Self {
            index: raw.idx,
            serial: raw.serial_num,
            com_port: raw.com_port,
        }
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} serial={} port={}",
            self.index,
            self.serial_str(),
            self.com_port_str()
        )
    }
}

/// How a device was picked when opening it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Index into the last enumeration.
    Index(u8),
    Serial(String),
    ComPort(String),
}

impl std::fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceSelector::Index(index) => write!(f, "{}", index),
            DeviceSelector::Serial(serial) => write!(f, "serial {}", serial),
            DeviceSelector::ComPort(port) => write!(f, "port {}", port),
        }
    }
}

fn c_bytes_to_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Static description of the sensing surface, fixed for a session.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensorGeometry {
    pub max_contacts: u8,
    pub rows: u16,
    pub cols: u16,
    pub width_mm: f32,
    pub height_mm: f32,
}

impl SensorGeometry {
    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

impl From<ffi::SenselSensorInfo> for SensorGeometry {
    fn from(raw: ffi::SenselSensorInfo) -> Self {
        Self {
            max_contacts: raw.max_contacts,
            rows: raw.num_rows,
            cols: raw.num_cols,
            width_mm: raw.width,
            height_mm: raw.height,
        }
    }
}

impl From<SensorGeometry> for ffi::SenselSensorInfo {
    fn from(geometry: SensorGeometry) -> Self {
        Self {
            max_contacts: geometry.max_contacts,
            num_rows: geometry.rows,
            num_cols: geometry.cols,
            width: geometry.width_mm,
            height: geometry.height_mm,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FirmwareInfo {
    pub protocol_version: u8,
    pub version_major: u8,
    pub version_minor: u8,
    pub version_build: u16,
    pub version_release: u8,
    pub device_id: u16,
    pub device_revision: u8,
}

impl From<ffi::SenselFirmwareInfo> for FirmwareInfo {
    fn from(raw: ffi::SenselFirmwareInfo) -> Self {
        Self {
            protocol_version: raw.fw_protocol_version,
            version_major: raw.fw_version_major,
            version_minor: raw.fw_version_minor,
            version_build: raw.fw_version_build,
            version_release: raw.fw_version_release,
            device_id: raw.device_id,
            device_revision: raw.device_revision,
        }
    }
}

impl std::fmt::Display for FirmwareInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.version_major, self.version_minor, self.version_build
        )
    }
}

/// Scan resolution. Lower detail trades resolution for frame rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanDetail {
    High,
    Medium,
    Low,
    Unknown,
}

impl ScanDetail {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            ffi::SCAN_DETAIL_HIGH => ScanDetail::High,
            ffi::SCAN_DETAIL_MEDIUM => ScanDetail::Medium,
            ffi::SCAN_DETAIL_LOW => ScanDetail::Low,
            _ => ScanDetail::Unknown,
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            ScanDetail::High => ffi::SCAN_DETAIL_HIGH,
            ScanDetail::Medium => ffi::SCAN_DETAIL_MEDIUM,
            ScanDetail::Low => ffi::SCAN_DETAIL_LOW,
            ScanDetail::Unknown => ffi::SCAN_DETAIL_UNKNOWN,
        }
    }
}

impl std::fmt::Display for ScanDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanDetail::High => write!(f, "high"),
            ScanDetail::Medium => write!(f, "medium"),
            ScanDetail::Low => write!(f, "low"),
            ScanDetail::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_strings_stop_at_nul() {
        let mut raw = ffi::SenselDeviceID::default();
        raw.idx = 2;
        raw.serial_num[..6].copy_from_slice(b"SM0123");
        raw.com_port[..12].copy_from_slice(b"/dev/ttyACM0");
        let id = DeviceIdentity::from(&raw);
        assert_eq!(id.serial_str(), "SM0123");
        assert_eq!(id.com_port_str(), "/dev/ttyACM0");
        assert_eq!(id.to_string(), "#2 serial=SM0123 port=/dev/ttyACM0");
    }

    #[test]
    fn identity_without_terminator_uses_whole_field() {
        let raw = ffi::SenselDeviceID {
            idx: 0,
            serial_num: [b'A'; ffi::SENSEL_ID_LEN],
            com_port: [0; ffi::SENSEL_ID_LEN],
        };
        let id = DeviceIdentity::from(&raw);
        assert_eq!(id.serial_str().len(), ffi::SENSEL_ID_LEN);
        assert_eq!(id.com_port_str(), "");
    }

    #[test]
    fn selector_names_the_device() {
        assert_eq!(DeviceSelector::Index(3).to_string(), "3");
        assert_eq!(DeviceSelector::Serial("SM01".into()).to_string(), "serial SM01");
        assert_eq!(DeviceSelector::ComPort("COM4".into()).to_string(), "port COM4");
    }

    #[test]
    fn geometry_cell_count() {
        let geometry = SensorGeometry {
            max_contacts: 16,
            rows: 105,
            cols: 185,
            width_mm: 240.0,
            height_mm: 139.0,
        };
        assert_eq!(geometry.cell_count(), 105 * 185);
        let raw: ffi::SenselSensorInfo = geometry.into();
        assert_eq!(SensorGeometry::from(raw), geometry);
    }

    #[test]
    fn firmware_version_display() {
        let fw = FirmwareInfo {
            version_major: 0,
            version_minor: 19,
            version_build: 212,
            ..Default::default()
        };
        assert_eq!(fw.to_string(), "0.19.212");
    }

    #[test]
    fn scan_detail_unknown_for_out_of_range() {
        assert_eq!(ScanDetail::from_raw(1), ScanDetail::Medium);
        assert_eq!(ScanDetail::from_raw(7), ScanDetail::Unknown);
        assert_eq!(ScanDetail::Low.as_raw(), 2);
    }
}
