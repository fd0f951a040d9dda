//! Enumerate attached sensors and open sessions on them.

use crate::backend::SensorLibrary;
use crate::device::DeviceIdentity;
use crate::error::{check, Error, Result};
use crate::ffi::{SenselDeviceList, SENSEL_ERROR, SENSEL_MAX_DEVICES};
use crate::session::Session;
use std::sync::Arc;

pub struct Directory<L: SensorLibrary> {
    lib: Arc<L>,
}

impl<L: SensorLibrary> Directory<L> {
    pub fn new(lib: Arc<L>) -> Self {
        Self { lib }
    }

    pub fn library(&self) -> &Arc<L> {
        &self.lib
    }

    /// Snapshot of the devices currently attached, in native order.
    pub fn list_devices(&self) -> Result<Vec<DeviceIdentity>> {
        let mut list = SenselDeviceList::default();
        check(self.lib.get_device_list(&mut list), |status| {
            Error::hardware("senselGetDeviceList", status)
        })?;

        let reported = list.num_devices as usize;
        if reported > SENSEL_MAX_DEVICES {
            tracing::warn!(reported, "device count exceeds list capacity, clamping");
        }
        let devices: Vec<DeviceIdentity> = list.devices[..reported.min(SENSEL_MAX_DEVICES)]
            .iter()
            .map(DeviceIdentity::from)
            .collect();
        tracing::debug!(count = devices.len(), "enumerated devices");
        Ok(devices)
    }

    /// Open a session on the device at `index` of the last enumeration.
    pub fn open(&self, index: u8) -> Result<Session<L>> {
        let mut session = Session::new(self.lib.clone());
        session.open(index)?;
        Ok(session)
    }

    /// Open the device with the given serial number, wherever it sits in the
    /// device list.
    pub fn open_by_serial(&self, serial: &str) -> Result<Session<L>> {
        let mut session = Session::new(self.lib.clone());
        session.open_by_serial(serial)?;
        Ok(session)
    }

    pub fn open_by_com_port(&self, com_port: &str) -> Result<Session<L>> {
        let mut session = Session::new(self.lib.clone());
        session.open_by_com_port(com_port)?;
        Ok(session)
    }

    /// Enumerate and open whichever device comes first.
    pub fn open_first(&self) -> Result<Session<L>> {
        let devices = self.list_devices()?;
        let first = devices
            .first()
            .ok_or(Error::hardware("senselGetDeviceList", SENSEL_ERROR))?;
        self.open(first.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sim::{SimDevice, SimulatedLibrary, MORPH_GEOMETRY};
    use crate::device::DeviceSelector;
    use crate::session::SessionState;

    fn directory(count: usize) -> Directory<SimulatedLibrary> {
        let devices = (0..count)
            .map(|i| SimDevice::new(&format!("SM{:02}", i), &format!("COM{}", i), MORPH_GEOMETRY))
            .collect();
        Directory::new(Arc::new(SimulatedLibrary::new(devices)))
    }

    #[test]
    fn empty_list() {
        assert!(directory(0).list_devices().unwrap().is_empty());
    }

    #[test]
    fn lists_in_native_order() {
        let devices = directory(3).list_devices().unwrap();
        let serials: Vec<String> = devices.iter().map(|d| d.serial_str()).collect();
        assert_eq!(serials, ["SM00", "SM01", "SM02"]);
        assert_eq!(devices[2].index, 2);
        assert_eq!(devices[1].com_port_str(), "COM1");
    }

    #[test]
    fn clamps_overlong_count() {
        let dir = directory(2);
        dir.library().report_device_count(40);
        assert_eq!(dir.list_devices().unwrap().len(), SENSEL_MAX_DEVICES);
    }

    #[test]
    fn enumeration_failure_is_hardware_unavailable() {
        let dir = directory(1);
        dir.library().fail_next("senselGetDeviceList", -1);
        assert!(matches!(
            dir.list_devices(),
            Err(Error::HardwareUnavailable {
                call: "senselGetDeviceList",
                status: -1
            })
        ));
    }

    #[test]
    fn open_first_with_nothing_attached() {
        assert!(matches!(
            directory(0).open_first(),
            Err(Error::HardwareUnavailable { .. })
        ));
    }

    #[test]
    fn open_returns_open_session() {
        let dir = directory(2);
        let session = dir.open(1).unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(session.device_index(), Some(1));
        assert_eq!(dir.library().open_handles(), 1);
    }

    #[test]
    fn open_unknown_index_fails() {
        assert!(matches!(
            directory(1).open(5),
            Err(Error::DeviceOpenFailed {
                device: DeviceSelector::Index(5),
                ..
            })
        ));
    }

    #[test]
    fn open_by_serial_finds_device() {
        let dir = directory(3);
        let session = dir.open_by_serial("SM02").unwrap();
        assert_eq!(
            session.device(),
            Some(&DeviceSelector::Serial("SM02".to_string()))
        );
        assert_eq!(
            dir.library().calls(),
            [
                "senselOpenDeviceBySerialNum",
                "senselGetSensorInfo",
                "senselAllocateFrameData"
            ]
        );
    }

    #[test]
    fn open_by_com_port_is_exclusive() {
        let dir = directory(2);
        let _first = dir.open(1).unwrap();
        assert!(matches!(
            dir.open_by_com_port("COM1"),
            Err(Error::DeviceOpenFailed {
                device: DeviceSelector::ComPort(_),
                ..
            })
        ));
        let other = dir.open_by_com_port("COM0").unwrap();
        assert_eq!(other.state(), SessionState::Open);
    }
}
