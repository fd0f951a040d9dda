//! Safe bindings to the Sensel pressure-sensor SDK.
//!
//! [`Directory`] enumerates attached sensors, a [`Session`] owns one open
//! device through its scan loop, and every frame leaves the native buffer as
//! an owned [`Frame`]. The SDK itself is reached through [`SensorLibrary`],
//! either the real LibSensel ([`NativeLibrary`]) or the in-process
//! [`SimulatedLibrary`].

pub mod backend;
pub mod config;
pub mod decoder;
pub mod device;
pub mod directory;
pub mod error;
pub mod ffi;
pub mod frame;
pub mod session;

pub use backend::native::NativeLibrary;
pub use backend::sim::SimulatedLibrary;
pub use backend::SensorLibrary;
pub use config::ScanConfig;
pub use decoder::FrameDecoder;
pub use device::{DeviceIdentity, DeviceSelector, FirmwareInfo, ScanDetail, SensorGeometry};
pub use directory::Directory;
pub use error::{Error, Result};
pub use frame::{Accel, Contact, ContactMask, ContactState, Frame, FrameContent};
pub use session::{Session, SessionState};
