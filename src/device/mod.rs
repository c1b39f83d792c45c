pub mod adb;

pub use adb::AdbBridge;

use crate::error::Result;

/// Access to connected devices and what is installed on them.
///
/// Every call names its target device explicitly. Implementations return an
/// empty list or `None` when the underlying tool is unavailable.
pub trait DeviceBridge {
    fn list_devices(&self) -> Result<Vec<String>>;

    fn list_installed_packages(&self, device: &str) -> Result<Vec<String>>;

    fn installed_version(&self, device: &str, package: &str) -> Result<Option<String>>;

    /// Human readable brand and model, if the device reports them.
    fn device_info(&self, device: &str) -> Option<String>;
}
