//! Platform and device discovery.
//!
//! The inventory is built once per run and read-only afterwards; selection
//! runs over the inventory data, never against the driver directly.

use crate::error::{Error, Result};
use opencl3::device::{Device, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_GPU};
use opencl3::platform::get_platforms;
use opencl3::types::{cl_device_id, cl_device_type};
use serde::Serialize;
use std::fmt;

/// Device classification derived from the device-reported type bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceKind {
    Cpu,
    Gpu,
    Other,
}

impl DeviceKind {
    /// Map an OpenCL device-type bitfield to a kind.
    pub fn classify(device_type: cl_device_type) -> Self {
        if device_type & CL_DEVICE_TYPE_GPU != 0 {
            DeviceKind::Gpu
        } else if device_type & CL_DEVICE_TYPE_CPU != 0 {
            DeviceKind::Cpu
        } else {
            DeviceKind::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::Cpu => "CPU",
            DeviceKind::Gpu => "GPU",
            DeviceKind::Other => "OTHER",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One discovered compute device. Belongs to exactly one platform entry.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// Raw device handle, valid for the lifetime of the process.
    pub id: cl_device_id,
    pub name: String,
    pub kind: DeviceKind,
    pub max_work_group_size: usize,
}

// SAFETY: `id` is an opaque handle owned by the OpenCL runtime, which
// serializes access internally (OpenCL 1.2+ thread-safety guarantees).
unsafe impl Send for DeviceDescriptor {}
unsafe impl Sync for DeviceDescriptor {}

/// One discovered platform and the devices attached to it, in enumeration order.
#[derive(Debug, Clone)]
pub struct PlatformEntry {
    pub name: String,
    pub devices: Vec<DeviceDescriptor>,
}

impl PlatformEntry {
    /// First device of the given kind on this platform, in enumeration order.
    pub fn first_of_kind(&self, kind: DeviceKind) -> Option<&DeviceDescriptor> {
        self.devices.iter().find(|d| d.kind == kind)
    }
}

/// All platforms and their devices, in enumeration order.
#[derive(Debug, Clone, Default)]
pub struct PlatformInventory {
    pub platforms: Vec<PlatformEntry>,
}

impl PlatformInventory {
    /// Walk every platform and its devices.
    ///
    /// Zero platforms or zero devices per platform yield an empty inventory,
    /// not an error; a failing driver probe is treated the same way.
    pub fn enumerate() -> Self {
        let platforms = match get_platforms() {
            Ok(platforms) => platforms,
            Err(err) => {
                tracing::debug!(error = %err, "platform query failed, treating as empty");
                return Self::default();
            }
        };

        let mut entries = Vec::with_capacity(platforms.len());
        for platform in &platforms {
            let name = platform.name().unwrap_or_default().trim().to_string();
            let ids = platform.get_devices(CL_DEVICE_TYPE_ALL).unwrap_or_default();

            let devices = ids
                .into_iter()
                .map(|id| {
                    let dev = Device::new(id);
                    DeviceDescriptor {
                        id,
                        name: dev.name().unwrap_or_default().trim().to_string(),
                        kind: DeviceKind::classify(dev.dev_type().unwrap_or(0)),
                        max_work_group_size: dev.max_work_group_size().unwrap_or(1),
                    }
                })
                .collect();

            entries.push(PlatformEntry { name, devices });
        }

        tracing::debug!(platforms = entries.len(), "enumerated compute platforms");
        Self { platforms: entries }
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    pub fn device_count(&self) -> usize {
        self.platforms.iter().map(|p| p.devices.len()).sum()
    }
}

impl fmt::Display for PlatformInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.platforms.is_empty() {
            return writeln!(f, "no compute platforms detected");
        }
        for platform in &self.platforms {
            writeln!(f, "{}", platform.name)?;
            for device in &platform.devices {
                writeln!(f, "    {} ({})", device.name, device.kind)?;
            }
        }
        Ok(())
    }
}

/// A chosen device together with the platform it was found on.
#[derive(Debug, Clone)]
pub struct SelectedDevice {
    pub platform_index: usize,
    pub platform_name: String,
    pub device: DeviceDescriptor,
}

/// The CPU-class and GPU-class devices a run will work with.
#[derive(Debug, Clone)]
pub struct DeviceSelection {
    pub cpu: SelectedDevice,
    pub gpu: SelectedDevice,
}

impl DeviceSelection {
    /// Whether both devices came from the same platform.
    pub fn shares_platform(&self) -> bool {
        self.cpu.platform_index == self.gpu.platform_index
    }
}

/// Pick one GPU-class and one CPU-class device from the inventory.
///
/// The GPU drives the search: the first platform exposing a GPU-class device
/// wins, and the CPU is taken from that same platform when it has one, so
/// both devices can share a context. Only when the GPU platform has no
/// CPU-class device are the remaining platforms scanned.
pub fn select_compute_devices(inventory: &PlatformInventory) -> Result<DeviceSelection> {
    let gpu = inventory
        .platforms
        .iter()
        .enumerate()
        .find_map(|(i, p)| {
            p.first_of_kind(DeviceKind::Gpu).map(|d| SelectedDevice {
                platform_index: i,
                platform_name: p.name.clone(),
                device: d.clone(),
            })
        })
        .ok_or(Error::NoGpuFound)?;

    let cpu = match inventory.platforms[gpu.platform_index].first_of_kind(DeviceKind::Cpu) {
        Some(d) => SelectedDevice {
            platform_index: gpu.platform_index,
            platform_name: gpu.platform_name.clone(),
            device: d.clone(),
        },
        None => inventory
            .platforms
            .iter()
            .enumerate()
            .find_map(|(i, p)| {
                p.first_of_kind(DeviceKind::Cpu).map(|d| SelectedDevice {
                    platform_index: i,
                    platform_name: p.name.clone(),
                    device: d.clone(),
                })
            })
            .ok_or(Error::NoCpuFound)?,
    };

    tracing::debug!(
        gpu = %gpu.device.name,
        cpu = %cpu.device.name,
        shared_platform = cpu.platform_index == gpu.platform_index,
        "selected compute devices"
    );

    Ok(DeviceSelection { cpu, gpu })
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencl3::device::CL_DEVICE_TYPE_ACCELERATOR;
    use std::ptr;

    fn device(kind: DeviceKind) -> DeviceDescriptor {
        DeviceDescriptor {
            id: ptr::null_mut(),
            name: format!("fake {}", kind.label()),
            kind,
            max_work_group_size: 256,
        }
    }

    fn platform(name: &str, kinds: &[DeviceKind]) -> PlatformEntry {
        PlatformEntry {
            name: name.to_string(),
            devices: kinds.iter().map(|&k| device(k)).collect(),
        }
    }

    #[test]
    fn classify_maps_type_bits() {
        assert_eq!(DeviceKind::classify(CL_DEVICE_TYPE_CPU), DeviceKind::Cpu);
        assert_eq!(DeviceKind::classify(CL_DEVICE_TYPE_GPU), DeviceKind::Gpu);
        assert_eq!(
            DeviceKind::classify(CL_DEVICE_TYPE_ACCELERATOR),
            DeviceKind::Other
        );
        assert_eq!(DeviceKind::classify(0), DeviceKind::Other);
    }

    #[test]
    fn selects_both_from_shared_platform() {
        let inventory = PlatformInventory {
            platforms: vec![platform("both", &[DeviceKind::Cpu, DeviceKind::Gpu])],
        };

        let selection = select_compute_devices(&inventory).unwrap();

        assert!(selection.shares_platform());
        assert_eq!(selection.gpu.device.kind, DeviceKind::Gpu);
        assert_eq!(selection.cpu.device.kind, DeviceKind::Cpu);
    }

    #[test]
    fn gpu_platform_wins_even_when_cpu_platform_comes_first() {
        let inventory = PlatformInventory {
            platforms: vec![
                platform("cpu only", &[DeviceKind::Cpu]),
                platform("both", &[DeviceKind::Gpu, DeviceKind::Cpu]),
            ],
        };

        let selection = select_compute_devices(&inventory).unwrap();

        assert_eq!(selection.gpu.platform_index, 1);
        // CPU follows the GPU platform, not the earlier CPU-only one.
        assert_eq!(selection.cpu.platform_index, 1);
        assert!(selection.shares_platform());
    }

    #[test]
    fn cpu_falls_back_to_another_platform() {
        let inventory = PlatformInventory {
            platforms: vec![
                platform("gpu only", &[DeviceKind::Gpu]),
                platform("cpu only", &[DeviceKind::Cpu]),
            ],
        };

        let selection = select_compute_devices(&inventory).unwrap();

        assert_eq!(selection.gpu.platform_index, 0);
        assert_eq!(selection.cpu.platform_index, 1);
        assert!(!selection.shares_platform());
    }

    #[test]
    fn no_gpu_fails_before_cpu_selection() {
        let inventory = PlatformInventory {
            platforms: vec![platform("cpu only", &[DeviceKind::Cpu, DeviceKind::Cpu])],
        };

        // A CPU is available, but GPU discovery fails first.
        assert!(matches!(
            select_compute_devices(&inventory),
            Err(Error::NoGpuFound)
        ));
    }

    #[test]
    fn no_cpu_anywhere_fails() {
        let inventory = PlatformInventory {
            platforms: vec![
                platform("gpu only", &[DeviceKind::Gpu]),
                platform("accel", &[DeviceKind::Other]),
            ],
        };

        assert!(matches!(
            select_compute_devices(&inventory),
            Err(Error::NoCpuFound)
        ));
    }

    #[test]
    fn empty_inventory_is_not_an_error_to_build() {
        let inventory = PlatformInventory::default();
        assert!(inventory.is_empty());
        assert_eq!(inventory.device_count(), 0);
        assert!(matches!(
            select_compute_devices(&inventory),
            Err(Error::NoGpuFound)
        ));
    }

    #[test]
    fn display_lists_devices_with_kind_labels() {
        let inventory = PlatformInventory {
            platforms: vec![platform("Fake Platform", &[DeviceKind::Gpu])],
        };
        let rendered = inventory.to_string();
        assert!(rendered.contains("Fake Platform"));
        assert!(rendered.contains("(GPU)"));
    }
}
