//! Convenience re-exports for typical pipeline use.

pub use crate::config::{ConfigBuilder, PipelineConfig};
pub use crate::context::{ExecutionContext, KernelSource};
pub use crate::error::{Error, Result};
pub use crate::inventory::{
    select_compute_devices, DeviceKind, DeviceSelection, PlatformInventory,
};
pub use crate::pipeline::run;
pub use crate::pixel::Pixel;
pub use crate::report::{RunReport, Verification};
