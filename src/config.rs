use crate::error::{Error, Result};
use crate::inventory::DeviceKind;
use std::path::PathBuf;

/// Upper bound on the local work-group size accepted by [`PipelineConfig::validate`].
/// Devices may support less; the dispatch surfaces the device's own rejection.
pub const MAX_LOCAL_GROUP_SIZE: usize = 1024;

/// Parameters for a single pipeline run.
///
/// The device kind to target and the transform to dispatch are configuration
/// inputs here rather than separate program variants.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of records to generate and transform.
    pub record_count: usize,
    /// Work-items per work-group for the device dispatch.
    pub local_group_size: usize,
    /// Path to the kernel source text.
    pub kernel_path: PathBuf,
    /// Entry point to resolve in the compiled program.
    pub entry_point: String,
    /// Which device class the dispatch should run on.
    pub target: DeviceKind,
    /// Per-component tolerance when comparing serial and device results.
    pub tolerance: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            record_count: 1_000_000,
            local_group_size: 64,
            kernel_path: PathBuf::from("kernels/halve_brightness.cl"),
            entry_point: "halve_brightness".to_string(),
            target: DeviceKind::Gpu,
            tolerance: 1e-5,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.record_count == 0 {
            return Err(Error::config("record_count must be > 0"));
        }

        if self.local_group_size == 0 {
            return Err(Error::config("local_group_size must be > 0"));
        }
        if self.local_group_size > MAX_LOCAL_GROUP_SIZE {
            return Err(Error::config(format!(
                "local_group_size too large (max {})",
                MAX_LOCAL_GROUP_SIZE
            )));
        }

        if self.entry_point.is_empty() {
            return Err(Error::config("entry_point must not be empty"));
        }

        if self.target == DeviceKind::Other {
            return Err(Error::config("target must be Cpu or Gpu"));
        }

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::config("tolerance must be finite and >= 0"));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: PipelineConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn record_count(mut self, count: usize) -> Self {
        self.config.record_count = count;
        self
    }

    pub fn local_group_size(mut self, size: usize) -> Self {
        self.config.local_group_size = size;
        self
    }

    pub fn kernel_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.kernel_path = path.into();
        self
    }

    pub fn entry_point<S: Into<String>>(mut self, name: S) -> Self {
        self.config.entry_point = name.into();
        self
    }

    pub fn target(mut self, kind: DeviceKind) -> Self {
        self.config.target = kind;
        self
    }

    pub fn tolerance(mut self, tolerance: f32) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
