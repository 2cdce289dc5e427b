//! Execution context lifecycle: context, queue, program, and kernel for one
//! selected device.

use crate::error::{Error, Result};
use crate::inventory::DeviceDescriptor;
use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::Device;
use opencl3::kernel::Kernel;
use opencl3::program::Program;
use std::fs;
use std::path::{Path, PathBuf};

/// Kernel program text loaded from an external resource.
#[derive(Debug, Clone)]
pub struct KernelSource {
    pub path: PathBuf,
    pub text: String,
}

impl KernelSource {
    /// Read kernel source from `path`.
    ///
    /// An unreadable file or one containing only whitespace is a setup
    /// failure, never a silent no-op kernel.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let text = fs::read_to_string(&path).map_err(|source| Error::SourceUnreadable {
            path: path.clone(),
            source,
        })?;

        if text.trim().is_empty() {
            return Err(Error::EmptyKernelSource { path });
        }

        Ok(Self { path, text })
    }
}

/// Owns every device-side handle a run needs: context, command queue,
/// compiled program, and the resolved kernel.
///
/// Dropping the context releases the handles in reverse-acquisition order
/// (kernel first, context last — field declaration order below), on success
/// and failure paths alike.
pub struct ExecutionContext {
    kernel: Kernel,
    program: Program,
    queue: CommandQueue,
    context: Context,
    device: Device,
    device_name: String,
    entry_point: String,
}

// SAFETY: the wrapped OpenCL handles are opaque pointers into the runtime,
// which serializes access internally (OpenCL 1.2+ thread-safety guarantees).
unsafe impl Send for ExecutionContext {}
unsafe impl Sync for ExecutionContext {}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("device_name", &self.device_name)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    /// Build the full context for `descriptor`, staged: context, queue,
    /// program build, kernel lookup. Each stage surfaces its own error kind;
    /// on failure the stages already created are dropped here, so nothing
    /// leaks across a partial setup.
    pub fn create(
        descriptor: &DeviceDescriptor,
        source: &KernelSource,
        entry_point: &str,
    ) -> Result<Self> {
        let device = Device::new(descriptor.id);

        let context = Context::from_device(&device)
            .map_err(|e| Error::ContextCreationFailed(e.to_string()))?;

        // OpenCL 1.2 queue API for macOS compatibility.
        #[allow(deprecated)]
        let queue = CommandQueue::create_default(&context, 0)
            .map_err(|e| Error::QueueCreationFailed(e.to_string()))?;

        let program = build_program(&context, &device, &source.text)?;

        let kernel = Kernel::create(&program, entry_point).map_err(|e| Error::KernelNotFound {
            name: entry_point.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(
            device = %descriptor.name,
            entry_point,
            "execution context ready"
        );

        Ok(Self {
            kernel,
            program,
            queue,
            context,
            device,
            device_name: descriptor.name.clone(),
            entry_point: entry_point.to_string(),
        })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

/// Compile `source` for `device`. On a build failure the full device build
/// log is retrieved and returned with the error; it is the only diagnostic
/// available for kernel-source errors.
fn build_program(context: &Context, device: &Device, source: &str) -> Result<Program> {
    let mut program = Program::create_from_source(context, source).map_err(|e| Error::BuildFailed {
        log: format!("program creation failed before compilation: {}", e),
    })?;

    if let Err(build_err) = program.build(&[device.id()], "") {
        let log = program
            .get_build_log(device.id())
            .unwrap_or_else(|log_err| {
                format!(
                    "build failed ({}) and the build log was unavailable ({})",
                    build_err, log_err
                )
            });
        return Err(Error::BuildFailed { log });
    }

    Ok(program)
}
