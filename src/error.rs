use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a pipeline run. None of these are retryable;
/// the orchestrator releases what it acquired and halts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no GPU-class device found on any platform")]
    NoGpuFound,

    #[error("no CPU-class device found on any platform")]
    NoCpuFound,

    #[error("context creation failed: {0}")]
    ContextCreationFailed(String),

    #[error("command queue creation failed: {0}")]
    QueueCreationFailed(String),

    #[error("kernel source `{path}` could not be read: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("kernel source `{path}` is empty")]
    EmptyKernelSource { path: PathBuf },

    /// Carries the full device-reported build log; it is the only
    /// diagnostic available for kernel-source errors.
    #[error("program build failed:\n{log}")]
    BuildFailed { log: String },

    #[error("kernel entry point `{name}` not found in program: {reason}")]
    KernelNotFound { name: String, reason: String },

    #[error("buffer allocation failed: {0}")]
    BufferAllocationFailed(String),

    #[error("host-to-device transfer failed: {0}")]
    TransferFailed(String),

    #[error("kernel argument binding failed: {0}")]
    ArgumentBindFailed(String),

    #[error("kernel execution failed: {0}")]
    ExecutionFailed(String),

    #[error("device-to-host readback failed: {0}")]
    ReadbackFailed(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("report export failed: {0}")]
    ReportExport(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Name of the pipeline stage this error belongs to, for the
    /// failing-stage diagnostic printed when a run aborts.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::NoGpuFound | Error::NoCpuFound => "device selection",
            Error::ContextCreationFailed(_) => "context creation",
            Error::QueueCreationFailed(_) => "queue creation",
            Error::SourceUnreadable { .. } | Error::EmptyKernelSource { .. } => {
                "kernel source loading"
            }
            Error::BuildFailed { .. } | Error::KernelNotFound { .. } => "program build",
            Error::BufferAllocationFailed(_) => "buffer allocation",
            Error::TransferFailed(_) => "input staging",
            Error::ArgumentBindFailed(_) => "argument binding",
            Error::ExecutionFailed(_) => "kernel dispatch",
            Error::ReadbackFailed(_) => "result readback",
            Error::Config(_) => "configuration",
            Error::ReportExport(_) => "report export",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_failed_carries_log() {
        let err = Error::BuildFailed {
            log: "line 3: unknown type name 'float5'".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("float5"));
        assert_eq!(err.stage(), "program build");
    }

    #[test]
    fn stage_names_cover_dispatch_path() {
        assert_eq!(
            Error::BufferAllocationFailed(String::new()).stage(),
            "buffer allocation"
        );
        assert_eq!(Error::TransferFailed(String::new()).stage(), "input staging");
        assert_eq!(
            Error::ReadbackFailed(String::new()).stage(),
            "result readback"
        );
    }
}
