//! CHROMA - heterogeneous compute dispatch for bulk pixel transforms
//!
//! Discovers OpenCL platforms and devices, selects a CPU-class and a
//! GPU-class device, builds a kernel from external source text, stages a
//! bulk sequence of four-component records into device memory, dispatches a
//! data-parallel transform, and reads the results back — while a serial
//! baseline performs the same transform for correctness and timing
//! comparison.
//!
//! # Quick Start
//!
//! ```no_run
//! use chroma_rs::prelude::*;
//!
//! let config = PipelineConfig::builder()
//!     .record_count(100_000)
//!     .local_group_size(64)
//!     .target(DeviceKind::Gpu)
//!     .build()?;
//!
//! let report = chroma_rs::run(&config)?;
//! println!("{report}");
//! # Ok::<(), chroma_rs::Error>(())
//! ```
//!
//! # Design
//!
//! - **One pipeline, parameterized**: the device kind to target and the
//!   dispatch shape are configuration inputs, not program variants.
//! - **Explicit ownership across the host/device boundary**: the execution
//!   context owns queue, program, and kernel; buffers are scoped to a single
//!   dispatch; everything is released in reverse-acquisition order on every
//!   exit path.
//! - **Structured failures**: each setup and dispatch stage surfaces its own
//!   error kind, and a failed program build always carries the full device
//!   build log.

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod inventory;
pub mod pipeline;
pub mod pixel;
pub mod prelude;
pub mod report;
pub mod serial;

pub use config::{ConfigBuilder, PipelineConfig};
pub use error::{Error, Result};
pub use inventory::{DeviceKind, PlatformInventory};
pub use pipeline::run;
pub use report::RunReport;
