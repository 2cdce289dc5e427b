//! Transfer and dispatch engine: device buffers, staging, argument binding,
//! the data-parallel dispatch, and readback.
//!
//! The stages run in a fixed order — allocate, stage, bind, execute, read —
//! and a failure at any stage aborts the run. Buffers are scoped to a single
//! dispatch and dropped on every exit path, so nothing leaks when a stage
//! fails partway through.

use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::pixel::Pixel;
use opencl3::memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_WRITE_ONLY};
use opencl3::types::CL_BLOCKING;
use std::ptr;

/// Smallest multiple of `local_group_size` that covers `record_count`.
///
/// Excess lanes beyond the record count execute, but their output is never
/// read back.
pub fn global_work_size(record_count: usize, local_group_size: usize) -> usize {
    record_count.div_ceil(local_group_size) * local_group_size
}

/// The input/output buffer pair for one dispatch.
///
/// Input is read-only and output write-only from the device's perspective.
/// Both are sized to the padded global work size rather than the record
/// count, so lanes past the record count write into allocated slack instead
/// of out of bounds; only `len` records are ever staged or read back.
pub struct DeviceBuffers {
    input: Buffer<Pixel>,
    output: Buffer<Pixel>,
    capacity: usize,
    len: usize,
}

impl std::fmt::Debug for DeviceBuffers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffers")
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl DeviceBuffers {
    /// Allocate the buffer pair for `record_count` records dispatched with
    /// `local_group_size` lanes per group.
    pub fn allocate(
        ctx: &ExecutionContext,
        record_count: usize,
        local_group_size: usize,
    ) -> Result<Self> {
        let capacity = global_work_size(record_count, local_group_size);

        let input = unsafe {
            Buffer::<Pixel>::create(ctx.context(), CL_MEM_READ_ONLY, capacity, ptr::null_mut())
                .map_err(|e| Error::BufferAllocationFailed(format!("input buffer: {}", e)))?
        };

        let output = unsafe {
            Buffer::<Pixel>::create(ctx.context(), CL_MEM_WRITE_ONLY, capacity, ptr::null_mut())
                .map_err(|e| Error::BufferAllocationFailed(format!("output buffer: {}", e)))?
        };

        Ok(Self {
            input,
            output,
            capacity,
            len: record_count,
        })
    }

    /// Records this pair was allocated for.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated capacity in records, padded to the global work size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Blocking copy of the full host sequence into the input buffer.
pub fn stage_input(
    ctx: &ExecutionContext,
    buffers: &mut DeviceBuffers,
    pixels: &[Pixel],
) -> Result<()> {
    if pixels.len() != buffers.len {
        return Err(Error::TransferFailed(format!(
            "buffers hold {} records but the host sequence has {}",
            buffers.len,
            pixels.len()
        )));
    }

    let event = unsafe {
        ctx.queue()
            .enqueue_write_buffer(&mut buffers.input, CL_BLOCKING, 0, pixels, &[])
            .map_err(|e| Error::TransferFailed(e.to_string()))?
    };
    event
        .wait()
        .map_err(|e| Error::TransferFailed(e.to_string()))?;

    Ok(())
}

/// Bind the two positional kernel arguments: input, then output.
pub fn bind_arguments(ctx: &ExecutionContext, buffers: &DeviceBuffers) -> Result<()> {
    unsafe {
        ctx.kernel()
            .set_arg(0, &buffers.input)
            .map_err(|e| Error::ArgumentBindFailed(format!("argument 0 (input): {}", e)))?;
        ctx.kernel()
            .set_arg(1, &buffers.output)
            .map_err(|e| Error::ArgumentBindFailed(format!("argument 1 (output): {}", e)))?;
    }
    Ok(())
}

/// Submit the 1-D range over the padded global size and block until the
/// device reports completion.
pub fn dispatch(ctx: &ExecutionContext, record_count: usize, local_group_size: usize) -> Result<()> {
    let global = [global_work_size(record_count, local_group_size)];
    let local = [local_group_size];

    let event = unsafe {
        ctx.queue()
            .enqueue_nd_range_kernel(
                ctx.kernel().get(),
                1,
                ptr::null(),
                global.as_ptr(),
                local.as_ptr(),
                &[],
            )
            .map_err(|e| Error::ExecutionFailed(e.to_string()))?
    };
    event
        .wait()
        .map_err(|e| Error::ExecutionFailed(e.to_string()))?;

    Ok(())
}

/// Blocking copy of exactly `record_count` records out of the output buffer.
pub fn read_results(
    ctx: &ExecutionContext,
    buffers: &DeviceBuffers,
    record_count: usize,
) -> Result<Vec<Pixel>> {
    if record_count > buffers.len {
        return Err(Error::ReadbackFailed(format!(
            "requested {} records from buffers holding {}",
            record_count, buffers.len
        )));
    }

    let mut results = vec![Pixel::default(); record_count];

    let event = unsafe {
        ctx.queue()
            .enqueue_read_buffer(&buffers.output, CL_BLOCKING, 0, &mut results, &[])
            .map_err(|e| Error::ReadbackFailed(e.to_string()))?
    };
    event
        .wait()
        .map_err(|e| Error::ReadbackFailed(e.to_string()))?;

    Ok(results)
}

/// Run the full stage sequence for one host sequence and hand back the
/// transformed records. Buffers are dropped on return, success or not.
pub fn execute(
    ctx: &ExecutionContext,
    pixels: &[Pixel],
    local_group_size: usize,
) -> Result<Vec<Pixel>> {
    if pixels.is_empty() {
        return Ok(Vec::new());
    }

    let mut buffers = DeviceBuffers::allocate(ctx, pixels.len(), local_group_size)?;
    tracing::debug!(
        records = buffers.len(),
        capacity = buffers.capacity(),
        "device buffers allocated"
    );

    stage_input(ctx, &mut buffers, pixels)?;
    tracing::debug!("input staged");

    bind_arguments(ctx, &buffers)?;
    dispatch(ctx, pixels.len(), local_group_size)?;
    tracing::debug!("kernel dispatch complete");

    read_results(ctx, &buffers, pixels.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_size_rounds_up_to_group_multiple() {
        assert_eq!(global_work_size(10, 64), 64);
        assert_eq!(global_work_size(65, 64), 128);
        assert_eq!(global_work_size(1, 64), 64);
    }

    #[test]
    fn global_size_keeps_exact_multiples() {
        assert_eq!(global_work_size(1_000_000, 64), 1_000_000);
        assert_eq!(global_work_size(128, 64), 128);
        assert_eq!(global_work_size(64, 64), 64);
    }

    #[test]
    fn global_size_with_unit_group_is_the_count() {
        assert_eq!(global_work_size(17, 1), 17);
    }

    #[test]
    fn global_size_covers_the_count() {
        for count in [1usize, 7, 63, 64, 65, 1000, 4096] {
            for local in [1usize, 2, 32, 64, 256] {
                let global = global_work_size(count, local);
                assert!(global >= count);
                assert_eq!(global % local, 0);
            }
        }
    }
}
