//! The orchestrator: one parameterized pipeline covering generation, the
//! serial baseline, device discovery and selection, context setup, the
//! device dispatch, and verification.

use crate::config::PipelineConfig;
use crate::context::{ExecutionContext, KernelSource};
use crate::dispatch;
use crate::error::{Error, Result};
use crate::inventory::{select_compute_devices, DeviceKind, PlatformInventory};
use crate::pixel;
use crate::report::{DeviceSummary, PlatformSummary, RunReport, Verification};
use crate::serial;
use std::time::Instant;

fn millis_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn summarize(inventory: &PlatformInventory) -> Vec<PlatformSummary> {
    inventory
        .platforms
        .iter()
        .map(|p| PlatformSummary {
            name: p.name.clone(),
            devices: p
                .devices
                .iter()
                .map(|d| DeviceSummary {
                    name: d.name.clone(),
                    kind: d.kind,
                })
                .collect(),
        })
        .collect()
}

/// Run the whole pipeline once and return its report.
///
/// The host side is single-threaded throughout; every device interaction
/// blocks until the device reports completion. Any stage failure aborts the
/// run with that stage's error kind, after the resources acquired so far
/// have been dropped.
pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    config.validate()?;

    tracing::info!(records = config.record_count, "generating records");
    let pixels = pixel::generate(config.record_count);
    let average_color = serial::average_color(&pixels);

    tracing::info!("running serial baseline");
    let serial_start = Instant::now();
    let expected = serial::halve_brightness(&pixels);
    let serial_millis = millis_since(serial_start);
    tracing::info!(elapsed_ms = serial_millis, "serial baseline complete");

    let setup_start = Instant::now();

    let inventory = PlatformInventory::enumerate();
    tracing::info!(
        platforms = inventory.platforms.len(),
        devices = inventory.device_count(),
        "discovered compute inventory"
    );

    let selection = select_compute_devices(&inventory)?;
    let chosen = match config.target {
        DeviceKind::Cpu => &selection.cpu,
        DeviceKind::Gpu => &selection.gpu,
        // validate() rejected this above; kept for direct construction.
        DeviceKind::Other => return Err(Error::config("target must be Cpu or Gpu")),
    };

    let source = KernelSource::load(&config.kernel_path)?;
    let ctx = ExecutionContext::create(&chosen.device, &source, &config.entry_point)?;
    let setup_millis = millis_since(setup_start);

    tracing::info!(device = %chosen.device.name, "dispatching to device");
    let device_start = Instant::now();
    let results = dispatch::execute(&ctx, &pixels, config.local_group_size)?;
    let device_millis = millis_since(device_start);
    tracing::info!(elapsed_ms = device_millis, "device transform complete");

    let verification = Verification::compare(&expected, &results, config.tolerance);
    if !verification.passed() {
        tracing::warn!(
            mismatches = verification.mismatches,
            max_deviation = verification.max_deviation,
            "device results deviate from the serial baseline"
        );
    }

    Ok(RunReport {
        record_count: config.record_count,
        local_group_size: config.local_group_size,
        platforms: summarize(&inventory),
        platform_name: chosen.platform_name.clone(),
        device_name: chosen.device.name.clone(),
        device_kind: chosen.device.kind,
        shared_platform: selection.shares_platform(),
        average_color,
        sample_before: pixels.first().copied().unwrap_or_default(),
        sample_after: results.first().copied().unwrap_or_default(),
        serial_millis,
        setup_millis,
        device_millis,
        verification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{DeviceDescriptor, PlatformEntry};
    use std::ptr;

    #[test]
    fn summarize_mirrors_the_inventory_tree() {
        let inventory = PlatformInventory {
            platforms: vec![PlatformEntry {
                name: "Fake Platform".to_string(),
                devices: vec![DeviceDescriptor {
                    id: ptr::null_mut(),
                    name: "Fake GPU".to_string(),
                    kind: DeviceKind::Gpu,
                    max_work_group_size: 256,
                }],
            }],
        };

        let summary = summarize(&inventory);

        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].name, "Fake Platform");
        assert_eq!(summary[0].devices.len(), 1);
        assert_eq!(summary[0].devices[0].kind, DeviceKind::Gpu);
    }

    #[test]
    fn invalid_config_fails_before_touching_devices() {
        let mut config = PipelineConfig::default();
        config.local_group_size = 0;

        assert!(matches!(run(&config), Err(Error::Config(_))));
    }
}
