//! Run reporting: verification of device results against the serial
//! baseline, timings, and export.

use crate::error::{Error, Result};
use crate::inventory::DeviceKind;
use crate::pixel::Pixel;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Outcome of comparing device results against the serial baseline.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Verification {
    pub records_checked: usize,
    pub mismatches: usize,
    pub max_deviation: f32,
    pub tolerance: f32,
}

impl Verification {
    /// Pointwise comparison of `actual` against `expected`.
    ///
    /// A record mismatches when any component deviates by more than
    /// `tolerance`; NaN components always mismatch. A length difference
    /// counts every missing or surplus record as a mismatch.
    pub fn compare(expected: &[Pixel], actual: &[Pixel], tolerance: f32) -> Self {
        let checked = expected.len().min(actual.len());
        let mut mismatches = expected.len().abs_diff(actual.len());
        let mut max_deviation = 0.0f32;

        for (e, a) in expected.iter().zip(actual) {
            let mut record_ok = true;
            for (ec, ac) in e.components().into_iter().zip(a.components()) {
                let deviation = (ec - ac).abs();
                // Written so a NaN deviation counts as a mismatch.
                if !(deviation <= tolerance) {
                    record_ok = false;
                }
                if deviation > max_deviation {
                    max_deviation = deviation;
                }
            }
            if !record_ok {
                mismatches += 1;
            }
        }

        Self {
            records_checked: checked,
            mismatches,
            max_deviation,
            tolerance,
        }
    }

    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }
}

/// One device line in the platform listing.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub name: String,
    pub kind: DeviceKind,
}

/// One platform line in the platform listing.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformSummary {
    pub name: String,
    pub devices: Vec<DeviceSummary>,
}

/// Everything a run produces besides the transformed records themselves.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub record_count: usize,
    pub local_group_size: usize,
    /// Platforms and devices discovered during the run.
    pub platforms: Vec<PlatformSummary>,
    /// Platform hosting the executed device.
    pub platform_name: String,
    pub device_name: String,
    pub device_kind: DeviceKind,
    /// Whether the selected CPU and GPU devices share a platform.
    pub shared_platform: bool,
    pub average_color: Pixel,
    pub sample_before: Pixel,
    pub sample_after: Pixel,
    pub serial_millis: f64,
    pub setup_millis: f64,
    pub device_millis: f64,
    pub verification: Verification,
}

impl RunReport {
    /// Write the report as pretty JSON to `path`.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| Error::ReportExport(e.to_string()))?;
        std::fs::write(path.as_ref(), json).map_err(|e| Error::ReportExport(e.to_string()))?;
        Ok(())
    }
}

fn write_pixel(f: &mut fmt::Formatter<'_>, label: &str, p: &Pixel) -> fmt::Result {
    writeln!(
        f,
        "{}: x={:.6} y={:.6} z={:.6} w={:.6}",
        label, p.x, p.y, p.z, p.w
    )
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Detected platforms and devices:")?;
        for platform in &self.platforms {
            writeln!(f, "  {}", platform.name)?;
            for device in &platform.devices {
                writeln!(f, "      {} ({})", device.name, device.kind)?;
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Executed on {} `{}` ({}){}",
            self.device_kind,
            self.device_name,
            self.platform_name,
            if self.shared_platform {
                ", sharing a platform with the other device class"
            } else {
                ""
            }
        )?;
        writeln!(
            f,
            "Records: {}, local group size: {}",
            self.record_count, self.local_group_size
        )?;

        writeln!(f)?;
        write_pixel(f, "Average color   ", &self.average_color)?;
        write_pixel(f, "Sample before   ", &self.sample_before)?;
        write_pixel(f, "Sample after    ", &self.sample_after)?;

        writeln!(f)?;
        writeln!(f, "Serial transform: {:.3} ms", self.serial_millis)?;
        writeln!(f, "Device setup:     {:.3} ms", self.setup_millis)?;
        writeln!(f, "Device transform: {:.3} ms", self.device_millis)?;

        writeln!(f)?;
        if self.verification.passed() {
            writeln!(
                f,
                "Verification passed: {} records within {:e} (max deviation {:e})",
                self.verification.records_checked,
                self.verification.tolerance,
                self.verification.max_deviation
            )
        } else {
            writeln!(
                f,
                "Verification FAILED: {} of {} records off by more than {:e}",
                self.verification.mismatches,
                self.verification.records_checked,
                self.verification.tolerance
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::halve_brightness;

    fn sample_pixels() -> Vec<Pixel> {
        vec![
            Pixel::new(0.1, 0.2, 0.3, 0.4),
            Pixel::new(0.5, 0.6, 0.7, 0.8),
        ]
    }

    #[test]
    fn identical_sequences_pass() {
        let expected = halve_brightness(&sample_pixels());
        let verification = Verification::compare(&expected, &expected, 1e-5);

        assert!(verification.passed());
        assert_eq!(verification.records_checked, 2);
        assert_eq!(verification.max_deviation, 0.0);
    }

    #[test]
    fn deviation_beyond_tolerance_mismatches() {
        let expected = sample_pixels();
        let mut actual = expected.clone();
        actual[1].z += 1e-3;

        let verification = Verification::compare(&expected, &actual, 1e-5);

        assert!(!verification.passed());
        assert_eq!(verification.mismatches, 1);
        assert!(verification.max_deviation > 1e-4);
    }

    #[test]
    fn nan_component_mismatches() {
        let expected = sample_pixels();
        let mut actual = expected.clone();
        actual[0].x = f32::NAN;

        assert!(!Verification::compare(&expected, &actual, 1e-5).passed());
    }

    #[test]
    fn length_difference_counts_missing_records() {
        let expected = sample_pixels();
        let actual = vec![expected[0]];

        let verification = Verification::compare(&expected, &actual, 1e-5);

        assert_eq!(verification.records_checked, 1);
        assert_eq!(verification.mismatches, 1);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = RunReport {
            record_count: 2,
            local_group_size: 64,
            platforms: vec![PlatformSummary {
                name: "Fake".to_string(),
                devices: vec![DeviceSummary {
                    name: "Fake GPU".to_string(),
                    kind: DeviceKind::Gpu,
                }],
            }],
            platform_name: "Fake".to_string(),
            device_name: "Fake GPU".to_string(),
            device_kind: DeviceKind::Gpu,
            shared_platform: true,
            average_color: Pixel::splat(0.5),
            sample_before: Pixel::splat(0.5),
            sample_after: Pixel::splat(0.25),
            serial_millis: 1.0,
            setup_millis: 2.0,
            device_millis: 0.5,
            verification: Verification::compare(&sample_pixels(), &sample_pixels(), 1e-5),
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"device_name\":\"Fake GPU\""));
        assert!(json.contains("\"mismatches\":0"));

        let rendered = report.to_string();
        assert!(rendered.contains("Fake GPU"));
        assert!(rendered.contains("Verification passed"));
    }
}
