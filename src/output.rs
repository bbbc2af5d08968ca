//! CLI output formatting.
//!
//! # Report Layout
//!
//! ```text
//! ***Display results only***        ← dry run only
//! Input file:        photo.jpg
//! Input width:       1000
//! Input height:      800
//! Input size:        245.3K
//!
//! Output file:       photo_edited.jpg
//! Output width:      500
//! Output height:     400
//! Output size:       61.2K
//!
//! Size change:       -184.1K (-75.0%)
//! ```
//!
//! Sizes use binary units (1 K = 1024 bytes) with one decimal; plain byte
//! counts below 1 K are printed as integers.
//!
//! # Architecture
//!
//! `format_*` functions return `Vec<String>` and are pure, for testability;
//! `print_*` wrappers write them to stdout.

use crate::pipeline::Report;

const UNITS: [&str; 9] = ["", "K", "M", "G", "T", "P", "E", "Z", "Y"];

/// Index into the unit table for `bytes`: the largest unit that keeps the
/// scaled value below 1024, saturating at `Y`.
pub fn unit_index(bytes: u128) -> usize {
    let mut value = bytes;
    let mut idx = 0;
    while value >= 1024 && idx < UNITS.len() - 1 {
        value /= 1024;
        idx += 1;
    }
    idx
}

/// Render a byte count with a binary unit suffix (`512`, `1.5K`, `3.0M`).
pub fn humanize_bytes(bytes: u128) -> String {
    let mut idx = unit_index(bytes);
    if idx == 0 {
        return bytes.to_string();
    }
    let mut scaled = bytes as f64 / 1024f64.powi(idx as i32);
    // 1023.96K would print as 1024.0K
    if (scaled * 10.0).round() >= 10240.0 && idx < UNITS.len() - 1 {
        idx += 1;
        scaled /= 1024.0;
    }
    format!("{:.1}{}", scaled, UNITS[idx])
}

/// Render a signed byte difference, e.g. `+1.5K` or `-512`.
pub fn humanize_delta(delta: i128) -> String {
    let sign = match delta.signum() {
        1 => "+",
        -1 => "-",
        _ => "",
    };
    format!("{}{}", sign, humanize_bytes(delta.unsigned_abs()))
}

/// Relative size change in percent, `None` when the original is empty.
pub fn percent_change(before: u64, after: u64) -> Option<f64> {
    (before > 0).then(|| (after as f64 - before as f64) / before as f64 * 100.0)
}

fn field(label: &str, value: impl std::fmt::Display) -> String {
    format!("{:<19}{}", format!("{label}:"), value)
}

/// Format the end-of-run report.
pub fn format_report(report: &Report) -> Vec<String> {
    let mut lines = Vec::new();

    if report.dry_run {
        lines.push("***Display results only***".to_string());
    }

    let (in_w, in_h) = report.input_dimensions;
    let input_name = report
        .input
        .file_name()
        .map_or_else(|| report.input.to_string_lossy(), |n| n.to_string_lossy());
    lines.push(field("Input file", input_name));
    lines.push(field("Input width", in_w));
    lines.push(field("Input height", in_h));
    lines.push(field("Input size", humanize_bytes(report.input_bytes.into())));
    lines.push(String::new());

    let (out_w, out_h) = report.output_dimensions;
    lines.push(field("Output file", report.output.display()));
    lines.push(field("Output width", out_w));
    lines.push(field("Output height", out_h));
    lines.push(field("Output size", humanize_bytes(report.output_bytes.into())));
    lines.push(String::new());

    let delta = i128::from(report.output_bytes) - i128::from(report.input_bytes);
    let change = match percent_change(report.input_bytes, report.output_bytes) {
        Some(pct) => format!("{} ({:+.1}%)", humanize_delta(delta), pct),
        None => humanize_delta(delta),
    };
    lines.push(field("Size change", change));

    lines
}

/// Print the end-of-run report to stdout.
pub fn print_report(report: &Report) {
    for line in format_report(report) {
        println!("{}", line);
    }
}
