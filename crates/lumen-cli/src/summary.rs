use std::fmt::Display;
use std::path::Path;

use console::{Style, StyledObject};
use lumen_core::pipeline::{RunSummary, WindowSpec};
use lumen_core::track::Track;

struct Styles {
    heading: Style,
    label: Style,
    value: Style,
    method: Style,
    off: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            heading: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            off: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }

    /// One `label  value` line, indented by `depth` levels.
    fn row<T: Display>(&self, depth: usize, label: &str, value: StyledObject<T>) {
        let indent = "  ".repeat(depth + 1);
        let width = 16 - 2 * depth;
        println!("{indent}{:<width$}{value}", self.label.apply_to(label));
    }

    fn section(&self, title: &str) {
        println!("  {}", self.heading.apply_to(title));
    }
}

pub fn print_denoise_summary(track: &dyn Track, output: &Path, spec: &WindowSpec) {
    let s = Styles::new();
    let title = "Lumen Denoise";

    println!();
    s.section(title);
    s.section(&"\u{2550}".repeat(title.len()));
    println!();

    s.row(0, "Input", s.path.apply_to(track.name().to_string()));
    s.row(0, "Output", s.path.apply_to(output.display().to_string()));
    s.row(
        0,
        "Frames",
        s.value.apply_to(format!(
            "{}..={} @ {:.3} fps",
            track.begin(),
            track.end(),
            track.rate()
        )),
    );
    s.row(0, "Channels", s.value.apply_to(track.channels().join(", ")));
    println!();

    s.section("Spatial");
    s.row(1, "Method", s.method.apply_to(spec.spatial.to_string()));
    println!();

    s.section("Temporal");
    if spec.radius == 0 {
        s.row(1, "Radius", s.off.apply_to("0 (spatial only)".to_string()));
        println!();
        return;
    }
    s.row(1, "Radius", s.value.apply_to(spec.radius.to_string()));
    s.row(1, "Alignment", s.method.apply_to(spec.temporal.to_string()));
    s.row(1, "Integration", s.method.apply_to(spec.integration.to_string()));

    let conditioning = &spec.conditioning;
    let confidence = if spec.needs_backward() {
        s.value.apply_to(format!(
            "{} (conservativeness {})",
            conditioning.confidence_threshold, conditioning.conservativeness
        ))
    } else {
        s.off.apply_to("off".to_string())
    };
    s.row(1, "Confidence", confidence);
    if conditioning.vector_filter_strength > 0.0 {
        s.row(
            1,
            "Smoothing",
            s.value
                .apply_to(conditioning.vector_filter_strength.to_string()),
        );
    }
    if spec.log_domain {
        s.row(1, "Domain", s.value.apply_to("log".to_string()));
    }
    println!();
}

pub fn print_run_summary(summary: &RunSummary) {
    let s = Styles::new();
    let counts = [
        ("Written", summary.frames_written, "frame(s)"),
        ("Decoded", summary.source_fetches, "source frame(s)"),
        ("Accepted", summary.accepted_samples, "sample(s)"),
    ];
    for (label, count, unit) in counts {
        s.row(0, label, s.value.apply_to(format!("{count} {unit}")));
    }
    if !summary.failed_frames.is_empty() {
        s.row(
            0,
            "Failed",
            s.off.apply_to(format!("{:?}", summary.failed_frames)),
        );
    }
}
