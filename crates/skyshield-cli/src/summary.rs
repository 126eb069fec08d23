use std::path::Path;

use console::Style;
use skyshield_core::detection::DetectorConfig;
use skyshield_core::mask::DetectionStatus;
use skyshield_core::metrics::{FrameQuality, QualityFlag};
use skyshield_core::pipeline::{BatchReport, FrameOutcome, PipelineConfig};
use skyshield_core::skyglow::{NaturalSkyBrightness, OdcOutcome, OdcResidual};
use skyshield_core::validation::ValidationReport;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    warn: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            warn: Style::new().red().bold(),
        }
    }
}

fn rule(s: &Styles, width: usize) {
    println!("  {}", s.title.apply_to("\u{2550}".repeat(width)));
}

pub fn print_run_summary(config: &PipelineConfig, input: &Path, output: &Path) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("SkyShield Pipeline"));
    rule(&s, 18);
    println!();

    println!("  {:<14}{}", s.label.apply_to("Input"), s.path.apply_to(input.display()));
    println!("  {:<14}{}", s.label.apply_to("Output"), s.path.apply_to(output.display()));
    println!();

    println!("  {}", s.header.apply_to("Detection"));
    print_detector(&s, &config.detection);
    println!();

    println!("  {}", s.header.apply_to("ODC"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Bootstrap"),
        s.value.apply_to(format!(
            "{} resamples, seed {}",
            config.odc.bootstrap_samples, config.odc.seed
        ))
    );
    if config.odc.use_physical_model {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Sky model"),
            s.method.apply_to(format!("extinction {}", config.sky_model.extinction))
        );
    } else {
        println!("    {:<12}{}", s.label.apply_to("Sky model"), s.disabled.apply_to("disabled"));
    }
    println!();
}

fn print_detector(s: &Styles, detection: &DetectorConfig) {
    match detection {
        DetectorConfig::Baseline(c) => {
            println!("    {:<12}{}", s.label.apply_to("Method"), s.method.apply_to("baseline"));
            println!("    {:<12}{}", s.label.apply_to("Sigma"), s.value.apply_to(c.threshold_sigma));
            println!("    {:<12}{}", s.label.apply_to("Line width"), s.value.apply_to(c.line_width));
        }
        DetectorConfig::Improved(c) => {
            println!("    {:<12}{}", s.label.apply_to("Method"), s.method.apply_to("improved"));
            println!("    {:<12}{}", s.label.apply_to("Sigma"), s.value.apply_to(c.threshold_sigma));
            println!(
                "    {:<12}{}",
                s.label.apply_to("Min length"),
                s.value.apply_to(format!("{} px", c.min_streak_length))
            );
            println!("    {:<12}{}", s.label.apply_to("Min aspect"), s.value.apply_to(c.min_aspect_ratio));
        }
        DetectorConfig::Adaptive(c) => {
            println!("    {:<12}{}", s.label.apply_to("Method"), s.method.apply_to("adaptive"));
            println!(
                "    {:<12}{}",
                s.label.apply_to("Percentile"),
                s.value.apply_to(c.percentile_threshold)
            );
            println!(
                "    {:<12}{}",
                s.label.apply_to("Min area"),
                s.value.apply_to(format!("{} px", c.min_streak_length))
            );
            println!("    {:<12}{}", s.label.apply_to("Min aspect"), s.value.apply_to(c.min_aspect_ratio));
        }
    }
}

pub fn print_batch_report(report: &BatchReport) {
    let s = Styles::new();
    let night = &report.night;

    println!();
    println!("  {}", s.header.apply_to("Night summary"));
    println!("    {:<14}{}", s.label.apply_to("Frames"), s.value.apply_to(night.n_frames));
    println!("    {:<14}{}", s.label.apply_to("Affected"), s.value.apply_to(night.affected_frames));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Median area"),
        s.value.apply_to(format!("{:.4}", night.median_streak_area_fraction))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("P95 area"),
        s.value.apply_to(format!("{:.4}", night.p95_streak_area_fraction))
    );
    for (bucket, count) in &night.severity_histogram {
        println!("      {:<12}{}", s.label.apply_to(bucket), count);
    }
    println!();

    print_odc(&s, &report.odc);

    let failed: Vec<&FrameOutcome> = report.failed().collect();
    if !failed.is_empty() {
        println!("  {}", s.warn.apply_to(format!("{} frame(s) failed", failed.len())));
        for outcome in failed {
            if let FrameOutcome::Failed { file, reason } = outcome {
                println!("    {}  {}", s.path.apply_to(file), s.label.apply_to(reason));
            }
        }
        println!();
    }
    println!(
        "  Reports written to {}",
        s.path.apply_to(report.output_dir.display())
    );
}

fn print_odc(s: &Styles, odc: &OdcOutcome) {
    println!("  {}", s.header.apply_to("Orbital diffuse contribution"));
    match odc {
        OdcOutcome::Estimated(r) => {
            println!(
                "    {:<14}{}",
                s.label.apply_to("Excess"),
                s.value.apply_to(format!(
                    "{:.2}%  [{:.2}, {:.2}]",
                    r.odc_percent, r.odc_ci95[0], r.odc_ci95[1]
                ))
            );
            println!(
                "    {:<14}{}",
                s.label.apply_to("Baseline"),
                s.value.apply_to(format!("{:.3}", r.baseline_level))
            );
            println!(
                "    {:<14}{}",
                s.label.apply_to("Median"),
                s.value.apply_to(format!("{:.3}", r.median_level))
            );
            if let Some(dm) = r.odc_magnitude_diff {
                println!(
                    "    {:<14}{}",
                    s.label.apply_to("Mag residual"),
                    s.value.apply_to(format!("{dm:+.3} mag"))
                );
            }
            println!("    {:<14}{}", s.label.apply_to("Method"), s.method.apply_to(&r.method));
            if let Some(ref e) = r.model_error {
                println!("    {:<14}{}", s.label.apply_to("Model error"), s.disabled.apply_to(e));
            }
        }
        OdcOutcome::NoValidData { frames_seen } => {
            println!(
                "    {}",
                s.warn.apply_to(format!("no valid background in {frames_seen} frame(s)"))
            );
        }
    }
    println!();
}

pub fn print_frame_quality(q: &FrameQuality) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to(&q.file));
    println!("    {:<14}{}", s.label.apply_to("Detector"), s.method.apply_to(&q.detector_info.method));
    println!("    {:<14}{}", s.label.apply_to("Streaks"), s.value.apply_to(q.num_streaks));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Area"),
        s.value.apply_to(format!("{:.4}", q.streak_area_fraction))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Severity"),
        s.value.apply_to(format!("{:.3}", q.severity_score))
    );
    if let Some(n) = q.detector_info.candidate_regions {
        println!("    {:<14}{}", s.label.apply_to("Candidates"), s.value.apply_to(n));
    }
    let flags: Vec<&str> = q
        .flags
        .iter()
        .map(|f| match f {
            QualityFlag::StreakDetected => "STREAK_DETECTED",
            QualityFlag::HighContamination => "HIGH_CONTAMINATION",
        })
        .collect();
    if flags.is_empty() {
        println!("    {:<14}{}", s.label.apply_to("Flags"), s.disabled.apply_to("none"));
    } else {
        println!("    {:<14}{}", s.label.apply_to("Flags"), s.warn.apply_to(flags.join(", ")));
    }
    if let DetectionStatus::Degraded(ref reason) = q.detector_info.status {
        println!("    {:<14}{}", s.label.apply_to("Degraded"), s.warn.apply_to(reason));
    }
}

pub fn print_validation_summary(report: &ValidationReport) {
    let s = Styles::new();
    let m = &report.summary;

    println!();
    println!(
        "  {}",
        s.title.apply_to(format!("Validation: {} on {}", report.detector, report.dataset))
    );
    rule(&s, 12 + report.detector.len() + report.dataset.len() + 4);
    println!();
    println!("  {:<16}{}", s.label.apply_to("Frames"), s.value.apply_to(m.num_frames));
    println!();
    println!("  {}", s.header.apply_to("Per-frame (macro)"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("IoU"),
        s.value.apply_to(format!(
            "mean {:.4}  median {:.4}  std {:.4}",
            m.mean_iou, m.median_iou, m.std_iou
        ))
    );
    println!("    {:<14}{:.4}", s.label.apply_to("Precision"), m.mean_precision);
    println!("    {:<14}{:.4}", s.label.apply_to("Recall"), m.mean_recall);
    println!("    {:<14}{:.4}", s.label.apply_to("F1"), m.mean_f1);
    println!();
    println!("  {}", s.header.apply_to("Global (micro)"));
    println!("    {:<14}{:.4}", s.label.apply_to("Precision"), m.global_precision);
    println!("    {:<14}{:.4}", s.label.apply_to("Recall"), m.global_recall);
    println!("    {:<14}{:.4}", s.label.apply_to("F1"), m.global_f1);
    println!(
        "    {:<14}{}",
        s.label.apply_to("TP/FP/FN"),
        s.value.apply_to(format!("{}/{}/{}", m.total_tp, m.total_fp, m.total_fn))
    );
}

pub fn print_sky_brightness(sky: &NaturalSkyBrightness) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Natural sky brightness"));
    rule(&s, 22);
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Total"),
        s.value.apply_to(format!("{:.3} mag/arcsec^2", sky.total_sky_brightness))
    );
    println!("    {:<12}{:.3}", s.label.apply_to("Lunar"), sky.lunar_component);
    println!("    {:<12}{:.3}", s.label.apply_to("Rayleigh"), sky.rayleigh_component);
    println!("    {:<12}{:.3}", s.label.apply_to("Twilight"), sky.twilight_component);
    println!();
    println!("  {:<14}{:.2} deg", s.label.apply_to("Moon alt"), sky.moon_altitude);
    println!("  {:<14}{:.1}", s.label.apply_to("Moon phase"), sky.moon_phase_angle);
    println!("  {:<14}{:.2} deg", s.label.apply_to("Sun alt"), sky.sun_altitude);
    println!("  {:<14}{:.2} deg", s.label.apply_to("Zenith dist"), sky.zenith_distance);
    println!("  {:<14}{}", s.label.apply_to("Model"), s.method.apply_to(&sky.model_version));
}

pub fn print_residual(r: &OdcResidual) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Residual"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Observed"),
        s.value.apply_to(format!("{:.3}", r.observed_brightness))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Difference"),
        s.value.apply_to(format!("{:+.3} mag", r.odc_magnitude_diff))
    );
    let excess = format!("{:.2}%", r.odc_percent_flux);
    if r.excess_due_to_odc {
        println!("    {:<12}{}", s.label.apply_to("Flux excess"), s.warn.apply_to(excess));
    } else {
        println!("    {:<12}{}", s.label.apply_to("Flux excess"), s.value.apply_to(excess));
    }
}
