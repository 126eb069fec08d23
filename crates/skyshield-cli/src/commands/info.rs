use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use skyshield_core::io::read_fits;
use skyshield_core::skyglow::ObservationContext;
use skyshield_core::stats::{image_percentile, mean_stddev};

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,

    /// Print every header card
    #[arg(long)]
    pub header: bool,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let frame = read_fits(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let ctx = ObservationContext::from_header(&frame.header);
    let (mean, std) = mean_stddev(&frame.data);

    println!("File:        {}", frame.file_name());
    println!("Dimensions:  {}x{}", frame.width(), frame.height());
    println!("Header:      {} cards", frame.header.len());
    println!(
        "Timestamp:   {}",
        frame.timestamp.as_deref().unwrap_or("UNKNOWN")
    );
    println!("Mean:        {:.3}", mean);
    println!("Std dev:     {:.3}", std);
    if let Some(median) = image_percentile(&frame.data, 50.0) {
        println!("Median:      {:.3}", median);
    }

    println!();
    println!("Observation context");
    match ctx.datetime {
        Some(t) => println!("  Date/time:   {}", t.to_rfc3339()),
        None => println!("  Date/time:   missing"),
    }
    println!("  Latitude:    {:.4}", ctx.latitude());
    println!("  Longitude:   {:.4}", ctx.longitude());
    println!("  Elevation:   {:.0} m", ctx.elevation());
    println!("  Zenith dist: {:.2}", ctx.zenith_distance());
    println!("  Airmass:     {:.3}", ctx.airmass());
    println!("  Filter:      {}", ctx.filter());
    println!("  Exposure:    {} s", ctx.exposure());
    println!(
        "  Sky model:   {}",
        if ctx.datetime.is_some() {
            "available"
        } else {
            "unavailable (no DATE-OBS)"
        }
    );

    if args.header {
        println!();
        for (key, value) in frame.header.iter() {
            println!("  {key:<8} = {value}");
        }
    }
    Ok(())
}
