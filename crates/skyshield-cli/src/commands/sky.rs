use anyhow::{anyhow, Context, Result};
use clap::Args;
use skyshield_core::skyglow::context::parse_datetime;
use skyshield_core::skyglow::{
    estimate_odc_from_observed, natural_sky_for_context, ObservationContext, SkyModelConfig,
};

use crate::summary::{print_residual, print_sky_brightness};

#[derive(Args)]
pub struct SkyArgs {
    /// Observation time, ISO-8601 UTC (e.g. 2024-03-10T03:00:00Z)
    #[arg(long)]
    pub time: String,

    /// Site latitude, degrees north
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Site longitude, degrees east
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Site elevation in metres
    #[arg(long, default_value = "0")]
    pub elevation: f64,

    /// Zenith distance of the pointing, degrees
    #[arg(long, default_value = "0")]
    pub zenith_distance: f64,

    /// Extinction coefficient, mag per airmass
    #[arg(long)]
    pub extinction: Option<f64>,

    /// Observed sky brightness (mag/arcsec^2) to compare against the model
    #[arg(long)]
    pub observed: Option<f64>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &SkyArgs) -> Result<()> {
    let datetime =
        parse_datetime(&args.time).ok_or_else(|| anyhow!("Unrecognised time '{}'", args.time))?;

    let mut config = SkyModelConfig::default();
    if let Some(k) = args.extinction {
        config.extinction = k;
    }
    let ctx = ObservationContext {
        datetime: Some(datetime),
        site_latitude: Some(args.lat),
        site_longitude: Some(args.lon),
        elevation_m: Some(args.elevation),
        zenith_distance: Some(args.zenith_distance),
        has_metadata: true,
        ..Default::default()
    };

    let natural = natural_sky_for_context(&ctx, &config).context("Sky model failed")?;
    let residual = args
        .observed
        .map(|observed| estimate_odc_from_observed(observed, &natural));

    if args.json {
        let json = match residual {
            Some(ref r) => serde_json::to_string_pretty(r)?,
            None => serde_json::to_string_pretty(&natural)?,
        };
        println!("{json}");
        return Ok(());
    }

    print_sky_brightness(&natural);
    if let Some(ref r) = residual {
        print_residual(r);
    }
    Ok(())
}
