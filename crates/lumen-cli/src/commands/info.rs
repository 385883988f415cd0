use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lumen_core::io::{open_track, SerTrack};
use lumen_core::track::Track;

#[derive(Args)]
pub struct InfoArgs {
    /// Input SER file or directory of numbered images
    pub input: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let track = open_track(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let first = track
        .fetch(track.sample(track.begin()), track.channels())
        .with_context(|| format!("Failed to decode frame {}", track.begin()))?;

    println!("Source:      {}", track.name());
    println!(
        "Frames:      {} ({}..={})",
        track.frame_count(),
        track.begin(),
        track.end()
    );
    println!("Rate:        {:.3} fps", track.rate());
    println!("Dimensions:  {}x{}", first.width(), first.height());
    println!("Channels:    {}", track.channels().join(", "));

    if args.input.is_file() {
        let ser = SerTrack::open(&args.input)?;
        let header = ser.header();
        println!("Bit depth:   {}", header.pixel_depth);
        println!("Layout:      {:?}", header.layout());
        for (label, value) in [
            ("Observer", &header.observer),
            ("Telescope", &header.telescope),
            ("Instrument", &header.instrument),
        ] {
            if !value.is_empty() {
                println!("{:<13}{}", format!("{label}:"), value);
            }
        }
        let frame_bytes = header.frame_byte_size()?;
        let total_mb = (frame_bytes * track.frame_count()) as f64 / (1024.0 * 1024.0);
        println!("Data size:   {:.1} MB", total_mb);
    }

    Ok(())
}
