use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::info;

use ember::tracer::Settings;
use ember::util::{ClockSeed, EntropySeed, FixedSeed, SeedSource};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum SeedKind {
    /// Nanoseconds of the system clock
    Clock,
    #[default]
    /// Thread-local random generator
    Entropy,
}

#[derive(Parser, Debug)]
#[command(about = "Interactive path tracer for spheres")]
struct Args {
    #[arg(long)]
    /// Render one frame of the showcase scene to `output` and exit instead of opening the viewer
    headless: bool,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    #[arg(long, default_value_t = 2)]
    /// Paths traced per pixel, averaged together
    samples: u32,

    #[arg(long, default_value_t = 2)]
    /// Maximum number of bounces before a path falls back to the sky
    bounces: u32,

    #[arg(long)]
    diffuse_only: bool,

    #[arg(long)]
    /// Seed for all the random stuff. Given a seed, every frame is the same picture
    seed: Option<u32>,

    #[arg(long, value_enum, default_value_t)]
    /// Where frame seeds come from when no fixed seed is given
    seeds: SeedKind,

    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    ember::init_logging();
    let args = Args::parse();

    let mut settings = Settings::default();
    settings.set_samples_per_pixel(args.samples);
    settings.set_max_bounces(args.bounces);
    settings.transport.diffuse_only = args.diffuse_only;

    let seeds: Box<dyn SeedSource> = match args.seed {
        Some(seed) => Box::new(FixedSeed(seed)),
        None => match args.seeds {
            SeedKind::Clock => Box::new(ClockSeed),
            SeedKind::Entropy => Box::new(EntropySeed),
        },
    };

    if args.headless {
        let image = ember::render_showcase(args.width, args.height, settings, seeds)?;
        image.save_png(&args.output)?;
        info!("saved {}", args.output.display());
        return Ok(());
    }

    ember::run(settings, seeds, args.output)
}
