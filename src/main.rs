//! # Inky Weather Application Entry Point
//!
//! One run is one refresh: load configuration, pick a display, acquire the
//! forecast and tides, lay out a frame, draw it and show it, then exit.
//! Scheduling (cron, systemd timer) is left to the host.
//!
//! Output goes to the e-ink panel when built with `--features hardware` on
//! Linux. `--stdout` and `--png` render without hardware for development.


use anyhow::Context;
use chrono::{Local, Utc};
use clap::Parser;
use inky_weather_lib::acquisition::{self, Acquisition};
use inky_weather_lib::cache::FileCache;
use inky_weather_lib::canvas::{Canvas, InkyColor};
use inky_weather_lib::config::{Config, CONFIG_FILE};
use inky_weather_lib::display::{AsciiDisplay, DisplayDriver, PngDisplay, Resolution};
use inky_weather_lib::icons::{self, IconSet};
use inky_weather_lib::render::{self, Frame};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Weather and tide summary for a three-colour e-ink pHAT")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Print the frame as ASCII instead of driving the panel
    #[arg(long)]
    stdout: bool,

    /// Write the frame to a PNG file instead of driving the panel
    #[arg(long, value_name = "PATH", conflicts_with = "stdout")]
    png: Option<PathBuf>,

    /// Reuse a cached forecast page when one exists
    #[arg(long)]
    use_cache: bool,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    write_config: bool,
}

/// Pick the output driver. Errors here abort the run before any network
/// traffic.
fn open_display(cli: &Cli, config: &Config) -> anyhow::Result<Box<dyn DisplayDriver>> {
    let resolution = config.resolution()?;

    if cli.stdout {
        return Ok(Box::new(AsciiDisplay::stdout(resolution)));
    }
    if let Some(path) = &cli.png {
        return Ok(Box::new(PngDisplay::new(resolution, path)));
    }

    #[cfg(all(target_os = "linux", feature = "hardware"))]
    {
        use inky_weather_lib::hardware::Epd2in13bcDisplay;

        if resolution != Resolution::Phat212x104 {
            anyhow::bail!(
                "panel driver supports 212x104 only, configured {}x{}",
                resolution.width(),
                resolution.height()
            );
        }
        let panel = Epd2in13bcDisplay::open(&config.display.hardware)
            .context("opening e-ink panel")?;
        Ok(Box::new(panel))
    }

    #[cfg(not(all(target_os = "linux", feature = "hardware")))]
    {
        log::warn!(
            "E-ink support not enabled. Rebuild with --features hardware on Linux; showing ASCII output instead"
        );
        Ok(Box::new(AsciiDisplay::stdout(resolution)))
    }
}

fn load_icons(config: &Config) -> IconSet {
    match IconSet::load_dir(&config.display.resources_dir) {
        Ok(set) => {
            log::info!(
                "Loaded {} icons from {}",
                set.len(),
                config.display.resources_dir
            );
            set
        }
        Err(e) => {
            log::warn!(
                "Could not read icons from {}: {}",
                config.display.resources_dir,
                e
            );
            IconSet::new()
        }
    }
}

/// Lay out and draw one frame.
fn compose(
    resolution: Resolution,
    config: &Config,
    data: &Acquisition,
    icons: &IconSet,
) -> Canvas {
    let category = icons::classify_reading(data.reading.as_ref());
    let frame = Frame::build(
        &Local::now(),
        data.reading.as_ref(),
        &data.tides,
        category,
        icons,
        config.weather.warning_temp,
    );

    let mut canvas = Canvas::new(resolution, InkyColor::Black);
    render::draw(&mut canvas, &frame, icons);
    canvas
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = Config::load_from_path(&cli.config).with_env_overrides();
    if cli.use_cache {
        config.weather.use_cache = true;
    }

    if cli.write_config {
        config
            .save_to_path(&cli.config)
            .map_err(|e| anyhow::anyhow!("writing {}: {}", cli.config.display(), e))?;
        return Ok(());
    }

    let mut display = open_display(&cli, &config)?;
    let icons = load_icons(&config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let client = acquisition::build_client(&config.weather).context("building HTTP client")?;
    let mut cache = FileCache::new(&config.weather.cache_dir);

    let data = runtime.block_on(acquisition::acquire(
        &client,
        &config,
        &mut cache,
        Utc::now(),
    ));

    let canvas = compose(display.resolution(), &config, &data, &icons);
    display.set_border(InkyColor::Black);
    display.show(&canvas).context("updating display")?;

    Ok(())
}
