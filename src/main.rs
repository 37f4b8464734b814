use clap::Parser;
use media_geotagger::{
    GeocodeCache, GeocodingClient, GeocodingConfig, Geotagger, NominatimBackend, OfflineBackend,
    ReverseGeocode, ScanReport, VideoProbe,
};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "media_geotagger",
    version,
    about = "Check photos and videos for dates and GPS, and tag photos with place names"
)]
struct Args {
    /// Directory to scan, recursively
    directory: PathBuf,

    /// Look up place names for files with GPS and no place name yet
    #[arg(long)]
    geocode: bool,

    /// Write newly found place names (and missing GPS fields) into JPEG files
    #[arg(long, requires = "geocode")]
    write: bool,

    /// Use the bundled GeoNames dataset instead of Nominatim
    #[arg(long)]
    offline: bool,

    /// Export the full report as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Only count files with GPS and with place names, then exit
    #[arg(long)]
    quick: bool,

    /// ffprobe executable used for videos (searched for when omitted)
    #[arg(long, value_name = "PATH", conflicts_with = "exiftool")]
    ffprobe: Option<PathBuf>,

    /// Read video tags with exiftool instead of ffprobe
    #[arg(long)]
    exiftool: bool,

    /// Preferred languages for place names
    #[arg(long, default_value = "fr,en")]
    language: String,

    /// Include files and directories whose name starts with a dot
    #[arg(long)]
    include_hidden: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = GeocodingConfig::builder()
        .enabled(args.geocode)
        .language(args.language.clone())
        .build();
    let video_probe = locate_video_probe(&args).await;

    if args.offline {
        run(&args, OfflineBackend::new(), &config, video_probe).await
    } else {
        let backend = NominatimBackend::new(&config)?;
        run(&args, backend, &config, video_probe).await
    }
}

async fn locate_video_probe(args: &Args) -> Option<VideoProbe> {
    let probe = if args.exiftool {
        VideoProbe::exiftool()
    } else if let Some(path) = &args.ffprobe {
        VideoProbe::ffprobe_at(path.clone()).await
    } else {
        let probe = VideoProbe::locate_ffprobe().await;
        if probe.is_none() {
            info!("ffprobe not found, videos will only get their file dates");
        }
        return probe;
    };
    probe
        .inspect_err(|err| warn!("{err}, videos will only get their file dates"))
        .ok()
}

async fn run<B: ReverseGeocode>(
    args: &Args,
    backend: B,
    config: &GeocodingConfig,
    video_probe: Option<VideoProbe>,
) -> color_eyre::Result<()> {
    let mut geotagger = Geotagger::builder()
        .root(args.directory.clone())
        .geocoder(GeocodingClient::new(backend, GeocodeCache::new(), config))
        .maybe_video_probe(video_probe)
        .write_locations(args.write)
        .include_hidden(args.include_hidden)
        .build();

    let cancel_flag = geotagger.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stopping after the current file");
            cancel_flag.store(true, Ordering::Relaxed);
        }
    });

    if args.quick {
        let scan = geotagger.quick_scan().await?;
        println!("Supported files:       {}", scan.total_files);
        println!("Files with GPS:        {}", scan.files_with_gps);
        println!("Files with a location: {}", scan.files_with_location);
        println!("Files to geocode:      {}", scan.files_needing_geocoding());
        return Ok(());
    }

    let report = geotagger.scan().await?;
    print_summary(&report, args.geocode);

    if let Some(path) = &args.report {
        report.export_json(path)?;
        info!("Report written to {}", path.display());
    }
    Ok(())
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

fn print_summary(report: &ScanReport, geocoding: bool) {
    let stats = &report.statistics;
    let total = stats.total_files;
    println!("Directory: {}", report.directory_analyzed.display());
    println!(
        "Files: {total} ({} images, {} videos)",
        stats.image_files, stats.video_files
    );
    for (label, count) in [
        ("With capture date", stats.files_with_capture_date),
        ("With file date", stats.files_with_system_date),
        ("Without any date", stats.files_without_metadata),
        ("With GPS", stats.files_with_gps),
        ("With location", stats.files_with_location),
    ] {
        println!("  {label:<18} {count:>6} ({:.1}%)", percentage(count, total));
    }
    if stats.files_gps_written > 0 {
        println!("  {:<18} {:>6}", "Locations written", stats.files_gps_written);
    }
    if stats.errors > 0 {
        println!("  {:<18} {:>6}", "Errors", stats.errors);
    }

    let top = report.top_locations(5);
    if !top.is_empty() {
        println!("Top locations:");
        for (place, count) in top {
            println!("  {place}: {count} files");
        }
    } else if !geocoding && stats.files_with_gps > 0 {
        println!("Run with --geocode to look up place names");
    }
}
