mod cli;

use castable::{cache, compat, config, probe, scanner, server};
use castable_av::Prober;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "castable=trace,castable_av=debug,tower_http=debug".to_string()
        } else {
            "castable=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(host, port, cli.config.as_deref()))
        }
        Commands::Check { file, json } => check_file(&file, cli.config.as_deref(), json),
        Commands::Scan { dir, no_classify } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(scan_dir(&dir, cli.config.as_deref(), !no_classify))
        }
        Commands::Probe { file, json } => probe_file(&file, json),
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("castable {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn serve(host: String, port: u16, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting castable server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!("Library root: {:?}", config.library.root);

    server::start_server(config).await
}

fn check_file(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let prober = probe::FfprobeProber::discover(config.tools.ffprobe_path.as_deref())?;

    let info = match prober.probe(file) {
        Ok(info) => Some(info),
        Err(e) => {
            tracing::warn!("Probe failed: {e}");
            None
        }
    };

    let report = compat::Classifier::new().classify(file, info.as_ref());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!(
        "Compatible: {}",
        if report.compatible { "yes" } else { "no" }
    );
    match report.video_action {
        Some(ref action) => println!(
            "  video: {} -> {}",
            if report.video_compatible { "native" } else { "incompatible" },
            action
        ),
        None => println!("  video: no stream"),
    }
    match report.audio_action {
        Some(ref action) => println!(
            "  audio: {} -> {}",
            if report.audio_compatible { "native" } else { "incompatible" },
            action
        ),
        None => println!("  audio: no stream"),
    }
    println!(
        "  container: {}",
        if report.container_compatible { "native" } else { "incompatible" }
    );
    if let Some(ref subs) = report.subtitle_file {
        println!("  subtitles: {}", subs.display());
    }
    if let Some(ref cmd) = report.recommended_command {
        println!("\nRecommended conversion:\n  {cmd}");
    }

    Ok(())
}

async fn scan_dir(dir: &Path, config_path: Option<&Path>, classify: bool) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {:?}", dir);
    }

    let config = config::load_config_or_default(config_path)?;
    let prober: Arc<dyn Prober> = Arc::new(probe::FfprobeProber::discover(
        config.tools.ffprobe_path.as_deref(),
    )?);
    let cache = Arc::new(cache::ProbeCache::new(prober));
    let scanner = scanner::Scanner::new(cache, compat::Classifier::new());

    let entries = scanner.scan(dir, Path::new(""), classify).await?;

    for (name, entry) in &entries {
        let kind = if entry.is_dir { "dir " } else { "file" };
        let size = entry
            .stats
            .as_ref()
            .map(|s| s.size.to_string())
            .unwrap_or_else(|| "?".to_string());
        if classify && !entry.is_dir {
            let verdict = if entry.compatible { "compatible" } else { "incompatible" };
            println!("{kind}  {size:>12}  {verdict:>12}  {name}");
        } else {
            println!("{kind}  {size:>12}  {:>12}  {name}", "-");
        }
    }
    println!("\n{} entries", entries.len());

    Ok(())
}

fn probe_file(file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let info = probe::probe_file(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("File: {}", info.file_path.display());
    println!("Container: {}", info.container);
    println!("Size: {} bytes", info.file_size);
    if let Some(ref duration) = info.duration {
        let secs = duration.as_secs();
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }

    println!("\nVideo Tracks: {}", info.video_tracks.len());
    for (i, track) in info.video_tracks.iter().enumerate() {
        print!("  [{}] {}", i, track.codec);
        if let Some(ref profile) = track.profile {
            print!(" {profile}");
        }
        if let Some(level) = track.level {
            print!(" L{level}");
        }
        if let (Some(w), Some(h)) = (track.width, track.height) {
            print!(" {w}x{h}");
        }
        if let Some(fps) = track.frame_rate {
            print!(" {fps:.3} fps");
        }
        if track.default {
            print!(" [default]");
        }
        println!();
    }

    println!("\nAudio Tracks: {}", info.audio_tracks.len());
    for (i, track) in info.audio_tracks.iter().enumerate() {
        print!("  [{}] {}", i, track.codec);
        if let Some(channels) = track.channels {
            print!(" {channels}ch");
        }
        if let Some(ref lang) = track.language {
            print!(" ({lang})");
        }
        if track.default {
            print!(" [default]");
        }
        println!();
    }

    println!("\nSubtitle Tracks: {}", info.subtitle_tracks.len());
    for (i, track) in info.subtitle_tracks.iter().enumerate() {
        print!("  [{}] {}", i, track.codec);
        if let Some(ref lang) = track.language {
            print!(" ({lang})");
        }
        if track.forced {
            print!(" [forced]");
        }
        if track.default {
            print!(" [default]");
        }
        println!();
    }

    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = probe::check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Library root: {:?}", config.library.root);
            println!(
                "  Streaming format: {}",
                config.streaming.format.as_engine_name()
            );
            println!("  Burn subtitles: {}", config.streaming.use_subtitles);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Library root: {:?}", config.library.root);
        }
    }

    Ok(())
}
