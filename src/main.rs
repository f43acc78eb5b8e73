//! AudioCD Splitter - command-line front end
//!
//! Plans discs from audio sources, converts them with ffmpeg and burns
//! them with wodim. Progress goes to stdout; logs go to stderr and the
//! log file.

mod commands;

use anyhow::{Context, Result, bail};
use audiocd_splitter::audio::FileMetadata;
use audiocd_splitter::burning::{BurnPhase, Burner};
use audiocd_splitter::conversion::{Converter, DiscLayout};
use audiocd_splitter::core::{
    AppSettings, CancelToken, Disc, cancel_on_interrupt, collect_sources, format_duration,
    load_tracks,
};
use audiocd_splitter::logging::init_logging;
use audiocd_splitter::planner::Splitter;
use clap::Parser;
use commands::{BurnCommand, Cli, Commands, ConvertCommand, PlanArgs};
use std::path::PathBuf;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = AppSettings::load();
    match &cli.command {
        Commands::Plan(cmd) => cmd.plan.apply(&mut settings),
        Commands::Convert(cmd) => {
            cmd.plan.apply(&mut settings);
            cmd.output.apply(&mut settings);
            if let Some(ffmpeg) = &cmd.ffmpeg {
                settings.ffmpeg_path = Some(ffmpeg.clone());
            }
        }
        Commands::Burn(cmd) => {
            cmd.plan.apply(&mut settings);
            cmd.output.apply(&mut settings);
            cmd.burn.apply(&mut settings);
        }
        Commands::Drives(cmd) => {
            if let Some(wodim) = &cmd.wodim {
                settings.wodim_path = Some(wodim.clone());
            }
        }
        Commands::Status(cmd) => cmd.burn.apply(&mut settings),
    }
    settings.validate()?;

    if cli.save {
        let path = settings.save().context("Failed to save settings")?;
        log::info!("Saved settings to {}", path.display());
    }

    match cli.command {
        Commands::Plan(cmd) => plan(&cmd.plan, &settings, cli.json),
        Commands::Convert(cmd) => convert(&cmd, &settings, cli.json),
        Commands::Burn(cmd) => burn(&cmd, &settings, cli.json),
        Commands::Drives(_) => drives(&settings, cli.json),
        Commands::Status(_) => status(&settings, cli.json),
    }
}

fn plan_discs(args: &PlanArgs, settings: &AppSettings) -> Result<Vec<Disc>> {
    let files = collect_sources(&args.sources)?;
    let tracks = load_tracks(&files, &FileMetadata);
    if tracks.is_empty() {
        bail!("No playable audio files found");
    }

    let splitter = Splitter::new(settings.capacity_minutes)?;
    let discs = splitter.split(&tracks, settings.split_mode);
    log::info!(
        "Planned {} tracks onto {} discs ({}, {} min each)",
        tracks.len(),
        discs.len(),
        settings.split_mode,
        settings.capacity_minutes
    );
    Ok(discs)
}

fn output_root(settings: &AppSettings) -> Result<PathBuf> {
    match &settings.output_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir().context("Could not determine the current directory"),
    }
}

/// A token that Ctrl+C cancels, for the long-running commands
fn interruptible() -> Result<CancelToken> {
    let token = CancelToken::new();
    cancel_on_interrupt(token.clone()).context("Failed to install the Ctrl+C handler")?;
    Ok(token)
}

fn plan(args: &PlanArgs, settings: &AppSettings, json: bool) -> Result<()> {
    let discs = plan_discs(args, settings)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&discs)?);
        return Ok(());
    }

    let layout = DiscLayout::new("", discs.len());
    for disc in &discs {
        println!(
            "{}  {} tracks  {}",
            layout.folder_name(disc.id()),
            disc.len(),
            format_duration(disc.total_seconds())
        );
        for (i, track) in disc.tracks().iter().enumerate() {
            println!(
                "  {:>3}. {} ({})",
                i + 1,
                track.title(),
                format_duration(track.duration())
            );
        }
    }
    Ok(())
}

fn convert(cmd: &ConvertCommand, settings: &AppSettings, json: bool) -> Result<()> {
    let discs = plan_discs(&cmd.plan, settings)?;
    let converter = Converter::locate(settings.ffmpeg_path.as_deref())?;
    let output = output_root(settings)?;

    let events = converter.spawn_batch(discs, output, interruptible()?)?;
    let mut last = None;
    for status in events {
        if json {
            println!("{}", serde_json::to_string(&status)?);
        } else if !status.is_terminal() {
            println!(
                "[CD {}] {}/{} {}",
                status.disc_id, status.track_index, status.total_tracks, status.filename
            );
        }
        last = Some(status);
    }

    match last {
        Some(status) if status.completed && status.error.is_none() => {
            if !json {
                println!("Conversion complete");
            }
            Ok(())
        }
        Some(status) => bail!(
            "{}",
            status.error.as_deref().unwrap_or("Conversion did not finish")
        ),
        None => bail!("Conversion ended without a result"),
    }
}

fn burn(cmd: &BurnCommand, settings: &AppSettings, json: bool) -> Result<()> {
    let discs = plan_discs(&cmd.plan, settings)?;
    let Some(disc) = cmd.disc.checked_sub(1).and_then(|i| discs.get(i)) else {
        bail!("Disc {} is not in the plan ({} discs)", cmd.disc, discs.len());
    };

    let layout = DiscLayout::new(output_root(settings)?, discs.len());
    let missing = layout.missing_files(disc);
    if !missing.is_empty() {
        for path in &missing {
            log::debug!("Missing {}", path.display());
        }
        bail!("Missing {} WAV files. Convert first!", missing.len());
    }

    let burner = Burner::locate(settings.wodim_path.as_deref())?;
    let events = burner.spawn_burn(
        layout.wav_files(disc),
        settings.burn.clone(),
        interruptible()?,
    )?;

    let mut last = None;
    for status in events {
        if json {
            println!("{}", serde_json::to_string(&status)?);
        } else {
            println!("[{:>5.1}%] {}: {}", status.progress, status.phase, status.text());
        }
        last = Some(status);
    }

    match last {
        Some(status) if status.phase == BurnPhase::Complete => Ok(()),
        Some(status) => bail!("{}", status.text()),
        None => bail!("Burn ended without a result"),
    }
}

fn drives(settings: &AppSettings, json: bool) -> Result<()> {
    let burner = Burner::locate(settings.wodim_path.as_deref())?;
    let drives = burner.available_drives();
    if json {
        println!("{}", serde_json::to_string(&drives)?);
    } else {
        for drive in drives {
            println!("{}", drive);
        }
    }
    Ok(())
}

fn status(settings: &AppSettings, json: bool) -> Result<()> {
    let burner = Burner::locate(settings.wodim_path.as_deref())?;
    let device = &settings.burn.device;
    let disc = burner
        .check_disc_status(device)
        .with_context(|| format!("Drive check failed for {}", device))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&disc)?);
    } else {
        println!("{}: {}", device, disc.summary());
    }
    Ok(())
}
