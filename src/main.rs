//! Heartest CLI - PCG case workflow
//!
//! Command-line interface for capturing, denoising and logging
//! four-valve heart sound recordings.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use heartest::cli::commands::{self, SaveCaseRequest};
use heartest::cli::{Cli, Commands};
use heartest::config::AppConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("Heartest v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(upload_dir) = cli.upload_dir {
        config.upload_dir = upload_dir;
    }
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    debug!("{:?}", config);

    match cli.command {
        Some(cmd) => handle_command(&config, cmd),
        None => {
            println!("Heartest v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(config: &AppConfig, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Upload { valve, file } => commands::upload(config, &valve, &file)
            .with_context(|| format!("upload of {} failed", file.display())),
        Commands::RecordTone {
            valve,
            frequency,
            seconds,
            rate,
        } => commands::record_tone(config, &valve, frequency, seconds, rate)
            .context("recording failed"),
        Commands::Analyze {
            file,
            filter,
            svg,
            wav,
            json,
        } => commands::analyze(config, &file, &filter, svg.as_deref(), wav.as_deref(), json)
            .with_context(|| format!("analysis of {} failed", file)),
        Commands::SaveCase {
            name,
            age,
            gender,
            notes,
            height,
            weight,
            aortic,
            pulmonary,
            tricuspid,
            mitral,
            phone,
        } => {
            let request = SaveCaseRequest {
                name,
                age,
                gender,
                notes,
                height_cm: height,
                weight_kg: weight,
                recordings: [aortic, pulmonary, tricuspid, mitral],
                phone,
            };
            commands::save_case(config, &request).context("case not saved")
        }
        Commands::History { plots_dir } => {
            commands::history(config, plots_dir.as_deref()).context("cannot show history")
        }
        Commands::SendSms { phone, case } => {
            commands::send_sms(config, &phone, case).context("summary not sent")
        }
    }
}
