// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk: scan documents into multi-page TIFF files.
//
// Entry point. Opens the device, turns its capabilities into flags, applies
// them in command-line order and runs the scan.

mod cli;
mod device_args;
mod signals;

use std::io;
use std::process::ExitCode;

use chrono::Local;
use clap::{CommandFactory, FromArgMatches};
use scanwerk_core::config::{DEFAULT_DEVICE_ENV, RunConfig};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::human_errors::{Severity, humanize_error};
use scanwerk_device::{
    CapabilityRegistry, Device, DeviceBackend, OptionEngine, VirtualBackend, apply_paper,
};
use scanwerk_document::{TiffEncoder, default_template};
use scanwerk_scan::{
    BatchController, CancellationToken, CapturePipeline, LinePrompt, PageStamp, StopReason,
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            init_logging(0);
            report(&err);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise each -v raises the level.
fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // A second call keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn report(err: &ScanwerkError) {
    let human = humanize_error(err);
    match human.severity {
        Severity::Informational => info!("{}", human.message),
        Severity::ActionRequired | Severity::Failure => error!("{}", human.message),
    }
    if let Some(suggestion) = human.suggestion {
        info!("{suggestion}");
    }
    debug!(?err, "error detail");
}

fn run(args: &[String]) -> Result<u8> {
    let backend = VirtualBackend::default();
    let boot = cli::bootstrap(args);
    let mut config = RunConfig::load_or_default(boot.config.as_ref())?;

    if boot.list_devices {
        init_logging(0);
        list_devices(&backend)?;
        return Ok(0);
    }

    let name = match boot.device.or_else(|| config.device.clone()) {
        Some(name) => Some(name),
        None => default_device(&backend)?,
    };
    let mut device = match &name {
        Some(name) => Some(backend.open(name).map_err(|status| ScanwerkError::DeviceOpen {
            name: name.clone(),
            status,
        })?),
        None => None,
    };
    let mut registry = match &device {
        Some(device) => Some(CapabilityRegistry::build(device)?),
        None => None,
    };

    let base = Cli::command();
    let extra = match (&registry, &device) {
        (Some(registry), Some(device)) => device_args::device_args(registry, device, &base),
        _ => Vec::new(),
    };
    let matches = base
        .next_help_heading("Device options")
        .args(extra)
        .try_get_matches_from(args)
        .unwrap_or_else(|err| cli::exit_on_usage_error(err));
    let cli =
        Cli::from_arg_matches(&matches).unwrap_or_else(|err| cli::exit_on_usage_error(err));

    init_logging(cli.verbose);
    debug!("scanwerk {}", env!("CARGO_PKG_VERSION"));
    cli.apply_to(&mut config)?;
    config.validate()?;

    let (Some(device), Some(registry)) = (device.as_mut(), registry.as_mut()) else {
        return Err(ScanwerkError::NoDevice);
    };
    info!("using {}", device.info().name);

    debug!("setting device options");
    let mut engine = OptionEngine::new();
    for (index, text) in device_args::ordered_values(args, &matches, registry) {
        engine.apply(device, registry, index, text.as_deref(), &mut config.batch)?;
    }

    if let Some(paper) = &config.paper {
        let size = apply_paper(device, registry, paper)?;
        debug!(paper = size.name, "scanning area set");
    }

    if !cli.scan {
        println!("Use --scan to begin scanning, --help for details.");
        return Ok(0);
    }

    scan(device, registry, &config)
}

fn default_device(backend: &VirtualBackend) -> Result<Option<String>> {
    if let Ok(name) = std::env::var(DEFAULT_DEVICE_ENV) {
        return Ok(Some(name));
    }
    let devices = backend
        .devices()
        .map_err(|status| ScanwerkError::device("list devices", status))?;
    Ok(devices.into_iter().next().map(|info| info.name))
}

fn list_devices(backend: &VirtualBackend) -> Result<()> {
    let devices = backend
        .devices()
        .map_err(|status| ScanwerkError::device("list devices", status))?;
    for info in &devices {
        println!(
            "device '{}' is a {} {} {}",
            info.name, info.vendor, info.model, info.kind
        );
    }
    if devices.is_empty() {
        println!(
            "\nNo scanners were identified. If you were expecting something different,\n\
             check that the scanner is plugged in, turned on and detected by its backend."
        );
    }
    Ok(())
}

fn scan(device: &mut dyn Device, registry: &CapabilityRegistry, config: &RunConfig) -> Result<u8> {
    let resolution = registry.current_resolution(device)?;
    let multi_page = config.output.multi_page;
    let template = match &config.output.template {
        Some(template) => template.clone(),
        None => default_template(&Local::now(), config.batch.enabled && !multi_page),
    };

    let cancel = CancellationToken::new();
    signals::install(cancel.clone())?;

    let stamp = PageStamp::new(device.info(), resolution, config.tags.clone());
    let mut pipeline = CapturePipeline::new(&config.capture, stamp, cancel.clone());
    if config.progress {
        pipeline = pipeline.with_progress(|percent| eprint!("progress: {percent:5.1}%\r"));
    }

    let encoder = TiffEncoder::new(config.output.compress);
    let mut controller = BatchController::new(encoder, template, multi_page, &config.batch, cancel);
    controller.announce(resolution);

    let mut prompt = LinePrompt::new(io::stdin().lock(), io::stdout());
    let outcome = controller.run(device, &mut pipeline, &mut prompt);
    if config.progress {
        eprintln!();
    }

    for path in &outcome.files {
        debug!(path = %path.display(), "written");
    }
    if let StopReason::Failed(err) = &outcome.stop {
        report(err);
    }
    Ok(outcome.exit_code())
}
