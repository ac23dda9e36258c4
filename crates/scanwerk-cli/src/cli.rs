// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Program flags. Device capability flags are added at run time, see
// `device_args`.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use scanwerk_core::config::RunConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::Orientation;

const ORIENTATIONS: [&str; 8] = [
    "topleft", "topright", "botright", "botleft", "lefttop", "righttop", "rightbot", "leftbot",
];

#[derive(Parser, Debug)]
#[command(name = "scanwerk", version)]
#[command(about = "Scan documents into multi-page TIFF files")]
#[command(after_help = "Device flags must follow --device. Use --scan to begin scanning.")]
pub struct Cli {
    /// Device to use, as shown by --list-devices.
    #[arg(short = 'd', long, value_name = "NAME")]
    pub device: Option<String>,

    /// Start scanning.
    #[arg(short = 's', long)]
    pub scan: bool,

    /// List known devices.
    #[arg(short = 'L', long)]
    pub list_devices: bool,

    /// Show progress information.
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Detailed status messages; repeat for more.
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Read settings from a JSON file. Flags override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file name; %d inserts the page number.
    #[arg(short = 'o', long, value_name = "FILE", help_heading = "Output")]
    pub output_file: Option<String>,

    /// Put every page of a batch in one file (default).
    #[arg(long, overrides_with = "no_multi_page", help_heading = "Output")]
    pub multi_page: bool,

    /// Write one file per page.
    #[arg(long, help_heading = "Output")]
    pub no_multi_page: bool,

    /// Use lossless compression (default).
    #[arg(long, overrides_with = "no_compress", help_heading = "Output")]
    pub compress: bool,

    /// Store pages uncompressed.
    #[arg(long, help_heading = "Output")]
    pub no_compress: bool,

    /// Artist tag.
    #[arg(long, help_heading = "Tags")]
    pub artist: Option<String>,

    /// Copyright tag.
    #[arg(long, help_heading = "Tags")]
    pub copyright: Option<String>,

    /// DocumentName tag.
    #[arg(long, help_heading = "Tags")]
    pub document_name: Option<String>,

    /// ImageDescription tag.
    #[arg(long, help_heading = "Tags")]
    pub image_description: Option<String>,

    /// Orientation tag.
    #[arg(long, value_parser = ORIENTATIONS, help_heading = "Tags")]
    pub orientation: Option<String>,

    /// Scan several pages.
    #[arg(short = 'b', long, help_heading = "Batch")]
    pub batch: bool,

    /// Number of pages to scan; unlimited when omitted.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..), help_heading = "Batch")]
    pub batch_count: Option<u32>,

    /// Number of the first page.
    #[arg(long, allow_negative_numbers = true, help_heading = "Batch")]
    pub batch_start: Option<i32>,

    /// Page number increment.
    #[arg(long, allow_negative_numbers = true, help_heading = "Batch")]
    pub batch_increment: Option<i32>,

    /// Wait for <RETURN> before every page.
    #[arg(long, help_heading = "Batch")]
    pub batch_prompt: bool,

    /// Scanning area as a paper name (a4, letter, ...).
    #[arg(long, value_name = "NAME")]
    pub paper: Option<String>,
}

impl Cli {
    /// Fold the flags into `config`, overriding values loaded from a file.
    pub fn apply_to(&self, config: &mut RunConfig) -> Result<()> {
        if let Some(device) = &self.device {
            config.device = Some(device.clone());
        }
        if self.progress {
            config.progress = true;
        }

        let output = &mut config.output;
        if let Some(template) = &self.output_file {
            output.template = Some(template.clone());
        }
        if self.multi_page {
            output.multi_page = true;
        }
        if self.no_multi_page {
            output.multi_page = false;
        }
        if self.compress {
            output.compress = true;
        }
        if self.no_compress {
            output.compress = false;
        }

        let tags = &mut config.tags;
        let text = [
            (&self.artist, &mut tags.artist),
            (&self.copyright, &mut tags.copyright),
            (&self.document_name, &mut tags.document_name),
            (&self.image_description, &mut tags.image_description),
        ];
        for (flag, tag) in text {
            if flag.is_some() {
                tag.clone_from(flag);
            }
        }
        if let Some(keyword) = &self.orientation {
            let orientation = Orientation::from_keyword(keyword)
                .ok_or_else(|| ScanwerkError::Config(format!("unknown orientation {keyword}")))?;
            tags.orientation = Some(orientation);
        }

        let batch = &mut config.batch;
        if self.batch {
            batch.enabled = true;
        }
        if self.batch_count.is_some() {
            batch.count = self.batch_count;
        }
        if let Some(start) = self.batch_start {
            batch.start = start;
        }
        if let Some(increment) = self.batch_increment {
            batch.increment = increment;
        }
        if self.batch_prompt {
            batch.prompt = true;
        }

        if let Some(paper) = &self.paper {
            config.paper = Some(paper.clone());
        }
        Ok(())
    }
}

/// Exit status for a rejected command line. Help and version output exit
/// with 0; usage errors exit with 1 since 2 reports an empty feeder.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

/// Print a clap error or help text and exit with `usage_exit_code`.
pub fn exit_on_usage_error(err: clap::Error) -> ! {
    let code = usage_exit_code(&err);
    let _ = err.print();
    std::process::exit(code)
}

/// Flags needed before the device is open.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Bootstrap {
    pub device: Option<String>,
    pub config: Option<PathBuf>,
    pub list_devices: bool,
}

/// Pick out the flags that decide which device to open. Device capability
/// flags are only known once it is open, so this runs before the real parse.
pub fn bootstrap(args: &[String]) -> Bootstrap {
    let mut boot = Bootstrap::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--" => break,
            "-d" | "--device" => boot.device = iter.next().cloned(),
            "--config" => boot.config = iter.next().map(PathBuf::from),
            "-L" | "--list-devices" => boot.list_devices = true,
            other => {
                if let Some(name) = other.strip_prefix("--device=") {
                    boot.device = Some(name.to_string());
                } else if let Some(path) = other.strip_prefix("--config=") {
                    boot.config = Some(PathBuf::from(path));
                } else if let Some(name) = other.strip_prefix("-d").filter(|n| !n.is_empty()) {
                    boot.device = Some(name.to_string());
                }
            }
        }
    }
    boot
}
