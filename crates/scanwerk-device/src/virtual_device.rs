// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated scanner.
//
// Behaves like a small flatbed with an optional document feeder: it exposes a
// typical option set, rounds values to its constraints, can report a cold
// lamp for a number of start attempts and produces a test pattern as image
// data. Used when no hardware backend is available and throughout the tests.

use tracing::{debug, trace};

use scanwerk_core::{
    CapabilityDescriptor, Constraint, DeviceInfo, FrameFormat, OptionValue, Parameters, SetInfo,
    Status, Unit, ValueKind, WORD_SIZE, Word, fix, unfix,
};

use crate::traits::{Device, DeviceBackend};

/// Source literal selecting the flatbed glass.
pub const FLATBED: &str = "Flatbed";

/// Source literal selecting the document feeder.
pub const DOCUMENT_FEEDER: &str = "Automatic Document Feeder";

const MODES: [&str; 5] = ["lineart", "gray", "color", "infrared", "color+ir"];
const DEPTHS: [Word; 3] = [1, 8, 16];
const RESOLUTIONS: [Word; 5] = [75, 150, 300, 600, 1200];
const PREVIEW_DPI: Word = 75;
const BED_WIDTH_MM: f64 = 215.9;
const BED_HEIGHT_MM: f64 = 355.6;
const GAMMA_LEN: usize = 256;

// Capability indices in enumeration order.
const OPT_NUM_OPTIONS: usize = 0;
const OPT_MODE_GROUP: usize = 1;
const OPT_MODE: usize = 2;
const OPT_DEPTH: usize = 3;
const OPT_RESOLUTION: usize = 4;
const OPT_SOURCE: usize = 5;
const OPT_PREVIEW: usize = 6;
const OPT_BRIGHTNESS: usize = 7;
const OPT_GEOMETRY_GROUP: usize = 8;
const OPT_TL_X: usize = 9;
const OPT_TL_Y: usize = 10;
const OPT_BR_X: usize = 11;
const OPT_BR_Y: usize = 12;
const OPT_ENHANCEMENT_GROUP: usize = 13;
const OPT_CUSTOM_GAMMA: usize = 14;
const OPT_GAMMA_TABLE: usize = 15;
const OPT_CALIBRATE: usize = 16;
const NUM_OPTIONS: usize = 17;

#[derive(Debug, Clone)]
struct Settings {
    mode: String,
    depth: Word,
    resolution: Word,
    source: String,
    preview: bool,
    brightness: Word,
    brightness_auto: bool,
    /// tl-x, tl-y, br-x, br-y as fixed-point millimetres.
    area: [Word; 4],
    custom_gamma: bool,
    gamma: Vec<Word>,
    calibrated: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: "gray".into(),
            depth: 8,
            resolution: 150,
            source: FLATBED.into(),
            preview: false,
            brightness: 0,
            brightness_auto: false,
            area: [0, 0, fix(BED_WIDTH_MM), fix(297.0)],
            custom_gamma: false,
            gamma: (0..GAMMA_LEN as Word).collect(),
            calibrated: false,
        }
    }
}

#[derive(Debug)]
struct Transfer {
    params: Parameters,
    total: usize,
    offset: usize,
}

/// A simulated scanner.
#[derive(Debug)]
pub struct VirtualScanner {
    info: DeviceInfo,
    settings: Settings,
    sheets: usize,
    warmup: u32,
    transfer: Option<Transfer>,
    cancelled: bool,
}

impl VirtualScanner {
    /// A flatbed with an empty document feeder.
    pub fn flatbed() -> Self {
        Self {
            info: DeviceInfo {
                name: "virtual:flatbed".into(),
                vendor: "Scanwerk".into(),
                model: "Virtual Flatbed".into(),
                kind: "flatbed scanner".into(),
            },
            settings: Settings::default(),
            sheets: 0,
            warmup: 0,
            transfer: None,
            cancelled: false,
        }
    }

    /// A scanner whose feeder holds `sheets` pages and is selected by default.
    pub fn sheetfed(sheets: usize) -> Self {
        let mut scanner = Self::flatbed();
        scanner.info.name = "virtual:adf".into();
        scanner.info.model = "Virtual Sheetfed".into();
        scanner.info.kind = "sheetfed scanner".into();
        scanner.settings.source = DOCUMENT_FEEDER.into();
        scanner.sheets = sheets;
        scanner
    }

    /// Report a cold lamp for the next `starts` start attempts.
    pub fn with_warmup(mut self, starts: u32) -> Self {
        self.warmup = starts;
        self
    }

    /// Load `sheets` pages into the document feeder.
    pub fn with_sheets(mut self, sheets: usize) -> Self {
        self.sheets = sheets;
        self
    }

    /// Pages left in the document feeder.
    pub fn sheets_left(&self) -> usize {
        self.sheets
    }

    fn build_descriptor(&self, index: usize) -> Option<CapabilityDescriptor> {
        let s = &self.settings;
        let area_max = |max_mm: f64| Constraint::Range {
            min: 0,
            max: fix(max_mm),
            quant: 0,
        };

        let desc = match index {
            OPT_NUM_OPTIONS => CapabilityDescriptor {
                settable: false,
                ..word("", "Number of options", "", ValueKind::Int, Unit::None, Constraint::None)
            },
            OPT_MODE_GROUP => group("Scan Mode"),
            OPT_MODE => text(
                "mode",
                "Scan mode",
                "Selects the scan mode (e.g., lineart, monochrome, or color).",
                &MODES,
            ),
            OPT_DEPTH => CapabilityDescriptor {
                active: s.mode != "lineart",
                ..word(
                    "depth",
                    "Bit depth",
                    "Number of bits per sample.",
                    ValueKind::Int,
                    Unit::Bit,
                    Constraint::WordList(DEPTHS.to_vec()),
                )
            },
            OPT_RESOLUTION => word(
                "resolution",
                "Scan resolution",
                "Sets the resolution of the scanned image.",
                ValueKind::Int,
                Unit::Dpi,
                Constraint::WordList(RESOLUTIONS.to_vec()),
            ),
            OPT_SOURCE => text(
                "source",
                "Scan source",
                "Selects the scan source (such as a document-feeder).",
                &[FLATBED, DOCUMENT_FEEDER],
            ),
            OPT_PREVIEW => flag(
                "preview",
                "Preview",
                "Request a preview-quality scan.",
            ),
            OPT_BRIGHTNESS => CapabilityDescriptor {
                automatic: true,
                ..word(
                    "brightness",
                    "Brightness",
                    "Controls the brightness of the acquired image.",
                    ValueKind::Int,
                    Unit::Percent,
                    Constraint::Range {
                        min: -100,
                        max: 100,
                        quant: 1,
                    },
                )
            },
            OPT_GEOMETRY_GROUP => group("Geometry"),
            OPT_TL_X => word(
                "tl-x",
                "Top-left x",
                "Top-left x position of scan area.",
                ValueKind::Fixed,
                Unit::Millimeter,
                area_max(BED_WIDTH_MM),
            ),
            OPT_TL_Y => word(
                "tl-y",
                "Top-left y",
                "Top-left y position of scan area.",
                ValueKind::Fixed,
                Unit::Millimeter,
                area_max(BED_HEIGHT_MM),
            ),
            OPT_BR_X => word(
                "br-x",
                "Bottom-right x",
                "Bottom-right x position of scan area.",
                ValueKind::Fixed,
                Unit::Millimeter,
                area_max(BED_WIDTH_MM),
            ),
            OPT_BR_Y => word(
                "br-y",
                "Bottom-right y",
                "Bottom-right y position of scan area.",
                ValueKind::Fixed,
                Unit::Millimeter,
                area_max(BED_HEIGHT_MM),
            ),
            OPT_ENHANCEMENT_GROUP => group("Enhancement"),
            OPT_CUSTOM_GAMMA => flag(
                "custom-gamma",
                "Use custom gamma table",
                "Determines whether a builtin or a custom gamma-table should be used.",
            ),
            OPT_GAMMA_TABLE => CapabilityDescriptor {
                active: s.custom_gamma,
                size: GAMMA_LEN * WORD_SIZE,
                ..word(
                    "gamma-table",
                    "Image intensity",
                    "Gamma-correction table.",
                    ValueKind::Int,
                    Unit::None,
                    Constraint::Range {
                        min: 0,
                        max: 255,
                        quant: 0,
                    },
                )
            },
            OPT_CALIBRATE => CapabilityDescriptor {
                size: 0,
                ..word(
                    "calibrate",
                    "Calibrate",
                    "Run the white-level calibration.",
                    ValueKind::Button,
                    Unit::None,
                    Constraint::None,
                )
            },
            _ => return None,
        };
        Some(desc)
    }

    fn current_parameters(&self) -> Result<Parameters, Status> {
        let s = &self.settings;
        let dpi = if s.preview { PREVIEW_DPI } else { s.resolution };
        let [tl_x, tl_y, br_x, br_y] = s.area;
        if br_x <= tl_x || br_y <= tl_y {
            return Err(Status::InvalidArgument);
        }

        let pixels = |from: Word, to: Word| -> u32 {
            (unfix(to - from) / 25.4 * f64::from(dpi)).round() as u32
        };
        let pixels_per_line = pixels(tl_x, br_x).max(1);
        let lines = pixels(tl_y, br_y).max(1);

        let (format, depth, channels) = match s.mode.as_str() {
            "lineart" => (FrameFormat::Gray, 1, 1),
            "color" => (FrameFormat::Rgb, s.depth, 3),
            "infrared" => (FrameFormat::Infrared, s.depth, 1),
            "color+ir" => (FrameFormat::Rgbi, s.depth, 4),
            _ => (FrameFormat::Gray, s.depth, 1),
        };
        let depth = depth as u32;
        let bits_per_line = pixels_per_line as usize * channels * depth as usize;

        Ok(Parameters {
            format,
            last_frame: true,
            bytes_per_line: bits_per_line.div_ceil(8),
            pixels_per_line,
            lines: Some(lines),
            depth,
        })
    }

    fn value_of(&self, index: usize) -> Result<OptionValue, Status> {
        let s = &self.settings;
        Ok(match index {
            OPT_NUM_OPTIONS => OptionValue::Words(vec![NUM_OPTIONS as Word]),
            OPT_MODE => OptionValue::Text(s.mode.clone()),
            OPT_DEPTH => OptionValue::Words(vec![s.depth]),
            OPT_RESOLUTION => OptionValue::Words(vec![s.resolution]),
            OPT_SOURCE => OptionValue::Text(s.source.clone()),
            OPT_PREVIEW => OptionValue::Bool(s.preview),
            OPT_BRIGHTNESS => OptionValue::Words(vec![s.brightness]),
            OPT_TL_X..=OPT_BR_Y => OptionValue::Words(vec![s.area[index - OPT_TL_X]]),
            OPT_CUSTOM_GAMMA => OptionValue::Bool(s.custom_gamma),
            OPT_GAMMA_TABLE => OptionValue::Words(s.gamma.clone()),
            OPT_CALIBRATE => OptionValue::Button,
            _ => return Err(Status::InvalidArgument),
        })
    }

    fn pattern_byte(&self, params: &Parameters, offset: usize) -> u8 {
        let row = offset / params.bytes_per_line;
        let col = offset % params.bytes_per_line;
        let value = ((row + col) & 0xff) as u8;
        if self.settings.custom_gamma && params.depth == 8 {
            self.settings.gamma[usize::from(value)].clamp(0, 255) as u8
        } else {
            value
        }
    }
}

impl Device for VirtualScanner {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn descriptors(&self) -> Result<Vec<CapabilityDescriptor>, Status> {
        (0..NUM_OPTIONS)
            .map(|i| self.build_descriptor(i).ok_or(Status::InvalidArgument))
            .collect()
    }

    fn descriptor(&self, index: usize) -> Result<CapabilityDescriptor, Status> {
        self.build_descriptor(index).ok_or(Status::InvalidArgument)
    }

    fn get_value(&self, index: usize) -> Result<OptionValue, Status> {
        self.value_of(index)
    }

    fn set_value(&mut self, index: usize, value: &OptionValue) -> Result<SetInfo, Status> {
        let desc = self.descriptor(index)?;
        if !desc.settable || !desc.active {
            return Err(Status::InvalidArgument);
        }

        let mut inexact = false;
        let mut reload_options = false;
        match (desc.kind, value) {
            (ValueKind::String, OptionValue::Text(requested)) => {
                let Constraint::StringList(choices) = &desc.constraint else {
                    return Err(Status::InvalidArgument);
                };
                let chosen = choices
                    .iter()
                    .find(|c| c.eq_ignore_ascii_case(requested))
                    .ok_or(Status::InvalidArgument)?
                    .clone();
                if index == OPT_MODE {
                    reload_options = chosen != self.settings.mode;
                    self.settings.mode = chosen;
                } else {
                    self.settings.source = chosen;
                }
            }
            (ValueKind::Bool, OptionValue::Bool(on)) => {
                if index == OPT_CUSTOM_GAMMA {
                    reload_options = *on != self.settings.custom_gamma;
                    self.settings.custom_gamma = *on;
                } else {
                    self.settings.preview = *on;
                }
            }
            (ValueKind::Int | ValueKind::Fixed, OptionValue::Words(words)) => {
                if words.len() != desc.word_count() {
                    return Err(Status::InvalidArgument);
                }
                let constrained: Vec<Word> = words
                    .iter()
                    .map(|&w| constrain(&desc.constraint, w))
                    .collect();
                inexact = constrained != *words;
                match index {
                    OPT_DEPTH => self.settings.depth = constrained[0],
                    OPT_RESOLUTION => self.settings.resolution = constrained[0],
                    OPT_BRIGHTNESS => {
                        self.settings.brightness = constrained[0];
                        self.settings.brightness_auto = false;
                    }
                    OPT_TL_X..=OPT_BR_Y => self.settings.area[index - OPT_TL_X] = constrained[0],
                    OPT_GAMMA_TABLE => self.settings.gamma = constrained,
                    _ => return Err(Status::InvalidArgument),
                }
            }
            (ValueKind::Button, OptionValue::Button) => {
                debug!(device = %self.info.name, "calibrating");
                self.settings.calibrated = true;
            }
            _ => return Err(Status::InvalidArgument),
        }

        Ok(SetInfo {
            inexact,
            effective: self.value_of(index)?,
            reload_options,
        })
    }

    fn set_auto(&mut self, index: usize) -> Result<(), Status> {
        let desc = self.descriptor(index)?;
        if !desc.automatic || !desc.active {
            return Err(Status::InvalidArgument);
        }
        self.settings.brightness_auto = true;
        self.settings.brightness = 0;
        Ok(())
    }

    fn start(&mut self) -> Result<(), Status> {
        if self.warmup > 0 {
            self.warmup -= 1;
            return Err(Status::WarmingUp);
        }
        if self.settings.source == DOCUMENT_FEEDER {
            if self.sheets == 0 {
                return Err(Status::NoDocuments);
            }
            self.sheets -= 1;
        }

        let params = self.current_parameters()?;
        let total = params.bytes_per_line * params.lines.unwrap_or(0) as usize;
        debug!(
            device = %self.info.name,
            bytes = total,
            calibrated = self.settings.calibrated,
            "starting transfer"
        );
        self.transfer = Some(Transfer {
            params,
            total,
            offset: 0,
        });
        self.cancelled = false;
        Ok(())
    }

    fn parameters(&self) -> Result<Parameters, Status> {
        match &self.transfer {
            Some(t) => Ok(t.params),
            None => self.current_parameters(),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Status> {
        if self.cancelled {
            self.transfer = None;
            self.cancelled = false;
            return Err(Status::Cancelled);
        }
        let Some(transfer) = self.transfer.as_ref() else {
            return Err(Status::InvalidArgument);
        };
        if transfer.offset >= transfer.total {
            self.transfer = None;
            return Err(Status::EndOfPage);
        }

        let (params, offset) = (transfer.params, transfer.offset);
        let n = buf.len().min(transfer.total - offset);
        for (i, byte) in buf[..n].iter_mut().enumerate() {
            *byte = self.pattern_byte(&params, offset + i);
        }
        if let Some(transfer) = self.transfer.as_mut() {
            transfer.offset += n;
        }
        trace!(bytes = n, "read");
        Ok(n)
    }

    fn cancel(&mut self) {
        if self.transfer.is_some() {
            self.cancelled = true;
        }
    }
}

/// Backend serving the simulated scanners.
#[derive(Debug, Clone)]
pub struct VirtualBackend {
    /// Pages loaded into the sheetfed scanner's feeder.
    pub feeder_sheets: usize,
}

impl Default for VirtualBackend {
    fn default() -> Self {
        Self { feeder_sheets: 3 }
    }
}

impl DeviceBackend for VirtualBackend {
    type Device = VirtualScanner;

    fn devices(&self) -> Result<Vec<DeviceInfo>, Status> {
        Ok(vec![
            VirtualScanner::flatbed().info,
            VirtualScanner::sheetfed(0).info,
        ])
    }

    fn open(&self, name: &str) -> Result<VirtualScanner, Status> {
        match name {
            "virtual:flatbed" => Ok(VirtualScanner::flatbed()),
            "virtual:adf" => Ok(VirtualScanner::sheetfed(self.feeder_sheets)),
            _ => Err(Status::InvalidArgument),
        }
    }
}

fn word(
    name: &str,
    title: &str,
    description: &str,
    kind: ValueKind,
    unit: Unit,
    constraint: Constraint,
) -> CapabilityDescriptor {
    CapabilityDescriptor {
        name: name.into(),
        title: title.into(),
        description: description.into(),
        kind,
        unit,
        constraint,
        settable: true,
        active: true,
        automatic: false,
        size: WORD_SIZE,
    }
}

fn flag(name: &str, title: &str, description: &str) -> CapabilityDescriptor {
    word(name, title, description, ValueKind::Bool, Unit::None, Constraint::None)
}

fn text(name: &str, title: &str, description: &str, choices: &[&str]) -> CapabilityDescriptor {
    let longest = choices.iter().map(|c| c.len()).max().unwrap_or(0);
    CapabilityDescriptor {
        size: longest + 1,
        ..word(
            name,
            title,
            description,
            ValueKind::String,
            Unit::None,
            Constraint::StringList(choices.iter().map(|c| c.to_string()).collect()),
        )
    }
}

fn group(title: &str) -> CapabilityDescriptor {
    CapabilityDescriptor {
        settable: false,
        size: 0,
        ..word("", title, "", ValueKind::Group, Unit::None, Constraint::None)
    }
}

/// Clamp and quantize a word the way a device applies its constraint.
fn constrain(constraint: &Constraint, value: Word) -> Word {
    match constraint {
        Constraint::Range { min, max, quant } => {
            let clamped = value.clamp(*min, *max);
            if *quant > 0 {
                min + (clamped - min) / quant * quant
            } else {
                clamped
            }
        }
        Constraint::WordList(list) => list
            .iter()
            .copied()
            .min_by_key(|w| (i64::from(*w) - i64::from(value)).abs())
            .unwrap_or(value),
        Constraint::None | Constraint::StringList(_) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(scanner: &VirtualScanner, name: &str) -> usize {
        scanner
            .descriptors()
            .unwrap()
            .iter()
            .position(|d| d.name == name)
            .unwrap()
    }

    #[test]
    fn resolution_snaps_to_nearest_supported_value() {
        let mut scanner = VirtualScanner::flatbed();
        let idx = index_of(&scanner, "resolution");
        let info = scanner
            .set_value(idx, &OptionValue::Words(vec![280]))
            .unwrap();
        assert!(info.inexact);
        assert_eq!(info.effective, OptionValue::Words(vec![300]));
    }

    #[test]
    fn binary_mode_is_rejected() {
        let mut scanner = VirtualScanner::flatbed();
        let idx = index_of(&scanner, "mode");
        assert_eq!(
            scanner.set_value(idx, &OptionValue::Text("binary".into())),
            Err(Status::InvalidArgument)
        );
        let info = scanner
            .set_value(idx, &OptionValue::Text("lineart".into()))
            .unwrap();
        assert!(info.reload_options);
        assert!(!scanner.descriptor(index_of(&scanner, "depth")).unwrap().active);
    }

    #[test]
    fn gamma_table_requires_custom_gamma() {
        let mut scanner = VirtualScanner::flatbed();
        let table = index_of(&scanner, "gamma-table");
        let ramp = OptionValue::Words(vec![0; GAMMA_LEN]);
        assert_eq!(scanner.set_value(table, &ramp), Err(Status::InvalidArgument));

        let custom = index_of(&scanner, "custom-gamma");
        scanner.set_value(custom, &OptionValue::Bool(true)).unwrap();
        assert!(scanner.set_value(table, &ramp).is_ok());
    }

    #[test]
    fn warmup_then_full_page() {
        let mut scanner = VirtualScanner::flatbed().with_warmup(1);
        assert_eq!(scanner.start(), Err(Status::WarmingUp));
        scanner.start().unwrap();

        let params = scanner.parameters().unwrap();
        let expected = params.bytes_per_line * params.lines.unwrap() as usize;
        let mut buf = vec![0u8; params.bytes_per_line * 64];
        let mut total = 0;
        loop {
            match scanner.read(&mut buf) {
                Ok(n) => total += n,
                Err(Status::EndOfPage) => break,
                Err(other) => panic!("unexpected status {other:?}"),
            }
        }
        assert_eq!(total, expected);
    }

    #[test]
    fn feeder_runs_dry() {
        let mut scanner = VirtualScanner::sheetfed(1);
        scanner.start().unwrap();
        scanner.cancel();
        let mut buf = [0u8; 16];
        assert_eq!(scanner.read(&mut buf), Err(Status::Cancelled));
        assert_eq!(scanner.start(), Err(Status::NoDocuments));
    }

    #[test]
    fn lineart_packs_eight_pixels_per_byte() {
        let mut scanner = VirtualScanner::flatbed();
        let mode = index_of(&scanner, "mode");
        scanner
            .set_value(mode, &OptionValue::Text("Lineart".into()))
            .unwrap();
        let params = scanner.parameters().unwrap();
        assert_eq!(params.depth, 1);
        assert_eq!(
            params.bytes_per_line,
            (params.pixels_per_line as usize).div_ceil(8)
        );
    }

    #[test]
    fn constraint_quantizes_ranges() {
        let range = Constraint::Range {
            min: 0,
            max: 100,
            quant: 10,
        };
        assert_eq!(constrain(&range, 47), 40);
        assert_eq!(constrain(&range, 140), 100);
        assert_eq!(constrain(&Constraint::WordList(vec![1, 8, 16]), 12), 8);
    }
}
