// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One command-line flag per settable device capability.

use std::collections::{HashMap, VecDeque};

use clap::{Arg, ArgAction, ArgMatches, Command};
use scanwerk_core::{CapabilityDescriptor, Constraint, ValueKind, Word, unfix};
use scanwerk_device::{CapabilityRegistry, Device, RegistryEntry};
use tracing::warn;

/// Flags for every registry entry whose name does not clash with a flag of `base`.
pub fn device_args(registry: &CapabilityRegistry, device: &dyn Device, base: &Command) -> Vec<Arg> {
    registry
        .iter()
        .filter(|entry| !entry.descriptor.name.is_empty())
        .filter(|entry| {
            let name = entry.descriptor.name.as_str();
            let clash = base
                .get_arguments()
                .any(|arg| arg.get_id() == name || arg.get_long() == Some(name));
            if clash {
                warn!("device option --{name} hides a program flag and is not available");
            }
            !clash
        })
        .map(|entry| device_arg(entry, registry.describe_current(device, entry)))
        .collect()
}

fn device_arg(entry: &RegistryEntry, current: String) -> Arg {
    let desc = &entry.descriptor;
    let mut help = if desc.description.is_empty() {
        desc.title.clone()
    } else {
        desc.description.clone()
    };
    if !current.is_empty() {
        help.push_str(&format!(" [{current}]"));
    }

    let arg = Arg::new(desc.name.clone())
        .long(desc.name.clone())
        .action(ArgAction::Append)
        .help(help);

    match desc.kind {
        ValueKind::Button => arg.num_args(0..=1),
        ValueKind::Bool => arg.num_args(0..=1).value_name(accepted_values(desc)),
        _ => arg
            .num_args(1)
            .allow_negative_numbers(desc.kind.is_numeric())
            .value_name(accepted_values(desc)),
    }
}

/// Values a capability accepts, as shown in help output.
pub fn accepted_values(desc: &CapabilityDescriptor) -> String {
    let unit = desc.unit.suffix();
    let mut text = match (desc.kind, &desc.constraint) {
        (ValueKind::Bool, _) => "yes|no".to_string(),
        (ValueKind::Button | ValueKind::Group, _) => String::new(),
        (_, Constraint::StringList(items)) => items.join("|"),
        (ValueKind::String, _) => "string".to_string(),
        (_, Constraint::Range { min, max, .. }) => {
            format!("{}..{}{unit}", number(desc, *min), number(desc, *max))
        }
        (_, Constraint::WordList(words)) => {
            let list: Vec<_> = words.iter().map(|&w| number(desc, w)).collect();
            format!("{}{unit}", list.join("|"))
        }
        (ValueKind::Fixed, Constraint::None) => format!("float{unit}"),
        (_, Constraint::None) => format!("int{unit}"),
    };
    if desc.kind.is_numeric() && desc.word_count() > 1 {
        text.push_str(",...");
    }
    if desc.automatic {
        text.push_str("|auto");
    }
    text
}

fn number(desc: &CapabilityDescriptor, word: Word) -> String {
    match desc.kind {
        ValueKind::Fixed => {
            let text = format!("{:.3}", unfix(word));
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => word.to_string(),
    }
}

/// Device flag values in command-line order, as (device index, value).
///
/// clap keeps values per flag; the interleaving across flags comes from `args`.
pub fn ordered_values(
    args: &[String],
    matches: &ArgMatches,
    registry: &CapabilityRegistry,
) -> Vec<(usize, Option<String>)> {
    let mut pending: HashMap<&str, VecDeque<Option<String>>> = HashMap::new();
    for entry in registry.iter() {
        let name = entry.descriptor.name.as_str();
        if let Ok(Some(occurrences)) = matches.try_get_occurrences::<String>(name) {
            let values = occurrences.map(|mut values| values.next().cloned()).collect();
            pending.insert(name, values);
        }
    }

    let mut ordered = Vec::new();
    for arg in args.iter().skip(1) {
        if arg == "--" {
            break;
        }
        let Some(long) = arg.strip_prefix("--") else {
            continue;
        };
        let name = long.split_once('=').map_or(long, |(name, _)| name);
        let (Some(queue), Some(entry)) = (pending.get_mut(name), registry.by_name(name)) else {
            continue;
        };
        if let Some(value) = queue.pop_front() {
            ordered.push((entry.index, value));
        }
    }
    ordered
}
