use regex_lite::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::speed::{ChannelKey, ChannelMap};

/// Channels whose combined up+down limit is at or below this are ignored by the
/// highest-total heuristic
const TOTAL_FLOOR_MBPS: f64 = 10.0;

/// A DATOS channel within this share of the highest total is preferred over it
const DATOS_PREFERENCE_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    SingleChannel,
    NamedInternet,
    HighestAboveFloor,
    PreferredDatos,
    DatosFallback,
    HighestOverall,
    FirstAvailable,
    Unresolved,
}

/// The channel treated as a subscriber's main service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedService {
    pub channel: Option<ChannelKey>,
    pub strategy: ResolutionStrategy,
}

impl ResolvedService {
    fn pick(channel: &ChannelKey, strategy: ResolutionStrategy) -> Self {
        Self {
            channel: Some(channel.clone()),
            strategy,
        }
    }

    fn unresolved() -> Self {
        Self {
            channel: None,
            strategy: ResolutionStrategy::Unresolved,
        }
    }
}

fn named_internet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:gemport|channel)\s+(\d+).*name\s+INTERNET").expect("INTERNET pattern")
    })
}

fn named_datos_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:gemport|channel)\s+(\d+).*name\s+DATOS").expect("DATOS pattern")
    })
}

/// Channel keys named by `pattern`, in line order, that exist in the map
fn named_channels<'a>(
    pattern: &'a Regex,
    channels: &'a ChannelMap,
    lines: &'a [String],
) -> impl Iterator<Item = ChannelKey> + 'a {
    lines.iter().filter_map(move |line| {
        let id = pattern.captures(line)?.get(1)?.as_str().parse::<u32>().ok()?;
        let key = ChannelKey::Id(id);
        channels.contains(&key).then_some(key)
    })
}

/// Highest upstream+downstream total strictly above `floor`; the first seen wins ties
fn highest_total(channels: &ChannelMap, floor: f64) -> Option<(&ChannelKey, f64)> {
    let mut best: Option<(&ChannelKey, f64)> = None;
    for entry in channels.iter() {
        let total = entry.total_mbps();
        if total > floor && best.map_or(true, |(_, max)| total > max) {
            best = Some((&entry.channel, total));
        }
    }
    best
}

/// Pick the main service channel. Heuristics run in a fixed order and the first that
/// yields a channel wins.
pub fn resolve_main_service(channels: &ChannelMap, lines: &[String]) -> ResolvedService {
    if channels.is_empty() {
        return ResolvedService::unresolved();
    }

    if channels.len() == 1 {
        if let Some(key) = channels.first_key() {
            return ResolvedService::pick(key, ResolutionStrategy::SingleChannel);
        }
    }

    if let Some(key) = named_channels(named_internet_re(), channels, lines).next() {
        return ResolvedService::pick(&key, ResolutionStrategy::NamedInternet);
    }

    if let Some((candidate, max_total)) = highest_total(channels, TOTAL_FLOOR_MBPS) {
        for key in named_channels(named_datos_re(), channels, lines) {
            let total = channels.get(&key).map(|e| e.total_mbps()).unwrap_or_default();
            if total >= max_total * DATOS_PREFERENCE_RATIO {
                return ResolvedService::pick(&key, ResolutionStrategy::PreferredDatos);
            }
        }
        return ResolvedService::pick(candidate, ResolutionStrategy::HighestAboveFloor);
    }

    if let Some(key) = named_channels(named_datos_re(), channels, lines).next() {
        return ResolvedService::pick(&key, ResolutionStrategy::DatosFallback);
    }

    if let Some((key, _)) = highest_total(channels, 0.0) {
        return ResolvedService::pick(key, ResolutionStrategy::HighestOverall);
    }

    match channels.first_key() {
        Some(key) => ResolvedService::pick(key, ResolutionStrategy::FirstAvailable),
        None => ResolvedService::unresolved(),
    }
}
