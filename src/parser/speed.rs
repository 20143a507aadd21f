use regex_lite::{Captures, Regex};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

/// Key of a traffic channel (gemport) inside one interface section
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    Id(u32),
    /// A traffic-limit line that carried no channel number
    Unknown,
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKey::Id(id) => write!(f, "{}", id),
            ChannelKey::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for ChannelKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Bandwidth limits of one channel, as written on the device and normalized to Mbps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GemportSpeedEntry {
    pub channel: ChannelKey,
    pub upstream: String,
    pub downstream: String,
    pub upstream_mbps: f64,
    pub downstream_mbps: f64,
    pub source_line: String,
}

impl GemportSpeedEntry {
    pub fn total_mbps(&self) -> f64 {
        self.upstream_mbps + self.downstream_mbps
    }
}

/// Channel entries in first-seen order. Inserting an existing key replaces
/// the entry in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChannelMap {
    entries: Vec<GemportSpeedEntry>,
}

impl ChannelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: GemportSpeedEntry) {
        match self.entries.iter_mut().find(|e| e.channel == entry.channel) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, key: &ChannelKey) -> Option<&GemportSpeedEntry> {
        self.entries.iter().find(|e| &e.channel == key)
    }

    pub fn contains(&self, key: &ChannelKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GemportSpeedEntry> {
        self.entries.iter()
    }

    pub fn first_key(&self) -> Option<&ChannelKey> {
        self.entries.first().map(|e| &e.channel)
    }
}

const TRAFFIC_LIMIT_MARKER: &str = "traffic-limit";

fn channel_limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:gemport|channel)\s+(?P<channel>\d+).*traffic-limit\s+upstream\s+(?P<up>(?P<up_val>\d+(?:\.\d+)?)(?P<up_unit>[MG])?bps)\s+downstream\s+(?P<down>(?P<down_val>\d+(?:\.\d+)?)(?P<down_unit>[MG])?bps)",
        )
        .expect("channel traffic-limit pattern")
    })
}

fn bare_limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)traffic-limit\s+upstream\s+(?P<up>(?P<up_val>\d+(?:\.\d+)?)(?P<up_unit>[MG])?bps)\s+downstream\s+(?P<down>(?P<down_val>\d+(?:\.\d+)?)(?P<down_unit>[MG])?bps)",
        )
        .expect("traffic-limit pattern")
    })
}

fn bare_downstream_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)downstream\s+(\d+(?:\.\d+)?)([MG])?").expect("downstream pattern")
    })
}

/// Convert a captured value to Mbps. Missing unit means Mbps.
pub fn to_mbps(value: &str, unit: Option<&str>) -> f64 {
    let value: f64 = value.parse().unwrap_or(0.0);
    match unit {
        Some(u) if u.eq_ignore_ascii_case("g") => value * 1000.0,
        _ => value,
    }
}

fn entry_from_captures(channel: ChannelKey, caps: &Captures<'_>, line: &str) -> GemportSpeedEntry {
    let text = |name: &str| caps.name(name).map(|m| m.as_str()).unwrap_or_default();
    let unit = |name: &str| caps.name(name).map(|m| m.as_str());

    GemportSpeedEntry {
        channel,
        upstream: text("up").to_string(),
        downstream: text("down").to_string(),
        upstream_mbps: to_mbps(text("up_val"), unit("up_unit")),
        downstream_mbps: to_mbps(text("down_val"), unit("down_unit")),
        source_line: line.to_string(),
    }
}

/// Extract per-channel traffic limits from a config section or any excerpt of device output.
/// Lines that don't parse are skipped; an unparsable text yields an empty map.
pub fn extract_channels(text: &str) -> ChannelMap {
    let mut channels = ChannelMap::new();

    for line in text.lines() {
        let line = line.trim();
        if !line.to_ascii_lowercase().contains(TRAFFIC_LIMIT_MARKER) {
            continue;
        }

        let qualified = channel_limit_re().captures(line).and_then(|caps| {
            let id = caps.name("channel")?.as_str().parse::<u32>().ok()?;
            Some(entry_from_captures(ChannelKey::Id(id), &caps, line))
        });

        if let Some(entry) = qualified {
            channels.insert(entry);
        } else if let Some(caps) = bare_limit_re().captures(line) {
            channels.insert(entry_from_captures(ChannelKey::Unknown, &caps, line));
        }
    }

    channels
}

/// Largest downstream limit found in the text, in Mbps
pub fn max_downstream_mbps(text: &str) -> Option<f64> {
    let from_channels = extract_channels(text)
        .iter()
        .map(|e| e.downstream_mbps)
        .collect::<Vec<_>>();

    let bare = bare_downstream_re()
        .captures_iter(text)
        .map(|caps| to_mbps(&caps[1], caps.get(2).map(|m| m.as_str())));

    from_channels.into_iter().chain(bare).reduce(f64::max)
}

/// Speed descriptor stored on cached records, e.g. "950Mbps" or "1.5Gbps"
pub fn speed_descriptor(text: &str) -> Option<String> {
    max_downstream_mbps(text).map(format_speed_descriptor)
}

/// Below 1000 Mbps renders truncated whole Mbps; from 1000 up renders Gbps
/// with up to three decimals and trailing zeros trimmed.
pub fn format_speed_descriptor(mbps: f64) -> String {
    let mbps = mbps.max(0.0);
    if mbps >= 1000.0 {
        // Three Gbps decimals are whole Mbps; round there, half away from zero
        let gbps = format!("{:.3}", mbps.round() / 1000.0);
        let gbps = gbps.trim_end_matches('0').trim_end_matches('.');
        format!("{}Gbps", gbps)
    } else {
        format!("{}Mbps", mbps.trunc() as u64)
    }
}
