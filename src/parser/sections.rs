use regex_lite::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::speed::{extract_channels, ChannelMap};

/// One `interface gpon-onu_<id>` block of a running configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSection {
    pub interface: String,
    pub customer_name: String,
    /// Trimmed lines, starting with the interface declaration
    pub lines: Vec<String>,
    pub channels: ChannelMap,
}

impl DeviceSection {
    pub fn raw_text(&self) -> String {
        self.lines.join("\n")
    }
}

fn onu_interface_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^interface\s+gpon-onu_(\S+)").expect("onu interface pattern"))
}

fn any_interface_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^interface\s+").expect("interface pattern"))
}

fn name_directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^name\s+(.+)$").expect("name pattern"))
}

struct OpenSection {
    interface: String,
    customer_name: Option<String>,
    lines: Vec<String>,
}

impl OpenSection {
    fn new(interface: &str, declaration: &str) -> Self {
        Self {
            interface: interface.to_string(),
            customer_name: None,
            lines: vec![declaration.to_string()],
        }
    }

    /// Sections without an identifier or a customer name are dropped
    fn finish(self) -> Option<DeviceSection> {
        let customer_name = self.customer_name?;
        if self.interface.is_empty() {
            return None;
        }
        let channels = extract_channels(&self.lines.join("\n"));
        Some(DeviceSection {
            interface: self.interface,
            customer_name,
            lines: self.lines,
            channels,
        })
    }
}

/// Split a raw configuration dump into per-interface sections, in order of appearance.
/// Never fails: text without any ONU interface yields an empty list.
pub fn parse_sections(config: &str) -> Vec<DeviceSection> {
    let mut sections = Vec::new();
    let mut open: Option<OpenSection> = None;

    for raw in config.lines() {
        let trimmed = raw.trim();

        if let Some(caps) = onu_interface_re().captures(trimmed) {
            if let Some(section) = open.take().and_then(OpenSection::finish) {
                sections.push(section);
            }
            open = Some(OpenSection::new(&caps[1], trimmed));
            continue;
        }

        let closes = match open.as_mut() {
            None => continue,
            Some(section) => {
                section.lines.push(trimmed.to_string());

                let indented = raw.starts_with(char::is_whitespace);
                if !trimmed.is_empty() && !indented && !any_interface_re().is_match(trimmed) {
                    true
                } else {
                    if section.customer_name.is_none() {
                        if let Some(caps) = name_directive_re().captures(trimmed) {
                            section.customer_name = Some(caps[1].trim().to_string());
                        }
                    }
                    false
                }
            }
        };

        if closes {
            if let Some(section) = open.take().and_then(OpenSection::finish) {
                sections.push(section);
            }
        }
    }

    if let Some(section) = open.and_then(OpenSection::finish) {
        sections.push(section);
    }

    sections
}
