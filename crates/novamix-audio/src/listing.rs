//! Parsers for the sound server's node listings.
//!
//! Both parsers are tolerant: lines they do not understand are skipped and
//! an unmatched listing simply yields `None`.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Media class of a playback device.
pub const AUDIO_SINK_CLASS: &str = "Audio/Sink";

/// One node block from `pw-cli ls Node`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeEntry {
    /// PipeWire object ID
    pub id: u32,
    /// All `key = "value"` properties of the block
    pub properties: HashMap<String, String>,
}

impl NodeEntry {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.properties.get("node.name").map(String::as_str)
    }

    #[must_use]
    pub fn media_class(&self) -> Option<&str> {
        self.properties.get("media.class").map(String::as_str)
    }

    /// Whether this is an output sink whose name contains `pattern`.
    #[must_use]
    pub fn is_sink_matching(&self, pattern: &str) -> bool {
        self.media_class() == Some(AUDIO_SINK_CLASS)
            && self.name().is_some_and(|n| n.contains(pattern))
    }
}

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"^\s*id (\d+), type PipeWire:Interface:Node").expect("valid node header regex")
    })
}

/// Split `pw-cli ls Node` output into node blocks.
///
/// ```text
///     id 52, type PipeWire:Interface:Node/3
///         node.name = "alsa_output.usb-SteelSeries_Arctis_Nova_7-00.analog-stereo"
///         media.class = "Audio/Sink"
/// ```
#[must_use]
pub fn parse_pw_nodes(output: &str) -> Vec<NodeEntry> {
    let mut nodes = Vec::new();
    let mut current: Option<NodeEntry> = None;

    for line in output.lines() {
        if let Some(caps) = header_regex().captures(line) {
            if let Some(node) = current.take() {
                nodes.push(node);
            }
            current = caps[1].parse().ok().map(|id| NodeEntry { id, properties: HashMap::new() });
            continue;
        }

        let Some(node) = current.as_mut() else {
            continue;
        };
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"');
            let key = key.trim().trim_start_matches('*').trim();
            node.properties.insert(key.to_string(), value.to_string());
        }
    }

    if let Some(node) = current {
        nodes.push(node);
    }
    nodes
}

/// Find the name of the first sink in `pw-cli ls Node` output matching `pattern`.
#[must_use]
pub fn find_pw_sink(output: &str, pattern: &str) -> Option<String> {
    parse_pw_nodes(output)
        .into_iter()
        .find(|node| node.is_sink_matching(pattern))
        .and_then(|node| node.name().map(str::to_string))
}

/// Find the name of the first sink in `pactl list sinks short` output matching `pattern`.
///
/// Lines look like `52\talsa_output.usb-…\tPipeWire\ts24le 2ch 48000Hz\tSUSPENDED`.
#[must_use]
pub fn find_pactl_sink(output: &str, pattern: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .find(|name| name.contains(pattern))
        .map(str::to_string)
}
