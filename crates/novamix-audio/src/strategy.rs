//! Volume-control tool selection.

use std::fmt;

/// External tool used to set a sink's playback volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeTool {
    /// `pactl set-sink-volume` via the PulseAudio compatibility layer
    Pactl,
    /// `pw-cli set-param … Props` against the node directly
    PwCli,
}

impl VolumeTool {
    /// Build the invocation setting `node` to `percent`.
    #[must_use]
    pub fn command(self, node: &str, percent: u8) -> (&'static str, Vec<String>) {
        match self {
            Self::Pactl => (
                "pactl",
                vec!["set-sink-volume".to_string(), node.to_string(), format!("{percent}%")],
            ),
            Self::PwCli => (
                "pw-cli",
                vec![
                    "set-param".to_string(),
                    node.to_string(),
                    "Props".to_string(),
                    format!("{{ \"volume\": {} }}", f32::from(percent) / 100.0),
                ],
            ),
        }
    }
}

impl fmt::Display for VolumeTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pactl => f.write_str("pactl"),
            Self::PwCli => f.write_str("pw-cli"),
        }
    }
}

/// The tool in use for this session.
///
/// Starts on whichever tool passed the startup probe. The only transition is
/// [`VolumeStrategy::downgrade`] from [`VolumeTool::Pactl`] to
/// [`VolumeTool::PwCli`]; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeStrategy {
    tool: VolumeTool,
}

impl VolumeStrategy {
    /// Primary tool, tried first at startup.
    pub const PRIMARY: VolumeTool = VolumeTool::Pactl;
    /// Fallback tool.
    pub const FALLBACK: VolumeTool = VolumeTool::PwCli;

    #[must_use]
    pub fn new(tool: VolumeTool) -> Self {
        Self { tool }
    }

    #[must_use]
    pub fn tool(&self) -> VolumeTool {
        self.tool
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.tool == Self::PRIMARY
    }

    /// Switch to the fallback tool. Returns whether anything changed.
    pub fn downgrade(&mut self) -> bool {
        let changed = self.is_primary();
        self.tool = Self::FALLBACK;
        changed
    }
}
