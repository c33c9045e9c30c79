//! Feature identifiers and the on-device toggles we manage.

/// Feature identifier carried in byte 1 of every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureId {
    /// Chat-mix dial passthrough enable
    ChatMixEnable,
    /// Status (sonar) icon on the base station display
    SonarIcon,
    /// Chat-mix balance position (query and report)
    Balance,
    /// Headset volume
    Volume,
    /// Equalizer bands
    Eq,
    /// Equalizer preset
    EqPreset,
    /// Feature status report
    FeatureStatus,
    /// Observed on the wire, meaning unknown
    Reserved36,
    /// Observed on the wire, meaning unknown
    Reserved21,
    /// Anything else
    Unknown(u8),
}

impl FeatureId {
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x49 => Self::ChatMixEnable,
            0x8d => Self::SonarIcon,
            0x64 => Self::Balance,
            0x37 => Self::Volume,
            0x31 => Self::Eq,
            0x2e => Self::EqPreset,
            0x47 => Self::FeatureStatus,
            0x36 => Self::Reserved36,
            0x21 => Self::Reserved21,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::ChatMixEnable => 0x49,
            Self::SonarIcon => 0x8d,
            Self::Balance => 0x64,
            Self::Volume => 0x37,
            Self::Eq => 0x31,
            Self::EqPreset => 0x2e,
            Self::FeatureStatus => 0x47,
            Self::Reserved36 => 0x36,
            Self::Reserved21 => 0x21,
            Self::Unknown(byte) => byte,
        }
    }
}

/// A boolean feature the host switches on at startup and off at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toggle {
    /// Route the chat-mix dial position to the host
    ChatMix,
    /// Show the status icon on the base station
    SonarIcon,
}

impl Toggle {
    /// All toggles, in the order they are disabled at shutdown.
    pub const ALL: [Toggle; 2] = [Toggle::ChatMix, Toggle::SonarIcon];

    /// The wire feature this toggle controls.
    #[must_use]
    pub const fn feature(self) -> FeatureId {
        match self {
            Self::ChatMix => FeatureId::ChatMixEnable,
            Self::SonarIcon => FeatureId::SonarIcon,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ChatMix => "chat-mix",
            Self::SonarIcon => "sonar-icon",
        }
    }
}

/// Which toggles the device has acknowledged as enabled during this session.
///
/// Never read back from the device; only used to decide which disable
/// commands are needed on the way out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureState {
    chat_mix: bool,
    sonar_icon: bool,
}

impl FeatureState {
    #[must_use]
    pub fn is_enabled(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::ChatMix => self.chat_mix,
            Toggle::SonarIcon => self.sonar_icon,
        }
    }

    /// Record an acknowledged toggle.
    pub fn set(&mut self, toggle: Toggle, enabled: bool) {
        match toggle {
            Toggle::ChatMix => self.chat_mix = enabled,
            Toggle::SonarIcon => self.sonar_icon = enabled,
        }
    }

    /// Toggles currently marked enabled, in shutdown order.
    pub fn enabled(&self) -> impl Iterator<Item = Toggle> + '_ {
        Toggle::ALL.into_iter().filter(|t| self.is_enabled(*t))
    }
}
