//! Chat-mix balance sample and the game/chat split derived from it.

/// Highest raw position the dial reports.
pub const BALANCE_MAX: u8 = 100;

/// A game/chat volume split derived from one raw balance sample.
///
/// `game + chat == 100` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MixBalance {
    game: u8,
    chat: u8,
}

impl MixBalance {
    /// Derive the split from a raw dial reading.
    ///
    /// The dial reports 0 for full chat and 100 for full game; the game share
    /// is the raw value itself, clamped to the valid range.
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        let game = raw.min(BALANCE_MAX);
        Self { game, chat: BALANCE_MAX - game }
    }

    /// Game sink volume in percent.
    #[must_use]
    pub fn game_percent(&self) -> u8 {
        self.game
    }

    /// Chat sink volume in percent.
    #[must_use]
    pub fn chat_percent(&self) -> u8 {
        self.chat
    }

    /// Render the split as `[GGGG…CCCC]` with `width` cells.
    #[must_use]
    pub fn bar(&self, width: usize) -> String {
        let game_cells = usize::from(self.game) * width / usize::from(BALANCE_MAX);
        let mut out = String::with_capacity(width + 2);
        out.push('[');
        out.extend(std::iter::repeat_n('G', game_cells));
        out.extend(std::iter::repeat_n('C', width - game_cells));
        out.push(']');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(MixBalance::from_raw(0).game_percent(), 0);
        assert_eq!(MixBalance::from_raw(0).chat_percent(), 100);
        assert_eq!(MixBalance::from_raw(100).game_percent(), 100);
        assert_eq!(MixBalance::from_raw(100).chat_percent(), 0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let balance = MixBalance::from_raw(0xff);
        assert_eq!(balance.game_percent(), 100);
        assert_eq!(balance.chat_percent(), 0);
    }

    #[test]
    fn test_bar_rendering() {
        assert_eq!(MixBalance::from_raw(50).bar(4), "[GGCC]");
        assert_eq!(MixBalance::from_raw(0).bar(4), "[CCCC]");
        assert_eq!(MixBalance::from_raw(100).bar(40).len(), 42);
    }

    proptest! {
        #[test]
        fn prop_split_sums_to_hundred(raw in 0u8..=100) {
            let balance = MixBalance::from_raw(raw);
            prop_assert_eq!(balance.game_percent(), raw);
            prop_assert_eq!(u16::from(balance.game_percent()) + u16::from(balance.chat_percent()), 100);
        }
    }
}
