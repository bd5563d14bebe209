use bitflags::bitflags;

bitflags! {
    /// Independent boolean component states.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct State: u16 {
        /// Keyboard focus.
        const FOCUSED = 0x001;
        /// Pressed or otherwise active.
        const ACTIVE = 0x002;
        /// Checkboxes and radio buttons.
        const CHECKED = 0x004;
        /// Selected within a collection.
        const SELECTED = 0x008;
        /// Editable controls that refuse edits.
        const READONLY = 0x010;
        /// Refuses interaction.
        const DISABLED = 0x020;
        /// Tri-state checkboxes.
        const INDETERMINATE = 0x040;
        /// Expanded dropdowns and menus.
        const OPENED = 0x080;
    }
}

/// The current states of a component, filtered by the subset it supports.
///
/// The current set is always contained in the supported set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMask {
    /// Currently enabled states.
    current: State,
    /// States this instance honors.
    supported: State,
}

impl Default for StateMask {
    fn default() -> Self {
        Self {
            current: State::empty(),
            supported: State::all(),
        }
    }
}

impl StateMask {
    /// The currently enabled states.
    pub fn current(&self) -> State {
        self.current
    }

    /// The supported states.
    pub fn supported(&self) -> State {
        self.supported
    }

    /// Are all states in `mask` enabled?
    pub fn has(&self, mask: State) -> bool {
        !mask.is_empty() && self.current.contains(mask)
    }

    /// Are all states in `mask` supported?
    pub fn is_supported(&self, mask: State) -> bool {
        !mask.is_empty() && self.supported.contains(mask)
    }

    /// Enable or disable `mask`. Returns true only if the set actually
    /// changed: unsupported states and no-op requests return false.
    pub fn set(&mut self, mask: State, enabled: bool) -> bool {
        if !self.is_supported(mask) {
            return false;
        }
        if enabled == self.has(mask) && (enabled || !self.current.intersects(mask)) {
            return false;
        }
        self.current.set(mask, enabled);
        true
    }

    /// Enable or disable support for `mask`. Withdrawing support clears any
    /// of those states that are currently enabled.
    pub fn set_supported(&mut self, mask: State, supported: bool) {
        if !supported {
            self.current.remove(mask);
        }
        self.supported.set(mask, supported);
    }

    /// Replace the current states wholesale, without per-state change
    /// tracking. Used by renderers when adopting existing markup. Bits outside
    /// the supported set are dropped.
    pub fn set_raw(&mut self, mask: State) {
        self.current = mask & self.supported;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_the_default_supported_set() {
        let m = StateMask::default();
        assert_eq!(m.supported(), State::all());
        assert!(m.current().is_empty());
        assert!(m.is_supported(State::OPENED | State::CHECKED));
    }

    #[test]
    fn set_reports_real_changes_only() {
        let mut m = StateMask::default();
        assert!(m.set(State::CHECKED, true));
        assert!(!m.set(State::CHECKED, true));
        assert!(m.has(State::CHECKED));
        assert!(m.set(State::CHECKED, false));
        assert!(!m.set(State::CHECKED, false));
        assert!(!m.has(State::CHECKED));
    }

    #[test]
    fn unsupported_states_are_rejected() {
        let mut m = StateMask::default();
        m.set_supported(State::DISABLED, false);
        assert!(!m.set(State::DISABLED, true));
        assert!(!m.has(State::DISABLED));
        assert!(m.set(State::FOCUSED, true));
    }

    #[test]
    fn withdrawing_support_clears_state() {
        let mut m = StateMask::default();
        m.set(State::SELECTED, true);
        m.set_supported(State::SELECTED, false);
        assert!(!m.has(State::SELECTED));
        assert!(!m.is_supported(State::SELECTED));
        m.set_supported(State::SELECTED, true);
        assert!(!m.has(State::SELECTED));
    }

    #[test]
    fn set_raw_keeps_current_within_supported() {
        let mut m = StateMask::default();
        m.set_supported(State::OPENED, false);
        m.set_raw(State::OPENED | State::ACTIVE);
        assert_eq!(m.current(), State::ACTIVE);
        assert_eq!(m.current() & !m.supported(), State::empty());
    }

    #[test]
    fn multi_bit_masks() {
        let mut m = StateMask::default();
        m.set(State::ACTIVE, true);
        assert!(!m.has(State::ACTIVE | State::FOCUSED));
        assert!(m.set(State::ACTIVE | State::FOCUSED, true));
        assert!(m.has(State::ACTIVE | State::FOCUSED));
        m.set(State::FOCUSED, false);
        // Partially enabled masks can still be cleared.
        assert!(m.set(State::ACTIVE | State::FOCUSED, false));
        assert!(m.current().is_empty());
    }
}
