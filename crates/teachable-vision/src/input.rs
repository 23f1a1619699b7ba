//! Key map for press-and-hold training gestures.

use crate::mode::ModeCell;
use crate::types::{Label, Mode};

/// Maps digit keys `1..=num_classes` to training labels.
#[derive(Debug, Clone, Copy)]
pub struct KeyMap {
    num_classes: usize,
}

impl KeyMap {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes: num_classes.min(9),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Label held by `key`, if it is one of the mapped digits.
    pub fn label_for(&self, key: char) -> Option<Label> {
        let digit = key.to_digit(10)? as usize;
        if (1..=self.num_classes).contains(&digit) {
            Some(Label(digit - 1))
        } else {
            None
        }
    }

    /// Key-down: mapped digits start training that label, others are ignored.
    pub fn key_down(&self, mode: &ModeCell, key: char) {
        if let Some(label) = self.label_for(key) {
            mode.set(Mode::Training(label));
        }
    }

    /// Key-up: any release returns to idle.
    pub fn key_up(&self, mode: &ModeCell) {
        mode.set(Mode::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_map_to_zero_based_labels() {
        let keys = KeyMap::new(5);
        assert_eq!(keys.label_for('1'), Some(Label(0)));
        assert_eq!(keys.label_for('5'), Some(Label(4)));
        assert_eq!(keys.label_for('6'), None);
        assert_eq!(keys.label_for('0'), None);
        assert_eq!(keys.label_for('a'), None);
    }

    #[test]
    fn test_press_and_release() {
        let keys = KeyMap::new(5);
        let mode = ModeCell::new();

        keys.key_down(&mode, '3');
        assert_eq!(mode.get(), Mode::Training(Label(2)));

        // Unmapped key leaves the current hold in place.
        keys.key_down(&mode, 'x');
        assert_eq!(mode.get(), Mode::Training(Label(2)));

        keys.key_down(&mode, '1');
        assert_eq!(mode.get(), Mode::Training(Label(0)));

        keys.key_up(&mode);
        assert_eq!(mode.get(), Mode::Idle);
    }

    #[test]
    fn test_caps_at_nine_classes() {
        assert_eq!(KeyMap::new(20).num_classes(), 9);
    }
}
