#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PressEvent {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ButtonVisual {
    Idle,
    Pressed,
}

impl ButtonVisual {
    pub fn glyph(self) -> &'static str {
        match self {
            ButtonVisual::Idle => "🔔",
            ButtonVisual::Pressed => "🔕",
        }
    }

    pub fn text_rgb(self) -> [u8; 3] {
        match self {
            ButtonVisual::Idle => [68, 68, 68],
            ButtonVisual::Pressed => [255, 255, 255],
        }
    }
}

/// Turns a per-frame "is the pointer held on the button" flag into edges.
/// Scheduling hangs off `Down`; `Up` (release or cancel) only restores visuals.
#[derive(Debug, Default)]
pub struct PressTracker {
    held: bool,
}

impl PressTracker {
    pub fn update(&mut self, held_now: bool) -> Option<PressEvent> {
        let event = match (self.held, held_now) {
            (false, true) => Some(PressEvent::Down),
            (true, false) => Some(PressEvent::Up),
            _ => None,
        };
        self.held = held_now;
        event
    }

    pub fn visual(&self) -> ButtonVisual {
        if self.held {
            ButtonVisual::Pressed
        } else {
            ButtonVisual::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holding_fires_down_once_then_up_on_release() {
        let mut tracker = PressTracker::default();
        assert_eq!(tracker.update(false), None);
        assert_eq!(tracker.update(true), Some(PressEvent::Down));
        assert_eq!(tracker.visual(), ButtonVisual::Pressed);
        assert_eq!(tracker.update(true), None);
        assert_eq!(tracker.update(true), None);
        assert_eq!(tracker.update(false), Some(PressEvent::Up));
        assert_eq!(tracker.visual(), ButtonVisual::Idle);
    }

    #[test]
    fn pressed_visual_uses_white_text() {
        assert_eq!(ButtonVisual::Pressed.text_rgb(), [255, 255, 255]);
        assert_ne!(ButtonVisual::Idle.glyph(), ButtonVisual::Pressed.glyph());
    }
}
