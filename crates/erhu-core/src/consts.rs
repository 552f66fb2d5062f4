use embedded_graphics::pixelcolor::BinaryColor;

pub type ColorType = BinaryColor;

pub const WIDTH: u32 = 128;
pub const HEIGHT: u32 = 64;

/// Inner string, D4.
pub const INNER_HZ: f32 = 293.66;
/// Outer string, A4.
pub const OUTER_HZ: f32 = 440.00;

pub const VOLUME_DEFAULT_STEPS: u8 = 10;
pub const VOLUME_MAX_STEPS: u8 = 20;
pub const VOLUME_STEP_PERCENT: u8 = 5;

/// Bounded wait for the shared speaker before giving up silently.
pub const SPEAKER_ACQUIRE_TIMEOUT_MS: u32 = 1000;

/// Main loop cadence while waiting for input.
pub const IDLE_POLL_MS: u32 = 50;

/// Hold time after which a key press counts as a long press.
pub const KEY_LONG_PRESS_MS: u32 = 350;
/// Interval between repeat events while a key stays held.
pub const KEY_REPEAT_MS: u32 = 150;

/// Status line is cut to this many characters before display.
pub const STATUS_LINE_MAX: usize = 20;
