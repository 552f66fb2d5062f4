//! Key input from GPIOs.
//!
//! The driver polls the six active-low key pins once per tick and runs the
//! samples through the shared classifier, so the device produces the same
//! short/long/repeat events as the simulator.

use esp_idf_hal::gpio::{AnyInputPin, Input, PinDriver};

use erhu_core::input::{ALL_KEYS, Key, KeyClassifier, KeyEvent, NUM_KEYS};

use super::KeyPeripherals;

pub struct KeyDriver<'a> {
    pin_ok: PinDriver<'a, AnyInputPin, Input>,
    pin_back: PinDriver<'a, AnyInputPin, Input>,
    pin_up: PinDriver<'a, AnyInputPin, Input>,
    pin_down: PinDriver<'a, AnyInputPin, Input>,
    pin_left: PinDriver<'a, AnyInputPin, Input>,
    pin_right: PinDriver<'a, AnyInputPin, Input>,

    classifier: KeyClassifier,
}

impl<'a> KeyDriver<'a> {
    /// Keys are active-low (pressed = GPIO low).
    pub fn new(peripherals: KeyPeripherals) -> Self {
        let pin_ok = PinDriver::input(peripherals.key_ok).unwrap();
        let pin_back = PinDriver::input(peripherals.key_back).unwrap();
        let pin_up = PinDriver::input(peripherals.key_up).unwrap();
        let pin_down = PinDriver::input(peripherals.key_down).unwrap();
        let pin_left = PinDriver::input(peripherals.key_left).unwrap();
        let pin_right = PinDriver::input(peripherals.key_right).unwrap();

        log::info!("key driver initialized with {} keys", NUM_KEYS);

        Self {
            pin_ok,
            pin_back,
            pin_up,
            pin_down,
            pin_left,
            pin_right,
            classifier: KeyClassifier::new(),
        }
    }

    fn is_pressed(&self, key: Key) -> bool {
        match key {
            Key::Ok => self.pin_ok.is_low(),
            Key::Back => self.pin_back.is_low(),
            Key::Up => self.pin_up.is_low(),
            Key::Down => self.pin_down.is_low(),
            Key::Left => self.pin_left.is_low(),
            Key::Right => self.pin_right.is_low(),
        }
    }

    /// Sample every key and hand the resulting events to `handle`.
    pub fn poll(&mut self, elapsed_ms: u32, mut handle: impl FnMut(KeyEvent)) {
        for key in ALL_KEYS {
            let pressed = self.is_pressed(key);
            if let Some(event) = self.classifier.update(key, pressed, elapsed_ms) {
                handle(event);
            }
        }
    }
}
