use std::collections::HashMap;
use std::time::{Duration, Instant};

use embedded_graphics::prelude::Size;
use embedded_graphics_simulator::sdl2::Keycode;
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
};
use erhu_core::app::App;
use erhu_core::consts;
use erhu_core::input::{ALL_KEYS, Key, KeyClassifier};

mod log_capture;
mod speaker;

fn keycode_to_key(keycode: Keycode) -> Option<Key> {
    match keycode {
        Keycode::Up | Keycode::W => Some(Key::Up),
        Keycode::Down | Keycode::S => Some(Key::Down),
        Keycode::Left | Keycode::A => Some(Key::Left),
        Keycode::Right | Keycode::D => Some(Key::Right),
        Keycode::Return | Keycode::J => Some(Key::Ok),
        Keycode::Backspace | Keycode::K => Some(Key::Back),
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    log_capture::init();

    let mut display =
        SimulatorDisplay::<consts::ColorType>::new(Size::new(consts::WIDTH, consts::HEIGHT));
    let settings = OutputSettingsBuilder::new()
        .theme(BinaryColorTheme::LcdWhite)
        .scale(4)
        .pixel_spacing(0)
        .build();

    let mut window = Window::new("erhu-desktop", &settings);
    let mut app = App::new();
    let mut speaker = speaker::DesktopSpeaker::new();
    let mut classifier = KeyClassifier::new();

    let mut key_pressed: HashMap<Key, bool> = HashMap::new();
    let mut last_tick = Instant::now();

    log::info!("erhu tuner starting (desktop)");
    window.update(&display);

    'running: loop {
        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown {
                    keycode,
                    repeat: false,
                    ..
                } => {
                    if let Some(key) = keycode_to_key(keycode) {
                        key_pressed.insert(key, true);
                    }
                }
                SimulatorEvent::KeyUp { keycode, .. } => {
                    if let Some(key) = keycode_to_key(keycode) {
                        key_pressed.insert(key, false);
                    }
                }
                _ => (),
            }
        }

        let elapsed_ms = last_tick.elapsed().as_millis() as u32;
        last_tick = Instant::now();

        // SDL's own key repeat is ignored above; the classifier synthesizes
        // short/long/repeat from the held state instead, exactly as the
        // device firmware does.
        for key in ALL_KEYS {
            let pressed = key_pressed.get(&key).copied().unwrap_or(false);
            if let Some(event) = classifier.update(key, pressed, elapsed_ms) {
                app.handle_key(event, &mut speaker);
            }
        }

        if !app.running() {
            break;
        }

        app.render(&mut display)?;
        window.update(&display);

        std::thread::sleep(Duration::from_millis(u64::from(consts::IDLE_POLL_MS)));
    }

    app.shutdown(&mut speaker);
    log::info!("erhu tuner exiting");
    Ok(())
}
