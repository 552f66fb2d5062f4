//! Tone output on the piezo speaker via a LEDC PWM channel.
//!
//! A dedicated worker thread owns the LEDC drivers and applies tone changes
//! published through shared atomics. Volume maps to duty cycle in
//! [0, max_duty/2]; duty 0 is silence. LEDC takes whole hertz, so tone
//! frequencies are rounded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::{self, JoinHandle};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::ledc::{
    LedcChannel, LedcDriver, LedcTimer, LedcTimerDriver, Resolution, config::TimerConfig,
};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;

use erhu_core::speaker::{Arbiter, Speaker, SpeakerGrant};

use super::SpeakerPeripherals;

/// Shared tone state; the PWM worker thread applies changes.
#[derive(Clone)]
struct ToneControl {
    frequency_hz: Arc<AtomicU32>,
    volume_permille: Arc<AtomicU32>,
    /// Bumped on every command so the worker picks up same-value rewrites.
    version: Arc<AtomicU32>,
}

impl ToneControl {
    fn new() -> Self {
        Self {
            frequency_hz: Arc::new(AtomicU32::new(0)),
            volume_permille: Arc::new(AtomicU32::new(0)),
            version: Arc::new(AtomicU32::new(0)),
        }
    }

    fn set_tone(&self, frequency_hz: f32, volume: f32) {
        let frequency = frequency_hz.round().max(1.0) as u32;
        let permille = (volume.clamp(0.0, 1.0) * 1000.0) as u32;
        self.frequency_hz.store(frequency, Ordering::Relaxed);
        self.volume_permille.store(permille, Ordering::Relaxed);
        self.version.fetch_add(1, Ordering::Release);
    }

    fn silence(&self) {
        self.volume_permille.store(0, Ordering::Relaxed);
        self.version.fetch_add(1, Ordering::Release);
    }
}

pub struct EspSpeaker {
    arbiter: Arbiter,
    control: ToneControl,
    #[allow(dead_code)]
    worker_thread: JoinHandle<()>,
}

impl EspSpeaker {
    pub fn new<T, C, P>(peripherals: SpeakerPeripherals<T, C, P>) -> Self
    where
        T: LedcTimer<SpeedMode = esp_idf_hal::ledc::LowSpeed> + Send + 'static,
        T: Peripheral<P = T>,
        C: LedcChannel<SpeedMode = esp_idf_hal::ledc::LowSpeed> + Send + 'static,
        C: Peripheral<P = C>,
        P: OutputPin + Send + 'static,
    {
        let control = ToneControl::new();
        let control_thread = control.clone();

        let worker_thread = thread::Builder::new()
            .name("tone_pwm".to_string())
            .stack_size(4096)
            .spawn(move || {
                tone_worker_thread(peripherals, control_thread);
            })
            .expect("Failed to spawn tone PWM worker thread");

        Self {
            arbiter: Arbiter::new(),
            control,
            worker_thread,
        }
    }
}

impl Speaker for EspSpeaker {
    fn acquire(&mut self, timeout_ms: u32) -> Option<SpeakerGrant> {
        let mut waited_ms = 0;
        loop {
            if let Some(grant) = self.arbiter.try_claim() {
                return Some(grant);
            }
            if waited_ms >= timeout_ms {
                return None;
            }
            FreeRtos::delay_ms(10);
            waited_ms += 10;
        }
    }

    fn start(&mut self, grant: &SpeakerGrant, frequency_hz: f32, volume: f32) {
        if self.arbiter.is_current(grant) {
            self.control.set_tone(frequency_hz, volume);
        }
    }

    fn stop(&mut self, grant: &SpeakerGrant) {
        if self.arbiter.is_current(grant) {
            self.control.silence();
        }
    }

    fn release(&mut self, grant: SpeakerGrant) {
        if self.arbiter.is_current(&grant) {
            self.control.silence();
        }
        self.arbiter.release(grant);
    }
}

/// PWM worker thread - owns the LEDC drivers and applies published tones
fn tone_worker_thread<T, C, P>(peripherals: SpeakerPeripherals<T, C, P>, control: ToneControl)
where
    T: LedcTimer<SpeedMode = esp_idf_hal::ledc::LowSpeed>,
    T: Peripheral<P = T>,
    C: LedcChannel<SpeedMode = esp_idf_hal::ledc::LowSpeed>,
    C: Peripheral<P = C>,
    P: OutputPin,
{
    log::info!("tone PWM worker thread started");

    let mut timer_driver = LedcTimerDriver::new(
        peripherals.timer,
        &TimerConfig::new()
            .frequency(440.Hz().into())
            .resolution(Resolution::Bits10),
    )
    .expect("Failed to initialize speaker PWM timer");

    let mut channel_driver = LedcDriver::new(peripherals.channel, &timer_driver, peripherals.pin)
        .expect("Failed to initialize speaker PWM channel");

    let max_duty = channel_driver.get_max_duty();
    channel_driver.set_duty(0).unwrap();
    log::info!("speaker PWM initialized (max duty: {})", max_duty);

    let mut seen_version = 0;

    loop {
        let version = control.version.load(Ordering::Acquire);
        if version != seen_version {
            seen_version = version;

            let permille = control.volume_permille.load(Ordering::Relaxed);
            if permille == 0 {
                channel_driver.set_duty(0).unwrap();
                log::info!("tone off");
            } else {
                let frequency = control.frequency_hz.load(Ordering::Relaxed);
                timer_driver.set_frequency(Hertz(frequency)).ok();

                // half duty is the loudest square wave; scale down from there
                let duty = max_duty * permille / 2000;
                channel_driver.set_duty(duty).unwrap();
                log::info!("tone {} Hz (duty {})", frequency, duty);
            }
        }

        FreeRtos::delay_ms(5);
    }
}
