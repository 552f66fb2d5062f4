//! Continuous tone on the host audio output.
//!
//! A dedicated thread owns the audio stream and reacts to start/stop
//! commands from the main loop; the tone itself is an infinite square wave
//! whose amplitude carries the volume.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::{Duration, Instant};

use erhu_core::speaker::{Arbiter, Speaker, SpeakerGrant};
use rodio::{OutputStream, Sink, Source};

const SAMPLE_RATE: u32 = 48000;
/// Full-volume amplitude; a raw square wave at 1.0 is unpleasant.
const PEAK_AMPLITUDE: f32 = 0.25;

// Square wave generator, unbounded
struct SquareWave {
    frequency: f32,
    amplitude: f32,
    sample_rate: u32,
    current_sample: usize,
}

impl SquareWave {
    fn new(frequency: f32, amplitude: f32, sample_rate: u32) -> Self {
        Self {
            frequency,
            amplitude,
            sample_rate,
            current_sample: 0,
        }
    }
}

impl Iterator for SquareWave {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let sample_position = self.current_sample as f32 / self.sample_rate as f32;
        let cycle_position = (sample_position * self.frequency) % 1.0;

        self.current_sample = self.current_sample.wrapping_add(1);

        // high for the first half of each cycle, low for the second
        if cycle_position < 0.5 {
            Some(self.amplitude)
        } else {
            Some(-self.amplitude)
        }
    }
}

impl Source for SquareWave {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

enum ToneCommand {
    Start { frequency_hz: f32, volume: f32 },
    Stop,
}

pub struct DesktopSpeaker {
    arbiter: Arbiter,
    command_tx: Sender<ToneCommand>,
}

impl DesktopSpeaker {
    pub fn new() -> Self {
        let (tx, rx) = channel::<ToneCommand>();

        thread::spawn(move || {
            tone_thread(rx);
        });

        Self {
            arbiter: Arbiter::new(),
            command_tx: tx,
        }
    }
}

impl Speaker for DesktopSpeaker {
    fn acquire(&mut self, timeout_ms: u32) -> Option<SpeakerGrant> {
        // this process is the only claimant on the host, but the bounded
        // wait is kept so the contract matches the device
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        loop {
            if let Some(grant) = self.arbiter.try_claim() {
                return Some(grant);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn start(&mut self, grant: &SpeakerGrant, frequency_hz: f32, volume: f32) {
        if self.arbiter.is_current(grant) {
            let _ = self.command_tx.send(ToneCommand::Start {
                frequency_hz,
                volume,
            });
        }
    }

    fn stop(&mut self, grant: &SpeakerGrant) {
        if self.arbiter.is_current(grant) {
            let _ = self.command_tx.send(ToneCommand::Stop);
        }
    }

    fn release(&mut self, grant: SpeakerGrant) {
        if self.arbiter.is_current(&grant) {
            let _ = self.command_tx.send(ToneCommand::Stop);
        }
        self.arbiter.release(grant);
    }
}

fn tone_thread(rx: Receiver<ToneCommand>) {
    let Ok((_stream, stream_handle)) = OutputStream::try_default() else {
        log::error!("no audio output available, tones will be silent");
        return;
    };

    let mut sink: Option<Sink> = None;

    while let Ok(command) = rx.recv() {
        match command {
            ToneCommand::Start {
                frequency_hz,
                volume,
            } => {
                // retune by replacing the running tone
                if let Some(old) = sink.take() {
                    old.stop();
                }
                match Sink::try_new(&stream_handle) {
                    Ok(new_sink) => {
                        new_sink.append(SquareWave::new(
                            frequency_hz,
                            PEAK_AMPLITUDE * volume,
                            SAMPLE_RATE,
                        ));
                        sink = Some(new_sink);
                    }
                    Err(e) => log::error!("failed to open audio sink: {e}"),
                }
            }
            ToneCommand::Stop => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
            }
        }
    }
}
