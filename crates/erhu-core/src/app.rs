//! Application state and the key-event state machine.

use embedded_graphics::prelude::DrawTarget;

use crate::{
    consts,
    input::{Key, KeyEvent, KeyEventKind},
    screen,
    speaker::{Speaker, SpeakerGrant},
};

/// Which erhu string the tone targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringSelection {
    /// Inner string, D4.
    Inner,
    /// Outer string, A4.
    Outer,
}

impl StringSelection {
    pub fn frequency_hz(self) -> f32 {
        match self {
            StringSelection::Inner => consts::INNER_HZ,
            StringSelection::Outer => consts::OUTER_HZ,
        }
    }
}

/// Output volume as a step count in 0..=20, so the 5% quantization and the
/// [0, 1] clamp hold exactly under any amount of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volume {
    steps: u8,
}

impl Volume {
    pub const fn default_level() -> Self {
        Self {
            steps: consts::VOLUME_DEFAULT_STEPS,
        }
    }

    pub fn up(&mut self) {
        if self.steps < consts::VOLUME_MAX_STEPS {
            self.steps += 1;
        }
    }

    pub fn down(&mut self) {
        self.steps = self.steps.saturating_sub(1);
    }

    pub fn as_fraction(self) -> f32 {
        f32::from(self.steps) / f32::from(consts::VOLUME_MAX_STEPS)
    }

    pub fn percent(self) -> u8 {
        self.steps * consts::VOLUME_STEP_PERCENT
    }
}

pub struct App {
    pub(crate) volume: Volume,
    pub(crate) selection: StringSelection,
    grant: Option<SpeakerGrant>,
    pub(crate) playing: bool,
    running: bool,
}

impl App {
    pub fn new() -> Self {
        Self {
            volume: Volume::default_level(),
            selection: StringSelection::Outer,
            grant: None,
            playing: false,
            running: true,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn selection(&self) -> StringSelection {
        self.selection
    }

    /// Drive one key event through the transition table.
    pub fn handle_key(&mut self, event: KeyEvent, speaker: &mut dyn Speaker) {
        match event.kind {
            KeyEventKind::Short | KeyEventKind::Repeat => match event.key {
                Key::Left => {
                    self.selection = StringSelection::Inner;
                    log::debug!("selected inner string");
                }
                Key::Right => {
                    self.selection = StringSelection::Outer;
                    log::debug!("selected outer string");
                }
                Key::Ok => self.toggle(speaker),
                Key::Up => {
                    self.volume.up();
                    log::debug!("volume {}%", self.volume.percent());
                    if self.playing {
                        self.play(speaker);
                    }
                }
                Key::Down => {
                    self.volume.down();
                    log::debug!("volume {}%", self.volume.percent());
                    if self.playing {
                        self.play(speaker);
                    }
                }
                // short Back does nothing, not even a stop
                Key::Back => {}
            },
            KeyEventKind::Long => {
                if event.key == Key::Back {
                    log::info!("quit requested");
                    self.running = false;
                }
            }
        }
    }

    /// Start the tone, or retune a running one with the current volume.
    ///
    /// A grant kept from an earlier start is reused; otherwise ownership is
    /// acquired with a bounded wait. Failure to acquire leaves the app in
    /// Ready with no error surfaced beyond a log line.
    fn play(&mut self, speaker: &mut dyn Speaker) {
        if self.grant.is_none() {
            self.grant = speaker.acquire(consts::SPEAKER_ACQUIRE_TIMEOUT_MS);
            if self.grant.is_none() {
                log::warn!("speaker unavailable, staying silent");
                return;
            }
        }
        if let Some(grant) = &self.grant {
            let frequency_hz = self.selection.frequency_hz();
            speaker.start(grant, frequency_hz, self.volume.as_fraction());
            self.playing = true;
            log::info!(
                "tone {} Hz at {}%",
                frequency_hz,
                self.volume.percent()
            );
        }
    }

    /// Stop tone generation. Always leaves the app in Ready, even if the
    /// output was taken away underneath us.
    fn stop(&mut self, speaker: &mut dyn Speaker) {
        if self.playing {
            if let Some(grant) = &self.grant {
                speaker.stop(grant);
            }
            log::info!("tone stopped");
        }
        self.playing = false;
    }

    fn toggle(&mut self, speaker: &mut dyn Speaker) {
        if self.playing {
            self.stop(speaker);
        } else {
            self.play(speaker);
        }
    }

    /// Force the tone off and give the speaker back. Single exit path.
    pub fn shutdown(&mut self, speaker: &mut dyn Speaker) {
        self.stop(speaker);
        if let Some(grant) = self.grant.take() {
            speaker.release(grant);
        }
        self.running = false;
    }

    pub fn render<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = consts::ColorType>,
    {
        screen::draw(self, target)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;
    use crate::speaker::Arbiter;

    /// Recording speaker double backed by the real arbiter.
    struct FakeSpeaker {
        arbiter: Arbiter,
        acquire_fails: bool,
        starts: Vec<(f32, f32)>,
        stops: usize,
        releases: usize,
    }

    impl FakeSpeaker {
        fn new() -> Self {
            Self {
                arbiter: Arbiter::new(),
                acquire_fails: false,
                starts: Vec::new(),
                stops: 0,
                releases: 0,
            }
        }

        fn last_start(&self) -> (f32, f32) {
            *self.starts.last().expect("no tone was started")
        }
    }

    impl Speaker for FakeSpeaker {
        fn acquire(&mut self, _timeout_ms: u32) -> Option<SpeakerGrant> {
            if self.acquire_fails {
                None
            } else {
                self.arbiter.try_claim()
            }
        }

        fn start(&mut self, grant: &SpeakerGrant, frequency_hz: f32, volume: f32) {
            if self.arbiter.is_current(grant) {
                self.starts.push((frequency_hz, volume));
            }
        }

        fn stop(&mut self, grant: &SpeakerGrant) {
            if self.arbiter.is_current(grant) {
                self.stops += 1;
            }
        }

        fn release(&mut self, grant: SpeakerGrant) {
            self.arbiter.release(grant);
            self.releases += 1;
        }
    }

    fn short(key: Key) -> KeyEvent {
        KeyEvent {
            key,
            kind: KeyEventKind::Short,
        }
    }

    fn long(key: Key) -> KeyEvent {
        KeyEvent {
            key,
            kind: KeyEventKind::Long,
        }
    }

    #[test]
    fn fresh_state_defaults() {
        let app = App::new();
        assert_eq!(app.selection(), StringSelection::Outer);
        assert_eq!(app.volume().percent(), 50);
        assert!(!app.playing());
        assert!(app.running());
    }

    #[test]
    fn volume_clamps_at_both_ends() {
        let mut app = App::new();
        let mut speaker = FakeSpeaker::new();

        for _ in 0..40 {
            app.handle_key(short(Key::Up), &mut speaker);
        }
        assert_eq!(app.volume().percent(), 100);
        assert_eq!(app.volume().as_fraction(), 1.0);

        for _ in 0..40 {
            app.handle_key(short(Key::Down), &mut speaker);
        }
        assert_eq!(app.volume().percent(), 0);
        assert_eq!(app.volume().as_fraction(), 0.0);
    }

    #[test]
    fn selection_follows_last_left_right() {
        let mut app = App::new();
        let mut speaker = FakeSpeaker::new();

        for key in [Key::Left, Key::Right, Key::Left, Key::Left, Key::Right] {
            app.handle_key(short(key), &mut speaker);
        }
        assert_eq!(app.selection(), StringSelection::Outer);

        app.handle_key(short(Key::Left), &mut speaker);
        assert_eq!(app.selection(), StringSelection::Inner);
    }

    #[test]
    fn toggle_stays_ready_while_acquire_fails() {
        let mut app = App::new();
        let mut speaker = FakeSpeaker::new();
        speaker.acquire_fails = true;

        app.handle_key(short(Key::Ok), &mut speaker);
        assert!(!app.playing());

        app.handle_key(short(Key::Ok), &mut speaker);
        assert!(!app.playing());
        assert!(speaker.starts.is_empty());
    }

    #[test]
    fn volume_change_restarts_tone_only_while_playing() {
        let mut app = App::new();
        let mut speaker = FakeSpeaker::new();

        // not playing: volume moves, no tone
        app.handle_key(short(Key::Up), &mut speaker);
        assert!(speaker.starts.is_empty());

        app.handle_key(short(Key::Ok), &mut speaker);
        let starts_after_play = speaker.starts.len();

        app.handle_key(short(Key::Down), &mut speaker);
        assert_eq!(speaker.starts.len(), starts_after_play + 1);
        assert_eq!(speaker.last_start(), (consts::OUTER_HZ, 0.5));
    }

    #[test]
    fn selection_change_does_not_retune_active_tone() {
        let mut app = App::new();
        let mut speaker = FakeSpeaker::new();

        app.handle_key(short(Key::Ok), &mut speaker);
        let starts_before = speaker.starts.len();

        app.handle_key(short(Key::Left), &mut speaker);
        assert_eq!(app.selection(), StringSelection::Inner);
        assert_eq!(speaker.starts.len(), starts_before);
        assert_eq!(speaker.last_start().0, consts::OUTER_HZ);
    }

    #[test]
    fn short_back_is_a_no_op() {
        let mut app = App::new();
        let mut speaker = FakeSpeaker::new();

        app.handle_key(short(Key::Ok), &mut speaker);
        app.handle_key(short(Key::Back), &mut speaker);

        assert!(app.playing());
        assert!(app.running());
    }

    #[test]
    fn full_session() {
        let mut app = App::new();
        let mut speaker = FakeSpeaker::new();

        // fresh start
        assert_eq!(app.selection(), StringSelection::Outer);
        assert!(!app.playing());

        // OK starts the outer string at half volume
        app.handle_key(short(Key::Ok), &mut speaker);
        assert!(app.playing());
        assert_eq!(speaker.last_start(), (consts::OUTER_HZ, 0.5));

        // five downs land at 25% with the tone restarted
        for _ in 0..5 {
            app.handle_key(short(Key::Down), &mut speaker);
        }
        assert_eq!(app.volume().percent(), 25);
        assert_eq!(speaker.last_start(), (consts::OUTER_HZ, 0.25));

        // selecting the inner string leaves the running tone alone
        app.handle_key(short(Key::Left), &mut speaker);
        assert_eq!(app.selection(), StringSelection::Inner);
        assert_eq!(speaker.last_start().0, consts::OUTER_HZ);

        // OK stops
        app.handle_key(short(Key::Ok), &mut speaker);
        assert!(!app.playing());
        assert_eq!(speaker.stops, 1);

        // holding Back quits; teardown forces the speaker off and
        // releases the grant
        app.handle_key(long(Key::Back), &mut speaker);
        assert!(!app.running());

        app.shutdown(&mut speaker);
        assert_eq!(speaker.releases, 1);
        assert!(speaker.arbiter.try_claim().is_some());
    }

    #[test]
    fn shutdown_while_playing_stops_the_tone() {
        let mut app = App::new();
        let mut speaker = FakeSpeaker::new();

        app.handle_key(short(Key::Ok), &mut speaker);
        assert!(app.playing());

        app.shutdown(&mut speaker);
        assert!(!app.playing());
        assert!(!app.running());
        assert_eq!(speaker.stops, 1);
        assert_eq!(speaker.releases, 1);
    }

    #[test]
    fn grant_survives_stop_and_is_reused() {
        let mut app = App::new();
        let mut speaker = FakeSpeaker::new();

        app.handle_key(short(Key::Ok), &mut speaker);
        app.handle_key(short(Key::Ok), &mut speaker);

        // second play must not re-acquire: the arbiter still shows the
        // first claim as live
        speaker.acquire_fails = true;
        app.handle_key(short(Key::Ok), &mut speaker);
        assert!(app.playing());
    }
}
