//! Timer engine for the Pomodoro Timer.
//!
//! This module provides the core timer functionality:
//! - Phase transitions (Work → ShortBreak / LongBreak → Work)
//! - Session counting on work completion
//! - Completion side effects (sound, notification)
//! - Sleep prevention held exactly while running
//! - One [`TimerEvent`] per mutation, consumed by the state exporter
//!
//! The engine itself has no clock. It is driven by [`super::runner::Runner`],
//! which serializes ticks and commands on one task.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::session::SessionTracker;
use crate::config::PomodoroConfig;
use crate::notification::{try_create_notifier, DisabledNotifier, Notifier};
use crate::power::{try_create_inhibitor, NoopSleepInhibitor, SleepInhibitor, SleepToken};
use crate::sound::{try_create_player, SilentSoundPlayer, SoundPlayer};
use crate::types::{
    BreakRotation, Command, CommandOutcome, Phase, PhaseDurations, PhaseState, TimerSnapshot,
};
use crate::ui::{LogRaiser, UiRaiser};

const SLEEP_REASON: &str = "Pomodoro timer running";

// ============================================================================
// TimerEvent
// ============================================================================

/// What kind of mutation produced a [`TimerEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Engine created; carries the initial state
    Initialized,
    Started,
    Paused,
    Reset,
    /// Explicit skip to the next phase
    Skipped {
        /// Whether leaving the phase counted a work session
        counted: bool,
    },
    /// One second elapsed
    Tick,
    /// A phase ran out and the engine moved on
    PhaseCompleted {
        completed: Phase,
    },
    /// The calendar day changed and the daily count restarted at zero
    DayRolledOver,
}

/// State-changed signal emitted after every mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerEvent {
    pub kind: ChangeKind,
    /// State after the mutation
    pub snapshot: TimerSnapshot,
}

impl TimerEvent {
    /// Returns true for events whose state must reach external readers.
    ///
    /// Everything but a plain countdown tick qualifies. The tick that
    /// reaches zero also qualifies: it is the only moment a finished phase
    /// is visible before the transition.
    pub fn is_transition(&self) -> bool {
        match self.kind {
            ChangeKind::Tick => self.snapshot.remaining_seconds == 0,
            _ => true,
        }
    }
}

// ============================================================================
// Settings & collaborators
// ============================================================================

/// Engine parameters derived from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub durations: PhaseDurations,
    pub sessions_before_long_break: u32,
    pub auto_start_next_phase: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&PomodoroConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &PomodoroConfig) -> Self {
        Self {
            durations: config.durations(),
            sessions_before_long_break: config.sessions_before_long_break,
            auto_start_next_phase: config.auto_start_next_phase,
        }
    }

    pub fn with_durations(mut self, durations: PhaseDurations) -> Self {
        self.durations = durations;
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start_next_phase = auto_start;
        self
    }
}

/// External systems the engine drives.
pub struct Collaborators {
    pub notifier: Box<dyn Notifier>,
    pub sound: Box<dyn SoundPlayer>,
    pub sleep: Box<dyn SleepInhibitor>,
    pub raiser: Box<dyn UiRaiser>,
}

impl Collaborators {
    /// Collaborators with no observable effect.
    pub fn inert() -> Self {
        Self {
            notifier: Box::new(DisabledNotifier),
            sound: Box::new(SilentSoundPlayer),
            sleep: Box::new(NoopSleepInhibitor),
            raiser: Box::new(LogRaiser),
        }
    }

    /// Real collaborators, each degrading to its inert version when unavailable.
    pub fn from_config(config: &PomodoroConfig) -> Self {
        Self {
            notifier: try_create_notifier(config.notifications_enabled),
            sound: try_create_player(config.sound_enabled),
            sleep: try_create_inhibitor(config.prevent_sleep),
            raiser: Box::new(LogRaiser),
        }
    }
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Timer engine that owns the phase state and the session tracker.
///
/// All methods take `&mut self`; exclusive ownership by the runner task is
/// what serializes ticks and commands.
pub struct TimerEngine {
    state: PhaseState,
    rotation: BreakRotation,
    sessions: SessionTracker,
    collaborators: Collaborators,
    sleep_token: Option<SleepToken>,
    auto_start: bool,
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerEngine {
    /// Creates a stopped engine at the start of a work phase.
    pub fn new(
        settings: EngineSettings,
        sessions: SessionTracker,
        collaborators: Collaborators,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        Self {
            state: PhaseState::new(settings.durations),
            rotation: BreakRotation::new(settings.sessions_before_long_break),
            sessions,
            collaborators,
            sleep_token: None,
            auto_start: settings.auto_start_next_phase,
            event_tx,
        }
    }

    /// Emits the initial state so the exporter writes it before any command.
    pub fn announce(&mut self) {
        self.emit(ChangeKind::Initialized);
    }

    /// Starts the countdown. No-op when running or when the phase is finished.
    pub fn start(&mut self) -> bool {
        if !self.state.start() {
            return false;
        }
        self.sync_sleep_prevention();
        info!(phase = self.state.phase().as_str(), "Timer started");
        self.emit(ChangeKind::Started);
        true
    }

    /// Pauses the countdown. No-op when stopped.
    pub fn pause(&mut self) -> bool {
        if !self.state.pause() {
            return false;
        }
        self.sync_sleep_prevention();
        info!(
            remaining_seconds = self.state.remaining_seconds(),
            "Timer paused"
        );
        self.emit(ChangeKind::Paused);
        true
    }

    /// Pauses when running, starts otherwise.
    pub fn toggle(&mut self) -> bool {
        if self.state.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Restores the full duration of the current phase and stops.
    pub fn reset(&mut self) -> bool {
        if !self.state.reset() {
            return false;
        }
        self.sync_sleep_prevention();
        info!(phase = self.state.phase().as_str(), "Timer reset");
        self.emit(ChangeKind::Reset);
        true
    }

    /// Moves to the next phase, stopped.
    ///
    /// Leaving a work phase counts a session when it was running or had
    /// already reached zero. Skipping an untouched or paused work phase
    /// does not.
    pub fn skip(&mut self) -> bool {
        let leaving = self.state.phase();
        let counted = leaving == Phase::Work
            && (self.state.is_running() || self.state.remaining_seconds() == 0);
        if counted {
            self.record_work_session();
        }

        let next = self.state.skip(&mut self.rotation);
        self.sync_sleep_prevention();
        info!(
            from = leaving.as_str(),
            to = next.as_str(),
            counted,
            "Phase skipped"
        );
        self.emit(ChangeKind::Skipped { counted });
        true
    }

    /// Advances the countdown by one second.
    ///
    /// When the phase was already due before this tick, runs the completion
    /// side effects and moves to the next phase. Returns the completed
    /// phase in that case.
    pub fn tick(&mut self) -> Option<Phase> {
        if !self.state.is_running() {
            return None;
        }
        self.refresh_day();

        let due = self.state.should_complete();
        self.state.tick();

        if !due {
            self.emit(ChangeKind::Tick);
            return None;
        }

        let completed = self.state.phase();
        self.handle_phase_complete(completed);
        Some(completed)
    }

    /// Restarts the daily count when the date has changed since the last
    /// check. Returns true, after emitting `DayRolledOver`, if it did.
    ///
    /// The runner calls this while the timer is idle so readers never see
    /// yesterday's count under a fresh timestamp.
    pub fn refresh_day(&mut self) -> bool {
        if !self.sessions.roll_over() {
            return false;
        }
        info!(date = %self.sessions.last_session_date(), "New day, session count reset");
        self.emit(ChangeKind::DayRolledOver);
        true
    }

    /// Forwards a raise request to the UI.
    pub fn raise(&self) {
        self.collaborators.raiser.raise();
    }

    /// Applies one external command.
    pub fn execute(&mut self, command: Command) -> CommandOutcome {
        let changed = match command {
            Command::Toggle => self.toggle(),
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Reset => self.reset(),
            Command::Skip => self.skip(),
            Command::Raise => {
                self.raise();
                false
            }
        };
        debug!(%command, changed, "Command applied");
        CommandOutcome::from_changed(changed)
    }

    /// Current observable state.
    pub fn snapshot(&mut self) -> TimerSnapshot {
        TimerSnapshot::capture(&self.state, self.sessions.today_count())
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Returns true while a sleep-prevention token is held.
    pub fn holds_sleep_token(&self) -> bool {
        self.sleep_token.is_some()
    }

    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    pub fn rotation(&self) -> &BreakRotation {
        &self.rotation
    }

    /// Mutable access to the phase state (for testing).
    #[cfg(test)]
    pub fn state_mut(&mut self) -> &mut PhaseState {
        &mut self.state
    }

    fn handle_phase_complete(&mut self, completed: Phase) {
        let session_count = if completed == Phase::Work {
            self.record_work_session()
        } else {
            self.sessions.today_count()
        };

        if let Err(e) = self
            .collaborators
            .sound
            .play_phase_change_sound(completed)
        {
            warn!(error = %e, "Failed to play phase-change sound");
        }
        if let Err(e) = self
            .collaborators
            .notifier
            .schedule_phase_complete_notification(completed, session_count)
        {
            warn!(error = %e, "Failed to schedule notification");
        }

        let next = self.state.skip(&mut self.rotation);
        if self.auto_start {
            self.state.start();
        }
        self.sync_sleep_prevention();

        info!(
            completed = completed.as_str(),
            next = next.as_str(),
            session_count,
            "Phase completed"
        );
        self.emit(ChangeKind::PhaseCompleted { completed });
    }

    fn record_work_session(&mut self) -> u32 {
        self.rotation.record_work_session();
        self.sessions.record_completion()
    }

    /// Acquires or releases sleep prevention to match the running flag.
    fn sync_sleep_prevention(&mut self) {
        match (self.state.is_running(), self.sleep_token.is_some()) {
            (true, false) => match self.collaborators.sleep.acquire(SLEEP_REASON) {
                Ok(token) => self.sleep_token = Some(token),
                Err(e) => warn!(error = %e, "Failed to prevent sleep"),
            },
            (false, true) => self.release_sleep_token(),
            _ => {}
        }
    }

    fn release_sleep_token(&mut self) {
        if let Some(token) = self.sleep_token.take() {
            self.collaborators.sleep.release(token);
        }
    }

    fn emit(&mut self, kind: ChangeKind) {
        let snapshot = self.snapshot();
        if self.event_tx.send(TimerEvent { kind, snapshot }).is_err() {
            debug!(?kind, "No state listener, event dropped");
        }
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.release_sleep_token();
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("state", &self.state)
            .field("rotation", &self.rotation)
            .field("sessions", &self.sessions)
            .field("holds_sleep_token", &self.sleep_token.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::daemon::session::{DailyCount, FixedClock, MemorySessionStore};
    use crate::notification::MockNotifier;
    use crate::power::MockSleepInhibitor;
    use crate::sound::MockSoundPlayer;
    use crate::ui::MockRaiser;

    struct Mocks {
        notifier: Arc<MockNotifier>,
        sound: Arc<MockSoundPlayer>,
        sleep: Arc<MockSleepInhibitor>,
        raiser: Arc<MockRaiser>,
        store: MemorySessionStore,
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn create_engine_with(
        settings: EngineSettings,
        store: MemorySessionStore,
    ) -> (TimerEngine, mpsc::UnboundedReceiver<TimerEvent>, Mocks) {
        create_engine_on(settings, store, FixedClock::new(today()))
    }

    fn create_engine_on(
        settings: EngineSettings,
        store: MemorySessionStore,
        clock: FixedClock,
    ) -> (TimerEngine, mpsc::UnboundedReceiver<TimerEvent>, Mocks) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mocks = Mocks {
            notifier: Arc::new(MockNotifier::new()),
            sound: Arc::new(MockSoundPlayer::new()),
            sleep: Arc::new(MockSleepInhibitor::new()),
            raiser: Arc::new(MockRaiser::new()),
            store,
        };
        let collaborators = Collaborators {
            notifier: Box::new(Arc::clone(&mocks.notifier)),
            sound: Box::new(Arc::clone(&mocks.sound)),
            sleep: Box::new(Arc::clone(&mocks.sleep)),
            raiser: Box::new(Arc::clone(&mocks.raiser)),
        };
        let sessions = SessionTracker::load(Box::new(mocks.store.clone()), Box::new(clock));
        let engine = TimerEngine::new(settings, sessions, collaborators, tx);
        (engine, rx, mocks)
    }

    /// Work 3s, short break 2s, long break 4s, long break every 4 sessions.
    fn create_engine() -> (TimerEngine, mpsc::UnboundedReceiver<TimerEvent>, Mocks) {
        let settings =
            EngineSettings::default().with_durations(PhaseDurations::from_secs(3, 2, 4));
        create_engine_with(settings, MemorySessionStore::new())
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TimerEvent>) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Ticks a running phase until it completes, returning the tick count.
    fn run_to_completion(engine: &mut TimerEngine) -> usize {
        let mut ticks = 0;
        loop {
            ticks += 1;
            if engine.tick().is_some() {
                return ticks;
            }
            assert!(ticks < 10_000, "phase never completed");
        }
    }

    // ------------------------------------------------------------------------
    // TimerEvent Tests
    // ------------------------------------------------------------------------

    mod timer_event_tests {
        use super::*;

        fn event(kind: ChangeKind, remaining_seconds: u32) -> TimerEvent {
            TimerEvent {
                kind,
                snapshot: TimerSnapshot {
                    phase: Phase::Work,
                    remaining_seconds,
                    total_seconds: 1500,
                    session_count: 0,
                    is_running: true,
                },
            }
        }

        #[test]
        fn test_plain_tick_is_not_transition() {
            assert!(!event(ChangeKind::Tick, 10).is_transition());
        }

        #[test]
        fn test_final_tick_is_transition() {
            assert!(event(ChangeKind::Tick, 0).is_transition());
        }

        #[test]
        fn test_commands_are_transitions() {
            assert!(event(ChangeKind::Started, 10).is_transition());
            assert!(event(ChangeKind::Paused, 10).is_transition());
            assert!(event(ChangeKind::Reset, 10).is_transition());
            assert!(event(ChangeKind::Skipped { counted: false }, 10).is_transition());
            assert!(event(
                ChangeKind::PhaseCompleted {
                    completed: Phase::Work
                },
                10
            )
            .is_transition());
            assert!(event(ChangeKind::DayRolledOver, 10).is_transition());
        }
    }

    // ------------------------------------------------------------------------
    // TimerEngine Tests
    // ------------------------------------------------------------------------

    mod timer_engine_tests {
        use super::*;

        #[test]
        fn test_new_engine() {
            let (mut engine, mut rx, _mocks) = create_engine();
            let snapshot = engine.snapshot();

            assert_eq!(snapshot.phase, Phase::Work);
            assert_eq!(snapshot.remaining_seconds, 3);
            assert_eq!(snapshot.session_count, 0);
            assert!(!snapshot.is_running);
            assert!(drain(&mut rx).is_empty());
        }

        #[test]
        fn test_announce_emits_initialized() {
            let (mut engine, mut rx, _mocks) = create_engine();
            engine.announce();
            let events = drain(&mut rx);
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, ChangeKind::Initialized);
        }

        #[test]
        fn test_start_emits_and_acquires_sleep() {
            let (mut engine, mut rx, mocks) = create_engine();

            assert!(engine.start());
            assert!(engine.is_running());
            assert!(engine.holds_sleep_token());
            assert_eq!(mocks.sleep.acquired(), 1);

            let events = drain(&mut rx);
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, ChangeKind::Started);
            assert!(events[0].snapshot.is_running);
        }

        #[test]
        fn test_start_twice_is_noop() {
            let (mut engine, mut rx, mocks) = create_engine();
            engine.start();
            drain(&mut rx);

            assert!(!engine.start());
            assert!(drain(&mut rx).is_empty());
            assert_eq!(mocks.sleep.acquired(), 1);
        }

        #[test]
        fn test_pause_releases_sleep() {
            let (mut engine, mut rx, mocks) = create_engine();
            engine.start();
            engine.tick();
            drain(&mut rx);

            assert!(engine.pause());
            assert!(!engine.holds_sleep_token());
            assert_eq!(mocks.sleep.released(), 1);
            assert_eq!(engine.state().remaining_seconds(), 2);

            let events = drain(&mut rx);
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, ChangeKind::Paused);
        }

        #[test]
        fn test_pause_twice_is_noop() {
            let (mut engine, mut rx, mocks) = create_engine();
            engine.start();
            engine.pause();
            drain(&mut rx);

            assert!(!engine.pause());
            assert!(drain(&mut rx).is_empty());
            assert_eq!(mocks.sleep.released(), 1);
        }

        #[test]
        fn test_toggle_flips() {
            let (mut engine, _rx, _mocks) = create_engine();
            assert!(engine.toggle());
            assert!(engine.is_running());
            assert!(engine.toggle());
            assert!(!engine.is_running());
        }

        #[test]
        fn test_reset_restores_duration() {
            let (mut engine, mut rx, mocks) = create_engine();
            engine.start();
            engine.tick();
            drain(&mut rx);

            assert!(engine.reset());
            assert_eq!(engine.state().remaining_seconds(), 3);
            assert!(!engine.is_running());
            assert_eq!(mocks.sleep.active(), 0);
            assert_eq!(drain(&mut rx)[0].kind, ChangeKind::Reset);

            assert!(!engine.reset());
            assert!(drain(&mut rx).is_empty());
        }

        #[test]
        fn test_tick_while_stopped_is_noop() {
            let (mut engine, mut rx, _mocks) = create_engine();
            for _ in 0..5 {
                assert_eq!(engine.tick(), None);
            }
            assert_eq!(engine.state().remaining_seconds(), 3);
            assert!(drain(&mut rx).is_empty());
        }

        #[test]
        fn test_final_second_is_observable_before_transition() {
            let (mut engine, mut rx, mocks) = create_engine();
            engine.start();

            // duration(Work) ticks reach zero while still running
            for _ in 0..3 {
                assert_eq!(engine.tick(), None);
            }
            assert!(engine.state().should_complete());
            assert_eq!(mocks.sound.play_count(), 0);

            let events = drain(&mut rx);
            let last = events.last().unwrap();
            assert_eq!(last.kind, ChangeKind::Tick);
            assert_eq!(last.snapshot.remaining_seconds, 0);
            assert!(last.snapshot.is_running);

            // the next tick completes
            assert_eq!(engine.tick(), Some(Phase::Work));
            assert_eq!(engine.state().phase(), Phase::ShortBreak);
            assert!(!engine.is_running());
        }

        #[test]
        fn test_completion_runs_side_effects_once() {
            let (mut engine, mut rx, mocks) = create_engine();
            engine.start();
            drain(&mut rx);

            assert_eq!(run_to_completion(&mut engine), 4);
            assert_eq!(mocks.sound.calls(), vec![Phase::Work]);
            assert_eq!(mocks.notifier.sent(), vec![(Phase::Work, 1)]);
            assert_eq!(engine.snapshot().session_count, 1);

            let completions: Vec<_> = drain(&mut rx)
                .into_iter()
                .filter(|e| matches!(e.kind, ChangeKind::PhaseCompleted { .. }))
                .collect();
            assert_eq!(completions.len(), 1);
            assert_eq!(completions[0].snapshot.phase, Phase::ShortBreak);
            assert_eq!(completions[0].snapshot.session_count, 1);

            // further ticks do nothing while the break waits to be started
            assert_eq!(engine.tick(), None);
            assert_eq!(mocks.sound.play_count(), 1);
        }

        #[test]
        fn test_completion_releases_sleep() {
            let (mut engine, _rx, mocks) = create_engine();
            engine.start();
            run_to_completion(&mut engine);

            assert!(!engine.holds_sleep_token());
            assert_eq!(mocks.sleep.acquired(), 1);
            assert_eq!(mocks.sleep.released(), 1);
        }

        #[test]
        fn test_break_completion_does_not_count_session() {
            let (mut engine, _rx, mocks) = create_engine();
            engine.start();
            run_to_completion(&mut engine);
            engine.start();
            assert_eq!(run_to_completion(&mut engine), 3);

            assert_eq!(engine.state().phase(), Phase::Work);
            assert_eq!(engine.snapshot().session_count, 1);
            assert_eq!(
                mocks.notifier.sent(),
                vec![(Phase::Work, 1), (Phase::ShortBreak, 1)]
            );
        }

        #[test]
        fn test_fourth_work_completion_goes_to_long_break() {
            let (mut engine, _rx, _mocks) = create_engine();
            let mut breaks = Vec::new();

            for _ in 0..4 {
                engine.start();
                run_to_completion(&mut engine);
                breaks.push(engine.state().phase());
                engine.skip();
            }

            assert_eq!(
                breaks,
                vec![
                    Phase::ShortBreak,
                    Phase::ShortBreak,
                    Phase::ShortBreak,
                    Phase::LongBreak
                ]
            );
        }

        #[test]
        fn test_rotation_from_count_three() {
            let (mut engine, _rx, _mocks) = create_engine();
            for _ in 0..3 {
                engine.rotation.record_work_session();
            }
            engine.start();
            run_to_completion(&mut engine);
            assert_eq!(engine.state().phase(), Phase::LongBreak);
        }

        #[test]
        fn test_auto_start_keeps_running_and_sleep_token() {
            let settings = EngineSettings::default()
                .with_durations(PhaseDurations::from_secs(3, 2, 4))
                .with_auto_start(true);
            let (mut engine, _rx, mocks) = create_engine_with(settings, MemorySessionStore::new());
            engine.start();
            run_to_completion(&mut engine);

            assert_eq!(engine.state().phase(), Phase::ShortBreak);
            assert!(engine.is_running());
            assert!(engine.holds_sleep_token());
            assert_eq!(mocks.sleep.active(), 1);
        }

        #[test]
        fn test_skip_running_work_counts_session() {
            let (mut engine, mut rx, mocks) = create_engine();
            engine.start();
            engine.tick();
            drain(&mut rx);

            assert!(engine.skip());
            assert_eq!(engine.state().phase(), Phase::ShortBreak);
            assert_eq!(engine.snapshot().session_count, 1);
            assert_eq!(mocks.sleep.active(), 0);
            assert_eq!(
                drain(&mut rx)[0].kind,
                ChangeKind::Skipped { counted: true }
            );
            // explicit skips are silent
            assert_eq!(mocks.sound.play_count(), 0);
            assert!(mocks.notifier.sent().is_empty());
        }

        #[test]
        fn test_skip_idle_work_does_not_count() {
            let (mut engine, mut rx, _mocks) = create_engine();
            assert!(engine.skip());
            assert_eq!(engine.state().phase(), Phase::ShortBreak);
            assert_eq!(engine.snapshot().session_count, 0);
            assert_eq!(
                drain(&mut rx)[0].kind,
                ChangeKind::Skipped { counted: false }
            );
        }

        #[test]
        fn test_skip_paused_work_does_not_count() {
            let (mut engine, _rx, _mocks) = create_engine();
            engine.start();
            engine.tick();
            engine.pause();
            engine.skip();
            assert_eq!(engine.snapshot().session_count, 0);
        }

        #[test]
        fn test_skip_finished_paused_work_counts() {
            let (mut engine, _rx, _mocks) = create_engine();
            engine.start();
            for _ in 0..3 {
                engine.tick();
            }
            engine.pause();
            assert_eq!(engine.state().remaining_seconds(), 0);
            assert!(!engine.start());

            engine.skip();
            assert_eq!(engine.snapshot().session_count, 1);
        }

        #[test]
        fn test_skip_break_does_not_count() {
            let (mut engine, _rx, _mocks) = create_engine();
            engine.skip();
            engine.start();
            engine.skip();
            assert_eq!(engine.state().phase(), Phase::Work);
            assert_eq!(engine.snapshot().session_count, 0);
        }

        #[test]
        fn test_session_count_continues_from_store() {
            let settings =
                EngineSettings::default().with_durations(PhaseDurations::from_secs(3, 2, 4));
            let store = MemorySessionStore::with_value(DailyCount::new(5, today()));
            let (mut engine, _rx, mocks) = create_engine_with(settings, store);

            engine.start();
            run_to_completion(&mut engine);
            assert_eq!(mocks.notifier.sent(), vec![(Phase::Work, 6)]);
            assert_eq!(mocks.store.value(), Some(DailyCount::new(6, today())));
        }

        #[test]
        fn test_sleep_failure_does_not_block_start() {
            let (mut engine, _rx, mocks) = create_engine();
            mocks.sleep.set_should_fail(true);

            assert!(engine.start());
            assert!(engine.is_running());
            assert!(!engine.holds_sleep_token());
        }

        #[test]
        fn test_side_effect_failures_do_not_block_transition() {
            let (mut engine, _rx, mocks) = create_engine();
            mocks.sound.set_should_fail(true);
            mocks.store.set_fail_writes(true);

            engine.start();
            run_to_completion(&mut engine);
            assert_eq!(engine.state().phase(), Phase::ShortBreak);
            assert_eq!(engine.snapshot().session_count, 1);
        }

        #[test]
        fn test_execute_maps_commands() {
            let (mut engine, _rx, mocks) = create_engine();

            assert_eq!(engine.execute(Command::Start), CommandOutcome::Changed);
            assert_eq!(engine.execute(Command::Start), CommandOutcome::Unchanged);
            assert_eq!(engine.execute(Command::Pause), CommandOutcome::Changed);
            assert_eq!(engine.execute(Command::Toggle), CommandOutcome::Changed);
            assert!(engine.is_running());
            assert_eq!(engine.execute(Command::Reset), CommandOutcome::Changed);
            assert_eq!(engine.execute(Command::Skip), CommandOutcome::Changed);
            assert_eq!(engine.execute(Command::Raise), CommandOutcome::Unchanged);
            assert_eq!(mocks.raiser.raise_count(), 1);
        }

        #[test]
        fn test_one_event_per_mutation_in_order() {
            let (mut engine, mut rx, _mocks) = create_engine();
            engine.start();
            engine.tick();
            engine.pause();
            engine.reset();
            engine.skip();

            let kinds: Vec<_> = drain(&mut rx).into_iter().map(|e| e.kind).collect();
            assert_eq!(
                kinds,
                vec![
                    ChangeKind::Started,
                    ChangeKind::Tick,
                    ChangeKind::Paused,
                    ChangeKind::Reset,
                    ChangeKind::Skipped { counted: false },
                ]
            );
        }

        #[test]
        fn test_remaining_never_exceeds_duration() {
            let (mut engine, _rx, _mocks) = create_engine();
            let script = [
                Command::Start,
                Command::Skip,
                Command::Toggle,
                Command::Reset,
                Command::Start,
            ];
            for (i, command) in script.iter().cycle().take(60).enumerate() {
                engine.execute(*command);
                for _ in 0..(i % 5) {
                    engine.tick();
                }
                let state = engine.state();
                assert!(state.remaining_seconds() <= state.total_seconds());
            }
        }

        #[test]
        fn test_drop_releases_sleep_token() {
            let (mut engine, _rx, mocks) = create_engine();
            engine.start();
            assert_eq!(mocks.sleep.active(), 1);

            drop(engine);
            assert_eq!(mocks.sleep.active(), 0);
        }

        #[test]
        fn test_closed_channel_does_not_panic() {
            let (mut engine, rx, _mocks) = create_engine();
            drop(rx);
            engine.start();
            engine.tick();
            assert!(engine.is_running());
        }

        #[test]
        fn test_state_mut_for_fast_forward() {
            let (mut engine, _rx, _mocks) = create_engine();
            engine.start();
            while engine.state().remaining_seconds() > 0 {
                engine.state_mut().tick();
            }
            assert_eq!(engine.tick(), Some(Phase::Work));
        }
    }

    mod day_rollover_tests {
        use super::*;

        fn tomorrow() -> NaiveDate {
            today().succ_opt().unwrap()
        }

        fn engine_with_five_sessions() -> (
            TimerEngine,
            mpsc::UnboundedReceiver<TimerEvent>,
            Mocks,
            FixedClock,
        ) {
            let clock = FixedClock::new(today());
            let store = MemorySessionStore::with_value(DailyCount::new(5, today()));
            let settings =
                EngineSettings::default().with_durations(PhaseDurations::from_secs(3, 2, 4));
            let (engine, rx, mocks) = create_engine_on(settings, store, clock.clone());
            (engine, rx, mocks, clock)
        }

        #[test]
        fn test_same_day_is_noop() {
            let (mut engine, mut rx, mocks, _clock) = engine_with_five_sessions();

            assert!(!engine.refresh_day());
            assert!(drain(&mut rx).is_empty());
            assert_eq!(mocks.store.write_count(), 0);
        }

        #[test]
        fn test_idle_rollover_emits_zero_count() {
            let (mut engine, mut rx, mocks, clock) = engine_with_five_sessions();
            engine.announce();
            assert_eq!(drain(&mut rx)[0].snapshot.session_count, 5);

            clock.set(tomorrow());
            assert!(engine.refresh_day());

            let events = drain(&mut rx);
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, ChangeKind::DayRolledOver);
            assert_eq!(events[0].snapshot.session_count, 0);
            assert!(events[0].is_transition());
            assert_eq!(mocks.store.value(), Some(DailyCount::new(0, tomorrow())));

            // only once per day
            assert!(!engine.refresh_day());
            assert!(drain(&mut rx).is_empty());
        }

        #[test]
        fn test_running_tick_rolls_over_first() {
            let (mut engine, mut rx, _mocks, clock) = engine_with_five_sessions();
            engine.start();
            drain(&mut rx);

            clock.set(tomorrow());
            engine.tick();

            let kinds: Vec<_> = drain(&mut rx).iter().map(|e| e.kind).collect();
            assert_eq!(kinds, vec![ChangeKind::DayRolledOver, ChangeKind::Tick]);
            assert_eq!(engine.snapshot().session_count, 0);
            assert_eq!(engine.state().remaining_seconds(), 2);
        }

        #[test]
        fn test_rollover_keeps_rotation() {
            let (mut engine, _rx, _mocks, clock) = engine_with_five_sessions();
            engine.start();
            run_to_completion(&mut engine);
            assert_eq!(engine.rotation().total_completed(), 1);

            clock.set(tomorrow());
            engine.refresh_day();
            assert_eq!(engine.rotation().total_completed(), 1);
        }
    }
}
