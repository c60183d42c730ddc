//! Per-client reconciliation of the shared playback document with a local media player.
//!
//! Every screen runs one [`LocalPlayerSync`] next to its player. It loads the current song,
//! tracks local readiness, and owns three timers: the settle seek, the stop countdown and
//! the duration retry. Timers are aborted on every relevant change and additionally carry a
//! generation number checked before they act.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    client::error::ClientError,
    playback::{
        state::{GameState, PlaybackPhase},
        timing::PlaybackTiming,
    },
};

/// Error reported when a loaded track never exposes its length.
pub const DURATION_UNAVAILABLE: &str = "Failed to get video duration";

/// Local media player driven by the synchronizer.
pub trait MediaPlayer: Send + Sync + 'static {
    /// Cue `url`; the player answers with [`PlayerEvent::Ready`] once it can play.
    fn load(&self, url: &str);
    fn play(&self);
    fn pause(&self);
    fn seek_to(&self, seconds: f64);
    /// Position in seconds.
    fn current_time(&self) -> f64;
    /// Track length in seconds; non-positive while unknown.
    fn duration(&self) -> f64;
}

impl<T: MediaPlayer + ?Sized> MediaPlayer for Arc<T> {
    fn load(&self, url: &str) {
        (**self).load(url)
    }

    fn play(&self) {
        (**self).play()
    }

    fn pause(&self) {
        (**self).pause()
    }

    fn seek_to(&self, seconds: f64) {
        (**self).seek_to(seconds)
    }

    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn duration(&self) -> f64 {
        (**self).duration()
    }
}

/// Callbacks of the local media player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The loaded media can play.
    Ready,
    /// Current position in seconds.
    Progress(f64),
    /// Playback reached the end of the media.
    Ended,
    /// The player failed with this message.
    Error(String),
}

/// Outbound playback requests of one client.
pub trait PlaybackRequester: Send + Sync + 'static {
    fn play_snippet(&self, duration: f64) -> BoxFuture<'static, Result<(), ClientError>>;
    fn play_more(&self, position: f64, duration: f64)
    -> BoxFuture<'static, Result<(), ClientError>>;
    /// The local stop countdown expired.
    fn snippet_elapsed(&self) -> BoxFuture<'static, Result<(), ClientError>>;
    fn media_ended(&self) -> BoxFuture<'static, Result<(), ClientError>>;
    fn report_error(&self, message: String) -> BoxFuture<'static, Result<(), ClientError>>;
}

impl<T: PlaybackRequester + ?Sized> PlaybackRequester for Arc<T> {
    fn play_snippet(&self, duration: f64) -> BoxFuture<'static, Result<(), ClientError>> {
        (**self).play_snippet(duration)
    }

    fn play_more(
        &self,
        position: f64,
        duration: f64,
    ) -> BoxFuture<'static, Result<(), ClientError>> {
        (**self).play_more(position, duration)
    }

    fn snippet_elapsed(&self) -> BoxFuture<'static, Result<(), ClientError>> {
        (**self).snippet_elapsed()
    }

    fn media_ended(&self) -> BoxFuture<'static, Result<(), ClientError>> {
        (**self).media_ended()
    }

    fn report_error(&self, message: String) -> BoxFuture<'static, Result<(), ClientError>> {
        (**self).report_error(message)
    }
}

/// Which playback buttons a screen should enable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    /// Paused on a ready song whose snippet was not played yet.
    pub can_play_snippet: bool,
    /// Paused after the snippet with enough media left.
    pub can_play_more: bool,
    /// A song is loaded and not yet revealed.
    pub can_reveal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AppliedKey {
    phase: PlaybackPhase,
    seek_bits: u64,
    ready: bool,
}

#[derive(Default)]
struct Timers {
    settle: Option<JoinHandle<()>>,
    stop: Option<JoinHandle<()>>,
}

impl Timers {
    fn cancel(&mut self) {
        for handle in [self.settle.take(), self.stop.take()].into_iter().flatten() {
            handle.abort();
        }
    }
}

#[derive(Default)]
struct LocalState {
    song_generation: u64,
    timer_generation: u64,
    url: Option<String>,
    ready: bool,
    duration: Option<f64>,
    position: f64,
    shared: GameState,
    applied: Option<AppliedKey>,
    timers: Timers,
    duration_retry: Option<JoinHandle<()>>,
    /// Song url the first snippet is armed for.
    autoplay: Option<String>,
}

impl LocalState {
    fn cancel_retry(&mut self) {
        if let Some(handle) = self.duration_retry.take() {
            handle.abort();
        }
    }

    /// Forget everything tied to the previous song.
    fn reset_song(&mut self) {
        self.song_generation += 1;
        self.timer_generation += 1;
        self.timers.cancel();
        self.cancel_retry();
        self.ready = false;
        self.duration = None;
        self.position = 0.0;
        self.applied = None;
    }
}

enum Command {
    Load(String),
    Play,
    Pause,
}

struct SyncInner<P, R> {
    player: P,
    requester: R,
    timing: PlaybackTiming,
    local: Mutex<LocalState>,
}

async fn forward(request: &'static str, call: BoxFuture<'static, Result<(), ClientError>>) {
    if let Err(err) = call.await {
        warn!(request, error = %err, "playback request failed");
    }
}

fn spawn_request(request: &'static str, call: BoxFuture<'static, Result<(), ClientError>>) {
    tokio::spawn(forward(request, call));
}

impl<P: MediaPlayer, R: PlaybackRequester> SyncInner<P, R> {
    fn local(&self) -> MutexGuard<'_, LocalState> {
        self.local.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, commands: impl IntoIterator<Item = Command>) {
        for command in commands {
            match command {
                Command::Load(url) => self.player.load(&url),
                Command::Play => self.player.play(),
                Command::Pause => self.player.pause(),
            }
        }
    }

    fn on_shared_state(self: &Arc<Self>, state: &GameState) {
        let commands = {
            let mut local = self.local();
            let mut commands = Vec::new();
            if local.url != state.current_song_url {
                local.reset_song();
                local.url = state.current_song_url.clone();
                if let Some(url) = &local.url {
                    debug!(%url, "loading new song");
                    commands.push(Command::Load(url.clone()));
                }
            }
            local.shared = state.clone();
            commands.extend(self.reconcile(&mut local));
            commands
        };
        self.run(commands);
    }

    /// Align the player with `(phase, seek, ready)`; a no-op when none of them changed.
    fn reconcile(self: &Arc<Self>, local: &mut LocalState) -> Option<Command> {
        let key = AppliedKey {
            phase: local.shared.playback_state,
            seek_bits: local.shared.seek_time.to_bits(),
            ready: local.ready,
        };
        if local.applied == Some(key) {
            return None;
        }
        local.applied = Some(key);
        local.timers.cancel();
        local.timer_generation += 1;

        if !(key.phase.is_playing() && key.ready) {
            return local.url.is_some().then_some(Command::Pause);
        }

        let generation = local.timer_generation;
        local.timers.settle = Some(self.spawn_settle(generation, local.shared.seek_time));
        local.timers.stop = Some(self.spawn_stop(generation));
        Some(Command::Play)
    }

    fn spawn_settle(self: &Arc<Self>, generation: u64, target: f64) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let delay = self.timing.settle_delay;
        tokio::spawn(async move {
            sleep(delay).await;
            let Some(inner) = weak.upgrade() else { return };
            if inner.local().timer_generation != generation {
                return;
            }
            let current = inner.player.current_time();
            if inner.timing.needs_seek(current, target) {
                debug!(current, target, "seeking to shared position");
                inner.player.seek_to(target);
            }
        })
    }

    fn spawn_stop(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let delay = self.timing.snippet_duration;
        tokio::spawn(async move {
            sleep(delay).await;
            let call = {
                let Some(inner) = weak.upgrade() else { return };
                if inner.local().timer_generation != generation {
                    return;
                }
                debug!("stop countdown elapsed");
                inner.requester.snippet_elapsed()
            };
            forward("snippet elapsed", call).await;
        })
    }

    fn handle_player_event(self: &Arc<Self>, event: PlayerEvent) {
        match event {
            PlayerEvent::Ready => self.on_ready(),
            PlayerEvent::Progress(seconds) => {
                let mut local = self.local();
                if local.ready && local.url.is_some() {
                    local.position = seconds;
                }
            }
            PlayerEvent::Ended => {
                let playing = self.local().shared.playback_state.is_playing();
                if playing {
                    spawn_request("media ended", self.requester.media_ended());
                }
            }
            PlayerEvent::Error(message) => {
                let command = {
                    let mut local = self.local();
                    local.ready = false;
                    local.duration = None;
                    local.cancel_retry();
                    self.reconcile(&mut local)
                };
                self.run(command);
                warn!(%message, "local player failed");
                spawn_request(
                    "player error",
                    self.requester.report_error(format!("Player error: {message}")),
                );
            }
        }
    }

    fn on_ready(self: &Arc<Self>) {
        let generation = {
            let local = self.local();
            if local.url.is_none() {
                return;
            }
            local.song_generation
        };

        let duration = self.player.duration();
        if duration > 0.0 {
            self.mark_ready(generation, duration);
            return;
        }

        debug!(duration, "player ready without a duration; retrying");
        let weak = Arc::downgrade(self);
        let delay = self.timing.duration_retry_delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let call = {
                let Some(inner) = weak.upgrade() else { return };
                if inner.local().song_generation != generation {
                    return;
                }
                let duration = inner.player.duration();
                if duration > 0.0 {
                    inner.mark_ready(generation, duration);
                    return;
                }
                {
                    let mut local = inner.local();
                    local.ready = false;
                    local.duration = None;
                    local.duration_retry = None;
                }
                warn!("no valid duration after retry");
                inner.requester.report_error(DURATION_UNAVAILABLE.to_owned())
            };
            forward("duration failure", call).await;
        });

        let mut local = self.local();
        if local.song_generation == generation {
            if let Some(previous) = local.duration_retry.replace(handle) {
                previous.abort();
            }
        } else {
            handle.abort();
        }
    }

    fn mark_ready(self: &Arc<Self>, generation: u64, duration: f64) {
        let (command, autoplay) = {
            let mut local = self.local();
            if local.song_generation != generation {
                return;
            }
            local.ready = true;
            local.duration = Some(duration);
            local.duration_retry = None;
            let command = self.reconcile(&mut local);
            (command, self.take_autoplay(&mut local))
        };
        self.run(command);
        if let Some(duration) = autoplay {
            info!(duration, "requesting first snippet");
            spawn_request("autoplay snippet", self.requester.play_snippet(duration));
        }
    }

    /// Consume the autoplay flag once the armed song is loaded, ready and long enough.
    fn take_autoplay(&self, local: &mut LocalState) -> Option<f64> {
        if !local.ready || local.autoplay.is_none() || local.autoplay != local.url {
            return None;
        }
        let duration = local.duration?;
        if !self.timing.fits_snippet(duration) {
            return None;
        }
        local.autoplay = None;
        Some(duration)
    }

    fn shutdown(&self) {
        let mut local = self.local();
        local.song_generation += 1;
        local.timer_generation += 1;
        local.timers.cancel();
        local.cancel_retry();
        local.autoplay = None;
    }
}

/// Keeps one local media player in step with the shared playback document.
pub struct LocalPlayerSync<P: MediaPlayer, R: PlaybackRequester> {
    inner: Arc<SyncInner<P, R>>,
}

impl<P: MediaPlayer, R: PlaybackRequester> LocalPlayerSync<P, R> {
    /// Synchronizer with nothing loaded and autoplay disarmed.
    pub fn new(player: P, requester: R, timing: PlaybackTiming) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                player,
                requester,
                timing,
                local: Mutex::new(LocalState::default()),
            }),
        }
    }

    /// Feed a new value of the shared document.
    pub fn on_shared_state(&self, state: &GameState) {
        self.inner.on_shared_state(state);
    }

    /// Feed a callback of the local media player.
    pub fn handle_player_event(&self, event: PlayerEvent) {
        self.inner.handle_player_event(event);
    }

    /// Request the first snippet automatically once `song_url` is loaded and ready with a long
    /// enough track. Fires at most once per call; a later call re-arms for its own url.
    pub fn arm_autoplay(&self, song_url: impl Into<String>) {
        let autoplay = {
            let mut local = self.inner.local();
            local.autoplay = Some(song_url.into());
            self.inner.take_autoplay(&mut local)
        };
        if let Some(duration) = autoplay {
            spawn_request("autoplay snippet", self.inner.requester.play_snippet(duration));
        }
    }

    /// Ask for a snippet using the local duration. Returns `false` when no song is loaded.
    pub async fn play_snippet(&self) -> Result<bool, ClientError> {
        let call = {
            let local = self.inner.local();
            if local.url.is_none() {
                return Ok(false);
            }
            self.inner
                .requester
                .play_snippet(local.duration.unwrap_or(0.0))
        };
        call.await?;
        Ok(true)
    }

    /// Continue from the local position. Returns `false` when too close to the end.
    pub async fn play_more(&self) -> Result<bool, ClientError> {
        let call = {
            let local = self.inner.local();
            match local.duration {
                Some(duration)
                    if local.ready
                        && local.url.is_some()
                        && self.inner.timing.can_play_more(local.position, duration) =>
                {
                    self.inner.requester.play_more(local.position, duration)
                }
                _ => return Ok(false),
            }
        };
        call.await?;
        Ok(true)
    }

    /// Buttons to enable for the current shared and local state.
    pub fn controls(&self) -> Controls {
        let local = self.inner.local();
        let shared = &local.shared;
        let paused_with_song =
            shared.playback_state == PlaybackPhase::Paused && shared.has_current_song();
        let can_play_more = match local.duration {
            Some(duration) => self.inner.timing.can_play_more(local.position, duration),
            None => false,
        };
        Controls {
            can_play_snippet: paused_with_song && local.ready && !shared.snippet_played_once,
            can_play_more: paused_with_song
                && local.ready
                && shared.snippet_played_once
                && can_play_more,
            can_reveal: shared.has_current_song()
                && !matches!(
                    shared.playback_state,
                    PlaybackPhase::Loading | PlaybackPhase::Revealed
                ),
        }
    }

    /// Whether the loaded media reported [`PlayerEvent::Ready`].
    pub fn is_ready(&self) -> bool {
        self.inner.local().ready
    }

    /// Track length reported by the local player, once known.
    pub fn local_duration(&self) -> Option<f64> {
        self.inner.local().duration
    }

    /// Cancel every pending timer; later timer wake-ups are ignored.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl<P: MediaPlayer, R: PlaybackRequester> Drop for LocalPlayerSync<P, R> {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, time::Duration};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum PlayerCall {
        Load(String),
        Play,
        Pause,
        Seek(f64),
    }

    #[derive(Default)]
    struct FakePlayer {
        calls: Mutex<Vec<PlayerCall>>,
        durations: Mutex<VecDeque<f64>>,
        position: Mutex<f64>,
    }

    impl FakePlayer {
        fn with_durations(durations: &[f64]) -> Arc<Self> {
            Arc::new(Self {
                durations: Mutex::new(durations.iter().copied().collect()),
                ..Self::default()
            })
        }

        fn calls(&self) -> Vec<PlayerCall> {
            self.calls.lock().unwrap().clone()
        }

        fn seeks(&self) -> Vec<f64> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    PlayerCall::Seek(at) => Some(at),
                    _ => None,
                })
                .collect()
        }
    }

    impl MediaPlayer for FakePlayer {
        fn load(&self, url: &str) {
            self.calls.lock().unwrap().push(PlayerCall::Load(url.into()));
        }

        fn play(&self) {
            self.calls.lock().unwrap().push(PlayerCall::Play);
        }

        fn pause(&self) {
            self.calls.lock().unwrap().push(PlayerCall::Pause);
        }

        fn seek_to(&self, seconds: f64) {
            self.calls.lock().unwrap().push(PlayerCall::Seek(seconds));
        }

        fn current_time(&self) -> f64 {
            *self.position.lock().unwrap()
        }

        fn duration(&self) -> f64 {
            let mut durations = self.durations.lock().unwrap();
            if durations.len() > 1 {
                durations.pop_front().unwrap_or_default()
            } else {
                durations.front().copied().unwrap_or_default()
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Request {
        Snippet(f64),
        More(f64, f64),
        Elapsed,
        Ended,
        Error(String),
    }

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<Request>>,
    }

    impl Recorder {
        fn record(&self, request: Request) -> BoxFuture<'static, Result<(), ClientError>> {
            self.requests.lock().unwrap().push(request);
            Box::pin(async { Ok(()) })
        }

        fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl PlaybackRequester for Recorder {
        fn play_snippet(&self, duration: f64) -> BoxFuture<'static, Result<(), ClientError>> {
            self.record(Request::Snippet(duration))
        }

        fn play_more(
            &self,
            position: f64,
            duration: f64,
        ) -> BoxFuture<'static, Result<(), ClientError>> {
            self.record(Request::More(position, duration))
        }

        fn snippet_elapsed(&self) -> BoxFuture<'static, Result<(), ClientError>> {
            self.record(Request::Elapsed)
        }

        fn media_ended(&self) -> BoxFuture<'static, Result<(), ClientError>> {
            self.record(Request::Ended)
        }

        fn report_error(&self, message: String) -> BoxFuture<'static, Result<(), ClientError>> {
            self.record(Request::Error(message))
        }
    }

    type TestSync = LocalPlayerSync<Arc<FakePlayer>, Arc<Recorder>>;

    fn setup(durations: &[f64]) -> (TestSync, Arc<FakePlayer>, Arc<Recorder>) {
        let player = FakePlayer::with_durations(durations);
        let recorder = Arc::new(Recorder::default());
        let sync = LocalPlayerSync::new(player.clone(), recorder.clone(), PlaybackTiming::default());
        (sync, player, recorder)
    }

    fn state(url: &str, phase: PlaybackPhase, seek: f64) -> GameState {
        GameState {
            current_song_id: Some(format!("id-{url}")),
            current_song_url: Some(url.into()),
            current_song_title: Some("Song".into()),
            playback_state: phase,
            seek_time: seek,
            ..GameState::default()
        }
    }

    async fn advance(millis: u64) {
        sleep(Duration::from_millis(millis)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_becomes_ready_only_after_retry() {
        let (sync, _player, recorder) = setup(&[0.0, 180.0]);
        sync.on_shared_state(&state("a", PlaybackPhase::Paused, 0.0));
        sync.arm_autoplay("a");

        sync.handle_player_event(PlayerEvent::Ready);
        advance(10).await;
        assert!(!sync.is_ready());
        assert!(!sync.controls().can_play_snippet);
        assert!(recorder.requests().is_empty());

        advance(1_500).await;
        assert!(sync.is_ready());
        assert_eq!(sync.local_duration(), Some(180.0));
        assert!(sync.controls().can_play_snippet);
        assert_eq!(recorder.requests(), [Request::Snippet(180.0)]);

        sync.arm_autoplay("a");
        advance(10).await;
        assert_eq!(recorder.requests().len(), 2, "re-arming fires again once");
    }

    #[tokio::test(start_paused = true)]
    async fn autoplay_waits_for_the_armed_song() {
        let (sync, _player, recorder) = setup(&[200.0]);
        sync.on_shared_state(&state("a", PlaybackPhase::Paused, 0.0));
        sync.handle_player_event(PlayerEvent::Ready);
        advance(10).await;
        assert!(sync.is_ready());

        sync.arm_autoplay("b");
        advance(10).await;
        assert!(recorder.requests().is_empty(), "previous song must not autoplay");

        sync.on_shared_state(&state("b", PlaybackPhase::Paused, 0.0));
        advance(10).await;
        assert!(recorder.requests().is_empty());

        sync.handle_player_event(PlayerEvent::Ready);
        advance(10).await;
        assert_eq!(recorder.requests(), [Request::Snippet(200.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_duration_after_retry_is_reported() {
        let (sync, _player, recorder) = setup(&[0.0]);
        sync.on_shared_state(&state("a", PlaybackPhase::Paused, 0.0));
        sync.handle_player_event(PlayerEvent::Ready);

        advance(1_600).await;
        assert!(!sync.is_ready());
        assert_eq!(
            recorder.requests(),
            [Request::Error(DURATION_UNAVAILABLE.into())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn song_change_cancels_the_duration_retry() {
        let (sync, player, recorder) = setup(&[0.0, 180.0]);
        sync.on_shared_state(&state("a", PlaybackPhase::Paused, 0.0));
        sync.handle_player_event(PlayerEvent::Ready);
        sync.on_shared_state(&state("b", PlaybackPhase::Paused, 0.0));

        advance(2_000).await;
        assert!(!sync.is_ready());
        assert!(recorder.requests().is_empty());
        assert!(player.calls().contains(&PlayerCall::Load("b".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn playing_state_seeks_plays_and_requests_stop() {
        let (sync, player, recorder) = setup(&[200.0]);
        sync.on_shared_state(&state("a", PlaybackPhase::Paused, 0.0));
        sync.handle_player_event(PlayerEvent::Ready);
        sync.on_shared_state(&state("a", PlaybackPhase::PlayingSnippet, 42.0));

        assert_eq!(player.calls().last(), Some(&PlayerCall::Play));
        advance(60).await;
        assert_eq!(player.seeks(), [42.0]);

        advance(9_000).await;
        assert!(recorder.requests().is_empty());
        advance(1_000).await;
        assert_eq!(recorder.requests(), [Request::Elapsed]);
    }

    #[tokio::test(start_paused = true)]
    async fn small_drift_does_not_seek() {
        let (sync, player, _recorder) = setup(&[200.0]);
        *player.position.lock().unwrap() = 41.0;
        sync.on_shared_state(&state("a", PlaybackPhase::Paused, 0.0));
        sync.handle_player_event(PlayerEvent::Ready);
        sync.on_shared_state(&state("a", PlaybackPhase::PlayingMore, 42.0));

        advance(100).await;
        assert!(player.seeks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_the_playing_phase_cancels_timers() {
        let (sync, player, recorder) = setup(&[200.0]);
        sync.on_shared_state(&state("a", PlaybackPhase::Paused, 0.0));
        sync.handle_player_event(PlayerEvent::Ready);
        sync.on_shared_state(&state("a", PlaybackPhase::PlayingSnippet, 0.0));
        advance(2_000).await;
        sync.on_shared_state(&state("a", PlaybackPhase::Revealed, 0.0));

        assert_eq!(player.calls().last(), Some(&PlayerCall::Pause));
        advance(20_000).await;
        assert!(recorder.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn state_arriving_before_readiness_plays_once_ready() {
        let (sync, player, recorder) = setup(&[200.0]);
        sync.on_shared_state(&state("a", PlaybackPhase::PlayingSnippet, 30.0));
        assert!(!player.calls().contains(&PlayerCall::Play));

        sync.handle_player_event(PlayerEvent::Ready);
        assert_eq!(player.calls().last(), Some(&PlayerCall::Play));
        advance(10_100).await;
        assert_eq!(player.seeks(), [30.0]);
        assert_eq!(recorder.requests(), [Request::Elapsed]);
    }

    #[tokio::test(start_paused = true)]
    async fn player_errors_are_reported_and_drop_readiness() {
        let (sync, _player, recorder) = setup(&[200.0]);
        sync.on_shared_state(&state("a", PlaybackPhase::Paused, 0.0));
        sync.handle_player_event(PlayerEvent::Ready);
        sync.handle_player_event(PlayerEvent::Error("150".into()));
        advance(10).await;

        assert!(!sync.is_ready());
        assert_eq!(sync.local_duration(), None);
        assert_eq!(
            recorder.requests(),
            [Request::Error("Player error: 150".into())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ended_only_reports_while_playing() {
        let (sync, _player, recorder) = setup(&[200.0]);
        sync.on_shared_state(&state("a", PlaybackPhase::Paused, 0.0));
        sync.handle_player_event(PlayerEvent::Ready);
        sync.handle_player_event(PlayerEvent::Ended);
        sync.on_shared_state(&state("a", PlaybackPhase::PlayingMore, 190.0));
        sync.handle_player_event(PlayerEvent::Ended);
        advance(10).await;

        assert_eq!(recorder.requests(), [Request::Ended]);
    }

    #[tokio::test(start_paused = true)]
    async fn play_more_forwards_the_local_position() {
        let (sync, _player, recorder) = setup(&[200.0]);
        let mut shared = state("a", PlaybackPhase::Paused, 0.0);
        shared.snippet_played_once = true;
        sync.on_shared_state(&shared);
        sync.handle_player_event(PlayerEvent::Ready);
        sync.handle_player_event(PlayerEvent::Progress(57.0));

        assert!(sync.controls().can_play_more);
        assert!(sync.play_more().await.unwrap());
        sync.handle_player_event(PlayerEvent::Progress(199.8));
        assert!(!sync.play_more().await.unwrap());
        assert_eq!(recorder.requests(), [Request::More(57.0, 200.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_silences_pending_timers() {
        let (sync, _player, recorder) = setup(&[200.0]);
        sync.on_shared_state(&state("a", PlaybackPhase::Paused, 0.0));
        sync.handle_player_event(PlayerEvent::Ready);
        sync.on_shared_state(&state("a", PlaybackPhase::PlayingSnippet, 0.0));
        sync.shutdown();

        advance(11_000).await;
        assert!(recorder.requests().is_empty());
    }
}
