//! Device session manager.
//!
//! [`SessionManager`] owns one logical connection to the device at a time
//! and everything derived from it. A single actor task holds the transport
//! link and performs every derived-state write; all public methods are
//! message sends into that task's queue, so a `send` issued while a
//! `connect` is in flight serializes behind it and never races a link that
//! is mid-teardown.
//!
//! # State Machine
//!
//! ```text
//! Disconnected --connect--> Connecting --link opens--> Connected
//!                               |                          |
//!                          dial failure              read error / send failure
//!                               v                          v
//!                             Error <----------------------+
//!
//! Connected --clean EOF--> Disconnected
//! disconnect() --> Disconnected (always, from any state)
//! ```
//!
//! There is no automatic retry: a failed session parks in `Error` until the
//! caller connects again (typically a foreground-lifecycle hook).
//!
//! # Observables
//!
//! Connection status, settings, temperature, and schedule are last-value
//! watch channels: late subscribers see the current value, intermediate
//! values may be skipped, updates arrive in wire order. The raw line stream
//! is a broadcast channel with a single-frame buffer and no replay; frames
//! emitted while nobody subscribes are dropped.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, trace, warn};

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::prefs::PreferenceStore;
use crate::protocol::{Command, DeviceSettings, ParsedEvent, Schedule, parse_line};
use crate::transport::{Dialer, FrameLink, WsDialer};

// ============================================================================
// Constants
// ============================================================================

/// Raw-broadcast buffer depth: at most one frame for a lagging subscriber.
const RAW_CHANNEL_CAPACITY: usize = 1;

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Connection status of the device session.
///
/// Owned exclusively by the session manager; transitions are driven only by
/// transport lifecycle events and explicit `disconnect` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No session, none being opened.
    #[default]
    Disconnected,

    /// Dialing the device.
    Connecting,

    /// Session open, read loop running.
    Connected,

    /// The last session attempt or session ended in a transport failure.
    Error,
}

// ============================================================================
// SessionCommand
// ============================================================================

/// Commands into the actor task.
enum SessionCommand {
    /// Open a session. `None` redials the current endpoint.
    Connect { endpoint: Option<Endpoint> },

    /// Send one already-serialized frame, best effort.
    Send { frame: String },

    /// Close the session and force `Disconnected`.
    Disconnect,

    /// Terminate the actor task.
    Shutdown,
}

// ============================================================================
// SessionManager
// ============================================================================

/// Cloneable handle to the session actor.
///
/// Clones share one session; the actor terminates when `shutdown` is called
/// or every handle is dropped.
#[derive(Clone)]
pub struct SessionManager {
    /// Command queue into the actor.
    command_tx: mpsc::UnboundedSender<SessionCommand>,

    /// Current connection status.
    status_rx: watch::Receiver<ConnectionStatus>,

    /// Last settings snapshot.
    settings_rx: watch::Receiver<Option<DeviceSettings>>,

    /// Last reported temperature.
    temperature_rx: watch::Receiver<Option<i32>>,

    /// Last schedule window.
    schedule_rx: watch::Receiver<Option<Schedule>>,

    /// Raw inbound line broadcast.
    raw_tx: broadcast::Sender<String>,

    /// Preference store, if attached.
    store: Option<PreferenceStore>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionManager - Construction
// ============================================================================

impl SessionManager {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionManagerBuilder {
        SessionManagerBuilder::new()
    }

    /// Spawns a manager with the production WebSocket transport and the
    /// factory-default endpoint.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().spawn()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SessionManager - Commands
// ============================================================================

impl SessionManager {
    /// Connects to the current endpoint.
    ///
    /// No-op when already connected (or connecting) to it; at most one
    /// transport open results. Lifecycle hooks call this on every
    /// foreground event, which doubles as the manual-retry path after an
    /// `Error`.
    pub fn connect(&self) {
        let _ = self
            .command_tx
            .send(SessionCommand::Connect { endpoint: None });
    }

    /// Connects to a specific endpoint.
    ///
    /// A different endpoint tears down any existing session first; the same
    /// endpoint while connected is a no-op.
    pub fn connect_to(&self, endpoint: Endpoint) {
        let _ = self.command_tx.send(SessionCommand::Connect {
            endpoint: Some(endpoint),
        });
    }

    /// Connects to the endpoint recorded in the attached preference store,
    /// or the factory default when no store is attached.
    pub fn connect_stored(&self) {
        let endpoint = self
            .store
            .as_ref()
            .map_or_else(Endpoint::default, PreferenceStore::endpoint);
        self.connect_to(endpoint);
    }

    /// Sends one already-serialized frame, fire and forget.
    ///
    /// Dropped with a log line when the session is not connected; there is
    /// no queueing and no delivery confirmation. Callers that need a
    /// result use [`OneShotSender`](crate::OneShotSender).
    pub fn send(&self, frame: impl Into<String>) {
        let _ = self.command_tx.send(SessionCommand::Send {
            frame: frame.into(),
        });
    }

    /// Serializes and sends a command, fire and forget.
    #[inline]
    pub fn send_command(&self, command: &Command) {
        self.send(command.to_frame());
    }

    /// Closes the session and forces `Disconnected`.
    ///
    /// Safe to call at any time, including when already disconnected.
    pub fn disconnect(&self) {
        let _ = self.command_tx.send(SessionCommand::Disconnect);
    }

    /// Terminates the actor task.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(SessionCommand::Shutdown);
    }
}

// ============================================================================
// SessionManager - Observables
// ============================================================================

impl SessionManager {
    /// Returns the current connection status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Returns a watch on the connection status.
    #[inline]
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// Returns the last settings snapshot, `None` before the first frame.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> Option<DeviceSettings> {
        *self.settings_rx.borrow()
    }

    /// Returns a watch on the settings snapshot.
    #[inline]
    #[must_use]
    pub fn watch_settings(&self) -> watch::Receiver<Option<DeviceSettings>> {
        self.settings_rx.clone()
    }

    /// Returns the last reported temperature, `None` before the first frame.
    #[inline]
    #[must_use]
    pub fn temperature(&self) -> Option<i32> {
        *self.temperature_rx.borrow()
    }

    /// Returns a watch on the temperature.
    #[inline]
    #[must_use]
    pub fn watch_temperature(&self) -> watch::Receiver<Option<i32>> {
        self.temperature_rx.clone()
    }

    /// Returns the last schedule window, `None` before the first frame.
    #[inline]
    #[must_use]
    pub fn schedule(&self) -> Option<Schedule> {
        *self.schedule_rx.borrow()
    }

    /// Returns a watch on the schedule window.
    #[inline]
    #[must_use]
    pub fn watch_schedule(&self) -> watch::Receiver<Option<Schedule>> {
        self.schedule_rx.clone()
    }

    /// Subscribes to the raw inbound line stream.
    ///
    /// Every successfully read line is delivered verbatim, matched by the
    /// codec or not. No replay: only lines read after subscribing arrive,
    /// and a subscriber more than one frame behind loses the overwritten
    /// ones.
    #[inline]
    #[must_use]
    pub fn subscribe_raw(&self) -> broadcast::Receiver<String> {
        self.raw_tx.subscribe()
    }
}

// ============================================================================
// SessionManagerBuilder
// ============================================================================

/// Configuration builder for [`SessionManager`].
///
/// # Example
///
/// ```no_run
/// use wordclock_link::{PreferenceStore, SessionManager};
///
/// # fn example() -> wordclock_link::Result<()> {
/// let store = PreferenceStore::open_default()?;
/// let session = SessionManager::builder().store(store).spawn();
/// session.connect_stored();
/// # Ok(())
/// # }
/// ```
pub struct SessionManagerBuilder {
    /// Transport dialer.
    dialer: Arc<dyn Dialer>,

    /// Initial endpoint, if set explicitly.
    endpoint: Option<Endpoint>,

    /// Preference store for write-through persistence.
    store: Option<PreferenceStore>,
}

impl SessionManagerBuilder {
    /// Creates a builder with the production WebSocket transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dialer: Arc::new(WsDialer::new()),
            endpoint: None,
            store: None,
        }
    }

    /// Replaces the transport dialer.
    #[must_use]
    pub fn dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = dialer;
        self
    }

    /// Sets the initial endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Attaches a preference store.
    ///
    /// With a store attached the session persists the endpoint on connect,
    /// the last mode tag on each settings frame, and the schedule on each
    /// schedule frame. Without one, nothing is persisted.
    #[must_use]
    pub fn store(mut self, store: PreferenceStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Spawns the actor task and returns the handle.
    ///
    /// The initial endpoint is, in order: the explicit one, the stored one,
    /// the factory default. Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn(self) -> SessionManager {
        let endpoint = self
            .endpoint
            .or_else(|| self.store.as_ref().map(PreferenceStore::endpoint))
            .unwrap_or_default();

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let (settings_tx, settings_rx) = watch::channel(None);
        let (temperature_tx, temperature_rx) = watch::channel(None);
        let (schedule_tx, schedule_rx) = watch::channel(None);
        let (raw_tx, _) = broadcast::channel(RAW_CHANNEL_CAPACITY);

        let actor = SessionActor {
            dialer: self.dialer,
            endpoint,
            link: None,
            status_tx,
            settings_tx,
            temperature_tx,
            schedule_tx,
            raw_tx: raw_tx.clone(),
            store: self.store.clone(),
        };

        tokio::spawn(actor.run(command_rx));

        SessionManager {
            command_tx,
            status_rx,
            settings_rx,
            temperature_rx,
            schedule_rx,
            raw_tx,
            store: self.store,
        }
    }
}

impl Default for SessionManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SessionActor
// ============================================================================

/// What woke the actor loop.
enum Wake {
    /// A command from a handle, `None` when every handle is gone.
    Command(Option<SessionCommand>),

    /// A read-loop outcome from the active link.
    Frame(Option<Result<String>>),
}

/// The actor task: sole owner of the link and all derived-state writers.
struct SessionActor {
    /// Transport dialer.
    dialer: Arc<dyn Dialer>,

    /// Endpoint of the current/last session.
    endpoint: Endpoint,

    /// Active link, if any.
    link: Option<Box<dyn FrameLink>>,

    /// Connection status writer.
    status_tx: watch::Sender<ConnectionStatus>,

    /// Settings writer.
    settings_tx: watch::Sender<Option<DeviceSettings>>,

    /// Temperature writer.
    temperature_tx: watch::Sender<Option<i32>>,

    /// Schedule writer.
    schedule_tx: watch::Sender<Option<Schedule>>,

    /// Raw line broadcast.
    raw_tx: broadcast::Sender<String>,

    /// Preference store for write-through, if attached.
    store: Option<PreferenceStore>,
}

impl SessionActor {
    /// Actor loop: commands and inbound frames, one at a time.
    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<SessionCommand>) {
        loop {
            let wake = tokio::select! {
                command = command_rx.recv() => Wake::Command(command),
                frame = Self::next_frame(&mut self.link) => Wake::Frame(frame),
            };

            match wake {
                Wake::Command(Some(SessionCommand::Connect { endpoint })) => {
                    self.handle_connect(endpoint).await;
                }

                Wake::Command(Some(SessionCommand::Send { frame })) => {
                    self.handle_send(&frame).await;
                }

                Wake::Command(Some(SessionCommand::Disconnect)) => {
                    self.handle_disconnect().await;
                }

                Wake::Command(Some(SessionCommand::Shutdown)) | Wake::Command(None) => break,

                Wake::Frame(Some(Ok(frame))) => self.apply_frame(frame),

                Wake::Frame(Some(Err(e))) => {
                    error!(error = %e, "Session read failed");
                    self.link = None;
                    self.set_status(ConnectionStatus::Error);
                }

                Wake::Frame(None) => {
                    debug!("Session closed by device");
                    self.link = None;
                    // A failure outcome sticks; only a clean close resets.
                    if *self.status_tx.borrow() != ConnectionStatus::Error {
                        self.set_status(ConnectionStatus::Disconnected);
                    }
                }
            }
        }

        if let Some(mut link) = self.link.take() {
            let _ = link.close().await;
        }
        debug!("Session task terminated");
    }

    /// Awaits the next inbound frame, pending forever without a link.
    async fn next_frame(link: &mut Option<Box<dyn FrameLink>>) -> Option<Result<String>> {
        match link.as_mut() {
            Some(link) => link.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Opens a session, tearing down any previous one first.
    async fn handle_connect(&mut self, endpoint: Option<Endpoint>) {
        let target = endpoint.unwrap_or_else(|| self.endpoint.clone());

        let status = *self.status_tx.borrow();
        if matches!(
            status,
            ConnectionStatus::Connecting | ConnectionStatus::Connected
        ) && target == self.endpoint
        {
            debug!(endpoint = %target, "Already connected, connect ignored");
            return;
        }

        if let Some(mut link) = self.link.take() {
            let _ = link.close().await;
            debug!("Previous session torn down");
        }

        self.endpoint = target.clone();
        if let Some(store) = &self.store
            && let Err(e) = store.set_endpoint(&target)
        {
            warn!(error = %e, "Failed to persist endpoint");
        }

        self.set_status(ConnectionStatus::Connecting);

        match self.dialer.dial(&target).await {
            Ok(link) => {
                info!(endpoint = %target, "Session established");
                self.link = Some(link);
                self.set_status(ConnectionStatus::Connected);
                // The device does not push state unsolicited; pull it.
                self.handle_send(&Command::GetSettings.to_frame()).await;
            }
            Err(e) => {
                error!(endpoint = %target, error = %e, "Connection failed");
                self.set_status(ConnectionStatus::Error);
            }
        }
    }

    /// Sends a frame if connected; otherwise drops it.
    async fn handle_send(&mut self, frame: &str) {
        if *self.status_tx.borrow() != ConnectionStatus::Connected {
            debug!(frame, "Dropped send while not connected");
            return;
        }
        let Some(link) = self.link.as_mut() else {
            debug!(frame, "Dropped send without a link");
            return;
        };

        trace!(frame, "Sending frame");
        if let Err(e) = link.send(frame).await {
            error!(error = %e, "Session send failed");
            self.link = None;
            self.set_status(ConnectionStatus::Error);
        }
    }

    /// Closes the session and forces `Disconnected`.
    async fn handle_disconnect(&mut self) {
        if let Some(mut link) = self.link.take() {
            let _ = link.close().await;
            debug!("Session closed");
        }
        self.set_status(ConnectionStatus::Disconnected);
    }

    /// Applies one inbound line to the derived state, then rebroadcasts it.
    fn apply_frame(&self, frame: String) {
        match parse_line(&frame) {
            Some(ParsedEvent::Settings(settings)) => {
                debug!(mode = %settings.mode, "Settings updated");
                self.settings_tx.send_replace(Some(settings));
                if let Some(store) = &self.store
                    && let Err(e) = store.set_last_mode(settings.mode)
                {
                    warn!(error = %e, "Failed to persist last mode");
                }
            }

            Some(ParsedEvent::Temperature(value)) => {
                debug!(value, "Temperature updated");
                self.temperature_tx.send_replace(Some(value));
            }

            Some(ParsedEvent::Schedule(schedule)) => {
                debug!(enabled = schedule.enabled, "Schedule updated");
                self.schedule_tx.send_replace(Some(schedule));
                if let Some(store) = &self.store
                    && let Err(e) = store.set_schedule(&schedule)
                {
                    warn!(error = %e, "Failed to persist schedule");
                }
            }

            Some(ParsedEvent::Raw(_)) => trace!(frame = %frame, "Unmatched frame"),

            None => debug!(frame = %frame, "Dropped malformed frame"),
        }

        // Every line reaches the raw stream, matched or not.
        let _ = self.raw_tx.send(frame);
    }

    /// Publishes a status transition.
    fn set_status(&self, status: ConnectionStatus) {
        self.status_tx.send_replace(status);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::timeout;

    use crate::error::Error;
    use crate::protocol::{ModeTag, Rgb};

    const WAIT: Duration = Duration::from_secs(2);

    /// Scripted in-memory transport.
    #[derive(Clone, Default)]
    struct StubDialer {
        dial_count: Arc<AtomicUsize>,
        fail_dial: Arc<AtomicBool>,
        /// Frames the fake device pushes, in order.
        inbound: Arc<StdMutex<VecDeque<String>>>,
        /// Frames the session sent.
        sent: Arc<StdMutex<Vec<String>>>,
        /// After the script drains: end the stream instead of idling.
        eof_when_drained: Arc<AtomicBool>,
        /// After the script drains: fail the read instead of idling.
        fail_when_drained: Arc<AtomicBool>,
    }

    impl StubDialer {
        fn push_inbound(&self, frames: &[&str]) {
            let mut inbound = self.inbound.lock().expect("lock");
            inbound.extend(frames.iter().map(|f| (*f).to_string()));
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().expect("lock").clone()
        }

        fn dials(&self) -> usize {
            self.dial_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Dialer for StubDialer {
        async fn dial(&self, _endpoint: &Endpoint) -> Result<Box<dyn FrameLink>> {
            self.dial_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_dial.load(Ordering::SeqCst) {
                return Err(Error::connection("connection refused"));
            }
            Ok(Box::new(StubLink {
                inbound: Arc::clone(&self.inbound),
                sent: Arc::clone(&self.sent),
                eof_when_drained: Arc::clone(&self.eof_when_drained),
                fail_when_drained: Arc::clone(&self.fail_when_drained),
            }))
        }
    }

    struct StubLink {
        inbound: Arc<StdMutex<VecDeque<String>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        eof_when_drained: Arc<AtomicBool>,
        fail_when_drained: Arc<AtomicBool>,
    }

    #[async_trait]
    impl FrameLink for StubLink {
        async fn send(&mut self, frame: &str) -> Result<()> {
            self.sent.lock().expect("lock").push(frame.to_string());
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            loop {
                let next = self.inbound.lock().expect("lock").pop_front();
                match next {
                    Some(frame) => {
                        // Frames arrive spaced out on a real wire.
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        return Some(Ok(frame));
                    }
                    None if self.eof_when_drained.load(Ordering::SeqCst) => return None,
                    None if self.fail_when_drained.load(Ordering::SeqCst) => {
                        return Some(Err(Error::connection("connection reset")));
                    }
                    None => tokio::time::sleep(Duration::from_millis(2)).await,
                }
            }
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn stub_session(stub: &StubDialer) -> SessionManager {
        SessionManager::builder()
            .dialer(Arc::new(stub.clone()))
            .spawn()
    }

    async fn wait_status(session: &SessionManager, wanted: ConnectionStatus) {
        let mut rx = session.watch_status();
        timeout(WAIT, rx.wait_for(|s| *s == wanted))
            .await
            .expect("status wait timed out")
            .expect("status channel closed");
    }

    #[tokio::test]
    async fn test_connect_pulls_settings() {
        let stub = StubDialer::default();
        let session = stub_session(&stub);

        session.connect();
        wait_status(&session, ConnectionStatus::Connected).await;

        assert_eq!(stub.sent(), vec!["GET_SETTINGS".to_string()]);
        assert_eq!(stub.dials(), 1);
    }

    #[tokio::test]
    async fn test_connect_idempotent_for_same_endpoint() {
        let stub = StubDialer::default();
        let session = stub_session(&stub);

        session.connect();
        session.connect();
        wait_status(&session, ConnectionStatus::Connected).await;
        session.connect();

        // Force the queue to drain before counting dials.
        session.send(Command::TimerStop.to_frame());
        timeout(WAIT, async {
            while stub.sent().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("send never reached the stub");

        assert_eq!(stub.dials(), 1);
    }

    #[tokio::test]
    async fn test_new_endpoint_redials() {
        let stub = StubDialer::default();
        let session = stub_session(&stub);

        session.connect();
        wait_status(&session, ConnectionStatus::Connected).await;

        session.connect_to(Endpoint::new("10.0.0.9", 81).expect("valid endpoint"));
        timeout(WAIT, async {
            while stub.dials() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("second dial never happened");
    }

    #[tokio::test]
    async fn test_dial_failure_sets_error_without_retry() {
        let stub = StubDialer::default();
        stub.fail_dial.store(true, Ordering::SeqCst);
        let session = stub_session(&stub);

        session.connect();
        wait_status(&session, ConnectionStatus::Error).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(stub.dials(), 1);
        assert!(stub.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_while_disconnected_never_reaches_transport() {
        let stub = StubDialer::default();
        let session = stub_session(&stub);

        let mut rx = session.watch_status();
        session.send("MODE:CLOCK");
        // Disconnect behind the send proves the queue has drained.
        session.disconnect();
        timeout(WAIT, rx.changed()).await.expect("no status event").expect("closed");

        assert!(stub.sent().is_empty());
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let stub = StubDialer::default();
        let session = stub_session(&stub);

        let mut rx = session.watch_status();
        session.disconnect();
        session.disconnect();

        timeout(WAIT, rx.changed()).await.expect("no status event").expect("closed");
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_after_connect_forces_disconnected() {
        let stub = StubDialer::default();
        let session = stub_session(&stub);

        session.connect();
        wait_status(&session, ConnectionStatus::Connected).await;

        session.disconnect();
        wait_status(&session, ConnectionStatus::Disconnected).await;
    }

    #[tokio::test]
    async fn test_clean_eof_goes_disconnected() {
        let stub = StubDialer::default();
        stub.eof_when_drained.store(true, Ordering::SeqCst);
        let session = stub_session(&stub);

        session.connect();
        wait_status(&session, ConnectionStatus::Connected).await;
        wait_status(&session, ConnectionStatus::Disconnected).await;
    }

    #[tokio::test]
    async fn test_read_failure_goes_error() {
        let stub = StubDialer::default();
        stub.fail_when_drained.store(true, Ordering::SeqCst);
        let session = stub_session(&stub);

        session.connect();
        wait_status(&session, ConnectionStatus::Error).await;
    }

    #[tokio::test]
    async fn test_ordered_frames_build_derived_state() {
        let stub = StubDialer::default();
        stub.push_inbound(&[
            "SETTINGS:DIGITAL,0,255,0,128",
            "TEMP:21",
            "SCHEDULE:ON,7:30,21:15",
        ]);
        let session = stub_session(&stub);

        session.connect();
        let mut rx = session.watch_schedule();
        timeout(WAIT, rx.wait_for(Option::is_some))
            .await
            .expect("schedule wait timed out")
            .expect("schedule channel closed");

        assert_eq!(
            session.settings(),
            Some(DeviceSettings {
                mode: ModeTag::Digital,
                color: Rgb::new(0, 255, 0),
                brightness: 128.0,
            })
        );
        assert_eq!(session.temperature(), Some(21));
        assert_eq!(
            session.schedule(),
            Some(Schedule {
                enabled: true,
                start_hour: 7,
                start_minute: 30,
                end_hour: 21,
                end_minute: 15,
            })
        );
    }

    #[tokio::test]
    async fn test_raw_stream_sees_unmatched_and_matched_lines() {
        let stub = StubDialer::default();
        stub.push_inbound(&["GARBAGE_LINE", "SETTINGS:CLOCK,1,2,3,4"]);
        let session = stub_session(&stub);
        let mut raw_rx = session.subscribe_raw();

        session.connect();

        let first = timeout(WAIT, raw_rx.recv()).await.expect("no raw frame").expect("raw closed");
        let second = timeout(WAIT, raw_rx.recv()).await.expect("no raw frame").expect("raw closed");
        assert_eq!(first, "GARBAGE_LINE");
        assert_eq!(second, "SETTINGS:CLOCK,1,2,3,4");

        // Only the second line touched the derived state.
        let mut rx = session.watch_settings();
        timeout(WAIT, rx.wait_for(Option::is_some))
            .await
            .expect("settings wait timed out")
            .expect("settings channel closed");
        assert_eq!(session.temperature(), None);
        assert_eq!(
            session.settings().map(|s| s.mode),
            Some(ModeTag::Clock)
        );
    }

    #[tokio::test]
    async fn test_malformed_frames_leave_state_unchanged() {
        let stub = StubDialer::default();
        stub.push_inbound(&[
            "SETTINGS:CLOCK,1,2,3",
            "TEMP:warm",
            "SCHEDULE:ON,7:xx,21:15",
            "TEMP:9",
        ]);
        let session = stub_session(&stub);

        session.connect();
        let mut rx = session.watch_temperature();
        timeout(WAIT, rx.wait_for(Option::is_some))
            .await
            .expect("temperature wait timed out")
            .expect("temperature channel closed");

        assert_eq!(session.temperature(), Some(9));
        assert_eq!(session.settings(), None);
        assert_eq!(session.schedule(), None);
        assert_eq!(session.status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_schedule_disable_resets_window() {
        let stub = StubDialer::default();
        stub.push_inbound(&["SCHEDULE:ON,8:15,23:45", "SCHEDULE:OFF"]);
        let session = stub_session(&stub);

        session.connect();
        let mut rx = session.watch_schedule();
        timeout(WAIT, rx.wait_for(|s| s.is_some_and(|s| !s.enabled)))
            .await
            .expect("schedule wait timed out")
            .expect("schedule channel closed");

        assert_eq!(session.schedule(), Some(Schedule::disabled()));
    }

    #[tokio::test]
    async fn test_store_write_through() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let store =
            PreferenceStore::open(dir.path().join("preferences.json")).expect("open store");
        let stub = StubDialer::default();
        stub.push_inbound(&["SETTINGS:DIGITAL,1,2,3,4", "SCHEDULE:ON,7:30,21:15"]);

        let session = SessionManager::builder()
            .dialer(Arc::new(stub.clone()))
            .store(store.clone())
            .spawn();

        session.connect();
        let mut rx = session.watch_schedule();
        timeout(WAIT, rx.wait_for(Option::is_some))
            .await
            .expect("schedule wait timed out")
            .expect("schedule channel closed");

        assert_eq!(store.last_mode(), Some(ModeTag::Digital));
        let schedule = store.schedule();
        assert!(schedule.enabled);
        assert_eq!((schedule.start_hour, schedule.start_minute), (7, 30));
        assert_eq!(store.endpoint(), Endpoint::default());
    }

    #[tokio::test]
    async fn test_send_command_serializes() {
        let stub = StubDialer::default();
        let session = stub_session(&stub);

        session.connect();
        wait_status(&session, ConnectionStatus::Connected).await;
        session.send_command(&Command::Mode(ModeTag::Digital));

        timeout(WAIT, async {
            while stub.sent().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("command never reached the stub");

        assert_eq!(stub.sent()[1], "MODE:DIGITAL");
    }
}
