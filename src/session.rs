//! Per-client reader sessions.
//!
//! A session observes one slot and hands out records rendered from it. Each
//! read that starts a record (offset 0 with nothing staged) compares the
//! slot's tick to the last tick this session rendered. When nothing new has
//! arrived the caller either gets an empty read (non-blocking) or sleeps on
//! the slot's wait channel until the producer writes again.
//!
//! Locking: the session lock serializes everything for this session and is
//! released before sleeping. The slot mutex is only taken briefly, for the
//! snapshot copy, while the session lock is held; never the other way round.

use crate::errors::{SessionError, SessionResult};
use crate::lookup::Lookup;
use crate::measurement::{Endpoint, MeasurementType};
use crate::render::{render_formatted, render_raw, RECORD_CAPACITY};
use crate::slot::{SampleSlot, SlotView};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, Notify};
use tracing::{debug, trace};

/// Control command selecting the rendering mode
pub const MODE_CMD: u32 = 0x4c01;
pub const MODE_RAW: u32 = 0;
pub const MODE_FORMATTED: u32 = 1;

/// How a session renders samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Two big-endian bytes of the raw code
    Raw,
    /// Space-padded decimal text of the looked-up value
    #[default]
    Formatted,
}

impl TryFrom<u32> for Mode {
    type Error = SessionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            MODE_RAW => Ok(Mode::Raw),
            MODE_FORMATTED => Ok(Mode::Formatted),
            other => Err(SessionError::invalid_argument(format!("unknown mode {}", other))),
        }
    }
}

/// Destination of a read
pub trait UserBuffer {
    /// Append `src` to the destination or fail without side effects the
    /// session could observe.
    fn copy_in(&mut self, src: &[u8]) -> Result<(), CopyFault>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyFault {
    pub needed: usize,
    pub available: usize,
}

impl fmt::Display for CopyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "need {} bytes, destination holds {}", self.needed, self.available)
    }
}

impl UserBuffer for [u8] {
    fn copy_in(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        let available = self.len();
        let dst = self.get_mut(..src.len()).ok_or(CopyFault {
            needed: src.len(),
            available,
        })?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl UserBuffer for Vec<u8> {
    fn copy_in(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        self.extend_from_slice(src);
        Ok(())
    }
}

/// Handle that aborts a session's blocking calls, like a signal to a sleeping reader.
///
/// An interrupt raised while no call is blocked stays pending and aborts the
/// next lock acquisition or wait.
#[derive(Clone)]
pub struct Interrupter {
    notify: Arc<Notify>,
}

impl Interrupter {
    pub fn interrupt(&self) {
        self.notify.notify_one();
    }
}

/// No sample newer than the one already rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stale;

struct SessionState {
    mode: Mode,
    buffer: [u8; RECORD_CAPACITY],
    fill_len: usize,
    /// `None` until the first refresh, so the first read always tries one
    last_seen: Option<u64>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            mode: Mode::default(),
            buffer: [0; RECORD_CAPACITY],
            fill_len: 0,
            last_seen: None,
        }
    }

    /// Render the slot's current sample if it is newer than the last one rendered.
    fn refresh(
        &mut self,
        slot: &SampleSlot,
        kind: MeasurementType,
        lookup: &dyn Lookup,
    ) -> Result<(), Stale> {
        let sample = slot.snapshot().ok_or(Stale)?;
        if self.last_seen == Some(sample.timestamp) {
            return Err(Stale);
        }

        self.fill_len = match self.mode {
            Mode::Formatted => render_formatted(lookup.physical(kind, sample.raw), &mut self.buffer),
            Mode::Raw => render_raw(sample.raw, &mut self.buffer),
        };
        self.last_seen = Some(sample.timestamp);
        debug!(
            "[{}] refreshed t={} raw={} ({} bytes, {:?})",
            slot.endpoint(),
            sample.timestamp,
            sample.raw,
            self.fill_len,
            self.mode
        );
        Ok(())
    }

    fn deliver<B: UserBuffer + ?Sized>(
        &mut self,
        offset: usize,
        want_len: usize,
        dst: &mut B,
    ) -> SessionResult<usize> {
        if offset > self.fill_len {
            return Err(SessionError::invalid_argument(format!(
                "offset {} past staged record of {} bytes",
                offset, self.fill_len
            )));
        }

        let remaining = self.fill_len - offset;
        let (count, drained) = if want_len < remaining {
            (want_len, false)
        } else {
            (remaining, true)
        };

        dst.copy_in(&self.buffer[offset..offset + count])
            .map_err(|fault| SessionError::Fault { reason: fault.to_string() })?;

        if drained {
            self.fill_len = 0;
        }
        Ok(count)
    }
}

/// One open reader of one endpoint
pub struct Session {
    endpoint: Endpoint,
    slot: Arc<SampleSlot>,
    lookup: Arc<dyn Lookup>,
    state: Mutex<SessionState>,
    interrupt: Arc<Notify>,
}

impl Session {
    pub(crate) fn new(slot: Arc<SampleSlot>, lookup: Arc<dyn Lookup>) -> Self {
        let endpoint = slot.endpoint();
        debug!("[{}] session opened", endpoint);
        Self {
            endpoint,
            slot,
            lookup,
            state: Mutex::new(SessionState::new()),
            interrupt: Arc::new(Notify::new()),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn interrupter(&self) -> Interrupter {
        Interrupter { notify: Arc::clone(&self.interrupt) }
    }

    pub async fn mode(&self) -> Mode {
        self.state.lock().await.mode
    }

    /// Number of staged bytes not yet fully delivered
    pub async fn pending(&self) -> usize {
        self.state.lock().await.fill_len
    }

    /// Whether the slot holds a sample this session has not rendered yet
    pub async fn needs_refresh(&self) -> bool {
        let last_seen = self.state.lock().await.last_seen;
        self.slot.timestamp() != last_seen
    }

    async fn lock_state(&self) -> SessionResult<MutexGuard<'_, SessionState>> {
        tokio::select! {
            biased;
            _ = self.interrupt.notified() => Err(SessionError::Interrupted {
                during: "acquiring the session lock",
            }),
            guard = self.state.lock() => Ok(guard),
        }
    }

    /// Sleep until the slot moves past `last_seen`. Wakeups are re-checked.
    async fn wait_for_update(&self, last_seen: Option<u64>) -> SessionResult<()> {
        loop {
            let changed = self.slot.changed();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if self.slot.timestamp() != last_seen {
                return Ok(());
            }

            trace!("[{}] going to sleep", self.endpoint);
            tokio::select! {
                biased;
                _ = self.interrupt.notified() => {
                    return Err(SessionError::Interrupted { during: "waiting for fresh data" });
                }
                _ = &mut changed => trace!("[{}] waking up", self.endpoint),
            }
        }
    }

    /// Read up to `want_len` bytes of the current record starting at `offset`.
    ///
    /// `offset` is the caller's position inside the record; 0 starts a new
    /// one. Returns the number of bytes copied into `dst`. A non-blocking read
    /// with no fresh sample returns `Ok(0)`.
    pub async fn read<B: UserBuffer + ?Sized>(
        &self,
        offset: usize,
        want_len: usize,
        dst: &mut B,
        nonblocking: bool,
    ) -> SessionResult<usize> {
        loop {
            let mut state = self.lock_state().await?;

            // A staged record is delivered before any new sample is rendered
            if offset == 0 && state.fill_len == 0 {
                if let Err(Stale) = state.refresh(&self.slot, self.endpoint.kind, &*self.lookup) {
                    let last_seen = state.last_seen;
                    drop(state);
                    if nonblocking {
                        trace!("[{}] no fresh data, not blocking", self.endpoint);
                        return Ok(0);
                    }
                    self.wait_for_update(last_seen).await?;
                    continue;
                }
            }

            return state.deliver(offset, want_len, dst);
        }
    }

    /// Switch rendering mode. A record already staged keeps its old format.
    pub async fn set_mode(&self, mode: Mode) -> SessionResult<()> {
        let mut state = self.lock_state().await?;
        if state.mode != mode {
            debug!("[{}] mode {:?} -> {:?}", self.endpoint, state.mode, mode);
            state.mode = mode;
        }
        Ok(())
    }

    /// Numeric control entry point. Only [`MODE_CMD`] is understood.
    pub async fn control(&self, cmd: u32, arg: u32) -> SessionResult<Mode> {
        if cmd != MODE_CMD {
            return Err(SessionError::invalid_argument(format!(
                "unknown control command {:#x}",
                cmd
            )));
        }
        let mode = Mode::try_from(arg)?;
        self.set_mode(mode).await?;
        Ok(mode)
    }

    /// Read-only access to the raw slot, bypassing this session's buffer
    pub fn map_view(&self) -> SlotView {
        self.slot.view()
    }

    pub fn close(self) {
        debug!("[{}] session closed", self.endpoint);
    }
}
