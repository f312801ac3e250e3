use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use condop_app::ports::{AtomicOp, BoxFuture, OpFactory, OpStatus};
use condop_domain::error::{DispatchError, ExecutionError, NotFoundError};
use condop_domain::operation::OpSpec;

/// One key transition seen by the virtual keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Down(String),
    Up(String),
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down(key) => write!(f, "down:{key}"),
            Self::Up(key) => write!(f, "up:{key}"),
        }
    }
}

/// Journal entries kept when no capacity is configured.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 1024;

struct Keyboard {
    journal: Mutex<VecDeque<KeyEvent>>,
    journal_capacity: AtomicUsize,
    key_events: AtomicU64,
    held: Mutex<BTreeSet<String>>,
    unplugged: AtomicBool,
}

impl Default for Keyboard {
    fn default() -> Self {
        Self {
            journal: Mutex::default(),
            journal_capacity: AtomicUsize::new(DEFAULT_JOURNAL_CAPACITY),
            key_events: AtomicU64::new(0),
            held: Mutex::default(),
            unplugged: AtomicBool::new(false),
        }
    }
}

impl Keyboard {
    fn down(&self, key: &str) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
        self.log(KeyEvent::Down(key.to_string()));
    }

    fn up(&self, key: &str) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        self.log(KeyEvent::Up(key.to_string()));
    }

    /// Press `key` unless it is already down. Returns whether it was pressed.
    fn down_if_up(&self, key: &str) -> bool {
        let pressed = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
        if pressed {
            self.log(KeyEvent::Down(key.to_string()));
        }
        pressed
    }

    /// Release `key` if it is down. Returns whether it was released.
    fn up_if_down(&self, key: &str) -> bool {
        let released = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if released {
            self.log(KeyEvent::Up(key.to_string()));
        }
        released
    }

    fn log(&self, event: KeyEvent) {
        tracing::trace!(%event, "virtual key");
        self.key_events.fetch_add(1, Ordering::Relaxed);
        let capacity = self.journal_capacity.load(Ordering::Relaxed);
        let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        while journal.len() >= capacity {
            journal.pop_front();
        }
        journal.push_back(event);
    }
}

/// A keyboard that records key transitions instead of sending them.
///
/// Acts as the [`OpFactory`] for every [`OpSpec`]. Clones share the same
/// keyboard.
#[derive(Clone, Default)]
pub struct VirtualInput {
    keyboard: Arc<Keyboard>,
    layout: Option<Arc<HashSet<String>>>,
}

impl VirtualInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept specs naming one of `keys`.
    #[must_use]
    pub fn with_layout<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.layout = Some(Arc::new(keys.into_iter().map(Into::into).collect()));
        self
    }

    /// Keep at most `capacity` journal entries, dropping the oldest first.
    /// Applies to every clone.
    #[must_use]
    pub fn with_journal_capacity(self, capacity: usize) -> Self {
        self.keyboard
            .journal_capacity
            .store(capacity.max(1), Ordering::Relaxed);
        self
    }

    /// The most recent key transitions, oldest first.
    #[must_use]
    pub fn journal(&self) -> Vec<KeyEvent> {
        self.keyboard
            .journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Key transitions sent since creation, including those no longer in
    /// the journal.
    #[must_use]
    pub fn key_event_count(&self) -> u64 {
        self.keyboard.key_events.load(Ordering::Relaxed)
    }

    pub fn clear_journal(&self) {
        self.keyboard
            .journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Keys currently down, sorted.
    #[must_use]
    pub fn held_keys(&self) -> Vec<String> {
        self.keyboard
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Simulate the device going away: every execution fails until
    /// [`plug_in`](Self::plug_in).
    pub fn unplug(&self) {
        self.keyboard.unplugged.store(true, Ordering::SeqCst);
    }

    pub fn plug_in(&self) {
        self.keyboard.unplugged.store(false, Ordering::SeqCst);
    }
}

impl OpFactory for VirtualInput {
    fn build(&self, spec: &OpSpec) -> Result<Arc<dyn AtomicOp>, DispatchError> {
        spec.validate()?;
        if let (
            Some(layout),
            OpSpec::Press { key, .. } | OpSpec::Hold { key } | OpSpec::Release { key },
        ) = (&self.layout, spec)
            && !layout.contains(key)
        {
            return Err(NotFoundError {
                kind: "key",
                name: key.clone(),
            }
            .into());
        }
        Ok(Arc::new(VirtualOp {
            spec: spec.clone(),
            keyboard: self.keyboard.clone(),
            engaged: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }))
    }
}

/// An [`OpSpec`] bound to a virtual keyboard.
struct VirtualOp {
    spec: OpSpec,
    keyboard: Arc<Keyboard>,
    /// This op pressed a key that may still be down.
    engaged: AtomicBool,
    disposed: AtomicBool,
}

impl VirtualOp {
    fn failed(&self, reason: &str) -> ExecutionError {
        ExecutionError::Failed {
            op: self.spec.to_string(),
            reason: reason.to_string(),
        }
    }

    async fn run(&self) -> Result<OpStatus, ExecutionError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(ExecutionError::Disposed(self.spec.to_string()));
        }
        if self.keyboard.unplugged.load(Ordering::SeqCst) {
            return Err(self.failed("input device unplugged"));
        }

        match &self.spec {
            OpSpec::Press { key, hold_ms } => {
                self.keyboard.down(key);
                self.engaged.store(true, Ordering::SeqCst);
                if *hold_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(*hold_ms)).await;
                }
                self.engaged.store(false, Ordering::SeqCst);
                self.keyboard.up(key);
                Ok(OpStatus::Completed)
            }
            OpSpec::Hold { key } => {
                self.keyboard.down_if_up(key);
                self.engaged.store(true, Ordering::SeqCst);
                Ok(OpStatus::Running)
            }
            OpSpec::Release { key } => {
                self.keyboard.up_if_down(key);
                Ok(OpStatus::Completed)
            }
            OpSpec::Wait { millis } => {
                tokio::time::sleep(Duration::from_millis(*millis)).await;
                Ok(OpStatus::Completed)
            }
        }
    }
}

impl AtomicOp for VirtualOp {
    fn label(&self) -> String {
        self.spec.to_string()
    }

    fn execute(&self) -> BoxFuture<'_, Result<OpStatus, ExecutionError>> {
        Box::pin(self.run())
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        // a hold, or a press interrupted before its release
        if self.engaged.swap(false, Ordering::SeqCst)
            && let OpSpec::Press { key, .. } | OpSpec::Hold { key } = &self.spec
            && self.keyboard.up_if_down(key)
        {
            tracing::debug!(%key, "released key on dispose");
        }
    }
}
