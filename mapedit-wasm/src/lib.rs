use std::cell::RefCell;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use futures_util::lock::{Mutex, MutexGuard};
use wasm_bindgen::prelude::*;

use mapedit::transaction::{settle, CommitReport};
use mapedit::EditorSession;

mod api;
mod bridge;
mod error;
mod interop;

type Deferred = Box<dyn FnOnce(&mut EditorSession)>;

/// The session plus calls that arrived while it was locked. Commits are sent
/// with the session released, except the ones a cascading delete waits on.
#[derive(Clone)]
pub(crate) struct Shared {
    session: Rc<Mutex<EditorSession>>,
    deferred: Rc<RefCell<Vec<Deferred>>>,
}

impl Shared {
    fn run_deferred(&self, s: &mut EditorSession) {
        let ops = std::mem::take(&mut *self.deferred.borrow_mut());
        for op in ops {
            op(s);
        }
    }

    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, EditorSession>> {
        let mut guard = self.session.try_lock()?;
        self.run_deferred(&mut guard);
        Some(guard)
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, EditorSession> {
        let mut guard = self.session.lock().await;
        self.run_deferred(&mut guard);
        guard
    }

    /// Applies what was deferred meanwhile, then lets go of the session.
    pub(crate) fn release(&self, mut guard: MutexGuard<'_, EditorSession>) {
        self.run_deferred(&mut guard);
    }

    /// Runs `op` now, or as soon as the current holder releases the session.
    pub(crate) fn defer(&self, op: impl FnOnce(&mut EditorSession) + 'static) {
        match self.try_lock() {
            Some(mut guard) => op(&mut guard),
            None => self.deferred.borrow_mut().push(Box::new(op)),
        }
    }

    /// Sends commits taken from the session while nothing holds it, then
    /// applies assigned ids.
    pub(crate) async fn flush(&self, pending: Vec<LocalBoxFuture<'static, CommitReport>>) -> CommitReport {
        if pending.is_empty() {
            return CommitReport::default();
        }
        let report = settle(pending).await;
        let mut s = self.lock().await;
        s.tick();
        self.release(s);
        report
    }
}

/// Browser handle on one editor session. Sync calls fail with `busy` while
/// an async call holds the session, except the ones that must always land
/// (abort, cancel, close), which are applied once it is released.
#[wasm_bindgen]
pub struct Editor {
    pub(crate) shared: Shared,
}

impl Editor {
    pub fn rs_new(session: EditorSession) -> Editor {
        Editor { shared: Shared { session: Rc::new(Mutex::new(session)), deferred: Rc::new(RefCell::new(Vec::new())) } }
    }
}

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool { metadata.level() <= log::max_level() }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            log::Level::Info => web_sys::console::info_1(&msg),
            _ => web_sys::console::debug_1(&msg),
        }
    }

    fn flush(&self) {}
}

/// Routes `log` records to the browser console. `level` is one of error,
/// warn, info, debug, trace; anything else means warn.
#[wasm_bindgen]
pub fn init_logging(level: &str) {
    let filter = level.parse().unwrap_or(log::LevelFilter::Warn);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(filter);
    }
}
