use std::collections::VecDeque;

/// Work posted from inside an interaction callback, run on the next turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deferred {
    /// Drop the most recent fixed vertex of the sketch.
    RemoveLastPoint,
}

/// Cooperative next-turn queue. Callers post while handling an event; the
/// session drains it before handling the next one.
#[derive(Clone, Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Deferred>,
}

impl TaskQueue {
    pub fn new() -> Self { Self::default() }

    pub fn post(&mut self, task: Deferred) {
        log::trace!("deferred {:?}", task);
        self.tasks.push_back(task);
    }

    pub fn take(&mut self) -> Vec<Deferred> { self.tasks.drain(..).collect() }

    pub fn len(&self) -> usize { self.tasks.len() }

    pub fn is_empty(&self) -> bool { self.tasks.is_empty() }
}
