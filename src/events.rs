use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::model::Feature;

/// Toolbar tools named in toggle and change-edit events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Draw,
    Attribute,
    Delete,
    Edit,
    Cancel,
    Save,
}

impl std::str::FromStr for Tool {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "draw" => Tool::Draw,
            "attribute" => Tool::Attribute,
            "delete" => Tool::Delete,
            "edit" => Tool::Edit,
            "cancel" => Tool::Cancel,
            "save" => Tool::Save,
            other => return Err(format!("unknown tool {other}")),
        })
    }
}

/// Notifications emitted toward the toolbar and other listeners.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    Select { features: Vec<Feature> },
    ChangeEdit { tool: Tool, active: bool },
    EditsChange { pending: bool },
    EnableInteraction,
}

/// Shared outbox. Commit futures outlive the borrow of the session, so they
/// post through a cloned handle.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    inner: Rc<RefCell<Vec<EditorEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self { Self::default() }

    pub fn emit(&self, ev: EditorEvent) {
        log::trace!("event {:?}", ev);
        self.inner.borrow_mut().push(ev);
    }

    pub fn drain(&self) -> Vec<EditorEvent> { std::mem::take(&mut *self.inner.borrow_mut()) }

    pub fn len(&self) -> usize { self.inner.borrow().len() }

    pub fn is_empty(&self) -> bool { self.inner.borrow().is_empty() }
}
