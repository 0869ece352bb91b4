//! Which interaction handlers are live: draw, select, modify, or a temporary sub-tool.

use crate::draw::DrawSession;
use crate::events::{EditorEvent, EventQueue};
use crate::model::FeatureId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditMode {
    /// Select and modify.
    #[default]
    Default,
    /// Draw, with modify kept for adjusting what was just placed.
    Draw,
    /// An external tool owns the pointer.
    Custom,
}

/// Temporary interaction pair installed by a modify tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubTool {
    SplitLineByPoint { target: FeatureId },
}

/// The handler set built for one layer. Rebuilt whenever the layer or its
/// snapping changes.
#[derive(Clone, Debug)]
pub struct Interactions {
    pub layer: String,
    /// `None` while the layer's geometry type is unknown.
    pub draw: Option<DrawSession>,
    pub draw_active: bool,
    pub select_active: bool,
    /// `None` when the layer does not allow geometry updates.
    pub modify_active: Option<bool>,
    pub selection: Vec<FeatureId>,
    pub snap_layers: Vec<String>,
    pub trace: bool,
    pub sub_tool: Option<SubTool>,
}

impl Interactions {
    pub fn new(layer: impl Into<String>, draw: Option<DrawSession>, allow_modify: bool) -> Self {
        Interactions {
            layer: layer.into(),
            draw,
            draw_active: false,
            select_active: true,
            modify_active: allow_modify.then_some(true),
            selection: Vec::new(),
            snap_layers: Vec::new(),
            trace: false,
            sub_tool: None,
        }
    }

    pub fn modify_active(&self) -> bool { self.modify_active.unwrap_or(false) }
}

#[derive(Debug)]
pub struct ModeController {
    interactions: Option<Interactions>,
    mode: EditMode,
    is_draw: bool,
    events: EventQueue,
}

impl ModeController {
    pub fn new(events: EventQueue) -> Self {
        ModeController { interactions: None, mode: EditMode::Default, is_draw: false, events }
    }

    pub fn is_active(&self) -> bool { self.interactions.is_some() }
    pub fn mode(&self) -> EditMode { self.mode }
    pub fn is_draw(&self) -> bool { self.is_draw }
    pub fn set_draw_latch(&mut self, on: bool) { self.is_draw = on; }
    pub fn interactions(&self) -> Option<&Interactions> { self.interactions.as_ref() }
    pub fn interactions_mut(&mut self) -> Option<&mut Interactions> { self.interactions.as_mut() }

    pub fn selection(&self) -> &[FeatureId] {
        self.interactions.as_ref().map_or(&[], |i| i.selection.as_slice())
    }

    /// Replaces the handler set and enters Default mode.
    pub fn install(&mut self, interactions: Interactions) {
        self.teardown();
        log::debug!("interactions built for layer '{}'", interactions.layer);
        self.interactions = Some(interactions);
        self.is_draw = false;
        self.set_active(EditMode::Default);
    }

    /// Removes every handler. Selection is announced as empty since removing
    /// the select handler raises no event of its own. Safe to repeat.
    pub fn teardown(&mut self) -> bool {
        if self.interactions.take().is_none() {
            return false;
        }
        log::debug!("interactions removed");
        self.mode = EditMode::Default;
        self.events.emit(EditorEvent::Select { features: Vec::new() });
        true
    }

    /// Switches mode. Any sub-tool is dropped first.
    pub fn set_active(&mut self, mode: EditMode) {
        self.mode = mode;
        let Some(i) = self.interactions.as_mut() else { return };
        if let Some(t) = i.sub_tool.take() {
            log::debug!("sub-tool {:?} removed", t);
        }
        let modify = |on: bool, m: &mut Option<bool>| {
            if let Some(flag) = m.as_mut() {
                *flag = on;
            }
        };
        match mode {
            EditMode::Draw => {
                i.draw_active = true;
                i.select_active = false;
                modify(true, &mut i.modify_active);
            }
            EditMode::Custom => {
                i.draw_active = false;
                i.select_active = false;
                modify(false, &mut i.modify_active);
            }
            EditMode::Default => {
                i.draw_active = false;
                i.select_active = true;
                modify(true, &mut i.modify_active);
                self.is_draw = false;
            }
        }
    }

    /// Installs a sub-tool in Custom mode.
    pub fn install_sub_tool(&mut self, tool: SubTool) {
        self.set_active(EditMode::Custom);
        if let Some(i) = self.interactions.as_mut() {
            i.sub_tool = Some(tool);
        }
    }

    pub fn sub_tool(&self) -> Option<&SubTool> { self.interactions.as_ref().and_then(|i| i.sub_tool.as_ref()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::DrawShape;
    use crate::model::GeometryType;

    fn controller() -> (ModeController, EventQueue) {
        let q = EventQueue::new();
        (ModeController::new(q.clone()), q)
    }

    fn interactions() -> Interactions {
        Interactions::new("roads", Some(DrawSession::new(GeometryType::LineString, DrawShape::Vertices, true)), true)
    }

    #[test]
    fn modes_toggle_handlers() {
        let (mut c, _) = controller();
        c.install(interactions());
        c.set_active(EditMode::Draw);
        let i = c.interactions().unwrap();
        assert!(i.draw_active && !i.select_active && i.modify_active());
        c.set_active(EditMode::Custom);
        let i = c.interactions().unwrap();
        assert!(!i.draw_active && !i.select_active && !i.modify_active());
    }

    #[test]
    fn teardown_twice_is_noop() {
        let (mut c, q) = controller();
        c.install(interactions());
        q.drain();
        assert!(c.teardown());
        assert!(!c.teardown());
        assert_eq!(q.drain(), vec![EditorEvent::Select { features: Vec::new() }]);
    }

    #[test]
    fn mode_change_drops_sub_tool() {
        let (mut c, _) = controller();
        c.install(interactions());
        c.install_sub_tool(SubTool::SplitLineByPoint { target: "1".into() });
        assert!(c.sub_tool().is_some());
        c.set_active(EditMode::Default);
        assert!(c.sub_tool().is_none());
    }
}
