//! Attribute dialogs: which attributes are editable, their form state, and
//! the breadcrumb stack for nested child dialogs.

use serde_json::{Map, Value};

use crate::algorithms::validate::value_ok;
use crate::collab::EditorUi;
use crate::config::{AttributeDef, AttributeKind, LayerConfig, RelatedTableConfig};
use crate::error::EditorError;
use crate::model::{Feature, FeatureId};

/// Batch mode: several features and at least one batch-editable attribute.
pub fn is_batch(feature_count: usize, attrs: &[AttributeDef]) -> bool {
    feature_count > 1 && attrs.iter().any(|a| a.allow_batch_edit)
}

/// Named attributes that are neither attachment fields nor promoted from a
/// related table. Batch mode keeps only batch-editable ones.
pub fn editable_attributes(layer: &LayerConfig, related: Option<&[RelatedTableConfig]>, batch: bool) -> Vec<AttributeDef> {
    let promoted = |name: &str| {
        related.map_or(false, |rs| rs.iter().any(|r| r.promote_attribs.iter().any(|p| p.parent_name == name)))
    };
    layer
        .attributes
        .iter()
        .filter(|a| match a.name.as_deref() {
            Some(name) => (!batch || a.allow_batch_edit) && !layer.is_attachment_attribute(name) && !promoted(name),
            None => false,
        })
        .cloned()
        .collect()
}

/// `event:attribute:value`, where value may be a bracketed list `[a,b]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    pub event: String,
    pub attribute: String,
    pub accepted: Vec<String>,
}

impl Constraint {
    pub fn parse(expr: &str) -> Result<Constraint, EditorError> {
        let parts: Vec<&str> = expr.split(':').collect();
        let [event, attribute, value] = parts.as_slice() else {
            return Err(EditorError::InvalidConstraint(expr.to_string()));
        };
        let accepted = match value.strip_prefix('[') {
            Some(list) => list.trim_end_matches(']').split(',').map(str::to_string).collect(),
            None => vec![value.to_string()],
        };
        Ok(Constraint { event: event.to_string(), attribute: attribute.to_string(), accepted })
    }

    pub fn admits(&self, value: &str) -> bool { self.accepted.iter().any(|a| a == value) }
}

/// Form widget value.
#[derive(Clone, Debug, PartialEq)]
pub enum FormValue {
    Text(String),
    Checked(bool),
    Choices(Vec<String>),
    /// Media payloads are passed through untouched.
    Media(Value),
}

impl FormValue {
    /// The string a widget would expose as its value.
    pub fn as_text(&self) -> String {
        match self {
            FormValue::Text(s) => s.clone(),
            FormValue::Checked(b) => b.to_string(),
            FormValue::Choices(c) => c.join(","),
            FormValue::Media(v) => value_text(v),
        }
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn initial_value(def: &AttributeDef, v: Option<&Value>) -> FormValue {
    match def.kind {
        AttributeKind::Checkbox => FormValue::Checked(v.map_or(false, |v| value_text(v) == value_text(&def.checked_value()))),
        AttributeKind::Checkboxgroup if !def.options.is_empty() => {
            let s = v.map(value_text).unwrap_or_default();
            if s.is_empty() {
                FormValue::Choices(Vec::new())
            } else {
                FormValue::Choices(s.split(def.separator()).map(str::to_string).collect())
            }
        }
        AttributeKind::Checkboxgroup => FormValue::Checked(v.map_or(false, |v| value_text(v) == "1")),
        AttributeKind::Image | AttributeKind::Audio | AttributeKind::Video => FormValue::Media(v.cloned().unwrap_or(Value::Null)),
        _ => FormValue::Text(v.map(value_text).unwrap_or_default()),
    }
}

fn stored_value(def: &AttributeDef, v: &FormValue) -> Value {
    match (def.kind, v) {
        (AttributeKind::Checkbox, FormValue::Checked(b)) => if *b { def.checked_value() } else { def.unchecked_value() },
        (AttributeKind::Checkboxgroup, FormValue::Choices(c)) => Value::String(c.join(def.separator())),
        (AttributeKind::Checkboxgroup, FormValue::Checked(b)) => Value::from(u8::from(*b)),
        (_, FormValue::Media(m)) => m.clone(),
        (_, other) => Value::String(other.as_text()),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub def: AttributeDef,
    pub name: String,
    pub value: FormValue,
    pub visible: bool,
    pub constraint: Option<Constraint>,
    /// Batch "apply this change" box; `None` outside batch mode or for
    /// constrained attributes.
    pub apply: Option<bool>,
}

/// Outcome of saving a dialog.
#[derive(Clone, Debug, PartialEq)]
pub enum DialogSave {
    Saved(usize),
    /// Names of the attributes whose values failed validation.
    Invalid(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttributeDialog {
    pub layer: String,
    pub title: String,
    pub features: Vec<FeatureId>,
    pub batch: bool,
    pub fields: Vec<Field>,
    /// Opened right after the feature was created; aborting deletes it.
    pub auto_created: bool,
    /// The feature has an unsaved insert, so attachments and related rows
    /// cannot be added yet.
    pub requires_save: bool,
    pub related_form: bool,
    pub attachments_form: bool,
}

impl AttributeDialog {
    /// Builds the dialog for `features`, which must not be empty. Values come
    /// from the first feature. Malformed constraints are alerted and leave
    /// their attribute visible.
    pub fn build(
        layer: &LayerConfig,
        related: Option<&[RelatedTableConfig]>,
        features: &[&Feature],
        ui: &dyn EditorUi,
        refresh: impl Fn(&AttributeDef) -> Option<Value>,
    ) -> Option<AttributeDialog> {
        let first = *features.first()?;
        let batch = is_batch(features.len(), &layer.attributes);
        let title = if batch { format!("Batch edit {} ({} features)", layer.title(), features.len()) } else { layer.title().to_string() };
        let fields = editable_attributes(layer, related, batch)
            .into_iter()
            .filter_map(|def| {
                let name = def.name.clone()?;
                let refreshed = if def.updates_on_edit() { refresh(&def) } else { None };
                let value = initial_value(&def, refreshed.as_ref().or_else(|| first.get(&name)));
                let constraint = match def.constraint.as_deref().map(Constraint::parse) {
                    Some(Ok(c)) => Some(c),
                    Some(Err(e)) => {
                        log::error!("{e}");
                        ui.alert(&e.to_string());
                        None
                    }
                    None => None,
                };
                let visible = constraint.as_ref().map_or(true, |c| c.admits(&first.get(&c.attribute).map(value_text).unwrap_or_default()));
                let apply = (batch && constraint.is_none()).then_some(false);
                Some(Field { visible: visible && apply.is_none(), def, name, value, constraint, apply })
            })
            .collect();
        Some(AttributeDialog {
            layer: layer.name.clone(),
            title,
            features: features.iter().map(|f| f.id.clone()).collect(),
            batch,
            fields,
            auto_created: false,
            requires_save: false,
            related_form: related.is_some() && !batch,
            attachments_form: layer.attachments.is_some() && !batch,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Field> { self.fields.iter().find(|f| f.name == name) }

    /// Changes a widget value and re-evaluates constraints that depend on it.
    pub fn set_value(&mut self, name: &str, value: FormValue) -> Result<(), EditorError> {
        let f = self.fields.iter_mut().find(|f| f.name == name).ok_or_else(|| EditorError::UnknownAttribute(name.to_string()))?;
        let text = value.as_text();
        f.value = value;
        for dep in self.fields.iter_mut() {
            if let Some(c) = &dep.constraint {
                if c.attribute == name {
                    dep.visible = c.admits(&text);
                }
            }
        }
        Ok(())
    }

    /// Ticks or clears a batch "apply" box; the attribute shows while ticked.
    pub fn set_apply(&mut self, name: &str, checked: bool) -> Result<(), EditorError> {
        let f = self.fields.iter_mut().find(|f| f.name == name).ok_or_else(|| EditorError::UnknownAttribute(name.to_string()))?;
        if f.apply.is_some() {
            f.apply = Some(checked);
            f.visible = checked;
        }
        Ok(())
    }

    /// Values of the visible attributes, ready to be written to features.
    pub fn collect(&self) -> Result<Map<String, Value>, Vec<String>> {
        let mut out = Map::new();
        let mut invalid = Vec::new();
        for f in self.fields.iter().filter(|f| f.visible) {
            let raw = match &f.value {
                FormValue::Text(s) => s.clone(),
                // non-text widgets only need to satisfy `required`
                other if f.def.required => other.as_text(),
                _ => String::new(),
            };
            let ok = match f.value {
                FormValue::Text(_) => value_ok(&f.def, &raw),
                _ => !f.def.required || !raw.is_empty(),
            };
            if !ok {
                invalid.push(f.name.clone());
                continue;
            }
            out.insert(f.name.clone(), stored_value(&f.def, &f.value));
        }
        if invalid.is_empty() { Ok(out) } else { Err(invalid) }
    }

    pub(crate) fn rename_feature(&mut self, from: &FeatureId, to: &FeatureId) {
        for id in self.features.iter_mut().filter(|id| *id == from) {
            *id = to.clone();
        }
    }
}

/// Saved context of a parent dialog while a child dialog is open.
#[derive(Clone, Debug, PartialEq)]
pub struct Breadcrumb {
    pub layer: String,
    pub title: String,
    pub attributes: Vec<AttributeDef>,
    pub dialog: Option<AttributeDialog>,
    pub parent: Option<FeatureId>,
}

#[derive(Clone, Debug, Default)]
pub struct AttributeSession {
    pub dialog: Option<AttributeDialog>,
    breadcrumbs: Vec<Breadcrumb>,
}

impl AttributeSession {
    pub fn new() -> Self { Self::default() }

    pub fn depth(&self) -> usize { self.breadcrumbs.len() }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] { &self.breadcrumbs }

    /// Stashes the open dialog before a child dialog replaces it.
    pub fn push_child(&mut self, parent: FeatureId) {
        let dialog = self.dialog.take();
        let (layer, title, attributes) = match &dialog {
            Some(d) => (d.layer.clone(), d.title.clone(), d.fields.iter().map(|f| f.def.clone()).collect()),
            None => (String::new(), String::new(), Vec::new()),
        };
        self.breadcrumbs.push(Breadcrumb { layer, title, attributes, dialog, parent: Some(parent) });
    }

    /// Closes the current dialog and brings back its parent, if any.
    pub fn close(&mut self) -> Option<Breadcrumb> {
        let crumb = self.breadcrumbs.pop();
        self.dialog = crumb.as_ref().and_then(|c| c.dialog.clone());
        crumb
    }

    /// Closes every dialog and forgets the stack.
    pub fn close_all(&mut self) {
        self.dialog = None;
        self.breadcrumbs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::LogUi;
    use crate::config::{AttachmentGroup, AttachmentsConfig, DeleteMode, PromotedAttribute};

    fn layer() -> LayerConfig {
        let mut l = LayerConfig::new("parcels", None);
        let mut kind = AttributeDef::new("kind", AttributeKind::Dropdown);
        kind.allow_batch_edit = true;
        let mut area = AttributeDef::new("area", AttributeKind::Decimal);
        area.allow_batch_edit = true;
        area.constraint = Some("change:kind:[field,forest]".into());
        let mut note = AttributeDef::new("note", AttributeKind::Text);
        note.allow_batch_edit = false;
        l.attributes = vec![
            kind,
            area,
            note,
            AttributeDef::new("file", AttributeKind::Text),
            AttributeDef::new("owner", AttributeKind::Text),
            AttributeDef { name: None, ..Default::default() },
        ];
        l.attachments = Some(AttachmentsConfig {
            form_title: None,
            groups: vec![AttachmentGroup { name: None, link_attribute: None, file_name_attribute: Some("file".into()) }],
        });
        l
    }

    fn related() -> Vec<RelatedTableConfig> {
        let mut r = RelatedTableConfig::new("owners", DeleteMode::None);
        r.promote_attribs = vec![PromotedAttribute { parent_name: "owner".into(), child_name: None }];
        vec![r]
    }

    #[test]
    fn filters_attachment_and_promoted() {
        let names: Vec<_> = editable_attributes(&layer(), Some(&related()), false).into_iter().filter_map(|a| a.name).collect();
        assert_eq!(names, vec!["kind", "area", "note"]);
        let batch: Vec<_> = editable_attributes(&layer(), Some(&related()), true).into_iter().filter_map(|a| a.name).collect();
        assert_eq!(batch, vec!["kind", "area"]);
    }

    #[test]
    fn constraint_parsing() {
        let c = Constraint::parse("change:kind:[a,b]").unwrap();
        assert!(c.admits("b") && !c.admits("c"));
        assert_eq!(Constraint::parse("change:kind:x").unwrap().accepted, vec!["x".to_string()]);
        assert!(Constraint::parse("kind=x").is_err());
    }

    #[test]
    fn dependency_toggles_visibility() {
        let mut f = Feature::new(None).with_id("1");
        f.set("kind", Value::from("road"));
        let l = layer();
        let mut d = AttributeDialog::build(&l, None, &[&f], &LogUi::default(), |_| None).unwrap();
        assert!(!d.field("area").unwrap().visible);
        d.set_value("kind", FormValue::Text("forest".into())).unwrap();
        assert!(d.field("area").unwrap().visible);
    }

    #[test]
    fn breadcrumbs_restore_parent() {
        let f = Feature::new(None).with_id("1");
        let l = layer();
        let mut s = AttributeSession::new();
        s.dialog = AttributeDialog::build(&l, None, &[&f], &LogUi::default(), |_| None);
        let parent = s.dialog.clone();
        s.push_child("1".into());
        assert!(s.dialog.is_none());
        assert_eq!(s.depth(), 1);
        assert_eq!(s.breadcrumbs()[0].attributes, parent.as_ref().unwrap().fields.iter().map(|f| f.def.clone()).collect::<Vec<_>>());
        let crumb = s.close().unwrap();
        assert_eq!(crumb.layer, "parcels");
        // the parent comes back exactly as it was stashed
        assert_eq!(s.dialog, parent);
        assert!(s.close().is_none());
        assert!(s.dialog.is_none());
    }
}
