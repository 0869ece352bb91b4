//! Editor and layer configuration, deserialized from the host's JSON options.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::tolerance::DEFAULT_SNAP_TOLERANCE;
use crate::model::{default_geometry_name, GeometryType};

fn default_true() -> bool { true }

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorOptions {
    #[serde(default)]
    pub current_layer: Option<String>,
    pub editable_layers: Vec<String>,
    /// Every layer the editor knows about: editable layers and extra snap sources.
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub auto_save: bool,
    #[serde(default)]
    pub auto_form: bool,
    #[serde(default)]
    pub validate_on_draw: bool,
    #[serde(default)]
    pub snap_tolerance: Option<f64>,
    #[serde(default)]
    pub trace: bool,
    #[serde(default = "default_true")]
    pub snap: bool,
    #[serde(default)]
    pub snap_layers: Option<Vec<String>>,
    #[serde(default)]
    pub is_active: bool,
}

impl EditorOptions {
    /// Pixel tolerance for snapping and trace candidates. Zero means unset.
    pub fn snap_tolerance(&self) -> f64 {
        match self.snap_tolerance {
            Some(t) if t > 0.0 && t.is_finite() => t,
            _ => DEFAULT_SNAP_TOLERANCE,
        }
    }

    /// Layers the editable layers snap and trace against.
    pub fn snap_layers(&self) -> Vec<String> {
        self.snap_layers.clone().unwrap_or_else(|| self.editable_layers.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditOperation {
    Create,
    UpdateGeometry,
    UpdateAttributes,
    Delete,
}

impl EditOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            EditOperation::Create => "create",
            EditOperation::UpdateGeometry => "updateGeometry",
            EditOperation::UpdateAttributes => "updateAttributes",
            EditOperation::Delete => "delete",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub geometry_type: Option<GeometryType>,
    #[serde(default = "default_geometry_name")]
    pub geometry_name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    /// Absent means every operation is allowed.
    #[serde(default)]
    pub allowed_edit_operations: Option<Vec<EditOperation>>,
    #[serde(default)]
    pub is_table: bool,
    #[serde(default)]
    pub attachments: Option<AttachmentsConfig>,
    #[serde(default)]
    pub related_layers: Vec<RelatedTableConfig>,
}

impl LayerConfig {
    pub fn new(name: impl Into<String>, geometry_type: Option<GeometryType>) -> Self {
        LayerConfig {
            name: name.into(),
            title: None,
            geometry_type,
            geometry_name: default_geometry_name(),
            attributes: Vec::new(),
            allowed_edit_operations: None,
            is_table: false,
            attachments: None,
            related_layers: Vec::new(),
        }
    }

    pub fn allows(&self, op: EditOperation) -> bool {
        self.allowed_edit_operations.as_ref().map_or(true, |ops| ops.contains(&op))
    }

    pub fn title(&self) -> &str { self.title.as_deref().unwrap_or("Information") }

    /// Whether `attr` holds an attachment link or file name rather than user data.
    pub fn is_attachment_attribute(&self, attr: &str) -> bool {
        self.attachments.as_ref().map_or(false, |a| {
            a.groups.iter().any(|g| g.link_attribute.as_deref() == Some(attr) || g.file_name_attribute.as_deref() == Some(attr))
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentsConfig {
    #[serde(default)]
    pub form_title: Option<String>,
    #[serde(default)]
    pub groups: Vec<AttachmentGroup>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub link_attribute: Option<String>,
    #[serde(default)]
    pub file_name_attribute: Option<String>,
}

/// What happens to child rows when their parent is deleted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    Cascade,
    Db,
    #[default]
    None,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedTableConfig {
    pub layer_name: String,
    /// Child attribute holding the parent's key.
    #[serde(default)]
    pub child_link_field: Option<String>,
    /// Parent attribute the child points at; the feature id when absent.
    #[serde(default)]
    pub parent_link_field: Option<String>,
    #[serde(default)]
    pub cascading_delete: DeleteMode,
    #[serde(default)]
    pub promote_attribs: Vec<PromotedAttribute>,
}

impl RelatedTableConfig {
    pub fn new(layer_name: impl Into<String>, mode: DeleteMode) -> Self {
        RelatedTableConfig {
            layer_name: layer_name.into(),
            child_link_field: None,
            parent_link_field: None,
            cascading_delete: mode,
            promote_attribs: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotedAttribute {
    pub parent_name: String,
    #[serde(default)]
    pub child_name: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeKind {
    #[default]
    Text,
    Textarea,
    Integer,
    Decimal,
    Email,
    Url,
    Date,
    Time,
    Datetime,
    Color,
    Checkbox,
    Checkboxgroup,
    Dropdown,
    SearchList,
    Image,
    Audio,
    Video,
    Hidden,
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: AttributeKind,
    #[serde(default)]
    pub default_value: Option<DefaultValue>,
    #[serde(default)]
    pub allow_batch_edit: bool,
    #[serde(default)]
    pub constraint: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub config: Option<WidgetConfig>,
    #[serde(default)]
    pub options: Vec<Value>,
    #[serde(default)]
    pub separator: Option<String>,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        AttributeDef { name: Some(name.into()), kind, ..Default::default() }
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().or(self.name.as_deref()).unwrap_or_default()
    }

    pub fn separator(&self) -> &str { self.separator.as_deref().unwrap_or(";") }

    pub fn checked_value(&self) -> Value {
        self.config.as_ref().and_then(|c| c.checked_value.clone()).unwrap_or(Value::from(1))
    }

    pub fn unchecked_value(&self) -> Value {
        self.config.as_ref().and_then(|c| c.unchecked_value.clone()).unwrap_or(Value::from(0))
    }

    pub fn updates_on_edit(&self) -> bool {
        matches!(&self.default_value, Some(DefaultValue::Computed(spec)) if spec.update_on_edit)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(default)]
    pub checked_value: Option<Value>,
    #[serde(default)]
    pub unchecked_value: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Literal(String),
    Computed(DefaultSpec),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefaultSource {
    SessionStorage,
    LocalStorage,
    Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampFormat {
    Date,
    Time,
    Datetime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultSpec {
    #[serde(rename = "type")]
    pub source: DefaultSource,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub time_stamp_format: Option<TimestampFormat>,
    #[serde(rename = "useUTC", default)]
    pub use_utc: bool,
    #[serde(default)]
    pub update_on_edit: bool,
}
