// Default attribute values for new features and for attributes that refresh
// when their dialog opens.

use chrono::{Local, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::collab::EditorUi;
use crate::config::{AttributeDef, AttributeKind, DefaultSource, DefaultValue, TimestampFormat};

pub fn format_timestamp(at: NaiveDateTime, format: Option<TimestampFormat>) -> String {
    let pattern = match format {
        Some(TimestampFormat::Date) => "%Y-%m-%d",
        Some(TimestampFormat::Time) => "%H:%M:%S",
        Some(TimestampFormat::Datetime) => "%Y-%m-%d %H:%M:%S",
        None => "%Y-%m-%dT%H:%M:%S",
    };
    at.format(pattern).to_string()
}

/// Default for one attribute, or `None` when it has none.
pub fn default_value(attr: &AttributeDef, ui: &dyn EditorUi) -> Option<Value> {
    match &attr.default_value {
        Some(DefaultValue::Literal(s)) => Some(Value::String(s.clone())),
        Some(DefaultValue::Computed(spec)) => match spec.source {
            DefaultSource::SessionStorage | DefaultSource::LocalStorage => {
                let key = spec.key.as_deref()?;
                let session = spec.source == DefaultSource::SessionStorage;
                Some(ui.storage_item(session, key).map_or(Value::Null, Value::String))
            }
            DefaultSource::Timestamp => {
                let now = if spec.use_utc { Utc::now().naive_utc() } else { Local::now().naive_local() };
                Some(Value::String(format_timestamp(now, spec.time_stamp_format)))
            }
        },
        None if attr.kind == AttributeKind::Checkbox => attr.config.as_ref().and_then(|c| c.unchecked_value.clone()),
        None => None,
    }
}

/// Defaults for every named attribute that has one.
pub fn default_values(attrs: &[AttributeDef], ui: &dyn EditorUi) -> Map<String, Value> {
    attrs
        .iter()
        .filter_map(|a| {
            let name = a.name.as_ref()?;
            default_value(a, ui).map(|v| (name.clone(), v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DefaultSpec, WidgetConfig};
    use chrono::NaiveDate;

    struct Storage;
    impl EditorUi for Storage {
        fn alert(&self, _: &str) {}
        fn confirm(&self, _: &str) -> bool { true }
        fn storage_item(&self, session: bool, key: &str) -> Option<String> {
            (session && key == "user").then(|| "anna".to_string())
        }
    }

    #[test]
    fn timestamp_formats() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(7, 8, 9).unwrap();
        assert_eq!(format_timestamp(at, Some(TimestampFormat::Date)), "2024-03-05");
        assert_eq!(format_timestamp(at, Some(TimestampFormat::Time)), "07:08:09");
        assert_eq!(format_timestamp(at, Some(TimestampFormat::Datetime)), "2024-03-05 07:08:09");
        assert_eq!(format_timestamp(at, None), "2024-03-05T07:08:09");
    }

    #[test]
    fn literal_storage_and_checkbox() {
        let mut lit = AttributeDef::new("kind", AttributeKind::Text);
        lit.default_value = Some(DefaultValue::Literal("road".into()));
        let mut stored = AttributeDef::new("by", AttributeKind::Text);
        stored.default_value = Some(DefaultValue::Computed(DefaultSpec {
            source: DefaultSource::SessionStorage,
            key: Some("user".into()),
            time_stamp_format: None,
            use_utc: false,
            update_on_edit: false,
        }));
        let mut cb = AttributeDef::new("done", AttributeKind::Checkbox);
        cb.config = Some(WidgetConfig { checked_value: None, unchecked_value: Some(Value::from("nej")) });
        let plain = AttributeDef::new("note", AttributeKind::Text);
        let m = default_values(&[lit, stored, cb, plain], &Storage);
        assert_eq!(m.get("kind"), Some(&Value::from("road")));
        assert_eq!(m.get("by"), Some(&Value::from("anna")));
        assert_eq!(m.get("done"), Some(&Value::from("nej")));
        assert!(!m.contains_key("note"));
    }
}
