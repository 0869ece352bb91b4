// Form value checks per attribute type. Empty values pass unless required.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::config::{AttributeDef, AttributeKind};

fn re(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, v: &str) -> bool {
    re(cell, pattern).map_or(false, |r| r.is_match(v))
}

static INTEGER: OnceLock<Option<Regex>> = OnceLock::new();
static DECIMAL: OnceLock<Option<Regex>> = OnceLock::new();
static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
static URL: OnceLock<Option<Regex>> = OnceLock::new();
static COLOR: OnceLock<Option<Regex>> = OnceLock::new();

pub fn integer(v: &str) -> bool { matches(&INTEGER, r"^[-+]?\d+$", v) }

pub fn decimal(v: &str) -> bool { matches(&DECIMAL, r"^[-+]?\d+([.,]\d+)?$", v) }

pub fn email(v: &str) -> bool { matches(&EMAIL, r"^[^\s@]+@[^\s@]+\.[^\s@]+$", v) }

pub fn url(v: &str) -> bool { matches(&URL, r"^(https?|ftp)://[^\s/$.?#][^\s]*$", v) }

pub fn color(v: &str) -> bool {
    matches(&COLOR, r"^(#([0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})|rgba?\(\s*\d{1,3}\s*,\s*\d{1,3}\s*,\s*\d{1,3}\s*(,\s*[\d.]+\s*)?\))$", v)
}

pub fn date(v: &str) -> bool { NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok() }

pub fn time(v: &str) -> bool {
    NaiveTime::parse_from_str(v, "%H:%M:%S").is_ok() || NaiveTime::parse_from_str(v, "%H:%M").is_ok()
}

pub fn datetime(v: &str) -> bool {
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .any(|f| NaiveDateTime::parse_from_str(v, f).is_ok())
}

/// Single-line free text.
pub fn text(v: &str) -> bool { !v.contains(['\n', '\r']) }

/// Whether a raw form value is acceptable for `attr`.
pub fn value_ok(attr: &AttributeDef, raw: &str) -> bool {
    if raw.is_empty() {
        return !attr.required;
    }
    match attr.kind {
        AttributeKind::Text => text(raw),
        AttributeKind::Integer => integer(raw),
        AttributeKind::Decimal => decimal(raw),
        AttributeKind::Email => email(raw),
        AttributeKind::Url => url(raw),
        AttributeKind::Date => date(raw),
        AttributeKind::Time => time(raw),
        AttributeKind::Datetime => datetime(raw),
        AttributeKind::Color => color(raw),
        _ => true,
    }
}
