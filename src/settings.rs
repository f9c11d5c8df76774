//! Protection settings
//!
//! Built once per `protect` call from an optional JSON options object. Every
//! key is optional and falls back to its default independently of the others.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VapeError};
use crate::field::{FieldInfo, FieldTag, INPUT_TYPES};

/// A selector predicate that removes a field from protection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IgnoreRule {
    /// `:submit`, `:password`, `[type=hidden]`, ...
    InputType(String),
    /// `#id`
    Id(String),
    /// `[name=x]`
    Name(String),
    /// `.class`
    Class(String),
    /// `input` or `textarea`
    Tag(FieldTag),
}

impl IgnoreRule {
    pub fn parse(selector: &str) -> Result<Self> {
        let s = selector.trim();
        let invalid = || VapeError::InvalidSelector(selector.to_string());

        if let Some(ty) = s.strip_prefix(':') {
            return non_empty(ty).and_then(input_type).map(Self::InputType).ok_or_else(invalid);
        }
        if let Some(id) = s.strip_prefix('#') {
            return non_empty(id).map(|i| Self::Id(i.to_string())).ok_or_else(invalid);
        }
        if let Some(class) = s.strip_prefix('.') {
            return non_empty(class).map(|c| Self::Class(c.to_string())).ok_or_else(invalid);
        }
        if let Some(attr) = s.strip_prefix('[').and_then(|a| a.strip_suffix(']')) {
            let (attr, value) = attr.split_once('=').ok_or_else(invalid)?;
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            let value = non_empty(value).ok_or_else(invalid)?;
            return match attr.trim().to_ascii_lowercase().as_str() {
                "type" => input_type(value).map(Self::InputType).ok_or_else(invalid),
                "name" => Ok(Self::Name(value.to_string())),
                "id" => Ok(Self::Id(value.to_string())),
                _ => Err(invalid()),
            };
        }
        match s.to_ascii_lowercase().as_str() {
            "input" => Ok(Self::Tag(FieldTag::Input)),
            "textarea" => Ok(Self::Tag(FieldTag::TextArea)),
            _ => Err(invalid()),
        }
    }

    /// Whether this rule excludes the described field
    pub fn matches(&self, field: &FieldInfo) -> bool {
        match self {
            IgnoreRule::InputType(ty) => field.tag == FieldTag::Input && field.input_type == *ty,
            IgnoreRule::Id(id) => field.id.as_deref() == Some(id.as_str()),
            IgnoreRule::Name(name) => field.name.as_deref() == Some(name.as_str()),
            IgnoreRule::Class(class) => field.classes.iter().any(|c| c == class),
            IgnoreRule::Tag(tag) => field.tag == *tag,
        }
    }
}

/// Lowercased `ty` if it names a real input type
fn input_type(ty: &str) -> Option<String> {
    let ty = ty.to_ascii_lowercase();
    INPUT_TYPES.contains(&ty.as_str()).then_some(ty)
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

impl TryFrom<String> for IgnoreRule {
    type Error = VapeError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<IgnoreRule> for String {
    fn from(rule: IgnoreRule) -> Self {
        rule.to_string()
    }
}

impl fmt::Display for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreRule::InputType(ty) => write!(f, ":{ty}"),
            IgnoreRule::Id(id) => write!(f, "#{id}"),
            IgnoreRule::Name(name) => write!(f, "[name={name}]"),
            IgnoreRule::Class(class) => write!(f, ".{class}"),
            IgnoreRule::Tag(tag) => f.write_str(tag.as_str()),
        }
    }
}

/// Protection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Fields matching any of these are never saved or restored
    #[serde(alias = "ignore_fields")]
    pub ignore_fields: Vec<IgnoreRule>,
    /// Use cookies when localStorage is missing
    #[serde(alias = "fallback_to_cookies")]
    pub fallback_to_cookies: bool,
    /// Lifetime of saved cookies, in days
    #[serde(alias = "cookie_expires")]
    pub cookie_expires_days: f64,

    // === Cookie attributes ===
    pub cookie_path: Option<String>,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ignore_fields: vec![
                IgnoreRule::InputType("submit".into()),
                IgnoreRule::InputType("reset".into()),
                IgnoreRule::InputType("button".into()),
                IgnoreRule::InputType("file".into()),
                IgnoreRule::InputType("password".into()),
            ],
            fallback_to_cookies: true,
            cookie_expires_days: 7.0,

            cookie_path: None,
            cookie_domain: None,
            cookie_secure: false,
        }
    }
}

impl Settings {
    /// Merge a JSON options object over the defaults
    pub fn from_json(options: &str) -> Result<Self> {
        if options.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_json::from_str(options)?;
        log::debug!("Parsed settings: {:?}", settings);
        Ok(settings)
    }

    /// Whether any ignore rule excludes this field
    pub fn is_ignored(&self, field: &FieldInfo) -> bool {
        self.ignore_fields.iter().any(|rule| rule.matches(field))
    }
}
