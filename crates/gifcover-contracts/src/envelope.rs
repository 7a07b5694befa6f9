use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{PluginError, PluginResult};
use crate::host::{CoverTarget, ItemType, ServerConnection};
use crate::images::AspectFilter;

pub const MODE_GET_GALLERIES: &str = "getGalleries";
pub const MODE_GET_SET: &str = "getSet";
pub const MODE_SAVE_IMAGE: &str = "saveImage";
pub const MODE_SET_TAGS: &str = "setTags";

/// Raw request as the host writes it to the plugin's stdin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginInput {
    #[serde(default)]
    pub server_connection: Option<ServerConnection>,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PluginRequest {
    GetGalleries {
        query: String,
        offset: u64,
        aspect: AspectFilter,
    },
    GetSet {
        set_url: String,
        aspect: AspectFilter,
    },
    SaveImage {
        id: String,
        target: CoverTarget,
        img_src: String,
    },
    SetTags,
}

impl PluginInput {
    pub fn from_json(raw: &str) -> PluginResult<Self> {
        serde_json::from_str(raw)
            .map_err(|err| PluginError::parse(format!("invalid plugin input: {err}")))
    }

    /// The host nests the mode inside `args`; a top-level `mode` is honoured
    /// when `args` carries none.
    pub fn mode(&self) -> Option<String> {
        value_as_non_empty_string(self.args.get("mode"))
            .or_else(|| self.mode.as_deref().map(str::trim).map(str::to_string))
            .filter(|mode| !mode.is_empty())
    }

    pub fn request(&self) -> PluginResult<PluginRequest> {
        let Some(mode) = self.mode() else {
            return Err(PluginError::UnsupportedMode(String::new()));
        };
        match mode.as_str() {
            MODE_GET_GALLERIES => Ok(PluginRequest::GetGalleries {
                query: self.required_string("query")?,
                offset: self.optional_u64("offset")?.unwrap_or(0),
                aspect: self.aspect()?,
            }),
            MODE_GET_SET => Ok(PluginRequest::GetSet {
                set_url: self.required_string("set_url")?,
                aspect: self.aspect()?,
            }),
            MODE_SAVE_IMAGE => {
                let item_type = self.required_string("item_type")?.parse::<ItemType>()?;
                let is_front_img = match item_type {
                    ItemType::Group => self.optional_bool("is_front_img")?,
                    _ => None,
                };
                Ok(PluginRequest::SaveImage {
                    id: self.required_id("id")?,
                    target: CoverTarget::resolve(item_type, is_front_img)?,
                    img_src: self.required_string("img_src")?,
                })
            }
            MODE_SET_TAGS => Ok(PluginRequest::SetTags),
            _ => Err(PluginError::UnsupportedMode(mode)),
        }
    }

    pub fn connection(&self) -> PluginResult<&ServerConnection> {
        self.server_connection
            .as_ref()
            .ok_or_else(|| PluginError::invalid_argument("server_connection is missing"))
    }

    fn required_string(&self, key: &str) -> PluginResult<String> {
        value_as_non_empty_string(self.args.get(key))
            .ok_or_else(|| PluginError::invalid_argument(format!("'{key}' must be a non-empty string")))
    }

    /// Entity ids arrive as strings from the UI but as numbers from scripts.
    fn required_id(&self, key: &str) -> PluginResult<String> {
        match self.args.get(key) {
            Some(Value::Number(number)) => Ok(number.to_string()),
            other => value_as_non_empty_string(other).ok_or_else(|| {
                PluginError::invalid_argument(format!("'{key}' must be an id"))
            }),
        }
    }

    fn optional_u64(&self, key: &str) -> PluginResult<Option<u64>> {
        match self.args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(number)) => number.as_u64().map(Some).ok_or_else(|| {
                PluginError::invalid_argument(format!("'{key}' must be a non-negative integer"))
            }),
            Some(Value::String(text)) => text.trim().parse::<u64>().map(Some).map_err(|_| {
                PluginError::invalid_argument(format!("'{key}' must be a non-negative integer"))
            }),
            Some(_) => Err(PluginError::invalid_argument(format!(
                "'{key}' must be a non-negative integer"
            ))),
        }
    }

    fn optional_bool(&self, key: &str) -> PluginResult<Option<bool>> {
        match self.args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value_as_bool(value).map(Some).ok_or_else(|| {
                PluginError::invalid_argument(format!("'{key}' must be a boolean"))
            }),
        }
    }

    fn aspect(&self) -> PluginResult<AspectFilter> {
        match value_as_non_empty_string(self.args.get("aspect")) {
            Some(raw) => raw.parse(),
            None => Ok(AspectFilter::Both),
        }
    }
}

/// Single response object written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginOutput {
    #[serde(rename = "Output")]
    pub output: Value,
    #[serde(rename = "Error", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PluginOutput {
    pub fn ok(output: Value) -> Self {
        Self {
            output,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            output: Value::Null,
            error: Some(message.into()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"Output\":null}".to_string())
    }
}

fn value_as_non_empty_string(value: Option<&Value>) -> Option<String> {
    let raw = value
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(raw) => Some(*raw),
        Value::Number(raw) => raw.as_i64().map(|value| value != 0),
        Value::String(raw) => {
            let lowered = raw.trim().to_ascii_lowercase();
            if matches!(lowered.as_str(), "1" | "true" | "yes" | "on") {
                Some(true)
            } else if matches!(lowered.as_str(), "0" | "false" | "no" | "off") {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}
