use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::PluginError;

/// Substring the host puts in an entity's image path while it still shows
/// the generated default image.
pub const DEFAULT_IMAGE_MARKER: &str = "&default=true";

/// Connection details the host hands to every plugin invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerConnection {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub session_cookie: Option<SessionCookie>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionCookie {
    pub value: String,
}

impl ServerConnection {
    /// The host binds to `0.0.0.0` by default, which is not dialable.
    pub fn graphql_url(&self) -> String {
        let host = self.host.replace("0.0.0.0", "127.0.0.1");
        format!("{}://{}:{}/graphql", self.scheme, host, self.port)
    }

    pub fn session(&self) -> Option<&str> {
        self.session_cookie
            .as_ref()
            .map(|cookie| cookie.value.as_str())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub aliases: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_path: String,
}

/// The host sends `null` for tags that never had an image.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl TagRecord {
    pub fn has_default_image(&self) -> bool {
        self.image_path.contains(DEFAULT_IMAGE_MARKER)
    }

    /// Search terms to try for this tag: its name first, then each alias.
    pub fn search_candidates(&self) -> Vec<String> {
        std::iter::once(self.name.clone())
            .chain(self.aliases.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Scene,
    Tag,
    Performer,
    Group,
}

impl FromStr for ItemType {
    type Err = PluginError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scene" => Ok(Self::Scene),
            "tag" => Ok(Self::Tag),
            "performer" => Ok(Self::Performer),
            "group" => Ok(Self::Group),
            other => Err(PluginError::invalid_argument(format!(
                "unknown item_type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scene => "scene",
            Self::Tag => "tag",
            Self::Performer => "performer",
            Self::Group => "group",
        })
    }
}

/// The two cover slots of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupImageSlot {
    Front,
    Back,
}

impl GroupImageSlot {
    pub fn from_front_flag(is_front_img: bool) -> Self {
        if is_front_img {
            Self::Front
        } else {
            Self::Back
        }
    }
}

/// Which host entity field a saved image lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverTarget {
    Scene,
    Tag,
    Performer,
    Group(GroupImageSlot),
}

impl CoverTarget {
    /// Groups need to know which slot to fill; other types ignore the flag.
    pub fn resolve(item_type: ItemType, is_front_img: Option<bool>) -> Result<Self, PluginError> {
        Ok(match item_type {
            ItemType::Scene => Self::Scene,
            ItemType::Tag => Self::Tag,
            ItemType::Performer => Self::Performer,
            ItemType::Group => {
                let Some(is_front_img) = is_front_img else {
                    return Err(PluginError::invalid_argument(
                        "is_front_img is required for groups",
                    ));
                };
                Self::Group(GroupImageSlot::from_front_flag(is_front_img))
            }
        })
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            Self::Scene => ItemType::Scene,
            Self::Tag => ItemType::Tag,
            Self::Performer => ItemType::Performer,
            Self::Group(_) => ItemType::Group,
        }
    }
}
