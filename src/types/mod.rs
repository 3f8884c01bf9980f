use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The assigned treatment for a flag.
///
/// A bare string deserializes as shorthand for `{ "value": <string> }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "VariantRepr")]
pub struct Variant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VariantRepr {
    Bare(String),
    Full {
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        payload: Option<serde_json::Value>,
    },
}

impl From<VariantRepr> for Variant {
    fn from(repr: VariantRepr) -> Self {
        match repr {
            VariantRepr::Bare(value) => Variant::new(value),
            VariantRepr::Full { value, payload } => Variant { value, payload },
        }
    }
}

impl Variant {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            payload: None,
        }
    }

    pub fn with_payload(value: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            value: Some(value.into()),
            payload: Some(payload),
        }
    }

    /// The variant returned by a client without an API key.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.payload.is_none()
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::new(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::new(value)
    }
}

/// Where a resolved variant came from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantSource {
    Store,
    CallSite,
    InitialFlags,
    FallbackVariant,
    Default,
    /// The client has no API key.
    Inert,
}

/// Flag key to variant, as produced by one fetch.
pub type VariantMap = HashMap<String, Variant>;

/// One entry of the variants response body: `{ "key": ..., "payload": ... }`.
#[derive(Debug, Clone, Deserialize)]
pub struct FlagAssignment {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

impl From<FlagAssignment> for Variant {
    fn from(assignment: FlagAssignment) -> Self {
        Variant {
            value: assignment.key,
            payload: assignment.payload,
        }
    }
}

/// The subject variants are resolved for.
///
/// Well-known fields serialize under their wire names; everything in
/// `properties` is flattened into the same JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkylabUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(flatten)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl SkylabUser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self::new().user_id(user_id)
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    pub fn device_model(mut self, device_model: impl Into<String>) -> Self {
        self.device_model = Some(device_model.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}
