use serde::{Deserialize, Serialize};

/// MIME type identifying A2UI payloads inside A2A DataParts.
pub const A2UI_MIME_TYPE: &str = "application/json+a2ui";

/// A2A extension URI advertised by agents speaking A2UI v0.8.
pub const V0_8_EXTENSION_URI: &str = "https://a2ui.org/a2a-extension/a2ui/v0.8";

/// A2A extension URI advertised by agents speaking A2UI v0.9.
pub const V0_9_EXTENSION_URI: &str = "https://a2ui.org/a2a-extension/a2ui/v0.9";

/// Canonical id of the v0.8 standard catalog.
pub const V0_8_STANDARD_CATALOG_ID: &str =
    "https://a2ui.org/specification/v0.8/standard_catalog.json";

/// Aliases accepted for the v0.8 standard catalog on the wire.
pub const V0_8_STANDARD_CATALOG_ALIASES: &[&str] = &[
    V0_8_STANDARD_CATALOG_ID,
    "https://a2ui.org/specification/v0_8/standard_catalog.json",
    "standard_catalog",
];

/// Single id of the v0.9 standard catalog. v0.9 has no aliases.
pub const V0_9_STANDARD_CATALOG_ID: &str =
    "https://a2ui.org/specification/v0.9/standard_catalog.json";

/// Protocol version pinned per surface after its first envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    #[serde(rename = "v0.8")]
    V0_8,
    #[serde(rename = "v0.9")]
    V0_9,
}

impl ProtocolVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolVersion::V0_8 => "v0.8",
            ProtocolVersion::V0_9 => "v0.9",
        }
    }

    pub fn extension_uri(&self) -> &'static str {
        match self {
            ProtocolVersion::V0_8 => V0_8_EXTENSION_URI,
            ProtocolVersion::V0_9 => V0_9_EXTENSION_URI,
        }
    }

    pub fn standard_catalog_id(&self) -> &'static str {
        match self {
            ProtocolVersion::V0_8 => V0_8_STANDARD_CATALOG_ID,
            ProtocolVersion::V0_9 => V0_9_STANDARD_CATALOG_ID,
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a wire catalog id to its canonical form, if it names a standard
/// catalog of the given version.
pub fn normalize_standard_catalog_id(version: ProtocolVersion, raw: &str) -> Option<&'static str> {
    match version {
        ProtocolVersion::V0_8 => V0_8_STANDARD_CATALOG_ALIASES
            .iter()
            .find(|alias| **alias == raw)
            .map(|_| V0_8_STANDARD_CATALOG_ID),
        ProtocolVersion::V0_9 => (raw == V0_9_STANDARD_CATALOG_ID).then_some(V0_9_STANDARD_CATALOG_ID),
    }
}
