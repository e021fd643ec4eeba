//! Catalog registry and negotiation.
//!
//! A catalog maps a wire id to a component-type allowlist. The registry is
//! read-mostly and `Clone` (copy-on-register); registration is idempotent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use a2ui_core::version::{
    normalize_standard_catalog_id, ProtocolVersion, V0_8_STANDARD_CATALOG_ALIASES,
    V0_8_STANDARD_CATALOG_ID,
};
use a2ui_core::{ErrorKind, ProtocolError};

use crate::capabilities::ClientCapabilities;

/// Component types shipped by the standard catalogs of both versions.
pub const STANDARD_COMPONENT_TYPES: &[&str] = &[
    "Text",
    "Image",
    "Icon",
    "Row",
    "Column",
    "List",
    "Card",
    "Tabs",
    "Divider",
    "Modal",
    "Button",
    "CheckBox",
    "TextField",
    "DateTimeInput",
    "MultipleChoice",
    "Slider",
    "AudioPlayer",
    "Video",
];

/// A named set of component type definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub catalog_id: String,
    pub components: Vec<String>,
}

impl Catalog {
    pub fn new(catalog_id: impl Into<String>, components: Vec<String>) -> Self {
        Self { catalog_id: catalog_id.into(), components }
    }

    pub fn standard(version: ProtocolVersion) -> Self {
        Self::new(
            version.standard_catalog_id(),
            STANDARD_COMPONENT_TYPES.iter().map(|t| t.to_string()).collect(),
        )
    }

    pub fn allows(&self, type_name: &str) -> bool {
        self.components.iter().any(|t| t == type_name)
    }
}

/// Outcome of catalog negotiation for one surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCatalog {
    pub catalog_id: String,
    /// `None` means the catalog is known only to the client; component-type
    /// validation is then permissive.
    pub allowlist: Option<Vec<String>>,
}

impl ResolvedCatalog {
    pub fn allows(&self, type_name: &str) -> bool {
        match &self.allowlist {
            Some(types) => types.iter().any(|t| t == type_name),
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogRegistry {
    catalogs: HashMap<String, Catalog>,
    aliases: HashMap<String, String>,
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        let mut registry =
            Self { catalogs: HashMap::new(), aliases: HashMap::new() };
        registry.register(Catalog::standard(ProtocolVersion::V0_8));
        registry.register(Catalog::standard(ProtocolVersion::V0_9));
        for alias in V0_8_STANDARD_CATALOG_ALIASES {
            registry.alias(*alias, V0_8_STANDARD_CATALOG_ID);
        }
        registry
    }
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catalog. Registering the same id again replaces it.
    pub fn register(&mut self, catalog: Catalog) -> &mut Self {
        self.catalogs.insert(catalog.catalog_id.clone(), catalog);
        self
    }

    /// Point `alias` at `canonical`.
    pub fn alias(&mut self, alias: impl Into<String>, canonical: impl Into<String>) -> &mut Self {
        self.aliases.insert(alias.into(), canonical.into());
        self
    }

    pub fn get(&self, catalog_id: &str) -> Option<&Catalog> {
        let canonical = self.aliases.get(catalog_id).map(String::as_str).unwrap_or(catalog_id);
        self.catalogs.get(canonical)
    }

    /// Negotiate the catalog a surface will validate against.
    pub fn resolve(
        &self,
        version: ProtocolVersion,
        requested: Option<&str>,
        capabilities: &ClientCapabilities,
    ) -> Result<ResolvedCatalog, ProtocolError> {
        let requested = match (requested, version) {
            (Some(id), _) => id.to_string(),
            // v0.8 falls back to the standard catalog; v0.9 requires one.
            (None, ProtocolVersion::V0_8) => V0_8_STANDARD_CATALOG_ID.to_string(),
            (None, ProtocolVersion::V0_9) => {
                return Err(ProtocolError::new(
                    ErrorKind::MissingCatalogId,
                    "createSurface requires a catalogId",
                ));
            }
        };

        let canonical = normalize_standard_catalog_id(version, &requested)
            .map(str::to_string)
            .unwrap_or_else(|| requested.clone());

        if let Some(catalog) = self.get(&canonical) {
            if capabilities.is_negotiated()
                && !capabilities.advertises(&canonical)
                && !capabilities.advertises(&requested)
            {
                return Err(ProtocolError::new(
                    ErrorKind::CatalogNotInCapabilities,
                    format!("client did not advertise catalog {canonical:?}"),
                )
                .with_details(json!({ "catalogId": canonical })));
            }
            return Ok(ResolvedCatalog {
                catalog_id: catalog.catalog_id.clone(),
                allowlist: Some(catalog.components.clone()),
            });
        }

        if capabilities.has_inline(&requested) {
            return Err(ProtocolError::new(
                ErrorKind::InlineCatalogNotSupported,
                format!("catalog {requested:?} exists only inline in client capabilities"),
            )
            .with_details(json!({ "catalogId": requested })));
        }

        if capabilities.advertises(&requested) {
            // Client-side catalog the runtime has no module for: resolve
            // permissively, validation happens client-side.
            return Ok(ResolvedCatalog { catalog_id: requested, allowlist: None });
        }

        Err(ProtocolError::new(
            ErrorKind::UnsupportedCatalog,
            format!("unknown catalog {requested:?}"),
        )
        .with_details(json!({ "catalogId": requested })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2ui_core::V0_9_STANDARD_CATALOG_ID;

    fn caps(ids: &[&str]) -> ClientCapabilities {
        ClientCapabilities::new(ids.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn v0_8_null_catalog_defaults_to_standard() {
        let registry = CatalogRegistry::new();
        let resolved = registry
            .resolve(ProtocolVersion::V0_8, None, &ClientCapabilities::default())
            .unwrap();
        assert_eq!(resolved.catalog_id, V0_8_STANDARD_CATALOG_ID);
        assert!(resolved.allows("Text"));
        assert!(!resolved.allows("UnknownWidget"));
    }

    #[test]
    fn v0_8_alias_resolves_to_canonical() {
        let registry = CatalogRegistry::new();
        let resolved = registry
            .resolve(ProtocolVersion::V0_8, Some("standard_catalog"), &ClientCapabilities::default())
            .unwrap();
        assert_eq!(resolved.catalog_id, V0_8_STANDARD_CATALOG_ID);
    }

    #[test]
    fn v0_9_null_catalog_is_an_error() {
        let registry = CatalogRegistry::new();
        let err = registry
            .resolve(ProtocolVersion::V0_9, None, &ClientCapabilities::default())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCatalogId);
    }

    #[test]
    fn unknown_catalog_is_unsupported() {
        let registry = CatalogRegistry::new();
        let err = registry
            .resolve(ProtocolVersion::V0_9, Some("nobody-knows-this"), &ClientCapabilities::default())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedCatalog);
    }

    #[test]
    fn inline_only_catalog_is_rejected() {
        let registry = CatalogRegistry::new();
        let capabilities = ClientCapabilities::default()
            .with_inline_catalogs(vec![serde_json::json!({ "catalogId": "inline-1" })]);
        let err = registry
            .resolve(ProtocolVersion::V0_9, Some("inline-1"), &capabilities)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InlineCatalogNotSupported);
    }

    #[test]
    fn unadvertised_catalog_fails_negotiation() {
        let registry = CatalogRegistry::new();
        let err = registry
            .resolve(
                ProtocolVersion::V0_9,
                Some(V0_9_STANDARD_CATALOG_ID),
                &caps(&["some-other-catalog"]),
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CatalogNotInCapabilities);
    }

    #[test]
    fn advertised_unknown_catalog_resolves_permissively() {
        let registry = CatalogRegistry::new();
        let resolved = registry
            .resolve(ProtocolVersion::V0_9, Some("client-side-catalog"), &caps(&["client-side-catalog"]))
            .unwrap();
        assert_eq!(resolved.allowlist, None);
        assert!(resolved.allows("Anything"));
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = CatalogRegistry::new();
        let before = registry.get(V0_9_STANDARD_CATALOG_ID).cloned();
        registry.register(Catalog::standard(ProtocolVersion::V0_9));
        assert_eq!(registry.get(V0_9_STANDARD_CATALOG_ID).cloned(), before);
    }
}
