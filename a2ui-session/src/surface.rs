//! Per-surface state: components, data model, catalog, readiness.
//!
//! Every mutating operation validates the whole batch before committing, so
//! a failed envelope leaves the surface exactly as it was.

use std::collections::{BTreeSet, HashMap};

use serde_json::{json, Map, Value};
use tracing::debug;

use a2ui_core::envelope::{ComponentEntry, ComponentWrapper, DataEntry};
use a2ui_core::value::{Check, Children};
use a2ui_core::{pointer, ErrorKind, Limits, ProtocolError, ProtocolVersion};

use crate::binding::{self, ScopingMode, TemplateInstance};
use crate::catalog::{Catalog, ResolvedCatalog};

/// One component in the surface's arena. `props` keeps the raw (unresolved)
/// property values; bindings resolve at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRecord {
    pub id: String,
    pub type_name: String,
    pub weight: Option<f64>,
    pub props: Map<String, Value>,
}

impl ComponentRecord {
    pub fn from_wrapper(wrapper: &ComponentWrapper) -> Result<Self, ProtocolError> {
        let Some(type_name) = wrapper.type_name() else {
            return Err(ProtocolError::new(
                ErrorKind::ValidationError,
                format!("component {:?} must wrap exactly one type name", wrapper.id),
            ));
        };
        let props = wrapper.props().cloned().unwrap_or_default();
        Ok(Self {
            id: wrapper.id.clone(),
            type_name: type_name.to_string(),
            weight: props.get("weight").and_then(Value::as_f64),
            props,
        })
    }

    pub fn from_entry(entry: &ComponentEntry) -> Self {
        Self {
            id: entry.id.clone(),
            type_name: entry.component.clone(),
            weight: entry.props.get("weight").and_then(Value::as_f64),
            props: entry.props.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Surface {
    id: String,
    version: ProtocolVersion,
    limits: Limits,
    catalog: Option<ResolvedCatalog>,
    components: HashMap<String, ComponentRecord>,
    data_model: Value,
    root_id: Option<String>,
    ready: bool,
    broadcast_data_model: bool,
    pending_update: bool,
}

impl Surface {
    pub fn new(id: impl Into<String>, version: ProtocolVersion, limits: Limits) -> Self {
        Self {
            id: id.into(),
            version,
            limits,
            catalog: None,
            components: HashMap::new(),
            data_model: Value::Null,
            root_id: None,
            ready: false,
            broadcast_data_model: false,
            pending_update: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn scoping_mode(&self) -> ScopingMode {
        ScopingMode::for_version(self.version)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    pub fn catalog(&self) -> Option<&ResolvedCatalog> {
        self.catalog.as_ref()
    }

    pub fn broadcast_data_model(&self) -> bool {
        self.broadcast_data_model
    }

    pub fn set_broadcast_data_model(&mut self, broadcast: bool) {
        self.broadcast_data_model = broadcast;
    }

    pub fn data_model(&self) -> &Value {
        &self.data_model
    }

    pub fn component(&self, id: &str) -> Option<&ComponentRecord> {
        self.components.get(id)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn component_ids(&self) -> Vec<&str> {
        self.components.keys().map(String::as_str).collect()
    }

    /// Whether the surface mutated since the host last asked, clearing the flag.
    pub fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.pending_update)
    }

    /// Mark the surface ready to render, fixing the root and the catalog.
    pub fn mark_ready(&mut self, root_id: impl Into<String>, catalog: Option<ResolvedCatalog>) {
        self.root_id = Some(root_id.into());
        if catalog.is_some() {
            self.catalog = catalog;
        }
        self.ready = true;
        self.pending_update = true;
        debug!(surface = %self.id, root = ?self.root_id, "surface ready");
    }

    /// Insert or fully replace components. The batch is validated against the
    /// catalog allowlist and the total-count limit before any commit.
    pub fn upsert_components(&mut self, records: Vec<ComponentRecord>) -> Result<(), ProtocolError> {
        let allowlist = self.effective_catalog();
        let offending: BTreeSet<&str> = records
            .iter()
            .filter(|record| !allowlist.allows(&record.type_name))
            .map(|record| record.type_name.as_str())
            .collect();
        if !offending.is_empty() {
            let types: Vec<&str> = offending.into_iter().collect();
            return Err(ProtocolError::new(
                ErrorKind::UnknownComponent,
                format!("component types not in catalog {:?}: {}", allowlist.catalog_id, types.join(", ")),
            )
            .with_surface(self.id.clone())
            .with_details(json!({ "types": types })));
        }

        let mut ids: BTreeSet<&str> = self.components.keys().map(String::as_str).collect();
        ids.extend(records.iter().map(|record| record.id.as_str()));
        if ids.len() > self.limits.max_components {
            return Err(ProtocolError::new(
                ErrorKind::ValidationError,
                format!("surface would hold {} components", ids.len()),
            )
            .with_surface(self.id.clone())
            .with_details(json!({ "count": ids.len(), "limit": self.limits.max_components })));
        }

        for record in records {
            self.components.insert(record.id.clone(), record);
        }
        self.pending_update = true;
        Ok(())
    }

    pub fn upsert_wrappers(&mut self, wrappers: &[ComponentWrapper]) -> Result<(), ProtocolError> {
        let records = wrappers
            .iter()
            .map(ComponentRecord::from_wrapper)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.with_surface(self.id.clone()))?;
        self.upsert_components(records)
    }

    pub fn upsert_entries(&mut self, entries: &[ComponentEntry]) -> Result<(), ProtocolError> {
        self.upsert_components(entries.iter().map(ComponentRecord::from_entry).collect())
    }

    /// Apply a v0.8 adjacency-list update at `path`, creating ancestors as
    /// empty maps where needed.
    pub fn apply_data_entries(
        &mut self,
        path: Option<&str>,
        entries: &[DataEntry],
    ) -> Result<(), ProtocolError> {
        if self.data_model.is_null() {
            self.data_model = Value::Object(Map::new());
        }
        let base = path.unwrap_or("");
        for entry in entries {
            let target = pointer::join(base, &pointer::escape(&entry.key));
            pointer::write(&mut self.data_model, &target, entry.to_value())
                .map_err(|err| err.with_surface(self.id.clone()))?;
        }
        self.pending_update = true;
        Ok(())
    }

    /// Apply a v0.9 native-JSON update at `path`: maps merge, sequences and
    /// scalars replace.
    pub fn apply_data_value(
        &mut self,
        path: Option<&str>,
        value: Value,
    ) -> Result<(), ProtocolError> {
        pointer::merge_write(&mut self.data_model, path.unwrap_or(""), value)
            .map_err(|err| err.with_surface(self.id.clone()))?;
        self.pending_update = true;
        Ok(())
    }

    /// JSON-Pointer read used by binding resolution and the host.
    pub fn read(&self, path: &str) -> Option<&Value> {
        pointer::read(&self.data_model, path)
    }

    /// Two-way-binding write from the UI. Local only; nothing is emitted
    /// until an action fires.
    pub fn write_local(&mut self, path: &str, value: Value) -> Result<(), ProtocolError> {
        if self.data_model.is_null() {
            self.data_model = Value::Object(Map::new());
        }
        pointer::write(&mut self.data_model, path, value)
            .map_err(|err| err.with_surface(self.id.clone()))?;
        self.pending_update = true;
        Ok(())
    }

    /// Resolve one property of a component under `scope`.
    pub fn resolve_prop(&self, component_id: &str, prop: &str, scope: &str) -> Option<Value> {
        let record = self.components.get(component_id)?;
        let raw = record.props.get(prop)?;
        Some(binding::resolve_prop(raw, &self.data_model, scope, self.version))
    }

    /// Messages of the component's failing checks under `scope`. A component
    /// with any failing check is rendered disabled.
    pub fn check_failures(&self, component_id: &str, scope: &str) -> Vec<String> {
        let Some(record) = self.components.get(component_id) else {
            return Vec::new();
        };
        let Some(raw) = record.props.get("checks") else {
            return Vec::new();
        };
        match serde_json::from_value::<Vec<Check>>(raw.clone()) {
            Ok(checks) => binding::evaluate_checks(&checks, &self.data_model, scope),
            Err(_) => Vec::new(),
        }
    }

    /// Decode a component's `children` property.
    pub fn children(&self, component_id: &str) -> Option<Children> {
        let record = self.components.get(component_id)?;
        Children::decode(record.props.get("children")?, self.version)
    }

    /// Expand a container's children into render instances. Explicit children
    /// inherit the container's scope; template children get per-element
    /// scopes and are capped at `max_template_items`.
    pub fn expand_children(
        &self,
        component_id: &str,
        scope: &str,
    ) -> Result<Vec<TemplateInstance>, ProtocolError> {
        let Some(children) = self.children(component_id) else {
            return Ok(Vec::new());
        };
        match children {
            Children::Explicit(ids) => Ok(ids
                .into_iter()
                .map(|id| TemplateInstance { component_id: id, scope_path: scope.to_string() })
                .collect()),
            Children::Template { component_id, data_binding } => binding::expand_template(
                &data_binding,
                &component_id,
                &self.data_model,
                scope,
                self.scoping_mode(),
                self.limits.max_template_items,
            )
            .map_err(|err| err.with_surface(self.id.clone())),
        }
    }

    /// Ids referenced from other components that do not (yet) exist. The host
    /// renders these as placeholders; they never reject an envelope.
    pub fn missing_references(&self) -> Vec<String> {
        let mut referenced = BTreeSet::new();
        for record in self.components.values() {
            if let Some(children) = record.props.get("children").and_then(|v| Children::decode(v, self.version)) {
                match children {
                    Children::Explicit(ids) => referenced.extend(ids),
                    Children::Template { component_id, .. } => {
                        referenced.insert(component_id);
                    }
                }
            }
            for key in ["child", "trigger", "content"] {
                if let Some(id) = record.props.get(key).and_then(Value::as_str) {
                    referenced.insert(id.to_string());
                }
            }
        }
        referenced.into_iter().filter(|id| !self.components.contains_key(id)).collect()
    }

    fn effective_catalog(&self) -> ResolvedCatalog {
        match &self.catalog {
            Some(catalog) => catalog.clone(),
            // Catalog not negotiated yet: validate against the version's
            // standard catalog, which is what null resolves to.
            None => {
                let standard = Catalog::standard(self.version);
                ResolvedCatalog {
                    catalog_id: standard.catalog_id,
                    allowlist: Some(standard.components),
                }
            }
        }
    }
}
