//! Resolved render trees for the host.
//!
//! The runtime does not paint anything; it hands the host a tree in which
//! every binding is resolved against the data model, template children are
//! expanded with their per-instance scopes, and dangling component
//! references appear as placeholder nodes instead of failing the surface.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::warn;

use a2ui_core::{ErrorKind, ProtocolError};

use crate::binding;
use crate::surface::Surface;

/// Structural props that are not resolved as dynamic values: children are
/// expanded separately, checks evaluate at render time, actions resolve when
/// they fire.
const STRUCTURAL_PROPS: &[&str] = &["children", "checks", "action"];

#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Component(RenderComponent),
    /// A referenced id with no component behind it. Hosts render it as
    /// `Missing component: <id>`.
    Missing { component_id: String },
}

impl RenderNode {
    /// The placeholder text hosts display for missing nodes.
    pub fn placeholder_text(component_id: &str) -> String {
        format!("Missing component: {component_id}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderComponent {
    pub component_id: String,
    pub type_name: String,
    /// Scope path of this instance; empty outside template expansion.
    pub scope_path: String,
    pub weight: Option<f64>,
    /// Non-structural props, resolved against the data model.
    pub props: Map<String, Value>,
    /// Raw action definition, resolved only when the action fires.
    pub action: Option<Value>,
    /// Messages of failing checks; non-empty renders the component disabled.
    pub check_failures: Vec<String>,
    pub children: Vec<RenderNode>,
}

/// Build the resolved tree for a surface. `None` until the surface is ready.
pub fn render_tree(surface: &Surface) -> Result<Option<RenderNode>, ProtocolError> {
    if !surface.is_ready() {
        return Ok(None);
    }
    let Some(root_id) = surface.root_id() else {
        return Ok(None);
    };
    let mut ancestors = HashSet::new();
    Ok(Some(render_node(surface, root_id, "", &mut ancestors, 0)?))
}

fn render_node(
    surface: &Surface,
    component_id: &str,
    scope: &str,
    ancestors: &mut HashSet<String>,
    depth: usize,
) -> Result<RenderNode, ProtocolError> {
    let Some(record) = surface.component(component_id) else {
        return Ok(RenderNode::Missing { component_id: component_id.to_string() });
    };

    // A component referencing its own ancestor would recurse forever; the
    // instance is keyed by id + scope so templates may legally reuse ids.
    let instance_key = format!("{component_id}@{scope}");
    if !ancestors.insert(instance_key.clone()) {
        warn!(component = component_id, scope, "reference cycle, rendering placeholder");
        return Ok(RenderNode::Missing { component_id: component_id.to_string() });
    }
    if depth > surface.limits().max_depth {
        ancestors.remove(&instance_key);
        return Err(ProtocolError::new(
            ErrorKind::ValidationError,
            format!("render tree deeper than {} at {component_id:?}", surface.limits().max_depth),
        )
        .with_surface(surface.id().to_string()));
    }

    let mut props = Map::new();
    for (name, raw) in &record.props {
        if STRUCTURAL_PROPS.contains(&name.as_str()) {
            continue;
        }
        props.insert(
            name.clone(),
            binding::resolve_prop(raw, surface.data_model(), scope, surface.version()),
        );
    }

    let mut children = Vec::new();
    for instance in surface.expand_children(component_id, scope)? {
        children.push(render_node(
            surface,
            &instance.component_id,
            &instance.scope_path,
            ancestors,
            depth + 1,
        )?);
    }
    ancestors.remove(&instance_key);

    Ok(RenderNode::Component(RenderComponent {
        component_id: record.id.clone(),
        type_name: record.type_name.clone(),
        scope_path: scope.to_string(),
        weight: record.weight,
        props,
        action: record.props.get("action").cloned(),
        check_failures: surface.check_failures(component_id, scope),
        children,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use a2ui_core::envelope::Envelope;
    use a2ui_core::V0_9_STANDARD_CATALOG_ID;
    use serde_json::json;

    fn session_with(lines: &[Value]) -> Session {
        let mut session = Session::new();
        for line in lines {
            let envelope: Envelope = serde_json::from_value(line.clone()).unwrap();
            session.apply_envelope(&envelope).unwrap();
        }
        session
    }

    fn component(node: &RenderNode) -> &RenderComponent {
        match node {
            RenderNode::Component(component) => component,
            RenderNode::Missing { component_id } => panic!("missing node {component_id}"),
        }
    }

    #[test]
    fn resolves_props_and_expands_template_children() {
        let session = session_with(&[
            json!({ "createSurface": { "surfaceId": "s", "catalogId": V0_9_STANDARD_CATALOG_ID } }),
            json!({
                "updateDataModel": {
                    "surfaceId": "s",
                    "value": { "items": [ { "n": "a" }, { "n": "b" } ] }
                }
            }),
            json!({
                "updateComponents": {
                    "surfaceId": "s",
                    "components": [
                        { "id": "root", "component": "List",
                          "children": { "path": "/items", "componentId": "row" } },
                        { "id": "row", "component": "Text", "text": { "path": "n" }, "weight": 2 }
                    ]
                }
            }),
        ]);

        let tree = render_tree(session.surface("s").unwrap()).unwrap().unwrap();
        let root = component(&tree);
        assert_eq!(root.type_name, "List");
        assert_eq!(root.children.len(), 2);

        let first = component(&root.children[0]);
        assert_eq!(first.scope_path, "/items/0");
        assert_eq!(first.props["text"], json!("a"));
        assert_eq!(first.weight, Some(2.0));

        let second = component(&root.children[1]);
        assert_eq!(second.props["text"], json!("b"));
    }

    #[test]
    fn dangling_reference_renders_placeholder() {
        let session = session_with(&[
            json!({ "createSurface": { "surfaceId": "s", "catalogId": V0_9_STANDARD_CATALOG_ID } }),
            json!({
                "updateComponents": {
                    "surfaceId": "s",
                    "components": [
                        { "id": "root", "component": "Column", "children": ["ghost"] }
                    ]
                }
            }),
        ]);

        let tree = render_tree(session.surface("s").unwrap()).unwrap().unwrap();
        let root = component(&tree);
        assert_eq!(
            root.children[0],
            RenderNode::Missing { component_id: "ghost".to_string() }
        );
        assert_eq!(RenderNode::placeholder_text("ghost"), "Missing component: ghost");
    }

    #[test]
    fn reference_cycle_terminates_with_placeholder() {
        let session = session_with(&[
            json!({ "createSurface": { "surfaceId": "s", "catalogId": V0_9_STANDARD_CATALOG_ID } }),
            json!({
                "updateComponents": {
                    "surfaceId": "s",
                    "components": [
                        { "id": "root", "component": "Column", "children": ["root"] }
                    ]
                }
            }),
        ]);

        let tree = render_tree(session.surface("s").unwrap()).unwrap().unwrap();
        let root = component(&tree);
        assert_eq!(
            root.children[0],
            RenderNode::Missing { component_id: "root".to_string() }
        );
    }

    #[test]
    fn not_ready_surface_renders_nothing() {
        let session = session_with(&[json!({
            "updateComponents": {
                "surfaceId": "s",
                "components": [ { "id": "root", "component": "Text", "text": "x" } ]
            }
        })]);
        assert_eq!(render_tree(session.surface("s").unwrap()).unwrap(), None);
    }

    #[test]
    fn root_is_placeholder_until_it_arrives() {
        let session = session_with(&[json!({
            "createSurface": { "surfaceId": "s", "catalogId": V0_9_STANDARD_CATALOG_ID }
        })]);
        let tree = render_tree(session.surface("s").unwrap()).unwrap().unwrap();
        assert_eq!(tree, RenderNode::Missing { component_id: "root".to_string() });
    }
}
