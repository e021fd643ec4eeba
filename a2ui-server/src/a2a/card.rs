use a2ui_core::ProtocolVersion;
use a2ui_transport::a2a::{AgentCapabilities, AgentCard, AgentExtension};

/// Build the agent descriptor served at `/.well-known/agent.json`,
/// advertising the A2UI extension for each protocol version the runtime
/// speaks.
pub fn build_agent_card(
    name: impl Into<String>,
    description: impl Into<String>,
    base_url: &str,
    versions: &[ProtocolVersion],
) -> AgentCard {
    let extensions = versions
        .iter()
        .map(|version| AgentExtension { uri: version.extension_uri().to_string(), required: false })
        .collect();

    AgentCard {
        name: name.into(),
        description: description.into(),
        url: base_url.trim_end_matches('/').to_string(),
        version: "1.0.0".to_string(),
        protocol_version: "0.3.0".to_string(),
        capabilities: AgentCapabilities {
            streaming: true,
            push_notifications: false,
            extensions: Some(extensions),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_advertises_extension_per_version() {
        let card = build_agent_card(
            "ui-agent",
            "streams surfaces",
            "http://localhost:8080/",
            &[ProtocolVersion::V0_8, ProtocolVersion::V0_9],
        );
        assert_eq!(card.url, "http://localhost:8080");
        assert!(card.supports_extension(a2ui_core::V0_8_EXTENSION_URI));
        assert!(card.supports_extension(a2ui_core::V0_9_EXTENSION_URI));
        assert!(card.capabilities.streaming);
    }

    #[test]
    fn single_version_card_omits_the_other() {
        let card = build_agent_card("ui", "d", "http://x", &[ProtocolVersion::V0_9]);
        assert!(!card.supports_extension(a2ui_core::V0_8_EXTENSION_URI));
        assert!(card.supports_extension(a2ui_core::V0_9_EXTENSION_URI));
    }
}
