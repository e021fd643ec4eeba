/// Structural limits applied while parsing and applying envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Total components allowed per surface and per upsert batch.
    pub max_components: usize,
    /// Instances a single template expansion may produce.
    pub max_template_items: usize,
    /// Nesting depth of any incoming JSON document.
    pub max_depth: usize,
    /// Segments allowed in a JSON Pointer.
    pub max_path_segments: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_components: 1000,
            max_template_items: 1000,
            max_depth: 64,
            max_path_segments: 32,
        }
    }
}

impl Limits {
    pub fn with_max_components(mut self, max_components: usize) -> Self {
        self.max_components = max_components;
        self
    }

    pub fn with_max_template_items(mut self, max_template_items: usize) -> Self {
        self.max_template_items = max_template_items;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_path_segments(mut self, max_path_segments: usize) -> Self {
        self.max_path_segments = max_path_segments;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_components, 1000);
        assert_eq!(limits.max_template_items, 1000);
        assert_eq!(limits.max_depth, 64);
        assert_eq!(limits.max_path_segments, 32);
    }

    #[test]
    fn builders_override_single_fields() {
        let limits = Limits::default().with_max_components(10).with_max_depth(4);
        assert_eq!(limits.max_components, 10);
        assert_eq!(limits.max_depth, 4);
        assert_eq!(limits.max_template_items, 1000);
    }
}
