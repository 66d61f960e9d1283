//! Service configuration.

/// Configuration for [`XmlService`](crate::service::XmlService).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Reject node edits whose document changed since it was loaded.
    pub optimistic_concurrency: bool,
    /// Spaces per level in `pretty_content`.
    pub pretty_indent: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            optimistic_concurrency: true,
            pretty_indent: 2,
        }
    }
}

/// Builder for service configuration.
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
        }
    }

    pub fn optimistic_concurrency(mut self, enabled: bool) -> Self {
        self.config.optimistic_concurrency = enabled;
        self
    }

    pub fn pretty_indent(mut self, spaces: usize) -> Self {
        self.config.pretty_indent = spaces;
        self
    }

    pub fn build(self) -> ServiceConfig {
        self.config
    }
}

impl Default for ServiceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ServiceConfigBuilder::new()
            .optimistic_concurrency(false)
            .pretty_indent(4)
            .build();
        assert!(!config.optimistic_concurrency);
        assert_eq!(config.pretty_indent, 4);
        assert_eq!(ServiceConfigBuilder::default().build(), ServiceConfig::default());
    }
}
