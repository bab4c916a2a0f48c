use std::sync::Arc;

use tracing::debug;

use super::component::Component;
use super::config::Config;
use super::lifecycle::Lifecycle;
use super::supervisor::Supervisor;
use crate::error::RuntimeError;
use crate::events::EventBus;

/// Builder for a [`Supervisor`].
///
/// Components are started in the order they are added and stopped in reverse.
pub struct SupervisorBuilder {
    cfg: Config,
    bus: Option<EventBus>,
    components: Vec<Arc<dyn Component>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            bus: None,
            components: Vec::new(),
        }
    }

    /// Uses an existing bus (the one components were constructed with).
    ///
    /// Without it, `build` creates a fresh bus from `cfg.bus`.
    #[inline]
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Appends a component.
    #[inline]
    pub fn with_component(mut self, component: Arc<dyn Component>) -> Self {
        self.components.push(component);
        self
    }

    /// Appends several components, preserving their order.
    pub fn with_components<I>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Component>>,
    {
        self.components.extend(components);
        self
    }

    /// Validates the configuration and assembles the supervisor.
    pub fn build(self) -> Result<Supervisor, RuntimeError> {
        self.cfg.validate()?;
        let bus = self.bus.unwrap_or_else(|| EventBus::new(&self.cfg.bus));
        let components: Vec<Lifecycle> = self.components.into_iter().map(Lifecycle::new).collect();
        debug!(components = components.len(), "supervisor assembled");
        Ok(Supervisor::new_internal(self.cfg, bus, components))
    }
}
