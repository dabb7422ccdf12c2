use super::{ComponentState, ServiceOrchestrator};
use tracing::debug;

impl ServiceOrchestrator {
    /// Update component state
    pub(super) fn set_component_state(&mut self, index: usize, state: ComponentState) {
        let managed = &mut self.services[index];
        managed.state = state;
        debug!(
            "Component '{}' state changed to: {:?}",
            managed.name(),
            state
        );
    }

    /// Get component state
    pub fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        self.services
            .iter()
            .find(|managed| managed.name() == component)
            .map(|managed| managed.state)
    }

    /// Get all component states in declaration order
    pub fn get_all_component_states(&self) -> Vec<(String, ComponentState)> {
        self.services
            .iter()
            .map(|managed| (managed.name().to_string(), managed.state))
            .collect()
    }

    /// Number of services currently marked running
    pub fn running_count(&self) -> usize {
        self.services
            .iter()
            .filter(|managed| managed.state == ComponentState::Running)
            .count()
    }
}
