//! Configuration-gated resource ownership for a single pass.

use log::debug;

use crate::error::Result;

/// Lifecycle of a pass's resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// No resources held
    Unconfigured,
    /// Resources sized for the stored configuration
    Configured,
}

/// Resources plus the configuration they were allocated for
///
/// Reallocation happens only when the incoming configuration differs
/// structurally from the stored one; the old resources are released
/// before the new ones are allocated.
#[derive(Debug)]
pub struct PassSlot<C, R> {
    config: Option<C>,
    resources: Option<R>,
}

impl<C, R> Default for PassSlot<C, R> {
    fn default() -> Self {
        Self {
            config: None,
            resources: None,
        }
    }
}

impl<C: PartialEq + Clone + std::fmt::Debug, R> PassSlot<C, R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure resources match `config`, returning `true` if they were (re)allocated
    ///
    /// On allocation failure the slot is left unconfigured.
    pub fn configure_with<F>(&mut self, label: &str, config: &C, allocate: F) -> Result<bool>
    where
        F: FnOnce(&C) -> Result<R>,
    {
        if self.config.as_ref() == Some(config) && self.resources.is_some() {
            return Ok(false);
        }

        debug!("{label}: allocating resources for {config:?}");
        self.release();
        let resources = allocate(config)?;
        self.resources = Some(resources);
        self.config = Some(config.clone());
        Ok(true)
    }

    pub fn release(&mut self) {
        self.resources = None;
        self.config = None;
    }

    pub fn state(&self) -> PassState {
        if self.resources.is_some() {
            PassState::Configured
        } else {
            PassState::Unconfigured
        }
    }

    pub fn config(&self) -> Option<&C> {
        self.config.as_ref()
    }

    pub fn get(&self) -> Option<&R> {
        self.resources.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut R> {
        self.resources.as_mut()
    }
}

/// Common surface of every pipeline stage
pub trait OceanPass {
    fn label(&self) -> &'static str;

    fn state(&self) -> PassState;

    /// Resources exist and the inputs needed to render are present
    fn is_valid_pass(&self) -> bool;

    /// Drop resources, returning to `Unconfigured`
    fn release(&mut self);
}
