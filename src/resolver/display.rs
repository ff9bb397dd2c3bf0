//! Display enumeration and owner-window creation.

use std::sync::Arc;

use crate::frame::OwnerWindow;

use super::ResolverError;

/// A display the process currently has open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayDescriptor {
    pub name: String,
}

/// Enumerates the physical displays attached to this process.
pub trait DisplayManager: Send + Sync {
    fn list_displays(&self) -> Vec<DisplayDescriptor>;
}

/// Creates and destroys the windows that stand in for frames when owning
/// or requesting selections.
pub trait WindowProvider: Send + Sync {
    /// Create an unmapped owner window on the named display.
    fn create_owner(&self, display: &str) -> Result<Arc<OwnerWindow>, ResolverError>;

    /// Destroy an owner window. Best-effort.
    fn destroy_owner(&self, display: &str, owner: &OwnerWindow);
}
