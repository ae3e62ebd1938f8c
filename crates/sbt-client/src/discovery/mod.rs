//! Finding a running sbt server, or waiting for one to come up.

mod locator;
mod readiness;

use std::path::Path;
use std::time::Duration;

pub use locator::{ConnectionDescriptor, DescriptorLocator, DescriptorSource, SocketAddress};
pub use readiness::ReadinessWaiter;

use crate::error::ClientError;
use crate::project::descriptor_path;

/// Locates a server and waits for it to become ready.
///
/// The orchestrator depends on this seam rather than on the filesystem so its
/// state machine can be exercised with scripted discovery.
#[cfg_attr(test, mockall::automock)]
pub trait ServerDiscovery {
    /// Reports the current descriptor without waiting.
    ///
    /// # Errors
    ///
    /// See [`DescriptorSource::locate`].
    fn locate(&self, project_root: &Path) -> Result<Option<ConnectionDescriptor>, ClientError>;

    /// Blocks until a descriptor is available or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// See [`ReadinessWaiter::await_ready`].
    fn await_ready(
        &self,
        project_root: &Path,
        timeout: Duration,
    ) -> Result<ConnectionDescriptor, ClientError>;
}

/// Discovery backed by the descriptor file under the project directory.
#[derive(Debug, Clone, Copy)]
pub struct FileDiscovery {
    waiter: ReadinessWaiter,
}

impl FileDiscovery {
    #[must_use]
    pub const fn new(poll_interval: Duration) -> Self {
        Self {
            waiter: ReadinessWaiter::new(poll_interval),
        }
    }
}

impl ServerDiscovery for FileDiscovery {
    fn locate(&self, project_root: &Path) -> Result<Option<ConnectionDescriptor>, ClientError> {
        DescriptorLocator::new(descriptor_path(project_root)).locate()
    }

    fn await_ready(
        &self,
        project_root: &Path,
        timeout: Duration,
    ) -> Result<ConnectionDescriptor, ClientError> {
        let locator = DescriptorLocator::new(descriptor_path(project_root));
        self.waiter.await_ready(&locator, timeout)
    }
}
