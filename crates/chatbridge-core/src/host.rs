/// What the plugin host tells us about the running client.
///
/// Treated as a read-only oracle; implementations must be callable from the
/// channel task's thread.
pub trait HostContext: Send + Sync {
    /// Whether a character is logged in (chat is unavailable otherwise).
    fn is_logged_in(&self) -> bool;

    /// OS process id reported in status messages.
    fn process_id(&self) -> u32 {
        std::process::id()
    }
}

/// Host whose login state is fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct StaticHost {
    pub logged_in: bool,
    pub pid: u32,
}

impl HostContext for StaticHost {
    fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    fn process_id(&self) -> u32 {
        self.pid
    }
}
