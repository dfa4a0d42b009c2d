use crate::error::LifecycleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    BeginInstall,
    InstallDone,
    BeginActivate,
    ActivateDone,
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    pub state: WorkerState,
    /// Set by install or a SKIP_WAITING message.
    pub skip_waiting: bool,
    pub navigation_preload: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            state: WorkerState::Parsed,
            skip_waiting: false,
            navigation_preload: false,
        }
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.state == WorkerState::Activated
    }

    /// Re-running install or activate from a settled state is allowed;
    /// skipping a step is not.
    pub fn apply(&mut self, event: LifecycleEvent) -> Result<(WorkerState, WorkerState), LifecycleError> {
        let prev = self.state;
        let next = match (prev, event) {
            (WorkerState::Parsed, LifecycleEvent::BeginInstall)
            | (WorkerState::Installed, LifecycleEvent::BeginInstall) => WorkerState::Installing,
            (WorkerState::Installing, LifecycleEvent::InstallDone) => WorkerState::Installed,
            (WorkerState::Installed, LifecycleEvent::BeginActivate)
            | (WorkerState::Activated, LifecycleEvent::BeginActivate) => WorkerState::Activating,
            (WorkerState::Activating, LifecycleEvent::ActivateDone) => WorkerState::Activated,
            (_, LifecycleEvent::BeginInstall) | (_, LifecycleEvent::InstallDone) => {
                return Err(LifecycleError { from: prev.as_str(), to: "installing" })
            }
            (_, LifecycleEvent::BeginActivate) | (_, LifecycleEvent::ActivateDone) => {
                return Err(LifecycleError { from: prev.as_str(), to: "activating" })
            }
        };
        self.state = next;
        Ok((prev, next))
    }
}
