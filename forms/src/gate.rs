use schema::RecordRoot;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    Idle,
    /// A fetch is outstanding, no other fetch may be issued
    Pending,
    Loaded(RecordRoot),
    Failed(String),
}

/// What the gate renders in place of the form
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateView<'a> {
    Loading,
    Form(&'a RecordRoot),
    Error(&'a str),
}

/// Holds an edit form back until its document has been fetched
#[derive(Debug, Clone)]
pub struct LoadingGate {
    state: GateState,
}

impl Default for LoadingGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Idle,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Returns true when the caller should issue the fetch now
    pub fn begin_fetch(&mut self) -> bool {
        match self.state {
            GateState::Idle => {
                self.state = GateState::Pending;
                true
            }
            GateState::Pending | GateState::Loaded(_) | GateState::Failed(_) => false,
        }
    }

    /// Settles the outstanding fetch. Results arriving while no fetch is
    /// pending are ignored and false is returned.
    pub fn resolve(&mut self, result: Result<Option<RecordRoot>, String>) -> bool {
        if self.state != GateState::Pending {
            debug!("ignoring fetch result, no fetch pending");
            return false;
        }

        self.state = match result {
            Ok(Some(document)) => GateState::Loaded(document),
            Ok(None) => GateState::Failed("document not found".to_string()),
            Err(err) => GateState::Failed(err),
        };
        true
    }

    /// Allows a new fetch after a failure
    pub fn retry(&mut self) -> bool {
        if !matches!(self.state, GateState::Failed(_)) {
            return false;
        }

        self.state = GateState::Idle;
        true
    }

    pub fn view(&self) -> GateView<'_> {
        match &self.state {
            GateState::Idle | GateState::Pending => GateView::Loading,
            GateState::Loaded(document) => GateView::Form(document),
            GateState::Failed(err) => GateView::Error(err),
        }
    }
}
