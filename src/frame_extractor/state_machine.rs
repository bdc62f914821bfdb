/// 单次扫描的状态
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Sampling,
    Detecting { next: usize, total: usize, found: usize },
    ZeroResult,
    RetryDetecting { next: usize, total: usize },
    Deduplicating { aborted: bool },
    Done,
    Aborted,
    Failed,
}

impl RunState {
    pub fn new() -> Self {
        RunState::Sampling
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted | RunState::Failed)
    }

    pub fn transition(&self, event: RunEvent) -> (RunState, RunAction) {
        if self.is_terminal() {
            return (self.clone(), RunAction::Ignore);
        }

        match (self, event) {
            (_, RunEvent::Fatal) => (RunState::Failed, RunAction::Fail),

            (RunState::Sampling, RunEvent::PlanReady { total }) => {
                if total == 0 {
                    (RunState::ZeroResult, RunAction::StartRetry)
                } else {
                    (
                        RunState::Detecting {
                            next: 0,
                            total,
                            found: 0,
                        },
                        RunAction::ProcessFrame(0),
                    )
                }
            }

            (
                RunState::Detecting { .. } | RunState::RetryDetecting { .. } | RunState::ZeroResult,
                RunEvent::AbortRequested,
            ) => (RunState::Deduplicating { aborted: true }, RunAction::Deduplicate),

            (RunState::Detecting { next, total, found }, RunEvent::FrameProcessed { detections }) => {
                let found = found + detections;
                let next = next + 1;
                if next < *total {
                    (
                        RunState::Detecting {
                            next,
                            total: *total,
                            found,
                        },
                        RunAction::ProcessFrame(next),
                    )
                } else if found == 0 {
                    (RunState::ZeroResult, RunAction::StartRetry)
                } else {
                    (RunState::Deduplicating { aborted: false }, RunAction::Deduplicate)
                }
            }

            (RunState::ZeroResult, RunEvent::PlanReady { total }) => {
                if total == 0 {
                    (RunState::Deduplicating { aborted: false }, RunAction::Deduplicate)
                } else {
                    (
                        RunState::RetryDetecting { next: 0, total },
                        RunAction::ProcessRetryFrame(0),
                    )
                }
            }

            (RunState::RetryDetecting { next, total }, RunEvent::FrameProcessed { .. }) => {
                let next = next + 1;
                if next < *total {
                    (
                        RunState::RetryDetecting { next, total: *total },
                        RunAction::ProcessRetryFrame(next),
                    )
                } else {
                    (RunState::Deduplicating { aborted: false }, RunAction::Deduplicate)
                }
            }

            (RunState::Deduplicating { aborted }, RunEvent::DedupFinished) => {
                if *aborted {
                    (RunState::Aborted, RunAction::Finish)
                } else {
                    (RunState::Done, RunAction::Finish)
                }
            }

            // 其他组合不改变状态
            (state, _) => (state.clone(), RunAction::Ignore),
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    PlanReady { total: usize },
    FrameProcessed { detections: usize },
    AbortRequested,
    DedupFinished,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAction {
    ProcessFrame(usize),
    StartRetry,
    ProcessRetryFrame(usize),
    Deduplicate,
    Finish,
    Fail,
    Ignore,
}

pub struct RunStateMachine {
    state: RunState,
    events: u64,
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            state: RunState::new(),
            events: 0,
        }
    }

    pub fn process(&mut self, event: RunEvent) -> RunAction {
        self.events += 1;

        let (new_state, action) = self.state.transition(event);
        self.state = new_state;

        action
    }

    pub fn current_state(&self) -> &RunState {
        &self.state
    }

    pub fn event_count(&self) -> u64 {
        self.events
    }
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
