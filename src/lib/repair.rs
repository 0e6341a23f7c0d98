//! Two-stage system file repair
//!
//! ```text
//! Idle -> Scanning -> Clean
//!                  -> ScanFailed
//!                  -> NeedsDeepRepair -> Done
//!                                     -> DeepRepairFailed
//! ```
//!
//! The scan (SFC) always runs first. Only when it succeeds and its output
//! says some corruption could not be fixed does the deep repair (DISM)
//! run. Neither stage is retried; every call starts from `Idle`.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::command_builder::InlineCommand;
use crate::executor::{Execute, ExecutionRequest};
use crate::log_sink::LogSink;

pub const MSG_CLEAN: &str = "SFC completed successfully. No integrity violations were left unrepaired.";
pub const MSG_DEEP_REPAIR_DONE: &str =
    "SFC scan: problems found. DISM repair attempted. Restart the computer and run the scan again.";
pub const MSG_DEEP_REPAIR_FAILED: &str =
    "SFC scan: problems found, but DISM failed. Try again later.";
pub const MSG_SCAN_FAILED: &str = "SFC scan failed. Try again later.";

/// Phrases the scanner prints when it could not repair everything
static UNREPAIRED_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)found corrupt files but was unable to fix",
        r"(?i)unable to fix",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static regex"))
    .collect()
});

/// Does scan output report corruption the scanner could not fix?
pub fn needs_deep_repair(scan_output: &str) -> bool {
    UNREPAIRED_MARKERS.iter().any(|re| re.is_match(scan_output))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairState {
    Idle,
    Scanning,
    Clean,
    ScanFailed,
    NeedsDeepRepair,
    Done,
    DeepRepairFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairEvent {
    Start,
    ScanSucceeded { unrepaired: bool },
    ScanFailed,
    DeepRepairSucceeded,
    DeepRepairFailed,
}

impl RepairState {
    /// Apply an event; events that do not fit the current state leave it unchanged
    pub fn on(self, event: RepairEvent) -> RepairState {
        match (self, event) {
            (RepairState::Idle, RepairEvent::Start) => RepairState::Scanning,
            (RepairState::Scanning, RepairEvent::ScanFailed) => RepairState::ScanFailed,
            (RepairState::Scanning, RepairEvent::ScanSucceeded { unrepaired: false }) => {
                RepairState::Clean
            }
            (RepairState::Scanning, RepairEvent::ScanSucceeded { unrepaired: true }) => {
                RepairState::NeedsDeepRepair
            }
            (RepairState::NeedsDeepRepair, RepairEvent::DeepRepairSucceeded) => RepairState::Done,
            (RepairState::NeedsDeepRepair, RepairEvent::DeepRepairFailed) => {
                RepairState::DeepRepairFailed
            }
            (state, _) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RepairState::Clean
                | RepairState::ScanFailed
                | RepairState::Done
                | RepairState::DeepRepairFailed
        )
    }

    /// User-facing message for terminal states
    pub fn message(&self) -> Option<&'static str> {
        match self {
            RepairState::Clean => Some(MSG_CLEAN),
            RepairState::ScanFailed => Some(MSG_SCAN_FAILED),
            RepairState::Done => Some(MSG_DEEP_REPAIR_DONE),
            RepairState::DeepRepairFailed => Some(MSG_DEEP_REPAIR_FAILED),
            _ => None,
        }
    }
}

/// Final result of a repair run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    pub state: RepairState,
    pub message: String,
}

impl RepairOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.state, RepairState::Clean | RepairState::Done)
    }
}

pub struct RepairWorkflow {
    executor: Arc<dyn Execute>,
    sink: Arc<dyn LogSink>,
}

impl RepairWorkflow {
    pub fn new(executor: Arc<dyn Execute>, sink: Arc<dyn LogSink>) -> Self {
        Self { executor, sink }
    }

    /// Run the scan and, when needed, the deep repair
    ///
    /// Execution failures never escape: they become the matching terminal
    /// state and its message.
    pub async fn run(&self) -> RepairOutcome {
        let mut state = RepairState::Idle.on(RepairEvent::Start);
        self.sink.log("repair", "starting system file scan");

        let scan = ExecutionRequest::inline(InlineCommand::SYSTEM_FILE_SCAN).elevated();
        state = match self.executor.run(scan).await {
            Ok(output) => {
                let unrepaired = needs_deep_repair(&output.combined());
                state.on(RepairEvent::ScanSucceeded { unrepaired })
            }
            Err(e) => {
                self.sink.error("repair", &format!("system file scan failed: {}", e));
                state.on(RepairEvent::ScanFailed)
            }
        };

        if state == RepairState::NeedsDeepRepair {
            self.sink
                .log("repair", "scan could not fix every file, running deep repair");
            let deep = ExecutionRequest::inline(InlineCommand::DEEP_REPAIR).elevated();
            state = match self.executor.run(deep).await {
                Ok(_) => state.on(RepairEvent::DeepRepairSucceeded),
                Err(e) => {
                    self.sink.error("repair", &format!("deep repair failed: {}", e));
                    state.on(RepairEvent::DeepRepairFailed)
                }
            };
        }

        let message = state.message().unwrap_or(MSG_SCAN_FAILED).to_string();
        self.sink.log("repair", &message);
        RepairOutcome { state, message }
    }
}
