//! Shared test doubles: a scripted executor and a recording log sink
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use pc_buddy::{
    Error, Execute, ExecutionOutput, ExecutionRequest, FailureCause, LogSink, Result, Target,
};

type Hook = Box<dyn Fn(&ExecutionRequest) + Send + Sync>;

/// Records every request and replays canned results in order
///
/// When the script runs out, further requests succeed with empty output.
#[derive(Default)]
pub struct FakeExecutor {
    requests: Mutex<Vec<ExecutionRequest>>,
    responses: Mutex<VecDeque<Result<ExecutionOutput>>>,
    hook: Option<Hook>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_ok(self, stdout: &str) -> Self {
        self.push(Ok(ExecutionOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: 0,
        }))
    }

    pub fn respond_err(self, cause: FailureCause, message: &str) -> Self {
        self.push(Err(Error::ExecutionFailed {
            cause,
            message: message.to_string(),
        }))
    }

    /// Called with each request before its result is replayed
    pub fn on_run(mut self, hook: impl Fn(&ExecutionRequest) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    fn push(self, result: Result<ExecutionOutput>) -> Self {
        self.responses.lock().unwrap().push_back(result);
        self
    }

    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.target.name())
            .collect()
    }
}

#[async_trait]
impl Execute for FakeExecutor {
    async fn run(&self, request: ExecutionRequest) -> Result<ExecutionOutput> {
        if let Some(ref hook) = self.hook {
            hook(&request);
        }
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ExecutionOutput::default()))
    }
}

/// Script arguments of a request as `(flag, value)` pairs
pub fn script_args(request: &ExecutionRequest) -> Vec<(Option<&'static str>, String)> {
    match &request.target {
        Target::Script { args, .. } => args
            .iter()
            .map(|arg| (arg.flag(), arg.value().to_string()))
            .collect(),
        Target::Inline(_) | Target::Registry(_) => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub tag: String,
    pub message: String,
    pub is_error: bool,
}

/// Keeps everything it is given
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingSink {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<LogEntry> {
        self.entries().into_iter().filter(|e| e.is_error).collect()
    }

    fn record(&self, tag: &str, message: &str, is_error: bool) {
        self.entries.lock().unwrap().push(LogEntry {
            tag: tag.to_string(),
            message: message.to_string(),
            is_error,
        });
    }
}

impl LogSink for RecordingSink {
    fn log(&self, tag: &str, message: &str) {
        self.record(tag, message, false);
    }

    fn error(&self, tag: &str, message: &str) {
        self.record(tag, message, true);
    }
}
