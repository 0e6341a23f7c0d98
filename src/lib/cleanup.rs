//! Disk cleanup

use crate::command_builder::InlineCommand;
use crate::error::Result;
use crate::executor::{Execute, ExecutionRequest};

pub const MSG_CLEANUP_DONE: &str = "Disk cleanup completed.";

/// Run the fixed disk cleanup command elevated
pub async fn run_disk_cleanup(executor: &dyn Execute) -> Result<String> {
    let request = ExecutionRequest::inline(InlineCommand::DISK_CLEANUP).elevated();
    executor.run(request).await?;
    Ok(MSG_CLEANUP_DONE.to_string())
}
