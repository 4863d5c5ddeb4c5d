//! The worker shipped with the binary.

use async_trait::async_trait;
use tracing::info;

use minion_daemon::{WorkResult, Worker, WorkerContext};

/// Logs each iteration. Stops itself after the optional `max_iterations`
/// config field.
#[derive(Debug, Default)]
pub(crate) struct ExampleWorker {
    executed: u64,
}

impl ExampleWorker {
    pub(crate) fn executed(&self) -> u64 {
        self.executed
    }
}

#[async_trait]
impl Worker for ExampleWorker {
    async fn before(&mut self, _ctx: &WorkerContext<'_>) -> anyhow::Result<()> {
        info!("Starting...");
        Ok(())
    }

    async fn run_once(&mut self, ctx: &WorkerContext<'_>) -> WorkResult {
        if let Some(max) = ctx.config().int_field("max_iterations") {
            if self.executed >= max.max(0) as u64 {
                return Ok(false.into());
            }
        }

        info!("Executing.");
        self.executed += 1;
        Ok(().into())
    }

    async fn after(&mut self, _ctx: &WorkerContext<'_>) -> anyhow::Result<()> {
        info!(executed = self.executed, "Ending...");
        Ok(())
    }
}
