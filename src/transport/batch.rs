//! Command batching: client-side collection, server-side serial execution.
//!
//! ## Server side
//!
//! [`execute_batch`] runs an ordered list of commands through the pipeline
//! strictly serially, threading the state from each command into the next.
//! Partial failure across commands is allowed - partial application of a
//! single command never is: if command *k* fails validation, commands before
//! *k* keep their effects, *k* reports the reason, and everything after *k*
//! is skipped. Batch execution is equivalent to calling the single-command
//! entry point once per command; it is not a separate execution mode.
//!
//! ## Client side
//!
//! [`CommandBatcher`] collects submissions from one input burst into a
//! batch. It is a pure state machine: `enqueue` reports whether the queue
//! should keep holding or flush now, and the caller owns the clock - a
//! wall-time window is layered on top by calling [`CommandBatcher::flush`]
//! when its timer fires.

use tracing::debug;

use crate::core::state::MatchState;
use crate::core::{Command, MatchRng};
use crate::domain::DomainCore;
use crate::pipeline::Pipeline;
use crate::systems::event_stream::{compute_delta, EventStreamEntry};

use super::config::BatchingConfig;
use super::wire::{CommandReceipt, CommandStatus};

/// Result of executing a batch.
#[derive(Clone, Debug)]
pub struct BatchOutcome<C> {
    /// State after the last applied command.
    pub state: MatchState<C>,

    /// Per-command receipts, in submission order.
    pub receipts: Vec<CommandReceipt>,

    /// Event-stream entries the batch appended, in order.
    pub new_entries: Vec<EventStreamEntry>,
}

impl<C> BatchOutcome<C> {
    /// Number of commands whose effects were applied.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.receipts.iter().filter(|r| r.status.is_applied()).count()
    }
}

/// Execute commands strictly serially, stopping at the first validation
/// failure.
pub fn execute_batch<D: DomainCore>(
    pipeline: &Pipeline<D>,
    state: &MatchState<D::State>,
    commands: &[Command],
    rng: &mut MatchRng,
) -> BatchOutcome<D::State> {
    let baseline = state.sys.event_stream.last_id().unwrap_or(0);
    let mut current = state.clone();
    let mut receipts = Vec::with_capacity(commands.len());
    let mut failed = false;

    for command in commands {
        if failed {
            receipts.push(CommandReceipt {
                client_id: command.client_id,
                status: CommandStatus::Skipped,
            });
            continue;
        }

        match pipeline.execute(&current, command, rng) {
            Ok(outcome) => {
                current = outcome.state;
                receipts.push(CommandReceipt {
                    client_id: command.client_id,
                    status: CommandStatus::Applied,
                });
            }
            Err(err) => {
                debug!(command = %command.command_type, %err, "batch stopped at rejection");
                receipts.push(CommandReceipt {
                    client_id: command.client_id,
                    status: CommandStatus::Rejected(err),
                });
                failed = true;
            }
        }
    }

    let new_entries = compute_delta(current.sys.event_stream.entries(), baseline).new_entries;

    BatchOutcome {
        state: current,
        receipts,
        new_entries,
    }
}

/// What the caller should do after enqueueing a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchAction {
    /// Keep collecting; nothing to send yet.
    Hold,

    /// Send these commands now, in order.
    Flush(Vec<Command>),
}

/// Client-side batch queue.
#[derive(Clone, Debug)]
pub struct CommandBatcher {
    queue: Vec<Command>,
    config: BatchingConfig,
}

impl CommandBatcher {
    /// Create a batcher over a game's batching policy.
    #[must_use]
    pub fn new(config: BatchingConfig) -> Self {
        Self {
            queue: Vec::new(),
            config,
        }
    }

    /// Enqueue a command.
    ///
    /// With batching disabled every command flushes alone. Otherwise the
    /// command joins the queue, and the whole queue flushes when the command
    /// type is declared immediate or the queue reaches the size limit.
    pub fn enqueue(&mut self, command: Command) -> BatchAction {
        if !self.config.enabled {
            return BatchAction::Flush(vec![command]);
        }

        let immediate = self.config.immediate.contains(&command.command_type);
        self.queue.push(command);

        if immediate || self.queue.len() >= self.config.max_batch_size {
            return BatchAction::Flush(std::mem::take(&mut self.queue));
        }

        BatchAction::Hold
    }

    /// Drain the queue, returning the held commands (possibly empty).
    ///
    /// Called by the owner of the batching window when its timer fires.
    pub fn flush(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.queue)
    }

    /// Number of held commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommandType, PlayerId};

    fn cmd(id: u16) -> Command {
        Command::new(CommandType::new(id), PlayerId::new(0))
    }

    #[test]
    fn test_disabled_batching_flushes_each_command() {
        let mut batcher = CommandBatcher::new(BatchingConfig::default());

        let action = batcher.enqueue(cmd(1));
        assert_eq!(action, BatchAction::Flush(vec![cmd(1)]));
        assert!(batcher.is_empty());
    }

    #[test]
    fn test_holds_until_size_limit() {
        let mut batcher = CommandBatcher::new(BatchingConfig::enabled(3));

        assert_eq!(batcher.enqueue(cmd(1)), BatchAction::Hold);
        assert_eq!(batcher.enqueue(cmd(2)), BatchAction::Hold);

        let action = batcher.enqueue(cmd(3));
        assert_eq!(action, BatchAction::Flush(vec![cmd(1), cmd(2), cmd(3)]));
        assert!(batcher.is_empty());
    }

    #[test]
    fn test_immediate_command_flushes_queue() {
        let config = BatchingConfig::enabled(10).with_immediate(CommandType::new(9));
        let mut batcher = CommandBatcher::new(config);

        batcher.enqueue(cmd(1));
        let action = batcher.enqueue(cmd(9));

        assert_eq!(action, BatchAction::Flush(vec![cmd(1), cmd(9)]));
    }

    #[test]
    fn test_manual_flush_drains_queue() {
        let mut batcher = CommandBatcher::new(BatchingConfig::enabled(10));

        batcher.enqueue(cmd(1));
        batcher.enqueue(cmd(2));

        assert_eq!(batcher.flush(), vec![cmd(1), cmd(2)]);
        assert!(batcher.flush().is_empty());
    }
}
