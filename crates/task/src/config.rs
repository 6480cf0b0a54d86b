//! Task and manager configuration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use mts_core::{DEFAULT_ARGUMENT_QUEUE_SIZE, DEFAULT_HISTORY_LENGTH, DEFAULT_MAILBOX_SIZE};

/// How a task's thread paces its cycles while active.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduling {
    /// One cycle per period boundary.
    Periodic(Duration),
    /// Cycles back to back.
    Continuous,
    /// One cycle per wake-up: a mailbox write or an event post.
    FromSignal,
}

impl Scheduling {
    pub fn period(&self) -> Option<Duration> {
        match self {
            Self::Periodic(period) => Some(*period),
            _ => None,
        }
    }
}

/// Configuration of one task.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    pub name: String,
    pub scheduling: Scheduling,
    /// Rows kept by the task's state table.
    pub history_length: usize,
    /// Capacity of each mailbox allocated for a connection.
    pub mailbox_size: usize,
    /// In-flight arguments each queued command may hold.
    pub argument_queue_size: usize,
}

impl TaskConfig {
    pub fn builder(name: impl Into<String>) -> TaskConfigBuilder {
        TaskConfigBuilder {
            config: Self {
                name: name.into(),
                ..Self::default()
            },
        }
    }

    pub fn periodic(name: impl Into<String>, period: Duration) -> Self {
        Self::builder(name).periodic(period).build()
    }

    pub fn continuous(name: impl Into<String>) -> Self {
        Self::builder(name).continuous().build()
    }

    pub fn from_signal(name: impl Into<String>) -> Self {
        Self::builder(name).from_signal().build()
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            name: String::from("task"),
            scheduling: Scheduling::Continuous,
            history_length: DEFAULT_HISTORY_LENGTH,
            mailbox_size: DEFAULT_MAILBOX_SIZE,
            argument_queue_size: DEFAULT_ARGUMENT_QUEUE_SIZE,
        }
    }
}

/// Builder for [`TaskConfig`].
#[derive(Debug, Clone)]
pub struct TaskConfigBuilder {
    config: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn periodic(mut self, period: Duration) -> Self {
        self.config.scheduling = Scheduling::Periodic(period);
        self
    }

    pub fn continuous(mut self) -> Self {
        self.config.scheduling = Scheduling::Continuous;
        self
    }

    pub fn from_signal(mut self) -> Self {
        self.config.scheduling = Scheduling::FromSignal;
        self
    }

    pub fn history_length(mut self, rows: usize) -> Self {
        self.config.history_length = rows;
        self
    }

    pub fn mailbox_size(mut self, size: usize) -> Self {
        self.config.mailbox_size = size;
        self
    }

    pub fn argument_queue_size(mut self, size: usize) -> Self {
        self.config.argument_queue_size = size;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.config
    }
}

/// Configuration of a [`ComponentManager`](crate::ComponentManager).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Name of this process, used to resolve connection endpoints.
    pub process_name: String,
    /// How long `start_all` waits for each task to become ready.
    pub wait_timeout: Duration,
}

impl ManagerConfig {
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            process_name: String::from("local"),
            wait_timeout: Duration::from_secs(5),
        }
    }
}

/// Builder for [`ManagerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ManagerConfigBuilder {
    config: ManagerConfig,
}

impl ManagerConfigBuilder {
    pub fn process_name(mut self, name: impl Into<String>) -> Self {
        self.config.process_name = name.into();
        self
    }

    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_timeout = timeout;
        self
    }

    pub fn build(self) -> ManagerConfig {
        self.config
    }
}
