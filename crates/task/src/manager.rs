//! Process-wide registry of tasks and their connections.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use log::{info, warn};

use mts_core::{emit, ComponentState, TraceHook, TraceRecord};

use crate::config::ManagerConfig;
use crate::connect;
use crate::error::{ConnectError, ManagerError};
use crate::task::Task;

/// A connection established through the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub client: String,
    pub required: String,
    pub server: String,
    pub provided: String,
}

impl fmt::Display for ConnectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.client, self.required, self.server, self.provided
        )
    }
}

/// Owns every task of one process and drives them through their
/// lifecycle together.
pub struct ComponentManager {
    config: ManagerConfig,
    components: BTreeMap<String, Task>,
    order: Vec<String>,
    connections: Vec<ConnectionRecord>,
    trace: Option<TraceHook>,
}

impl ComponentManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            components: BTreeMap::new(),
            order: Vec::new(),
            connections: Vec::new(),
            trace: None,
        }
    }

    /// Installs `hook` on the manager and every task, present and future.
    pub fn with_trace_hook(mut self, hook: TraceHook) -> Self {
        for task in self.components.values() {
            task.set_trace_hook(Some(hook.clone()));
        }
        self.trace = Some(hook);
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn process_name(&self) -> &str {
        &self.config.process_name
    }

    pub fn add_component(&mut self, task: Task) -> Result<(), ManagerError> {
        let name = task.name().to_owned();
        if self.components.contains_key(&name) {
            return Err(ManagerError::DuplicateComponent(name));
        }
        if let Some(hook) = &self.trace {
            task.set_trace_hook(Some(hook.clone()));
        }
        info!("{}: added component '{}'", self.config.process_name, name);
        self.order.push(name.clone());
        self.components.insert(name, task);
        Ok(())
    }

    pub fn component(&self, name: &str) -> Option<&Task> {
        self.components.get(name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut Task> {
        self.components.get_mut(name)
    }

    /// Component names in registration order.
    pub fn component_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn check_process(&self, process: &str) -> Result<(), ConnectError> {
        if process == self.config.process_name {
            Ok(())
        } else {
            Err(ConnectError::UnknownProcess(process.to_owned()))
        }
    }

    fn task(&self, name: &str) -> Result<&Task, ConnectError> {
        self.components
            .get(name)
            .ok_or_else(|| ConnectError::UnknownComponent(name.to_owned()))
    }

    /// Connects `client.required` to `server.provided`. Both endpoints
    /// must live in this process.
    pub fn connect(
        &mut self,
        client_process: &str,
        client: &str,
        required: &str,
        server_process: &str,
        server: &str,
        provided: &str,
    ) -> Result<(), ManagerError> {
        self.check_process(client_process)?;
        self.check_process(server_process)?;

        let required_interface = self
            .task(client)?
            .required_interface(required)
            .ok_or_else(|| ConnectError::UnknownInterface {
                component: client.to_owned(),
                interface: required.to_owned(),
            })?;
        let provided_interface = self
            .task(server)?
            .provided_interface(provided)
            .ok_or_else(|| ConnectError::UnknownInterface {
                component: server.to_owned(),
                interface: provided.to_owned(),
            })?;

        connect::connect(&required_interface, &provided_interface)?;

        let record = ConnectionRecord {
            client: client.to_owned(),
            required: required.to_owned(),
            server: server.to_owned(),
            provided: provided.to_owned(),
        };
        info!("{}: connected {}", self.config.process_name, record);
        emit(self.trace.as_ref(), || TraceRecord::Connected {
            client: record.client.clone(),
            required: record.required.clone(),
            server: record.server.clone(),
            provided: record.provided.clone(),
        });
        self.connections.push(record);
        Ok(())
    }

    /// [`connect`](Self::connect) with both endpoints in this process.
    pub fn connect_local(
        &mut self,
        client: &str,
        required: &str,
        server: &str,
        provided: &str,
    ) -> Result<(), ManagerError> {
        let process = self.config.process_name.clone();
        self.connect(&process, client, required, &process, server, provided)
    }

    pub fn disconnect(&mut self, client: &str, required: &str) -> Result<(), ManagerError> {
        let required_interface = self
            .task(client)?
            .required_interface(required)
            .ok_or_else(|| ConnectError::UnknownInterface {
                component: client.to_owned(),
                interface: required.to_owned(),
            })?;
        connect::disconnect(&required_interface)?;

        if let Some(pos) = self
            .connections
            .iter()
            .position(|c| c.client == client && c.required == required)
        {
            let record = self.connections.remove(pos);
            info!("{}: disconnected {}", self.config.process_name, record);
            emit(self.trace.as_ref(), || TraceRecord::Disconnected {
                client: record.client,
                required: record.required,
                server: record.server,
                provided: record.provided,
            });
        }
        Ok(())
    }

    pub fn connections(&self) -> &[ConnectionRecord] {
        &self.connections
    }

    /// Creates every task still `Constructed`.
    pub fn create_all(&mut self) -> Result<(), ManagerError> {
        for name in &self.order {
            let Some(task) = self.components.get_mut(name) else {
                continue;
            };
            if task.state() != ComponentState::Constructed {
                continue;
            }
            task.create().map_err(|source| ManagerError::Task {
                component: name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Waits for every task to become ready, then starts them in
    /// registration order.
    pub fn start_all(&self) -> Result<(), ManagerError> {
        for task in self.ordered() {
            if !task.wait_for_state(ComponentState::Ready, self.config.wait_timeout) {
                return Err(ManagerError::Timeout {
                    component: task.name().to_owned(),
                    state: ComponentState::Ready,
                });
            }
        }
        for task in self.ordered() {
            if task.state() == ComponentState::Active {
                continue;
            }
            task.start().map_err(|source| ManagerError::Task {
                component: task.name().to_owned(),
                source,
            })?;
        }
        Ok(())
    }

    /// Kills every task, last registered first.
    pub fn kill_all(&self) {
        for task in self.ordered().rev() {
            task.kill();
        }
    }

    /// Waits until every task has been in `state`, sharing one deadline
    /// across all of them. `Duration::MAX` waits without a deadline.
    pub fn wait_for_state_all(&self, state: ComponentState, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        self.ordered().all(|task| {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            task.wait_for_state(state, remaining)
        })
    }

    /// Kills every task and joins their threads. Returns `false` when some
    /// task did not finish within the configured wait timeout.
    pub fn cleanup(&mut self) -> bool {
        self.kill_all();
        let mut finished = true;
        for task in self.ordered() {
            if !task.wait_to_terminate(self.config.wait_timeout) {
                warn!(
                    "{}: component '{}' did not finish, still {}",
                    self.config.process_name,
                    task.name(),
                    task.state()
                );
                finished = false;
            }
        }
        finished
    }

    /// Every component with its current state, in registration order.
    pub fn states(&self) -> Vec<(String, ComponentState)> {
        self.ordered()
            .map(|task| (task.name().to_owned(), task.state()))
            .collect()
    }

    fn ordered(&self) -> impl DoubleEndedIterator<Item = &Task> + '_ {
        self.order
            .iter()
            .filter_map(move |name| self.components.get(name))
    }
}

impl Default for ComponentManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentManager")
            .field("process", &self.config.process_name)
            .field("components", &self.states())
            .field("connections", &self.connections)
            .finish()
    }
}
