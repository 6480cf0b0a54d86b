//! Binding commands to methods of a shared component instance.
//!
//! Component state lives behind an [`Instance`]. Each helper returns a
//! callable that locks the instance, invokes the method and converts its
//! return value through [`IntoExecutionResult`]. Queued commands built from
//! these callables run on the owning task's thread, so the lock is
//! uncontended except against the task's own `run` step.
//!
//! A method bound this way must not be invoked synchronously from inside the
//! same instance's `run`, since the instance is already locked there.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use mts_core::{ExecutionResult, IntoExecutionResult};

/// Shared, lockable component state.
pub struct Instance<B> {
    inner: Arc<Mutex<B>>,
}

impl<B> Clone for Instance<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Send + 'static> Instance<B> {
    pub fn new(value: B) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, B> {
        self.inner.lock()
    }

    /// Runs `f` with exclusive access to the instance.
    pub fn with<T>(&self, f: impl FnOnce(&mut B) -> T) -> T {
        f(&mut self.inner.lock())
    }

    pub fn void<F, O>(&self, method: F) -> impl Fn() -> ExecutionResult + Send + Sync + 'static
    where
        F: Fn(&mut B) -> O + Send + Sync + 'static,
        O: IntoExecutionResult,
    {
        let instance = self.clone();
        move || method(&mut instance.lock()).into_execution_result()
    }

    pub fn write<A, F, O>(
        &self,
        method: F,
    ) -> impl Fn(&A) -> ExecutionResult + Send + Sync + 'static
    where
        A: 'static,
        F: Fn(&mut B, &A) -> O + Send + Sync + 'static,
        O: IntoExecutionResult,
    {
        let instance = self.clone();
        move |argument: &A| method(&mut instance.lock(), argument).into_execution_result()
    }

    pub fn read<R, F, O>(
        &self,
        method: F,
    ) -> impl Fn(&mut R) -> ExecutionResult + Send + Sync + 'static
    where
        R: 'static,
        F: Fn(&B, &mut R) -> O + Send + Sync + 'static,
        O: IntoExecutionResult,
    {
        let instance = self.clone();
        move |result: &mut R| method(&instance.lock(), result).into_execution_result()
    }

    pub fn qualified_read<A, R, F, O>(
        &self,
        method: F,
    ) -> impl Fn(&A, &mut R) -> ExecutionResult + Send + Sync + 'static
    where
        A: 'static,
        R: 'static,
        F: Fn(&B, &A, &mut R) -> O + Send + Sync + 'static,
        O: IntoExecutionResult,
    {
        let instance = self.clone();
        move |argument: &A, result: &mut R| {
            method(&instance.lock(), argument, result).into_execution_result()
        }
    }

    pub fn void_return<R, F, O>(
        &self,
        method: F,
    ) -> impl Fn(&mut R) -> ExecutionResult + Send + Sync + 'static
    where
        R: 'static,
        F: Fn(&mut B, &mut R) -> O + Send + Sync + 'static,
        O: IntoExecutionResult,
    {
        let instance = self.clone();
        move |result: &mut R| method(&mut instance.lock(), result).into_execution_result()
    }

    pub fn write_return<A, R, F, O>(
        &self,
        method: F,
    ) -> impl Fn(&A, &mut R) -> ExecutionResult + Send + Sync + 'static
    where
        A: 'static,
        R: 'static,
        F: Fn(&mut B, &A, &mut R) -> O + Send + Sync + 'static,
        O: IntoExecutionResult,
    {
        let instance = self.clone();
        move |argument: &A, result: &mut R| {
            method(&mut instance.lock(), argument, result).into_execution_result()
        }
    }
}

impl<B: Default + Send + 'static> Default for Instance<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}
