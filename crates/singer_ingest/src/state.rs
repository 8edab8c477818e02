use std::{
    future::Future,
    io,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{BoxError, SingerError, StateWriteFailureKind};

/// Type-erased future returned by the state collaborators.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execution context handed to a [`StateHandler`] for one STATE message.
///
/// The checkpoint value is bound under a single variable name on top of a read-only parent
/// scope. Each invocation gets its own scope; bindings never leak between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct StateScope {
    parent: Arc<Map<String, Value>>,
    variable: String,
    value: Value,
    line_number: usize,
}

impl StateScope {
    pub fn new(
        parent: Arc<Map<String, Value>>,
        variable: impl Into<String>,
        value: Value,
        line_number: usize,
    ) -> Self {
        Self {
            parent,
            variable: variable.into(),
            value,
            line_number,
        }
    }

    /// Name the checkpoint value is bound to.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// 1-based input line of the STATE message.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn parent(&self) -> &Map<String, Value> {
        &self.parent
    }

    /// Resolves `name`, preferring the checkpoint binding over the parent scope.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if name == self.variable {
            Some(&self.value)
        } else {
            self.parent.get(name)
        }
    }
}

/// Caller-supplied checkpoint handler. Awaited to completion before the next line is read.
pub trait StateHandler: Send {
    fn handle(&mut self, scope: StateScope) -> BoxFuture<'_, Result<(), BoxError>>;
}

impl<F, Fut> StateHandler for F
where
    F: FnMut(StateScope) -> Fut + Send,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn handle(&mut self, scope: StateScope) -> BoxFuture<'_, Result<(), BoxError>> {
        Box::pin(self(scope))
    }
}

/// File system capability used by the default state sink.
pub trait StateFileSystem: Send + Sync {
    fn current_dir(&self) -> io::Result<PathBuf>;

    /// Replaces the contents of `path` with `contents`, creating the file if needed.
    fn write_all_text<'a>(&'a self, path: &'a Path, contents: &'a str)
        -> BoxFuture<'a, io::Result<()>>;
}

/// [`StateFileSystem`] backed by `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem {
    root: Option<PathBuf>,
}

impl LocalFileSystem {
    /// Uses the process working directory as the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the current directory to `root` instead of the process working directory.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl StateFileSystem for LocalFileSystem {
    fn current_dir(&self) -> io::Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir(),
        }
    }

    fn write_all_text<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a str,
    ) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(tokio::fs::write(path, contents))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum StateDisposition {
    Handled,
    Written(PathBuf),
}

/// Sends each checkpoint either to the configured handler or to the state file.
pub(crate) struct StateRouter {
    handler: Option<Box<dyn StateHandler>>,
    file_system: Option<Arc<dyn StateFileSystem>>,
    state_file_name: String,
    state_variable: String,
    variables: Arc<Map<String, Value>>,
}

impl StateRouter {
    pub(crate) fn new(
        handler: Option<Box<dyn StateHandler>>,
        file_system: Option<Arc<dyn StateFileSystem>>,
        state_file_name: String,
        state_variable: String,
        variables: Map<String, Value>,
    ) -> Self {
        Self {
            handler,
            file_system,
            state_file_name,
            state_variable,
            variables: Arc::new(variables),
        }
    }

    pub(crate) async fn route(
        &mut self,
        line_number: usize,
        value: Value,
    ) -> Result<StateDisposition, SingerError> {
        if let Some(handler) = self.handler.as_mut() {
            let scope = StateScope::new(
                Arc::clone(&self.variables),
                self.state_variable.clone(),
                value,
                line_number,
            );
            handler
                .handle(scope)
                .await
                .map_err(|source| SingerError::StateHandler {
                    line_number,
                    source,
                })?;
            debug!(line_number, "STATE passed to handler");
            return Ok(StateDisposition::Handled);
        }

        let write_failure = |kind| SingerError::StateWrite { line_number, kind };

        let Some(fs) = self.file_system.as_ref() else {
            return Err(write_failure(StateWriteFailureKind::MissingFileSystem));
        };
        let contents = serde_json::to_string(&value)
            .map_err(|err| write_failure(StateWriteFailureKind::Serialize(err)))?;
        let dir = fs.current_dir().map_err(|source| {
            write_failure(StateWriteFailureKind::Io {
                path: PathBuf::from(&self.state_file_name),
                source,
            })
        })?;
        let path = dir.join(&self.state_file_name);
        fs.write_all_text(&path, &contents).await.map_err(|source| {
            write_failure(StateWriteFailureKind::Io {
                path: path.clone(),
                source,
            })
        })?;
        debug!(line_number, path = %path.display(), bytes = contents.len(), "STATE written");
        Ok(StateDisposition::Written(path))
    }
}
