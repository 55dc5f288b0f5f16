//! Named remote commands per object class.

use crate::context::ObjectContext;
use crate::error::{ObjectError, ObjectResult};
use crate::params::ParamMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

type Handler<T> =
    Arc<dyn Fn(&mut T, &ParamMap, &mut ObjectContext<'_>) -> ObjectResult<String> + Send + Sync>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ResultKind {
    /// Empty string is success; anything else is a rejection message.
    Status,
    /// The string is a payload returned to the caller.
    Query,
}

struct Command<T> {
    keys: Vec<String>,
    kind: ResultKind,
    handler: Handler<T>,
}

/// Command table for one object class.
///
/// Handlers return `Ok(String)` for every business outcome; an `Err` is
/// reserved for structural failures. Objects hold the router behind an
/// `Arc` so they can pass `&mut self` to it.
pub struct CommandRouter<T> {
    commands: HashMap<String, Command<T>>,
}

impl<T> Default for CommandRouter<T> {
    fn default() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }
}

impl<T> CommandRouter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a status command: an empty result means success.
    /// Re-registering a name replaces the old handler; returns `true` then.
    pub fn add_command<F>(&mut self, name: &str, keys: &[&str], handler: F) -> bool
    where
        F: Fn(&mut T, &ParamMap, &mut ObjectContext<'_>) -> ObjectResult<String> + Send + Sync + 'static,
    {
        self.insert(name, keys, ResultKind::Status, Arc::new(handler))
    }

    /// Registers a command whose result is a payload, not a status.
    pub fn add_query<F>(&mut self, name: &str, keys: &[&str], handler: F) -> bool
    where
        F: Fn(&mut T, &ParamMap, &mut ObjectContext<'_>) -> ObjectResult<String> + Send + Sync + 'static,
    {
        self.insert(name, keys, ResultKind::Query, Arc::new(handler))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Parses `raw_params` against the command's declared keys and runs it.
    pub fn invoke(
        &self,
        target: &mut T,
        path: &str,
        name: &str,
        raw_params: &str,
        ctx: &mut ObjectContext<'_>,
    ) -> ObjectResult<String> {
        let command = self.commands.get(name).ok_or_else(|| ObjectError::UnknownCommand {
            path: path.to_string(),
            command: name.to_string(),
        })?;
        let params = ParamMap::parse(raw_params, &command.keys);
        debug!(path, command = name, "Invoking command");
        let result = (command.handler)(target, &params, ctx)?;
        Ok(match command.kind {
            ResultKind::Status => command_post_process(path, name, result),
            ResultKind::Query => result,
        })
    }

    fn insert(&mut self, name: &str, keys: &[&str], kind: ResultKind, handler: Handler<T>) -> bool {
        let command = Command {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            kind,
            handler,
        };
        let replaced = self.commands.insert(name.to_string(), command).is_some();
        if replaced {
            warn!(command = name, "Command registered twice; replacing handler");
        }
        replaced
    }
}

/// Logs a non-empty status result as a rejected command and passes it on.
pub fn command_post_process(path: &str, command: &str, result: String) -> String {
    if !result.is_empty() {
        warn!(path, command, error = %result, "Command rejected");
    }
    result
}
