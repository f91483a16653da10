//! Command registry and dispatcher.
//!
//! A command is a name, an explicit parameter schema and a type-erased
//! handler. [`CommandRegistry::register`] derives the schema from the
//! handler's argument record and wraps the handler in a small typed adapter;
//! [`CommandRegistry::register_with_schema`] takes the schema directly.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::args::{parse, Args, Arguments, Shape, Value};
use crate::error::{Error, Result};

type Handler = dyn Fn(Vec<Value>) -> anyhow::Result<()> + Send + Sync;

/// A registered command.
#[derive(Clone)]
pub struct Command {
    name: String,
    schema: Shape,
    handler: Arc<Handler>,
}

impl Command {
    /// Command name as typed by the user.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter schema, as a tuple of the declared parameter shapes.
    pub fn schema(&self) -> &Shape {
        &self.schema
    }

    /// Usage string derived from the schema.
    pub fn help_signature(&self) -> String {
        self.schema.help_signature()
    }

    /// Parse `params` and call the handler.
    ///
    /// Fails with [`Error::Parse`] when the schema does not match or tokens are
    /// left over, and with [`Error::Command`] when the handler fails or panics.
    pub fn invoke(&self, params: &str) -> Result<()> {
        let args = Arguments::tokenize(params);
        let values = match parse(&self.schema, args) {
            Some((Value::Tuple(values), rest)) if rest.is_empty() => values,
            _ => {
                return Err(Error::Parse {
                    command: self.name.clone(),
                    usage: self.usage(),
                })
            }
        };

        let handler = self.handler.as_ref();
        match panic::catch_unwind(AssertUnwindSafe(|| handler(values))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(Error::Command {
                command: self.name.clone(),
                source,
            }),
            Err(payload) => Err(Error::Command {
                command: self.name.clone(),
                source: anyhow::anyhow!("handler panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }

    fn usage(&self) -> String {
        let signature = self.help_signature();
        if signature.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, signature)
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Name-indexed set of commands.
///
/// Cloning is cheap (handlers are shared), which lets a running loop keep
/// its own immutable copy while new registrations go into a fresh one.
#[derive(Clone, Debug, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Command>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler whose argument record determines the schema.
    ///
    /// ```
    /// use mnome_core::CommandRegistry;
    ///
    /// let mut commands = CommandRegistry::new();
    /// commands.register("greet", |(first, last): (String, String)| {
    ///     println!("hello {first} {last}");
    ///     Ok(())
    /// });
    /// assert_eq!(commands.help_signature("greet").as_deref(), Some("[STRING STRING]"));
    /// ```
    pub fn register<A, F>(&mut self, name: impl Into<String>, handler: F)
    where
        A: Args + 'static,
        F: Fn(A) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register_with_schema(name, A::schema(), move |values| {
            let args = A::from_values(values)?;
            handler(args)
        });
    }

    /// Register a handler with an explicitly declared schema.
    ///
    /// The handler receives one [`Value`] per schema entry, already shaped
    /// accordingly. Registering an existing name replaces it.
    pub fn register_with_schema<F>(&mut self, name: impl Into<String>, schema: Vec<Shape>, handler: F)
    where
        F: Fn(Vec<Value>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        log::debug!("Registering command '{}'", name);
        let command = Command {
            name: name.clone(),
            schema: Shape::Tuple(schema),
            handler: Arc::new(handler),
        };
        self.commands.insert(name, command);
    }

    /// Look up a command by exact name.
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Usage string of a command.
    pub fn help_signature(&self, name: &str) -> Option<String> {
        self.get(name).map(Command::help_signature)
    }

    /// Commands in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Find `name` and invoke it with the rest of the line.
    pub fn dispatch(&self, name: &str, params: &str) -> Result<()> {
        let command = self
            .get(name)
            .ok_or_else(|| Error::UnknownCommand(name.to_string()))?;
        command.invoke(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_dispatch_two_strings() {
        let seen = recorder();
        let mut commands = CommandRegistry::new();
        let sink = seen.clone();
        commands.register("test", move |(a, b): (String, String)| {
            sink.lock().unwrap().extend([a, b]);
            Ok(())
        });

        commands.dispatch("test", "a b").unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_arity_must_match_exactly() {
        let calls = recorder();
        let mut commands = CommandRegistry::new();
        let sink = calls.clone();
        commands.register("two", move |(a, _b): (String, String)| {
            sink.lock().unwrap().push(a);
            Ok(())
        });

        assert!(matches!(commands.dispatch("two", "x"), Err(Error::Parse { .. })));
        assert!(matches!(commands.dispatch("two", "x y z"), Err(Error::Parse { .. })));
        assert!(calls.lock().unwrap().is_empty());
        commands.dispatch("two", "x y").unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_zero_argument_command_rejects_garbage() {
        let mut commands = CommandRegistry::new();
        commands.register("start", |()| Ok(()));
        assert!(commands.dispatch("start", "").is_ok());
        assert!(commands.dispatch("start", "   ").is_ok());
        assert!(matches!(commands.dispatch("start", "now"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_unknown_command() {
        let commands = CommandRegistry::new();
        let err = commands.dispatch("nope", "").unwrap_err();
        assert!(matches!(err, Error::UnknownCommand(ref name) if name == "nope"));
        assert_eq!(err.to_string(), "\"nope\" is not a valid command");
    }

    #[test]
    fn test_handler_error_and_panic_are_contained() {
        let mut commands = CommandRegistry::new();
        commands.register("num", |(text,): (String,)| {
            let _: u32 = text.parse()?;
            Ok(())
        });
        commands.register("boom", |()| -> anyhow::Result<()> { panic!("kaboom") });

        assert!(matches!(commands.dispatch("num", "abc"), Err(Error::Command { .. })));
        let err = commands.dispatch("boom", "").unwrap_err();
        assert!(err.to_string().contains("kaboom"));
        assert!(commands.dispatch("num", "12").is_ok());
    }

    #[test]
    fn test_explicit_schema() {
        let seen = recorder();
        let mut commands = CommandRegistry::new();
        let sink = seen.clone();
        commands.register_with_schema(
            "tag",
            vec![Shape::Scalar, Shape::list(Shape::Scalar)],
            move |values| {
                sink.lock().unwrap().push(format!("{:?}", values));
                Ok(())
            },
        );

        commands.dispatch("tag", "name").unwrap();
        commands.dispatch("tag", "name a b").unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].contains("\"a\""));
        assert_eq!(commands.help_signature("tag").unwrap(), "[STRING STRING...]");
    }

    #[test]
    fn test_help_signatures_and_order() {
        let mut commands = CommandRegistry::new();
        commands.register("exit", |()| Ok(()));
        commands.register("bpm", |(_,): (String,)| Ok(()));
        commands.register("test2", |(_,): (Vec<(String, String)>,)| Ok(()));

        let names: Vec<&str> = commands.iter().map(Command::name).collect();
        assert_eq!(names, ["bpm", "exit", "test2"]);
        assert_eq!(commands.help_signature("exit").unwrap(), "");
        assert_eq!(commands.help_signature("bpm").unwrap(), "[STRING]");
        assert_eq!(commands.help_signature("test2").unwrap(), "[[STRING STRING]...]");
    }

    #[test]
    fn test_parse_error_mentions_usage() {
        let mut commands = CommandRegistry::new();
        commands.register("bpm", |(_,): (String,)| Ok(()));
        let err = commands.dispatch("bpm", "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "error during parameter parsing (usage: bpm [STRING])"
        );
    }
}
