//! Lifecycle callbacks fired around mutations.
//!
//! Callbacks are registered on named channels of the form
//! `<type>.<create|update|delete>.<validate|before|after|async>`. A
//! [`Callbacks`] registry is owned by the caller and handed to the mutators
//! through the [`Context`](crate::Context), so separate contexts never share
//! registrations.

use futures::future::BoxFuture;
use parking_lot::RwLock;
use schema::{Collection, RecordRoot, User, ValidationError};
use std::{
    fmt::Display,
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tracing::{debug, error};

pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("invalid callback channel {0:?}, expected <type>.<operation>.<stage>")]
    Invalid(String),

    #[error("unknown operation {0:?}")]
    UnknownOperation(String),

    #[error("unknown stage {0:?}")]
    UnknownStage(String),

    #[error("channel {channel} does not accept {kind} callbacks")]
    StageMismatch { channel: Channel, kind: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Adds validation errors, only runs when the mutator validates
    Validate,
    /// Transforms the input before it is persisted. On delete, transforms the
    /// document handed to the later stages.
    Before,
    /// Transforms the persisted document before it is returned
    After,
    /// Fire-and-forget, never awaited by the mutator
    Async,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Validate => write!(f, "validate"),
            Stage::Before => write!(f, "before"),
            Stage::After => write!(f, "after"),
            Stage::Async => write!(f, "async"),
        }
    }
}

/// Named hook point. The type name is matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel {
    type_name: String,
    operation: Operation,
    stage: Stage,
}

impl Channel {
    pub fn new(type_name: &str, operation: Operation, stage: Stage) -> Self {
        Self {
            type_name: type_name.to_lowercase(),
            operation,
            stage,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn with_stage(&self, stage: Stage) -> Self {
        Self {
            stage,
            ..self.clone()
        }
    }
}

impl FromStr for Channel {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let (Some(type_name), Some(operation), Some(stage), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ChannelError::Invalid(s.to_string()));
        };

        if type_name.is_empty() {
            return Err(ChannelError::Invalid(s.to_string()));
        }

        let operation = match operation {
            "create" => Operation::Create,
            "update" => Operation::Update,
            "delete" => Operation::Delete,
            _ => return Err(ChannelError::UnknownOperation(operation.to_string())),
        };

        let stage = match stage {
            "validate" => Stage::Validate,
            "before" => Stage::Before,
            "after" => Stage::After,
            "async" => Stage::Async,
            _ => return Err(ChannelError::UnknownStage(stage.to_string())),
        };

        Ok(Self::new(type_name, operation, stage))
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.type_name, self.operation, self.stage)
    }
}

/// What synchronous callbacks see besides the document
#[derive(Debug, Clone, Copy)]
pub struct CallbackProps<'a> {
    pub collection: &'a Collection,
    pub current_user: Option<&'a User>,
    /// Caller's patch, update only
    pub data: Option<&'a RecordRoot>,
    /// Stored document before the update
    pub old_document: Option<&'a RecordRoot>,
}

/// Owned snapshot handed to async callbacks, which outlive the mutator call
#[derive(Debug, Clone)]
pub struct AsyncCallbackProps {
    pub document: RecordRoot,
    pub collection: Arc<Collection>,
    pub current_user: Option<User>,
    pub data: Option<RecordRoot>,
    pub old_document: Option<RecordRoot>,
}

impl AsyncCallbackProps {
    pub(crate) fn new(document: RecordRoot, props: &CallbackProps<'_>) -> Self {
        Self {
            document,
            collection: Arc::new(props.collection.clone()),
            current_user: props.current_user.cloned(),
            data: props.data.cloned(),
            old_document: props.old_document.cloned(),
        }
    }
}

type ValidateFn = dyn Fn(&RecordRoot, &CallbackProps<'_>) -> Vec<ValidationError> + Send + Sync;
type TransformFn =
    dyn Fn(RecordRoot, &CallbackProps<'_>) -> Result<RecordRoot, CallbackError> + Send + Sync;
type AsyncFn =
    dyn Fn(AsyncCallbackProps) -> BoxFuture<'static, Result<(), CallbackError>> + Send + Sync;

#[derive(Clone)]
enum Callback {
    Validate(Arc<ValidateFn>),
    Transform(Arc<TransformFn>),
    Async(Arc<AsyncFn>),
}

/// Handle returned on registration, used to remove the callback again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

struct Registration {
    id: CallbackId,
    channel: Channel,
    callback: Callback,
}

#[derive(Default)]
pub struct Callbacks {
    next_id: AtomicU64,
    registrations: RwLock<Vec<Registration>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validate callback, e.g. on `movie.create.validate`
    pub fn add_validate<F>(&self, channel: &str, f: F) -> Result<CallbackId, ChannelError>
    where
        F: Fn(&RecordRoot, &CallbackProps<'_>) -> Vec<ValidationError> + Send + Sync + 'static,
    {
        let channel = expect_stage(channel, &[Stage::Validate], "validate")?;
        Ok(self.register(channel, Callback::Validate(Arc::new(f))))
    }

    /// Registers a `before` or `after` callback transforming the document
    pub fn add<F>(&self, channel: &str, f: F) -> Result<CallbackId, ChannelError>
    where
        F: Fn(RecordRoot, &CallbackProps<'_>) -> Result<RecordRoot, CallbackError>
            + Send
            + Sync
            + 'static,
    {
        let channel = expect_stage(channel, &[Stage::Before, Stage::After], "transform")?;
        Ok(self.register(channel, Callback::Transform(Arc::new(f))))
    }

    /// Registers a fire-and-forget callback on an `async` channel
    pub fn add_async<F, Fut>(&self, channel: &str, f: F) -> Result<CallbackId, ChannelError>
    where
        F: Fn(AsyncCallbackProps) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), CallbackError>> + Send + 'static,
    {
        let channel = expect_stage(channel, &[Stage::Async], "async")?;
        let f: Arc<AsyncFn> = Arc::new(move |props| Box::pin(f(props)));
        Ok(self.register(channel, Callback::Async(f)))
    }

    /// Removes a single callback, returns false if it was already removed
    pub fn remove(&self, id: CallbackId) -> bool {
        let mut registrations = self.registrations.write();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }

    /// Removes every callback registered on a channel, returning how many
    pub fn remove_channel(&self, channel: &str) -> Result<usize, ChannelError> {
        let channel = Channel::from_str(channel)?;
        let mut registrations = self.registrations.write();
        let before = registrations.len();
        registrations.retain(|r| r.channel != channel);
        Ok(before - registrations.len())
    }

    pub fn clear(&self) {
        self.registrations.write().clear();
    }

    pub fn count(&self, channel: &Channel) -> usize {
        self.registrations
            .read()
            .iter()
            .filter(|r| &r.channel == channel)
            .count()
    }

    fn register(&self, channel: Channel, callback: Callback) -> CallbackId {
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(%channel, "callback registered");
        self.registrations.write().push(Registration {
            id,
            channel,
            callback,
        });
        id
    }

    /// Snapshot so callbacks can (de)register without deadlocking
    fn callbacks_for(&self, channel: &Channel) -> Vec<Callback> {
        self.registrations
            .read()
            .iter()
            .filter(|r| &r.channel == channel)
            .map(|r| r.callback.clone())
            .collect()
    }

    pub(crate) fn run_validate(
        &self,
        channel: &Channel,
        document: &RecordRoot,
        props: &CallbackProps<'_>,
    ) -> Vec<ValidationError> {
        let channel = channel.with_stage(Stage::Validate);
        self.callbacks_for(&channel)
            .into_iter()
            .flat_map(|callback| match callback {
                Callback::Validate(f) => f(document, props),
                _ => vec![],
            })
            .collect()
    }

    /// Runs transform callbacks in registration order, each receiving the
    /// output of the previous one. The first error aborts the chain.
    pub(crate) fn run(
        &self,
        channel: &Channel,
        mut document: RecordRoot,
        props: &CallbackProps<'_>,
    ) -> Result<RecordRoot, (Channel, CallbackError)> {
        for callback in self.callbacks_for(channel) {
            if let Callback::Transform(f) = callback {
                document = f(document, props).map_err(|err| (channel.clone(), err))?;
            }
        }
        Ok(document)
    }

    /// Spawns every async callback of the channel and returns immediately.
    /// `props` is only built when at least one callback is registered.
    pub(crate) fn run_async(
        &self,
        channel: &Channel,
        props: impl FnOnce() -> AsyncCallbackProps,
    ) -> usize {
        let callbacks = self.callbacks_for(channel);
        if callbacks.is_empty() {
            return 0;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(%channel, "no tokio runtime, async callbacks skipped");
            return 0;
        };

        let props = props();
        let mut dispatched = 0;
        for callback in callbacks {
            let Callback::Async(f) = callback else {
                continue;
            };

            let props = props.clone();
            let channel = channel.clone();
            runtime.spawn(async move {
                if let Err(err) = f(props).await {
                    error!(%channel, error = %err, "async callback failed");
                }
            });
            dispatched += 1;
        }

        debug!(%channel, dispatched, "async callbacks dispatched");
        dispatched
    }
}

fn expect_stage(channel: &str, stages: &[Stage], kind: &'static str) -> Result<Channel, ChannelError> {
    let channel = Channel::from_str(channel)?;
    if !stages.contains(&channel.stage) {
        return Err(ChannelError::StageMismatch { channel, kind });
    }
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{Reason, Schema};

    fn collection() -> Collection {
        Collection::new("Movies", "Movie", Schema::default()).unwrap()
    }

    fn props(collection: &Collection) -> CallbackProps<'_> {
        CallbackProps {
            collection,
            current_user: None,
            data: None,
            old_document: None,
        }
    }

    #[test]
    fn test_parse_channel() {
        let channel: Channel = "Movie.create.after".parse().unwrap();
        assert_eq!(channel, Channel::new("movie", Operation::Create, Stage::After));
        assert_eq!(channel.to_string(), "movie.create.after");

        assert!(matches!(
            "movie.create".parse::<Channel>(),
            Err(ChannelError::Invalid(_))
        ));
        assert!(matches!(
            "movie.create.after.extra".parse::<Channel>(),
            Err(ChannelError::Invalid(_))
        ));
        assert!(matches!(
            "movie.insert.after".parse::<Channel>(),
            Err(ChannelError::UnknownOperation(_))
        ));
        assert!(matches!(
            "movie.create.later".parse::<Channel>(),
            Err(ChannelError::UnknownStage(_))
        ));
    }

    #[test]
    fn test_stage_mismatch() {
        let callbacks = Callbacks::new();
        let err = callbacks
            .add("movie.create.async", |doc, _| Ok(doc))
            .unwrap_err();
        assert!(matches!(err, ChannelError::StageMismatch { .. }));

        let err = callbacks
            .add_async("movie.create.after", |_| async { Ok::<_, CallbackError>(()) })
            .unwrap_err();
        assert!(matches!(err, ChannelError::StageMismatch { .. }));
    }

    #[test]
    fn test_run_in_registration_order() {
        let callbacks = Callbacks::new();
        callbacks
            .add("movie.create.before", |mut doc, _| {
                doc.insert("order", "first");
                Ok(doc)
            })
            .unwrap();
        callbacks
            .add("movie.create.before", |mut doc, _| {
                let prev = doc.get("order").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                doc.insert("order", format!("{prev},second"));
                Ok(doc)
            })
            .unwrap();

        let collection = collection();
        let channel = Channel::new("Movie", Operation::Create, Stage::Before);
        let doc = callbacks
            .run(&channel, RecordRoot::new(), &props(&collection))
            .unwrap();
        assert_eq!(doc.get("order").and_then(|v| v.as_str()), Some("first,second"));
    }

    #[test]
    fn test_run_stops_on_error() {
        let callbacks = Callbacks::new();
        callbacks
            .add("movie.update.after", |_, _| Err("boom".into()))
            .unwrap();
        callbacks
            .add("movie.update.after", |_, _| panic!("should not run"))
            .unwrap();

        let collection = collection();
        let channel = Channel::new("movie", Operation::Update, Stage::After);
        let (failed, err) = callbacks
            .run(&channel, RecordRoot::new(), &props(&collection))
            .unwrap_err();
        assert_eq!(failed, channel);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_remove() {
        let callbacks = Callbacks::new();
        let channel = Channel::new("movie", Operation::Create, Stage::After);
        let id = callbacks.add("movie.create.after", |doc, _| Ok(doc)).unwrap();
        callbacks.add("movie.create.after", |doc, _| Ok(doc)).unwrap();
        callbacks.add("movie.update.after", |doc, _| Ok(doc)).unwrap();
        assert_eq!(callbacks.count(&channel), 2);

        assert!(callbacks.remove(id));
        assert!(!callbacks.remove(id));
        assert_eq!(callbacks.count(&channel), 1);

        assert_eq!(callbacks.remove_channel("movie.create.after").unwrap(), 1);
        assert_eq!(callbacks.count(&channel), 0);

        callbacks.clear();
        assert_eq!(
            callbacks.count(&Channel::new("movie", Operation::Update, Stage::After)),
            0
        );
    }

    #[test]
    fn test_run_validate_collects_errors() {
        let callbacks = Callbacks::new();
        callbacks
            .add_validate("movie.create.validate", |doc, _| {
                if doc.contains("title") {
                    vec![]
                } else {
                    vec![ValidationError::custom("title please")]
                }
            })
            .unwrap();

        let collection = collection();
        let channel = Channel::new("movie", Operation::Create, Stage::Validate);
        let errors = callbacks.run_validate(&channel, &RecordRoot::new(), &props(&collection));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].id, Reason::Custom);
    }

    #[tokio::test]
    async fn test_run_async_skips_props_without_callbacks() {
        let callbacks = Callbacks::new();
        let channel = Channel::new("movie", Operation::Create, Stage::Async);
        let dispatched = callbacks.run_async(&channel, || panic!("props built"));
        assert_eq!(dispatched, 0);
    }

    #[test]
    fn test_run_async_without_runtime() {
        let callbacks = Callbacks::new();
        callbacks
            .add_async("movie.create.async", |_| async { Ok::<_, CallbackError>(()) })
            .unwrap();

        let collection = collection();
        let channel = Channel::new("movie", Operation::Create, Stage::Async);
        let dispatched = callbacks.run_async(&channel, || {
            AsyncCallbackProps::new(RecordRoot::new(), &props(&collection))
        });
        assert_eq!(dispatched, 0);
    }
}
