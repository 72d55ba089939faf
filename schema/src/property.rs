use crate::permission::{Group, GroupSet, User};
use crate::record::{RecordRoot, RecordValue};
use crate::types::Type;
use std::{fmt, sync::Arc};

/// Arguments passed to an `on_create`/`on_update` derivation
pub struct HookInput<'a> {
    /// New document on create, stored document (before the patch) on update
    pub document: &'a RecordRoot,
    /// The patch, only set on update
    pub data: Option<&'a RecordRoot>,
    pub current_user: Option<&'a User>,
}

type HookFn = dyn Fn(&HookInput<'_>) -> Option<RecordValue> + Send + Sync;

/// Server-side derivation computing a field's value at mutation time. Returning
/// `None` leaves the field untouched.
#[derive(Clone)]
pub struct FieldHook(Arc<HookFn>);

impl FieldHook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&HookInput<'_>) -> Option<RecordValue> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, input: &HookInput<'_>) -> Option<RecordValue> {
        (self.0)(input)
    }
}

impl fmt::Debug for FieldHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldHook")
    }
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub type_: Type,
    pub optional: bool,
    pub can_create: GroupSet,
    pub can_read: GroupSet,
    pub can_update: GroupSet,
    pub on_create: Option<FieldHook>,
    pub on_update: Option<FieldHook>,
}

impl Property {
    /// A required field nobody can create, read or update until granted
    pub fn new(name: impl Into<String>, type_: Type) -> Self {
        Self {
            name: name.into(),
            type_,
            optional: false,
            can_create: GroupSet::new(),
            can_read: GroupSet::new(),
            can_update: GroupSet::new(),
            on_create: None,
            on_update: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn can_create<G: Into<Group>>(mut self, groups: impl IntoIterator<Item = G>) -> Self {
        self.can_create = groups.into_iter().collect();
        self
    }

    pub fn can_read<G: Into<Group>>(mut self, groups: impl IntoIterator<Item = G>) -> Self {
        self.can_read = groups.into_iter().collect();
        self
    }

    pub fn can_update<G: Into<Group>>(mut self, groups: impl IntoIterator<Item = G>) -> Self {
        self.can_update = groups.into_iter().collect();
        self
    }

    pub fn on_create<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookInput<'_>) -> Option<RecordValue> + Send + Sync + 'static,
    {
        self.on_create = Some(FieldHook::new(f));
        self
    }

    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookInput<'_>) -> Option<RecordValue> + Send + Sync + 'static,
    {
        self.on_update = Some(FieldHook::new(f));
        self
    }

    pub(crate) fn with_hooks(
        mut self,
        on_create: Option<FieldHook>,
        on_update: Option<FieldHook>,
    ) -> Self {
        self.on_create = on_create;
        self.on_update = on_update;
        self
    }

    /// Whether a value is produced server-side on create, so callers don't
    /// have to supply it
    pub fn is_derived_on_create(&self) -> bool {
        self.on_create.is_some()
    }

    /// Fields anyone may write through a form
    pub fn is_insertable(&self) -> bool {
        !self.can_create.is_empty()
    }

    pub fn is_editable(&self) -> bool {
        !self.can_update.is_empty()
    }

    pub fn is_readable(&self) -> bool {
        !self.can_read.is_empty()
    }
}
