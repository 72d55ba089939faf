//! Typed permission groups and the actor model used to evaluate them.
//!
//! Every field carries three capability sets (create, read, update). An actor is
//! granted a capability when the groups it belongs to, relative to the document
//! being accessed, intersect the field's set.

use crate::record::RecordRoot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

/// Field holding the id of the user that owns a document
pub const OWNER_FIELD: &str = "userId";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Group {
    /// Everyone, logged in or not
    Guests,
    /// Any logged in user
    Members,
    Admins,
    /// Logged in user owning the document being accessed
    Owners,
    Custom(String),
}

impl From<String> for Group {
    fn from(name: String) -> Self {
        match name.as_str() {
            "guests" => Group::Guests,
            "members" => Group::Members,
            "admins" => Group::Admins,
            "owners" => Group::Owners,
            _ => Group::Custom(name),
        }
    }
}

impl From<&str> for Group {
    fn from(name: &str) -> Self {
        Group::from(name.to_string())
    }
}

impl From<Group> for String {
    fn from(group: Group) -> Self {
        group.to_string()
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Group::Guests => write!(f, "guests"),
            Group::Members => write!(f, "members"),
            Group::Admins => write!(f, "admins"),
            Group::Owners => write!(f, "owners"),
            Group::Custom(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupSet(BTreeSet<Group>);

impl GroupSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, group: Group) {
        self.0.insert(group);
    }

    pub fn contains(&self, group: &Group) -> bool {
        self.0.contains(group)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any group of `member_of` is in this set
    pub fn allows(&self, member_of: &GroupSet) -> bool {
        !self.0.is_disjoint(&member_of.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.0.iter()
    }
}

impl<G: Into<Group>> FromIterator<G> for GroupSet {
    fn from_iter<I: IntoIterator<Item = G>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<G: Into<Group>, const N: usize> From<[G; N]> for GroupSet {
    fn from(groups: [G; N]) -> Self {
        groups.into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub is_admin: bool,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            groups: vec![],
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(id)
        }
    }

    pub fn with_group(mut self, group: impl Into<Group>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn owns(&self, document: &RecordRoot) -> bool {
        document
            .get(OWNER_FIELD)
            .and_then(|v| v.as_str())
            .map_or(false, |owner| owner == self.id)
    }
}

/// Groups the actor belongs to when accessing `document`. A missing user is a
/// guest.
pub fn actor_groups(user: Option<&User>, document: Option<&RecordRoot>) -> GroupSet {
    let mut groups = GroupSet::from([Group::Guests]);

    let Some(user) = user else {
        return groups;
    };

    groups.insert(Group::Members);
    for group in &user.groups {
        groups.insert(group.clone());
    }
    if user.is_admin {
        groups.insert(Group::Admins);
    }
    if document.map_or(false, |d| user.owns(d)) {
        groups.insert(Group::Owners);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_groups() {
        assert_eq!(actor_groups(None, None), GroupSet::from([Group::Guests]));
    }

    #[test]
    fn test_member_groups() {
        let user = User::new("u1").with_group("editors");
        let groups = actor_groups(Some(&user), None);
        assert_eq!(
            groups,
            GroupSet::from([
                Group::Guests,
                Group::Members,
                Group::Custom("editors".into())
            ])
        );
        assert!(!groups.contains(&Group::Admins));
    }

    #[test]
    fn test_owner_needs_document() {
        let user = User::new("u1");
        let own = RecordRoot::from([(OWNER_FIELD, "u1")]);
        let other = RecordRoot::from([(OWNER_FIELD, "u2")]);

        assert!(actor_groups(Some(&user), Some(&own)).contains(&Group::Owners));
        assert!(!actor_groups(Some(&user), Some(&other)).contains(&Group::Owners));
        assert!(!actor_groups(None, Some(&own)).contains(&Group::Owners));
    }

    #[test]
    fn test_admin_group() {
        let groups = actor_groups(Some(&User::admin("root")), None);
        assert!(groups.contains(&Group::Admins));
    }

    #[test]
    fn test_allows() {
        let can_read = GroupSet::from([Group::Admins]);
        assert!(!can_read.allows(&actor_groups(None, None)));
        assert!(can_read.allows(&actor_groups(Some(&User::admin("root")), None)));
        assert!(!GroupSet::new().allows(&actor_groups(Some(&User::admin("root")), None)));
    }

    #[test]
    fn test_deserialize_groups() {
        let set: GroupSet = serde_json::from_str(r#"["guests", "moderators"]"#).unwrap();
        assert!(set.contains(&Group::Guests));
        assert!(set.contains(&Group::Custom("moderators".into())));
    }
}
