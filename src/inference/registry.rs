use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::Result;
use crate::ident::Identifier;
use crate::schema::ObjectSchema;
use crate::unify::Unifier;

/// Named object schemas of one run, in first-registration order.
///
/// Every object the builder meets is folded into the entry with its name, so
/// an entry only ever gains members or widens them.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    objects: IndexMap<Identifier, ObjectSchema>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// Register `object`, or merge it into the entry of the same name.
    pub fn merge(&mut self, mut object: ObjectSchema, unifier: &Unifier) -> Result<&ObjectSchema> {
        object.optional = false; // slot optionality lives on the tree, not here
        match self.objects.entry(object.name.clone()) {
            Entry::Vacant(slot) => {
                debug!(name = %object.name, members = object.members.len(), "registering object");
                Ok(slot.insert(object))
            }
            Entry::Occupied(slot) => {
                debug!(name = %object.name, members = object.members.len(), "merging into registered object");
                let entry = slot.into_mut();
                unifier.merge_object(entry, object)?;
                Ok(entry)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ObjectSchema> { self.objects.get(name) }

    pub fn contains(&self, name: &str) -> bool { self.objects.contains_key(name) }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectSchema> { self.objects.values() }

    pub fn names(&self) -> impl Iterator<Item = &Identifier> { self.objects.keys() }

    pub fn len(&self) -> usize { self.objects.len() }

    pub fn is_empty(&self) -> bool { self.objects.is_empty() }
}
