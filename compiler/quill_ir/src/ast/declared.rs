use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::Name;

/// Statically computed set of names a block binds locally.
///
/// Frozen once the annotator finishes; clones share the same allocation so
/// every runtime frame created for the block can hold it cheaply.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DeclaredSet(Arc<FxHashSet<Name>>);

impl DeclaredSet {
    pub fn from_names(names: impl IntoIterator<Item = Name>) -> Self {
        DeclaredSet(Arc::new(names.into_iter().collect()))
    }

    #[inline]
    pub fn contains(&self, name: Name) -> bool {
        self.0.contains(&name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Name> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Debug for DeclaredSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}
