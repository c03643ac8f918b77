//! Ordered, name-indexed fragment collections.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::fragments::Fragment;
use super::ids::FragmentId;

/// Fragments in registration order, indexed by name.
///
/// A name may map to several fragments (a getter and its setter, or
/// duplicates that elaboration reports later). Unnamed fragments are kept
/// in order but are not indexed.
#[derive(Clone, Debug, Default)]
pub struct NameSpace {
    fragments: Vec<Fragment>,
    by_name: IndexMap<SmolStr, Vec<usize>>,
}

impl NameSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fragment: Fragment) -> FragmentId {
        let id = fragment.id();
        let index = self.fragments.len();
        if let Some(name) = fragment.name() {
            self.by_name.entry(SmolStr::new(name)).or_default().push(index);
        }
        self.fragments.push(fragment);
        id
    }

    pub fn lookup<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Fragment> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(|&index| &self.fragments[index])
    }

    pub fn lookup_first(&self, name: &str) -> Option<&Fragment> {
        self.lookup(name).next()
    }

    pub fn get(&self, id: FragmentId) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    /// Distinct names in first-registration order.
    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.by_name.keys()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Top-level fragments of one unit.
pub type LibraryNameSpace = NameSpace;

/// Body of a class-like declaration.
#[derive(Clone, Debug, Default)]
pub struct DeclarationNameSpace {
    members: NameSpace,
    constructors: NameSpace,
}

impl DeclarationNameSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&mut self, fragment: Fragment) -> FragmentId {
        self.members.add(fragment)
    }

    /// Constructors and factories, keyed by their suffix (`""` when unnamed).
    pub fn add_constructor(&mut self, fragment: Fragment) -> FragmentId {
        self.constructors.add(fragment)
    }

    pub fn members(&self) -> &NameSpace {
        &self.members
    }

    pub fn constructors(&self) -> &NameSpace {
        &self.constructors
    }

    pub fn lookup_member(&self, name: &str) -> Option<&Fragment> {
        self.members.lookup_first(name)
    }

    pub fn lookup_constructor(&self, name: &str) -> Option<&Fragment> {
        self.constructors.lookup_first(name)
    }

    pub fn len(&self) -> usize {
        self.members.len() + self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.constructors.is_empty()
    }
}
