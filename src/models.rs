use serde::{Deserialize, Serialize};

/// A fetched license text for one dependency.
///
/// Equality covers the full tuple, so two fetches whose text differs by a
/// single byte stay distinct after deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct License {
    pub identity: String,
    pub name: String,
    pub text: String,
}

impl License {
    pub fn new(
        identity: impl Into<String>,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            name: name.into(),
            text: text.into(),
        }
    }
}

/// The three independent sources of dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceGroup {
    LocalManifests,
    DirectReferences,
    RecursiveReferences,
}

impl SourceGroup {
    pub fn label(&self) -> &'static str {
        match self {
            SourceGroup::LocalManifests => "local manifests",
            SourceGroup::DirectReferences => "direct references",
            SourceGroup::RecursiveReferences => "recursive references",
        }
    }
}

impl std::fmt::Display for SourceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
