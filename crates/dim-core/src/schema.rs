//! Field-level indexing policy for image documents.
//!
//! The policy is fixed per field name. Document index engines read it when
//! they lay out their schema and when they decide which stored fields a
//! search may return.

/// `Name` field.
pub const NAME: &str = "Name";
/// `Tag` field.
pub const TAG: &str = "Tag";
/// `FullName` field, the document identifier.
pub const FULL_NAME: &str = "FullName";
/// `ID` field (configuration digest).
pub const ID: &str = "ID";
/// `Author` field.
pub const AUTHOR: &str = "Author";
/// `Comment` field.
pub const COMMENT: &str = "Comment";
/// `Created` field.
pub const CREATED: &str = "Created";
/// Label keys of a document.
pub const LABELS: &str = "Labels";
/// Environment variable names of a document.
pub const ENVS: &str = "Envs";
/// `Volumes` field.
pub const VOLUMES: &str = "Volumes";
/// `ExposedPorts` field.
pub const EXPOSED_PORTS: &str = "ExposedPorts";
/// Prefix of per-label value fields (`Label.<key>`).
pub const LABEL: &str = "Label";
/// Prefix of per-variable value fields (`Env.<key>`).
pub const ENV: &str = "Env";

/// How a field's text is analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analyzer {
    /// Whole value is a single token.
    Keyword,
    /// Lower-cased word tokens.
    Simple,
    /// Natural-language text with stemming.
    Language,
    /// Date/time values.
    DateTime,
    /// Exact token used for internal lookups only.
    Identifier,
    /// Collection whose entries are indexed one by one.
    Dynamic,
}

/// Indexing policy of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    /// Field name.
    pub name: &'static str,
    /// Analyzer applied to the field.
    pub analyzer: Analyzer,
    /// Whether searches may return the field's value.
    pub stored: bool,
    /// Whether unqualified query-string terms search this field.
    pub default_scope: bool,
}

impl FieldPolicy {
    const fn new(
        name: &'static str,
        analyzer: Analyzer,
        stored: bool,
        default_scope: bool,
    ) -> Self {
        Self {
            name,
            analyzer,
            stored,
            default_scope,
        }
    }
}

/// Policies of every top-level image field.
pub const IMAGE_FIELDS: &[FieldPolicy] = &[
    FieldPolicy::new(TAG, Analyzer::Keyword, true, true),
    FieldPolicy::new(ID, Analyzer::Identifier, false, false),
    FieldPolicy::new(NAME, Analyzer::Simple, true, true),
    FieldPolicy::new(AUTHOR, Analyzer::Simple, true, true),
    FieldPolicy::new(COMMENT, Analyzer::Language, true, true),
    FieldPolicy::new(CREATED, Analyzer::DateTime, false, false),
    FieldPolicy::new(FULL_NAME, Analyzer::Keyword, true, false),
    FieldPolicy::new(LABELS, Analyzer::Dynamic, true, false),
    FieldPolicy::new(VOLUMES, Analyzer::Dynamic, true, false),
    FieldPolicy::new(ENVS, Analyzer::Dynamic, true, false),
    FieldPolicy::new(EXPOSED_PORTS, Analyzer::Dynamic, true, false),
];

/// Returns the policy of a top-level field.
#[must_use]
pub fn policy(name: &str) -> Option<&'static FieldPolicy> {
    IMAGE_FIELDS.iter().find(|p| p.name == name)
}

/// Fields searched by unqualified query-string terms.
pub fn default_scope() -> impl Iterator<Item = &'static str> {
    IMAGE_FIELDS
        .iter()
        .filter(|p| p.default_scope)
        .map(|p| p.name)
}

/// Name of the field holding the value of label `key`.
#[must_use]
pub fn label_field(key: &str) -> String {
    format!("{LABEL}.{key}")
}

/// Name of the field holding the value of environment variable `key`.
#[must_use]
pub fn env_field(key: &str) -> String {
    format!("{ENV}.{key}")
}

/// A field addressed by a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef<'a> {
    /// One of [`IMAGE_FIELDS`].
    Top(&'static FieldPolicy),
    /// `Label.<key>`.
    Label(&'a str),
    /// `Env.<key>`.
    Env(&'a str),
}

impl<'a> FieldRef<'a> {
    /// Resolves a requested field name. Unknown names yield `None`.
    ///
    /// Images may carry a label or variable with an empty key, so `Label.`
    /// and `Env.` resolve to the empty key.
    #[must_use]
    pub fn resolve(name: &'a str) -> Option<Self> {
        if let Some(policy) = policy(name) {
            return Some(Self::Top(policy));
        }
        match name.split_once('.') {
            Some((LABEL, key)) => Some(Self::Label(key)),
            Some((ENV, key)) => Some(Self::Env(key)),
            _ => None,
        }
    }

    /// Whether a search may return this field.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        match self {
            Self::Top(policy) => policy.stored,
            Self::Label(_) | Self::Env(_) => true,
        }
    }
}
