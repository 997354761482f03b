//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`TypeName`] - Validated class/type identifier
//! - [`Cardinality`] - Scalar count or collection range of a property
//! - [`PrimitiveType`] - Recognized primitive column types
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use schemaref::core::types::{Cardinality, PrimitiveType, TypeName};
//!
//! let name = TypeName::new("Car").unwrap();
//! assert_eq!(name.as_str(), "Car");
//! assert!(TypeName::new("has space").is_err());
//!
//! assert!(Cardinality::range(1, Some(5)).is_collection());
//! assert!(!Cardinality::one().is_collection());
//!
//! assert_eq!(PrimitiveType::from_hint("string(255)"), Some(PrimitiveType::String));
//! assert_eq!(PrimitiveType::from_hint("Interface"), None);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The sentinel namespace. Lookups against it are rewritten to the
/// registry factory's default namespace.
pub const GLOBAL_NAMESPACE: &str = "__global__";

/// Namespace used when neither the caller nor the configuration names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Name given to synthesized types that have no name of their own.
pub const ANONYMOUS_NAME: &str = "anonymous";

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid type name: {0}")]
    InvalidTypeName(String),

    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),
}

/// A validated type (class) name.
///
/// Type names must:
/// - Not be empty
/// - Start with an ASCII letter, `_` or `$`
/// - Contain only ASCII alphanumerics, `_` or `$`
///
/// # Example
///
/// ```
/// use schemaref::core::types::TypeName;
///
/// assert!(TypeName::new("CarOwner").is_ok());
/// assert!(TypeName::new("_internal$1").is_ok());
/// assert!(TypeName::new("").is_err());
/// assert!(TypeName::new("9lives").is_err());
/// assert!(TypeName::new("#/definitions/Car").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName(String);

impl TypeName {
    /// Create a new validated type name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTypeName` if the name is not an identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let mut chars = name.chars();
        let first = chars
            .next()
            .ok_or_else(|| TypeError::InvalidTypeName("type name cannot be empty".into()))?;

        if !(first.is_ascii_alphabetic() || first == '_' || first == '$') {
            return Err(TypeError::InvalidTypeName(format!(
                "type name '{name}' must start with a letter, '_' or '$'"
            )));
        }

        if let Some(c) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '$')) {
            return Err(TypeError::InvalidTypeName(format!(
                "type name '{name}' cannot contain '{c}'"
            )));
        }

        Ok(())
    }

    /// Create a type name taken from a document.
    ///
    /// Titles, definition keys and property names are kept as written, so
    /// only emptiness is rejected.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTypeName` if the name is empty.
    pub fn free(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TypeError::InvalidTypeName("type name cannot be empty".into()));
        }
        Ok(Self(name))
    }

    /// Wrap a constant known to be a valid identifier.
    pub(crate) fn from_static(name: &'static str) -> Self {
        Self(name.to_string())
    }

    /// Get the type name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TypeName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TypeName> for String {
    fn from(name: TypeName) -> Self {
        name.0
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate a namespace string.
///
/// Namespaces are free-form but must be non-empty and free of whitespace.
pub fn validate_namespace(namespace: &str) -> Result<(), TypeError> {
    if namespace.is_empty() {
        return Err(TypeError::InvalidNamespace(
            "namespace cannot be empty".into(),
        ));
    }
    if namespace.chars().any(char::is_whitespace) {
        return Err(TypeError::InvalidNamespace(format!(
            "namespace '{namespace}' cannot contain whitespace"
        )));
    }
    Ok(())
}

/// How many values a property holds.
///
/// `Exact(1)` is a scalar. Any range, and any exact count other than one,
/// makes the property a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cardinality {
    /// Exactly this many values.
    Exact(u32),
    /// Between `min` and `max` values; `max = None` is unbounded.
    Range { min: u32, max: Option<u32> },
}

impl Cardinality {
    /// A single scalar value.
    pub const fn one() -> Self {
        Cardinality::Exact(1)
    }

    /// Any number of values.
    pub const fn unbounded() -> Self {
        Cardinality::Range { min: 0, max: None }
    }

    /// A bounded or half-open range.
    pub const fn range(min: u32, max: Option<u32>) -> Self {
        Cardinality::Range { min, max }
    }

    /// Whether values of this cardinality serialize as arrays.
    pub fn is_collection(&self) -> bool {
        match self {
            Cardinality::Exact(n) => *n != 1,
            Cardinality::Range { .. } => true,
        }
    }

    /// Lower bound, if it constrains anything.
    pub fn min_items(&self) -> Option<u32> {
        match self {
            Cardinality::Exact(n) if *n != 1 => Some(*n),
            Cardinality::Range { min, .. } if *min > 0 => Some(*min),
            _ => None,
        }
    }

    /// Upper bound, if any.
    pub fn max_items(&self) -> Option<u32> {
        match self {
            Cardinality::Exact(n) if *n != 1 => Some(*n),
            Cardinality::Range { max, .. } => *max,
            _ => None,
        }
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality::one()
    }
}

/// Primitive (non-reference) column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Text,
    Time,
    Date,
    DateTime,
    Timestamp,
    Boolean,
    Number,
    Integer,
    Double,
    Byte,
    Json,
    Object,
    Array,
}

/// Recognized type prefixes, longest first where one is a prefix of another.
const PRIMITIVE_PREFIXES: &[(&str, PrimitiveType)] = &[
    ("datetime", PrimitiveType::DateTime),
    ("date-time", PrimitiveType::DateTime),
    ("date", PrimitiveType::Date),
    ("timestamp", PrimitiveType::Timestamp),
    ("time", PrimitiveType::Time),
    ("text", PrimitiveType::Text),
    ("string", PrimitiveType::String),
    ("boolean", PrimitiveType::Boolean),
    ("bool", PrimitiveType::Boolean),
    ("number", PrimitiveType::Number),
    ("integer", PrimitiveType::Integer),
    ("int", PrimitiveType::Integer),
    ("double", PrimitiveType::Double),
    ("float", PrimitiveType::Double),
    ("byte", PrimitiveType::Byte),
    ("json", PrimitiveType::Json),
    ("object", PrimitiveType::Object),
    ("array", PrimitiveType::Array),
];

impl PrimitiveType {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Text => "text",
            PrimitiveType::Time => "time",
            PrimitiveType::Date => "date",
            PrimitiveType::DateTime => "datetime",
            PrimitiveType::Timestamp => "timestamp",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Number => "number",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Double => "double",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Json => "json",
            PrimitiveType::Object => "object",
            PrimitiveType::Array => "array",
        }
    }

    /// Recognize a primitive from a type hint such as `"string"`,
    /// `"string(255)"` or `"datetime"`.
    ///
    /// A prefix only counts when it is followed by the end of the hint or a
    /// non-alphanumeric character, so class names like `Interface` or
    /// `Stringer` are not mistaken for primitives.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let lower = hint.trim().to_ascii_lowercase();
        PRIMITIVE_PREFIXES.iter().find_map(|(prefix, ty)| {
            let rest = lower.strip_prefix(prefix)?;
            match rest.chars().next() {
                None => Some(*ty),
                Some(c) if !c.is_ascii_alphanumeric() && c != '_' => Some(*ty),
                Some(_) => None,
            }
        })
    }

    /// Whether values are represented as dates.
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Date | PrimitiveType::DateTime | PrimitiveType::Timestamp
        )
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
