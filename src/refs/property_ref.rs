//! refs::property_ref
//!
//! One named, typed property slot on a class.
//!
//! # Resolution
//!
//! A property keeps the [`TypeHint`] it was declared with and a write-once
//! [`PropertyTarget`]. The owning registry resolves the hint right after
//! creating the property (and again in a link pass for anything left over).
//! Once set, the target never changes.
//!
//! | Hint | Target |
//! |------|--------|
//! | `Primitive(p)` | `Primitive(p)` |
//! | `Class(c)` | `Class(c)` |
//! | `Type(t)` | `Class` of `t` in the owner's namespace |
//! | `Name(n)` | `Primitive` if `n` is a primitive hint, else `Class` by name, else `Unknown` |
//! | `Unknown` | `Unknown` |

use std::sync::{Arc, OnceLock, RwLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Number, Value};

use super::{ClassRef, RefError};
use crate::core::metadata::schema::PropertyDecl;
use crate::core::options::Options;
use crate::core::sync::{read, write};
use crate::core::typedef::TypeHandle;
use crate::core::types::{Cardinality, PrimitiveType};

/// The declared type of a property, before resolution.
#[derive(Debug, Clone)]
pub enum TypeHint {
    Primitive(PrimitiveType),
    /// An existing class reference, possibly in another namespace.
    Class(ClassRef),
    /// A declared type, resolved in the owner's namespace.
    Type(TypeHandle),
    /// A type name: primitive hint or class name.
    Name(String),
    Unknown,
}

/// The resolved type of a property.
#[derive(Debug, Clone)]
pub enum PropertyTarget {
    Primitive(PrimitiveType),
    Class(ClassRef),
    /// Nothing is known, or resolution failed.
    Unknown,
}

/// Result of [`PropertyRef::convert`].
#[derive(Debug, Clone, PartialEq)]
pub enum Converted {
    Null,
    Date(DateTime<Utc>),
    Value(Value),
}

impl Converted {
    /// JSON form; dates become RFC 3339 strings.
    pub fn into_value(self) -> Value {
        match self {
            Converted::Null => Value::Null,
            Converted::Date(d) => Value::String(d.to_rfc3339()),
            Converted::Value(v) => v,
        }
    }
}

/// Shared handle to a property reference.
#[derive(Clone)]
pub struct PropertyRef {
    inner: Arc<PropertyInner>,
}

struct PropertyInner {
    name: String,
    owner: ClassRef,
    cardinality: Cardinality,
    hint: TypeHint,
    pattern: bool,
    appended: bool,
    inferred: bool,
    options: RwLock<Options>,
    target: OnceLock<PropertyTarget>,
}

impl PropertyRef {
    pub(crate) fn new(owner: &ClassRef, decl: PropertyDecl, options: Options, inferred: bool) -> Self {
        Self {
            inner: Arc::new(PropertyInner {
                name: decl.name,
                owner: owner.clone(),
                cardinality: decl.cardinality,
                hint: decl.hint,
                pattern: decl.pattern,
                appended: decl.appended,
                inferred,
                options: RwLock::new(options),
                target: OnceLock::new(),
            }),
        }
    }

    /// `<owner id>--<name>`.
    pub fn id(&self) -> String {
        format!("{}--{}", self.inner.owner.id(), self.inner.name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn owner(&self) -> &ClassRef {
        &self.inner.owner
    }

    pub fn cardinality(&self) -> Cardinality {
        self.inner.cardinality
    }

    pub fn is_collection(&self) -> bool {
        self.inner.cardinality.is_collection()
    }

    pub fn hint(&self) -> &TypeHint {
        &self.inner.hint
    }

    /// Whether the name is a regular expression over keys.
    pub fn is_pattern(&self) -> bool {
        self.inner.pattern
    }

    pub fn is_appended(&self) -> bool {
        self.inner.appended
    }

    /// Derived from a structural field hint rather than a decorated record.
    pub fn is_inferred(&self) -> bool {
        self.inner.inferred
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.target.get().is_some()
    }

    /// Freeze the target. Returns `false` if it was already set.
    pub(crate) fn resolve(&self, target: PropertyTarget) -> bool {
        self.inner.target.set(target).is_ok()
    }

    /// The resolved target, or what the hint alone says before resolution.
    pub fn target(&self) -> PropertyTarget {
        if let Some(target) = self.inner.target.get() {
            return target.clone();
        }
        match &self.inner.hint {
            TypeHint::Primitive(p) => PropertyTarget::Primitive(*p),
            TypeHint::Class(c) => PropertyTarget::Class(c.clone()),
            _ => PropertyTarget::Unknown,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.target(), PropertyTarget::Class(_))
    }

    pub fn target_ref(&self) -> Option<ClassRef> {
        match self.target() {
            PropertyTarget::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self.target() {
            PropertyTarget::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// Name of the resolved type.
    pub fn type_name(&self) -> String {
        match self.target() {
            PropertyTarget::Primitive(p) => p.as_str().to_string(),
            PropertyTarget::Class(c) => c.name().to_string(),
            PropertyTarget::Unknown => match &self.inner.hint {
                TypeHint::Name(n) => n.clone(),
                _ => "unknown".to_string(),
            },
        }
    }

    pub fn options(&self) -> Options {
        read(&self.inner.options).clone()
    }

    pub fn get_option(&self, key: &str) -> Option<Value> {
        read(&self.inner.options).get(key).cloned()
    }

    pub fn merge_options(&self, options: &Options) {
        write(&self.inner.options).deep_merge(options);
    }

    /// Read this property off a JSON instance, `null` when absent.
    pub fn get(&self, instance: &Value) -> Value {
        instance.get(&self.inner.name).cloned().unwrap_or(Value::Null)
    }

    /// Coerce a raw value to this property's type.
    ///
    /// # Errors
    ///
    /// [`RefError::NotYetImplemented`] when no rule covers the value and
    /// column type. Nothing is silently dropped.
    pub fn convert(&self, raw: &Value) -> Result<Converted, RefError> {
        if raw.is_null() {
            return Ok(Converted::Null);
        }
        let column = match self.target() {
            PropertyTarget::Primitive(p) => p,
            PropertyTarget::Unknown => PrimitiveType::String,
            PropertyTarget::Class(c) => {
                return match raw {
                    Value::Object(_) | Value::Array(_) => Ok(Converted::Value(raw.clone())),
                    _ => Err(not_implemented(raw, c.name())),
                };
            }
        };
        convert_primitive(raw, column)
    }

    pub fn is_same(&self, other: &PropertyRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for PropertyRef {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Eq for PropertyRef {}

impl std::fmt::Debug for PropertyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyRef")
            .field("id", &self.id())
            .field("type", &self.type_name())
            .field("cardinality", &self.inner.cardinality)
            .finish()
    }
}

fn convert_primitive(raw: &Value, column: PrimitiveType) -> Result<Converted, RefError> {
    match column {
        PrimitiveType::Date | PrimitiveType::DateTime | PrimitiveType::Timestamp => to_date(raw)
            .map(Converted::Date)
            .ok_or_else(|| not_implemented(raw, column.as_str())),
        PrimitiveType::Time | PrimitiveType::Text | PrimitiveType::String => Ok(Converted::Value(match raw {
            Value::String(_) => raw.clone(),
            Value::Array(items) if items.len() == 1 => items[0].clone(),
            other => Value::String(other.to_string()),
        })),
        PrimitiveType::Boolean => match raw {
            Value::Bool(_) => Ok(Converted::Value(raw.clone())),
            Value::Number(n) => Ok(Converted::Value(Value::Bool(
                n.as_f64().is_some_and(|f| f > 0.0),
            ))),
            Value::String(s) => {
                let s = s.trim();
                Ok(Converted::Value(Value::Bool(
                    s.eq_ignore_ascii_case("true") || s == "1",
                )))
            }
            _ => Err(not_implemented(raw, column.as_str())),
        },
        PrimitiveType::Double | PrimitiveType::Number | PrimitiveType::Integer => match raw {
            Value::Number(_) => Ok(Converted::Value(raw.clone())),
            Value::Bool(b) => Ok(Converted::Value(Value::from(u8::from(*b)))),
            Value::String(s) => {
                parse_number(s.trim()).ok_or_else(|| not_implemented(raw, column.as_str()))
            }
            _ => Err(not_implemented(raw, column.as_str())),
        },
        PrimitiveType::Byte
        | PrimitiveType::Json
        | PrimitiveType::Object
        | PrimitiveType::Array => Ok(Converted::Value(raw.clone())),
    }
}

fn parse_number(s: &str) -> Option<Converted> {
    if s.contains(['.', ',']) {
        let f: f64 = s.replace(',', ".").parse().ok()?;
        return Number::from_f64(f).map(|n| Converted::Value(Value::Number(n)));
    }
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<i64>()
        .ok()
        .map(|i| Converted::Value(Value::from(i)))
}

fn to_date(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(d) = DateTime::parse_from_rfc3339(s) {
                return Some(d.with_timezone(&Utc));
            }
            for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(Utc.from_utc_datetime(&naive));
                }
            }
            let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
            Some(Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0)?))
        }
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
        _ => None,
    }
}

fn not_implemented(raw: &Value, column: &str) -> RefError {
    RefError::NotYetImplemented {
        value: raw.to_string(),
        kind: json_kind(raw),
        column: column.to_string(),
    }
}

/// Name of a JSON value's kind.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
