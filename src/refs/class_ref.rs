//! refs::class_ref
//!
//! Canonical identity of a type within a namespace.
//!
//! # Lifecycle
//!
//! A `ClassRef` is either bound to a [`TypeDef`] or a placeholder created
//! from a bare name. A placeholder is upgraded in place by
//! [`update_class`](ClassRef::update_class) once the concrete type is known;
//! it is never replaced, so every holder observes the upgrade.
//!
//! # Example
//!
//! ```
//! use schemaref::registry::{ClassTarget, RegistryFactory};
//! use schemaref::core::typedef::TypeDef;
//!
//! let factory = RegistryFactory::default();
//! let early = factory.class_ref(ClassTarget::Name("Car"), None).unwrap();
//! assert!(early.is_placeholder());
//!
//! let car = TypeDef::builder("Car").build().unwrap();
//! let bound = factory.class_ref(ClassTarget::Type(&car), None).unwrap();
//! assert!(bound.is_same(&early));
//! assert!(!early.is_placeholder());
//! ```

use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::RefError;
use crate::core::options::Options;
use crate::core::sync::{read, write};
use crate::core::typedef::{TypeDef, TypeHandle};

/// Shared handle to a class reference.
#[derive(Clone)]
pub struct ClassRef {
    inner: Arc<ClassRefInner>,
}

struct ClassRefInner {
    name: String,
    namespace: String,
    anonymous: bool,
    state: RwLock<ClassState>,
}

struct ClassState {
    ty: Option<TypeHandle>,
    extends: Vec<ClassRef>,
    options: Options,
}

impl ClassRef {
    fn from_parts(name: String, namespace: &str, anonymous: bool, ty: Option<TypeHandle>) -> Self {
        Self {
            inner: Arc::new(ClassRefInner {
                name,
                namespace: namespace.to_string(),
                anonymous,
                state: RwLock::new(ClassState {
                    ty,
                    extends: Vec::new(),
                    options: Options::new(),
                }),
            }),
        }
    }

    /// A reference bound to a concrete type.
    pub(crate) fn bound(ty: &TypeHandle, namespace: &str) -> Self {
        Self::from_parts(
            ty.name().to_string(),
            namespace,
            ty.is_anonymous(),
            Some(Arc::clone(ty)),
        )
    }

    /// A reference known only by name.
    pub(crate) fn placeholder(name: &str, namespace: &str) -> Self {
        Self::from_parts(name.to_string(), namespace, false, None)
    }

    /// `<namespace>--<name>`.
    pub fn id(&self) -> String {
        format!("{}--{}", self.inner.namespace, self.inner.name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Whether no concrete type has been bound yet.
    ///
    /// A synthesized stand-in (see [`get_class`](Self::get_class)) still
    /// counts as a placeholder.
    pub fn is_placeholder(&self) -> bool {
        read(&self.inner.state)
            .ty
            .as_ref()
            .map_or(true, |ty| ty.is_stand_in())
    }

    pub fn is_anonymous(&self) -> bool {
        self.inner.anonymous
    }

    /// The bound type, stand-ins included.
    pub fn type_handle(&self) -> Option<TypeHandle> {
        read(&self.inner.state).ty.clone()
    }

    /// Whether this reference is bound to exactly `ty`.
    pub fn has_type(&self, ty: &TypeHandle) -> bool {
        read(&self.inner.state)
            .ty
            .as_ref()
            .is_some_and(|own| own.key() == ty.key())
    }

    /// Bind a concrete type, upgrading a placeholder in place.
    pub fn update_class(&self, ty: &TypeHandle) {
        let mut state = write(&self.inner.state);
        tracing::debug!(class = %self.id(), ty = %ty.key(), "binding class reference");
        state.ty = Some(Arc::clone(ty));
    }

    /// The concrete type.
    ///
    /// With `create`, a placeholder synthesizes and binds a stand-in type of
    /// the same name; the reference stays a placeholder until a real type is
    /// bound.
    ///
    /// # Errors
    ///
    /// - [`RefError::MissingTarget`] if unbound and `create` is false
    /// - [`RefError::Type`] if the name cannot name a type
    pub fn get_class(&self, create: bool) -> Result<TypeHandle, RefError> {
        if let Some(ty) = self.type_handle() {
            return Ok(ty);
        }
        if !create {
            return Err(RefError::MissingTarget {
                name: self.inner.name.clone(),
                namespace: self.inner.namespace.clone(),
            });
        }

        let stand_in = TypeDef::builder(self.inner.name.clone())
            .stand_in()
            .free_name()
            .build()?;
        let mut state = write(&self.inner.state);
        // Another caller may have bound the class meanwhile.
        let ty = state.ty.get_or_insert_with(|| Arc::clone(&stand_in));
        Ok(Arc::clone(ty))
    }

    /// Parent references, primary superclass first.
    pub fn extends(&self) -> Vec<ClassRef> {
        read(&self.inner.state).extends.clone()
    }

    /// The primary superclass.
    pub fn get_extend(&self) -> Option<ClassRef> {
        read(&self.inner.state).extends.first().cloned()
    }

    /// Append a parent, keeping order and ignoring repeats of the same reference.
    pub fn add_extend(&self, parent: &ClassRef) {
        if parent.is_same(self) {
            return;
        }
        let mut state = write(&self.inner.state);
        if !state.extends.iter().any(|e| e.is_same(parent)) {
            state.extends.push(parent.clone());
        }
    }

    pub fn options(&self) -> Options {
        read(&self.inner.state).options.clone()
    }

    pub fn set_option(&self, key: impl Into<String>, value: impl Into<Value>) {
        write(&self.inner.state).options.insert(key, value);
    }

    pub fn merge_options(&self, options: &Options) {
        write(&self.inner.state).options.deep_merge(options);
    }

    /// Reference identity.
    pub fn is_same(&self, other: &ClassRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Eq for ClassRef {}

impl std::fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRef")
            .field("id", &self.id())
            .field("placeholder", &self.is_placeholder())
            .finish()
    }
}

impl std::fmt::Display for ClassRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod identity {
        use super::*;

        #[test]
        fn clones_are_same() {
            let car = TypeDef::builder("Car").build().unwrap();
            let a = ClassRef::bound(&car, "default");
            let b = a.clone();
            assert!(a.is_same(&b));
            assert_eq!(a, b);
        }

        #[test]
        fn separate_refs_differ() {
            let car = TypeDef::builder("Car").build().unwrap();
            let a = ClassRef::bound(&car, "default");
            let b = ClassRef::bound(&car, "default");
            assert!(!a.is_same(&b));
            assert_eq!(a.id(), b.id());
        }

        #[test]
        fn id_format() {
            let r = ClassRef::placeholder("Car", "fleet");
            assert_eq!(r.id(), "fleet--Car");
        }
    }

    mod placeholder {
        use super::*;

        #[test]
        fn upgrade_is_visible_to_holders() {
            let r = ClassRef::placeholder("Car", "default");
            let holder = r.clone();
            assert!(holder.is_placeholder());

            let car = TypeDef::builder("Car").build().unwrap();
            r.update_class(&car);

            assert!(!holder.is_placeholder());
            assert!(holder.has_type(&car));
        }

        #[test]
        fn get_class_without_create_fails() {
            let r = ClassRef::placeholder("Car", "default");
            let err = r.get_class(false).unwrap_err();
            assert!(matches!(err, RefError::MissingTarget { .. }));
        }

        #[test]
        fn get_class_with_create_binds_stand_in() {
            let r = ClassRef::placeholder("Car", "default");
            let ty = r.get_class(true).unwrap();
            assert!(ty.is_stand_in());
            assert_eq!(ty.name(), "Car");
            assert!(r.is_placeholder());

            let again = r.get_class(false).unwrap();
            assert_eq!(again.key(), ty.key());
        }

        #[test]
        fn real_type_replaces_stand_in() {
            let r = ClassRef::placeholder("Car", "default");
            r.get_class(true).unwrap();
            let car = TypeDef::builder("Car").build().unwrap();
            r.update_class(&car);
            assert!(!r.is_placeholder());
        }
    }

    mod extends {
        use super::*;

        #[test]
        fn keeps_order_and_dedupes() {
            let child = ClassRef::placeholder("Car", "default");
            let a = ClassRef::placeholder("Vehicle", "default");
            let b = ClassRef::placeholder("Asset", "default");

            child.add_extend(&a);
            child.add_extend(&b);
            child.add_extend(&a);

            let names: Vec<String> = child.extends().iter().map(|e| e.name().to_string()).collect();
            assert_eq!(names, ["Vehicle", "Asset"]);
            assert!(child.get_extend().unwrap().is_same(&a));
        }

        #[test]
        fn ignores_self() {
            let r = ClassRef::placeholder("Car", "default");
            r.add_extend(&r.clone());
            assert!(r.extends().is_empty());
        }
    }
}
