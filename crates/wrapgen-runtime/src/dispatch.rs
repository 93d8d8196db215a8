//! Override lookup and virtual call dispatch.
//!
//! A trampoline asks the registry whether the dynamic object behind `this`
//! overrides the method by name. Lookup never fails with an error: a missing
//! override is a typed [`OverrideNotFound`] telling the trampoline why it
//! should fall back to the native implementation.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use wrapgen_core::{OwnershipState, TypeCheck};

use crate::error::{RuntimeError, RuntimeResult};
use crate::manager::BindingManager;
use crate::value::DynValue;

/// A method defined on the dynamic side.
pub type DynMethod = Arc<dyn Fn(&BindingManager, &[DynValue]) -> RuntimeResult<DynValue> + Send + Sync>;

/// A class defined on the dynamic side, deriving from a wrapped class.
#[derive(Clone, Default)]
pub struct DynamicClass {
    pub name: String,
    /// The wrapped class, or another dynamic class, it derives from.
    pub base: String,
    methods: FxHashMap<String, DynMethod>,
}

impl DynamicClass {
    pub fn new(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            methods: FxHashMap::default(),
        }
    }

    pub fn with_method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&BindingManager, &[DynValue]) -> RuntimeResult<DynValue> + Send + Sync + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    pub fn method(&self, name: &str) -> Option<&DynMethod> {
        self.methods.get(name)
    }
}

impl fmt::Debug for DynamicClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("DynamicClass")
            .field("name", &self.name)
            .field("base", &self.base)
            .field("methods", &methods)
            .finish()
    }
}

/// Why no override was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OverrideNotFound {
    #[error("native object has no wrapper")]
    NoWrapper,
    #[error("wrapper was invalidated")]
    InvalidWrapper,
    #[error("object is an instance of the wrapped class itself")]
    NativeInstance,
    #[error("method is not overridden")]
    NotOverridden,
}

/// What a trampoline knows about the virtual method it bridges.
#[derive(Debug, Clone)]
pub struct VirtualMethod<'a> {
    pub class: &'a str,
    pub name: &'a str,
    pub is_abstract: bool,
    /// Check applied to an override's result; `None` for `void`.
    pub returns: Option<TypeCheck>,
    /// Expected type, as shown in the invalid-return message.
    pub return_type: &'a str,
}

impl<'a> VirtualMethod<'a> {
    pub fn new(class: &'a str, name: &'a str) -> Self {
        Self {
            class,
            name,
            is_abstract: false,
            returns: None,
            return_type: "void",
        }
    }

    pub fn as_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn returning(mut self, check: TypeCheck, type_name: &'a str) -> Self {
        self.returns = Some(check);
        self.return_type = type_name;
        self
    }

    fn display_name(&self) -> String {
        format!("{}.{}", self.class, self.name)
    }
}

impl BindingManager {
    /// Make a dynamic class known to override lookup.
    pub fn register_dynamic_class(&self, class: DynamicClass) {
        tracing::debug!(class = %class.name, base = %class.base, "registered dynamic class");
        self.with_state(|state| {
            state.dynamic_classes.insert(class.name.clone(), class);
        });
    }

    /// The dynamic override of `method` for the object at `address`.
    ///
    /// Walks the dynamic class chain from the instance's class towards the
    /// wrapped base; the first definition wins.
    pub fn find_override(&self, address: usize, method: &str) -> Result<DynMethod, OverrideNotFound> {
        self.with_state(|state| {
            let id = state.addresses.get(&address).copied().ok_or(OverrideNotFound::NoWrapper)?;
            let object = state.wrappers.get(id).ok_or(OverrideNotFound::NoWrapper)?;
            if !object.valid {
                return Err(OverrideNotFound::InvalidWrapper);
            }
            let mut class = object.dynamic_class.as_deref().ok_or(OverrideNotFound::NativeInstance)?;
            let mut steps = 0;
            while let Some(dynamic) = state.dynamic_classes.get(class) {
                if let Some(found) = dynamic.method(method) {
                    return Ok(Arc::clone(found));
                }
                class = &dynamic.base;
                steps += 1;
                if steps > state.dynamic_classes.len() {
                    break;
                }
            }
            Err(OverrideNotFound::NotOverridden)
        })
    }

    /// Dispatch a virtual call made by native code on the object at `address`.
    ///
    /// With an override, it is called under the global lock and its result
    /// is checked and converted. Without one, pure virtual methods raise
    /// `NotImplemented` and others run `native`. On error the trampoline
    /// returns its minimal value.
    pub fn call_virtual<R>(
        &self,
        address: usize,
        method: &VirtualMethod<'_>,
        args: &[DynValue],
        native: impl FnOnce() -> R,
        convert: impl FnOnce(&DynValue) -> RuntimeResult<R>,
    ) -> RuntimeResult<R> {
        let _gil = self.gil();
        let found = match self.find_override(address, method.name) {
            Ok(found) => found,
            Err(reason) => {
                tracing::debug!(method = %method.display_name(), %reason, "no override");
                if method.is_abstract {
                    return Err(RuntimeError::NotImplemented {
                        class: method.class.to_string(),
                        method: method.name.to_string(),
                    });
                }
                return Ok(native());
            }
        };

        let result = found(self, args)?;
        if let Some(check) = &method.returns {
            let types = self.types();
            if !types.accepts(&result, check) {
                return Err(RuntimeError::InvalidReturnValue {
                    function: method.display_name(),
                    expected: method.return_type.to_string(),
                    actual: result.type_name().to_string(),
                });
            }
            if matches!(check, TypeCheck::Wrapper { .. })
                && let Some(id) = result.wrapper_id()
                && self.ref_count(id) <= 1
                && self.ownership(id) == Some(OwnershipState::DynamicOwned)
            {
                return Err(RuntimeError::LastReference {
                    function: method.display_name(),
                });
            }
        }
        convert(&result)
    }
}
