//! Binding unit API.
//!
//! A [`BindingUnit`] collects the API model of one module, then builds the
//! module's sources in one go.
//!
//! # Example
//!
//! ```ignore
//! use wrapgen::{BindingUnit, GeneratorOptions};
//!
//! let options = GeneratorOptions::from_json(r#"{ "module_name": "sample" }"#)?;
//! let mut unit = BindingUnit::new(options);
//! unit.add_model_json(&std::fs::read_to_string("sample.json")?)?;
//!
//! let output = unit.build()?;
//! for file in &output.files {
//!     std::fs::write(&file.name, &file.contents)?;
//! }
//! ```

use wrapgen_core::{ClassEntry, EnumEntry, FunctionEntry, GenerationError, GeneratorOptions, RegistrationError};
use wrapgen_generator::{GeneratorContext, ModuleBuilder, ModuleOutput};
use wrapgen_registry::ApiRegistry;

use crate::model::ApiModel;

/// The API model of one module and, once built, its generated sources.
#[derive(Debug, Clone)]
pub struct BindingUnit {
    options: GeneratorOptions,
    registry: ApiRegistry,
    output: Option<ModuleOutput>,
}

impl BindingUnit {
    pub fn new(options: GeneratorOptions) -> Self {
        Self {
            options,
            registry: ApiRegistry::new(),
            output: None,
        }
    }

    /// A unit with default options for `module_name`.
    pub fn for_module(module_name: impl Into<String>) -> Self {
        Self::new(GeneratorOptions::for_module(module_name))
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn registry(&self) -> &ApiRegistry {
        &self.registry
    }

    // ========================================================================
    // Model
    // ========================================================================

    pub fn add_class(&mut self, entry: ClassEntry) -> Result<(), BuildError> {
        self.ensure_not_built()?;
        Ok(self.registry.register_class(entry)?)
    }

    pub fn add_function(&mut self, entry: FunctionEntry) -> Result<(), BuildError> {
        self.ensure_not_built()?;
        Ok(self.registry.register_function(entry)?)
    }

    pub fn add_enum(&mut self, entry: EnumEntry) -> Result<(), BuildError> {
        self.ensure_not_built()?;
        Ok(self.registry.register_enum(entry)?)
    }

    pub fn add_model(&mut self, model: ApiModel) -> Result<(), BuildError> {
        self.ensure_not_built()?;
        Ok(model.register_into(&mut self.registry)?)
    }

    /// Add a model serialized as JSON.
    pub fn add_model_json(&mut self, json: &str) -> Result<(), BuildError> {
        let model = ApiModel::from_json(json)?;
        self.add_model(model)
    }

    fn ensure_not_built(&self) -> Result<(), BuildError> {
        if self.output.is_some() {
            return Err(BuildError::AlreadyBuilt);
        }
        Ok(())
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Generate the module.
    ///
    /// Classes that fail are reported in [`ModuleOutput::errors`] and left
    /// out together with the classes depending on them; the build itself
    /// only fails when the module file cannot be produced.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(&mut self) -> Result<&ModuleOutput, BuildError> {
        self.ensure_not_built()?;
        let output = generate_module(&self.registry, &self.options)?;
        Ok(self.output.insert(output))
    }

    pub fn is_built(&self) -> bool {
        self.output.is_some()
    }

    pub fn output(&self) -> Option<&ModuleOutput> {
        self.output.as_ref()
    }

    /// Forget the model and any output, keeping the options.
    pub fn clear(&mut self) {
        self.registry = ApiRegistry::new();
        self.output = None;
    }
}

/// Generate the sources of the module described by `registry`.
#[tracing::instrument(skip_all, fields(module = %options.module_name))]
pub fn generate_module(registry: &ApiRegistry, options: &GeneratorOptions) -> Result<ModuleOutput, BuildError> {
    let ctx = GeneratorContext::new(registry, options)?;
    let mut builder = ModuleBuilder::new(&ctx);
    builder.collect();
    let output = builder.finish()?;
    tracing::info!(
        files = output.files.len(),
        errors = output.errors.len(),
        skipped = output.skipped.len(),
        "module generated"
    );
    Ok(output)
}

/// Errors that can occur while loading a model or building a unit.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("unit has already been built; call clear() to start over")]
    AlreadyBuilt,

    #[error("invalid API model: {0}")]
    InvalidModel(#[from] serde_json::Error),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}
