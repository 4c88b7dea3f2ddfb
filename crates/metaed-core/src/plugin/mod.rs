//! Plugin framework: manifests, catalogs and the enhancer/validator/generator contracts.
//!
//! A plugin is plain data: ordered lists of named function pointers. Nothing is discovered
//! at runtime; a binary registers the plugins it links into a [`PluginCatalog`], and the
//! pipeline selects from it using [`PluginManifest`]s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::environment::MetaEdEnvironment;
use crate::state::{EnhancerResult, GeneratorResult, ValidationFailure};

pub mod diminisher;
pub mod environment;

pub use diminisher::{run_diminisher, Patch};
pub use environment::{DataSlot, DataSlotError, PluginEnvironment};

pub type EnhancerFn = fn(&mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult>;
pub type ValidatorFn = fn(&MetaEdEnvironment) -> Vec<ValidationFailure>;
pub type GeneratorFn = fn(&MetaEdEnvironment) -> anyhow::Result<GeneratorResult>;

#[derive(Clone, Copy)]
pub struct Enhancer {
    pub name: &'static str,
    pub enhance: EnhancerFn,
    /// A blocking enhancer that reports `success: false` stops its plugin. Errors and panics
    /// stop the plugin either way.
    pub blocking: bool,
}

impl Enhancer {
    pub const fn new(name: &'static str, enhance: EnhancerFn) -> Self {
        Self {
            name,
            enhance,
            blocking: true,
        }
    }

    /// A version-gated patch. A reported failure (missing patch target) is recorded and the
    /// plugin carries on.
    pub const fn diminisher(name: &'static str, enhance: EnhancerFn) -> Self {
        Self {
            name,
            enhance,
            blocking: false,
        }
    }
}

#[derive(Clone, Copy)]
pub struct Validator {
    pub name: &'static str,
    pub validate: ValidatorFn,
}

impl Validator {
    pub const fn new(name: &'static str, validate: ValidatorFn) -> Self {
        Self { name, validate }
    }
}

#[derive(Clone, Copy)]
pub struct Generator {
    pub name: &'static str,
    pub generate: GeneratorFn,
}

impl Generator {
    pub const fn new(name: &'static str, generate: GeneratorFn) -> Self {
        Self { name, generate }
    }
}

macro_rules! debug_by_name {
    ($($ty:ty),*) => {
        $(impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name)
            }
        })*
    };
}

debug_by_name!(Enhancer, Validator, Generator);

/// A plugin's registrations, in execution order.
#[derive(Debug, Clone)]
pub struct MetaEdPlugin {
    pub short_name: String,
    pub default_target_technology_version: String,
    pub depends_on_plugins: Vec<String>,
    pub validators: Vec<Validator>,
    pub enhancers: Vec<Enhancer>,
    pub generators: Vec<Generator>,
}

impl MetaEdPlugin {
    pub fn new(short_name: &str, default_target_technology_version: &str) -> Self {
        Self {
            short_name: short_name.to_string(),
            default_target_technology_version: default_target_technology_version.to_string(),
            depends_on_plugins: Vec::new(),
            validators: Vec::new(),
            enhancers: Vec::new(),
            generators: Vec::new(),
        }
    }
}

/// Plugins available to a run, keyed by short name.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    plugins: BTreeMap<String, MetaEdPlugin>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: MetaEdPlugin) -> &mut Self {
        self.plugins.insert(plugin.short_name.clone(), plugin);
        self
    }

    pub fn get(&self, short_name: &str) -> Option<&MetaEdPlugin> {
        self.plugins.get(short_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetaEdPlugin> {
        self.plugins.values()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Selects a catalog plugin for a run; read from configuration or `*.json` manifest files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub short_name: String,
    #[serde(default)]
    pub target_technology_version: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl PluginManifest {
    pub fn new(short_name: &str) -> Self {
        Self {
            short_name: short_name.to_string(),
            target_technology_version: None,
            enabled: true,
        }
    }
}
