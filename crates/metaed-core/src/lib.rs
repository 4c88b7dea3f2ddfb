//! MetaEd core
//!
//! The model, grammar, plugin framework and compilation pipeline shared by every MetaEd
//! plugin crate:
//!
//! - `grammar` parses `.metaed` source text into a [`ParseTree`]; `builder` walks it into the
//!   entity arena and namespace repository held by [`MetaEdEnvironment`].
//! - `plugin` defines [`MetaEdPlugin`] (ordered validators, enhancers and generators) and the
//!   per-plugin data slots enhancers attach derived state to.
//! - `graph` resolves dependency graphs with deterministic cycle handling; it orders plugins,
//!   checks namespace dependencies and drives interchange ordering.
//! - `pipeline` runs every stage over a [`State`].

pub mod builder;
pub mod config;
pub mod environment;
pub mod file;
pub mod grammar;
pub mod graph;
pub mod model;
pub mod pipeline;
pub mod plugin;
pub mod state;
pub mod version;

pub use config::{MetaEdConfiguration, MetaEdProject};
pub use environment::{MetaEdEnvironment, RepositoryError};
pub use grammar::{parse_metaed, MetaEdTextBuilder, ParseTree};
pub use graph::{sort_graph, DependencyGraph, GraphError, Resolution};
pub use model::{Entity, EntityId, EntityProperty, ModelType, Namespace, PropertyType};
pub use pipeline::{execute_pipeline, PipelineError};
pub use plugin::{
    Enhancer, Generator, MetaEdPlugin, PluginCatalog, PluginEnvironment, PluginManifest,
    Validator,
};
pub use state::{
    EnhancerResult, GeneratedOutput, GeneratorResult, PipelineFailure, PipelineOptions, State,
    ValidationFailure,
};
