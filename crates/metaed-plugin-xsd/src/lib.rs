//! `edfiXsd`: schema type names and merged interchanges.
//!
//! Other plugins read the merged interchange repository of a namespace through
//! [`merged_interchange_repository`]; the interchange ordering in `edfiOdsApi` is computed
//! over it.

use metaed_core::{Enhancer, Generator, MetaEdPlugin};

pub mod enhancer;
pub mod generator;
pub mod model;

pub use model::{
    entity_xsd, merged_interchange_repository, EntityXsd, MergedInterchange,
    MergedInterchangeRepository,
};

pub const PLUGIN_NAME: &str = "edfiXsd";

pub fn initialize() -> MetaEdPlugin {
    let mut plugin = MetaEdPlugin::new(PLUGIN_NAME, "3.0.0");
    plugin
        .depends_on_plugins
        .push(metaed_plugin_unified::PLUGIN_NAME.to_string());
    plugin.enhancers = vec![
        Enhancer::new("XsdSetupEnhancer", enhancer::setup_enhancer),
        Enhancer::new("ComplexTypeEnhancer", enhancer::complex_type_enhancer),
        Enhancer::new("MergedInterchangeEnhancer", enhancer::merged_interchange_enhancer),
        Enhancer::new(
            "MergedInterchangeExtensionEnhancer",
            enhancer::merged_interchange_extension_enhancer,
        ),
    ];
    plugin.generators = vec![Generator::new("InterchangeGenerator", generator::generate)];
    plugin
}
