//! `edfiOdsApi`: interchange load ordering for the ODS/API.

use metaed_core::{Enhancer, Generator, MetaEdPlugin};

pub mod enhancer;
pub mod generator;
pub mod model;

pub use model::{
    interchange_order_repository, ApiOrderedElement, InterchangeOrder, InterchangeOrderRepository,
};

pub const PLUGIN_NAME: &str = "edfiOdsApi";

pub fn initialize() -> MetaEdPlugin {
    let mut plugin = MetaEdPlugin::new(PLUGIN_NAME, "3.0.0");
    plugin
        .depends_on_plugins
        .push(metaed_plugin_xsd::PLUGIN_NAME.to_string());
    plugin.enhancers = vec![
        Enhancer::new("OdsApiSetupEnhancer", enhancer::setup_enhancer),
        Enhancer::new(
            "InterchangeOrderMetadataEnhancer",
            enhancer::interchange_order_enhancer,
        ),
    ];
    plugin.generators = vec![Generator::new(
        "InterchangeOrderMetadataGenerator",
        generator::generate,
    )];
    plugin
}
