//! `edfiUnified`: links names to entities and enforces the core semantic rules every other
//! plugin relies on.
//!
//! After this plugin's enhancers run, `base_entity`, property `referenced_entity` and
//! interchange member `referenced_entity` ids are set wherever the name resolves.

use metaed_core::{Enhancer, MetaEdPlugin, Validator};

pub mod enhancer;
pub mod lookup;
pub mod validator;

pub const PLUGIN_NAME: &str = "edfiUnified";

pub fn initialize() -> MetaEdPlugin {
    let mut plugin = MetaEdPlugin::new(PLUGIN_NAME, "3.0.0");
    plugin.validators = vec![
        Validator::new("BaseEntityMustExist", validator::base_entity_must_exist),
        Validator::new(
            "ExtensionMustNotShareNamespaceWithBase",
            validator::extension_must_not_share_namespace_with_base,
        ),
        Validator::new("ReferencedEntityMustExist", validator::referenced_entity_must_exist),
        Validator::new("InterchangeItemMustExist", validator::interchange_item_must_exist),
        Validator::new("TopLevelNameMustBeUnique", validator::top_level_name_must_be_unique),
        Validator::new(
            "NamespaceNameMustBeUniqueIgnoringCase",
            validator::namespace_name_must_be_unique_ignoring_case,
        ),
        Validator::new(
            "DomainEntityMustHaveIdentity",
            validator::domain_entity_must_have_identity,
        ),
    ];
    plugin.enhancers = vec![
        Enhancer::new("BaseEntityEnhancer", enhancer::base_entity_enhancer),
        Enhancer::new("ReferencedEntityEnhancer", enhancer::referenced_entity_enhancer),
        Enhancer::new("InterchangeItemEnhancer", enhancer::interchange_item_enhancer),
    ];
    plugin
}
