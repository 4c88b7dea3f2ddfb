//! `edfiOdsRelational`: the database-neutral ODS table model.
//!
//! Each namespace holds a [`TableRepository`]; database plugins read it through
//! [`table_repository`] and map [`ColumnType`] onto their own SQL types.

use metaed_core::{Enhancer, MetaEdPlugin};

pub mod diminisher;
pub mod enhancer;
pub mod model;
pub mod table;

pub use model::{
    schema_for, table_repository, Column, ColumnPair, ColumnType, ForeignKey, Table, TableKind,
    TableRepository,
};

pub const PLUGIN_NAME: &str = "edfiOdsRelational";

pub fn initialize() -> MetaEdPlugin {
    let mut plugin = MetaEdPlugin::new(PLUGIN_NAME, "3.0.0");
    plugin
        .depends_on_plugins
        .push(metaed_plugin_unified::PLUGIN_NAME.to_string());
    plugin.enhancers = vec![
        Enhancer::new("OdsRelationalSetupEnhancer", enhancer::setup_enhancer),
        Enhancer::new("TableEnhancer", enhancer::table_enhancer),
        Enhancer::diminisher(
            "RemoveGradingPeriodRoleNameFromSchoolId",
            diminisher::remove_grading_period_role_name_from_school_id,
        ),
    ];
    plugin
}
