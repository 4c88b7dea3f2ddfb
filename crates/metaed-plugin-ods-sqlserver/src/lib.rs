//! `edfiOdsSqlServer`: SQL Server DDL for the ODS table model built by `edfiOdsRelational`.

use metaed_core::{Enhancer, Generator, MetaEdPlugin};

pub mod enhancer;
pub mod generator;
pub mod model;

pub use model::{
    sql_data_type, sql_table_repository, SqlColumn, SqlForeignKey, SqlTable, SqlTableRepository,
};

pub const PLUGIN_NAME: &str = "edfiOdsSqlServer";

pub fn initialize() -> MetaEdPlugin {
    let mut plugin = MetaEdPlugin::new(PLUGIN_NAME, "3.0.0");
    plugin
        .depends_on_plugins
        .push(metaed_plugin_ods_relational::PLUGIN_NAME.to_string());
    plugin.enhancers = vec![Enhancer::new(
        "ColumnDataTypeEnhancer",
        enhancer::column_data_type_enhancer,
    )];
    plugin.generators = vec![Generator::new("OdsTableGenerator", generator::generate)];
    plugin
}
