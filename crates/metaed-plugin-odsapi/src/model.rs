use std::collections::BTreeMap;

use metaed_core::plugin::DataSlotError;
use metaed_core::MetaEdEnvironment;

use crate::PLUGIN_NAME;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiOrderedElement {
    pub name: String,
    pub global_dependency_order: usize,
}

impl ApiOrderedElement {
    pub fn new(name: &str, global_dependency_order: usize) -> Self {
        Self {
            name: name.to_string(),
            global_dependency_order,
        }
    }
}

/// Load order of one merged interchange within its namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterchangeOrder {
    /// Multiple of ten; interchanges with no dependencies load at 10.
    pub api_order: usize,
    pub api_ordered_elements: Vec<ApiOrderedElement>,
}

/// Per-namespace record keyed by merged interchange repository id.
#[derive(Debug, Clone, Default)]
pub struct InterchangeOrderRepository {
    pub interchange: BTreeMap<String, InterchangeOrder>,
}

pub fn interchange_order_repository<'a>(
    metaed: &'a MetaEdEnvironment,
    namespace: &str,
) -> Result<&'a InterchangeOrderRepository, DataSlotError> {
    metaed
        .plugin_environment(PLUGIN_NAME)?
        .namespace_data::<InterchangeOrderRepository>(namespace)
}
