//! Chainable writer for MetaEd source, used to set up models in tests.
//!
//! ```
//! use metaed_core::grammar::MetaEdTextBuilder;
//!
//! let text = MetaEdTextBuilder::new()
//!     .with_begin_namespace("EdFi", None)
//!     .with_start_domain_entity("School")
//!     .with_documentation("doc")
//!     .with_integer_identity("SchoolId", "doc")
//!     .with_end_domain_entity()
//!     .with_end_namespace()
//!     .to_text();
//! assert!(text.contains("  Domain Entity School"));
//! ```

use crate::config::MetaEdConfiguration;
use crate::environment::MetaEdEnvironment;
use crate::grammar::{parse_metaed, ParseTree};
use crate::state::ValidationFailure;

#[derive(Debug, Clone, Default)]
pub struct MetaEdTextBuilder {
    lines: Vec<String>,
    indentation: usize,
}

impl MetaEdTextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_line(mut self, line: &str) -> Self {
        let indented = format!("{}{}", "  ".repeat(self.indentation), line);
        self.lines.push(indented);
        self
    }

    fn indent(mut self) -> Self {
        self.indentation += 1;
        self
    }

    fn outdent(mut self) -> Self {
        self.indentation = self.indentation.saturating_sub(1);
        self
    }

    pub fn with_blank_line(mut self) -> Self {
        self.lines.push(String::new());
        self
    }

    pub fn with_comment(self, comment: &str) -> Self {
        self.add_line(&format!("//{comment}"))
    }

    /// Appends a line verbatim at the current indentation.
    pub fn with_line(self, line: &str) -> Self {
        self.add_line(line)
    }

    // ========================================================================
    // Namespaces and top-level entities
    // ========================================================================

    pub fn with_begin_namespace(self, name: &str, project_extension: Option<&str>) -> Self {
        self.add_line(&format!(
            "Begin Namespace {name} {}",
            project_extension.unwrap_or("core")
        ))
        .indent()
    }

    pub fn with_end_namespace(self) -> Self {
        self.outdent().add_line("End Namespace")
    }

    fn with_start_top_level(self, keyword: &str, name: &str) -> Self {
        self.add_line(&format!("{keyword} {name}")).indent()
    }

    fn with_start_subclass(self, keyword: &str, name: &str, base: &str) -> Self {
        self.add_line(&format!("{keyword} {name} based on {base}"))
            .indent()
    }

    fn with_start_extension(self, keyword: &str, name: &str) -> Self {
        self.add_line(&format!("{keyword} {name} additions")).indent()
    }

    pub fn with_end_top_level(self) -> Self {
        self.outdent()
    }

    pub fn with_start_domain_entity(self, name: &str) -> Self {
        self.with_start_top_level("Domain Entity", name)
    }

    pub fn with_end_domain_entity(self) -> Self {
        self.with_end_top_level()
    }

    pub fn with_start_abstract_entity(self, name: &str) -> Self {
        self.with_start_top_level("Abstract Entity", name)
    }

    pub fn with_start_domain_entity_subclass(self, name: &str, base: &str) -> Self {
        self.with_start_subclass("Domain Entity", name, base)
    }

    pub fn with_start_domain_entity_extension(self, name: &str) -> Self {
        self.with_start_extension("Domain Entity", name)
    }

    pub fn with_start_association(self, name: &str) -> Self {
        self.with_start_top_level("Association", name)
    }

    pub fn with_end_association(self) -> Self {
        self.with_end_top_level()
    }

    pub fn with_start_association_subclass(self, name: &str, base: &str) -> Self {
        self.with_start_subclass("Association", name, base)
    }

    pub fn with_start_association_extension(self, name: &str) -> Self {
        self.with_start_extension("Association", name)
    }

    pub fn with_start_common(self, name: &str) -> Self {
        self.with_start_top_level("Common", name)
    }

    pub fn with_start_common_extension(self, name: &str) -> Self {
        self.with_start_extension("Common", name)
    }

    pub fn with_start_descriptor(self, name: &str) -> Self {
        self.with_start_top_level("Descriptor", name)
    }

    pub fn with_start_enumeration(self, name: &str) -> Self {
        self.with_start_top_level("Enumeration", name)
    }

    pub fn with_start_interchange(self, name: &str) -> Self {
        self.with_start_top_level("Interchange", name)
    }

    pub fn with_start_interchange_extension(self, name: &str) -> Self {
        self.with_start_extension("Interchange", name)
    }

    // ========================================================================
    // Documentation
    // ========================================================================

    pub fn with_documentation(self, documentation: &str) -> Self {
        self.add_line("documentation").with_documentation_line(documentation)
    }

    pub fn with_extended_documentation(self, documentation: &str) -> Self {
        self.add_line("extended documentation")
            .with_documentation_line(documentation)
    }

    pub fn with_use_case_documentation(self, documentation: &str) -> Self {
        self.add_line("use case documentation")
            .with_documentation_line(documentation)
    }

    fn with_documentation_line(self, documentation: &str) -> Self {
        if documentation == "inherited" {
            self.add_line(documentation)
        } else {
            self.add_line(&format!("\"{documentation}\""))
        }
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// A property with documentation and a required/optional collection indicator.
    pub fn with_property(
        self,
        keyword: &str,
        name: &str,
        documentation: &str,
        is_required: bool,
        is_collection: bool,
    ) -> Self {
        let indicator = match (is_required, is_collection) {
            (true, true) => "is required collection",
            (true, false) => "is required",
            (false, true) => "is optional collection",
            (false, false) => "is optional",
        };
        self.add_line(&format!("{keyword} {name}"))
            .indent()
            .with_documentation(documentation)
            .add_line(indicator)
            .outdent()
    }

    pub fn with_identity_property(self, keyword: &str, name: &str, documentation: &str) -> Self {
        self.add_line(&format!("{keyword} {name}"))
            .indent()
            .with_documentation(documentation)
            .add_line("is part of identity")
            .outdent()
    }

    /// Adds a modifier (`role name X`, `max length 20`, ...) to the property just written.
    pub fn with_property_modifier(self, modifier: &str) -> Self {
        self.indent().add_line(modifier).outdent()
    }

    pub fn with_role_name(self, role_name: &str, shorten_to: Option<&str>) -> Self {
        match shorten_to {
            Some(short) => {
                self.with_property_modifier(&format!("role name {role_name} shorten to {short}"))
            }
            None => self.with_property_modifier(&format!("role name {role_name}")),
        }
    }

    pub fn with_string_property(
        self,
        name: &str,
        documentation: &str,
        is_required: bool,
        is_collection: bool,
        max_length: &str,
    ) -> Self {
        self.with_property("string", name, documentation, is_required, is_collection)
            .with_property_modifier(&format!("max length {max_length}"))
    }

    pub fn with_string_identity(self, name: &str, documentation: &str, max_length: &str) -> Self {
        self.with_identity_property("string", name, documentation)
            .with_property_modifier(&format!("max length {max_length}"))
    }

    pub fn with_integer_property(
        self,
        name: &str,
        documentation: &str,
        is_required: bool,
        is_collection: bool,
    ) -> Self {
        self.with_property("integer", name, documentation, is_required, is_collection)
    }

    pub fn with_integer_identity(self, name: &str, documentation: &str) -> Self {
        self.with_identity_property("integer", name, documentation)
    }

    pub fn with_domain_entity_property(
        self,
        name: &str,
        documentation: &str,
        is_required: bool,
        is_collection: bool,
    ) -> Self {
        self.with_property("domain entity", name, documentation, is_required, is_collection)
    }

    pub fn with_domain_entity_identity(self, name: &str, documentation: &str) -> Self {
        self.with_identity_property("domain entity", name, documentation)
    }

    pub fn with_association_property(
        self,
        name: &str,
        documentation: &str,
        is_required: bool,
        is_collection: bool,
    ) -> Self {
        self.with_property("association", name, documentation, is_required, is_collection)
    }

    pub fn with_descriptor_property(
        self,
        name: &str,
        documentation: &str,
        is_required: bool,
        is_collection: bool,
    ) -> Self {
        self.with_property("descriptor", name, documentation, is_required, is_collection)
    }

    pub fn with_descriptor_identity(self, name: &str, documentation: &str) -> Self {
        self.with_identity_property("descriptor", name, documentation)
    }

    pub fn with_enumeration_property(
        self,
        name: &str,
        documentation: &str,
        is_required: bool,
        is_collection: bool,
    ) -> Self {
        self.with_property("enumeration", name, documentation, is_required, is_collection)
    }

    pub fn with_common_property(
        self,
        name: &str,
        documentation: &str,
        is_required: bool,
        is_collection: bool,
    ) -> Self {
        self.with_property("common", name, documentation, is_required, is_collection)
    }

    pub fn with_inline_common_property(
        self,
        name: &str,
        documentation: &str,
        is_required: bool,
        is_collection: bool,
    ) -> Self {
        self.with_property("inline common", name, documentation, is_required, is_collection)
    }

    // ========================================================================
    // Enumeration items, descriptor map types, interchange members
    // ========================================================================

    pub fn with_enumeration_item(self, short_description: &str) -> Self {
        self.add_line(&format!("item \"{short_description}\""))
    }

    pub fn with_start_map_type(self, is_required: bool) -> Self {
        let line = if is_required {
            "with map type"
        } else {
            "with optional map type"
        };
        self.add_line(line).indent()
    }

    pub fn with_end_map_type(self) -> Self {
        self.outdent()
    }

    pub fn with_domain_entity_element(self, name: &str) -> Self {
        self.add_line(&format!("domain entity {name}"))
    }

    pub fn with_association_element(self, name: &str) -> Self {
        self.add_line(&format!("association {name}"))
    }

    pub fn with_descriptor_element(self, name: &str) -> Self {
        self.add_line(&format!("descriptor {name}"))
    }

    pub fn with_domain_entity_identity_template(self, name: &str) -> Self {
        self.add_line(&format!("domain entity identity {name}"))
    }

    pub fn with_association_identity_template(self, name: &str) -> Self {
        self.add_line(&format!("association identity {name}"))
    }

    // ========================================================================
    // Output
    // ========================================================================

    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    pub fn parse(&self) -> ParseTree {
        parse_metaed(&self.to_text())
    }

    /// Parses the text, builds entities into `metaed` and wires namespace dependencies with
    /// default project settings. Returns syntax and builder failures.
    pub fn send_to(&self, metaed: &mut MetaEdEnvironment) -> Vec<ValidationFailure> {
        let tree = self.parse();
        let mut failures = crate::builder::syntax_failures(&tree);
        failures.extend(crate::builder::walk_builders(&tree, metaed));
        if let Err(err) =
            crate::pipeline::initialize_namespaces(metaed, &MetaEdConfiguration::default())
        {
            tracing::warn!(error = %err, "namespace initialization failed");
        }
        failures
    }
}
