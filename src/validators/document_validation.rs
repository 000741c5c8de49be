//! Document Validation
//!
//! Depth-first walk of an instance document against a compiled symbol table.
//! Every element gets an effective type, an attribute check and a content
//! check; failures are collected in a [`ValidationContext`] and the walk goes
//! on into every child, including those after a content model failure.
//! Only a missing root declaration or an exhausted matcher budget stops it.
//!
//! Identity constraints are checked when the walk leaves the element that
//! declares them. Key and unique tables of an element are merged into its
//! parent's, so a keyref can refer to a key declared on a descendant.

use std::collections::HashMap;

use tracing::trace;

use crate::documents::{Attribute, Document, Element};
use crate::error::ValidationError;
use crate::limits::Limits;
use crate::namespaces::QName;
use crate::XSI_NAMESPACE;

use super::attributes::{AttributeDecl, AttributeGroup, ValueConstraint};
use super::complex_types::ContentType;
use super::globals::{ElementId, TypeId, TypeKind, XsdGlobals};
use super::groups::Particle;
use super::identities::{key_sequence, IdentityCounter, KeyTables, SelectedNode, XsdIdentity};
use super::models::{find_child_declaration, ChildDeclaration, ContentError, ModelVisitor};
use super::simple_types::ValidatedValue;
use super::validation::ValidationContext;
use super::wildcards::{ProcessContents, Wildcard};

/// The walk cannot continue
#[derive(Debug)]
struct Halt;

type WalkResult = std::result::Result<(), Halt>;

/// Validate an XML document against compiled schema components
pub fn validate_document(
    globals: &XsdGlobals,
    limits: &Limits,
    doc: &Document,
) -> Vec<ValidationError> {
    let mut walker = DocumentWalker {
        globals,
        limits,
        context: ValidationContext::new(limits.max_xml_depth),
        key_tables: Vec::new(),
    };

    let Some(root) = doc.root() else {
        walker
            .context
            .report("The document has no document element.", 0, 0);
        return walker.context.into_errors();
    };

    walker.context.enter_element(root.local_name(), 1);
    match globals.lookup_element(&root.qname) {
        Some(id) => {
            if walker.validate_element(root, id).is_err() {
                trace!("validation halted");
            }
        }
        None => walker.context.report(
            format!(
                "Element '{}': No matching global declaration available for the validation root.",
                root.qname
            ),
            root.line,
            root.column,
        ),
    }
    walker.context.exit_element();

    walker.context.into_errors()
}

struct DocumentWalker<'s> {
    globals: &'s XsdGlobals,
    limits: &'s Limits,
    context: ValidationContext,
    /// Key and unique tables of every open element
    key_tables: Vec<KeyTables>,
}

/// Get an xsi: attribute value
fn get_xsi_attribute<'a>(elem: &'a Element, local_name: &str) -> Option<&'a str> {
    elem.get_attribute_qname(&QName::namespaced(XSI_NAMESPACE, local_name))
}

fn is_nil_true(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

impl<'s> DocumentWalker<'s> {
    /// Validate an XML element against its declaration
    ///
    /// The caller has already entered the element in the context.
    fn validate_element(&mut self, elem: &Element, decl_id: ElementId) -> WalkResult {
        let globals = self.globals;
        let identities = &globals.element(decl_id).identities;
        self.key_tables.push(KeyTables::new());
        let result = self.validate_declared(elem, decl_id);
        if result.is_ok() && !identities.is_empty() && !self.context.is_max_depth_exceeded() {
            self.check_identities(elem, identities);
        }
        if let Some(tables) = self.key_tables.pop() {
            if let Some(parent) = self.key_tables.last_mut() {
                for (name, counter) in tables {
                    parent.entry(name).or_default().merge(counter);
                }
            }
        }
        result
    }

    fn validate_declared(&mut self, elem: &Element, decl_id: ElementId) -> WalkResult {
        if self.context.is_max_depth_exceeded() {
            self.context.report(
                format!(
                    "Element '{}': Maximum nesting depth ({}) exceeded; the content is not validated.",
                    elem.qname, self.limits.max_xml_depth
                ),
                elem.line,
                elem.column,
            );
            return Ok(());
        }

        let decl = self.globals.element(decl_id);
        trace!(element = %elem.qname, level = self.context.level, "validating element");

        if decl.is_abstract {
            self.context.report(
                format!("Element '{}': The element declaration is abstract.", elem.qname),
                elem.line,
                elem.column,
            );
            return Ok(());
        }

        let type_id = self.effective_type(elem, decl.type_id);
        let definition = self.globals.type_def(type_id);
        if definition.is_abstract {
            self.context.report(
                format!("Element '{}': The type definition is abstract.", elem.qname),
                elem.line,
                elem.column,
            );
            return Ok(());
        }

        let nilled = self.check_nil(elem, decl.nillable);

        match &definition.kind {
            TypeKind::Simple(_) => {
                self.validate_attributes(elem, &AttributeGroup::new());
                if nilled {
                    return Ok(());
                }
                if !elem.children.is_empty() {
                    self.context.report(
                        format!(
                            "Element '{}': Element content is not allowed, because the type definition is simple.",
                            elem.qname
                        ),
                        elem.line,
                        elem.column,
                    );
                    return Ok(());
                }
                self.validate_simple_content(elem, type_id, decl.constraint.as_ref());
                Ok(())
            }
            TypeKind::Complex(complex) => {
                self.validate_attributes(elem, &complex.attributes);
                if nilled {
                    return Ok(());
                }
                self.validate_content(elem, &complex.content, decl.constraint.as_ref())
            }
        }
    }

    /// The declared type, or a valid `xsi:type` override
    fn effective_type(&mut self, elem: &Element, declared: TypeId) -> TypeId {
        let Some(value) = get_xsi_attribute(elem, "type") else {
            return declared;
        };

        let name = match elem.namespaces.resolve(value) {
            Ok(name) => name,
            Err(_) => {
                self.context.report_attribute(
                    "xsi:type",
                    format!(
                        "Element '{}', attribute 'xsi:type': The QName value '{}' has no corresponding namespace declaration in scope.",
                        elem.qname, value
                    ),
                    elem.line,
                    elem.column,
                );
                return declared;
            }
        };

        let Some(id) = self.globals.lookup_type(&name) else {
            self.context.report_attribute(
                "xsi:type",
                format!(
                    "Element '{}', attribute 'xsi:type': The QName value '{}' of the xsi:type attribute does not resolve to a type definition.",
                    elem.qname, name
                ),
                elem.line,
                elem.column,
            );
            return declared;
        };

        if !self.globals.is_derived_from(id, declared) {
            self.context.report(
                format!(
                    "Element '{}': The type definition '{}', specified by xsi:type, is blocked or not validly derived from the type definition of the element declaration.",
                    elem.qname, name
                ),
                elem.line,
                elem.column,
            );
            return declared;
        }
        id
    }

    /// Check `xsi:nil`; true when the element is validly nilled
    fn check_nil(&mut self, elem: &Element, nillable: bool) -> bool {
        let Some(value) = get_xsi_attribute(elem, "nil") else {
            return false;
        };
        match is_nil_true(value) {
            None => {
                self.context.report_attribute(
                    "xsi:nil",
                    format!(
                        "Element '{}', attribute 'xsi:nil': '{}' is not a valid value of the atomic type 'xs:boolean'.",
                        elem.qname, value
                    ),
                    elem.line,
                    elem.column,
                );
                false
            }
            Some(false) => false,
            Some(true) if !nillable => {
                self.context.report(
                    format!("Element '{}': The element is not 'nillable'.", elem.qname),
                    elem.line,
                    elem.column,
                );
                false
            }
            Some(true) => {
                if !elem.children.is_empty() || !elem.text_content().is_empty() {
                    self.context.report(
                        format!(
                            "Element '{}': The element cannot be 'nilled' because it is not empty.",
                            elem.qname
                        ),
                        elem.line,
                        elem.column,
                    );
                }
                true
            }
        }
    }

    // =========================================================================
    // Identity constraints
    // =========================================================================

    /// Check the constraints scoped to `elem`; keys and uniques go first so
    /// keyrefs on the same element can use them
    fn check_identities(&mut self, elem: &Element, identities: &[XsdIdentity]) {
        for identity in identities.iter().filter(|i| !i.is_keyref()) {
            let mut counter = IdentityCounter::new();
            for (node, fields) in identity.key_sequences(elem) {
                match fields {
                    Err(message) => self.report_selected(&node, message),
                    Ok(None) => {}
                    Ok(Some(fields)) => {
                        let sequence = key_sequence(&fields);
                        if counter.increase(fields) > 1 {
                            self.report_selected(
                                &node,
                                format!(
                                    "Duplicate key-sequence {} in {} identity-constraint '{}'.",
                                    sequence, identity.kind, identity.name
                                ),
                            );
                        }
                    }
                }
            }
            if let Some(tables) = self.key_tables.last_mut() {
                tables.entry(identity.name.clone()).or_default().merge(counter);
            }
        }

        for keyref in identities.iter().filter(|i| i.is_keyref()) {
            for (node, fields) in keyref.key_sequences(elem) {
                let fields = match fields {
                    Err(message) => {
                        self.report_selected(&node, message);
                        continue;
                    }
                    Ok(None) => continue,
                    Ok(Some(fields)) => fields,
                };
                let found = keyref
                    .refer
                    .as_ref()
                    .and_then(|refer| self.key_tables.last()?.get(refer))
                    .is_some_and(|table| table.contains(&fields));
                if !found {
                    self.report_selected(
                        &node,
                        format!(
                            "No match found for key-sequence {} of keyref '{}'.",
                            key_sequence(&fields),
                            keyref.name
                        ),
                    );
                }
            }
        }
    }

    fn report_selected(&mut self, node: &SelectedNode<'_>, message: String) {
        self.context.report_below(
            &node.path,
            format!("Element '{}': {}", node.element.qname, message),
            node.element.line,
            node.element.column,
        );
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Validate element attributes
    fn validate_attributes(&mut self, elem: &Element, group: &AttributeGroup) {
        for attr in &elem.attributes {
            if attr.qname.is_in(Some(XSI_NAMESPACE)) {
                continue;
            }

            if let Some(attribute_use) = group.attributes.get(&attr.qname) {
                self.validate_attribute_value(elem, attr, &attribute_use.decl);
                continue;
            }

            match &group.wildcard {
                Some(wildcard) if wildcard.matches(&attr.qname) => {
                    self.validate_wildcard_attribute(elem, attr, wildcard);
                }
                _ => self.context.report_attribute(
                    &attr.qname.local_name,
                    format!(
                        "Element '{}', attribute '{}': The attribute '{}' is not allowed.",
                        elem.qname, attr.qname, attr.qname
                    ),
                    elem.line,
                    elem.column,
                ),
            }
        }

        for attribute_use in group.attributes.values() {
            if attribute_use.required && elem.get_attribute_qname(attribute_use.name()).is_none() {
                self.context.report(
                    format!(
                        "Element '{}': The attribute '{}' is required but missing.",
                        elem.qname,
                        attribute_use.name()
                    ),
                    elem.line,
                    elem.column,
                );
            }
        }
    }

    fn validate_wildcard_attribute(&mut self, elem: &Element, attr: &Attribute, wildcard: &Wildcard) {
        let decl = match wildcard.process_contents {
            ProcessContents::Skip => return,
            ProcessContents::Lax => match self.globals.lookup_attribute(&attr.qname) {
                Some(decl) => decl,
                None => return,
            },
            ProcessContents::Strict => match self.globals.lookup_attribute(&attr.qname) {
                Some(decl) => decl,
                None => {
                    self.context.report_attribute(
                        &attr.qname.local_name,
                        format!(
                            "Element '{}', attribute '{}': No matching global attribute declaration available, but demanded by the strict wildcard.",
                            elem.qname, attr.qname
                        ),
                        elem.line,
                        elem.column,
                    );
                    return;
                }
            },
        };
        self.validate_attribute_value(elem, attr, decl);
    }

    fn validate_attribute_value(&mut self, elem: &Element, attr: &Attribute, decl: &AttributeDecl) {
        let Some(simple) = self.globals.simple_type(decl.type_id) else {
            return;
        };
        let owner = format!("Element '{}', attribute '{}'", elem.qname, attr.qname);
        let attribute = attr.qname.local_name.as_str();
        let label = self.globals.type_label(decl.type_id);

        let accepted = match simple.validate(&attr.value, label.as_deref()) {
            Ok(accepted) => accepted,
            Err(msg) => {
                self.context
                    .report_attribute(attribute, format!("{}: {}", owner, msg), elem.line, elem.column);
                return;
            }
        };

        if let Some(fixed) = decl.constraint.as_ref().and_then(ValueConstraint::fixed) {
            let matches = simple
                .validate(fixed, None)
                .map(|f| f.same_value(&accepted))
                .unwrap_or(false);
            if !matches {
                self.context.report_attribute(
                    attribute,
                    format!(
                        "{}: The value '{}' does not match the fixed value constraint '{}'.",
                        owner, accepted.normalized, fixed
                    ),
                    elem.line,
                    elem.column,
                );
                return;
            }
        }

        self.record_ids(elem, Some(attribute), &owner, &accepted);
    }

    fn record_ids(&mut self, elem: &Element, attribute: Option<&str>, owner: &str, value: &ValidatedValue) {
        for id in &value.ids {
            if !self.context.register_id(id) {
                let message = format!("{}: Duplicate ID value '{}'.", owner, id);
                match attribute {
                    Some(name) => self.context.report_attribute(name, message, elem.line, elem.column),
                    None => self.context.report(message, elem.line, elem.column),
                }
            }
        }
        for idref in &value.idrefs {
            self.context
                .defer_idref(idref, owner.to_string(), attribute, elem.line, elem.column);
        }
    }

    // =========================================================================
    // Content
    // =========================================================================

    fn validate_content(
        &mut self,
        elem: &Element,
        content: &ContentType,
        constraint: Option<&ValueConstraint>,
    ) -> WalkResult {
        match content {
            ContentType::Empty => {
                if !elem.children.is_empty() {
                    self.context.report(
                        format!(
                            "Element '{}': Element content is not allowed, because the content type is empty.",
                            elem.qname
                        ),
                        elem.line,
                        elem.column,
                    );
                } else if elem.has_significant_text() {
                    self.context.report(
                        format!(
                            "Element '{}': Character content is not allowed, because the content type is empty.",
                            elem.qname
                        ),
                        elem.line,
                        elem.column,
                    );
                }
                Ok(())
            }
            ContentType::Simple(simple_id) => {
                if !elem.children.is_empty() {
                    self.context.report(
                        format!(
                            "Element '{}': Element content is not allowed, because the content type is a simple type definition.",
                            elem.qname
                        ),
                        elem.line,
                        elem.column,
                    );
                    return Ok(());
                }
                self.validate_simple_content(elem, *simple_id, constraint);
                Ok(())
            }
            ContentType::ElementOnly(particle) => {
                if elem.has_significant_text() {
                    self.context.report(
                        format!(
                            "Element '{}': Character content other than whitespace is not allowed because the content type is 'element-only'.",
                            elem.qname
                        ),
                        elem.line,
                        elem.column,
                    );
                }
                self.validate_children(elem, particle)
            }
            ContentType::Mixed(particle) => self.validate_children(elem, particle),
        }
    }

    /// Validate the character data of an element with a simple type
    fn validate_simple_content(
        &mut self,
        elem: &Element,
        type_id: TypeId,
        constraint: Option<&ValueConstraint>,
    ) {
        let Some(simple) = self.globals.simple_type(type_id) else {
            return;
        };
        let owner = format!("Element '{}'", elem.qname);

        // An empty element takes the declared default or fixed value
        let text = match (elem.text_content(), constraint) {
            ("", Some(c)) => c.value(),
            (text, _) => text,
        };

        let label = self.globals.type_label(type_id);
        let accepted = match simple.validate(text, label.as_deref()) {
            Ok(accepted) => accepted,
            Err(msg) => {
                self.context
                    .report(format!("{}: {}", owner, msg), elem.line, elem.column);
                return;
            }
        };

        if let Some(fixed) = constraint.and_then(ValueConstraint::fixed) {
            let matches = simple
                .validate(fixed, None)
                .map(|f| f.same_value(&accepted))
                .unwrap_or(false);
            if !matches {
                self.context.report(
                    format!(
                        "{}: The value '{}' does not match the fixed value constraint '{}'.",
                        owner, accepted.normalized, fixed
                    ),
                    elem.line,
                    elem.column,
                );
                return;
            }
        }

        self.record_ids(elem, None, &owner, &accepted);
    }

    /// Match the children against the content model, then descend
    ///
    /// A content model failure is reported once; every child is still
    /// validated against the declaration its name resolves to.
    fn validate_children(&mut self, elem: &Element, particle: &Particle) -> WalkResult {
        let names: Vec<&QName> = elem.children.iter().map(|c| &c.qname).collect();
        let outcome = ModelVisitor::new(self.globals, &names, self.limits.max_model_states)
            .check(particle);

        let failure = match outcome {
            Ok(failure) => failure,
            Err(exceeded) => {
                self.context.report(
                    format!("Element '{}': {}.", elem.qname, exceeded),
                    elem.line,
                    elem.column,
                );
                return Err(Halt);
            }
        };
        let failing_child = failure.as_ref().and_then(ContentError::child_index);

        let mut seen: HashMap<&QName, usize> = HashMap::new();
        for (i, child) in elem.children.iter().enumerate() {
            let index = next_index(&mut seen, &child.qname);
            self.context.enter_element(child.local_name(), index);
            if let (Some(failure), Some(k)) = (&failure, failing_child) {
                if k == i {
                    self.context.report(
                        format!("Element '{}': {}", child.qname, failure.message()),
                        child.line,
                        child.column,
                    );
                }
            }
            let result = self.validate_child(child, particle);
            self.context.exit_element();
            result?;
        }

        if let Some(failure) = failure.filter(|f| f.child_index().is_none()) {
            self.context.report(
                format!("Element '{}': {}", elem.qname, failure.message()),
                elem.line,
                elem.column,
            );
        }
        Ok(())
    }

    fn validate_child(&mut self, child: &Element, particle: &Particle) -> WalkResult {
        match find_child_declaration(self.globals, particle, &child.qname) {
            Some(ChildDeclaration::Element(id)) => self.validate_element(child, id),
            Some(ChildDeclaration::Wildcard(wildcard)) => self.validate_wildcard_element(child, wildcard),
            None => Ok(()),
        }
    }

    fn validate_wildcard_element(&mut self, child: &Element, wildcard: &Wildcard) -> WalkResult {
        match wildcard.process_contents {
            ProcessContents::Skip => Ok(()),
            ProcessContents::Lax => match self.globals.lookup_element(&child.qname) {
                Some(id) => self.validate_element(child, id),
                None => Ok(()),
            },
            ProcessContents::Strict => match self.globals.lookup_element(&child.qname) {
                Some(id) => self.validate_element(child, id),
                None => {
                    self.context.report(
                        format!(
                            "Element '{}': No matching global element declaration available, but demanded by the strict wildcard.",
                            child.qname
                        ),
                        child.line,
                        child.column,
                    );
                    Ok(())
                }
            },
        }
    }
}

fn next_index<'a>(seen: &mut HashMap<&'a QName, usize>, name: &'a QName) -> usize {
    let count = seen.entry(name).or_insert(0);
    *count += 1;
    *count
}
