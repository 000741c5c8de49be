//! XSD Document Parsing
//!
//! Compiles one or more parsed `xs:schema` documents into an [`XsdGlobals`]
//! symbol table.
//!
//! Compilation runs in two passes. The first pass walks the top-level
//! children of every document and reserves a slot for each named component,
//! so duplicate names fail immediately and later references can be resolved
//! to arena indices before their targets are built. The second pass builds
//! every slot on demand. Type slots track their state: a base type that is
//! still being built when it is requested again is a derivation cycle, while
//! references that only need a [`TypeId`] (element and attribute types) never
//! force compilation, which lets recursive content models resolve to the
//! placeholder already in the arena.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::documents::{Document, Element};
use crate::error::CompileError;
use crate::names::{is_valid_ncname, is_valid_qname};
use crate::namespaces::{NamespaceContext, QName};
use crate::XSD_NAMESPACE;

use super::attributes::{
    AttributeDecl, AttributeGroup, AttributeUse, UseMode, ValueConstraint,
};
use super::builtins::BuiltinType;
use super::complex_types::{ComplexType, ContentType, DerivationMethod};
use super::elements::{ElementDecl, Form};
use super::facets::{Bound, EnumValue, FacetKind, FacetSet, PatternFacet, WhiteSpace};
use super::globals::{ElementId, TypeDefinition, TypeId, TypeKind, XsdGlobals};
use super::groups::{ModelType, Particle, ParticleTerm};
use super::identities::{IdentityConstraintKind, XsdField, XsdIdentity, XsdSelector};
use super::particles::{parse_occurs, Occurs};
use super::simple_types::{SimpleType, SimpleTypeVariety};
use super::wildcards::{NamespaceConstraint, ProcessContents, Wildcard};

type CompileResult<T> = std::result::Result<T, CompileError>;

/// XSD element local names
mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const REDEFINE: &str = "redefine";
    pub const NOTATION: &str = "notation";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
    pub const UNIQUE: &str = "unique";
    pub const KEY: &str = "key";
    pub const KEYREF: &str = "keyref";
    pub const SELECTOR: &str = "selector";
    pub const FIELD: &str = "field";
}

/// XSD attribute names
mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const ELEMENT_FORM_DEFAULT: &str = "elementFormDefault";
    pub const ATTRIBUTE_FORM_DEFAULT: &str = "attributeFormDefault";
    pub const FORM: &str = "form";
    pub const NILLABLE: &str = "nillable";
    pub const DEFAULT: &str = "default";
    pub const FIXED: &str = "fixed";
    pub const BASE: &str = "base";
    pub const VALUE: &str = "value";
    pub const MIXED: &str = "mixed";
    pub const ABSTRACT: &str = "abstract";
    pub const SUBSTITUTION_GROUP: &str = "substitutionGroup";
    pub const NAMESPACE: &str = "namespace";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
    pub const ITEM_TYPE: &str = "itemType";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const USE: &str = "use";
    pub const PROCESS_CONTENTS: &str = "processContents";
    pub const XPATH: &str = "xpath";
    pub const REFER: &str = "refer";
}

use xsd_attrs as attrs;
use xsd_elements as tags;

/// The result of a successful compilation
#[derive(Debug, Clone)]
pub struct SchemaComponents {
    /// Symbol table with every compiled component
    pub globals: XsdGlobals,
    /// Target namespace of each compiled document, in input order
    pub target_namespaces: Vec<Option<String>>,
}

/// Compile parsed schema documents into one symbol table
///
/// Documents are registered in order, so a duplicate name is reported at its
/// second occurrence. The first error stops compilation.
pub fn compile_documents<'a, I>(documents: I) -> CompileResult<SchemaComponents>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut compiler = SchemaCompiler::new();
    for document in documents {
        compiler.register_document(document)?;
    }
    compiler.compile()
}

// =============================================================================
// Compiler state
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Pending,
    InProgress,
    Done,
}

/// Where a component is defined: document index and defining element
#[derive(Debug, Clone, Copy)]
struct Source<'a> {
    doc: usize,
    elem: &'a Element,
}

#[derive(Debug)]
struct Slot<'a> {
    source: Source<'a>,
    state: SlotState,
}

impl<'a> Slot<'a> {
    fn new(doc: usize, elem: &'a Element) -> Self {
        Self {
            source: Source { doc, elem },
            state: SlotState::Pending,
        }
    }
}

/// Per-document settings
#[derive(Debug)]
struct SchemaDocument {
    target_namespace: Option<String>,
    element_form: Form,
    attribute_form: Form,
}

/// A default or fixed value checked once every type is built
#[derive(Debug)]
struct ValueCheck {
    type_id: TypeId,
    value: String,
    constraint: &'static str,
    owner: String,
    line: u32,
    column: u32,
}

/// A named identity constraint, for keyref resolution
#[derive(Debug)]
struct IdentityEntry {
    kind: IdentityConstraintKind,
    fields: usize,
}

/// A keyref whose `refer` is resolved once every element is built
#[derive(Debug)]
struct PendingKeyref {
    owner: String,
    refer: QName,
    fields: usize,
    line: u32,
    column: u32,
}

struct SchemaCompiler<'a> {
    globals: XsdGlobals,
    documents: Vec<SchemaDocument>,
    type_slots: HashMap<TypeId, Slot<'a>>,
    type_order: Vec<TypeId>,
    element_slots: HashMap<ElementId, Slot<'a>>,
    element_order: Vec<ElementId>,
    attribute_slots: IndexMap<QName, Slot<'a>>,
    attributes: HashMap<QName, AttributeDecl>,
    group_slots: IndexMap<QName, Slot<'a>>,
    groups: HashMap<QName, Particle>,
    attribute_group_slots: IndexMap<QName, Slot<'a>>,
    attribute_groups: HashMap<QName, AttributeGroup>,
    value_checks: Vec<ValueCheck>,
    identity_names: IndexMap<QName, IdentityEntry>,
    keyrefs: Vec<PendingKeyref>,
}

// =============================================================================
// Small helpers
// =============================================================================

fn error_at(elem: &Element, message: impl Into<String>) -> CompileError {
    CompileError::new(message).at(elem.line, elem.column)
}

fn unexpected(elem: &Element) -> CompileError {
    error_at(
        elem,
        format!("Element '{}': This element is not expected.", elem.qname),
    )
}

/// The `restriction` or `extension` child of a simple or complex content element
fn derivation_of(content: &Element) -> CompileResult<(&Element, DerivationMethod)> {
    let elem = xsd_children(content).next().ok_or_else(|| unexpected(content))?;
    match elem.local_name() {
        tags::RESTRICTION => Ok((elem, DerivationMethod::Restriction)),
        tags::EXTENSION => Ok((elem, DerivationMethod::Extension)),
        _ => Err(unexpected(elem)),
    }
}

fn missing_child(elem: &Element, local: &str) -> CompileError {
    error_at(
        elem,
        format!(
            "Element '{}': Missing child element(s). Expected is ( {{{}}}{} ).",
            elem.qname, XSD_NAMESPACE, local
        ),
    )
}

/// Compile the `xpath` attribute of a selector or field
fn compile_xpath<T>(
    elem: &Element,
    parse: impl Fn(&str, &NamespaceContext) -> Result<T, String>,
) -> CompileResult<T> {
    let xpath = required_attribute(elem, attrs::XPATH)?;
    parse(xpath, &elem.namespaces).map_err(|reason| {
        error_at(
            elem,
            format!(
                "Element '{}', attribute 'xpath': The XPath expression '{}' could not be compiled: {}.",
                elem.qname, xpath, reason
            ),
        )
    })
}

fn is_xsd(elem: &Element) -> bool {
    elem.namespace() == Some(XSD_NAMESPACE)
}

/// XSD children of a schema element, without annotations
fn xsd_children(elem: &Element) -> impl Iterator<Item = &Element> {
    elem.children
        .iter()
        .filter(|c| is_xsd(c) && c.local_name() != tags::ANNOTATION)
}

fn child_named<'e>(elem: &'e Element, local: &str) -> Option<&'e Element> {
    xsd_children(elem).find(|c| c.local_name() == local)
}

fn bool_attribute(elem: &Element, name: &str) -> CompileResult<bool> {
    match elem.get_attribute(name).map(str::trim) {
        None | Some("false") | Some("0") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some(other) => Err(error_at(
            elem,
            format!(
                "Element '{}', attribute '{}': '{}' is not a valid value of the atomic type 'xs:boolean'.",
                elem.qname, name, other
            ),
        )),
    }
}

fn form_attribute(elem: &Element, name: &str) -> CompileResult<Option<Form>> {
    match elem.get_attribute(name) {
        None => Ok(None),
        Some(value) => Form::from_str(value).map(Some).ok_or_else(|| {
            error_at(
                elem,
                format!(
                    "Element '{}', attribute '{}': The value '{}' is not valid. Expected is '(qualified | unqualified)'.",
                    elem.qname, name, value
                ),
            )
        }),
    }
}

fn required_attribute<'e>(elem: &'e Element, name: &str) -> CompileResult<&'e str> {
    elem.get_attribute(name).ok_or_else(|| {
        error_at(
            elem,
            format!(
                "Element '{}': The attribute '{}' is required but missing.",
                elem.qname, name
            ),
        )
    })
}

fn ncname_attribute<'e>(elem: &'e Element, name: &str) -> CompileResult<&'e str> {
    let value = required_attribute(elem, name)?.trim();
    if !is_valid_ncname(value) {
        return Err(error_at(
            elem,
            format!(
                "Element '{}', attribute '{}': '{}' is not a valid value of the atomic type 'xs:NCName'.",
                elem.qname, name, value
            ),
        ));
    }
    Ok(value)
}

fn value_constraint(elem: &Element) -> CompileResult<Option<ValueConstraint>> {
    match (elem.get_attribute(attrs::DEFAULT), elem.get_attribute(attrs::FIXED)) {
        (Some(_), Some(_)) => Err(error_at(
            elem,
            format!(
                "Element '{}': The attributes 'default' and 'fixed' are mutually exclusive.",
                elem.qname
            ),
        )),
        (Some(d), None) => Ok(Some(ValueConstraint::Default(d.to_string()))),
        (None, Some(f)) => Ok(Some(ValueConstraint::Fixed(f.to_string()))),
        (None, None) => Ok(None),
    }
}

fn occurs_of(elem: &Element) -> CompileResult<Occurs> {
    parse_occurs(
        elem.get_attribute(attrs::MIN_OCCURS),
        elem.get_attribute(attrs::MAX_OCCURS),
    )
    .map_err(|msg| error_at(elem, format!("Element '{}': {}.", elem.qname, msg)))
}

// =============================================================================
// Compiler
// =============================================================================

impl<'a> SchemaCompiler<'a> {
    fn new() -> Self {
        Self {
            globals: XsdGlobals::new(),
            documents: Vec::new(),
            type_slots: HashMap::new(),
            type_order: Vec::new(),
            element_slots: HashMap::new(),
            element_order: Vec::new(),
            attribute_slots: IndexMap::new(),
            attributes: HashMap::new(),
            group_slots: IndexMap::new(),
            groups: HashMap::new(),
            attribute_group_slots: IndexMap::new(),
            attribute_groups: HashMap::new(),
            value_checks: Vec::new(),
            identity_names: IndexMap::new(),
            keyrefs: Vec::new(),
        }
    }

    fn target_namespace(&self, doc: usize) -> Option<String> {
        self.documents[doc].target_namespace.clone()
    }

    fn global_name(&self, doc: usize, elem: &Element) -> CompileResult<QName> {
        let local = ncname_attribute(elem, attrs::NAME)?;
        Ok(QName::new(self.target_namespace(doc), local))
    }

    fn resolve_qname(&self, elem: &Element, attr: &str, value: &str) -> CompileResult<QName> {
        let value = value.trim();
        if !is_valid_qname(value) {
            return Err(error_at(
                elem,
                format!(
                    "Element '{}', attribute '{}': '{}' is not a valid value of the atomic type 'xs:QName'.",
                    elem.qname, attr, value
                ),
            ));
        }
        elem.namespaces.resolve(value).map_err(|prefix| {
            error_at(
                elem,
                format!(
                    "Element '{}', attribute '{}': The QName value '{}' has no corresponding namespace declaration in scope (prefix '{}').",
                    elem.qname, attr, value, prefix
                ),
            )
        })
    }

    fn unresolved(elem: &Element, attr: &str, name: QName, kind: &str) -> CompileError {
        error_at(
            elem,
            format!(
                "Element '{}', attribute '{}': The QName value '{}' does not resolve to a(n) {}.",
                elem.qname, attr, name, kind
            ),
        )
        .with_name(name)
    }

    fn resolve_type(&self, elem: &Element, attr: &str) -> CompileResult<Option<TypeId>> {
        let Some(value) = elem.get_attribute(attr) else {
            return Ok(None);
        };
        let name = self.resolve_qname(elem, attr, value)?;
        match self.globals.lookup_type(&name) {
            Some(id) => Ok(Some(id)),
            None => Err(Self::unresolved(elem, attr, name, "type definition")),
        }
    }

    /// Resolve a type reference that must name a simple type
    fn resolve_simple_type(&self, elem: &Element, attr: &str) -> CompileResult<Option<TypeId>> {
        let Some(id) = self.resolve_type(elem, attr)? else {
            return Ok(None);
        };
        if !self.globals.type_def(id).is_simple() {
            let name = self.globals.type_def(id).name.clone();
            let mut err = error_at(
                elem,
                format!(
                    "Element '{}', attribute '{}': The type definition '{}' is not a simple type definition.",
                    elem.qname,
                    attr,
                    self.globals.type_label(id).unwrap_or_default()
                ),
            );
            if let Some(name) = name {
                err = err.with_name(name);
            }
            return Err(err);
        }
        Ok(Some(id))
    }

    // =========================================================================
    // Pass 1: registration
    // =========================================================================

    fn register_document(&mut self, document: &'a Document) -> CompileResult<()> {
        let root = document
            .root()
            .ok_or_else(|| CompileError::new("The schema document has no root element."))?;
        if !(is_xsd(root) && root.local_name() == tags::SCHEMA) {
            return Err(error_at(
                root,
                format!(
                    "The XML document root '{}' is not a schema document.",
                    root.qname
                ),
            ));
        }

        let target_namespace = match root.get_attribute(attrs::TARGET_NAMESPACE) {
            Some("") => {
                return Err(error_at(
                    root,
                    "The target namespace must not be the empty string.",
                ))
            }
            other => other.map(str::to_string),
        };
        let document_settings = SchemaDocument {
            target_namespace,
            element_form: form_attribute(root, attrs::ELEMENT_FORM_DEFAULT)?.unwrap_or_default(),
            attribute_form: form_attribute(root, attrs::ATTRIBUTE_FORM_DEFAULT)?
                .unwrap_or_default(),
        };
        debug!(
            target_namespace = ?document_settings.target_namespace,
            "registering schema document"
        );
        let doc = self.documents.len();
        self.documents.push(document_settings);

        for child in xsd_children(root) {
            match child.local_name() {
                tags::NOTATION => {}
                tags::INCLUDE | tags::IMPORT | tags::REDEFINE => {
                    warn!(
                        directive = child.local_name(),
                        namespace = ?child.get_attribute(attrs::NAMESPACE),
                        location = ?child.get_attribute(attrs::SCHEMA_LOCATION),
                        "schema location is not fetched; supply the document to compile it"
                    );
                }
                tags::SIMPLE_TYPE | tags::COMPLEX_TYPE => {
                    let name = self.global_name(doc, child)?;
                    let id = self.reserve_type(doc, child, Some(name.clone()));
                    if !self.globals.register_type_name(name.clone(), id) {
                        return Err(duplicate(child, "type definition", name));
                    }
                }
                tags::ELEMENT => {
                    let name = self.global_name(doc, child)?;
                    let mut placeholder = ElementDecl::new(name.clone(), self.globals.any_type());
                    placeholder.global = true;
                    let id = self.globals.add_element(placeholder);
                    if !self.globals.register_element_name(name.clone(), id) {
                        return Err(duplicate(child, "element declaration", name));
                    }
                    self.element_slots.insert(id, Slot::new(doc, child));
                    self.element_order.push(id);
                }
                tags::ATTRIBUTE => {
                    let name = self.global_name(doc, child)?;
                    register_slot(&mut self.attribute_slots, name, doc, child, "attribute declaration")?;
                }
                tags::GROUP => {
                    let name = self.global_name(doc, child)?;
                    register_slot(&mut self.group_slots, name, doc, child, "model group definition")?;
                }
                tags::ATTRIBUTE_GROUP => {
                    let name = self.global_name(doc, child)?;
                    register_slot(
                        &mut self.attribute_group_slots,
                        name,
                        doc,
                        child,
                        "attribute group definition",
                    )?;
                }
                _ => return Err(unexpected(child)),
            }
        }
        Ok(())
    }

    /// Put a placeholder definition of the right kind into the arena
    fn reserve_type(&mut self, doc: usize, elem: &'a Element, name: Option<QName>) -> TypeId {
        let placeholder = if elem.local_name() == tags::SIMPLE_TYPE {
            TypeDefinition::simple(
                name,
                Some(self.globals.any_simple_type()),
                SimpleType::atomic(BuiltinType::AnySimpleType),
            )
        } else {
            TypeDefinition::complex(
                name,
                Some(self.globals.any_type()),
                DerivationMethod::Restriction,
                ComplexType::empty(),
            )
        };
        let id = self.globals.add_type(placeholder);
        self.type_slots.insert(id, Slot::new(doc, elem));
        self.type_order.push(id);
        id
    }

    // =========================================================================
    // Pass 2: compilation
    // =========================================================================

    fn compile(mut self) -> CompileResult<SchemaComponents> {
        for index in 0..self.element_order.len() {
            let id = self.element_order[index];
            self.ensure_element(id)?;
        }

        let names: Vec<QName> = self.attribute_slots.keys().cloned().collect();
        for name in names {
            let decl = self.ensure_attribute(&name)?;
            self.globals.register_attribute(decl);
        }

        let names: Vec<QName> = self.attribute_group_slots.keys().cloned().collect();
        for name in names {
            let group = self.ensure_attribute_group(&name)?;
            self.globals.register_attribute_group(name, group);
        }

        let names: Vec<QName> = self.group_slots.keys().cloned().collect();
        for name in names {
            let particle = self.ensure_group(&name)?;
            self.globals.register_group(name, particle);
        }

        // Compiling a type may reserve further anonymous types
        let mut next = 0;
        while next < self.type_order.len() {
            let id = self.type_order[next];
            self.ensure_type(id)?;
            next += 1;
        }

        self.check_substitution_groups()?;
        self.check_keyrefs()?;
        self.globals.build_substitution_groups();
        self.check_value_constraints()?;
        self.check_element_consistency()?;

        let counts = self.globals.counts();
        debug!(
            documents = self.documents.len(),
            types = counts.types,
            elements = counts.elements,
            attributes = counts.attributes,
            groups = counts.groups,
            attribute_groups = counts.attribute_groups,
            "schema compiled"
        );

        Ok(SchemaComponents {
            globals: self.globals,
            target_namespaces: self
                .documents
                .into_iter()
                .map(|d| d.target_namespace)
                .collect(),
        })
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    fn ensure_type(&mut self, id: TypeId) -> CompileResult<()> {
        let Some(slot) = self.type_slots.get_mut(&id) else {
            return Ok(());
        };
        let source = slot.source;
        match slot.state {
            SlotState::Done => return Ok(()),
            SlotState::InProgress => {
                let name = self.globals.type_def(id).name.clone();
                let label = name
                    .as_ref()
                    .map(|n| format!("'{}'", n))
                    .unwrap_or_else(|| "of a local type".to_string());
                let mut err = error_at(
                    source.elem,
                    format!("circular type derivation {}", label),
                );
                if let Some(name) = name {
                    err = err.with_name(name);
                }
                return Err(err);
            }
            SlotState::Pending => slot.state = SlotState::InProgress,
        }

        let name = self.globals.type_def(id).name.clone();
        let definition = if source.elem.local_name() == tags::SIMPLE_TYPE {
            self.simple_type_definition(source.doc, source.elem, name)?
        } else {
            self.complex_type_definition(source.doc, source.elem, name)?
        };
        self.globals.set_type(id, definition);

        if let Some(slot) = self.type_slots.get_mut(&id) {
            slot.state = SlotState::Done;
        }
        Ok(())
    }

    /// A compiled simple type by id, building it first when needed
    fn simple_type_of(&mut self, elem: &Element, id: TypeId) -> CompileResult<SimpleType> {
        self.ensure_type(id)?;
        self.globals.simple_type(id).cloned().ok_or_else(|| {
            error_at(
                elem,
                format!(
                    "Element '{}': The type definition '{}' is not a simple type definition.",
                    elem.qname,
                    self.globals.type_label(id).unwrap_or_default()
                ),
            )
        })
    }

    /// Compile an inline `xs:simpleType` immediately
    fn local_simple_type(&mut self, doc: usize, elem: &'a Element) -> CompileResult<TypeId> {
        let id = self.reserve_type(doc, elem, None);
        self.ensure_type(id)?;
        Ok(id)
    }

    fn simple_type_definition(
        &mut self,
        doc: usize,
        elem: &'a Element,
        name: Option<QName>,
    ) -> CompileResult<TypeDefinition> {
        let Some(body) = xsd_children(elem).next() else {
            return Err(error_at(
                elem,
                format!(
                    "Element '{}': The content is not valid. Expected is (annotation?, (restriction | list | union)).",
                    elem.qname
                ),
            ));
        };

        match body.local_name() {
            tags::RESTRICTION => {
                let base_id = self.simple_base(doc, body)?;
                let base = self.simple_type_of(body, base_id)?;
                let facets = self.parse_facets(body, &base)?;
                Ok(TypeDefinition::simple(name, Some(base_id), base.restrict(facets)))
            }
            tags::LIST => {
                let item_id = match self.resolve_simple_type(body, attrs::ITEM_TYPE)? {
                    Some(id) => id,
                    None => match child_named(body, tags::SIMPLE_TYPE) {
                        Some(inline) => self.local_simple_type(doc, inline)?,
                        None => {
                            return Err(error_at(
                                body,
                                format!(
                                    "Element '{}': Either the attribute 'itemType' or the <simpleType> child must be present.",
                                    body.qname
                                ),
                            ))
                        }
                    },
                };
                let item = self.simple_type_of(body, item_id)?;
                if item.variety() == SimpleTypeVariety::List {
                    return Err(error_at(
                        body,
                        format!(
                            "Element '{}': The item type '{}' must not be a list type.",
                            body.qname,
                            self.globals.type_label(item_id).unwrap_or_else(|| "local".to_string())
                        ),
                    ));
                }
                Ok(TypeDefinition::simple(
                    name,
                    Some(self.globals.any_simple_type()),
                    SimpleType::list(item),
                ))
            }
            tags::UNION => {
                let mut members = Vec::new();
                if let Some(list) = body.get_attribute(attrs::MEMBER_TYPES) {
                    for token in list.split_whitespace() {
                        let member_name = self.resolve_qname(body, attrs::MEMBER_TYPES, token)?;
                        let id = self.globals.lookup_type(&member_name).ok_or_else(|| {
                            Self::unresolved(body, attrs::MEMBER_TYPES, member_name, "type definition")
                        })?;
                        members.push(self.simple_type_of(body, id)?);
                    }
                }
                for inline in xsd_children(body).filter(|c| c.local_name() == tags::SIMPLE_TYPE) {
                    let id = self.local_simple_type(doc, inline)?;
                    members.push(self.simple_type_of(inline, id)?);
                }
                if members.is_empty() {
                    return Err(error_at(
                        body,
                        format!(
                            "Element '{}': Either a non-empty attribute 'memberTypes' or at least one <simpleType> child must be present.",
                            body.qname
                        ),
                    ));
                }
                Ok(TypeDefinition::simple(
                    name,
                    Some(self.globals.any_simple_type()),
                    SimpleType::union(members),
                ))
            }
            _ => Err(unexpected(body)),
        }
    }

    /// Base of a simple restriction: the `base` attribute or an inline type
    fn simple_base(&mut self, doc: usize, restriction: &'a Element) -> CompileResult<TypeId> {
        if let Some(id) = self.resolve_simple_type(restriction, attrs::BASE)? {
            return Ok(id);
        }
        match child_named(restriction, tags::SIMPLE_TYPE) {
            Some(inline) => self.local_simple_type(doc, inline),
            None => Err(error_at(
                restriction,
                format!(
                    "Element '{}': Either the attribute 'base' or a <simpleType> child must be present.",
                    restriction.qname
                ),
            )),
        }
    }

    /// Facet children of a restriction, checked against the base type
    fn parse_facets(&self, restriction: &Element, base: &SimpleType) -> CompileResult<FacetSet> {
        let mut facets = FacetSet::new();
        let mut enumeration: Vec<EnumValue> = Vec::new();
        let mut patterns: Vec<PatternFacet> = Vec::new();

        for child in xsd_children(restriction) {
            let local = child.local_name();
            if matches!(
                local,
                tags::SIMPLE_TYPE | tags::ATTRIBUTE | tags::ATTRIBUTE_GROUP | tags::ANY_ATTRIBUTE
            ) {
                continue;
            }
            let kind = FacetKind::from_name(local).ok_or_else(|| unexpected(child))?;
            if !base.admitted_facets().contains(&kind) {
                return Err(error_at(
                    child,
                    format!(
                        "Element '{}': The facet '{}' is not allowed on types derived from this base type.",
                        child.qname,
                        kind.name()
                    ),
                ));
            }
            let value = required_attribute(child, attrs::VALUE)?;
            let invalid = |msg: String| error_at(child, format!("Element '{}': {}", child.qname, msg));

            match kind {
                FacetKind::Enumeration => {
                    let parsed = base.parse_facet_value(value).map_err(invalid)?;
                    let literal = match parsed {
                        Some(_) => value.to_string(),
                        None => base.white_space().normalize(value),
                    };
                    enumeration.push(EnumValue {
                        literal,
                        value: parsed,
                    });
                }
                FacetKind::Pattern => {
                    patterns.push(PatternFacet::new(value).map_err(invalid)?);
                }
                FacetKind::WhiteSpace => {
                    let ws = WhiteSpace::from_str(value).ok_or_else(|| {
                        invalid(format!("'{}' is not a valid whiteSpace value.", value))
                    })?;
                    facets.white_space = Some(ws);
                }
                FacetKind::MinInclusive
                | FacetKind::MaxInclusive
                | FacetKind::MinExclusive
                | FacetKind::MaxExclusive => {
                    let bound = base
                        .parse_facet_value(value)
                        .map_err(invalid)?
                        .map(|parsed| Bound {
                            literal: value.trim().to_string(),
                            value: parsed,
                        })
                        .ok_or_else(|| {
                            invalid(format!("The facet '{}' requires an atomic base type.", kind.name()))
                        })?;
                    match kind {
                        FacetKind::MinInclusive => facets.min_inclusive = Some(bound),
                        FacetKind::MaxInclusive => facets.max_inclusive = Some(bound),
                        FacetKind::MinExclusive => facets.min_exclusive = Some(bound),
                        _ => facets.max_exclusive = Some(bound),
                    }
                }
                FacetKind::Length | FacetKind::MinLength | FacetKind::MaxLength => {
                    let n = value.trim().parse::<usize>().map_err(|_| {
                        invalid(format!(
                            "'{}' is not a valid value of the atomic type 'xs:nonNegativeInteger'.",
                            value
                        ))
                    })?;
                    match kind {
                        FacetKind::Length => facets.length = Some(n),
                        FacetKind::MinLength => facets.min_length = Some(n),
                        _ => facets.max_length = Some(n),
                    }
                }
                FacetKind::TotalDigits | FacetKind::FractionDigits => {
                    let n = value.trim().parse::<u32>().map_err(|_| {
                        invalid(format!(
                            "'{}' is not a valid value of the atomic type 'xs:nonNegativeInteger'.",
                            value
                        ))
                    })?;
                    if kind == FacetKind::TotalDigits {
                        if n == 0 {
                            return Err(invalid(
                                "'0' is not a valid value of the atomic type 'xs:positiveInteger'."
                                    .to_string(),
                            ));
                        }
                        facets.total_digits = Some(n);
                    } else {
                        facets.fraction_digits = Some(n);
                    }
                }
            }
        }

        if let (Some(min), Some(max)) = (facets.min_length, facets.max_length) {
            if min > max {
                return Err(error_at(
                    restriction,
                    format!(
                        "Element '{}': The value of 'minLength' ({}) is greater than the value of 'maxLength' ({}).",
                        restriction.qname, min, max
                    ),
                ));
            }
        }
        if !enumeration.is_empty() {
            facets.enumeration = Some(enumeration);
        }
        if !patterns.is_empty() {
            facets.patterns.push(patterns);
        }
        Ok(facets)
    }

    fn complex_type_definition(
        &mut self,
        doc: usize,
        elem: &'a Element,
        name: Option<QName>,
    ) -> CompileResult<TypeDefinition> {
        let mixed = bool_attribute(elem, attrs::MIXED)?;
        let is_abstract = bool_attribute(elem, attrs::ABSTRACT)?;

        let mut definition = if let Some(simple) = child_named(elem, tags::SIMPLE_CONTENT) {
            self.simple_content(doc, simple, name)?
        } else if let Some(complex) = child_named(elem, tags::COMPLEX_CONTENT) {
            let mixed = match complex.get_attribute(attrs::MIXED) {
                Some(_) => bool_attribute(complex, attrs::MIXED)?,
                None => mixed,
            };
            self.complex_content(doc, complex, name, mixed)?
        } else {
            let particle = self.content_particle(doc, elem)?;
            let mut attributes = AttributeGroup::new();
            self.parse_attribute_uses(doc, elem, &mut attributes)?;
            remove_prohibited(&mut attributes);

            let content = content_for(particle, mixed);
            let mut complex = ComplexType::new(content);
            complex.attributes = attributes;
            TypeDefinition::complex(
                name,
                Some(self.globals.any_type()),
                DerivationMethod::Restriction,
                complex,
            )
        };

        definition.is_abstract = is_abstract;
        Ok(definition)
    }

    /// The base of a derivation step, compiled
    fn derivation_base(&mut self, derivation: &Element) -> CompileResult<TypeId> {
        let id = self.resolve_type(derivation, attrs::BASE)?.ok_or_else(|| {
            error_at(
                derivation,
                format!(
                    "Element '{}': The attribute 'base' is required but missing.",
                    derivation.qname
                ),
            )
        })?;
        self.ensure_type(id)?;
        Ok(id)
    }

    fn simple_content(
        &mut self,
        doc: usize,
        content: &'a Element,
        name: Option<QName>,
    ) -> CompileResult<TypeDefinition> {
        let (derivation_elem, method) = derivation_of(content)?;
        let base_id = self.derivation_base(derivation_elem)?;
        let base = self.globals.type_def(base_id).clone();

        let (content_id, base_attributes) = match &base.kind {
            TypeKind::Simple(_) if method == DerivationMethod::Extension => {
                (base_id, AttributeGroup::new())
            }
            TypeKind::Complex(ComplexType {
                content: ContentType::Simple(inner),
                attributes,
            }) => (*inner, attributes.clone()),
            _ => {
                return Err(error_at(
                    derivation_elem,
                    format!(
                        "Element '{}': The content type of the base type '{}' is not a simple type.",
                        derivation_elem.qname,
                        self.globals.type_label(base_id).unwrap_or_default()
                    ),
                ))
            }
        };

        let mut own = AttributeGroup::new();
        self.parse_attribute_uses(doc, derivation_elem, &mut own)?;

        let (content_id, attributes) = match method {
            DerivationMethod::Extension => {
                (content_id, extend_attributes(derivation_elem, &base_attributes, own)?)
            }
            DerivationMethod::Restriction => {
                let inner_base = match child_named(derivation_elem, tags::SIMPLE_TYPE) {
                    Some(inline) => self.local_simple_type(doc, inline)?,
                    None => content_id,
                };
                let simple = self.simple_type_of(derivation_elem, inner_base)?;
                let facets = self.parse_facets(derivation_elem, &simple)?;
                let restricted_id = if facets.is_empty() {
                    inner_base
                } else {
                    self.globals.add_type(TypeDefinition::simple(
                        None,
                        Some(inner_base),
                        simple.restrict(facets),
                    ))
                };
                (restricted_id, restrict_attributes(&base_attributes, own))
            }
        };

        let mut complex = ComplexType::new(ContentType::Simple(content_id));
        complex.attributes = attributes;
        Ok(TypeDefinition::complex(name, Some(base_id), method, complex))
    }

    fn complex_content(
        &mut self,
        doc: usize,
        content: &'a Element,
        name: Option<QName>,
        mixed: bool,
    ) -> CompileResult<TypeDefinition> {
        let (derivation_elem, method) = derivation_of(content)?;
        let base_id = self.derivation_base(derivation_elem)?;
        let base = match &self.globals.type_def(base_id).kind {
            TypeKind::Complex(c) => c.clone(),
            TypeKind::Simple(_) => {
                return Err(error_at(
                    derivation_elem,
                    format!(
                        "Element '{}': The base type '{}' is a simple type; complex content requires a complex base.",
                        derivation_elem.qname,
                        self.globals.type_label(base_id).unwrap_or_default()
                    ),
                ))
            }
        };

        let own_particle = self
            .content_particle(doc, derivation_elem)?
            .filter(|p| !p.is_empty());
        let mut own = AttributeGroup::new();
        self.parse_attribute_uses(doc, derivation_elem, &mut own)?;

        let complex = match method {
            DerivationMethod::Extension => {
                let content = match (base.content.clone(), own_particle) {
                    (base_content, None) => match base_content {
                        ContentType::ElementOnly(p) if mixed => ContentType::Mixed(p),
                        ContentType::Empty if mixed => ContentType::Mixed(Particle::empty_sequence()),
                        other => other,
                    },
                    (ContentType::Empty, Some(p)) => content_for(Some(p), mixed),
                    (ContentType::ElementOnly(b), Some(p)) => content_for(Some(extend_particle(b, p)), mixed),
                    (ContentType::Mixed(b), Some(p)) => ContentType::Mixed(extend_particle(b, p)),
                    (ContentType::Simple(_), Some(_)) => {
                        return Err(error_at(
                            derivation_elem,
                            format!(
                                "Element '{}': A type with simple content cannot be extended with element content.",
                                derivation_elem.qname
                            ),
                        ))
                    }
                };
                let mut complex = ComplexType::new(content);
                complex.attributes = extend_attributes(derivation_elem, &base.attributes, own)?;
                complex
            }
            DerivationMethod::Restriction => {
                let mut complex = ComplexType::new(content_for(own_particle, mixed));
                complex.attributes = restrict_attributes(&base.attributes, own);
                complex
            }
        };

        Ok(TypeDefinition::complex(name, Some(base_id), method, complex))
    }

    // -------------------------------------------------------------------------
    // Particles
    // -------------------------------------------------------------------------

    /// The content model child of a complex type or derivation, if any
    fn content_particle(&mut self, doc: usize, container: &'a Element) -> CompileResult<Option<Particle>> {
        let Some(child) = xsd_children(container).find(|c| {
            matches!(
                c.local_name(),
                tags::SEQUENCE | tags::CHOICE | tags::ALL | tags::GROUP
            )
        }) else {
            return Ok(None);
        };

        let particle = if child.local_name() == tags::GROUP {
            self.group_reference(child)?
        } else {
            self.model_group(doc, child, true)?
        };
        Ok(Some(particle))
    }

    fn model_group(&mut self, doc: usize, elem: &'a Element, top_level: bool) -> CompileResult<Particle> {
        let model = ModelType::from_tag(elem.local_name()).ok_or_else(|| unexpected(elem))?;
        let occurs = occurs_of(elem)?;

        let mut particles = Vec::new();
        for child in xsd_children(elem) {
            let particle = match child.local_name() {
                tags::ELEMENT => self.element_particle(doc, child)?,
                tags::GROUP if model != ModelType::All => self.group_reference(child)?,
                tags::SEQUENCE | tags::CHOICE if model != ModelType::All => {
                    self.model_group(doc, child, false)?
                }
                tags::ANY if model != ModelType::All => {
                    Particle::any(self.wildcard(doc, child)?, occurs_of(child)?)
                }
                tags::ALL => {
                    return Err(error_at(
                        child,
                        format!(
                            "Element '{}': An 'all' model group must appear as the content model of a complex type or model group definition.",
                            child.qname
                        ),
                    ))
                }
                _ => return Err(unexpected(child)),
            };
            particles.push(particle);
        }

        let particle = Particle::group(model, particles, occurs);
        if model == ModelType::All {
            check_all_group(elem, &particle, top_level)?;
        }
        Ok(particle)
    }

    fn group_reference(&mut self, elem: &Element) -> CompileResult<Particle> {
        let value = required_attribute(elem, attrs::REF)?;
        let name = self.resolve_qname(elem, attrs::REF, value)?;
        if !self.group_slots.contains_key(&name) {
            return Err(Self::unresolved(elem, attrs::REF, name, "model group definition"));
        }
        let occurs = occurs_of(elem)?;
        let group = self.ensure_group(&name)?;
        if group.model() == Some(ModelType::All) && !occurs.is_single() {
            return Err(error_at(
                elem,
                format!(
                    "Element '{}': A reference to an 'all' model group must have minOccurs and maxOccurs of 1.",
                    elem.qname
                ),
            ));
        }
        Ok(Particle {
            occurs,
            term: group.term,
        })
    }

    fn ensure_group(&mut self, name: &QName) -> CompileResult<Particle> {
        if let Some(particle) = self.groups.get(name) {
            return Ok(particle.clone());
        }
        let Some(slot) = self.group_slots.get_mut(name) else {
            return Err(CompileError::new(format!(
                "The model group definition '{}' is not defined.",
                name
            ))
            .with_name(name.clone()));
        };
        let source = slot.source;
        if slot.state == SlotState::InProgress {
            return Err(error_at(
                source.elem,
                format!("circular model group reference '{}'", name),
            )
            .with_name(name.clone()));
        }
        slot.state = SlotState::InProgress;

        let body = xsd_children(source.elem)
            .find(|c| matches!(c.local_name(), tags::SEQUENCE | tags::CHOICE | tags::ALL))
            .ok_or_else(|| {
                error_at(
                    source.elem,
                    format!(
                        "Element '{}': The content is not valid. Expected is (annotation?, (all | choice | sequence)).",
                        source.elem.qname
                    ),
                )
            })?;
        let mut particle = self.model_group(source.doc, body, true)?;
        particle.occurs = Occurs::once();

        if let Some(slot) = self.group_slots.get_mut(name) {
            slot.state = SlotState::Done;
        }
        self.groups.insert(name.clone(), particle.clone());
        Ok(particle)
    }

    fn wildcard(&self, doc: usize, elem: &Element) -> CompileResult<Wildcard> {
        let tns = self.documents[doc].target_namespace.as_deref();
        let namespace = match elem.get_attribute(attrs::NAMESPACE) {
            Some(value) => NamespaceConstraint::from_namespace_attr(value, tns)
                .map_err(|msg| error_at(elem, format!("Element '{}': {}", elem.qname, msg)))?,
            None => NamespaceConstraint::Any,
        };
        let process_contents = match elem.get_attribute(attrs::PROCESS_CONTENTS) {
            Some(value) => ProcessContents::from_str(value).ok_or_else(|| {
                error_at(
                    elem,
                    format!(
                        "Element '{}', attribute 'processContents': The value '{}' is not valid. Expected is '(strict | lax | skip)'.",
                        elem.qname, value
                    ),
                )
            })?,
            None => ProcessContents::Strict,
        };
        Ok(Wildcard::new(namespace, process_contents))
    }

    // -------------------------------------------------------------------------
    // Elements
    // -------------------------------------------------------------------------

    fn element_particle(&mut self, doc: usize, elem: &'a Element) -> CompileResult<Particle> {
        let occurs = occurs_of(elem)?;

        if let Some(value) = elem.get_attribute(attrs::REF) {
            if elem.get_attribute(attrs::NAME).is_some() || elem.get_attribute(attrs::TYPE).is_some() {
                return Err(error_at(
                    elem,
                    format!(
                        "Element '{}': The attributes 'name' and 'type' are not allowed together with 'ref'.",
                        elem.qname
                    ),
                ));
            }
            let name = self.resolve_qname(elem, attrs::REF, value)?;
            let id = self
                .globals
                .lookup_element(&name)
                .ok_or_else(|| Self::unresolved(elem, attrs::REF, name, "element declaration"))?;
            return Ok(Particle::element(id, occurs));
        }

        let local = ncname_attribute(elem, attrs::NAME)?;
        let form = form_attribute(elem, attrs::FORM)?.unwrap_or(self.documents[doc].element_form);
        let namespace = match form {
            Form::Qualified => self.target_namespace(doc),
            Form::Unqualified => None,
        };
        let decl = self.element_decl(doc, elem, QName::new(namespace, local), false)?;
        let id = self.globals.add_element(decl);
        Ok(Particle::element(id, occurs))
    }

    fn ensure_element(&mut self, id: ElementId) -> CompileResult<()> {
        let Some(slot) = self.element_slots.get_mut(&id) else {
            return Ok(());
        };
        let source = slot.source;
        match slot.state {
            SlotState::Done => return Ok(()),
            SlotState::InProgress => {
                let name = self.globals.element(id).name.clone();
                return Err(error_at(
                    source.elem,
                    format!("circular substitution group involving '{}'", name),
                )
                .with_name(name));
            }
            SlotState::Pending => slot.state = SlotState::InProgress,
        }

        let name = self.globals.element(id).name.clone();
        let decl = self.element_decl(source.doc, source.elem, name, true)?;
        self.globals.set_element(id, decl);

        if let Some(slot) = self.element_slots.get_mut(&id) {
            slot.state = SlotState::Done;
        }
        Ok(())
    }

    fn element_decl(
        &mut self,
        doc: usize,
        elem: &'a Element,
        name: QName,
        global: bool,
    ) -> CompileResult<ElementDecl> {
        let substitution_group = match elem.get_attribute(attrs::SUBSTITUTION_GROUP) {
            Some(value) if global => {
                let head_name = self.resolve_qname(elem, attrs::SUBSTITUTION_GROUP, value)?;
                let head = self.globals.lookup_element(&head_name).ok_or_else(|| {
                    Self::unresolved(elem, attrs::SUBSTITUTION_GROUP, head_name, "element declaration")
                })?;
                Some(head)
            }
            _ => None,
        };

        let inline = xsd_children(elem)
            .find(|c| matches!(c.local_name(), tags::SIMPLE_TYPE | tags::COMPLEX_TYPE));
        let declared = self.resolve_type(elem, attrs::TYPE)?;
        let type_id = match (declared, inline) {
            (Some(_), Some(_)) => {
                return Err(error_at(
                    elem,
                    format!(
                        "Element '{}': The attribute 'type' and the <{}> child are mutually exclusive.",
                        elem.qname,
                        inline.map(Element::local_name).unwrap_or_default()
                    ),
                ))
            }
            (Some(id), None) => id,
            (None, Some(def)) => self.reserve_type(doc, def, None),
            (None, None) => match substitution_group {
                Some(head) => {
                    self.ensure_element(head)?;
                    self.globals.element(head).type_id
                }
                None => self.globals.any_type(),
            },
        };

        let mut identities = Vec::new();
        for child in xsd_children(elem) {
            match child.local_name() {
                tags::SIMPLE_TYPE | tags::COMPLEX_TYPE => {}
                tag @ (tags::UNIQUE | tags::KEY | tags::KEYREF) => {
                    let kind = IdentityConstraintKind::from_tag(tag).ok_or_else(|| unexpected(child))?;
                    identities.push(self.identity_constraint(doc, child, kind)?);
                }
                _ => return Err(unexpected(child)),
            }
        }

        let constraint = value_constraint(elem)?;
        if let Some(ref c) = constraint {
            self.value_checks.push(ValueCheck {
                type_id,
                value: c.value().to_string(),
                constraint: if c.fixed().is_some() { "fixed" } else { "default" },
                owner: format!("Element '{}'", name),
                line: elem.line,
                column: elem.column,
            });
        }

        let mut decl = ElementDecl::new(name, type_id);
        decl.nillable = bool_attribute(elem, attrs::NILLABLE)?;
        decl.is_abstract = global && bool_attribute(elem, attrs::ABSTRACT)?;
        decl.constraint = constraint;
        decl.substitution_group = substitution_group;
        decl.global = global;
        decl.identities = identities;
        decl.line = elem.line;
        decl.column = elem.column;
        Ok(decl)
    }

    // -------------------------------------------------------------------------
    // Identity constraints
    // -------------------------------------------------------------------------

    fn identity_constraint(
        &mut self,
        doc: usize,
        elem: &Element,
        kind: IdentityConstraintKind,
    ) -> CompileResult<XsdIdentity> {
        let name = self.global_name(doc, elem)?;

        let mut children = xsd_children(elem);
        let selector = match children.next() {
            Some(child) if child.local_name() == tags::SELECTOR => {
                compile_xpath(child, XsdSelector::parse)?
            }
            Some(child) => return Err(unexpected(child)),
            None => return Err(missing_child(elem, tags::SELECTOR)),
        };
        let mut fields = Vec::new();
        for child in children {
            if child.local_name() != tags::FIELD {
                return Err(unexpected(child));
            }
            fields.push(compile_xpath(child, XsdField::parse)?);
        }
        if fields.is_empty() {
            return Err(missing_child(elem, tags::FIELD));
        }

        let refer = match kind {
            IdentityConstraintKind::Keyref => {
                let value = required_attribute(elem, attrs::REFER)?;
                let refer = self.resolve_qname(elem, attrs::REFER, value)?;
                self.keyrefs.push(PendingKeyref {
                    owner: format!("Element '{}'", elem.qname),
                    refer: refer.clone(),
                    fields: fields.len(),
                    line: elem.line,
                    column: elem.column,
                });
                Some(refer)
            }
            _ => None,
        };

        if self.identity_names.contains_key(&name) {
            return Err(duplicate(elem, "identity-constraint", name));
        }
        self.identity_names.insert(
            name.clone(),
            IdentityEntry {
                kind,
                fields: fields.len(),
            },
        );
        debug!(constraint = %name, %kind, "identity constraint compiled");
        Ok(XsdIdentity {
            name,
            kind,
            selector,
            fields,
            refer,
        })
    }

    /// Every keyref must refer to a key or unique with as many fields
    fn check_keyrefs(&self) -> CompileResult<()> {
        for keyref in &self.keyrefs {
            let fail = |message: String| {
                CompileError::new(format!("{}: {}", keyref.owner, message))
                    .with_name(keyref.refer.clone())
                    .at(keyref.line, keyref.column)
            };
            match self.identity_names.get(&keyref.refer) {
                Some(entry) if entry.kind != IdentityConstraintKind::Keyref => {
                    if entry.fields != keyref.fields {
                        return Err(fail(format!(
                            "The cardinality of the keyref differs from the cardinality of the referenced key/unique '{}'.",
                            keyref.refer
                        )));
                    }
                }
                _ => {
                    return Err(fail(format!(
                        "The keyref references a non-existent key/unique '{}'.",
                        keyref.refer
                    )))
                }
            }
        }
        Ok(())
    }

    fn check_substitution_groups(&self) -> CompileResult<()> {
        for id in &self.element_order {
            let mut head = self.globals.element(*id).substitution_group;
            let mut hops = 0;
            while let Some(h) = head {
                if h == *id {
                    let decl = self.globals.element(*id);
                    return Err(CompileError::new(format!(
                        "circular substitution group involving '{}'",
                        decl.name
                    ))
                    .with_name(decl.name.clone())
                    .at(decl.line, decl.column));
                }
                if hops > self.element_order.len() {
                    break;
                }
                head = self.globals.element(h).substitution_group;
                hops += 1;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    fn ensure_attribute(&mut self, name: &QName) -> CompileResult<AttributeDecl> {
        if let Some(decl) = self.attributes.get(name) {
            return Ok(decl.clone());
        }
        let Some(slot) = self.attribute_slots.get_mut(name) else {
            return Err(CompileError::new(format!(
                "The attribute declaration '{}' is not defined.",
                name
            ))
            .with_name(name.clone()));
        };
        slot.state = SlotState::InProgress;
        let source = slot.source;

        let decl = self.attribute_decl(source.doc, source.elem, name.clone())?;
        if let Some(slot) = self.attribute_slots.get_mut(name) {
            slot.state = SlotState::Done;
        }
        self.attributes.insert(name.clone(), decl.clone());
        Ok(decl)
    }

    fn attribute_decl(&mut self, doc: usize, elem: &'a Element, name: QName) -> CompileResult<AttributeDecl> {
        let inline = child_named(elem, tags::SIMPLE_TYPE);
        let type_id = match (self.resolve_simple_type(elem, attrs::TYPE)?, inline) {
            (Some(_), Some(_)) => {
                return Err(error_at(
                    elem,
                    format!(
                        "Element '{}': The attribute 'type' and the <simpleType> child are mutually exclusive.",
                        elem.qname
                    ),
                ))
            }
            (Some(id), None) => id,
            (None, Some(def)) => self.reserve_type(doc, def, None),
            (None, None) => self.globals.any_simple_type(),
        };

        let constraint = value_constraint(elem)?;
        if let Some(ref c) = constraint {
            self.push_attribute_check(elem, &name, type_id, c);
        }
        Ok(AttributeDecl {
            name,
            type_id,
            constraint,
        })
    }

    fn push_attribute_check(&mut self, elem: &Element, name: &QName, type_id: TypeId, c: &ValueConstraint) {
        self.value_checks.push(ValueCheck {
            type_id,
            value: c.value().to_string(),
            constraint: if c.fixed().is_some() { "fixed" } else { "default" },
            owner: format!("Attribute '{}'", name),
            line: elem.line,
            column: elem.column,
        });
    }

    /// A local attribute or attribute reference inside a type or group
    fn attribute_use(&mut self, doc: usize, elem: &'a Element) -> CompileResult<(AttributeUse, UseMode)> {
        let mode = match elem.get_attribute(attrs::USE) {
            Some(value) => UseMode::from_str(value).ok_or_else(|| {
                error_at(
                    elem,
                    format!(
                        "Element '{}', attribute 'use': The value '{}' is not valid. Expected is '(optional | prohibited | required)'.",
                        elem.qname, value
                    ),
                )
            })?,
            None => UseMode::Optional,
        };

        let decl = if let Some(value) = elem.get_attribute(attrs::REF) {
            let name = self.resolve_qname(elem, attrs::REF, value)?;
            if !self.attribute_slots.contains_key(&name) {
                return Err(Self::unresolved(elem, attrs::REF, name, "attribute declaration"));
            }
            let mut decl = self.ensure_attribute(&name)?;
            if let Some(constraint) = value_constraint(elem)? {
                self.push_attribute_check(elem, &name, decl.type_id, &constraint);
                decl.constraint = Some(constraint);
            }
            decl
        } else {
            let local = ncname_attribute(elem, attrs::NAME)?;
            let form = form_attribute(elem, attrs::FORM)?.unwrap_or(self.documents[doc].attribute_form);
            let namespace = match form {
                Form::Qualified => self.target_namespace(doc),
                Form::Unqualified => None,
            };
            self.attribute_decl(doc, elem, QName::new(namespace, local))?
        };

        if matches!(decl.constraint, Some(ValueConstraint::Default(_))) && mode != UseMode::Optional {
            return Err(error_at(
                elem,
                format!(
                    "Element '{}': The value of the attribute 'use' must be 'optional' if the attribute 'default' is present.",
                    elem.qname
                ),
            ));
        }

        let required = mode == UseMode::Required;
        Ok((AttributeUse { decl, required }, mode))
    }

    /// Collect attribute, attributeGroup and anyAttribute children
    fn parse_attribute_uses(
        &mut self,
        doc: usize,
        container: &'a Element,
        group: &mut AttributeGroup,
    ) -> CompileResult<()> {
        let mut local_wildcard = None;
        for child in xsd_children(container) {
            match child.local_name() {
                tags::ATTRIBUTE => {
                    let (attribute, mode) = self.attribute_use(doc, child)?;
                    let name = attribute.name().clone();
                    if group.attributes.contains_key(&name) || group.prohibited.contains(&name) {
                        return Err(error_at(
                            child,
                            format!("Element '{}': Duplicate attribute use '{}'.", child.qname, name),
                        )
                        .with_name(name));
                    }
                    if mode == UseMode::Prohibited {
                        group.prohibited.push(name);
                    } else {
                        group.attributes.insert(name, attribute);
                    }
                }
                tags::ATTRIBUTE_GROUP => {
                    let value = required_attribute(child, attrs::REF)?;
                    let name = self.resolve_qname(child, attrs::REF, value)?;
                    if !self.attribute_group_slots.contains_key(&name) {
                        return Err(Self::unresolved(
                            child,
                            attrs::REF,
                            name,
                            "attribute group definition",
                        ));
                    }
                    let referenced = self.ensure_attribute_group(&name)?;
                    group.merge(&referenced).map_err(|duplicate| {
                        error_at(
                            child,
                            format!(
                                "Element '{}': Duplicate attribute use '{}'.",
                                child.qname, duplicate
                            ),
                        )
                        .with_name(duplicate)
                    })?;
                }
                tags::ANY_ATTRIBUTE => {
                    local_wildcard = Some(self.wildcard(doc, child)?);
                }
                _ => {}
            }
        }

        if let Some(local) = local_wildcard {
            group.wildcard = Some(match group.wildcard.take() {
                Some(from_groups) => local.intersection(&from_groups),
                None => local,
            });
        }
        Ok(())
    }

    fn ensure_attribute_group(&mut self, name: &QName) -> CompileResult<AttributeGroup> {
        if let Some(group) = self.attribute_groups.get(name) {
            return Ok(group.clone());
        }
        let Some(slot) = self.attribute_group_slots.get_mut(name) else {
            return Err(CompileError::new(format!(
                "The attribute group definition '{}' is not defined.",
                name
            ))
            .with_name(name.clone()));
        };
        let source = slot.source;
        if slot.state == SlotState::InProgress {
            return Err(error_at(
                source.elem,
                format!("circular attribute group reference '{}'", name),
            )
            .with_name(name.clone()));
        }
        slot.state = SlotState::InProgress;

        let mut group = AttributeGroup::new();
        self.parse_attribute_uses(source.doc, source.elem, &mut group)?;

        if let Some(slot) = self.attribute_group_slots.get_mut(name) {
            slot.state = SlotState::Done;
        }
        self.attribute_groups.insert(name.clone(), group.clone());
        Ok(group)
    }

    // -------------------------------------------------------------------------
    // Value constraints
    // -------------------------------------------------------------------------

    fn check_value_constraints(&self) -> CompileResult<()> {
        for check in &self.value_checks {
            let fail = |msg: String| {
                CompileError::new(format!(
                    "{}: The value '{}' of the '{}' constraint is not valid: {}",
                    check.owner, check.value, check.constraint, msg
                ))
                .at(check.line, check.column)
            };

            let simple_id = match &self.globals.type_def(check.type_id).kind {
                TypeKind::Simple(_) => check.type_id,
                TypeKind::Complex(complex) => match &complex.content {
                    ContentType::Simple(id) => *id,
                    ContentType::Mixed(p) if p.is_emptiable() => continue,
                    _ => {
                        return Err(fail(
                            "the content type is neither simple nor mixed with emptiable content."
                                .to_string(),
                        ))
                    }
                },
            };
            if let Some(simple) = self.globals.simple_type(simple_id) {
                let label = self.globals.type_label(simple_id);
                simple.validate(&check.value, label.as_deref()).map_err(fail)?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Element Declarations Consistent
    // -------------------------------------------------------------------------

    /// Same-named element particles of one content model must share a type
    fn check_element_consistency(&self) -> CompileResult<()> {
        for id in &self.type_order {
            let TypeKind::Complex(complex) = &self.globals.type_def(*id).kind else {
                continue;
            };
            if let Some(particle) = complex.content.particle() {
                self.consistent_particle(particle, &mut HashMap::new())?;
            }
        }
        for name in self.group_slots.keys() {
            if let Some(particle) = self.groups.get(name) {
                self.consistent_particle(particle, &mut HashMap::new())?;
            }
        }
        Ok(())
    }

    fn consistent_particle(
        &self,
        particle: &Particle,
        seen: &mut HashMap<QName, TypeId>,
    ) -> CompileResult<()> {
        match &particle.term {
            ParticleTerm::Element(id) => {
                let decl = self.globals.element(*id);
                match seen.get(&decl.name) {
                    Some(type_id) if *type_id != decl.type_id => Err(CompileError::new(format!(
                        "Element '{}': cos-element-consistent: Element declarations of the \
                         same name in one content model must have the same type definition.",
                        decl.name
                    ))
                    .with_name(decl.name.clone())
                    .at(decl.line, decl.column)),
                    Some(_) => Ok(()),
                    None => {
                        seen.insert(decl.name.clone(), decl.type_id);
                        Ok(())
                    }
                }
            }
            ParticleTerm::Any(_) => Ok(()),
            ParticleTerm::Group { particles, .. } => {
                for p in particles {
                    self.consistent_particle(p, seen)?;
                }
                Ok(())
            }
        }
    }
}

// =============================================================================
// Free helpers
// =============================================================================

fn duplicate(elem: &Element, kind: &str, name: QName) -> CompileError {
    error_at(
        elem,
        format!("A global {} '{}' does already exist.", kind, name),
    )
    .with_name(name)
}

fn register_slot<'a>(
    slots: &mut IndexMap<QName, Slot<'a>>,
    name: QName,
    doc: usize,
    elem: &'a Element,
    kind: &str,
) -> CompileResult<()> {
    if slots.contains_key(&name) {
        return Err(duplicate(elem, kind, name));
    }
    slots.insert(name, Slot::new(doc, elem));
    Ok(())
}

fn content_for(particle: Option<Particle>, mixed: bool) -> ContentType {
    match (particle, mixed) {
        (Some(p), true) => ContentType::Mixed(p),
        (Some(p), false) => ContentType::ElementOnly(p),
        (None, true) => ContentType::Mixed(Particle::empty_sequence()),
        (None, false) => ContentType::Empty,
    }
}

/// Content model of an extension: the base's particle followed by the new one
fn extend_particle(base: Particle, own: Particle) -> Particle {
    Particle::group(ModelType::Sequence, vec![base, own], Occurs::once())
}

fn remove_prohibited(group: &mut AttributeGroup) {
    for name in std::mem::take(&mut group.prohibited) {
        group.attributes.shift_remove(&name);
    }
}

/// Attribute uses of an extension: the base's plus the new ones, wildcards united
fn extend_attributes(
    elem: &Element,
    base: &AttributeGroup,
    own: AttributeGroup,
) -> CompileResult<AttributeGroup> {
    let mut result = base.clone();
    result.prohibited.clear();
    for (name, attribute) in own.attributes {
        if result.attributes.contains_key(&name) {
            return Err(error_at(
                elem,
                format!(
                    "Element '{}': Duplicate attribute use '{}'.",
                    elem.qname, name
                ),
            )
            .with_name(name));
        }
        result.attributes.insert(name, attribute);
    }
    result.wildcard = match (result.wildcard.take(), own.wildcard) {
        (Some(b), Some(o)) => Some(o.union(&b)),
        (b, o) => o.or(b),
    };
    Ok(result)
}

/// Attribute uses of a restriction: overrides replace, prohibited ones go
fn restrict_attributes(base: &AttributeGroup, own: AttributeGroup) -> AttributeGroup {
    let mut result = base.clone();
    result.prohibited.clear();
    for (name, attribute) in own.attributes {
        result.attributes.insert(name, attribute);
    }
    for name in &own.prohibited {
        result.attributes.shift_remove(name);
    }
    result.wildcard = own.wildcard;
    result
}

fn check_all_group(elem: &Element, particle: &Particle, top_level: bool) -> CompileResult<()> {
    let fail = |msg: &str| error_at(elem, format!("Element '{}': {}", elem.qname, msg));

    if !top_level {
        return Err(fail(
            "An 'all' model group must appear as the content model of a complex type or model group definition.",
        ));
    }
    if particle.occurs.max != Some(1) || particle.occurs.min > 1 {
        return Err(fail(
            "The 'all' model group must have minOccurs 0 or 1 and maxOccurs 1.",
        ));
    }
    if let ParticleTerm::Group { particles, .. } = &particle.term {
        for member in particles {
            let is_element = matches!(member.term, ParticleTerm::Element(_));
            if !is_element || member.occurs.max.map_or(true, |m| m > 1) {
                return Err(fail(
                    "Each particle of an 'all' model group must be an element declaration with maxOccurs of at most 1.",
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XmlOrigin;
    use crate::limits::Limits;

    fn parse(xsd: &str) -> Document {
        Document::parse(xsd, XmlOrigin::Schema, &Limits::default()).unwrap()
    }

    fn compile(xsd: &str) -> CompileResult<SchemaComponents> {
        let doc = parse(xsd);
        compile_documents([&doc])
    }

    fn schema(body: &str) -> String {
        format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{}</xs:schema>"#,
            body
        )
    }

    #[test]
    fn test_undefined_type() {
        let err = compile(&schema(r#"<xs:element name="root" type="undefinedType"/>"#)).unwrap_err();
        assert_eq!(err.name, Some(QName::local("undefinedType")));
        assert!(err.message.contains("'undefinedType'"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_duplicate_global() {
        let err = compile(&schema(
            r#"<xs:element name="a" type="xs:string"/><xs:element name="a" type="xs:int"/>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("does already exist"));
        assert_eq!(err.name, Some(QName::local("a")));
    }

    #[test]
    fn test_root_must_be_schema() {
        let err = compile("<notASchema/>").unwrap_err();
        assert!(err.message.contains("not a schema document"));
    }

    #[test]
    fn test_recursive_type() {
        let components = compile(&schema(
            r#"
            <xs:complexType name="node">
              <xs:sequence>
                <xs:element name="node" type="node" minOccurs="0" maxOccurs="unbounded"/>
              </xs:sequence>
            </xs:complexType>
            <xs:element name="tree" type="node"/>"#,
        ))
        .unwrap();

        let globals = &components.globals;
        let node = globals.lookup_type(&QName::local("node")).unwrap();
        let particle = globals
            .type_def(node)
            .as_complex()
            .and_then(|c| c.content.particle())
            .unwrap();
        let mut children = Vec::new();
        particle.for_each_element(&mut |id| children.push(id));
        assert_eq!(globals.element(children[0]).type_id, node);
    }

    #[test]
    fn test_circular_derivation() {
        let err = compile(&schema(
            r#"
            <xs:simpleType name="a"><xs:restriction base="b"/></xs:simpleType>
            <xs:simpleType name="b"><xs:restriction base="a"/></xs:simpleType>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("circular type derivation"));
    }

    #[test]
    fn test_circular_group() {
        let err = compile(&schema(
            r#"
            <xs:group name="g"><xs:sequence><xs:group ref="g"/></xs:sequence></xs:group>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("circular model group"));
    }

    #[test]
    fn test_recursion_through_element_in_group() {
        let components = compile(&schema(
            r#"
            <xs:group name="g">
              <xs:sequence>
                <xs:element name="item" minOccurs="0">
                  <xs:complexType><xs:sequence><xs:group ref="g"/></xs:sequence></xs:complexType>
                </xs:element>
              </xs:sequence>
            </xs:group>"#,
        ));
        assert!(components.is_ok());
    }

    #[test]
    fn test_all_group_constraints() {
        let err = compile(&schema(
            r#"
            <xs:complexType name="t">
              <xs:all><xs:element name="a" maxOccurs="2"/></xs:all>
            </xs:complexType>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("'all'"));

        let err = compile(&schema(
            r#"
            <xs:complexType name="t">
              <xs:sequence><xs:all><xs:element name="a"/></xs:all></xs:sequence>
            </xs:complexType>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("'all'"));
    }

    #[test]
    fn test_simple_restriction_facets() {
        let components = compile(&schema(
            r#"
            <xs:simpleType name="qty">
              <xs:restriction base="xs:integer">
                <xs:minInclusive value="1"/>
                <xs:maxInclusive value="10"/>
              </xs:restriction>
            </xs:simpleType>"#,
        ))
        .unwrap();
        let id = components.globals.lookup_type(&QName::local("qty")).unwrap();
        let simple = components.globals.simple_type(id).unwrap();
        assert!(simple.validate("5", Some("qty")).is_ok());
        assert!(simple.validate("15", Some("qty")).is_err());
        assert_eq!(components.globals.type_def(id).base, components.globals.builtin("integer"));
    }

    #[test]
    fn test_facet_not_admitted() {
        let err = compile(&schema(
            r#"
            <xs:simpleType name="flag">
              <xs:restriction base="xs:boolean"><xs:maxLength value="3"/></xs:restriction>
            </xs:simpleType>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("maxLength"));
    }

    #[test]
    fn test_complex_type_as_simple_base() {
        let err = compile(&schema(
            r#"
            <xs:complexType name="c"/>
            <xs:simpleType name="s"><xs:restriction base="c"/></xs:simpleType>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("not a simple type"));
        assert_eq!(err.name, Some(QName::local("c")));
    }

    #[test]
    fn test_extension_appends_particle_and_attributes() {
        let components = compile(&schema(
            r#"
            <xs:complexType name="base">
              <xs:sequence><xs:element name="a" type="xs:string"/></xs:sequence>
              <xs:attribute name="id" type="xs:ID" use="required"/>
            </xs:complexType>
            <xs:complexType name="derived">
              <xs:complexContent>
                <xs:extension base="base">
                  <xs:sequence><xs:element name="b" type="xs:string"/></xs:sequence>
                  <xs:attribute name="lang" type="xs:language"/>
                </xs:extension>
              </xs:complexContent>
            </xs:complexType>"#,
        ))
        .unwrap();
        let globals = &components.globals;
        let base = globals.lookup_type(&QName::local("base")).unwrap();
        let derived = globals.lookup_type(&QName::local("derived")).unwrap();
        assert!(globals.is_derived_from(derived, base));

        let complex = globals.type_def(derived).as_complex().unwrap();
        let mut names = Vec::new();
        complex
            .content
            .particle()
            .unwrap()
            .for_each_element(&mut |id| names.push(globals.element(id).name.local_name.clone()));
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(complex.attributes.attributes.len(), 2);
    }

    #[test]
    fn test_restriction_prohibits_attribute() {
        let components = compile(&schema(
            r#"
            <xs:complexType name="base">
              <xs:attribute name="x" type="xs:string"/>
              <xs:attribute name="y" type="xs:string"/>
            </xs:complexType>
            <xs:complexType name="narrow">
              <xs:complexContent>
                <xs:restriction base="base">
                  <xs:attribute name="y" use="prohibited"/>
                </xs:restriction>
              </xs:complexContent>
            </xs:complexType>"#,
        ))
        .unwrap();
        let id = components.globals.lookup_type(&QName::local("narrow")).unwrap();
        let complex = components.globals.type_def(id).as_complex().unwrap();
        assert!(complex.attributes.attributes.contains_key(&QName::local("x")));
        assert!(!complex.attributes.attributes.contains_key(&QName::local("y")));
    }

    #[test]
    fn test_simple_content_restriction() {
        let components = compile(&schema(
            r#"
            <xs:complexType name="price">
              <xs:simpleContent>
                <xs:extension base="xs:decimal">
                  <xs:attribute name="currency" type="xs:string"/>
                </xs:extension>
              </xs:simpleContent>
            </xs:complexType>
            <xs:complexType name="smallPrice">
              <xs:simpleContent>
                <xs:restriction base="price"><xs:maxExclusive value="100"/></xs:restriction>
              </xs:simpleContent>
            </xs:complexType>"#,
        ))
        .unwrap();
        let globals = &components.globals;
        let id = globals.lookup_type(&QName::local("smallPrice")).unwrap();
        let complex = globals.type_def(id).as_complex().unwrap();
        let ContentType::Simple(content) = complex.content else {
            panic!("expected simple content");
        };
        let simple = globals.simple_type(content).unwrap();
        assert!(simple.validate("99.5", None).is_ok());
        assert!(simple.validate("100", None).is_err());
        assert_eq!(complex.attributes.attributes.len(), 1);
    }

    #[test]
    fn test_complex_content_requires_derivation() {
        let err = compile(&schema(
            r#"<xs:complexType name="t">
                 <xs:complexContent><xs:sequence/></xs:complexContent>
               </xs:complexType>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("This element is not expected."));
        assert!(err.message.contains("sequence"));

        let err = compile(&schema(
            r#"<xs:complexType name="t">
                 <xs:simpleContent><xs:list itemType="xs:int"/></xs:simpleContent>
               </xs:complexType>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("This element is not expected."));
    }

    #[test]
    fn test_inconsistent_element_declarations() {
        let err = compile(&schema(
            r#"<xs:complexType name="t">
                 <xs:sequence>
                   <xs:element name="a" type="xs:int"/>
                   <xs:element name="b" type="xs:string"/>
                   <xs:element name="a" type="xs:string"/>
                 </xs:sequence>
               </xs:complexType>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("cos-element-consistent"));
        assert_eq!(err.name, Some(QName::local("a")));
        assert_eq!(err.line, 5);

        let err = compile(&schema(
            r#"<xs:group name="g">
                 <xs:choice>
                   <xs:element name="a" type="xs:int"/>
                   <xs:sequence><xs:element name="a" type="xs:date"/></xs:sequence>
                 </xs:choice>
               </xs:group>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("cos-element-consistent"));
    }

    #[test]
    fn test_consistent_element_declarations() {
        compile(&schema(
            r#"<xs:element name="a" type="xs:int"/>
               <xs:complexType name="t">
                 <xs:sequence>
                   <xs:element ref="a"/>
                   <xs:element name="b" type="xs:string"/>
                   <xs:element name="a" type="xs:int"/>
                   <xs:element ref="a" minOccurs="0"/>
                 </xs:sequence>
               </xs:complexType>"#,
        ))
        .unwrap();
    }

    fn keyed(constraints: &str) -> String {
        schema(&format!(
            r#"<xs:element name="db">
                 <xs:complexType>
                   <xs:sequence>
                     <xs:element name="row" maxOccurs="unbounded">
                       <xs:complexType>
                         <xs:attribute name="a"/>
                         <xs:attribute name="b"/>
                       </xs:complexType>
                     </xs:element>
                   </xs:sequence>
                 </xs:complexType>
                 {}
               </xs:element>"#,
            constraints
        ))
    }

    #[test]
    fn test_identity_constraints_compiled() {
        let components = compile(&keyed(
            r#"<xs:key name="k"><xs:selector xpath="row"/><xs:field xpath="@a"/></xs:key>
               <xs:keyref name="r" refer="k"><xs:selector xpath=".//row"/><xs:field xpath="@b"/></xs:keyref>"#,
        ))
        .unwrap();
        let db = components.globals.lookup_element(&QName::local("db")).unwrap();
        let identities = &components.globals.element(db).identities;
        assert_eq!(identities.len(), 2);
        assert_eq!(identities[0].kind, IdentityConstraintKind::Key);
        assert_eq!(identities[1].refer, Some(QName::local("k")));
        assert_eq!(identities[1].selector.xpath, ".//row");
    }

    #[test]
    fn test_identity_constraint_errors() {
        let err = compile(&keyed(
            r#"<xs:keyref name="r" refer="nope"><xs:selector xpath="row"/><xs:field xpath="@b"/></xs:keyref>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("non-existent key/unique 'nope'"));

        let err = compile(&keyed(
            r#"<xs:unique name="u"><xs:selector xpath="row"/><xs:field xpath="@a"/><xs:field xpath="@b"/></xs:unique>
               <xs:keyref name="r" refer="u"><xs:selector xpath="row"/><xs:field xpath="@b"/></xs:keyref>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("cardinality"));

        let err = compile(&keyed(
            r#"<xs:key name="k"><xs:selector xpath="row/@a"/><xs:field xpath="@a"/></xs:key>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("attribute 'xpath'"));

        let err = compile(&keyed(r#"<xs:key name="k"><xs:selector xpath="row"/></xs:key>"#)).unwrap_err();
        assert!(err.message.contains("Missing child element(s)"));

        let err = compile(&keyed(
            r#"<xs:key name="k"><xs:selector xpath="row"/><xs:field xpath="@a"/></xs:key>
               <xs:unique name="k"><xs:selector xpath="row"/><xs:field xpath="@b"/></xs:unique>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("does already exist"));
    }

    #[test]
    fn test_element_form_default() {
        let components = compile(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                         xmlns:t="urn:t" targetNamespace="urn:t"
                         elementFormDefault="qualified">
                 <xs:element name="root">
                   <xs:complexType>
                     <xs:sequence>
                       <xs:element name="inner" type="xs:string"/>
                       <xs:element name="plain" type="xs:string" form="unqualified"/>
                     </xs:sequence>
                   </xs:complexType>
                 </xs:element>
               </xs:schema>"#,
        )
        .unwrap();
        let globals = &components.globals;
        let root = globals.lookup_element(&QName::namespaced("urn:t", "root")).unwrap();
        let particle = globals
            .type_def(globals.element(root).type_id)
            .as_complex()
            .and_then(|c| c.content.particle())
            .cloned()
            .unwrap();
        let mut names = Vec::new();
        particle.for_each_element(&mut |id| names.push(globals.element(id).name.clone()));
        assert_eq!(
            names,
            vec![QName::namespaced("urn:t", "inner"), QName::local("plain")]
        );
        assert_eq!(components.target_namespaces, vec![Some("urn:t".to_string())]);
    }

    #[test]
    fn test_invalid_default_value() {
        let err = compile(&schema(
            r#"<xs:element name="n" type="xs:integer" default="many"/>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("'many'"));
    }

    #[test]
    fn test_import_is_not_fetched() {
        let components = compile(&schema(
            r#"<xs:import namespace="urn:other" schemaLocation="other.xsd"/>
               <xs:element name="a" type="xs:string"/>"#,
        ))
        .unwrap();
        assert_eq!(components.globals.counts().elements, 1);
    }

    #[test]
    fn test_multiple_documents() {
        let other = parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:o">
                 <xs:simpleType name="code"><xs:restriction base="xs:token"/></xs:simpleType>
               </xs:schema>"#,
        );
        let main = parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:o="urn:o">
                 <xs:import namespace="urn:o"/>
                 <xs:element name="a" type="o:code"/>
               </xs:schema>"#,
        );
        let components = compile_documents([&main, &other]).unwrap();
        let a = components.globals.lookup_element(&QName::local("a")).unwrap();
        let code = components
            .globals
            .lookup_type(&QName::namespaced("urn:o", "code"))
            .unwrap();
        assert_eq!(components.globals.element(a).type_id, code);
    }

    #[test]
    fn test_substitution_group_cycle() {
        let err = compile(&schema(
            r#"<xs:element name="a" substitutionGroup="b"/>
               <xs:element name="b" substitutionGroup="a"/>"#,
        ))
        .unwrap_err();
        assert!(err.message.contains("circular substitution group"));
    }

    #[test]
    fn test_member_inherits_head_type() {
        let components = compile(&schema(
            r#"<xs:element name="head" type="xs:int"/>
               <xs:element name="member" substitutionGroup="head"/>"#,
        ))
        .unwrap();
        let globals = &components.globals;
        let head = globals.lookup_element(&QName::local("head")).unwrap();
        let member = globals.lookup_element(&QName::local("member")).unwrap();
        assert_eq!(globals.element(member).type_id, globals.element(head).type_id);
        assert_eq!(globals.substitutes(head), &[member]);
    }
}
