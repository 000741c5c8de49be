//! Global XSD declarations management
//!
//! [`XsdGlobals`] is the symbol table of a compiled schema. Type definitions
//! and element declarations live in arenas addressed by [`TypeId`] and
//! [`ElementId`], so recursive content models refer to declarations by index.
//! Named components are indexed by expanded name in registration order.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::namespaces::QName;
use crate::XSD_NAMESPACE;

use super::attributes::{AttributeDecl, AttributeGroup};
use super::builtins::BuiltinType;
use super::complex_types::{ComplexType, ContentType, DerivationMethod};
use super::elements::ElementDecl;
use super::facets::FacetSet;
use super::groups::{ModelType, Particle};
use super::particles::Occurs;
use super::simple_types::SimpleType;
use super::wildcards::Wildcard;

/// Index of a type definition in the symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub usize);

/// Index of an element declaration in the symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// Simple or complex
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Simple type definition
    Simple(SimpleType),
    /// Complex type definition
    Complex(ComplexType),
}

/// A type definition
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    /// Name for global types, None for anonymous ones
    pub name: Option<QName>,
    /// Base type; None only for xs:anyType
    pub base: Option<TypeId>,
    /// How this type was derived from its base
    pub derivation: DerivationMethod,
    /// Whether elements may not use this type directly
    pub is_abstract: bool,
    /// Definition body
    pub kind: TypeKind,
}

impl TypeDefinition {
    /// A simple type definition derived by restriction
    pub fn simple(name: Option<QName>, base: Option<TypeId>, simple: SimpleType) -> Self {
        Self {
            name,
            base,
            derivation: DerivationMethod::Restriction,
            is_abstract: false,
            kind: TypeKind::Simple(simple),
        }
    }

    /// A complex type definition
    pub fn complex(
        name: Option<QName>,
        base: Option<TypeId>,
        derivation: DerivationMethod,
        complex: ComplexType,
    ) -> Self {
        Self {
            name,
            base,
            derivation,
            is_abstract: false,
            kind: TypeKind::Complex(complex),
        }
    }

    /// Check if this is a simple type
    pub fn is_simple(&self) -> bool {
        matches!(self.kind, TypeKind::Simple(_))
    }

    /// Check if this is a complex type
    pub fn is_complex(&self) -> bool {
        matches!(self.kind, TypeKind::Complex(_))
    }

    /// Get as a simple type
    pub fn as_simple(&self) -> Option<&SimpleType> {
        match &self.kind {
            TypeKind::Simple(s) => Some(s),
            TypeKind::Complex(_) => None,
        }
    }

    /// Get as a complex type
    pub fn as_complex(&self) -> Option<&ComplexType> {
        match &self.kind {
            TypeKind::Complex(c) => Some(c),
            TypeKind::Simple(_) => None,
        }
    }
}

/// Counts of the user-declared global components
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentCounts {
    /// Named simple and complex types
    pub types: usize,
    /// Global element declarations
    pub elements: usize,
    /// Global attribute declarations
    pub attributes: usize,
    /// Named model groups
    pub groups: usize,
    /// Named attribute groups
    pub attribute_groups: usize,
}

/// The symbol table of a compiled schema
#[derive(Debug, Clone)]
pub struct XsdGlobals {
    types: Vec<TypeDefinition>,
    elements: Vec<ElementDecl>,
    type_names: IndexMap<QName, TypeId>,
    element_names: IndexMap<QName, ElementId>,
    attributes: IndexMap<QName, AttributeDecl>,
    groups: IndexMap<QName, Particle>,
    attribute_groups: IndexMap<QName, AttributeGroup>,
    substitutes: HashMap<ElementId, Vec<ElementId>>,
    builtin_count: usize,
    any_type: TypeId,
    any_simple_type: TypeId,
}

impl Default for XsdGlobals {
    fn default() -> Self {
        Self::new()
    }
}

impl XsdGlobals {
    /// Create a symbol table holding only the built-in types
    pub fn new() -> Self {
        let mut globals = Self {
            types: Vec::new(),
            elements: Vec::new(),
            type_names: IndexMap::new(),
            element_names: IndexMap::new(),
            attributes: IndexMap::new(),
            groups: IndexMap::new(),
            attribute_groups: IndexMap::new(),
            substitutes: HashMap::new(),
            builtin_count: 0,
            any_type: TypeId(0),
            any_simple_type: TypeId(0),
        };
        globals.register_builtins();
        globals
    }

    fn register_builtins(&mut self) {
        let mut any_type = ComplexType::new(ContentType::Mixed(Particle::group(
            ModelType::Sequence,
            vec![Particle::any(Wildcard::any_lax(), Occurs::zero_or_more())],
            Occurs::once(),
        )));
        any_type.attributes.wildcard = Some(Wildcard::any_lax());
        self.any_type = self.add_named_builtin(
            "anyType",
            TypeDefinition::complex(None, None, DerivationMethod::Restriction, any_type),
        );

        for builtin in BuiltinType::ALL {
            let base = match builtin.base() {
                Some(b) => self.builtin_id(b),
                None => Some(self.any_type),
            };
            let id = self.add_named_builtin(
                builtin.name(),
                TypeDefinition::simple(None, base, SimpleType::atomic(*builtin)),
            );
            if *builtin == BuiltinType::AnySimpleType {
                self.any_simple_type = id;
            }
        }

        for (name, item) in [
            ("NMTOKENS", BuiltinType::NmToken),
            ("IDREFS", BuiltinType::IdRef),
            ("ENTITIES", BuiltinType::Entity),
        ] {
            let definition = TypeDefinition::simple(
                None,
                Some(self.any_simple_type),
                SimpleType::list(SimpleType::atomic(item)).restrict(FacetSet {
                    min_length: Some(1),
                    ..Default::default()
                }),
            );
            self.add_named_builtin(name, definition);
        }

        self.builtin_count = self.types.len();
    }

    fn add_named_builtin(&mut self, local: &str, mut definition: TypeDefinition) -> TypeId {
        let name = QName::namespaced(XSD_NAMESPACE, local);
        definition.name = Some(name.clone());
        let id = self.add_type(definition);
        self.type_names.insert(name, id);
        id
    }

    fn builtin_id(&self, builtin: BuiltinType) -> Option<TypeId> {
        self.type_names
            .get(&QName::namespaced(XSD_NAMESPACE, builtin.name()))
            .copied()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Add a type definition to the arena
    pub fn add_type(&mut self, definition: TypeDefinition) -> TypeId {
        self.types.push(definition);
        TypeId(self.types.len() - 1)
    }

    /// Replace a type definition, used to fill a reserved slot
    pub fn set_type(&mut self, id: TypeId, definition: TypeDefinition) {
        self.types[id.0] = definition;
    }

    /// Bind a global type name; returns false when the name is taken
    pub fn register_type_name(&mut self, name: QName, id: TypeId) -> bool {
        if self.type_names.contains_key(&name) {
            return false;
        }
        self.type_names.insert(name, id);
        true
    }

    /// Add an element declaration to the arena
    pub fn add_element(&mut self, decl: ElementDecl) -> ElementId {
        self.elements.push(decl);
        ElementId(self.elements.len() - 1)
    }

    /// Replace an element declaration, used to fill a reserved slot
    pub fn set_element(&mut self, id: ElementId, decl: ElementDecl) {
        self.elements[id.0] = decl;
    }

    /// Bind a global element name; returns false when the name is taken
    pub fn register_element_name(&mut self, name: QName, id: ElementId) -> bool {
        if self.element_names.contains_key(&name) {
            return false;
        }
        self.element_names.insert(name, id);
        true
    }

    /// Register a global attribute declaration
    pub fn register_attribute(&mut self, decl: AttributeDecl) {
        self.attributes.insert(decl.name.clone(), decl);
    }

    /// Register a named model group
    pub fn register_group(&mut self, name: QName, particle: Particle) {
        self.groups.insert(name, particle);
    }

    /// Register a named attribute group
    pub fn register_attribute_group(&mut self, name: QName, group: AttributeGroup) {
        self.attribute_groups.insert(name, group);
    }

    /// Compute the transitive substitution group members of every head
    pub fn build_substitution_groups(&mut self) {
        let mut substitutes: HashMap<ElementId, Vec<ElementId>> = HashMap::new();
        for (index, decl) in self.elements.iter().enumerate() {
            let member = ElementId(index);
            let mut head = decl.substitution_group;
            let mut hops = 0;
            while let Some(h) = head {
                // Heads form a chain; a cycle is rejected by the compiler
                if h == member || hops > self.elements.len() {
                    break;
                }
                substitutes.entry(h).or_default().push(member);
                head = self.elements[h.0].substitution_group;
                hops += 1;
            }
        }
        self.substitutes = substitutes;
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Look up a global type by name
    pub fn lookup_type(&self, name: &QName) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    /// Look up a global element by name
    pub fn lookup_element(&self, name: &QName) -> Option<ElementId> {
        self.element_names.get(name).copied()
    }

    /// Look up a global attribute by name
    pub fn lookup_attribute(&self, name: &QName) -> Option<&AttributeDecl> {
        self.attributes.get(name)
    }

    /// Look up a named model group
    pub fn lookup_group(&self, name: &QName) -> Option<&Particle> {
        self.groups.get(name)
    }

    /// Look up a named attribute group
    pub fn lookup_attribute_group(&self, name: &QName) -> Option<&AttributeGroup> {
        self.attribute_groups.get(name)
    }

    /// Get a type definition
    pub fn type_def(&self, id: TypeId) -> &TypeDefinition {
        &self.types[id.0]
    }

    /// Get an element declaration
    pub fn element(&self, id: ElementId) -> &ElementDecl {
        &self.elements[id.0]
    }

    /// Get the simple type of a type id, if it is simple
    pub fn simple_type(&self, id: TypeId) -> Option<&SimpleType> {
        self.type_def(id).as_simple()
    }

    /// xs:anyType
    pub fn any_type(&self) -> TypeId {
        self.any_type
    }

    /// xs:anySimpleType
    pub fn any_simple_type(&self) -> TypeId {
        self.any_simple_type
    }

    /// A built-in type by local name
    pub fn builtin(&self, local: &str) -> Option<TypeId> {
        self.lookup_type(&QName::namespaced(XSD_NAMESPACE, local))
    }

    /// Whether a type id belongs to a built-in type
    pub fn is_builtin(&self, id: TypeId) -> bool {
        id.0 < self.builtin_count
    }

    /// Name of a type for diagnostics: `xs:local` for built-ins, `{ns}local`
    /// for user types, None for anonymous types
    pub fn type_label(&self, id: TypeId) -> Option<String> {
        let name = self.type_def(id).name.as_ref()?;
        if name.is_in(Some(XSD_NAMESPACE)) {
            Some(format!("xs:{}", name.local_name))
        } else {
            Some(name.to_string())
        }
    }

    /// Whether `derived` equals `base` or reaches it through base links
    pub fn is_derived_from(&self, derived: TypeId, base: TypeId) -> bool {
        if base == self.any_type {
            return true;
        }
        let mut current = Some(derived);
        let mut hops = 0;
        while let Some(id) = current {
            if id == base {
                return true;
            }
            if hops > self.types.len() {
                return false;
            }
            current = self.type_def(id).base;
            hops += 1;
        }
        false
    }

    /// Members of a head's substitution group, transitively
    pub fn substitutes(&self, head: ElementId) -> &[ElementId] {
        self.substitutes.get(&head).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Global element declarations in registration order
    pub fn global_elements(&self) -> impl Iterator<Item = (&QName, ElementId)> {
        self.element_names.iter().map(|(k, v)| (k, *v))
    }

    /// Counts of user-declared global components
    pub fn counts(&self) -> ComponentCounts {
        ComponentCounts {
            types: self
                .type_names
                .values()
                .filter(|id| !self.is_builtin(**id))
                .count(),
            elements: self.element_names.len(),
            attributes: self.attributes.len(),
            groups: self.groups.len(),
            attribute_groups: self.attribute_groups.len(),
        }
    }
}
