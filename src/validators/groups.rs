//! XSD Model Group validators
//!
//! This module implements model groups for XSD content models:
//! - xs:sequence - ordered content
//! - xs:choice - alternative content
//! - xs:all - unordered content, elements only, each at most once
//!
//! A content model is a tree of [`Particle`]s. Element particles refer to
//! declarations in the symbol table by [`ElementId`].
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Model_Groups

use std::fmt;

use super::globals::ElementId;
use super::particles::Occurs;
use super::wildcards::Wildcard;

/// Model group compositor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelType {
    /// Ordered sequence of particles
    #[default]
    Sequence,
    /// One of multiple alternatives
    Choice,
    /// Unordered set of element particles
    All,
}

impl ModelType {
    /// Parse from element local name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sequence" => Some(Self::Sequence),
            "choice" => Some(Self::Choice),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

/// The term of a particle
#[derive(Debug, Clone)]
pub enum ParticleTerm {
    /// Element declaration
    Element(ElementId),
    /// Element wildcard (xs:any)
    Any(Wildcard),
    /// Nested model group
    Group {
        /// Compositor
        model: ModelType,
        /// Member particles in schema order
        particles: Vec<Particle>,
    },
}

/// A term with occurrence bounds
#[derive(Debug, Clone)]
pub struct Particle {
    /// minOccurs / maxOccurs
    pub occurs: Occurs,
    /// What the particle matches
    pub term: ParticleTerm,
}

impl Particle {
    /// Element particle
    pub fn element(id: ElementId, occurs: Occurs) -> Self {
        Self {
            occurs,
            term: ParticleTerm::Element(id),
        }
    }

    /// Wildcard particle
    pub fn any(wildcard: Wildcard, occurs: Occurs) -> Self {
        Self {
            occurs,
            term: ParticleTerm::Any(wildcard),
        }
    }

    /// Model group particle
    pub fn group(model: ModelType, particles: Vec<Particle>, occurs: Occurs) -> Self {
        Self {
            occurs,
            term: ParticleTerm::Group { model, particles },
        }
    }

    /// An empty sequence, matching only the empty child list
    pub fn empty_sequence() -> Self {
        Self::group(ModelType::Sequence, Vec::new(), Occurs::once())
    }

    /// Model type, for group particles
    pub fn model(&self) -> Option<ModelType> {
        match self.term {
            ParticleTerm::Group { model, .. } => Some(model),
            _ => None,
        }
    }

    /// Whether the particle can match the empty child list
    pub fn is_emptiable(&self) -> bool {
        self.occurs.is_emptiable() || self.occurs.is_empty() || self.term_is_emptiable()
    }

    fn term_is_emptiable(&self) -> bool {
        match &self.term {
            ParticleTerm::Element(_) | ParticleTerm::Any(_) => false,
            ParticleTerm::Group { model, particles } => match model {
                ModelType::Sequence | ModelType::All => {
                    particles.iter().all(Particle::is_emptiable)
                }
                ModelType::Choice => {
                    particles.is_empty() || particles.iter().any(Particle::is_emptiable)
                }
            },
        }
    }

    /// Whether the particle can never match an element
    pub fn is_empty(&self) -> bool {
        if self.occurs.is_empty() {
            return true;
        }
        match &self.term {
            ParticleTerm::Element(_) | ParticleTerm::Any(_) => false,
            ParticleTerm::Group { particles, .. } => particles.iter().all(Particle::is_empty),
        }
    }

    /// Visit every element declaration referenced in this particle tree
    pub fn for_each_element(&self, f: &mut impl FnMut(ElementId)) {
        match &self.term {
            ParticleTerm::Element(id) => f(*id),
            ParticleTerm::Any(_) => {}
            ParticleTerm::Group { particles, .. } => {
                for particle in particles {
                    particle.for_each_element(f);
                }
            }
        }
    }
}
