//! XSD Content Model matching
//!
//! A content model is a regular expression over child element names. The
//! [`ModelVisitor`] simulates it as a set of reachable end positions: for a
//! particle and a start index into the child list it computes every index at
//! which a match of that particle can end. Results are memoized per
//! (particle, start) and repetition is a reachability search over
//! (position, count) states, so nested optional and unbounded groups stay
//! polynomial in the number of children.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cvc-model-group

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use crate::namespaces::QName;

use super::globals::{ElementId, XsdGlobals};
use super::groups::{ModelType, Particle, ParticleTerm};
use super::wildcards::Wildcard;

type Positions = BTreeSet<usize>;

/// Why a child sequence does not match its content model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// The child at `index` cannot continue any match
    NotExpected {
        /// Index of the offending child
        index: usize,
        /// Names that could have appeared instead
        expected: Vec<String>,
    },
    /// The child at `index` repeats a particle already at its maxOccurs
    TooMany {
        /// Index of the offending child
        index: usize,
        /// The particle's maxOccurs
        max: u32,
    },
    /// Every child matched but the model needs more
    Missing {
        /// Names that could complete the match
        expected: Vec<String>,
    },
}

impl ContentError {
    /// Index of the child the error is attached to, None for missing content
    pub fn child_index(&self) -> Option<usize> {
        match self {
            ContentError::NotExpected { index, .. } | ContentError::TooMany { index, .. } => {
                Some(*index)
            }
            ContentError::Missing { .. } => None,
        }
    }

    /// libxml2-style message text, without the element prefix
    pub fn message(&self) -> String {
        match self {
            ContentError::NotExpected { expected, .. } if expected.is_empty() => {
                "This element is not expected.".to_string()
            }
            ContentError::NotExpected { expected, .. } => format!(
                "This element is not expected. Expected is ( {} ).",
                expected.join(", ")
            ),
            ContentError::TooMany { max, .. } => format!(
                "This element is not expected. Maximum number of occurrences ({}) exceeded.",
                max
            ),
            ContentError::Missing { expected } if expected.is_empty() => {
                "Missing child element(s).".to_string()
            }
            ContentError::Missing { expected } => format!(
                "Missing child element(s). Expected is ( {} ).",
                expected.join(", ")
            ),
        }
    }
}

/// The matcher exceeded its state budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLimitExceeded {
    /// The configured budget
    pub limit: usize,
}

impl fmt::Display for StateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "content model matching exceeded the limit of {} states",
            self.limit
        )
    }
}

/// Declaration governing a child element
#[derive(Debug, Clone, Copy)]
pub enum ChildDeclaration<'a> {
    /// Matched by an element particle (or a member of its substitution group)
    Element(ElementId),
    /// Matched by a wildcard particle
    Wildcard(&'a Wildcard),
}

/// Check whether an element particle accepts `name`, returning the matching
/// declaration: the particle's own, or a substitution group member's
pub fn match_element(globals: &XsdGlobals, id: ElementId, name: &QName) -> Option<ElementId> {
    let decl = globals.element(id);
    if decl.name == *name && !decl.is_abstract {
        return Some(id);
    }
    globals
        .substitutes(id)
        .iter()
        .copied()
        .find(|member| {
            let member_decl = globals.element(*member);
            member_decl.name == *name && !member_decl.is_abstract
        })
}

/// Find the declaration a child named `name` is validated against
///
/// Element particles take precedence over wildcards; within each kind the
/// first particle in schema order wins. Element Declarations Consistent
/// guarantees that same-named particles in one model share a type, so the
/// choice does not depend on where in the model the child matched.
pub fn find_child_declaration<'a>(
    globals: &XsdGlobals,
    particle: &'a Particle,
    name: &QName,
) -> Option<ChildDeclaration<'a>> {
    fn find_element(globals: &XsdGlobals, particle: &Particle, name: &QName) -> Option<ElementId> {
        match &particle.term {
            ParticleTerm::Element(id) => match_element(globals, *id, name),
            ParticleTerm::Any(_) => None,
            ParticleTerm::Group { particles, .. } => particles
                .iter()
                .find_map(|p| find_element(globals, p, name)),
        }
    }

    fn find_wildcard<'a>(particle: &'a Particle, name: &QName) -> Option<&'a Wildcard> {
        match &particle.term {
            ParticleTerm::Element(_) => None,
            ParticleTerm::Any(w) => w.matches(name).then_some(w),
            ParticleTerm::Group { particles, .. } => {
                particles.iter().find_map(|p| find_wildcard(p, name))
            }
        }
    }

    if let Some(id) = find_element(globals, particle, name) {
        return Some(ChildDeclaration::Element(id));
    }
    find_wildcard(particle, name).map(ChildDeclaration::Wildcard)
}

/// Content model matcher for one element's children
pub struct ModelVisitor<'a> {
    globals: &'a XsdGlobals,
    children: &'a [&'a QName],
    max_states: usize,
    states: usize,
    particle_memo: HashMap<(usize, usize), Positions>,
    term_memo: HashMap<(usize, usize), Positions>,
    /// Longest prefix of the children that some partial match consumed
    reached: usize,
    /// Names tried at each position, in first-attempt order
    attempted: HashMap<usize, Vec<String>>,
    /// maxOccurs of a leaf particle that would have matched at a position
    over_max: HashMap<usize, u32>,
}

impl<'a> ModelVisitor<'a> {
    /// Create a matcher over the given child names
    pub fn new(globals: &'a XsdGlobals, children: &'a [&'a QName], max_states: usize) -> Self {
        Self {
            globals,
            children,
            max_states,
            states: 0,
            particle_memo: HashMap::new(),
            term_memo: HashMap::new(),
            reached: 0,
            attempted: HashMap::new(),
            over_max: HashMap::new(),
        }
    }

    /// Match the children against a content model
    ///
    /// Returns Ok(None) when the whole child list matches, Ok(Some(error))
    /// describing the first failure otherwise.
    pub fn check(mut self, root: &Particle) -> Result<Option<ContentError>, StateLimitExceeded> {
        let n = self.children.len();
        let ends = self.particle_ends(root, 0)?;
        if ends.contains(&n) {
            return Ok(None);
        }

        let error = if self.reached < n {
            let index = self.reached;
            match self.over_max.get(&index) {
                Some(max) => ContentError::TooMany { index, max: *max },
                None => ContentError::NotExpected {
                    index,
                    expected: self.attempted.remove(&index).unwrap_or_default(),
                },
            }
        } else {
            ContentError::Missing {
                expected: self.attempted.remove(&n).unwrap_or_default(),
            }
        };
        Ok(Some(error))
    }

    fn bump(&mut self) -> Result<(), StateLimitExceeded> {
        self.states += 1;
        if self.states > self.max_states {
            Err(StateLimitExceeded {
                limit: self.max_states,
            })
        } else {
            Ok(())
        }
    }

    fn attempt(&mut self, pos: usize, label: String) {
        let names = self.attempted.entry(pos).or_default();
        if !names.contains(&label) {
            names.push(label);
        }
    }

    fn consumed(&mut self, end: usize) {
        self.reached = self.reached.max(end);
    }

    /// End positions of a particle, honoring its occurrence bounds
    fn particle_ends(&mut self, particle: &Particle, start: usize) -> Result<Positions, StateLimitExceeded> {
        let key = (particle as *const Particle as usize, start);
        if let Some(ends) = self.particle_memo.get(&key) {
            return Ok(ends.clone());
        }
        self.bump()?;

        let ends = if particle.occurs.is_empty() {
            Positions::from([start])
        } else {
            self.repeat(particle, start)?
        };

        self.particle_memo.insert(key, ends.clone());
        Ok(ends)
    }

    fn repeat(&mut self, particle: &Particle, start: usize) -> Result<Positions, StateLimitExceeded> {
        let min = particle.occurs.min;
        let max = particle.occurs.max;

        let mut result = Positions::new();
        let mut seen: HashSet<(usize, u32)> = HashSet::from([(start, 0)]);
        let mut queue = VecDeque::from([(start, 0u32)]);

        while let Some((pos, count)) = queue.pop_front() {
            if max.is_some_and(|m| count >= m) {
                result.insert(pos);
                self.note_over_max(particle, pos);
                continue;
            }

            let ends = self.term_ends(&particle.term, pos)?;
            // Missing iterations up to minOccurs may match empty content
            if count >= min || ends.contains(&pos) {
                result.insert(pos);
            }

            for end in ends.into_iter().filter(|e| *e > pos) {
                let next = match max {
                    Some(_) => count + 1,
                    // Counts past minOccurs are equivalent when unbounded
                    None => (count + 1).min(min),
                };
                if seen.insert((end, next)) {
                    self.bump()?;
                    queue.push_back((end, next));
                }
            }
        }

        Ok(result)
    }

    fn note_over_max(&mut self, particle: &Particle, pos: usize) {
        let (Some(max), Some(child)) = (particle.occurs.max, self.children.get(pos)) else {
            return;
        };
        let matches = match &particle.term {
            ParticleTerm::Element(id) => match_element(self.globals, *id, child).is_some(),
            ParticleTerm::Any(w) => w.matches(child),
            ParticleTerm::Group { .. } => false,
        };
        if matches {
            self.over_max.entry(pos).or_insert(max);
        }
    }

    /// End positions of a single occurrence of a term
    fn term_ends(&mut self, term: &ParticleTerm, pos: usize) -> Result<Positions, StateLimitExceeded> {
        match term {
            ParticleTerm::Element(id) => {
                let label = self.globals.element(*id).name.to_string();
                self.attempt(pos, label);
                let matched = self
                    .children
                    .get(pos)
                    .is_some_and(|child| match_element(self.globals, *id, child).is_some());
                Ok(self.leaf_result(matched, pos))
            }
            ParticleTerm::Any(wildcard) => {
                self.attempt(pos, wildcard.describe());
                let matched = self.children.get(pos).is_some_and(|child| wildcard.matches(child));
                Ok(self.leaf_result(matched, pos))
            }
            ParticleTerm::Group { model, particles } => {
                let key = (term as *const ParticleTerm as usize, pos);
                if let Some(ends) = self.term_memo.get(&key) {
                    return Ok(ends.clone());
                }
                self.bump()?;

                let ends = match model {
                    ModelType::Sequence => self.sequence_ends(particles, pos)?,
                    ModelType::Choice => self.choice_ends(particles, pos)?,
                    ModelType::All => self.all_ends(particles, pos)?,
                };

                self.term_memo.insert(key, ends.clone());
                Ok(ends)
            }
        }
    }

    fn leaf_result(&mut self, matched: bool, pos: usize) -> Positions {
        if matched {
            self.consumed(pos + 1);
            Positions::from([pos + 1])
        } else {
            Positions::new()
        }
    }

    fn sequence_ends(&mut self, particles: &[Particle], pos: usize) -> Result<Positions, StateLimitExceeded> {
        let mut current = Positions::from([pos]);
        for particle in particles {
            let mut next = Positions::new();
            for start in current {
                next.extend(self.particle_ends(particle, start)?);
            }
            if next.is_empty() {
                return Ok(next);
            }
            current = next;
        }
        Ok(current)
    }

    fn choice_ends(&mut self, particles: &[Particle], pos: usize) -> Result<Positions, StateLimitExceeded> {
        if particles.is_empty() {
            return Ok(Positions::from([pos]));
        }
        let mut ends = Positions::new();
        for particle in particles {
            ends.extend(self.particle_ends(particle, pos)?);
        }
        Ok(ends)
    }

    /// `all`: every member at most once, in any order, required ones present
    fn all_ends(&mut self, particles: &[Particle], pos: usize) -> Result<Positions, StateLimitExceeded> {
        let mut ends = Positions::new();
        let initial = (pos, vec![false; particles.len()]);
        let mut seen: HashSet<(usize, Vec<bool>)> = HashSet::from([initial.clone()]);
        let mut queue = VecDeque::from([initial]);

        while let Some((at, used)) = queue.pop_front() {
            let complete = particles
                .iter()
                .zip(&used)
                .all(|(p, u)| *u || p.is_emptiable());
            if complete {
                ends.insert(at);
            }

            for (i, particle) in particles.iter().enumerate() {
                if used[i] || particle.occurs.is_empty() {
                    continue;
                }
                let member_ends = self.term_ends(&particle.term, at)?;
                for end in member_ends.into_iter().filter(|e| *e > at) {
                    let mut next_used = used.clone();
                    next_used[i] = true;
                    let state = (end, next_used);
                    if !seen.contains(&state) {
                        self.bump()?;
                        seen.insert(state.clone());
                        queue.push_back(state);
                    }
                }
            }
        }

        Ok(ends)
    }
}
