//! XSD constraining facets
//!
//! This module implements XSD facets that constrain simple types. A
//! [`FacetSet`] accumulates the facets of every restriction step of a simple
//! type; [`FacetSet::restrict`] layers a derived step onto its base.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;

use crate::names::{NC_NAME_CHAR_CLASS, NC_NAME_START_CLASS};

use super::builtins::XsdValue;

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "preserve" => Some(WhiteSpace::Preserve),
            "replace" => Some(WhiteSpace::Replace),
            "collapse" => Some(WhiteSpace::Collapse),
            _ => None,
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => s
                .split([' ', '\t', '\n', '\r'])
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl fmt::Display for WhiteSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhiteSpace::Preserve => write!(f, "preserve"),
            WhiteSpace::Replace => write!(f, "replace"),
            WhiteSpace::Collapse => write!(f, "collapse"),
        }
    }
}

/// Facet kinds recognised in `xs:restriction`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    /// length
    Length,
    /// minLength
    MinLength,
    /// maxLength
    MaxLength,
    /// pattern
    Pattern,
    /// enumeration
    Enumeration,
    /// whiteSpace
    WhiteSpace,
    /// maxInclusive
    MaxInclusive,
    /// maxExclusive
    MaxExclusive,
    /// minInclusive
    MinInclusive,
    /// minExclusive
    MinExclusive,
    /// totalDigits
    TotalDigits,
    /// fractionDigits
    FractionDigits,
}

impl FacetKind {
    /// Look up a facet by its element local name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "length" => Self::Length,
            "minLength" => Self::MinLength,
            "maxLength" => Self::MaxLength,
            "pattern" => Self::Pattern,
            "enumeration" => Self::Enumeration,
            "whiteSpace" => Self::WhiteSpace,
            "maxInclusive" => Self::MaxInclusive,
            "maxExclusive" => Self::MaxExclusive,
            "minInclusive" => Self::MinInclusive,
            "minExclusive" => Self::MinExclusive,
            "totalDigits" => Self::TotalDigits,
            "fractionDigits" => Self::FractionDigits,
            _ => return None,
        })
    }

    /// Facet element local name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::Pattern => "pattern",
            Self::Enumeration => "enumeration",
            Self::WhiteSpace => "whiteSpace",
            Self::MaxInclusive => "maxInclusive",
            Self::MaxExclusive => "maxExclusive",
            Self::MinInclusive => "minInclusive",
            Self::MinExclusive => "minExclusive",
            Self::TotalDigits => "totalDigits",
            Self::FractionDigits => "fractionDigits",
        }
    }
}

/// Facets admitted for string-like and binary types
pub const STRING_FACETS: &[FacetKind] = &[
    FacetKind::Length,
    FacetKind::MinLength,
    FacetKind::MaxLength,
    FacetKind::Pattern,
    FacetKind::Enumeration,
    FacetKind::WhiteSpace,
];

/// Facets admitted for boolean type
pub const BOOLEAN_FACETS: &[FacetKind] = &[FacetKind::Pattern, FacetKind::WhiteSpace];

/// Facets admitted for float, double, duration and date/time types
pub const ORDERED_FACETS: &[FacetKind] = &[
    FacetKind::Pattern,
    FacetKind::Enumeration,
    FacetKind::WhiteSpace,
    FacetKind::MaxInclusive,
    FacetKind::MaxExclusive,
    FacetKind::MinInclusive,
    FacetKind::MinExclusive,
];

/// Facets admitted for decimal types
pub const DECIMAL_FACETS: &[FacetKind] = &[
    FacetKind::TotalDigits,
    FacetKind::FractionDigits,
    FacetKind::Pattern,
    FacetKind::Enumeration,
    FacetKind::WhiteSpace,
    FacetKind::MaxInclusive,
    FacetKind::MaxExclusive,
    FacetKind::MinInclusive,
    FacetKind::MinExclusive,
];

/// Facets admitted for union types
pub const UNION_FACETS: &[FacetKind] = &[FacetKind::Pattern, FacetKind::Enumeration];

/// Translate an XSD regular expression into an anchored `regex` pattern.
///
/// XSD patterns are implicitly anchored, treat `^` and `$` as literals,
/// exclude CR as well as LF from `.`, spell class subtraction `[a-z-[aeiou]]`
/// and add the `\i`/`\c` name-character escapes.
pub fn translate_pattern(pattern: &str) -> Result<String, String> {
    let mut out = String::with_capacity(pattern.len() + 16);
    out.push_str("^(?:");

    let mut chars = pattern.chars().peekable();
    let mut class_depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| "pattern ends with a lone backslash".to_string())?;
                match (escaped, class_depth > 0) {
                    ('i', false) => out.push_str(&format!("[:{}]", NC_NAME_START_CLASS)),
                    ('c', false) => out.push_str(&format!("[:{}]", NC_NAME_CHAR_CLASS)),
                    ('I', false) => out.push_str(&format!("[^:{}]", NC_NAME_START_CLASS)),
                    ('C', false) => out.push_str(&format!("[^:{}]", NC_NAME_CHAR_CLASS)),
                    ('i', true) => out.push_str(&format!(":{}", NC_NAME_START_CLASS)),
                    ('c', true) => out.push_str(&format!(":{}", NC_NAME_CHAR_CLASS)),
                    ('I' | 'C', true) => {
                        return Err(format!(
                            "negated escape '\\{}' inside a character class is not supported",
                            escaped
                        ))
                    }
                    (other, _) => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '[' => {
                class_depth += 1;
                out.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    out.push('^');
                }
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(']');
            }
            '-' if class_depth > 0 && chars.peek() == Some(&'[') => {
                // class subtraction
                out.push_str("--");
            }
            '^' | '$' if class_depth == 0 => {
                out.push('\\');
                out.push(c);
            }
            '.' if class_depth == 0 => out.push_str(r"[^\n\r]"),
            '&' | '~' if class_depth > 0 => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }

    if class_depth > 0 {
        return Err("unterminated character class".to_string());
    }

    out.push_str(")$");
    Ok(out)
}

/// Pattern facet using regular expressions
#[derive(Debug, Clone)]
pub struct PatternFacet {
    /// Regular expression as written in the schema
    pub pattern: String,
    /// Compiled regex
    regex: Regex,
}

impl PatternFacet {
    /// Compile an XSD pattern
    pub fn new(pattern: &str) -> Result<Self, String> {
        let translated = translate_pattern(pattern)?;
        let regex = Regex::new(&translated)
            .map_err(|e| format!("invalid pattern '{}': {}", pattern, e))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Check whether a value matches this pattern
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// One enumeration literal with its value-space image
#[derive(Debug, Clone)]
pub struct EnumValue {
    /// Literal as written in the schema
    pub literal: String,
    /// Parsed value for atomic types, None for list and union types
    pub value: Option<XsdValue>,
}

/// A range facet bound
#[derive(Debug, Clone)]
pub struct Bound {
    /// Literal as written in the schema
    pub literal: String,
    /// Parsed value
    pub value: XsdValue,
}

/// The accumulated facets of a simple type
#[derive(Debug, Clone, Default)]
pub struct FacetSet {
    /// whiteSpace
    pub white_space: Option<WhiteSpace>,
    /// Enumeration of the most derived step that declares one
    pub enumeration: Option<Vec<EnumValue>>,
    /// Pattern levels: alternatives ORed within a level, levels ANDed
    pub patterns: Vec<Vec<PatternFacet>>,
    /// minInclusive
    pub min_inclusive: Option<Bound>,
    /// maxInclusive
    pub max_inclusive: Option<Bound>,
    /// minExclusive
    pub min_exclusive: Option<Bound>,
    /// maxExclusive
    pub max_exclusive: Option<Bound>,
    /// length
    pub length: Option<usize>,
    /// minLength
    pub min_length: Option<usize>,
    /// maxLength
    pub max_length: Option<usize>,
    /// totalDigits
    pub total_digits: Option<u32>,
    /// fractionDigits
    pub fraction_digits: Option<u32>,
}

impl FacetSet {
    /// Create an empty facet set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no facet is set
    pub fn is_empty(&self) -> bool {
        self.white_space.is_none()
            && self.enumeration.is_none()
            && self.patterns.is_empty()
            && self.min_inclusive.is_none()
            && self.max_inclusive.is_none()
            && self.min_exclusive.is_none()
            && self.max_exclusive.is_none()
            && self.length.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.total_digits.is_none()
            && self.fraction_digits.is_none()
    }

    /// Layer a derived restriction step on top of this (base) facet set
    pub fn restrict(&self, derived: FacetSet) -> FacetSet {
        let mut result = self.clone();
        if derived.white_space.is_some() {
            result.white_space = derived.white_space;
        }
        if derived.enumeration.is_some() {
            result.enumeration = derived.enumeration;
        }
        result.patterns.extend(derived.patterns);
        // An inclusive and an exclusive bound on the same side exclude each other
        if derived.min_inclusive.is_some() {
            result.min_inclusive = derived.min_inclusive;
            result.min_exclusive = None;
        }
        if derived.min_exclusive.is_some() {
            result.min_exclusive = derived.min_exclusive;
            result.min_inclusive = None;
        }
        if derived.max_inclusive.is_some() {
            result.max_inclusive = derived.max_inclusive;
            result.max_exclusive = None;
        }
        if derived.max_exclusive.is_some() {
            result.max_exclusive = derived.max_exclusive;
            result.max_inclusive = None;
        }
        result.length = derived.length.or(result.length);
        result.min_length = derived.min_length.or(result.min_length);
        result.max_length = derived.max_length.or(result.max_length);
        result.total_digits = derived.total_digits.or(result.total_digits);
        result.fraction_digits = derived.fraction_digits.or(result.fraction_digits);
        result
    }

    /// Enumeration check, in value space when a parsed value is available
    pub fn check_enumeration(&self, lexical: &str, value: Option<&XsdValue>) -> Result<(), String> {
        let Some(ref allowed) = self.enumeration else {
            return Ok(());
        };
        let found = allowed.iter().any(|e| match (value, &e.value) {
            (Some(v), Some(ev)) => v == ev,
            _ => e.literal == lexical,
        });
        if found {
            return Ok(());
        }
        let set = allowed
            .iter()
            .map(|e| format!("'{}'", e.literal))
            .collect::<Vec<_>>()
            .join(", ");
        Err(format!(
            "[facet 'enumeration'] The value '{}' is not an element of the set {{{}}}.",
            lexical, set
        ))
    }

    /// Range checks in value space
    pub fn check_range(&self, lexical: &str, value: &XsdValue) -> Result<(), String> {
        if let Some(ref b) = self.min_inclusive {
            if !matches!(value.compare(&b.value), Some(Ordering::Greater | Ordering::Equal)) {
                return Err(format!(
                    "[facet 'minInclusive'] The value '{}' is less than the minimum value allowed ('{}').",
                    lexical, b.literal
                ));
            }
        }
        if let Some(ref b) = self.max_inclusive {
            if !matches!(value.compare(&b.value), Some(Ordering::Less | Ordering::Equal)) {
                return Err(format!(
                    "[facet 'maxInclusive'] The value '{}' is greater than the maximum value allowed ('{}').",
                    lexical, b.literal
                ));
            }
        }
        if let Some(ref b) = self.min_exclusive {
            if value.compare(&b.value) != Some(Ordering::Greater) {
                return Err(format!(
                    "[facet 'minExclusive'] The value '{}' must be greater than '{}'.",
                    lexical, b.literal
                ));
            }
        }
        if let Some(ref b) = self.max_exclusive {
            if value.compare(&b.value) != Some(Ordering::Less) {
                return Err(format!(
                    "[facet 'maxExclusive'] The value '{}' must be less than '{}'.",
                    lexical, b.literal
                ));
            }
        }
        Ok(())
    }

    /// Length checks; `len` is measured in the type's unit
    pub fn check_length(&self, lexical: &str, len: usize) -> Result<(), String> {
        if let Some(expected) = self.length {
            if len != expected {
                return Err(format!(
                    "[facet 'length'] The value '{}' has a length of '{}'; this differs from the allowed length of '{}'.",
                    lexical, len, expected
                ));
            }
        }
        if let Some(min) = self.min_length {
            if len < min {
                return Err(format!(
                    "[facet 'minLength'] The value '{}' has a length of '{}'; this underruns the allowed minimum length of '{}'.",
                    lexical, len, min
                ));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(format!(
                    "[facet 'maxLength'] The value '{}' has a length of '{}'; this exceeds the allowed maximum length of '{}'.",
                    lexical, len, max
                ));
            }
        }
        Ok(())
    }

    /// Pattern checks: every level must have at least one matching alternative
    pub fn check_patterns(&self, lexical: &str) -> Result<(), String> {
        for level in &self.patterns {
            if !level.iter().any(|p| p.is_match(lexical)) {
                let shown = level
                    .iter()
                    .map(|p| p.pattern.as_str())
                    .collect::<Vec<_>>()
                    .join("|");
                return Err(format!(
                    "[facet 'pattern'] The value '{}' is not accepted by the pattern '{}'.",
                    lexical, shown
                ));
            }
        }
        Ok(())
    }

    /// totalDigits and fractionDigits checks
    pub fn check_digits(&self, lexical: &str, value: &XsdValue) -> Result<(), String> {
        let XsdValue::Decimal(d) = value else {
            return Ok(());
        };
        let normalized = d.normalize();
        if let Some(max) = self.total_digits {
            let digits = normalized
                .abs()
                .mantissa()
                .to_string()
                .len() as u32;
            if digits > max {
                return Err(format!(
                    "[facet 'totalDigits'] The value '{}' has more digits than are allowed ('{}').",
                    lexical, max
                ));
            }
        }
        if let Some(max) = self.fraction_digits {
            if normalized.scale() > max {
                return Err(format!(
                    "[facet 'fractionDigits'] The value '{}' has more fractional digits than are allowed ('{}').",
                    lexical, max
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> XsdValue {
        XsdValue::Decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_whitespace_modes() {
        assert_eq!(WhiteSpace::from_str("preserve"), Some(WhiteSpace::Preserve));
        assert_eq!(WhiteSpace::from_str("replace"), Some(WhiteSpace::Replace));
        assert_eq!(WhiteSpace::from_str("collapse"), Some(WhiteSpace::Collapse));
        assert_eq!(WhiteSpace::from_str("invalid"), None);
    }

    #[test]
    fn test_whitespace_normalize() {
        let text = "  hello\t\nworld  ";

        assert_eq!(WhiteSpace::Preserve.normalize(text), text);
        assert_eq!(WhiteSpace::Replace.normalize(text), "  hello  world  ");
        assert_eq!(WhiteSpace::Collapse.normalize(text), "hello world");
        assert_eq!(WhiteSpace::Collapse.normalize(" \n "), "");
    }

    #[test]
    fn test_translate_pattern() {
        assert_eq!(translate_pattern(r"\d{3}").unwrap(), r"^(?:\d{3})$");
        assert_eq!(translate_pattern("a$b^").unwrap(), r"^(?:a\$b\^)$");
        assert_eq!(translate_pattern("[^a]").unwrap(), "^(?:[^a])$");
        assert_eq!(translate_pattern("[a-z-[aeiou]]").unwrap(), "^(?:[a-z--[aeiou]])$");
        assert!(translate_pattern("[abc").is_err());
        assert!(translate_pattern("abc\\").is_err());
    }

    #[test]
    fn test_pattern_facet() {
        let facet = PatternFacet::new(r"\d{3}-\d{4}").unwrap();

        assert!(facet.is_match("123-4567"));
        assert!(!facet.is_match("123-456"));
        assert!(!facet.is_match("x123-4567"));
        assert!(!facet.is_match("123-45678"));
    }

    #[test]
    fn test_pattern_name_escapes() {
        let facet = PatternFacet::new(r"\i\c*").unwrap();
        assert!(facet.is_match("item-1"));
        assert!(!facet.is_match("1item"));

        let consonants = PatternFacet::new("[a-z-[aeiou]]+").unwrap();
        assert!(consonants.is_match("xyz"));
        assert!(!consonants.is_match("xaz"));
    }

    #[test]
    fn test_dot_excludes_carriage_return() {
        let facet = PatternFacet::new("a.b").unwrap();
        assert!(facet.is_match("a-b"));
        assert!(!facet.is_match("a\rb"));
    }

    #[test]
    fn test_pattern_levels_are_anded() {
        let mut set = FacetSet::new();
        set.patterns.push(vec![
            PatternFacet::new("a+").unwrap(),
            PatternFacet::new("b+").unwrap(),
        ]);
        assert!(set.check_patterns("aaa").is_ok());
        assert!(set.check_patterns("bb").is_ok());

        let derived = FacetSet {
            patterns: vec![vec![PatternFacet::new(".{3}").unwrap()]],
            ..FacetSet::default()
        };
        let set = set.restrict(derived);
        assert!(set.check_patterns("aaa").is_ok());
        let err = set.check_patterns("bb").unwrap_err();
        assert!(err.contains("[facet 'pattern']"));
        assert!(err.contains(".{3}"));
    }

    #[test]
    fn test_enumeration_check() {
        let set = FacetSet {
            enumeration: Some(vec![
                EnumValue {
                    literal: "1.0".to_string(),
                    value: Some(dec("1.0")),
                },
                EnumValue {
                    literal: "2".to_string(),
                    value: Some(dec("2")),
                },
            ]),
            ..FacetSet::default()
        };

        assert!(set.check_enumeration("1", Some(&dec("1"))).is_ok());
        let err = set.check_enumeration("3", Some(&dec("3"))).unwrap_err();
        assert_eq!(
            err,
            "[facet 'enumeration'] The value '3' is not an element of the set {'1.0', '2'}."
        );
    }

    #[test]
    fn test_range_checks() {
        let set = FacetSet {
            min_inclusive: Some(Bound {
                literal: "1".to_string(),
                value: dec("1"),
            }),
            max_inclusive: Some(Bound {
                literal: "10".to_string(),
                value: dec("10"),
            }),
            ..FacetSet::default()
        };

        assert!(set.check_range("1", &dec("1")).is_ok());
        assert!(set.check_range("10", &dec("10")).is_ok());
        assert_eq!(
            set.check_range("15", &dec("15")).unwrap_err(),
            "[facet 'maxInclusive'] The value '15' is greater than the maximum value allowed ('10')."
        );
        assert!(set
            .check_range("0", &dec("0"))
            .unwrap_err()
            .contains("minInclusive"));
    }

    #[test]
    fn test_exclusive_bounds() {
        let set = FacetSet {
            min_exclusive: Some(Bound {
                literal: "0".to_string(),
                value: dec("0"),
            }),
            max_exclusive: Some(Bound {
                literal: "5".to_string(),
                value: dec("5"),
            }),
            ..FacetSet::default()
        };
        assert!(set.check_range("0", &dec("0")).is_err());
        assert!(set.check_range("4.9", &dec("4.9")).is_ok());
        assert!(set.check_range("5", &dec("5")).is_err());
    }

    #[test]
    fn test_restrict_replaces_opposite_bound_kind() {
        let base = FacetSet {
            max_inclusive: Some(Bound {
                literal: "10".to_string(),
                value: dec("10"),
            }),
            ..FacetSet::default()
        };
        let derived = FacetSet {
            max_exclusive: Some(Bound {
                literal: "5".to_string(),
                value: dec("5"),
            }),
            ..FacetSet::default()
        };
        let set = base.restrict(derived);
        assert!(set.max_inclusive.is_none());
        assert!(set.check_range("5", &dec("5")).is_err());
    }

    #[test]
    fn test_length_checks() {
        let set = FacetSet {
            min_length: Some(2),
            max_length: Some(4),
            ..FacetSet::default()
        };
        assert!(set.check_length("abc", 3).is_ok());
        assert!(set.check_length("a", 1).unwrap_err().contains("minLength"));
        assert!(set.check_length("abcde", 5).unwrap_err().contains("maxLength"));

        let exact = FacetSet {
            length: Some(2),
            ..FacetSet::default()
        };
        assert!(exact.check_length("abc", 3).unwrap_err().contains("[facet 'length']"));
    }

    #[test]
    fn test_digit_checks() {
        let set = FacetSet {
            total_digits: Some(5),
            fraction_digits: Some(2),
            ..FacetSet::default()
        };

        assert!(set.check_digits("123.45", &dec("123.45")).is_ok());
        assert!(set.check_digits("1.20", &dec("1.20")).is_ok());
        assert!(set.check_digits("0", &dec("0")).is_ok());
        assert!(set
            .check_digits("123456", &dec("123456"))
            .unwrap_err()
            .contains("totalDigits"));
        assert!(set
            .check_digits("1.234", &dec("1.234"))
            .unwrap_err()
            .contains("fractionDigits"));
    }
}
