//! XSD built-in types
//!
//! The built-in atomic datatypes of XML Schema 1.0, their derivation
//! hierarchy, whitespace handling, admitted facets and lexical mapping into
//! [`XsdValue`]. The list types `NMTOKENS`, `IDREFS` and `ENTITIES` are
//! registered by the symbol table as lists over their atomic item types.

use std::cmp::Ordering;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::names::{is_valid_name, is_valid_ncname, is_valid_nmtoken, is_valid_qname};

use super::facets::{
    FacetKind, WhiteSpace, BOOLEAN_FACETS, DECIMAL_FACETS, ORDERED_FACETS, STRING_FACETS,
};
use super::helpers::{
    base64_binary_decode, boolean_from_lexical, calendar_from_lexical, check_integer_bounds,
    decimal_from_lexical, duration_from_lexical, float_from_lexical, hex_binary_decode,
    integer_from_lexical, CalendarKind, CalendarValue, DurationValue, LexicalResult,
};

static LANGUAGE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").unwrap());

/// Built-in atomic datatypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    /// xs:anySimpleType
    AnySimpleType,
    /// xs:string
    String,
    /// xs:normalizedString
    NormalizedString,
    /// xs:token
    Token,
    /// xs:language
    Language,
    /// xs:Name
    Name,
    /// xs:NCName
    NCName,
    /// xs:ID
    Id,
    /// xs:IDREF
    IdRef,
    /// xs:ENTITY
    Entity,
    /// xs:NMTOKEN
    NmToken,
    /// xs:boolean
    Boolean,
    /// xs:decimal
    Decimal,
    /// xs:integer
    Integer,
    /// xs:long
    Long,
    /// xs:int
    Int,
    /// xs:short
    Short,
    /// xs:byte
    Byte,
    /// xs:nonNegativeInteger
    NonNegativeInteger,
    /// xs:positiveInteger
    PositiveInteger,
    /// xs:unsignedLong
    UnsignedLong,
    /// xs:unsignedInt
    UnsignedInt,
    /// xs:unsignedShort
    UnsignedShort,
    /// xs:unsignedByte
    UnsignedByte,
    /// xs:nonPositiveInteger
    NonPositiveInteger,
    /// xs:negativeInteger
    NegativeInteger,
    /// xs:float
    Float,
    /// xs:double
    Double,
    /// xs:duration
    Duration,
    /// xs:dateTime
    DateTime,
    /// xs:time
    Time,
    /// xs:date
    Date,
    /// xs:gYearMonth
    GYearMonth,
    /// xs:gYear
    GYear,
    /// xs:gMonthDay
    GMonthDay,
    /// xs:gDay
    GDay,
    /// xs:gMonth
    GMonth,
    /// xs:hexBinary
    HexBinary,
    /// xs:base64Binary
    Base64Binary,
    /// xs:anyURI
    AnyUri,
    /// xs:QName
    QName,
    /// xs:NOTATION
    Notation,
}

impl BuiltinType {
    /// Every built-in atomic type, bases before derived types
    pub const ALL: &'static [BuiltinType] = &[
        Self::AnySimpleType,
        Self::String,
        Self::NormalizedString,
        Self::Token,
        Self::Language,
        Self::Name,
        Self::NCName,
        Self::Id,
        Self::IdRef,
        Self::Entity,
        Self::NmToken,
        Self::Boolean,
        Self::Decimal,
        Self::Integer,
        Self::Long,
        Self::Int,
        Self::Short,
        Self::Byte,
        Self::NonNegativeInteger,
        Self::PositiveInteger,
        Self::UnsignedLong,
        Self::UnsignedInt,
        Self::UnsignedShort,
        Self::UnsignedByte,
        Self::NonPositiveInteger,
        Self::NegativeInteger,
        Self::Float,
        Self::Double,
        Self::Duration,
        Self::DateTime,
        Self::Time,
        Self::Date,
        Self::GYearMonth,
        Self::GYear,
        Self::GMonthDay,
        Self::GDay,
        Self::GMonth,
        Self::HexBinary,
        Self::Base64Binary,
        Self::AnyUri,
        Self::QName,
        Self::Notation,
    ];

    /// Local name in the XSD namespace
    pub fn name(&self) -> &'static str {
        match self {
            Self::AnySimpleType => "anySimpleType",
            Self::String => "string",
            Self::NormalizedString => "normalizedString",
            Self::Token => "token",
            Self::Language => "language",
            Self::Name => "Name",
            Self::NCName => "NCName",
            Self::Id => "ID",
            Self::IdRef => "IDREF",
            Self::Entity => "ENTITY",
            Self::NmToken => "NMTOKEN",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Int => "int",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::NonNegativeInteger => "nonNegativeInteger",
            Self::PositiveInteger => "positiveInteger",
            Self::UnsignedLong => "unsignedLong",
            Self::UnsignedInt => "unsignedInt",
            Self::UnsignedShort => "unsignedShort",
            Self::UnsignedByte => "unsignedByte",
            Self::NonPositiveInteger => "nonPositiveInteger",
            Self::NegativeInteger => "negativeInteger",
            Self::Float => "float",
            Self::Double => "double",
            Self::Duration => "duration",
            Self::DateTime => "dateTime",
            Self::Time => "time",
            Self::Date => "date",
            Self::GYearMonth => "gYearMonth",
            Self::GYear => "gYear",
            Self::GMonthDay => "gMonthDay",
            Self::GDay => "gDay",
            Self::GMonth => "gMonth",
            Self::HexBinary => "hexBinary",
            Self::Base64Binary => "base64Binary",
            Self::AnyUri => "anyURI",
            Self::QName => "QName",
            Self::Notation => "NOTATION",
        }
    }

    /// Look up a built-in type by local name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// The type this one is derived from by restriction
    pub fn base(&self) -> Option<BuiltinType> {
        Some(match self {
            Self::AnySimpleType => return None,
            Self::NormalizedString => Self::String,
            Self::Token => Self::NormalizedString,
            Self::Language | Self::Name | Self::NmToken => Self::Token,
            Self::NCName => Self::Name,
            Self::Id | Self::IdRef | Self::Entity => Self::NCName,
            Self::Integer => Self::Decimal,
            Self::Long | Self::NonNegativeInteger | Self::NonPositiveInteger => Self::Integer,
            Self::Int => Self::Long,
            Self::Short => Self::Int,
            Self::Byte => Self::Short,
            Self::PositiveInteger | Self::UnsignedLong => Self::NonNegativeInteger,
            Self::UnsignedInt => Self::UnsignedLong,
            Self::UnsignedShort => Self::UnsignedInt,
            Self::UnsignedByte => Self::UnsignedShort,
            Self::NegativeInteger => Self::NonPositiveInteger,
            _ => Self::AnySimpleType,
        })
    }

    /// The primitive type at the top of this type's derivation chain
    pub fn primitive(&self) -> BuiltinType {
        let mut current = *self;
        while let Some(base) = current.base() {
            if base == Self::AnySimpleType {
                return current;
            }
            current = base;
        }
        current
    }

    /// Whether this type equals or is derived from `other`
    pub fn is_derived_from(&self, other: BuiltinType) -> bool {
        let mut current = Some(*self);
        while let Some(t) = current {
            if t == other {
                return true;
            }
            current = t.base();
        }
        false
    }

    /// Built-in whitespace handling
    pub fn white_space(&self) -> WhiteSpace {
        match self {
            Self::AnySimpleType | Self::String => WhiteSpace::Preserve,
            Self::NormalizedString => WhiteSpace::Replace,
            _ => WhiteSpace::Collapse,
        }
    }

    /// Facets that may restrict this type
    pub fn admitted_facets(&self) -> &'static [FacetKind] {
        match self.primitive() {
            Self::Boolean => BOOLEAN_FACETS,
            Self::Decimal => DECIMAL_FACETS,
            Self::Float
            | Self::Double
            | Self::Duration
            | Self::DateTime
            | Self::Time
            | Self::Date
            | Self::GYearMonth
            | Self::GYear
            | Self::GMonthDay
            | Self::GDay
            | Self::GMonth => ORDERED_FACETS,
            _ => STRING_FACETS,
        }
    }

    /// Whether values of this type are ID values
    pub fn is_id(&self) -> bool {
        *self == Self::Id
    }

    /// Whether values of this type are IDREF values
    pub fn is_idref(&self) -> bool {
        *self == Self::IdRef
    }

    fn integer_bounds(&self) -> (Option<Decimal>, Option<Decimal>) {
        match self {
            Self::Long => (Some(Decimal::from(i64::MIN)), Some(Decimal::from(i64::MAX))),
            Self::Int => (Some(Decimal::from(i32::MIN)), Some(Decimal::from(i32::MAX))),
            Self::Short => (Some(Decimal::from(i16::MIN)), Some(Decimal::from(i16::MAX))),
            Self::Byte => (Some(Decimal::from(i8::MIN)), Some(Decimal::from(i8::MAX))),
            Self::NonNegativeInteger => (Some(Decimal::ZERO), None),
            Self::PositiveInteger => (Some(Decimal::ONE), None),
            Self::UnsignedLong => (Some(Decimal::ZERO), Some(Decimal::from(u64::MAX))),
            Self::UnsignedInt => (Some(Decimal::ZERO), Some(Decimal::from(u32::MAX))),
            Self::UnsignedShort => (Some(Decimal::ZERO), Some(Decimal::from(u16::MAX))),
            Self::UnsignedByte => (Some(Decimal::ZERO), Some(Decimal::from(u8::MAX))),
            Self::NonPositiveInteger => (None, Some(Decimal::ZERO)),
            Self::NegativeInteger => (None, Some(Decimal::NEGATIVE_ONE)),
            _ => (None, None),
        }
    }

    /// Map a whitespace-normalized lexical value into the value space
    pub fn parse(&self, value: &str) -> LexicalResult<XsdValue> {
        match self {
            Self::AnySimpleType | Self::String | Self::NormalizedString | Self::Token | Self::AnyUri => {
                Ok(XsdValue::String(value.to_string()))
            }
            Self::Language => {
                if LANGUAGE_REGEX.is_match(value) {
                    Ok(XsdValue::String(value.to_string()))
                } else {
                    Err("not a valid language tag".to_string())
                }
            }
            Self::Name => name_value(value, is_valid_name(value), "Name"),
            Self::NCName | Self::Id | Self::IdRef | Self::Entity => {
                name_value(value, is_valid_ncname(value), "NCName")
            }
            Self::NmToken => name_value(value, is_valid_nmtoken(value), "NMTOKEN"),
            Self::QName | Self::Notation => name_value(value, is_valid_qname(value), "QName"),
            Self::Boolean => boolean_from_lexical(value).map(XsdValue::Boolean),
            Self::Decimal => decimal_from_lexical(value).map(XsdValue::Decimal),
            Self::Float => float_from_lexical(value).map(|f| XsdValue::Float(f as f32 as f64)),
            Self::Double => float_from_lexical(value).map(XsdValue::Float),
            Self::Duration => duration_from_lexical(value).map(XsdValue::Duration),
            Self::DateTime => calendar(CalendarKind::DateTime, value),
            Self::Time => calendar(CalendarKind::Time, value),
            Self::Date => calendar(CalendarKind::Date, value),
            Self::GYearMonth => calendar(CalendarKind::GYearMonth, value),
            Self::GYear => calendar(CalendarKind::GYear, value),
            Self::GMonthDay => calendar(CalendarKind::GMonthDay, value),
            Self::GDay => calendar(CalendarKind::GDay, value),
            Self::GMonth => calendar(CalendarKind::GMonth, value),
            Self::HexBinary => hex_binary_decode(value).map(XsdValue::Binary),
            Self::Base64Binary => base64_binary_decode(value).map(XsdValue::Binary),
            integer => {
                let parsed = integer_from_lexical(value)?;
                let (min, max) = integer.integer_bounds();
                check_integer_bounds(&parsed, min, max)?;
                Ok(XsdValue::Decimal(parsed))
            }
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.name())
    }
}

fn name_value(value: &str, valid: bool, production: &str) -> LexicalResult<XsdValue> {
    if valid {
        Ok(XsdValue::String(value.to_string()))
    } else {
        Err(format!("not a valid {}", production))
    }
}

fn calendar(kind: CalendarKind, value: &str) -> LexicalResult<XsdValue> {
    calendar_from_lexical(kind, value).map(XsdValue::Calendar)
}

/// A value in the value space of a built-in type
#[derive(Debug, Clone, PartialEq)]
pub enum XsdValue {
    /// String-like values, compared by code points
    String(String),
    /// Boolean
    Boolean(bool),
    /// Decimal and every integer type
    Decimal(Decimal),
    /// Float and double
    Float(f64),
    /// Duration
    Duration(DurationValue),
    /// Date and time types
    Calendar(CalendarValue),
    /// hexBinary and base64Binary octets
    Binary(Vec<u8>),
}

impl XsdValue {
    /// Compare two values of the same primitive type
    ///
    /// Returns None when the values are incomparable: different primitive
    /// types, NaN, durations whose order depends on month length, or a zoned
    /// and an unzoned time less than 14 hours apart.
    pub fn compare(&self, other: &XsdValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Decimal(a), Self::Decimal(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Binary(a), Self::Binary(b)) => Some(a.cmp(b)),
            (Self::Calendar(a), Self::Calendar(b)) if a.kind == b.kind => compare_calendars(a, b),
            (Self::Duration(a), Self::Duration(b)) => compare_durations(a, b),
            _ => None,
        }
    }

    /// Length in facet units (characters or octets), when defined
    pub fn length(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::Binary(b) => Some(b.len()),
            _ => None,
        }
    }
}

/// Widest timezone offset an unzoned time may stand for
const MAX_TIMEZONE_HOURS: i64 = 14;

fn compare_calendars(a: &CalendarValue, b: &CalendarValue) -> Option<Ordering> {
    if a.has_timezone == b.has_timezone {
        return Some(a.instant.cmp(&b.instant));
    }
    let delta = a.instant - b.instant;
    let window = chrono::Duration::hours(MAX_TIMEZONE_HOURS);
    if delta > window {
        Some(Ordering::Greater)
    } else if delta < -window {
        Some(Ordering::Less)
    } else {
        None
    }
}

/// Shortest and longest month spans, in seconds, used to order durations
const MIN_MONTH_SECONDS: i64 = 28 * 86_400;
const MAX_MONTH_SECONDS: i64 = 31 * 86_400;

fn compare_durations(a: &DurationValue, b: &DurationValue) -> Option<Ordering> {
    if a.months == b.months {
        return Some(a.seconds.cmp(&b.seconds));
    }
    let month_delta = a.months - b.months;
    let second_delta = a.seconds - b.seconds;

    // The month difference spans between 28 and 31 days per month
    let (low, high) = if month_delta > 0 {
        (month_delta * MIN_MONTH_SECONDS, month_delta * MAX_MONTH_SECONDS)
    } else {
        (month_delta * MAX_MONTH_SECONDS, month_delta * MIN_MONTH_SECONDS)
    };
    let low = Decimal::from(low) + second_delta;
    let high = Decimal::from(high) + second_delta;

    if low > Decimal::ZERO {
        Some(Ordering::Greater)
    } else if high < Decimal::ZERO {
        Some(Ordering::Less)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_builtin_names_roundtrip() {
        for builtin in BuiltinType::ALL {
            assert_eq!(BuiltinType::from_name(builtin.name()), Some(*builtin));
        }
        assert_eq!(BuiltinType::from_name("NMTOKENS"), None);
        assert_eq!(BuiltinType::Integer.to_string(), "xs:integer");
    }

    #[test]
    fn test_derivation_chain() {
        assert!(BuiltinType::Byte.is_derived_from(BuiltinType::Integer));
        assert!(BuiltinType::Byte.is_derived_from(BuiltinType::Decimal));
        assert!(BuiltinType::Id.is_derived_from(BuiltinType::String));
        assert!(!BuiltinType::Decimal.is_derived_from(BuiltinType::Integer));
        assert_eq!(BuiltinType::UnsignedByte.primitive(), BuiltinType::Decimal);
        assert_eq!(BuiltinType::Language.primitive(), BuiltinType::String);
        assert_eq!(BuiltinType::Date.primitive(), BuiltinType::Date);
    }

    #[test]
    fn test_white_space() {
        assert_eq!(BuiltinType::String.white_space(), WhiteSpace::Preserve);
        assert_eq!(BuiltinType::NormalizedString.white_space(), WhiteSpace::Replace);
        assert_eq!(BuiltinType::Token.white_space(), WhiteSpace::Collapse);
        assert_eq!(BuiltinType::Int.white_space(), WhiteSpace::Collapse);
    }

    #[test]
    fn test_admitted_facets() {
        assert!(BuiltinType::Int
            .admitted_facets()
            .contains(&FacetKind::TotalDigits));
        assert!(!BuiltinType::String
            .admitted_facets()
            .contains(&FacetKind::MaxInclusive));
        assert!(!BuiltinType::Boolean
            .admitted_facets()
            .contains(&FacetKind::Enumeration));
    }

    #[test]
    fn test_integer_types() {
        assert_eq!(
            BuiltinType::Integer.parse("+42").unwrap(),
            XsdValue::Decimal(Decimal::from(42))
        );
        assert!(BuiltinType::Integer.parse("abc").is_err());
        assert!(BuiltinType::Byte.parse("127").is_ok());
        assert!(BuiltinType::Byte.parse("128").is_err());
        assert!(BuiltinType::UnsignedLong.parse("18446744073709551615").is_ok());
        assert!(BuiltinType::UnsignedLong.parse("-1").is_err());
        assert!(BuiltinType::PositiveInteger.parse("0").is_err());
        assert!(BuiltinType::NegativeInteger.parse("-1").is_ok());
    }

    #[test]
    fn test_string_types() {
        assert!(BuiltinType::Language.parse("en-US").is_ok());
        assert!(BuiltinType::Language.parse("english language").is_err());
        assert!(BuiltinType::NCName.parse("a:b").is_err());
        assert!(BuiltinType::Id.parse("x1").is_ok());
        assert!(BuiltinType::QName.parse("xs:string").is_ok());
        assert!(BuiltinType::NmToken.parse("12").is_ok());
    }

    #[test]
    fn test_decimal_values_compare_in_value_space() {
        let a = BuiltinType::Decimal.parse("1.0").unwrap();
        let b = BuiltinType::Decimal.parse("1").unwrap();
        assert_eq!(a, b);
        let c = BuiltinType::Decimal.parse("1.5").unwrap();
        assert_eq!(c.compare(&a), Some(Ordering::Greater));
        assert_eq!(
            c,
            XsdValue::Decimal(Decimal::from_str("1.50").unwrap())
        );
    }

    #[test]
    fn test_float_values() {
        let nan = BuiltinType::Double.parse("NaN").unwrap();
        assert_eq!(nan.compare(&nan), None);
        let inf = BuiltinType::Float.parse("INF").unwrap();
        let one = BuiltinType::Float.parse("1").unwrap();
        assert_eq!(one.compare(&inf), Some(Ordering::Less));
    }

    #[test]
    fn test_calendar_values() {
        let a = BuiltinType::Date.parse("2024-01-01").unwrap();
        let b = BuiltinType::Date.parse("2024-06-01").unwrap();
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert!(BuiltinType::Date.parse("2024-1-1").is_err());

        let year = BuiltinType::GYear.parse("2024").unwrap();
        assert_eq!(a.compare(&year), None);

        if let (XsdValue::Calendar(x), XsdValue::Calendar(y)) = (&a, &b) {
            assert_eq!((y.instant - x.instant).num_days(), 152);
        }
    }

    #[test]
    fn test_zoned_and_unzoned_calendar_values() {
        let local = BuiltinType::DateTime.parse("2024-01-01T00:00:00").unwrap();
        let near = BuiltinType::DateTime.parse("2024-01-01T00:00:00+05:00").unwrap();
        let far = BuiltinType::DateTime.parse("2024-01-02T00:00:00Z").unwrap();
        let early = BuiltinType::DateTime.parse("2023-12-31T08:00:00Z").unwrap();

        assert_eq!(near.compare(&local), None);
        assert_eq!(local.compare(&near), None);
        assert_eq!(early.compare(&local), Some(Ordering::Less));
        assert_eq!(far.compare(&local), Some(Ordering::Greater));
        assert_eq!(local.compare(&far), Some(Ordering::Less));

        let utc = BuiltinType::DateTime.parse("2023-12-31T19:00:00Z").unwrap();
        assert_eq!(near.compare(&utc), Some(Ordering::Equal));
    }

    #[test]
    fn test_duration_ordering() {
        let month = BuiltinType::Duration.parse("P1M").unwrap();
        let days_27 = BuiltinType::Duration.parse("P27D").unwrap();
        let days_30 = BuiltinType::Duration.parse("P30D").unwrap();
        let days_32 = BuiltinType::Duration.parse("P32D").unwrap();

        assert_eq!(month.compare(&days_27), Some(Ordering::Greater));
        assert_eq!(month.compare(&days_30), None);
        assert_eq!(month.compare(&days_32), Some(Ordering::Less));
    }

    #[test]
    fn test_binary_lengths() {
        assert_eq!(BuiltinType::HexBinary.parse("0A0B").unwrap().length(), Some(2));
        assert_eq!(BuiltinType::Base64Binary.parse("aGk=").unwrap().length(), Some(2));
        assert_eq!(BuiltinType::String.parse("héllo").unwrap().length(), Some(5));
        assert_eq!(BuiltinType::Boolean.parse("true").unwrap().length(), None);
    }
}
