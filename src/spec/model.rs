//! Validated in-memory specification model.
//!
//! Everything here is built once by the loader and never mutated. The
//! structures are plain values; `Serialize` lets the model be dumped as JSON
//! for downstream documentation tooling.

use serde::Serialize;
use std::fmt;

/// Sentinel used by the XML for "no shape" / "no element type".
pub const UNSPECIFIED: &str = "-";

/// Separator between the two tokens of a conjoined profile expression.
pub const AND_SEPARATOR: &str = " and ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub draft: bool,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.draft {
            write!(f, " draft")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    /// Short code, e.g. `PRO-INT`.
    pub profile: String,
    pub name: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileExtension {
    /// Extension token without its `EXT-` prefix, as declared.
    pub name: String,
    pub description: String,
    pub status: String,
    /// Profiles the extension may be layered on.
    pub profiles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelMaximum {
    pub name: &'static str,
    pub value: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Level {
    pub name: String,
    pub description: String,
    /// Always the full list of known maximums, in declaration order;
    /// values a document does not declare are `None`.
    pub maximums: Vec<LevelMaximum>,
}

impl Level {
    pub fn maximum(&self, name: &str) -> Option<u64> {
        self.maximums
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Input,
    Attribute,
    Output,
}

impl CategoryKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" => Some(Self::Input),
            "attribute" => Some(Self::Attribute),
            "output" => Some(Self::Output),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub kind: CategoryKind,
    /// Profiles restricting when this categorization applies. Empty means
    /// unrestricted.
    pub qualifiers: Vec<String>,
}

/// One end of a rank requirement: a number or a level symbol such as
/// `MAX_RANK`, kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RankBound {
    Value(u32),
    Symbol(String),
}

impl RankBound {
    /// Level symbol for the largest rank the active level allows.
    pub const MAX_RANK: &'static str = "MAX_RANK";

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<u32>() {
            Ok(n) => RankBound::Value(n),
            Err(_) => RankBound::Symbol(raw.to_string()),
        }
    }

    pub fn value(&self) -> Option<u32> {
        match self {
            RankBound::Value(n) => Some(*n),
            RankBound::Symbol(_) => None,
        }
    }

    pub fn is_max_rank(&self) -> bool {
        matches!(self, RankBound::Symbol(s) if s == Self::MAX_RANK)
    }
}

impl fmt::Display for RankBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankBound::Value(n) => write!(f, "{}", n),
            RankBound::Symbol(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankRange {
    pub min: RankBound,
    pub max: RankBound,
}

impl RankRange {
    pub fn is_scalar(&self) -> bool {
        self.min == RankBound::Value(0) && self.max == RankBound::Value(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelLimit {
    pub value: String,
    pub limit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Argument {
    pub name: String,
    pub description: String,
    pub categories: Vec<Category>,
    /// Type tag, e.g. `tensor_t`, `acc_type_t`.
    #[serde(rename = "type")]
    pub ty: String,
    /// Element type; `None` when the document declares `-` or omits it.
    pub element_type: Option<String>,
    pub shape: String,
    pub rank: Option<RankRange>,
    pub level_limits: Vec<LevelLimit>,
    pub optional: bool,
}

impl Argument {
    /// The single category of a well-formed argument.
    pub fn sole_category(&self) -> Option<&Category> {
        match self.categories.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// One or two profile tokens. Two tokens are kept in ascending order and
/// joined by [`AND_SEPARATOR`], so equal expressions compare equal as
/// strings whatever order the document declared them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProfileExpression(String);

impl ProfileExpression {
    pub fn new(name: &str, and_name: Option<&str>) -> Self {
        match and_name {
            None => Self(name.to_string()),
            Some(other) if other < name => Self(format!("{}{}{}", other, AND_SEPARATOR, name)),
            Some(other) => Self(format!("{}{}{}", name, AND_SEPARATOR, other)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(AND_SEPARATOR)
    }
}

impl fmt::Display for ProfileExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeSupport {
    pub mode: String,
    /// Symbolic type -> concrete type, in the operator's type declaration
    /// order. Complete for every declared symbolic type.
    pub types: Vec<(String, String)>,
    pub profiles: Vec<ProfileExpression>,
    pub version_added: Option<String>,
}

impl TypeSupport {
    pub fn concrete(&self, symbolic: &str) -> Option<&str> {
        self.types
            .iter()
            .find(|(sym, _)| sym == symbolic)
            .map(|(_, concrete)| concrete.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Operator {
    pub name: String,
    pub arguments: Vec<Argument>,
    /// Symbolic type names (`in_t`, `acc_t`, ...).
    pub types: Vec<String>,
    pub type_support: Vec<TypeSupport>,
}

impl Operator {
    pub fn is_symbolic(&self, ty: &str) -> bool {
        self.types.iter().any(|t| t == ty)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperatorGroup {
    pub name: String,
    pub operators: Vec<Operator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValue {
    pub name: String,
    pub value: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Enum {
    pub name: String,
    pub description: String,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Spec {
    pub version: Version,
    pub profiles: Vec<Profile>,
    pub profile_extensions: Vec<ProfileExtension>,
    pub levels: Vec<Level>,
    pub operator_groups: Vec<OperatorGroup>,
    pub enums: Vec<Enum>,
}

impl Spec {
    /// All operators, group by group, in document order.
    pub fn operators(&self) -> impl Iterator<Item = &Operator> {
        self.operator_groups.iter().flat_map(|g| g.operators.iter())
    }

    pub fn operator_by_name(&self, name: &str) -> Option<&Operator> {
        self.operators().find(|op| op.name == name)
    }

    pub fn enum_by_name(&self, name: &str) -> Option<&Enum> {
        self.enums.iter().find(|e| e.name == name)
    }
}
