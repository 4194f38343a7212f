//! Wire opcodes for predicate expression nodes.
//!
//! The numeric tags are part of the server protocol. They must never be
//! renumbered; new variants may only take unused values.

/// Stable numeric tag identifying each node variant on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum Opcode {
    And = 1,
    Or = 2,
    Not = 3,

    IntegerValue = 10,
    StringValue = 11,
    GeoJsonValue = 12,

    IntegerBin = 100,
    StringBin = 101,
    GeoJsonBin = 102,
    ListBin = 103,
    MapBin = 104,

    IntegerVar = 120,
    StringVar = 121,
    GeoJsonVar = 122,

    RecDeviceSize = 150,
    RecLastUpdate = 151,
    RecVoidTime = 152,
    RecDigestModulo = 153,

    IntegerEqual = 200,
    IntegerUnequal = 201,
    IntegerGreater = 202,
    IntegerGreaterEq = 203,
    IntegerLess = 204,
    IntegerLessEq = 205,

    StringEqual = 210,
    StringUnequal = 211,
    StringRegex = 212,

    GeoJsonWithin = 220,
    GeoJsonContains = 221,

    ListIterateOr = 250,
    MapKeyIterateOr = 251,
    MapValIterateOr = 252,
    ListIterateAnd = 253,
    MapKeyIterateAnd = 254,
    MapValIterateAnd = 255,
}

/// Broad family a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// AND, OR, NOT
    Connective,
    /// Literal integer, string or GeoJSON value
    Constant,
    /// Reads a named bin of the current record
    Bin,
    /// Reads the element bound by an enclosing iterator
    Variable,
    /// Reads record metadata
    Metadata,
    /// Pops two values and pushes a boolean
    Comparison,
    /// Runs a subexpression over a list or map
    Iteration,
}

impl Opcode {
    /// Every opcode, in tag order
    pub const ALL: [Opcode; 35] = [
        Opcode::And,
        Opcode::Or,
        Opcode::Not,
        Opcode::IntegerValue,
        Opcode::StringValue,
        Opcode::GeoJsonValue,
        Opcode::IntegerBin,
        Opcode::StringBin,
        Opcode::GeoJsonBin,
        Opcode::ListBin,
        Opcode::MapBin,
        Opcode::IntegerVar,
        Opcode::StringVar,
        Opcode::GeoJsonVar,
        Opcode::RecDeviceSize,
        Opcode::RecLastUpdate,
        Opcode::RecVoidTime,
        Opcode::RecDigestModulo,
        Opcode::IntegerEqual,
        Opcode::IntegerUnequal,
        Opcode::IntegerGreater,
        Opcode::IntegerGreaterEq,
        Opcode::IntegerLess,
        Opcode::IntegerLessEq,
        Opcode::StringEqual,
        Opcode::StringUnequal,
        Opcode::StringRegex,
        Opcode::GeoJsonWithin,
        Opcode::GeoJsonContains,
        Opcode::ListIterateOr,
        Opcode::MapKeyIterateOr,
        Opcode::MapValIterateOr,
        Opcode::ListIterateAnd,
        Opcode::MapKeyIterateAnd,
        Opcode::MapValIterateAnd,
    ];

    /// Numeric tag written to the wire
    pub fn tag(self) -> u16 {
        self as u16
    }

    /// Look up the opcode for a wire tag
    pub fn from_tag(tag: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.tag() == tag)
    }

    pub fn category(self) -> Category {
        use Opcode::*;
        match self {
            And | Or | Not => Category::Connective,
            IntegerValue | StringValue | GeoJsonValue => Category::Constant,
            IntegerBin | StringBin | GeoJsonBin | ListBin | MapBin => Category::Bin,
            IntegerVar | StringVar | GeoJsonVar => Category::Variable,
            RecDeviceSize | RecLastUpdate | RecVoidTime | RecDigestModulo => Category::Metadata,
            IntegerEqual | IntegerUnequal | IntegerGreater | IntegerGreaterEq | IntegerLess
            | IntegerLessEq | StringEqual | StringUnequal | StringRegex | GeoJsonWithin
            | GeoJsonContains => Category::Comparison,
            ListIterateOr | MapKeyIterateOr | MapValIterateOr | ListIterateAnd
            | MapKeyIterateAnd | MapValIterateAnd => Category::Iteration,
        }
    }

    /// Token keyword used by the textual form of a node
    pub fn as_str(self) -> &'static str {
        use Opcode::*;
        match self {
            And => "and",
            Or => "or",
            Not => "not",
            IntegerValue => "int",
            StringValue => "str",
            GeoJsonValue => "geo",
            IntegerBin => "int_bin",
            StringBin => "str_bin",
            GeoJsonBin => "geo_bin",
            ListBin => "list_bin",
            MapBin => "map_bin",
            IntegerVar => "int_var",
            StringVar => "str_var",
            GeoJsonVar => "geo_var",
            RecDeviceSize => "device_size",
            RecLastUpdate => "last_update",
            RecVoidTime => "void_time",
            RecDigestModulo => "digest_mod",
            IntegerEqual => "int_eq",
            IntegerUnequal => "int_ne",
            IntegerGreater => "int_gt",
            IntegerGreaterEq => "int_ge",
            IntegerLess => "int_lt",
            IntegerLessEq => "int_le",
            StringEqual => "str_eq",
            StringUnequal => "str_ne",
            StringRegex => "str_regex",
            GeoJsonWithin => "geo_within",
            GeoJsonContains => "geo_contains",
            ListIterateOr => "list_or",
            MapKeyIterateOr => "mapkey_or",
            MapValIterateOr => "mapval_or",
            ListIterateAnd => "list_and",
            MapKeyIterateAnd => "mapkey_and",
            MapValIterateAnd => "mapval_and",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_str() == keyword)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
