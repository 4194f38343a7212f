//! The predicate expression node catalog.
//!
//! Every node is built through a factory on [`PredExp`]. Factories copy names and
//! strings into node-owned storage and reject arguments the wire format cannot
//! carry, so an existing node is always encodable.

use bytes::BufMut;

use crate::predexp::error::ConstructionError;
use crate::predexp::limits::{MAX_NAME_LEN, NODE_HEADER_SIZE};
use crate::predexp::opcode::Opcode;

/// POSIX `regcomp` flags accepted by [`PredExp::string_regex`].
pub mod regex_flags {
    pub const NONE: u32 = 0;
    pub const EXTENDED: u32 = 1;
    pub const ICASE: u32 = 2;
    pub const NOSUB: u32 = 4;
    pub const NEWLINE: u32 = 8;

    /// Union of every supported flag
    pub const ALL: u32 = EXTENDED | ICASE | NOSUB | NEWLINE;
}

/// Variant-specific payload carried after the node header
#[derive(Debug, PartialEq, Eq)]
pub enum Payload {
    Empty,
    /// Child count of AND / OR
    Count(u16),
    /// Integer constant
    Integer(i64),
    /// Digest modulus
    Modulus(i32),
    /// Regex compile flags
    Flags(u32),
    /// Bin name, variable name, or string / GeoJSON constant
    Text(String),
}

impl Payload {
    fn len(&self) -> usize {
        match self {
            Payload::Empty => 0,
            Payload::Count(_) => 2,
            Payload::Integer(_) => 8,
            Payload::Modulus(_) | Payload::Flags(_) => 4,
            Payload::Text(text) => text.len(),
        }
    }
}

/// One node of a postfix predicate program.
#[derive(Debug, PartialEq, Eq)]
pub struct PredExp {
    opcode: Opcode,
    payload: Payload,
}

impl PredExp {
    fn new(opcode: Opcode, payload: Payload) -> Self {
        Self { opcode, payload }
    }

    fn named(opcode: Opcode, name: &str) -> Result<Self, ConstructionError> {
        if name.is_empty() {
            return Err(ConstructionError::EmptyName { opcode });
        }
        if name.len() > MAX_NAME_LEN {
            return Err(ConstructionError::NameTooLong {
                opcode,
                len: name.len(),
                max: MAX_NAME_LEN,
            });
        }
        Ok(Self::new(opcode, Payload::Text(name.to_owned())))
    }

    fn text(opcode: Opcode, value: &str) -> Result<Self, ConstructionError> {
        if u32::try_from(value.len()).is_err() {
            return Err(ConstructionError::ValueTooLong {
                opcode,
                len: value.len(),
            });
        }
        Ok(Self::new(opcode, Payload::Text(value.to_owned())))
    }

    fn counted(opcode: Opcode, nexpr: u16) -> Result<Self, ConstructionError> {
        if nexpr == 0 {
            return Err(ConstructionError::ArgumentOutOfRange {
                opcode,
                value: 0,
                reason: "child count must be at least 1",
            });
        }
        Ok(Self::new(opcode, Payload::Count(nexpr)))
    }

    // Logical connectives

    /// Pops `nexpr` logical expressions and pushes true if all are true.
    pub fn and(nexpr: u16) -> Result<Self, ConstructionError> {
        Self::counted(Opcode::And, nexpr)
    }

    /// Pops `nexpr` logical expressions and pushes true if any is true.
    pub fn or(nexpr: u16) -> Result<Self, ConstructionError> {
        Self::counted(Opcode::Or, nexpr)
    }

    /// Pops one logical expression and pushes its negation.
    pub fn not() -> Self {
        Self::new(Opcode::Not, Payload::Empty)
    }

    // Constants

    pub fn integer_value(value: i64) -> Self {
        Self::new(Opcode::IntegerValue, Payload::Integer(value))
    }

    pub fn string_value(value: &str) -> Result<Self, ConstructionError> {
        Self::text(Opcode::StringValue, value)
    }

    /// A GeoJSON region or point, passed through to the server unparsed.
    pub fn geojson_value(value: &str) -> Result<Self, ConstructionError> {
        Self::text(Opcode::GeoJsonValue, value)
    }

    // Bin extractors. A missing bin or one of another type yields "unknown".

    pub fn integer_bin(name: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::IntegerBin, name)
    }

    pub fn string_bin(name: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::StringBin, name)
    }

    pub fn geojson_bin(name: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::GeoJsonBin, name)
    }

    pub fn list_bin(name: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::ListBin, name)
    }

    pub fn map_bin(name: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::MapBin, name)
    }

    // Iteration variables

    pub fn integer_var(name: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::IntegerVar, name)
    }

    pub fn string_var(name: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::StringVar, name)
    }

    pub fn geojson_var(name: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::GeoJsonVar, name)
    }

    // Record metadata

    /// Storage footprint of the record in bytes.
    pub fn rec_device_size() -> Self {
        Self::new(Opcode::RecDeviceSize, Payload::Empty)
    }

    /// Last update time in nanoseconds since the epoch.
    pub fn rec_last_update() -> Self {
        Self::new(Opcode::RecLastUpdate, Payload::Empty)
    }

    /// Expiration time in nanoseconds since the epoch, 0 if the record never expires.
    pub fn rec_void_time() -> Self {
        Self::new(Opcode::RecVoidTime, Payload::Empty)
    }

    /// Four bytes of the record digest modulo `modulus`.
    pub fn rec_digest_modulo(modulus: i32) -> Result<Self, ConstructionError> {
        if modulus <= 0 {
            return Err(ConstructionError::ArgumentOutOfRange {
                opcode: Opcode::RecDigestModulo,
                value: modulus.into(),
                reason: "modulus must be positive",
            });
        }
        Ok(Self::new(Opcode::RecDigestModulo, Payload::Modulus(modulus)))
    }

    // Comparisons. The operand pushed first is the left side.

    pub fn integer_equal() -> Self {
        Self::new(Opcode::IntegerEqual, Payload::Empty)
    }

    pub fn integer_unequal() -> Self {
        Self::new(Opcode::IntegerUnequal, Payload::Empty)
    }

    pub fn integer_greater() -> Self {
        Self::new(Opcode::IntegerGreater, Payload::Empty)
    }

    pub fn integer_greatereq() -> Self {
        Self::new(Opcode::IntegerGreaterEq, Payload::Empty)
    }

    pub fn integer_less() -> Self {
        Self::new(Opcode::IntegerLess, Payload::Empty)
    }

    pub fn integer_lesseq() -> Self {
        Self::new(Opcode::IntegerLessEq, Payload::Empty)
    }

    pub fn string_equal() -> Self {
        Self::new(Opcode::StringEqual, Payload::Empty)
    }

    pub fn string_unequal() -> Self {
        Self::new(Opcode::StringUnequal, Payload::Empty)
    }

    /// Matches the left string against the right string compiled as a POSIX regex.
    ///
    /// `cflags` is a combination of [`regex_flags`] values.
    pub fn string_regex(cflags: u32) -> Result<Self, ConstructionError> {
        if cflags & !regex_flags::ALL != 0 {
            return Err(ConstructionError::ArgumentOutOfRange {
                opcode: Opcode::StringRegex,
                value: cflags.into(),
                reason: "unsupported regex flag bits",
            });
        }
        Ok(Self::new(Opcode::StringRegex, Payload::Flags(cflags)))
    }

    /// True if the left geometry lies within the right region.
    pub fn geojson_within() -> Self {
        Self::new(Opcode::GeoJsonWithin, Payload::Empty)
    }

    /// True if the left region contains the right point.
    pub fn geojson_contains() -> Self {
        Self::new(Opcode::GeoJsonContains, Payload::Empty)
    }

    // Collection iteration. Pops a collection, then the subexpression that
    // references `var`. OR over zero elements is false, AND is true.

    pub fn list_iterate_or(var: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::ListIterateOr, var)
    }

    pub fn list_iterate_and(var: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::ListIterateAnd, var)
    }

    pub fn mapkey_iterate_or(var: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::MapKeyIterateOr, var)
    }

    pub fn mapkey_iterate_and(var: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::MapKeyIterateAnd, var)
    }

    pub fn mapval_iterate_or(var: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::MapValIterateOr, var)
    }

    pub fn mapval_iterate_and(var: &str) -> Result<Self, ConstructionError> {
        Self::named(Opcode::MapValIterateAnd, var)
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Bin, variable or iterator-variable name, if this node carries one
    pub fn name(&self) -> Option<&str> {
        use crate::predexp::opcode::Category;
        match (&self.payload, self.opcode.category()) {
            (Payload::Text(name), Category::Bin | Category::Variable | Category::Iteration) => {
                Some(name.as_str())
            }
            _ => None,
        }
    }

    /// Length of the payload that follows the header
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Exact number of bytes [`PredExp::write`] emits for this node
    pub fn encoded_size(&self) -> usize {
        NODE_HEADER_SIZE + self.payload.len()
    }

    /// Append this node's tag, length and payload to `buf`, returning the bytes written.
    ///
    /// The caller must ensure `buf` has `encoded_size()` bytes of room.
    pub fn write<B: BufMut>(&self, buf: &mut B) -> usize {
        let len = self.payload.len();
        buf.put_u16(self.opcode.tag());
        // Factories bound every payload to the u32 range
        buf.put_u32(len as u32);
        match &self.payload {
            Payload::Empty => {}
            Payload::Count(n) => buf.put_u16(*n),
            Payload::Integer(v) => buf.put_i64(*v),
            Payload::Modulus(m) => buf.put_i32(*m),
            Payload::Flags(f) => buf.put_u32(*f),
            Payload::Text(text) => buf.put_slice(text.as_bytes()),
        }
        NODE_HEADER_SIZE + len
    }

    /// Rebuild a node from its decoded parts. Used by the test decoder.
    #[cfg(test)]
    pub(crate) fn from_parts(opcode: Opcode, payload: Payload) -> Self {
        Self::new(opcode, payload)
    }
}
