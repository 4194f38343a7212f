//! Textual form of a node: `keyword` or `keyword:argument`.
//!
//! Examples: `int_bin:c`, `int:11`, `int_ge`, `and:2`, `str_regex:3`, `list_or:item`.
//! Everything after the first `:` is the argument, so string constants may
//! themselves contain colons.

use std::fmt;
use std::str::FromStr;

use crate::predexp::error::PredExpError;
use crate::predexp::node::{Payload, PredExp};
use crate::predexp::opcode::Opcode;

impl fmt::Display for PredExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = self.opcode().as_str();
        match self.payload() {
            Payload::Empty => write!(f, "{}", keyword),
            Payload::Count(n) => write!(f, "{}:{}", keyword, n),
            Payload::Integer(v) => write!(f, "{}:{}", keyword, v),
            Payload::Modulus(m) => write!(f, "{}:{}", keyword, m),
            Payload::Flags(flags) => write!(f, "{}:{}", keyword, flags),
            Payload::Text(text) => write!(f, "{}:{}", keyword, text),
        }
    }
}

impl FromStr for PredExp {
    type Err = PredExpError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (keyword, arg) = match token.split_once(':') {
            Some((keyword, arg)) => (keyword, Some(arg)),
            None => (token, None),
        };
        let invalid = |reason: &str| PredExpError::InvalidToken {
            token: token.to_string(),
            reason: reason.to_string(),
        };
        let opcode =
            Opcode::from_keyword(keyword).ok_or_else(|| invalid("unknown keyword"))?;

        let text = || arg.ok_or_else(|| invalid("missing argument"));
        let number = |what: &str| -> Result<i64, PredExpError> {
            text()?
                .parse::<i64>()
                .map_err(|e| invalid(&format!("invalid {}: {}", what, e)))
        };
        let narrow = |value: i64| invalid(&format!("argument {} out of range", value));

        use Opcode::*;
        let node = match opcode {
            And | Or => {
                let n = number("child count")?;
                let n = u16::try_from(n).map_err(|_| narrow(n))?;
                if opcode == And {
                    PredExp::and(n)?
                } else {
                    PredExp::or(n)?
                }
            }
            IntegerValue => PredExp::integer_value(number("integer")?),
            RecDigestModulo => {
                let m = number("modulus")?;
                PredExp::rec_digest_modulo(i32::try_from(m).map_err(|_| narrow(m))?)?
            }
            StringRegex => {
                let flags = match arg {
                    Some(_) => {
                        let flags = number("flags")?;
                        u32::try_from(flags).map_err(|_| narrow(flags))?
                    }
                    None => 0,
                };
                PredExp::string_regex(flags)?
            }
            StringValue => PredExp::string_value(text()?)?,
            GeoJsonValue => PredExp::geojson_value(text()?)?,
            IntegerBin => PredExp::integer_bin(text()?)?,
            StringBin => PredExp::string_bin(text()?)?,
            GeoJsonBin => PredExp::geojson_bin(text()?)?,
            ListBin => PredExp::list_bin(text()?)?,
            MapBin => PredExp::map_bin(text()?)?,
            IntegerVar => PredExp::integer_var(text()?)?,
            StringVar => PredExp::string_var(text()?)?,
            GeoJsonVar => PredExp::geojson_var(text()?)?,
            ListIterateOr => PredExp::list_iterate_or(text()?)?,
            ListIterateAnd => PredExp::list_iterate_and(text()?)?,
            MapKeyIterateOr => PredExp::mapkey_iterate_or(text()?)?,
            MapKeyIterateAnd => PredExp::mapkey_iterate_and(text()?)?,
            MapValIterateOr => PredExp::mapval_iterate_or(text()?)?,
            MapValIterateAnd => PredExp::mapval_iterate_and(text()?)?,
            _ => {
                if arg.is_some() {
                    return Err(invalid("takes no argument"));
                }
                match opcode {
                    Not => PredExp::not(),
                    RecDeviceSize => PredExp::rec_device_size(),
                    RecLastUpdate => PredExp::rec_last_update(),
                    RecVoidTime => PredExp::rec_void_time(),
                    IntegerEqual => PredExp::integer_equal(),
                    IntegerUnequal => PredExp::integer_unequal(),
                    IntegerGreater => PredExp::integer_greater(),
                    IntegerGreaterEq => PredExp::integer_greatereq(),
                    IntegerLess => PredExp::integer_less(),
                    IntegerLessEq => PredExp::integer_lesseq(),
                    StringEqual => PredExp::string_equal(),
                    StringUnequal => PredExp::string_unequal(),
                    GeoJsonWithin => PredExp::geojson_within(),
                    _ => PredExp::geojson_contains(),
                }
            }
        };
        Ok(node)
    }
}
