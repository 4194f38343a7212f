//! Static checking of predicate programs.
//!
//! The validator replays a program's stack effects without evaluating
//! anything: each node's operands must be present and of the right kind, every
//! iteration variable must be bound by an iterator that consumes it, and the
//! program must finish with exactly one boolean on the stack.

use log::debug;

use crate::predexp::error::ValidationError;
use crate::predexp::list::PredExpList;
use crate::predexp::node::{Payload, PredExp};
use crate::predexp::opcode::{Category, Opcode};

/// Kind of item a node leaves on the evaluation stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Logical,
    Integer,
    String,
    GeoJson,
    List,
    Map,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Kind::Logical => "logical",
            Kind::Integer => "integer",
            Kind::String => "string",
            Kind::GeoJson => "geojson",
            Kind::List => "list",
            Kind::Map => "map",
        }
    }

    /// Kind produced by a value-producing opcode
    fn produced_by(opcode: Opcode) -> Kind {
        use Opcode::*;
        match opcode {
            IntegerValue | IntegerBin | IntegerVar | RecDeviceSize | RecLastUpdate
            | RecVoidTime | RecDigestModulo => Kind::Integer,
            StringValue | StringBin | StringVar => Kind::String,
            GeoJsonValue | GeoJsonBin | GeoJsonVar => Kind::GeoJson,
            ListBin => Kind::List,
            MapBin => Kind::Map,
            _ => Kind::Logical,
        }
    }

    /// Operand kind a comparison expects on both sides
    fn compared_by(opcode: Opcode) -> Kind {
        use Opcode::*;
        match opcode {
            StringEqual | StringUnequal | StringRegex => Kind::String,
            GeoJsonWithin | GeoJsonContains => Kind::GeoJson,
            _ => Kind::Integer,
        }
    }

    /// Collection kind an iterator walks
    fn iterated_by(opcode: Opcode) -> Kind {
        match opcode {
            Opcode::ListIterateOr | Opcode::ListIterateAnd => Kind::List,
            _ => Kind::Map,
        }
    }
}

/// Where a stack entry came from
fn origin(category: Category) -> &'static str {
    match category {
        Category::Constant => "constant",
        Category::Bin => "bin",
        Category::Variable => "variable",
        Category::Metadata => "metadata",
        Category::Connective | Category::Comparison | Category::Iteration => "expression",
    }
}

/// A simulated stack entry
#[derive(Debug)]
struct Operand {
    kind: Kind,
    category: Category,
    /// Iteration variables referenced but not yet bound
    free_vars: Vec<String>,
}

/// Stack-effect checker for predicate programs
#[derive(Debug, Default)]
pub struct Validator {
    stack: Vec<Operand>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a program given in evaluation order
    pub fn check(mut self, nodes: &[PredExp]) -> Result<(), ValidationError> {
        if nodes.is_empty() {
            return Err(ValidationError::EmptyProgram);
        }

        for (position, node) in nodes.iter().enumerate() {
            self.step(position, node)?;
        }

        if self.stack.len() != 1 {
            return Err(ValidationError::LeftoverStack {
                depth: self.stack.len(),
            });
        }
        let result = self.stack.remove(0);
        if result.kind != Kind::Logical {
            return Err(ValidationError::NonLogicalResult {
                actual: result.kind.as_str(),
            });
        }
        if let Some(name) = result.free_vars.into_iter().next() {
            return Err(ValidationError::UnboundVariable { name });
        }

        debug!("predexp validate: {} nodes ok", nodes.len());
        Ok(())
    }

    fn step(&mut self, position: usize, node: &PredExp) -> Result<(), ValidationError> {
        let opcode = node.opcode();
        let category = opcode.category();
        match category {
            Category::Constant | Category::Bin | Category::Metadata => {
                self.push(Kind::produced_by(opcode), category, Vec::new());
            }
            Category::Variable => {
                let free_vars = node.name().map(str::to_owned).into_iter().collect();
                self.push(Kind::produced_by(opcode), category, free_vars);
            }
            Category::Connective => {
                let count = match node.payload() {
                    Payload::Count(n) => usize::from(*n),
                    _ => 1,
                };
                let operands = self.pop_n(position, opcode, count)?;
                let mut free_vars = Vec::new();
                for operand in operands {
                    Self::expect(position, opcode, Kind::Logical, operand.kind)?;
                    free_vars.extend(operand.free_vars);
                }
                self.push(Kind::Logical, category, free_vars);
            }
            Category::Comparison => {
                let expected = Kind::compared_by(opcode);
                let (left, right) = self.pop_pair(position, opcode)?;
                Self::expect(position, opcode, expected, left.kind)?;
                Self::expect(position, opcode, expected, right.kind)?;
                // The regex pattern and the geo region must be literals
                let constant_right = matches!(
                    opcode,
                    Opcode::StringRegex | Opcode::GeoJsonWithin | Opcode::GeoJsonContains
                );
                if constant_right && right.category != Category::Constant {
                    return Err(ValidationError::OperandMismatch {
                        position,
                        opcode,
                        expected: "constant",
                        actual: origin(right.category),
                    });
                }
                let mut free_vars = left.free_vars;
                free_vars.extend(right.free_vars);
                self.push(Kind::Logical, category, free_vars);
            }
            Category::Iteration => {
                let (subexpression, collection) = self.pop_pair(position, opcode)?;
                Self::expect(position, opcode, Kind::Logical, subexpression.kind)?;
                Self::expect(position, opcode, Kind::iterated_by(opcode), collection.kind)?;

                let bound = node.name().unwrap_or_default();
                let mut free_vars: Vec<String> = subexpression
                    .free_vars
                    .into_iter()
                    .filter(|name| name != bound)
                    .collect();
                free_vars.extend(collection.free_vars);
                self.push(Kind::Logical, category, free_vars);
            }
        }
        Ok(())
    }

    fn push(&mut self, kind: Kind, category: Category, free_vars: Vec<String>) {
        self.stack.push(Operand {
            kind,
            category,
            free_vars,
        });
    }

    /// Pop the top `count` operands, returned deepest first
    fn pop_n(
        &mut self,
        position: usize,
        opcode: Opcode,
        count: usize,
    ) -> Result<Vec<Operand>, ValidationError> {
        if self.stack.len() < count {
            return Err(ValidationError::StackUnderflow {
                position,
                opcode,
                needed: count,
                available: self.stack.len(),
            });
        }
        let at = self.stack.len() - count;
        Ok(self.stack.split_off(at))
    }

    /// Pop the two topmost operands as (deeper, shallower)
    fn pop_pair(
        &mut self,
        position: usize,
        opcode: Opcode,
    ) -> Result<(Operand, Operand), ValidationError> {
        let underflow = ValidationError::StackUnderflow {
            position,
            opcode,
            needed: 2,
            available: self.stack.len(),
        };
        let shallower = self.stack.pop().ok_or_else(|| underflow.clone())?;
        let deeper = self.stack.pop().ok_or(underflow)?;
        Ok((deeper, shallower))
    }

    fn expect(
        position: usize,
        opcode: Opcode,
        expected: Kind,
        actual: Kind,
    ) -> Result<(), ValidationError> {
        if expected != actual {
            return Err(ValidationError::OperandMismatch {
                position,
                opcode,
                expected: expected.as_str(),
                actual: actual.as_str(),
            });
        }
        Ok(())
    }
}

/// Helper function to validate a whole list
pub fn validate_program(list: &PredExpList) -> Result<(), ValidationError> {
    list.validate()
}
