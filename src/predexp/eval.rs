//! Reference model of server-side evaluation.
//!
//! Programs are evaluated by the server, never by the client. This model
//! reproduces the evaluation rules (unknown operands, vacuous truth on empty
//! collections) so programs built here can be checked against records in tests.
//! GeoJSON predicates are not modelled.

use std::collections::HashMap;

use regex::RegexBuilder;

use crate::predexp::node::{regex_flags, Payload, PredExp};
use crate::predexp::opcode::{Category, Opcode};

/// A bin value stored in a test record
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Bin {
    Integer(i64),
    String(String),
    GeoJson(String),
    List(Vec<Bin>),
    Map(Vec<(Bin, Bin)>),
}

#[derive(Debug, Default)]
pub(crate) struct Record {
    bins: HashMap<String, Bin>,
    device_size: i64,
    last_update: i64,
    void_time: i64,
    digest: [u8; 20],
}

impl Record {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bin(mut self, name: &str, value: Bin) -> Self {
        self.bins.insert(name.to_string(), value);
        self
    }

    pub(crate) fn digest(mut self, digest: [u8; 20]) -> Self {
        self.digest = digest;
        self
    }

    pub(crate) fn last_update(mut self, nanos: i64) -> Self {
        self.last_update = nanos;
        self
    }
}

/// Value left on the evaluation stack
#[derive(Debug, Clone, PartialEq)]
enum Item {
    /// Missing bin, or a bin of the wrong type
    Unknown,
    Bool(bool),
    Integer(i64),
    Str(String),
    List(Vec<Bin>),
    Map(Vec<(Bin, Bin)>),
}

impl Item {
    fn from_bin(bin: &Bin, opcode: Opcode) -> Item {
        use Opcode::*;
        match (opcode, bin) {
            (IntegerBin | IntegerVar, Bin::Integer(v)) => Item::Integer(*v),
            (StringBin | StringVar, Bin::String(s)) => Item::Str(s.clone()),
            (GeoJsonBin | GeoJsonVar, Bin::GeoJson(s)) => Item::Str(s.clone()),
            (ListBin, Bin::List(items)) => Item::List(items.clone()),
            (MapBin, Bin::Map(entries)) => Item::Map(entries.clone()),
            _ => Item::Unknown,
        }
    }
}

/// Postfix program rebuilt as a tree, the way the server parses it
struct Tree<'a> {
    node: &'a PredExp,
    children: Vec<Tree<'a>>,
}

fn arity(node: &PredExp) -> usize {
    match (node.opcode().category(), node.payload()) {
        (Category::Connective, Payload::Count(n)) => usize::from(*n),
        (Category::Connective, _) => 1,
        (Category::Comparison | Category::Iteration, _) => 2,
        _ => 0,
    }
}

fn build(nodes: &[PredExp]) -> Result<Tree<'_>, String> {
    let mut stack: Vec<Tree> = Vec::new();
    for node in nodes {
        let n = arity(node);
        if stack.len() < n {
            return Err(format!("stack underflow at {}", node));
        }
        let children = stack.split_off(stack.len() - n);
        stack.push(Tree { node, children });
    }
    match (stack.pop(), stack.is_empty()) {
        (Some(root), true) => Ok(root),
        _ => Err("program does not reduce to a single expression".to_string()),
    }
}

/// Evaluate a program against a record
pub(crate) fn evaluate(nodes: &[PredExp], record: &Record) -> Result<bool, String> {
    let tree = build(nodes)?;
    let mut scope = Vec::new();
    match eval(&tree, record, &mut scope)? {
        Item::Bool(b) => Ok(b),
        other => Err(format!("program result is not boolean: {:?}", other)),
    }
}

fn eval(tree: &Tree, record: &Record, scope: &mut Vec<(String, Bin)>) -> Result<Item, String> {
    use Opcode::*;
    let node = tree.node;
    let opcode = node.opcode();
    let text = || match node.payload() {
        Payload::Text(t) => t.clone(),
        _ => String::new(),
    };

    let item = match opcode {
        IntegerValue => match node.payload() {
            Payload::Integer(v) => Item::Integer(*v),
            _ => Item::Unknown,
        },
        StringValue | GeoJsonValue => Item::Str(text()),
        IntegerBin | StringBin | GeoJsonBin | ListBin | MapBin => record
            .bins
            .get(&text())
            .map(|bin| Item::from_bin(bin, opcode))
            .unwrap_or(Item::Unknown),
        IntegerVar | StringVar | GeoJsonVar => {
            let name = text();
            scope
                .iter()
                .rev()
                .find(|(bound, _)| *bound == name)
                .map(|(_, bin)| Item::from_bin(bin, opcode))
                .unwrap_or(Item::Unknown)
        }
        RecDeviceSize => Item::Integer(record.device_size),
        RecLastUpdate => Item::Integer(record.last_update),
        RecVoidTime => Item::Integer(record.void_time),
        RecDigestModulo => {
            let modulus = match node.payload() {
                Payload::Modulus(m) => i64::from(*m),
                _ => return Err("digest modulo without modulus".to_string()),
            };
            let mut word = [0u8; 4];
            word.copy_from_slice(&record.digest[..4]);
            Item::Integer(i64::from(u32::from_le_bytes(word)) % modulus)
        }
        And | Or | Not => {
            let mut values = Vec::with_capacity(tree.children.len());
            for child in &tree.children {
                match eval(child, record, scope)? {
                    Item::Bool(b) => values.push(b),
                    other => return Err(format!("{} operand is not boolean: {:?}", opcode, other)),
                }
            }
            Item::Bool(match opcode {
                And => values.iter().all(|b| *b),
                Or => values.iter().any(|b| *b),
                _ => !values[0],
            })
        }
        GeoJsonWithin | GeoJsonContains => {
            return Err("geojson predicates are not modelled".to_string())
        }
        _ if opcode.category() == Category::Comparison => {
            let left = eval(&tree.children[0], record, scope)?;
            let right = eval(&tree.children[1], record, scope)?;
            Item::Bool(compare(node, left, right)?)
        }
        _ => Item::Bool(iterate(tree, record, scope)?),
    };
    Ok(item)
}

/// Comparisons with an unknown or mistyped operand are false
fn compare(node: &PredExp, left: Item, right: Item) -> Result<bool, String> {
    use Opcode::*;
    let result = match (node.opcode(), left, right) {
        (IntegerEqual, Item::Integer(l), Item::Integer(r)) => l == r,
        (IntegerUnequal, Item::Integer(l), Item::Integer(r)) => l != r,
        (IntegerGreater, Item::Integer(l), Item::Integer(r)) => l > r,
        (IntegerGreaterEq, Item::Integer(l), Item::Integer(r)) => l >= r,
        (IntegerLess, Item::Integer(l), Item::Integer(r)) => l < r,
        (IntegerLessEq, Item::Integer(l), Item::Integer(r)) => l <= r,
        (StringEqual, Item::Str(l), Item::Str(r)) => l == r,
        (StringUnequal, Item::Str(l), Item::Str(r)) => l != r,
        (StringRegex, Item::Str(l), Item::Str(pattern)) => {
            let flags = match node.payload() {
                Payload::Flags(f) => *f,
                _ => 0,
            };
            RegexBuilder::new(&pattern)
                .case_insensitive(flags & regex_flags::ICASE != 0)
                .multi_line(flags & regex_flags::NEWLINE != 0)
                .build()
                .map_err(|e| e.to_string())?
                .is_match(&l)
        }
        _ => false,
    };
    Ok(result)
}

/// OR over no elements is false, AND over no elements is true
fn iterate(tree: &Tree, record: &Record, scope: &mut Vec<(String, Bin)>) -> Result<bool, String> {
    use Opcode::*;
    let opcode = tree.node.opcode();
    let var = tree.node.name().unwrap_or_default().to_string();

    let elements: Vec<Bin> = match (opcode, eval(&tree.children[1], record, scope)?) {
        (ListIterateOr | ListIterateAnd, Item::List(items)) => items,
        (MapKeyIterateOr | MapKeyIterateAnd, Item::Map(entries)) => {
            entries.into_iter().map(|(k, _)| k).collect()
        }
        (MapValIterateOr | MapValIterateAnd, Item::Map(entries)) => {
            entries.into_iter().map(|(_, v)| v).collect()
        }
        _ => return Ok(false),
    };

    let is_or = matches!(opcode, ListIterateOr | MapKeyIterateOr | MapValIterateOr);
    for element in elements {
        scope.push((var.clone(), element));
        let result = eval(&tree.children[0], record, scope);
        scope.pop();
        match result? {
            Item::Bool(b) if b == is_or => return Ok(is_or),
            Item::Bool(_) => {}
            other => return Err(format!("{} subexpression is not boolean: {:?}", opcode, other)),
        }
    }
    Ok(!is_or)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(tokens: &[&str]) -> Vec<PredExp> {
        tokens.iter().map(|t| t.parse().unwrap()).collect()
    }

    fn range_11_to_20() -> Vec<PredExp> {
        program(&["int_bin:c", "int:11", "int_ge", "int_bin:c", "int:20", "int_le", "and:2"])
    }

    #[test]
    fn test_range_scenario() {
        let nodes = range_11_to_20();
        let record = Record::new().bin("c", Bin::Integer(15));
        assert_eq!(evaluate(&nodes, &record), Ok(true));

        let record = Record::new().bin("c", Bin::Integer(25));
        assert_eq!(evaluate(&nodes, &record), Ok(false));

        let record = Record::new().bin("other", Bin::Integer(15));
        assert_eq!(evaluate(&nodes, &record), Ok(false));
    }

    #[test]
    fn test_missing_bin_idiom() {
        let record = Record::new().bin("name", Bin::String("bob".into()));

        let nodes = program(&["int_bin:age", "int:30", "int_eq"]);
        assert_eq!(evaluate(&nodes, &record), Ok(false));
        let nodes = program(&["int_bin:age", "int:30", "int_ne"]);
        assert_eq!(evaluate(&nodes, &record), Ok(false));

        let nodes = program(&["int_bin:age", "int:30", "int_eq", "not"]);
        assert_eq!(evaluate(&nodes, &record), Ok(true));

        // Wrong type behaves like a missing bin
        let nodes = program(&["int_bin:name", "int:0", "int_gt"]);
        assert_eq!(evaluate(&nodes, &record), Ok(false));

        let record = Record::new().bin("loc", Bin::GeoJson(r#"{"type":"Point"}"#.into()));
        let nodes = program(&["str_bin:loc", r#"str:{"type":"Point"}"#, "str_eq"]);
        assert_eq!(evaluate(&nodes, &record), Ok(false));
        let nodes = program(&["str_bin:loc", "str:x", "str_ne", "not"]);
        assert_eq!(evaluate(&nodes, &record), Ok(true));
    }

    #[test]
    fn test_vacuous_truth() {
        let record = Record::new().bin("nums", Bin::List(vec![]));

        let any = program(&["int_var:x", "int:1", "int_eq", "list_bin:nums", "list_or:x"]);
        let all = program(&["int_var:x", "int:1", "int_eq", "list_bin:nums", "list_and:x"]);
        assert_eq!(evaluate(&any, &record), Ok(false));
        assert_eq!(evaluate(&all, &record), Ok(true));

        let record = Record::new().bin("nums", Bin::List(vec![Bin::Integer(1), Bin::Integer(2)]));
        assert_eq!(evaluate(&any, &record), Ok(true));
        assert_eq!(evaluate(&all, &record), Ok(false));
    }

    #[test]
    fn test_map_iteration() {
        let record = Record::new().bin(
            "petcount",
            Bin::Map(vec![
                (Bin::String("cat".into()), Bin::Integer(2)),
                (Bin::String("dog".into()), Bin::Integer(0)),
            ]),
        );

        let has_cat = program(&["str:cat", "str_var:k", "str_eq", "map_bin:petcount", "mapkey_or:k"]);
        assert_eq!(evaluate(&has_cat, &record), Ok(true));

        let all_positive =
            program(&["int_var:v", "int:0", "int_gt", "map_bin:petcount", "mapval_and:v"]);
        assert_eq!(evaluate(&all_positive, &record), Ok(false));

        // Missing map bin
        let nodes = program(&["str:cat", "str_var:k", "str_eq", "map_bin:absent", "mapkey_and:k"]);
        assert_eq!(evaluate(&nodes, &record), Ok(false));
    }

    #[test]
    fn test_empty_map_iteration() {
        let record = Record::new().bin("m", Bin::Map(vec![]));
        let over_keys = |iterator: &str| {
            program(&["str_var:k", "str:a", "str_eq", "map_bin:m", iterator])
        };
        let over_values = |iterator: &str| {
            program(&["int_var:v", "int:0", "int_gt", "map_bin:m", iterator])
        };

        assert_eq!(evaluate(&over_keys("mapkey_or:k"), &record), Ok(false));
        assert_eq!(evaluate(&over_keys("mapkey_and:k"), &record), Ok(true));
        assert_eq!(evaluate(&over_values("mapval_or:v"), &record), Ok(false));
        assert_eq!(evaluate(&over_values("mapval_and:v"), &record), Ok(true));
    }

    #[test]
    fn test_regex_and_metadata() {
        let record = Record::new()
            .bin("fruit", Bin::String("Apple".into()))
            .last_update(1_000)
            .digest([4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

        let nodes = program(&["str_bin:fruit", "str:^app", "str_regex:2"]);
        assert_eq!(evaluate(&nodes, &record), Ok(true));
        let nodes = program(&["str_bin:fruit", "str:^app", "str_regex"]);
        assert_eq!(evaluate(&nodes, &record), Ok(false));

        let nodes = program(&["digest_mod:3", "int:1", "int_eq"]);
        assert_eq!(evaluate(&nodes, &record), Ok(true));

        let nodes = program(&["last_update", "int:500", "int_gt"]);
        assert_eq!(evaluate(&nodes, &record), Ok(true));
    }

    #[test]
    fn test_malformed_programs() {
        let record = Record::new();
        assert!(evaluate(&program(&["int_eq"]), &record).is_err());
        assert!(evaluate(&program(&["int:1", "int:2"]), &record).is_err());
        assert!(evaluate(&program(&["int:1"]), &record).is_err());
    }
}
