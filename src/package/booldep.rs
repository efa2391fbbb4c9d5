// src/package/booldep.rs

//! Boolean (rich) dependencies
//!
//! `(a or b)`, `(a and (b or c))`, `(a if b else c)`, `(a unless b)`,
//! `(a with b)` and `(a without b)`. All operators of one parenthesized level
//! must be the same, except for a single `else` after `if` or `unless`.
//!
//! Evaluation works against a [`DepCost`], which knows the providers of a
//! plain requirement and what it takes to get a package present. It yields
//! the provider sets that have to be met: the cheaper side of an `or`, the
//! branch a condition selects, the providers `with` and `without` leave.

use super::{CapReq, PackageId, Relation};
use crate::error::{Error, Result};
use crate::version::RpmVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cost of something that cannot be had at all
pub const UNSATISFIABLE: u32 = 99;

/// A parsed boolean dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoolDep {
    Req(CapReq),
    And(Box<BoolDep>, Box<BoolDep>),
    Or(Box<BoolDep>, Box<BoolDep>),
    If {
        then: Box<BoolDep>,
        cond: Box<BoolDep>,
        otherwise: Option<Box<BoolDep>>,
    },
    Unless {
        then: Box<BoolDep>,
        cond: Box<BoolDep>,
        otherwise: Option<Box<BoolDep>>,
    },
    With(Box<BoolDep>, Box<BoolDep>),
    Without(Box<BoolDep>, Box<BoolDep>),
}

/// What evaluation needs to know about the packages around it
pub trait DepCost {
    /// Packages providing `req`, best first
    fn providers(&self, req: &CapReq) -> Vec<PackageId>;

    /// 0 when `id` is already present, higher the harder it is to get
    fn cost(&self, id: PackageId) -> u32;
}

/// One provider set picked by evaluation; any one of them meets it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Needed {
    pub providers: Vec<PackageId>,
    pub cost: u32,
}

impl Needed {
    fn from_providers<C: DepCost>(mut providers: Vec<PackageId>, ctx: &C) -> Self {
        providers.sort_by_key(|&id| ctx.cost(id));
        let cost = providers
            .first()
            .map(|&id| ctx.cost(id).min(UNSATISFIABLE))
            .unwrap_or(UNSATISFIABLE);
        Self { providers, cost }
    }
}

fn total(needed: &Option<Vec<Needed>>) -> u32 {
    match needed {
        Some(list) => list.iter().map(|n| n.cost).sum(),
        None => UNSATISFIABLE,
    }
}

impl BoolDep {
    /// Whether `expr` is written as a boolean dependency
    pub fn is_boolean(expr: &str) -> bool {
        expr.trim_start().starts_with('(')
    }

    pub fn parse(expr: &str) -> Result<Self> {
        let invalid = || Error::InvalidCapability(expr.to_string());
        let mut parser = Parser { src: expr, pos: 0 };
        parser.skip_ws();
        let dep = parser.group().ok_or_else(invalid)?;
        parser.skip_ws();
        if !parser.rest().is_empty() {
            return Err(invalid());
        }
        Ok(dep)
    }

    /// Every plain requirement the expression mentions
    pub fn leaves(&self) -> Vec<&CapReq> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a CapReq>) {
        match self {
            BoolDep::Req(req) => out.push(req),
            BoolDep::And(a, b) | BoolDep::Or(a, b) | BoolDep::With(a, b) | BoolDep::Without(a, b) => {
                a.collect_leaves(out);
                b.collect_leaves(out);
            }
            BoolDep::If { then, cond, otherwise } | BoolDep::Unless { then, cond, otherwise } => {
                then.collect_leaves(out);
                cond.collect_leaves(out);
                if let Some(e) = otherwise {
                    e.collect_leaves(out);
                }
            }
        }
    }

    /// Provider sets to meet, or `None` when the expression cannot be met
    ///
    /// An empty list means nothing is required.
    pub fn evaluate<C: DepCost>(&self, ctx: &C) -> Option<Vec<Needed>> {
        match self {
            BoolDep::Req(req) => Some(vec![Needed::from_providers(ctx.providers(req), ctx)]),
            BoolDep::And(a, b) => {
                let mut left = a.evaluate(ctx)?;
                left.extend(b.evaluate(ctx)?);
                Some(left)
            }
            BoolDep::Or(a, b) => {
                let left = a.evaluate(ctx);
                let right = b.evaluate(ctx);
                // Ties go to the left side
                if total(&right) < total(&left) { right } else { left }
            }
            BoolDep::If { then, cond, otherwise } => {
                if total(&cond.evaluate(ctx)) == 0 {
                    then.evaluate(ctx)
                } else {
                    otherwise.as_ref().map_or(Some(Vec::new()), |e| e.evaluate(ctx))
                }
            }
            BoolDep::Unless { then, cond, otherwise } => {
                if total(&cond.evaluate(ctx)) != 0 {
                    then.evaluate(ctx)
                } else {
                    otherwise.as_ref().map_or(Some(Vec::new()), |e| e.evaluate(ctx))
                }
            }
            BoolDep::With(a, b) => {
                let left = providers_of(a.evaluate(ctx)?);
                let right = providers_of(b.evaluate(ctx)?);
                let both: Vec<PackageId> = left.into_iter().filter(|id| right.contains(id)).collect();
                if both.is_empty() {
                    return None;
                }
                Some(vec![Needed::from_providers(both, ctx)])
            }
            BoolDep::Without(a, b) => {
                let left = providers_of(a.evaluate(ctx)?);
                let right = b.evaluate(ctx).map(providers_of).unwrap_or_default();
                let rest: Vec<PackageId> = left.into_iter().filter(|id| !right.contains(id)).collect();
                if rest.is_empty() {
                    return None;
                }
                Some(vec![Needed::from_providers(rest, ctx)])
            }
        }
    }

    /// Whether the expression holds with nothing new marked
    pub fn is_met<C: DepCost>(&self, ctx: &C) -> bool {
        self.evaluate(ctx)
            .is_some_and(|needed| needed.iter().all(|n| n.cost == 0))
    }
}

fn providers_of(needed: Vec<Needed>) -> Vec<PackageId> {
    let mut out: Vec<PackageId> = Vec::new();
    for id in needed.into_iter().flat_map(|n| n.providers) {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

impl fmt::Display for BoolDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolDep::Req(req) => write!(f, "{}", req),
            BoolDep::And(a, b) => write!(f, "({} and {})", a, b),
            BoolDep::Or(a, b) => write!(f, "({} or {})", a, b),
            BoolDep::With(a, b) => write!(f, "({} with {})", a, b),
            BoolDep::Without(a, b) => write!(f, "({} without {})", a, b),
            BoolDep::If { then, cond, otherwise } => match otherwise {
                Some(e) => write!(f, "({} if {} else {})", then, cond, e),
                None => write!(f, "({} if {})", then, cond),
            },
            BoolDep::Unless { then, cond, otherwise } => match otherwise {
                Some(e) => write!(f, "({} unless {} else {})", then, cond, e),
                None => write!(f, "({} unless {})", then, cond),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    And,
    Or,
    If,
    Unless,
    Else,
    With,
    Without,
}

impl Op {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "and" => Some(Op::And),
            "or" => Some(Op::Or),
            "if" => Some(Op::If),
            "unless" => Some(Op::Unless),
            "else" => Some(Op::Else),
            "with" => Some(Op::With),
            "without" => Some(Op::Without),
            _ => None,
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// A name, version or operator word
    ///
    /// Parentheses opened inside the word belong to it, as in `perl(Foo)`.
    fn word(&mut self) -> &'a str {
        let rest = self.rest();
        let mut depth = 0usize;
        let mut end = rest.len();
        for (i, c) in rest.char_indices() {
            match c {
                c if c.is_whitespace() || c == ',' => {
                    end = i;
                    break;
                }
                '(' => depth += 1,
                ')' if depth == 0 => {
                    end = i;
                    break;
                }
                ')' => depth -= 1,
                _ => {}
            }
        }
        self.pos += end;
        &rest[..end]
    }

    fn relation(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest.chars().take_while(|c| matches!(c, '<' | '=' | '>')).count();
        self.pos += len;
        &rest[..len]
    }

    fn operand(&mut self) -> Option<BoolDep> {
        self.skip_ws();
        if self.rest().starts_with('(') {
            return self.group();
        }
        let name = self.word();
        if name.is_empty() {
            return None;
        }
        let mut req = CapReq::new(name);

        self.skip_ws();
        let op = self.relation();
        if !op.is_empty() {
            self.skip_ws();
            req.relation = Relation::parse(op)?;
            req.version = Some(RpmVersion::parse(self.word()).ok()?);
        }
        Some(BoolDep::Req(req))
    }

    /// `( operand [op operand]... )`
    fn group(&mut self) -> Option<BoolDep> {
        if !self.eat('(') {
            return None;
        }
        let mut operands = vec![self.operand()?];
        let mut op: Option<Op> = None;
        let mut otherwise: Option<BoolDep> = None;

        loop {
            self.skip_ws();
            if self.eat(')') {
                break;
            }
            let next = Op::parse(self.word())?;
            match (op, next) {
                (Some(Op::If | Op::Unless), Op::Else) if otherwise.is_none() => {
                    otherwise = Some(self.operand()?);
                    continue;
                }
                (None, Op::Else) => return None,
                (None, _) => op = Some(next),
                (Some(Op::If | Op::Unless), _) => return None,
                (Some(current), _) if current == next => {}
                _ => return None,
            }
            operands.push(self.operand()?);
        }

        let Some(op) = op else {
            return operands.pop();
        };
        if matches!(op, Op::If | Op::Unless) {
            let [then, cond]: [BoolDep; 2] = operands.try_into().ok()?;
            let (then, cond) = (Box::new(then), Box::new(cond));
            let otherwise = otherwise.map(Box::new);
            return Some(match op {
                Op::If => BoolDep::If { then, cond, otherwise },
                _ => BoolDep::Unless { then, cond, otherwise },
            });
        }

        // Chains nest to the right: (a with b with c) is (a with (b with c))
        let mut chain = operands.into_iter().rev();
        let mut dep = chain.next()?;
        for left in chain {
            let (l, r) = (Box::new(left), Box::new(dep));
            dep = match op {
                Op::And => BoolDep::And(l, r),
                Op::Or => BoolDep::Or(l, r),
                Op::With => BoolDep::With(l, r),
                _ => BoolDep::Without(l, r),
            };
        }
        Some(dep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Names map to one provider each; listed names are present
    struct Names {
        ids: HashMap<&'static str, PackageId>,
        present: Vec<&'static str>,
    }

    impl Names {
        fn new(present: &[&'static str]) -> Self {
            let ids = ["a", "b", "c", "d"]
                .iter()
                .enumerate()
                .map(|(i, &n)| (n, PackageId(i)))
                .collect();
            Self {
                ids,
                present: present.to_vec(),
            }
        }

        fn name(&self, id: PackageId) -> &'static str {
            ["a", "b", "c", "d"][id.0]
        }
    }

    impl DepCost for Names {
        fn providers(&self, req: &CapReq) -> Vec<PackageId> {
            self.ids.get(req.name.as_str()).copied().into_iter().collect()
        }

        fn cost(&self, id: PackageId) -> u32 {
            if self.present.contains(&self.name(id)) { 0 } else { 1 }
        }
    }

    fn picked(expr: &str, present: &[&'static str]) -> Option<String> {
        let ctx = Names::new(present);
        let needed = BoolDep::parse(expr).unwrap().evaluate(&ctx)?;
        if needed.is_empty() {
            return None;
        }
        Some(
            needed
                .iter()
                .map(|n| ctx.name(n.providers[0]))
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    #[test]
    fn test_parse_shapes() {
        let cases = [
            ("(a and b)", "(a and b)"),
            ("(a or b)", "(a or b)"),
            ("(a and (b or c))", "(a and (b or c))"),
            ("((a or b) and (c or d))", "((a or b) and (c or d))"),
            ("(a if b)", "(a if b)"),
            ("(a if (b or c))", "(a if (b or c))"),
            ("(a if b else c)", "(a if b else c)"),
            ("(a unless b else c)", "(a unless b else c)"),
            ("(a without b)", "(a without b)"),
            ("(a with b with c)", "(a with (b with c))"),
            ("(  a  or   b )", "(a or b)"),
            ("((a))", "a"),
        ];
        for (expr, shown) in cases {
            assert_eq!(BoolDep::parse(expr).unwrap().to_string(), shown, "{}", expr);
        }
    }

    #[test]
    fn test_parse_versions_and_call_names() {
        let dep = BoolDep::parse("(perl(Foo::Bar) >= 1.2 or libfoo)").unwrap();
        let leaves = dep.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].name, "perl(Foo::Bar)");
        assert_eq!(leaves[0].relation, Relation::Ge);
        assert_eq!(leaves[0].version.as_ref().unwrap().to_string(), "1.2");
        assert_eq!(leaves[1].name, "libfoo");
    }

    #[test]
    fn test_parse_rejects() {
        for expr in [
            "a or b",
            "(a or b",
            "(a or ",
            "(a on b)",
            "(a if)",
            "(a or b and c)",
            "(a if b if c)",
            "(a else b)",
            "(a if b else c else d)",
            "(a or b) trailing",
            "(a >= )",
        ] {
            assert!(BoolDep::parse(expr).is_err(), "{}", expr);
        }
    }

    #[test]
    fn test_or_prefers_present_then_left() {
        assert_eq!(picked("(a or b)", &["a"]).as_deref(), Some("a"));
        assert_eq!(picked("(a or b)", &["b"]).as_deref(), Some("b"));
        assert_eq!(picked("(a or b)", &[]).as_deref(), Some("a"));
        assert_eq!(picked("(a or b or c)", &["c"]).as_deref(), Some("c"));
        assert_eq!(picked("(a or zzz)", &[]).as_deref(), Some("a"));
        assert_eq!(picked("(zzz or b)", &[]).as_deref(), Some("b"));
    }

    #[test]
    fn test_and_keeps_both_sides() {
        assert_eq!(picked("(a and b)", &["a"]).as_deref(), Some("a,b"));
        assert_eq!(picked("(a and b and c)", &[]).as_deref(), Some("a,b,c"));
        assert_eq!(picked("(a and (b or c))", &[]).as_deref(), Some("a,b"));
        assert_eq!(picked("(a and (b or c))", &["c"]).as_deref(), Some("a,c"));
    }

    #[test]
    fn test_conditions() {
        assert_eq!(picked("(a if b)", &[]), None);
        assert_eq!(picked("(a if b)", &["a"]), None);
        assert_eq!(picked("(a if b)", &["b"]).as_deref(), Some("a"));
        assert_eq!(picked("((a and c) if b)", &["b"]).as_deref(), Some("a,c"));
        assert_eq!(picked("(a if (b or c))", &["c"]).as_deref(), Some("a"));
        assert_eq!(picked("(a if b else c)", &[]).as_deref(), Some("c"));

        assert_eq!(picked("(a unless b)", &[]).as_deref(), Some("a"));
        assert_eq!(picked("(a unless b)", &["b"]), None);
        assert_eq!(picked("(a unless (b or c))", &["c"]), None);
        assert_eq!(picked("(a unless b else c)", &["b"]).as_deref(), Some("c"));
    }

    #[test]
    fn test_with_and_without_narrow_providers() {
        let ctx = Names::new(&[]);
        assert!(BoolDep::parse("(a with b)").unwrap().evaluate(&ctx).is_none());
        assert!(BoolDep::parse("(a without a)").unwrap().evaluate(&ctx).is_none());

        let needed = BoolDep::parse("(a without b)").unwrap().evaluate(&ctx).unwrap();
        assert_eq!(needed[0].providers, vec![PackageId(0)]);
        let needed = BoolDep::parse("(a with a)").unwrap().evaluate(&ctx).unwrap();
        assert_eq!(needed[0].cost, 1);
    }

    #[test]
    fn test_is_met() {
        let dep = BoolDep::parse("(a or b)").unwrap();
        assert!(dep.is_met(&Names::new(&["b"])));
        assert!(!dep.is_met(&Names::new(&["c"])));
        assert!(BoolDep::parse("(a if b)").unwrap().is_met(&Names::new(&[])));
        assert!(!BoolDep::parse("(a without a)").unwrap().is_met(&Names::new(&["a"])));
    }
}
