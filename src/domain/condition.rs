//! Boolean expression tree for job and step `if:` conditions.
//!
//! Conditions are built from a closed set of nodes and rendered to the
//! GitHub Actions expression dialect by [`Condition::render`]. Empty
//! conjunctions render as `true` and empty disjunctions as `false`, so
//! composition stays total and associative.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Context property such as `github.event.issue.number`.
    Property(String),
    /// Single-quoted string literal.
    Literal(String),
    /// Function call such as `cancelled()` or `contains(a, b)`.
    Call { name: String, args: Vec<Condition> },
    Not(Box<Condition>),
    Compare { left: Box<Condition>, op: CompareOp, right: Box<Condition> },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    /// The agent produced at least `min` items of `kind`, or any when `min` is 0.
    KindPresent { main_job: String, kind: String, min: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }
}

impl Condition {
    pub fn property(path: impl Into<String>) -> Self {
        Condition::Property(path.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Condition::Literal(value.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<Condition>) -> Self {
        Condition::Call { name: name.into(), args }
    }

    pub fn negate(inner: Condition) -> Self {
        Condition::Not(Box::new(inner))
    }

    pub fn equals(left: Condition, right: Condition) -> Self {
        Condition::Compare { left: Box::new(left), op: CompareOp::Eq, right: Box::new(right) }
    }

    pub fn not_equals(left: Condition, right: Condition) -> Self {
        Condition::Compare { left: Box::new(left), op: CompareOp::Ne, right: Box::new(right) }
    }

    pub fn kind_present(main_job: impl Into<String>, kind: impl Into<String>, min: u32) -> Self {
        Condition::KindPresent { main_job: main_job.into(), kind: kind.into(), min }
    }

    /// Conjunction. Nested conjunctions are flattened, `true` operands are
    /// dropped and repeated operands are kept once.
    pub fn and(nodes: impl IntoIterator<Item = Condition>) -> Self {
        Condition::And(flatten(nodes, |node| match node {
            Condition::And(children) => Ok(children),
            other => Err(other),
        }))
    }

    /// Disjunction, normalized the same way as [`Condition::and`].
    pub fn or(nodes: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Or(flatten(nodes, |node| match node {
            Condition::Or(children) => Ok(children),
            other => Err(other),
        }))
    }

    /// `true` when rendering yields the literal `true`.
    pub fn is_always_true(&self) -> bool {
        matches!(self, Condition::And(children) if children.is_empty())
    }

    pub fn render(&self) -> String {
        match self {
            Condition::Property(path) => path.clone(),
            Condition::Literal(value) => format!("'{}'", value.replace('\'', "''")),
            Condition::Call { name, args } => {
                let args: Vec<String> = args.iter().map(Condition::render).collect();
                format!("{}({})", name, args.join(", "))
            }
            Condition::Not(inner) => match inner.as_ref() {
                Condition::Call { .. } | Condition::Property(_) => format!("!{}", inner.render()),
                _ => format!("!({})", inner.render()),
            },
            Condition::Compare { left, op, right } => {
                format!("{} {} {}", left.render(), op.symbol(), right.render())
            }
            Condition::And(children) => render_joined(children, " && ", "true"),
            Condition::Or(children) => render_joined(children, " || ", "false"),
            Condition::KindPresent { .. } => self.expand_kind_present().render(),
        }
    }

    /// Evaluate against a context snapshot. Used to check scheduling behavior
    /// without a runner.
    pub fn evaluate(&self, ctx: &EvalContext) -> bool {
        truthy(self.value(ctx).as_deref())
    }

    fn value(&self, ctx: &EvalContext) -> Option<String> {
        match self {
            Condition::Property(path) => ctx.properties.get(path).cloned(),
            Condition::Literal(value) => Some(value.clone()),
            Condition::Call { name, args } => {
                let result = match name.as_str() {
                    "always" => true,
                    "cancelled" => ctx.cancelled,
                    "success" => !ctx.cancelled && !ctx.failed,
                    "failure" => ctx.failed,
                    "contains" => match (args.first(), args.get(1)) {
                        (Some(haystack), Some(needle)) => {
                            match (haystack.value(ctx), needle.value(ctx)) {
                                (Some(h), Some(n)) => h.contains(&n),
                                _ => false,
                            }
                        }
                        _ => false,
                    },
                    _ => false,
                };
                Some(result.to_string())
            }
            Condition::Not(inner) => Some((!inner.evaluate(ctx)).to_string()),
            Condition::Compare { left, op, right } => {
                let l = left.value(ctx).unwrap_or_default();
                let r = right.value(ctx).unwrap_or_default();
                let equal = l == r;
                Some(match op {
                    CompareOp::Eq => equal,
                    CompareOp::Ne => !equal,
                }
                .to_string())
            }
            Condition::And(children) => Some(children.iter().all(|c| c.evaluate(ctx)).to_string()),
            Condition::Or(children) => Some(children.iter().any(|c| c.evaluate(ctx)).to_string()),
            Condition::KindPresent { .. } => self.expand_kind_present().value(ctx),
        }
    }

    fn expand_kind_present(&self) -> Condition {
        let Condition::KindPresent { main_job, kind, min } = self else {
            return self.clone();
        };
        let mut parts = vec![
            Condition::negate(Condition::call("cancelled", vec![])),
            Condition::not_equals(
                Condition::property(format!("needs.{}.result", main_job)),
                Condition::literal("skipped"),
            ),
        ];
        // With a minimum the job must run even for zero items so the script can
        // report the shortfall.
        if *min == 0 {
            parts.push(Condition::call(
                "contains",
                vec![
                    Condition::property(format!("needs.{}.outputs.output_types", main_job)),
                    Condition::literal(kind.clone()),
                ],
            ));
        }
        Condition::And(parts)
    }

    fn is_compound(&self) -> bool {
        match self {
            Condition::And(children) | Condition::Or(children) => children.len() > 1,
            Condition::KindPresent { .. } => true,
            _ => false,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn flatten<F>(nodes: impl IntoIterator<Item = Condition>, unwrap_same: F) -> Vec<Condition>
where
    F: Fn(Condition) -> Result<Vec<Condition>, Condition>,
{
    let mut out: Vec<Condition> = Vec::new();
    for node in nodes {
        let expanded = match unwrap_same(node) {
            Ok(children) => children,
            Err(single) => vec![single],
        };
        for child in expanded {
            if !out.contains(&child) {
                out.push(child);
            }
        }
    }
    out
}

fn render_joined(children: &[Condition], separator: &str, neutral: &str) -> String {
    match children {
        [] => neutral.to_string(),
        [only] => only.render(),
        _ => children
            .iter()
            .map(|child| {
                if child.is_compound() { format!("({})", child.render()) } else { child.render() }
            })
            .collect::<Vec<_>>()
            .join(separator),
    }
}

fn truthy(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(v) => !(v.is_empty() || v == "false" || v == "0" || v == "null"),
    }
}

/// Context snapshot for [`Condition::evaluate`].
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    pub properties: BTreeMap<String, String>,
    pub cancelled: bool,
    pub failed: bool,
}

impl EvalContext {
    pub fn with(mut self, path: &str, value: &str) -> Self {
        self.properties.insert(path.to_string(), value.to_string());
        self
    }
}
