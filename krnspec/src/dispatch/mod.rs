//! Dispatch construction: decision trees and flat priority chains.
//!
//! Both builders produce a [`DispatchPlan`], a small conditional IR that is
//! rendered into the wrapper body and can be evaluated directly against a
//! [`RuntimeTuple`] to see which variant a call would reach.
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::condition::{padding_condition, CmpOp, Condition, Operand, RuntimeTuple};
use crate::descriptor::{DispatchParam, KernelBase, VariantDescriptor, PADDING_VARIABLES};
use crate::error::{Diagnostic, GenError, GenResult};
use crate::naming::{call_statement, MAX_LINE_LEN};
use crate::types::{Layout, OpFamily, OpKind};

pub mod flat;
pub mod tree;

pub use flat::{build_list, order_variants};
pub use tree::build_tree;

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DispatchStyle {
    /// Nested conditional blocks, one level per hierarchy parameter.
    #[default]
    Tree,
    /// One `if / else if` chain over full variant conditions.
    Flat,
}

impl DispatchStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchStyle::Tree => "tree",
            DispatchStyle::Flat => "flat",
        }
    }
}

impl FromStr for DispatchStyle {
    type Err = GenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "tree" => Ok(DispatchStyle::Tree),
            "flat" | "list" => Ok(DispatchStyle::Flat),
            other => Err(GenError::UnknownStyle(other.to_string())),
        }
    }
}

impl TryFrom<String> for DispatchStyle {
    type Error = GenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DispatchStyle> for String {
    fn from(value: DispatchStyle) -> String {
        value.as_str().to_string()
    }
}

impl fmt::Display for DispatchStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call dispatch configuration: style, parameter hierarchy and the
/// runtime expression bound to each wrapper variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    style: DispatchStyle,
    hierarchy: Vec<DispatchParam>,
    bindings: BTreeMap<String, String>,
}

impl DispatchConfig {
    pub fn new(style: DispatchStyle, hierarchy: Vec<DispatchParam>) -> GenResult<Self> {
        let mut seen = HashSet::new();
        for param in &hierarchy {
            if !seen.insert(*param) {
                return Err(GenError::InvalidHierarchy(format!("{param} appears twice")));
            }
        }
        if let Some(pos) = hierarchy.iter().position(|p| *p == DispatchParam::Padding) {
            if pos + 1 != hierarchy.len() {
                return Err(GenError::InvalidHierarchy(
                    "padding must be the deepest hierarchy level".to_string(),
                ));
            }
        }
        Ok(Self {
            style,
            hierarchy,
            bindings: BTreeMap::new(),
        })
    }

    pub fn bind(mut self, variable: impl Into<String>, expr: impl Into<String>) -> Self {
        self.bindings.insert(variable.into(), expr.into());
        self
    }

    pub fn with_bindings<I, K, V>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.bindings
            .extend(bindings.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn style(&self) -> DispatchStyle {
        self.style
    }

    pub fn hierarchy(&self) -> &[DispatchParam] {
        &self.hierarchy
    }

    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }

    /// Fail on the first hierarchy variable without a binding.
    pub fn check_bindings(&self) -> GenResult<()> {
        for param in &self.hierarchy {
            for var in param.variables() {
                if !self.bindings.contains_key(var) {
                    return Err(GenError::MissingWrapperBinding(var.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Variables the wrapper declares: the hierarchy in order, then any
    /// other value the plan tests (flat conditions check every fixed field).
    pub fn wrapper_variables(&self, plan: &DispatchPlan<'_>) -> Vec<&'static str> {
        let mut vars: Vec<&'static str> = self
            .hierarchy
            .iter()
            .flat_map(|param| param.variables())
            .collect();
        let mut tested = plan.root.operands();
        tested.sort();
        for operand in tested {
            if !vars.contains(&operand.as_str()) {
                vars.push(operand.as_str());
            }
        }
        vars
    }

    /// Local variable declarations opening the wrapper body.
    pub fn variable_declarations(&self, plan: &DispatchPlan<'_>) -> GenResult<String> {
        let mut out = String::new();
        for var in self.wrapper_variables(plan) {
            let expr = self
                .bindings
                .get(var)
                .ok_or_else(|| GenError::MissingWrapperBinding(var.to_string()))?;
            out.push_str(&format!("{INDENT}int {var} = {expr};\n"));
        }
        Ok(out)
    }

    /// Build the plan for `variants` with the configured style.
    pub fn build<'a>(
        &self,
        variants: &'a [VariantDescriptor],
        default: &'a VariantDescriptor,
    ) -> GenResult<DispatchPlan<'a>> {
        self.check_bindings()?;
        match self.style {
            DispatchStyle::Tree => build_tree(variants, &self.hierarchy, default),
            DispatchStyle::Flat => build_list(variants, &self.hierarchy, default),
        }
    }
}

/// Runtime expressions the kernel APIs expose for each wrapper variable.
pub fn default_bindings(base: &KernelBase) -> BTreeMap<String, String> {
    let dims = base.layout.dim_suffix();
    let mut out = BTreeMap::new();
    let spatial = match base.op.family() {
        OpFamily::Convolution => {
            let krn = match (base.op, base.layout) {
                (OpKind::DepthwiseConv2d, Layout::Hwc | Layout::Hwcn) => "KRNL_DW",
                _ => "KRNL",
            };
            Some((
                format!("weights->shape[{krn}_W_DIM_{dims}]"),
                format!("weights->shape[{krn}_H_DIM_{dims}]"),
            ))
        }
        OpFamily::Pooling => Some((
            "cfg->kernel_width".to_string(),
            "cfg->kernel_height".to_string(),
        )),
        OpFamily::FullyConnected | OpFamily::Activation => None,
    };
    if let Some((kernel_w, kernel_h)) = spatial {
        out.insert("stride_w".to_string(), "cfg->stride_width".to_string());
        out.insert("stride_h".to_string(), "cfg->stride_height".to_string());
        out.insert("kernel_w".to_string(), kernel_w);
        out.insert("kernel_h".to_string(), kernel_h);
        for (var, field) in PADDING_VARIABLES.iter().zip(PADDING_FIELDS) {
            out.insert(var.to_string(), format!("cfg->{field}"));
        }
    }
    out.insert("channels".to_string(), format!("in->shape[FMAP_C_DIM_{dims}]"));
    out
}

const PADDING_FIELDS: [&str; 4] = ["padding_top", "padding_bottom", "padding_left", "padding_right"];

/// Node of a dispatch plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchNode<'a> {
    Call(&'a VariantDescriptor),
    /// `if / else if` arms; `otherwise` is the trailing unconditional `else`.
    Chain {
        arms: Vec<(Condition, DispatchNode<'a>)>,
        otherwise: Box<DispatchNode<'a>>,
    },
}

impl<'a> DispatchNode<'a> {
    /// Variant the generated code would invoke for `runtime`.
    pub fn select(&self, runtime: &RuntimeTuple) -> &'a VariantDescriptor {
        match self {
            DispatchNode::Call(desc) => *desc,
            DispatchNode::Chain { arms, otherwise } => arms
                .iter()
                .find(|(cond, _)| cond.eval(runtime))
                .map(|(_, node)| node.select(runtime))
                .unwrap_or_else(|| otherwise.select(runtime)),
        }
    }

    /// Every variant reachable from this node, in emission order.
    pub fn targets(&self) -> Vec<&'a VariantDescriptor> {
        let mut out = Vec::new();
        self.collect_targets(&mut out);
        out
    }

    fn collect_targets(&self, out: &mut Vec<&'a VariantDescriptor>) {
        match self {
            DispatchNode::Call(desc) => out.push(*desc),
            DispatchNode::Chain { arms, otherwise } => {
                for (_, node) in arms {
                    node.collect_targets(out);
                }
                otherwise.collect_targets(out);
            }
        }
    }

    /// Runtime values tested anywhere below this node.
    pub fn operands(&self) -> Vec<Operand> {
        let mut out = Vec::new();
        self.collect_operands(&mut out);
        out
    }

    fn collect_operands(&self, out: &mut Vec<Operand>) {
        if let DispatchNode::Chain { arms, otherwise } = self {
            for (cond, node) in arms {
                for operand in cond.operands() {
                    if !out.contains(&operand) {
                        out.push(operand);
                    }
                }
                node.collect_operands(out);
            }
            otherwise.collect_operands(out);
        }
    }

    fn render_into(&self, out: &mut String, indent: &str, name_only: bool) {
        match self {
            DispatchNode::Call(desc) => {
                let call = call_statement(desc, name_only);
                let call = call.replace('\n', &format!("\n{indent}"));
                out.push_str(&format!("{indent}return {call}\n"));
            }
            DispatchNode::Chain { arms, otherwise } => {
                if arms.is_empty() {
                    otherwise.render_into(out, indent, name_only);
                    return;
                }
                let inner = format!("{indent}{INDENT}");
                for (idx, (cond, node)) in arms.iter().enumerate() {
                    let keyword = if idx == 0 {
                        format!("{indent}if ")
                    } else {
                        format!("{indent}}} else if ")
                    };
                    let mut guard = cond.render_guard();
                    if keyword.len() + guard.len() + 2 > MAX_LINE_LEN {
                        guard = cond.render_guard_split(&format!("{inner}{INDENT}"));
                    }
                    out.push_str(&format!("{keyword}{guard} {{\n"));
                    node.render_into(out, &inner, name_only);
                }
                out.push_str(&format!("{indent}}} else {{\n"));
                otherwise.render_into(out, &inner, name_only);
                out.push_str(&format!("{indent}}}\n"));
            }
        }
    }
}

/// Output of a dispatch builder.
#[derive(Debug, Clone)]
pub struct DispatchPlan<'a> {
    pub root: DispatchNode<'a>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> DispatchPlan<'a> {
    pub fn select(&self, runtime: &RuntimeTuple) -> &'a VariantDescriptor {
        self.root.select(runtime)
    }

    /// Wrapper body statements. `name_only` emits the diagnostic form that
    /// returns the chosen symbol name instead of calling it.
    pub fn render(&self, name_only: bool) -> String {
        let mut out = String::new();
        self.root.render_into(&mut out, INDENT, name_only);
        out
    }
}

/// Value a variant presents at one hierarchy level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BranchKey {
    Value(u32),
    Predicate(Condition),
}

impl BranchKey {
    pub(crate) fn of(desc: &VariantDescriptor, param: DispatchParam) -> Self {
        match desc.param(param) {
            Some(value) => BranchKey::Value(value),
            None => BranchKey::Predicate(padding_condition(desc)),
        }
    }

    pub(crate) fn is_wildcard(&self) -> bool {
        match self {
            BranchKey::Value(value) => *value == 0,
            BranchKey::Predicate(cond) => cond.is_always(),
        }
    }

    /// More specific first: descending, with the wildcard last.
    fn specificity(&self, other: &Self) -> Ordering {
        match (self.is_wildcard(), other.is_wildcard()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match (self, other) {
                (BranchKey::Value(a), BranchKey::Value(b)) => b.cmp(a),
                (BranchKey::Predicate(a), BranchKey::Predicate(b)) => {
                    predicate_rank(a).cmp(&predicate_rank(b))
                }
                (BranchKey::Value(_), BranchKey::Predicate(_)) => Ordering::Less,
                (BranchKey::Predicate(_), BranchKey::Value(_)) => Ordering::Greater,
            },
        }
    }

    pub(crate) fn condition(&self, param: DispatchParam) -> Condition {
        match self {
            BranchKey::Value(value) => match operand(param) {
                Some(operand) => Condition::eq(operand, *value),
                None => Condition::Always,
            },
            BranchKey::Predicate(cond) => cond.clone(),
        }
    }

    pub(crate) fn label(&self, param: DispatchParam) -> String {
        match self {
            BranchKey::Value(0) => format!("{param}=*"),
            BranchKey::Value(value) => format!("{param}={value}"),
            BranchKey::Predicate(cond) if cond.is_always() => format!("{param}=*"),
            BranchKey::Predicate(cond) => format!("{param}:{}", cond.render()),
        }
    }
}

/// Padding predicates: all-zero (nopad) first, then exact limits before
/// `<=` bounds, each by descending limits.
fn predicate_rank(cond: &Condition) -> (bool, bool, Reverse<Vec<u32>>) {
    let bounds = cond.bounds();
    let zero = bounds.iter().all(|&(op, value)| op == CmpOp::Eq && value == 0);
    let loose = bounds.iter().any(|&(op, _)| op == CmpOp::Le);
    (!zero, loose, Reverse(bounds.into_iter().map(|(_, value)| value).collect()))
}

fn operand(param: DispatchParam) -> Option<Operand> {
    match param {
        DispatchParam::StrideW => Some(Operand::StrideW),
        DispatchParam::StrideH => Some(Operand::StrideH),
        DispatchParam::KernelW => Some(Operand::KernelW),
        DispatchParam::KernelH => Some(Operand::KernelH),
        DispatchParam::Channels => Some(Operand::Channels),
        DispatchParam::Padding => None,
    }
}

/// Group `variants` by their key at `param`, most specific key first.
/// Keys and members keep their input order where the ordering ties.
pub(crate) fn partition<'a>(
    variants: &[&'a VariantDescriptor],
    param: DispatchParam,
) -> Vec<(BranchKey, Vec<&'a VariantDescriptor>)> {
    let mut groups: Vec<(BranchKey, Vec<&'a VariantDescriptor>)> = Vec::new();
    for &desc in variants {
        let key = BranchKey::of(desc, param);
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, members)) => members.push(desc),
            None => groups.push((key, vec![desc])),
        }
    }
    groups.sort_by(|(a, _), (b, _)| a.specificity(b));
    groups
}
