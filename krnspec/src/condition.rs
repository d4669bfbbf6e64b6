//! Boolean match conditions of variants.
//!
//! Conditions are built as a small expression tree so they can be rendered
//! into the generated wrapper and also evaluated against a runtime tuple.
use std::fmt;

use crate::descriptor::VariantDescriptor;
use crate::types::Padding;

/// A runtime value read by the generated wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operand {
    StrideW,
    StrideH,
    KernelW,
    KernelH,
    Channels,
    PaddingTop,
    PaddingBot,
    PaddingLeft,
    PaddingRight,
}

impl Operand {
    pub fn as_str(self) -> &'static str {
        match self {
            Operand::StrideW => "stride_w",
            Operand::StrideH => "stride_h",
            Operand::KernelW => "kernel_w",
            Operand::KernelH => "kernel_h",
            Operand::Channels => "channels",
            Operand::PaddingTop => "padding_top",
            Operand::PaddingBot => "padding_bot",
            Operand::PaddingLeft => "padding_left",
            Operand::PaddingRight => "padding_right",
        }
    }

    /// Line-splitting group: stride, kernel, channels, padding.
    fn group(self) -> u8 {
        match self {
            Operand::StrideW | Operand::StrideH => 0,
            Operand::KernelW | Operand::KernelH => 1,
            Operand::Channels => 2,
            Operand::PaddingTop
            | Operand::PaddingBot
            | Operand::PaddingLeft
            | Operand::PaddingRight => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Le,
}

impl CmpOp {
    fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Le => "<=",
        }
    }
}

/// Boolean expression over runtime operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    Always,
    Compare { operand: Operand, op: CmpOp, value: u32 },
    All(Vec<Condition>),
}

/// Concrete runtime parameters the generated wrapper would see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeTuple {
    pub stride_w: u32,
    pub stride_h: u32,
    pub kernel_w: u32,
    pub kernel_h: u32,
    pub channels: u32,
    pub padding_top: u32,
    pub padding_bot: u32,
    pub padding_left: u32,
    pub padding_right: u32,
}

impl RuntimeTuple {
    pub fn get(&self, operand: Operand) -> u32 {
        match operand {
            Operand::StrideW => self.stride_w,
            Operand::StrideH => self.stride_h,
            Operand::KernelW => self.kernel_w,
            Operand::KernelH => self.kernel_h,
            Operand::Channels => self.channels,
            Operand::PaddingTop => self.padding_top,
            Operand::PaddingBot => self.padding_bot,
            Operand::PaddingLeft => self.padding_left,
            Operand::PaddingRight => self.padding_right,
        }
    }
}

impl Condition {
    pub fn eq(operand: Operand, value: u32) -> Self {
        Condition::Compare {
            operand,
            op: CmpOp::Eq,
            value,
        }
    }

    pub fn le(operand: Operand, value: u32) -> Self {
        Condition::Compare {
            operand,
            op: CmpOp::Le,
            value,
        }
    }

    /// Conjunction that drops tautologies; collapses to a single term or `Always`.
    pub fn all(parts: impl IntoIterator<Item = Condition>) -> Self {
        let mut terms: Vec<Condition> = parts.into_iter().filter(|c| !c.is_always()).collect();
        match terms.len() {
            0 => Condition::Always,
            1 => terms.remove(0),
            _ => Condition::All(terms),
        }
    }

    pub fn is_always(&self) -> bool {
        match self {
            Condition::Always => true,
            Condition::Compare { .. } => false,
            Condition::All(terms) => terms.iter().all(Condition::is_always),
        }
    }

    pub fn eval(&self, runtime: &RuntimeTuple) -> bool {
        match self {
            Condition::Always => true,
            Condition::Compare { operand, op, value } => {
                let actual = runtime.get(*operand);
                match op {
                    CmpOp::Eq => actual == *value,
                    CmpOp::Le => actual <= *value,
                }
            }
            Condition::All(terms) => terms.iter().all(|term| term.eval(runtime)),
        }
    }

    fn comparisons(&self, out: &mut Vec<(Operand, String)>) {
        match self {
            Condition::Always => {}
            Condition::Compare { operand, op, value } => {
                out.push((*operand, format!("({} {} {})", operand.as_str(), op.as_str(), value)));
            }
            Condition::All(terms) => {
                for term in terms {
                    term.comparisons(out);
                }
            }
        }
    }

    /// Single-line C text, e.g. `(stride_w == 1) && (kernel_w == 3)`.
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        self.comparisons(&mut parts);
        if parts.is_empty() {
            return "(1)".to_string();
        }
        parts
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join(" && ")
    }

    /// Operator and limit of every comparison, in emission order.
    pub fn bounds(&self) -> Vec<(CmpOp, u32)> {
        match self {
            Condition::Always => Vec::new(),
            Condition::Compare { op, value, .. } => vec![(*op, *value)],
            Condition::All(terms) => terms.iter().flat_map(Condition::bounds).collect(),
        }
    }

    /// Runtime values this condition reads, in first-use order.
    pub fn operands(&self) -> Vec<Operand> {
        let mut parts = Vec::new();
        self.comparisons(&mut parts);
        let mut out: Vec<Operand> = Vec::new();
        for (operand, _) in parts {
            if !out.contains(&operand) {
                out.push(operand);
            }
        }
        out
    }

    fn term_count(&self) -> usize {
        let mut parts = Vec::new();
        self.comparisons(&mut parts);
        parts.len()
    }

    /// Text placed inside `if ...`: wrapped in parens unless already a single term.
    pub fn render_guard(&self) -> String {
        if self.term_count() > 1 {
            format!("({})", self.render())
        } else {
            self.render()
        }
    }

    /// Guard text broken before each new field group (stride, kernel, channels, padding).
    pub fn render_guard_split(&self, indent: &str) -> String {
        let mut parts = Vec::new();
        self.comparisons(&mut parts);
        if parts.len() <= 1 {
            return self.render_guard();
        }
        let mut out = String::from("(");
        let mut last_group = None;
        for (operand, text) in parts {
            let group = operand.group();
            match last_group {
                None => {}
                Some(prev) if prev == group => out.push_str(" && "),
                Some(_) => {
                    out.push_str(" &&\n");
                    out.push_str(indent);
                }
            }
            out.push_str(&text);
            last_group = Some(group);
        }
        out.push(')');
        out
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn kernel_fixed(desc: &VariantDescriptor) -> bool {
    desc.kernel_w > 0 && desc.kernel_h > 0
}

/// Padding the kernel implies for a "same" output: the extra pixel of an even
/// kernel goes to the bottom / right side.
fn kernel_padding(desc: &VariantDescriptor) -> [(Operand, u32); 4] {
    [
        (Operand::PaddingTop, (desc.kernel_h - 1) / 2),
        (Operand::PaddingBot, desc.kernel_h / 2),
        (Operand::PaddingLeft, (desc.kernel_w - 1) / 2),
        (Operand::PaddingRight, desc.kernel_w / 2),
    ]
}

fn zero_padding() -> Condition {
    Condition::All(
        [
            Operand::PaddingTop,
            Operand::PaddingBot,
            Operand::PaddingLeft,
            Operand::PaddingRight,
        ]
        .into_iter()
        .map(|operand| Condition::eq(operand, 0))
        .collect(),
    )
}

/// Match condition on the four padding values of a variant.
///
/// At unit stride a `krnpad` variant with a fixed kernel requires the exact
/// kernel-derived padding. At other strides that padding is only an upper
/// bound, since it is not determined by the kernel size alone.
pub fn padding_condition(desc: &VariantDescriptor) -> Condition {
    let unit_stride = desc.stride_w == 1 && desc.stride_h == 1;
    match desc.padding {
        Padding::NoPad => zero_padding(),
        Padding::KrnPad if kernel_fixed(desc) => {
            let terms = kernel_padding(desc).into_iter().map(|(operand, value)| {
                if unit_stride {
                    Condition::eq(operand, value)
                } else {
                    Condition::le(operand, value)
                }
            });
            Condition::All(terms.collect())
        }
        Padding::KrnPad | Padding::Any => Condition::Always,
    }
}

/// Conjunction of every fixed field: stride, kernel, channels, then padding.
pub fn variant_condition(desc: &VariantDescriptor) -> Condition {
    let fixed = [
        (Operand::StrideW, desc.stride_w),
        (Operand::StrideH, desc.stride_h),
        (Operand::KernelW, desc.kernel_w),
        (Operand::KernelH, desc.kernel_h),
        (Operand::Channels, desc.channels),
    ];
    let mut terms: Vec<Condition> = fixed
        .into_iter()
        .filter(|(_, value)| *value > 0)
        .map(|(operand, value)| Condition::eq(operand, value))
        .collect();
    terms.push(padding_condition(desc));
    Condition::all(terms)
}

/// Padding pixel counts substituted into a body, `None` when not fixed.
pub fn fixed_padding(desc: &VariantDescriptor) -> Option<[u32; 4]> {
    let unit_stride = desc.stride_w == 1 && desc.stride_h == 1;
    match desc.padding {
        Padding::NoPad => Some([0; 4]),
        Padding::KrnPad if unit_stride && kernel_fixed(desc) => {
            let derived = kernel_padding(desc);
            Some([derived[0].1, derived[1].1, derived[2].1, derived[3].1])
        }
        Padding::KrnPad | Padding::Any => None,
    }
}
