//! Variant descriptors: one specialized implementation candidate each.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, GenResult};
use crate::types::{DataType, Layout, OpKind, Padding};

/// Maximum number of core routines a single variant body can reference.
pub const MAX_CORE_ROUTINES: usize = 10;

/// One `(type, name)` entry of the public call signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct KernelArg {
    pub ty: String,
    pub name: String,
}

impl KernelArg {
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            name: name.into(),
        }
    }
}

impl From<(String, String)> for KernelArg {
    fn from((ty, name): (String, String)) -> Self {
        Self { ty, name }
    }
}

impl From<KernelArg> for (String, String) {
    fn from(arg: KernelArg) -> Self {
        (arg.ty, arg.name)
    }
}

/// Identity shared by every variant of a family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelBase {
    pub group: String,
    pub op: OpKind,
    pub layout: Layout,
    pub data_type: DataType,
    pub args: Vec<KernelArg>,
}

impl KernelBase {
    pub fn new(group: impl Into<String>, op: OpKind, layout: Layout, data_type: DataType) -> Self {
        Self {
            group: group.into(),
            op,
            layout,
            data_type,
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = KernelArg>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Same identity with another precision tag.
    pub fn with_data_type(&self, data_type: DataType) -> Self {
        Self {
            data_type,
            ..self.clone()
        }
    }

    /// Same identity with another layout tag.
    pub fn with_layout(&self, layout: Layout) -> Self {
        Self {
            layout,
            ..self.clone()
        }
    }
}

/// A specialization fixed to some parameter values. Zero means "any".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantDescriptor {
    pub base: KernelBase,
    pub kernel_w: u32,
    pub kernel_h: u32,
    pub channels: u32,
    pub stride_w: u32,
    pub stride_h: u32,
    pub padding: Padding,
    pub generic: bool,
    pub core: Vec<String>,
    pub debug: bool,
}

impl VariantDescriptor {
    /// Unconstrained, non-generic descriptor for `base`.
    pub fn new(base: KernelBase) -> Self {
        Self {
            base,
            kernel_w: 0,
            kernel_h: 0,
            channels: 0,
            stride_w: 0,
            stride_h: 0,
            padding: Padding::Any,
            generic: false,
            core: Vec::new(),
            debug: false,
        }
    }

    /// The fallback variant of a family.
    pub fn generic(base: KernelBase, core: impl Into<String>) -> Self {
        Self {
            generic: true,
            ..Self::new(base).core([core.into()])
        }
    }

    pub fn kernel(mut self, kernel_w: u32, kernel_h: u32) -> Self {
        self.kernel_w = kernel_w;
        self.kernel_h = kernel_h;
        self
    }

    pub fn channels(mut self, channels: u32) -> Self {
        self.channels = channels;
        self
    }

    pub fn stride(mut self, stride_w: u32, stride_h: u32) -> Self {
        self.stride_w = stride_w;
        self.stride_h = stride_h;
        self
    }

    pub fn padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn core<I, S>(mut self, core: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.core = core.into_iter().map(Into::into).collect();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Copy with the identity replaced; all constraints are kept.
    pub fn with_base(&self, base: KernelBase) -> Self {
        Self {
            base,
            ..self.clone()
        }
    }

    /// Descriptor naming the family-level wrapper (no constraints).
    pub fn wrapper(&self, debug: bool) -> Self {
        Self::new(self.base.clone()).debug(debug)
    }

    /// Numeric value of a dispatch parameter, `None` for padding.
    pub fn param(&self, param: DispatchParam) -> Option<u32> {
        match param {
            DispatchParam::StrideW => Some(self.stride_w),
            DispatchParam::StrideH => Some(self.stride_h),
            DispatchParam::KernelW => Some(self.kernel_w),
            DispatchParam::KernelH => Some(self.kernel_h),
            DispatchParam::Channels => Some(self.channels),
            DispatchParam::Padding => None,
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.kernel_w == 0
            && self.kernel_h == 0
            && self.channels == 0
            && self.stride_w == 0
            && self.stride_h == 0
            && self.padding.is_wildcard()
    }

    pub fn validate(&self) -> GenResult<()> {
        if self.core.len() > MAX_CORE_ROUTINES {
            return Err(GenError::TooManyCoreRoutines {
                name: crate::naming::symbol_name(self),
                count: self.core.len(),
            });
        }
        if self.generic && !self.is_unconstrained() {
            return Err(GenError::InvalidGeneric(format!(
                "{} is generic but fixes parameters",
                crate::naming::symbol_name(self)
            )));
        }
        Ok(())
    }
}

/// Runtime parameter a dispatch level can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DispatchParam {
    StrideW,
    StrideH,
    KernelW,
    KernelH,
    Channels,
    Padding,
}

/// Runtime variable names the padding predicate reads.
pub const PADDING_VARIABLES: [&str; 4] = ["padding_top", "padding_bot", "padding_left", "padding_right"];

impl DispatchParam {
    pub const ALL: [DispatchParam; 6] = [
        DispatchParam::StrideW,
        DispatchParam::StrideH,
        DispatchParam::KernelW,
        DispatchParam::KernelH,
        DispatchParam::Channels,
        DispatchParam::Padding,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DispatchParam::StrideW => "stride_w",
            DispatchParam::StrideH => "stride_h",
            DispatchParam::KernelW => "kernel_w",
            DispatchParam::KernelH => "kernel_h",
            DispatchParam::Channels => "channels",
            DispatchParam::Padding => "padding",
        }
    }

    /// Wrapper variables that must be bound for this parameter.
    pub fn variables(self) -> Vec<&'static str> {
        match self {
            DispatchParam::Padding => PADDING_VARIABLES.to_vec(),
            other => vec![other.as_str()],
        }
    }
}

impl FromStr for DispatchParam {
    type Err = GenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DispatchParam::ALL
            .into_iter()
            .find(|param| param.as_str() == value.trim())
            .ok_or_else(|| GenError::UnknownParameter(value.to_string()))
    }
}

impl TryFrom<String> for DispatchParam {
    type Error = GenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DispatchParam> for String {
    fn from(value: DispatchParam) -> String {
        value.as_str().to_string()
    }
}

impl fmt::Display for DispatchParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
