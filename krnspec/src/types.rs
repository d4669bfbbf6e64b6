//! Closed tag types of a kernel family: op kind, layout, data type, padding.
//!
//! Each tag parses from the lowercase token used in symbol names and
//! manifests and prints back to the same token.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GenError;

/// Operation category used to derive default wrapper bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpFamily {
    Convolution,
    Pooling,
    FullyConnected,
    Activation,
}

/// Kernel operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OpKind {
    Conv2d,
    DepthwiseConv2d,
    GroupConv2d,
    TransposeConv2d,
    AvePool,
    MaxPool,
    SumPool,
    FullyConnected,
    Relu,
    LeakyRelu,
    Prelu,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Conv2d => "conv2d",
            OpKind::DepthwiseConv2d => "depthwise_conv2d",
            OpKind::GroupConv2d => "group_conv2d",
            OpKind::TransposeConv2d => "transpose_conv2d",
            OpKind::AvePool => "avepool",
            OpKind::MaxPool => "maxpool",
            OpKind::SumPool => "sumpool",
            OpKind::FullyConnected => "fully_connected",
            OpKind::Relu => "relu",
            OpKind::LeakyRelu => "leaky_relu",
            OpKind::Prelu => "prelu",
        }
    }

    pub fn family(self) -> OpFamily {
        match self {
            OpKind::Conv2d
            | OpKind::DepthwiseConv2d
            | OpKind::GroupConv2d
            | OpKind::TransposeConv2d => OpFamily::Convolution,
            OpKind::AvePool | OpKind::MaxPool | OpKind::SumPool => OpFamily::Pooling,
            OpKind::FullyConnected => OpFamily::FullyConnected,
            OpKind::Relu | OpKind::LeakyRelu | OpKind::Prelu => OpFamily::Activation,
        }
    }
}

impl FromStr for OpKind {
    type Err = GenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let kind = match value.trim() {
            "conv2d" => OpKind::Conv2d,
            "depthwise_conv2d" => OpKind::DepthwiseConv2d,
            "group_conv2d" => OpKind::GroupConv2d,
            "transpose_conv2d" => OpKind::TransposeConv2d,
            "avepool" => OpKind::AvePool,
            "maxpool" => OpKind::MaxPool,
            "sumpool" => OpKind::SumPool,
            "fully_connected" => OpKind::FullyConnected,
            "relu" => OpKind::Relu,
            "leaky_relu" => OpKind::LeakyRelu,
            "prelu" => OpKind::Prelu,
            other => return Err(GenError::UnknownOp(other.to_string())),
        };
        Ok(kind)
    }
}

/// Memory layout tag of a kernel family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Layout {
    Chw,
    Hwc,
    Hwcn,
}

impl Layout {
    pub fn as_str(self) -> &'static str {
        match self {
            Layout::Chw => "chw",
            Layout::Hwc => "hwc",
            Layout::Hwcn => "hwcn",
        }
    }

    /// Suffix of the shape-index macros for this layout.
    pub fn dim_suffix(self) -> &'static str {
        match self {
            Layout::Chw => "CHW",
            Layout::Hwc | Layout::Hwcn => "HWC",
        }
    }
}

impl FromStr for Layout {
    type Err = GenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "chw" => Ok(Layout::Chw),
            "hwc" => Ok(Layout::Hwc),
            "hwcn" => Ok(Layout::Hwcn),
            other => Err(GenError::UnknownLayout(other.to_string())),
        }
    }
}

/// C type aliases substituted into a kernel body for one data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeAliases {
    pub d_type: &'static str,
    pub w_type: &'static str,
    pub b_type: &'static str,
    pub d_enum: &'static str,
    pub el_params: &'static str,
}

/// Scalar precision tag of a kernel family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Fx16,
    Fx8,
    Fx8w16d,
    Sa8,
    Sa8Sa8Sa32,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Fx16 => "fx16",
            DataType::Fx8 => "fx8",
            DataType::Fx8w16d => "fx8w16d",
            DataType::Sa8 => "sa8",
            DataType::Sa8Sa8Sa32 => "sa8_sa8_sa32",
        }
    }

    pub fn aliases(self) -> TypeAliases {
        match self {
            DataType::Fx16 => TypeAliases {
                d_type: "int16_t",
                w_type: "int16_t",
                b_type: "int16_t",
                d_enum: "MLI_EL_FX_16",
                el_params: "fx.frac_bits",
            },
            DataType::Fx8 => TypeAliases {
                d_type: "int8_t",
                w_type: "int8_t",
                b_type: "int8_t",
                d_enum: "MLI_EL_FX_8",
                el_params: "fx.frac_bits",
            },
            DataType::Fx8w16d => TypeAliases {
                d_type: "int16_t",
                w_type: "int8_t",
                b_type: "int8_t",
                d_enum: "MLI_EL_FX_16",
                el_params: "fx.frac_bits",
            },
            DataType::Sa8 => TypeAliases {
                d_type: "int8_t",
                w_type: "int8_t",
                b_type: "int8_t",
                d_enum: "MLI_EL_ASYM_I8",
                el_params: "asym",
            },
            DataType::Sa8Sa8Sa32 => TypeAliases {
                d_type: "int8_t",
                w_type: "int8_t",
                b_type: "int32_t",
                d_enum: "MLI_EL_ASYM_I8",
                el_params: "asym",
            },
        }
    }
}

impl FromStr for DataType {
    type Err = GenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "fx16" => Ok(DataType::Fx16),
            "fx8" => Ok(DataType::Fx8),
            "fx8w16d" => Ok(DataType::Fx8w16d),
            "sa8" => Ok(DataType::Sa8),
            "sa8_sa8_sa32" => Ok(DataType::Sa8Sa8Sa32),
            other => Err(GenError::UnsupportedDataType(other.to_string())),
        }
    }
}

/// Padding scheme a specialization is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Padding {
    /// No restriction.
    #[default]
    Any,
    NoPad,
    KrnPad,
}

impl Padding {
    pub fn as_str(self) -> &'static str {
        match self {
            Padding::Any => "",
            Padding::NoPad => "nopad",
            Padding::KrnPad => "krnpad",
        }
    }

    pub fn is_wildcard(self) -> bool {
        self == Padding::Any
    }
}

impl FromStr for Padding {
    type Err = GenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" | "none" => Ok(Padding::Any),
            "nopad" => Ok(Padding::NoPad),
            "krnpad" => Ok(Padding::KrnPad),
            other => Err(GenError::UnknownPadding(other.to_string())),
        }
    }
}

macro_rules! string_tag {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = GenError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> String {
                    value.as_str().to_string()
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

string_tag!(OpKind, Layout, DataType, Padding);
