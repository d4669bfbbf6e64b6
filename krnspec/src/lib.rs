pub mod logging;

mod assembler;
mod condition;
mod descriptor;
mod error;
mod manifest;
mod naming;
mod template;
mod types;

pub mod dispatch;

pub use assembler::{body_mapping, banner, Assembler, Family, Rendered, DEBUG_RETURN_TYPE, STATUS_TYPE};
pub use condition::{
    fixed_padding, padding_condition, variant_condition, CmpOp, Condition, Operand, RuntimeTuple,
};
pub use descriptor::{
    DispatchParam, KernelArg, KernelBase, VariantDescriptor, MAX_CORE_ROUTINES, PADDING_VARIABLES,
};
pub use dispatch::{
    build_list, build_tree, default_bindings, DispatchConfig, DispatchNode, DispatchPlan,
    DispatchStyle,
};
pub use error::{Diagnostic, GenError, GenResult};
pub use manifest::{
    Artifact, CoreRoutines, DispatchSpec, GenericSpec, HeaderSpec, Manifest, ResolvedTarget, Selection,
    TargetSpec, Values, VariantSpec, ALL_TOKEN, HEADER_TOKEN,
};
pub use naming::{call_statement, ensure_unique, prototype, symbol_name, MAX_LINE_LEN, SYMBOL_PREFIX};
pub use template::{Mapping, Template};
pub use types::{DataType, Layout, OpFamily, OpKind, Padding, TypeAliases};
