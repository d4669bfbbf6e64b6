//! Symbol names, prototypes and call expressions for variants.
use std::collections::HashSet;

use crate::descriptor::{KernelArg, VariantDescriptor};
use crate::error::{GenError, GenResult};

pub const SYMBOL_PREFIX: &str = "mli";

/// Generated lines longer than this are split one argument per line.
pub const MAX_LINE_LEN: usize = 127;

const SPLIT_INDENT: &str = "        ";

/// Deterministic symbol name of a variant. Wildcard fields add no suffix.
pub fn symbol_name(desc: &VariantDescriptor) -> String {
    let base = &desc.base;
    let mut name = String::from(SYMBOL_PREFIX);
    if desc.debug {
        name.push_str("_debug");
    }
    name.push_str(&format!(
        "_{}_{}_{}_{}",
        base.group, base.op, base.layout, base.data_type
    ));
    match (desc.kernel_w, desc.kernel_h) {
        (0, 0) => {}
        (w, 0) => name.push_str(&format!("_k{w}xn")),
        (0, h) => name.push_str(&format!("_knx{h}")),
        (w, h) => name.push_str(&format!("_k{w}x{h}")),
    }
    if desc.channels > 0 {
        name.push_str(&format!("_ch{}", desc.channels));
    }
    if desc.stride_w > 0 && desc.stride_w == desc.stride_h {
        name.push_str(&format!("_str{}", desc.stride_w));
    } else {
        if desc.stride_w > 0 {
            name.push_str(&format!("_strw{}", desc.stride_w));
        }
        if desc.stride_h > 0 {
            name.push_str(&format!("_strh{}", desc.stride_h));
        }
    }
    if !desc.padding.is_wildcard() {
        name.push('_');
        name.push_str(desc.padding.as_str());
    }
    if desc.generic {
        name.push_str("_generic");
    }
    name
}

/// Fail on the first name produced by more than one descriptor.
pub fn ensure_unique<'a, I>(variants: I) -> GenResult<()>
where
    I: IntoIterator<Item = &'a VariantDescriptor>,
{
    let mut seen = HashSet::new();
    for desc in variants {
        let name = symbol_name(desc);
        if !seen.insert(name.clone()) {
            return Err(GenError::NamingCollision(name));
        }
    }
    Ok(())
}

fn arg_list(args: &[KernelArg], with_types: bool, split: bool) -> String {
    let items: Vec<String> = args
        .iter()
        .map(|arg| {
            if with_types {
                format!("{} {}", arg.ty, arg.name)
            } else {
                arg.name.clone()
            }
        })
        .collect();
    if split {
        let joined = items
            .iter()
            .map(|item| format!("\n{SPLIT_INDENT}{item}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("({joined})")
    } else {
        format!("({})", items.join(", "))
    }
}

/// `return_type name(type arg, ...)` without a trailing `;` or body.
pub fn prototype(desc: &VariantDescriptor, return_type: &str) -> String {
    let name = symbol_name(desc);
    let line = format!("{return_type} {name}{}", arg_list(&desc.base.args, true, false));
    if line.len() > MAX_LINE_LEN {
        format!("{return_type} {name}{}", arg_list(&desc.base.args, true, true))
    } else {
        line
    }
}

/// Invocation statement, or the quoted name for the diagnostic wrapper.
pub fn call_statement(desc: &VariantDescriptor, name_only: bool) -> String {
    let name = symbol_name(desc);
    if name_only {
        return format!("(char*)\"{name}\";");
    }
    let line = format!("{name}{};", arg_list(&desc.base.args, false, false));
    if line.len() > MAX_LINE_LEN {
        format!("{name}{};", arg_list(&desc.base.args, false, true))
    } else {
        line
    }
}
