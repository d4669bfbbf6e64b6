use crate::descriptor::{DispatchParam, VariantDescriptor};
use crate::error::{Diagnostic, GenError, GenResult};
use crate::naming::symbol_name;

use super::{partition, DispatchNode, DispatchPlan};

/// Nest `variants` into one conditional level per hierarchy parameter.
///
/// Values are tested most specific first; the wildcard group becomes the
/// plain `else` of its level, and a level without one falls back to
/// `default`.
pub fn build_tree<'a>(
    variants: &'a [VariantDescriptor],
    hierarchy: &[DispatchParam],
    default: &'a VariantDescriptor,
) -> GenResult<DispatchPlan<'a>> {
    let refs: Vec<&'a VariantDescriptor> = variants.iter().collect();
    let mut diagnostics = Vec::new();
    let mut path = Vec::new();
    let root = build_level(&refs, hierarchy, default, &mut path, &mut diagnostics)?;
    Ok(DispatchPlan { root, diagnostics })
}

fn path_label(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join("/")
    }
}

fn build_level<'a>(
    variants: &[&'a VariantDescriptor],
    hierarchy: &[DispatchParam],
    default: &'a VariantDescriptor,
    path: &mut Vec<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> GenResult<DispatchNode<'a>> {
    let Some((&param, rest)) = hierarchy.split_first() else {
        return match variants {
            [] => Ok(DispatchNode::Call(default)),
            [single] => {
                crate::detail!("{} -> {}", path_label(path), symbol_name(single));
                Ok(DispatchNode::Call(*single))
            }
            _ => Err(GenError::UnresolvedPartition {
                path: path_label(path),
                names: variants.iter().map(|desc| symbol_name(desc)).collect(),
            }),
        };
    };

    let mut arms = Vec::new();
    let mut otherwise = None;
    for (key, mut members) in partition(variants, param) {
        path.push(key.label(param));
        if param == DispatchParam::Padding && key.is_wildcard() && members.len() > 1 {
            // First declared wins; existing declarations rely on this.
            let diag = Diagnostic::AmbiguousPaddingBranch {
                path: path_label(path),
                kept: symbol_name(members[0]),
                shadowed: members[1..].iter().map(|desc| symbol_name(desc)).collect(),
            };
            crate::warning!("{diag}");
            diagnostics.push(diag);
            members.truncate(1);
        }
        let node = build_level(&members, rest, default, path, diagnostics)?;
        path.pop();
        if key.is_wildcard() {
            otherwise = Some(node);
        } else {
            arms.push((key.condition(param), node));
        }
    }

    Ok(DispatchNode::Chain {
        arms,
        otherwise: Box::new(otherwise.unwrap_or(DispatchNode::Call(default))),
    })
}
