use crate::condition::variant_condition;
use crate::descriptor::{DispatchParam, VariantDescriptor};
use crate::error::{Diagnostic, GenResult};
use crate::naming::symbol_name;

use super::{partition, DispatchNode, DispatchPlan};

/// Variants in tree order: the same per-level specificity ordering as
/// [`super::build_tree`], flattened depth first.
pub fn order_variants<'a>(
    variants: &[&'a VariantDescriptor],
    hierarchy: &[DispatchParam],
) -> Vec<&'a VariantDescriptor> {
    let Some((&param, rest)) = hierarchy.split_first() else {
        return variants.to_vec();
    };
    partition(variants, param)
        .into_iter()
        .flat_map(|(_, members)| order_variants(&members, rest))
        .collect()
}

/// Single first-match-wins chain over the full condition of each variant,
/// ending in `default`. Generic entries are skipped.
pub fn build_list<'a>(
    variants: &'a [VariantDescriptor],
    hierarchy: &[DispatchParam],
    default: &'a VariantDescriptor,
) -> GenResult<DispatchPlan<'a>> {
    let refs: Vec<&'a VariantDescriptor> = variants.iter().collect();
    let ordered = order_variants(&refs, hierarchy);
    let mut diagnostics = Vec::new();
    let mut arms = Vec::new();
    let mut otherwise = DispatchNode::Call(default);

    let mut remaining = ordered.iter().filter(|desc| !desc.generic);
    while let Some(&desc) = remaining.next() {
        let cond = variant_condition(desc);
        if cond.is_always() {
            let unreachable: Vec<String> = remaining.by_ref().map(|desc| symbol_name(desc)).collect();
            if !unreachable.is_empty() {
                let diag = Diagnostic::UnreachableVariants {
                    after: symbol_name(desc),
                    names: unreachable,
                };
                crate::warning!("{diag}");
                diagnostics.push(diag);
            }
            otherwise = DispatchNode::Call(desc);
            break;
        }
        crate::detail!("{} <- {}", symbol_name(desc), cond);
        arms.push((cond, DispatchNode::Call(desc)));
    }

    Ok(DispatchPlan {
        root: DispatchNode::Chain {
            arms,
            otherwise: Box::new(otherwise),
        },
        diagnostics,
    })
}
