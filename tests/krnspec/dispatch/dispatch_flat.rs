use anyhow::Result;
use krnspec::{
    symbol_name, DataType, Diagnostic, DispatchConfig, DispatchStyle, Padding, VariantDescriptor,
};

use crate::common;

#[test]
fn chain_orders_by_hierarchy_and_ends_in_default() -> Result<()> {
    let base = common::pool_base(DataType::Fx16);
    let default = common::generic(&base);
    let variants = vec![
        VariantDescriptor::new(base.clone()).stride(1, 1),
        VariantDescriptor::new(base.clone())
            .stride(1, 1)
            .kernel(3, 3)
            .padding(Padding::KrnPad),
        default.clone(),
    ];
    let plan = common::config(DispatchStyle::Flat, &common::FULL_HIERARCHY, &base)
        .build(&variants, &default)?;

    let expected = "    if ((stride_w == 1) && (stride_h == 1) &&
            (kernel_w == 3) && (kernel_h == 3) &&
            (padding_top == 1) && (padding_bot == 1) && (padding_left == 1) && (padding_right == 1)) {
        return mli_krn_avepool_chw_fx16_k3x3_str1_krnpad(in, cfg, out);
    } else if ((stride_w == 1) && (stride_h == 1)) {
        return mli_krn_avepool_chw_fx16_str1(in, cfg, out);
    } else {
        return mli_krn_avepool_chw_fx16_generic(in, cfg, out);
    }
";
    assert_eq!(plan.render(false), expected);
    assert!(plan.diagnostics.is_empty());

    let fallback = common::runtime(1, 3, 3, 0, [0, 0, 0, 0]);
    assert_eq!(symbol_name(plan.select(&fallback)), "mli_krn_avepool_chw_fx16_str1");
    Ok(())
}

#[test]
fn first_match_wins_in_declaration_order() -> Result<()> {
    let base = common::pool_base(DataType::Fx8);
    let default = common::generic(&base);
    let variants = vec![
        VariantDescriptor::new(base.clone()).kernel(2, 2).core(["square"]),
        VariantDescriptor::new(base.clone()).kernel(2, 0).core(["wide"]),
    ];
    let config = DispatchConfig::new(DispatchStyle::Flat, Vec::new())?;
    let plan = config.build(&variants, &default)?;

    let both = common::runtime(0, 2, 2, 0, [0; 4]);
    assert_eq!(plan.select(&both).core, vec!["square".to_string()]);
    let only_width = common::runtime(0, 2, 7, 0, [0; 4]);
    assert_eq!(plan.select(&only_width).core, vec!["wide".to_string()]);
    Ok(())
}

#[test]
fn unconditional_variant_closes_the_chain() -> Result<()> {
    let base = common::pool_base(DataType::Fx16);
    let default = common::generic(&base);
    let catch_all = VariantDescriptor::new(base.clone()).padding(Padding::KrnPad);
    let late = VariantDescriptor::new(base.clone()).stride(2, 2);
    let variants = vec![
        VariantDescriptor::new(base.clone()).kernel(2, 2),
        catch_all.clone(),
        late.clone(),
    ];
    let config = DispatchConfig::new(DispatchStyle::Flat, Vec::new())?;
    let plan = config.build(&variants, &default)?;

    assert_eq!(
        plan.diagnostics,
        vec![Diagnostic::UnreachableVariants {
            after: symbol_name(&catch_all),
            names: vec![symbol_name(&late)],
        }]
    );
    let text = plan.render(false);
    assert!(text.ends_with(
        "    } else {\n        return mli_krn_avepool_chw_fx16_krnpad(in, cfg, out);\n    }\n"
    ));
    assert!(!text.contains("generic"));
    assert_eq!(plan.select(&common::runtime(2, 0, 0, 0, [0; 4])), &catch_all);
    Ok(())
}
