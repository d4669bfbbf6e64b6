use anyhow::Result;
use krnspec::{
    default_bindings, DataType, DispatchConfig, DispatchParam, DispatchStyle, GenError,
    KernelBase, Layout, OpKind, VariantDescriptor,
};

use crate::common;

#[test]
fn hierarchy_rejects_duplicates_and_shallow_padding() {
    let duplicate = DispatchConfig::new(
        DispatchStyle::Tree,
        vec![DispatchParam::StrideW, DispatchParam::StrideW],
    );
    assert!(matches!(duplicate, Err(GenError::InvalidHierarchy(_))));

    let shallow = DispatchConfig::new(
        DispatchStyle::Tree,
        vec![DispatchParam::Padding, DispatchParam::KernelW],
    );
    assert!(matches!(shallow, Err(GenError::InvalidHierarchy(_))));
}

#[test]
fn unbound_hierarchy_variable_is_reported() -> Result<()> {
    let base = common::pool_base(DataType::Fx16);
    let config = DispatchConfig::new(
        DispatchStyle::Tree,
        vec![DispatchParam::StrideW, DispatchParam::Padding],
    )?
    .bind("stride_w", "cfg->stride_width");

    let variants = vec![VariantDescriptor::new(base.clone()).stride(1, 1)];
    let default = common::generic(&base);
    let err = config.build(&variants, &default).unwrap_err();
    assert_eq!(err, GenError::MissingWrapperBinding("padding_top".to_string()));
    Ok(())
}

#[test]
fn declarations_follow_hierarchy_order() -> Result<()> {
    let base = common::pool_base(DataType::Fx16);
    let config = common::config(
        DispatchStyle::Tree,
        &[DispatchParam::KernelW, DispatchParam::StrideW, DispatchParam::Padding],
        &base,
    );
    let default = common::generic(&base);
    let plan = config.build(&[], &default)?;
    assert_eq!(
        config.variable_declarations(&plan)?,
        "    int kernel_w = cfg->kernel_width;
    int stride_w = cfg->stride_width;
    int padding_top = cfg->padding_top;
    int padding_bot = cfg->padding_bottom;
    int padding_left = cfg->padding_left;
    int padding_right = cfg->padding_right;
"
    );
    Ok(())
}

#[test]
fn flat_wrapper_declares_every_tested_value() -> Result<()> {
    let base = common::pool_base(DataType::Fx16);
    let config = common::config(DispatchStyle::Flat, &[DispatchParam::KernelW], &base);
    let variants = vec![VariantDescriptor::new(base.clone()).stride(2, 2).kernel(3, 3)];
    let default = common::generic(&base);
    let plan = config.build(&variants, &default)?;
    assert_eq!(
        config.wrapper_variables(&plan),
        vec!["kernel_w", "stride_w", "stride_h", "kernel_h"]
    );
    Ok(())
}

#[test]
fn bindings_derive_from_op_family_and_layout() {
    let conv = default_bindings(&common::conv_base(DataType::Fx16));
    assert_eq!(conv["kernel_w"], "weights->shape[KRNL_W_DIM_CHW]");
    assert_eq!(conv["channels"], "in->shape[FMAP_C_DIM_CHW]");

    let depthwise = default_bindings(&KernelBase::new(
        "krn",
        OpKind::DepthwiseConv2d,
        Layout::Hwc,
        DataType::Sa8Sa8Sa32,
    ));
    assert_eq!(depthwise["kernel_h"], "weights->shape[KRNL_DW_H_DIM_HWC]");
    assert_eq!(depthwise["channels"], "in->shape[FMAP_C_DIM_HWC]");

    let pool = default_bindings(&common::pool_base(DataType::Fx8));
    assert_eq!(pool["kernel_h"], "cfg->kernel_height");
    assert_eq!(pool["padding_bot"], "cfg->padding_bottom");

    let relu = default_bindings(&KernelBase::new("krn", OpKind::Relu, Layout::Chw, DataType::Fx16));
    assert!(!relu.contains_key("stride_w"));
    assert!(relu.contains_key("channels"));
}

#[test]
fn style_and_parameter_tokens_parse() -> Result<()> {
    assert_eq!("tree".parse::<DispatchStyle>()?, DispatchStyle::Tree);
    assert_eq!("list".parse::<DispatchStyle>()?, DispatchStyle::Flat);
    assert!(matches!(
        "spiral".parse::<DispatchStyle>(),
        Err(GenError::UnknownStyle(_))
    ));
    assert_eq!("kernel_h".parse::<DispatchParam>()?, DispatchParam::KernelH);
    assert!(matches!(
        "dilation".parse::<DispatchParam>(),
        Err(GenError::UnknownParameter(_))
    ));
    assert!(matches!(
        "int4".parse::<DataType>(),
        Err(GenError::UnsupportedDataType(tag)) if tag == "int4"
    ));
    Ok(())
}
