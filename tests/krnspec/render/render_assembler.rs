use anyhow::Result;
use krnspec::{
    body_mapping, Assembler, DataType, DispatchParam, DispatchStyle, Family, GenError, Padding,
    Template, VariantDescriptor,
};

use crate::common;

const FILE_TEMPLATE: &str = "$extra_includes--\n$extra_defines--\n$functions--\n$wrapper";
const BODY_TEMPLATE: &str = "    // $name k=${kernel_w}x$kernel_h ch=$channels s=$stride_w/$stride_h\n    // $datatype $d_type $w_type $b_type $d_enum_type $el_params\n    // pad=$kernelpadding:$padding_top,$padding_bot,$padding_left,$padding_right\n    return $core_name($has_core_name1, \"$core_name1\", $unknown);\n}\n";

fn pool_family(data_type: DataType) -> (Vec<VariantDescriptor>, VariantDescriptor) {
    let base = common::pool_base(data_type);
    let default = VariantDescriptor::generic(base.clone(), "avepool_chw_krnpad");
    let variants = vec![
        VariantDescriptor::new(base.clone())
            .stride(1, 1)
            .kernel(3, 3)
            .padding(Padding::KrnPad)
            .core(["avepool_chw_krnpad", "avepool_chw_krnpad_ch1"]),
        VariantDescriptor::new(base)
            .stride(1, 1)
            .kernel(2, 2)
            .padding(Padding::NoPad)
            .core(["avepool_chw_nopad_k2x2"]),
        default.clone(),
    ];
    (variants, default)
}

fn assembler(style: DispatchStyle) -> Assembler {
    let hierarchy = [
        DispatchParam::StrideW,
        DispatchParam::StrideH,
        DispatchParam::KernelW,
        DispatchParam::KernelH,
        DispatchParam::Padding,
    ];
    Assembler::new(common::config(style, &hierarchy, &common::pool_base(DataType::Fx16)))
}

fn render(assembler: &Assembler, variants: &[VariantDescriptor], default: &VariantDescriptor) -> Result<String> {
    let rendered = assembler.render_source(
        variants,
        default,
        &Template::new("body.txt", BODY_TEMPLATE),
        &Template::new("file.txt", FILE_TEMPLATE),
        &["mli_krn_avepool_chw.h".to_string()],
        &["#define AVEPOOL_SPEC 1".to_string()],
    )?;
    Ok(rendered.text)
}

#[test]
fn source_contains_banner_bodies_and_both_wrappers() -> Result<()> {
    let (variants, default) = pool_family(DataType::Fx16);
    let text = render(&assembler(DispatchStyle::Tree), &variants, &default)?;

    assert!(text.starts_with(
        "/* This file is generated, do not edit!\n * edit following template files instead:\n * file.txt\n * body.txt\n */\n#include \"mli_krn_avepool_chw.h\"\n--\n#define AVEPOOL_SPEC 1\n--\n"
    ));
    assert!(text.contains(
        "mli_status mli_krn_avepool_chw_fx16_k3x3_str1_krnpad(const mli_tensor * in, const mli_pool_cfg * cfg, mli_tensor * out) {\n    // mli_krn_avepool_chw_fx16_k3x3_str1_krnpad k=3x3 ch=0 s=1/1\n    // fx16 int16_t int16_t int16_t MLI_EL_FX_16 fx.frac_bits\n    // pad=1:1,1,1,1\n    return avepool_chw_krnpad(1, \"avepool_chw_krnpad_ch1\", $unknown);\n}\n\n"
    ));
    assert!(text.contains("    return avepool_chw_nopad_k2x2(0, \"\", $unknown);\n"));
    assert!(text.contains(
        "mli_status mli_krn_avepool_chw_fx16(const mli_tensor * in, const mli_pool_cfg * cfg, mli_tensor * out) {\n    int stride_w = cfg->stride_width;\n"
    ));
    assert!(text.contains(
        "char * mli_debug_krn_avepool_chw_fx16(const mli_tensor * in, const mli_pool_cfg * cfg, mli_tensor * out) {\n"
    ));
    assert!(text.contains("return (char*)\"mli_krn_avepool_chw_fx16_k2x2_str1_nopad\";"));
    assert_eq!(text.matches("mli_status mli_krn_avepool_chw_fx16_generic(").count(), 1);
    Ok(())
}

#[test]
fn identical_inputs_render_identical_text() -> Result<()> {
    let (variants, default) = pool_family(DataType::Fx16);
    for style in [DispatchStyle::Tree, DispatchStyle::Flat] {
        let assembler = assembler(style);
        assert_eq!(
            render(&assembler, &variants, &default)?,
            render(&assembler, &variants, &default)?
        );
    }
    Ok(())
}

#[test]
fn body_mapping_exposes_types_padding_and_core_slots() {
    let base = common::pool_base(DataType::Sa8Sa8Sa32);
    let desc = VariantDescriptor::new(base)
        .stride(2, 2)
        .kernel(3, 3)
        .padding(Padding::KrnPad)
        .core(["first", "second"]);
    let map = body_mapping(&desc);

    assert_eq!(map["b_type"], "int32_t");
    assert_eq!(map["d_enum_type"], "MLI_EL_ASYM_I8");
    assert_eq!(map["el_params"], "asym");
    assert_eq!(map["kernelpadding"], "0");
    assert_eq!(map["padding_top"], "0");
    assert_eq!(map["core_name"], "first");
    assert_eq!(map["has_core_name"], "1");
    assert_eq!(map["core_name1"], "second");
    assert_eq!(map["core_name2"], "");
    assert_eq!(map["has_core_name9"], "0");
}

#[test]
fn family_errors_abort_the_render() {
    let (variants, default) = pool_family(DataType::Fx16);
    let assembler = assembler(DispatchStyle::Tree);

    let not_generic = VariantDescriptor::new(default.base.clone()).core(["x"]);
    assert!(matches!(
        render(&assembler, &variants, &not_generic).map_err(|e| e.downcast::<GenError>()),
        Err(Ok(GenError::InvalidGeneric(_)))
    ));

    let mut two_generics = variants.clone();
    two_generics.push(VariantDescriptor::generic(default.base.clone(), "other"));
    assert!(matches!(
        render(&assembler, &two_generics, &default).map_err(|e| e.downcast::<GenError>()),
        Err(Ok(GenError::InvalidGeneric(_)))
    ));

    let mut shadowing_wrapper = variants.clone();
    shadowing_wrapper.push(VariantDescriptor::new(default.base.clone()).core(["plain"]));
    assert!(matches!(
        render(&assembler, &shadowing_wrapper, &default).map_err(|e| e.downcast::<GenError>()),
        Err(Ok(GenError::NamingCollision(name))) if name == "mli_krn_avepool_chw_fx16"
    ));

    let mut crowded = variants.clone();
    crowded[1] = crowded[1].clone().core((0..11).map(|i| format!("core{i}")));
    assert!(matches!(
        render(&assembler, &crowded, &default).map_err(|e| e.downcast::<GenError>()),
        Err(Ok(GenError::TooManyCoreRoutines { count: 11, .. }))
    ));
}

#[test]
fn header_lists_wrappers_then_specializations() -> Result<()> {
    let (fx16, fx16_default) = pool_family(DataType::Fx16);
    let (fx8, fx8_default) = pool_family(DataType::Fx8);
    let groups = [Family::new(&fx16, &fx16_default), Family::new(&fx8, &fx8_default)];
    let template = Template::new("header.txt", "#ifndef $capital_file_name\n// $func_group\n$functions#endif\n");
    let rendered = Assembler::render_header(&groups, &template, "AvePooling", "_H_")?;
    let text = rendered.text;

    assert!(text.starts_with(
        "/* This file is generated, do not edit!\n * edit following template file instead:\n * header.txt\n */\n#ifndef _H_\n// AvePooling\n"
    ));
    let args = "(const mli_tensor * in, const mli_pool_cfg * cfg, mli_tensor * out);";
    let expected_fx16 = format!(
        "mli_status mli_krn_avepool_chw_fx16{args}\nchar * mli_debug_krn_avepool_chw_fx16{args}\n\nmli_status mli_krn_avepool_chw_fx16_k3x3_str1_krnpad{args}\nmli_status mli_krn_avepool_chw_fx16_k2x2_str1_nopad{args}\nmli_status mli_krn_avepool_chw_fx16_generic{args}\n"
    );
    assert!(text.contains(&expected_fx16));
    let fx16_at = text.find("mli_krn_avepool_chw_fx16(").expect("fx16 wrapper");
    let fx8_at = text.find("mli_krn_avepool_chw_fx8(").expect("fx8 wrapper");
    assert!(fx16_at < fx8_at);
    assert!(text.ends_with("mli_krn_avepool_chw_fx8_generic(const mli_tensor * in, const mli_pool_cfg * cfg, mli_tensor * out);\n#endif\n"));
    Ok(())
}
