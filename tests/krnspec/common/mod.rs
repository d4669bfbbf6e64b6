#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use krnspec::{
    default_bindings, DataType, DispatchConfig, DispatchParam, DispatchStyle, KernelArg,
    KernelBase, Layout, OpKind, RuntimeTuple, VariantDescriptor,
};

pub const FULL_HIERARCHY: [DispatchParam; 6] = [
    DispatchParam::StrideW,
    DispatchParam::StrideH,
    DispatchParam::KernelW,
    DispatchParam::KernelH,
    DispatchParam::Channels,
    DispatchParam::Padding,
];

pub fn repo_path(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join(rel)
}

pub fn pool_base(data_type: DataType) -> KernelBase {
    KernelBase::new("krn", OpKind::AvePool, Layout::Chw, data_type).with_args([
        KernelArg::new("const mli_tensor *", "in"),
        KernelArg::new("const mli_pool_cfg *", "cfg"),
        KernelArg::new("mli_tensor *", "out"),
    ])
}

pub fn conv_base(data_type: DataType) -> KernelBase {
    KernelBase::new("krn", OpKind::Conv2d, Layout::Chw, data_type).with_args([
        KernelArg::new("const mli_tensor *", "in"),
        KernelArg::new("const mli_tensor *", "weights"),
        KernelArg::new("const mli_tensor *", "bias"),
        KernelArg::new("const mli_conv2d_cfg *", "cfg"),
        KernelArg::new("mli_tensor *", "out"),
    ])
}

pub fn config(style: DispatchStyle, hierarchy: &[DispatchParam], base: &KernelBase) -> DispatchConfig {
    DispatchConfig::new(style, hierarchy.to_vec())
        .expect("valid hierarchy")
        .with_bindings(default_bindings(base))
}

pub fn generic(base: &KernelBase) -> VariantDescriptor {
    VariantDescriptor::generic(base.clone(), "generic_core")
}

pub fn runtime(stride: u32, kernel_w: u32, kernel_h: u32, channels: u32, pads: [u32; 4]) -> RuntimeTuple {
    RuntimeTuple {
        stride_w: stride,
        stride_h: stride,
        kernel_w,
        kernel_h,
        channels,
        padding_top: pads[0],
        padding_bot: pads[1],
        padding_left: pads[2],
        padding_right: pads[3],
    }
}

pub const FIXTURE_MANIFEST: &str = r#"{
  "group": "krn",
  "op": "maxpool",
  "function_group": "MaxPooling",
  "args": [["const mli_tensor *", "in"], ["const mli_pool_cfg *", "cfg"], ["mli_tensor *", "out"]],
  "file_template": "tpl/file.txt",
  "header": {"template": "tpl/header.txt", "guard": "_MAXPOOL_H_", "output": "out/maxpool.h"},
  "dispatch": {"hierarchy": ["stride_w", "stride_h", "kernel_w", "kernel_h", "padding"]},
  "targets": [
    {
      "tag": "fx16",
      "layout": "chw",
      "data_type": "fx16",
      "body_template": "tpl/body.txt",
      "output": "out/maxpool_chw_fx16.cc",
      "includes": ["maxpool.h"],
      "variants": [
        {"core": "maxpool_nopad", "stride": 1, "kernel": {"from": 2, "to": 4}, "padding": "nopad"},
        {"core": ["maxpool_krnpad", "maxpool_krnpad_ch1"], "stride": 1, "kernel": [2, 3], "padding": "krnpad"}
      ],
      "generic": {"core": "maxpool_generic"}
    },
    {"tag": "fx8", "data_type": "fx8", "derive_from": "fx16", "output": "out/maxpool_chw_fx8.cc"},
    {
      "tag": "hwc16",
      "layout": "hwc",
      "derive_from": "fx16",
      "output": "out/maxpool_hwc_fx16.cc",
      "dispatch": {"style": "flat", "hierarchy": ["stride_w", "kernel_w", "padding"], "bindings": {"kernel_w": "cfg->kw"}}
    }
  ]
}"#;

/// Writes the fixture manifest and its templates below `dir`.
pub fn write_fixture(dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir.join("tpl"))?;
    fs::write(dir.join("tpl/file.txt"), "$extra_includes$functions$wrapper")?;
    fs::write(dir.join("tpl/body.txt"), "    return $core_name($name);\n}\n")?;
    fs::write(
        dir.join("tpl/header.txt"),
        "#ifndef $capital_file_name\n$functions#endif // $func_group\n",
    )?;
    let manifest = dir.join("maxpool.json");
    fs::write(&manifest, FIXTURE_MANIFEST)?;
    Ok(manifest)
}
