//! JSON manifests declaring kernel families.
//!
//! A manifest names one operation, the shared call signature, the templates
//! and one target per output source file. Targets either list their own
//! variants or derive them from another target with a new layout or data
//! type. Relative paths are resolved against the manifest's directory.
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::assembler::{Assembler, Family, Rendered};
use crate::descriptor::{DispatchParam, KernelArg, KernelBase, VariantDescriptor};
use crate::dispatch::{default_bindings, DispatchConfig, DispatchStyle};
use crate::template::Template;
use crate::types::{DataType, Layout, OpKind, Padding};

/// Selector token that renders the header.
pub const HEADER_TOKEN: &str = "header";
/// Selector token that renders everything.
pub const ALL_TOKEN: &str = "all";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderSpec {
    pub template: String,
    pub guard: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchSpec {
    #[serde(default)]
    pub style: DispatchStyle,
    pub hierarchy: Vec<DispatchParam>,
    /// Merged over the bindings derived from the op family and layout.
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,
}

/// A parameter value set: one value, an explicit list, or a half-open range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Values {
    One(u32),
    List(Vec<u32>),
    Range {
        from: u32,
        to: u32,
        #[serde(default = "unit_step")]
        step: u32,
    },
}

fn unit_step() -> u32 {
    1
}

impl Values {
    pub fn expand(&self) -> Result<Vec<u32>> {
        match self {
            Values::One(value) => Ok(vec![*value]),
            Values::List(values) => Ok(values.clone()),
            Values::Range { from, to, step } => {
                if *step == 0 {
                    bail!("range {from}..{to} has a zero step");
                }
                Ok((*from..*to).step_by(*step as usize).collect())
            }
        }
    }
}

fn expand_or_any(values: &Option<Values>) -> Result<Vec<u32>> {
    match values {
        Some(values) => values.expand(),
        None => Ok(vec![0]),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoreRoutines {
    One(String),
    Many(Vec<String>),
}

impl CoreRoutines {
    fn names(&self) -> Vec<String> {
        match self {
            CoreRoutines::One(name) => vec![name.clone()],
            CoreRoutines::Many(names) => names.clone(),
        }
    }
}

/// One declaration line; expands to the cross product of its ranges.
/// Omitted fields are wildcards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantSpec {
    pub core: CoreRoutines,
    #[serde(default)]
    pub kernel: Option<Values>,
    #[serde(default)]
    pub kernel_w: Option<Values>,
    #[serde(default)]
    pub kernel_h: Option<Values>,
    #[serde(default)]
    pub channels: Option<Values>,
    #[serde(default)]
    pub stride: Option<Values>,
    #[serde(default)]
    pub stride_w: Option<Values>,
    #[serde(default)]
    pub stride_h: Option<Values>,
    #[serde(default)]
    pub padding: Padding,
}

impl VariantSpec {
    /// Kernels vary slowest, then channels, then strides.
    pub fn expand(&self, base: &KernelBase) -> Result<Vec<VariantDescriptor>> {
        let kernels: Vec<(u32, u32)> = match &self.kernel {
            Some(_) if self.kernel_w.is_some() || self.kernel_h.is_some() => {
                bail!("kernel cannot be combined with kernel_w / kernel_h")
            }
            Some(square) => square.expand()?.into_iter().map(|k| (k, k)).collect(),
            None => {
                let heights = expand_or_any(&self.kernel_h)?;
                expand_or_any(&self.kernel_w)?
                    .into_iter()
                    .flat_map(|w| heights.iter().map(move |&h| (w, h)))
                    .collect()
            }
        };
        let strides: Vec<(u32, u32)> = match &self.stride {
            Some(_) if self.stride_w.is_some() || self.stride_h.is_some() => {
                bail!("stride cannot be combined with stride_w / stride_h")
            }
            Some(symmetric) => symmetric.expand()?.into_iter().map(|s| (s, s)).collect(),
            None => {
                let heights = expand_or_any(&self.stride_h)?;
                expand_or_any(&self.stride_w)?
                    .into_iter()
                    .flat_map(|w| heights.iter().map(move |&h| (w, h)))
                    .collect()
            }
        };
        let channels = expand_or_any(&self.channels)?;
        let core = self.core.names();

        let mut out = Vec::new();
        for &(kernel_w, kernel_h) in &kernels {
            for &ch in &channels {
                for &(stride_w, stride_h) in &strides {
                    out.push(
                        VariantDescriptor::new(base.clone())
                            .kernel(kernel_w, kernel_h)
                            .channels(ch)
                            .stride(stride_w, stride_h)
                            .padding(self.padding)
                            .core(core.iter().cloned()),
                    );
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenericSpec {
    pub core: CoreRoutines,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    pub tag: String,
    pub output: String,
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default)]
    pub data_type: Option<DataType>,
    #[serde(default)]
    pub body_template: Option<String>,
    #[serde(default)]
    pub includes: Option<Vec<String>>,
    #[serde(default)]
    pub defines: Option<Vec<String>>,
    #[serde(default)]
    pub variants: Vec<VariantSpec>,
    #[serde(default)]
    pub generic: Option<GenericSpec>,
    #[serde(default)]
    pub derive_from: Option<String>,
    #[serde(default)]
    pub dispatch: Option<DispatchSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    group: String,
    op: OpKind,
    function_group: String,
    args: Vec<KernelArg>,
    file_template: String,
    #[serde(default)]
    header: Option<HeaderSpec>,
    dispatch: DispatchSpec,
    targets: Vec<TargetSpec>,
}

/// A target with inheritance applied.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub tag: String,
    pub output: PathBuf,
    pub base: KernelBase,
    pub body_template: String,
    pub includes: Vec<String>,
    pub defines: Vec<String>,
    pub variants: Vec<VariantDescriptor>,
    pub default: VariantDescriptor,
    pub dispatch: DispatchSpec,
}

impl ResolvedTarget {
    pub fn dispatch_config(&self) -> Result<DispatchConfig> {
        let mut bindings = default_bindings(&self.base);
        bindings.extend(self.dispatch.bindings.clone());
        let config = DispatchConfig::new(self.dispatch.style, self.dispatch.hierarchy.clone())?
            .with_bindings(bindings);
        Ok(config)
    }
}

/// What a selector token picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Target(String),
    Header,
}

impl Selection {
    pub fn label(&self) -> &str {
        match self {
            Selection::Target(tag) => tag,
            Selection::Header => HEADER_TOKEN,
        }
    }
}

/// A rendered output ready to be written.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub label: String,
    pub output: PathBuf,
    pub rendered: Rendered,
}

impl Artifact {
    pub fn write(&self) -> Result<()> {
        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        fs::write(&self.output, &self.rendered.text)
            .with_context(|| format!("failed to write {}", self.output.display()))
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    root: PathBuf,
    file: ManifestFile,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_json(&text, root)
            .with_context(|| format!("invalid manifest {}", path.display()))
    }

    /// Parse manifest text; relative paths resolve against `root`.
    pub fn from_json(text: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let file: ManifestFile = serde_json::from_str(text)?;
        let manifest = Self {
            root: root.into(),
            file,
        };
        let mut seen = HashSet::new();
        for target in &manifest.file.targets {
            if target.tag == HEADER_TOKEN || target.tag == ALL_TOKEN {
                bail!("target tag {} is reserved", target.tag);
            }
            if !seen.insert(target.tag.as_str()) {
                bail!("target tag {} is declared twice", target.tag);
            }
        }
        Ok(manifest)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn op(&self) -> OpKind {
        self.file.op
    }

    pub fn function_group(&self) -> &str {
        &self.file.function_group
    }

    pub fn tags(&self) -> Vec<&str> {
        self.file.targets.iter().map(|t| t.tag.as_str()).collect()
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn target_spec(&self, tag: &str) -> Result<&TargetSpec> {
        self.file
            .targets
            .iter()
            .find(|t| t.tag == tag)
            .ok_or_else(|| anyhow!("unknown target {tag}"))
    }

    /// Targets and header named by `tokens`, in manifest order.
    /// No token, or `all`, selects everything.
    pub fn select(&self, tokens: &[String]) -> Result<Vec<Selection>> {
        let everything = tokens.is_empty() || tokens.iter().any(|t| t == ALL_TOKEN);
        for token in tokens {
            if token != ALL_TOKEN && token != HEADER_TOKEN {
                self.target_spec(token)?;
            }
        }
        let mut out: Vec<Selection> = self
            .file
            .targets
            .iter()
            .filter(|t| everything || tokens.contains(&t.tag))
            .map(|t| Selection::Target(t.tag.clone()))
            .collect();
        let header = everything || tokens.iter().any(|t| t == HEADER_TOKEN);
        if header {
            if self.file.header.is_none() {
                if !everything {
                    bail!("manifest declares no header");
                }
            } else {
                out.push(Selection::Header);
            }
        }
        Ok(out)
    }

    /// Apply `derive_from` inheritance and expand variant declarations.
    pub fn resolve(&self, tag: &str) -> Result<ResolvedTarget> {
        self.resolve_chain(tag, &mut Vec::new())
    }

    fn resolve_chain(&self, tag: &str, visiting: &mut Vec<String>) -> Result<ResolvedTarget> {
        if visiting.iter().any(|t| t == tag) {
            bail!("derive_from cycle: {} -> {tag}", visiting.join(" -> "));
        }
        visiting.push(tag.to_string());
        let spec = self.target_spec(tag)?;

        let resolved = match &spec.derive_from {
            Some(parent_tag) => {
                if !spec.variants.is_empty() || spec.generic.is_some() {
                    bail!("target {tag} derives from {parent_tag} and cannot declare variants");
                }
                let parent = self.resolve_chain(parent_tag, visiting)?;
                let base = parent
                    .base
                    .with_layout(spec.layout.unwrap_or(parent.base.layout))
                    .with_data_type(spec.data_type.unwrap_or(parent.base.data_type));
                ResolvedTarget {
                    tag: spec.tag.clone(),
                    output: self.path(&spec.output),
                    variants: parent
                        .variants
                        .iter()
                        .map(|desc| desc.with_base(base.clone()))
                        .collect(),
                    default: parent.default.with_base(base.clone()),
                    base,
                    body_template: spec.body_template.clone().unwrap_or(parent.body_template),
                    includes: spec.includes.clone().unwrap_or(parent.includes),
                    defines: spec.defines.clone().unwrap_or(parent.defines),
                    dispatch: spec.dispatch.clone().unwrap_or(parent.dispatch),
                }
            }
            None => {
                let layout = spec
                    .layout
                    .ok_or_else(|| anyhow!("target {tag} has no layout"))?;
                let data_type = spec
                    .data_type
                    .ok_or_else(|| anyhow!("target {tag} has no data_type"))?;
                let body_template = spec
                    .body_template
                    .clone()
                    .ok_or_else(|| anyhow!("target {tag} has no body_template"))?;
                let generic = spec
                    .generic
                    .as_ref()
                    .ok_or_else(|| anyhow!("target {tag} has no generic variant"))?;
                let base = KernelBase::new(self.file.group.clone(), self.file.op, layout, data_type)
                    .with_args(self.file.args.iter().cloned());
                let mut variants = Vec::new();
                for (idx, decl) in spec.variants.iter().enumerate() {
                    let expanded = decl
                        .expand(&base)
                        .with_context(|| format!("target {tag}, variant #{idx}"))?;
                    variants.extend(expanded);
                }
                let default = VariantDescriptor::new(base.clone()).core(generic.core.names());
                let default = VariantDescriptor {
                    generic: true,
                    ..default
                };
                variants.push(default.clone());
                ResolvedTarget {
                    tag: spec.tag.clone(),
                    output: self.path(&spec.output),
                    base,
                    body_template,
                    includes: spec.includes.clone().unwrap_or_default(),
                    defines: spec.defines.clone().unwrap_or_default(),
                    variants,
                    default,
                    dispatch: spec
                        .dispatch
                        .clone()
                        .unwrap_or_else(|| self.file.dispatch.clone()),
                }
            }
        };
        visiting.pop();
        crate::detail!(
            "resolved target {} with {} variants",
            resolved.tag,
            resolved.variants.len()
        );
        Ok(resolved)
    }

    fn load_template(&self, rel: &str) -> Result<Template> {
        let path = self.path(rel);
        let source = fs::read_to_string(&path)
            .with_context(|| format!("failed to read template {}", path.display()))?;
        Ok(Template::new(rel, source))
    }

    /// Render one selection in memory.
    pub fn render(&self, selection: &Selection) -> Result<Artifact> {
        match selection {
            Selection::Target(tag) => self.render_target(tag),
            Selection::Header => self.render_header(),
        }
    }

    fn render_target(&self, tag: &str) -> Result<Artifact> {
        let target = self.resolve(tag)?;
        let assembler = Assembler::new(target.dispatch_config()?);
        let body = self.load_template(&target.body_template)?;
        let file = self.load_template(&self.file.file_template)?;
        let rendered = assembler
            .render_source(
                &target.variants,
                &target.default,
                &body,
                &file,
                &target.includes,
                &target.defines,
            )
            .with_context(|| format!("failed to render target {tag}"))?;
        Ok(Artifact {
            label: target.tag,
            output: target.output,
            rendered,
        })
    }

    fn render_header(&self) -> Result<Artifact> {
        let header = self
            .file
            .header
            .as_ref()
            .ok_or_else(|| anyhow!("manifest declares no header"))?;
        let targets = self
            .file
            .targets
            .iter()
            .map(|t| self.resolve(&t.tag))
            .collect::<Result<Vec<_>>>()?;
        let families: Vec<Family<'_>> = targets
            .iter()
            .map(|t| Family::new(&t.variants, &t.default))
            .collect();
        let template = self.load_template(&header.template)?;
        let rendered = Assembler::render_header(
            &families,
            &template,
            &self.file.function_group,
            &header.guard,
        )
        .context("failed to render header")?;
        Ok(Artifact {
            label: HEADER_TOKEN.to_string(),
            output: self.path(&header.output),
            rendered,
        })
    }
}
