//! Source and header assembly.
//!
//! The assembler turns a variant family into text: one function per variant
//! expanded from the body template, the dispatching wrapper and its
//! diagnostic twin, all substituted into the outer file template. Headers
//! collect the prototypes of several families.
use crate::condition::fixed_padding;
use crate::descriptor::{VariantDescriptor, MAX_CORE_ROUTINES};
use crate::dispatch::DispatchConfig;
use crate::error::{Diagnostic, GenError, GenResult};
use crate::naming::{ensure_unique, prototype, symbol_name, MAX_LINE_LEN};
use crate::template::{Mapping, Template};

pub const STATUS_TYPE: &str = "mli_status";
pub const DEBUG_RETURN_TYPE: &str = "char *";

/// Rendered artifact text plus the recoverable findings met on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// One variant family as listed in a header.
#[derive(Debug, Clone, Copy)]
pub struct Family<'a> {
    pub variants: &'a [VariantDescriptor],
    pub default: &'a VariantDescriptor,
}

impl<'a> Family<'a> {
    pub fn new(variants: &'a [VariantDescriptor], default: &'a VariantDescriptor) -> Self {
        Self { variants, default }
    }

    /// Declared variants, with the default appended when it is not listed.
    pub fn members(&self) -> Vec<&'a VariantDescriptor> {
        let mut out: Vec<&'a VariantDescriptor> = self.variants.iter().collect();
        if !self.variants.contains(self.default) {
            out.push(self.default);
        }
        out
    }

    /// Reject families that cannot produce a consistent artifact.
    pub fn check(&self) -> GenResult<()> {
        let default = self.default;
        if !default.generic {
            return Err(GenError::InvalidGeneric(format!(
                "default {} is not marked generic",
                symbol_name(default)
            )));
        }
        if let Some(extra) = self
            .variants
            .iter()
            .find(|desc| desc.generic && *desc != default)
        {
            return Err(GenError::InvalidGeneric(format!(
                "{} is generic but {} is the default",
                symbol_name(extra),
                symbol_name(default)
            )));
        }
        let members = self.members();
        for desc in &members {
            desc.validate()?;
        }
        let normal = default.wrapper(false);
        let debug = default.wrapper(true);
        ensure_unique(members.iter().copied().chain([&normal, &debug]))
    }
}

/// Auto-generated notice naming the templates an artifact came from.
pub fn banner(templates: &[&str]) -> String {
    let mut out = String::from("/* This file is generated, do not edit!\n");
    if templates.len() > 1 {
        out.push_str(" * edit following template files instead:\n");
    } else {
        out.push_str(" * edit following template file instead:\n");
    }
    for name in templates {
        out.push_str(&format!(" * {name}\n"));
    }
    out.push_str(" */\n");
    out
}

const CORE_SLOTS: [&str; MAX_CORE_ROUTINES] = [
    "core_name",
    "core_name1",
    "core_name2",
    "core_name3",
    "core_name4",
    "core_name5",
    "core_name6",
    "core_name7",
    "core_name8",
    "core_name9",
];

/// Placeholder values available to a variant body.
pub fn body_mapping(desc: &VariantDescriptor) -> Mapping {
    let mut map = Mapping::new();
    let mut put = |key: &str, value: String| {
        map.insert(key.to_string(), value);
    };
    let aliases = desc.base.data_type.aliases();
    put("name", symbol_name(desc));
    put("kernel_w", desc.kernel_w.to_string());
    put("kernel_h", desc.kernel_h.to_string());
    put("channels", desc.channels.to_string());
    put("stride_w", desc.stride_w.to_string());
    put("stride_h", desc.stride_h.to_string());
    put("datatype", desc.base.data_type.to_string());
    put("d_type", aliases.d_type.to_string());
    put("w_type", aliases.w_type.to_string());
    put("b_type", aliases.b_type.to_string());
    put("d_enum_type", aliases.d_enum.to_string());
    put("el_params", aliases.el_params.to_string());

    // Unfixed padding is "don't care": zeros with kernelpadding = 0.
    let (fixed, pads) = match fixed_padding(desc) {
        Some(pads) => (1, pads),
        None => (0, [0; 4]),
    };
    put("kernelpadding", fixed.to_string());
    for (key, value) in ["padding_top", "padding_bot", "padding_left", "padding_right"]
        .into_iter()
        .zip(pads)
    {
        put(key, value.to_string());
    }

    for (idx, slot) in CORE_SLOTS.into_iter().enumerate() {
        let core = desc.core.get(idx);
        put(slot, core.cloned().unwrap_or_default());
        put(format!("has_{slot}").as_str(), u8::from(core.is_some()).to_string());
    }
    map
}

/// Renders artifacts for one dispatch configuration. Renders share no state.
#[derive(Debug, Clone)]
pub struct Assembler {
    config: DispatchConfig,
}

impl Assembler {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    fn function_bodies(members: &[&VariantDescriptor], body_template: &Template) -> String {
        let mut out = String::new();
        for desc in members {
            crate::detail!("body {}", symbol_name(desc));
            out.push_str(&prototype(desc, STATUS_TYPE));
            out.push_str(" {\n");
            out.push_str(&body_template.safe_substitute(&body_mapping(desc)));
            out.push('\n');
        }
        out
    }

    /// Normal and diagnostic wrappers for one family.
    pub fn render_wrappers(
        &self,
        variants: &[VariantDescriptor],
        default: &VariantDescriptor,
    ) -> GenResult<Rendered> {
        let plan = self.config.build(variants, default)?;
        let declarations = self.config.variable_declarations(&plan)?;
        let mut text = String::new();
        for (debug, return_type) in [(false, STATUS_TYPE), (true, DEBUG_RETURN_TYPE)] {
            text.push_str(&prototype(&default.wrapper(debug), return_type));
            text.push_str(" {\n");
            text.push_str(&declarations);
            text.push('\n');
            text.push_str(&plan.render(debug));
            text.push_str("}\n");
        }
        Ok(Rendered {
            text,
            diagnostics: plan.diagnostics,
        })
    }

    pub fn render_source(
        &self,
        variants: &[VariantDescriptor],
        default: &VariantDescriptor,
        body_template: &Template,
        file_template: &Template,
        includes: &[String],
        defines: &[String],
    ) -> GenResult<Rendered> {
        let family = Family::new(variants, default);
        family.check()?;
        crate::trace!(
            "rendering {} with {} variants ({} dispatch)",
            symbol_name(&default.wrapper(false)),
            variants.len(),
            self.config.style()
        );
        let wrappers = self.render_wrappers(variants, default)?;

        let mut map = Mapping::new();
        map.insert(
            "extra_includes".to_string(),
            includes
                .iter()
                .map(|inc| format!("#include \"{inc}\"\n"))
                .collect(),
        );
        map.insert(
            "extra_defines".to_string(),
            defines.iter().map(|def| format!("{def}\n")).collect(),
        );
        map.insert(
            "functions".to_string(),
            Self::function_bodies(&family.members(), body_template),
        );
        map.insert("wrapper".to_string(), wrappers.text);

        let mut text = banner(&[file_template.name(), body_template.name()]);
        text.push_str(&file_template.substitute(&map)?);
        Ok(Rendered {
            text,
            diagnostics: wrappers.diagnostics,
        })
    }

    /// Header listing both wrappers and every specialization of each family.
    /// Dispatch is not built here, so the configuration is not consulted.
    pub fn render_header(
        groups: &[Family<'_>],
        header_template: &Template,
        function_group: &str,
        guard: &str,
    ) -> GenResult<Rendered> {
        let mut functions = String::new();
        for family in groups {
            family.check()?;
            let default = family.default;
            functions.push_str(&format!(
                "{};\n",
                prototype(&default.wrapper(false), STATUS_TYPE)
            ));
            functions.push_str(&format!(
                "{};\n",
                prototype(&default.wrapper(true), DEBUG_RETURN_TYPE)
            ));
            functions.push('\n');
            for desc in family.members() {
                let line = format!("{};\n", prototype(desc, STATUS_TYPE));
                let long = line.len() > MAX_LINE_LEN;
                functions.push_str(&line);
                if long {
                    functions.push('\n');
                }
            }
        }

        let mut map = Mapping::new();
        map.insert("capital_file_name".to_string(), guard.to_string());
        map.insert("func_group".to_string(), function_group.to_string());
        map.insert("functions".to_string(), functions);

        let mut text = banner(&[header_template.name()]);
        text.push_str(&header_template.substitute(&map)?);
        Ok(Rendered {
            text,
            diagnostics: Vec::new(),
        })
    }
}
