//! Loading the specification XML into the validated model.
//!
//! Document shape:
//! ```text
//! <tosa>
//!   <version major="1" minor="0" patch="0" draft="false"/>
//!   <profiles><profile profile="PRO-INT" name=".." .../></profiles>
//!   <profile_extensions>
//!     <profile_extension name="INT16" ...><profile>PRO-INT</profile></profile_extension>
//!   </profile_extensions>
//!   <levels><level name="8K" max_rank="6" ...>description</level></levels>
//!   <operators>
//!     <operatorgroup name="tensor">
//!       <operator>
//!         <name>ARGMAX</name>
//!         <arguments>
//!           <argument category="input" name="input" type="tensor_t"
//!                     shape="shape1" tensor-element-type="in_t">
//!             <description>..</description>
//!             <rank min="1" max="MAX_RANK"/>
//!             <levellimit value="rank(shape1)" limit="MAX_RANK"/>
//!           </argument>
//!         </arguments>
//!         <types><type name="in_t"/><type name="out_t"/></types>
//!         <typesupport mode="signed 8" in_t="i8_t" out_t="i32_t">
//!           <op_profile name="PRO-INT"/>
//!         </typesupport>
//!       </operator>
//!     </operatorgroup>
//!   </operators>
//!   <enum name="resize_mode_t" description="..">
//!     <enumval name="NEAREST" value="0" description=".."/>
//!   </enum>
//! </tosa>
//! ```
//!
//! Any structural problem fails the whole load.

use crate::Result;
use crate::diagnostics;
use crate::spec::model::*;
use crate::spec::shape::implied_rank;
use crate::spec::xml::{self, Element};

use anyhow::{Context, anyhow, bail};
use regex::Regex;
use std::fs;
use std::sync::LazyLock;

/// `input`, `attribute(PRO-FP)`, `input(PRO-INT) attribute(PRO-FP,PRO-INT)`.
static CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(input|output|attribute)\(?([A-Z,\-]+)?\)?").expect("category pattern")
});

/// Level maximum attribute names, in the order they are reported.
const LEVEL_MAXIMUMS: &[(&str, &str)] = &[
    ("MAX_RANK", "max_rank"),
    ("MAX_KERNEL", "max_kernel"),
    ("MAX_STRIDE", "max_stride"),
    ("MAX_SCALE", "max_scale"),
    ("MAX_LOG2_SIZE", "max_log2_size"),
    ("MAX_NESTING", "max_nesting"),
    ("MAX_TENSOR_LIST_SIZE", "max_tensor_list_size"),
];

impl Spec {
    /// Read and validate a specification XML file.
    pub fn load(path: &str) -> Result<Spec> {
        let text = fs::read_to_string(path)
            .with_context(|| diagnostics::error_message(format!("read spec file {}", path)))?;
        Self::from_xml_str(&text)
            .with_context(|| diagnostics::error_message(format!("load spec file {}", path)))
    }

    pub fn from_xml_str(text: &str) -> Result<Spec> {
        let root = xml::parse_document(text)?;

        let version = load_version(&root)?;
        let profiles = root
            .find_all("profiles/profile")
            .into_iter()
            .map(load_profile)
            .collect::<Result<Vec<_>>>()?;
        let profile_extensions = root
            .find_all("profile_extensions/profile_extension")
            .into_iter()
            .map(load_profile_extension)
            .collect::<Result<Vec<_>>>()?;
        let levels = root
            .find_all("levels/level")
            .into_iter()
            .map(load_level)
            .collect::<Result<Vec<_>>>()?;
        let operator_groups = root
            .find_all("operators/operatorgroup")
            .into_iter()
            .map(load_operator_group)
            .collect::<Result<Vec<_>>>()?;
        let enums = root
            .children_named("enum")
            .map(load_enum)
            .collect::<Result<Vec<_>>>()?;

        Ok(Spec {
            version,
            profiles,
            profile_extensions,
            levels,
            operator_groups,
            enums,
        })
    }
}

fn load_version(root: &Element) -> Result<Version> {
    let version = root
        .child("version")
        .ok_or_else(|| anyhow!(diagnostics::error_message("spec has no <version> element")))?;

    let number = |key: &str| -> Result<u32> {
        let raw = version.required_attr(key, "version")?;
        raw.parse::<u32>().with_context(|| {
            diagnostics::error_message(format!("version {} is not a number: {}", key, raw))
        })
    };

    Ok(Version {
        major: number("major")?,
        minor: number("minor")?,
        patch: number("patch")?,
        draft: version.attr("draft") == Some("true"),
    })
}

fn load_profile(e: &Element) -> Result<Profile> {
    Ok(Profile {
        profile: e.required_attr("profile", "profile")?.to_string(),
        name: e.attr("name").unwrap_or_default().to_string(),
        description: e.attr("description").unwrap_or_default().to_string(),
        status: e.attr("status").unwrap_or_default().to_string(),
    })
}

fn load_profile_extension(e: &Element) -> Result<ProfileExtension> {
    Ok(ProfileExtension {
        name: e.required_attr("name", "profile extension")?.to_string(),
        description: e.attr("description").unwrap_or_default().to_string(),
        status: e.attr("status").unwrap_or_default().to_string(),
        profiles: e.children.iter().map(|p| p.text.trim().to_string()).collect(),
    })
}

fn load_level(e: &Element) -> Result<Level> {
    let name = e.required_attr("name", "level")?.to_string();

    let mut maximums = Vec::with_capacity(LEVEL_MAXIMUMS.len());
    for &(label, attr) in LEVEL_MAXIMUMS {
        let value = match e.attr(attr) {
            Some(raw) => Some(raw.trim().parse::<u64>().with_context(|| {
                diagnostics::error_message(format!(
                    "level {} has a non-numeric {}: {}",
                    name, attr, raw
                ))
            })?),
            None => None,
        };
        maximums.push(LevelMaximum { name: label, value });
    }

    Ok(Level {
        description: e.text.trim().to_string(),
        name,
        maximums,
    })
}

fn load_operator_group(e: &Element) -> Result<OperatorGroup> {
    let name = e.attr("name").unwrap_or_default().to_string();
    let operators = e
        .children_named("operator")
        .map(load_operator)
        .collect::<Result<Vec<_>>>()
        .with_context(|| diagnostics::error_message(format!("in operator group {}", name)))?;
    Ok(OperatorGroup { name, operators })
}

fn load_operator(e: &Element) -> Result<Operator> {
    let name = e
        .child("name")
        .map(|n| n.text.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| anyhow!(diagnostics::error_message("operator without a <name>")))?;

    let arguments = e
        .find_all("arguments/argument")
        .into_iter()
        .map(|arg| load_argument(arg, &name))
        .collect::<Result<Vec<_>>>()?;

    let types = e
        .find_all("types/type")
        .into_iter()
        .map(|ty| ty.required_attr("name", &name).map(str::to_string))
        .collect::<Result<Vec<_>>>()?;

    let type_support = e
        .children_named("typesupport")
        .map(|ts| load_type_support(ts, &name, &types))
        .collect::<Result<Vec<_>>>()?;

    Ok(Operator {
        name,
        arguments,
        types,
        type_support,
    })
}

fn load_type_support(e: &Element, op_name: &str, types: &[String]) -> Result<TypeSupport> {
    let mode = e.attr("mode").unwrap_or_default().to_string();

    let mut mapping = Vec::with_capacity(types.len());
    for ty in types {
        let concrete = e.attr(ty).ok_or_else(|| {
            anyhow!(diagnostics::error_message(format!(
                "operator {} mode '{}' has no concrete type for {}",
                op_name, mode, ty
            )))
        })?;
        mapping.push((ty.clone(), concrete.to_string()));
    }

    let mut profiles = Vec::new();
    for p in e.children_named("op_profile") {
        let what = format!("{} mode '{}'", op_name, mode);
        let name = p.required_attr("name", &what)?;
        profiles.push(ProfileExpression::new(name, p.attr("and_name")));
    }

    Ok(TypeSupport {
        mode,
        types: mapping,
        profiles,
        version_added: e.attr("version_added").map(str::to_string),
    })
}

fn load_argument(e: &Element, op_name: &str) -> Result<Argument> {
    let name = e.required_attr("name", op_name)?.to_string();
    let what = format!("{}: {}", op_name, name);

    let description = e
        .child("description")
        .map(|d| d.text.trim().to_string())
        .ok_or_else(|| {
            anyhow!(diagnostics::error_message(format!(
                "argument has no <description> for {}",
                what
            )))
        })?;

    let shape = e.required_attr("shape", &what)?.to_string();
    let rank = match e.child("rank") {
        Some(r) => Some(load_rank(r, &what)?),
        None => None,
    };
    check_rank(&shape, rank.as_ref(), op_name, &name)?;

    let categories = parse_categories(e.required_attr("category", &what)?)
        .with_context(|| diagnostics::error_message(format!("bad category for {}", what)))?;

    let level_limits = e
        .children_named("levellimit")
        .map(|l| {
            Ok(LevelLimit {
                value: l.required_attr("value", &what)?.to_string(),
                limit: l.required_attr("limit", &what)?.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Argument {
        categories,
        ty: e.attr("type").unwrap_or_default().to_string(),
        element_type: e
            .attr("tensor-element-type")
            .filter(|t| *t != UNSPECIFIED)
            .map(str::to_string),
        shape,
        rank,
        level_limits,
        optional: e.attr("optional") == Some("true"),
        description,
        name,
    })
}

fn load_rank(e: &Element, what: &str) -> Result<RankRange> {
    Ok(RankRange {
        min: RankBound::parse(e.required_attr("min", what)?),
        max: RankBound::parse(e.required_attr("max", what)?),
    })
}

/// Validate the rank requirement against the shape descriptor.
///
/// Bounds only need to be numeric when the shape is rank-checkable; a
/// `MAX_RANK` maximum never limits the check.
fn check_rank(shape: &str, rank: Option<&RankRange>, op_name: &str, arg: &str) -> Result<()> {
    let Some(rank) = rank else {
        if shape != UNSPECIFIED {
            bail!(
                "{}",
                diagnostics::error_message(format!(
                    "rank not present for {}: {} when shape is {}",
                    op_name, arg, shape
                ))
            );
        }
        return Ok(());
    };

    if shape == UNSPECIFIED && !rank.is_scalar() {
        bail!(
            "{}",
            diagnostics::error_message(format!(
                "rank is not empty or non-zero, but shape is '-' for {}: {}",
                op_name, arg
            ))
        );
    }

    let Some(shape_rank) = implied_rank(shape)? else {
        return Ok(());
    };

    let not_a_number = |key: &str, bound: &RankBound| {
        anyhow!(diagnostics::error_message(format!(
            "rank {} is not a number for {}: {}: {}",
            key, op_name, arg, bound
        )))
    };
    let min = rank.min.value().ok_or_else(|| not_a_number("min", &rank.min))?;
    let max = match rank.max.value() {
        Some(max) => Some(max),
        None if rank.max.is_max_rank() => None,
        None => return Err(not_a_number("max", &rank.max)),
    };

    if shape_rank < min || max.is_some_and(|max| shape_rank > max) {
        bail!(
            "{}",
            diagnostics::error_message(format!(
                "shape rank doesn't match rank min/max for {}: {} shape: {} shape_rank: {} min/max: {} {}",
                op_name, arg, shape, shape_rank, rank.min, rank.max
            ))
        );
    }
    Ok(())
}

/// Split a category attribute into its `kind(QUALIFIER,...)` segments.
fn parse_categories(raw: &str) -> Result<Vec<Category>> {
    let mut out = Vec::new();
    for caps in CATEGORY_RE.captures_iter(raw) {
        let kind =
            CategoryKind::parse(&caps[1]).expect("category pattern only matches known kinds");
        let qualifiers = caps
            .get(2)
            .map(|q| {
                q.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        out.push(Category { kind, qualifiers });
    }
    if out.is_empty() {
        bail!(
            "{}",
            diagnostics::error_message(format!("no category in '{}'", raw))
        );
    }
    Ok(out)
}

fn load_enum(e: &Element) -> Result<Enum> {
    let name = e.required_attr("name", "enum")?.to_string();
    let values = e
        .children_named("enumval")
        .map(|v| {
            Ok(EnumValue {
                name: v.required_attr("name", &name)?.to_string(),
                value: v.required_attr("value", &name)?.to_string(),
                description: v.attr("description").unwrap_or_default().to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Enum {
        description: e.attr("description").unwrap_or_default().trim().to_string(),
        name,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wrap_operator(op: &str) -> String {
        format!(
            r#"<tosa><version major="1" minor="0" patch="0" draft="false"/>
<operators><operatorgroup name="g">{}</operatorgroup></operators></tosa>"#,
            op
        )
    }

    fn argument(attrs: &str, body: &str) -> String {
        wrap_operator(&format!(
            r#"<operator><name>OP</name><arguments>
<argument name="x" category="input" type="tensor_t" tensor-element-type="in_t" {}>
<description>the x</description>{}</argument></arguments>
<types><type name="in_t"/></types></operator>"#,
            attrs, body
        ))
    }

    #[test]
    fn loads_whole_document() {
        let doc = r#"<?xml version="1.0" encoding="utf-8"?>
<tosa>
  <version major="1" minor="1" patch="0" draft="true"/>
  <profiles>
    <profile profile="PRO-INT" name="Integer" description="int" status="complete"/>
    <profile profile="PRO-FP" name="Floating-point" description="fp" status="complete"/>
  </profiles>
  <profile_extensions>
    <profile_extension name="INT16" description="16-bit" status="complete">
      <profile>PRO-INT</profile>
    </profile_extension>
  </profile_extensions>
  <levels>
    <level name="8K" max_rank="6" max_kernel="8192" max_stride="8192" max_scale="256"
           max_log2_size="31" max_nesting="6" max_tensor_list_size="64">Level 8K</level>
  </levels>
  <operators>
    <operatorgroup name="elementwise">
      <operator>
        <name>ABS</name>
        <arguments>
          <argument category="input" name="input1" type="tensor_t" shape="shape1"
                    tensor-element-type="in_out_t">
            <description>Input tensor</description>
            <rank min="0" max="MAX_RANK"/>
            <levellimit value="rank(shape1)" limit="MAX_RANK"/>
          </argument>
          <argument category="output" name="output" type="tensor_t" shape="shape1"
                    tensor-element-type="in_out_t">
            <description>Output tensor</description>
            <rank min="0" max="MAX_RANK"/>
          </argument>
        </arguments>
        <types><type name="in_out_t"/></types>
        <typesupport mode="signed 32" in_out_t="i32_t" version_added="1.0">
          <op_profile name="PRO-INT"/>
        </typesupport>
        <typesupport mode="bf16" in_out_t="bf16_t">
          <op_profile name="PRO-FP" and_name="EXT-BF16"/>
        </typesupport>
      </operator>
    </operatorgroup>
  </operators>
  <enum name="nan_propagation_mode_t" description=" NaN mode ">
    <enumval name="PROPAGATE" value="1" description="propagate"/>
    <enumval name="IGNORE" value="2" description="ignore"/>
  </enum>
</tosa>"#;

        let spec = Spec::from_xml_str(doc).unwrap();
        assert_eq!(spec.version.to_string(), "1.1.0 draft");
        assert_eq!(spec.profiles.len(), 2);
        assert_eq!(spec.profile_extensions[0].profiles, vec!["PRO-INT"]);
        assert_eq!(spec.levels[0].maximum("MAX_KERNEL"), Some(8192));
        assert_eq!(spec.levels[0].maximum("MAX_TENSOR_LIST_SIZE"), Some(64));
        assert_eq!(spec.levels[0].description, "Level 8K");

        let abs = spec.operator_by_name("ABS").unwrap();
        assert_eq!(abs.arguments.len(), 2);
        assert_eq!(abs.arguments[0].element_type.as_deref(), Some("in_out_t"));
        assert_eq!(abs.arguments[0].level_limits[0].limit, "MAX_RANK");
        assert_eq!(abs.type_support[0].concrete("in_out_t"), Some("i32_t"));
        assert_eq!(abs.type_support[0].version_added.as_deref(), Some("1.0"));
        assert_eq!(abs.type_support[1].profiles[0].as_str(), "EXT-BF16 and PRO-FP");

        let e = spec.enum_by_name("nan_propagation_mode_t").unwrap();
        assert_eq!(e.description, "NaN mode");
        assert_eq!(e.values[1].name, "IGNORE");
    }

    #[test]
    fn six_maximum_levels_leave_list_size_unset() {
        let doc = r#"<tosa><version major="0" minor="80" patch="0"/>
<levels><level name="none" max_rank="32" max_kernel="2147483647" max_stride="2147483647"
 max_scale="2048" max_log2_size="63" max_nesting="256">No level</level></levels></tosa>"#;
        let spec = Spec::from_xml_str(doc).unwrap();
        assert_eq!(spec.levels[0].maximums.len(), 7);
        assert_eq!(spec.levels[0].maximum("MAX_TENSOR_LIST_SIZE"), None);
        assert!(!spec.version.draft);
    }

    #[test]
    fn rank_must_match_dimension_list() {
        let doc = argument(r#"shape="[N,H,W,C]""#, r#"<rank min="1" max="3"/>"#);
        let err = format!("{:#}", Spec::from_xml_str(&doc).unwrap_err());
        assert!(err.contains("shape rank doesn't match"), "{err}");
        assert!(err.contains("OP: x"), "{err}");
    }

    #[test]
    fn matching_dimension_list_loads() {
        let doc = argument(r#"shape="[N,H,W,C]""#, r#"<rank min="4" max="4"/>"#);
        let spec = Spec::from_xml_str(&doc).unwrap();
        let arg = &spec.operators().next().unwrap().arguments[0];
        assert_eq!(
            arg.rank,
            Some(RankRange {
                min: RankBound::Value(4),
                max: RankBound::Value(4),
            })
        );
    }

    #[test]
    fn fixed_count_shape_is_rank_one() {
        let bad = argument(r#"shape="[2]""#, r#"<rank min="2" max="2"/>"#);
        assert!(Spec::from_xml_str(&bad).is_err());
        let good = argument(r#"shape="[2]""#, r#"<rank min="1" max="1"/>"#);
        assert!(Spec::from_xml_str(&good).is_ok());
    }

    #[test]
    fn unspecified_shape_rejects_nonzero_rank() {
        let doc = argument(r#"shape="-""#, r#"<rank min="0" max="1"/>"#);
        let err = format!("{:#}", Spec::from_xml_str(&doc).unwrap_err());
        assert!(err.contains("shape is '-'"), "{err}");
    }

    #[test]
    fn unspecified_shape_allows_scalar_or_no_rank() {
        let scalar = argument(r#"shape="-""#, r#"<rank min="0" max="0"/>"#);
        assert!(Spec::from_xml_str(&scalar).is_ok());
        let none = argument(r#"shape="-""#, "");
        let spec = Spec::from_xml_str(&none).unwrap();
        assert_eq!(spec.operators().next().unwrap().arguments[0].rank, None);
    }

    #[test]
    fn shaped_argument_requires_rank() {
        let doc = argument(r#"shape="shape1""#, "");
        let err = format!("{:#}", Spec::from_xml_str(&doc).unwrap_err());
        assert!(err.contains("rank not present for OP: x"), "{err}");
    }

    #[test]
    fn max_rank_survives_into_the_dump() {
        let doc = argument(r#"shape="shape1""#, r#"<rank min="0" max="MAX_RANK"/>"#);
        let spec = Spec::from_xml_str(&doc).unwrap();
        let json = serde_json::to_value(&spec).unwrap();
        let rank = &json["operator_groups"][0]["operators"][0]["arguments"][0]["rank"];
        assert_eq!(rank, &serde_json::json!({"min": 0, "max": "MAX_RANK"}));
    }

    #[test]
    fn max_rank_does_not_limit_a_checkable_shape() {
        let doc = argument(r#"shape="[N,H,W,C]""#, r#"<rank min="1" max="MAX_RANK"/>"#);
        assert!(Spec::from_xml_str(&doc).is_ok());
        let low = argument(r#"shape="[N,H,W,C]""#, r#"<rank min="5" max="MAX_RANK"/>"#);
        let err = format!("{:#}", Spec::from_xml_str(&low).unwrap_err());
        assert!(err.contains("min/max: 5 MAX_RANK"), "{err}");
    }

    #[test]
    fn symbolic_bounds_only_matter_for_checkable_shapes() {
        let loose = argument(r#"shape="shape1""#, r#"<rank min="1" max="MAX_RANK-1"/>"#);
        let spec = Spec::from_xml_str(&loose).unwrap();
        let rank = spec.operators().next().unwrap().arguments[0].rank.clone().unwrap();
        assert_eq!(rank.max, RankBound::Symbol("MAX_RANK-1".to_string()));

        let checked = argument(r#"shape="[N,C]""#, r#"<rank min="1" max="MAX_RANK-1"/>"#);
        let err = format!("{:#}", Spec::from_xml_str(&checked).unwrap_err());
        assert!(err.contains("rank max is not a number for OP: x: MAX_RANK-1"), "{err}");
    }

    #[test]
    fn category_segments_carry_qualifiers() {
        let cats = parse_categories("input(PRO-INT) attribute(PRO-FP,PRO-INT)").unwrap();
        assert_eq!(
            cats,
            vec![
                Category {
                    kind: CategoryKind::Input,
                    qualifiers: vec!["PRO-INT".to_string()],
                },
                Category {
                    kind: CategoryKind::Attribute,
                    qualifiers: vec!["PRO-FP".to_string(), "PRO-INT".to_string()],
                },
            ]
        );

        let plain = parse_categories("output").unwrap();
        assert_eq!(plain[0].kind, CategoryKind::Output);
        assert!(plain[0].qualifiers.is_empty());
    }

    #[test]
    fn unknown_category_is_fatal() {
        assert!(parse_categories("weights").is_err());
    }

    #[test]
    fn missing_symbolic_type_in_type_support_is_fatal() {
        let doc = wrap_operator(
            r#"<operator><name>CAST</name>
<types><type name="in_t"/><type name="out_t"/></types>
<typesupport mode="bool to i8" in_t="bool_t"><op_profile name="PRO-INT"/></typesupport>
</operator>"#,
        );
        let err = format!("{:#}", Spec::from_xml_str(&doc).unwrap_err());
        assert!(err.contains("has no concrete type for out_t"), "{err}");
    }

    #[test]
    fn missing_version_is_fatal() {
        assert!(Spec::from_xml_str("<tosa/>").is_err());
    }
}
