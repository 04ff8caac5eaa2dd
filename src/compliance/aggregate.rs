//! Grouping an operator's type-support rows by the profiles or extensions
//! that gate them.

use crate::Result;
use crate::compliance::PrintMode;
use crate::diagnostics;
use crate::spec::{Argument, CategoryKind, Operator, TypeSupport};

use anyhow::bail;
use std::collections::BTreeSet;

/// Operator whose attribute carries a symbolic element type that still
/// belongs in the compliance tuple (its initial value).
const STATEFUL_VARIABLE_OP: &str = "VARIABLE";

/// Argument name matched exactly; the accumulator type is an attribute.
pub const ACCUMULATOR_ARGUMENT: &str = "acc_type";

/// Type-support rows sharing one group key.
#[derive(Debug, Clone)]
pub struct ComplianceGroup<'a> {
    /// Sorted, space-joined profile tokens.
    pub key: String,
    /// Rows in the order they were encountered.
    pub rows: Vec<&'a TypeSupport>,
}

impl ComplianceGroup<'_> {
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.key.split(' ')
    }

    pub fn token_count(&self) -> usize {
        self.tokens().count()
    }
}

/// Insertion-ordered map from group key to rows. Iteration order is the
/// order keys were first seen, which is also the emission order.
#[derive(Debug, Clone, Default)]
pub struct ComplianceGroups<'a> {
    groups: Vec<ComplianceGroup<'a>>,
}

impl<'a> ComplianceGroups<'a> {
    fn push(&mut self, key: String, row: &'a TypeSupport) {
        match self.groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.rows.push(row),
            None => self.groups.push(ComplianceGroup {
                key,
                rows: vec![row],
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ComplianceGroup<'a>> {
        self.groups.iter().find(|g| g.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComplianceGroup<'a>> {
        self.groups.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Collapse the operator's type-support rows into groups keyed by the
/// tokens that match `mode`.
///
/// Every atomic token of every profile expression on a row is classified;
/// the matching ones form that row's key. Rows with no matching token are
/// left out.
pub fn aggregate(op: &Operator, mode: PrintMode) -> Result<ComplianceGroups<'_>> {
    let mut groups = ComplianceGroups::default();

    for row in &op.type_support {
        let mut tokens: BTreeSet<&str> = BTreeSet::new();
        for expr in &row.profiles {
            for token in expr.tokens() {
                if mode.matches(token).map_err(|e| {
                    e.context(diagnostics::error_message(format!(
                        "operator {} mode '{}'",
                        op.name, row.mode
                    )))
                })? {
                    tokens.insert(token);
                }
            }
        }

        if tokens.is_empty() {
            continue;
        }

        let key = tokens.into_iter().collect::<Vec<_>>().join(" ");
        groups.push(key, row);
    }

    Ok(groups)
}

/// The arguments whose concrete types make up a compliance tuple, in
/// declaration order.
///
/// Inputs and outputs with a symbolic element type, the `VARIABLE`
/// attribute with a symbolic element type, and any argument named
/// [`ACCUMULATOR_ARGUMENT`].
pub fn compliance_arguments(op: &Operator) -> Result<Vec<&Argument>> {
    let mut args = Vec::new();

    for arg in &op.arguments {
        let Some(category) = arg.sole_category() else {
            bail!(
                "{}",
                diagnostics::error_message(format!(
                    "argument should only have 1 category, but {}: {} has {}",
                    op.name,
                    arg.name,
                    arg.categories.len()
                ))
            );
        };

        let symbolic = arg
            .element_type
            .as_deref()
            .is_some_and(|ty| op.is_symbolic(ty));

        match category.kind {
            CategoryKind::Input | CategoryKind::Output if symbolic => args.push(arg),
            CategoryKind::Attribute if symbolic && op.name == STATEFUL_VARIABLE_OP => {
                args.push(arg)
            }
            _ => {}
        }

        if arg.name == ACCUMULATOR_ARGUMENT {
            args.push(arg);
        }
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Spec;
    use pretty_assertions::assert_eq;

    fn spec(ops: &str) -> Spec {
        Spec::from_xml_str(&format!(
            r#"<tosa><version major="1" minor="0" patch="0"/>
<operators><operatorgroup name="g">{}</operatorgroup></operators></tosa>"#,
            ops
        ))
        .unwrap()
    }

    const MIXED: &str = r#"<operator><name>MUL</name>
<types><type name="in_t"/></types>
<typesupport mode="i8" in_t="i8_t"><op_profile name="PRO-INT"/></typesupport>
<typesupport mode="bf16" in_t="bf16_t"><op_profile name="PRO-FP" and_name="EXT-BF16"/></typesupport>
<typesupport mode="fp32" in_t="fp32_t"><op_profile name="PRO-FP"/></typesupport>
<typesupport mode="i32" in_t="i32_t"><op_profile name="PRO-INT"/><op_profile name="PRO-FP"/></typesupport>
<typesupport mode="fp8" in_t="fp8e4m3_t">
  <op_profile name="EXT-FP8E5M2" and_name="EXT-BF16"/>
</typesupport>
<typesupport mode="i16" in_t="i16_t"><op_profile name="PRO-INT"/></typesupport>
</operator>"#;

    #[test]
    fn profile_mode_groups_in_first_seen_order() {
        let spec = spec(MIXED);
        let op = spec.operator_by_name("MUL").unwrap();
        let groups = aggregate(op, PrintMode::Profile).unwrap();

        assert_eq!(
            groups.keys().collect::<Vec<_>>(),
            vec!["PRO-INT", "PRO-FP", "PRO-FP PRO-INT"]
        );
        let modes = |key: &str| -> Vec<String> {
            groups.get(key).unwrap().rows.iter().map(|r| r.mode.clone()).collect()
        };
        assert_eq!(modes("PRO-INT"), vec!["i8", "i16"]);
        assert_eq!(modes("PRO-FP"), vec!["bf16", "fp32"]);
        assert_eq!(modes("PRO-FP PRO-INT"), vec!["i32"]);
    }

    #[test]
    fn extension_mode_keeps_only_extension_tokens() {
        let spec = spec(MIXED);
        let op = spec.operator_by_name("MUL").unwrap();
        let groups = aggregate(op, PrintMode::Extension).unwrap();

        assert_eq!(
            groups.keys().collect::<Vec<_>>(),
            vec!["EXT-BF16", "EXT-BF16 EXT-FP8E5M2"]
        );
        assert_eq!(groups.get("EXT-BF16 EXT-FP8E5M2").unwrap().token_count(), 2);
        assert_eq!(groups.get("EXT-BF16").unwrap().rows[0].mode, "bf16");
    }

    #[test]
    fn rows_without_matching_tokens_are_dropped() {
        let spec = spec(
            r#"<operator><name>ADD_SHAPE</name>
<types><type name="in_t"/></types>
<typesupport mode="shape" in_t="i64_t"><op_profile name="EXT-SHAPE"/></typesupport>
<typesupport mode="none" in_t="i64_t"/>
</operator>"#,
        );
        let op = spec.operators().next().unwrap();
        assert!(aggregate(op, PrintMode::Profile).unwrap().is_empty());
        assert_eq!(aggregate(op, PrintMode::Extension).unwrap().len(), 1);
    }

    #[test]
    fn unclassifiable_token_is_fatal() {
        let spec = spec(
            r#"<operator><name>ABS</name>
<types><type name="in_t"/></types>
<typesupport mode="x" in_t="i8_t"><op_profile name="MT"/></typesupport>
</operator>"#,
        );
        let op = spec.operators().next().unwrap();
        let err = format!("{:#}", aggregate(op, PrintMode::Profile).unwrap_err());
        assert!(err.contains("cannot classify profile token MT"), "{err}");
        assert!(err.contains("operator ABS"), "{err}");
    }

    #[test]
    fn selects_symbolic_io_and_special_attributes() {
        let spec = spec(
            r#"<operator><name>CONV2D</name><arguments>
<argument category="input" name="input" type="tensor_t" shape="[N,IH,IW,IC]" tensor-element-type="in_t">
  <description>in</description><rank min="4" max="4"/></argument>
<argument category="input" name="bias" type="tensor_t" shape="[BC]" tensor-element-type="out_t">
  <description>bias</description><rank min="1" max="1"/></argument>
<argument category="attribute" name="pad" type="tensor_t" shape="[4]" tensor-element-type="i32_t">
  <description>pad</description><rank min="1" max="1"/></argument>
<argument category="attribute" name="acc_type" type="acc_type_t" shape="-" tensor-element-type="-">
  <description>acc</description></argument>
<argument category="output" name="output" type="tensor_t" shape="[N,OH,OW,OC]" tensor-element-type="out_t">
  <description>out</description><rank min="4" max="4"/></argument>
</arguments>
<types><type name="in_t"/><type name="out_t"/><type name="acc_t"/></types>
</operator>
<operator><name>VARIABLE</name><arguments>
<argument category="attribute" name="uid" type="tensor_t" shape="-" tensor-element-type="i32_t">
  <description>uid</description></argument>
<argument category="attribute" name="initial_value" type="tensor_t" shape="shape" tensor-element-type="in_t">
  <description>init</description><rank min="0" max="MAX_RANK"/></argument>
</arguments>
<types><type name="in_t"/></types>
</operator>"#,
        );

        let names = |op: &str| -> Vec<String> {
            compliance_arguments(spec.operator_by_name(op).unwrap())
                .unwrap()
                .into_iter()
                .map(|a| a.name.clone())
                .collect()
        };
        assert_eq!(names("CONV2D"), vec!["input", "bias", "acc_type", "output"]);
        assert_eq!(names("VARIABLE"), vec!["initial_value"]);
    }

    #[test]
    fn multi_category_argument_is_rejected() {
        let spec = spec(
            r#"<operator><name>RESCALE</name><arguments>
<argument category="input(PRO-INT) attribute(PRO-FP)" name="multiplier" type="tensor_t"
  shape="[NC]" tensor-element-type="mul_t">
  <description>m</description><rank min="1" max="1"/></argument>
</arguments></operator>"#,
        );
        let err = compliance_arguments(spec.operators().next().unwrap()).unwrap_err();
        assert!(err.to_string().contains("RESCALE: multiplier has 2"), "{err}");
    }
}
