//! Emitting the bracketed compliance tables.
//!
//! Desired output format for one operator:
//! ```text
//! {"tosa.depthwise_conv2d",
//!   {
//!     {{Profile::pro_int}, {{i8T, i8T, i32T, i32T}}},
//!     {{Profile::pro_fp}, {{fp16T, fp16T, fp16T, fp16T}, {fp32T, fp32T, fp32T, fp32T}}}
//!   }
//! },
//! ```
//! A group with more than one profile token gets a trailing combinator:
//! `{{Profile::pro_int, Profile::pro_fp}, {{i32T, i32T}}, anyOf}`.

use crate::Result;
use crate::compliance::PrintMode;
use crate::compliance::aggregate::{ComplianceGroups, aggregate, compliance_arguments};
use crate::compliance::vocab::{export_operation_name, export_profile_name, export_type_name};
use crate::diagnostics;
use crate::report::{ExportSummary, OperatorSummary, TableSummary};
use crate::spec::{Argument, Operator, Spec, TypeSupport};

use anyhow::{Context, anyhow, bail};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Type tag of an argument that carries no element type of its own but
/// names the accumulator type.
const ACC_TYPE_TAG: &str = "acc_type_t";

/// Symbolic type an `acc_type_t` argument resolves through.
const ACC_SYMBOLIC_TYPE: &str = "acc_t";

/// Write one operator's block to `out`.
///
/// Returns `None` and writes nothing when `groups` is empty. The block is
/// rendered in full before anything is written, so a vocabulary error
/// leaves `out` untouched.
pub fn emit_operator<W: Write>(
    out: &mut W,
    op_name: &str,
    args: &[&Argument],
    groups: &ComplianceGroups<'_>,
    mode: PrintMode,
) -> Result<Option<OperatorSummary>> {
    if groups.is_empty() {
        return Ok(None);
    }

    let mut block = String::new();
    block.push_str("{\"");
    block.push_str(&export_operation_name(op_name));
    block.push_str("\",\n  {\n");

    let mut tuples = 0usize;
    for (i, group) in groups.iter().enumerate() {
        let tokens = group
            .tokens()
            .map(export_profile_name)
            .collect::<Result<Vec<_>>>()
            .with_context(|| diagnostics::error_message(format!("operator {}", op_name)))?;

        block.push_str("    {{");
        block.push_str(&tokens.join(", "));
        block.push_str("}, ");
        block.push_str(&render_type_tuples(op_name, args, &group.rows)?);
        if tokens.len() > 1 {
            block.push_str(", ");
            block.push_str(mode.combinator());
        }
        block.push('}');
        if i + 1 < groups.len() {
            block.push(',');
        }
        block.push('\n');

        tuples += group.rows.len();
    }
    block.push_str("  }\n},\n");

    out.write_all(block.as_bytes())?;

    Ok(Some(OperatorSummary {
        name: op_name.to_string(),
        groups: groups.len(),
        tuples,
    }))
}

/// `{{i8T, i32T}, {i16T, i32T}}`: one tuple per row, one type per argument.
fn render_type_tuples(op_name: &str, args: &[&Argument], rows: &[&TypeSupport]) -> Result<String> {
    let mut tuples = Vec::with_capacity(rows.len());
    for row in rows {
        let types = args
            .iter()
            .map(|arg| concrete_type(op_name, arg, row))
            .collect::<Result<Vec<_>>>()?;
        tuples.push(format!("{{{}}}", types.join(", ")));
    }
    Ok(format!("{{{}}}", tuples.join(", ")))
}

fn concrete_type(op_name: &str, arg: &Argument, row: &TypeSupport) -> Result<&'static str> {
    let symbolic = match arg.element_type.as_deref() {
        Some(ty) => ty,
        None if arg.ty == ACC_TYPE_TAG => ACC_SYMBOLIC_TYPE,
        None => bail!(
            "{}",
            diagnostics::error_message(format!(
                "type {} of {}: {} is not considered in the validation",
                arg.ty, op_name, arg.name
            ))
        ),
    };

    let concrete = row.concrete(symbolic).ok_or_else(|| {
        anyhow!(diagnostics::error_message(format!(
            "operator {} mode '{}' has no concrete type for {} (argument {})",
            op_name, row.mode, symbolic, arg.name
        )))
    })?;

    export_type_name(concrete)
        .with_context(|| diagnostics::error_message(format!("operator {}", op_name)))
}

/// Emit one operator, skipping it when it has no compliance arguments or no
/// groups for `mode`.
pub fn export_operator<W: Write>(
    out: &mut W,
    op: &Operator,
    mode: PrintMode,
) -> Result<Option<OperatorSummary>> {
    let args = compliance_arguments(op)?;
    if args.is_empty() {
        return Ok(None);
    }

    let groups = aggregate(op, mode)?;
    emit_operator(out, &op.name, &args, &groups, mode)
}

/// Write a whole table (declaration header, every contributing operator,
/// footer).
pub fn write_table<W: Write>(out: &mut W, spec: &Spec, mode: PrintMode) -> Result<TableSummary> {
    out.write_all(mode.table_header().as_bytes())?;

    let mut operators = Vec::new();
    for op in spec.operators() {
        if let Some(summary) = export_operator(out, op, mode)? {
            operators.push(summary);
        }
    }

    out.write_all(mode.table_footer().as_bytes())?;

    Ok(TableSummary::new(mode, mode.file_name(), operators))
}

/// Write both tables into `outdir`.
///
/// Each table is rendered in memory and written in one go, so a failure
/// never leaves a half-written table behind.
pub fn export_tables(spec: &Spec, outdir: &Path) -> Result<ExportSummary> {
    fs::create_dir_all(outdir).with_context(|| {
        diagnostics::error_message(format!("create output directory {}", outdir.display()))
    })?;

    let mut tables = Vec::with_capacity(PrintMode::ALL.len());
    for mode in PrintMode::ALL {
        let mut buf: Vec<u8> = Vec::new();
        let summary = write_table(&mut buf, spec, mode)
            .with_context(|| diagnostics::error_message(format!("export {} table", mode)))?;

        let path = outdir.join(mode.file_name());
        fs::write(&path, &buf)
            .with_context(|| diagnostics::error_message(format!("write {}", path.display())))?;
        tables.push(summary);
    }

    Ok(ExportSummary {
        spec_version: spec.version.to_string(),
        tables,
    })
}
