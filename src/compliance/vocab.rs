//! Closed vocabularies shared by the exporter and the verifier.
//!
//! The exporter maps specification tokens (`PRO-INT`, `i8_t`) to the
//! enumerator names the downstream validator uses (`Profile::pro_int`,
//! `i8T`). The verifier checks emitted text against the plain lists below
//! and never consults the export maps, so a bad mapping is caught.

use crate::Result;
use crate::diagnostics;

use anyhow::anyhow;

/// Prefix of every emitted operation name.
pub const OPERATION_NAMESPACE: &str = "tosa.";

/// Token prefixes that classify a profile expression token.
pub const PROFILE_MARKER: &str = "PRO-";
pub const EXTENSION_MARKER: &str = "EXT-";

const PROFILE_EXPORT_NAMES: &[(&str, &str)] = &[
    ("PRO-INT", "Profile::pro_int"),
    ("PRO-FP", "Profile::pro_fp"),
    ("EXT-INT64", "Extension::int64"),
    ("EXT-INT16", "Extension::int16"),
    ("EXT-INT4", "Extension::int4"),
    ("EXT-BF16", "Extension::bf16"),
    ("EXT-FP8E4M3", "Extension::fp8e4m3"),
    ("EXT-FP8E5M2", "Extension::fp8e5m2"),
    ("EXT-FFT", "Extension::fft"),
    ("EXT-SHAPE", "Extension::shape"),
    ("EXT-VARIABLE", "Extension::variable"),
    ("EXT-MXFP", "Extension::mxfp"),
    ("EXT-MXFP-CONV", "Extension::mxfp_conv"),
];

const TYPE_EXPORT_NAMES: &[(&str, &str)] = &[
    ("bool_t", "boolT"),
    ("i4_t", "i4T"),
    ("i8_t", "i8T"),
    ("i16_t", "i16T"),
    ("i32_t", "i32T"),
    ("i48_t", "i48T"),
    ("i64_t", "i64T"),
    ("bf16_t", "bf16T"),
    ("fp16_t", "fp16T"),
    ("fp32_t", "fp32T"),
    ("fp8e4m3_t", "fp8e4m3T"),
    ("fp8e5m2_t", "fp8e5m2T"),
    ("fp8ue8m0_t", "fp8ue8m0T"),
    ("fp6e3m2_t", "fp6e3m2T"),
    ("fp6e2m3_t", "fp6e2m3T"),
    ("fp4e2m1_t", "fp4e2m1T"),
    ("mxint8_t", "mxint8T"),
];

pub const KNOWN_OPERATIONS: &[&str] = &[
    "argmax",
    "avg_pool2d",
    "conv2d",
    "conv3d",
    "depthwise_conv2d",
    "fft2d",
    "fully_connected",
    "matmul",
    "max_pool2d",
    "rfft2d",
    "transpose_conv2d",
    "clamp",
    "erf",
    "sigmoid",
    "tanh",
    "add",
    "arithmetic_right_shift",
    "bitwise_and",
    "bitwise_or",
    "bitwise_xor",
    "intdiv",
    "logical_and",
    "logical_left_shift",
    "logical_right_shift",
    "logical_or",
    "logical_xor",
    "maximum",
    "minimum",
    "mul",
    "pow",
    "sub",
    "table",
    "abs",
    "bitwise_not",
    "ceil",
    "clz",
    "cos",
    "exp",
    "floor",
    "log",
    "logical_not",
    "negate",
    "reciprocal",
    "rsqrt",
    "select",
    "sin",
    "equal",
    "greater",
    "greater_equal",
    "reduce_all",
    "reduce_any",
    "reduce_max",
    "reduce_min",
    "reduce_product",
    "reduce_sum",
    "concat",
    "pad",
    "reshape",
    "reverse",
    "slice",
    "tile",
    "transpose",
    "gather",
    "scatter",
    "resize",
    "cast",
    "rescale",
    "const",
    "identity",
    "custom",
    "cond_if",
    "while_loop",
    "variable",
    "variable_write",
    "variable_read",
    "add_shape",
    "concat_shape",
    "const_shape",
    "dim",
    "div_shape",
    "mul_shape",
    "sub_shape",
    "cast_to_block_scaled",
    "cast_from_block_scaled",
    "matmul_t_block_scaled",
    "conv2d_block_scaled",
];

pub const KNOWN_PROFILES: &[&str] = &[
    "Profile::pro_int",
    "Profile::pro_fp",
    "Extension::int64",
    "Extension::int16",
    "Extension::int4",
    "Extension::bf16",
    "Extension::fp8e4m3",
    "Extension::fp8e5m2",
    "Extension::fft",
    "Extension::variable",
    "Extension::shape",
    "Extension::mxfp",
    "Extension::mxfp_conv",
];

pub const KNOWN_TYPES: &[&str] = &[
    "boolT",
    "i4T",
    "i8T",
    "i16T",
    "i32T",
    "i48T",
    "i64T",
    "bf16T",
    "fp16T",
    "fp32T",
    "fp8e4m3T",
    "fp8e5m2T",
    "fp8ue8m0T",
    "fp6e3m2T",
    "fp6e2m3T",
    "fp4e2m1T",
    "mxint8T",
];

/// Combinator keywords. `invalid` is recognized but marks a table the
/// downstream validator will refuse.
pub const KNOWN_CONDITIONS: &[&str] = &["anyOf", "allOf", "invalid"];

pub const INVALID_CONDITION: &str = "invalid";

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Export name for a profile or extension token.
pub fn export_profile_name(token: &str) -> Result<&'static str> {
    lookup(PROFILE_EXPORT_NAMES, token).ok_or_else(|| {
        anyhow!(diagnostics::error_message(format!("invalid profile name {}", token)))
    })
}

/// Export name for a concrete element type.
pub fn export_type_name(ty: &str) -> Result<&'static str> {
    lookup(TYPE_EXPORT_NAMES, ty).ok_or_else(|| {
        anyhow!(diagnostics::error_message(format!("invalid element type name {}", ty)))
    })
}

pub fn export_operation_name(op_name: &str) -> String {
    format!("{}{}", OPERATION_NAMESPACE, op_name.to_lowercase())
}
