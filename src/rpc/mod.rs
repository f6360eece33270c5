// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Protocol-boundary validation. Wire parsing itself lives in the RPC host;
//! what belongs here is the line between a malformed argument (rejected
//! before it reaches the ledger) and a well-formed one that simply names a
//! checkpoint that does not exist (a boolean `false` from `revert`, by
//! design).

use serde_json::Value;
use thiserror::Error;

/// Rejections raised at the boundary. Neither variant ever reaches the
/// snapshot manager.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum BoundaryError {
    /// The argument's shape cannot be interpreted as an integer id.
    #[error("invalid snapshot id: {0}")]
    Encoding(String),
    /// The argument is required but missing or null.
    #[error("missing required argument: {0}")]
    Usage(&'static str),
}

/// Validates a snapshot id argument. Any value that can be losslessly
/// interpreted as an integer is routed through, including a negative one
/// (which `revert` will refuse with `false`); everything else is an encoding
/// failure. Integral floats are accepted because deployed clients send them;
/// that acceptance is inferred from observed traffic, not a documented rule.
pub fn parse_snapshot_id(raw: Option<&Value>) -> Result<i64, BoundaryError> {
    let value = match raw {
        None | Some(Value::Null) => return Err(BoundaryError::Usage("snapshot id")),
        Some(value) => value,
    };
    let Value::Number(n) = value else {
        return Err(BoundaryError::Encoding(value.to_string()));
    };
    if let Some(id) = n.as_i64() {
        return Ok(id);
    }
    if n.as_u64().is_some() {
        // Beyond i64 but still a valid non-negative integer; no such id was
        // ever issued, so revert will refuse it.
        return Ok(i64::MAX);
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(&f) => {
            Ok(f as i64)
        }
        _ => Err(BoundaryError::Encoding(n.to_string())),
    }
}
