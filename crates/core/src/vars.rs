// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{name}` placeholder substitution for job commands.
//!
//! The variable table is fetched alongside job definitions and applied
//! to every command string before fingerprinting, so a variable edit
//! re-fingerprints every job that references it.

use std::collections::HashMap;

/// Replace every `{name}` placeholder with its value from the table.
/// Unknown placeholders are left as-is.
pub fn substitute(command: &str, vars: &HashMap<String, String>) -> String {
    let mut out = command.to_string();
    for (name, value) in vars {
        let needle = format!("{{{name}}}");
        if out.contains(&needle) {
            out = out.replace(&needle, value);
        }
    }
    out
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
