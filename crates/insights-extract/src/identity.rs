//! Sheet identifier assignment
//!
//! Display names are not unique and not filesystem-safe; identifiers are
//! both. The registry does its collision check and insertion under one
//! lock, so concurrent extraction workers can never race two sheets into
//! the same identifier.

use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::debug;

/// Run-scoped registry of assigned identifiers.
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    assigned: Mutex<HashSet<String>>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive and claim a unique identifier for a sheet.
    ///
    /// The display name is normalized to `[A-Za-z0-9_-]`; a name that
    /// normalizes to nothing falls back to a positional one. On collision
    /// the smallest free `_N` suffix is appended. Check and insert happen
    /// atomically under the registry lock.
    pub fn assign(&self, display_name: &str, position: usize) -> String {
        let base = sanitize(display_name);
        let base = if base.is_empty() {
            format!("Sheet_{}", position + 1)
        } else {
            base
        };

        let mut assigned = self.assigned.lock();
        if assigned.insert(base.clone()) {
            return base;
        }

        let mut n = 1usize;
        loop {
            let candidate = format!("{base}_{n}");
            if assigned.insert(candidate.clone()) {
                debug!(
                    display_name = %display_name,
                    identifier = %candidate,
                    "Identifier collision resolved with suffix"
                );
                return candidate;
            }
            n += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.assigned.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.lock().is_empty()
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with an underscore,
/// collapse runs of underscores, and trim them from both ends.
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_underscore = false;

    for c in name.trim().chars() {
        let mapped = if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if mapped == '_' {
            if !last_was_underscore {
                out.push('_');
            }
            last_was_underscore = true;
        } else {
            out.push(mapped);
            last_was_underscore = false;
        }
    }

    out.trim_matches('_').to_string()
}
