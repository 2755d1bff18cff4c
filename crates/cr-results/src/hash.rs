//! Content-based fingerprints for runs.

use cr_script::CompiledScript;
use sha2::{Digest, Sha256};

/// Fingerprint of everything the engine reads for a run: the script and, when
/// the radiation field comes from a user table, that table's normalized text.
pub fn compute_script_fingerprint(script: &CompiledScript, user_table: Option<&str>) -> String {
    let mut hasher = Sha256::new();

    hasher.update(script.render().as_bytes());

    if let Some(table) = user_table {
        hasher.update(b"\0");
        hasher.update(table.as_bytes());
    }

    let result = hasher.finalize();
    format!("{:x}", result)
}
