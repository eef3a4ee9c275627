//! Log formatting helpers.

use serde::Serialize;
use std::fmt::Debug;

/// Wrapper for printing data trees and patches in logs as YAML
///
/// ```ignore
/// use formbind::logging::Pretty;
/// use tracing::trace;
///
/// trace!("patch: {}", Pretty(&patch));
/// ```
///
/// Output starts with a newline. Debug formatting is the fallback when YAML
/// serialization fails.
pub struct Pretty<T>(pub T);

impl<T: Serialize + Debug> std::fmt::Display for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_yaml_ng::to_string(&self.0) {
            Ok(yaml) => write!(f, "\n{}", yaml),
            Err(_) => write!(f, "\n{:#?}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pretty_yaml() {
        let out = Pretty(&json!({"personalData": {"age": 34}})).to_string();
        assert!(out.starts_with('\n'));
        assert!(out.contains("personalData:"));
        assert!(out.contains("age: 34"));
    }
}
