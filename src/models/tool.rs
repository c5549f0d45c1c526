//! Repair tool variants.
//!
//! Tool names come from configuration as plain strings; `Tool::classify`
//! turns each into one of three invocation shapes:
//! - `Precomputed`: `styler` and its protocol variants `styler_<protocol>`,
//!   copied from an external repairs store.
//! - `IdePlaceholder`: `intellij`, whose results are produced out of band.
//! - `Adapter`: anything else, run as an external process.

use serde::Serialize;
use std::collections::HashMap;

pub const PRECOMPUTED_TOOL: &str = "styler";
pub const IDE_TOOL: &str = "intellij";

/// Placeholders substituted into adapter argv templates.
pub const ORIG_PLACEHOLDER: &str = "{orig}";
pub const ERRORED_PLACEHOLDER: &str = "{errored}";
pub const OUTPUT_PLACEHOLDER: &str = "{output}";
pub const METADATA_PLACEHOLDER: &str = "{metadata}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tool {
    Adapter { name: String, command: Vec<String> },
    Precomputed { name: String, protocol: Option<String> },
    IdePlaceholder { name: String },
}

impl Tool {
    /// Resolve a configured tool name. `adapters` maps tool names to argv
    /// templates; unknown adapters run `<name> {orig} {errored} {output} {metadata}`.
    pub fn classify(name: &str, adapters: &HashMap<String, Vec<String>>) -> Tool {
        if name == PRECOMPUTED_TOOL {
            return Tool::Precomputed {
                name: name.to_string(),
                protocol: None,
            };
        }
        if let Some(protocol) = name
            .strip_prefix(PRECOMPUTED_TOOL)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return Tool::Precomputed {
                name: name.to_string(),
                protocol: Some(protocol.to_string()),
            };
        }
        if name == IDE_TOOL {
            return Tool::IdePlaceholder {
                name: name.to_string(),
            };
        }
        let command = adapters
            .get(name)
            .filter(|c| !c.is_empty())
            .cloned()
            .unwrap_or_else(|| {
                vec![
                    name.to_string(),
                    ORIG_PLACEHOLDER.to_string(),
                    ERRORED_PLACEHOLDER.to_string(),
                    OUTPUT_PLACEHOLDER.to_string(),
                    METADATA_PLACEHOLDER.to_string(),
                ]
            });
        Tool::Adapter {
            name: name.to_string(),
            command,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Tool::Adapter { name, .. } => name,
            Tool::Precomputed { name, .. } => name,
            Tool::IdePlaceholder { name } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_variants() {
        let adapters = HashMap::new();
        assert_eq!(
            Tool::classify("styler", &adapters),
            Tool::Precomputed {
                name: "styler".into(),
                protocol: None
            }
        );
        assert_eq!(
            Tool::classify("styler_three_grams", &adapters),
            Tool::Precomputed {
                name: "styler_three_grams".into(),
                protocol: Some("three_grams".into())
            }
        );
        assert_eq!(
            Tool::classify("intellij", &adapters),
            Tool::IdePlaceholder {
                name: "intellij".into()
            }
        );
        match Tool::classify("codebuff", &adapters) {
            Tool::Adapter { name, command } => {
                assert_eq!(name, "codebuff");
                assert_eq!(command[0], "codebuff");
                assert_eq!(command.len(), 5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_uses_configured_command() {
        let mut adapters = HashMap::new();
        adapters.insert(
            "naturalize".to_string(),
            vec!["python3".to_string(), "nat.py".to_string(), "{output}".to_string()],
        );
        match Tool::classify("naturalize", &adapters) {
            Tool::Adapter { command, .. } => assert_eq!(command[1], "nat.py"),
            other => panic!("unexpected {:?}", other),
        }
        // A name merely starting with the precomputed prefix is not a protocol variant.
        assert!(matches!(
            Tool::classify("stylerx", &adapters),
            Tool::Adapter { .. }
        ));
    }
}
