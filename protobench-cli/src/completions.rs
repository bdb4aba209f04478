//! Shell completion support for --set overrides
//!
//! Config paths are extracted from the JSON Schema of [`Config`], so new
//! settings become completable without touching this module.

use schemars::schema::{InstanceType, RootSchema, Schema, SchemaObject, SingleOrVec};
use schemars::schema_for;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::Config;

/// Bash completion script that completes `--set` keys via `complete-paths`
pub fn generate_bash_completion(bin_name: &str) -> String {
    format!(
        r#"# Bash completion for {bin_name}
# Installation:
#   {bin_name} completions bash > ~/.local/share/bash-completion/completions/{bin_name}

_{bin_name}_complete_set_key() {{
    local keys
    keys=$({bin_name} complete-paths 2>/dev/null)
    COMPREPLY=( $(compgen -W "$keys" -- "${{COMP_WORDS[COMP_CWORD]}}") )
}}

_{bin_name}() {{
    local cur prev words cword
    _init_completion || return

    if [[ "$prev" == "--set" ]]; then
        if [[ "$cur" == *"="* ]]; then
            return 0
        fi
        _{bin_name}_complete_set_key
        if [[ ${{#COMPREPLY[@]}} -gt 0 ]]; then
            local i
            for i in "${{!COMPREPLY[@]}}"; do
                COMPREPLY[$i]="${{COMPREPLY[$i]}}="
            done
        fi
        compopt -o nospace
        return 0
    fi

    case "$prev" in
        -c|--config)
            _filedir toml
            return 0
            ;;
        --dir|--output)
            _filedir -d
            return 0
            ;;
        -l|--log-level)
            COMPREPLY=( $(compgen -W "trace debug info warn error" -- "$cur") )
            return 0
            ;;
        -f|--format)
            COMPREPLY=( $(compgen -W "csv json html excel" -- "$cur") )
            return 0
            ;;
    esac

    if [[ "$cur" == -* ]]; then
        COMPREPLY=( $(compgen -W "-c --config --set -l --log-level -h --help -V --version" -- "$cur") )
        return 0
    fi

    if [[ $cword -eq 1 ]]; then
        COMPREPLY=( $(compgen -W "import export export-all list show stats delete compare schema completions help" -- "$cur") )
        return 0
    fi

    if [[ "${{words[1]}}" == "completions" ]]; then
        COMPREPLY=( $(compgen -W "bash zsh fish elvish powershell" -- "$cur") )
        return 0
    fi
}}

complete -F _{bin_name} {bin_name}
"#
    )
}

/// All valid TOML paths for --set autocompletion
pub fn get_config_paths() -> Vec<String> {
    let schema = schema_for!(Config);
    let mut paths = BTreeSet::new();
    collect_root(&schema, &mut paths);
    paths.into_iter().collect()
}

fn collect_root(root: &RootSchema, paths: &mut BTreeSet<String>) {
    collect_object(&root.schema, "", paths, &root.definitions);
}

fn collect_object(
    schema: &SchemaObject,
    prefix: &str,
    paths: &mut BTreeSet<String>,
    definitions: &BTreeMap<String, Schema>,
) {
    if let Some(obj) = &schema.object {
        for (name, prop) in &obj.properties {
            let path = if prefix.is_empty() { name.clone() } else { format!("{prefix}.{name}") };
            paths.insert(path.clone());
            collect_schema(prop, &path, paths, definitions);
        }
    }

    // Nested structs are emitted as allOf wrappers around a reference
    if let Some(all_of) = schema.subschemas.as_ref().and_then(|s| s.all_of.as_ref()) {
        for sub in all_of {
            collect_schema(sub, prefix, paths, definitions);
        }
    }

    if is_array(schema) {
        if let Some(SingleOrVec::Single(item)) = schema.array.as_ref().and_then(|a| a.items.as_ref())
        {
            // Arrays complete to their first index and the append marker
            for suffix in ["0", "+"] {
                let path = format!("{prefix}.{suffix}");
                paths.insert(path.clone());
                collect_schema(item, &path, paths, definitions);
            }
        }
    }
}

fn collect_schema(
    schema: &Schema,
    prefix: &str,
    paths: &mut BTreeSet<String>,
    definitions: &BTreeMap<String, Schema>,
) {
    let Schema::Object(obj) = schema else {
        return;
    };

    match obj.reference.as_deref().and_then(|r| r.strip_prefix("#/definitions/")) {
        Some(name) => {
            if let Some(def) = definitions.get(name) {
                collect_schema(def, prefix, paths, definitions);
            }
        }
        None => collect_object(obj, prefix, paths, definitions),
    }
}

fn is_array(schema: &SchemaObject) -> bool {
    match &schema.instance_type {
        Some(SingleOrVec::Single(ty)) => **ty == InstanceType::Array,
        Some(SingleOrVec::Vec(types)) => types.contains(&InstanceType::Array),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_config_paths() {
        let paths = get_config_paths();

        for expected in [
            "storage",
            "storage.path",
            "import",
            "import.dir",
            "export",
            "export.dir",
            "export.format",
            "export.pretty",
            "export.title",
            "export.compare_formats",
            "export.compare_formats.0",
            "export.compare_formats.+",
        ] {
            assert!(paths.contains(&expected.to_string()), "missing {expected}: {paths:?}");
        }
    }

    #[test]
    fn test_bash_script_mentions_subcommands() {
        let script = generate_bash_completion("protobench");
        assert!(script.contains("complete -F _protobench protobench"));
        assert!(script.contains("export-all"));
        assert!(script.contains("protobench complete-paths"));
    }
}
