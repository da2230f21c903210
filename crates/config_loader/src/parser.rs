//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, RouterBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<RouterBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<RouterBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<RouterBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Selector, SinkType};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[sinks]]
name = "console"
sink_type = "log"

[[subscriptions]]
sink = "console"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.sinks.len(), 1);
        assert_eq!(bp.sinks[0].sink_type, SinkType::Log);
        assert_eq!(bp.subscriptions[0].shard_id, "");
        assert!(bp.subscriptions[0].filter.is_none());
    }

    #[test]
    fn test_parse_toml_filter() {
        let content = r#"
[router]
workers = 4

[[sinks]]
name = "audit"
sink_type = "file"
params = { path = "./out/audit.jsonl" }

[[subscriptions]]
sink = "audit"
shard_id = "auditors"
[subscriptions.filter]
app_id = "app-1"
selector = "log"
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.router.workers, 4);
        assert_eq!(bp.router.ingress_capacity, 1024);
        assert_eq!(bp.sinks[0].params["path"], "./out/audit.jsonl");

        let filter = bp.subscriptions[0].filter.as_ref().unwrap();
        assert_eq!(filter.app_id, "app-1");
        assert_eq!(filter.selector, Some(Selector::Log));
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "router": { "ingress_capacity": 64 },
            "sinks": [{ "name": "udp", "sink_type": "network", "params": { "addr": "127.0.0.1:9000" } }],
            "subscriptions": [{ "sink": "udp", "filter": { "selector": "metric" } }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().router.ingress_capacity, 64);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_unknown_selector() {
        let content = r#"
[[subscriptions]]
sink = "s"
filter = { selector = "trace" }
"#;
        assert!(parse_toml(content).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
