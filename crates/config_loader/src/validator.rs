//! 配置校验模块
//!
//! 校验规则：
//! - sink 名称非空且唯一
//! - sink 队列容量 > 0
//! - 订阅引用的 sink 必须存在
//! - ingress_capacity > 0，workers > 0
//!
//! 另有不阻止加载的警告 (见 [`warnings`])。

use std::collections::HashSet;

use contracts::{ContractError, RouterBlueprint};

/// 校验 RouterBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    validate_router_settings(blueprint)?;
    validate_sinks(blueprint)?;
    validate_subscriptions(blueprint)?;
    Ok(())
}

/// 收集不影响加载的配置警告
pub fn warnings(blueprint: &RouterBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("no sinks configured; every envelope will be unmatched".to_string());
    }

    let referenced: HashSet<&str> = blueprint
        .subscriptions
        .iter()
        .map(|s| s.sink.as_str())
        .collect();
    for sink in &blueprint.sinks {
        if !referenced.contains(sink.name.as_str()) {
            warnings.push(format!("sink '{}' has no subscriptions", sink.name));
        }
    }

    warnings
}

/// 校验入口与 worker 配置
fn validate_router_settings(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    let router = &blueprint.router;

    if router.ingress_capacity == 0 {
        return Err(ContractError::config_validation(
            "router.ingress_capacity",
            "ingress_capacity must be > 0",
        ));
    }

    if router.workers == 0 {
        return Err(ContractError::config_validation(
            "router.workers",
            "workers must be > 0",
        ));
    }

    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}

/// 校验订阅引用
fn validate_subscriptions(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    let sink_names: HashSet<&str> = blueprint.sinks.iter().map(|s| s.name.as_str()).collect();

    for (idx, subscription) in blueprint.subscriptions.iter().enumerate() {
        if !sink_names.contains(subscription.sink.as_str()) {
            return Err(ContractError::config_validation(
                format!("subscriptions[{}].sink", idx),
                format!("unknown sink '{}'", subscription.sink),
            ));
        }
    }
    Ok(())
}
