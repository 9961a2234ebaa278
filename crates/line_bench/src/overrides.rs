use anyhow::{bail, Result};
use line_world::LineContent;
use std::collections::HashMap;

const VALID_KEYS: &[&str] = &[
    "time_stretch",
    "restock_time_stretch",
    "completion_tick_secs",
    "restock_period_secs",
    "low_stock_threshold",
    "tray_capacity",
    "base_completion_duration",
    "completion_jitter",
    "serial_prefix",
    "workers.<key>.efficiency",
    "workers.<key>.defect_rate",
    "items.<key>.default_stock_level",
];

/// Apply scenario overrides to loaded content. Constant keys are plain field
/// names; seed attributes are addressed as `workers.<key>.<field>` or
/// `items.<key>.<field>`. Validation is left to the line builder.
pub fn apply_overrides(
    content: &mut LineContent,
    overrides: &HashMap<String, serde_json::Value>,
) -> Result<()> {
    for (key, value) in overrides {
        let constants = &mut content.constants;
        match key.as_str() {
            "time_stretch" => constants.time_stretch = as_f64(key, value)?,
            "restock_time_stretch" => constants.restock_time_stretch = as_f64(key, value)?,
            "completion_tick_secs" => constants.completion_tick_secs = as_f64(key, value)?,
            "restock_period_secs" => constants.restock_period_secs = as_f64(key, value)?,
            "low_stock_threshold" => constants.low_stock_threshold = as_u32(key, value)?,
            "tray_capacity" => constants.tray_capacity = as_u32(key, value)?,
            "base_completion_duration" => {
                constants.base_completion_duration = as_f64(key, value)?;
            }
            "completion_jitter" => constants.completion_jitter = as_f64(key, value)?,
            "serial_prefix" => constants.serial_prefix = as_str(key, value)?,
            _ => apply_seed_override(content, key, value)?,
        }
    }
    Ok(())
}

fn apply_seed_override(
    content: &mut LineContent,
    key: &str,
    value: &serde_json::Value,
) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        ["workers", worker_key, field] => {
            let Some(worker) = content.seed.workers.iter_mut().find(|w| w.key == *worker_key)
            else {
                bail!("override '{key}': no worker '{worker_key}' in content");
            };
            match *field {
                "efficiency" => worker.efficiency = as_f64(key, value)?,
                "defect_rate" => worker.defect_rate = as_f64(key, value)?,
                _ => bail!(unknown_key(key)),
            }
        }
        ["items", item_key, "default_stock_level"] => {
            let Some(item) = content.seed.items.iter_mut().find(|i| i.key == *item_key) else {
                bail!("override '{key}': no item '{item_key}' in content");
            };
            item.default_stock_level = as_i64(key, value)?;
        }
        _ => bail!(unknown_key(key)),
    }
    Ok(())
}

fn unknown_key(key: &str) -> String {
    format!(
        "unknown override key '{key}'. Valid keys: {}",
        VALID_KEYS.join(", ")
    )
}

fn as_f64(key: &str, value: &serde_json::Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| anyhow::anyhow!("override '{key}': expected a number, got {value}"))
}

fn as_i64(key: &str, value: &serde_json::Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| anyhow::anyhow!("override '{key}': expected an integer, got {value}"))
}

fn as_u32(key: &str, value: &serde_json::Value) -> Result<u32> {
    let val = value.as_u64().ok_or_else(|| {
        anyhow::anyhow!("override '{key}': expected a non-negative integer, got {value}")
    })?;
    u32::try_from(val)
        .map_err(|_| anyhow::anyhow!("override '{key}': value {val} exceeds u32 range"))
}

fn as_str(key: &str, value: &serde_json::Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("override '{key}': expected a string, got {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use line_core::test_fixtures::{base_constants, base_seed};

    fn content() -> LineContent {
        LineContent {
            content_version: "test".to_string(),
            constants: base_constants(),
            seed: base_seed(),
        }
    }

    fn one(key: &str, value: serde_json::Value) -> HashMap<String, serde_json::Value> {
        HashMap::from([(key.to_string(), value)])
    }

    #[test]
    fn test_apply_constant_overrides() {
        let mut content = content();
        apply_overrides(&mut content, &one("tray_capacity", serde_json::json!(30))).unwrap();
        apply_overrides(&mut content, &one("time_stretch", serde_json::json!(120.0))).unwrap();
        apply_overrides(&mut content, &one("serial_prefix", serde_json::json!("QA"))).unwrap();
        assert_eq!(content.constants.tray_capacity, 30);
        assert!((content.constants.time_stretch - 120.0).abs() < 1e-12);
        assert_eq!(content.constants.serial_prefix, "QA");
    }

    #[test]
    fn test_integer_accepted_for_float_field() {
        let mut content = content();
        apply_overrides(&mut content, &one("restock_period_secs", serde_json::json!(600))).unwrap();
        assert!((content.constants.restock_period_secs - 600.0).abs() < 1e-12);
    }

    #[test]
    fn test_apply_worker_and_item_overrides() {
        let mut content = content();
        apply_overrides(
            &mut content,
            &one("workers.baseline.defect_rate", serde_json::json!(12.5)),
        )
        .unwrap();
        apply_overrides(
            &mut content,
            &one("items.glass.default_stock_level", serde_json::json!(8)),
        )
        .unwrap();
        assert!((content.seed.workers[0].defect_rate - 12.5).abs() < 1e-12);
        assert_eq!(content.seed.items[0].default_stock_level, 8);
    }

    #[test]
    fn test_unknown_key_errors() {
        let mut content = content();
        let err = apply_overrides(&mut content, &one("nonexistent_field", serde_json::json!(1.0)))
            .unwrap_err()
            .to_string();
        assert!(err.contains("unknown override key"));
        assert!(err.contains("nonexistent_field"));
    }

    #[test]
    fn test_unknown_worker_errors() {
        let mut content = content();
        let err = apply_overrides(
            &mut content,
            &one("workers.ghost.efficiency", serde_json::json!(1.0)),
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("ghost"));
    }

    #[test]
    fn test_type_mismatch_errors() {
        let mut content = content();
        let result = apply_overrides(
            &mut content,
            &one("tray_capacity", serde_json::json!("not_a_number")),
        );
        assert!(result.is_err());
        let result = apply_overrides(&mut content, &one("tray_capacity", serde_json::json!(-1)));
        assert!(result.is_err());
    }
}
