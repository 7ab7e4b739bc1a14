//! Field-by-field merging of configuration tiers.

use serde_json::Value;

/// Lay a higher-priority `tier` over `merged` in place.
///
/// Sections (objects) merge key by key. Any other value replaces what is
/// there, except `null`, which leaves the lower tier untouched.
///
/// ```
/// use serde_json::json;
/// use project_dashboard::config::overlay_tier;
///
/// let mut merged = json!({"dashboard": {"refresh_interval_ms": 5000, "headless": false}});
/// overlay_tier(&mut merged, json!({"dashboard": {"refresh_interval_ms": 1000}}));
/// assert_eq!(merged["dashboard"]["refresh_interval_ms"], 1000);
/// assert_eq!(merged["dashboard"]["headless"], false);
/// ```
pub fn overlay_tier(merged: &mut Value, tier: Value) {
    match (merged, tier) {
        (_, Value::Null) => {}
        (Value::Object(section), Value::Object(fields)) => {
            for (key, value) in fields {
                overlay_tier(section.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}
