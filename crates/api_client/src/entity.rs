use core_types::{EntityInfo, Kind};
use serde_json::Value;

/// Find the entity with `target_id` anywhere in a (decoded) search response.
///
/// An object qualifies when its `id` equals the target and it carries a
/// `name` or a `kind`. The search is depth-first in document order.
pub fn find_entity_in_response(data: &Value, target_id: &str) -> Option<EntityInfo> {
    match data {
        Value::Object(obj) => {
            let id_matches = obj.get("id").and_then(Value::as_str) == Some(target_id);
            if id_matches && (obj.contains_key("name") || obj.contains_key("kind")) {
                let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

                return Some(EntityInfo {
                    id: target_id.to_string(),
                    name: text("name")
                        .filter(|name| !name.is_empty())
                        .unwrap_or_else(|| target_id.to_string()),
                    kind: obj
                        .get("kind")
                        .and_then(|kind| serde_json::from_value::<Kind>(kind.clone()).ok())
                        .unwrap_or_else(Kind::unknown),
                    created: text("created").unwrap_or_default(),
                    terminated: text("terminated"),
                });
            }

            obj.values()
                .find_map(|value| find_entity_in_response(value, target_id))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_entity_in_response(item, target_id)),
        _ => None,
    }
}
