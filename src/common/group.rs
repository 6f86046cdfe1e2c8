//! Group records and payload validation

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field every payload must carry
pub const GROUP_ID_FIELD: &str = "groupId";

/// A group as stored by one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub group_id: String,
    pub node_id: String,
}

/// Response body of `GET /v1/groups`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupList {
    pub node_id: String,
    pub groups: Vec<Group>,
}

/// Check a create/delete body and return its group id.
pub fn validate_payload(data: &Value) -> Result<&str> {
    let field = data
        .as_object()
        .filter(|obj| !obj.is_empty())
        .and_then(|obj| obj.get(GROUP_ID_FIELD))
        .ok_or_else(|| Error::InvalidPayload("Bad request. Missing 'groupId'.".into()))?;

    field
        .as_str()
        .ok_or_else(|| Error::InvalidPayload("'groupId' must be a string.".into()))
}

/// Best-effort group id for log lines; never fails.
pub fn group_id_of(data: &Value) -> &str {
    data.get(GROUP_ID_FIELD)
        .and_then(Value::as_str)
        .unwrap_or("<none>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_payload() {
        let data = json!({"groupId": "1"});
        assert_eq!(validate_payload(&data).unwrap(), "1");
    }

    #[test]
    fn test_missing_group_id() {
        for data in [json!({"GROUP_ID": "1"}), json!({}), json!(null), json!("1")] {
            let err = validate_payload(&data).unwrap_err();
            assert_eq!(err.to_string(), "Bad request. Missing 'groupId'.");
        }
    }

    #[test]
    fn test_non_string_group_id() {
        let err = validate_payload(&json!({"groupId": 1})).unwrap_err();
        assert_eq!(err.to_string(), "'groupId' must be a string.");
    }

    #[test]
    fn test_wire_format() {
        let group = Group {
            group_id: "7".into(),
            node_id: "node-2".into(),
        };
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({"groupId": "7", "nodeId": "node-2"})
        );
    }

    #[test]
    fn test_group_id_of() {
        assert_eq!(group_id_of(&json!({"groupId": "9"})), "9");
        assert_eq!(group_id_of(&json!({"other": 1})), "<none>");
    }
}
