use serde::{Deserialize, Serialize};

use crate::ItemInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    // Item queries
    ListItems,
    Search { query: String },

    // Reordering
    MoveItem { name: String, index: usize },
    SwapItem { source: String, target: String },

    // Visibility
    HideItem { name: String },
    ShowItem { name: String },
    ToggleItem { name: String },

    // Maintenance
    Refresh,
    Permission,
    RequestPermission,

    // Control
    Quit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Error { message: String },
    Items { items: Vec<ItemInfo> },
    Permission { info: PermissionInfo },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PermissionInfo {
    pub granted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_move_item_serialization() {
        let cmd = Command::MoveItem {
            name: "Slack".to_string(),
            index: 2,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"type\":\"move_item\""));
        assert!(json.contains("\"index\":2"));

        let deserialized: Command = serde_json::from_str(&json).unwrap();
        match deserialized {
            Command::MoveItem { name, index } => {
                assert_eq!(name, "Slack");
                assert_eq!(index, 2);
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_command_swap_item_serialization() {
        let cmd = Command::SwapItem {
            source: "Slack".to_string(),
            target: "Clock".to_string(),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"type\":\"swap_item\""));

        let deserialized: Command = serde_json::from_str(&json).unwrap();
        match deserialized {
            Command::SwapItem { source, target } => {
                assert_eq!(source, "Slack");
                assert_eq!(target, "Clock");
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_command_list_items_serialization() {
        let json = serde_json::to_string(&Command::ListItems).unwrap();
        assert_eq!(json, "{\"type\":\"list_items\"}");
    }

    #[test]
    fn test_response_error_serialization() {
        let resp = Response::Error {
            message: "no such item".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"type\":\"error\""));

        let deserialized: Response = serde_json::from_str(&json).unwrap();
        match deserialized {
            Response::Error { message } => assert_eq!(message, "no such item"),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_response_permission_serialization() {
        let resp = Response::Permission {
            info: PermissionInfo { granted: true },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"granted\":true"));
    }
}
