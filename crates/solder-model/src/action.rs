//! Typed action registry and call envelopes.
//!
//! An [`Action`] names a remote operation together with its request and
//! response types, so the generic call facade can serialize parameters
//! and deserialize results without per-action code. The constants below
//! cover the OneBot 11 public API plus the hidden quick-operation relay.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::Sender;
use crate::message::Message;

/// A named remote operation with fixed request and response shapes.
///
/// `P` is the parameter type sent in the request envelope, `R` the type
/// the `data` payload deserializes into. Actions with no payload use
/// `R = ()`.
pub struct Action<P, R> {
    name: &'static str,
    _types: PhantomData<fn(P) -> R>,
}

impl<P, R> Action<P, R> {
    /// Declares an action by wire name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _types: PhantomData,
        }
    }

    /// The wire action name, without any call-policy suffix.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

// Request envelope: {"action": ..., "params": ..., "echo": ...}.
#[derive(Debug, Serialize)]
pub struct ApiRequest<P> {
    pub action: String,
    pub params: P,
    pub echo: String,
}

/// Response envelope: `{"status", "retcode", "data", "message", "echo"}`.
///
/// All fields except `status` default when absent, since implementations
/// differ in how much of the envelope they fill in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    #[serde(default)]
    pub retcode: i64,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub echo: Option<Value>,
}

// ---------------------------------------------------------------------
// Parameter types
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SendPrivateMsgParams {
    pub user_id: i64,
    pub message: Message,
    pub auto_escape: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendGroupMsgParams {
    pub group_id: i64,
    pub message: Message,
    pub auto_escape: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMsgParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    pub message: Message,
    pub auto_escape: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageIdParams {
    pub message_id: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendLikeParams {
    pub user_id: i64,
    pub times: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetGroupKickParams {
    pub group_id: i64,
    pub user_id: i64,
    pub reject_add_request: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetGroupBanParams {
    pub group_id: i64,
    pub user_id: i64,
    /// Ban duration in seconds; 0 lifts the ban.
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetGroupAnonymousBanParams {
    pub group_id: i64,
    /// Anonymous sender object from the triggering event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<Value>,
    /// Anonymous flag, alternative to `anonymous`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupIdEnableParams {
    pub group_id: i64,
    pub enable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupIdUserIdEnableParams {
    pub group_id: i64,
    pub user_id: i64,
    pub enable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetGroupCardParams {
    pub group_id: i64,
    pub user_id: i64,
    pub card: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetGroupNameParams {
    pub group_id: i64,
    pub group_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetGroupLeaveParams {
    pub group_id: i64,
    pub is_dismiss: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetGroupSpecialTitleParams {
    pub group_id: i64,
    pub user_id: i64,
    pub special_title: String,
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetFriendAddRequestParams {
    pub flag: String,
    pub approve: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetGroupAddRequestParams {
    pub flag: String,
    pub sub_type: String,
    pub approve: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetStrangerInfoParams {
    pub user_id: i64,
    pub no_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetGroupInfoParams {
    pub group_id: i64,
    pub no_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupIdParams {
    pub group_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetGroupMemberInfoParams {
    pub group_id: i64,
    pub user_id: i64,
    pub no_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetGroupHonorInfoParams {
    pub group_id: i64,
    /// `"talkative"`, `"performer"`, `"legend"`, `"strong_newbie"`,
    /// `"emotion"` or `"all"`.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainParams {
    pub domain: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetRecordParams {
    pub file: String,
    pub out_format: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileParams {
    pub file: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DelayParams {
    pub delay: i32,
}

/// Parameters of the hidden quick-operation relay.
#[derive(Debug, Clone, Serialize)]
pub struct QuickOperationParams {
    /// The event the operation responds to, verbatim.
    pub context: Value,
    /// The operation payload produced by the event handler.
    pub operation: Value,
}

// ---------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MessageIdData {
    pub message_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetMsgData {
    pub time: i64,
    pub message_type: String,
    pub message_id: i32,
    #[serde(default)]
    pub real_id: Option<i32>,
    #[serde(default)]
    pub sender: Sender,
    pub message: Message,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForwardMsgData {
    pub message: Message,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInfo {
    pub user_id: i64,
    pub nickname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrangerInfo {
    pub user_id: i64,
    pub nickname: String,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FriendInfo {
    pub user_id: i64,
    pub nickname: String,
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupInfo {
    pub group_id: i64,
    pub group_name: String,
    #[serde(default)]
    pub member_count: Option<i32>,
    #[serde(default)]
    pub max_member_count: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupMemberInfo {
    pub group_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub card: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub join_time: Option<i64>,
    #[serde(default)]
    pub last_sent_time: Option<i64>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CookiesData {
    pub cookies: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsrfTokenData {
    pub token: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsData {
    pub cookies: String,
    pub csrf_token: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileData {
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YesOrNoData {
    pub yes: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusData {
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub good: Option<bool>,
    #[serde(flatten)]
    pub extra: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    pub app_name: String,
    pub app_version: String,
    pub protocol_version: String,
    #[serde(flatten)]
    pub extra: Value,
}

// ---------------------------------------------------------------------
// The registry
// ---------------------------------------------------------------------

pub const SEND_PRIVATE_MSG: Action<SendPrivateMsgParams, MessageIdData> =
    Action::new("send_private_msg");
pub const SEND_GROUP_MSG: Action<SendGroupMsgParams, MessageIdData> =
    Action::new("send_group_msg");
pub const SEND_MSG: Action<SendMsgParams, MessageIdData> = Action::new("send_msg");
pub const DELETE_MSG: Action<MessageIdParams, ()> = Action::new("delete_msg");
pub const GET_MSG: Action<MessageIdParams, GetMsgData> = Action::new("get_msg");
pub const GET_FORWARD_MSG: Action<IdParams, ForwardMsgData> = Action::new("get_forward_msg");
pub const SEND_LIKE: Action<SendLikeParams, ()> = Action::new("send_like");

pub const SET_GROUP_KICK: Action<SetGroupKickParams, ()> = Action::new("set_group_kick");
pub const SET_GROUP_BAN: Action<SetGroupBanParams, ()> = Action::new("set_group_ban");
pub const SET_GROUP_ANONYMOUS_BAN: Action<SetGroupAnonymousBanParams, ()> =
    Action::new("set_group_anonymous_ban");
pub const SET_GROUP_WHOLE_BAN: Action<GroupIdEnableParams, ()> =
    Action::new("set_group_whole_ban");
pub const SET_GROUP_ADMIN: Action<GroupIdUserIdEnableParams, ()> = Action::new("set_group_admin");
pub const SET_GROUP_ANONYMOUS: Action<GroupIdEnableParams, ()> =
    Action::new("set_group_anonymous");
pub const SET_GROUP_CARD: Action<SetGroupCardParams, ()> = Action::new("set_group_card");
pub const SET_GROUP_NAME: Action<SetGroupNameParams, ()> = Action::new("set_group_name");
pub const SET_GROUP_LEAVE: Action<SetGroupLeaveParams, ()> = Action::new("set_group_leave");
pub const SET_GROUP_SPECIAL_TITLE: Action<SetGroupSpecialTitleParams, ()> =
    Action::new("set_group_special_title");

pub const SET_FRIEND_ADD_REQUEST: Action<SetFriendAddRequestParams, ()> =
    Action::new("set_friend_add_request");
pub const SET_GROUP_ADD_REQUEST: Action<SetGroupAddRequestParams, ()> =
    Action::new("set_group_add_request");

pub const GET_LOGIN_INFO: Action<(), LoginInfo> = Action::new("get_login_info");
pub const GET_STRANGER_INFO: Action<GetStrangerInfoParams, StrangerInfo> =
    Action::new("get_stranger_info");
pub const GET_FRIEND_LIST: Action<(), Vec<FriendInfo>> = Action::new("get_friend_list");
pub const GET_GROUP_INFO: Action<GetGroupInfoParams, GroupInfo> = Action::new("get_group_info");
pub const GET_GROUP_LIST: Action<(), Vec<GroupInfo>> = Action::new("get_group_list");
pub const GET_GROUP_MEMBER_INFO: Action<GetGroupMemberInfoParams, GroupMemberInfo> =
    Action::new("get_group_member_info");
pub const GET_GROUP_MEMBER_LIST: Action<GroupIdParams, Vec<GroupMemberInfo>> =
    Action::new("get_group_member_list");
pub const GET_GROUP_HONOR_INFO: Action<GetGroupHonorInfoParams, Value> =
    Action::new("get_group_honor_info");

pub const GET_COOKIES: Action<DomainParams, CookiesData> = Action::new("get_cookies");
pub const GET_CSRF_TOKEN: Action<(), CsrfTokenData> = Action::new("get_csrf_token");
pub const GET_CREDENTIALS: Action<DomainParams, CredentialsData> = Action::new("get_credentials");

pub const GET_RECORD: Action<GetRecordParams, FileData> = Action::new("get_record");
pub const GET_IMAGE: Action<FileParams, FileData> = Action::new("get_image");
pub const CAN_SEND_IMAGE: Action<(), YesOrNoData> = Action::new("can_send_image");
pub const CAN_SEND_RECORD: Action<(), YesOrNoData> = Action::new("can_send_record");

pub const GET_STATUS: Action<(), StatusData> = Action::new("get_status");
pub const GET_VERSION_INFO: Action<(), VersionInfo> = Action::new("get_version_info");
pub const SET_RESTART: Action<DelayParams, ()> = Action::new("set_restart");
pub const CLEAN_CACHE: Action<(), ()> = Action::new("clean_cache");

/// Hidden action relaying a quick operation back to the implementation.
pub const HANDLE_QUICK_OPERATION: Action<QuickOperationParams, ()> =
    Action::new("handle_quick_operation");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope_shape() {
        let request = ApiRequest {
            action: "send_private_msg".to_string(),
            params: SendPrivateMsgParams {
                user_id: 123,
                message: Message::raw("hi"),
                auto_escape: false,
            },
            echo: "e-1".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "action": "send_private_msg",
                "params": {"user_id": 123, "message": "hi", "auto_escape": false},
                "echo": "e-1",
            })
        );
    }

    #[test]
    fn response_envelope_defaults() {
        let response: ApiResponse =
            serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert_eq!(response.retcode, 0);
        assert!(response.data.is_none());
        assert!(response.message.is_none());
        assert!(response.echo.is_none());
    }

    #[test]
    fn optional_params_are_omitted() {
        let params = SendMsgParams {
            message_type: None,
            user_id: Some(123),
            group_id: None,
            message: Message::text("hi"),
            auto_escape: false,
        };
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("message_type").is_none());
        assert!(json.get("group_id").is_none());
        assert_eq!(json["user_id"], 123);
    }

    #[test]
    fn action_names() {
        assert_eq!(SEND_GROUP_MSG.name(), "send_group_msg");
        assert_eq!(HANDLE_QUICK_OPERATION.name(), "handle_quick_operation");
    }
}
