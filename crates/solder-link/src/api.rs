//! Per-action convenience methods.
//!
//! Thin wrappers: each builds the typed params for one action and
//! forwards to the generic call facade. They are generated once here and
//! stamped onto both connection types. Anything not covered (or any
//! action with a non-default policy) is reachable through
//! [`call`]/[`call_async`]/[`call_rate_limited`] with the constants from
//! [`solder_model::action`].
//!
//! [`call`]: crate::ForwardWebSocketConnection::call
//! [`call_async`]: crate::ForwardWebSocketConnection::call_async
//! [`call_rate_limited`]: crate::ForwardWebSocketConnection::call_rate_limited

macro_rules! impl_connection_api {
    ($ty:ty) => {
        impl $ty {
            // ---------------------------------------------------------
            // Generic call facade
            // ---------------------------------------------------------

            /// Calls `action` with the default policy and returns its
            /// typed response payload.
            pub async fn call<P, R>(
                &self,
                action: &solder_model::Action<P, R>,
                params: &P,
            ) -> Result<R, crate::error::CallError>
            where
                P: serde::Serialize,
                R: serde::de::DeserializeOwned,
            {
                self.core.call(action, params).await
            }

            /// Calls `action` with the `_async` policy; the peer answers
            /// before handling.
            pub async fn call_async<P, R>(
                &self,
                action: &solder_model::Action<P, R>,
                params: &P,
            ) -> Result<(), crate::error::CallError>
            where
                P: serde::Serialize,
            {
                self.core
                    .call_deferred(action, params, crate::call::CallPolicy::Async)
                    .await
            }

            /// Calls `action` with the `_rate_limited` policy; the peer
            /// answers before handling and applies its rate limiter.
            pub async fn call_rate_limited<P, R>(
                &self,
                action: &solder_model::Action<P, R>,
                params: &P,
            ) -> Result<(), crate::error::CallError>
            where
                P: serde::Serialize,
            {
                self.core
                    .call_deferred(action, params, crate::call::CallPolicy::RateLimited)
                    .await
            }

            // ---------------------------------------------------------
            // Lifecycle and observation
            // ---------------------------------------------------------

            /// The current lifecycle state.
            pub fn state(&self) -> crate::ConnState {
                self.core.state()
            }

            /// Whether a session is currently bound.
            pub fn is_connected(&self) -> bool {
                self.state() == crate::ConnState::Connected
            }

            /// A watch receiver observing every state transition.
            pub fn state_watch(&self) -> tokio::sync::watch::Receiver<crate::ConnState> {
                self.core.subscribe_state()
            }

            /// Waits until a session is bound.
            ///
            /// Wakes on every state transition; fails once the connection
            /// reaches its terminal state.
            pub async fn await_connected(&self) -> Result<(), crate::error::ConnectionError> {
                self.core.await_connected().await
            }

            /// Number of calls currently awaiting their response.
            pub fn pending_calls(&self) -> usize {
                self.core.pending().len()
            }

            /// Registers an event handler for names matching `prefix`.
            ///
            /// A returned payload is relayed to the peer as a quick
            /// operation.
            pub fn on_event<F>(
                &self,
                prefix: impl Into<String>,
                handler: F,
            ) -> crate::bus::SubscriptionId
            where
                F: Fn(&solder_model::Event) -> Option<serde_json::Value> + Send + Sync + 'static,
            {
                self.core.bus().subscribe(prefix, handler)
            }

            /// Removes an event subscription.
            pub fn off_event(&self, id: crate::bus::SubscriptionId) -> bool {
                self.core.bus().unsubscribe(id)
            }

            // ---------------------------------------------------------
            // Messages
            // ---------------------------------------------------------

            /// Sends a private message, returning the new message id.
            pub async fn send_private_msg(
                &self,
                user_id: i64,
                message: impl Into<solder_model::Message>,
            ) -> Result<i32, crate::error::CallError> {
                let message = message.into();
                let auto_escape = message.auto_escape();
                let data = self
                    .call(
                        &solder_model::action::SEND_PRIVATE_MSG,
                        &solder_model::action::SendPrivateMsgParams {
                            user_id,
                            message,
                            auto_escape,
                        },
                    )
                    .await?;
                Ok(data.message_id)
            }

            /// Sends a private message without waiting for handling.
            pub async fn send_private_msg_async(
                &self,
                user_id: i64,
                message: impl Into<solder_model::Message>,
            ) -> Result<(), crate::error::CallError> {
                let message = message.into();
                let auto_escape = message.auto_escape();
                self.call_async(
                    &solder_model::action::SEND_PRIVATE_MSG,
                    &solder_model::action::SendPrivateMsgParams {
                        user_id,
                        message,
                        auto_escape,
                    },
                )
                .await
            }

            /// Sends a group message, returning the new message id.
            pub async fn send_group_msg(
                &self,
                group_id: i64,
                message: impl Into<solder_model::Message>,
            ) -> Result<i32, crate::error::CallError> {
                let message = message.into();
                let auto_escape = message.auto_escape();
                let data = self
                    .call(
                        &solder_model::action::SEND_GROUP_MSG,
                        &solder_model::action::SendGroupMsgParams {
                            group_id,
                            message,
                            auto_escape,
                        },
                    )
                    .await?;
                Ok(data.message_id)
            }

            /// Sends a group message without waiting for handling.
            pub async fn send_group_msg_async(
                &self,
                group_id: i64,
                message: impl Into<solder_model::Message>,
            ) -> Result<(), crate::error::CallError> {
                let message = message.into();
                let auto_escape = message.auto_escape();
                self.call_async(
                    &solder_model::action::SEND_GROUP_MSG,
                    &solder_model::action::SendGroupMsgParams {
                        group_id,
                        message,
                        auto_escape,
                    },
                )
                .await
            }

            /// Sends a group message through the peer's rate limiter.
            pub async fn send_group_msg_rate_limited(
                &self,
                group_id: i64,
                message: impl Into<solder_model::Message>,
            ) -> Result<(), crate::error::CallError> {
                let message = message.into();
                let auto_escape = message.auto_escape();
                self.call_rate_limited(
                    &solder_model::action::SEND_GROUP_MSG,
                    &solder_model::action::SendGroupMsgParams {
                        group_id,
                        message,
                        auto_escape,
                    },
                )
                .await
            }

            /// Sends a message to either a user or a group.
            pub async fn send_msg(
                &self,
                message_type: Option<&str>,
                user_id: Option<i64>,
                group_id: Option<i64>,
                message: impl Into<solder_model::Message>,
            ) -> Result<i32, crate::error::CallError> {
                let message = message.into();
                let auto_escape = message.auto_escape();
                let data = self
                    .call(
                        &solder_model::action::SEND_MSG,
                        &solder_model::action::SendMsgParams {
                            message_type: message_type.map(str::to_string),
                            user_id,
                            group_id,
                            message,
                            auto_escape,
                        },
                    )
                    .await?;
                Ok(data.message_id)
            }

            /// Recalls a message.
            pub async fn delete_msg(&self, message_id: i32) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::DELETE_MSG,
                    &solder_model::action::MessageIdParams { message_id },
                )
                .await
            }

            /// Fetches a message by id.
            pub async fn get_msg(
                &self,
                message_id: i32,
            ) -> Result<solder_model::action::GetMsgData, crate::error::CallError> {
                self.call(
                    &solder_model::action::GET_MSG,
                    &solder_model::action::MessageIdParams { message_id },
                )
                .await
            }

            /// Resolves a forward reference into its message content.
            pub async fn get_forward_msg(
                &self,
                id: impl Into<String>,
            ) -> Result<solder_model::Message, crate::error::CallError> {
                let data = self
                    .call(
                        &solder_model::action::GET_FORWARD_MSG,
                        &solder_model::action::IdParams { id: id.into() },
                    )
                    .await?;
                Ok(data.message)
            }

            /// Sends profile likes.
            pub async fn send_like(
                &self,
                user_id: i64,
                times: u8,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SEND_LIKE,
                    &solder_model::action::SendLikeParams { user_id, times },
                )
                .await
            }

            // ---------------------------------------------------------
            // Group management
            // ---------------------------------------------------------

            /// Kicks a member from a group.
            pub async fn set_group_kick(
                &self,
                group_id: i64,
                user_id: i64,
                reject_add_request: bool,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_GROUP_KICK,
                    &solder_model::action::SetGroupKickParams {
                        group_id,
                        user_id,
                        reject_add_request,
                    },
                )
                .await
            }

            /// Bans a member; a zero duration lifts the ban.
            pub async fn set_group_ban(
                &self,
                group_id: i64,
                user_id: i64,
                duration: i64,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_GROUP_BAN,
                    &solder_model::action::SetGroupBanParams {
                        group_id,
                        user_id,
                        duration,
                    },
                )
                .await
            }

            /// Bans an anonymous sender by flag.
            pub async fn set_group_anonymous_ban(
                &self,
                group_id: i64,
                flag: impl Into<String>,
                duration: i64,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_GROUP_ANONYMOUS_BAN,
                    &solder_model::action::SetGroupAnonymousBanParams {
                        group_id,
                        anonymous: None,
                        flag: Some(flag.into()),
                        duration,
                    },
                )
                .await
            }

            /// Mutes or unmutes the whole group.
            pub async fn set_group_whole_ban(
                &self,
                group_id: i64,
                enable: bool,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_GROUP_WHOLE_BAN,
                    &solder_model::action::GroupIdEnableParams { group_id, enable },
                )
                .await
            }

            /// Grants or revokes group admin.
            pub async fn set_group_admin(
                &self,
                group_id: i64,
                user_id: i64,
                enable: bool,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_GROUP_ADMIN,
                    &solder_model::action::GroupIdUserIdEnableParams {
                        group_id,
                        user_id,
                        enable,
                    },
                )
                .await
            }

            /// Enables or disables anonymous chat.
            pub async fn set_group_anonymous(
                &self,
                group_id: i64,
                enable: bool,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_GROUP_ANONYMOUS,
                    &solder_model::action::GroupIdEnableParams { group_id, enable },
                )
                .await
            }

            /// Sets a member's group card.
            pub async fn set_group_card(
                &self,
                group_id: i64,
                user_id: i64,
                card: impl Into<String>,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_GROUP_CARD,
                    &solder_model::action::SetGroupCardParams {
                        group_id,
                        user_id,
                        card: card.into(),
                    },
                )
                .await
            }

            /// Renames the group.
            pub async fn set_group_name(
                &self,
                group_id: i64,
                group_name: impl Into<String>,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_GROUP_NAME,
                    &solder_model::action::SetGroupNameParams {
                        group_id,
                        group_name: group_name.into(),
                    },
                )
                .await
            }

            /// Leaves (or, as owner, dismisses) the group.
            pub async fn set_group_leave(
                &self,
                group_id: i64,
                is_dismiss: bool,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_GROUP_LEAVE,
                    &solder_model::action::SetGroupLeaveParams {
                        group_id,
                        is_dismiss,
                    },
                )
                .await
            }

            /// Sets a member's special title.
            pub async fn set_group_special_title(
                &self,
                group_id: i64,
                user_id: i64,
                special_title: impl Into<String>,
                duration: i64,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_GROUP_SPECIAL_TITLE,
                    &solder_model::action::SetGroupSpecialTitleParams {
                        group_id,
                        user_id,
                        special_title: special_title.into(),
                        duration,
                    },
                )
                .await
            }

            // ---------------------------------------------------------
            // Requests
            // ---------------------------------------------------------

            /// Answers a friend request.
            pub async fn set_friend_add_request(
                &self,
                flag: impl Into<String>,
                approve: bool,
                remark: Option<String>,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_FRIEND_ADD_REQUEST,
                    &solder_model::action::SetFriendAddRequestParams {
                        flag: flag.into(),
                        approve,
                        remark,
                    },
                )
                .await
            }

            /// Answers a group join request or invite.
            pub async fn set_group_add_request(
                &self,
                flag: impl Into<String>,
                sub_type: impl Into<String>,
                approve: bool,
                reason: Option<String>,
            ) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_GROUP_ADD_REQUEST,
                    &solder_model::action::SetGroupAddRequestParams {
                        flag: flag.into(),
                        sub_type: sub_type.into(),
                        approve,
                        reason,
                    },
                )
                .await
            }

            // ---------------------------------------------------------
            // Information
            // ---------------------------------------------------------

            /// Fetches the logged-in account's info.
            pub async fn get_login_info(
                &self,
            ) -> Result<solder_model::action::LoginInfo, crate::error::CallError> {
                self.call(&solder_model::action::GET_LOGIN_INFO, &()).await
            }

            /// Fetches info about an arbitrary user.
            pub async fn get_stranger_info(
                &self,
                user_id: i64,
                no_cache: bool,
            ) -> Result<solder_model::action::StrangerInfo, crate::error::CallError> {
                self.call(
                    &solder_model::action::GET_STRANGER_INFO,
                    &solder_model::action::GetStrangerInfoParams { user_id, no_cache },
                )
                .await
            }

            /// Fetches the friend list.
            pub async fn get_friend_list(
                &self,
            ) -> Result<Vec<solder_model::action::FriendInfo>, crate::error::CallError> {
                self.call(&solder_model::action::GET_FRIEND_LIST, &()).await
            }

            /// Fetches one group's info.
            pub async fn get_group_info(
                &self,
                group_id: i64,
                no_cache: bool,
            ) -> Result<solder_model::action::GroupInfo, crate::error::CallError> {
                self.call(
                    &solder_model::action::GET_GROUP_INFO,
                    &solder_model::action::GetGroupInfoParams { group_id, no_cache },
                )
                .await
            }

            /// Fetches the group list.
            pub async fn get_group_list(
                &self,
            ) -> Result<Vec<solder_model::action::GroupInfo>, crate::error::CallError> {
                self.call(&solder_model::action::GET_GROUP_LIST, &()).await
            }

            /// Fetches one group member's info.
            pub async fn get_group_member_info(
                &self,
                group_id: i64,
                user_id: i64,
                no_cache: bool,
            ) -> Result<solder_model::action::GroupMemberInfo, crate::error::CallError> {
                self.call(
                    &solder_model::action::GET_GROUP_MEMBER_INFO,
                    &solder_model::action::GetGroupMemberInfoParams {
                        group_id,
                        user_id,
                        no_cache,
                    },
                )
                .await
            }

            /// Fetches the member list of a group.
            pub async fn get_group_member_list(
                &self,
                group_id: i64,
            ) -> Result<Vec<solder_model::action::GroupMemberInfo>, crate::error::CallError> {
                self.call(
                    &solder_model::action::GET_GROUP_MEMBER_LIST,
                    &solder_model::action::GroupIdParams { group_id },
                )
                .await
            }

            /// Fetches a group's honor info.
            pub async fn get_group_honor_info(
                &self,
                group_id: i64,
                kind: impl Into<String>,
            ) -> Result<serde_json::Value, crate::error::CallError> {
                self.call(
                    &solder_model::action::GET_GROUP_HONOR_INFO,
                    &solder_model::action::GetGroupHonorInfoParams {
                        group_id,
                        kind: kind.into(),
                    },
                )
                .await
            }

            // ---------------------------------------------------------
            // Credentials and files
            // ---------------------------------------------------------

            /// Fetches cookies for a domain.
            pub async fn get_cookies(
                &self,
                domain: impl Into<String>,
            ) -> Result<String, crate::error::CallError> {
                let data = self
                    .call(
                        &solder_model::action::GET_COOKIES,
                        &solder_model::action::DomainParams {
                            domain: domain.into(),
                        },
                    )
                    .await?;
                Ok(data.cookies)
            }

            /// Fetches the CSRF token.
            pub async fn get_csrf_token(&self) -> Result<i32, crate::error::CallError> {
                let data = self.call(&solder_model::action::GET_CSRF_TOKEN, &()).await?;
                Ok(data.token)
            }

            /// Fetches cookies and CSRF token together.
            pub async fn get_credentials(
                &self,
                domain: impl Into<String>,
            ) -> Result<solder_model::action::CredentialsData, crate::error::CallError> {
                self.call(
                    &solder_model::action::GET_CREDENTIALS,
                    &solder_model::action::DomainParams {
                        domain: domain.into(),
                    },
                )
                .await
            }

            /// Fetches a voice file, converted to `out_format`.
            pub async fn get_record(
                &self,
                file: impl Into<String>,
                out_format: impl Into<String>,
            ) -> Result<String, crate::error::CallError> {
                let data = self
                    .call(
                        &solder_model::action::GET_RECORD,
                        &solder_model::action::GetRecordParams {
                            file: file.into(),
                            out_format: out_format.into(),
                        },
                    )
                    .await?;
                Ok(data.file)
            }

            /// Fetches an image file.
            pub async fn get_image(
                &self,
                file: impl Into<String>,
            ) -> Result<String, crate::error::CallError> {
                let data = self
                    .call(
                        &solder_model::action::GET_IMAGE,
                        &solder_model::action::FileParams { file: file.into() },
                    )
                    .await?;
                Ok(data.file)
            }

            /// Whether the implementation can send images.
            pub async fn can_send_image(&self) -> Result<bool, crate::error::CallError> {
                let data = self.call(&solder_model::action::CAN_SEND_IMAGE, &()).await?;
                Ok(data.yes)
            }

            /// Whether the implementation can send voice records.
            pub async fn can_send_record(&self) -> Result<bool, crate::error::CallError> {
                let data = self.call(&solder_model::action::CAN_SEND_RECORD, &()).await?;
                Ok(data.yes)
            }

            // ---------------------------------------------------------
            // System
            // ---------------------------------------------------------

            /// Fetches the implementation's running status.
            pub async fn get_status(
                &self,
            ) -> Result<solder_model::action::StatusData, crate::error::CallError> {
                self.call(&solder_model::action::GET_STATUS, &()).await
            }

            /// Fetches version info.
            pub async fn get_version_info(
                &self,
            ) -> Result<solder_model::action::VersionInfo, crate::error::CallError> {
                self.call(&solder_model::action::GET_VERSION_INFO, &()).await
            }

            /// Asks the implementation to restart after `delay` ms.
            pub async fn set_restart(&self, delay: i32) -> Result<(), crate::error::CallError> {
                self.call(
                    &solder_model::action::SET_RESTART,
                    &solder_model::action::DelayParams { delay },
                )
                .await
            }

            /// Asks the implementation to clean its cache.
            pub async fn clean_cache(&self) -> Result<(), crate::error::CallError> {
                self.call(&solder_model::action::CLEAN_CACHE, &()).await
            }
        }
    };
}

pub(crate) use impl_connection_api;
