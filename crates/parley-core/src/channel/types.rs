//! Gateway event types

use serde_json::Value;

/// The person behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    /// Stable Discord user id; scopes conversation memory.
    pub id: String,
    /// Account name, shown as `@username`.
    pub username: String,
    /// Display name (global name when set, else the username).
    pub display_name: String,
}

impl Requester {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            display_name: display_name.into(),
        }
    }

    /// Markup that pings this user when it appears in a message.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    fn from_user(user: &Value) -> Option<Self> {
        let id = user["id"].as_str()?;
        let username = user["username"].as_str().unwrap_or(id);
        let display_name = user["global_name"].as_str().unwrap_or(username);
        Some(Self::new(id, username, display_name))
    }
}

/// A `MESSAGE_CREATE` from a guild channel or DM.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author: Requester,
    pub author_is_bot: bool,
    pub content: String,
}

impl InboundMessage {
    /// Parse the `d` payload of a `MESSAGE_CREATE` dispatch.
    pub fn from_gateway(data: &Value) -> Option<Self> {
        let id = data["id"].as_str()?;
        let channel_id = data["channel_id"].as_str()?;
        let mut author = Requester::from_user(&data["author"])?;

        // Guild messages carry the server nickname on the member object.
        if let Some(nick) = data["member"]["nick"].as_str() {
            author.display_name = nick.to_string();
        }

        Some(Self {
            id: id.to_string(),
            channel_id: channel_id.to_string(),
            guild_id: data["guild_id"].as_str().map(str::to_string),
            author_is_bot: data["author"]["bot"].as_bool() == Some(true),
            author,
            content: data["content"].as_str().unwrap_or("").to_string(),
        })
    }
}

/// An application (slash) command invocation.
#[derive(Debug, Clone)]
pub struct InboundInteraction {
    pub id: String,
    pub token: String,
    pub application_id: String,
    pub channel_id: String,
    pub user: Requester,
    pub command: String,
    /// Value of the `message` option, when present.
    pub message: Option<String>,
}

impl InboundInteraction {
    /// Application command interaction type.
    const APPLICATION_COMMAND: u64 = 2;

    /// Parse the `d` payload of an `INTERACTION_CREATE` dispatch.
    ///
    /// Only application commands are returned; components and autocomplete
    /// are ignored.
    pub fn from_gateway(data: &Value) -> Option<Self> {
        if data["type"].as_u64() != Some(Self::APPLICATION_COMMAND) {
            return None;
        }

        // Guild interactions nest the user under `member`.
        let user = if data["member"]["user"].is_object() {
            let mut user = Requester::from_user(&data["member"]["user"])?;
            if let Some(nick) = data["member"]["nick"].as_str() {
                user.display_name = nick.to_string();
            }
            user
        } else {
            Requester::from_user(&data["user"])?
        };

        let message = data["data"]["options"].as_array().and_then(|options| {
            options
                .iter()
                .find(|option| option["name"].as_str() == Some("message"))
                .and_then(|option| option["value"].as_str())
                .map(str::to_string)
        });

        Some(Self {
            id: data["id"].as_str()?.to_string(),
            token: data["token"].as_str()?.to_string(),
            application_id: data["application_id"].as_str()?.to_string(),
            channel_id: data["channel_id"].as_str().unwrap_or("").to_string(),
            user,
            command: data["data"]["name"].as_str()?.to_string(),
            message,
        })
    }
}

/// Gateway dispatches the bot reacts to.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// Session established.
    Ready {
        application_id: String,
        bot_user: String,
    },
    Message(InboundMessage),
    Interaction(InboundInteraction),
}

impl GatewayEvent {
    /// Map a dispatch name and payload to an event, if it is one we handle.
    pub fn from_dispatch(kind: &str, data: &Value) -> Option<Self> {
        match kind {
            "READY" => Some(Self::Ready {
                application_id: data["application"]["id"].as_str()?.to_string(),
                bot_user: data["user"]["username"].as_str().unwrap_or("").to_string(),
            }),
            "MESSAGE_CREATE" => InboundMessage::from_gateway(data).map(Self::Message),
            "INTERACTION_CREATE" => InboundInteraction::from_gateway(data).map(Self::Interaction),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_guild_message_prefers_nick() {
        let data = json!({
            "id": "m1",
            "channel_id": "c1",
            "guild_id": "g1",
            "content": "!sage hello",
            "author": {"id": "42", "username": "ada", "global_name": "Ada L."},
            "member": {"nick": "Countess"}
        });

        let message = InboundMessage::from_gateway(&data).unwrap();
        assert_eq!(message.channel_id, "c1");
        assert_eq!(message.guild_id.as_deref(), Some("g1"));
        assert_eq!(message.author.id, "42");
        assert_eq!(message.author.username, "ada");
        assert_eq!(message.author.display_name, "Countess");
        assert!(!message.author_is_bot);
    }

    #[test]
    fn test_parse_dm_message_falls_back_to_username() {
        let data = json!({
            "id": "m1",
            "channel_id": "c1",
            "content": "hi",
            "author": {"id": "42", "username": "ada", "bot": true}
        });

        let message = InboundMessage::from_gateway(&data).unwrap();
        assert_eq!(message.author.display_name, "ada");
        assert!(message.author_is_bot);
        assert!(message.guild_id.is_none());
    }

    #[test]
    fn test_parse_guild_interaction() {
        let data = json!({
            "id": "i1",
            "type": 2,
            "token": "tok",
            "application_id": "app",
            "channel_id": "c1",
            "member": {"user": {"id": "42", "username": "ada", "global_name": "Ada"}},
            "data": {"name": "sage", "options": [{"name": "message", "type": 3, "value": "hello"}]}
        });

        let interaction = InboundInteraction::from_gateway(&data).unwrap();
        assert_eq!(interaction.command, "sage");
        assert_eq!(interaction.message.as_deref(), Some("hello"));
        assert_eq!(interaction.user.display_name, "Ada");
        assert_eq!(interaction.application_id, "app");
    }

    #[test]
    fn test_non_command_interactions_are_ignored() {
        let data = json!({"id": "i1", "type": 3, "token": "t", "application_id": "a"});
        assert!(InboundInteraction::from_gateway(&data).is_none());
    }

    #[test]
    fn test_dispatch_mapping() {
        let ready = GatewayEvent::from_dispatch(
            "READY",
            &json!({"application": {"id": "app"}, "user": {"username": "parley"}}),
        );
        assert!(matches!(ready, Some(GatewayEvent::Ready { application_id, .. }) if application_id == "app"));
        assert!(GatewayEvent::from_dispatch("TYPING_START", &json!({})).is_none());
    }

    #[test]
    fn test_mention_markup() {
        let requester = Requester::new("42", "ada", "Ada");
        assert_eq!(requester.mention(), "<@42>");
    }
}
