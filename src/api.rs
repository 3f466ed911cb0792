//! Account, group, topic and message endpoints.
//!
//! Every operation checks its parameters before a request is built, so a
//! rejected id or empty string never reaches the network.

use crate::client::Client;
use crate::error::{Error, ParameterError};
use crate::transport::RequestSpec;
use crate::types::{Credentials, Reply};
use serde::Serialize;
use serde_json::json;

fn require_id(id: u64, param: &'static str) -> Result<u64, ParameterError> {
    if id == 0 {
        return Err(ParameterError::InvalidId { param });
    }
    Ok(id)
}

fn require_text<'a>(value: &'a str, param: &'static str) -> Result<&'a str, ParameterError> {
    if value.trim().is_empty() {
        return Err(ParameterError::Empty { param });
    }
    Ok(value)
}

/// Visibility of a new group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Public,
    Private,
}

/// Parameters for creating a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreateGroup {
    name: String,
    kind: GroupKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slug: Option<String>,
}

impl CreateGroup {
    pub fn new(name: impl Into<String>, kind: GroupKind) -> Result<Self, ParameterError> {
        let name = name.into();
        require_text(&name, "name")?;
        Ok(Self {
            name,
            kind,
            description: None,
            slug: None,
        })
    }

    /// Blank descriptions are left out of the request.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }

    /// Blank slugs are left out of the request.
    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        self.slug = (!slug.trim().is_empty()).then_some(slug);
        self
    }
}

/// Account API client.
pub struct AccountApi {
    client: Client,
}

impl AccountApi {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Mark everything as read.
    pub async fn mark_read(&self) -> Result<Reply, Error> {
        self.client.post("api/account/mark_read.json", None).await
    }

    /// Check a username/password pair, independent of this client's own
    /// credentials.
    pub async fn verify(&self, username: &str, password: &str) -> Result<Reply, Error> {
        require_text(username, "username")?;
        let other = self
            .client
            .with_credentials(Credentials::new(username, password))?;
        other.get("api/account/verify.json").await
    }

    /// Users currently online.
    pub async fn online(&self) -> Result<Reply, Error> {
        self.client.get("api/account/online.json").await
    }
}

/// Groups API client.
pub struct GroupsApi {
    client: Client,
}

impl GroupsApi {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Groups the account belongs to.
    pub async fn list(&self) -> Result<Reply, Error> {
        self.client.get("api/groups.json").await
    }

    pub async fn get(&self, group_id: u64) -> Result<Reply, Error> {
        let id = require_id(group_id, "group_id")?;
        self.client.get(&format!("api/groups/{}.json", id)).await
    }

    pub async fn create(&self, group: CreateGroup) -> Result<Reply, Error> {
        let body = serde_json::to_value(&group)?;
        self.client.post("api/groups/create.json", Some(body)).await
    }

    pub async fn join(&self, group_id: u64) -> Result<Reply, Error> {
        self.action(group_id, "join").await
    }

    /// Ask to join a private group.
    pub async fn request(&self, group_id: u64) -> Result<Reply, Error> {
        self.action(group_id, "request").await
    }

    pub async fn leave(&self, group_id: u64) -> Result<Reply, Error> {
        self.action(group_id, "leave").await
    }

    pub async fn mark_read(&self, group_id: u64) -> Result<Reply, Error> {
        self.action(group_id, "mark_read").await
    }

    /// Members of the group currently online.
    pub async fn online(&self, group_id: u64) -> Result<Reply, Error> {
        let id = require_id(group_id, "group_id")?;
        self.client
            .get(&format!("api/groups/{}/online.json", id))
            .await
    }

    /// Topics in the group, optionally only those older than `until_id`.
    pub async fn topics(&self, group_id: u64, until_id: Option<u64>) -> Result<Reply, Error> {
        let id = require_id(group_id, "group_id")?;
        let mut request = RequestSpec::get(format!("api/groups/{}/topics.json", id));
        if let Some(until_id) = until_id {
            request = request.query("until_id", require_id(until_id, "until_id")?);
        }
        self.client.send(&request).await
    }

    pub async fn create_topic(&self, group_id: u64, name: &str) -> Result<Reply, Error> {
        let id = require_id(group_id, "group_id")?;
        let name = require_text(name, "name")?;
        self.client
            .post(
                &format!("api/groups/{}/topics/create.json", id),
                Some(json!({ "name": name })),
            )
            .await
    }

    async fn action(&self, group_id: u64, action: &str) -> Result<Reply, Error> {
        let id = require_id(group_id, "group_id")?;
        self.client
            .post(&format!("api/groups/{}/{}.json", id, action), None)
            .await
    }
}

/// Topics API client.
pub struct TopicsApi {
    client: Client,
}

impl TopicsApi {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, topic_id: u64) -> Result<Reply, Error> {
        let id = require_id(topic_id, "topic_id")?;
        self.client.get(&format!("api/topics/{}.json", id)).await
    }

    /// Messages in the topic, optionally only those older than `until_id`.
    pub async fn messages(&self, topic_id: u64, until_id: Option<u64>) -> Result<Reply, Error> {
        let id = require_id(topic_id, "topic_id")?;
        let mut request = RequestSpec::get(format!("api/topics/{}/messages.json", id));
        if let Some(until_id) = until_id {
            request = request.query("until_id", require_id(until_id, "until_id")?);
        }
        self.client.send(&request).await
    }

    pub async fn create_message(&self, topic_id: u64, message: &str) -> Result<Reply, Error> {
        let id = require_id(topic_id, "topic_id")?;
        let message = require_text(message, "message")?;
        self.client
            .post(
                &format!("api/topics/{}/messages/create.json", id),
                Some(json!({ "message": message })),
            )
            .await
    }

    pub async fn delete(&self, topic_id: u64) -> Result<Reply, Error> {
        let id = require_id(topic_id, "topic_id")?;
        self.client
            .post(&format!("api/topics/{}/delete.json", id), None)
            .await
    }

    pub async fn mark_read(&self, topic_id: u64) -> Result<Reply, Error> {
        let id = require_id(topic_id, "topic_id")?;
        self.client
            .post(&format!("api/topics/{}/mark_read.json", id), None)
            .await
    }
}

/// Messages API client.
pub struct MessagesApi {
    client: Client,
}

impl MessagesApi {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Star a message, or unstar it if already starred.
    pub async fn star(&self, message_id: u64) -> Result<Reply, Error> {
        let id = require_id(message_id, "message_id")?;
        self.client
            .post(&format!("api/messages/{}/star.json", id), None)
            .await
    }

    pub async fn delete(&self, message_id: u64) -> Result<Reply, Error> {
        let id = require_id(message_id, "message_id")?;
        self.client
            .post(&format!("api/messages/{}/delete.json", id), None)
            .await
    }
}
