//! In-memory directory
//!
//! Implements every collaborator port over plain maps. Backs the development
//! binary (optionally seeded from a JSON file) and the test suites.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use teamchat_common::{AppError, AppResult};
use teamchat_core::{
    AccessPolicy, ChannelId, CollabResult, CollaboratorError, EditedMessage, HuddleId,
    MembershipLookup, MessageId, MessageMeta, MessageStore, PresenceStatus, PresenceStore,
    ReactionSummary, StoredMessage, UserDirectory, UserId, UserProfile, WorkspaceId,
};
use tokio::sync::RwLock;

// ============================================================================
// Seed Data
// ============================================================================

/// Contents of a `DIRECTORY_SEED` file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySeed {
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub workspaces: Vec<WorkspaceSeed>,
    #[serde(default)]
    pub channels: Vec<ChannelSeed>,
    #[serde(default)]
    pub huddles: Vec<HuddleSeed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSeed {
    pub id: WorkspaceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: Vec<UserId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSeed {
    pub id: ChannelId,
    pub workspace_id: WorkspaceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub members: Vec<UserId>,
    #[serde(default)]
    pub admins: Vec<UserId>,
}

impl ChannelSeed {
    pub fn public(id: ChannelId, workspace_id: WorkspaceId) -> Self {
        Self {
            id,
            workspace_id,
            name: String::new(),
            is_private: false,
            members: Vec::new(),
            admins: Vec::new(),
        }
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    #[must_use]
    pub fn with_members(mut self, members: impl IntoIterator<Item = UserId>) -> Self {
        self.members.extend(members);
        self
    }

    #[must_use]
    pub fn with_admins(mut self, admins: impl IntoIterator<Item = UserId>) -> Self {
        self.admins.extend(admins);
        self
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuddleSeed {
    pub id: HuddleId,
    pub channel_id: ChannelId,
}

/// Last presence values written through the `PresenceStore` port
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedPresence {
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub status: Option<PresenceStatus>,
    pub status_message: Option<String>,
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug)]
struct ChannelRecord {
    workspace_id: WorkspaceId,
    is_private: bool,
    members: HashSet<UserId>,
    admins: HashSet<UserId>,
}

#[derive(Debug)]
struct MessageRecord {
    meta: MessageMeta,
    content: String,
    deleted: bool,
    /// emoji -> users, in reaction order
    reactions: BTreeMap<String, Vec<UserId>>,
}

impl MessageRecord {
    fn summaries(&self) -> Vec<ReactionSummary> {
        self.reactions
            .iter()
            .map(|(emoji, users)| ReactionSummary {
                emoji: emoji.clone(),
                count: users.len() as u32,
                users: users.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: HashMap<UserId, UserProfile>,
    workspaces: HashMap<WorkspaceId, HashSet<UserId>>,
    channels: HashMap<ChannelId, ChannelRecord>,
    huddles: HashMap<HuddleId, ChannelId>,
    messages: HashMap<MessageId, MessageRecord>,
    presence: HashMap<UserId, PersistedPresence>,
    latency: Option<Duration>,
    presence_offline: bool,
}

impl DirectoryState {
    fn can_access_channel(&self, user_id: UserId, channel_id: ChannelId) -> bool {
        let Some(channel) = self.channels.get(&channel_id) else {
            return false;
        };
        if channel.members.contains(&user_id) {
            return true;
        }
        !channel.is_private
            && self
                .workspaces
                .get(&channel.workspace_id)
                .is_some_and(|members| members.contains(&user_id))
    }

    fn live_message(&self, message_id: MessageId) -> CollabResult<&MessageRecord> {
        self.messages
            .get(&message_id)
            .filter(|m| !m.deleted)
            .ok_or_else(|| CollaboratorError::not_found("Message", message_id))
    }

    fn live_message_mut(&mut self, message_id: MessageId) -> CollabResult<&mut MessageRecord> {
        self.messages
            .get_mut(&message_id)
            .filter(|m| !m.deleted)
            .ok_or_else(|| CollaboratorError::not_found("Message", message_id))
    }
}

/// In-memory implementation of every collaborator port
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from seed data
    pub fn from_seed(seed: DirectorySeed) -> Self {
        let mut state = DirectoryState::default();
        for user in seed.users {
            state.users.insert(user.id, user);
        }
        for workspace in seed.workspaces {
            state
                .workspaces
                .entry(workspace.id)
                .or_default()
                .extend(workspace.members);
        }
        for channel in seed.channels {
            insert_channel(&mut state, channel);
        }
        for huddle in seed.huddles {
            state.huddles.insert(huddle.id, huddle.channel_id);
        }

        Self {
            state: RwLock::new(state),
        }
    }

    /// Load seed data from a JSON file
    pub async fn load(path: &Path) -> AppResult<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let seed: DirectorySeed = serde_json::from_str(&raw)
            .map_err(|e| AppError::Seed(format!("{}: {e}", path.display())))?;

        tracing::info!(
            path = %path.display(),
            users = seed.users.len(),
            workspaces = seed.workspaces.len(),
            channels = seed.channels.len(),
            "Directory seed loaded"
        );

        Ok(Self::from_seed(seed))
    }

    pub async fn add_user(&self, profile: UserProfile) {
        self.state.write().await.users.insert(profile.id, profile);
    }

    pub async fn remove_user(&self, user_id: UserId) {
        self.state.write().await.users.remove(&user_id);
    }

    pub async fn add_workspace(
        &self,
        workspace_id: WorkspaceId,
        members: impl IntoIterator<Item = UserId>,
    ) {
        self.state
            .write()
            .await
            .workspaces
            .entry(workspace_id)
            .or_default()
            .extend(members);
    }

    pub async fn add_channel(&self, channel: ChannelSeed) {
        insert_channel(&mut *self.state.write().await, channel);
    }

    pub async fn add_huddle(&self, huddle_id: HuddleId, channel_id: ChannelId) {
        self.state.write().await.huddles.insert(huddle_id, channel_id);
    }

    /// Delay every port call, to exercise collaborator timeouts
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().await.latency = latency;
    }

    /// Make presence writes fail with `Unavailable`
    pub async fn set_presence_offline(&self, offline: bool) {
        self.state.write().await.presence_offline = offline;
    }

    pub async fn persisted_presence(&self, user_id: UserId) -> Option<PersistedPresence> {
        self.state.read().await.presence.get(&user_id).cloned()
    }

    async fn simulate_latency(&self) {
        let latency = self.state.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn write_presence<F>(&self, user_id: UserId, apply: F) -> CollabResult<()>
    where
        F: FnOnce(&mut PersistedPresence),
    {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        if state.presence_offline {
            return Err(CollaboratorError::Unavailable("presence store offline".to_string()));
        }
        apply(state.presence.entry(user_id).or_default());
        Ok(())
    }
}

fn insert_channel(state: &mut DirectoryState, channel: ChannelSeed) {
    let record = state
        .channels
        .entry(channel.id)
        .or_insert_with(|| ChannelRecord {
            workspace_id: channel.workspace_id,
            is_private: channel.is_private,
            members: HashSet::new(),
            admins: HashSet::new(),
        });
    record.members.extend(channel.members);
    record.members.extend(channel.admins.iter().copied());
    record.admins.extend(channel.admins);
}

// ============================================================================
// Port Implementations
// ============================================================================

#[async_trait]
impl MembershipLookup for InMemoryDirectory {
    async fn workspaces_of(&self, user_id: UserId) -> CollabResult<HashSet<WorkspaceId>> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        Ok(state
            .workspaces
            .iter()
            .filter(|(_, members)| members.contains(&user_id))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn channels_of(&self, user_id: UserId) -> CollabResult<HashSet<ChannelId>> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        Ok(state
            .channels
            .iter()
            .filter(|(_, channel)| channel.members.contains(&user_id))
            .map(|(id, _)| *id)
            .collect())
    }
}

#[async_trait]
impl AccessPolicy for InMemoryDirectory {
    async fn can_access_channel(&self, user_id: UserId, channel_id: ChannelId) -> CollabResult<bool> {
        self.simulate_latency().await;
        Ok(self.state.read().await.can_access_channel(user_id, channel_id))
    }

    async fn is_channel_admin(&self, user_id: UserId, channel_id: ChannelId) -> CollabResult<bool> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        Ok(state
            .channels
            .get(&channel_id)
            .is_some_and(|c| c.admins.contains(&user_id)))
    }

    async fn is_workspace_member(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
    ) -> CollabResult<bool> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        Ok(state
            .workspaces
            .get(&workspace_id)
            .is_some_and(|members| members.contains(&user_id)))
    }

    async fn can_join_huddle(&self, user_id: UserId, huddle_id: HuddleId) -> CollabResult<bool> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        Ok(state
            .huddles
            .get(&huddle_id)
            .is_some_and(|channel_id| state.can_access_channel(user_id, *channel_id)))
    }
}

#[async_trait]
impl PresenceStore for InMemoryDirectory {
    async fn set_online(&self, user_id: UserId, online: bool) -> CollabResult<()> {
        self.write_presence(user_id, |p| p.online = online).await
    }

    async fn set_last_seen(&self, user_id: UserId, at: DateTime<Utc>) -> CollabResult<()> {
        self.write_presence(user_id, |p| p.last_seen = Some(at)).await
    }

    async fn set_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        message: Option<&str>,
    ) -> CollabResult<()> {
        let message = message.map(str::to_owned);
        self.write_presence(user_id, |p| {
            p.status = Some(status);
            p.status_message = message;
        })
        .await
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_user(&self, user_id: UserId) -> CollabResult<Option<UserProfile>> {
        self.simulate_latency().await;
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }
}

#[async_trait]
impl MessageStore for InMemoryDirectory {
    async fn message_meta(&self, message_id: MessageId) -> CollabResult<Option<MessageMeta>> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        Ok(state.live_message(message_id).ok().map(|m| m.meta))
    }

    async fn create_message(
        &self,
        author_id: UserId,
        channel_id: ChannelId,
        content: &str,
        parent_message_id: Option<MessageId>,
    ) -> CollabResult<StoredMessage> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;

        if !state.channels.contains_key(&channel_id) {
            return Err(CollaboratorError::not_found("Channel", channel_id));
        }
        let parent_author_id = match parent_message_id {
            Some(parent) => Some(state.live_message(parent)?.meta.author_id),
            None => None,
        };
        let author = state
            .users
            .get(&author_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::not_found("User", author_id))?;

        let id = MessageId::generate();
        let body = json!({
            "id": id,
            "channelId": channel_id,
            "userId": author_id,
            "content": content,
            "parentMessageId": parent_message_id,
            "createdAt": Utc::now(),
            "username": author.username,
            "fullName": author.full_name,
            "avatarUrl": author.avatar_url,
            "reactionCount": 0,
            "replyCount": 0,
        });

        state.messages.insert(
            id,
            MessageRecord {
                meta: MessageMeta {
                    id,
                    channel_id,
                    author_id,
                },
                content: content.to_owned(),
                deleted: false,
                reactions: BTreeMap::new(),
            },
        );

        Ok(StoredMessage {
            id,
            channel_id,
            author_id,
            parent_author_id,
            body,
        })
    }

    async fn update_message(
        &self,
        message_id: MessageId,
        content: &str,
    ) -> CollabResult<EditedMessage> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        let record = state.live_message_mut(message_id)?;
        content.clone_into(&mut record.content);

        Ok(EditedMessage {
            id: message_id,
            channel_id: record.meta.channel_id,
            content: record.content.clone(),
            edited_at: Utc::now(),
        })
    }

    async fn delete_message(&self, message_id: MessageId) -> CollabResult<()> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.live_message_mut(message_id)?.deleted = true;
        Ok(())
    }

    async fn add_reaction(
        &self,
        user_id: UserId,
        message_id: MessageId,
        emoji: &str,
    ) -> CollabResult<Vec<ReactionSummary>> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        let record = state.live_message_mut(message_id)?;
        let users = record.reactions.entry(emoji.to_owned()).or_default();
        if !users.contains(&user_id) {
            users.push(user_id);
        }
        Ok(record.summaries())
    }

    async fn remove_reaction(
        &self,
        user_id: UserId,
        message_id: MessageId,
        emoji: &str,
    ) -> CollabResult<Vec<ReactionSummary>> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        let record = state.live_message_mut(message_id)?;
        if let Some(users) = record.reactions.get_mut(emoji) {
            users.retain(|u| *u != user_id);
            if users.is_empty() {
                record.reactions.remove(emoji);
            }
        }
        Ok(record.summaries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        directory: InMemoryDirectory,
        member: UserId,
        outsider: UserId,
        workspace: WorkspaceId,
        public: ChannelId,
        private: ChannelId,
    }

    async fn fixture() -> Fixture {
        let directory = InMemoryDirectory::new();
        let member = UserId::generate();
        let outsider = UserId::generate();
        let workspace = WorkspaceId::generate();
        let public = ChannelId::generate();
        let private = ChannelId::generate();

        directory.add_user(UserProfile::new(member, "member")).await;
        directory.add_user(UserProfile::new(outsider, "outsider")).await;
        directory.add_workspace(workspace, [member]).await;
        directory
            .add_channel(ChannelSeed::public(public, workspace).with_members([member]))
            .await;
        directory
            .add_channel(ChannelSeed::public(private, workspace).private().with_admins([member]))
            .await;

        Fixture {
            directory,
            member,
            outsider,
            workspace,
            public,
            private,
        }
    }

    #[tokio::test]
    async fn test_membership_lookup() {
        let f = fixture().await;

        let workspaces = f.directory.workspaces_of(f.member).await.unwrap();
        assert_eq!(workspaces, HashSet::from([f.workspace]));

        let channels = f.directory.channels_of(f.member).await.unwrap();
        assert_eq!(channels, HashSet::from([f.public, f.private]));

        assert!(f.directory.channels_of(f.outsider).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_channel_access() {
        let f = fixture().await;
        let stranger_in_workspace = UserId::generate();
        f.directory.add_workspace(f.workspace, [stranger_in_workspace]).await;

        // Public channels are open to workspace members
        assert!(f.directory.can_access_channel(stranger_in_workspace, f.public).await.unwrap());
        // Private channels need explicit membership
        assert!(!f.directory.can_access_channel(stranger_in_workspace, f.private).await.unwrap());
        assert!(f.directory.can_access_channel(f.member, f.private).await.unwrap());
        assert!(!f.directory.can_access_channel(f.outsider, f.public).await.unwrap());

        assert!(f.directory.is_channel_admin(f.member, f.private).await.unwrap());
        assert!(!f.directory.is_channel_admin(f.member, f.public).await.unwrap());
    }

    #[tokio::test]
    async fn test_huddle_access_follows_channel() {
        let f = fixture().await;
        let huddle = HuddleId::generate();
        f.directory.add_huddle(huddle, f.private).await;

        assert!(f.directory.can_join_huddle(f.member, huddle).await.unwrap());
        assert!(!f.directory.can_join_huddle(f.outsider, huddle).await.unwrap());
        assert!(!f.directory.can_join_huddle(f.member, HuddleId::generate()).await.unwrap());
    }

    #[tokio::test]
    async fn test_message_lifecycle() {
        let f = fixture().await;

        let parent = f
            .directory
            .create_message(f.member, f.public, "root", None)
            .await
            .unwrap();
        assert_eq!(parent.body["content"], "root");
        assert_eq!(parent.body["username"], "member");
        assert!(parent.parent_author_id.is_none());

        let reply = f
            .directory
            .create_message(f.outsider, f.public, "reply", Some(parent.id))
            .await
            .unwrap();
        assert_eq!(reply.parent_author_id, Some(f.member));

        let edited = f.directory.update_message(parent.id, "root v2").await.unwrap();
        assert_eq!(edited.content, "root v2");
        assert_eq!(edited.channel_id, f.public);

        f.directory.delete_message(parent.id).await.unwrap();
        assert!(f.directory.message_meta(parent.id).await.unwrap().is_none());
        assert!(matches!(
            f.directory.delete_message(parent.id).await,
            Err(CollaboratorError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reactions_are_idempotent() {
        let f = fixture().await;
        let message = f
            .directory
            .create_message(f.member, f.public, "hi", None)
            .await
            .unwrap();

        f.directory.add_reaction(f.member, message.id, "👍").await.unwrap();
        let summary = f.directory.add_reaction(f.member, message.id, "👍").await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].count, 1);

        let summary = f.directory.remove_reaction(f.member, message.id, "👍").await.unwrap();
        assert!(summary.is_empty());
    }

    #[tokio::test]
    async fn test_presence_writes() {
        let f = fixture().await;
        f.directory.set_online(f.member, true).await.unwrap();
        f.directory
            .set_status(f.member, PresenceStatus::Busy, Some("focus"))
            .await
            .unwrap();

        let persisted = f.directory.persisted_presence(f.member).await.unwrap();
        assert!(persisted.online);
        assert_eq!(persisted.status, Some(PresenceStatus::Busy));
        assert_eq!(persisted.status_message.as_deref(), Some("focus"));

        f.directory.set_presence_offline(true).await;
        assert!(f.directory.set_online(f.member, false).await.is_err());
    }

    #[test]
    fn test_seed_format() {
        let user = UserId::generate();
        let workspace = WorkspaceId::generate();
        let channel = ChannelId::generate();
        let raw = json!({
            "users": [{"id": user, "username": "ada", "fullName": "Ada Lovelace"}],
            "workspaces": [{"id": workspace, "name": "eng", "members": [user]}],
            "channels": [{"id": channel, "workspaceId": workspace, "isPrivate": true, "members": [user]}]
        });

        let seed: DirectorySeed = serde_json::from_value(raw).unwrap();
        assert_eq!(seed.users[0].full_name.as_deref(), Some("Ada Lovelace"));
        assert!(seed.channels[0].is_private);
        assert!(seed.huddles.is_empty());
    }
}
