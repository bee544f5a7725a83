//! Player profiles.
//!
//! Cross-game player records: credentials, win/play counters, friends and
//! pending invitations. Profiles are created at registration and never
//! deleted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::document::GameId;
use super::engine::StatDelta;
use super::room::{GameKind, Identity, ParticipantId};

/// 32-bit rolling `h * 31 + c` over UTF-16 code units, printed in base 36.
/// Existing accounts store hashes in this format.
///
/// This is a toy check, not password storage.
pub fn toy_hash(password: &str) -> String {
    let hash = password
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit)));
    to_base36(i64::from(hash))
}

fn to_base36(value: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }
    let mut n = value.unsigned_abs();
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if value < 0 {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// A pending invitation to a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInvitation {
    pub from: ParticipantId,
    pub game_id: GameId,
    pub kind: GameKind,
    pub sent_at: DateTime<Utc>,
}

/// Persistent player record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    pub id: ParticipantId,
    pub name: String,
    password_hash: String,
    pub games_played: u32,
    pub games_won: u32,
    pub friends: Vec<ParticipantId>,
    /// Incoming friend requests, by sender
    pub friend_requests: Vec<ParticipantId>,
    pub game_invitations: Vec<GameInvitation>,
    pub created_at: DateTime<Utc>,
}

impl PlayerProfile {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id.clone(), self.name.clone())
    }

    pub fn is_friend(&self, id: &str) -> bool {
        self.friends.iter().any(|f| f == id)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "games_played": self.games_played,
            "games_won": self.games_won,
            "friends": self.friends,
            "friend_requests": self.friend_requests,
            "game_invitations": self.game_invitations.len()
        })
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub id: ParticipantId,
    pub name: String,
    pub games_won: u32,
    pub games_played: u32,
}

/// Profile errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("Player name must not be empty")]
    EmptyName,
    #[error("Player name already exists: {0}")]
    NameTaken(String),
    #[error("Player not found: {0}")]
    UnknownName(String),
    #[error("Unknown player id: {0}")]
    UnknownPlayer(ParticipantId),
    #[error("Incorrect password")]
    IncorrectPassword,
    #[error("Cannot befriend yourself")]
    SelfRequest,
    #[error("Already friends")]
    AlreadyFriends,
    #[error("No pending friend request from {0}")]
    NoPendingRequest(ParticipantId),
    #[error("Only friends can be invited")]
    NotFriends,
}

/// Profile registry - tracks every registered player.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<ParticipantId, PlayerProfile>,
    /// Name to player id
    name_index: HashMap<String, ParticipantId>,
    next_id: u64,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a profile. Names are unique.
    pub fn register(
        &mut self,
        name: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Identity, ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if self.name_index.contains_key(name) {
            return Err(ProfileError::NameTaken(name.to_string()));
        }

        self.next_id += 1;
        let id = format!("player-{:06}", self.next_id);
        let profile = PlayerProfile {
            id: id.clone(),
            name: name.to_string(),
            password_hash: toy_hash(password),
            games_played: 0,
            games_won: 0,
            friends: Vec::new(),
            friend_requests: Vec::new(),
            game_invitations: Vec::new(),
            created_at: now,
        };
        let identity = profile.identity();

        self.name_index.insert(profile.name.clone(), id.clone());
        self.profiles.insert(id, profile);
        Ok(identity)
    }

    /// Check credentials.
    pub fn login(&self, name: &str, password: &str) -> Result<Identity, ProfileError> {
        let profile = self
            .name_index
            .get(name.trim())
            .and_then(|id| self.profiles.get(id))
            .ok_or_else(|| ProfileError::UnknownName(name.to_string()))?;

        if profile.password_hash != toy_hash(password) {
            return Err(ProfileError::IncorrectPassword);
        }
        Ok(profile.identity())
    }

    pub fn get(&self, id: &str) -> Option<&PlayerProfile> {
        self.profiles.get(id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut PlayerProfile, ProfileError> {
        self.profiles
            .get_mut(id)
            .ok_or_else(|| ProfileError::UnknownPlayer(id.to_string()))
    }

    /// Apply the counters from a finished game.
    pub fn apply(&mut self, delta: &StatDelta) -> Result<(), ProfileError> {
        let profile = self.get_mut(&delta.participant)?;
        profile.games_played += delta.played;
        profile.games_won += delta.won;
        debug!(
            player_id = %delta.participant,
            games_played = profile.games_played,
            games_won = profile.games_won,
            "Stats updated"
        );
        Ok(())
    }

    /// Apply every delta, skipping participants without a profile.
    pub fn apply_all(&mut self, deltas: &[StatDelta]) {
        for delta in deltas {
            if let Err(e) = self.apply(delta) {
                warn!(player_id = %delta.participant, error = %e, "Stats not recorded");
            }
        }
    }

    /// Top players by wins. Ties go to fewer games played, then name.
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let mut ranked: Vec<&PlayerProfile> = self.profiles.values().collect();
        ranked.sort_by(|a, b| {
            b.games_won
                .cmp(&a.games_won)
                .then(a.games_played.cmp(&b.games_played))
                .then_with(|| a.name.cmp(&b.name))
        });

        ranked
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, p)| LeaderboardEntry {
                rank: i + 1,
                id: p.id.clone(),
                name: p.name.clone(),
                games_won: p.games_won,
                games_played: p.games_played,
            })
            .collect()
    }

    /// A player's friends, in the order they were added.
    pub fn friends(&self, id: &str) -> Result<Vec<Identity>, ProfileError> {
        let profile = self
            .get(id)
            .ok_or_else(|| ProfileError::UnknownPlayer(id.to_string()))?;
        Ok(profile
            .friends
            .iter()
            .filter_map(|f| self.get(f))
            .map(PlayerProfile::identity)
            .collect())
    }

    /// Ask `to` to become friends with `from`.
    pub fn send_friend_request(&mut self, from: &str, to: &str) -> Result<(), ProfileError> {
        if from == to {
            return Err(ProfileError::SelfRequest);
        }
        if self.get_mut(from)?.is_friend(to) {
            return Err(ProfileError::AlreadyFriends);
        }

        let target = self.get_mut(to)?;
        if !target.friend_requests.iter().any(|r| r == from) {
            target.friend_requests.push(from.to_string());
        }
        Ok(())
    }

    /// Accept a pending request; both sides become friends.
    pub fn accept_friend_request(&mut self, me: &str, from: &str) -> Result<(), ProfileError> {
        self.take_request(me, from)?;
        self.get_mut(me)?.friends.push(from.to_string());
        let other = self.get_mut(from)?;
        if !other.is_friend(me) {
            other.friends.push(me.to_string());
        }
        // A crossed request in the other direction is now moot.
        other.friend_requests.retain(|r| r != me);
        Ok(())
    }

    /// Drop a pending request.
    pub fn decline_friend_request(&mut self, me: &str, from: &str) -> Result<(), ProfileError> {
        self.take_request(me, from)
    }

    fn take_request(&mut self, me: &str, from: &str) -> Result<(), ProfileError> {
        if !self.profiles.contains_key(from) {
            return Err(ProfileError::UnknownPlayer(from.to_string()));
        }
        let profile = self.get_mut(me)?;
        let before = profile.friend_requests.len();
        profile.friend_requests.retain(|r| r != from);
        if profile.friend_requests.len() == before {
            return Err(ProfileError::NoPendingRequest(from.to_string()));
        }
        Ok(())
    }

    /// Invite a friend to a game.
    pub fn invite(
        &mut self,
        from: &str,
        to: &str,
        game_id: &str,
        kind: GameKind,
        now: DateTime<Utc>,
    ) -> Result<(), ProfileError> {
        if !self.get_mut(from)?.is_friend(to) {
            return Err(ProfileError::NotFriends);
        }
        let target = self.get_mut(to)?;
        target.game_invitations.retain(|inv| inv.game_id != game_id);
        target.game_invitations.push(GameInvitation {
            from: from.to_string(),
            game_id: game_id.to_string(),
            kind,
            sent_at: now,
        });
        Ok(())
    }

    /// Remove and return a player's pending invitations.
    pub fn take_invitations(&mut self, id: &str) -> Result<Vec<GameInvitation>, ProfileError> {
        Ok(std::mem::take(&mut self.get_mut(id)?.game_invitations))
    }

    pub fn count(&self) -> usize {
        self.profiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry_with(names: &[&str]) -> (ProfileRegistry, Vec<Identity>) {
        let mut registry = ProfileRegistry::new();
        let ids = names
            .iter()
            .map(|n| registry.register(n, "secret", Utc::now()).unwrap())
            .collect();
        (registry, ids)
    }

    #[test]
    fn test_toy_hash_matches_reference_values() {
        assert_eq!(toy_hash(""), "0");
        assert_eq!(toy_hash("a"), "2p");
        // "hello".hashCode() == 99162322
        assert_eq!(toy_hash("hello"), "1n1e4y");
        // "password".hashCode() == 1216985755
        assert_eq!(toy_hash("password"), to_base36(1_216_985_755));
        assert_ne!(toy_hash("password"), toy_hash("Password"));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(-71), "-1z");
    }

    #[test]
    fn test_register_and_login() {
        let mut registry = ProfileRegistry::new();
        let alice = registry.register("alice", "pw", Utc::now()).unwrap();

        assert_eq!(registry.login("alice", "pw").unwrap(), alice);
        assert_eq!(
            registry.login("alice", "wrong"),
            Err(ProfileError::IncorrectPassword)
        );
        assert_eq!(
            registry.login("bob", "pw"),
            Err(ProfileError::UnknownName("bob".to_string()))
        );
        assert_eq!(
            registry.register("alice", "other", Utc::now()),
            Err(ProfileError::NameTaken("alice".to_string()))
        );
        assert_eq!(registry.register("  ", "pw", Utc::now()), Err(ProfileError::EmptyName));
    }

    #[test]
    fn test_apply_stats() {
        let (mut registry, ids) = registry_with(&["alice", "bob"]);
        registry.apply_all(&[
            StatDelta { participant: ids[0].id.clone(), played: 1, won: 1 },
            StatDelta { participant: ids[1].id.clone(), played: 1, won: 0 },
            StatDelta { participant: "ghost".to_string(), played: 1, won: 0 },
        ]);

        let alice = registry.get(&ids[0].id).unwrap();
        assert_eq!((alice.games_played, alice.games_won), (1, 1));
        let bob = registry.get(&ids[1].id).unwrap();
        assert_eq!((bob.games_played, bob.games_won), (1, 0));
    }

    #[test]
    fn test_leaderboard_order() {
        let (mut registry, ids) = registry_with(&["carol", "alice", "bob"]);
        let record = |registry: &mut ProfileRegistry, who: &Identity, played, won| {
            registry
                .apply(&StatDelta { participant: who.id.clone(), played, won })
                .unwrap();
        };
        record(&mut registry, &ids[0], 5, 3);
        record(&mut registry, &ids[1], 3, 3);
        record(&mut registry, &ids[2], 2, 1);

        let board = registry.leaderboard(2);
        let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "carol"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].rank, 2);
    }

    #[test]
    fn test_friend_request_flow() {
        let (mut registry, ids) = registry_with(&["alice", "bob"]);
        let (a, b) = (ids[0].id.as_str(), ids[1].id.as_str());

        assert_eq!(registry.send_friend_request(a, a), Err(ProfileError::SelfRequest));
        registry.send_friend_request(a, b).unwrap();
        registry.send_friend_request(a, b).unwrap();
        assert_eq!(registry.get(b).unwrap().friend_requests, vec![a.to_string()]);

        registry.accept_friend_request(b, a).unwrap();
        assert_eq!(registry.friends(a).unwrap(), vec![ids[1].clone()]);
        assert!(registry.get(a).unwrap().is_friend(b));
        assert!(registry.get(b).unwrap().is_friend(a));
        assert!(registry.get(b).unwrap().friend_requests.is_empty());

        assert_eq!(registry.send_friend_request(b, a), Err(ProfileError::AlreadyFriends));
        assert_eq!(
            registry.accept_friend_request(b, a),
            Err(ProfileError::NoPendingRequest(a.to_string()))
        );
    }

    #[test]
    fn test_decline_friend_request() {
        let (mut registry, ids) = registry_with(&["alice", "bob"]);
        let (a, b) = (ids[0].id.as_str(), ids[1].id.as_str());

        registry.send_friend_request(a, b).unwrap();
        registry.decline_friend_request(b, a).unwrap();
        assert!(!registry.get(b).unwrap().is_friend(a));
        assert!(registry.get(b).unwrap().friend_requests.is_empty());
    }

    #[test]
    fn test_invitations() {
        let (mut registry, ids) = registry_with(&["alice", "bob", "carol"]);
        let (a, b, c) = (ids[0].id.as_str(), ids[1].id.as_str(), ids[2].id.as_str());
        registry.send_friend_request(a, b).unwrap();
        registry.accept_friend_request(b, a).unwrap();

        assert_eq!(
            registry.invite(a, c, "game-1", GameKind::DotsAndBoxes, Utc::now()),
            Err(ProfileError::NotFriends)
        );

        registry.invite(a, b, "game-1", GameKind::DotsAndBoxes, Utc::now()).unwrap();
        registry.invite(a, b, "game-1", GameKind::DotsAndBoxes, Utc::now()).unwrap();

        let invitations = registry.take_invitations(b).unwrap();
        assert_eq!(invitations.len(), 1);
        assert_eq!(invitations[0].from, a);
        assert!(registry.take_invitations(b).unwrap().is_empty());
    }
}
