//! Wire types for the roster REST API

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the REST API, collections live directly below it
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { "http://localhost:3000/api".to_string() }
fn default_timeout_secs() -> u64 { 30 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// A user record.
///
/// `experiences` is always present; a missing or `null` list on the wire
/// becomes an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned identifier, absent until first persisted
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub password: String,
    /// Free-text biography
    #[serde(default)]
    pub comment: String,
    #[serde(rename = "experiencies", default, deserialize_with = "null_as_empty")]
    pub experiences: Vec<Reference>,
}

impl User {
    pub fn new(name: impl Into<String>, mail: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mail: mail.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.experiences.push(reference);
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Identifiers of slots that still hold a bare reference
    pub fn unresolved_ids(&self) -> impl Iterator<Item = (usize, &str)> {
        self.experiences.iter().enumerate().filter_map(|(slot, r)| match r {
            Reference::Id(id) => Some((slot, id.as_str())),
            Reference::Resolved(_) => None,
        })
    }
}

/// An experience owned by one user and shared with participants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Owning user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Participating user ids
    #[serde(default, deserialize_with = "null_as_empty")]
    pub participants: Vec<String>,
    /// Remaining descriptive fields, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Experience {
    pub fn new(description: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            owner: Some(owner.into()),
            ..Default::default()
        }
    }

    pub fn with_participant(mut self, user_id: impl Into<String>) -> Self {
        self.participants.push(user_id.into());
        self
    }

    /// Whether `member_id` holds `role` on this experience
    pub fn involves(&self, member_id: &str, role: MemberRole) -> bool {
        let owns = self.owner.as_deref() == Some(member_id);
        let participates = self.participants.iter().any(|p| p == member_id);
        match role {
            MemberRole::Owner => owns,
            MemberRole::Participant => participates,
            MemberRole::Any => owns || participates,
        }
    }
}

/// A slot in a user's experience list.
///
/// Deserializes from either a bare id string or a full object. Serializes
/// as the bare id whenever one is known, so the remote keeps references.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    Id(String),
    Resolved(Experience),
}

impl Reference {
    pub fn id(&self) -> Option<&str> {
        match self {
            Reference::Id(id) => Some(id),
            Reference::Resolved(exp) => exp.id.as_deref(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&Experience> {
        match self {
            Reference::Resolved(exp) => Some(exp),
            Reference::Id(_) => None,
        }
    }
}

impl From<&str> for Reference {
    fn from(id: &str) -> Self {
        Reference::Id(id.to_string())
    }
}

impl From<Experience> for Reference {
    fn from(exp: Experience) -> Self {
        Reference::Resolved(exp)
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reference::Id(id) => serializer.serialize_str(id),
            Reference::Resolved(Experience { id: Some(id), .. }) => serializer.serialize_str(id),
            Reference::Resolved(exp) => exp.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Id(String),
            Resolved(Experience),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Id(id) => Reference::Id(id),
            Wire::Resolved(exp) => Reference::Resolved(exp),
        })
    }
}

/// Role filter for member-scoped experience queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Participant,
    /// Owner or participant
    #[default]
    Any,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_without_experiences_gets_empty_list() {
        let user: User = serde_json::from_value(json!({
            "_id": "u1",
            "name": "Ada",
            "mail": "ada@example.com",
            "password": "pw",
            "comment": "",
            "experiencies": null
        }))
        .unwrap();
        assert!(user.experiences.is_empty());

        let user: User = serde_json::from_value(json!({"name": "Bob"})).unwrap();
        assert!(user.experiences.is_empty());
        assert!(!user.is_persisted());
    }

    #[test]
    fn test_mixed_references_deserialize() {
        let user: User = serde_json::from_value(json!({
            "_id": "u1",
            "name": "Ada",
            "experiencies": ["exp1", {"_id": "exp2", "description": "Climbing", "owner": "u1", "participants": []}]
        }))
        .unwrap();

        assert_eq!(user.experiences[0], Reference::Id("exp1".into()));
        assert!(user.experiences[1].is_resolved());
        assert_eq!(user.unresolved_ids().collect::<Vec<_>>(), vec![(0, "exp1")]);
    }

    #[test]
    fn test_resolved_reference_serializes_as_id() {
        let exp = Experience {
            id: Some("exp2".into()),
            ..Experience::new("Climbing", "u1")
        };
        let user = User::new("Ada", "ada@example.com", "pw")
            .with_reference("exp1".into())
            .with_reference(exp.into());

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["experiencies"], json!(["exp1", "exp2"]));
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn test_experience_keeps_extra_fields() {
        let exp: Experience = serde_json::from_value(json!({
            "_id": "exp1",
            "description": "Sailing",
            "owner": "u1",
            "participants": ["u2"],
            "date": "2024-05-01"
        }))
        .unwrap();

        assert_eq!(exp.extra["date"], "2024-05-01");
        assert!(exp.involves("u1", MemberRole::Owner));
        assert!(exp.involves("u2", MemberRole::Participant));
        assert!(!exp.involves("u2", MemberRole::Owner));
        assert!(!exp.involves("u3", MemberRole::Any));
    }
}
