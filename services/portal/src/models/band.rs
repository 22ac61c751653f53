//! Band and membership models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{Id, User};

/// Band entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub id: Id,
    pub name: String,
    #[serde(default, deserialize_with = "members")]
    pub members: Vec<User>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Set by an administrator on the backend
    #[serde(default)]
    pub is_approved: bool,
}

/// Membership record linking a user to a band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandMembership {
    pub id: Id,
    pub band: Id,
    pub user: User,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

/// New band creation payload
#[derive(Debug, Clone, Serialize)]
pub struct NewBand {
    pub name: String,
    pub members: Vec<Id>,
}

/// Band update payload
#[derive(Debug, Clone, Serialize)]
pub struct BandUpdate {
    pub name: String,
}

/// New membership payload
#[derive(Debug, Clone, Serialize)]
pub struct NewMembership {
    pub band: Id,
    pub user: Id,
}

/// Members arrive as bare ids, membership records or plain users
#[derive(Deserialize)]
#[serde(untagged)]
enum MemberRepr {
    Membership { user: User },
    Profile(User),
    Key(Id),
}

fn members<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<User>, D::Error> {
    let raw = Option::<Vec<MemberRepr>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|member| match member {
            MemberRepr::Membership { user } | MemberRepr::Profile(user) => user,
            MemberRepr::Key(id) => User::from_id(id),
        })
        .collect())
}
