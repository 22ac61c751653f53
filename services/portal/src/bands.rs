//! Band management workflows
//!
//! Every mutation here changes what the backend reports as the user's
//! current band, so callers pass the outcome through
//! [`crate::session::SessionStore::after_mutation`].

use common::{ClientError, ClientResult};
use tracing::info;

use crate::backend::BandBackend;
use crate::models::{
    Band, BandMembership, BandUpdate, DashboardStats, Id, NewBand, NewMembership, User,
};
use crate::validation;

/// Band workflows on top of a backend
pub struct BandManager<B> {
    backend: B,
}

impl<B: BandBackend> BandManager<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub async fn list(&self) -> ClientResult<Vec<Band>> {
        self.backend.bands(None).await
    }

    /// Bands whose name matches; short terms return nothing without a request
    pub async fn search(&self, term: &str) -> ClientResult<Vec<Band>> {
        match validation::search_term(term) {
            Some(term) => self.backend.bands(Some(term)).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn show(&self, id: &Id) -> ClientResult<Band> {
        self.backend.band(id).await
    }

    /// Create a band with the signed-in user as its first member
    pub async fn create(&self, name: &str) -> ClientResult<Band> {
        validation::validate_band_name(name).map_err(ClientError::Validation)?;

        let band = self
            .backend
            .create_band(&NewBand {
                name: name.trim().to_string(),
                members: Vec::new(),
            })
            .await?;

        info!("Created band {} ({})", band.name, band.id);
        Ok(band)
    }

    pub async fn rename(&self, id: &Id, name: &str) -> ClientResult<Band> {
        validation::validate_band_name(name).map_err(ClientError::Validation)?;
        self.backend
            .update_band(
                id,
                &BandUpdate {
                    name: name.trim().to_string(),
                },
            )
            .await
    }

    pub async fn delete(&self, id: &Id) -> ClientResult<()> {
        self.backend.delete_band(id).await?;
        info!("Deleted band {}", id);
        Ok(())
    }

    pub async fn join(&self, id: &Id) -> ClientResult<()> {
        self.backend.join_band(id).await?;
        info!("Joined band {}", id);
        Ok(())
    }

    /// Membership records of `band`; records of other bands are dropped
    pub async fn members(&self, band: &Id) -> ClientResult<Vec<BandMembership>> {
        let mut memberships = self.backend.memberships(band).await?;
        memberships.retain(|m| &m.band == band);
        Ok(memberships)
    }

    /// Look up the single user with this national id who has no band yet
    pub async fn find_candidate(&self, national_id: &str) -> ClientResult<User> {
        let national_id = national_id.trim();
        if national_id.is_empty() {
            return Err(ClientError::Validation(
                "Enter a national id (RUT) to search for".to_string(),
            ));
        }

        let mut found = self.backend.users_by_national_id(national_id).await?;
        match found.len() {
            0 => Err(ClientError::NotFound(format!(
                "No user found with national id {}",
                national_id
            ))),
            1 => {
                let user = found.remove(0);
                if user.current_band.is_some() {
                    return Err(ClientError::Conflict(format!(
                        "{} already belongs to a band",
                        user.username
                    )));
                }
                Ok(user)
            }
            _ => Err(ClientError::Conflict(format!(
                "Several users share national id {}; please check it",
                national_id
            ))),
        }
    }

    pub async fn add_member(&self, band: &Id, user: &Id) -> ClientResult<BandMembership> {
        let membership = self
            .backend
            .add_membership(&NewMembership {
                band: band.clone(),
                user: user.clone(),
            })
            .await?;

        info!("Added user {} to band {}", user, band);
        Ok(membership)
    }

    /// Remove a user from a band through their membership record
    pub async fn remove_member(&self, band: &Id, user: &Id) -> ClientResult<()> {
        let memberships = self.members(band).await?;
        let membership = memberships
            .iter()
            .find(|m| &m.user.id == user)
            .ok_or_else(|| {
                ClientError::NotFound(format!("User {} is not a member of band {}", user, band))
            })?;

        self.backend.remove_membership(&membership.id).await?;
        info!("Removed user {} from band {}", user, band);
        Ok(())
    }

    /// Users whose name matches; short terms return nothing without a request
    pub async fn search_users(&self, term: &str) -> ClientResult<Vec<User>> {
        match validation::search_term(term) {
            Some(term) => self.backend.search_users(term).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn stats(&self) -> ClientResult<DashboardStats> {
        self.backend.dashboard_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::user;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeBands {
        requests: Arc<Mutex<Vec<String>>>,
        by_national_id: Arc<Mutex<Vec<User>>>,
        memberships: Arc<Mutex<Vec<BandMembership>>>,
    }

    impl FakeBands {
        fn log(&self, call: String) {
            self.requests.lock().unwrap().push(call);
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn band(id: u64, name: &str) -> Band {
        Band {
            id: Id::from(id),
            name: name.to_string(),
            members: vec![],
            created_at: None,
            is_approved: false,
        }
    }

    impl BandBackend for FakeBands {
        async fn bands(&self, search: Option<&str>) -> ClientResult<Vec<Band>> {
            self.log(format!("bands {:?}", search));
            Ok(vec![band(1, "Los Jaivas")])
        }

        async fn band(&self, id: &Id) -> ClientResult<Band> {
            self.log(format!("band {}", id));
            Ok(band(1, "Los Jaivas"))
        }

        async fn create_band(&self, new: &NewBand) -> ClientResult<Band> {
            self.log(format!("create {}", new.name));
            Ok(band(5, &new.name))
        }

        async fn update_band(&self, id: &Id, update: &BandUpdate) -> ClientResult<Band> {
            self.log(format!("update {} {}", id, update.name));
            Ok(band(5, &update.name))
        }

        async fn delete_band(&self, id: &Id) -> ClientResult<()> {
            self.log(format!("delete {}", id));
            Ok(())
        }

        async fn join_band(&self, id: &Id) -> ClientResult<()> {
            self.log(format!("join {}", id));
            Ok(())
        }

        async fn memberships(&self, band: &Id) -> ClientResult<Vec<BandMembership>> {
            self.log(format!("memberships {}", band));
            Ok(self.memberships.lock().unwrap().clone())
        }

        async fn add_membership(&self, membership: &NewMembership) -> ClientResult<BandMembership> {
            self.log(format!("add {} {}", membership.band, membership.user));
            Ok(BandMembership {
                id: Id::from(70u64),
                band: membership.band.clone(),
                user: User::from_id(membership.user.clone()),
                joined_at: None,
            })
        }

        async fn remove_membership(&self, id: &Id) -> ClientResult<()> {
            self.log(format!("remove {}", id));
            Ok(())
        }

        async fn users_by_national_id(&self, national_id: &str) -> ClientResult<Vec<User>> {
            self.log(format!("ruf {}", national_id));
            Ok(self.by_national_id.lock().unwrap().clone())
        }

        async fn search_users(&self, term: &str) -> ClientResult<Vec<User>> {
            self.log(format!("users {}", term));
            Ok(vec![])
        }

        async fn dashboard_stats(&self) -> ClientResult<DashboardStats> {
            Ok(DashboardStats {
                total_reservations: 0,
                upcoming_reservations: 0,
                band_count: 0,
            })
        }
    }

    #[tokio::test]
    async fn test_create_requires_a_name() {
        let backend = FakeBands::default();
        let manager = BandManager::new(backend.clone());

        assert!(matches!(manager.create("   ").await, Err(ClientError::Validation(_))));
        assert!(backend.requests().is_empty());

        let created = manager.create("  Congreso ").await.unwrap();
        assert_eq!(created.name, "Congreso");
        assert_eq!(backend.requests(), ["create Congreso"]);
    }

    #[tokio::test]
    async fn test_short_search_terms_skip_the_backend() {
        let backend = FakeBands::default();
        let manager = BandManager::new(backend.clone());

        assert!(manager.search("lo").await.unwrap().is_empty());
        assert!(manager.search_users(" a ").await.unwrap().is_empty());
        assert!(backend.requests().is_empty());

        assert_eq!(manager.search(" los ").await.unwrap().len(), 1);
        assert_eq!(backend.requests(), ["bands Some(\"los\")"]);
    }

    #[tokio::test]
    async fn test_find_candidate_rules() {
        let backend = FakeBands::default();
        let manager = BandManager::new(backend.clone());

        assert!(matches!(manager.find_candidate(" ").await, Err(ClientError::Validation(_))));
        assert!(matches!(
            manager.find_candidate("1-9").await,
            Err(ClientError::NotFound(_))
        ));

        *backend.by_national_id.lock().unwrap() = vec![user(3, "violeta", false), user(4, "parra", false)];
        assert!(matches!(
            manager.find_candidate("1-9").await,
            Err(ClientError::Conflict(_))
        ));

        let mut taken = user(3, "violeta", false);
        taken.current_band = Some(band(1, "Los Jaivas"));
        *backend.by_national_id.lock().unwrap() = vec![taken];
        assert!(matches!(
            manager.find_candidate("1-9").await,
            Err(ClientError::Conflict(_))
        ));

        *backend.by_national_id.lock().unwrap() = vec![user(3, "violeta", false)];
        assert_eq!(manager.find_candidate("1-9").await.unwrap().username, "violeta");
    }

    #[tokio::test]
    async fn test_remove_member_goes_through_membership() {
        let backend = FakeBands::default();
        *backend.memberships.lock().unwrap() = vec![BandMembership {
            id: Id::from(31u64),
            band: Id::from(1u64),
            user: user(3, "violeta", false),
            joined_at: None,
        }];
        let manager = BandManager::new(backend.clone());

        manager.remove_member(&Id::from(1u64), &Id::from(3u64)).await.unwrap();
        assert_eq!(backend.requests(), ["memberships 1", "remove 31"]);

        let err = manager
            .remove_member(&Id::from(1u64), &Id::from(8u64))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_memberships_of_other_bands_are_ignored() {
        let backend = FakeBands::default();
        *backend.memberships.lock().unwrap() = vec![
            BandMembership {
                id: Id::from(55u64),
                band: Id::from(2u64),
                user: user(3, "violeta", false),
                joined_at: None,
            },
            BandMembership {
                id: Id::from(31u64),
                band: Id::from(1u64),
                user: user(4, "parra", false),
                joined_at: None,
            },
        ];
        let manager = BandManager::new(backend.clone());

        let members = manager.members(&Id::from(1u64)).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user.username, "parra");

        let err = manager
            .remove_member(&Id::from(1u64), &Id::from(3u64))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
        assert!(!backend.requests().iter().any(|r| r.starts_with("remove")));
    }

    #[tokio::test]
    async fn test_rename_validates_name() {
        let backend = FakeBands::default();
        let manager = BandManager::new(backend.clone());

        assert!(manager.rename(&Id::from(5u64), "").await.is_err());
        let renamed = manager.rename(&Id::from(5u64), "Congreso II").await.unwrap();
        assert_eq!(renamed.name, "Congreso II");
        assert_eq!(backend.requests(), ["update 5 Congreso II"]);
    }
}
