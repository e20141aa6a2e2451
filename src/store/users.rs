use super::TaskStore;
use crate::error::{PrepError, Result};
use crate::model::{NewUser, User, UserId, UserPatch};
use crate::time::Stamp;
use tracing::info;

impl TaskStore {
    /// Register a user on first contact. An already known user is returned
    /// unchanged and nothing is written.
    pub fn add_user(&mut self, new_user: NewUser) -> Result<User> {
        if new_user.username.trim().is_empty() {
            return Err(PrepError::Validation("username is required".to_owned()));
        }
        if let Some(existing) = self.state.users.get(&new_user.id) {
            return Ok(existing.clone());
        }

        let created_at = Stamp::at(&self.now());
        let user = new_user.into_user(created_at);
        let id = user.id;
        let user = self.transact(move |state, _| {
            state.users.insert(id, user.clone());
            Ok(user)
        })?;
        info!(user_id = id, "user registered");
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.state.users.get(&id)
    }

    pub fn update_user(&mut self, id: UserId, patch: UserPatch) -> Result<User> {
        if !self.state.users.contains_key(&id) {
            return Err(PrepError::user_not_found(id));
        }
        self.transact(|state, _| {
            let user = state
                .users
                .get_mut(&id)
                .ok_or_else(|| PrepError::user_not_found(id))?;
            patch.apply(user);
            Ok(user.clone())
        })
    }

    pub fn users(&self) -> Vec<User> {
        self.state.users.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use crate::error::PrepError;
    use crate::model::{Language, NewUser, UserPatch};
    use crate::store::test_support::fixture;

    fn new_user(id: i64, name: &str) -> NewUser {
        serde_json::from_value(serde_json::json!({
            "telegram_id": id,
            "username": name,
            "first_name": name,
        }))
        .unwrap()
    }

    #[test]
    fn add_user_is_create_if_absent() {
        let mut fx = fixture();
        let first = fx.store.add_user(new_user(5, "olga")).unwrap();
        let saves = fx.backend.save_count();

        let again = fx.store.add_user(new_user(5, "someone-else")).unwrap();
        assert_eq!(again, first);
        assert_eq!(fx.backend.save_count(), saves);
        assert_eq!(fx.store.users().len(), 1);
    }

    #[test]
    fn blank_username_is_rejected() {
        let mut fx = fixture();
        let saves = fx.backend.save_count();
        let err = fx.store.add_user(new_user(5, "  ")).unwrap_err();
        assert!(matches!(err, PrepError::Validation(_)));
        assert!(fx.store.users().is_empty());
        assert_eq!(fx.backend.save_count(), saves);
    }

    #[test]
    fn update_user_patches_in_place() {
        let mut fx = fixture();
        fx.store.add_user(new_user(5, "olga")).unwrap();
        let patch = UserPatch {
            language: Some(Language::En),
            ..UserPatch::default()
        };
        let updated = fx.store.update_user(5, patch).unwrap();
        assert_eq!(updated.language, Language::En);
        assert_eq!(updated.username, "olga");
        assert_eq!(fx.backend.saved().users[&5].language, Language::En);
    }

    #[test]
    fn update_unknown_user_is_not_found() {
        let mut fx = fixture();
        assert!(fx.store.update_user(99, UserPatch::default()).is_err());
    }
}
