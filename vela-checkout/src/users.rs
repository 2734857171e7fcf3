use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimal profile kept for a registered customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

/// Registered-customer directory consulted at order creation.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<String, UserProfile>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self { users: HashMap::new() }
    }

    pub fn register(
        &mut self,
        user_id: impl Into<String>,
        profile: UserProfile,
    ) -> Result<(), UserError> {
        let user_id = user_id.into();
        if user_id.is_empty() {
            return Err(UserError::EmptyId);
        }
        if self.users.contains_key(&user_id) {
            return Err(UserError::AlreadyRegistered(user_id));
        }
        self.users.insert(user_id, profile);
        Ok(())
    }

    pub fn exists(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    pub fn get(&self, user_id: &str) -> Option<&UserProfile> {
        self.users.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user id must not be empty")]
    EmptyId,

    #[error("user already registered: {0}")]
    AlreadyRegistered(String),
}
