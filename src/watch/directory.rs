use std::collections::HashMap;

use super::User;

/// Read-only user lookup built once per scan snapshot.
///
/// Messages reference their author by internal id while watch words reference
/// their owner by external id, so both directions are indexed.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
    by_internal: HashMap<String, usize>,
    by_external: HashMap<String, usize>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        let mut by_internal = HashMap::with_capacity(users.len());
        let mut by_external = HashMap::with_capacity(users.len());
        for (idx, user) in users.iter().enumerate() {
            // Last entry wins on duplicate keys
            by_internal.insert(user.internal_id.clone(), idx);
            by_external.insert(user.external_id.clone(), idx);
        }
        Self {
            users,
            by_internal,
            by_external,
        }
    }

    pub fn by_internal_id(&self, internal_id: &str) -> Option<&User> {
        self.by_internal.get(internal_id).map(|&idx| &self.users[idx])
    }

    pub fn by_external_id(&self, external_id: &str) -> Option<&User> {
        self.by_external.get(external_id).map(|&idx| &self.users[idx])
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
