use uuid::Uuid;

/// Who is asking. Staff bypass owner scoping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: Uuid,
    pub email: String,
    pub is_staff: bool,
}

impl Requester {
    pub fn can_see(&self, owner_id: Uuid) -> bool {
        self.is_staff || self.user_id == owner_id
    }

    /// Owner filter for list queries: staff may narrow to any user, everyone
    /// else is pinned to themselves.
    pub fn scope(&self, requested_user_id: Option<Uuid>) -> Option<Uuid> {
        if self.is_staff {
            requested_user_id
        } else {
            Some(self.user_id)
        }
    }
}
