use std::fmt;

use crate::Error;

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is looking at the thread, as told by the identity provider
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Viewer {
    pub user: Option<UserId>,
}

impl Viewer {
    pub fn anonymous() -> Viewer {
        Viewer { user: None }
    }

    pub fn signed_in(user: UserId) -> Viewer {
        Viewer { user: Some(user) }
    }

    pub fn id(&self) -> Result<&UserId, Error> {
        self.user.as_ref().ok_or(Error::NotAuthenticated)
    }

    pub fn is(&self, user: &UserId) -> bool {
        self.user.as_ref() == Some(user)
    }
}

/// Owner context sent along a deletion, as `?userId=..&ownerId=..`
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteContext {
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_identity() {
        let alice = UserId(String::from("alice"));
        assert_eq!(Viewer::anonymous().id(), Err(Error::NotAuthenticated));
        assert!(!Viewer::anonymous().is(&alice));

        let v = Viewer::signed_in(alice.clone());
        assert_eq!(v.id(), Ok(&alice));
        assert!(v.is(&alice));
        assert!(!v.is(&UserId(String::from("bob"))));
    }
}
