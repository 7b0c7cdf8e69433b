use model::Role;

use crate::{AppError, Result};

/// Who is signed in and for which side of the app. Lives in memory only, a
/// restart always starts logged out.
#[derive(Debug, Clone, Default)]
pub struct Session {
    role: Option<Role>,
    email: Option<String>,
    offline: bool,
    role_lock: bool,
}

impl Session {
    pub fn new(role_lock: bool) -> Self {
        Self {
            role_lock,
            ..Default::default()
        }
    }

    /// Locks the session to `role`. While the role lock is active, a session
    /// already holding another role has to log out first.
    pub fn login(&mut self, role: Role) -> Result<()> {
        match self.role {
            Some(active) if active != role && self.role_lock => Err(AppError::RoleMismatch {
                active,
                requested: role,
            }),
            _ => {
                self.role = Some(role);
                Ok(())
            }
        }
    }

    /// Records who signed in and whether the gateway confirmed it.
    pub fn identify<S: Into<String>>(&mut self, email: S, offline: bool) {
        self.email = Some(email.into()).filter(|email: &String| !email.is_empty());
        self.offline = offline;
    }

    pub fn logout(&mut self) {
        self.role = None;
        self.email = None;
        self.offline = false;
    }

    pub fn current_role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_logged_in(&self) -> bool {
        self.role.is_some()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn role_lock(&self) -> bool {
        self.role_lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_logged_out() {
        let session = Session::new(true);
        assert!(!session.is_logged_in());
        assert_eq!(session.current_role(), None);
    }

    #[test]
    fn role_is_locked_until_logout() {
        let mut session = Session::new(true);
        session.login(Role::Passenger).unwrap();
        session.login(Role::Passenger).unwrap();

        assert!(matches!(
            session.login(Role::Volunteer),
            Err(AppError::RoleMismatch {
                active: Role::Passenger,
                requested: Role::Volunteer
            })
        ));
        assert_eq!(session.current_role(), Some(Role::Passenger));
    }

    #[test]
    fn logout_then_login_always_succeeds() {
        for (before, after) in [
            (Role::Passenger, Role::Volunteer),
            (Role::Volunteer, Role::Passenger),
            (Role::Volunteer, Role::Volunteer),
        ] {
            let mut session = Session::new(true);
            session.login(before).unwrap();
            session.identify("someone@example.org", true);
            session.logout();

            assert!(!session.is_offline());
            assert_eq!(session.email(), None);
            session.login(after).unwrap();
            assert_eq!(session.current_role(), Some(after));
        }
    }

    #[test]
    fn without_role_lock_login_switches_roles() {
        let mut session = Session::new(false);
        session.login(Role::Passenger).unwrap();
        session.login(Role::Volunteer).unwrap();
        assert_eq!(session.current_role(), Some(Role::Volunteer));
    }
}
