use std::fmt;

use model::{Role, Screen};
use serde::Serialize;

use crate::{error::Denial, session::Session, AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// One of the two big "I need help" / "I want to help" buttons.
    RequestAccess(Role),
    ShowLogin,
    SelectLoginRole(Role),
    /// Sign in finished; the session already holds the role.
    Authenticated(Role),
    RouteReady,
    Cancel,
    Accept,
    Complete,
    Logout,
    GoHome,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Transition::RequestAccess(role) => write!(f, "open the {role} screen"),
            Transition::ShowLogin => write!(f, "show the login"),
            Transition::SelectLoginRole(role) => write!(f, "switch the login to {role}"),
            Transition::Authenticated(role) => write!(f, "sign in as {role}"),
            Transition::RouteReady => write!(f, "show a route"),
            Transition::Cancel => write!(f, "cancel"),
            Transition::Accept => write!(f, "accept a request"),
            Transition::Complete => write!(f, "complete a job"),
            Transition::Logout => write!(f, "log out"),
            Transition::GoHome => write!(f, "go home"),
        }
    }
}

/// Checks that `session` may see `screen`.
pub fn admit(session: &Session, screen: Screen) -> Result<()> {
    match (screen.required_role(), session.current_role()) {
        (None, _) => Ok(()),
        (Some(required), Some(active)) if required == active => Ok(()),
        (Some(required), Some(active)) => Err(AppError::AccessDenied(Denial::RoleLocked {
            active,
            requested: required,
        })),
        (Some(_), None) => Err(AppError::AccessDenied(Denial::NotLoggedIn)),
    }
}

/// Decides which single screen is visible. A rejected transition never
/// changes the screen.
#[derive(Debug, Clone)]
pub struct Navigator {
    screen: Screen,
    login_role: Role,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            screen: Screen::Home,
            login_role: Role::Passenger,
        }
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// The role tab preselected on the login form.
    pub fn login_role(&self) -> Role {
        self.login_role
    }

    /// The screen `transition` would lead to, without going there.
    pub fn preview(&self, session: &Session, transition: Transition) -> Result<Screen> {
        use Screen::*;

        let target = match (self.screen, transition) {
            (_, Transition::Logout) | (_, Transition::GoHome) => Home,
            (_, Transition::RequestAccess(role)) => match session.current_role() {
                None => Login,
                Some(active) if active == role => Screen::landing(role),
                Some(active) if session.role_lock() => {
                    return Err(AppError::AccessDenied(Denial::RoleLocked {
                        active,
                        requested: role,
                    }))
                }
                // re-authentication instead of a silent role switch
                Some(_) => Login,
            },
            (Home | Login, Transition::ShowLogin) if !session.is_logged_in() => Login,
            (Login, Transition::SelectLoginRole(_)) => Login,
            (Login, Transition::Authenticated(role)) => Screen::landing(role),
            (PassengerRequest, Transition::RouteReady) => PassengerConfirm,
            (PassengerRequest | PassengerConfirm, Transition::Cancel) => PassengerRequest,
            (VolunteerFeed, Transition::Accept) => VolunteerNavigate,
            (VolunteerNavigate, Transition::Complete) => VolunteerFeed,
            (from, transition) => {
                return Err(AppError::InvalidTransition { from, transition })
            }
        };

        admit(session, target)?;
        Ok(target)
    }

    pub fn apply(&mut self, session: &Session, transition: Transition) -> Result<Screen> {
        let target = self.preview(session, transition)?;
        match transition {
            Transition::RequestAccess(role) | Transition::SelectLoginRole(role)
                if target == Screen::Login =>
            {
                self.login_role = role;
            }
            _ => {}
        }
        if target != self.screen {
            log::debug!("Screen {} -> {}", self.screen, target);
        }
        self.screen = target;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logged_in(role: Role) -> Session {
        let mut session = Session::new(true);
        session.login(role).unwrap();
        session
    }

    #[test]
    fn starts_at_home() {
        assert_eq!(Navigator::new().screen(), Screen::Home);
    }

    #[test]
    fn unauthenticated_access_goes_to_login_with_role_tab() {
        let session = Session::new(true);
        let mut navigator = Navigator::new();

        let screen = navigator
            .apply(&session, Transition::RequestAccess(Role::Volunteer))
            .unwrap();

        assert_eq!(screen, Screen::Login);
        assert_eq!(navigator.login_role(), Role::Volunteer);

        navigator
            .apply(&session, Transition::SelectLoginRole(Role::Passenger))
            .unwrap();
        assert_eq!(navigator.login_role(), Role::Passenger);
    }

    #[test]
    fn unauthenticated_session_only_reaches_public_screens() {
        let session = Session::new(true);
        let mut navigator = Navigator::new();
        navigator.apply(&session, Transition::ShowLogin).unwrap();

        let result = navigator.apply(&session, Transition::Authenticated(Role::Passenger));
        assert!(matches!(
            result,
            Err(AppError::AccessDenied(Denial::NotLoggedIn))
        ));
        assert_eq!(navigator.screen(), Screen::Login);
    }

    #[test]
    fn cross_role_access_is_denied_and_screen_unchanged() {
        for (active, other) in [
            (Role::Passenger, Role::Volunteer),
            (Role::Volunteer, Role::Passenger),
        ] {
            let session = logged_in(active);
            let mut navigator = Navigator::new();
            navigator
                .apply(&session, Transition::RequestAccess(active))
                .unwrap();
            let before = navigator.screen();

            let result = navigator.apply(&session, Transition::RequestAccess(other));

            assert!(matches!(
                result,
                Err(AppError::AccessDenied(Denial::RoleLocked { .. }))
            ));
            assert_eq!(navigator.screen(), before);
        }
    }

    #[test]
    fn without_role_lock_cross_role_access_asks_to_sign_in() {
        let mut session = Session::new(false);
        session.login(Role::Passenger).unwrap();
        let mut navigator = Navigator::new();

        let screen = navigator
            .apply(&session, Transition::RequestAccess(Role::Volunteer))
            .unwrap();
        assert_eq!(screen, Screen::Login);
        assert_eq!(navigator.login_role(), Role::Volunteer);
    }

    #[test]
    fn passenger_round_trip() {
        let session = logged_in(Role::Passenger);
        let mut navigator = Navigator::new();

        let steps = [
            (Transition::RequestAccess(Role::Passenger), Screen::PassengerRequest),
            (Transition::RouteReady, Screen::PassengerConfirm),
            (Transition::Cancel, Screen::PassengerRequest),
            (Transition::Logout, Screen::Home),
        ];
        for (transition, expected) in steps {
            assert_eq!(navigator.apply(&session, transition).unwrap(), expected);
        }
    }

    #[test]
    fn volunteer_round_trip() {
        let session = logged_in(Role::Volunteer);
        let mut navigator = Navigator::new();
        navigator.apply(&session, Transition::ShowLogin).unwrap_err();

        let steps = [
            (Transition::RequestAccess(Role::Volunteer), Screen::VolunteerFeed),
            (Transition::Accept, Screen::VolunteerNavigate),
            (Transition::Complete, Screen::VolunteerFeed),
            (Transition::GoHome, Screen::Home),
        ];
        for (transition, expected) in steps {
            assert_eq!(navigator.apply(&session, transition).unwrap(), expected);
        }
    }

    #[test]
    fn transitions_outside_the_table_are_rejected() {
        let session = logged_in(Role::Volunteer);
        let mut navigator = Navigator::new();
        navigator
            .apply(&session, Transition::RequestAccess(Role::Volunteer))
            .unwrap();

        let result = navigator.apply(&session, Transition::Complete);
        assert!(matches!(
            result,
            Err(AppError::InvalidTransition {
                from: Screen::VolunteerFeed,
                transition: Transition::Complete
            })
        ));
        assert_eq!(navigator.screen(), Screen::VolunteerFeed);
    }

    #[test]
    fn logout_is_always_allowed() {
        let session = Session::new(true);
        let mut navigator = Navigator::new();
        assert_eq!(
            navigator.apply(&session, Transition::Logout).unwrap(),
            Screen::Home
        );
    }
}
