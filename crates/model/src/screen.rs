use std::fmt;

use serde::Serialize;

use crate::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Home,
    Login,
    PassengerRequest,
    PassengerConfirm,
    VolunteerFeed,
    VolunteerNavigate,
}

impl Screen {
    /// The role a session must hold to see this screen, `None` for public
    /// screens.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Self::Home | Self::Login => None,
            Self::PassengerRequest | Self::PassengerConfirm => Some(Role::Passenger),
            Self::VolunteerFeed | Self::VolunteerNavigate => Some(Role::Volunteer),
        }
    }

    /// The screen a role lands on after signing in.
    pub fn landing(role: Role) -> Self {
        match role {
            Role::Passenger => Self::PassengerRequest,
            Role::Volunteer => Self::VolunteerFeed,
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Home => "home",
            Self::Login => "login",
            Self::PassengerRequest => "passenger request",
            Self::PassengerConfirm => "passenger confirm",
            Self::VolunteerFeed => "volunteer feed",
            Self::VolunteerNavigate => "volunteer navigate",
        };
        f.write_str(name)
    }
}
