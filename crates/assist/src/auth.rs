use std::sync::Arc;

use async_trait::async_trait;
use gateway::{Gateway, GatewayRequest, GatewayResponse, Password};
use model::Role;
use serde::Serialize;

use crate::effect::{Effect, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Login,
    Signup,
}

/// What the user typed into the login form.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: Password,
    pub role: Role,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl AuthForm {
    pub fn login<E, P>(role: Role, email: E, password: P) -> Self
    where
        E: Into<String>,
        P: Into<String>,
    {
        Self {
            mode: AuthMode::Login,
            email: email.into(),
            password: Password::new(password),
            role,
            name: None,
            phone: None,
        }
    }

    pub fn signup<E, P>(role: Role, email: E, password: P) -> Self
    where
        E: Into<String>,
        P: Into<String>,
    {
        Self {
            mode: AuthMode::Signup,
            ..Self::login(role, email, password)
        }
    }

    pub fn with_contact(mut self, name: Option<String>, phone: Option<String>) -> Self {
        self.name = name;
        self.phone = phone;
        self
    }

    pub fn to_request(&self) -> GatewayRequest {
        match self.mode {
            AuthMode::Login => GatewayRequest::Login {
                email: self.email.clone(),
                password: self.password.clone(),
                role: self.role,
            },
            AuthMode::Signup => GatewayRequest::Signup {
                email: self.email.clone(),
                password: self.password.clone(),
                role: self.role,
                name: self.name.clone().unwrap_or_default(),
                phone: self.phone.clone().unwrap_or_default(),
            },
        }
    }
}

/// A finished sign in, as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub role: Role,
    pub mode: AuthMode,
    /// The gateway could not be reached and the login went ahead anyway.
    pub offline: bool,
}

pub struct AuthTask {
    pub(crate) ticket: Ticket,
    pub(crate) gateway: Arc<dyn Gateway>,
    pub(crate) form: AuthForm,
}

pub struct AuthOutput {
    pub form: AuthForm,
    pub response: gateway::Result<GatewayResponse>,
}

#[async_trait]
impl Effect for AuthTask {
    type Output = AuthOutput;

    fn ticket(&self) -> Ticket {
        self.ticket
    }

    async fn run(self) -> AuthOutput {
        let request = self.form.to_request();
        log::info!("Sending {} for {}", request.action(), self.form.email);
        let response = self.gateway.send(request).await;
        AuthOutput {
            form: self.form,
            response,
        }
    }
}
