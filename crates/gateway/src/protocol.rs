use std::fmt;

use model::{HelpRequest, HelpType, Role};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::Id;

/// A password on its way to the gateway. Never shows up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new<S: Into<String>>(password: S) -> Self {
        Self(password.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Body of a gateway call. The `action` field selects the operation.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GatewayRequest {
    Login {
        email: String,
        password: Password,
        role: Role,
    },
    Signup {
        email: String,
        password: Password,
        role: Role,
        name: String,
        phone: String,
    },
    RequestHelp {
        email: String,
        destination: String,
        #[serde(rename = "helpType")]
        help_type: HelpType,
        lat: f64,
        lng: f64,
    },
    GetRequests,
    CompleteRequest {
        email: Option<String>,
        id: Option<Id<HelpRequest>>,
        destination: String,
        lat: f64,
        lng: f64,
    },
}

impl GatewayRequest {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Signup { .. } => "signup",
            Self::RequestHelp { .. } => "request_help",
            Self::GetRequests => "get_requests",
            Self::CompleteRequest { .. } => "complete_request",
        }
    }

    pub fn complete(request: &HelpRequest, volunteer: Option<String>) -> Self {
        Self::CompleteRequest {
            email: volunteer,
            id: request.id.clone(),
            destination: request.destination.clone(),
            lat: request.coordinates.lat,
            lng: request.coordinates.lng,
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GatewayResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub requests: Option<Vec<HelpRequest>>,
}

impl GatewayResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            requests: None,
        }
    }

    pub fn with_requests(requests: Vec<HelpRequest>) -> Self {
        Self {
            success: true,
            error: None,
            requests: Some(requests),
        }
    }

    /// The reason the gateway gave for refusing the call, if it refused.
    pub fn rejection(&self) -> Option<String> {
        if self.success {
            None
        } else {
            Some(
                self.error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_owned()),
            )
        }
    }
}

/// JSON schema of every request the client may send, for documenting the
/// gateway contract.
pub fn request_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(GatewayRequest)
}
