use model::{Role, Screen};
use serde::Serialize;

use crate::{
    effect::Operation,
    passenger::{LocationStatus, RoutePreview, SubmissionResult},
    volunteer::{FeedView, NavigationSession},
};

/// Everything a presentation layer needs to draw the current screen.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderState {
    pub screen: Screen,
    pub role: Option<Role>,
    pub email: Option<String>,
    pub offline: bool,
    /// Preselected tab of the login form.
    pub login_role: Role,
    /// Operations still waiting for an answer; their controls stay disabled.
    pub busy: Vec<Operation>,
    pub location: LocationStatus,
    pub suggestions: Vec<String>,
    pub route: Option<RoutePreview>,
    pub submission: Option<SubmissionResult>,
    pub feed: FeedView,
    pub navigation: Option<NavigationSession>,
}

impl RenderState {
    pub fn is_busy(&self, operation: Operation) -> bool {
        self.busy.contains(&operation)
    }
}
