use std::{collections::HashMap, sync::Arc};

use gateway::{Gateway, GatewayRequest, GatewayResponse, HttpGateway};
use mapping::{MappingProvider, OsmProvider};
use model::{HelpType, Role, Screen};
use tokio_util::sync::CancellationToken;

use crate::{
    auth::{AuthForm, AuthOutcome, AuthOutput, AuthTask},
    config::AssistConfig,
    effect::{Effect, Operation, Ticket},
    location::{LocationError, LocationProvider, PositionSource},
    navigator::{admit, Navigator, Transition},
    passenger::{
        LocateOutput, LocateTask, LocationStatus, PassengerFlow, RoutePreview, RouteTask,
        SubmissionResult, SubmitTask, SuggestTask,
    },
    render::RenderState,
    session::Session,
    volunteer::{
        AcceptTask, CompleteTask, Completion, FeedView, NavigationSession, RefreshTask,
        VolunteerFeed,
    },
    AppError, Result,
};


/// Handles to the outside world. Cheap to clone into effects.
#[derive(Clone)]
pub struct Services {
    pub gateway: Arc<dyn Gateway>,
    pub mapping: Arc<dyn MappingProvider>,
    pub location: Arc<LocationProvider>,
}

impl Services {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        mapping: Arc<dyn MappingProvider>,
        location: Arc<LocationProvider>,
    ) -> Self {
        Self {
            gateway,
            mapping,
            location,
        }
    }

    /// The HTTP gateway and the OpenStreetMap adapter as configured.
    pub fn connect(config: &AssistConfig, position: Arc<dyn PositionSource>) -> Result<Self> {
        let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::new(&config.gateway)?);
        let mapping: Arc<dyn MappingProvider> = Arc::new(OsmProvider::new(&config.osm)?);
        let location = Arc::new(LocationProvider::new(
            position,
            mapping.clone(),
            config.location_settings(),
        ));
        Ok(Self::new(gateway, mapping, location))
    }
}

/// The whole client state. Every mutation goes through `&mut self`, so a
/// single owner serializes all updates.
///
/// Operations that wait for the network come in two halves: `begin_*` checks
/// the gates and hands out an effect, `finish_*` applies the effect's output.
/// The async methods of the same name run both halves in one go.
pub struct App {
    config: AssistConfig,
    services: Services,
    session: Session,
    navigator: Navigator,
    passenger: PassengerFlow,
    volunteer: VolunteerFeed,
    in_flight: HashMap<Operation, u64>,
    next_serial: u64,
    location_cancel: CancellationToken,
    refresh_requested: bool,
}

impl App {
    pub fn new(config: AssistConfig, services: Services) -> Self {
        Self {
            session: Session::new(config.features.role_lock),
            config,
            services,
            navigator: Navigator::new(),
            passenger: PassengerFlow::default(),
            volunteer: VolunteerFeed::default(),
            in_flight: HashMap::new(),
            next_serial: 0,
            location_cancel: CancellationToken::new(),
            refresh_requested: false,
        }
    }

    pub fn config(&self) -> &AssistConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn screen(&self) -> Screen {
        self.navigator.screen()
    }

    pub fn passenger(&self) -> &PassengerFlow {
        &self.passenger
    }

    pub fn volunteer(&self) -> &VolunteerFeed {
        &self.volunteer
    }

    pub fn busy(&self) -> Vec<Operation> {
        let mut busy: Vec<_> = self.in_flight.keys().copied().collect();
        busy.sort();
        busy
    }

    pub fn render(&self) -> RenderState {
        RenderState {
            screen: self.navigator.screen(),
            role: self.session.current_role(),
            email: self.session.email().map(str::to_owned),
            offline: self.session.is_offline(),
            login_role: self.navigator.login_role(),
            busy: self.busy(),
            location: self.passenger.location.clone(),
            suggestions: self.passenger.suggestions.clone(),
            route: self.passenger.preview.clone(),
            submission: self.passenger.submission.clone(),
            feed: self.volunteer.view.clone(),
            navigation: self.volunteer.navigation.clone(),
        }
    }

    /// Whether the feed should be fetched again. Cleared by reading it.
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    fn start(&mut self, operation: Operation) -> Result<Ticket> {
        if self.in_flight.contains_key(&operation) {
            return Err(AppError::Busy(operation));
        }
        self.next_serial += 1;
        self.in_flight.insert(operation, self.next_serial);
        Ok(Ticket {
            operation,
            serial: self.next_serial,
        })
    }

    /// Retires `ticket`. Fails with `Cancelled` if it was invalidated in the
    /// meantime, in which case the result must be dropped.
    fn settle(&mut self, ticket: Ticket) -> Result<()> {
        if self.in_flight.get(&ticket.operation) == Some(&ticket.serial) {
            self.in_flight.remove(&ticket.operation);
            Ok(())
        } else {
            log::debug!("Dropping stale result of '{}'.", ticket.operation);
            Err(AppError::Cancelled)
        }
    }

    /// Frees the slot of an effect that never produced a result.
    pub(crate) fn release(&mut self, ticket: Ticket) {
        if self.in_flight.get(&ticket.operation) == Some(&ticket.serial) {
            self.in_flight.remove(&ticket.operation);
        }
    }

    fn invalidate(&mut self, operations: &[Operation]) {
        for operation in operations {
            self.in_flight.remove(operation);
        }
    }

    fn cancel_location(&mut self) {
        self.location_cancel.cancel();
        self.location_cancel = CancellationToken::new();
    }

    /// Checks the role gate of `screen`, then that it is the visible one.
    fn require(&self, screen: Screen, operation: Operation) -> Result<()> {
        admit(&self.session, screen)?;
        let current = self.navigator.screen();
        if current != screen {
            return Err(AppError::NotOnScreen {
                operation,
                screen: current,
            });
        }
        Ok(())
    }

    pub fn request_access(&mut self, role: Role) -> Result<Screen> {
        let screen = self
            .navigator
            .apply(&self.session, Transition::RequestAccess(role))?;
        if screen == Screen::VolunteerFeed {
            self.refresh_requested = true;
        }
        Ok(screen)
    }

    pub fn show_login(&mut self) -> Result<Screen> {
        self.navigator.apply(&self.session, Transition::ShowLogin)
    }

    pub fn select_login_role(&mut self, role: Role) -> Result<Screen> {
        self.navigator
            .apply(&self.session, Transition::SelectLoginRole(role))
    }

    pub fn go_home(&mut self) -> Result<Screen> {
        let screen = self.navigator.apply(&self.session, Transition::GoHome)?;
        if let Some(navigation) = self.volunteer.navigation.take() {
            log::info!(
                "Left the way to '{}' unfinished.",
                navigation.request.content.destination
            );
        }
        Ok(screen)
    }

    /// Forgets the session and everything shown for it. Results of
    /// operations still running are dropped when they arrive.
    pub fn logout(&mut self) -> Result<Screen> {
        if let Some(role) = self.session.current_role() {
            log::info!("Logging out {role}.");
        }
        self.session.logout();
        self.passenger = PassengerFlow::default();
        self.volunteer = VolunteerFeed::default();
        self.in_flight.clear();
        self.cancel_location();
        self.refresh_requested = false;
        self.navigator.apply(&self.session, Transition::Logout)
    }

    /// Back to the destination form. A submission already on its way is not
    /// recalled.
    pub fn cancel(&mut self) -> Result<Screen> {
        let screen = self.navigator.apply(&self.session, Transition::Cancel)?;
        self.passenger.discard_preview();
        self.invalidate(&[Operation::Route, Operation::Locate]);
        self.cancel_location();
        Ok(screen)
    }

    pub fn begin_authenticate(&mut self, form: AuthForm) -> Result<AuthTask> {
        self.require(Screen::Login, Operation::Authenticate)?;
        let ticket = self.start(Operation::Authenticate)?;
        Ok(AuthTask {
            ticket,
            gateway: self.services.gateway.clone(),
            form,
        })
    }

    pub fn finish_authenticate(&mut self, ticket: Ticket, output: AuthOutput) -> Result<AuthOutcome> {
        self.settle(ticket)?;
        let AuthOutput { form, response } = output;

        let offline = match response {
            Ok(response) => match response.rejection() {
                Some(why) => {
                    log::warn!("Gateway refused {}: {why}", form.email);
                    return Err(AppError::Rejected(why));
                }
                None => false,
            },
            Err(why) if self.config.offline_login => {
                log::warn!("Gateway unreachable ({why}), signing {} in offline.", form.email);
                true
            }
            Err(why) => return Err(why.into()),
        };

        let previous = self.session.current_role();
        let mut session = self.session.clone();
        session.login(form.role)?;
        session.identify(form.email.as_str(), offline);

        if previous.is_some_and(|previous| previous != form.role) {
            self.passenger = PassengerFlow::default();
            self.volunteer = VolunteerFeed::default();
        }
        self.session = session;
        log::info!("Signed in {} as {}.", form.email, form.role);

        // the gateway already knows the account, so the session holds even
        // when the user left the login form in the meantime
        match self
            .navigator
            .apply(&self.session, Transition::Authenticated(form.role))
        {
            Ok(_) if form.role == Role::Volunteer => self.refresh_requested = true,
            Ok(_) => {}
            Err(why) => log::info!(
                "Staying on {} after signing in: {why}",
                self.navigator.screen()
            ),
        }

        Ok(AuthOutcome {
            role: form.role,
            mode: form.mode,
            offline,
        })
    }

    pub fn begin_locate(&mut self) -> Result<LocateTask> {
        self.require(Screen::PassengerRequest, Operation::Locate)?;
        let ticket = self.start(Operation::Locate)?;
        Ok(LocateTask {
            ticket,
            location: self.services.location.clone(),
            cancel: self.location_cancel.clone(),
        })
    }

    pub fn finish_locate(&mut self, ticket: Ticket, output: LocateOutput) -> Result<LocationStatus> {
        self.settle(ticket)?;
        match output {
            Ok(status) => {
                self.passenger.location = status.clone();
                Ok(status)
            }
            // an interrupted lookup says nothing about where the passenger is
            Err(why @ (LocationError::Busy | LocationError::Cancelled)) => Err(why.into()),
            Err(why) => {
                self.passenger.location = LocationStatus::Failed {
                    reason: why.to_string(),
                };
                Err(why.into())
            }
        }
    }

    pub fn begin_initiate(&mut self, destination: &str) -> Result<RouteTask> {
        self.navigator
            .preview(&self.session, Transition::RouteReady)?;
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(AppError::EmptyDestination);
        }
        let origin = self
            .passenger
            .coordinates()
            .ok_or(AppError::MissingLocation)?;
        let ticket = self.start(Operation::Route)?;
        Ok(RouteTask {
            ticket,
            mapping: self.services.mapping.clone(),
            origin,
            destination: destination.to_owned(),
            alternatives: self.config.features.route_alternatives,
        })
    }

    pub fn finish_initiate(
        &mut self,
        ticket: Ticket,
        output: Result<RoutePreview>,
    ) -> Result<RoutePreview> {
        self.settle(ticket)?;
        let preview = output?;
        self.navigator
            .apply(&self.session, Transition::RouteReady)?;
        log::info!(
            "Route to '{}' by {:?}: {} option(s).",
            preview.destination,
            preview.route.mode,
            preview.route.routes.len()
        );
        self.passenger.preview = Some(preview.clone());
        self.passenger.submission = None;
        Ok(preview)
    }

    /// Looks up completions for `partial`. A newer lookup replaces one still
    /// running instead of waiting for it.
    pub fn begin_suggest(&mut self, partial: &str) -> Result<SuggestTask> {
        self.require(Screen::PassengerRequest, Operation::Suggest)?;
        self.invalidate(&[Operation::Suggest]);
        let ticket = self.start(Operation::Suggest)?;
        Ok(SuggestTask {
            ticket,
            mapping: self.services.mapping.clone(),
            partial: partial.to_owned(),
        })
    }

    pub fn finish_suggest(
        &mut self,
        ticket: Ticket,
        output: Result<Vec<String>>,
    ) -> Result<Vec<String>> {
        self.settle(ticket)?;
        match output {
            Ok(suggestions) => {
                self.passenger.suggestions = suggestions.clone();
                Ok(suggestions)
            }
            Err(why) => {
                log::warn!("No destination suggestions: {why}");
                self.passenger.suggestions.clear();
                Err(why)
            }
        }
    }

    pub fn begin_confirm(&mut self, help_type: HelpType) -> Result<SubmitTask> {
        self.require(Screen::PassengerConfirm, Operation::Submit)?;
        let preview = self
            .passenger
            .preview
            .as_ref()
            .ok_or(AppError::MissingLocation)?;
        let request = GatewayRequest::RequestHelp {
            email: self.session.email().unwrap_or("Guest").to_owned(),
            destination: preview.destination.clone(),
            help_type,
            lat: preview.origin.lat,
            lng: preview.origin.lng,
        };
        let ticket = self.start(Operation::Submit)?;
        Ok(SubmitTask {
            ticket,
            gateway: self.services.gateway.clone(),
            request,
        })
    }

    pub fn finish_confirm(
        &mut self,
        ticket: Ticket,
        result: SubmissionResult,
    ) -> Result<SubmissionResult> {
        self.settle(ticket)?;
        if self.navigator.screen() != Screen::PassengerConfirm {
            log::debug!("Submission answered after leaving the confirmation.");
            return Ok(result);
        }
        if result.ok {
            log::info!("Help request submitted.");
        } else if self.config.rollback_on_submit_failure {
            self.navigator.apply(&self.session, Transition::Cancel)?;
            self.passenger.preview = None;
        }
        self.passenger.submission = Some(result.clone());
        Ok(result)
    }

    pub fn begin_refresh(&mut self) -> Result<RefreshTask> {
        self.require(Screen::VolunteerFeed, Operation::Refresh)?;
        let ticket = self.start(Operation::Refresh)?;
        self.refresh_requested = false;
        Ok(RefreshTask {
            ticket,
            gateway: self.services.gateway.clone(),
        })
    }

    pub fn finish_refresh(
        &mut self,
        ticket: Ticket,
        output: gateway::Result<GatewayResponse>,
    ) -> Result<FeedView> {
        self.settle(ticket)?;
        let response = match output {
            Ok(response) => response,
            Err(why) => {
                log::warn!("Could not load requests: {why}");
                self.volunteer.view = FeedView::Unavailable(why.to_string());
                return Err(why.into());
            }
        };
        if let Some(why) = response.rejection() {
            self.volunteer.view = FeedView::Unavailable(why.clone());
            return Err(AppError::Rejected(why));
        }
        self.volunteer.view = FeedView::from_requests(response.requests.unwrap_or_default());
        log::debug!("{} open request(s).", self.volunteer.view.requests().len());
        Ok(self.volunteer.view.clone())
    }

    pub fn begin_accept(&mut self, index: usize) -> Result<AcceptTask> {
        self.require(Screen::VolunteerFeed, Operation::Accept)?;
        let request = self
            .volunteer
            .view
            .requests()
            .get(index)
            .cloned()
            .ok_or(AppError::NoSuchRequest(index))?;
        self.navigator.preview(&self.session, Transition::Accept)?;
        let ticket = self.start(Operation::Accept)?;
        Ok(AcceptTask {
            ticket,
            location: self.services.location.clone(),
            mapping: self.services.mapping.clone(),
            cancel: self.location_cancel.clone(),
            request,
        })
    }

    pub fn finish_accept(
        &mut self,
        ticket: Ticket,
        output: Result<NavigationSession>,
    ) -> Result<NavigationSession> {
        self.settle(ticket)?;
        let navigation = output?;
        self.navigator.apply(&self.session, Transition::Accept)?;
        log::info!(
            "Navigating to '{}', {:.1} km away.",
            navigation.request.content.destination,
            navigation.request.distance_km
        );
        self.volunteer.navigation = Some(navigation.clone());
        Ok(navigation)
    }

    /// Ends the navigation right away. Only the optional report to the
    /// gateway runs as an effect.
    pub fn begin_complete(&mut self) -> Result<CompleteTask> {
        self.require(Screen::VolunteerNavigate, Operation::Complete)?;
        let request = self
            .volunteer
            .navigation
            .as_ref()
            .map(|navigation| navigation.request.content.clone())
            .ok_or(AppError::InvalidTransition {
                from: Screen::VolunteerNavigate,
                transition: Transition::Complete,
            })?;
        self.navigator
            .preview(&self.session, Transition::Complete)?;
        let ticket = self.start(Operation::Complete)?;

        self.volunteer.navigation = None;
        self.navigator
            .apply(&self.session, Transition::Complete)?;
        self.refresh_requested = true;

        Ok(CompleteTask {
            ticket,
            gateway: self
                .config
                .notify_completion
                .then(|| self.services.gateway.clone()),
            volunteer: self.session.email().map(str::to_owned),
            request,
        })
    }

    pub fn finish_complete(&mut self, ticket: Ticket, completion: Completion) -> Result<Completion> {
        self.settle(ticket)?;
        log::info!("Completed '{}'.", completion.request.destination);
        Ok(completion)
    }

    pub async fn authenticate(&mut self, form: AuthForm) -> Result<AuthOutcome> {
        let task = self.begin_authenticate(form)?;
        let ticket = task.ticket();
        let output = task.run().await;
        self.finish_authenticate(ticket, output)
    }

    pub async fn locate(&mut self) -> Result<LocationStatus> {
        let task = self.begin_locate()?;
        let ticket = task.ticket();
        let output = task.run().await;
        self.finish_locate(ticket, output)
    }

    pub async fn initiate(&mut self, destination: &str) -> Result<RoutePreview> {
        let task = self.begin_initiate(destination)?;
        let ticket = task.ticket();
        let output = task.run().await;
        self.finish_initiate(ticket, output)
    }

    pub async fn suggest(&mut self, partial: &str) -> Result<Vec<String>> {
        let task = self.begin_suggest(partial)?;
        let ticket = task.ticket();
        let output = task.run().await;
        self.finish_suggest(ticket, output)
    }

    pub async fn confirm(&mut self, help_type: HelpType) -> Result<SubmissionResult> {
        let task = self.begin_confirm(help_type)?;
        let ticket = task.ticket();
        let output = task.run().await;
        self.finish_confirm(ticket, output)
    }

    pub async fn refresh(&mut self) -> Result<FeedView> {
        let task = self.begin_refresh()?;
        let ticket = task.ticket();
        let output = task.run().await;
        self.finish_refresh(ticket, output)
    }

    pub async fn accept(&mut self, index: usize) -> Result<NavigationSession> {
        let task = self.begin_accept(index)?;
        let ticket = task.ticket();
        let output = task.run().await;
        self.finish_accept(ticket, output)
    }

    pub async fn complete(&mut self) -> Result<Completion> {
        let task = self.begin_complete()?;
        let ticket = task.ticket();
        let output = task.run().await;
        self.finish_complete(ticket, output)
    }

    /// Runs the feed refresh that landing on, or returning to, the feed asked
    /// for. `None` when nothing was pending.
    pub async fn run_follow_ups(&mut self) -> Option<Result<FeedView>> {
        if !self.take_refresh_request() {
            return None;
        }
        Some(self.refresh().await)
    }
}
