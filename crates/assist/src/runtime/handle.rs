use model::{HelpType, Role, Screen};
use tokio::sync::{mpsc, oneshot};

use super::{Command, Message, Responder};
use crate::{
    auth::{AuthForm, AuthOutcome},
    passenger::{LocationStatus, RoutePreview, SubmissionResult},
    render::RenderState,
    volunteer::{Completion, FeedView, NavigationSession},
    AppError, Result,
};

/// Sends commands to a running app. Once every handle is dropped the app
/// stops.
#[derive(Clone)]
pub struct AppHandle {
    mailbox: mpsc::Sender<Message>,
}

/// Does not keep the app alive.
#[derive(Clone)]
pub struct WeakAppHandle {
    mailbox: mpsc::WeakSender<Message>,
}

impl WeakAppHandle {
    pub fn upgrade(&self) -> Option<AppHandle> {
        self.mailbox.upgrade().map(|mailbox| AppHandle { mailbox })
    }
}

impl AppHandle {
    pub(super) fn new(mailbox: mpsc::Sender<Message>) -> Self {
        Self { mailbox }
    }

    pub fn downgrade(&self) -> WeakAppHandle {
        WeakAppHandle {
            mailbox: self.mailbox.downgrade(),
        }
    }

    async fn ask<T, F>(&self, command: F) -> Result<T>
    where
        F: FnOnce(Responder<T>) -> Command,
    {
        let (tx, rx) = oneshot::channel();
        self.mailbox
            .send(Message::Command(command(Responder::new(tx))))
            .await
            .map_err(|_| AppError::Stopped)?;
        rx.await.map_err(|_| AppError::Stopped)?
    }

    pub async fn request_access(&self, role: Role) -> Result<Screen> {
        self.ask(|tx| Command::RequestAccess(role, tx)).await
    }

    pub async fn show_login(&self) -> Result<Screen> {
        self.ask(Command::ShowLogin).await
    }

    pub async fn select_login_role(&self, role: Role) -> Result<Screen> {
        self.ask(|tx| Command::SelectLoginRole(role, tx)).await
    }

    pub async fn go_home(&self) -> Result<Screen> {
        self.ask(Command::GoHome).await
    }

    pub async fn logout(&self) -> Result<Screen> {
        self.ask(Command::Logout).await
    }

    pub async fn authenticate(&self, form: AuthForm) -> Result<AuthOutcome> {
        self.ask(|tx| Command::Authenticate(form, tx)).await
    }

    pub async fn locate(&self) -> Result<LocationStatus> {
        self.ask(Command::Locate).await
    }

    pub async fn initiate<S: Into<String>>(&self, destination: S) -> Result<RoutePreview> {
        let destination = destination.into();
        self.ask(|tx| Command::Initiate(destination, tx)).await
    }

    pub async fn suggest<S: Into<String>>(&self, partial: S) -> Result<Vec<String>> {
        let partial = partial.into();
        self.ask(|tx| Command::Suggest(partial, tx)).await
    }

    pub async fn confirm(&self, help_type: HelpType) -> Result<SubmissionResult> {
        self.ask(|tx| Command::Confirm(help_type, tx)).await
    }

    pub async fn cancel(&self) -> Result<Screen> {
        self.ask(Command::Cancel).await
    }

    pub async fn refresh(&self) -> Result<FeedView> {
        self.ask(Command::Refresh).await
    }

    /// Accepts the `index`th request of the feed, counting from zero.
    pub async fn accept(&self, index: usize) -> Result<NavigationSession> {
        self.ask(|tx| Command::Accept(index, tx)).await
    }

    pub async fn complete(&self) -> Result<Completion> {
        self.ask(Command::Complete).await
    }

    pub async fn render(&self) -> Result<RenderState> {
        let (tx, rx) = oneshot::channel();
        self.mailbox
            .send(Message::Command(Command::Render(tx)))
            .await
            .map_err(|_| AppError::Stopped)?;
        rx.await.map_err(|_| AppError::Stopped)
    }
}
