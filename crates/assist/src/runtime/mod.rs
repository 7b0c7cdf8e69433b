//! Runs an [`App`] on a single task. Commands arrive through a mailbox and
//! are handled one at a time; effects run on their own tasks and post their
//! results back through the same mailbox.

use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use model::{HelpType, Role, Screen};
use tokio::sync::{mpsc, oneshot};

use crate::{
    app::App,
    auth::{AuthForm, AuthOutcome},
    effect::{Effect, Ticket},
    passenger::{LocationStatus, RoutePreview, SubmissionResult},
    render::RenderState,
    volunteer::{Completion, FeedView, NavigationSession},
    AppError, Result,
};

mod handle;
mod poller;
#[cfg(test)]
mod tests;

pub use handle::{AppHandle, WeakAppHandle};

const MAILBOX_SIZE: usize = 32;

/// Answers one command. Dropped unanswered while a handler panics, it
/// answers `Interrupted`; otherwise the caller sees the app as stopped.
#[derive(Debug)]
pub struct Responder<T>(Option<oneshot::Sender<Result<T>>>);

impl<T> Responder<T> {
    pub(crate) fn new(tx: oneshot::Sender<Result<T>>) -> Self {
        Self(Some(tx))
    }

    fn send(mut self, result: Result<T>) -> std::result::Result<(), Result<T>> {
        match self.0.take() {
            Some(tx) => tx.send(result),
            None => Err(result),
        }
    }
}

impl<T> Drop for Responder<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            if std::thread::panicking() {
                let _ = tx.send(Err(AppError::Interrupted));
            }
        }
    }
}

#[derive(Debug)]
pub enum Command {
    RequestAccess(Role, Responder<Screen>),
    ShowLogin(Responder<Screen>),
    SelectLoginRole(Role, Responder<Screen>),
    GoHome(Responder<Screen>),
    Logout(Responder<Screen>),
    Authenticate(AuthForm, Responder<AuthOutcome>),
    Locate(Responder<LocationStatus>),
    Initiate(String, Responder<RoutePreview>),
    Suggest(String, Responder<Vec<String>>),
    Confirm(HelpType, Responder<SubmissionResult>),
    Cancel(Responder<Screen>),
    Refresh(Responder<FeedView>),
    Accept(usize, Responder<NavigationSession>),
    Complete(Responder<Completion>),
    Render(oneshot::Sender<RenderState>),
}

type Apply = Box<dyn FnOnce(&mut App) + Send>;

pub(crate) enum Message {
    Command(Command),
    /// The result of the effect holding `Ticket`, ready to be applied.
    Settle(Ticket, Apply),
}

/// Starts the state owner and, if configured, the feed poller.
pub fn run(app: App) -> AppHandle {
    let poll_interval = app.config().feed_poll_interval();
    let (tx, mut rx) = mpsc::channel(MAILBOX_SIZE);
    let runtime = Runtime {
        mailbox: tx.downgrade(),
    };
    let handle = AppHandle::new(tx);

    tokio::spawn(async move {
        let mut app = app;
        while let Some(message) = rx.recv().await {
            runtime.dispatch(&mut app, message);
        }
        log::debug!("App runtime stopped.");
    });

    if let Some(period) = poll_interval {
        poller::start(handle.downgrade(), period);
    }

    handle
}

struct Runtime {
    /// Weak, so that the loop ends once every handle is gone.
    mailbox: mpsc::WeakSender<Message>,
}

impl Runtime {
    fn dispatch(&self, app: &mut App, message: Message) {
        let ticket = match &message {
            Message::Settle(ticket, _) => Some(*ticket),
            Message::Command(_) => None,
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            match message {
                Message::Command(command) => self.handle(app, command),
                Message::Settle(_, apply) => apply(app),
            }
            self.follow_up(app);
        }));

        // the handler panicked: resume with the state as it is
        if let Err(why) = result {
            log::error!("App handler panicked: {:?}", why);
            if let Some(ticket) = ticket {
                app.release(ticket);
            }
        }
    }

    fn handle(&self, app: &mut App, command: Command) {
        match command {
            Command::RequestAccess(role, tx) => reply(tx, app.request_access(role)),
            Command::ShowLogin(tx) => reply(tx, app.show_login()),
            Command::SelectLoginRole(role, tx) => reply(tx, app.select_login_role(role)),
            Command::GoHome(tx) => reply(tx, app.go_home()),
            Command::Logout(tx) => reply(tx, app.logout()),
            Command::Cancel(tx) => reply(tx, app.cancel()),
            Command::Authenticate(form, tx) => {
                self.launch(app.begin_authenticate(form), App::finish_authenticate, tx)
            }
            Command::Locate(tx) => self.launch(app.begin_locate(), App::finish_locate, tx),
            Command::Initiate(destination, tx) => self.launch(
                app.begin_initiate(&destination),
                App::finish_initiate,
                tx,
            ),
            Command::Suggest(partial, tx) => {
                self.launch(app.begin_suggest(&partial), App::finish_suggest, tx)
            }
            Command::Confirm(help_type, tx) => {
                self.launch(app.begin_confirm(help_type), App::finish_confirm, tx)
            }
            Command::Refresh(tx) => self.launch(app.begin_refresh(), App::finish_refresh, tx),
            Command::Accept(index, tx) => {
                self.launch(app.begin_accept(index), App::finish_accept, tx)
            }
            Command::Complete(tx) => self.launch(app.begin_complete(), App::finish_complete, tx),
            Command::Render(tx) => {
                if tx.send(app.render()).is_err() {
                    log::debug!("Render state requested but no longer awaited.");
                }
            }
        }
    }

    /// Starts the feed refresh the last message asked for.
    fn follow_up(&self, app: &mut App) {
        if !app.take_refresh_request() {
            return;
        }
        match app.begin_refresh() {
            Ok(task) => {
                let (tx, _) = oneshot::channel();
                self.spawn(task, App::finish_refresh, Responder::new(tx));
            }
            Err(why) => log::debug!("Skipping feed refresh: {why}"),
        }
    }

    fn launch<E, R, F>(&self, begun: Result<E>, finish: F, tx: Responder<R>)
    where
        E: Effect,
        R: Send + 'static,
        F: FnOnce(&mut App, Ticket, E::Output) -> Result<R> + Send + 'static,
    {
        match begun {
            Ok(effect) => self.spawn(effect, finish, tx),
            Err(why) => reply(tx, Err(why)),
        }
    }

    fn spawn<E, R, F>(&self, effect: E, finish: F, tx: Responder<R>)
    where
        E: Effect,
        R: Send + 'static,
        F: FnOnce(&mut App, Ticket, E::Output) -> Result<R> + Send + 'static,
    {
        let ticket = effect.ticket();
        let mailbox = self.mailbox.clone();

        tokio::spawn(async move {
            let output = AssertUnwindSafe(effect.run()).catch_unwind().await;
            let apply: Apply = match output {
                Ok(output) => Box::new(move |app: &mut App| reply(tx, finish(app, ticket, output))),
                Err(why) => {
                    log::error!("Effect '{}' panicked: {:?}", ticket.operation, why);
                    Box::new(move |app: &mut App| {
                        app.release(ticket);
                        reply(tx, Err(AppError::Interrupted));
                    })
                }
            };

            let Some(mailbox) = mailbox.upgrade() else {
                log::debug!("App stopped before '{}' finished.", ticket.operation);
                return;
            };
            if mailbox.send(Message::Settle(ticket, apply)).await.is_err() {
                log::debug!("App stopped before '{}' finished.", ticket.operation);
            }
        });
    }
}

fn reply<T>(tx: Responder<T>, result: Result<T>) {
    if let Err(Err(why)) = tx.send(result) {
        log::debug!("Nobody waited for the result: {why}");
    }
}
