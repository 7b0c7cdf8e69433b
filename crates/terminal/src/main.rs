use std::{env, sync::Arc};

use assist::{
    location::{FixedPosition, NoPosition, PositionSource},
    runtime::{self, AppHandle},
    volunteer::FeedView,
    App, AppError, AssistConfig, ConfigError, Services,
};
use itertools::Itertools;
use model::Coordinates;
use tokio::io::{self, AsyncBufReadExt, BufReader};

use crate::command::{Input, HELP};

mod command;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = AssistConfig::from_env().expect("expected assist config in env.");
    let position = device_position().expect("invalid device position in env.");
    let services = Services::connect(&config, position).expect("could not set up services.");
    let app = runtime::run(App::new(config, services));

    println!("{HELP}");
    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(why) => {
                log::error!("Can not read stdin: {why}");
                break;
            }
        };

        let input = match command::parse(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(why) => {
                println!("error: {why}");
                continue;
            }
        };
        if input == Input::Quit {
            break;
        }

        match execute(&app, input).await {
            Ok(Some(message)) => println!("{message}"),
            Ok(None) => {}
            Err(why) => println!("error: {why}"),
        }
        match app.render().await {
            Ok(state) => match serde_json::to_string_pretty(&state) {
                Ok(json) => println!("{json}"),
                Err(why) => log::error!("Can not print state: {why}"),
            },
            Err(why) => {
                println!("error: {why}");
                break;
            }
        }
    }
}

async fn execute(app: &AppHandle, input: Input) -> Result<Option<String>, AppError> {
    let message = match input {
        Input::Home => app.go_home().await.map(|screen| format!("-> {screen}"))?,
        Input::LoginScreen => app.show_login().await.map(|screen| format!("-> {screen}"))?,
        Input::Access(role) => app
            .request_access(role)
            .await
            .map(|screen| format!("-> {screen}"))?,
        Input::Tab(role) => app
            .select_login_role(role)
            .await
            .map(|_| format!("login as {role}"))?,
        Input::Authenticate(form) => {
            let outcome = app.authenticate(form).await?;
            if outcome.offline {
                format!("signed in as {} (offline)", outcome.role)
            } else {
                format!("signed in as {}", outcome.role)
            }
        }
        Input::Logout => app.logout().await.map(|_| "logged out".to_owned())?,
        Input::Locate => {
            let status = app.locate().await?;
            serde_json::to_string(&status).unwrap_or_default()
        }
        Input::Suggest(partial) => {
            let suggestions = app.suggest(partial).await?;
            if suggestions.is_empty() {
                "no suggestions".to_owned()
            } else {
                suggestions.iter().join("\n")
            }
        }
        Input::Route(destination) => {
            let preview = app.initiate(destination).await?;
            match preview.route.best() {
                Some(route) => format!(
                    "{:?} to {}: {} ({:.1} km, {} min)",
                    preview.route.mode,
                    preview.destination,
                    route.summary,
                    route.distance_m / 1000.0,
                    (route.duration_s / 60.0).round()
                ),
                None => format!("route to {}", preview.destination),
            }
        }
        Input::Confirm(help_type) => {
            let submission = app.confirm(help_type).await?;
            match submission.error {
                None => "Request sent! Waiting for a volunteer.".to_owned(),
                Some(why) => format!("request not stored: {why}"),
            }
        }
        Input::Cancel => app.cancel().await.map(|screen| format!("-> {screen}"))?,
        Input::Refresh => describe_feed(&app.refresh().await?),
        Input::Accept(index) => {
            let navigation = app.accept(index).await?;
            format!(
                "navigating to {} ({:.2} km)",
                navigation.request.content.destination, navigation.request.distance_km
            )
        }
        Input::Complete => {
            let completion = app.complete().await?;
            format!("completed {}", completion.request.destination)
        }
        Input::State => return Ok(None),
        Input::Contract => serde_json::to_string_pretty(&gateway::protocol::request_schema())
            .unwrap_or_default(),
        Input::Help => HELP.to_owned(),
        Input::Quit => return Ok(None),
    };
    Ok(Some(message))
}

fn describe_feed(feed: &FeedView) -> String {
    match feed {
        FeedView::Idle => "feed not loaded".to_owned(),
        FeedView::Empty => "No active requests.".to_owned(),
        FeedView::Unavailable(why) => format!("feed unavailable: {why}"),
        FeedView::Requests(requests) => requests
            .iter()
            .enumerate()
            .map(|(index, request)| {
                format!(
                    "{}. {} ({}) at {}",
                    index + 1,
                    request.destination,
                    request.help_type,
                    request.coordinates.label()
                )
            })
            .join("\n"),
    }
}

/// The terminal has no GPS. A position can be given through
/// `ASSIST_DEVICE_LAT` and `ASSIST_DEVICE_LNG`.
fn device_position() -> Result<Arc<dyn PositionSource>, ConfigError> {
    let read = |key: &'static str| -> Result<Option<f64>, ConfigError> {
        match env::var(key) {
            Ok(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Invalid { key, value }),
            Err(_) => Ok(None),
        }
    };

    match (read("ASSIST_DEVICE_LAT")?, read("ASSIST_DEVICE_LNG")?) {
        (Some(lat), Some(lng)) => {
            let coordinates = Coordinates::new(lat, lng);
            if !coordinates.is_valid() {
                return Err(ConfigError::Invalid {
                    key: "ASSIST_DEVICE_LAT",
                    value: coordinates.label(),
                });
            }
            log::info!("Device position fixed at {}.", coordinates.label());
            Ok(Arc::new(FixedPosition(coordinates)))
        }
        (None, None) => {
            log::info!("No device position configured.");
            Ok(Arc::new(NoPosition))
        }
        (Some(_), None) => Err(ConfigError::Missing("ASSIST_DEVICE_LNG")),
        (None, Some(_)) => Err(ConfigError::Missing("ASSIST_DEVICE_LAT")),
    }
}
