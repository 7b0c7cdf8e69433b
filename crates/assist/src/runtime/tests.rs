use std::{sync::Arc, time::Duration};

use model::{Coordinates, HelpType, Role, Route, RouteResult, Screen, TravelMode};

use super::*;
use crate::{
    app::Services,
    config::AssistConfig,
    effect::{Operation, Ticket},
    location::{FixedPosition, LocationProvider},
    testing::{open_request, FakeGateway, FakeMapping},
};

fn westminster() -> Coordinates {
    Coordinates::new(51.5007, -0.1246)
}

fn app(gateway: Arc<FakeGateway>, mapping: FakeMapping) -> App {
    let config = AssistConfig::default();
    let mapping = Arc::new(mapping);
    let location = Arc::new(LocationProvider::new(
        Arc::new(FixedPosition(westminster())),
        mapping.clone(),
        config.location_settings(),
    ));
    App::new(config, Services::new(gateway, mapping, location))
}

fn start(gateway: Arc<FakeGateway>, mapping: FakeMapping) -> AppHandle {
    run(app(gateway, mapping))
}

fn walking() -> FakeMapping {
    FakeMapping::new().with_route(
        TravelMode::Walking,
        RouteResult::new(
            TravelMode::Walking,
            vec![Route {
                summary: "Whitehall".to_owned(),
                distance_m: 2300.0,
                duration_s: 1740.0,
            }],
        ),
    )
}

async fn sign_in(app: &AppHandle, role: Role) {
    app.request_access(role).await.unwrap();
    app.authenticate(AuthForm::login(role, format!("{role}@example.org"), "secret"))
        .await
        .unwrap();
}

#[tokio::test]
async fn commands_flow_through_the_mailbox() {
    let gateway = Arc::new(FakeGateway::new());
    let app = start(gateway.clone(), walking());

    sign_in(&app, Role::Passenger).await;
    app.locate().await.unwrap();
    app.initiate("Central Station").await.unwrap();
    let submission = app.confirm(HelpType::Companion).await.unwrap();

    assert!(submission.ok);
    let state = app.render().await.unwrap();
    assert_eq!(state.screen, Screen::PassengerConfirm);
    assert_eq!(state.role, Some(Role::Passenger));
    assert!(state.busy.is_empty());
    assert_eq!(gateway.sent("request_help"), 1);
}

#[tokio::test]
async fn render_stays_available_while_routing() {
    let app = start(
        Arc::new(FakeGateway::new()),
        walking().with_delay(Duration::from_millis(200)),
    );
    sign_in(&app, Role::Passenger).await;
    app.locate().await.unwrap();

    let routing = {
        let app = app.clone();
        tokio::spawn(async move { app.initiate("Central Station").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = app.render().await.unwrap();
    assert!(state.is_busy(Operation::Route));
    assert!(matches!(
        app.initiate("Central Station").await,
        Err(AppError::Busy(Operation::Route))
    ));

    routing.await.unwrap().unwrap();
    assert_eq!(app.render().await.unwrap().screen, Screen::PassengerConfirm);
}

#[tokio::test]
async fn cancel_discards_the_route_in_flight() {
    let app = start(
        Arc::new(FakeGateway::new()),
        walking().with_delay(Duration::from_millis(200)),
    );
    sign_in(&app, Role::Passenger).await;
    app.locate().await.unwrap();

    let routing = {
        let app = app.clone();
        tokio::spawn(async move { app.initiate("Central Station").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.cancel().await.unwrap(), Screen::PassengerRequest);

    assert!(matches!(routing.await.unwrap(), Err(AppError::Cancelled)));
    let state = app.render().await.unwrap();
    assert_eq!(state.screen, Screen::PassengerRequest);
    assert!(state.route.is_none());
    assert!(state.busy.is_empty());
}

#[tokio::test]
async fn panicking_effect_is_interrupted() {
    let app = start(Arc::new(FakeGateway::panicking()), FakeMapping::new());
    app.show_login().await.unwrap();

    for _ in 0..2 {
        let result = app
            .authenticate(AuthForm::login(Role::Passenger, "pat@example.org", "secret"))
            .await;
        assert!(matches!(result, Err(AppError::Interrupted)));
    }

    let state = app.render().await.unwrap();
    assert!(state.busy.is_empty());
    assert_eq!(state.screen, Screen::Login);
}

#[tokio::test]
async fn volunteer_feed_loads_after_login() {
    let gateway = Arc::new(
        FakeGateway::new().with_feed(vec![open_request("Central Station", westminster())]),
    );
    let app = start(gateway.clone(), FakeMapping::new());

    sign_in(&app, Role::Volunteer).await;

    let mut feed = FeedView::Idle;
    for _ in 0..50 {
        feed = app.render().await.unwrap().feed;
        if feed != FeedView::Idle {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(feed.requests().len(), 1);
    assert_eq!(gateway.sent("get_requests"), 1);
}

#[tokio::test]
async fn poller_keeps_refreshing_the_feed() {
    let gateway = Arc::new(FakeGateway::new());
    let app = start(gateway.clone(), FakeMapping::new());
    sign_in(&app, Role::Volunteer).await;

    let poller = poller::start(app.downgrade(), Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(gateway.sent("get_requests") >= 3);
    drop(app);
    tokio::time::timeout(Duration::from_secs(1), poller)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn dropping_every_handle_stops_the_app() {
    let app = start(Arc::new(FakeGateway::new()), FakeMapping::new());
    let weak = app.downgrade();
    assert!(weak.upgrade().is_some());

    drop(app);

    assert!(weak.upgrade().is_none());
}

#[tokio::test]
async fn panicking_handler_answers_interrupted() {
    let (mailbox, _rx) = mpsc::channel(1);
    let runtime = Runtime {
        mailbox: mailbox.downgrade(),
    };
    let mut app = app(Arc::new(FakeGateway::new()), FakeMapping::new());
    let (tx, rx) = oneshot::channel::<Result<Screen>>();
    let responder = Responder::new(tx);
    let ticket = Ticket {
        operation: Operation::Route,
        serial: 1,
    };

    runtime.dispatch(
        &mut app,
        Message::Settle(
            ticket,
            Box::new(move |_: &mut App| {
                let _responder = responder;
                panic!("applying the route failed");
            }),
        ),
    );

    assert!(matches!(rx.await, Ok(Err(AppError::Interrupted))));
    assert_eq!(app.screen(), Screen::Home);
}

#[test]
fn unanswered_responder_reads_as_stopped() {
    let (tx, mut rx) = oneshot::channel::<Result<Screen>>();
    drop(Responder::new(tx));
    assert!(rx.try_recv().is_err());
}
