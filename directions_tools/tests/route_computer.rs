use directions_tools::{
    polyline::encode_polyline,
    DirectionsApiError,
    DirectionsProvider,
    DirectionsRequest,
    DirectionsResponse,
    DirectionsRoute,
    EncodedPolyline,
    RouteComputer,
    RouteLeg,
    RouteStep,
};
use mockall::mock;
use ride_common::{GeoCoordinates, GeoPolyline};

mock! {
    pub Provider {}
    impl DirectionsProvider for Provider {
        async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResponse, DirectionsApiError>;
    }
}

fn origin() -> GeoCoordinates {
    GeoCoordinates::new(36.97, -122.03)
}

fn destination() -> GeoCoordinates {
    GeoCoordinates::new(36.99, -122.06)
}

fn waypoint() -> GeoCoordinates {
    GeoCoordinates::new(36.98, -122.04)
}

fn encoded(points: &[(f64, f64)]) -> EncodedPolyline {
    let line = points.iter().map(|&(lat, lng)| GeoCoordinates::new(lat, lng)).collect::<GeoPolyline>();
    EncodedPolyline::new(encode_polyline(&line))
}

fn step(points: &[(f64, f64)]) -> RouteStep {
    RouteStep { polyline: encoded(points) }
}

/// A two-leg route through the waypoint. Each leg has two steps that meet at a shared point.
fn waypoint_route() -> DirectionsRoute {
    DirectionsRoute {
        overview_polyline: encoded(&[(36.97, -122.03), (36.98, -122.04), (36.99, -122.06)]),
        legs: vec![
            RouteLeg { steps: vec![step(&[(36.97, -122.03), (36.975, -122.035)]), step(&[(36.975, -122.035), (36.98, -122.04)])] },
            RouteLeg { steps: vec![step(&[(36.98, -122.04), (36.985, -122.05)]), step(&[(36.985, -122.05), (36.99, -122.06)])] },
        ],
    }
}

fn direct_route() -> DirectionsRoute {
    DirectionsRoute {
        overview_polyline: encoded(&[(36.97, -122.03), (36.98, -122.05), (36.99, -122.06)]),
        legs: vec![RouteLeg { steps: vec![step(&[(36.97, -122.03), (36.99, -122.06)])] }],
    }
}

fn pl(points: &[(f64, f64)]) -> GeoPolyline {
    points.iter().map(|&(lat, lng)| GeoCoordinates::new(lat, lng)).collect()
}

#[tokio::test]
async fn compute_route_decodes_overview_polyline() {
    let _ = env_logger::try_init();
    let mut provider = MockProvider::new();
    provider
        .expect_directions()
        .withf(|req| req.waypoints.is_empty() && req.origin == origin() && req.destination == destination())
        .times(1)
        .returning(|_| Ok(DirectionsResponse::ok(vec![direct_route()])));
    let computer = RouteComputer::new(provider);
    let route = computer.compute_route(origin(), destination()).await.expect("route failed").expect("no route");
    assert_eq!(route, pl(&[(36.97, -122.03), (36.98, -122.05), (36.99, -122.06)]));
}

#[tokio::test]
async fn provider_error_is_an_api_access_failure() {
    let _ = env_logger::try_init();
    let mut provider = MockProvider::new();
    provider
        .expect_directions()
        .returning(|_| Ok(DirectionsResponse::error("REQUEST_DENIED", "The provided API key is invalid.")));
    let computer = RouteComputer::new(provider);
    let err = computer.compute_route(origin(), destination()).await.expect_err("should have failed");
    match err {
        DirectionsApiError::ProviderError { status, message } => {
            assert_eq!(status, "REQUEST_DENIED");
            assert_eq!(message, "The provided API key is invalid.");
        },
        e => panic!("Unexpected error: {e}"),
    }
}

#[tokio::test]
async fn zero_routes_is_not_a_failure() {
    let _ = env_logger::try_init();
    let mut provider = MockProvider::new();
    provider.expect_directions().times(2).returning(|_| Ok(DirectionsResponse::zero_results()));
    let computer = RouteComputer::new(provider);
    let route = computer.compute_route(origin(), destination()).await.expect("no-route must not fail");
    assert!(route.is_none());
    let routes = computer
        .compute_route_with_waypoints(origin(), destination(), &[waypoint()])
        .await
        .expect("no-route must not fail");
    assert!(routes.is_none());
}

#[tokio::test]
async fn transport_failures_propagate() {
    let _ = env_logger::try_init();
    let mut provider = MockProvider::new();
    provider.expect_directions().returning(|_| Err(DirectionsApiError::RequestError("connection refused".into())));
    let computer = RouteComputer::new(provider);
    let err = computer.compute_route_with_waypoints(origin(), destination(), &[waypoint()]).await;
    assert!(matches!(err, Err(DirectionsApiError::RequestError(_))));
}

#[tokio::test]
async fn no_waypoints_equals_single_route() {
    let _ = env_logger::try_init();
    let mut provider = MockProvider::new();
    provider
        .expect_directions()
        .withf(|req| req.waypoints.is_empty())
        .times(2)
        .returning(|_| Ok(DirectionsResponse::ok(vec![direct_route()])));
    let computer = RouteComputer::new(provider);
    let single = computer.compute_route(origin(), destination()).await.unwrap().unwrap();
    let multi = computer.compute_route_with_waypoints(origin(), destination(), &[]).await.unwrap().unwrap();
    assert_eq!(multi, vec![single]);
}

#[tokio::test]
async fn waypoints_produce_one_joined_polyline_per_leg() {
    let _ = env_logger::try_init();
    let mut provider = MockProvider::new();
    provider
        .expect_directions()
        .withf(|req| req.waypoints == vec![waypoint()])
        .times(1)
        .returning(|_| Ok(DirectionsResponse::ok(vec![waypoint_route(), direct_route()])));
    let computer = RouteComputer::new(provider);
    let legs = computer
        .compute_route_with_waypoints(origin(), destination(), &[waypoint()])
        .await
        .expect("route failed")
        .expect("no route");
    assert_eq!(legs.len(), 2);
    // origin -> waypoint; the junction point between the two steps appears exactly once
    assert_eq!(legs[0], pl(&[(36.97, -122.03), (36.975, -122.035), (36.98, -122.04)]));
    // waypoint -> destination
    assert_eq!(legs[1], pl(&[(36.98, -122.04), (36.985, -122.05), (36.99, -122.06)]));
    let junction = GeoCoordinates::new(36.975, -122.035);
    assert_eq!(legs[0].points().iter().filter(|p| **p == junction).count(), 1);
}

#[tokio::test]
async fn leg_count_must_match_waypoints() {
    let _ = env_logger::try_init();
    let mut provider = MockProvider::new();
    provider.expect_directions().returning(|_| Ok(DirectionsResponse::ok(vec![waypoint_route()])));
    let computer = RouteComputer::new(provider);
    let two_waypoints = [waypoint(), GeoCoordinates::new(36.985, -122.05)];
    let err = computer.compute_route_with_waypoints(origin(), destination(), &two_waypoints).await;
    assert!(matches!(err, Err(DirectionsApiError::MalformedResponse(_))));
}

#[tokio::test]
async fn garbage_polylines_are_api_access_failures() {
    let _ = env_logger::try_init();
    let mut provider = MockProvider::new();
    provider.expect_directions().returning(|_| {
        let route = DirectionsRoute { overview_polyline: EncodedPolyline::new("_p~iF"), legs: vec![] };
        Ok(DirectionsResponse::ok(vec![route]))
    });
    let computer = RouteComputer::new(provider);
    let err = computer.compute_route(origin(), destination()).await;
    assert!(matches!(err, Err(DirectionsApiError::InvalidPolyline(_))));
}
