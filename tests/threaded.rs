use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use routemill::{MatchError, RouteCollection, RouteCollectionBuilder, Value};

fn routes() -> RouteCollection {
    RouteCollectionBuilder::new()
        .route(&["GET"], "users/:id(int)", |r| r.to_handler("show"))
        .route(&["GET"], "users/:name(alphanumeric)", |r| r.to_handler("by_name"))
        .route(
            &["GET"],
            "books/archives/:year(int)[/:month(int,min(1),max(12))]",
            |r| r.to_handler("archive"),
        )
        .route(&["DELETE"], "users/:id(int)", |r| r.to_handler("delete"))
        .build()
        .unwrap()
}

type Outcome = Result<(String, HashMap<String, Value>), MatchError>;

fn resolve(routes: &RouteCollection, method: &str, path: &str) -> Outcome {
    routes
        .match_request(method, "example.com", path, &HashMap::new())
        .map(|m| (m.route().action().to_string(), m.into_variables()))
}

#[test]
fn match_across_threads() {
    let routes = Arc::new(routes());

    let requests = [
        ("GET", "/users/42"),
        ("GET", "/users/alice"),
        ("GET", "/books/archives/2013/2"),
        ("GET", "/books/archives/2013/13"),
        ("POST", "/users/42"),
    ];

    let handles: Vec<_> = requests
        .iter()
        .map(|&(method, path)| {
            let routes = Arc::clone(&routes);
            thread::spawn(move || resolve(&routes, method, path))
        })
        .collect();

    let results: Vec<Outcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let (action, vars) = results[0].as_ref().unwrap();
    assert_eq!(action, "show");
    assert_eq!(vars["id"], Value::Int(42));

    let (action, vars) = results[1].as_ref().unwrap();
    assert_eq!(action, "by_name");
    assert_eq!(vars["name"], Value::String("alice".into()));

    let (action, vars) = results[2].as_ref().unwrap();
    assert_eq!(action, "archive");
    assert_eq!(vars["month"], Value::Int(2));

    assert_eq!(results[3], Err(MatchError::RouteNotFound));
    assert!(matches!(
        &results[4],
        Err(MatchError::MethodNotAllowed { allowed, .. }) if allowed == &["DELETE", "GET"]
    ));
}

#[test]
fn concurrent_matching_agrees_with_sequential() {
    let routes = Arc::new(routes());
    let paths: Vec<String> = (0..200)
        .map(|i| match i % 4 {
            0 => format!("/users/{i}"),
            1 => format!("/users/u{i}"),
            2 => format!("/books/archives/{}/{}", 2000 + i, i % 15),
            _ => format!("/nowhere/{i}"),
        })
        .collect();

    let expected: Vec<Outcome> = paths.iter().map(|p| resolve(&routes, "GET", p)).collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let routes = Arc::clone(&routes);
            let paths = paths.clone();
            thread::spawn(move || {
                paths
                    .iter()
                    .map(|p| resolve(&routes, "GET", p))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn rebuild_while_matching_previous_collection() {
    let current = Arc::new(routes());
    let reader = {
        let current = Arc::clone(&current);
        thread::spawn(move || {
            (0..500)
                .filter(|i| resolve(&current, "GET", &format!("/users/{i}")).is_ok())
                .count()
        })
    };

    let next = RouteCollectionBuilder::new()
        .route(&["GET"], "v2/users/:id(int)", |r| r.to_handler("show"))
        .build()
        .unwrap();

    assert_eq!(reader.join().unwrap(), 500);
    assert!(resolve(&next, "GET", "/v2/users/1").is_ok());
}
