use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use routemill::RouteCollectionBuilder;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let routes = Arc::new(
        RouteCollectionBuilder::new()
            .route(&["GET"], "/users/:id(int)", |r| r.to_handler("user"))
            .route(&["GET"], "/orders/:id(uuidv4)", |r| r.to_handler("order"))
            .build()
            .expect("failed to compile routes"),
    );

    let requests = [
        "/users/1",
        "/users/abc",
        "/orders/0f8fad5b-d9cb-469f-a165-70867728950e",
        "/orders/not-a-uuid",
    ];

    let handles: Vec<_> = requests
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let routes = Arc::clone(&routes);
            let path = (*path).to_owned();
            thread::spawn(move || {
                let result = routes.match_request("GET", "example.com", &path, &HashMap::new());
                match result {
                    Ok(matched) => {
                        format!("thread {i}: {path} -> {}", matched.route().action())
                    }
                    Err(err) => format!("thread {i}: {path} -> {err}"),
                }
            })
        })
        .collect();

    for handle in handles {
        println!("{}", handle.join().expect("thread panicked"));
    }
}
