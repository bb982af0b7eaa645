use std::collections::HashMap;

use routemill::{MatchError, RouteCollectionBuilder};

fn main() {
    // Declare routes
    let routes = RouteCollectionBuilder::new()
        .route(&["GET"], "/users", |r| r.to_method("UserController", "index"))
        .route(&["GET"], "/users/:id(int)", |r| {
            r.to_method("UserController", "show").named("UserShow")
        })
        .route(&["PUT", "PATCH"], "/users/:id(int)", |r| {
            r.to_method("UserController", "update")
        })
        .route(
            &["GET"],
            "/books/archives/:year(int)[/:month(int,min(1),max(12))]",
            |r| r.to_handler("archive"),
        )
        .build()
        .expect("failed to compile routes");

    println!("{} routes registered", routes.len());

    let headers = HashMap::new();
    let requests = [
        ("GET", "/users/42"),
        ("GET", "/books/archives/2013"),
        ("GET", "/books/archives/2013/2"),
        ("GET", "/books/archives/2013/13"),
        ("DELETE", "/users/42"),
    ];

    for (method, path) in requests {
        match routes.match_request(method, "example.com", path, &headers) {
            Ok(matched) => {
                let mut vars: Vec<_> = matched.variables().iter().collect();
                vars.sort_by(|a, b| a.0.cmp(b.0));
                println!("{method} {path} -> {} {vars:?}", matched.route().action());
            }
            Err(MatchError::MethodNotAllowed { allowed, .. }) => {
                println!("{method} {path} -> 405, allowed: {}", allowed.join(", "));
            }
            Err(err) => println!("{method} {path} -> {err}"),
        }
    }
}
