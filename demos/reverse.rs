use std::collections::HashMap;

use routemill::{RouteCollectionBuilder, Value};

fn main() {
    let routes = RouteCollectionBuilder::new()
        .route(
            &["GET"],
            "/books/archives/:year(int)[/:month(int,min(1),max(12))]",
            |r| r.to_handler("archive").named("Archive"),
        )
        .route(&["GET"], "/posts[/:page(int)=1]/:format=html", |r| {
            r.to_handler("posts").named("Posts")
        })
        .route(&["GET"], "/dashboard", |r| {
            r.host(":tenant.example.com")
                .to_handler("dashboard")
                .named("Dashboard")
        })
        .build()
        .expect("failed to compile routes");

    let archive = routes.get_named_route("Archive").expect("route exists");

    let mut values = HashMap::new();
    values.insert("year".to_owned(), Value::Int(2013));
    println!("{}", archive.build_uri(&values).expect("year supplied"));

    values.insert("month".to_owned(), Value::Int(2));
    println!("{}", archive.build_uri(&values).expect("year supplied"));

    // Defaults fill in whatever is not supplied.
    let posts = routes.get_named_route("Posts").expect("route exists");
    println!("{}", posts.build_uri(&HashMap::new()).expect("defaults cover everything"));

    let dashboard = routes.get_named_route("Dashboard").expect("route exists");
    let mut values = HashMap::new();
    values.insert("tenant".to_owned(), Value::from("acme"));
    let host = dashboard.build_host(&values).expect("tenant supplied");
    println!(
        "{}{}",
        host.unwrap_or_default(),
        dashboard.build_uri(&values).expect("no path variables")
    );

    match routes.get_named_route("Missing") {
        Ok(_) => unreachable!(),
        Err(err) => println!("{err}"),
    }
}
