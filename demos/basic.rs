//! Minimal waypost example: a blog with an authenticated admin group.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/posts/42
//!   curl http://localhost:3000/admin/posts
//!   curl -H 'authorization: Bearer t' http://localhost:3000/admin/posts
//!   curl -X OPTIONS http://localhost:3000/posts/42

use http::StatusCode;
use tracing_subscriber::EnvFilter;
use waypost::{
    ContentType, Controller, DispatchError, GroupAttributes, IntoResponse, Request, Response, Router, Server,
    Target,
};

#[tokio::main]
async fn main() -> waypost::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut app = Router::new();
    app.set_middleware_redirect("/login");
    app.register_middleware("auth", || require_token);
    app.controller("Admin::PostController", || AdminPosts);

    app.get("/", home);
    app.get("/posts/{id}", show_post).name("posts.show")?;

    app.group(
        GroupAttributes::with_prefix("/admin").middleware("auth").namespace("Admin"),
        |admin| {
            admin.get("/posts", Target::action("PostController", "index"));
        },
    );

    app.hook("after", |method, path| tracing::info!(%method, %path, "no route"));
    app.on_error(StatusCode::NOT_FOUND, |_: &DispatchError| {
        Response::builder().status(StatusCode::NOT_FOUND).text("nothing here")
    });

    tracing::info!(example = %app.url("posts.show", &[("id", "42")])?, "routes registered");

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

fn home(_req: Request) -> Response {
    Response::builder().bytes(ContentType::Html, "<h1>welcome</h1>")
}

// GET /posts/{id}
fn show_post(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","title":"hello"}}"#).into_bytes())
}

// Rejects requests without an authorization header.
fn require_token(req: &Request) -> Option<Response> {
    if req.header("authorization").is_some() {
        return None;
    }
    Some(
        Response::builder()
            .status(StatusCode::SEE_OTHER)
            .header("location", "/login")
            .no_body(),
    )
}

struct AdminPosts;

impl Controller for AdminPosts {
    fn call(&self, action: &str, _req: Request) -> Option<Response> {
        match action {
            "index" => Some("admin: all posts".into_response()),
            _ => None,
        }
    }
}
