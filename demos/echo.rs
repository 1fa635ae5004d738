//! Streaming echo server.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example echo
//!
//! Optional `hitch.yaml` next to the working directory:
//!   server:
//!     port: 3000
//!
//! Try:
//!   curl -X POST --data-binary @Cargo.toml http://localhost:3000/echo
//!   curl -i http://localhost:3000/hello

use futures_util::stream;
use hitch::config::{ServerFactory, ServerProperties};
use hitch::{Error, ServerRequest, ServerResponse, Status, handler_fn};
use http::HeaderValue;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let mut props = match std::fs::exists("hitch.yaml")? {
        true => ServerProperties::load("hitch.yaml")?,
        false => ServerProperties { port: Some(3000), ..ServerProperties::default() },
    };
    props.apply_env()?;

    ServerFactory::new(props)
        .bind()
        .await?
        .serve(handler_fn(|req, res| Box::pin(handle(req, res))))
        .await
}

async fn handle(req: ServerRequest, res: &mut ServerResponse) -> Result<(), Error> {
    match req.path() {
        // The request body is pulled only as fast as the peer reads the
        // response.
        "/echo" => {
            if let Some(kind) = req.headers().get("content-type") {
                res.headers_mut()?.insert("content-type", kind.clone());
            }
            let body = req.body()?;
            res.write_with(body).await
        }
        "/hello" => {
            res.headers_mut()?.insert("content-type", HeaderValue::from_static("text/plain"));
            let hello = res.buffer_factory().wrap("hello from hitch\n");
            res.write_with(stream::iter([Ok(hello)])).await
        }
        _ => res.set_status(Status::NotFound),
    }
}
