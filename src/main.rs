use anyhow::Result;
use merchagg::pipeline;
use merchagg::warehouse::BigQueryWarehouse;
use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use warp::{reject::Rejection, reply::Reply, Filter};

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "merchant-transaction-aggregator"
    })))
}

async fn run_trigger(body: serde_json::Value) -> Result<impl Reply, Rejection> {
    Ok(pipeline::handle(body, &BigQueryWarehouse).await)
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();
    info!("startup");

    // Health check endpoint
    let health = warp::path("health").and(warp::get()).and_then(health_check);

    // Trigger endpoint: one POST per invocation, one partition per POST
    let trigger = warp::post()
        .and(warp::path::end())
        .and(warp::body::json())
        .and_then(run_trigger);

    let routes = health.or(trigger);

    // Cloud Run sets PORT; default to 8080 elsewhere
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);
    info!(port, "listening");

    warp::serve(routes).run(([0, 0, 0, 0], port)).await;

    Ok(())
}
