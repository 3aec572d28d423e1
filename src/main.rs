use failure::ResultExt;
use tweetql::{schema, telemetry, Config, Context, EntityStore, GraphQLHandler, YtsGateway};

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_env().compat()?;
    telemetry::init(config.log_format);

    let movies = YtsGateway::new(&config).compat()?;
    let context = Context::new(EntityStore::seeded(), movies);
    let mut handler = GraphQLHandler::new(schema(), context);
    if config.playground {
        handler = handler.with_playground(config.graphql_endpoint.clone());
    }

    tracing::info!(movie_api = %config.movie_api_base_url, "starting graphql function");
    lambda_runtime::run(handler).await?;
    Ok(())
}
