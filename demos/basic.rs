use kvlink::{diagnostics_from_env, ConnectionBuilder, ConnectionConfig, ConnectionEvent, ConnectionFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ConnectionConfig::from_env()?;
    let factory = ConnectionFactory::with_builder(
        ConnectionBuilder::new(config).diagnostics(diagnostics_from_env()),
    );

    let connection = factory.get();
    let mut events = connection.subscribe();

    connection.wait_ready().await?;
    println!("connected to {}", connection.config().url);

    while let Ok(event) = events.recv().await {
        println!("{event:?}");
        if matches!(event, ConnectionEvent::Ended) {
            break;
        }
    }

    Ok(())
}
