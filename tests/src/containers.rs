//! Testcontainer setup for PostgreSQL.
//!
//! Set `INSIGHTIQ_TEST_DATABASE_URL` to run against an existing server
//! instead of starting a container.

use std::time::Duration;

use insight_core::DbCoordinates;
use tenant_store::{check_connection, PoolSettings};
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

const DATABASE: &str = "insightiq";
const USER: &str = "insightiq";
const PASSWORD: &str = "insightiq";

/// Container handle for PostgreSQL.
pub struct TestContainers {
    #[allow(dead_code)]
    postgres: Option<ContainerAsync<GenericImage>>,
    pub coordinates: DbCoordinates,
}

impl TestContainers {
    /// Start PostgreSQL, or use the override URL.
    pub async fn start() -> Self {
        if let Some(url) = std::env::var("INSIGHTIQ_TEST_DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            let coordinates = DbCoordinates::from_url(&url).expect("INSIGHTIQ_TEST_DATABASE_URL is invalid");
            wait_for_postgres(&coordinates, Duration::from_secs(30)).await;
            return Self {
                postgres: None,
                coordinates,
            };
        }

        let (postgres, coordinates) = start_postgres().await;
        Self {
            postgres: Some(postgres),
            coordinates,
        }
    }
}

/// Start a PostgreSQL container and return it with its coordinates.
pub async fn start_postgres() -> (ContainerAsync<GenericImage>, DbCoordinates) {
    let image = GenericImage::new("postgres", "16-alpine")
        .with_wait_for(WaitFor::message_on_stderr("database system is ready to accept connections"))
        .with_exposed_port(5432.tcp())
        .with_env_var("POSTGRES_DB", DATABASE)
        .with_env_var("POSTGRES_USER", USER)
        .with_env_var("POSTGRES_PASSWORD", PASSWORD);

    let container = image.start().await.expect("Failed to start PostgreSQL");
    let port = container.get_host_port_ipv4(5432).await.unwrap();

    let coordinates = DbCoordinates {
        host: "127.0.0.1".to_string(),
        port,
        db_name: DATABASE.to_string(),
        user: USER.to_string(),
        password: PASSWORD.to_string(),
    };

    // The image restarts the server once after initdb.
    wait_for_postgres(&coordinates, Duration::from_secs(30)).await;

    (container, coordinates)
}

/// Wait until a connection can be checked out and used.
async fn wait_for_postgres(coordinates: &DbCoordinates, timeout: Duration) {
    let pool = PoolSettings::default().create_pool(coordinates).expect("Failed to build readiness pool");
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if check_connection(&pool).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("PostgreSQL at {}:{} not ready after {:?}", coordinates.host, coordinates.port, timeout);
}
