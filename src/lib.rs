#[macro_use]
extern crate rocket;

pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;
pub mod schema;
pub mod store;

use crate::config::{ConfigError, DatabaseConfig};
use crate::request_logger::RequestLogger;
use crate::store::EmailStore;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::{
    openapi_get_routes,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// Production server: store configured from the environment, connected lazily.
pub fn rocket() -> Rocket<Build> {
    init_logger();
    log::info!("starting inbox insights API server");

    let cors = match CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .to_cors()
    {
        Ok(cors) => Some(cors),
        Err(err) => {
            log::error!("invalid CORS configuration, serving without CORS: {}", err);
            None
        }
    };

    let rocket = rocket::build().attach(RequestLogger);
    let rocket = match cors {
        Some(cors) => rocket.attach(cors),
        None => rocket,
    };

    with_email_store(rocket, DatabaseConfig::from_env)
}

/// Mount the API on `rocket`, backed by a Postgres store configured by
/// `load` at ignite. A configuration error aborts ignition.
pub fn with_email_store<F>(rocket: Rocket<Build>, load: F) -> Rocket<Build>
where
    F: FnOnce() -> Result<DatabaseConfig, ConfigError> + Send + 'static,
{
    mount_api(rocket)
        .attach(store_configuration(load))
        .attach(store_warm_up())
        .attach(store_shutdown())
}

fn store_configuration<F>(load: F) -> AdHoc
where
    F: FnOnce() -> Result<DatabaseConfig, ConfigError> + Send + 'static,
{
    AdHoc::try_on_ignite("Email Store Configuration", |rocket| async move {
        match load() {
            Ok(config) => {
                log::info!("email store configured for {}", config.target());
                let store = EmailStore::postgres(config.clone());
                Ok(rocket.manage(store).manage(config))
            }
            Err(err) => {
                log::error!("email store configuration invalid: {}", err);
                Err(rocket)
            }
        }
    })
}

/// Optionally open the connection before the first request arrives. A failed
/// attempt is only logged; the next request retries.
fn store_warm_up() -> AdHoc {
    AdHoc::on_liftoff("Warm Email Store", |rocket| {
        Box::pin(async move {
            let eager = rocket
                .state::<DatabaseConfig>()
                .map(|config| config.eager_connect)
                .unwrap_or(false);
            if !eager {
                return;
            }
            if let Some(store) = rocket.state::<EmailStore>() {
                let store = store.clone();
                tokio::spawn(async move {
                    if let Err(err) = store.warm_up().await {
                        log::warn!(
                            "initial database connection failed, next request will retry: {}",
                            err
                        );
                    }
                });
            }
        })
    })
}

/// Close the store's pool when Rocket shuts down.
pub fn store_shutdown() -> AdHoc {
    AdHoc::on_shutdown("Close Email Store", |rocket| {
        Box::pin(async move {
            if let Some(store) = rocket.state::<EmailStore>() {
                store.close().await;
            }
        })
    })
}

/// Mount the API routes, JSON catchers and API docs onto `rocket`.
///
/// The caller is responsible for managing an [`EmailStore`].
pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount(
            "/api",
            openapi_get_routes![
                routes::health::health_check,
                routes::emails::list_emails,
                routes::emails::save_email,
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .register(
            "/",
            catchers![
                routes::catchers::bad_request,
                routes::catchers::not_found,
                routes::catchers::unprocessable,
                routes::catchers::internal_error,
            ],
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use chrono::Utc;
    use parking_lot::Mutex;
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket};
    use std::sync::Arc;
    use uuid::Uuid;

    use crate::config::{ConfigError, DatabaseConfig};
    use crate::db::{ConnectionError, ConnectionState};
    use crate::models::{
        Category, EmailRecord, NewEmailRecord, Priority, Sentiment, YesNo,
    };
    use crate::store::{EmailRepository, EmailStore, StoreError};

    pub use database::{TestDatabase, TestDatabaseError};

    /// A record with schema defaults, created now.
    pub fn sample_record(subject: &str, from: &str) -> EmailRecord {
        let now = Utc::now();
        EmailRecord {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            from: from.to_string(),
            summary: None,
            priority: Priority::default(),
            action_required: YesNo::default(),
            category: Category::default(),
            sentiment: Sentiment::default(),
            deadline: None,
            is_meeting: YesNo::default(),
            important_entities: Vec::new(),
            suggested_action: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Repository kept in process memory, newest record last.
    pub struct InMemoryEmailRepository {
        records: Mutex<Vec<EmailRecord>>,
        reachable: bool,
        state: Mutex<ConnectionState>,
    }

    impl Default for InMemoryEmailRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    impl InMemoryEmailRepository {
        pub fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                reachable: true,
                state: Mutex::new(ConnectionState::Unconnected),
            }
        }

        /// A repository whose every connection attempt fails.
        pub fn unreachable() -> Self {
            Self {
                reachable: false,
                ..Self::new()
            }
        }

        pub fn len(&self) -> usize {
            self.records.lock().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[rocket::async_trait]
    impl EmailRepository for InMemoryEmailRepository {
        async fn ready(&self) -> Result<(), StoreError> {
            let mut state = self.state.lock();
            if self.reachable {
                *state = ConnectionState::Connected;
                Ok(())
            } else {
                *state = ConnectionState::Failed;
                Err(ConnectionError::new("memory", "store unreachable").into())
            }
        }

        async fn insert(&self, record: NewEmailRecord) -> Result<EmailRecord, StoreError> {
            self.ready().await?;
            let now = Utc::now();
            let saved = EmailRecord {
                id: Uuid::new_v4(),
                subject: record.subject,
                from: record.from,
                summary: record.summary,
                priority: record.priority,
                action_required: record.action_required,
                category: record.category,
                sentiment: record.sentiment,
                deadline: record.deadline,
                is_meeting: record.is_meeting,
                important_entities: record.important_entities,
                suggested_action: record.suggested_action,
                created_at: now,
                updated_at: now,
            };
            self.records.lock().push(saved.clone());
            Ok(saved)
        }

        async fn recent(&self, limit: i64) -> Result<Vec<EmailRecord>, StoreError> {
            self.ready().await?;
            let limit = usize::try_from(limit.max(0)).unwrap_or(0);
            Ok(self
                .records
                .lock()
                .iter()
                .rev()
                .take(limit)
                .cloned()
                .collect())
        }

        fn connection_state(&self) -> ConnectionState {
            *self.state.lock()
        }
    }

    pub mod database {
        use log::LevelFilter;
        use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use sqlx::{ConnectOptions, PgPool};
        use testcontainers::ImageExt;
        use testcontainers_modules::postgres::Postgres;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use tokio::runtime::Handle;
        use uuid::Uuid;

        use crate::db::MIGRATOR;

        /// `gen_random_uuid()` needs Postgres 13 or newer.
        const POSTGRES_TAG: &str = "16-alpine";

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral, migrated database for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            admin_options: PgConnectOptions,
            options: PgConnectOptions,
            database_name: String,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Use `TEST_DATABASE_URL` when set, otherwise start a disposable
            /// Postgres container.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                let (base_url, container) = match std::env::var("TEST_DATABASE_URL") {
                    Ok(url) => (url, None),
                    Err(_) => {
                        let container = Postgres::default().with_tag(POSTGRES_TAG).start().await?;
                        let host = container.get_host().await?.to_string();
                        let port = container.get_host_port_ipv4(5432).await?;
                        let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
                        (url, Some(container))
                    }
                };

                let base_options: PgConnectOptions = base_url.parse()?;
                let base_options = base_options.log_statements(LevelFilter::Off);
                let admin_options = base_options.clone().database("postgres");

                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await?;

                let database_name = format!("inbox_test_{}", Uuid::new_v4().simple());
                sqlx::query(&format!("CREATE DATABASE \"{}\"", database_name))
                    .execute(&admin_pool)
                    .await?;
                admin_pool.close().await;

                let options = base_options.database(&database_name);
                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(options.clone())
                    .await?;

                MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    admin_options,
                    options,
                    database_name,
                    container,
                })
            }

            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Connect options pointing at the ephemeral database.
            pub fn connect_options(&self) -> PgConnectOptions {
                self.options.clone()
            }

            /// Close pool connections and drop the ephemeral database.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                drop_database(self.admin_options.clone(), &self.database_name).await?;

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }

        async fn drop_database(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options)
                .await?;

            let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", database_name);
            sqlx::query(&drop_sql).execute(&admin_pool).await?;
            admin_pool.close().await;
            Ok(())
        }

        impl Drop for TestDatabase {
            fn drop(&mut self) {
                if let Some(pool) = self.pool.take() {
                    let admin_options = self.admin_options.clone();
                    let db_name = self.database_name.clone();
                    if let Ok(handle) = Handle::try_current() {
                        handle.spawn(async move {
                            pool.close().await;
                            let _ = drop_database(admin_options, &db_name).await;
                        });
                    }
                }

                if let Some(container) = self.container.take() {
                    drop(container);
                }
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    pub struct TestRocketBuilder {
        figment: Figment,
        store: Option<EmailStore>,
    }

    impl Default for TestRocketBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                store: None,
            }
        }

        /// Serve requests from `store`.
        pub fn manage_store(mut self, store: EmailStore) -> Self {
            self.store = Some(store);
            self
        }

        /// Serve requests from a fresh in-memory repository, returned for inspection.
        pub fn with_memory_store(self) -> (Self, Arc<InMemoryEmailRepository>) {
            let repository = Arc::new(InMemoryEmailRepository::new());
            let builder = self.manage_store(EmailStore::new(repository.clone()));
            (builder, repository)
        }

        /// Finish building the Rocket instance with every API route mounted.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = crate::mount_api(rocket::custom(self.figment));

            if let Some(store) = self.store {
                rocket = rocket.manage(store).attach(crate::store_shutdown());
            }

            rocket
        }

        /// Build the production wiring, with the store config supplied by `load`
        /// instead of the environment.
        pub fn build_configured<F>(self, load: F) -> Rocket<Build>
        where
            F: FnOnce() -> Result<DatabaseConfig, ConfigError> + Send + 'static,
        {
            crate::with_email_store(rocket::custom(self.figment), load)
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
