pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        /// Postgres connection string. Without it todos are kept in memory.
        #[serde(default)]
        pub db_url: Option<String>,
        #[serde(default = "default_port")]
        pub port: u16,
        /// Origin allowed to call the API from a browser.
        #[serde(default = "default_cors_origin")]
        pub cors_origin: String,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_environment(config::Environment::default())
        }

        fn from_environment(environment: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(environment)
                .build()?;

            let mut config: Config = settings.try_deserialize()?;
            config.db_url = config.db_url.filter(|url| !url.trim().is_empty());
            Ok(config)
        }
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_cors_origin() -> String {
        "http://localhost:5173".to_string()
    }

}
pub mod entities;
pub mod repository;
pub mod todo;
pub mod unit_of_work;
pub mod user;
pub mod weather;
pub mod web;
