use anyhow::{bail, Context};

/// Which database port the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Env {
    Dev,
    Test,
}

impl Env {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim() {
            "" | "dev" => Ok(Env::Dev),
            "test" => Ok(Env::Test),
            other => bail!("unknown ENV value {other:?}, expected \"dev\" or \"test\""),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub port_test: Option<u16>,
    pub name: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: Env,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));
        let port = |key: &str, raw: String| {
            raw.parse::<u16>()
                .with_context(|| format!("{key} must be a port number, got {raw:?}"))
        };

        let env = Env::parse(&lookup("ENV").unwrap_or_default())?;

        let port_test = match lookup("DB_PORT_TEST") {
            Some(raw) => Some(port("DB_PORT_TEST", raw)?),
            None if env == Env::Test => bail!("DB_PORT_TEST must be set when ENV=test"),
            None => None,
        };

        let database = DatabaseConfig {
            host: required("DB_HOST")?,
            port: port("DB_PORT", required("DB_PORT")?)?,
            port_test,
            name: required("DB_NAME")?,
            user: required("DB_USER")?,
            password: required("DB_PASSWORD")?,
        };

        let secret = required("JWT_SECRET")?;
        if secret.is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        Ok(Self {
            host: lookup("APISERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: match lookup("APISERVER_PORT") {
                Some(raw) => port("APISERVER_PORT", raw)?,
                None => 8080,
            },
            env,
            database,
            jwt: JwtConfig { secret },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Issuer claim stamped on every token.
    pub fn issuer(&self) -> String {
        format!("http://{}", self.bind_addr())
    }

    pub fn database_url(&self) -> String {
        let db = &self.database;
        let port = match (self.env, db.port_test) {
            (Env::Test, Some(p)) => p,
            _ => db.port,
        };
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            db.user, db.password, db.host, port, db.name
        )
    }
}
