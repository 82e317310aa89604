use crate::error::{ConfigError, Result};
use crate::model::AppConfig;
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 环境变量前缀，例如 `VIGIL__MONITORING__INTERVAL=10s`
pub const ENV_PREFIX: &str = "VIGIL";

/// 配置加载器
pub struct ConfigLoader {
    path: PathBuf,
    use_env: bool,
    external_transports: Vec<String>,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            use_env: true,
            external_transports: Vec::new(),
        }
    }

    /// 是否读取环境变量覆盖
    pub fn with_env(mut self, use_env: bool) -> Self {
        self.use_env = use_env;
        self
    }

    /// 在代码中预先注册的通道名，告警规则可以直接引用
    pub fn with_external_transports<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external_transports = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 加载并校验配置
    pub fn load(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            return Err(ConfigError::Load(format!(
                "Config file not found: {}",
                self.path.display()
            )));
        }

        let path = self
            .path
            .to_str()
            .ok_or_else(|| ConfigError::Load("Invalid config path".to_string()))?;

        let mut builder = Config::builder().add_source(File::new(path, FileFormat::Toml));
        if self.use_env {
            builder = builder.add_source(env_source());
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate_with_transports(&self.external_transports)?;

        info!(
            path = %self.path.display(),
            transports = config.transports.len(),
            targets = config.targets.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// 从 TOML 文本加载并校验（不读取环境变量）
    pub fn load_str(content: &str) -> Result<AppConfig> {
        Self::load_str_with(content, &[] as &[String])
    }

    /// 同 [`ConfigLoader::load_str`]，允许规则引用预先注册的通道
    pub fn load_str_with<S: AsRef<str>>(content: &str, external: &[S]) -> Result<AppConfig> {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate_with_transports(external)?;

        debug!(targets = config.targets.len(), "Configuration parsed");
        Ok(config)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
