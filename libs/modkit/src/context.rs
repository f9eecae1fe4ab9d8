use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Provider of module-specific configuration (raw JSON sections only).
pub trait ConfigProvider: Send + Sync {
    /// Returns raw JSON section for the module, if any.
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

#[derive(Clone)]
pub struct ModuleCtx {
    db: Option<Arc<modkit_db::DbHandle>>,
    config_provider: Option<Arc<dyn ConfigProvider>>,
    cancellation_token: CancellationToken,
    module_name: Option<Arc<str>>,
}

pub struct ModuleCtxBuilder {
    inner: ModuleCtx,
}

impl ModuleCtxBuilder {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            inner: ModuleCtx {
                db: None,
                config_provider: None,
                cancellation_token: token,
                module_name: None,
            },
        }
    }

    pub fn with_db(mut self, db: Arc<modkit_db::DbHandle>) -> Self {
        self.inner.db = Some(db);
        self
    }

    pub fn with_config_provider(mut self, p: Arc<dyn ConfigProvider>) -> Self {
        self.inner.config_provider = Some(p);
        self
    }

    pub fn build(self) -> ModuleCtx {
        self.inner
    }
}

impl ModuleCtx {
    /// Scope context to a specific module name; config lookups use this key.
    pub fn for_module(mut self, name: &str) -> Self {
        self.module_name = Some(Arc::<str>::from(name));
        self
    }

    pub fn db(&self) -> Option<Arc<modkit_db::DbHandle>> {
        self.db.clone()
    }

    /// Like `db()`, but fails with a readable error when no database is wired.
    pub fn db_required(&self) -> anyhow::Result<Arc<modkit_db::DbHandle>> {
        self.db.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "module '{}' requires a database",
                self.current_module().unwrap_or("<unscoped>")
            )
        })
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn current_module(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// Deserialize the module's config into `T`. A missing section yields `T::default()`;
    /// a present but invalid section is an error.
    pub fn module_config<T: DeserializeOwned + Default>(&self) -> anyhow::Result<T> {
        let section = match (&self.module_name, &self.config_provider) {
            (Some(name), Some(p)) => p.get_module_config(name).map(|v| (name, v)),
            _ => None,
        };
        match section {
            Some((name, v)) => serde_json::from_value(v.clone())
                .map_err(|e| anyhow::anyhow!("invalid {name} config: {e}")),
            None => Ok(T::default()),
        }
    }

    /// Strict: deserialize the module's config into `T`, returning a pathful error on failure.
    pub fn module_config_required<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let name = self
            .module_name
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("context is not scoped to a module"))?;

        let prov = self
            .config_provider
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no ConfigProvider"))?;

        let val = prov
            .get_module_config(name)
            .ok_or_else(|| anyhow::anyhow!("missing module config: {name}"))?;

        serde_json::from_value(val.clone()).map_err(|e| anyhow::anyhow!("invalid {name} config: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    struct MapProvider(HashMap<String, serde_json::Value>);

    impl ConfigProvider for MapProvider {
        fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
            self.0.get(module_name)
        }
    }

    #[derive(Debug, Deserialize, Default, PartialEq)]
    struct Cfg {
        #[serde(default)]
        limit: u32,
    }

    fn ctx_with(values: &[(&str, serde_json::Value)]) -> ModuleCtx {
        let map = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        ModuleCtxBuilder::new(CancellationToken::new())
            .with_config_provider(Arc::new(MapProvider(map)))
            .build()
    }

    #[test]
    fn scoped_config_is_deserialized() {
        let ctx = ctx_with(&[("recipes", serde_json::json!({"limit": 7}))]).for_module("recipes");
        assert_eq!(ctx.current_module(), Some("recipes"));
        assert_eq!(ctx.module_config::<Cfg>().unwrap(), Cfg { limit: 7 });
        assert_eq!(ctx.module_config_required::<Cfg>().unwrap().limit, 7);
    }

    #[test]
    fn missing_config_falls_back_to_default() {
        let ctx = ctx_with(&[("recipes", serde_json::json!({"limit": 7}))]);
        assert_eq!(ctx.clone().for_module("other").module_config::<Cfg>().unwrap(), Cfg::default());

        let err = ctx.for_module("other").module_config_required::<Cfg>().unwrap_err();
        assert!(err.to_string().contains("missing module config: other"));
    }

    #[test]
    fn invalid_config_is_an_error() {
        let ctx = ctx_with(&[("recipes", serde_json::json!({"limit": "nope"}))]).for_module("recipes");
        let err = ctx.module_config::<Cfg>().unwrap_err();
        assert!(err.to_string().contains("invalid recipes config"), "{err}");
    }

    #[test]
    fn db_required_reports_module_name() {
        let ctx = ModuleCtxBuilder::new(CancellationToken::new())
            .build()
            .for_module("recipes");
        assert!(ctx.db().is_none());
        let err = ctx.db_required().unwrap_err();
        assert!(err.to_string().contains("recipes"));
    }
}
