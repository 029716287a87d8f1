/// Trait for loading service configuration from environment variables.
///
/// Implementors derive `serde::Deserialize` (field names map to upper-case
/// env vars, missing optional vars fall back to serde defaults) and may
/// override [`Config::validate`] to reject out-of-range values.
pub trait Config: Sized + serde::de::DeserializeOwned {
    /// Reject values that deserialized fine but make no sense at runtime.
    fn validate(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Load from an explicit set of `(NAME, value)` pairs.
    fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the process environment.
    fn load() -> anyhow::Result<Self> {
        Self::from_vars(std::env::vars())
    }
}
