use crate::error::ConfigError;
use crate::format::VerbatimIni;
use crate::settings::DbSection;
use std::collections::BTreeMap;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod format;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{DbCredentials, DEFAULT_MYSQL_PORT};

/// The credentials file looked up when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "config.ini";
/// The section looked up when none is named.
pub const DEFAULT_SECTION: &str = "mysql";

/// Loads one section of an INI credentials file.
///
/// The file is found at `dir/file_name`; the process working directory is
/// neither read nor changed. The returned mapping holds exactly the keys
/// present in the section, with values exactly as written.
pub fn load_db_config(
    dir: impl AsRef<Path>,
    file_name: &str,
    section: &str,
) -> Result<DbSection, ConfigError> {
    let path = dir.as_ref().join(file_name);
    tracing::debug!(path = %path.display(), section, "Reading database configuration.");

    let settings = config::Config::builder()
        .add_source(config::File::new(&path.to_string_lossy(), VerbatimIni))
        .build()?;

    match settings.get::<BTreeMap<String, String>>(section) {
        Ok(entries) => Ok(DbSection::new(section, entries)),
        Err(config::ConfigError::NotFound(_)) => Err(ConfigError::SectionMissing {
            section: section.to_string(),
            file: file_name.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}
