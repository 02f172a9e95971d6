pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Input precedence for every command: `--input` file, then piped stdin.
/// `None` means the caller should build the input from flags.
pub fn resolve<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_json(path)?));
    }
    match stdin::read_stdin()? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}
