use std::path::Path;

use clap::ValueEnum;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Explicit choice wins; otherwise guess from the extension, defaulting to CSV.
    pub fn resolve(explicit: Option<InputFormat>, path: &Path) -> InputFormat {
        if let Some(format) = explicit {
            return format;
        }
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => InputFormat::Json,
            _ => InputFormat::Csv,
        }
    }
}
