//! Literal run configuration: which Drive folders to pull, where the
//! pipeline stages read and write on local disk, and the sink settings
//! taken from the environment.

use anyhow::{Context, Result};
use std::path::Path;

/// One Drive folder holding statement spreadsheets for a country/year.
pub struct StatementFolder {
    pub label: &'static str,
    pub id: &'static str,
}

pub static STATEMENT_FOLDERS: &[StatementFolder] = &[
    StatementFolder { label: "Extratos Argentina 2023", id: "1D2Yy2tZAoV0nfU7h13awvMEwPI6FXU8y" },
    StatementFolder { label: "Extratos Argentina 2024", id: "1dAaXwiey2trUYdYXZYJ_Au7bciJckOJC" },
    StatementFolder { label: "Extratos Argentina 2025", id: "1WEQspstyL15vYe9aJHGJzKBI7h8kjXzf" },
    StatementFolder { label: "Extratos Bolívia 2024", id: "1YgUaRc11JEPgUvtKLX2fyK-EuUjEO3Gt" },
    StatementFolder { label: "Extratos Bolívia 2025", id: "1CCAC0QGFioEwsvQFR2rFzy7g4DZvblcI" },
    StatementFolder { label: "Extratos Colombia 2023", id: "1AOq4743CAFPhrjUc5qh3N4h6ArxxR1ea" },
    StatementFolder { label: "Extratos Colombia 2024", id: "1QSXm5CBkVXAzUlwOaNZvqFkZ11Kn8Cpj" },
    StatementFolder { label: "Extratos Colombia 2025", id: "1OwYIfzX8z6TMYNJDfnvU8lS8jvC4YTa5" },
    StatementFolder { label: "Extratos Venezuela 2023", id: "1OixEw4JeObJXB9xhECXugRhd-35zhPAM" },
    StatementFolder { label: "Extratos Venezuela 2024", id: "18bLBa6V7uIckgf0_lJXa7i8nkEWvLfUy" },
    StatementFolder { label: "Extratos Venezuela 2025", id: "1XJGsszxeAZL5Hzk99Pk-d-_NqpBsVsyE" },
];

/// Where stage 1 drops downloaded spreadsheets and stage 2 reads them.
pub const INPUT_DIR: &str = "extratosgerais";

/// Where stage 2 writes per-file normalized CSVs and the merged artifact.
pub const NORMALIZED_DIR: &str = "Extratos hist";

/// Column-name → target-type correspondence table, one row per column.
pub const CORRESPONDENCE_FILE: &str = "colunas correspondentes.csv";

/// Name of the combined artifact inside `NORMALIZED_DIR`.
pub const MERGED_FILE_NAME: &str = "merged_output.csv";

/// Cached OAuth token for the Drive read-only scope.
pub const TOKEN_CACHE: &str = "token.json";

/// Supabase sink settings, resolved from the environment (a `.env` file is
/// honored when present). `SUPABASE_ON_CONFLICT` defaults to `id_slot`,
/// which is what the sink historically resolved duplicates on even though
/// the composite `id` column is the declared key.
pub struct SinkConfig {
    pub url: String,
    pub key: String,
    pub table: String,
    pub on_conflict: String,
}

impl SinkConfig {
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine; the variables may come from the shell.
        let _ = dotenvy::dotenv();
        Ok(Self {
            url: require_env("SUPABASE_URL")?,
            key: require_env("SUPABASE_KEY")?,
            table: require_env("SUPABASE_TABLE")?,
            on_conflict: std::env::var("SUPABASE_ON_CONFLICT")
                .unwrap_or_else(|_| "id_slot".to_string()),
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("environment variable {} is not set", name))
}

/// Path of the merged artifact for a given normalized dir.
pub fn merged_path(normalized_dir: &Path) -> std::path::PathBuf {
    normalized_dir.join(MERGED_FILE_NAME)
}
